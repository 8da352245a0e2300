//! Shared application state.

use std::sync::Arc;

use crate::service::{PricingLookup, PricingService};

/// Cloned into every handler. Holds nothing mutable.
#[derive(Clone)]
pub struct AppState {
    pub pricing: PricingService,
}

impl AppState {
    pub fn new(lookup: Arc<dyn PricingLookup>) -> Self {
        AppState {
            pricing: PricingService::new(lookup),
        }
    }
}
