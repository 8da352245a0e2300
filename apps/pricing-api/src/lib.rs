//! # Quickshop Pricing API
//!
//! HTTP front for the cart calculator.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Pricing API Server                               │
//! │                                                                         │
//! │  Storefront ───► axum (8080) ───► PricingService ───► quickshop-core   │
//! │                                         │                               │
//! │                                         ▼                               │
//! │                               PricingLookup (SQLite)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod dto;
pub mod error;
pub mod routes;
pub mod service;
pub mod state;

pub use config::{ApiConfig, ConfigError, LogFormat};
pub use error::ApiError;
pub use service::{PricingLookup, PricingService};
pub use state::AppState;
