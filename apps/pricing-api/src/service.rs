//! # Pricing Service
//!
//! Orchestrates one calculation: validate, look up, compute.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CartInput                                                              │
//! │     │                                                                   │
//! │     ▼  input.validate()          → 400 before any lookup               │
//! │     ▼  lookup.store_exists()     → 400 "Store not found" / 503         │
//! │     ▼  lookup.find_discount()    → only when a code was supplied       │
//! │     ▼  quickshop_core::calculate → CalculationResult                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The service never writes. Redeeming a code belongs to order creation
//! (`DiscountRepository::redeem`).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use quickshop_core::calculator::{self, CartInput};
use quickshop_core::validation::{
    is_lookup_code, normalize_discount_code, validate_non_negative, validate_store_id,
};
use quickshop_core::{
    CalculationResult, CustomerContext, DiscountCheck, DiscountRule, Money, ValidationError,
};
use quickshop_db::{Database, DbError};

use crate::error::ApiError;

// =============================================================================
// Lookup Seam
// =============================================================================

/// Read-only access to stores and discount rules.
///
/// Implemented by [`Database`] in production and by in-memory fakes in tests.
#[async_trait]
pub trait PricingLookup: Send + Sync {
    /// Whether an active store with this id exists.
    async fn store_exists(&self, store_id: &str) -> Result<bool, DbError>;

    /// The store's rule for a normalized code, active or not.
    async fn find_discount(
        &self,
        store_id: &str,
        code: &str,
    ) -> Result<Option<DiscountRule>, DbError>;

    /// Whether the backing store answers.
    async fn is_healthy(&self) -> bool;
}

#[async_trait]
impl PricingLookup for Database {
    async fn store_exists(&self, store_id: &str) -> Result<bool, DbError> {
        self.stores().exists(store_id).await
    }

    async fn find_discount(
        &self,
        store_id: &str,
        code: &str,
    ) -> Result<Option<DiscountRule>, DbError> {
        self.discounts().find_by_code(store_id, code).await
    }

    async fn is_healthy(&self) -> bool {
        self.health_check().await
    }
}

// =============================================================================
// Service
// =============================================================================

#[derive(Clone)]
pub struct PricingService {
    lookup: Arc<dyn PricingLookup>,
}

impl PricingService {
    pub fn new(lookup: Arc<dyn PricingLookup>) -> Self {
        PricingService { lookup }
    }

    /// Prices a cart as of `now`.
    pub async fn calculate(
        &self,
        input: &CartInput,
        now: DateTime<Utc>,
    ) -> Result<CalculationResult, ApiError> {
        let code = input.validate()?;
        let store_id = input.store_id.trim();

        debug!(
            store_id = %store_id,
            lines = input.items.len(),
            code = ?code,
            "Calculating cart"
        );

        self.require_store(store_id).await?;

        let rule = match &code {
            Some(code) => self.find_rule(store_id, code).await?,
            None => None,
        };

        let result = calculator::calculate(input, rule.as_ref(), now)?;

        for rejected in &result.errors {
            debug!(
                store_id = %store_id,
                code = %rejected.code,
                reason = ?rejected.reason,
                "Discount code rejected"
            );
        }
        info!(
            store_id = %store_id,
            subtotal = result.subtotal.minor(),
            discount = result.discount_amount.minor(),
            shipping = result.shipping_amount.minor(),
            total = result.total.minor(),
            applied = ?result.applied_discount_code,
            "Cart calculated"
        );

        Ok(result)
    }

    /// Checks a code against an order subtotal without pricing lines.
    pub async fn validate_code(
        &self,
        store_id: &str,
        code: &str,
        subtotal: Money,
        customer: Option<&CustomerContext>,
        now: DateTime<Utc>,
    ) -> Result<DiscountCheck, ApiError> {
        validate_store_id(store_id)?;
        validate_non_negative("subtotal", subtotal)?;
        let normalized =
            normalize_discount_code(Some(code)).ok_or_else(|| ValidationError::required("code"))?;
        let store_id = store_id.trim();

        self.require_store(store_id).await?;
        let rule = self.find_rule(store_id, &normalized).await?;

        let check = calculator::check_discount_code(
            store_id,
            &normalized,
            subtotal,
            customer,
            rule.as_ref(),
            now,
        )?;

        debug!(
            store_id = %store_id,
            code = %check.code,
            valid = check.valid,
            reason = ?check.reason,
            "Discount code checked"
        );
        Ok(check)
    }

    /// Whether the rule store is reachable.
    pub async fn is_healthy(&self) -> bool {
        self.lookup.is_healthy().await
    }

    /// Looks up a normalized code. Codes no rule could carry skip the
    /// lookup and are reported as not found by the calculator.
    async fn find_rule(
        &self,
        store_id: &str,
        code: &str,
    ) -> Result<Option<DiscountRule>, ApiError> {
        if !is_lookup_code(code) {
            debug!(store_id = %store_id, code = %code, "Malformed discount code, lookup skipped");
            return Ok(None);
        }
        Ok(self.lookup.find_discount(store_id, code).await?)
    }

    async fn require_store(&self, store_id: &str) -> Result<(), ApiError> {
        if self.lookup.store_exists(store_id).await? {
            Ok(())
        } else {
            Err(ValidationError::UnknownStore {
                store_id: store_id.to_string(),
            }
            .into())
        }
    }
}

// =============================================================================
// Test Support
// =============================================================================
