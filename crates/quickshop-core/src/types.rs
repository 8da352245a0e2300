//! # Domain Types
//!
//! Everything the calculator reads and produces.
//!
//! ## Type Relationships
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  LineItem ×N ───┐                                                       │
//! │  DiscountRule? ─┼──► calculate(now) ──► CalculationResult              │
//! │  ShippingRate? ─┤                          ├── LineBreakdown ×N         │
//! │  CustomerContext?                          ├── AppliedDiscount?         │
//! │                                            └── RejectedDiscount ×M      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Inputs are immutable for the duration of a calculation. Results are
//! produced fresh per call and never persisted.
//!
//! Wire format is camelCase; enum tags are snake_case to match the values
//! stored in the rule table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Cart Input
// =============================================================================

/// One line of the cart.
///
/// `product_id`, `collection_ids` and `tags` are only consulted when a rule
/// restricts which items it applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub variant_id: String,
    #[serde(default)]
    pub product_id: Option<String>,
    pub quantity: i64,
    pub unit_price: Money,
    #[serde(default)]
    pub collection_ids: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl LineItem {
    pub fn new(variant_id: impl Into<String>, quantity: i64, unit_price: Money) -> Self {
        LineItem {
            variant_id: variant_id.into(),
            product_id: None,
            quantity,
            unit_price,
            collection_ids: Vec::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_product(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = Some(product_id.into());
        self
    }

    pub fn with_collections<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collection_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Shipping option chosen by the shopper. Supplied by the caller; the
/// calculator only adds it to the total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ShippingRate {
    #[serde(default)]
    pub id: Option<String>,
    pub carrier: String,
    pub price: Money,
    #[serde(default)]
    pub estimated_delivery: Option<String>,
    /// Pre-discount subtotal at or above which this rate ships free.
    #[serde(default)]
    pub free_shipping_threshold: Option<Money>,
}

impl ShippingRate {
    pub fn new(carrier: impl Into<String>, price: Money) -> Self {
        ShippingRate {
            id: None,
            carrier: carrier.into(),
            price,
            estimated_delivery: None,
            free_shipping_threshold: None,
        }
    }
}

/// Customer segment used to gate segment-specific codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CustomerSegment {
    All,
    Vip,
    NewCustomer,
    ReturningCustomer,
}

impl CustomerSegment {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerSegment::All => "all",
            CustomerSegment::Vip => "vip",
            CustomerSegment::NewCustomer => "new_customer",
            CustomerSegment::ReturningCustomer => "returning_customer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "all" => Some(CustomerSegment::All),
            "vip" => Some(CustomerSegment::Vip),
            "new_customer" => Some(CustomerSegment::NewCustomer),
            "returning_customer" => Some(CustomerSegment::ReturningCustomer),
            _ => None,
        }
    }
}

/// Optional shopper attributes. Used only for eligibility gating.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CustomerContext {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub segment: Option<CustomerSegment>,
    #[serde(default)]
    pub orders_count: i64,
    #[serde(default)]
    pub lifetime_value: Money,
}

// =============================================================================
// Discount Rules
// =============================================================================

/// Which cart lines a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AppliesTo {
    #[default]
    All,
    SpecificProducts,
    SpecificCollections,
    SpecificTags,
}

impl AppliesTo {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppliesTo::All => "all",
            AppliesTo::SpecificProducts => "specific_products",
            AppliesTo::SpecificCollections => "specific_collections",
            AppliesTo::SpecificTags => "specific_tags",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "all" => Some(AppliesTo::All),
            "specific_products" => Some(AppliesTo::SpecificProducts),
            "specific_collections" => Some(AppliesTo::SpecificCollections),
            "specific_tags" => Some(AppliesTo::SpecificTags),
            _ => None,
        }
    }
}

/// Flat discount type tag, as stored and as reported back to the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    FixedAmount,
    FreeShipping,
    Bogo,
    Volume,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percentage => "percentage",
            DiscountType::FixedAmount => "fixed_amount",
            DiscountType::FreeShipping => "free_shipping",
            DiscountType::Bogo => "bogo",
            DiscountType::Volume => "volume",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "percentage" => Some(DiscountType::Percentage),
            "fixed_amount" => Some(DiscountType::FixedAmount),
            "free_shipping" => Some(DiscountType::FreeShipping),
            "bogo" => Some(DiscountType::Bogo),
            "volume" => Some(DiscountType::Volume),
            _ => None,
        }
    }
}

/// A percentage (basis points) or a fixed amount off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Benefit {
    Percentage { bps: u32 },
    FixedAmount { amount: Money },
}

/// What the "get" units of a buy-X-get-Y offer receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BogoReward {
    Free,
    Percentage { bps: u32 },
    /// Per unit, capped at the unit price.
    FixedAmount { amount: Money },
}

/// Buy `buy_quantity`, get `get_quantity` with `reward`.
///
/// With `same_product` each line forms its own bundles. Otherwise all eligible
/// units pool together and the cheapest units receive the reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BogoOffer {
    pub buy_quantity: u32,
    pub get_quantity: u32,
    pub reward: BogoReward,
    pub same_product: bool,
}

/// Reached when the eligible quantity is at least `min_quantity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeTier {
    pub min_quantity: i64,
    pub benefit: Benefit,
}

/// How a rule computes its merchandise discount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiscountKind {
    /// Basis points of the eligible total (1000 = 10%).
    Percentage { bps: u32 },
    /// Capped at the eligible total.
    FixedAmount { amount: Money },
    /// No merchandise discount; shipping becomes 0.
    FreeShipping,
    Bogo(BogoOffer),
    Volume { tiers: Vec<VolumeTier> },
}

impl DiscountKind {
    pub fn discount_type(&self) -> DiscountType {
        match self {
            DiscountKind::Percentage { .. } => DiscountType::Percentage,
            DiscountKind::FixedAmount { .. } => DiscountType::FixedAmount,
            DiscountKind::FreeShipping => DiscountType::FreeShipping,
            DiscountKind::Bogo(_) => DiscountType::Bogo,
            DiscountKind::Volume { .. } => DiscountType::Volume,
        }
    }
}

/// A discount code as configured by the merchant.
///
/// Read-only input to the calculator. `usage_count` is maintained by order
/// creation, never by pricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountRule {
    pub id: String,
    pub store_id: String,
    /// Stored upper-cased.
    pub code: String,
    pub kind: DiscountKind,
    pub is_active: bool,

    pub minimum_order_amount: Option<Money>,
    pub maximum_order_amount: Option<Money>,
    pub minimum_quantity: Option<i64>,
    pub maximum_quantity: Option<i64>,

    pub usage_limit: Option<i64>,
    pub usage_count: i64,

    pub applies_to: AppliesTo,
    pub product_ids: Vec<String>,
    pub collection_ids: Vec<String>,
    pub tag_names: Vec<String>,

    pub customer_segment: Option<CustomerSegment>,
    pub minimum_orders_count: Option<i64>,
    pub minimum_lifetime_value: Option<Money>,

    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    /// 0 = Sunday … 6 = Saturday. Empty means every day.
    pub days_of_week: Vec<u8>,
    /// UTC hour window `[hour_start, hour_end)`; applies only when both are set.
    pub hour_start: Option<u8>,
    pub hour_end: Option<u8>,
}

impl DiscountRule {
    /// A rule with no restrictions beyond its kind.
    pub fn new(store_id: impl Into<String>, code: impl Into<String>, kind: DiscountKind) -> Self {
        DiscountRule {
            id: String::new(),
            store_id: store_id.into(),
            code: code.into(),
            kind,
            is_active: true,
            minimum_order_amount: None,
            maximum_order_amount: None,
            minimum_quantity: None,
            maximum_quantity: None,
            usage_limit: None,
            usage_count: 0,
            applies_to: AppliesTo::All,
            product_ids: Vec::new(),
            collection_ids: Vec::new(),
            tag_names: Vec::new(),
            customer_segment: None,
            minimum_orders_count: None,
            minimum_lifetime_value: None,
            starts_at: None,
            ends_at: None,
            days_of_week: Vec::new(),
            hour_start: None,
            hour_end: None,
        }
    }
}

// =============================================================================
// Calculation Output
// =============================================================================

/// Machine-readable reason a requested code did not apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    NotFound,
    NotYetActive,
    Expired,
    UsageLimitReached,
    OutsideSchedule,
    CustomerNotEligible,
    InsufficientOrderHistory,
    InsufficientLifetimeValue,
    BelowMinimumOrder,
    AboveMaximumOrder,
    BelowMinimumQuantity,
    AboveMaximumQuantity,
    NoEligibleItems,
    NoDiscountEarned,
}

/// A requested code that did not apply, with the shopper-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RejectedDiscount {
    pub code: String,
    pub reason: RejectionReason,
    pub message: String,
}

/// The code that applied and what it was worth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AppliedDiscount {
    pub code: String,
    pub discount_type: DiscountType,
    /// Merchandise discount. Shipping waived is reported separately.
    pub amount: Money,
    pub description: String,
}

/// Per-line prices after the discount was spread across eligible lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LineBreakdown {
    pub variant_id: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
    pub line_discount: Money,
    pub line_total_after_discount: Money,
}

/// Fully resolved price breakdown for one cart.
///
/// ## Invariants
/// - `subtotal` = Σ `unit_price × quantity`
/// - `discount_amount` ≤ `subtotal`
/// - `total` = max(0, `subtotal` − `discount_amount`) + `shipping_amount`
/// - Σ `lines[].line_discount` = `discount_amount`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResult {
    pub subtotal: Money,
    pub discount_amount: Money,
    pub shipping_amount: Money,
    /// Shipping waived by a free-shipping code or threshold.
    pub shipping_discount: Money,
    pub total: Money,
    pub applied_discount_code: Option<String>,
    pub applied_discount: Option<AppliedDiscount>,
    pub errors: Vec<RejectedDiscount>,
    pub lines: Vec<LineBreakdown>,
}

/// Answer to the storefront's "apply coupon" pre-check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DiscountCheck {
    pub code: String,
    pub valid: bool,
    pub reason: Option<RejectionReason>,
    pub message: Option<String>,
    pub discount_type: Option<DiscountType>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_item_deserializes_camel_case_with_defaults() {
        let item: LineItem =
            serde_json::from_str(r#"{"variantId":"v-1","quantity":2,"unitPrice":1500}"#).unwrap();
        assert_eq!(item.variant_id, "v-1");
        assert_eq!(item.quantity, 2);
        assert_eq!(item.unit_price.minor(), 1500);
        assert!(item.product_id.is_none());
        assert!(item.collection_ids.is_empty());
        assert!(item.tags.is_empty());
    }

    #[test]
    fn test_enum_string_forms_round_trip() {
        for applies in [
            AppliesTo::All,
            AppliesTo::SpecificProducts,
            AppliesTo::SpecificCollections,
            AppliesTo::SpecificTags,
        ] {
            assert_eq!(AppliesTo::parse(applies.as_str()), Some(applies));
        }
        assert_eq!(CustomerSegment::parse("vip"), Some(CustomerSegment::Vip));
        assert_eq!(DiscountType::parse("bundle"), None);
    }

    #[test]
    fn test_rejection_reason_wire_form() {
        let json = serde_json::to_string(&RejectionReason::UsageLimitReached).unwrap();
        assert_eq!(json, r#""usage_limit_reached""#);
    }

    #[test]
    fn test_discount_kind_reports_flat_type() {
        let kind = DiscountKind::Volume { tiers: vec![] };
        assert_eq!(kind.discount_type(), DiscountType::Volume);
        assert_eq!(DiscountKind::FreeShipping.discount_type().as_str(), "free_shipping");
    }
}
