//! # Cart Calculator
//!
//! Single-pass, stateless pricing of one cart.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CartInput + Option<&DiscountRule> + now                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate ──── ValidationError ──► Err (400)                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  subtotal = Σ unit_price × quantity                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  code? ──► discount::evaluate ──► rejected ──► result.errors           │
//! │       │                             │                                   │
//! │       │                          accepted ──► discount_amount, lines    │
//! │       ▼                                                                 │
//! │  shipping = rate.price, or 0 when free shipping applies                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  total = max(0, subtotal − discount) + shipping                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The rule lookup and the clock read happen in the caller. Nothing here
//! touches usage counters: identical inputs give identical results.

use chrono::{DateTime, Utc};

use crate::discount::{self, DiscountOutcome};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{
    AppliedDiscount, CalculationResult, CustomerContext, DiscountCheck, DiscountRule,
    LineBreakdown, LineItem, ShippingRate,
};
use crate::validation::{
    is_lookup_code, normalize_discount_code, validate_items, validate_non_negative,
    validate_shipping_rate, validate_store_id,
};

/// Everything the shopper sent for one calculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartInput {
    pub store_id: String,
    pub items: Vec<LineItem>,
    pub discount_code: Option<String>,
    pub shipping_rate: Option<ShippingRate>,
    pub customer: Option<CustomerContext>,
}

impl CartInput {
    pub fn new(store_id: impl Into<String>, items: Vec<LineItem>) -> Self {
        CartInput {
            store_id: store_id.into(),
            items,
            discount_code: None,
            shipping_rate: None,
            customer: None,
        }
    }

    pub fn with_discount_code(mut self, code: impl Into<String>) -> Self {
        self.discount_code = Some(code.into());
        self
    }

    pub fn with_shipping_rate(mut self, rate: ShippingRate) -> Self {
        self.shipping_rate = Some(rate);
        self
    }

    pub fn with_customer(mut self, customer: CustomerContext) -> Self {
        self.customer = Some(customer);
        self
    }

    /// Runs every check that needs no lookup and returns the normalized code.
    ///
    /// Callers run this before touching the rule store so malformed requests
    /// never reach it.
    pub fn validate(&self) -> CoreResult<Option<String>> {
        validate_store_id(&self.store_id)?;
        validate_items(&self.items)?;
        if let Some(rate) = &self.shipping_rate {
            validate_shipping_rate(rate)?;
        }
        Ok(normalize_discount_code(self.discount_code.as_deref()))
    }
}

// =============================================================================
// Calculation
// =============================================================================

/// Prices a cart.
///
/// `rule` is whatever the rule store returned for the normalized code; it is
/// ignored when the input carries no code. `now` is the evaluation instant
/// for the discount's active window and schedule.
///
/// ## Errors
/// Only `ValidationError`s. A code that does not apply is not an error: it is
/// reported in [`CalculationResult::errors`] and the rest of the price still
/// computes.
///
/// ## Example
/// ```rust
/// use chrono::Utc;
/// use quickshop_core::calculator::{calculate, CartInput};
/// use quickshop_core::{DiscountKind, DiscountRule, LineItem, Money, ShippingRate};
///
/// let input = CartInput::new("store-1", vec![LineItem::new("v-1", 1, Money::from_minor(10_000))])
///     .with_discount_code("save10")
///     .with_shipping_rate(ShippingRate::new("UPS", Money::from_minor(2500)));
/// let rule = DiscountRule::new("store-1", "SAVE10", DiscountKind::Percentage { bps: 1000 });
///
/// let result = calculate(&input, Some(&rule), Utc::now()).unwrap();
/// assert_eq!(result.discount_amount.minor(), 1000);
/// assert_eq!(result.total.minor(), 10_000 - 1000 + 2500);
/// assert_eq!(result.applied_discount_code.as_deref(), Some("SAVE10"));
/// ```
pub fn calculate(
    input: &CartInput,
    rule: Option<&DiscountRule>,
    now: DateTime<Utc>,
) -> CoreResult<CalculationResult> {
    let code = input.validate()?;

    let line_totals = line_totals(&input.items)?;
    let subtotal = line_totals
        .iter()
        .try_fold(Money::zero(), |acc, line| acc.checked_add(*line))
        .ok_or_else(|| ValidationError::overflow("subtotal"))?;

    let mut errors = Vec::new();
    let mut accepted: Option<(String, DiscountOutcome)> = None;

    if let Some(code) = code {
        // A malformed code matches no rule, whatever the caller passed.
        let rule = rule.filter(|_| is_lookup_code(&code));
        match discount::evaluate(
            rule,
            input.store_id.trim(),
            &input.items,
            &line_totals,
            subtotal,
            input.customer.as_ref(),
            now,
        ) {
            Ok(outcome) => accepted = Some((code, outcome)),
            Err(rejection) => errors.push(rejection.into_rejected(code)),
        }
    }

    let line_discounts = match &accepted {
        Some((_, outcome)) => outcome.line_discounts.clone(),
        None => vec![Money::zero(); input.items.len()],
    };
    let discount_amount: Money = line_discounts.iter().copied().sum::<Money>().min(subtotal);

    let base_shipping = input
        .shipping_rate
        .as_ref()
        .map(|rate| rate.price)
        .unwrap_or_default();
    let free_shipping = accepted.as_ref().is_some_and(|(_, o)| o.free_shipping)
        || meets_free_shipping_threshold(input.shipping_rate.as_ref(), subtotal);
    let (shipping_amount, shipping_discount) = if free_shipping {
        (Money::zero(), base_shipping)
    } else {
        (base_shipping, Money::zero())
    };

    let total = (subtotal - discount_amount)
        .non_negative()
        .checked_add(shipping_amount)
        .ok_or_else(|| ValidationError::overflow("total"))?;

    let lines = input
        .items
        .iter()
        .zip(line_totals.iter().zip(line_discounts.iter()))
        .map(|(item, (&line_total, &line_discount))| LineBreakdown {
            variant_id: item.variant_id.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            line_total,
            line_discount,
            line_total_after_discount: line_total - line_discount,
        })
        .collect();

    let (applied_discount_code, applied_discount) = match accepted {
        Some((code, outcome)) => (
            Some(code.clone()),
            Some(AppliedDiscount {
                code,
                discount_type: outcome.discount_type,
                amount: outcome.amount,
                description: outcome.description,
            }),
        ),
        None => (None, None),
    };

    Ok(CalculationResult {
        subtotal,
        discount_amount,
        shipping_amount,
        shipping_discount,
        total,
        applied_discount_code,
        applied_discount,
        errors,
        lines,
    })
}

/// `unit_price × quantity` per line, rejecting amounts that overflow.
fn line_totals(items: &[LineItem]) -> CoreResult<Vec<Money>> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            item.unit_price
                .checked_mul_quantity(item.quantity)
                .ok_or_else(|| CoreError::from(ValidationError::overflow(format!("items[{index}]"))))
        })
        .collect()
}

fn meets_free_shipping_threshold(rate: Option<&ShippingRate>, subtotal: Money) -> bool {
    rate.and_then(|r| r.free_shipping_threshold)
        .is_some_and(|threshold| subtotal >= threshold)
}

// =============================================================================
// Coupon Pre-Check
// =============================================================================

/// Checks whether a code would apply to an order of `subtotal`, without cart
/// lines. Backs the storefront's "apply coupon" button.
///
/// Line-level gates (quantity, applies_to, earned amount) are left to the
/// full calculation.
pub fn check_discount_code(
    store_id: &str,
    code: &str,
    subtotal: Money,
    customer: Option<&CustomerContext>,
    rule: Option<&DiscountRule>,
    now: DateTime<Utc>,
) -> CoreResult<DiscountCheck> {
    validate_store_id(store_id)?;
    validate_non_negative("subtotal", subtotal)?;
    let code = normalize_discount_code(Some(code)).ok_or_else(|| ValidationError::required("code"))?;
    let rule = rule.filter(|_| is_lookup_code(&code));

    let check = match discount::check_rule_gates(rule, store_id.trim(), subtotal, customer, now) {
        Ok(rule) => DiscountCheck {
            code,
            valid: true,
            reason: None,
            message: None,
            discount_type: Some(rule.kind.discount_type()),
        },
        Err(rejection) => DiscountCheck {
            code,
            valid: false,
            reason: Some(rejection.reason()),
            message: Some(rejection.to_string()),
            discount_type: None,
        },
    };
    Ok(check)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DiscountKind, DiscountType, RejectionReason};
    use chrono::TimeZone;

    const STORE: &str = "store-1";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 12, 14, 30, 0).unwrap()
    }

    fn item(variant: &str, qty: i64, price: i64) -> LineItem {
        LineItem::new(variant, qty, Money::from_minor(price))
    }

    fn cart(items: Vec<LineItem>) -> CartInput {
        CartInput::new(STORE, items)
    }

    fn rule(code: &str, kind: DiscountKind) -> DiscountRule {
        DiscountRule::new(STORE, code, kind)
    }

    #[test]
    fn test_subtotal_is_sum_of_line_totals() {
        let input = cart(vec![item("a", 3, 1999), item("b", 1, 450), item("c", 10, 0)]);
        let result = calculate(&input, None, now()).unwrap();

        assert_eq!(result.subtotal.minor(), 3 * 1999 + 450);
        assert_eq!(result.discount_amount, Money::zero());
        assert_eq!(result.shipping_amount, Money::zero());
        assert_eq!(result.total, result.subtotal);
        assert!(result.applied_discount_code.is_none());
        assert!(result.errors.is_empty());
        assert_eq!(result.lines.len(), 3);
        assert_eq!(result.lines[0].line_total.minor(), 5997);
    }

    #[test]
    fn test_percentage_ten_of_one_hundred() {
        let input = cart(vec![item("a", 1, 10_000)]).with_discount_code("TEN");
        let r = rule("TEN", DiscountKind::Percentage { bps: 1000 });
        let result = calculate(&input, Some(&r), now()).unwrap();

        assert_eq!(result.discount_amount.minor(), 1000);
        assert_eq!(result.total.minor(), 9000);
        let applied = result.applied_discount.unwrap();
        assert_eq!(applied.discount_type, DiscountType::Percentage);
        assert_eq!(applied.description, "10% off");
    }

    #[test]
    fn test_fixed_amount_caps_at_subtotal() {
        let input = cart(vec![item("a", 1, 3000)]).with_discount_code("FIFTY");
        let r = rule(
            "FIFTY",
            DiscountKind::FixedAmount {
                amount: Money::from_minor(5000),
            },
        );
        let result = calculate(&input, Some(&r), now()).unwrap();

        assert_eq!(result.discount_amount.minor(), 3000);
        assert_eq!(result.total, Money::zero());
    }

    #[test]
    fn test_free_shipping_code_zeroes_shipping() {
        let input = cart(vec![item("a", 2, 1500)])
            .with_discount_code("SHIPFREE")
            .with_shipping_rate(ShippingRate::new("UPS", Money::from_minor(2500)));
        let r = rule("SHIPFREE", DiscountKind::FreeShipping);
        let result = calculate(&input, Some(&r), now()).unwrap();

        assert_eq!(result.shipping_amount, Money::zero());
        assert_eq!(result.shipping_discount.minor(), 2500);
        assert_eq!(result.discount_amount, Money::zero());
        assert_eq!(result.total.minor(), 3000);
        assert_eq!(result.applied_discount_code.as_deref(), Some("SHIPFREE"));
    }

    #[test]
    fn test_free_shipping_threshold() {
        let mut rate = ShippingRate::new("DHL", Money::from_minor(1800));
        rate.free_shipping_threshold = Some(Money::from_minor(5000));

        let below = cart(vec![item("a", 1, 4999)]).with_shipping_rate(rate.clone());
        let result = calculate(&below, None, now()).unwrap();
        assert_eq!(result.shipping_amount.minor(), 1800);

        let at = cart(vec![item("a", 1, 5000)]).with_shipping_rate(rate);
        let result = calculate(&at, None, now()).unwrap();
        assert_eq!(result.shipping_amount, Money::zero());
        assert_eq!(result.shipping_discount.minor(), 1800);
    }

    #[test]
    fn test_expired_code_rejected_but_price_computes() {
        let input = cart(vec![item("a", 2, 2000)])
            .with_discount_code("old")
            .with_shipping_rate(ShippingRate::new("UPS", Money::from_minor(500)));
        let mut r = rule("OLD", DiscountKind::Percentage { bps: 2000 });
        r.ends_at = Some(now() - chrono::Duration::days(3));

        let result = calculate(&input, Some(&r), now()).unwrap();

        assert!(result.applied_discount_code.is_none());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].code, "OLD");
        assert_eq!(result.errors[0].reason, RejectionReason::Expired);
        assert_eq!(result.subtotal.minor(), 4000);
        assert_eq!(result.shipping_amount.minor(), 500);
        assert_eq!(result.total.minor(), 4500);
    }

    #[test]
    fn test_not_yet_active_code_rejected() {
        let input = cart(vec![item("a", 1, 1000)]).with_discount_code("SOON");
        let mut r = rule("SOON", DiscountKind::Percentage { bps: 2000 });
        r.starts_at = Some(now() + chrono::Duration::hours(1));

        let result = calculate(&input, Some(&r), now()).unwrap();
        assert!(result.applied_discount_code.is_none());
        assert_eq!(result.errors[0].reason, RejectionReason::NotYetActive);
        assert_eq!(result.total.minor(), 1000);
    }

    #[test]
    fn test_unknown_code_reports_not_found() {
        let input = cart(vec![item("a", 1, 1000)]).with_discount_code("NOPE");
        let result = calculate(&input, None, now()).unwrap();

        assert_eq!(result.errors[0].reason, RejectionReason::NotFound);
        assert_eq!(result.errors[0].message, "Discount code not found or not active");
    }

    #[test]
    fn test_malformed_code_is_rejected_not_fatal() {
        let r = rule("SAVE10", DiscountKind::Percentage { bps: 1000 });
        let too_long = "A".repeat(65);
        for code in ["SAVE 10", "SAVE10!", "קיץ20", too_long.as_str()] {
            let input = cart(vec![item("a", 2, 1500)])
                .with_discount_code(code)
                .with_shipping_rate(ShippingRate::new("UPS", Money::from_minor(500)));
            let result = calculate(&input, Some(&r), now()).unwrap();

            assert_eq!(result.subtotal.minor(), 3000);
            assert_eq!(result.shipping_amount.minor(), 500);
            assert_eq!(result.total.minor(), 3500);
            assert!(result.applied_discount_code.is_none());
            assert_eq!(result.errors.len(), 1);
            assert_eq!(result.errors[0].reason, RejectionReason::NotFound);
            assert_eq!(result.errors[0].code, code.to_uppercase());
        }
    }

    #[test]
    fn test_rule_ignored_without_code() {
        let input = cart(vec![item("a", 1, 1000)]);
        let r = rule("TEN", DiscountKind::Percentage { bps: 1000 });
        let result = calculate(&input, Some(&r), now()).unwrap();
        assert!(result.discount_amount.is_zero());
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_blank_code_means_no_code() {
        let input = cart(vec![item("a", 1, 1000)]).with_discount_code("   ");
        let result = calculate(&input, None, now()).unwrap();
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_line_discounts_sum_to_discount_amount() {
        let input = cart(vec![item("a", 1, 999), item("b", 3, 333), item("c", 7, 1)])
            .with_discount_code("ODD");
        let r = rule("ODD", DiscountKind::Percentage { bps: 1717 });
        let result = calculate(&input, Some(&r), now()).unwrap();

        let allocated: Money = result.lines.iter().map(|l| l.line_discount).sum();
        assert_eq!(allocated, result.discount_amount);
        for line in &result.lines {
            assert_eq!(line.line_total_after_discount, line.line_total - line.line_discount);
            assert!(!line.line_total_after_discount.is_negative());
        }
    }

    #[test]
    fn test_identical_inputs_identical_output() {
        let input = cart(vec![item("a", 2, 1234), item("b", 1, 999)])
            .with_discount_code("TEN")
            .with_shipping_rate(ShippingRate::new("UPS", Money::from_minor(700)));
        let r = rule("TEN", DiscountKind::Percentage { bps: 1000 });

        let first = calculate(&input, Some(&r), now()).unwrap();
        let second = calculate(&input, Some(&r), now()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_total_never_negative_and_discount_never_exceeds_subtotal() {
        let kinds = [
            DiscountKind::Percentage { bps: 10_000 },
            DiscountKind::FixedAmount {
                amount: Money::from_minor(i64::MAX / 4),
            },
            DiscountKind::FreeShipping,
        ];
        for kind in kinds {
            let input = cart(vec![item("a", 1, 1), item("b", 2, 0)]).with_discount_code("X");
            let r = rule("X", kind);
            let result = calculate(&input, Some(&r), now()).unwrap();
            assert!(result.discount_amount <= result.subtotal);
            assert!(!result.total.is_negative());
        }
    }

    #[test]
    fn test_validation_errors() {
        let empty = cart(vec![]);
        assert!(matches!(
            calculate(&empty, None, now()),
            Err(CoreError::Validation(ValidationError::Required { .. }))
        ));

        let zero_qty = cart(vec![item("a", 0, 100)]);
        assert!(matches!(
            calculate(&zero_qty, None, now()),
            Err(CoreError::Validation(ValidationError::MustBePositive { .. }))
        ));

        let no_store = CartInput::new("", vec![item("a", 1, 100)]);
        assert!(calculate(&no_store, None, now()).is_err());
    }

    #[test]
    fn test_overflow_is_validation_error() {
        let input = cart(vec![item("a", 10_000, i64::MAX / 1000)]);
        assert!(matches!(
            calculate(&input, None, now()),
            Err(CoreError::Validation(ValidationError::Overflow { .. }))
        ));
    }

    #[test]
    fn test_check_discount_code() {
        let mut r = rule("WELCOME", DiscountKind::Percentage { bps: 1500 });
        r.minimum_order_amount = Some(Money::from_minor(2000));

        let ok = check_discount_code(STORE, "welcome", Money::from_minor(2500), None, Some(&r), now())
            .unwrap();
        assert!(ok.valid);
        assert_eq!(ok.code, "WELCOME");
        assert_eq!(ok.discount_type, Some(DiscountType::Percentage));

        let low = check_discount_code(STORE, "WELCOME", Money::from_minor(1000), None, Some(&r), now())
            .unwrap();
        assert!(!low.valid);
        assert_eq!(low.reason, Some(RejectionReason::BelowMinimumOrder));

        assert!(check_discount_code(STORE, "  ", Money::zero(), None, None, now()).is_err());

        let malformed =
            check_discount_code(STORE, "welcome!", Money::from_minor(2500), None, Some(&r), now())
                .unwrap();
        assert!(!malformed.valid);
        assert_eq!(malformed.code, "WELCOME!");
        assert_eq!(malformed.reason, Some(RejectionReason::NotFound));
    }
}
