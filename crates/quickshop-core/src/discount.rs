//! # Discount Engine
//!
//! Decides whether a discount rule applies to a cart and, if so, what it is
//! worth per line.
//!
//! ## Evaluation Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  First failing gate wins; its reason is reported to the shopper.       │
//! │                                                                         │
//! │   1. rule exists, active, same store ........... NotFound              │
//! │   2. starts_at ≤ now ≤ ends_at ................. NotYetActive/Expired  │
//! │   3. usage_count < usage_limit ................. UsageLimitReached     │
//! │   4. day-of-week / hour window ................. OutsideSchedule       │
//! │   5. customer segment / history / value ........ CustomerNotEligible…  │
//! │   6. min ≤ subtotal ≤ max ...................... Below/AboveMinimum…  │
//! │   7. min ≤ quantity ≤ max ...................... Below/AboveQuantity   │
//! │   8. some line matches applies_to .............. NoEligibleItems       │
//! │   9. rule earns something ...................... NoDiscountEarned      │
//! │                                                                         │
//! │  Gates 1–6 need no cart lines, so the coupon pre-check reuses them.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Allocation
//! Percentage, fixed and volume discounts are spread across the eligible
//! lines in proportion to their line totals (largest remainder, so the line
//! discounts always add up to the whole). BOGO discounts land on the units
//! that earned them.

use chrono::{DateTime, Datelike, Timelike, Utc};
use thiserror::Error;

use crate::money::{Money, BPS_SCALE};
use crate::types::{
    AppliesTo, Benefit, BogoOffer, BogoReward, CustomerContext, CustomerSegment, DiscountKind,
    DiscountRule, DiscountType, LineItem, RejectedDiscount, RejectionReason, VolumeTier,
};

// =============================================================================
// Rejections
// =============================================================================

/// Why a requested code does not apply.
///
/// Not fatal: the calculation still completes and the rejection is recorded
/// in `CalculationResult::errors`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiscountRejection {
    #[error("Discount code not found or not active")]
    NotFound,

    #[error("Discount code is not active yet")]
    NotYetActive { starts_at: DateTime<Utc> },

    #[error("Discount code has expired")]
    Expired { ended_at: DateTime<Utc> },

    #[error("Discount code usage limit reached")]
    UsageLimitReached { limit: i64 },

    #[error("Discount code is not valid at this time")]
    OutsideSchedule,

    #[error("Discount code is not available for this customer")]
    CustomerNotEligible,

    #[error("Discount code requires at least {required} previous orders")]
    InsufficientOrderHistory { required: i64 },

    #[error("Discount code requires lifetime spend of at least {required}")]
    InsufficientLifetimeValue { required: Money },

    #[error("Minimum order amount of {minimum} not reached")]
    BelowMinimumOrder { minimum: Money },

    #[error("Order amount exceeds the maximum of {maximum} for this code")]
    AboveMaximumOrder { maximum: Money },

    #[error("At least {minimum} items are required for this code")]
    BelowMinimumQuantity { minimum: i64 },

    #[error("At most {maximum} items are allowed for this code")]
    AboveMaximumQuantity { maximum: i64 },

    #[error("Discount code does not apply to items in the cart")]
    NoEligibleItems,

    #[error("Cart does not earn a discount with this code")]
    NoDiscountEarned,
}

impl DiscountRejection {
    pub fn reason(&self) -> RejectionReason {
        match self {
            DiscountRejection::NotFound => RejectionReason::NotFound,
            DiscountRejection::NotYetActive { .. } => RejectionReason::NotYetActive,
            DiscountRejection::Expired { .. } => RejectionReason::Expired,
            DiscountRejection::UsageLimitReached { .. } => RejectionReason::UsageLimitReached,
            DiscountRejection::OutsideSchedule => RejectionReason::OutsideSchedule,
            DiscountRejection::CustomerNotEligible => RejectionReason::CustomerNotEligible,
            DiscountRejection::InsufficientOrderHistory { .. } => {
                RejectionReason::InsufficientOrderHistory
            }
            DiscountRejection::InsufficientLifetimeValue { .. } => {
                RejectionReason::InsufficientLifetimeValue
            }
            DiscountRejection::BelowMinimumOrder { .. } => RejectionReason::BelowMinimumOrder,
            DiscountRejection::AboveMaximumOrder { .. } => RejectionReason::AboveMaximumOrder,
            DiscountRejection::BelowMinimumQuantity { .. } => RejectionReason::BelowMinimumQuantity,
            DiscountRejection::AboveMaximumQuantity { .. } => RejectionReason::AboveMaximumQuantity,
            DiscountRejection::NoEligibleItems => RejectionReason::NoEligibleItems,
            DiscountRejection::NoDiscountEarned => RejectionReason::NoDiscountEarned,
        }
    }

    pub fn into_rejected(self, code: impl Into<String>) -> RejectedDiscount {
        RejectedDiscount {
            code: code.into(),
            reason: self.reason(),
            message: self.to_string(),
        }
    }
}

// =============================================================================
// Outcome
// =============================================================================

/// An accepted rule and what it is worth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscountOutcome {
    pub discount_type: DiscountType,
    /// Merchandise discount, equal to the sum of `line_discounts`.
    pub amount: Money,
    /// One entry per cart line, zero for ineligible lines.
    pub line_discounts: Vec<Money>,
    pub free_shipping: bool,
    pub description: String,
}

// =============================================================================
// Gates
// =============================================================================

/// Runs the gates that need no cart lines (1–6).
///
/// `subtotal` is the pre-discount merchandise total.
pub fn check_rule_gates<'r>(
    rule: Option<&'r DiscountRule>,
    store_id: &str,
    subtotal: Money,
    customer: Option<&CustomerContext>,
    now: DateTime<Utc>,
) -> Result<&'r DiscountRule, DiscountRejection> {
    let rule = match rule {
        Some(rule) if rule.is_active && rule.store_id == store_id => rule,
        _ => return Err(DiscountRejection::NotFound),
    };

    check_window(rule, now)?;
    check_usage(rule)?;
    check_schedule(rule, now)?;
    check_customer(rule, customer)?;
    check_order_amount(rule, subtotal)?;

    Ok(rule)
}

fn check_window(rule: &DiscountRule, now: DateTime<Utc>) -> Result<(), DiscountRejection> {
    if let Some(starts_at) = rule.starts_at {
        if starts_at > now {
            return Err(DiscountRejection::NotYetActive { starts_at });
        }
    }
    if let Some(ended_at) = rule.ends_at {
        if ended_at < now {
            return Err(DiscountRejection::Expired { ended_at });
        }
    }
    Ok(())
}

fn check_usage(rule: &DiscountRule) -> Result<(), DiscountRejection> {
    match rule.usage_limit {
        Some(limit) if rule.usage_count >= limit => {
            Err(DiscountRejection::UsageLimitReached { limit })
        }
        _ => Ok(()),
    }
}

fn check_schedule(rule: &DiscountRule, now: DateTime<Utc>) -> Result<(), DiscountRejection> {
    let weekday = now.weekday().num_days_from_sunday() as u8;
    if !rule.days_of_week.is_empty() && !rule.days_of_week.contains(&weekday) {
        return Err(DiscountRejection::OutsideSchedule);
    }

    if let (Some(start), Some(end)) = (rule.hour_start, rule.hour_end) {
        let hour = now.hour() as u8;
        if hour < start || hour >= end {
            return Err(DiscountRejection::OutsideSchedule);
        }
    }
    Ok(())
}

fn check_customer(
    rule: &DiscountRule,
    customer: Option<&CustomerContext>,
) -> Result<(), DiscountRejection> {
    if let Some(required) = rule.customer_segment.filter(|s| *s != CustomerSegment::All) {
        let segment = customer.and_then(|c| c.segment);
        if segment != Some(required) {
            return Err(DiscountRejection::CustomerNotEligible);
        }
    }

    if let Some(required) = rule.minimum_orders_count.filter(|n| *n > 0) {
        let orders = customer.map(|c| c.orders_count).unwrap_or(0);
        if orders < required {
            return Err(DiscountRejection::InsufficientOrderHistory { required });
        }
    }

    if let Some(required) = rule.minimum_lifetime_value.filter(Money::is_positive) {
        let value = customer.map(|c| c.lifetime_value).unwrap_or_default();
        if value < required {
            return Err(DiscountRejection::InsufficientLifetimeValue { required });
        }
    }
    Ok(())
}

fn check_order_amount(rule: &DiscountRule, subtotal: Money) -> Result<(), DiscountRejection> {
    if let Some(minimum) = rule.minimum_order_amount {
        if subtotal < minimum {
            return Err(DiscountRejection::BelowMinimumOrder { minimum });
        }
    }
    if let Some(maximum) = rule.maximum_order_amount {
        if subtotal > maximum {
            return Err(DiscountRejection::AboveMaximumOrder { maximum });
        }
    }
    Ok(())
}

fn check_quantity(rule: &DiscountRule, total_quantity: i64) -> Result<(), DiscountRejection> {
    if let Some(minimum) = rule.minimum_quantity {
        if total_quantity < minimum {
            return Err(DiscountRejection::BelowMinimumQuantity { minimum });
        }
    }
    if let Some(maximum) = rule.maximum_quantity {
        if total_quantity > maximum {
            return Err(DiscountRejection::AboveMaximumQuantity { maximum });
        }
    }
    Ok(())
}

/// Whether a single line falls under the rule's `applies_to` restriction.
pub fn is_line_eligible(rule: &DiscountRule, item: &LineItem) -> bool {
    match rule.applies_to {
        AppliesTo::All => true,
        AppliesTo::SpecificProducts => item
            .product_id
            .as_ref()
            .is_some_and(|id| rule.product_ids.contains(id)),
        AppliesTo::SpecificCollections => item
            .collection_ids
            .iter()
            .any(|id| rule.collection_ids.contains(id)),
        AppliesTo::SpecificTags => item.tags.iter().any(|tag| rule.tag_names.contains(tag)),
    }
}

// =============================================================================
// Evaluation
// =============================================================================

/// Evaluates a rule against a cart.
///
/// `line_totals[i]` must be `items[i].unit_price × items[i].quantity` and
/// `subtotal` their sum; the calculator computes both with overflow checks.
pub fn evaluate(
    rule: Option<&DiscountRule>,
    store_id: &str,
    items: &[LineItem],
    line_totals: &[Money],
    subtotal: Money,
    customer: Option<&CustomerContext>,
    now: DateTime<Utc>,
) -> Result<DiscountOutcome, DiscountRejection> {
    let rule = check_rule_gates(rule, store_id, subtotal, customer, now)?;

    let total_quantity: i64 = items.iter().map(|i| i.quantity).sum();
    check_quantity(rule, total_quantity)?;

    let eligible: Vec<usize> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| is_line_eligible(rule, item))
        .map(|(index, _)| index)
        .collect();
    if eligible.is_empty() {
        return Err(DiscountRejection::NoEligibleItems);
    }

    let eligible_total: Money = eligible.iter().map(|&i| line_totals[i]).sum();
    let eligible_quantity: i64 = eligible.iter().map(|&i| items[i].quantity).sum();

    let (line_discounts, description) = match &rule.kind {
        DiscountKind::Percentage { bps } => {
            let amount = eligible_total.percentage(clamp_bps(*bps));
            (
                allocate(amount, &eligible, line_totals),
                format!("{} off", format_bps(*bps)),
            )
        }
        DiscountKind::FixedAmount { amount } => {
            let amount = amount.non_negative().min(eligible_total);
            (
                allocate(amount, &eligible, line_totals),
                format!("{} off", amount),
            )
        }
        DiscountKind::FreeShipping => (vec![Money::zero(); items.len()], "Free shipping".to_string()),
        DiscountKind::Bogo(offer) => (bogo_discounts(offer, items, &eligible), describe_bogo(offer)),
        DiscountKind::Volume { tiers } => match volume_tier(tiers, eligible_quantity) {
            Some(tier) => {
                let amount = benefit_amount(tier.benefit, eligible_total);
                (
                    allocate(amount, &eligible, line_totals),
                    format!(
                        "{} off {}+ items",
                        describe_benefit(tier.benefit),
                        tier.min_quantity
                    ),
                )
            }
            None => (vec![Money::zero(); items.len()], String::new()),
        },
    };

    let amount: Money = line_discounts.iter().copied().sum();
    let free_shipping = matches!(rule.kind, DiscountKind::FreeShipping);

    if amount.is_zero() && !free_shipping {
        return Err(DiscountRejection::NoDiscountEarned);
    }

    Ok(DiscountOutcome {
        discount_type: rule.kind.discount_type(),
        amount,
        line_discounts,
        free_shipping,
        description,
    })
}

// =============================================================================
// Amounts
// =============================================================================

fn clamp_bps(bps: u32) -> u32 {
    bps.min(BPS_SCALE)
}

fn benefit_amount(benefit: Benefit, base: Money) -> Money {
    match benefit {
        Benefit::Percentage { bps } => base.percentage(clamp_bps(bps)),
        Benefit::FixedAmount { amount } => amount.non_negative().min(base),
    }
}

/// Highest tier whose threshold the quantity reaches.
fn volume_tier(tiers: &[VolumeTier], quantity: i64) -> Option<&VolumeTier> {
    tiers
        .iter()
        .filter(|tier| quantity >= tier.min_quantity)
        .max_by_key(|tier| tier.min_quantity)
}

fn bogo_unit_discount(reward: BogoReward, unit_price: Money) -> Money {
    match reward {
        BogoReward::Free => unit_price,
        BogoReward::Percentage { bps } => unit_price.percentage(clamp_bps(bps)),
        BogoReward::FixedAmount { amount } => amount.non_negative().min(unit_price),
    }
}

/// Per-line BOGO discounts.
///
/// Every `buy + get` units form one bundle; each bundle rewards `get` units.
/// Across products, the cheapest eligible units are the rewarded ones.
fn bogo_discounts(offer: &BogoOffer, items: &[LineItem], eligible: &[usize]) -> Vec<Money> {
    let mut discounts = vec![Money::zero(); items.len()];
    // A bundle needs at least one paid unit.
    if offer.buy_quantity == 0 || offer.get_quantity == 0 {
        return discounts;
    }
    let bundle = offer.buy_quantity as i64 + offer.get_quantity as i64;

    if offer.same_product {
        for &index in eligible {
            let item = &items[index];
            let rewarded = (item.quantity / bundle) * offer.get_quantity as i64;
            let per_unit = bogo_unit_discount(offer.reward, item.unit_price);
            discounts[index] = Money::from_minor(per_unit.minor() * rewarded);
        }
        return discounts;
    }

    let pooled: i64 = eligible.iter().map(|&i| items[i].quantity).sum();
    let mut remaining = (pooled / bundle) * offer.get_quantity as i64;

    let mut cheapest_first = eligible.to_vec();
    cheapest_first.sort_by_key(|&i| (items[i].unit_price, i));

    for index in cheapest_first {
        if remaining == 0 {
            break;
        }
        let item = &items[index];
        let rewarded = item.quantity.min(remaining);
        let per_unit = bogo_unit_discount(offer.reward, item.unit_price);
        discounts[index] = Money::from_minor(per_unit.minor() * rewarded);
        remaining -= rewarded;
    }
    discounts
}

/// Splits `amount` across `eligible` lines in proportion to their totals.
///
/// Largest-remainder: each line gets the floor of its exact share, then the
/// leftover minor units go to the lines with the largest fractional parts
/// (earlier lines first on ties). The result sums to `amount` exactly.
pub fn allocate(amount: Money, eligible: &[usize], line_totals: &[Money]) -> Vec<Money> {
    let mut shares = vec![Money::zero(); line_totals.len()];
    let weight_total: i128 = eligible.iter().map(|&i| line_totals[i].minor() as i128).sum();
    if weight_total <= 0 || amount.is_zero() {
        return shares;
    }

    let amount_minor = amount.minor() as i128;
    let mut remainders: Vec<(i128, usize)> = Vec::with_capacity(eligible.len());
    let mut assigned: i128 = 0;

    for &index in eligible {
        let exact = amount_minor * line_totals[index].minor() as i128;
        let floor = exact / weight_total;
        shares[index] = Money::from_minor(floor as i64);
        assigned += floor;
        remainders.push((exact % weight_total, index));
    }

    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    let leftover = (amount_minor - assigned) as usize;
    for &(_, index) in remainders.iter().take(leftover) {
        shares[index] += Money::from_minor(1);
    }
    shares
}

// =============================================================================
// Descriptions
// =============================================================================

/// `1000` → `"10%"`, `1250` → `"12.5%"`.
fn format_bps(bps: u32) -> String {
    let whole = bps / 100;
    let frac = bps % 100;
    if frac == 0 {
        format!("{whole}%")
    } else if frac % 10 == 0 {
        format!("{whole}.{}%", frac / 10)
    } else {
        format!("{whole}.{frac:02}%")
    }
}

fn describe_benefit(benefit: Benefit) -> String {
    match benefit {
        Benefit::Percentage { bps } => format_bps(bps),
        Benefit::FixedAmount { amount } => amount.to_string(),
    }
}

fn describe_bogo(offer: &BogoOffer) -> String {
    let reward = match offer.reward {
        BogoReward::Free => "free".to_string(),
        BogoReward::Percentage { bps } => format!("{} off", format_bps(bps)),
        BogoReward::FixedAmount { amount } => format!("{amount} off"),
    };
    format!("Buy {} get {} {}", offer.buy_quantity, offer.get_quantity, reward)
}

// =============================================================================
// Unit Tests
// =============================================================================
