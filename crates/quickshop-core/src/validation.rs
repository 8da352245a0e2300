//! # Validation Module
//!
//! Input checks run before any lookup. Field names in errors use the
//! request's wire names (`storeId`, `items[2].quantity`) so the storefront can
//! point at the offending field.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: JSON deserialization (pricing-api)                           │
//! │  └── Types and shape                                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── storeId present, items non-empty                                  │
//! │  ├── quantity in 1..=MAX_ITEM_QUANTITY, unitPrice ≥ 0                  │
//! │  └── discount code normalized (trim + upper-case, never fails)         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Store existence (needs a lookup, done by the service)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{LineItem, ShippingRate};
use crate::{MAX_CART_LINES, MAX_DISCOUNT_CODE_LEN, MAX_ITEM_QUANTITY, MAX_STORE_ID_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a store identifier.
///
/// ```rust
/// use quickshop_core::validation::validate_store_id;
///
/// assert!(validate_store_id("store-1").is_ok());
/// assert!(validate_store_id("  ").is_err());
/// ```
pub fn validate_store_id(store_id: &str) -> ValidationResult<()> {
    let store_id = store_id.trim();

    if store_id.is_empty() {
        return Err(ValidationError::required("storeId"));
    }

    if store_id.len() > MAX_STORE_ID_LEN {
        return Err(ValidationError::TooLong {
            field: "storeId".to_string(),
            max: MAX_STORE_ID_LEN,
        });
    }

    Ok(())
}

/// Normalizes a discount code for lookup.
///
/// ## Rules
/// - Surrounding whitespace is ignored
/// - Blank means "no code"
/// - Codes are case-insensitive: the result is upper-cased
///
/// Never fails: a code no rule could have is rejected as not found by the
/// calculator, see [`is_lookup_code`].
///
/// ```rust
/// use quickshop_core::validation::normalize_discount_code;
///
/// assert_eq!(normalize_discount_code(Some(" save10 ")), Some("SAVE10".to_string()));
/// assert_eq!(normalize_discount_code(Some("   ")), None);
/// assert_eq!(normalize_discount_code(Some("save 10")), Some("SAVE 10".to_string()));
/// ```
pub fn normalize_discount_code(code: Option<&str>) -> Option<String> {
    match code.map(str::trim) {
        None | Some("") => None,
        Some(code) => Some(code.to_uppercase()),
    }
}

/// Whether a normalized code has the shape of a stored code: at most
/// [`MAX_DISCOUNT_CODE_LEN`] characters of letters, digits, `-` and `_`.
///
/// Codes failing this are never looked up.
pub fn is_lookup_code(code: &str) -> bool {
    code.chars().count() <= MAX_DISCOUNT_CODE_LEN
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity: positive and at most [`MAX_ITEM_QUANTITY`].
pub fn validate_quantity(field: &str, quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    if quantity > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates that an amount is zero or more.
pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates one cart line.
pub fn validate_line_item(index: usize, item: &LineItem) -> ValidationResult<()> {
    if item.variant_id.trim().is_empty() {
        return Err(ValidationError::required(format!("items[{index}].variantId")));
    }
    validate_quantity(&format!("items[{index}].quantity"), item.quantity)?;
    validate_non_negative(&format!("items[{index}].unitPrice"), item.unit_price)?;
    Ok(())
}

/// Validates the whole cart: non-empty, bounded, every line valid.
///
/// ```rust
/// use quickshop_core::validation::validate_items;
/// use quickshop_core::{LineItem, Money};
///
/// assert!(validate_items(&[]).is_err());
/// assert!(validate_items(&[LineItem::new("v-1", 1, Money::from_minor(500))]).is_ok());
/// assert!(validate_items(&[LineItem::new("v-1", 0, Money::from_minor(500))]).is_err());
/// ```
pub fn validate_items(items: &[LineItem]) -> ValidationResult<()> {
    if items.is_empty() {
        return Err(ValidationError::required("items"));
    }

    if items.len() > MAX_CART_LINES {
        return Err(ValidationError::TooMany {
            field: "items".to_string(),
            max: MAX_CART_LINES,
        });
    }

    items
        .iter()
        .enumerate()
        .try_for_each(|(index, item)| validate_line_item(index, item))
}

/// Validates a caller-supplied shipping rate.
pub fn validate_shipping_rate(rate: &ShippingRate) -> ValidationResult<()> {
    validate_non_negative("shippingRate.price", rate.price)?;
    if let Some(threshold) = rate.free_shipping_threshold {
        validate_non_negative("shippingRate.freeShippingThreshold", threshold)?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
