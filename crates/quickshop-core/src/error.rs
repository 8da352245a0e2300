//! # Error Types
//!
//! Domain-specific error types for quickshop-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  quickshop-core (this file)                                            │
//! │  ├── CoreError        - Fatal calculation failures                     │
//! │  └── ValidationError  - Malformed input (client error, never retried)  │
//! │                                                                         │
//! │  quickshop-core::discount                                              │
//! │  └── DiscountRejection - NOT an error path: recorded in result.errors  │
//! │                                                                         │
//! │  quickshop-db                                                          │
//! │  └── DbError          - Lookup failures                                │
//! │                                                                         │
//! │  pricing-api                                                           │
//! │  └── ApiError         - Status code + JSON body                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Errors that abort a calculation.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Too many entries in a list.
    #[error("{field} cannot have more than {max} entries")]
    TooMany { field: String, max: usize },

    /// The store does not exist or is not active.
    #[error("Store not found: {store_id}")]
    UnknownStore { store_id: String },

    /// Amounts too large to represent.
    #[error("{field} is too large")]
    Overflow { field: String },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub fn overflow(field: impl Into<String>) -> Self {
        ValidationError::Overflow {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(ValidationError::required("items").to_string(), "items is required");

        let err = ValidationError::OutOfRange {
            field: "items[0].quantity".to_string(),
            min: 1,
            max: 10_000,
        };
        assert_eq!(err.to_string(), "items[0].quantity must be between 1 and 10000");

        let err = ValidationError::UnknownStore {
            store_id: "store-x".to_string(),
        };
        assert_eq!(err.to_string(), "Store not found: store-x");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("storeId").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.to_string(), "Validation error: storeId is required");
    }
}
