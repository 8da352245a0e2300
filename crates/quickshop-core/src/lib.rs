//! # quickshop-core: Pure Pricing Logic
//!
//! Every storefront cart mutation is priced by [`calculator::calculate`].
//! This crate holds that function and everything it needs, with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Quickshop Pricing Data Flow                         │
//! │                                                                         │
//! │  Storefront ──► POST /api/v1/cart/calculate (pricing-api)              │
//! │                                │                                        │
//! │                                ▼                                        │
//! │           validate ──► store exists? ──► rule lookup (quickshop-db)    │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ quickshop-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌────────────┐  │   │
//! │  │   │   types   │  │   money   │  │ discount  │  │ calculator │  │   │
//! │  │   │ LineItem  │  │   Money   │  │ eligible? │  │ subtotal   │  │   │
//! │  │   │ Discount  │  │ bps math  │  │ amount    │  │ shipping   │  │   │
//! │  │   │  Rule     │  │           │  │ allocate  │  │ total      │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Line items, discount rules, shipping rates, results
//! - [`money`] - Integer money in minor units
//! - [`discount`] - Eligibility checks, discount amounts, line allocation
//! - [`calculator`] - The single-pass cart calculation
//! - [`validation`] - Input checks run before any lookup
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use quickshop_core::calculator::{calculate, CartInput};
//! use quickshop_core::{LineItem, Money};
//!
//! let input = CartInput::new("store-1", vec![LineItem::new("var-1", 2, Money::from_minor(1250))]);
//! let result = calculate(&input, None, Utc::now()).unwrap();
//!
//! assert_eq!(result.subtotal.minor(), 2500);
//! assert_eq!(result.total.minor(), 2500);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod calculator;
pub mod discount;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use calculator::{calculate, CartInput};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of lines in a single cart.
pub const MAX_CART_LINES: usize = 250;

/// Maximum quantity of a single line.
///
/// Keeps `unit_price × quantity` far away from `i64` overflow for any
/// realistic price.
pub const MAX_ITEM_QUANTITY: i64 = 10_000;

/// Maximum length of a discount code after trimming.
pub const MAX_DISCOUNT_CODE_LEN: usize = 64;

/// Maximum length of a store identifier.
pub const MAX_STORE_ID_LEN: usize = 64;
