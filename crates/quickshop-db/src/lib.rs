//! # quickshop-db: Discount Rule Store
//!
//! SQLite-backed storage for stores and discount codes, read by the pricing
//! API on every calculation.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Quickshop Pricing Data Flow                         │
//! │                                                                         │
//! │  pricing-api (PricingLookup)                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  quickshop-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────────┐   ┌────────────┐ │   │
//! │  │   │   Database    │    │   Repositories     │   │ Migrations │ │   │
//! │  │   │   (pool.rs)   │◄───│ StoreRepository    │   │ (embedded) │ │   │
//! │  │   │  SqlitePool   │    │ DiscountRepository │   │            │ │   │
//! │  │   └───────────────┘    └────────────────────┘   └────────────┘ │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (DATABASE_PATH)                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool and the [`Database`] handle
//! - [`migrations`] - Embedded schema migrations
//! - [`error`] - Database error types
//! - [`repository`] - Store and discount code repositories
//!
//! ## Usage
//!
//! ```rust,ignore
//! use quickshop_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./quickshop.db")).await?;
//! if db.stores().exists("store-1").await? {
//!     let rule = db.discounts().find_by_code("store-1", "SAVE10").await?;
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::discount::DiscountRepository;
pub use repository::store::{Store, StoreRepository};
