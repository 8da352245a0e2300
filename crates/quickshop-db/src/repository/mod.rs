//! # Repository Module
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Pricing service                                                        │
//! │       │  db.stores().exists("store-1")                                 │
//! │       │  db.discounts().find_by_code("store-1", "SAVE10")              │
//! │       ▼                                                                 │
//! │  StoreRepository        DiscountRepository                             │
//! │  ├── exists             ├── find_by_code                               │
//! │  ├── get_by_id          ├── insert                                     │
//! │  └── insert             └── redeem (order creation only)               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod discount;
pub mod store;
