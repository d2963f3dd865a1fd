//! # Repository Module
//!
//! Database access for Tally.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories                                         │
//! │                                                                         │
//! │  Seed binary / tests                 SaleLifecycleManager              │
//! │       │                                    │                            │
//! │       ▼                                    ▼                            │
//! │  ProductRepository                   SqliteGateway                     │
//! │  ├── upsert(&product)                ├── create_sale(&command)         │
//! │  ├── get_by_id(id)                   ├── add_item / update_item        │
//! │  ├── list(&filter)                   ├── remove_item                   │
//! │  └── count(venue)                    ├── transition_status             │
//! │                                      └── get_sale / list_sales         │
//! │       │                                    │                            │
//! │       └──────────────┬─────────────────────┘                            │
//! │                      ▼                                                  │
//! │                SQLite Database                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Catalog seeding and stock snapshots
//! - [`sale::SqliteGateway`] - Atomic sale and stock operations

pub mod product;
pub mod sale;
