//! # tally-session: Console Session Orchestration
//!
//! The async layer one console surface (register, back office, dashboard)
//! runs on. It reaches the store only through the tally-core contracts.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Console Session                                  │
//! │                                                                         │
//! │   SaleDraft (tally-core, sync)                                          │
//! │        │ submit                                                         │
//! │        ▼                                                                │
//! │   ┌──────────────────────┐   ┌──────────────────────┐                  │
//! │   │ SaleLifecycleManager │   │ ChangeFeedSubscriber │◄── ChangeFeed    │
//! │   │ one call per action  │   │ working set, edit    │    subscription  │
//! │   │ in-flight guard      │   │ session tokens       │                  │
//! │   └──────────┬───────────┘   └──────────┬───────────┘                  │
//! │              │                          │        ┌──────────────────┐  │
//! │              │                          │        │ DashboardService │  │
//! │              │                          │        └────────┬─────────┘  │
//! │              └──────────────┬───────────┴─────────────────┘            │
//! │                             ▼                                           │
//! │                  TransactionGateway (tally-db)                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`console`] - One configured session over a SQLite store
//! - [`manager`] - Sale Lifecycle Manager
//! - [`subscriber`] - Change Feed Subscriber and edit sessions
//! - [`dashboard`] - Report assembly over the Aggregation Engine
//! - [`config`] - Console configuration (TOML + environment)
//! - [`error`] - Session error types

pub mod config;
pub mod console;
pub mod dashboard;
pub mod error;
pub mod manager;
pub mod subscriber;

pub use config::{ConsoleConfig, DashboardSettings};
pub use console::Console;
pub use dashboard::{DashboardReport, DashboardService, ReportPeriod};
pub use error::{SaleOperation, SessionError, SessionResult};
pub use manager::SaleLifecycleManager;
pub use subscriber::{
    ApplyOutcome, ChangeFeedSubscriber, EditSessionToken, SubscriberHandle,
    DEFAULT_WORKING_SET_LIMIT,
};
