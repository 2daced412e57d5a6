//! # Sitelimit Core Library
//!
//! This library provides the core business logic for Sitelimit, a daily
//! time budget over a configurable set of websites. Active viewing of a
//! tracked domain counts down a shared per-day budget; when it runs out,
//! tracked domains are blocked for the rest of the calendar day, and the
//! budget re-arms on the next day's first start.
//!
//! ## Architecture
//!
//! - **Budget Engine**: a countdown state machine that requires the caller
//!   to drive `tick()` -- no internal clock
//! - **Supervisor**: the single event loop that owns the state and
//!   reconciles tab activity, settings updates, and the one-second tick
//! - **Storage**: SQLite-based budget record persistence and TOML-based
//!   configuration
//! - **Platform**: narrow traits for the host's tab and notification
//!   surfaces, supplied by the embedding binary
//!
//! ## Key Components
//!
//! - [`BudgetEngine`]: countdown state machine and run-condition evaluation
//! - [`Supervisor`]: serialized-access boundary and async event loop
//! - [`Database`]: persisted budget record
//! - [`Config`]: application configuration management

pub mod budget;
pub mod domain;
pub mod error;
pub mod events;
pub mod platform;
pub mod simulate;
pub mod storage;
pub mod supervisor;

pub use budget::{decide, BudgetEngine, BudgetState, Decision, SettingsUpdate, TickOutcome};
pub use error::{ConfigError, CoreError, StoreError};
pub use events::Event;
pub use platform::{LoadStatus, Notifier, Tab, TabEvent, TabId, TabPlatform};
pub use storage::{Config, Database, MemoryStore, StateStore};
pub use supervisor::{Supervisor, SupervisorHandle};
