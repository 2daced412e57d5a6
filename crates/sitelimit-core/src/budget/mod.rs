mod engine;
mod reset;
mod state;

pub use engine::{BudgetEngine, TickOutcome};
pub use reset::apply_daily_reset;
pub use state::{decide, BudgetState, Decision, SettingsUpdate, StoredState};
