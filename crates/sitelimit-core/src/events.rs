use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every observable state transition produces an Event.
/// The CLI prints them; a GUI layer would poll or subscribe to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The countdown began ticking against the budget.
    CountdownStarted {
        time_left: u64,
        at: DateTime<Utc>,
    },
    /// The countdown stopped without exhausting the budget (tab switch,
    /// pause, disable).
    CountdownStopped {
        time_left: u64,
        at: DateTime<Utc>,
    },
    /// A new calendar day began and the budget was re-armed.
    DailyRollover {
        initial_time: u64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        enabled: bool,
        timer_active: bool,
        blocked_today: bool,
        time_left: u64,
        initial_time: u64,
        tracked_sites: BTreeSet<String>,
        /// Whether the one-second tick is currently armed.
        counting: bool,
        at: DateTime<Utc>,
    },
}
