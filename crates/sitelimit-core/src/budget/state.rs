//! The shared budget aggregate and the settings merge.
//!
//! `BudgetState` is the single source of truth for the whole system. It is
//! loaded once at startup, owned by the supervisor, mutated in place, and
//! written back to the store as one flat record after every mutation that
//! must survive a restart.
//!
//! Writer discipline: only the countdown engine and the daily reset touch
//! `time_left`/`blocked_today`; the settings merge writes `enabled`,
//! `tracked_sites`, `initial_time`, `timer_active`, and the user-initiated
//! `time_left` override.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::normalize_site;

/// Persisted budget record. Serialized with camelCase keys -- the same flat
/// shape the control surface speaks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BudgetState {
    /// Master on/off switch. Off means no countdown and no enforcement.
    pub enabled: bool,
    /// Domains subject to the budget, stored host-only and normalized.
    pub tracked_sites: BTreeSet<String>,
    /// Budget configured for today, in seconds.
    pub initial_time: u64,
    /// Remaining budget for today, in seconds.
    pub time_left: u64,
    /// Intent that the countdown should run whenever a tracked tab is
    /// foregrounded. Independent of what is actually foregrounded.
    pub timer_active: bool,
    /// Budget exhausted for the current calendar day. Sticky until rollover.
    pub blocked_today: bool,
    /// Local calendar day the daily reset last ran on.
    pub last_reset_date: Option<NaiveDate>,
}

impl Default for BudgetState {
    fn default() -> Self {
        Self {
            enabled: true,
            tracked_sites: BTreeSet::new(),
            initial_time: 0,
            time_left: 0,
            timer_active: false,
            blocked_today: false,
            last_reset_date: None,
        }
    }
}

/// Raw stored record: every field optional, because the store contract only
/// promises that absent keys are missing, not defaulted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredState {
    pub enabled: Option<bool>,
    pub tracked_sites: Option<BTreeSet<String>>,
    pub initial_time: Option<u64>,
    pub time_left: Option<u64>,
    pub timer_active: Option<bool>,
    pub blocked_today: Option<bool>,
    pub last_reset_date: Option<NaiveDate>,
}

/// What the system should currently be doing, derived from fresh state.
///
/// The one pure decision point: every event handler funnels through this
/// instead of re-deriving the run condition ad hoc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// The one-second countdown should be ticking.
    pub should_run: bool,
    /// The foreground tab is on a tracked domain that is blocked today.
    pub should_block: bool,
}

/// Evaluate the run/block condition against the current foreground domain.
///
/// `foreground` is the normalized domain of the focused tab, or `None` when
/// the focused tab is unknown or has no host.
pub fn decide(state: &BudgetState, foreground: Option<&str>) -> Decision {
    let on_tracked = foreground.is_some_and(|d| state.is_tracked(d));
    Decision {
        should_run: state.enabled
            && state.timer_active
            && on_tracked
            && state.time_left > 0
            && !state.blocked_today,
        should_block: state.enabled && state.blocked_today && on_tracked,
    }
}

/// Partial update pushed from the control surface. Absent fields leave the
/// corresponding state untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sites: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_left: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_time: Option<u64>,
}

impl SettingsUpdate {
    /// Decode an update from a loosely typed wire value.
    ///
    /// Fields of the wrong type are skipped, not errors: the rest of the
    /// update still applies. This is the tolerance the control-surface
    /// contract requires, so it is done per field rather than through a
    /// strict typed deserialization of the whole message.
    pub fn from_value(value: &Value) -> Self {
        Self {
            enabled: value.get("enabled").and_then(Value::as_bool),
            timer_active: value.get("timerActive").and_then(Value::as_bool),
            time_left: value.get("timeLeft").and_then(Value::as_u64),
            initial_time: value.get("initialTime").and_then(Value::as_u64),
            sites: value.get("sites").and_then(Value::as_array).map(|entries| {
                entries
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl BudgetState {
    /// Rebuild the aggregate from a raw stored record, applying the load
    /// defaults: `enabled` defaults on, `initial_time` falls back to the
    /// stored `time_left` when zero or absent, `time_left` falls back to
    /// `initial_time`.
    pub fn from_stored(stored: &StoredState) -> Self {
        let stored_initial = stored.initial_time.unwrap_or(0);
        let initial_time = if stored_initial > 0 {
            stored_initial
        } else {
            stored.time_left.unwrap_or(0)
        };
        Self {
            enabled: stored.enabled.unwrap_or(true),
            tracked_sites: stored.tracked_sites.clone().unwrap_or_default(),
            initial_time,
            time_left: stored.time_left.unwrap_or(initial_time),
            timer_active: stored.timer_active.unwrap_or(false),
            blocked_today: stored.blocked_today.unwrap_or(false),
            last_reset_date: stored.last_reset_date,
        }
    }

    /// Whether a normalized domain is subject to the budget.
    pub fn is_tracked(&self, domain: &str) -> bool {
        !domain.is_empty() && self.tracked_sites.contains(domain)
    }

    /// Merge a partial update into the aggregate.
    ///
    /// Site entries are normalized on the way in; empty entries drop out.
    /// Returns whether the tracked-site set changed, which the reconciler
    /// needs for the blocked-day re-scan.
    pub fn apply_update(&mut self, update: &SettingsUpdate) -> bool {
        if let Some(enabled) = update.enabled {
            self.enabled = enabled;
        }
        if let Some(timer_active) = update.timer_active {
            self.timer_active = timer_active;
        }
        if let Some(time_left) = update.time_left {
            self.time_left = time_left;
        }
        if let Some(initial_time) = update.initial_time {
            self.initial_time = initial_time;
        }
        let mut sites_changed = false;
        if let Some(entries) = &update.sites {
            let normalized: BTreeSet<String> = entries
                .iter()
                .map(|entry| normalize_site(entry))
                .filter(|site| !site.is_empty())
                .collect();
            sites_changed = normalized != self.tracked_sites;
            self.tracked_sites = normalized;
        }
        sites_changed
    }
}
