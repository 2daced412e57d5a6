//! Countdown engine.
//!
//! The engine is a state machine with no internal clock: the caller owns the
//! one-second tick source and drives `tick()`, the same way the supervisor's
//! event loop does. `reevaluate()` decides whether that tick source should be
//! armed at all; both it and `tick()` derive everything from fresh state, so
//! a tick that fires after the run condition lapsed is ignored rather than
//! consuming budget.

use chrono::{NaiveDate, Utc};

use super::reset::apply_daily_reset;
use super::state::{decide, BudgetState, Decision, SettingsUpdate};
use crate::events::Event;

/// Result of one tick of the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// One second consumed; remaining budget attached.
    Decremented(u64),
    /// The budget just hit zero. Blocking state is already latched.
    Exhausted,
    /// The run condition no longer held; nothing was consumed.
    Ignored,
}

/// Owns the budget aggregate plus the process-local countdown bookkeeping:
/// which tracked domain the foreground tab shows, and whether the tick
/// source is armed.
#[derive(Debug, Clone)]
pub struct BudgetEngine {
    state: BudgetState,
    foreground: Option<String>,
    counting: bool,
}

impl BudgetEngine {
    pub fn new(state: BudgetState) -> Self {
        Self {
            state,
            foreground: None,
            counting: false,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &BudgetState {
        &self.state
    }

    /// Normalized domain of the foreground tab, if it resolved to one.
    pub fn foreground(&self) -> Option<&str> {
        self.foreground.as_deref()
    }

    /// Whether the one-second tick source should currently be scheduled.
    pub fn counting(&self) -> bool {
        self.counting
    }

    /// Evaluate the run/block condition against fresh state.
    pub fn decision(&self) -> Decision {
        decide(&self.state, self.foreground())
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            enabled: self.state.enabled,
            timer_active: self.state.timer_active,
            blocked_today: self.state.blocked_today,
            time_left: self.state.time_left,
            initial_time: self.state.initial_time,
            tracked_sites: self.state.tracked_sites.clone(),
            counting: self.counting,
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Record what the foreground tab currently shows. `None` means the
    /// focused tab is unknown or has no usable host.
    pub fn set_foreground(&mut self, domain: Option<String>) {
        self.foreground = domain.filter(|d| !d.is_empty());
    }

    /// Merge a settings update. Returns whether the site set changed.
    ///
    /// The caller still owes a `reevaluate()` afterwards; the merge itself
    /// never starts or stops the countdown.
    pub fn apply_settings(&mut self, update: &SettingsUpdate) -> bool {
        self.state.apply_update(update)
    }

    /// Run the daily reset against `today`. Returns the rollover event when
    /// one happened; the caller persists immediately in that case.
    pub fn reset_for_day(&mut self, today: NaiveDate) -> Option<Event> {
        if apply_daily_reset(&mut self.state, today) {
            Some(Event::DailyRollover {
                initial_time: self.state.initial_time,
                at: Utc::now(),
            })
        } else {
            None
        }
    }

    /// Reconcile the armed flag with the run condition. Idempotent: arming
    /// an armed countdown or stopping a stopped one is a no-op, and the
    /// returned event marks an actual edge.
    pub fn reevaluate(&mut self) -> Option<Event> {
        let should_run = self.decision().should_run;
        match (self.counting, should_run) {
            (false, true) => {
                self.counting = true;
                Some(Event::CountdownStarted {
                    time_left: self.state.time_left,
                    at: Utc::now(),
                })
            }
            (true, false) => {
                self.counting = false;
                Some(Event::CountdownStopped {
                    time_left: self.state.time_left,
                    at: Utc::now(),
                })
            }
            _ => None,
        }
    }

    /// Consume one second of budget, if the run condition still holds.
    ///
    /// The condition is re-checked here because the tick was scheduled in
    /// the past: a settings update or tab switch may have landed since. A
    /// stale tick disarms the countdown and consumes nothing.
    ///
    /// On exhaustion the whole transition latches at once: `blocked_today`
    /// set, intent cleared, budget zeroed, countdown disarmed. No observer
    /// ever sees `time_left == 0` with `blocked_today` still false.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.decision().should_run {
            self.counting = false;
            return TickOutcome::Ignored;
        }

        self.state.time_left = self.state.time_left.saturating_sub(1);
        if self.state.time_left == 0 {
            self.state.blocked_today = true;
            self.state.timer_active = false;
            self.counting = false;
            return TickOutcome::Exhausted;
        }
        TickOutcome::Decremented(self.state.time_left)
    }
}
