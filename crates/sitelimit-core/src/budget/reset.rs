//! Daily reset and carry-over.
//!
//! Runs at process start and is safe to re-run: the second run on the same
//! day is a no-op. On a new day (or first run) the block is lifted, the
//! budget is re-armed from the configured `initial_time` -- falling back to
//! whatever `time_left` carried when no budget was ever configured -- and
//! tracking auto-resumes for enabled users. A user who set a budget
//! yesterday should not have to press start again today.

use chrono::NaiveDate;

use super::state::BudgetState;

/// Apply the daily reset against `today`. Returns whether a rollover
/// happened; callers persist the full record immediately when it did.
pub fn apply_daily_reset(state: &mut BudgetState, today: NaiveDate) -> bool {
    if state.last_reset_date == Some(today) {
        return false;
    }

    state.blocked_today = false;
    let carried = if state.initial_time > 0 {
        state.initial_time
    } else {
        state.time_left
    };
    state.initial_time = carried;
    state.time_left = carried;
    state.timer_active = state.enabled && carried > 0;
    state.last_reset_date = Some(today);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn same_day_is_a_noop() {
        let mut state = BudgetState {
            initial_time: 60,
            time_left: 17,
            timer_active: false,
            blocked_today: true,
            last_reset_date: Some(day("2026-08-06")),
            ..BudgetState::default()
        };
        let before = state.clone();
        assert!(!apply_daily_reset(&mut state, day("2026-08-06")));
        assert_eq!(state, before);
    }

    #[test]
    fn rollover_rearms_budget_and_lifts_block() {
        let mut state = BudgetState {
            initial_time: 60,
            time_left: 0,
            timer_active: false,
            blocked_today: true,
            last_reset_date: Some(day("2026-08-05")),
            ..BudgetState::default()
        };
        assert!(apply_daily_reset(&mut state, day("2026-08-06")));
        assert!(!state.blocked_today);
        assert_eq!(state.time_left, 60);
        assert_eq!(state.initial_time, 60);
        assert!(state.timer_active);
        assert_eq!(state.last_reset_date, Some(day("2026-08-06")));
    }

    #[test]
    fn rollover_carries_time_left_when_no_budget_configured() {
        let mut state = BudgetState {
            initial_time: 0,
            time_left: 45,
            last_reset_date: Some(day("2026-08-05")),
            ..BudgetState::default()
        };
        apply_daily_reset(&mut state, day("2026-08-06"));
        assert_eq!(state.initial_time, 45);
        assert_eq!(state.time_left, 45);
    }

    #[test]
    fn rollover_does_not_autostart_when_disabled_or_zero_budget() {
        let mut disabled = BudgetState {
            enabled: false,
            initial_time: 60,
            last_reset_date: Some(day("2026-08-05")),
            ..BudgetState::default()
        };
        apply_daily_reset(&mut disabled, day("2026-08-06"));
        assert!(!disabled.timer_active);

        let mut empty = BudgetState {
            initial_time: 0,
            time_left: 0,
            last_reset_date: Some(day("2026-08-05")),
            ..BudgetState::default()
        };
        apply_daily_reset(&mut empty, day("2026-08-06"));
        assert!(!empty.timer_active);
    }

    #[test]
    fn first_run_counts_as_rollover() {
        let mut state = BudgetState::default();
        assert!(apply_daily_reset(&mut state, day("2026-08-06")));
        assert_eq!(state.last_reset_date, Some(day("2026-08-06")));
    }

    proptest! {
        // Running the evaluator twice with the same date must equal running
        // it once, for any starting state.
        #[test]
        fn reset_is_idempotent(
            enabled in any::<bool>(),
            initial in 0u64..100_000,
            left in 0u64..100_000,
            active in any::<bool>(),
            blocked in any::<bool>(),
            offset in 0i64..700,
        ) {
            let last = day("2026-08-06").pred_opt().unwrap()
                .checked_sub_days(chrono::Days::new(offset as u64));
            let mut state = BudgetState {
                enabled,
                tracked_sites: BTreeSet::new(),
                initial_time: initial,
                time_left: left,
                timer_active: active,
                blocked_today: blocked,
                last_reset_date: last,
            };
            apply_daily_reset(&mut state, day("2026-08-06"));
            let once = state.clone();
            apply_daily_reset(&mut state, day("2026-08-06"));
            prop_assert_eq!(state, once);
        }

        // A rollover always leaves a coherent new-day record.
        #[test]
        fn rollover_invariants(
            enabled in any::<bool>(),
            initial in 0u64..100_000,
            left in 0u64..100_000,
        ) {
            let mut state = BudgetState {
                enabled,
                initial_time: initial,
                time_left: left,
                timer_active: false,
                blocked_today: true,
                last_reset_date: Some(day("2026-08-05")),
                ..BudgetState::default()
            };
            apply_daily_reset(&mut state, day("2026-08-06"));
            prop_assert!(!state.blocked_today);
            prop_assert_eq!(state.time_left, state.initial_time);
            prop_assert_eq!(state.timer_active, enabled && state.initial_time > 0);
        }
    }
}
