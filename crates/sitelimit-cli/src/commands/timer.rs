use clap::Subcommand;
use sitelimit_core::{BudgetEngine, Database, SettingsUpdate, StateStore};

use super::{apply_and_print, load_current};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start counting whenever a tracked tab is foregrounded
    Start,
    /// Pause counting without touching the remaining budget
    Pause,
    /// Restore today's remaining budget to the configured amount
    Reset,
    /// Print the stored countdown state as a snapshot event
    Status,
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TimerAction::Status => {
            let db = Database::open()?;
            let engine = BudgetEngine::new(load_current(&db)?);
            println!("{}", serde_json::to_string_pretty(&engine.snapshot())?);
            Ok(())
        }
        TimerAction::Start => apply_and_print(SettingsUpdate {
            timer_active: Some(true),
            ..SettingsUpdate::default()
        }),
        TimerAction::Pause => apply_and_print(SettingsUpdate {
            timer_active: Some(false),
            ..SettingsUpdate::default()
        }),
        TimerAction::Reset => {
            let db = Database::open()?;
            let mut state = load_current(&db)?;
            // The explicit user-initiated override; a day's block still
            // stands until rollover.
            state.apply_update(&SettingsUpdate {
                time_left: Some(state.initial_time),
                ..SettingsUpdate::default()
            });
            db.save(&state)?;
            println!("{}", serde_json::to_string_pretty(&state)?);
            Ok(())
        }
    }
}
