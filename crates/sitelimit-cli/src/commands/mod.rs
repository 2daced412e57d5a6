pub mod budget;
pub mod config;
pub mod simulate;
pub mod sites;
pub mod status;
pub mod timer;
pub mod toggle;

use chrono::Local;
use sitelimit_core::{BudgetState, Database, SettingsUpdate, StateStore};

/// Load the stored record through the daily-reset view. A rollover found
/// here (first command of a new day) is persisted immediately, the same way
/// the background supervisor would on startup.
pub(crate) fn load_current(db: &Database) -> Result<BudgetState, Box<dyn std::error::Error>> {
    let stored = db.load()?;
    let mut state = BudgetState::from_stored(&stored);
    if sitelimit_core::budget::apply_daily_reset(&mut state, Local::now().date_naive()) {
        db.save(&state)?;
    }
    Ok(state)
}

/// Merge a settings update into the stored record and print the result.
pub(crate) fn apply_and_print(update: SettingsUpdate) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let mut state = load_current(&db)?;
    state.apply_update(&update);
    db.save(&state)?;
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

/// Render seconds as HH:MM:SS.
pub(crate) fn format_hms(seconds: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}
