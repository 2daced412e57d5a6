use clap::Subcommand;
use sitelimit_core::SettingsUpdate;

use super::apply_and_print;

#[derive(Subcommand)]
pub enum BudgetAction {
    /// Set the daily budget and restore today's remaining time to it
    Set {
        /// Budget in seconds
        value: u64,
        /// Interpret the value as minutes
        #[arg(long)]
        minutes: bool,
    },
}

pub fn run(action: BudgetAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        BudgetAction::Set { value, minutes } => {
            let seconds = if minutes { value * 60 } else { value };
            apply_and_print(SettingsUpdate {
                initial_time: Some(seconds),
                time_left: Some(seconds),
                ..SettingsUpdate::default()
            })
        }
    }
}
