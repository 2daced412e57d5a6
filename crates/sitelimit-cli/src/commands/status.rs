use serde::Serialize;
use sitelimit_core::{BudgetState, Database};

use super::{format_hms, load_current};

#[derive(Serialize)]
struct StatusView {
    #[serde(flatten)]
    state: BudgetState,
    remaining: String,
    status: &'static str,
}

fn status_text(state: &BudgetState) -> &'static str {
    if !state.enabled {
        "disabled"
    } else if state.blocked_today {
        "blocked for the rest of today"
    } else if state.timer_active {
        "active"
    } else {
        "paused"
    }
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let state = load_current(&db)?;
    let view = StatusView {
        remaining: format_hms(state.time_left),
        status: status_text(&state),
        state,
    };
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_text_precedence() {
        let mut state = BudgetState::default();
        state.timer_active = true;
        assert_eq!(status_text(&state), "active");

        state.blocked_today = true;
        assert_eq!(status_text(&state), "blocked for the rest of today");

        state.enabled = false;
        assert_eq!(status_text(&state), "disabled");
    }
}
