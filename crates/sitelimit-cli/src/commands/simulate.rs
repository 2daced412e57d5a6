use std::path::Path;

use sitelimit_core::simulate::{run_scenario, Scenario};

pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    let scenario: Scenario = serde_json::from_str(&raw)?;
    let report = run_scenario(&scenario);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
