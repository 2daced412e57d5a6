use clap::Subcommand;
use sitelimit_core::domain::normalize_site;
use sitelimit_core::{Database, SettingsUpdate, StateStore};

use super::load_current;

#[derive(Subcommand)]
pub enum SitesAction {
    /// Track a site (URL or bare host)
    Add { site: String },
    /// Stop tracking a site
    Remove { site: String },
    /// List tracked sites
    List,
}

pub fn run(action: SitesAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let mut state = load_current(&db)?;

    match action {
        SitesAction::Add { site } => {
            let normalized = normalize_site(&site);
            if normalized.is_empty() {
                return Err(format!("'{site}' has no usable host").into());
            }
            let mut sites: Vec<String> = state.tracked_sites.iter().cloned().collect();
            sites.push(normalized);
            state.apply_update(&SettingsUpdate {
                sites: Some(sites),
                ..SettingsUpdate::default()
            });
            db.save(&state)?;
        }
        SitesAction::Remove { site } => {
            let normalized = normalize_site(&site);
            if !state.tracked_sites.contains(&normalized) {
                return Err(format!("'{site}' is not tracked").into());
            }
            let sites: Vec<String> = state
                .tracked_sites
                .iter()
                .filter(|s| **s != normalized)
                .cloned()
                .collect();
            state.apply_update(&SettingsUpdate {
                sites: Some(sites),
                ..SettingsUpdate::default()
            });
            db.save(&state)?;
        }
        SitesAction::List => {}
    }

    println!("{}", serde_json::to_string_pretty(&state.tracked_sites)?);
    Ok(())
}
