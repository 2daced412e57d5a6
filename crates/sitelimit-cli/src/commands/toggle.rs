use sitelimit_core::SettingsUpdate;

use super::apply_and_print;

pub fn run(enabled: bool) -> Result<(), Box<dyn std::error::Error>> {
    apply_and_print(SettingsUpdate {
        enabled: Some(enabled),
        ..SettingsUpdate::default()
    })
}
