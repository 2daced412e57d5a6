use clap::Subcommand;
use sitelimit_core::storage::data_dir;
use sitelimit_core::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print a config value by dot-separated key
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// Print the config file path
    Path,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let cfg = Config::load_or_default();
            match cfg.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown config key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut cfg = Config::load()?;
            cfg.set(&key, &value)?;
            println!("{key} = {value}");
        }
        ConfigAction::Path => {
            println!("{}", data_dir()?.join("config.toml").display());
        }
    }
    Ok(())
}
