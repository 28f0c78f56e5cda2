//! Config command implementation.

use anyhow::Result;

use keylink_core::config::Config;

use super::{ConfigAction, ConfigArgs, GlobalArgs};

/// Run the config command.
pub fn run(global: &GlobalArgs, args: &ConfigArgs) -> Result<()> {
    match args.action {
        ConfigAction::Show => {
            let config = super::load_config(global)?;
            print!("{}", render(&config)?);
        }
        ConfigAction::Path => {
            let path = global.config.clone().unwrap_or_else(Config::config_path);
            println!("{}", path.display());
        }
    }
    Ok(())
}

/// TOML for `config`, with the secret masked.
fn render(config: &Config) -> Result<String> {
    let mut shown = config.clone();
    if shown.links.secret.is_some() {
        shown.links.secret = Some("********".to_string());
    }
    Ok(toml::to_string_pretty(&shown)?)
}
