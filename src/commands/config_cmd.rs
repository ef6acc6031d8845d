use anyhow::Result;

use crate::cli::ConfigCommand;
use crate::config::{Config, Overrides, config_path, load_config_or_default, save_config};

pub fn handle_config(command: ConfigCommand, overrides: &Overrides) -> Result<()> {
    match command {
        ConfigCommand::Init => {
            save_config(&Config::default())?;
            println!("Initialized config at {}", config_path()?.display());
        }
        ConfigCommand::Show => {
            let mut cfg = load_config_or_default()?;
            cfg.apply_overrides(overrides);
            println!("{}", toml::to_string_pretty(&redacted(cfg))?);
            println!("Config path: {}", config_path()?.display());
        }
        ConfigCommand::Path => println!("{}", config_path()?.display()),
    }
    Ok(())
}

fn redacted(mut cfg: Config) -> Config {
    if cfg.api_key.is_some() {
        cfg.api_key = Some("********".to_string());
    }
    cfg
}
