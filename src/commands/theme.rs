use anyhow::Result;
use colored::Colorize;

use crate::auth::storage;
use crate::commands::explain;
use crate::config::Config;
use crate::preferences::{Preferences, Theme};

/// Print the stored theme
pub fn get(config: &Config) -> Result<()> {
    let prefs = Preferences::new(storage::from_config(&config.storage)?);
    println!("{}", prefs.theme()?);
    Ok(())
}

/// Store a theme
pub fn set(config: &Config, theme: &str) -> Result<()> {
    let theme: Theme = theme.parse().map_err(explain)?;
    let prefs = Preferences::new(storage::from_config(&config.storage)?);
    prefs.set_theme(theme)?;
    println!("{} {}", "Theme set to".green(), theme.to_string().cyan());
    Ok(())
}
