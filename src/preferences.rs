//! Persisted UI preferences
//!
//! Only the theme is stored today, under the durable key `theme`, next to
//! the session tokens but independent of them: signing out keeps it.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::auth::storage::{DurableStorage, THEME_KEY};
use crate::error::{AuthlinkError, Result};

/// Colour theme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    /// Follow the operating system.
    #[default]
    System,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        };
        f.write_str(name)
    }
}

impl FromStr for Theme {
    type Err = AuthlinkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "system" => Ok(Theme::System),
            other => Err(AuthlinkError::field(
                "theme",
                format!("\"{}\" is not a valid choice (light, dark, system).", other),
            )),
        }
    }
}

/// Reads and writes preferences in durable storage.
pub struct Preferences {
    storage: Arc<dyn DurableStorage>,
}

impl Preferences {
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        Self { storage }
    }

    /// Stored theme; [`Theme::System`] when unset or unreadable.
    pub fn theme(&self) -> Result<Theme> {
        match self.storage.get(THEME_KEY)? {
            Some(value) => Ok(value.parse().unwrap_or_else(|_| {
                tracing::warn!("Ignoring unknown stored theme {:?}", value);
                Theme::System
            })),
            None => Ok(Theme::System),
        }
    }

    pub fn set_theme(&self, theme: Theme) -> Result<()> {
        self.storage.set(THEME_KEY, &theme.to_string())
    }
}
