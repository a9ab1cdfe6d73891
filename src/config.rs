// File: ./src/config.rs
// Handles configuration loading, saving, and defaults.
use crate::paths::AppPaths;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use strum::{Display, EnumIter};

const CONFIG_FILENAME: &str = "config.toml";

/// Detection windows the classifier accepts. Anything else found in a
/// hand-edited file clamps back to the default on load.
pub const VALID_WINDOW_HOURS: [u32; 2] = [24, 48];

fn default_window_hours() -> u32 {
    48
}
fn default_retention_days() -> u32 {
    30
}
fn default_notifications() -> bool {
    true
}

/// Preferred source for calendar imports; informational for the UI layer,
/// the core treats every imported entry the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum CalendarSource {
    #[default]
    None,
    IcsFile,
    Service,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Horizon (hours) within which an unmatched commitment counts as a
    /// leak rather than merely pending. 24 or 48.
    #[serde(default = "default_window_hours")]
    pub window_hours: u32,

    /// Raw records and commitments older than this are purged.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    #[serde(default)]
    pub default_calendar_source: CalendarSource,

    #[serde(default = "default_notifications")]
    pub notifications_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_hours: default_window_hours(),
            retention_days: default_retention_days(),
            default_calendar_source: CalendarSource::default(),
            notifications_enabled: default_notifications(),
        }
    }
}

impl Config {
    /// Loads the config, falling back to defaults when the file is missing
    /// or unreadable. Out-of-range windows clamp to the default.
    pub fn load() -> Self {
        let mut config = Self::read_file().unwrap_or_else(|e| {
            log::info!("using default config ({})", e);
            Self::default()
        });
        if !VALID_WINDOW_HOURS.contains(&config.window_hours) {
            log::warn!(
                "window_hours {} unsupported, using {}",
                config.window_hours,
                default_window_hours()
            );
            config.window_hours = default_window_hours();
        }
        config
    }

    fn read_file() -> Result<Self> {
        let path = AppPaths::get_config_dir()?.join(CONFIG_FILENAME);
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self) -> Result<()> {
        let path = AppPaths::get_config_dir()?.join(CONFIG_FILENAME);
        let toml_str = toml::to_string_pretty(self)?;
        fs::write(path, toml_str)?;
        Ok(())
    }
}
