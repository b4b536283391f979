//! Global tagcal configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{TagcalError, TagcalResult};
use crate::permission::Permission;
use crate::reminder::{DEFAULT_CALENDAR_LOCATION, ReminderConfig};

static DEFAULT_STATE_DIR: &str = "~/.local/state/tagcal";
static DEFAULT_LEAD: &str = "10m";
static DEFAULT_AUTO_CLOSE: &str = "10s";

fn default_state_dir() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_DIR)
}

fn default_lead() -> String {
    DEFAULT_LEAD.to_string()
}

fn default_auto_close() -> String {
    DEFAULT_AUTO_CLOSE.to_string()
}

fn default_enabled() -> bool {
    true
}

fn default_calendar_path() -> String {
    DEFAULT_CALENDAR_LOCATION.to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RemindersConfig {
    /// How long before the start a reminder fires, e.g. "10m".
    #[serde(default = "default_lead")]
    pub lead: String,

    /// How long a notification stays up, e.g. "10s".
    #[serde(default = "default_auto_close")]
    pub auto_close: String,
}

impl Default for RemindersConfig {
    fn default() -> Self {
        RemindersConfig {
            lead: default_lead(),
            auto_close: default_auto_close(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NotificationsConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// The desktop's answer to "may tagcal notify you?".
    #[serde(default)]
    pub permission: Permission,

    #[serde(default = "default_calendar_path")]
    pub calendar_path: String,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        NotificationsConfig {
            enabled: default_enabled(),
            permission: Permission::Default,
            calendar_path: default_calendar_path(),
        }
    }
}

/// Global configuration at ~/.config/tagcal/config.toml
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TagcalConfig {
    #[serde(default)]
    pub reminders: RemindersConfig,

    #[serde(default)]
    pub notifications: NotificationsConfig,

    /// IANA zone for event times without an offset. System zone if unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,

    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
}

impl Default for TagcalConfig {
    fn default() -> Self {
        TagcalConfig {
            reminders: RemindersConfig::default(),
            notifications: NotificationsConfig::default(),
            timezone: None,
            state_dir: default_state_dir(),
        }
    }
}

impl TagcalConfig {
    pub fn config_path() -> TagcalResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| TagcalError::Config("Could not determine config directory".into()))?
            .join("tagcal");

        Ok(config_dir.join("config.toml"))
    }

    /// Load the global config, creating a commented default file on first run.
    /// `TAGCAL__SECTION__KEY` environment variables override the file.
    pub fn load() -> TagcalResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> TagcalResult<Self> {
        Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(Environment::with_prefix("TAGCAL").separator("__"))
            .build()
            .map_err(|e| TagcalError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| TagcalError::Config(e.to_string()))
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> TagcalResult<()> {
        let contents = format!(
            "\
# tagcal configuration

# Zone for event times that carry no offset (defaults to the system zone):
# timezone = \"Europe/Oslo\"

# Where tagcal keeps its state:
# state_dir = \"{DEFAULT_STATE_DIR}\"

[reminders]
# How long before an event its reminder fires:
# lead = \"{DEFAULT_LEAD}\"
# How long a reminder stays on screen:
# auto_close = \"{DEFAULT_AUTO_CLOSE}\"

[notifications]
# enabled = true
# Whether tagcal may show desktop notifications (granted, denied or default to ask):
# permission = \"default\"
# calendar_path = \"{DEFAULT_CALENDAR_LOCATION}\"
"
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                TagcalError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| TagcalError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    pub fn state_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.state_dir.to_string_lossy()).into_owned())
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.state_path().join("preferences.toml")
    }

    pub fn reminder_config(&self) -> TagcalResult<ReminderConfig> {
        let lead_time = parse_duration("reminders.lead", &self.reminders.lead)?;
        // Reminder bodies say "Starting in N minutes".
        if lead_time.is_zero() || lead_time.as_secs() % 60 != 0 || lead_time.subsec_nanos() != 0 {
            return Err(TagcalError::Config(format!(
                "reminders.lead must be a whole number of minutes, got '{}'",
                self.reminders.lead
            )));
        }

        Ok(ReminderConfig {
            lead_time,
            auto_close: parse_duration("reminders.auto_close", &self.reminders.auto_close)?,
            calendar_location: self.notifications.calendar_path.clone(),
            ..ReminderConfig::default()
        })
    }
}

fn parse_duration(key: &str, value: &str) -> TagcalResult<Duration> {
    humantime::parse_duration(value)
        .map_err(|e| TagcalError::Config(format!("Invalid duration for {key} ('{value}'): {e}")))
}
