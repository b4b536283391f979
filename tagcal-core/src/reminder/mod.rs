//! "Upcoming event" reminders.
//!
//! [`ReminderScheduler`] arms one timer per event, a fixed lead time before
//! it starts. Reminders that come due while the surface is hidden wait in a
//! queue until the user can see them again.

#[cfg(test)]
mod fakes;
pub mod ports;
mod scheduler;

use std::time::Duration;

use crate::preferences::NOTIFICATION_PERMISSION_KEY;

pub use scheduler::{ReminderPorts, ReminderScheduler};

pub const DEFAULT_LEAD_TIME: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_AUTO_CLOSE: Duration = Duration::from_secs(10);
pub const DEFAULT_CALENDAR_LOCATION: &str = "/calendar";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderConfig {
    /// How long before an event's start its reminder fires.
    pub lead_time: Duration,
    /// How long a notification stays up if nobody clicks it.
    pub auto_close: Duration,
    /// Where a clicked notification takes the user.
    pub calendar_location: String,
    /// Preference key mirroring the permission.
    pub permission_key: String,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        ReminderConfig {
            lead_time: DEFAULT_LEAD_TIME,
            auto_close: DEFAULT_AUTO_CLOSE,
            calendar_location: DEFAULT_CALENDAR_LOCATION.to_string(),
            permission_key: NOTIFICATION_PERMISSION_KEY.to_string(),
        }
    }
}

impl ReminderConfig {
    pub fn lead_minutes(&self) -> u64 {
        self.lead_time.as_secs() / 60
    }
}
