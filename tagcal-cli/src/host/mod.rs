//! Desktop and terminal implementations of the reminder ports.

pub mod desktop;
pub mod terminal;
pub mod timer;

use std::sync::Arc;

use anyhow::{Context, Result};
use tagcal_core::config::TagcalConfig;
use tagcal_core::preferences::FilePreferenceStore;
use tagcal_core::reminder::ports::SystemClock;
use tagcal_core::ReminderPorts;

use desktop::DesktopNotifier;
use terminal::TerminalSurface;
use timer::TokioTimer;

/// Wire the scheduler to the desktop. Must be called inside the tokio runtime.
pub fn ports(config: &TagcalConfig, surface: Arc<TerminalSurface>) -> Result<ReminderPorts> {
    let preferences_path = config.preferences_path();
    let preferences = FilePreferenceStore::open(&preferences_path).with_context(|| {
        format!("Could not open preferences at {}", preferences_path.display())
    })?;

    let reminders = config.reminder_config()?;
    let notifier = DesktopNotifier::new(&config.notifications, &config.state_path())
        .context("Could not set up desktop notifications")?
        .display_for(reminders.auto_close);

    Ok(ReminderPorts {
        clock: Arc::new(SystemClock),
        timer: Arc::new(TokioTimer::current()),
        sink: Arc::new(notifier),
        surface,
        preferences: Arc::new(preferences),
    })
}
