use std::sync::Arc;

use anyhow::Result;
use owo_colors::OwoColorize;
use tagcal_core::config::TagcalConfig;
use tagcal_core::{Permission, ReminderScheduler};

use crate::host::{self, terminal::TerminalSurface};

pub async fn run(config: &TagcalConfig, request: bool) -> Result<()> {
    let surface = Arc::new(TerminalSurface::new(&config.notifications.calendar_path));
    let scheduler = ReminderScheduler::new(host::ports(config, surface)?, config.reminder_config()?);

    let state = scheduler.state();
    if !state.is_supported {
        println!(
            "{}",
            "Desktop notifications are disabled (notifications.enabled = false)".dimmed()
        );
        return Ok(());
    }

    let permission = if request {
        scheduler.request_permission().await
    } else {
        state.permission
    };

    let label = match permission {
        Permission::Granted => permission.green().to_string(),
        Permission::Denied => permission.red().to_string(),
        Permission::Default => permission.yellow().to_string(),
    };
    println!("Notification permission: {label}");

    if permission == Permission::Default {
        println!(
            "{}",
            "Run `tagcal permission --request` to decide".dimmed()
        );
    }

    Ok(())
}
