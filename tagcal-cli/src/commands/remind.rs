use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use owo_colors::OwoColorize;
use tagcal_core::config::TagcalConfig;
use tagcal_core::{Permission, PermissionState, ReminderScheduler};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::events::{load_events, resolve_timezone};
use crate::host::{self, terminal::TerminalSurface};

pub async fn run(config: &TagcalConfig, events_path: &Path) -> Result<()> {
    let tz = resolve_timezone(config.timezone.as_deref())?;
    let events = load_events(events_path, tz)?;

    let surface = Arc::new(TerminalSurface::new(&config.notifications.calendar_path));
    let ports = host::ports(config, Arc::clone(&surface))?;
    let mut scheduler = ReminderScheduler::new(ports, config.reminder_config()?);

    let state = scheduler.state();
    if state.is_supported && !state.permission.is_decided() {
        scheduler.request_permission().await;
    }
    print_permission(scheduler.state());

    scheduler.schedule(&events);
    println!(
        "Watching {} events from {}, {} reminders armed",
        events.len(),
        events_path.display(),
        scheduler.pending_count()
    );
    println!(
        "{}",
        "Commands: hide, show, reload, status, quit".dimmed()
    );

    let commands = BufReader::new(tokio::io::stdin());
    read_commands(commands, interrupted(), |command| {
        match command {
            Command::Hide => surface.set_visible(false),
            Command::Show => surface.set_visible(true),
            Command::Reload => match load_events(events_path, tz) {
                Ok(events) => {
                    scheduler.schedule(&events);
                    println!(
                        "Reloaded {} events, {} reminders armed",
                        events.len(),
                        scheduler.pending_count()
                    );
                }
                Err(e) => eprintln!("{} {e:#}", "Reload failed:".red()),
            },
            Command::Status => print_status(&scheduler, &surface),
            Command::Quit => return Flow::Stop,
            Command::Unknown(other) => eprintln!("{} '{other}'", "Unknown command".yellow()),
        }
        Flow::Continue
    })
    .await;

    scheduler.shutdown();
    println!("{}", "Stopped reminders".dimmed());

    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Hide,
    Show,
    Reload,
    Status,
    Quit,
    Unknown(String),
}

impl Command {
    /// `None` for a blank line.
    fn parse(line: &str) -> Option<Self> {
        let command = match line.trim() {
            "" => return None,
            "hide" => Command::Hide,
            "show" => Command::Show,
            "reload" => Command::Reload,
            "status" => Command::Status,
            "quit" | "exit" => Command::Quit,
            other => Command::Unknown(other.to_owned()),
        };
        Some(command)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Feed commands from `input` to `on_command` until it says stop or
/// `shutdown` completes. Closed or unreadable input only ends the commands;
/// reminders keep running until `shutdown`.
async fn read_commands<R, S, F>(input: R, shutdown: S, mut on_command: F)
where
    R: AsyncBufRead + Unpin,
    S: Future<Output = ()>,
    F: FnMut(Command) -> Flow,
{
    let mut lines = input.lines();
    let mut input_open = true;
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            line = lines.next_line(), if input_open => match line {
                Ok(Some(line)) => {
                    let flow = Command::parse(&line).map_or(Flow::Continue, &mut on_command);
                    if flow == Flow::Stop {
                        break;
                    }
                }
                Ok(None) => {
                    input_open = false;
                    info!("stdin closed, reminders keep running until Ctrl-C");
                }
                Err(e) => {
                    input_open = false;
                    warn!(error = %e, "Could not read stdin, ignoring further commands");
                }
            },
        }
    }
}

/// Resolves on Ctrl-C. If the handler can't be installed the default
/// signal behavior still ends the process, so this waits forever.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

fn print_permission(state: PermissionState) {
    if !state.is_supported {
        println!(
            "{}",
            "Desktop notifications are disabled, no reminders will be shown".yellow()
        );
        return;
    }

    match state.permission {
        Permission::Granted => println!("{}", "Notifications allowed".green()),
        Permission::Denied => println!(
            "{}",
            "Notifications denied, no reminders will be shown".yellow()
        ),
        Permission::Default => println!("{}", "Notification permission not decided".dimmed()),
    }
}

fn print_status(scheduler: &ReminderScheduler, surface: &TerminalSurface) {
    use tagcal_core::reminder::ports::Surface;

    let visibility = if surface.is_visible() {
        "visible"
    } else {
        "hidden"
    };

    println!(
        "{} armed, {} queued, terminal {}, permission {}",
        scheduler.pending_count(),
        scheduler.queued_count(),
        visibility,
        scheduler.state().permission
    );
}
