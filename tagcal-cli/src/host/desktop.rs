//! Reminders as desktop notifications.
//!
//! The desktop itself has no notion of per-app permission, so tagcal keeps
//! the user's answer in `desktop-permission.toml` under the state dir. A
//! decided `notifications.permission` in the config overrides that file.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dialoguer::Confirm;
use notify_rust::Notification;
use parking_lot::Mutex;
use tagcal_core::preferences::{FilePreferenceStore, PreferenceStore};
use tagcal_core::reminder::ports::{
    ClickHandler, NotificationOptions, NotificationSink, ShownNotification,
};
use tagcal_core::reminder::DEFAULT_AUTO_CLOSE;
use tagcal_core::{Permission, TagcalError, TagcalResult};
use tracing::warn;

const APP_NAME: &str = "tagcal";
const GRANT_KEY: &str = "desktop";
/// Action the notification server reports when the body is clicked.
#[cfg(all(unix, not(target_os = "macos")))]
const CLICK_ACTION: &str = "default";

/// Asks the user; `Ok(true)` means allowed. Runs on a blocking thread.
pub type PermissionPrompt = Arc<dyn Fn() -> TagcalResult<bool> + Send + Sync>;

fn confirm_prompt() -> PermissionPrompt {
    Arc::new(|| -> TagcalResult<bool> {
        Confirm::new()
            .with_prompt("Allow tagcal to show desktop reminders?")
            .default(true)
            .interact()
            .map_err(|e| TagcalError::PermissionRequest(e.to_string()))
    })
}

pub struct DesktopNotifier {
    enabled: bool,
    /// Set when the config pins the answer; prompts are then skipped.
    pinned: Option<Permission>,
    grants: FilePreferenceStore,
    permission: Mutex<Permission>,
    prompt: PermissionPrompt,
    display_for: Duration,
    #[cfg(all(unix, not(target_os = "macos")))]
    replaced: Mutex<std::collections::HashMap<String, u32>>,
}

impl DesktopNotifier {
    pub fn new(
        config: &tagcal_core::config::NotificationsConfig,
        state_dir: &Path,
    ) -> TagcalResult<Self> {
        let grants = FilePreferenceStore::open(state_dir.join("desktop-permission.toml"))?;
        let pinned = config.permission.is_decided().then_some(config.permission);

        let permission = match pinned {
            Some(permission) => permission,
            None => stored_grant(&grants),
        };

        Ok(DesktopNotifier {
            enabled: config.enabled,
            pinned,
            grants,
            permission: Mutex::new(permission),
            prompt: confirm_prompt(),
            display_for: DEFAULT_AUTO_CLOSE,
            #[cfg(all(unix, not(target_os = "macos")))]
            replaced: Mutex::new(std::collections::HashMap::new()),
        })
    }

    /// How long the server keeps a reminder up. Once a click is being
    /// watched the handle is gone, so the server has to expire it.
    pub fn display_for(mut self, duration: Duration) -> Self {
        self.display_for = duration;
        self
    }

    /// Ask with `prompt` instead of an interactive confirmation.
    #[cfg(test)]
    fn with_prompt(mut self, prompt: PermissionPrompt) -> Self {
        self.prompt = prompt;
        self
    }

    /// Show `notification`, replacing the one previously shown under `tag`.
    #[cfg(all(unix, not(target_os = "macos")))]
    fn show_tagged(
        &self,
        mut notification: Notification,
        tag: &str,
    ) -> TagcalResult<Arc<dyn ShownNotification>> {
        let mut replaced = self.replaced.lock();
        if let Some(id) = replaced.get(tag) {
            notification.id(*id);
        }

        let millis = u32::try_from(self.display_for.as_millis()).unwrap_or(u32::MAX);
        notification
            .action(CLICK_ACTION, "Open calendar")
            .timeout(notify_rust::Timeout::Milliseconds(millis));

        let handle = notification
            .show()
            .map_err(|e| TagcalError::Notification(e.to_string()))?;
        replaced.insert(tag.to_owned(), handle.id());

        Ok(Arc::new(DesktopNotification {
            handle: Mutex::new(Some(handle)),
        }))
    }

    #[cfg(not(all(unix, not(target_os = "macos"))))]
    fn show_tagged(
        &self,
        notification: Notification,
        _tag: &str,
    ) -> TagcalResult<Arc<dyn ShownNotification>> {
        notification
            .show()
            .map_err(|e| TagcalError::Notification(e.to_string()))?;
        Ok(Arc::new(DesktopNotification::default()))
    }
}

fn stored_grant(grants: &FilePreferenceStore) -> Permission {
    match grants.get(GRANT_KEY) {
        Ok(Some(value)) => value.parse().unwrap_or_else(|e| {
            warn!("Ignoring stored desktop permission: {e}");
            Permission::Default
        }),
        Ok(None) => Permission::Default,
        Err(e) => {
            warn!("Could not read desktop permission: {e}");
            Permission::Default
        }
    }
}

#[async_trait]
impl NotificationSink for DesktopNotifier {
    fn is_supported(&self) -> bool {
        self.enabled
    }

    fn current_permission(&self) -> Permission {
        *self.permission.lock()
    }

    async fn request_permission(&self) -> TagcalResult<Permission> {
        if let Some(permission) = self.pinned {
            return Ok(permission);
        }

        let prompt = Arc::clone(&self.prompt);
        let allowed = tokio::task::spawn_blocking(move || prompt())
            .await
            .map_err(|e| TagcalError::PermissionRequest(e.to_string()))??;

        let permission = if allowed {
            Permission::Granted
        } else {
            Permission::Denied
        };

        // The user has answered; losing the file only means asking again next run.
        *self.permission.lock() = permission;
        if let Err(e) = self.grants.set(GRANT_KEY, permission.as_str()) {
            warn!(error = %e, "Could not store desktop permission");
        }

        Ok(permission)
    }

    fn show(
        &self,
        title: &str,
        options: NotificationOptions,
    ) -> TagcalResult<Arc<dyn ShownNotification>> {
        let mut notification = Notification::new();
        notification
            .appname(APP_NAME)
            .summary(title)
            .body(&options.body);

        self.show_tagged(notification, &options.tag)
    }
}

/// A notification on the desktop.
///
/// On freedesktop, watching for a click takes the handle over, after which
/// `close` is left to the server's timeout. Elsewhere clicks are not reported.
#[derive(Default)]
struct DesktopNotification {
    #[cfg(all(unix, not(target_os = "macos")))]
    handle: Mutex<Option<notify_rust::NotificationHandle>>,
}

impl ShownNotification for DesktopNotification {
    #[cfg(all(unix, not(target_os = "macos")))]
    fn on_click(&self, handler: ClickHandler) {
        let Some(handle) = self.handle.lock().take() else {
            return;
        };

        let watcher = std::thread::Builder::new()
            .name("tagcal-notification".into())
            .spawn(move || {
                handle.wait_for_action(|action| {
                    if action == CLICK_ACTION {
                        handler();
                    }
                });
            });

        if let Err(e) = watcher {
            warn!(error = %e, "Could not watch notification for clicks");
        }
    }

    #[cfg(not(all(unix, not(target_os = "macos"))))]
    fn on_click(&self, _handler: ClickHandler) {
        tracing::debug!("desktop notification clicks are not delivered on this platform");
    }

    fn close(&self) {
        #[cfg(all(unix, not(target_os = "macos")))]
        if let Some(handle) = self.handle.lock().take() {
            handle.close();
        }
    }
}
