//! What the reminder scheduler needs from its host.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::TagcalResult;
use crate::permission::Permission;

pub use crate::preferences::PreferenceStore;

/// One-shot work handed to a [`Timer`].
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Called whenever the surface's visibility may have changed.
pub type VisibilityListener = Box<dyn Fn() + Send + Sync + 'static>;

pub type ClickHandler = Box<dyn Fn() + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Delayed callbacks.
///
/// `after` must not run the callback before it has returned the handle.
/// `cancel` on a handle that already fired is a no-op.
pub trait Timer: Send + Sync {
    fn after(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;
    fn cancel(&self, handle: TimerHandle);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationOptions {
    pub body: String,
    /// Notifications sharing a tag replace each other instead of stacking.
    pub tag: String,
}

/// A notification the host has put on screen.
pub trait ShownNotification: Send + Sync {
    fn on_click(&self, handler: ClickHandler);
    fn close(&self);
}

/// The host's ability to put alerts in front of the user.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn is_supported(&self) -> bool;
    fn current_permission(&self) -> Permission;
    /// Ask the user. No deadline is imposed on the answer.
    async fn request_permission(&self) -> TagcalResult<Permission>;
    fn show(
        &self,
        title: &str,
        options: NotificationOptions,
    ) -> TagcalResult<Arc<dyn ShownNotification>>;
}

/// The window, page or terminal the user looks at.
pub trait Surface: Send + Sync {
    fn is_visible(&self) -> bool;
    fn subscribe(&self, listener: VisibilityListener) -> SubscriptionId;
    fn unsubscribe(&self, id: SubscriptionId);
    fn focus(&self);
    fn location(&self) -> String;
    fn navigate(&self, location: &str);
}
