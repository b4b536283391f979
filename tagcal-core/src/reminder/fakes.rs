//! Deterministic stand-ins for the scheduler's host collaborators.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use parking_lot::Mutex;

use crate::error::{TagcalError, TagcalResult};
use crate::permission::Permission;
use crate::reminder::ports::{
    ClickHandler, Clock, NotificationOptions, NotificationSink, ShownNotification, SubscriptionId,
    Surface, Timer, TimerCallback, TimerHandle, VisibilityListener,
};

pub(crate) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        ManualClock {
            now: Mutex::new(Utc.with_ymd_and_hms(2025, 3, 20, 15, 0, 0).unwrap()),
        }
    }
}

impl ManualClock {
    fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

struct Armed {
    id: u64,
    due: DateTime<Utc>,
    callback: TimerCallback,
}

/// Timer driven by [`ManualTimer::advance`]; callbacks run on the caller's
/// thread in due order.
pub(crate) struct ManualTimer {
    clock: Arc<ManualClock>,
    armed: Mutex<Vec<Armed>>,
    next_id: AtomicUsize,
    ignore_cancels: AtomicBool,
}

impl ManualTimer {
    pub(crate) fn new(clock: Arc<ManualClock>) -> Self {
        ManualTimer {
            clock,
            armed: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(0),
            ignore_cancels: AtomicBool::new(false),
        }
    }

    /// Behave like a host whose cancellations arrive too late.
    pub(crate) fn ignore_cancels(&self) {
        self.ignore_cancels.store(true, Ordering::SeqCst);
    }

    pub(crate) fn armed(&self) -> usize {
        self.armed.lock().len()
    }

    pub(crate) fn advance(&self, by: Duration) {
        let target = self.clock.now() + TimeDelta::from_std(by).unwrap();

        loop {
            let next = {
                let mut armed = self.armed.lock();
                let index = armed
                    .iter()
                    .enumerate()
                    .filter(|(_, timer)| timer.due <= target)
                    .min_by_key(|(_, timer)| (timer.due, timer.id))
                    .map(|(index, _)| index);
                index.map(|index| armed.swap_remove(index))
            };

            let Some(timer) = next else { break };
            self.clock.set(timer.due);
            (timer.callback)();
        }

        self.clock.set(target);
    }
}

impl Timer for ManualTimer {
    fn after(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as u64;
        let due = self.clock.now() + TimeDelta::from_std(delay).unwrap();
        self.armed.lock().push(Armed { id, due, callback });
        TimerHandle(id)
    }

    fn cancel(&self, handle: TimerHandle) {
        if self.ignore_cancels.load(Ordering::SeqCst) {
            return;
        }
        self.armed.lock().retain(|timer| timer.id != handle.0);
    }
}

pub(crate) struct FakeNotification {
    pub title: String,
    pub body: String,
    pub tag: String,
    click: Mutex<Option<ClickHandler>>,
    closed: AtomicBool,
}

impl FakeNotification {
    pub(crate) fn click(&self) {
        if let Some(handler) = self.click.lock().as_ref() {
            handler();
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl ShownNotification for FakeNotification {
    fn on_click(&self, handler: ClickHandler) {
        *self.click.lock() = Some(handler);
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum PromptOutcome {
    Answer(Permission),
    Fail,
}

/// Sink that records what it was asked to show.
pub(crate) struct RecordingSink {
    supported: bool,
    permission: Mutex<Permission>,
    outcome: Mutex<PromptOutcome>,
    prompts: AtomicUsize,
    failing_tags: Mutex<HashSet<String>>,
    shown: Mutex<Vec<Arc<FakeNotification>>>,
}

impl RecordingSink {
    pub(crate) fn new(permission: Permission) -> Self {
        RecordingSink {
            supported: true,
            permission: Mutex::new(permission),
            outcome: Mutex::new(PromptOutcome::Answer(Permission::Denied)),
            prompts: AtomicUsize::new(0),
            failing_tags: Mutex::new(HashSet::new()),
            shown: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn unsupported() -> Self {
        RecordingSink {
            supported: false,
            ..Self::new(Permission::Default)
        }
    }

    pub(crate) fn answer_with(&self, outcome: PromptOutcome) {
        *self.outcome.lock() = outcome;
    }

    pub(crate) fn fail_tag(&self, tag: &str) {
        self.failing_tags.lock().insert(tag.to_owned());
    }

    pub(crate) fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }

    pub(crate) fn shown(&self) -> Vec<Arc<FakeNotification>> {
        self.shown.lock().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn current_permission(&self) -> Permission {
        *self.permission.lock()
    }

    async fn request_permission(&self) -> TagcalResult<Permission> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        let outcome = *self.outcome.lock();
        match outcome {
            PromptOutcome::Answer(permission) => {
                *self.permission.lock() = permission;
                Ok(permission)
            }
            PromptOutcome::Fail => Err(TagcalError::PermissionRequest("prompt dismissed".into())),
        }
    }

    fn show(
        &self,
        title: &str,
        options: NotificationOptions,
    ) -> TagcalResult<Arc<dyn ShownNotification>> {
        if self.failing_tags.lock().contains(&options.tag) {
            return Err(TagcalError::Notification("refused by host".into()));
        }

        let notification = Arc::new(FakeNotification {
            title: title.to_owned(),
            body: options.body,
            tag: options.tag,
            click: Mutex::new(None),
            closed: AtomicBool::new(false),
        });
        self.shown.lock().push(Arc::clone(&notification));
        Ok(notification)
    }
}

struct SurfaceState {
    visible: bool,
    location: String,
    listeners: Vec<(u64, Arc<dyn Fn() + Send + Sync>)>,
    next_id: u64,
    focus_count: usize,
    navigations: Vec<String>,
}

/// Surface whose visibility the test flips by hand.
pub(crate) struct ScriptedSurface {
    state: Mutex<SurfaceState>,
}

impl ScriptedSurface {
    pub(crate) fn new(location: &str) -> Self {
        ScriptedSurface {
            state: Mutex::new(SurfaceState {
                visible: true,
                location: location.to_owned(),
                listeners: Vec::new(),
                next_id: 0,
                focus_count: 0,
                navigations: Vec::new(),
            }),
        }
    }

    /// A surface the user already can't see when the scheduler starts.
    pub(crate) fn hidden(location: &str) -> Self {
        let surface = Self::new(location);
        surface.state.lock().visible = false;
        surface
    }

    /// Update visibility and notify listeners, even if nothing changed.
    pub(crate) fn set_visible(&self, visible: bool) {
        let listeners: Vec<_> = {
            let mut state = self.state.lock();
            state.visible = visible;
            state.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        for listener in listeners {
            listener();
        }
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }

    pub(crate) fn focus_count(&self) -> usize {
        self.state.lock().focus_count
    }

    pub(crate) fn navigations(&self) -> Vec<String> {
        self.state.lock().navigations.clone()
    }
}

impl Surface for ScriptedSurface {
    fn is_visible(&self) -> bool {
        self.state.lock().visible
    }

    fn subscribe(&self, listener: VisibilityListener) -> SubscriptionId {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.listeners.push((id, Arc::from(listener)));
        SubscriptionId(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.state.lock().listeners.retain(|(listener, _)| *listener != id.0);
    }

    fn focus(&self) {
        self.state.lock().focus_count += 1;
    }

    fn location(&self) -> String {
        self.state.lock().location.clone()
    }

    fn navigate(&self, location: &str) {
        let mut state = self.state.lock();
        state.location = location.to_owned();
        state.navigations.push(location.to_owned());
    }
}
