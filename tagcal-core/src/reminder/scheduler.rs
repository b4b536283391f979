use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::event::{EventId, ScheduledEvent};
use crate::permission::{Permission, PermissionState};
use crate::reminder::ReminderConfig;
use crate::reminder::ports::{
    Clock, NotificationOptions, NotificationSink, PreferenceStore, ShownNotification,
    SubscriptionId, Surface, Timer, TimerHandle,
};

/// Host collaborators for a [`ReminderScheduler`].
#[derive(Clone)]
pub struct ReminderPorts {
    pub clock: Arc<dyn Clock>,
    pub timer: Arc<dyn Timer>,
    pub sink: Arc<dyn NotificationSink>,
    pub surface: Arc<dyn Surface>,
    pub preferences: Arc<dyn PreferenceStore>,
}

/// A reminder that came due while the surface was hidden.
#[derive(Debug, Clone, PartialEq, Eq)]
struct QueuedNotification {
    event_id: EventId,
    title: String,
    body: String,
}

impl QueuedNotification {
    fn for_event(event: &ScheduledEvent, lead_minutes: u64) -> Self {
        let body = match event.visible_description() {
            Some(description) => format!("Starting in {lead_minutes} minutes: {description}"),
            None => format!("Starting in {lead_minutes} minutes"),
        };

        QueuedNotification {
            event_id: event.id,
            title: format!("Upcoming Event: {}", event.title),
            body,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingReminder {
    handle: TimerHandle,
    /// Matches the ticket captured by the timer callback. A callback whose
    /// ticket is no longer pending belongs to a cancelled batch.
    ticket: u64,
}

struct SchedulerState {
    permission: PermissionState,
    pending: HashMap<EventId, PendingReminder>,
    queue: VecDeque<QueuedNotification>,
    visible: bool,
    next_ticket: u64,
}

impl SchedulerState {
    fn cancel_pending(&mut self, timer: &dyn Timer) -> usize {
        let cancelled = self.pending.len();
        for (_, pending) in self.pending.drain() {
            timer.cancel(pending.handle);
        }
        cancelled
    }
}

struct Shared {
    clock: Arc<dyn Clock>,
    timer: Arc<dyn Timer>,
    sink: Arc<dyn NotificationSink>,
    surface: Arc<dyn Surface>,
    preferences: Arc<dyn PreferenceStore>,
    config: ReminderConfig,
    state: Mutex<SchedulerState>,
}

/// Schedules "upcoming event" notifications for a batch of events.
///
/// Each call to [`schedule`](Self::schedule) replaces the previous batch.
/// Dropping the scheduler cancels everything it armed.
pub struct ReminderScheduler {
    shared: Arc<Shared>,
    subscription: Option<SubscriptionId>,
}

impl ReminderScheduler {
    pub fn new(ports: ReminderPorts, config: ReminderConfig) -> Self {
        let permission = initial_permission(
            ports.sink.as_ref(),
            ports.preferences.as_ref(),
            &config.permission_key,
        );
        let visible = ports.surface.is_visible();

        let shared = Arc::new(Shared {
            clock: ports.clock,
            timer: ports.timer,
            sink: ports.sink,
            surface: ports.surface,
            preferences: ports.preferences,
            config,
            state: Mutex::new(SchedulerState {
                permission,
                pending: HashMap::new(),
                queue: VecDeque::new(),
                visible,
                next_ticket: 0,
            }),
        });

        let listener = Arc::downgrade(&shared);
        let subscription = shared.surface.subscribe(Box::new(move || {
            if let Some(shared) = listener.upgrade() {
                shared.visibility_changed();
            }
        }));

        debug!(
            permission = %permission.permission,
            supported = permission.is_supported,
            visible,
            "reminder scheduler ready"
        );

        ReminderScheduler {
            shared,
            subscription: Some(subscription),
        }
    }

    pub fn state(&self) -> PermissionState {
        self.shared.state.lock().permission
    }

    pub fn config(&self) -> &ReminderConfig {
        &self.shared.config
    }

    /// Number of reminders armed and not yet fired.
    pub fn pending_count(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    /// Number of reminders waiting for the surface to become visible.
    pub fn queued_count(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    /// Ask for notification permission.
    ///
    /// Prompts only while the permission is undecided. A failed prompt
    /// counts as denied for this call and leaves the state untouched.
    pub async fn request_permission(&self) -> Permission {
        let current = self.state();
        if !current.is_supported {
            return Permission::Denied;
        }
        if current.permission.is_decided() {
            return current.permission;
        }

        match self.shared.sink.request_permission().await {
            Ok(permission) => {
                self.shared.persist_permission(permission);
                self.shared.state.lock().permission.permission = permission;
                info!(%permission, "notification permission decided");
                permission
            }
            Err(e) => {
                warn!(error = %e, "failed to request notification permission");
                Permission::Denied
            }
        }
    }

    /// Replace all armed reminders with reminders for `events`.
    ///
    /// Events whose reminder time is not strictly in the future are skipped.
    pub fn schedule(&self, events: &[ScheduledEvent]) {
        let shared = &self.shared;
        let mut state = shared.state.lock();

        let cancelled = state.cancel_pending(shared.timer.as_ref());

        if !state.permission.allows_delivery() {
            debug!(cancelled, "notifications not permitted, no reminders armed");
            return;
        }

        let now = shared.clock.now();
        let lead_minutes = shared.config.lead_minutes();

        for event in events {
            let Some(delay) = reminder_delay(event.start_time, now, shared.config.lead_time) else {
                debug!(event_id = event.id, "reminder time has passed, skipping");
                continue;
            };

            let reminder = QueuedNotification::for_event(event, lead_minutes);
            let ticket = state.next_ticket;
            state.next_ticket += 1;

            let owner = Arc::downgrade(shared);
            let handle = shared.timer.after(
                delay,
                Box::new(move || {
                    if let Some(shared) = owner.upgrade() {
                        shared.reminder_due(ticket, reminder);
                    }
                }),
            );

            if let Some(replaced) = state.pending.insert(event.id, PendingReminder { handle, ticket }) {
                shared.timer.cancel(replaced.handle);
            }
        }

        debug!(armed = state.pending.len(), cancelled, "reminders scheduled");
    }

    /// Cancel armed reminders and drop queued ones without showing them.
    pub fn clear_all_timers(&self) {
        self.shared.clear_all();
    }

    /// Show a notification right away, if permitted.
    pub fn dispatch_notification(&self, title: &str, body: &str, event_id: EventId) {
        self.shared.dispatch(title, body, event_id);
    }

    /// Cancel everything and stop listening for visibility changes.
    pub fn shutdown(&mut self) {
        self.shared.clear_all();
        if let Some(subscription) = self.subscription.take() {
            self.shared.surface.unsubscribe(subscription);
        }
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Shared {
    fn reminder_due(&self, ticket: u64, reminder: QueuedNotification) {
        {
            let mut state = self.state.lock();

            match state.pending.get(&reminder.event_id) {
                Some(pending) if pending.ticket == ticket => {
                    state.pending.remove(&reminder.event_id);
                }
                _ => {
                    debug!(event_id = reminder.event_id, "ignoring reminder from a replaced batch");
                    return;
                }
            }

            if !state.visible {
                debug!(event_id = reminder.event_id, "surface hidden, queueing reminder");
                state.queue.push_back(reminder);
                return;
            }
        }

        self.dispatch(&reminder.title, &reminder.body, reminder.event_id);
    }

    fn visibility_changed(&self) {
        let visible = self.surface.is_visible();

        let queued = {
            let mut state = self.state.lock();
            state.visible = visible;
            if !visible || state.queue.is_empty() {
                return;
            }
            std::mem::take(&mut state.queue)
        };

        debug!(count = queued.len(), "surface visible, delivering queued reminders");
        for notification in queued {
            self.dispatch(&notification.title, &notification.body, notification.event_id);
        }
    }

    fn dispatch(&self, title: &str, body: &str, event_id: EventId) {
        if !self.state.lock().permission.allows_delivery() {
            return;
        }

        let options = NotificationOptions {
            body: body.to_owned(),
            tag: event_id.to_string(),
        };

        let notification = match self.sink.show(title, options) {
            Ok(notification) => notification,
            Err(e) => {
                warn!(event_id, error = %e, "failed to show notification");
                return;
            }
        };

        let surface = Arc::clone(&self.surface);
        let calendar = self.config.calendar_location.clone();
        let clicked: Weak<dyn ShownNotification> = Arc::downgrade(&notification);
        notification.on_click(Box::new(move || {
            surface.focus();
            if surface.location() != calendar {
                surface.navigate(&calendar);
            }
            if let Some(notification) = clicked.upgrade() {
                notification.close();
            }
        }));

        let displayed = Arc::clone(&notification);
        self.timer
            .after(self.config.auto_close, Box::new(move || displayed.close()));
    }

    fn clear_all(&self) {
        let mut state = self.state.lock();
        let cancelled = state.cancel_pending(self.timer.as_ref());
        let discarded = state.queue.len();
        state.queue.clear();

        if cancelled > 0 || discarded > 0 {
            debug!(cancelled, discarded, "cleared reminders");
        }
    }

    fn persist_permission(&self, permission: Permission) {
        if let Err(e) = self
            .preferences
            .set(&self.config.permission_key, permission.as_str())
        {
            warn!(error = %e, "failed to store notification permission");
        }
    }
}

/// Read the live permission; the stored copy is corrected if it disagrees.
fn initial_permission(
    sink: &dyn NotificationSink,
    preferences: &dyn PreferenceStore,
    key: &str,
) -> PermissionState {
    let state = if sink.is_supported() {
        PermissionState {
            permission: sink.current_permission(),
            is_supported: true,
        }
    } else {
        PermissionState::unsupported()
    };

    let live = state.permission.as_str();
    match preferences.get(key) {
        Ok(Some(stored)) if stored != live => {
            debug!(%stored, live, "correcting stored notification permission");
            if let Err(e) = preferences.set(key, live) {
                warn!(error = %e, "failed to store notification permission");
            }
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e, "failed to read stored notification permission"),
    }

    state
}

/// Time until the reminder for an event starting at `start` should fire.
fn reminder_delay(start: DateTime<Utc>, now: DateTime<Utc>, lead: Duration) -> Option<Duration> {
    let until_start = (start - now).to_std().ok()?;
    until_start.checked_sub(lead).filter(|delay| !delay.is_zero())
}
