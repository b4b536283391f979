//! Core of the tagcal calendar.
//!
//! This crate holds the parts of tagcal with real logic in them:
//! - `recurrence` translates between the event form's repeat settings and the
//!   rule/end-condition fields the backend stores
//! - `reminder` arms "upcoming event" notifications ahead of each event and
//!   holds them back while the user can't see them
//!
//! Everything host-specific (timers, notifications, visibility) comes in
//! through the traits in `reminder::ports`.

pub mod config;
pub mod error;
pub mod event;
pub mod permission;
pub mod preferences;
pub mod recurrence;
pub mod reminder;

pub use error::{TagcalError, TagcalResult};
pub use event::{EventId, ScheduledEvent};
pub use permission::{Permission, PermissionState};
pub use recurrence::{EndCondition, Frequency, RecurrenceDescriptor, RecurrenceRuleTransport};
pub use reminder::{ReminderConfig, ReminderPorts, ReminderScheduler};
