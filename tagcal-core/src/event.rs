//! Events as the reminder scheduler sees them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Backend event id. Unique within one scheduling batch.
pub type EventId = i64;

/// A timed event that may need an "upcoming event" reminder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub id: EventId,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
}

impl ScheduledEvent {
    pub fn new(id: EventId, title: impl Into<String>, start_time: DateTime<Utc>) -> Self {
        ScheduledEvent {
            id,
            title: title.into(),
            description: None,
            start_time,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Description worth showing; an empty string counts as none.
    pub fn visible_description(&self) -> Option<&str> {
        self.description.as_deref().filter(|d| !d.is_empty())
    }
}
