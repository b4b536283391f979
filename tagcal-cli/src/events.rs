//! Reading an exported event list.
//!
//! The file is the backend's event JSON: an array of objects with `id`,
//! `title`, an optional `description` and `startDateTime`. Start times
//! without an offset are wall-clock times in the configured zone.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use tagcal_core::{EventId, ScheduledEvent};
use tracing::warn;

const FLOATING_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventRecord {
    id: EventId,
    title: String,
    #[serde(default)]
    description: Option<String>,
    start_date_time: String,
}

pub fn load_events(path: &Path, tz: Tz) -> Result<Vec<ScheduledEvent>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read {}", path.display()))?;
    parse_events(&content, tz).with_context(|| format!("Invalid event list {}", path.display()))
}

pub fn parse_events(json: &str, tz: Tz) -> Result<Vec<ScheduledEvent>> {
    let records: Vec<EventRecord> = serde_json::from_str(json)?;

    records
        .into_iter()
        .map(|record| {
            let start_time = parse_start(&record.start_date_time, tz)
                .with_context(|| format!("Event {} has a bad startDateTime", record.id))?;
            Ok(ScheduledEvent {
                id: record.id,
                title: record.title,
                description: record.description,
                start_time,
            })
        })
        .collect()
}

fn parse_start(value: &str, tz: Tz) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = FLOATING_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .ok_or_else(|| anyhow!("Unrecognized date-time '{value}'"))?;

    // Ambiguous times (DST fall-back) take the earlier instant.
    let local = tz
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| anyhow!("{value} does not exist in {tz}"))?;

    Ok(local.with_timezone(&Utc))
}

/// The configured zone, else the system zone, else UTC.
pub fn resolve_timezone(configured: Option<&str>) -> Result<Tz> {
    if let Some(name) = configured {
        return name
            .parse()
            .map_err(|e| anyhow!("Unknown timezone '{name}' in config: {e}"));
    }

    match iana_time_zone::get_timezone() {
        Ok(name) => Ok(name.parse().unwrap_or_else(|_| {
            warn!("System timezone '{name}' is not in the tz database, using UTC");
            Tz::UTC
        })),
        Err(e) => {
            warn!("Could not detect the system timezone ({e}), using UTC");
            Ok(Tz::UTC)
        }
    }
}
