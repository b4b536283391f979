//! Recurrence rule translation.
//!
//! The event form describes repetition as a frequency plus an end condition.
//! The backend stores a rule string (`FREQ=WEEKLY`) next to an optional
//! end timestamp or occurrence count. This module converts between the two.
//! Expanding a rule into occurrences is the backend's job, not ours.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{TagcalError, TagcalResult};

const DAILY_TOKEN: &str = "FREQ=DAILY";
const WEEKLY_TOKEN: &str = "FREQ=WEEKLY";
const MONTHLY_TOKEN: &str = "FREQ=MONTHLY";

/// Occurrence count shown in the form when the rule carries none.
pub const DEFAULT_OCCURRENCE_COUNT: u32 = 10;

const DATE_FORMAT: &str = "%Y-%m-%d";
const END_OF_DAY_SUFFIX: &str = "T23:59:59";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    /// The rule token stored by the backend, `None` for a non-repeating event.
    pub fn rule_token(self) -> Option<&'static str> {
        match self {
            Frequency::None => None,
            Frequency::Daily => Some(DAILY_TOKEN),
            Frequency::Weekly => Some(WEEKLY_TOKEN),
            Frequency::Monthly => Some(MONTHLY_TOKEN),
        }
    }

    /// Containment match, daily first. A rule with several tokens resolves
    /// to the first one tested.
    fn from_rule(rule: &str) -> Self {
        if rule.contains(DAILY_TOKEN) {
            Frequency::Daily
        } else if rule.contains(WEEKLY_TOKEN) {
            Frequency::Weekly
        } else if rule.contains(MONTHLY_TOKEN) {
            Frequency::Monthly
        } else {
            Frequency::None
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Frequency::None => "none",
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        };
        f.write_str(s)
    }
}

impl FromStr for Frequency {
    type Err = TagcalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Frequency::None),
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            other => Err(TagcalError::InvalidRecurrence(format!(
                "unknown frequency '{other}' (expected none, daily, weekly or monthly)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EndCondition {
    #[default]
    Never,
    OnDate,
    AfterCount,
}

impl fmt::Display for EndCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EndCondition::Never => "never",
            EndCondition::OnDate => "date",
            EndCondition::AfterCount => "count",
        };
        f.write_str(s)
    }
}

impl FromStr for EndCondition {
    type Err = TagcalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "never" => Ok(EndCondition::Never),
            "date" | "ondate" | "on-date" => Ok(EndCondition::OnDate),
            "count" | "aftercount" | "after-count" => Ok(EndCondition::AfterCount),
            other => Err(TagcalError::InvalidRecurrence(format!(
                "unknown end condition '{other}' (expected never, date or count)"
            ))),
        }
    }
}

/// Repeat settings as the event form holds them.
///
/// Only one of `end_date` / `occurrence_count` is meaningful at a time,
/// selected by `end_condition`. The other is carried along untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceDescriptor {
    pub frequency: Frequency,
    pub end_condition: EndCondition,
    pub end_date: Option<NaiveDate>,
    pub occurrence_count: u32,
}

impl Default for RecurrenceDescriptor {
    fn default() -> Self {
        RecurrenceDescriptor {
            frequency: Frequency::None,
            end_condition: EndCondition::Never,
            end_date: None,
            occurrence_count: DEFAULT_OCCURRENCE_COUNT,
        }
    }
}

impl RecurrenceDescriptor {
    /// Check the form before it is encoded and sent.
    ///
    /// `start` is the event's start; a date-bounded series must end after it.
    pub fn validate(&self, start: NaiveDateTime) -> TagcalResult<()> {
        if self.frequency == Frequency::None {
            return Ok(());
        }

        match self.end_condition {
            EndCondition::Never => Ok(()),
            EndCondition::OnDate => {
                let Some(end_date) = self.end_date else {
                    return Err(TagcalError::InvalidRecurrence(
                        "end date is required when the recurrence ends on a date".into(),
                    ));
                };
                if end_date.and_time(NaiveTime::default()) <= start {
                    return Err(TagcalError::InvalidRecurrence(format!(
                        "repeat end date {end_date} must be after the start {start}"
                    )));
                }
                Ok(())
            }
            EndCondition::AfterCount if self.occurrence_count == 0 => Err(
                TagcalError::InvalidRecurrence("repeat count must be a positive number".into()),
            ),
            EndCondition::AfterCount => Ok(()),
        }
    }
}

/// Recurrence fields as they travel in the backend's event JSON.
///
/// `end_date` and `count` are never both set by [`encode`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRuleTransport {
    #[serde(rename = "recurrenceRule", default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    #[serde(rename = "recurrenceEndDate", default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(rename = "recurrenceCount", default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
}

impl RecurrenceRuleTransport {
    pub fn decode(&self) -> RecurrenceDescriptor {
        decode(self.rule.as_deref(), self.end_date.as_deref(), self.count)
    }
}

/// Turn stored recurrence fields back into form state.
///
/// Never fails: anything unrecognised falls back to "no recurrence" or
/// "never ends". An empty rule ignores the end fields entirely. When both an
/// end date and a count are present, the date wins.
pub fn decode(rule: Option<&str>, end_date: Option<&str>, count: Option<u32>) -> RecurrenceDescriptor {
    let Some(rule) = rule.filter(|r| !r.is_empty()) else {
        return RecurrenceDescriptor::default();
    };

    let mut descriptor = RecurrenceDescriptor {
        frequency: Frequency::from_rule(rule),
        ..RecurrenceDescriptor::default()
    };

    if let Some(end_date) = end_date.filter(|d| !d.is_empty()) {
        descriptor.end_condition = EndCondition::OnDate;
        descriptor.end_date = date_portion(end_date);
    } else if let Some(count) = count.filter(|c| *c > 0) {
        descriptor.end_condition = EndCondition::AfterCount;
        descriptor.occurrence_count = count;
    }

    descriptor
}

/// Turn form state into the fields sent to the backend.
///
/// A date-bounded series ends at 23:59:59 local time on its last day.
pub fn encode(descriptor: &RecurrenceDescriptor) -> RecurrenceRuleTransport {
    let end_date = match (descriptor.end_condition, descriptor.end_date) {
        (EndCondition::OnDate, Some(date)) => Some(end_of_day(date)),
        _ => None,
    };

    let count = match descriptor.end_condition {
        EndCondition::AfterCount => Some(descriptor.occurrence_count),
        _ => None,
    };

    RecurrenceRuleTransport {
        rule: descriptor.frequency.rule_token().map(str::to_string),
        end_date,
        count,
    }
}

fn date_portion(timestamp: &str) -> Option<NaiveDate> {
    let date = timestamp.split('T').next().unwrap_or(timestamp);
    match NaiveDate::parse_from_str(date, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(e) => {
            tracing::debug!(timestamp, error = %e, "ignoring unparseable recurrence end date");
            None
        }
    }
}

fn end_of_day(date: NaiveDate) -> String {
    format!("{}{END_OF_DAY_SUFFIX}", date.format(DATE_FORMAT))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn decode_without_rule_ignores_end_fields() {
        let expected = RecurrenceDescriptor::default();

        assert_eq!(decode(None, None, None), expected);
        assert_eq!(decode(None, Some("2024-01-30T23:59:59"), Some(4)), expected);
        assert_eq!(decode(Some(""), Some("2024-01-30T23:59:59"), None), expected);
        assert_eq!(expected.occurrence_count, 10);
    }

    #[test]
    fn decode_matches_tokens_by_containment() {
        assert_eq!(decode(Some("FREQ=DAILY"), None, None).frequency, Frequency::Daily);
        assert_eq!(
            decode(Some("FREQ=WEEKLY;BYDAY=MO"), None, None).frequency,
            Frequency::Weekly
        );
        assert_eq!(
            decode(Some("RRULE:FREQ=MONTHLY"), None, None).frequency,
            Frequency::Monthly
        );
    }

    #[test]
    fn decode_prefers_daily_when_several_tokens_match() {
        let descriptor = decode(Some("FREQ=MONTHLY;FREQ=DAILY"), None, None);
        assert_eq!(descriptor.frequency, Frequency::Daily);
    }

    #[test]
    fn decode_unknown_token_falls_back_to_none() {
        let descriptor = decode(Some("FREQ=YEARLY"), None, Some(3));
        assert_eq!(descriptor.frequency, Frequency::None);
        // end condition is still resolved from the transport fields
        assert_eq!(descriptor.end_condition, EndCondition::AfterCount);
        assert_eq!(descriptor.occurrence_count, 3);
    }

    #[test]
    fn decode_end_date_truncates_time_of_day() {
        let descriptor = decode(Some("FREQ=DAILY"), Some("2024-01-30T23:59:59"), None);
        assert_eq!(descriptor.end_condition, EndCondition::OnDate);
        assert_eq!(descriptor.end_date, Some(date(2024, 1, 30)));
        assert_eq!(descriptor.occurrence_count, 10);
    }

    #[test]
    fn decode_end_date_wins_over_count() {
        let descriptor = decode(Some("FREQ=WEEKLY"), Some("2024-03-01T23:59:59"), Some(5));
        assert_eq!(descriptor.end_condition, EndCondition::OnDate);
        assert_eq!(descriptor.occurrence_count, 10);
    }

    #[test]
    fn decode_zero_count_means_never() {
        let descriptor = decode(Some("FREQ=WEEKLY"), Some(""), Some(0));
        assert_eq!(descriptor.end_condition, EndCondition::Never);
        assert_eq!(descriptor.end_date, None);
        assert_eq!(descriptor.occurrence_count, 10);
    }

    #[test]
    fn decode_garbage_end_date_degrades_to_missing_date() {
        let descriptor = decode(Some("FREQ=DAILY"), Some("next tuesday"), None);
        assert_eq!(descriptor.end_condition, EndCondition::OnDate);
        assert_eq!(descriptor.end_date, None);
    }

    #[test]
    fn encode_none_omits_rule() {
        let transport = encode(&RecurrenceDescriptor::default());
        assert_eq!(transport.rule, None);
        assert_eq!(transport.end_date, None);
        assert_eq!(transport.count, None);
    }

    #[test]
    fn encode_daily_until_date_uses_end_of_day() {
        let transport = encode(&RecurrenceDescriptor {
            frequency: Frequency::Daily,
            end_condition: EndCondition::OnDate,
            end_date: Some(date(2024, 1, 30)),
            occurrence_count: 10,
        });

        assert_eq!(
            transport,
            RecurrenceRuleTransport {
                rule: Some("FREQ=DAILY".into()),
                end_date: Some("2024-01-30T23:59:59".into()),
                count: None,
            }
        );
    }

    #[test]
    fn encode_weekly_after_count() {
        let transport = encode(&RecurrenceDescriptor {
            frequency: Frequency::Weekly,
            end_condition: EndCondition::AfterCount,
            end_date: Some(date(2024, 1, 30)),
            occurrence_count: 5,
        });

        assert_eq!(
            transport,
            RecurrenceRuleTransport {
                rule: Some("FREQ=WEEKLY".into()),
                end_date: None,
                count: Some(5),
            }
        );
    }

    #[test]
    fn encode_on_date_without_date_sends_no_end() {
        let transport = encode(&RecurrenceDescriptor {
            frequency: Frequency::Monthly,
            end_condition: EndCondition::OnDate,
            end_date: None,
            occurrence_count: 10,
        });
        assert_eq!(transport.rule.as_deref(), Some("FREQ=MONTHLY"));
        assert_eq!(transport.end_date, None);
        assert_eq!(transport.count, None);
    }

    #[test]
    fn descriptors_survive_a_trip_through_the_backend() {
        let frequencies = [Frequency::Daily, Frequency::Weekly, Frequency::Monthly];
        let ends = [
            (EndCondition::Never, None, 10),
            (EndCondition::OnDate, Some(date(2025, 6, 1)), 10),
            (EndCondition::AfterCount, None, 7),
        ];

        for frequency in frequencies {
            for (end_condition, end_date, occurrence_count) in ends {
                let descriptor = RecurrenceDescriptor {
                    frequency,
                    end_condition,
                    end_date,
                    occurrence_count,
                };
                assert_eq!(encode(&descriptor).decode(), descriptor, "{descriptor:?}");
            }
        }
    }

    #[test]
    fn transport_serializes_with_backend_field_names() {
        let transport = RecurrenceRuleTransport {
            rule: Some("FREQ=WEEKLY".into()),
            end_date: None,
            count: Some(5),
        };

        let json = serde_json::to_value(&transport).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "recurrenceRule": "FREQ=WEEKLY", "recurrenceCount": 5 })
        );

        let parsed: RecurrenceRuleTransport =
            serde_json::from_str(r#"{"recurrenceEndDate":"2024-01-30T23:59:59"}"#).unwrap();
        assert_eq!(parsed.rule, None);
        assert_eq!(parsed.end_date.as_deref(), Some("2024-01-30T23:59:59"));
    }

    #[test]
    fn validate_requires_end_date_after_start() {
        let start = date(2024, 1, 10).and_hms_opt(9, 0, 0).unwrap();
        let mut descriptor = RecurrenceDescriptor {
            frequency: Frequency::Daily,
            end_condition: EndCondition::OnDate,
            end_date: None,
            occurrence_count: 10,
        };

        assert!(matches!(
            descriptor.validate(start),
            Err(TagcalError::InvalidRecurrence(_))
        ));

        descriptor.end_date = Some(date(2024, 1, 10));
        assert!(descriptor.validate(start).is_err());

        descriptor.end_date = Some(date(2024, 1, 11));
        assert!(descriptor.validate(start).is_ok());
    }

    #[test]
    fn validate_rejects_zero_count_only_when_repeating() {
        let start = date(2024, 1, 10).and_hms_opt(9, 0, 0).unwrap();
        let mut descriptor = RecurrenceDescriptor {
            frequency: Frequency::Weekly,
            end_condition: EndCondition::AfterCount,
            end_date: None,
            occurrence_count: 0,
        };
        assert!(descriptor.validate(start).is_err());

        descriptor.frequency = Frequency::None;
        assert!(descriptor.validate(start).is_ok());
    }

    #[test]
    fn frequency_and_end_condition_parse_from_text() {
        assert_eq!("Weekly".parse::<Frequency>().unwrap(), Frequency::Weekly);
        assert!("yearly".parse::<Frequency>().is_err());
        assert_eq!("date".parse::<EndCondition>().unwrap(), EndCondition::OnDate);
        assert_eq!("count".parse::<EndCondition>().unwrap(), EndCondition::AfterCount);
        assert_eq!(EndCondition::AfterCount.to_string(), "count");
    }
}
