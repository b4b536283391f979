use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use tagcal_core::recurrence::{
    self, DEFAULT_OCCURRENCE_COUNT, EndCondition, Frequency, RecurrenceDescriptor,
};

pub fn decode(rule: Option<&str>, end_date: Option<&str>, count: Option<u32>) -> Result<()> {
    let descriptor = recurrence::decode(rule, end_date, count);
    print_json(&descriptor)
}

pub fn encode(
    frequency: Frequency,
    until: Option<NaiveDate>,
    count: Option<u32>,
    start: Option<NaiveDateTime>,
) -> Result<()> {
    let descriptor = descriptor_from_args(frequency, until, count);

    if let Some(start) = start {
        descriptor.validate(start)?;
    }

    print_json(&recurrence::encode(&descriptor))
}

fn descriptor_from_args(
    frequency: Frequency,
    until: Option<NaiveDate>,
    count: Option<u32>,
) -> RecurrenceDescriptor {
    let end_condition = match (until, count) {
        (Some(_), _) => EndCondition::OnDate,
        (None, Some(_)) => EndCondition::AfterCount,
        (None, None) => EndCondition::Never,
    };

    RecurrenceDescriptor {
        frequency,
        end_condition,
        end_date: until,
        occurrence_count: count.unwrap_or(DEFAULT_OCCURRENCE_COUNT),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Could not serialize output")?;
    println!("{json}");
    Ok(())
}
