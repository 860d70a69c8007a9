//! Reads study records out of an untyped JSON document.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde_json::Value;
use tracing::warn;

use crate::study::{data::StudyRecord, start_of_day};

const DATE_TIME_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Records in `value`, which should be an array of objects.
///
/// Anything that is not an array yields no records. Elements that are not
/// objects with a string `subject` are skipped. Dates that cannot be read are
/// kept as `None`.
pub fn parse_records(value: &Value) -> Vec<StudyRecord> {
    let Some(items) = value.as_array() else {
        warn!(kind = kind(value), "study records are not an array, ignoring them");
        return Vec::new();
    };
    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let record = parse_record(item);
            if record.is_none() {
                warn!(index = i, "skipping study record without a subject");
            }
            record
        })
        .collect()
}

fn parse_record(item: &Value) -> Option<StudyRecord> {
    let object = item.as_object()?;
    let subject = object.get("subject")?.as_str()?.trim();
    if subject.is_empty() {
        return None;
    }
    let text = |key: &str| {
        object
            .get(key)
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    };
    let duration = object
        .get("duration")
        .and_then(Value::as_u64)
        .and_then(|minutes| u32::try_from(minutes).ok())
        .unwrap_or(0);
    Some(StudyRecord {
        subject: subject.to_string(),
        date: object.get("date").and_then(Value::as_str).and_then(parse_date),
        duration,
        topic: text("topic"),
        notes: text("notes"),
        source: text("source"),
    })
}

/// Local wall-clock time of `s`. RFC 3339 input is converted from its offset
/// to the local time zone; other shapes are taken as local already.
pub fn parse_date(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(date_time) = DateTime::parse_from_rfc3339(s) {
        return Some(date_time.with_timezone(&Local).naive_local());
    }
    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .or_else(|| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(start_of_day))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
