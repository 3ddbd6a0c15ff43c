//! Adapter for converting raw activity records to typed activities
//!
//! Parsing is strict about JSON shape (a broken payload is an error) but
//! fail-soft per record: records without a usable type or timestamp are
//! dropped with a warning and reported by `validate`.

use crate::error::RhythmError;
use crate::schema::raw_activity::{RawActivity, RejectReason};
use crate::types::Activity;
use serde::Serialize;
use tracing::warn;

/// Adapter for converting raw activities to typed activities
pub struct ActivityAdapter;

impl ActivityAdapter {
    /// Parse a JSON string containing an array of RawActivity records
    pub fn parse_array(json: &str) -> Result<Vec<RawActivity>, RhythmError> {
        let records: Vec<RawActivity> = serde_json::from_str(json)?;
        Ok(records)
    }

    /// Parse NDJSON (newline-delimited JSON) containing RawActivity records
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<RawActivity>, RhythmError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<RawActivity>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(RhythmError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(records)
    }

    /// Parse either a JSON array or NDJSON, whichever the input looks like
    pub fn parse(input: &str) -> Result<Vec<RawActivity>, RhythmError> {
        if input.trim_start().starts_with('[') {
            Self::parse_array(input)
        } else {
            Self::parse_ndjson(input)
        }
    }

    /// Convert raw records to typed activities, dropping the ones that cannot be read
    pub fn to_activities(records: &[RawActivity]) -> Vec<Activity> {
        records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| match record.to_activity() {
                Ok(activity) => Some(activity),
                Err(reason) => {
                    warn!(
                        index,
                        activity_id = ?record.id_string(),
                        %reason,
                        "activity dropped"
                    );
                    None
                }
            })
            .collect()
    }

    /// Validate a batch of records
    pub fn validate(records: &[RawActivity]) -> ValidationReport {
        let rejected: Vec<ValidationResult> = records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                record.validate().err().map(|reason| ValidationResult {
                    index,
                    activity_id: record.id_string(),
                    reason: reason.to_string(),
                    kind: reason,
                })
            })
            .collect();

        ValidationReport {
            total: records.len(),
            accepted: records.len() - rejected.len(),
            rejected,
        }
    }
}

/// One rejected record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub index: usize,
    pub activity_id: Option<String>,
    pub reason: String,
    #[serde(skip)]
    pub kind: RejectReason,
}

/// Outcome of validating a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub total: usize,
    pub accepted: usize,
    pub rejected: Vec<ValidationResult>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MIXED: &str = r#"[
        {"id": "a", "type": "feed", "loggedAt": "2024-03-10T07:00:00", "details": {"quantity": "4", "unit": "oz"}},
        {"id": "b", "type": "bath", "loggedAt": "2024-03-10T08:00:00"},
        {"id": "c", "type": "nap", "loggedAt": "not a time", "details": {"startTime": "9:00 AM"}},
        {"id": "d", "type": "diaper", "logged_at": "2024-03-10 09:00:00+00", "details": {"diaperType": "wet"}}
    ]"#;

    #[test]
    fn test_parse_array_and_convert() {
        let records = ActivityAdapter::parse_array(MIXED).unwrap();
        assert_eq!(records.len(), 4);

        let activities = ActivityAdapter::to_activities(&records);
        let ids: Vec<&str> = activities.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "d"]);
    }

    #[test]
    fn test_validation_report() {
        let records = ActivityAdapter::parse_array(MIXED).unwrap();
        let report = ActivityAdapter::validate(&records);

        assert_eq!(report.total, 4);
        assert_eq!(report.accepted, 2);
        assert!(!report.is_clean());
        let rejected: Vec<(usize, Option<String>, String)> = report
            .rejected
            .iter()
            .map(|r| (r.index, r.activity_id.clone(), r.reason.clone()))
            .collect();
        assert_eq!(
            rejected,
            vec![
                (1, Some("b".to_string()), "unknown activity type: bath".to_string()),
                (2, Some("c".to_string()), "unparsable loggedAt: not a time".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_ndjson() {
        let ndjson = r#"
{"id": "a", "type": "feed", "loggedAt": "2024-03-10T07:00:00"}

{"id": "b", "type": "wake", "loggedAt": "2024-03-10T06:30:00"}
"#;
        let records = ActivityAdapter::parse_ndjson(ndjson).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(ActivityAdapter::parse(ndjson).unwrap().len(), 2);
    }

    #[test]
    fn test_parse_ndjson_reports_line() {
        let ndjson = "{\"id\": \"a\", \"type\": \"feed\"}\n{broken";
        let err = ActivityAdapter::parse_ndjson(ndjson).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_malformed_array_is_an_error() {
        assert!(ActivityAdapter::parse_array("{\"id\": 1}").is_err());
    }
}
