//! Wire format of activities from the remote store
//!
//! Records arrive loosely typed: `loggedAt` or `logged_at`, quantities as
//! strings or numbers, enum values in any case, details that may be missing.
//! `RawActivity` accepts all of that; conversion to a typed `Activity` only
//! fails when the record has no usable type or timestamp.

use crate::types::{
    Activity, ActivityDetails, ActivityType, DiaperDetails, FeedDetails, LoggedAt,
    MeasureDetails, NapDetails, NoteDetails, SolidsDetails,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// An activity record as the remote store sends it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawActivity {
    /// Opaque id; string or number on the wire
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<String>,
    #[serde(default, alias = "logged_at", skip_serializing_if = "Option::is_none")]
    pub logged_at: Option<String>,
    #[serde(default)]
    pub details: Value,
}

/// Why a raw record could not become an `Activity`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("missing activity type")]
    MissingType,

    #[error("unknown activity type: {0}")]
    UnknownType(String),

    #[error("missing loggedAt")]
    MissingLoggedAt,

    #[error("unparsable loggedAt: {0}")]
    InvalidLoggedAt(String),
}

impl RawActivity {
    /// Id as a string, whatever its wire type
    pub fn id_string(&self) -> Option<String> {
        match &self.id {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        }
    }

    /// Check the record without converting it
    pub fn validate(&self) -> Result<(), RejectReason> {
        self.parse_type()?;
        self.parse_logged_at()?;
        Ok(())
    }

    fn parse_type(&self) -> Result<ActivityType, RejectReason> {
        let tag = self
            .activity_type
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or(RejectReason::MissingType)?;
        ActivityType::from_tag(tag).ok_or_else(|| RejectReason::UnknownType(tag.to_string()))
    }

    fn parse_logged_at(&self) -> Result<LoggedAt, RejectReason> {
        let raw = self
            .logged_at
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or(RejectReason::MissingLoggedAt)?;
        LoggedAt::parse(raw).map_err(|_| RejectReason::InvalidLoggedAt(raw.to_string()))
    }

    /// Convert into a typed activity.
    ///
    /// Detail fields that cannot be read are dropped individually; a bad
    /// quantity or unit never rejects the whole record.
    pub fn to_activity(&self) -> Result<Activity, RejectReason> {
        let activity_type = self.parse_type()?;
        let logged_at = self.parse_logged_at()?;
        let id = self.id_string().unwrap_or_default();

        let mut details = match &self.details {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };

        let details = match activity_type {
            ActivityType::Feed => {
                clean_feed(&mut details);
                ActivityDetails::Feed(lenient::<FeedDetails>(&id, details))
            }
            ActivityType::Nap => {
                clean_nap(&mut details);
                ActivityDetails::Nap(lenient::<NapDetails>(&id, details))
            }
            ActivityType::Diaper => {
                clean_enum(&mut details, "diaperType", &[
                    ("wet", "wet"),
                    ("poopy", "poopy"),
                    ("dirty", "poopy"),
                    ("both", "both"),
                ]);
                ActivityDetails::Diaper(lenient::<DiaperDetails>(&id, details))
            }
            ActivityType::Note => {
                drop_unless_string(&mut details, "note");
                clean_string_list(&mut details, "photos");
                ActivityDetails::Note(lenient::<NoteDetails>(&id, details))
            }
            ActivityType::Solids => {
                drop_unless_string(&mut details, "solidDescription");
                clean_string_list(&mut details, "allergens");
                ActivityDetails::Solids(lenient::<SolidsDetails>(&id, details))
            }
            ActivityType::Measure => {
                for key in ["weight", "height", "headCircumference"] {
                    clean_number(&mut details, key);
                }
                ActivityDetails::Measure(lenient::<MeasureDetails>(&id, details))
            }
            ActivityType::Wake => ActivityDetails::Wake,
        };

        Ok(Activity {
            id,
            logged_at,
            details,
        })
    }
}

fn lenient<T: DeserializeOwned + Default>(id: &str, details: Map<String, Value>) -> T {
    match serde_json::from_value(Value::Object(details)) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!(activity_id = id, error = %e, "unreadable details treated as empty");
            T::default()
        }
    }
}

fn clean_feed(details: &mut Map<String, Value>) {
    match details.get("quantity") {
        Some(Value::Number(n)) => {
            let text = n.to_string();
            details.insert("quantity".to_string(), Value::String(text));
        }
        Some(Value::String(_)) | None => {}
        Some(_) => {
            details.remove("quantity");
        }
    }

    clean_enum(details, "unit", &[("ml", "ml"), ("oz", "oz")]);
    clean_enum(details, "feedType", &[
        ("bottle", "bottle"),
        ("breast", "breast"),
        ("solid", "solid"),
    ]);

    clean_number(details, "durationMinutes");
    drop_unless_string(details, "side");
}

fn clean_nap(details: &mut Map<String, Value>) {
    // Both spellings present would be a duplicate field; the canonical one wins
    for (key, alias) in [
        ("startTime", "start_time"),
        ("endTime", "end_time"),
        ("isNightSleep", "is_night_sleep"),
        ("date_local", "dateLocal"),
        ("end_date_local", "endDateLocal"),
    ] {
        if let Some(value) = details.remove(alias) {
            if !details.contains_key(key) {
                details.insert(key.to_string(), value);
            }
        }
    }

    for key in ["startTime", "endTime", "date_local", "end_date_local"] {
        drop_unless_string(details, key);
    }
    clean_bool(details, "isNightSleep");
}

/// Map a string field case-insensitively onto its canonical value, removing it otherwise
fn clean_enum(details: &mut Map<String, Value>, key: &str, allowed: &[(&str, &str)]) {
    let canonical = details
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_ascii_lowercase())
        .and_then(|s| {
            allowed
                .iter()
                .find(|(alias, _)| *alias == s)
                .map(|(_, canonical)| *canonical)
        });

    match canonical {
        Some(value) => {
            details.insert(key.to_string(), Value::String(value.to_string()));
        }
        None => {
            details.remove(key);
        }
    }
}

/// Keep a number, or a string holding one; remove anything else
fn clean_number(details: &mut Map<String, Value>, key: &str) {
    let parsed = match details.get(key) {
        None | Some(Value::Number(_)) => return,
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        Some(_) => None,
    };
    match parsed {
        Some(n) => {
            details.insert(key.to_string(), Value::from(n));
        }
        None => {
            details.remove(key);
        }
    }
}

/// Accept a bool or "true"/"false" in any case
fn clean_bool(details: &mut Map<String, Value>, key: &str) {
    let parsed = match details.get(key) {
        None => return,
        Some(Value::Bool(b)) => Some(*b),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        Some(_) => None,
    };
    match parsed {
        Some(b) => {
            details.insert(key.to_string(), Value::Bool(b));
        }
        None => {
            details.remove(key);
        }
    }
}

/// Keep the string entries of an array; remove the field when it is not an array
fn clean_string_list(details: &mut Map<String, Value>, key: &str) {
    match details.get_mut(key) {
        None => return,
        Some(Value::Array(items)) => {
            items.retain(Value::is_string);
            return;
        }
        Some(_) => {}
    }
    details.remove(key);
}

fn drop_unless_string(details: &mut Map<String, Value>, key: &str) {
    if details.get(key).is_some_and(|v| !v.is_string()) {
        details.remove(key);
    }
}
