//! Suggestion dedup markers
//!
//! Suggestions and daily stories are shown once per household, metric and
//! day. The markers live in a client-side cache that may be lost or corrupted
//! at any time; losing them only means a suggestion is shown again.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

/// Composite marker key `{householdId}-{metric}-{YYYY-MM-DD}`
pub fn dedup_key(household_id: &str, metric: &str, date: NaiveDate) -> String {
    format!("{}-{}-{}", household_id, metric, date.format("%Y-%m-%d"))
}

/// Set of suggestion keys already shown
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuggestionLedger {
    shown: BTreeSet<String>,
}

impl SuggestionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn should_show(&self, key: &str) -> bool {
        !self.shown.contains(key)
    }

    /// Record a key as shown; returns `false` when it was already marked
    pub fn mark_shown(&mut self, key: impl Into<String>) -> bool {
        self.shown.insert(key.into())
    }

    pub fn len(&self) -> usize {
        self.shown.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shown.is_empty()
    }

    /// Drop markers whose trailing date is before `cutoff`.
    ///
    /// Keys without a parsable date suffix are kept.
    pub fn prune_before(&mut self, cutoff: NaiveDate) -> usize {
        let before = self.shown.len();
        self.shown
            .retain(|key| key_date(key).map_or(true, |date| date >= cutoff));
        before - self.shown.len()
    }

    /// Restore a ledger from cache contents; anything unreadable yields an empty ledger
    pub fn from_json_or_default(json: Option<&str>) -> Self {
        let Some(json) = json.filter(|s| !s.trim().is_empty()) else {
            return Self::default();
        };
        match serde_json::from_str(json) {
            Ok(ledger) => ledger,
            Err(e) => {
                warn!(error = %e, "suggestion ledger unreadable, starting empty");
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn key_date(key: &str) -> Option<NaiveDate> {
    // "YYYY-MM-DD" is the last 10 bytes
    let split = key.len().checked_sub(10)?;
    let suffix = key.get(split..)?;
    NaiveDate::parse_from_str(suffix, "%Y-%m-%d").ok()
}
