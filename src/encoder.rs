//! Report encoding
//!
//! This module wraps insight and trend reports in a versioned JSON payload.
//! Ensures producer metadata and input accounting are always present.

use crate::error::RhythmError;
use crate::types::{
    DailyInsight, InputSummary, Producer, ReportKind, RhythmPayload, TrendReport,
};
use crate::{PRODUCER_NAME, RHYTHM_VERSION};
use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

/// Current payload schema version
pub const SCHEMA_VERSION: &str = "rhythm.report.v1";

/// Encoder for producing versioned report payloads
pub struct InsightEncoder {
    instance_id: String,
}

impl Default for InsightEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl InsightEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    fn producer(&self) -> Producer {
        Producer {
            name: PRODUCER_NAME.to_string(),
            version: RHYTHM_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        }
    }

    fn wrap<T>(
        &self,
        kind: ReportKind,
        report: T,
        household_id: Option<String>,
        as_of: NaiveDateTime,
        input: InputSummary,
    ) -> RhythmPayload<T> {
        RhythmPayload {
            schema_version: SCHEMA_VERSION.to_string(),
            kind,
            producer: self.producer(),
            household_id,
            as_of,
            input,
            report,
        }
    }

    /// Wrap a daily insight
    pub fn encode_insight(
        &self,
        insight: DailyInsight,
        household_id: Option<String>,
        input: InputSummary,
    ) -> RhythmPayload<DailyInsight> {
        let as_of = insight.now;
        self.wrap(ReportKind::DailyInsight, insight, household_id, as_of, input)
    }

    /// Wrap a trend report
    pub fn encode_trend(
        &self,
        report: TrendReport,
        household_id: Option<String>,
        as_of: NaiveDateTime,
        input: InputSummary,
    ) -> RhythmPayload<TrendReport> {
        self.wrap(ReportKind::TrendReport, report, household_id, as_of, input)
    }

    /// Encode a payload to a JSON string
    pub fn to_json<T: Serialize>(payload: &RhythmPayload<T>) -> Result<String, RhythmError> {
        serde_json::to_string_pretty(payload).map_err(|e| RhythmError::EncodingError(e.to_string()))
    }
}
