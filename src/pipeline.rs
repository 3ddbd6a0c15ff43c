//! Pipeline orchestration
//!
//! This module provides the public API for Nestling Rhythm.
//! It orchestrates the full pipeline from raw activity JSON to report output.

use crate::aggregate::{build_trend_report, Aggregator, MAX_TREND_WINDOW_DAYS};
use crate::baseline::BaselineStore;
use crate::classifier::{Classifier, FeedRecord};
use crate::config::InsightConfig;
use crate::dedup::dedup_key;
use crate::deviation::DeviationEngine;
use crate::encoder::InsightEncoder;
use crate::error::RhythmError;
use crate::narrative::{detect_cluster_feeding, select_narrative, NarrativeInputs};
use crate::norms::{get_expected_ranges, resolve_age_months};
use crate::prediction::Predictor;
use crate::schema::ActivityAdapter;
use crate::types::{
    Activity, DailyInsight, HouseholdContext, InputSummary, LoggedAt, TrendReport,
};
use chrono::{NaiveDate, NaiveDateTime, Timelike};

/// Compute today's insight for a household at `now` (household-local time).
///
/// Pipeline stages:
/// 1. Classifier - Place activities on local days, split naps from night sleep
/// 2. Aggregator - Sum today up to `now`
/// 3. BaselineStore - Average prior days, paced to the same minute
/// 4. DeviationEngine - Compare today with the baselines
/// 5. Narrative cascade - Pick the story of the day
/// 6. Predictor - Next nap, wake and feed windows
pub fn compute_daily_insight(
    activities: &[Activity],
    household: &HouseholdContext,
    now: NaiveDateTime,
    config: &InsightConfig,
) -> DailyInsight {
    let date = now.date();
    let cutoff = now.hour() * 60 + now.minute() + 1;

    // Stage 1-2: classify and aggregate today so far
    let log = Classifier::classify(activities, household);
    let aggregator = Aggregator::new(&log);
    let today = aggregator.day_until(date, Some(cutoff));

    // Stage 3: baselines over prior days
    let baselines =
        BaselineStore::from_history(&aggregator, date, Some(cutoff), config, &household.travel_days)
            .get_baselines();

    let (age_months, age_is_default) = resolve_age_months(household.baby_birthday, date);

    // Stage 4: deviations
    let engine = DeviationEngine::new(config);
    let deviations = engine.evaluate(&today, &baselines, now);

    // Stage 5: narrative
    let todays_feeds: Vec<&FeedRecord> = log.feeds_on(date).filter(|f| f.at <= now).collect();
    let narrative = select_narrative(&NarrativeInputs {
        today: &today,
        deviations: &deviations,
        cluster: detect_cluster_feeding(&todays_feeds),
        judgeable: engine.is_judgeable(now),
    });
    let narrative_key = household
        .household_id
        .as_deref()
        .map(|id| dedup_key(id, narrative.kind.as_str(), date));

    // Stage 6: predictions
    let predictions = Predictor::new(&log, household, config, age_months).predict(now, &baselines);

    DailyInsight {
        date,
        now,
        age_months,
        age_is_default,
        expected: get_expected_ranges(age_months),
        today,
        baselines,
        deviations,
        narrative,
        narrative_key,
        predictions,
    }
}

/// Trend report over the `window_days` days ending on `end`, travel days excluded
pub fn compute_trend_report(
    activities: &[Activity],
    household: &HouseholdContext,
    end: NaiveDate,
    window_days: u32,
) -> TrendReport {
    let log = Classifier::classify(activities, household);
    build_trend_report(&log, end, window_days, &household.travel_days)
}

/// Convert raw activity JSON to a daily insight payload.
///
/// # Arguments
/// * `activities_json` - JSON array or NDJSON of activity records
/// * `household_json` - Household context JSON (empty for defaults)
/// * `now` - Current time; an offset-less value is taken as household-local
///
/// # Returns
/// Daily insight payload as JSON
///
/// # Example
/// ```ignore
/// let payload = activities_to_daily_insight(
///     activities_json,
///     r#"{"babyBirthday": "2024-01-01"}"#.to_string(),
///     "2024-07-01T14:30:00".to_string(),
/// )?;
/// ```
pub fn activities_to_daily_insight(
    activities_json: String,
    household_json: String,
    now: String,
) -> Result<String, RhythmError> {
    RhythmProcessor::new().daily_insight_json(&activities_json, &household_json, &now)
}

/// Convert raw activity JSON to a trend report payload.
///
/// # Arguments
/// * `activities_json` - JSON array or NDJSON of activity records
/// * `household_json` - Household context JSON (empty for defaults)
/// * `now` - Current time; the report window ends on its local date
/// * `window_days` - Window length (7, 30 and 90 are the standard ones)
pub fn activities_to_trend_report(
    activities_json: String,
    household_json: String,
    now: String,
    window_days: u32,
) -> Result<String, RhythmError> {
    RhythmProcessor::new().trend_report_json(&activities_json, &household_json, &now, window_days)
}

/// Parse a timestamp into household-local wall-clock time
pub fn parse_now(now: &str, household: &HouseholdContext) -> Result<NaiveDateTime, RhythmError> {
    Ok(LoggedAt::parse(now)?.to_local(household.offset()))
}

/// Parse household context JSON; empty input or `null` means defaults
pub fn parse_household(json: &str) -> Result<HouseholdContext, RhythmError> {
    let trimmed = json.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(HouseholdContext::default());
    }
    HouseholdContext::from_json(trimmed)
}

/// Parse activity JSON, dropping unreadable records
pub fn parse_activities(json: &str) -> Result<(Vec<Activity>, InputSummary), RhythmError> {
    let records = ActivityAdapter::parse(json)?;
    let activities = ActivityAdapter::to_activities(&records);
    let summary = InputSummary {
        records: records.len(),
        accepted: activities.len(),
        rejected: records.len() - activities.len(),
    };
    Ok((activities, summary))
}

/// Processor holding configuration and a stable encoder instance.
///
/// Use this when several reports should share one producer instance id.
pub struct RhythmProcessor {
    config: InsightConfig,
    encoder: InsightEncoder,
}

impl Default for RhythmProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl RhythmProcessor {
    /// Create a new processor with default settings
    pub fn new() -> Self {
        Self {
            config: InsightConfig::default(),
            encoder: InsightEncoder::new(),
        }
    }

    /// Create a processor with validated configuration
    pub fn with_config(config: InsightConfig) -> Result<Self, RhythmError> {
        config.validate()?;
        Ok(Self {
            config,
            encoder: InsightEncoder::new(),
        })
    }

    /// Replace the configuration from JSON
    pub fn load_config(&mut self, json: &str) -> Result<(), RhythmError> {
        self.config = InsightConfig::from_json(json)?;
        Ok(())
    }

    pub fn config(&self) -> &InsightConfig {
        &self.config
    }

    pub fn daily_insight(
        &self,
        activities: &[Activity],
        household: &HouseholdContext,
        now: NaiveDateTime,
    ) -> DailyInsight {
        compute_daily_insight(activities, household, now, &self.config)
    }

    pub fn trend_report(
        &self,
        activities: &[Activity],
        household: &HouseholdContext,
        end: NaiveDate,
        window_days: u32,
    ) -> TrendReport {
        compute_trend_report(activities, household, end, window_days)
    }

    /// JSON in, daily insight payload JSON out
    pub fn daily_insight_json(
        &self,
        activities_json: &str,
        household_json: &str,
        now: &str,
    ) -> Result<String, RhythmError> {
        let household = parse_household(household_json)?;
        let now = parse_now(now, &household)?;
        let (activities, input) = parse_activities(activities_json)?;

        let insight = self.daily_insight(&activities, &household, now);
        let payload = self
            .encoder
            .encode_insight(insight, household.household_id.clone(), input);
        InsightEncoder::to_json(&payload)
    }

    /// JSON in, trend report payload JSON out
    pub fn trend_report_json(
        &self,
        activities_json: &str,
        household_json: &str,
        now: &str,
        window_days: u32,
    ) -> Result<String, RhythmError> {
        if window_days > MAX_TREND_WINDOW_DAYS {
            return Err(RhythmError::InvalidConfig(format!(
                "window_days must be at most {}, got {}",
                MAX_TREND_WINDOW_DAYS, window_days
            )));
        }
        let household = parse_household(household_json)?;
        let now = parse_now(now, &household)?;
        let (activities, input) = parse_activities(activities_json)?;

        let report = self.trend_report(&activities, &household, now.date(), window_days);
        let payload =
            self.encoder
                .encode_trend(report, household.household_id.clone(), now, input);
        InsightEncoder::to_json(&payload)
    }
}
