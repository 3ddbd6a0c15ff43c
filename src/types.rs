//! Core types for the Nestling Rhythm pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: typed activities, household context, daily aggregates, baselines,
//! deviations, narratives and predictions.

use crate::classifier::NightWindow;
use crate::error::RhythmError;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::warn;

/// Default night window start (19:00)
pub const DEFAULT_NIGHT_START_HOUR: u32 = 19;

/// Default night window end (07:00)
pub const DEFAULT_NIGHT_END_HOUR: u32 = 7;

/// Kind of logged activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Feed,
    Nap,
    Diaper,
    Note,
    Solids,
    Measure,
    Wake,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Feed => "feed",
            ActivityType::Nap => "nap",
            ActivityType::Diaper => "diaper",
            ActivityType::Note => "note",
            ActivityType::Solids => "solids",
            ActivityType::Measure => "measure",
            ActivityType::Wake => "wake",
        }
    }

    /// Parse a wire type tag (case-insensitive)
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "feed" => Some(ActivityType::Feed),
            "nap" => Some(ActivityType::Nap),
            "diaper" => Some(ActivityType::Diaper),
            "note" => Some(ActivityType::Note),
            "solids" => Some(ActivityType::Solids),
            "measure" => Some(ActivityType::Measure),
            "wake" => Some(ActivityType::Wake),
            _ => None,
        }
    }
}

/// Volume unit for bottle feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeUnit {
    Ml,
    Oz,
}

/// How a feed was given
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedType {
    Bottle,
    Breast,
    Solid,
}

/// Diaper contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiaperType {
    Wet,
    Poopy,
    Both,
}

/// Timestamp of an activity's anchor event.
///
/// The remote store sends either an instant with an offset (`2024-01-15T07:30:00Z`)
/// or a bare local wall-clock time (`2024-01-15T07:30:00`). Both are kept as received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LoggedAt {
    Zoned(DateTime<FixedOffset>),
    Local(NaiveDateTime),
}

impl LoggedAt {
    /// Parse an ISO-8601-ish timestamp string
    pub fn parse(s: &str) -> Result<Self, RhythmError> {
        let s = s.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(LoggedAt::Zoned(dt));
        }

        // Postgres-style "2024-01-15 07:30:00+00"
        for fmt in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"] {
            if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
                return Ok(LoggedAt::Zoned(dt));
            }
        }

        for fmt in [
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%dT%H:%M",
            "%Y-%m-%d %H:%M",
        ] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Ok(LoggedAt::Local(dt));
            }
        }

        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            if let Some(dt) = date.and_hms_opt(0, 0, 0) {
                return Ok(LoggedAt::Local(dt));
            }
        }

        Err(RhythmError::InvalidTimestamp(s.to_string()))
    }

    /// Wall-clock time in the household's timezone.
    ///
    /// Zoned instants are shifted to `offset`; bare local times are taken as-is.
    pub fn to_local(&self, offset: FixedOffset) -> NaiveDateTime {
        match self {
            LoggedAt::Zoned(dt) => dt.with_timezone(&offset).naive_local(),
            LoggedAt::Local(dt) => *dt,
        }
    }
}

/// Feed details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedDetails {
    /// Free-form numeric quantity as entered ("4", "120", "3.5")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<VolumeUnit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_type: Option<FeedType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<String>,
}

/// Nap / sleep details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NapDetails {
    /// "h:mm AM/PM"
    #[serde(alias = "start_time", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    /// "h:mm AM/PM"; absent while the nap is ongoing
    #[serde(alias = "end_time", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(alias = "is_night_sleep", skip_serializing_if = "Option::is_none")]
    pub is_night_sleep: Option<bool>,
    #[serde(rename = "date_local", alias = "dateLocal", skip_serializing_if = "Option::is_none")]
    pub date_local: Option<String>,
    #[serde(rename = "end_date_local", alias = "endDateLocal", skip_serializing_if = "Option::is_none")]
    pub end_date_local: Option<String>,
}

impl NapDetails {
    pub fn is_ongoing(&self) -> bool {
        self.start_time.is_some() && self.end_time.is_none()
    }
}

/// Diaper details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiaperDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diaper_type: Option<DiaperType>,
}

/// Note details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub photos: Vec<String>,
}

/// Solid food details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolidsDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solid_description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allergens: Vec<String>,
}

/// Growth measurement details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasureDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_circumference: Option<f64>,
}

/// Per-type payload of an activity
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "details", rename_all = "lowercase")]
pub enum ActivityDetails {
    Feed(FeedDetails),
    Nap(NapDetails),
    Diaper(DiaperDetails),
    Note(NoteDetails),
    Solids(SolidsDetails),
    Measure(MeasureDetails),
    Wake,
}

/// A single logged activity
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub logged_at: LoggedAt,
    #[serde(flatten)]
    pub details: ActivityDetails,
}

impl Activity {
    pub fn activity_type(&self) -> ActivityType {
        match self.details {
            ActivityDetails::Feed(_) => ActivityType::Feed,
            ActivityDetails::Nap(_) => ActivityType::Nap,
            ActivityDetails::Diaper(_) => ActivityType::Diaper,
            ActivityDetails::Note(_) => ActivityType::Note,
            ActivityDetails::Solids(_) => ActivityType::Solids,
            ActivityDetails::Measure(_) => ActivityType::Measure,
            ActivityDetails::Wake => ActivityType::Wake,
        }
    }

    pub fn nap(&self) -> Option<&NapDetails> {
        match &self.details {
            ActivityDetails::Nap(nap) => Some(nap),
            _ => None,
        }
    }

    pub fn feed(&self) -> Option<&FeedDetails> {
        match &self.details {
            ActivityDetails::Feed(feed) => Some(feed),
            _ => None,
        }
    }

    pub fn diaper(&self) -> Option<&DiaperDetails> {
        match &self.details {
            ActivityDetails::Diaper(diaper) => Some(diaper),
            _ => None,
        }
    }
}

fn default_night_start() -> u32 {
    DEFAULT_NIGHT_START_HOUR
}

fn default_night_end() -> u32 {
    DEFAULT_NIGHT_END_HOUR
}

/// Birthday as a date, or the date part of a timestamp; anything else is unknown
fn lenient_birthday<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => s,
        Some(other) => {
            warn!(value = %other, "babyBirthday is not a string, age falls back to default");
            return Ok(None);
        }
    };

    let trimmed = raw.trim();
    let parsed = trimmed
        .get(..10)
        .and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok());
    if parsed.is_none() {
        warn!(value = trimmed, "unparsable babyBirthday, age falls back to default");
    }
    Ok(parsed)
}

/// Household settings that parameterize classification and age lookups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseholdContext {
    #[serde(default, alias = "household_id")]
    pub household_id: Option<String>,
    /// Unreadable values are treated as unknown
    #[serde(default, alias = "baby_birthday", deserialize_with = "lenient_birthday")]
    pub baby_birthday: Option<NaiveDate>,
    #[serde(default = "default_night_start", alias = "night_sleep_start_hour")]
    pub night_sleep_start_hour: u32,
    #[serde(default = "default_night_end", alias = "night_sleep_end_hour")]
    pub night_sleep_end_hour: u32,
    /// Household UTC offset, used to place zoned timestamps on a local calendar day
    #[serde(default, alias = "utc_offset_minutes")]
    pub utc_offset_minutes: i32,
    /// User-declared atypical days, excluded from aggregates and baselines
    #[serde(default, alias = "travel_days")]
    pub travel_days: BTreeSet<NaiveDate>,
}

impl Default for HouseholdContext {
    fn default() -> Self {
        Self {
            household_id: None,
            baby_birthday: None,
            night_sleep_start_hour: DEFAULT_NIGHT_START_HOUR,
            night_sleep_end_hour: DEFAULT_NIGHT_END_HOUR,
            utc_offset_minutes: 0,
            travel_days: BTreeSet::new(),
        }
    }
}

impl HouseholdContext {
    pub fn night_window(&self) -> NightWindow {
        NightWindow::new(self.night_sleep_start_hour, self.night_sleep_end_hour)
    }

    /// Household timezone as a fixed offset (UTC when out of range)
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix())
    }

    /// Load household context from JSON
    pub fn from_json(json: &str) -> Result<Self, RhythmError> {
        let ctx: HouseholdContext = serde_json::from_str(json)?;
        if ctx.night_sleep_start_hour > 23 || ctx.night_sleep_end_hour > 23 {
            return Err(RhythmError::InvalidConfig(format!(
                "night window hours must be 0-23, got {}-{}",
                ctx.night_sleep_start_hour, ctx.night_sleep_end_hour
            )));
        }
        Ok(ctx)
    }
}

/// Metrics tracked per day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    NapMinutes,
    NapCount,
    AverageNapMinutes,
    FeedVolumeOz,
    FeedCount,
    DiaperCount,
    NightSleepMinutes,
    WakeWindowMinutes,
    FirstNapStart,
    FirstNapDuration,
    FirstFeed,
}

impl Metric {
    pub const ALL: [Metric; 11] = [
        Metric::NapMinutes,
        Metric::NapCount,
        Metric::AverageNapMinutes,
        Metric::FeedVolumeOz,
        Metric::FeedCount,
        Metric::DiaperCount,
        Metric::NightSleepMinutes,
        Metric::WakeWindowMinutes,
        Metric::FirstNapStart,
        Metric::FirstNapDuration,
        Metric::FirstFeed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::NapMinutes => "nap_minutes",
            Metric::NapCount => "nap_count",
            Metric::AverageNapMinutes => "average_nap_minutes",
            Metric::FeedVolumeOz => "feed_volume_oz",
            Metric::FeedCount => "feed_count",
            Metric::DiaperCount => "diaper_count",
            Metric::NightSleepMinutes => "night_sleep_minutes",
            Metric::WakeWindowMinutes => "wake_window_minutes",
            Metric::FirstNapStart => "first_nap_start",
            Metric::FirstNapDuration => "first_nap_duration",
            Metric::FirstFeed => "first_feed",
        }
    }

    /// Metrics that accumulate over the day and must be paced to the time of day
    pub fn is_cumulative(&self) -> bool {
        matches!(
            self,
            Metric::NapMinutes
                | Metric::NapCount
                | Metric::FeedVolumeOz
                | Metric::FeedCount
                | Metric::DiaperCount
        )
    }
}

/// Per-day summary computed from the activity log. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayAggregate {
    pub date: NaiveDate,
    /// Total minutes of completed daytime naps
    pub nap_minutes: u32,
    /// Daytime naps started (completed or ongoing)
    pub nap_count: u32,
    /// Daytime naps with both start and end
    pub completed_nap_count: u32,
    /// Total feed volume, normalized to ounces
    pub feed_volume_oz: f64,
    pub feed_count: u32,
    pub diaper_count: u32,
    pub wet_diaper_count: u32,
    pub dirty_diaper_count: u32,
    pub solids_count: u32,
    /// Minutes of completed night sleep that started on this day
    pub night_sleep_minutes: u32,
    pub wake_window_minutes: Vec<u32>,
    /// Minutes since midnight of the first daytime nap start
    pub first_nap_start_minute: Option<u32>,
    pub first_nap_duration_minutes: Option<u32>,
    /// Minutes since midnight of the first feed
    pub first_feed_minute: Option<u32>,
    /// Number of activities of any type that fell on this day
    pub activity_count: u32,
}

impl DayAggregate {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            nap_minutes: 0,
            nap_count: 0,
            completed_nap_count: 0,
            feed_volume_oz: 0.0,
            feed_count: 0,
            diaper_count: 0,
            wet_diaper_count: 0,
            dirty_diaper_count: 0,
            solids_count: 0,
            night_sleep_minutes: 0,
            wake_window_minutes: Vec::new(),
            first_nap_start_minute: None,
            first_nap_duration_minutes: None,
            first_feed_minute: None,
            activity_count: 0,
        }
    }

    /// Whether anything at all was logged on this day
    pub fn has_data(&self) -> bool {
        self.activity_count > 0
    }

    pub fn average_nap_minutes(&self) -> Option<f64> {
        if self.completed_nap_count == 0 {
            return None;
        }
        Some(self.nap_minutes as f64 / self.completed_nap_count as f64)
    }

    pub fn average_wake_window(&self) -> Option<f64> {
        if self.wake_window_minutes.is_empty() {
            return None;
        }
        let sum: u32 = self.wake_window_minutes.iter().sum();
        Some(sum as f64 / self.wake_window_minutes.len() as f64)
    }

    /// Value of a metric for this day; `None` when the day carries no sample for it
    pub fn value(&self, metric: Metric) -> Option<f64> {
        if !self.has_data() {
            return None;
        }
        self.raw_value(metric)
    }

    /// Value of a metric without the has-data gate, so an empty partial day reads as zero
    pub fn raw_value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::NapMinutes => Some(self.nap_minutes as f64),
            Metric::NapCount => Some(self.nap_count as f64),
            Metric::AverageNapMinutes => self.average_nap_minutes(),
            Metric::FeedVolumeOz => Some(self.feed_volume_oz),
            Metric::FeedCount => Some(self.feed_count as f64),
            Metric::DiaperCount => Some(self.diaper_count as f64),
            Metric::NightSleepMinutes => Some(self.night_sleep_minutes as f64),
            Metric::WakeWindowMinutes => self.average_wake_window(),
            Metric::FirstNapStart => self.first_nap_start_minute.map(f64::from),
            Metric::FirstNapDuration => self.first_nap_duration_minutes.map(f64::from),
            Metric::FirstFeed => self.first_feed_minute.map(f64::from),
        }
    }
}

/// Rolling mean of one metric and the number of samples behind it
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricBaseline {
    pub mean: Option<f64>,
    pub samples: usize,
}

impl MetricBaseline {
    /// Mean, only when at least `min_samples` went into it
    pub fn gated(&self, min_samples: usize) -> Option<f64> {
        if self.samples < min_samples.max(1) {
            return None;
        }
        self.mean
    }
}

/// Baseline values for relative interpretation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Baselines {
    pub nap_minutes: MetricBaseline,
    pub nap_count: MetricBaseline,
    pub average_nap_minutes: MetricBaseline,
    pub feed_volume_oz: MetricBaseline,
    pub feed_count: MetricBaseline,
    pub diaper_count: MetricBaseline,
    pub night_sleep_minutes: MetricBaseline,
    /// Pooled over individual wake-window samples, not per-day means
    pub wake_window_minutes: MetricBaseline,
    pub first_nap_start: MetricBaseline,
    pub first_nap_duration: MetricBaseline,
    pub first_feed: MetricBaseline,
    /// Number of prior days used to compute baselines
    pub baseline_days: u32,
}

impl Baselines {
    pub fn get(&self, metric: Metric) -> MetricBaseline {
        match metric {
            Metric::NapMinutes => self.nap_minutes,
            Metric::NapCount => self.nap_count,
            Metric::AverageNapMinutes => self.average_nap_minutes,
            Metric::FeedVolumeOz => self.feed_volume_oz,
            Metric::FeedCount => self.feed_count,
            Metric::DiaperCount => self.diaper_count,
            Metric::NightSleepMinutes => self.night_sleep_minutes,
            Metric::WakeWindowMinutes => self.wake_window_minutes,
            Metric::FirstNapStart => self.first_nap_start,
            Metric::FirstNapDuration => self.first_nap_duration,
            Metric::FirstFeed => self.first_feed,
        }
    }
}

/// Where a value sits relative to its baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Trend {
    Behind,
    OnTrack,
    Ahead,
}

/// Today's value of a metric compared to its baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDeviation {
    pub metric: Metric,
    pub today: f64,
    pub baseline: f64,
    pub samples: usize,
    pub trend: Trend,
    /// Deviation from baseline as a percentage
    pub deviation_pct: Option<f64>,
}

/// Narrative rule identifiers, in cascade order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeKind {
    ClusterFeeding,
    FirstNapTiming,
    FirstNapDuration,
    FirstFeedTiming,
    FeedVolume,
    WakeWindow,
    NapDuration,
    GrowthSpurt,
    Aligned,
    Fallback,
}

impl NarrativeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NarrativeKind::ClusterFeeding => "cluster_feeding",
            NarrativeKind::FirstNapTiming => "first_nap_timing",
            NarrativeKind::FirstNapDuration => "first_nap_duration",
            NarrativeKind::FirstFeedTiming => "first_feed_timing",
            NarrativeKind::FeedVolume => "feed_volume",
            NarrativeKind::WakeWindow => "wake_window",
            NarrativeKind::NapDuration => "nap_duration",
            NarrativeKind::GrowthSpurt => "growth_spurt",
            NarrativeKind::Aligned => "aligned",
            NarrativeKind::Fallback => "fallback",
        }
    }
}

/// Human-readable story of the day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Narrative {
    pub kind: NarrativeKind,
    pub headline: String,
    pub detail: String,
}

/// What a prediction is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionKind {
    NextNap,
    Bedtime,
    Wake,
    NextFeed,
}

/// Data a prediction was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionBasis {
    /// The baby's own recent history
    Personal,
    /// Age-indexed normative table
    AgeNorm,
}

/// Predicted window for the next activity (household-local times)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub kind: PredictionKind,
    pub window_start: NaiveDateTime,
    pub window_end: NaiveDateTime,
    pub basis: PredictionBasis,
    /// The window has already closed at `now`
    pub overdue: bool,
}

/// Expected daily ranges for an age band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedRanges {
    pub feeds: (u32, u32),
    pub naps: (u32, u32),
}

/// Full daily insight: today's aggregate against its baselines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyInsight {
    pub date: NaiveDate,
    pub now: NaiveDateTime,
    pub age_months: f64,
    /// Age fell back to the default because no birthday was known
    pub age_is_default: bool,
    pub expected: ExpectedRanges,
    pub today: DayAggregate,
    pub baselines: Baselines,
    pub deviations: Vec<MetricDeviation>,
    pub narrative: Narrative,
    /// Dedup marker for the narrative, present when the household is known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative_key: Option<String>,
    pub predictions: Vec<Prediction>,
}

/// Totals and per-day averages over a period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub days: u32,
    pub days_with_data: u32,
    pub excluded_travel_days: u32,
    pub total_nap_minutes: u32,
    pub total_nap_count: u32,
    pub total_feed_volume_oz: f64,
    pub total_feed_count: u32,
    pub total_diaper_count: u32,
    pub total_night_sleep_minutes: u32,
    pub avg_nap_minutes: Option<f64>,
    pub avg_nap_count: Option<f64>,
    pub avg_feed_volume_oz: Option<f64>,
    pub avg_feed_count: Option<f64>,
    pub avg_night_sleep_minutes: Option<f64>,
    pub avg_wake_window_minutes: Option<f64>,
}

/// Sparkline-ready values of one metric, one slot per day (None = no sample)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub metric: Metric,
    pub values: Vec<Option<f64>>,
}

/// Multi-day trend report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub window_days: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days: Vec<DayAggregate>,
    pub summary: PeriodSummary,
    pub series: Vec<MetricSeries>,
}

/// Producer metadata stamped on every output payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// How much of the input made it into the computation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSummary {
    pub records: usize,
    pub accepted: usize,
    pub rejected: usize,
}

/// Kind of report carried by a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    DailyInsight,
    TrendReport,
}

/// Versioned envelope around a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RhythmPayload<T> {
    pub schema_version: String,
    pub kind: ReportKind,
    pub producer: Producer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub household_id: Option<String>,
    /// Household-local time the report was computed for
    pub as_of: NaiveDateTime,
    pub input: InputSummary,
    pub report: T,
}
