//! Next-activity prediction
//!
//! Rule-based windows for what comes next:
//! - wake time for a nap in progress
//! - next nap (or bedtime) from the last wake-up plus a wake window
//! - next feed from the last feed plus a feed interval
//!
//! Personal history is used once it has enough samples; otherwise the
//! age-indexed norms fill in.

use crate::classifier::{ClassifiedLog, SleepRecord};
use crate::config::{InsightConfig, MAX_LOOKBACK_DAYS};
use crate::norms::{expected_wake_window, get_expected_ranges, typical_nap_duration, typical_night_sleep};
use crate::types::{
    Baselines, HouseholdContext, Prediction, PredictionBasis, PredictionKind,
};
use chrono::{Duration, NaiveDateTime, Timelike};
use tracing::debug;

/// Half-width of a window centred on a personal mean
pub const PERSONAL_SPREAD_MINUTES: i64 = 15;

/// Feed gaps must fall strictly inside (0, 360) minutes to count
pub const FEED_INTERVAL_MAX_MINUTES: i64 = 360;

/// A wake-up or open sleep older than this no longer anchors a prediction
pub const WAKE_ANCHOR_MAX_HOURS: i64 = 12;

/// Predicts upcoming activity windows from a classified log
pub struct Predictor<'a> {
    log: &'a ClassifiedLog,
    household: &'a HouseholdContext,
    config: &'a InsightConfig,
    age_months: f64,
}

impl<'a> Predictor<'a> {
    pub fn new(
        log: &'a ClassifiedLog,
        household: &'a HouseholdContext,
        config: &'a InsightConfig,
        age_months: f64,
    ) -> Self {
        Self {
            log,
            household,
            config,
            age_months,
        }
    }

    /// All predictions that can be made at `now`
    pub fn predict(&self, now: NaiveDateTime, baselines: &Baselines) -> Vec<Prediction> {
        let mut predictions = Vec::new();

        match self
            .log
            .ongoing_sleep(now, Duration::hours(WAKE_ANCHOR_MAX_HOURS))
        {
            Some(sleep) => predictions.push(self.predict_wake(sleep, now, baselines)),
            None => {
                if let Some(nap) = self.predict_next_nap(now, baselines) {
                    predictions.push(nap);
                }
            }
        }

        if let Some(feed) = self.predict_next_feed(now) {
            predictions.push(feed);
        }

        predictions
    }

    /// When a sleep in progress is expected to end
    pub fn predict_wake(
        &self,
        sleep: &SleepRecord,
        now: NaiveDateTime,
        baselines: &Baselines,
    ) -> Prediction {
        let personal = baselines
            .average_nap_minutes
            .gated(self.config.min_samples)
            .filter(|_| !sleep.is_night);

        let (lo, hi, basis) = match personal {
            Some(mean) => spread(mean),
            None => {
                let (lo, hi) = if sleep.is_night {
                    typical_night_sleep(self.age_months)
                } else {
                    typical_nap_duration(self.age_months)
                };
                (i64::from(lo), i64::from(hi), PredictionBasis::AgeNorm)
            }
        };

        window(PredictionKind::Wake, sleep.start_at, lo, hi, basis, now)
    }

    /// Next nap window, labelled bedtime when it opens inside the night window
    pub fn predict_next_nap(&self, now: NaiveDateTime, baselines: &Baselines) -> Option<Prediction> {
        let anchor = self.last_wake_up(now)?;
        if now - anchor > Duration::hours(WAKE_ANCHOR_MAX_HOURS) {
            debug!(%anchor, "last wake-up too old to anchor a nap prediction");
            return None;
        }

        let (lo, hi, basis) = match baselines.wake_window_minutes.gated(self.config.min_samples) {
            Some(mean) => spread(mean),
            None => {
                let (lo, hi) = expected_wake_window(self.age_months);
                (i64::from(lo), i64::from(hi), PredictionBasis::AgeNorm)
            }
        };

        let mut prediction = window(PredictionKind::NextNap, anchor, lo, hi, basis, now);
        if self
            .household
            .night_window()
            .is_night_time(prediction.window_start.hour())
        {
            prediction.kind = PredictionKind::Bedtime;
        }
        Some(prediction)
    }

    /// Next feed window from the last feed
    pub fn predict_next_feed(&self, now: NaiveDateTime) -> Option<Prediction> {
        let last = self.log.last_feed(now)?;

        let (lo, hi, basis) = match self.personal_feed_interval(now) {
            Some(mean) => spread(mean),
            None => {
                let (fewest, most) = get_expected_ranges(self.age_months).feeds;
                let lo = 1440 / i64::from(most.max(1));
                let hi = 1440 / i64::from(fewest.max(1));
                (lo, hi, PredictionBasis::AgeNorm)
            }
        };

        Some(window(PredictionKind::NextFeed, last.at, lo, hi, basis, now))
    }

    /// Mean gap between consecutive feeds over the lookback, when enough gaps exist
    pub fn personal_feed_interval(&self, now: NaiveDateTime) -> Option<f64> {
        let lookback = self.config.max_lookback_days.min(MAX_LOOKBACK_DAYS) as i64;
        let since = now.checked_sub_signed(Duration::days(lookback));
        let feeds: Vec<NaiveDateTime> = self
            .log
            .feeds
            .iter()
            .filter(|f| f.at <= now && since.map_or(true, |since| f.at >= since))
            .filter(|f| !self.household.travel_days.contains(&f.date))
            .map(|f| f.at)
            .collect();

        let gaps: Vec<f64> = feeds
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).num_minutes())
            .filter(|&gap| gap > 0 && gap < FEED_INTERVAL_MAX_MINUTES)
            .map(|gap| gap as f64)
            .collect();

        if gaps.len() < self.config.min_samples.max(1) {
            return None;
        }
        Some(gaps.iter().sum::<f64>() / gaps.len() as f64)
    }

    /// Latest of the last completed sleep's end and an explicit wake event
    fn last_wake_up(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        let sleep_end = self.log.last_completed_sleep(now).and_then(|s| s.end_at);
        let wake_event = self.log.last_wake_at(now);
        sleep_end.max(wake_event)
    }
}

fn spread(mean: f64) -> (i64, i64, PredictionBasis) {
    let centre = mean.round() as i64;
    (
        (centre - PERSONAL_SPREAD_MINUTES).max(0),
        centre + PERSONAL_SPREAD_MINUTES,
        PredictionBasis::Personal,
    )
}

fn window(
    kind: PredictionKind,
    anchor: NaiveDateTime,
    lo_minutes: i64,
    hi_minutes: i64,
    basis: PredictionBasis,
    now: NaiveDateTime,
) -> Prediction {
    let window_start = anchor + Duration::minutes(lo_minutes);
    let window_end = anchor + Duration::minutes(hi_minutes.max(lo_minutes));
    Prediction {
        kind,
        window_start,
        window_end,
        basis,
        overdue: window_end < now,
    }
}
