//! Baseline management
//!
//! This module manages rolling baselines over the baby's own prior days.
//! Baselines enable relative interpretation of today's aggregate.
//!
//! Each stored day carries two aggregates: the full day, and the day paced up
//! to the current minute of day. Cumulative metrics (nap minutes, feed count,
//! ...) average the paced values so a half-finished today is compared with
//! the same half of earlier days. Timing and duration metrics use full days.

use crate::aggregate::Aggregator;
use crate::config::{InsightConfig, DEFAULT_BASELINE_WINDOW_DAYS, MAX_LOOKBACK_DAYS};
use crate::types::{Baselines, DayAggregate, Metric, MetricBaseline};
use chrono::{Duration, NaiveDate};
use std::collections::{BTreeSet, VecDeque};
use tracing::debug;

/// One prior day held in the rolling window
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineDay {
    pub full: DayAggregate,
    /// Same day counted only up to the comparison minute
    pub paced: DayAggregate,
}

impl BaselineDay {
    fn sample(&self, metric: Metric) -> Option<f64> {
        if metric.is_cumulative() {
            self.paced.raw_value(metric)
        } else {
            self.full.value(metric)
        }
    }
}

/// Baseline store for managing rolling averages
#[derive(Debug, Clone)]
pub struct BaselineStore {
    /// Qualifying days, oldest first
    days: VecDeque<BaselineDay>,
    /// Maximum window size
    window_size: usize,
}

impl Default for BaselineStore {
    fn default() -> Self {
        Self::new(DEFAULT_BASELINE_WINDOW_DAYS)
    }
}

impl BaselineStore {
    /// Create a new baseline store with specified window size
    pub fn new(window_size: usize) -> Self {
        Self {
            days: VecDeque::with_capacity(window_size),
            window_size: window_size.max(1),
        }
    }

    /// Build the window from the days before `today`.
    ///
    /// Walks back at most `max_lookback_days`, skipping travel days and days
    /// with nothing logged, until the window is full. `cutoff_minute` paces
    /// cumulative metrics; `None` compares full days.
    pub fn from_history(
        aggregator: &Aggregator<'_>,
        today: NaiveDate,
        cutoff_minute: Option<u32>,
        config: &InsightConfig,
        travel_days: &BTreeSet<NaiveDate>,
    ) -> Self {
        let mut store = Self::new(config.baseline_window_days);
        let mut collected = Vec::with_capacity(store.window_size);

        for back in 1..=config.max_lookback_days.min(MAX_LOOKBACK_DAYS) as i64 {
            if collected.len() >= store.window_size {
                break;
            }
            let Some(date) = today.checked_sub_signed(Duration::days(back)) else {
                break;
            };
            if travel_days.contains(&date) {
                debug!(%date, "travel day left out of baseline");
                continue;
            }
            let full = aggregator.day(date);
            if !full.has_data() {
                continue;
            }
            let paced = match cutoff_minute {
                Some(_) => aggregator.day_until(date, cutoff_minute),
                None => full.clone(),
            };
            collected.push(BaselineDay { full, paced });
        }

        // Oldest first, so later pushes roll the window forward
        for day in collected.into_iter().rev() {
            store.push_day(day);
        }
        store
    }

    /// Add a day to the window, dropping the oldest beyond the window size
    pub fn push_day(&mut self, day: BaselineDay) {
        if !day.full.has_data() {
            return;
        }
        self.days.push_back(day);
        while self.days.len() > self.window_size {
            self.days.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Get current baseline values
    pub fn get_baselines(&self) -> Baselines {
        Baselines {
            nap_minutes: self.metric_baseline(Metric::NapMinutes),
            nap_count: self.metric_baseline(Metric::NapCount),
            average_nap_minutes: self.metric_baseline(Metric::AverageNapMinutes),
            feed_volume_oz: self.metric_baseline(Metric::FeedVolumeOz),
            feed_count: self.metric_baseline(Metric::FeedCount),
            diaper_count: self.metric_baseline(Metric::DiaperCount),
            night_sleep_minutes: self.metric_baseline(Metric::NightSleepMinutes),
            wake_window_minutes: self.metric_baseline(Metric::WakeWindowMinutes),
            first_nap_start: self.metric_baseline(Metric::FirstNapStart),
            first_nap_duration: self.metric_baseline(Metric::FirstNapDuration),
            first_feed: self.metric_baseline(Metric::FirstFeed),
            baseline_days: self.days.len() as u32,
        }
    }

    fn metric_baseline(&self, metric: Metric) -> MetricBaseline {
        let values: Vec<f64> = match metric {
            // Pooled over individual samples rather than per-day means
            Metric::WakeWindowMinutes => self
                .days
                .iter()
                .flat_map(|d| d.full.wake_window_minutes.iter().map(|&w| f64::from(w)))
                .collect(),
            _ => self.days.iter().filter_map(|d| d.sample(metric)).collect(),
        };

        MetricBaseline {
            mean: Self::rolling_average(&values),
            samples: values.len(),
        }
    }

    /// Calculate rolling average of a set of values
    pub fn rolling_average(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let sum: f64 = values.iter().sum();
        Some(sum / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;
    use crate::types::{
        Activity, ActivityDetails, FeedDetails, HouseholdContext, LoggedAt, NapDetails,
        VolumeUnit,
    };

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn make_day(d: u32, feeds: u32, nap_minutes: u32) -> DayAggregate {
        let mut agg = DayAggregate::empty(date(d));
        agg.feed_count = feeds;
        agg.nap_minutes = nap_minutes;
        agg.completed_nap_count = 1;
        agg.nap_count = 1;
        agg.activity_count = feeds + 1;
        agg
    }

    fn make_baseline_day(d: u32, feeds: u32, nap_minutes: u32) -> BaselineDay {
        let full = make_day(d, feeds, nap_minutes);
        BaselineDay {
            paced: full.clone(),
            full,
        }
    }

    fn feed(id: &str, day: u32, time: &str) -> Activity {
        Activity {
            id: id.to_string(),
            logged_at: LoggedAt::parse(&format!("2024-03-{:02}T{}:00", day, time)).unwrap(),
            details: ActivityDetails::Feed(FeedDetails {
                quantity: Some("4".to_string()),
                unit: Some(VolumeUnit::Oz),
                ..Default::default()
            }),
        }
    }

    fn nap(id: &str, day: u32, start: &str, end: &str) -> Activity {
        Activity {
            id: id.to_string(),
            logged_at: LoggedAt::parse(&format!("2024-03-{:02}T12:00:00", day)).unwrap(),
            details: ActivityDetails::Nap(NapDetails {
                start_time: Some(start.to_string()),
                end_time: Some(end.to_string()),
                date_local: Some(format!("2024-03-{:02}", day)),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_baseline_accumulation() {
        let mut store = BaselineStore::new(7);

        for i in 0..7 {
            store.push_day(make_baseline_day(i + 1, 5 + i, 120));
        }

        let baselines = store.get_baselines();
        // Average of 5..=11 = 8
        assert!((baselines.feed_count.mean.unwrap() - 8.0).abs() < 0.001);
        assert_eq!(baselines.feed_count.samples, 7);
        assert_eq!(baselines.baseline_days, 7);
    }

    #[test]
    fn test_baseline_window_rolling() {
        let mut store = BaselineStore::new(3);

        // Add 5 days - only last 3 should be kept
        for i in 0..5 {
            store.push_day(make_baseline_day(i + 1, 4, 60 + i * 10));
        }

        let baselines = store.get_baselines();
        // Only 80, 90, 100 should be in window, average = 90
        assert!((baselines.nap_minutes.mean.unwrap() - 90.0).abs() < 0.001);
        assert_eq!(baselines.baseline_days, 3);
    }

    #[test]
    fn test_empty_days_are_not_stored() {
        let mut store = BaselineStore::new(7);
        store.push_day(BaselineDay {
            full: DayAggregate::empty(date(1)),
            paced: DayAggregate::empty(date(1)),
        });
        assert!(store.is_empty());
        assert_eq!(store.get_baselines().feed_count.mean, None);
    }

    #[test]
    fn test_cumulative_metrics_use_paced_values() {
        let mut store = BaselineStore::new(7);
        let full = make_day(1, 8, 120);
        let mut paced = DayAggregate::empty(date(1));
        paced.feed_count = 3;
        store.push_day(BaselineDay { full, paced });

        let baselines = store.get_baselines();
        assert_eq!(baselines.feed_count.mean, Some(3.0));
        // Empty paced half still counts as a zero sample
        assert_eq!(baselines.nap_minutes.mean, Some(0.0));
        assert_eq!(baselines.average_nap_minutes.mean, Some(120.0));
    }

    #[test]
    fn test_from_history_skips_today_travel_and_empty_days() {
        let mut activities = Vec::new();
        for day in [1, 2, 4, 5, 6] {
            activities.push(feed(&format!("a{}", day), day, "08:00"));
            activities.push(feed(&format!("b{}", day), day, "14:00"));
        }
        // Today's data never feeds its own baseline
        for i in 0..6 {
            activities.push(feed(&format!("t{}", i), 7, "07:00"));
        }

        let log = Classifier::classify(&activities, &HouseholdContext::default());
        let aggregator = Aggregator::new(&log);
        let travel: BTreeSet<NaiveDate> = [date(5)].into_iter().collect();
        let config = InsightConfig::default();

        let store = BaselineStore::from_history(&aggregator, date(7), None, &config, &travel);
        let baselines = store.get_baselines();
        assert_eq!(baselines.baseline_days, 4);
        assert_eq!(baselines.feed_count.mean, Some(2.0));

        let paced = BaselineStore::from_history(&aggregator, date(7), Some(12 * 60), &config, &travel);
        assert_eq!(paced.get_baselines().feed_count.mean, Some(1.0));
    }

    #[test]
    fn test_wake_windows_are_pooled() {
        let activities = vec![
            nap("a1", 1, "9:00 AM", "10:00 AM"),
            nap("a2", 1, "12:00 PM", "1:00 PM"),
            nap("b1", 2, "9:00 AM", "10:00 AM"),
            nap("b2", 2, "11:00 AM", "12:00 PM"),
            nap("b3", 2, "1:00 PM", "2:00 PM"),
        ];
        let log = Classifier::classify(&activities, &HouseholdContext::default());
        let store = BaselineStore::from_history(
            &Aggregator::new(&log),
            date(3),
            None,
            &InsightConfig::default(),
            &BTreeSet::new(),
        );
        let wake = store.get_baselines().wake_window_minutes;
        // Samples 120, 60, 60
        assert_eq!(wake.samples, 3);
        assert!((wake.mean.unwrap() - 80.0).abs() < 0.001);
    }
}
