//! Rolling aggregation
//!
//! This module sums a classified log into per-day aggregates and multi-day
//! summaries:
//! - Daytime nap minutes and counts, night sleep minutes
//! - Feed counts and normalized volume, diaper counts
//! - Wake windows between consecutive daytime naps
//! - 7/30/90-day period summaries and sparkline series
//!
//! Aggregation never fails. Records that could not be classified were already
//! left out by the classifier and simply do not contribute.

use crate::classifier::{Classifier, ClassifiedLog, SleepRecord};
use crate::normalizer::duration_minutes;
use crate::types::{
    Activity, ActivityType, DayAggregate, DiaperType, HouseholdContext, Metric, MetricSeries,
    PeriodSummary, TrendReport,
};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Wake-window samples must fall strictly inside (0, 360) minutes
pub const WAKE_WINDOW_MAX_MINUTES: u32 = 360;

/// Longest trend window served; longer requests are clamped
pub const MAX_TREND_WINDOW_DAYS: u32 = 366;

/// Standard trend windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendWindow {
    Week,
    Month,
    Quarter,
}

impl TrendWindow {
    pub fn days(&self) -> u32 {
        match self {
            TrendWindow::Week => 7,
            TrendWindow::Month => 30,
            TrendWindow::Quarter => 90,
        }
    }

    pub fn from_days(days: u32) -> Option<Self> {
        match days {
            7 => Some(TrendWindow::Week),
            30 => Some(TrendWindow::Month),
            90 => Some(TrendWindow::Quarter),
            _ => None,
        }
    }
}

/// Wake windows between adjacent naps (sorted by start).
///
/// Each adjacent pair where the earlier nap has ended yields
/// `next.start - prev.end` (wrap-safe). Samples outside (0, 360) are dropped.
pub fn extract_wake_windows(naps: &[&SleepRecord]) -> Vec<u32> {
    naps.windows(2)
        .filter_map(|pair| {
            let prev_end = pair[0].end_minute?;
            let sample = duration_minutes(prev_end, pair[1].start_minute);
            (sample > 0 && sample < WAKE_WINDOW_MAX_MINUTES).then_some(sample)
        })
        .collect()
}

/// Aggregates a classified log day by day
pub struct Aggregator<'a> {
    log: &'a ClassifiedLog,
}

impl<'a> Aggregator<'a> {
    pub fn new(log: &'a ClassifiedLog) -> Self {
        Self { log }
    }

    /// Full-day aggregate for `date`
    pub fn day(&self, date: NaiveDate) -> DayAggregate {
        self.day_until(date, None)
    }

    /// Aggregate for `date`, counting only what happened before `cutoff_minute`.
    ///
    /// A nap counts once started before the cutoff; its minutes count once it
    /// also ended before the cutoff. Used to pace partial days against history.
    pub fn day_until(&self, date: NaiveDate, cutoff_minute: Option<u32>) -> DayAggregate {
        let before = |minute: u32| cutoff_minute.map_or(true, |cutoff| minute < cutoff);
        let finished = |sleep: &SleepRecord| -> Option<u32> {
            let duration = sleep.duration_minutes?;
            match cutoff_minute {
                Some(cutoff) if sleep.start_minute + duration > cutoff => None,
                _ => Some(duration),
            }
        };

        let mut agg = DayAggregate::empty(date);

        // Sleeps are sorted by start in the classified log
        let naps: Vec<&SleepRecord> = self
            .log
            .daytime_naps_on(date)
            .filter(|s| before(s.start_minute))
            .collect();

        // Wake windows only between naps that had ended by the cutoff
        let settled: Vec<SleepRecord> = naps
            .iter()
            .map(|s| {
                let mut s = (*s).clone();
                if finished(&s).is_none() {
                    s.end_minute = None;
                }
                s
            })
            .collect();
        let settled_refs: Vec<&SleepRecord> = settled.iter().collect();

        agg.nap_count = naps.len() as u32;
        for nap in &naps {
            if let Some(duration) = finished(nap) {
                agg.nap_minutes += duration;
                agg.completed_nap_count += 1;
            }
        }
        if let Some(first) = naps.first() {
            agg.first_nap_start_minute = Some(first.start_minute);
            agg.first_nap_duration_minutes = finished(first);
        }
        agg.wake_window_minutes = extract_wake_windows(&settled_refs);

        agg.night_sleep_minutes = self
            .log
            .sleeps
            .iter()
            .filter(|s| s.is_night && s.date == date && before(s.start_minute))
            .filter_map(|s| finished(s))
            .sum();

        for feed in self.log.feeds_on(date).filter(|f| before(f.minute)) {
            agg.feed_count += 1;
            agg.feed_volume_oz += feed.volume_oz.unwrap_or(0.0);
            agg.first_feed_minute = Some(
                agg.first_feed_minute
                    .map_or(feed.minute, |m| m.min(feed.minute)),
            );
        }

        for diaper in self
            .log
            .diapers
            .iter()
            .filter(|d| d.date == date && before(d.minute))
        {
            agg.diaper_count += 1;
            match diaper.diaper_type {
                Some(DiaperType::Wet) => agg.wet_diaper_count += 1,
                Some(DiaperType::Poopy) => agg.dirty_diaper_count += 1,
                Some(DiaperType::Both) => {
                    agg.wet_diaper_count += 1;
                    agg.dirty_diaper_count += 1;
                }
                None => {}
            }
        }

        for event in self
            .log
            .events
            .iter()
            .filter(|e| e.date == date && before(e.minute))
        {
            agg.activity_count += 1;
            if event.activity_type == ActivityType::Solids {
                agg.solids_count += 1;
            }
        }

        agg
    }

    /// One aggregate per calendar day in `[start, end]`, skipping travel days
    pub fn period(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        travel_days: &BTreeSet<NaiveDate>,
    ) -> Vec<DayAggregate> {
        days_in_range(start, end)
            .filter(|d| !travel_days.contains(d))
            .map(|d| self.day(d))
            .collect()
    }
}

/// Every calendar day in `[start, end]` (empty when `end < start`)
pub fn days_in_range(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let span = (end - start).num_days();
    (0..=span).map_while(move |offset| start.checked_add_signed(Duration::days(offset)))
}

/// Aggregate a single day straight from raw activities
pub fn aggregate_day(
    activities: &[Activity],
    date: NaiveDate,
    household: &HouseholdContext,
) -> DayAggregate {
    let log = Classifier::classify(activities, household);
    Aggregator::new(&log).day(date)
}

/// Aggregate each day in `[start, end]` straight from raw activities.
///
/// Days in `travel_days` are left out of the result entirely.
pub fn aggregate_period(
    activities: &[Activity],
    start: NaiveDate,
    end: NaiveDate,
    household: &HouseholdContext,
    travel_days: &BTreeSet<NaiveDate>,
) -> Vec<DayAggregate> {
    let log = Classifier::classify(activities, household);
    Aggregator::new(&log).period(start, end, travel_days)
}

/// Totals and per-day averages over a run of day aggregates.
///
/// Averages only count days that have any logged activity.
pub fn summarize(days: &[DayAggregate], excluded_travel_days: u32) -> PeriodSummary {
    let with_data: Vec<&DayAggregate> = days.iter().filter(|d| d.has_data()).collect();
    let n = with_data.len();

    let average = |f: &dyn Fn(&DayAggregate) -> f64| -> Option<f64> {
        if n == 0 {
            return None;
        }
        Some(with_data.iter().map(|d| f(d)).sum::<f64>() / n as f64)
    };

    let wake_samples: Vec<u32> = days
        .iter()
        .flat_map(|d| d.wake_window_minutes.iter().copied())
        .collect();
    let avg_wake_window_minutes = if wake_samples.is_empty() {
        None
    } else {
        Some(wake_samples.iter().sum::<u32>() as f64 / wake_samples.len() as f64)
    };

    PeriodSummary {
        days: days.len() as u32,
        days_with_data: n as u32,
        excluded_travel_days,
        total_nap_minutes: days.iter().map(|d| d.nap_minutes).sum(),
        total_nap_count: days.iter().map(|d| d.nap_count).sum(),
        total_feed_volume_oz: days.iter().map(|d| d.feed_volume_oz).sum(),
        total_feed_count: days.iter().map(|d| d.feed_count).sum(),
        total_diaper_count: days.iter().map(|d| d.diaper_count).sum(),
        total_night_sleep_minutes: days.iter().map(|d| d.night_sleep_minutes).sum(),
        avg_nap_minutes: average(&|d| d.nap_minutes as f64),
        avg_nap_count: average(&|d| d.nap_count as f64),
        avg_feed_volume_oz: average(&|d| d.feed_volume_oz),
        avg_feed_count: average(&|d| d.feed_count as f64),
        avg_night_sleep_minutes: average(&|d| d.night_sleep_minutes as f64),
        avg_wake_window_minutes,
    }
}

/// Sparkline-ready series, one value per day per metric
pub fn build_series(days: &[DayAggregate], metrics: &[Metric]) -> Vec<MetricSeries> {
    metrics
        .iter()
        .map(|&metric| MetricSeries {
            metric,
            values: days.iter().map(|d| d.value(metric)).collect(),
        })
        .collect()
}

/// Trend report for the `window_days` days ending on `end` (inclusive)
pub fn build_trend_report(
    log: &ClassifiedLog,
    end: NaiveDate,
    window_days: u32,
    travel_days: &BTreeSet<NaiveDate>,
) -> TrendReport {
    let window_days = window_days.clamp(1, MAX_TREND_WINDOW_DAYS);
    let start = end
        .checked_sub_signed(Duration::days(i64::from(window_days) - 1))
        .unwrap_or(NaiveDate::MIN);
    let excluded = days_in_range(start, end)
        .filter(|d| travel_days.contains(d))
        .count() as u32;

    let days = Aggregator::new(log).period(start, end, travel_days);
    let summary = summarize(&days, excluded);
    let series = build_series(
        &days,
        &[
            Metric::NapMinutes,
            Metric::NapCount,
            Metric::FeedVolumeOz,
            Metric::FeedCount,
            Metric::NightSleepMinutes,
            Metric::WakeWindowMinutes,
            Metric::DiaperCount,
        ],
    );

    TrendReport {
        window_days,
        start,
        end,
        days,
        summary,
        series,
    }
}
