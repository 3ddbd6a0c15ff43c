//! Deviation detection
//!
//! Compares today's aggregate against rolling baselines. Every check is gated:
//! - too few baseline samples suppresses the check entirely
//! - before the judgement hour every metric reads as on-track

use crate::config::InsightConfig;
use crate::types::{Baselines, DayAggregate, Metric, MetricDeviation, Trend};
use chrono::{NaiveDateTime, Timelike};
use tracing::debug;

/// Classify `value` against `baseline` with a purely relative tolerance
pub fn classify(value: f64, baseline: f64, tolerance_fraction: f64) -> Trend {
    classify_with_floor(value, baseline, tolerance_fraction, 0.0)
}

/// Classify with a tolerance of `max(fraction * |baseline|, floor)`.
///
/// The floor keeps small baselines (one nap, two diapers) from flipping on a
/// single event. Non-finite inputs read as on-track.
pub fn classify_with_floor(value: f64, baseline: f64, tolerance_fraction: f64, floor: f64) -> Trend {
    if !value.is_finite() || !baseline.is_finite() {
        return Trend::OnTrack;
    }
    let tolerance = (tolerance_fraction.abs() * baseline.abs()).max(floor.max(0.0));
    if value > baseline + tolerance {
        Trend::Ahead
    } else if value < baseline - tolerance {
        Trend::Behind
    } else {
        Trend::OnTrack
    }
}

/// Deviation from baseline as a percentage
pub fn deviation_pct(current: f64, baseline: f64) -> Option<f64> {
    if baseline > 0.0 && current.is_finite() {
        Some(((current - baseline) / baseline) * 100.0)
    } else {
        None
    }
}

/// Absolute tolerance floor for a metric
pub fn tolerance_floor(metric: Metric, config: &InsightConfig) -> f64 {
    match metric {
        Metric::FirstNapStart | Metric::FirstFeed => config.timing_tolerance_minutes,
        Metric::NapMinutes
        | Metric::AverageNapMinutes
        | Metric::NightSleepMinutes
        | Metric::WakeWindowMinutes
        | Metric::FirstNapDuration => config.duration_tolerance_minutes,
        Metric::NapCount | Metric::FeedCount | Metric::DiaperCount => config.count_tolerance,
        Metric::FeedVolumeOz => config.volume_tolerance_oz,
    }
}

/// Per-metric deviation checks against baselines
pub struct DeviationEngine<'a> {
    config: &'a InsightConfig,
}

impl<'a> DeviationEngine<'a> {
    pub fn new(config: &'a InsightConfig) -> Self {
        Self { config }
    }

    /// Whether enough of the day has passed to judge deviations
    pub fn is_judgeable(&self, now: NaiveDateTime) -> bool {
        now.hour() >= self.config.judgement_hour
    }

    /// Compare one metric, or `None` when either side has no usable value
    pub fn classify_metric(
        &self,
        metric: Metric,
        today: &DayAggregate,
        baselines: &Baselines,
        now: NaiveDateTime,
    ) -> Option<MetricDeviation> {
        let value = today.value(metric)?;
        let baseline = baselines.get(metric);

        let Some(mean) = baseline.gated(self.config.min_samples) else {
            debug!(
                metric = metric.as_str(),
                samples = baseline.samples,
                min_samples = self.config.min_samples,
                "deviation check suppressed: insufficient baseline samples"
            );
            return None;
        };

        let trend = if self.is_judgeable(now) {
            classify_with_floor(
                value,
                mean,
                self.config.tolerance_fraction,
                tolerance_floor(metric, self.config),
            )
        } else {
            Trend::OnTrack
        };

        Some(MetricDeviation {
            metric,
            today: value,
            baseline: mean,
            samples: baseline.samples,
            trend,
            deviation_pct: deviation_pct(value, mean),
        })
    }

    /// Evaluate every tracked metric that has both a value and a baseline
    pub fn evaluate(
        &self,
        today: &DayAggregate,
        baselines: &Baselines,
        now: NaiveDateTime,
    ) -> Vec<MetricDeviation> {
        Metric::ALL
            .iter()
            .filter_map(|&metric| self.classify_metric(metric, today, baselines, now))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MetricBaseline;
    use chrono::NaiveDate;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn today_with_wake_windows(samples: Vec<u32>) -> DayAggregate {
        let mut agg = DayAggregate::empty(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        agg.activity_count = 5;
        agg.wake_window_minutes = samples;
        agg
    }

    #[test]
    fn test_classify_thresholds() {
        assert_eq!(classify(100.0, 100.0, 0.2), Trend::OnTrack);
        assert_eq!(classify(120.0, 100.0, 0.2), Trend::OnTrack);
        assert_eq!(classify(121.0, 100.0, 0.2), Trend::Ahead);
        assert_eq!(classify(80.0, 100.0, 0.2), Trend::OnTrack);
        assert_eq!(classify(79.0, 100.0, 0.2), Trend::Behind);
    }

    #[test]
    fn test_classification_is_monotonic() {
        fn rank(t: Trend) -> u8 {
            match t {
                Trend::Behind => 0,
                Trend::OnTrack => 1,
                Trend::Ahead => 2,
            }
        }
        for baseline in [1.0, 7.5, 60.0, 480.0] {
            for fraction in [0.0, 0.1, 0.2, 0.5] {
                let mut last = 0;
                for step in 0..=400 {
                    let value = baseline * step as f64 / 100.0;
                    let r = rank(classify(value, baseline, fraction));
                    assert!(r >= last, "value {} baseline {} fraction {}", value, baseline, fraction);
                    last = r;
                }
                assert_eq!(last, 2);
            }
        }
    }

    #[test]
    fn test_absolute_floor_for_small_baselines() {
        // 20% of 2 naps is 0.4; a floor of 1 keeps 3 naps on track
        assert_eq!(classify(3.0, 2.0, 0.2), Trend::Ahead);
        assert_eq!(classify_with_floor(3.0, 2.0, 0.2, 1.0), Trend::OnTrack);
        assert_eq!(classify_with_floor(4.0, 2.0, 0.2, 1.0), Trend::Ahead);
    }

    #[test]
    fn test_non_finite_values_are_on_track() {
        assert_eq!(classify(f64::NAN, 10.0, 0.2), Trend::OnTrack);
        assert_eq!(classify(10.0, f64::INFINITY, 0.2), Trend::OnTrack);
        assert_eq!(deviation_pct(10.0, 0.0), None);
        assert_eq!(deviation_pct(12.0, 10.0), Some(20.0));
    }

    #[test]
    fn test_time_gating_before_judgement_hour() {
        let config = InsightConfig::default();
        let engine = DeviationEngine::new(&config);
        let today = today_with_wake_windows(vec![300]);
        let baselines = Baselines {
            wake_window_minutes: MetricBaseline {
                mean: Some(90.0),
                samples: 10,
            },
            ..Default::default()
        };

        let early = engine
            .classify_metric(Metric::WakeWindowMinutes, &today, &baselines, at(9))
            .unwrap();
        assert_eq!(early.trend, Trend::OnTrack);

        let late = engine
            .classify_metric(Metric::WakeWindowMinutes, &today, &baselines, at(10))
            .unwrap();
        assert_eq!(late.trend, Trend::Ahead);
    }

    #[test]
    fn test_insufficient_wake_window_samples_suppress_check() {
        let config = InsightConfig::default();
        let engine = DeviationEngine::new(&config);
        // Wildly long wake window today
        let today = today_with_wake_windows(vec![350]);
        let baselines = Baselines {
            wake_window_minutes: MetricBaseline {
                mean: Some(60.0),
                samples: 2,
            },
            ..Default::default()
        };

        assert!(engine
            .classify_metric(Metric::WakeWindowMinutes, &today, &baselines, at(15))
            .is_none());
        assert!(engine.evaluate(&today, &baselines, at(15)).is_empty());
    }

    #[test]
    fn test_evaluate_skips_metrics_without_today_value() {
        let config = InsightConfig::default();
        let engine = DeviationEngine::new(&config);
        let today = today_with_wake_windows(vec![]);
        let baselines = Baselines {
            first_nap_start: MetricBaseline {
                mean: Some(540.0),
                samples: 5,
            },
            feed_count: MetricBaseline {
                mean: Some(6.0),
                samples: 5,
            },
            ..Default::default()
        };

        let deviations = engine.evaluate(&today, &baselines, at(15));
        let metrics: Vec<Metric> = deviations.iter().map(|d| d.metric).collect();
        assert_eq!(metrics, vec![Metric::FeedCount]);
        assert_eq!(deviations[0].trend, Trend::Behind);
    }
}
