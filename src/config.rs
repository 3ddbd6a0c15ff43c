//! Engine configuration
//!
//! Tunables for baseline windows and deviation tolerances. Every field has a
//! default, so a partial JSON file only overrides what it names.

use crate::error::RhythmError;
use serde::{Deserialize, Serialize};

/// Default trailing baseline window in days
pub const DEFAULT_BASELINE_WINDOW_DAYS: usize = 7;

/// Upper bound on how far back baselines and feed intervals may search
pub const MAX_LOOKBACK_DAYS: usize = 366;

/// Insight engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightConfig {
    /// Prior days (with data, not travel days) averaged into each baseline
    pub baseline_window_days: usize,
    /// How far back to search for baseline days
    pub max_lookback_days: usize,
    /// Local hour before which every deviation reads as on-track
    pub judgement_hour: u32,
    /// Relative tolerance around the baseline
    pub tolerance_fraction: f64,
    /// Minimum baseline samples before a metric is compared at all
    pub min_samples: usize,
    /// Absolute tolerance floor for clock-time metrics (first nap, first feed)
    pub timing_tolerance_minutes: f64,
    /// Absolute tolerance floor for duration metrics
    pub duration_tolerance_minutes: f64,
    /// Absolute tolerance floor for count metrics
    pub count_tolerance: f64,
    /// Absolute tolerance floor for feed volume
    pub volume_tolerance_oz: f64,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            baseline_window_days: DEFAULT_BASELINE_WINDOW_DAYS,
            max_lookback_days: 28,
            judgement_hour: 10,
            tolerance_fraction: 0.2,
            min_samples: 3,
            timing_tolerance_minutes: 30.0,
            duration_tolerance_minutes: 15.0,
            count_tolerance: 1.0,
            volume_tolerance_oz: 1.0,
        }
    }
}

impl InsightConfig {
    /// Load configuration from JSON, rejecting values the engine cannot use
    pub fn from_json(json: &str) -> Result<Self, RhythmError> {
        let config: InsightConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RhythmError> {
        if self.baseline_window_days == 0 {
            return Err(RhythmError::InvalidConfig(
                "baseline_window_days must be at least 1".to_string(),
            ));
        }
        if self.max_lookback_days < self.baseline_window_days {
            return Err(RhythmError::InvalidConfig(format!(
                "max_lookback_days ({}) must cover baseline_window_days ({})",
                self.max_lookback_days, self.baseline_window_days
            )));
        }
        if self.max_lookback_days > MAX_LOOKBACK_DAYS {
            return Err(RhythmError::InvalidConfig(format!(
                "max_lookback_days must be at most {}, got {}",
                MAX_LOOKBACK_DAYS, self.max_lookback_days
            )));
        }
        if self.judgement_hour > 23 {
            return Err(RhythmError::InvalidConfig(format!(
                "judgement_hour must be 0-23, got {}",
                self.judgement_hour
            )));
        }
        if !(0.0..1.0).contains(&self.tolerance_fraction) {
            return Err(RhythmError::InvalidConfig(format!(
                "tolerance_fraction must be in [0, 1), got {}",
                self.tolerance_fraction
            )));
        }
        let floors = [
            self.timing_tolerance_minutes,
            self.duration_tolerance_minutes,
            self.count_tolerance,
            self.volume_tolerance_oz,
        ];
        if floors.iter().any(|f| !f.is_finite() || *f < 0.0) {
            return Err(RhythmError::InvalidConfig(
                "tolerance floors must be finite and non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = InsightConfig::from_json(r#"{"baseline_window_days": 3}"#).unwrap();
        assert_eq!(config.baseline_window_days, 3);
        assert_eq!(config.judgement_hour, 10);
        assert_eq!(config.min_samples, 3);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(InsightConfig::from_json(r#"{"judgement_hour": 24}"#).is_err());
        assert!(InsightConfig::from_json(r#"{"tolerance_fraction": 1.5}"#).is_err());
        assert!(InsightConfig::from_json(r#"{"baseline_window_days": 0}"#).is_err());
        assert!(InsightConfig::from_json(r#"{"count_tolerance": -1}"#).is_err());
    }

    #[test]
    fn test_lookback_is_bounded() {
        let err = InsightConfig::from_json(r#"{"max_lookback_days": 200000000}"#).unwrap_err();
        assert!(matches!(err, RhythmError::InvalidConfig(_)));

        let config = InsightConfig::from_json(r#"{"max_lookback_days": 366}"#).unwrap();
        assert_eq!(config.max_lookback_days, MAX_LOOKBACK_DAYS);
    }
}
