//! Age-indexed normative tables
//!
//! Static step functions over age bands. Ages outside the table clamp to the
//! nearest band; nothing is extrapolated.

use crate::types::ExpectedRanges;
use chrono::NaiveDate;
use serde::Serialize;

/// Age assumed when no birthday is known
pub const DEFAULT_AGE_MONTHS: f64 = 6.0;

/// Average month length in days
const DAYS_PER_MONTH: f64 = 30.4375;

/// Norms for one age band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AgeBand {
    /// Exclusive upper bound of the band in months
    pub until_months: u32,
    pub feeds: (u32, u32),
    pub naps: (u32, u32),
    pub wake_window_minutes: (u32, u32),
    pub nap_minutes: (u32, u32),
    pub night_sleep_minutes: (u32, u32),
}

pub const AGE_BANDS: [AgeBand; 7] = [
    AgeBand {
        until_months: 1,
        feeds: (8, 12),
        naps: (4, 6),
        wake_window_minutes: (35, 60),
        nap_minutes: (30, 120),
        night_sleep_minutes: (480, 540),
    },
    AgeBand {
        until_months: 3,
        feeds: (7, 9),
        naps: (4, 5),
        wake_window_minutes: (60, 90),
        nap_minutes: (30, 120),
        night_sleep_minutes: (540, 600),
    },
    AgeBand {
        until_months: 6,
        feeds: (5, 7),
        naps: (3, 4),
        wake_window_minutes: (90, 150),
        nap_minutes: (45, 120),
        night_sleep_minutes: (600, 660),
    },
    AgeBand {
        until_months: 9,
        feeds: (4, 6),
        naps: (2, 3),
        wake_window_minutes: (150, 210),
        nap_minutes: (60, 120),
        night_sleep_minutes: (660, 720),
    },
    AgeBand {
        until_months: 12,
        feeds: (3, 5),
        naps: (2, 2),
        wake_window_minutes: (180, 240),
        nap_minutes: (60, 120),
        night_sleep_minutes: (660, 720),
    },
    AgeBand {
        until_months: 18,
        feeds: (3, 4),
        naps: (1, 2),
        wake_window_minutes: (240, 300),
        nap_minutes: (60, 150),
        night_sleep_minutes: (660, 720),
    },
    AgeBand {
        until_months: u32::MAX,
        feeds: (3, 4),
        naps: (1, 1),
        wake_window_minutes: (300, 360),
        nap_minutes: (90, 150),
        night_sleep_minutes: (600, 720),
    },
];

/// Band covering `age_months`, clamped to the first/last band
pub fn band_for(age_months: f64) -> &'static AgeBand {
    if !(age_months > 0.0) {
        return &AGE_BANDS[0];
    }
    AGE_BANDS
        .iter()
        .find(|band| age_months < band.until_months as f64)
        .unwrap_or(&AGE_BANDS[AGE_BANDS.len() - 1])
}

/// Expected daily feed and nap counts for an age
pub fn get_expected_ranges(age_months: f64) -> ExpectedRanges {
    let band = band_for(age_months);
    ExpectedRanges {
        feeds: band.feeds,
        naps: band.naps,
    }
}

pub fn expected_wake_window(age_months: f64) -> (u32, u32) {
    band_for(age_months).wake_window_minutes
}

pub fn typical_nap_duration(age_months: f64) -> (u32, u32) {
    band_for(age_months).nap_minutes
}

pub fn typical_night_sleep(age_months: f64) -> (u32, u32) {
    band_for(age_months).night_sleep_minutes
}

/// Fractional age in months on `today`
pub fn age_in_months(birthday: NaiveDate, today: NaiveDate) -> f64 {
    (today - birthday).num_days() as f64 / DAYS_PER_MONTH
}

/// Age in months, falling back to the default when no birthday is known.
///
/// Returns `(age_months, is_default)`.
pub fn resolve_age_months(birthday: Option<NaiveDate>, today: NaiveDate) -> (f64, bool) {
    match birthday {
        Some(b) => (age_in_months(b, today).max(0.0), false),
        None => (DEFAULT_AGE_MONTHS, true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_boundaries() {
        assert_eq!(get_expected_ranges(0.5).feeds, (8, 12));
        assert_eq!(get_expected_ranges(1.0).feeds, (7, 9));
        assert_eq!(get_expected_ranges(2.9).naps, (4, 5));
        assert_eq!(get_expected_ranges(6.0).naps, (2, 3));
        assert_eq!(expected_wake_window(10.0), (180, 240));
    }

    #[test]
    fn test_out_of_range_ages_clamp() {
        assert_eq!(band_for(-3.0), &AGE_BANDS[0]);
        assert_eq!(band_for(f64::NAN), &AGE_BANDS[0]);
        assert_eq!(band_for(60.0), &AGE_BANDS[6]);
        assert_eq!(get_expected_ranges(500.0).naps, (1, 1));
    }

    #[test]
    fn test_age_computation() {
        let birthday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let months = age_in_months(birthday, today);
        assert!((months - 5.98).abs() < 0.01);
    }

    #[test]
    fn test_missing_birthday_defaults_to_six_months() {
        let today = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        assert_eq!(resolve_age_months(None, today), (6.0, true));

        let future = NaiveDate::from_ymd_opt(2024, 8, 1).unwrap();
        assert_eq!(resolve_age_months(Some(future), today), (0.0, false));
    }
}
