//! Time and volume normalization
//!
//! This module converts the free-form values users type into canonical units:
//! - 12-hour clock strings ("7:30 AM") to minutes since midnight
//! - Wrap-safe durations for sessions that cross midnight
//! - Feed quantities in ml or oz to ounces

use crate::types::VolumeUnit;
use serde::{Deserialize, Serialize};

/// Minutes in a day
pub const MINUTES_PER_DAY: u32 = 1440;

/// Millilitres per US fluid ounce
pub const ML_PER_OZ: f64 = 29.5735;

/// Unit-less quantities above this value are taken to be millilitres
pub const UNITLESS_ML_THRESHOLD: f64 = 50.0;

/// Feed volume normalized to ounces
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedVolume {
    pub value: f64,
    pub unit: VolumeUnit,
}

/// Parse "h:mm AM|PM" into minutes since midnight, or `None` when malformed.
///
/// Hour must be 1-12, minutes 00-59, meridiem case-insensitive, whitespace
/// between the minutes and the meridiem optional.
pub fn try_parse_time_to_minutes(s: &str) -> Option<u32> {
    let s = s.trim();
    let (clock, meridiem) = split_meridiem(s)?;

    let (hour_str, minute_str) = clock.trim_end().split_once(':')?;
    if hour_str.is_empty()
        || hour_str.len() > 2
        || minute_str.len() != 2
        || !hour_str.bytes().all(|b| b.is_ascii_digit())
        || !minute_str.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let hour: u32 = hour_str.parse().ok()?;
    let minute: u32 = minute_str.parse().ok()?;
    if !(1..=12).contains(&hour) || minute > 59 {
        return None;
    }

    let hour24 = match (meridiem, hour) {
        (Meridiem::Am, 12) => 0,
        (Meridiem::Am, h) => h,
        (Meridiem::Pm, 12) => 12,
        (Meridiem::Pm, h) => h + 12,
    };

    Some(hour24 * 60 + minute)
}

/// Parse "h:mm AM|PM" into minutes since midnight in `[0, 1439]`.
///
/// Malformed input yields `0` (midnight). Callers that must not treat bad
/// input as midnight use [`try_parse_time_to_minutes`] instead.
pub fn parse_time_to_minutes(s: &str) -> u32 {
    try_parse_time_to_minutes(s).unwrap_or(0)
}

/// Format minutes since midnight as "h:mm AM|PM"
pub fn format_time(minutes: u32) -> String {
    let minutes = minutes % MINUTES_PER_DAY;
    let hour24 = minutes / 60;
    let minute = minutes % 60;
    let meridiem = if hour24 < 12 { "AM" } else { "PM" };
    let hour12 = match hour24 % 12 {
        0 => 12,
        h => h,
    };
    format!("{}:{:02} {}", hour12, minute, meridiem)
}

/// Minutes from `start` to `end`, wrapping past midnight when `end < start`
pub fn duration_minutes(start: u32, end: u32) -> u32 {
    if end >= start {
        end - start
    } else {
        end + MINUTES_PER_DAY - start
    }
}

/// Format a minute count as "1h 45m" / "45m"
pub fn format_duration(minutes: u32) -> String {
    let hours = minutes / 60;
    let mins = minutes % 60;
    match (hours, mins) {
        (0, m) => format!("{}m", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}

/// Leading-number parse of a free-form quantity; anything unparsable is `0.0`.
///
/// Accepts a numeric prefix ("4oz" -> 4.0, " 3.5 " -> 3.5), matching how
/// quantities were historically read.
pub fn parse_quantity(quantity: &str) -> f64 {
    let s = quantity.trim_start();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;

    for (i, c) in s.char_indices() {
        match c {
            '+' | '-' if i == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end = i + c.len_utf8();
    }

    if !seen_digit {
        return 0.0;
    }

    s[..end]
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Unit assumed for a quantity logged without one.
///
/// Values above 50 are read as millilitres, everything else as ounces. This
/// heuristic is what historical exports were computed with and is kept as is.
pub fn infer_volume_unit(value: f64) -> VolumeUnit {
    if value > UNITLESS_ML_THRESHOLD {
        VolumeUnit::Ml
    } else {
        VolumeUnit::Oz
    }
}

/// Normalize a feed quantity to ounces
pub fn normalize_volume(quantity: &str, unit: Option<VolumeUnit>) -> NormalizedVolume {
    let raw = parse_quantity(quantity);
    let unit = unit.unwrap_or_else(|| infer_volume_unit(raw));

    let value = match unit {
        VolumeUnit::Ml => raw / ML_PER_OZ,
        VolumeUnit::Oz => raw,
    };

    NormalizedVolume {
        value,
        unit: VolumeUnit::Oz,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Meridiem {
    Am,
    Pm,
}

fn split_meridiem(s: &str) -> Option<(&str, Meridiem)> {
    if s.len() < 2 || !s.is_char_boundary(s.len() - 2) {
        return None;
    }
    let (clock, suffix) = s.split_at(s.len() - 2);
    let meridiem = if suffix.eq_ignore_ascii_case("am") {
        Meridiem::Am
    } else if suffix.eq_ignore_ascii_case("pm") {
        Meridiem::Pm
    } else {
        return None;
    };
    Some((clock, meridiem))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_morning_and_evening() {
        assert_eq!(parse_time_to_minutes("7:30 AM"), 450);
        assert_eq!(parse_time_to_minutes("7:30 PM"), 1170);
        assert_eq!(parse_time_to_minutes("11:59 pm"), 1439);
        assert_eq!(parse_time_to_minutes("1:05PM"), 13 * 60 + 5);
    }

    #[test]
    fn test_parse_noon_and_midnight() {
        assert_eq!(parse_time_to_minutes("12:00 AM"), 0);
        assert_eq!(parse_time_to_minutes("12:15 AM"), 15);
        assert_eq!(parse_time_to_minutes("12:00 PM"), 720);
        assert_eq!(parse_time_to_minutes("12:45 PM"), 765);
    }

    #[test]
    fn test_malformed_time_is_midnight() {
        for bad in ["", "7:30", "13:00 PM", "0:30 AM", "7:60 AM", "7.30 AM", "seven AM", "07:3 AM"] {
            assert_eq!(parse_time_to_minutes(bad), 0, "input {:?}", bad);
            assert_eq!(try_parse_time_to_minutes(bad), None, "input {:?}", bad);
        }
    }

    #[test]
    fn test_format_round_trip_all_valid_times() {
        for meridiem in ["AM", "PM"] {
            for hour in 1..=12 {
                for minute in 0..60 {
                    let input = format!("{}:{:02} {}", hour, minute, meridiem);
                    let minutes = parse_time_to_minutes(&input);
                    assert!(minutes < MINUTES_PER_DAY);
                    assert_eq!(format_time(minutes), input);
                }
            }
        }
    }

    #[test]
    fn test_duration_wraps_past_midnight() {
        for start in (0..MINUTES_PER_DAY).step_by(37) {
            for end in (0..MINUTES_PER_DAY).step_by(41) {
                let d = duration_minutes(start, end);
                if end >= start {
                    assert_eq!(d, end - start);
                } else {
                    assert_eq!(d as i64, end as i64 - start as i64 + 1440);
                }
            }
        }
    }

    #[test]
    fn test_midnight_crossing_nap_duration() {
        let start = parse_time_to_minutes("11:30 PM");
        let end = parse_time_to_minutes("1:15 AM");
        assert_eq!(duration_minutes(start, end), 105);
    }

    #[test]
    fn test_normalize_volume_scenarios() {
        let oz = normalize_volume("4", Some(VolumeUnit::Oz));
        assert_eq!(oz.unit, VolumeUnit::Oz);
        assert!((oz.value - 4.0).abs() < 1e-9);

        let ml = normalize_volume("120", Some(VolumeUnit::Ml));
        assert_eq!(ml.unit, VolumeUnit::Oz);
        assert!((ml.value - 4.058).abs() < 0.001);

        let unitless = normalize_volume("75", None);
        assert_eq!(unitless.unit, VolumeUnit::Oz);
        assert!((unitless.value - 2.536).abs() < 0.001);

        let small = normalize_volume("3", None);
        assert!((small.value - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_quantity_is_zero() {
        assert_eq!(normalize_volume("lots", Some(VolumeUnit::Oz)).value, 0.0);
        assert_eq!(normalize_volume("", None).value, 0.0);
        assert_eq!(parse_quantity("."), 0.0);
        assert_eq!(parse_quantity("4oz"), 4.0);
        assert_eq!(parse_quantity(" 3.5 "), 3.5);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(45), "45m");
        assert_eq!(format_duration(120), "2h");
        assert_eq!(format_duration(105), "1h 45m");
    }
}
