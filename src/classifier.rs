//! Activity classification
//!
//! Tags naps as daytime naps or night sleep against the household night window,
//! places every activity on a local calendar day, and extracts the per-type
//! fields the aggregation stage needs. Records with malformed fields are left
//! out of the sets they cannot be classified into.

use crate::normalizer::{duration_minutes, normalize_volume, try_parse_time_to_minutes};
use crate::types::{
    Activity, ActivityDetails, ActivityType, DiaperType, FeedType, HouseholdContext,
};
use chrono::{Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Night window in local hours. May cross midnight (19 -> 7) or not (1 -> 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for NightWindow {
    fn default() -> Self {
        Self::new(
            crate::types::DEFAULT_NIGHT_START_HOUR,
            crate::types::DEFAULT_NIGHT_END_HOUR,
        )
    }
}

impl NightWindow {
    pub fn new(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start_hour,
            end_hour,
        }
    }

    pub fn is_night_time(&self, hour: u32) -> bool {
        is_night_time(hour, self.start_hour, self.end_hour)
    }

    pub fn is_daytime(&self, hour: u32) -> bool {
        !self.is_night_time(hour)
    }
}

/// Whether `hour` falls inside the night window `[start_hour, end_hour)`
pub fn is_night_time(hour: u32, start_hour: u32, end_hour: u32) -> bool {
    if start_hour > end_hour {
        hour >= start_hour || hour < end_hour
    } else {
        hour >= start_hour && hour < end_hour
    }
}

pub fn is_daytime(hour: u32, start_hour: u32, end_hour: u32) -> bool {
    !is_night_time(hour, start_hour, end_hour)
}

/// A nap that is not flagged as night sleep and starts outside the night window.
///
/// Naps without a parsable `startTime` are neither daytime naps nor night sleep.
pub fn is_daytime_nap(activity: &Activity, window: &NightWindow) -> bool {
    let Some(nap) = activity.nap() else {
        return false;
    };
    if nap.is_night_sleep == Some(true) {
        return false;
    }
    match nap.start_time.as_deref().and_then(try_parse_time_to_minutes) {
        Some(start) => window.is_daytime(start / 60),
        None => false,
    }
}

/// A nap with a parsable start that is not a daytime nap
pub fn is_night_sleep(activity: &Activity, window: &NightWindow) -> bool {
    let Some(nap) = activity.nap() else {
        return false;
    };
    let has_start = nap
        .start_time
        .as_deref()
        .and_then(try_parse_time_to_minutes)
        .is_some();
    has_start && !is_daytime_nap(activity, window)
}

/// The local calendar day an activity belongs to.
///
/// `date_local` on a nap wins over `loggedAt`, since it records the day the
/// user meant regardless of the stored instant. Otherwise `loggedAt` is placed
/// in the household timezone.
pub fn resolve_event_local_date(activity: &Activity, offset: FixedOffset) -> NaiveDate {
    activity
        .nap()
        .and_then(|nap| nap.date_local.as_deref())
        .and_then(parse_local_date)
        .unwrap_or_else(|| activity.logged_at.to_local(offset).date())
}

/// The local calendar day a nap ended on.
///
/// Uses `end_date_local` when present, otherwise the start day, rolled forward
/// one day when the end clock time is earlier than the start.
pub fn resolve_end_local_date(
    activity: &Activity,
    offset: FixedOffset,
    start_minute: u32,
    end_minute: u32,
) -> NaiveDate {
    if let Some(date) = activity
        .nap()
        .and_then(|nap| nap.end_date_local.as_deref())
        .and_then(parse_local_date)
    {
        return date;
    }
    let start_date = resolve_event_local_date(activity, offset);
    if end_minute < start_minute {
        start_date + Duration::days(1)
    } else {
        start_date
    }
}

fn parse_local_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

fn at_minute(date: NaiveDate, minute: u32) -> NaiveDateTime {
    let time = NaiveTime::from_hms_opt(minute / 60 % 24, minute % 60, 0).unwrap_or_default();
    date.and_time(time)
}

/// A nap or night sleep with a parsable start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepRecord {
    pub activity_id: String,
    /// Local day the sleep started on
    pub date: NaiveDate,
    pub start_minute: u32,
    pub start_at: NaiveDateTime,
    /// `None` while ongoing, or when `endTime` is malformed
    pub end_minute: Option<u32>,
    pub end_at: Option<NaiveDateTime>,
    pub duration_minutes: Option<u32>,
    pub is_night: bool,
    pub is_ongoing: bool,
}

/// A feed placed on the local timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedRecord {
    pub activity_id: String,
    pub date: NaiveDate,
    pub minute: u32,
    pub at: NaiveDateTime,
    /// Normalized volume; `None` when no quantity was logged
    pub volume_oz: Option<f64>,
    pub feed_type: Option<FeedType>,
}

/// A diaper change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaperRecord {
    pub date: NaiveDate,
    pub minute: u32,
    pub diaper_type: Option<DiaperType>,
}

/// Any activity, reduced to where it sits on the local timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedEvent {
    pub date: NaiveDate,
    pub minute: u32,
    /// Local wall-clock time of `loggedAt`
    pub at: NaiveDateTime,
    pub activity_type: ActivityType,
}

/// Activity log split into typed, classified records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedLog {
    pub sleeps: Vec<SleepRecord>,
    pub feeds: Vec<FeedRecord>,
    pub diapers: Vec<DiaperRecord>,
    pub events: Vec<LoggedEvent>,
}

impl ClassifiedLog {
    pub fn daytime_naps_on(&self, date: NaiveDate) -> impl Iterator<Item = &SleepRecord> {
        self.sleeps
            .iter()
            .filter(move |s| !s.is_night && s.date == date)
    }

    pub fn feeds_on(&self, date: NaiveDate) -> impl Iterator<Item = &FeedRecord> {
        self.feeds.iter().filter(move |f| f.date == date)
    }

    /// The sleep in progress at `now`, if any (latest start wins).
    ///
    /// Open sleeps that started more than `max_age` ago were never closed and
    /// are ignored.
    pub fn ongoing_sleep(&self, now: NaiveDateTime, max_age: Duration) -> Option<&SleepRecord> {
        self.sleeps
            .iter()
            .filter(|s| s.is_ongoing && s.start_at <= now && now - s.start_at <= max_age)
            .max_by_key(|s| s.start_at)
    }

    /// The most recent completed sleep ending at or before `now`
    pub fn last_completed_sleep(&self, now: NaiveDateTime) -> Option<&SleepRecord> {
        self.sleeps
            .iter()
            .filter(|s| s.end_at.is_some_and(|end| end <= now))
            .max_by_key(|s| s.end_at)
    }

    /// The most recent explicit wake event at or before `now`
    pub fn last_wake_at(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        self.events
            .iter()
            .filter(|e| e.activity_type == ActivityType::Wake && e.at <= now)
            .map(|e| e.at)
            .max()
    }

    /// The most recent feed at or before `now`
    pub fn last_feed(&self, now: NaiveDateTime) -> Option<&FeedRecord> {
        self.feeds.iter().filter(|f| f.at <= now).max_by_key(|f| f.at)
    }
}

/// Classifier for turning raw activities into a classified log
pub struct Classifier;

impl Classifier {
    /// Classify activities against the household's night window and timezone
    pub fn classify(activities: &[Activity], household: &HouseholdContext) -> ClassifiedLog {
        let window = household.night_window();
        let offset = household.offset();
        let mut log = ClassifiedLog::default();

        for activity in activities {
            let date = resolve_event_local_date(activity, offset);
            let logged_local = activity.logged_at.to_local(offset);
            let logged_minute = logged_local.hour() * 60 + logged_local.minute();

            log.events.push(LoggedEvent {
                date,
                minute: logged_minute,
                at: logged_local,
                activity_type: activity.activity_type(),
            });

            match &activity.details {
                ActivityDetails::Nap(_) => {
                    if let Some(sleep) = classify_sleep(activity, &window, offset, date) {
                        log.sleeps.push(sleep);
                    }
                }
                ActivityDetails::Feed(feed) => {
                    let volume_oz = feed
                        .quantity
                        .as_deref()
                        .map(|q| normalize_volume(q, feed.unit).value);
                    log.feeds.push(FeedRecord {
                        activity_id: activity.id.clone(),
                        date,
                        minute: logged_minute,
                        at: logged_local,
                        volume_oz,
                        feed_type: feed.feed_type,
                    });
                }
                ActivityDetails::Diaper(diaper) => {
                    log.diapers.push(DiaperRecord {
                        date,
                        minute: logged_minute,
                        diaper_type: diaper.diaper_type,
                    });
                }
                _ => {}
            }
        }

        log.sleeps.sort_by_key(|s| s.start_at);
        log.feeds.sort_by_key(|f| f.at);
        log
    }
}

fn classify_sleep(
    activity: &Activity,
    window: &NightWindow,
    offset: FixedOffset,
    date: NaiveDate,
) -> Option<SleepRecord> {
    let nap = activity.nap()?;

    let Some(start_minute) = nap.start_time.as_deref().and_then(try_parse_time_to_minutes) else {
        debug!(
            activity_id = %activity.id,
            start_time = ?nap.start_time,
            "nap without a parsable start time excluded from sleep classification"
        );
        return None;
    };

    let is_night = is_night_sleep(activity, window);

    let end_minute = match nap.end_time.as_deref() {
        Some(raw) => {
            let parsed = try_parse_time_to_minutes(raw);
            if parsed.is_none() {
                debug!(activity_id = %activity.id, end_time = raw, "malformed nap end time ignored");
            }
            parsed
        }
        None => None,
    };

    let end_at = end_minute
        .map(|end| at_minute(resolve_end_local_date(activity, offset, start_minute, end), end));

    Some(SleepRecord {
        activity_id: activity.id.clone(),
        date,
        start_minute,
        start_at: at_minute(date, start_minute),
        end_minute,
        end_at,
        duration_minutes: end_minute.map(|end| duration_minutes(start_minute, end)),
        is_night,
        is_ongoing: nap.is_ongoing(),
    })
}
