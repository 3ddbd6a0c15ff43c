//! Narrative selection
//!
//! The story of the day is picked by an ordered rule list. Rules are checked
//! in `RULES` order and the first one that matches produces the narrative; the
//! most specific, most actionable signal wins. The last rule always matches.

use crate::classifier::FeedRecord;
use crate::normalizer::{format_duration, format_time};
use crate::types::{DayAggregate, Metric, MetricDeviation, Narrative, NarrativeKind, Trend};
use chrono::{NaiveDateTime, Timelike};
use tracing::debug;

/// Feeds needed inside the window to call it cluster feeding
pub const CLUSTER_FEED_COUNT: usize = 3;

/// Span a cluster of feeds must fit in
pub const CLUSTER_WINDOW_MINUTES: i64 = 240;

/// A run of feeds close together
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedCluster {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub feeds: usize,
}

/// Largest run of feeds spanning at most 240 minutes, if it has 3 or more.
///
/// `feeds` must be sorted by time.
pub fn detect_cluster_feeding(feeds: &[&FeedRecord]) -> Option<FeedCluster> {
    let mut best: Option<FeedCluster> = None;
    let mut lo = 0;

    for hi in 0..feeds.len() {
        while (feeds[hi].at - feeds[lo].at).num_minutes() > CLUSTER_WINDOW_MINUTES {
            lo += 1;
        }
        let count = hi - lo + 1;
        if count >= CLUSTER_FEED_COUNT && best.map_or(true, |b| count > b.feeds) {
            best = Some(FeedCluster {
                start: feeds[lo].at,
                end: feeds[hi].at,
                feeds: count,
            });
        }
    }

    best
}

/// Why nothing more specific could be said
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    NoDataToday,
    TooEarly,
    BuildingBaseline,
    Mixed,
}

/// Everything the rules look at
#[derive(Debug, Clone)]
pub struct NarrativeInputs<'a> {
    pub today: &'a DayAggregate,
    pub deviations: &'a [MetricDeviation],
    pub cluster: Option<FeedCluster>,
    /// The judgement hour has passed
    pub judgeable: bool,
}

impl<'a> NarrativeInputs<'a> {
    /// Deviation for `metric` when it is off baseline
    fn off_track(&self, metric: Metric) -> Option<&'a MetricDeviation> {
        self.deviations
            .iter()
            .find(|d| d.metric == metric && d.trend != Trend::OnTrack)
    }

    fn trend(&self, metric: Metric) -> Option<Trend> {
        self.deviations
            .iter()
            .find(|d| d.metric == metric)
            .map(|d| d.trend)
    }

    fn fallback_reason(&self) -> FallbackReason {
        if !self.today.has_data() {
            FallbackReason::NoDataToday
        } else if !self.judgeable {
            FallbackReason::TooEarly
        } else if self.deviations.is_empty() {
            FallbackReason::BuildingBaseline
        } else {
            FallbackReason::Mixed
        }
    }
}

/// One entry of the cascade
pub struct NarrativeRule {
    pub kind: NarrativeKind,
    pub select: fn(&NarrativeInputs) -> Option<Narrative>,
}

/// Narrative rules in priority order
pub const RULES: [NarrativeRule; 10] = [
    NarrativeRule {
        kind: NarrativeKind::ClusterFeeding,
        select: cluster_feeding,
    },
    NarrativeRule {
        kind: NarrativeKind::FirstNapTiming,
        select: first_nap_timing,
    },
    NarrativeRule {
        kind: NarrativeKind::FirstNapDuration,
        select: first_nap_duration,
    },
    NarrativeRule {
        kind: NarrativeKind::FirstFeedTiming,
        select: first_feed_timing,
    },
    NarrativeRule {
        kind: NarrativeKind::FeedVolume,
        select: feed_volume,
    },
    NarrativeRule {
        kind: NarrativeKind::WakeWindow,
        select: wake_window,
    },
    NarrativeRule {
        kind: NarrativeKind::NapDuration,
        select: nap_duration,
    },
    NarrativeRule {
        kind: NarrativeKind::GrowthSpurt,
        select: growth_spurt,
    },
    NarrativeRule {
        kind: NarrativeKind::Aligned,
        select: aligned,
    },
    NarrativeRule {
        kind: NarrativeKind::Fallback,
        select: fallback,
    },
];

/// Run the cascade; the first matching rule wins
pub fn select_narrative(inputs: &NarrativeInputs) -> Narrative {
    for rule in RULES.iter() {
        if let Some(narrative) = (rule.select)(inputs) {
            debug!(rule = rule.kind.as_str(), "narrative selected");
            return narrative;
        }
    }
    // The fallback rule always matches
    fallback_narrative(inputs.fallback_reason())
}

fn narrative(kind: NarrativeKind, headline: impl Into<String>, detail: impl Into<String>) -> Narrative {
    Narrative {
        kind,
        headline: headline.into(),
        detail: detail.into(),
    }
}

fn minute_of_day(at: NaiveDateTime) -> u32 {
    at.hour() * 60 + at.minute()
}

fn minutes(value: f64) -> u32 {
    value.round().max(0.0) as u32
}

fn cluster_feeding(inputs: &NarrativeInputs) -> Option<Narrative> {
    let cluster = inputs.cluster?;
    Some(narrative(
        NarrativeKind::ClusterFeeding,
        "Cluster feeding today",
        format!(
            "{} feeds between {} and {}. Frequent feeds close together are common during growth and fussy evenings.",
            cluster.feeds,
            format_time(minute_of_day(cluster.start)),
            format_time(minute_of_day(cluster.end)),
        ),
    ))
}

fn first_nap_timing(inputs: &NarrativeInputs) -> Option<Narrative> {
    let d = inputs.off_track(Metric::FirstNapStart)?;
    let headline = match d.trend {
        Trend::Ahead => "First nap came later than usual",
        _ => "First nap came earlier than usual",
    };
    Some(narrative(
        NarrativeKind::FirstNapTiming,
        headline,
        format!(
            "First nap started at {}; it usually starts around {}. The rest of the day may shift with it.",
            format_time(minutes(d.today)),
            format_time(minutes(d.baseline)),
        ),
    ))
}

fn first_nap_duration(inputs: &NarrativeInputs) -> Option<Narrative> {
    let d = inputs.off_track(Metric::FirstNapDuration)?;
    let headline = match d.trend {
        Trend::Ahead => "Long first nap",
        _ => "Short first nap",
    };
    Some(narrative(
        NarrativeKind::FirstNapDuration,
        headline,
        format!(
            "The first nap lasted {} against a usual {}.",
            format_duration(minutes(d.today)),
            format_duration(minutes(d.baseline)),
        ),
    ))
}

fn first_feed_timing(inputs: &NarrativeInputs) -> Option<Narrative> {
    let d = inputs.off_track(Metric::FirstFeed)?;
    let headline = match d.trend {
        Trend::Ahead => "First feed came later than usual",
        _ => "First feed came earlier than usual",
    };
    Some(narrative(
        NarrativeKind::FirstFeedTiming,
        headline,
        format!(
            "First feed was at {}; it is usually around {}.",
            format_time(minutes(d.today)),
            format_time(minutes(d.baseline)),
        ),
    ))
}

fn feed_volume(inputs: &NarrativeInputs) -> Option<Narrative> {
    let d = inputs.off_track(Metric::FeedVolumeOz)?;
    let headline = match d.trend {
        Trend::Ahead => "Drinking more than usual",
        _ => "Drinking less than usual",
    };
    Some(narrative(
        NarrativeKind::FeedVolume,
        headline,
        format!(
            "{:.1} oz so far against {:.1} oz by this time on a typical day.",
            d.today, d.baseline
        ),
    ))
}

fn wake_window(inputs: &NarrativeInputs) -> Option<Narrative> {
    let d = inputs.off_track(Metric::WakeWindowMinutes)?;
    let headline = match d.trend {
        Trend::Ahead => "Longer stretches awake",
        _ => "Shorter stretches awake",
    };
    Some(narrative(
        NarrativeKind::WakeWindow,
        headline,
        format!(
            "Wake windows are averaging {} today; recently they have been about {}.",
            format_duration(minutes(d.today)),
            format_duration(minutes(d.baseline)),
        ),
    ))
}

fn nap_duration(inputs: &NarrativeInputs) -> Option<Narrative> {
    let d = inputs.off_track(Metric::NapMinutes)?;
    let headline = match d.trend {
        Trend::Ahead => "More daytime sleep than usual",
        _ => "Less daytime sleep than usual",
    };
    Some(narrative(
        NarrativeKind::NapDuration,
        headline,
        format!(
            "{} of naps so far against {} by this time on a typical day.",
            format_duration(minutes(d.today)),
            format_duration(minutes(d.baseline)),
        ),
    ))
}

fn growth_spurt(inputs: &NarrativeInputs) -> Option<Narrative> {
    let feeding_more = inputs.trend(Metric::FeedCount) == Some(Trend::Ahead);
    let sleeping_longer = inputs.trend(Metric::AverageNapMinutes) == Some(Trend::Ahead);
    if !(feeding_more && sleeping_longer) {
        return None;
    }
    Some(narrative(
        NarrativeKind::GrowthSpurt,
        "Possible growth spurt",
        "More feeds and longer naps than usual together often mean a growth spurt.",
    ))
}

fn aligned(inputs: &NarrativeInputs) -> Option<Narrative> {
    if !inputs.judgeable
        || inputs.deviations.is_empty()
        || inputs.deviations.iter().any(|d| d.trend != Trend::OnTrack)
    {
        return None;
    }
    Some(narrative(
        NarrativeKind::Aligned,
        "Right on rhythm",
        "Sleep and feeds are tracking close to the usual pattern today.",
    ))
}

fn fallback(inputs: &NarrativeInputs) -> Option<Narrative> {
    Some(fallback_narrative(inputs.fallback_reason()))
}

fn fallback_narrative(reason: FallbackReason) -> Narrative {
    let (headline, detail) = match reason {
        FallbackReason::NoDataToday => (
            "Nothing logged yet today",
            "Log a feed or nap to start today's rhythm.",
        ),
        FallbackReason::TooEarly => (
            "Early in the day",
            "Check back later once a few naps and feeds are logged.",
        ),
        FallbackReason::BuildingBaseline => (
            "Learning your baby's rhythm",
            "A few more days of logs are needed before today can be compared with the usual pattern.",
        ),
        FallbackReason::Mixed => (
            "A day of small changes",
            "Some things are a little off the usual pattern, nothing stands out.",
        ),
    };
    narrative(NarrativeKind::Fallback, headline, detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn feed(hour: u32, minute: u32) -> FeedRecord {
        let at = at(hour, minute);
        FeedRecord {
            activity_id: format!("f-{}-{}", hour, minute),
            date: at.date(),
            minute: hour * 60 + minute,
            at,
            volume_oz: Some(4.0),
            feed_type: None,
        }
    }

    fn dev(metric: Metric, today: f64, baseline: f64, trend: Trend) -> MetricDeviation {
        MetricDeviation {
            metric,
            today,
            baseline,
            samples: 7,
            trend,
            deviation_pct: None,
        }
    }

    fn today() -> DayAggregate {
        let mut agg = DayAggregate::empty(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        agg.activity_count = 6;
        agg
    }

    fn all_on_track() -> Vec<MetricDeviation> {
        vec![
            dev(Metric::FeedCount, 5.0, 5.0, Trend::OnTrack),
            dev(Metric::NapMinutes, 120.0, 110.0, Trend::OnTrack),
            dev(Metric::WakeWindowMinutes, 150.0, 140.0, Trend::OnTrack),
        ]
    }

    #[test]
    fn test_detect_cluster_feeding() {
        let feeds = [feed(16, 0), feed(17, 30), feed(19, 55)];
        let refs: Vec<&FeedRecord> = feeds.iter().collect();
        let cluster = detect_cluster_feeding(&refs).unwrap();
        assert_eq!(cluster.feeds, 3);
        assert_eq!(cluster.start, at(16, 0));
        assert_eq!(cluster.end, at(19, 55));

        let spread = [feed(8, 0), feed(11, 0), feed(14, 0)];
        let refs: Vec<&FeedRecord> = spread.iter().collect();
        assert_eq!(detect_cluster_feeding(&refs), None);
    }

    #[test]
    fn test_cluster_window_is_inclusive_of_240_minutes() {
        let feeds = [feed(12, 0), feed(14, 0), feed(16, 0)];
        let refs: Vec<&FeedRecord> = feeds.iter().collect();
        assert!(detect_cluster_feeding(&refs).is_some());

        let feeds = [feed(12, 0), feed(14, 0), feed(16, 1)];
        let refs: Vec<&FeedRecord> = feeds.iter().collect();
        assert!(detect_cluster_feeding(&refs).is_none());
    }

    #[test]
    fn test_cluster_feeding_beats_alignment() {
        let today = today();
        let deviations = all_on_track();
        let feeds = [feed(15, 0), feed(16, 0), feed(17, 0)];
        let refs: Vec<&FeedRecord> = feeds.iter().collect();

        let without_cluster = NarrativeInputs {
            today: &today,
            deviations: &deviations,
            cluster: None,
            judgeable: true,
        };
        assert_eq!(select_narrative(&without_cluster).kind, NarrativeKind::Aligned);

        let with_cluster = NarrativeInputs {
            cluster: detect_cluster_feeding(&refs),
            ..without_cluster
        };
        assert_eq!(select_narrative(&with_cluster).kind, NarrativeKind::ClusterFeeding);
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let today = today();
        let deviations = vec![
            dev(Metric::NapMinutes, 60.0, 120.0, Trend::Behind),
            dev(Metric::WakeWindowMinutes, 200.0, 120.0, Trend::Ahead),
            dev(Metric::FirstNapStart, 600.0, 540.0, Trend::Ahead),
        ];
        let inputs = NarrativeInputs {
            today: &today,
            deviations: &deviations,
            cluster: None,
            judgeable: true,
        };
        let selected = select_narrative(&inputs);
        assert_eq!(selected.kind, NarrativeKind::FirstNapTiming);
        assert_eq!(selected.headline, "First nap came later than usual");
        assert!(selected.detail.contains("10:00 AM"));
        assert!(selected.detail.contains("9:00 AM"));
    }

    fn select_from(deviations: &[MetricDeviation]) -> Narrative {
        let today = today();
        select_narrative(&NarrativeInputs {
            today: &today,
            deviations,
            cluster: None,
            judgeable: true,
        })
    }

    /// Deviations that each fire exactly one rule, in cascade order
    fn rule_triggers() -> Vec<(NarrativeKind, Vec<MetricDeviation>)> {
        vec![
            (
                NarrativeKind::FirstNapTiming,
                vec![dev(Metric::FirstNapStart, 600.0, 540.0, Trend::Ahead)],
            ),
            (
                NarrativeKind::FirstNapDuration,
                vec![dev(Metric::FirstNapDuration, 35.0, 75.0, Trend::Behind)],
            ),
            (
                NarrativeKind::FirstFeedTiming,
                vec![dev(Metric::FirstFeed, 390.0, 450.0, Trend::Behind)],
            ),
            (
                NarrativeKind::FeedVolume,
                vec![dev(Metric::FeedVolumeOz, 12.0, 18.5, Trend::Behind)],
            ),
            (
                NarrativeKind::WakeWindow,
                vec![dev(Metric::WakeWindowMinutes, 200.0, 120.0, Trend::Ahead)],
            ),
            (
                NarrativeKind::NapDuration,
                vec![dev(Metric::NapMinutes, 60.0, 120.0, Trend::Behind)],
            ),
            (
                NarrativeKind::GrowthSpurt,
                vec![
                    dev(Metric::FeedCount, 9.0, 6.0, Trend::Ahead),
                    dev(Metric::AverageNapMinutes, 90.0, 60.0, Trend::Ahead),
                ],
            ),
        ]
    }

    #[test]
    fn test_first_nap_duration_rule() {
        let selected = select_from(&[dev(Metric::FirstNapDuration, 35.0, 75.0, Trend::Behind)]);
        assert_eq!(selected.kind, NarrativeKind::FirstNapDuration);
        assert_eq!(selected.headline, "Short first nap");
        assert_eq!(selected.detail, "The first nap lasted 35m against a usual 1h 15m.");
    }

    #[test]
    fn test_first_feed_timing_rule() {
        let selected = select_from(&[dev(Metric::FirstFeed, 390.0, 450.0, Trend::Behind)]);
        assert_eq!(selected.kind, NarrativeKind::FirstFeedTiming);
        assert_eq!(selected.headline, "First feed came earlier than usual");
        assert_eq!(
            selected.detail,
            "First feed was at 6:30 AM; it is usually around 7:30 AM."
        );
    }

    #[test]
    fn test_feed_volume_rule() {
        let selected = select_from(&[dev(Metric::FeedVolumeOz, 12.0, 18.5, Trend::Behind)]);
        assert_eq!(selected.kind, NarrativeKind::FeedVolume);
        assert_eq!(selected.headline, "Drinking less than usual");
        assert_eq!(
            selected.detail,
            "12.0 oz so far against 18.5 oz by this time on a typical day."
        );

        let more = select_from(&[dev(Metric::FeedVolumeOz, 24.0, 18.0, Trend::Ahead)]);
        assert_eq!(more.headline, "Drinking more than usual");
    }

    #[test]
    fn test_wake_window_rule() {
        let selected = select_from(&[dev(Metric::WakeWindowMinutes, 200.0, 120.0, Trend::Ahead)]);
        assert_eq!(selected.kind, NarrativeKind::WakeWindow);
        assert_eq!(selected.headline, "Longer stretches awake");
        assert_eq!(
            selected.detail,
            "Wake windows are averaging 3h 20m today; recently they have been about 2h."
        );
    }

    #[test]
    fn test_nap_duration_rule() {
        let selected = select_from(&[dev(Metric::NapMinutes, 60.0, 120.0, Trend::Behind)]);
        assert_eq!(selected.kind, NarrativeKind::NapDuration);
        assert_eq!(selected.headline, "Less daytime sleep than usual");
    }

    #[test]
    fn test_each_rule_fires_alone() {
        for (kind, deviations) in rule_triggers() {
            assert_eq!(select_from(&deviations).kind, kind);
        }
    }

    #[test]
    fn test_higher_rule_beats_every_lower_rule() {
        let triggers = rule_triggers();
        for (i, (higher, higher_devs)) in triggers.iter().enumerate() {
            for (lower, lower_devs) in &triggers[i + 1..] {
                // Lower-priority deviations listed first; list order must not matter
                let mut deviations = lower_devs.clone();
                deviations.extend(higher_devs.iter().cloned());
                assert_eq!(
                    select_from(&deviations).kind,
                    *higher,
                    "{:?} should beat {:?}",
                    higher,
                    lower
                );
            }
        }
    }

    #[test]
    fn test_growth_spurt_needs_both_signals() {
        let today = today();
        let one = vec![dev(Metric::FeedCount, 9.0, 6.0, Trend::Ahead)];
        let inputs = NarrativeInputs {
            today: &today,
            deviations: &one,
            cluster: None,
            judgeable: true,
        };
        assert_eq!(select_narrative(&inputs).kind, NarrativeKind::Fallback);

        let both = vec![
            dev(Metric::FeedCount, 9.0, 6.0, Trend::Ahead),
            dev(Metric::AverageNapMinutes, 90.0, 60.0, Trend::Ahead),
        ];
        let inputs = NarrativeInputs {
            deviations: &both,
            ..inputs
        };
        assert_eq!(select_narrative(&inputs).kind, NarrativeKind::GrowthSpurt);
    }

    #[test]
    fn test_fallback_reasons() {
        let empty = DayAggregate::empty(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        let inputs = NarrativeInputs {
            today: &empty,
            deviations: &[],
            cluster: None,
            judgeable: true,
        };
        assert_eq!(select_narrative(&inputs).headline, "Nothing logged yet today");

        let today = today();
        let deviations = all_on_track();
        let early = NarrativeInputs {
            today: &today,
            deviations: &deviations,
            cluster: None,
            judgeable: false,
        };
        let selected = select_narrative(&early);
        assert_eq!(selected.kind, NarrativeKind::Fallback);
        assert_eq!(selected.headline, "Early in the day");

        let no_baseline = NarrativeInputs {
            deviations: &[],
            judgeable: true,
            ..early
        };
        assert_eq!(select_narrative(&no_baseline).headline, "Learning your baby's rhythm");
    }

    #[test]
    fn test_rules_are_in_cascade_order() {
        let kinds: Vec<NarrativeKind> = RULES.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                NarrativeKind::ClusterFeeding,
                NarrativeKind::FirstNapTiming,
                NarrativeKind::FirstNapDuration,
                NarrativeKind::FirstFeedTiming,
                NarrativeKind::FeedVolume,
                NarrativeKind::WakeWindow,
                NarrativeKind::NapDuration,
                NarrativeKind::GrowthSpurt,
                NarrativeKind::Aligned,
                NarrativeKind::Fallback,
            ]
        );
    }
}
