use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use rstest::rstest;

use klyroframe::timeline::{
    self, civil_zone, elapsed_duration_at, is_overdue_at, progress_percent_at,
    remaining_duration_at, FixedClock, Timeline, DEFAULT_CIVIL_ZONE, NO_TIME_LEFT, NOT_STARTED,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

#[rstest]
#[case(Duration::minutes(1), "0h 1m")]
#[case(Duration::minutes(59), "0h 59m")]
#[case(Duration::minutes(60), "1h 0m")]
#[case(Duration::minutes(23 * 60 + 59), "23h 59m")]
#[case(Duration::days(1), "1d 0h")]
#[case(Duration::days(3) + Duration::hours(7) + Duration::minutes(30), "3d 7h")]
#[case(Duration::seconds(30), NO_TIME_LEFT)]
#[case(Duration::zero(), NO_TIME_LEFT)]
#[case(Duration::days(-2), NO_TIME_LEFT)]
fn remaining_duration_table(#[case] until_deadline: Duration, #[case] expected: &str) {
    assert_eq!(remaining_duration_at(now() + until_deadline, now()), expected);
}

#[rstest]
#[case(Duration::minutes(-1), NOT_STARTED)]
#[case(Duration::zero(), "0 minutos")]
#[case(Duration::minutes(1), "1 minuto")]
#[case(Duration::minutes(45), "45 minutos")]
#[case(Duration::minutes(90), "1 hora")]
#[case(Duration::hours(23), "23 horas")]
#[case(Duration::hours(24), "1 día")]
#[case(Duration::days(12) + Duration::hours(23), "12 días")]
fn elapsed_duration_table(#[case] since_start: Duration, #[case] expected: &str) {
    assert_eq!(elapsed_duration_at(now() - since_start, now()), expected);
}

#[rstest]
#[case("2024-01-15T10:30:00Z", "15/01/2024 07:30")]
#[case("2024-07-04T00:00:00Z", "03/07/2024 20:00")]
#[case("2024-01-15T10:30", "15/01/2024 10:30")]
#[case("2024-12-31", "31/12/2024 00:00")]
fn absolute_format_table(#[case] input: &str, #[case] expected: &str) {
    let zone = civil_zone(DEFAULT_CIVIL_ZONE).unwrap();
    let instant = timeline::parse_instant(input, &zone).unwrap();
    assert_eq!(timeline::format_absolute(instant, &zone).unwrap(), expected);
}

#[test]
fn timeline_reports_unparseable_strings() {
    let timeline = Timeline::new(DEFAULT_CIVIL_ZONE, Arc::new(FixedClock(now()))).unwrap();
    assert!(timeline.format_absolute("31/12/2024").is_err());
    assert!(timeline.remaining_duration("not a date").is_err());
    assert!(timeline.is_overdue("2024-05-01").unwrap());
}

#[test]
fn other_zones_can_be_configured() {
    let timeline = Timeline::new("Europe/Madrid", Arc::new(FixedClock(now()))).unwrap();
    assert_eq!(timeline.format_absolute(now()).unwrap(), "01/06/2024 14:00");
    assert!(Timeline::new("Nowhere/Land", Arc::new(FixedClock(now()))).is_err());
}

fn instant() -> impl Strategy<Value = DateTime<Utc>> {
    // 2000-01-01 .. 2040-01-01
    (946_684_800i64..2_208_988_800i64).prop_map(|secs| Utc.timestamp_opt(secs, 0).unwrap())
}

#[test]
fn deadline_now_has_no_time_left_but_is_not_overdue() {
    assert_eq!(remaining_duration_at(now(), now()), NO_TIME_LEFT);
    assert!(!is_overdue_at(now(), now()));
    assert!(is_overdue_at(now() - Duration::seconds(1), now()));
}

/// A span in seconds plus two offsets that fall inside it.
fn span_and_offsets() -> impl Strategy<Value = (i64, i64, i64)> {
    (1i64..10_000_000).prop_flat_map(|span| (Just(span), 0..=span, 0..=span))
}

proptest! {
    #[test]
    fn progress_always_within_bounds(start in instant(), deadline in instant(), now in instant()) {
        let value = progress_percent_at(start, deadline, now);
        prop_assert!((0.0..=100.0).contains(&value));
    }

    #[test]
    fn progress_is_monotonic_in_now(
        start in instant(),
        (span, a, b) in span_and_offsets(),
    ) {
        let deadline = start + Duration::seconds(span);
        let earlier = start + Duration::seconds(a.min(b));
        let later = start + Duration::seconds(a.max(b));
        prop_assert!(
            progress_percent_at(start, deadline, earlier)
                <= progress_percent_at(start, deadline, later)
        );
    }

    #[test]
    fn progress_is_pinned_outside_the_span(start in instant(), span in 1i64..10_000_000, offset in 0i64..10_000_000) {
        let deadline = start + Duration::seconds(span);
        prop_assert_eq!(progress_percent_at(start, deadline, start - Duration::seconds(offset)), 0.0);
        prop_assert_eq!(progress_percent_at(start, deadline, deadline + Duration::seconds(offset)), 100.0);
    }

    #[test]
    fn overdue_implies_no_time_left(deadline in instant(), now in instant()) {
        if is_overdue_at(deadline, now) {
            prop_assert_eq!(remaining_duration_at(deadline, now), NO_TIME_LEFT);
        }
    }

    #[test]
    fn past_deadlines_have_no_time_left(now in instant(), back in 0i64..100_000_000) {
        prop_assert_eq!(remaining_duration_at(now - Duration::seconds(back), now), NO_TIME_LEFT);
    }
}
