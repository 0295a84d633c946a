use std::str::FromStr;
use std::sync::Arc;

use chrono::{Utc, Weekday};
use chrono_tz::Europe::London;
use proptest::prelude::*;

use ics_recur::property::{self, EndCondition, Frequency};
use ics_recur::{
    create_recurrence_iterator, parse_recurrence_iterator, DateValue, RecurRule,
    RecurrenceIterator, RecurrenceLine, WeekdayNum,
};

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

fn frequency() -> impl Strategy<Value = Frequency> {
    prop_oneof![
        Just(Frequency::Daily),
        Just(Frequency::Weekly),
        Just(Frequency::Monthly),
        Just(Frequency::Yearly),
    ]
}

fn weekdays() -> impl Strategy<Value = Vec<WeekdayNum>> {
    proptest::sample::subsequence(WEEKDAYS.to_vec(), 0..=3)
        .prop_map(|days| days.into_iter().map(WeekdayNum::every).collect())
}

/// Rules that always have another instance within a few years.
fn rule() -> impl Strategy<Value = RecurRule> {
    (
        frequency(),
        1..4u32,
        weekdays(),
        proptest::collection::vec(1..=28i32, 0..3),
        proptest::option::of(0..7usize),
    )
        .prop_map(|(frequency, interval, by_day, by_month_day, week_start)| {
            let mut rule = RecurRule::new(frequency);
            rule.interval = interval;
            rule.by_day = by_day;
            if rule.by_day.is_empty() || frequency != Frequency::Weekly {
                rule.by_month_day = by_month_day;
            }
            rule.week_start = week_start.map(|i| WEEKDAYS[i]);
            rule
        })
}

fn start() -> impl Strategy<Value = DateValue> {
    (2000..2010i32, 1..=12u32, 1..=28u32, 0..24u32, prop_oneof![Just(0u32), Just(30)]).prop_map(
        |(year, month, day, hour, minute)| DateValue::date_time(year, month, day, hour, minute, 0),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_instants_strictly_increase(rule in rule(), start in start()) {
        let dates: Vec<DateValue> =
            create_recurrence_iterator(&rule, start, Arc::new(London)).take(40).collect();
        for pair in dates.windows(2) {
            prop_assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn prop_advance_to_matches_filtering(
        rule in rule(),
        start in start(),
        skip_days in 0..400i64,
    ) {
        let zone = Arc::new(Utc);
        let all: Vec<DateValue> =
            create_recurrence_iterator(&rule, start, zone.clone()).take(60).collect();
        let cut = start
            .add_duration(chrono::Duration::days(skip_days))
            .expect("in range");
        let expected: Vec<DateValue> = all.into_iter().filter(|d| *d >= cut).collect();

        let mut iter = create_recurrence_iterator(&rule, start, zone);
        iter.advance_to(cut);
        let advanced: Vec<DateValue> = iter.take(expected.len()).collect();
        prop_assert_eq!(advanced, expected);
    }

    #[test]
    fn prop_count_is_exact(rule in rule(), start in start(), count in 1..30u32) {
        let mut rule = rule;
        rule.end_condition = EndCondition::Count(count);
        let emitted = create_recurrence_iterator(&rule, start, Arc::new(Utc)).count();
        prop_assert_eq!(emitted, count as usize);
    }

    #[test]
    fn prop_canonical_form_round_trips(rule in rule(), count in proptest::option::of(1..100u32)) {
        let mut rule = rule;
        if let Some(count) = count {
            rule.end_condition = EndCondition::Count(count);
        }
        let text = rule.to_ical();
        match property::parse_recurrence_line(&text, &Utc) {
            Ok(RecurrenceLine::Rule(parsed)) => prop_assert_eq!(parsed, rule),
            other => prop_assert!(false, "{} parsed as {:?}", text, other),
        }
    }

    #[test]
    fn prop_compound_never_repeats(
        rule in rule(),
        start in start(),
        extra in proptest::collection::vec(0..200i64, 0..6),
    ) {
        let mut text = rule.to_ical();
        for days in extra {
            let date = start.add_duration(chrono::Duration::days(days)).expect("in range");
            text.push_str(&format!("\nRDATE:{}Z", date));
        }
        let dates: Vec<DateValue> = parse_recurrence_iterator(&text, start, Arc::new(Utc))
            .expect("valid text")
            .take(40)
            .collect();
        for pair in dates.windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
    }
}

#[test]
fn round_trip_of_a_written_rule() {
    let rule =
        RecurRule::from_str("FREQ=MONTHLY;WKST=SU;INTERVAL=2;BYMONTHDAY=-1,15;BYDAY=-1FR")
            .unwrap();
    assert_eq!(
        rule.body(),
        "FREQ=MONTHLY;WKST=SU;INTERVAL=2;BYMONTHDAY=-1,15;BYDAY=-1FR"
    );
}
