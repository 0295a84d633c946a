//! Stopping conditions and candidate filters.

use std::fmt;

use chrono::Weekday;

use crate::generators::{resolve_index, week_number_matches, weekday_num_matches, DtBuilder, Field};
use crate::time_utils;
use crate::values::{DateValue, WeekdayNum};

/// Decides whether a rule may emit one more instance. Once a condition
/// returns false the rule is finished.
pub trait Condition: fmt::Debug {
    fn test(&mut self, value: DateValue) -> bool;
}

/// True for exactly the first `n` calls.
#[derive(Debug, Clone)]
pub struct CountCondition {
    remaining: u32,
}

pub fn count_condition(n: u32) -> CountCondition {
    CountCondition { remaining: n }
}

impl Condition for CountCondition {
    fn test(&mut self, _value: DateValue) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

/// True while values are on or before a bound in the same local time.
///
/// A date-only bound includes every time on that day, and a date-only value
/// is compared with the date of a date-time bound.
#[derive(Debug, Clone)]
pub struct UntilCondition {
    until: DateValue,
}

pub fn until_condition(until: DateValue) -> UntilCondition {
    UntilCondition { until }
}

impl Condition for UntilCondition {
    fn test(&mut self, value: DateValue) -> bool {
        if value.has_time() == self.until.has_time() {
            value <= self.until
        } else {
            value.date_part() <= self.until.date_part()
        }
    }
}

/// A predicate over candidates, checked as soon as `field` has been set.
pub trait DateFilter: fmt::Debug {
    fn field(&self) -> Field;

    fn accepts(&self, builder: &DtBuilder) -> bool;
}

/// Accepts dates whose week is a whole, nonnegative multiple of `interval`
/// weeks after the week of the reference date.
#[derive(Debug, Clone)]
pub struct WeekIntervalFilter {
    interval: i64,
    week_start: Weekday,
    reference_week: i64,
}

pub fn week_interval_filter(
    interval: u32,
    week_start: Weekday,
    reference: DateValue,
) -> WeekIntervalFilter {
    let start = time_utils::start_of_week(reference.ymd(), week_start);
    WeekIntervalFilter {
        interval: i64::from(interval.max(1)),
        week_start,
        reference_week: time_utils::day_number(start.0, start.1, start.2),
    }
}

impl DateFilter for WeekIntervalFilter {
    fn field(&self) -> Field {
        Field::Day
    }

    fn accepts(&self, b: &DtBuilder) -> bool {
        let start = time_utils::start_of_week(b.ymd(), self.week_start);
        let weeks = (time_utils::day_number(start.0, start.1, start.2) - self.reference_week) / 7;
        weeks >= 0 && weeks % self.interval == 0
    }
}

/// A BY-list used to narrow candidates rather than to generate them.
#[derive(Debug, Clone)]
pub enum ByFilter {
    Month(Vec<u32>),
    MonthDay(Vec<i32>),
    YearDay(Vec<i32>),
    WeekNo { weeks: Vec<i32>, week_start: Weekday },
    Day { days: Vec<WeekdayNum>, in_year: bool },
    Hour(Vec<u32>),
    Minute(Vec<u32>),
    Second(Vec<u32>),
}

impl DateFilter for ByFilter {
    fn field(&self) -> Field {
        match self {
            ByFilter::Month(_) => Field::Month,
            ByFilter::MonthDay(_)
            | ByFilter::YearDay(_)
            | ByFilter::WeekNo { .. }
            | ByFilter::Day { .. } => Field::Day,
            ByFilter::Hour(_) => Field::Hour,
            ByFilter::Minute(_) => Field::Minute,
            ByFilter::Second(_) => Field::Second,
        }
    }

    fn accepts(&self, b: &DtBuilder) -> bool {
        match self {
            ByFilter::Month(months) => months.contains(&b.month),
            ByFilter::MonthDay(days) => {
                let len = time_utils::month_length(b.year, b.month) as i32;
                days.iter()
                    .any(|&d| resolve_index(d, len) == Some(b.day as i32))
            }
            ByFilter::YearDay(days) => {
                let len = time_utils::year_length(b.year);
                days.iter()
                    .any(|&d| resolve_index(d, len) == Some(b.day_of_year() + 1))
            }
            ByFilter::WeekNo { weeks, week_start } => {
                week_number_matches(weeks, *week_start, b.ymd())
            }
            ByFilter::Day { days, in_year } => days
                .iter()
                .any(|&wd| weekday_num_matches(wd, *b, *in_year)),
            ByFilter::Hour(hours) => hours.contains(&b.hour),
            ByFilter::Minute(minutes) => minutes.contains(&b.minute),
            ByFilter::Second(seconds) => seconds.contains(&b.second),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on(year: i32, month: u32, day: u32) -> DtBuilder {
        DtBuilder {
            year,
            month,
            day,
            ..DtBuilder::default()
        }
    }

    #[test]
    fn count_condition_passes_exactly_n() {
        let mut c = count_condition(3);
        let d = DateValue::date(2006, 1, 1);
        assert_eq!(
            (0..5).map(|_| c.test(d)).collect::<Vec<_>>(),
            vec![true, true, true, false, false]
        );
    }

    #[test]
    fn until_includes_the_whole_bound_day() {
        let mut c = until_condition(DateValue::date(2006, 4, 13));
        assert!(c.test(DateValue::date_time(2006, 4, 13, 23, 59, 59)));
        assert!(!c.test(DateValue::date_time(2006, 4, 14, 0, 0, 0)));

        let mut c = until_condition(DateValue::date_time(2006, 4, 13, 9, 0, 0));
        assert!(c.test(DateValue::date_time(2006, 4, 13, 9, 0, 0)));
        assert!(!c.test(DateValue::date_time(2006, 4, 13, 9, 0, 1)));
        assert!(c.test(DateValue::date(2006, 4, 13)));
    }

    #[test]
    fn week_interval() {
        // Tuesday April 11th 2006; weeks start on Monday the 10th.
        let f = week_interval_filter(2, Weekday::Mon, DateValue::date(2006, 4, 11));
        assert!(f.accepts(&on(2006, 4, 10)));
        assert!(f.accepts(&on(2006, 4, 16)));
        assert!(!f.accepts(&on(2006, 4, 17)));
        assert!(f.accepts(&on(2006, 4, 27)));
        assert!(!f.accepts(&on(2006, 4, 3)));

        // With Sunday weeks the 16th starts a new week.
        let f = week_interval_filter(2, Weekday::Sun, DateValue::date(2006, 4, 11));
        assert!(!f.accepts(&on(2006, 4, 16)));
        assert!(f.accepts(&on(2006, 4, 15)));
    }

    #[test]
    fn by_filters() {
        assert!(ByFilter::MonthDay(vec![-1]).accepts(&on(2004, 2, 29)));
        assert!(!ByFilter::MonthDay(vec![-1]).accepts(&on(2004, 2, 28)));
        assert!(ByFilter::YearDay(vec![-1]).accepts(&on(2006, 12, 31)));
        assert!(ByFilter::YearDay(vec![100]).accepts(&on(2006, 4, 10)));
        assert!(ByFilter::Month(vec![1, 4]).accepts(&on(2006, 4, 10)));

        let first_friday = ByFilter::Day {
            days: vec![WeekdayNum::new(1, Weekday::Fri).unwrap()],
            in_year: false,
        };
        assert!(first_friday.accepts(&on(2006, 4, 7)));
        assert!(!first_friday.accepts(&on(2006, 4, 14)));
        assert_eq!(first_friday.field(), Field::Day);

        let week_one = ByFilter::WeekNo {
            weeks: vec![1],
            week_start: Weekday::Mon,
        };
        assert!(week_one.accepts(&on(2008, 12, 29)));
        assert!(!week_one.accepts(&on(2008, 12, 28)));
    }
}
