//! Calendar arithmetic shared by the generators and filters.
//!
//! Everything here takes plain `(year, month, day)` integers so that it can
//! be applied to a partially advanced [`DtBuilder`](crate::generators::DtBuilder).
//! A day past the end of its month counts on into the following months.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::convert::TryFrom;

/// `num_days_from_ce` of 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i64 = 719_163;

fn to_naive(year: i32, month: u32, day: u32) -> NaiveDate {
    let first = NaiveDate::from_ymd_opt(year, month.max(1).min(12), 1).unwrap_or(NaiveDate::MIN);
    first
        .checked_add_signed(Duration::days(i64::from(day) - 1))
        .unwrap_or(first)
}

fn ymd(date: NaiveDate) -> (i32, u32, u32) {
    (date.year(), date.month(), date.day())
}

pub fn is_leap_year(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}

pub fn year_length(year: i32) -> i32 {
    if is_leap_year(year) {
        366
    } else {
        365
    }
}

pub fn month_length(year: i32, month: u32) -> u32 {
    let first = match NaiveDate::from_ymd_opt(year, month, 1) {
        Some(first) => first,
        None => return 0,
    };
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next.map_or(31, |next| next.signed_duration_since(first).num_days() as u32)
}

/// Zero based day of the year, so January 1st is 0.
pub fn day_of_year(year: i32, month: u32, day: u32) -> i32 {
    to_naive(year, month, day).ordinal0() as i32
}

/// Number of days since 1970-01-01 (negative before).
pub fn day_number(year: i32, month: u32, day: u32) -> i64 {
    i64::from(to_naive(year, month, day).num_days_from_ce()) - UNIX_EPOCH_DAYS_FROM_CE
}

/// Inverse of [`day_number`]. Saturates at the ends of chrono's range.
pub fn from_day_number(n: i64) -> (i32, u32, u32) {
    let date = n
        .checked_add(UNIX_EPOCH_DAYS_FROM_CE)
        .and_then(|days| i32::try_from(days).ok())
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .unwrap_or(if n < 0 { NaiveDate::MIN } else { NaiveDate::MAX });
    ymd(date)
}

/// `a - b` in whole days.
pub fn days_between(a: (i32, u32, u32), b: (i32, u32, u32)) -> i64 {
    to_naive(a.0, a.1, a.2)
        .signed_duration_since(to_naive(b.0, b.1, b.2))
        .num_days()
}

pub fn add_days(date: (i32, u32, u32), days: i64) -> (i32, u32, u32) {
    from_day_number(day_number(date.0, date.1, date.2) + days)
}

pub fn weekday_of(year: i32, month: u32, day: u32) -> Weekday {
    to_naive(year, month, day).weekday()
}

/// Days from `week_start` forward to `day`, in `0..7`.
pub fn weekday_offset(week_start: Weekday, day: Weekday) -> u32 {
    (7 + day.num_days_from_monday() - week_start.num_days_from_monday()) % 7
}

/// The latest date on or before the given one that falls on `week_start`.
pub fn start_of_week(date: (i32, u32, u32), week_start: Weekday) -> (i32, u32, u32) {
    let offset = weekday_offset(week_start, weekday_of(date.0, date.1, date.2));
    add_days(date, -i64::from(offset))
}

/// Week numbering for one calendar year, where week one is the first week with
/// at least four days in the year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearWeeks {
    /// Zero based day of year of the first day of week one. Ranges over
    /// `-3..=3`, as week one may start in the previous year.
    pub week_one_start: i32,
    /// 52 or 53.
    pub weeks_in_year: i32,
}

impl YearWeeks {
    pub fn new(year: i32, week_start: Weekday) -> YearWeeks {
        let jan1_offset = weekday_offset(week_start, weekday_of(year, 1, 1)) as i32;
        let week_one_start = if jan1_offset <= 3 {
            -jan1_offset
        } else {
            7 - jan1_offset
        };

        let span = year_length(year) - week_one_start;
        let mut weeks_in_year = span / 7;
        if span % 7 >= 4 {
            weeks_in_year += 1;
        }

        YearWeeks {
            week_one_start,
            weeks_in_year,
        }
    }

    /// The one based week number of a zero based day of this year, or `None`
    /// if the day belongs to a week of an adjacent year.
    pub fn week_of(&self, doy: i32) -> Option<i32> {
        if doy < self.week_one_start {
            return None;
        }
        let week = (doy - self.week_one_start) / 7 + 1;
        if week > self.weeks_in_year {
            None
        } else {
            Some(week)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_lengths() {
        assert_eq!(month_length(2006, 2), 28);
        assert_eq!(month_length(2004, 2), 29);
        assert_eq!(month_length(1900, 2), 28);
        assert_eq!(month_length(2000, 2), 29);
        assert_eq!(month_length(2006, 4), 30);
        assert_eq!(month_length(2006, 12), 31);
    }

    #[test]
    fn day_numbers_round_trip() {
        assert_eq!(day_number(1970, 1, 1), 0);
        assert_eq!(day_number(1969, 12, 31), -1);
        assert_eq!(day_number(2000, 3, 1), 11_017);

        for &date in &[(1600, 2, 29), (1999, 12, 31), (2006, 4, 13), (-44, 3, 15)] {
            assert_eq!(from_day_number(day_number(date.0, date.1, date.2)), date);
        }
    }

    #[test]
    fn weekdays() {
        assert_eq!(weekday_of(2006, 4, 13), Weekday::Thu);
        assert_eq!(weekday_of(1997, 9, 2), Weekday::Tue);
        assert_eq!(weekday_of(2000, 1, 1), Weekday::Sat);
    }

    #[test]
    fn day_of_year_is_zero_based() {
        assert_eq!(day_of_year(2006, 1, 1), 0);
        assert_eq!(day_of_year(2006, 12, 31), 364);
        assert_eq!(day_of_year(2004, 12, 31), 365);
        assert_eq!(day_of_year(2004, 3, 1), 60);
    }

    #[test]
    fn days_past_the_month_roll_over() {
        assert_eq!(day_number(2006, 2, 29), day_number(2006, 3, 1));
        assert_eq!(weekday_of(2006, 4, 31), Weekday::Mon);
        assert_eq!(days_between((2006, 5, 1), (2006, 4, 1)), 30);
        assert_eq!(add_days((2006, 12, 31), 1), (2007, 1, 1));
    }

    #[test]
    fn day_numbers_saturate_at_the_calendar_ends() {
        let max = NaiveDate::MAX;
        let min = NaiveDate::MIN;
        assert_eq!(from_day_number(i64::MAX), (max.year(), max.month(), max.day()));
        assert_eq!(from_day_number(i64::MIN), (min.year(), min.month(), min.day()));
    }

    #[test]
    fn start_of_week_goes_backwards() {
        assert_eq!(start_of_week((2006, 4, 13), Weekday::Mon), (2006, 4, 10));
        assert_eq!(start_of_week((2006, 4, 10), Weekday::Mon), (2006, 4, 10));
        assert_eq!(start_of_week((2006, 4, 13), Weekday::Sun), (2006, 4, 9));
        assert_eq!(start_of_week((2006, 1, 1), Weekday::Mon), (2005, 12, 26));
    }

    #[test]
    fn iso_like_week_counts() {
        // 2004 started on a Thursday and has 53 weeks.
        let weeks = YearWeeks::new(2004, Weekday::Mon);
        assert_eq!(weeks.weeks_in_year, 53);
        assert_eq!(weeks.week_one_start, -3);

        // 2008 started on a Tuesday; Dec 29-31 belong to 2009's week one.
        let weeks = YearWeeks::new(2008, Weekday::Mon);
        assert_eq!(weeks.weeks_in_year, 52);
        assert_eq!(weeks.week_one_start, -1);
        assert_eq!(weeks.week_of(day_of_year(2008, 12, 28)), Some(52));
        assert_eq!(weeks.week_of(day_of_year(2008, 12, 29)), None);

        // 2010 started on a Friday, so Jan 1-3 belong to 2009's last week.
        let weeks = YearWeeks::new(2010, Weekday::Mon);
        assert_eq!(weeks.week_one_start, 3);
        assert_eq!(weeks.week_of(0), None);
        assert_eq!(weeks.week_of(3), Some(1));
    }
}
