//! Field generators.
//!
//! Each generator owns one calendar field of a shared [`DtBuilder`] cursor.
//! Calling [`Generator::generate`] moves that field to the next acceptable
//! value inside the period fixed by the coarser fields, or returns `false`
//! once the period has nothing left. The coarser generator is then advanced
//! and the finer one starts over in the new period.

use std::fmt;

use chrono::Weekday;

use crate::time_utils::{self, YearWeeks};
use crate::values::{DateValue, WeekdayNum};

/// The mutable cursor threaded through a generator chain.
///
/// Field order matters: the derived ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DtBuilder {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl DtBuilder {
    pub fn from_value(value: DateValue) -> DtBuilder {
        let (hour, minute, second) = match value.time() {
            Some(t) => (t.hour(), t.minute(), t.second()),
            None => (0, 0, 0),
        };
        DtBuilder {
            year: value.year(),
            month: value.month(),
            day: value.day(),
            hour,
            minute,
            second,
        }
    }

    pub fn to_date(&self) -> DateValue {
        DateValue::date(self.year, self.month, self.day)
    }

    pub fn to_date_time(&self) -> DateValue {
        DateValue::date_time(
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
        )
    }

    pub fn ymd(&self) -> (i32, u32, u32) {
        (self.year, self.month, self.day)
    }

    pub fn weekday(&self) -> Weekday {
        time_utils::weekday_of(self.year, self.month, self.day)
    }

    /// Zero based.
    pub fn day_of_year(&self) -> i32 {
        time_utils::day_of_year(self.year, self.month, self.day)
    }

    pub fn with_date(self, (year, month, day): (i32, u32, u32)) -> DtBuilder {
        DtBuilder {
            year,
            month,
            day,
            ..self
        }
    }

    /// Keeps the fields up to and including `field`, zeroing the rest
    /// (months and days become 1).
    pub fn truncate(self, field: Field) -> DtBuilder {
        let mut b = self;
        let level = field.level();
        if level < 1 {
            b.month = 1;
        }
        if level < 2 {
            b.day = 1;
        }
        if level < 3 {
            b.hour = 0;
        }
        if level < 4 {
            b.minute = 0;
        }
        if level < 5 {
            b.second = 0;
        }
        b
    }
}

impl fmt::Display for DtBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_date_time(), f)
    }
}

/// The fields of a [`DtBuilder`], coarsest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Field {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl Field {
    pub fn level(self) -> usize {
        self as usize
    }

    #[cfg(test)]
    fn get(self, b: &DtBuilder) -> i64 {
        match self {
            Field::Year => i64::from(b.year),
            Field::Month => i64::from(b.month),
            Field::Day => i64::from(b.day),
            Field::Hour => i64::from(b.hour),
            Field::Minute => i64::from(b.minute),
            Field::Second => i64::from(b.second),
        }
    }

    fn set(self, b: &mut DtBuilder, value: i64) {
        match self {
            Field::Year => b.year = value as i32,
            Field::Month => b.month = value as u32,
            Field::Day => b.day = value as u32,
            Field::Hour => b.hour = value as u32,
            Field::Minute => b.minute = value as u32,
            Field::Second => b.second = value as u32,
        }
    }

    /// Identifies the period of the coarser fields that this field ranges
    /// over.
    fn parent_key(self, b: &DtBuilder) -> DtBuilder {
        match self {
            Field::Year => DtBuilder::default(),
            Field::Month => DtBuilder {
                year: b.year,
                ..DtBuilder::default()
            },
            Field::Day => DtBuilder {
                year: b.year,
                month: b.month,
                ..DtBuilder::default()
            },
            Field::Hour => DtBuilder {
                hour: 0,
                minute: 0,
                second: 0,
                ..*b
            },
            Field::Minute => DtBuilder {
                minute: 0,
                second: 0,
                ..*b
            },
            Field::Second => DtBuilder { second: 0, ..*b },
        }
    }

    /// Largest value the field takes within its parent period.
    fn max(self, b: &DtBuilder, max_year: i32) -> i64 {
        match self {
            Field::Year => i64::from(max_year),
            Field::Month => 12,
            Field::Day => i64::from(time_utils::month_length(b.year, b.month)),
            Field::Hour => 23,
            Field::Minute | Field::Second => 59,
        }
    }
}

pub trait Generator: fmt::Debug {
    fn field(&self) -> Field;

    /// Moves the generator's field to its next value in the current period.
    /// Returns false, leaving the builder untouched, when there is none.
    fn generate(&mut self, builder: &mut DtBuilder) -> bool;
}

/// Steps a field by a fixed interval. The phase is anchored so that the
/// anchor's own value is always part of the series, whichever period the
/// cursor is in.
#[derive(Debug)]
pub struct SerialGenerator {
    field: Field,
    interval: i64,
    anchor: DtBuilder,
    max_year: i32,
    period: Option<DtBuilder>,
    next: i64,
}

impl SerialGenerator {
    fn new(field: Field, interval: u32, anchor: DtBuilder, max_year: i32) -> SerialGenerator {
        SerialGenerator {
            field,
            interval: i64::from(interval.max(1)),
            anchor,
            max_year,
            period: None,
            next: 0,
        }
    }

    /// Distance, in units of the field, from the anchor to the first value of
    /// the field in the builder's current period.
    fn offset_from_anchor(&self, b: &DtBuilder) -> i64 {
        let a = &self.anchor;
        let days = || time_utils::days_between(b.ymd(), a.ymd());
        match self.field {
            Field::Year => 0,
            Field::Month => {
                (i64::from(b.year) - i64::from(a.year)) * 12 + 1 - i64::from(a.month)
            }
            Field::Day => time_utils::days_between((b.year, b.month, 1), a.ymd()),
            Field::Hour => days() * 24 - i64::from(a.hour),
            Field::Minute => {
                (days() * 24 + i64::from(b.hour) - i64::from(a.hour)) * 60 - i64::from(a.minute)
            }
            Field::Second => {
                ((days() * 24 + i64::from(b.hour) - i64::from(a.hour)) * 60 + i64::from(b.minute)
                    - i64::from(a.minute))
                    * 60
                    - i64::from(a.second)
            }
        }
    }

    fn first_value(&self, b: &DtBuilder) -> i64 {
        let base = match self.field {
            Field::Year => return i64::from(self.anchor.year),
            Field::Month | Field::Day => 1,
            Field::Hour | Field::Minute | Field::Second => 0,
        };
        base + (-self.offset_from_anchor(b)).rem_euclid(self.interval)
    }
}

impl Generator for SerialGenerator {
    fn field(&self) -> Field {
        self.field
    }

    fn generate(&mut self, b: &mut DtBuilder) -> bool {
        let period = self.field.parent_key(b);
        if self.period != Some(period) {
            self.period = Some(period);
            self.next = self.first_value(b);
        }

        if self.next > self.field.max(b, self.max_year) {
            return false;
        }

        self.field.set(b, self.next);
        self.next += self.interval;
        true
    }
}

pub fn serial_year_generator(interval: u32, anchor: DtBuilder, max_year: i32) -> SerialGenerator {
    SerialGenerator::new(Field::Year, interval, anchor, max_year)
}

pub fn serial_month_generator(interval: u32, anchor: DtBuilder) -> SerialGenerator {
    SerialGenerator::new(Field::Month, interval, anchor, 0)
}

pub fn serial_day_generator(interval: u32, anchor: DtBuilder) -> SerialGenerator {
    SerialGenerator::new(Field::Day, interval, anchor, 0)
}

pub fn serial_hour_generator(interval: u32, anchor: DtBuilder) -> SerialGenerator {
    SerialGenerator::new(Field::Hour, interval, anchor, 0)
}

pub fn serial_minute_generator(interval: u32, anchor: DtBuilder) -> SerialGenerator {
    SerialGenerator::new(Field::Minute, interval, anchor, 0)
}

pub fn serial_second_generator(interval: u32, anchor: DtBuilder) -> SerialGenerator {
    SerialGenerator::new(Field::Second, interval, anchor, 0)
}

/// The BY-list a [`ByListGenerator`] resolves against each period.
#[derive(Debug, Clone)]
enum Selection {
    /// Literal field values.
    Values(Vec<u32>),
    MonthDays(Vec<i32>),
    YearDays(Vec<i32>),
    Weekdays {
        days: Vec<WeekdayNum>,
        /// Numbered entries count within the year rather than the month.
        in_year: bool,
    },
    WeekNumbers {
        weeks: Vec<i32>,
        week_start: Weekday,
    },
}

impl Selection {
    /// The values of the field that match in the builder's current period,
    /// ascending and without duplicates.
    fn resolve(&self, b: &DtBuilder) -> Vec<u32> {
        let month_len = time_utils::month_length(b.year, b.month);
        let mut values: Vec<u32> = match self {
            Selection::Values(values) => values.clone(),
            Selection::MonthDays(days) => days
                .iter()
                .filter_map(|&d| resolve_index(d, month_len as i32))
                .map(|d| d as u32)
                .collect(),
            Selection::YearDays(days) => {
                let year_len = time_utils::year_length(b.year);
                let first = time_utils::day_of_year(b.year, b.month, 1);
                days.iter()
                    .filter_map(|&d| resolve_index(d, year_len))
                    .map(|doy| doy - first)
                    .filter(|&d| d >= 1 && d <= month_len as i32)
                    .map(|d| d as u32)
                    .collect()
            }
            Selection::Weekdays { days, in_year } => (1..=month_len)
                .filter(|&d| {
                    days.iter()
                        .any(|wd| weekday_num_matches(*wd, b.with_date((b.year, b.month, d)), *in_year))
                })
                .collect(),
            Selection::WeekNumbers { weeks, week_start } => (1..=month_len)
                .filter(|&d| {
                    week_number_matches(weeks, *week_start, (b.year, b.month, d))
                })
                .collect(),
        };
        values.sort_unstable();
        values.dedup();
        values
    }
}

/// Resolves a one based, possibly negative, index into `1..=len`.
pub(crate) fn resolve_index(index: i32, len: i32) -> Option<i32> {
    let resolved = if index > 0 { index } else { len + 1 + index };
    if resolved >= 1 && resolved <= len {
        Some(resolved)
    } else {
        None
    }
}

/// Whether the builder's date is the weekday of `wd`, and, for numbered
/// entries, its n-th occurrence within the month (or year).
pub(crate) fn weekday_num_matches(wd: WeekdayNum, b: DtBuilder, in_year: bool) -> bool {
    if b.weekday() != wd.weekday {
        return false;
    }
    if wd.num == 0 {
        return true;
    }

    let (index, len) = if in_year {
        (b.day_of_year(), time_utils::year_length(b.year))
    } else {
        (
            b.day as i32 - 1,
            time_utils::month_length(b.year, b.month) as i32,
        )
    };

    let from_start = index / 7 + 1;
    let from_end = -((len - 1 - index) / 7 + 1);
    wd.num == from_start || wd.num == from_end
}

/// Whether a date falls in one of the given weeks. Days at the edges of a
/// year may belong to a week of the adjacent year.
pub(crate) fn week_number_matches(
    weeks: &[i32],
    week_start: Weekday,
    (year, month, day): (i32, u32, u32),
) -> bool {
    let this_year = YearWeeks::new(year, week_start);
    let doy = time_utils::day_of_year(year, month, day);

    let (week, weeks_in_year) = match this_year.week_of(doy) {
        Some(week) => (week, this_year.weeks_in_year),
        None if doy < this_year.week_one_start => {
            let last_year = YearWeeks::new(year - 1, week_start);
            (last_year.weeks_in_year, last_year.weeks_in_year)
        }
        None => (1, YearWeeks::new(year + 1, week_start).weeks_in_year),
    };

    weeks
        .iter()
        .any(|&w| resolve_index(w, weeks_in_year) == Some(week))
}

/// Walks the values a BY-list selects in each period, in ascending order.
#[derive(Debug)]
pub struct ByListGenerator {
    field: Field,
    selection: Selection,
    period: Option<DtBuilder>,
    values: Vec<u32>,
    index: usize,
}

impl ByListGenerator {
    fn new(field: Field, selection: Selection) -> ByListGenerator {
        ByListGenerator {
            field,
            selection,
            period: None,
            values: Vec::new(),
            index: 0,
        }
    }
}

impl Generator for ByListGenerator {
    fn field(&self) -> Field {
        self.field
    }

    fn generate(&mut self, b: &mut DtBuilder) -> bool {
        let period = self.field.parent_key(b);
        if self.period != Some(period) {
            self.period = Some(period);
            self.values = self.selection.resolve(b);
            self.index = 0;
        }

        match self.values.get(self.index) {
            Some(&value) => {
                self.field.set(b, i64::from(value));
                self.index += 1;
                true
            }
            None => false,
        }
    }
}

pub fn by_month_generator(months: &[u32]) -> ByListGenerator {
    ByListGenerator::new(Field::Month, Selection::Values(months.to_vec()))
}

pub fn by_month_day_generator(days: &[i32]) -> ByListGenerator {
    ByListGenerator::new(Field::Day, Selection::MonthDays(days.to_vec()))
}

pub fn by_year_day_generator(days: &[i32]) -> ByListGenerator {
    ByListGenerator::new(Field::Day, Selection::YearDays(days.to_vec()))
}

/// Numbered entries count within the year when `in_year` is set, otherwise
/// within the month.
pub fn by_day_generator(days: &[WeekdayNum], in_year: bool) -> ByListGenerator {
    ByListGenerator::new(
        Field::Day,
        Selection::Weekdays {
            days: days.to_vec(),
            in_year,
        },
    )
}

pub fn by_week_no_generator(weeks: &[i32], week_start: Weekday) -> ByListGenerator {
    ByListGenerator::new(
        Field::Day,
        Selection::WeekNumbers {
            weeks: weeks.to_vec(),
            week_start,
        },
    )
}

pub fn by_hour_generator(hours: &[u32]) -> ByListGenerator {
    ByListGenerator::new(Field::Hour, Selection::Values(hours.to_vec()))
}

pub fn by_minute_generator(minutes: &[u32]) -> ByListGenerator {
    ByListGenerator::new(Field::Minute, Selection::Values(minutes.to_vec()))
}

pub fn by_second_generator(seconds: &[u32]) -> ByListGenerator {
    ByListGenerator::new(Field::Second, Selection::Values(seconds.to_vec()))
}
