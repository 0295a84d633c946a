//! Zone agnostic date and time values.
//!
//! A [`DateValue`] is either a plain calendar date or a date with a time of
//! day. Both kinds share a single total order in which a date sorts
//! immediately before any date-time on the same day.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};

use crate::error::{parse_bail, Error, ParseError};
use crate::time_utils;

/// A time of day. `24:00:00` is allowed as a sentinel for the midnight that
/// ends a day, and a second of 60 is tolerated for leap second inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeValue {
    hour: u32,
    minute: u32,
    second: u32,
}

impl TimeValue {
    /// Hour 24 forces minute and second to zero.
    pub fn new(hour: u32, minute: u32, second: u32) -> TimeValue {
        if hour >= 24 {
            TimeValue {
                hour: 24,
                minute: 0,
                second: 0,
            }
        } else {
            TimeValue {
                hour,
                minute,
                second,
            }
        }
    }

    pub fn midnight() -> TimeValue {
        TimeValue::new(0, 0, 0)
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn second(&self) -> u32 {
        self.second
    }
}

/// A calendar date, optionally with a time of day.
///
/// Field order matters: the derived ordering compares year, month and day,
/// then the time, where a missing time sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateValue {
    year: i32,
    month: u32,
    day: u32,
    time: Option<TimeValue>,
}

impl DateValue {
    /// Builds a date-only value. No range checks are made.
    pub fn date(year: i32, month: u32, day: u32) -> DateValue {
        DateValue {
            year,
            month,
            day,
            time: None,
        }
    }

    pub fn date_time(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
    ) -> DateValue {
        DateValue {
            year,
            month,
            day,
            time: Some(TimeValue::new(hour, minute, second)),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn time(&self) -> Option<TimeValue> {
        self.time
    }

    pub fn has_time(&self) -> bool {
        self.time.is_some()
    }

    /// The same calendar day without a time.
    pub fn date_part(&self) -> DateValue {
        DateValue::date(self.year, self.month, self.day)
    }

    pub fn with_time(&self, time: TimeValue) -> DateValue {
        DateValue {
            time: Some(time),
            ..*self
        }
    }

    pub fn weekday(&self) -> Weekday {
        time_utils::weekday_of(self.year, self.month, self.day)
    }

    pub(crate) fn ymd(&self) -> (i32, u32, u32) {
        (self.year, self.month, self.day)
    }

    pub fn is_valid(&self) -> bool {
        let time_ok = match self.time {
            Some(t) => t.hour <= 24 && t.minute <= 59 && t.second <= 60,
            None => true,
        };
        (1..=12).contains(&self.month)
            && self.day >= 1
            && self.day <= time_utils::month_length(self.year, self.month)
            && time_ok
    }

    pub fn to_naive_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }

    /// Converts to a chrono date-time, placing date-only values at midnight.
    /// Hour 24 and second 60 are normalised forward.
    pub fn to_naive_date_time(&self) -> Option<NaiveDateTime> {
        let date = self.to_naive_date()?;
        let time = self.time.unwrap_or_else(TimeValue::midnight);

        if time.hour == 24 {
            return date.succ_opt()?.and_hms_opt(0, 0, 0);
        }

        let leap = time.second == 60;
        let second = if leap { 59 } else { time.second };
        let naive = date.and_time(NaiveTime::from_hms_opt(time.hour, time.minute, second)?);

        if leap {
            Some(naive + Duration::seconds(1))
        } else {
            Some(naive)
        }
    }

    pub fn from_naive_date(date: NaiveDate) -> DateValue {
        DateValue::date(date.year(), date.month(), date.day())
    }

    pub fn from_naive_date_time(dt: NaiveDateTime) -> DateValue {
        DateValue::date_time(
            dt.year(),
            dt.month(),
            dt.day(),
            dt.hour(),
            dt.minute(),
            dt.second(),
        )
    }

    /// Adds a duration. A date-only value stays date-only when the duration
    /// is a whole number of days.
    pub fn add_duration(&self, duration: Duration) -> Option<DateValue> {
        if !self.has_time() && duration.num_seconds() % 86_400 == 0 {
            let date = self.to_naive_date()?.checked_add_signed(duration)?;
            return Some(DateValue::from_naive_date(date));
        }
        let dt = self.to_naive_date_time()?.checked_add_signed(duration)?;
        Some(DateValue::from_naive_date_time(dt))
    }
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}{:02}", self.year, self.month, self.day)?;
        if let Some(t) = self.time {
            write!(f, "T{:02}{:02}{:02}", t.hour, t.minute, t.second)?;
        }
        Ok(())
    }
}

/// Parses `YYYYMMDD`, `YYYYMMDDTHHMMSS` or `YYYYMMDDTHHMMSSZ`. The second
/// element is true when the value carried the `Z` (UTC) marker.
pub fn parse_date_text(text: &str) -> Result<(DateValue, bool), ParseError> {
    let text = text.trim();
    if !text.is_ascii() {
        parse_bail!("invalid date value '{}'", text);
    }
    let bytes = text.as_bytes();

    let digits = |range: std::ops::Range<usize>| -> Result<u32, ParseError> {
        let part = &text[range];
        if !part.bytes().all(|b| b.is_ascii_digit()) {
            parse_bail!("expected digits in date '{}'", text);
        }
        part.parse::<u32>()
            .map_err(|_| ParseError::new(format!("invalid number in date '{}'", text)))
    };

    let (has_time, utc) = match bytes.len() {
        8 => (false, false),
        15 if bytes[8].eq_ignore_ascii_case(&b'T') => (true, false),
        16 if bytes[8].eq_ignore_ascii_case(&b'T') && bytes[15].eq_ignore_ascii_case(&b'Z') => {
            (true, true)
        }
        _ => parse_bail!("invalid date value '{}'", text),
    };

    let year = digits(0..4)? as i32;
    let month = digits(4..6)?;
    let day = digits(6..8)?;

    if !(1..=12).contains(&month) || day < 1 || day > time_utils::month_length(year, month) {
        parse_bail!("date out of range '{}'", text);
    }

    if !has_time {
        return Ok((DateValue::date(year, month, day), false));
    }

    let hour = digits(9..11)?;
    let minute = digits(11..13)?;
    let second = digits(13..15)?;

    if hour > 24 || minute > 59 || second > 60 || (hour == 24 && (minute, second) != (0, 0)) {
        parse_bail!("time out of range '{}'", text);
    }

    Ok((
        DateValue::date_time(year, month, day, hour, minute, second),
        utc,
    ))
}

/// Parses a date, discarding any UTC marker.
impl FromStr for DateValue {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_date_text(s).map(|(value, _)| value)
    }
}

/// Largest number of seconds a chrono `Duration` can hold.
const MAX_DURATION_SECONDS: i64 = i64::MAX / 1_000;

/// Parses an RFC 2445 `dur-value` such as `P1W`, `-PT15M` or `P1DT2H`.
pub fn parse_duration(text: &str) -> Result<Duration, ParseError> {
    let upper = text.trim().to_ascii_uppercase();
    let (negative, rest) = match upper.as_bytes().first() {
        Some(b'-') => (true, &upper[1..]),
        Some(b'+') => (false, &upper[1..]),
        _ => (false, &upper[..]),
    };

    let rest = match rest.strip_prefix('P') {
        Some(rest) if !rest.is_empty() => rest,
        _ => parse_bail!("invalid duration '{}'", text),
    };

    let mut seconds: i64 = 0;
    let mut in_time = false;
    let mut number = String::new();
    let mut seen_unit = false;

    for c in rest.chars() {
        match c {
            '0'..='9' => number.push(c),
            'T' if !in_time && number.is_empty() => in_time = true,
            'W' | 'D' | 'H' | 'M' | 'S' => {
                let n: i64 = number
                    .parse()
                    .map_err(|_| ParseError::new(format!("invalid duration '{}'", text)))?;
                number.clear();
                let unit: i64 = match (c, in_time) {
                    ('W', false) => 7 * 86_400,
                    ('D', false) => 86_400,
                    ('H', true) => 3_600,
                    ('M', true) => 60,
                    ('S', true) => 1,
                    _ => parse_bail!("misplaced unit '{}' in duration '{}'", c, text),
                };
                seconds = n
                    .checked_mul(unit)
                    .and_then(|s| s.checked_add(seconds))
                    .filter(|&s| s <= MAX_DURATION_SECONDS)
                    .ok_or_else(|| ParseError::new(format!("duration '{}' is too long", text)))?;
                seen_unit = true;
            }
            _ => parse_bail!("invalid duration '{}'", text),
        }
    }

    if !number.is_empty() || !seen_unit {
        parse_bail!("invalid duration '{}'", text);
    }

    Ok(Duration::seconds(if negative { -seconds } else { seconds }))
}

/// A half open `[start, end)` span of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeriodValue {
    start: DateValue,
    end: DateValue,
}

impl PeriodValue {
    /// Both ends must be of the same kind, and `start <= end`.
    pub fn new(start: DateValue, end: DateValue) -> Result<PeriodValue, Error> {
        if start.has_time() != end.has_time() {
            return Err(Error::InvalidArgument(format!(
                "period {}/{} mixes a date with a date-time",
                start, end
            )));
        }
        if start > end {
            return Err(Error::InvalidArgument(format!(
                "period start {} is after its end {}",
                start, end
            )));
        }
        Ok(PeriodValue { start, end })
    }

    pub fn with_duration(start: DateValue, duration: Duration) -> Result<PeriodValue, Error> {
        let end = start.add_duration(duration).ok_or_else(|| {
            Error::InvalidArgument(format!("cannot add duration to {}", start))
        })?;
        PeriodValue::new(start, end)
    }

    pub fn start(&self) -> DateValue {
        self.start
    }

    pub fn end(&self) -> DateValue {
        self.end
    }

    /// True if the two periods share at least one instant.
    pub fn intersects(&self, other: &PeriodValue) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True if `other` lies entirely within this period.
    pub fn contains(&self, other: &PeriodValue) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for PeriodValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.start, self.end)
    }
}

/// An entry of a `BYDAY` list: a weekday, optionally restricted to its n-th
/// occurrence in the period (counted from the end when negative).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeekdayNum {
    pub num: i32,
    pub weekday: Weekday,
}

impl WeekdayNum {
    pub fn new(num: i32, weekday: Weekday) -> Result<WeekdayNum, Error> {
        if !(-53..=53).contains(&num) {
            return Err(Error::InvalidArgument(format!(
                "weekday number {} out of range",
                num
            )));
        }
        Ok(WeekdayNum { num, weekday })
    }

    /// Every occurrence of the weekday.
    pub fn every(weekday: Weekday) -> WeekdayNum {
        WeekdayNum { num: 0, weekday }
    }
}

impl fmt::Display for WeekdayNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.num != 0 {
            write!(f, "{}", self.num)?;
        }
        f.write_str(weekday_to_ical(self.weekday))
    }
}

impl FromStr for WeekdayNum {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() < 2 || !s.is_char_boundary(s.len() - 2) {
            parse_bail!("invalid weekday '{}'", s);
        }
        let (num, day) = s.split_at(s.len() - 2);

        let weekday =
            weekday_from_ical(day).ok_or_else(|| ParseError::new(format!("invalid weekday '{}'", s)))?;

        let num = if num.is_empty() {
            0
        } else {
            num.parse::<i32>()
                .map_err(|_| ParseError::new(format!("invalid weekday number '{}'", s)))?
        };

        if num == 0 && s.len() > 2 {
            parse_bail!("weekday number must not be zero '{}'", s);
        }

        WeekdayNum::new(num, weekday).map_err(|e| ParseError::new(e.to_string()))
    }
}

pub fn weekday_to_ical(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

pub fn weekday_from_ical(text: &str) -> Option<Weekday> {
    match &text.to_ascii_uppercase() as &str {
        "MO" => Some(Weekday::Mon),
        "TU" => Some(Weekday::Tue),
        "WE" => Some(Weekday::Wed),
        "TH" => Some(Weekday::Thu),
        "FR" => Some(Weekday::Fri),
        "SA" => Some(Weekday::Sat),
        "SU" => Some(Weekday::Sun),
        _ => None,
    }
}
