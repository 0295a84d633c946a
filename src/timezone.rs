//! Conversion between local wall clock time and UTC.
//!
//! Recurrence arithmetic happens entirely in local time; an [`Offseter`] is
//! consulted only when a local candidate needs to be compared with absolute
//! instants.

use std::fmt::Debug;
use std::sync::Arc;

use chrono::{Duration, FixedOffset, LocalResult, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::ParseError;
use crate::values::DateValue;

pub trait Offseter: Debug {
    /// Converts a local wall clock time to UTC. Ambiguous times resolve to
    /// the earliest instant, and times in a gap use the offset in force
    /// before the gap.
    fn to_utc(&self, local: NaiveDateTime) -> NaiveDateTime;

    fn from_utc(&self, utc: NaiveDateTime) -> NaiveDateTime;
}

/// A time zone shared between the iterators of one recurrence set.
pub type SharedZone = Arc<dyn Offseter + Send + Sync>;

impl Offseter for Tz {
    fn to_utc(&self, local: NaiveDateTime) -> NaiveDateTime {
        match self.from_local_datetime(&local) {
            LocalResult::Single(dt) => dt.naive_utc(),
            LocalResult::Ambiguous(a, b) => a.naive_utc().min(b.naive_utc()),
            LocalResult::None => {
                let before = self
                    .offset_from_utc_datetime(&(local - Duration::days(1)))
                    .fix();
                local - Duration::seconds(i64::from(before.local_minus_utc()))
            }
        }
    }

    fn from_utc(&self, utc: NaiveDateTime) -> NaiveDateTime {
        self.from_utc_datetime(&utc).naive_local()
    }
}

impl Offseter for FixedOffset {
    fn to_utc(&self, local: NaiveDateTime) -> NaiveDateTime {
        local - Duration::seconds(i64::from(self.local_minus_utc()))
    }

    fn from_utc(&self, utc: NaiveDateTime) -> NaiveDateTime {
        utc + Duration::seconds(i64::from(self.local_minus_utc()))
    }
}

impl Offseter for Utc {
    fn to_utc(&self, local: NaiveDateTime) -> NaiveDateTime {
        local
    }

    fn from_utc(&self, utc: NaiveDateTime) -> NaiveDateTime {
        utc
    }
}

/// Looks up a `TZID` parameter value in the time zone database.
pub fn resolve_tzid(name: &str) -> Result<Tz, ParseError> {
    let trimmed = name.trim().trim_matches('"').trim_start_matches('/');
    trimmed
        .parse::<Tz>()
        .map_err(|_| ParseError::new(format!("unknown time zone '{}'", name)))
}

/// Date-only values have no instant and pass through unchanged.
pub fn local_to_utc(zone: &dyn Offseter, value: DateValue) -> DateValue {
    if !value.has_time() {
        return value;
    }
    match value.to_naive_date_time() {
        Some(local) => DateValue::from_naive_date_time(zone.to_utc(local)),
        None => value,
    }
}

pub fn utc_to_local(zone: &dyn Offseter, value: DateValue) -> DateValue {
    if !value.has_time() {
        return value;
    }
    match value.to_naive_date_time() {
        Some(utc) => DateValue::from_naive_date_time(zone.from_utc(utc)),
        None => value,
    }
}
