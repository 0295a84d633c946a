//! Lazy, forward-only iterators over the instants of a single recurrence
//! line.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::config::Limits;
use crate::filters::{count_condition, until_condition, Condition};
use crate::generators::DtBuilder;
use crate::instances::{Candidates, ChainBuilder};
use crate::property::{EndCondition, RecurRule};
use crate::time_utils;
use crate::timezone::{self, SharedZone};
use crate::values::DateValue;

/// An ascending, duplicate free stream of instants that can skip ahead.
///
/// Date-times are in UTC; date-only values are passed through as dates.
pub trait RecurrenceIterator: Iterator<Item = DateValue> + fmt::Debug {
    /// The next instant, without consuming it.
    fn peek(&mut self) -> Option<DateValue>;

    fn has_next(&mut self) -> bool {
        self.peek().is_some()
    }

    /// Skips every instant before `date`. Skipped instants are never
    /// returned, and the iterator never moves backwards.
    fn advance_to(&mut self, date: DateValue);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Empty,
    Buffered(DateValue),
    Exhausted,
}

/// Expands one RRULE or EXRULE.
pub struct RRuleIterator {
    candidates: Candidates,
    zone: SharedZone,
    date_only: bool,
    dtstart: DateValue,
    until: Option<Box<dyn Condition + Send>>,
    count: Option<Box<dyn Condition + Send>>,
    last: Option<DateValue>,
    state: State,
}

impl fmt::Debug for RRuleIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RRuleIterator")
            .field("dtstart", &self.dtstart)
            .field("last", &self.last)
            .field("state", &self.state)
            .finish()
    }
}

impl RRuleIterator {
    /// `dtstart` is the local wall clock start of the series in `zone`.
    pub fn new(
        rule: &RecurRule,
        dtstart: DateValue,
        zone: SharedZone,
        limits: Limits,
    ) -> RRuleIterator {
        let candidates = ChainBuilder::new(rule, dtstart, limits).build();

        let mut until: Option<Box<dyn Condition + Send>> = None;
        let mut count: Option<Box<dyn Condition + Send>> = None;
        match rule.end_condition {
            EndCondition::Count(n) => count = Some(Box::new(count_condition(n))),
            EndCondition::Until(bound) => until = Some(Box::new(until_condition(bound))),
            EndCondition::UntilUtc(bound) => {
                let local = timezone::utc_to_local(&*zone, bound);
                until = Some(Box::new(until_condition(local)));
            }
            EndCondition::Infinite => {}
        }

        RRuleIterator {
            candidates,
            dtstart: timezone::local_to_utc(&*zone, dtstart),
            zone,
            date_only: !dtstart.has_time(),
            until,
            count,
            last: None,
            state: State::Empty,
        }
    }

    fn produce(&mut self) -> Option<DateValue> {
        loop {
            let builder = self.candidates.next()?;
            let local = if self.date_only {
                builder.to_date()
            } else {
                builder.to_date_time()
            };

            if let Some(until) = &mut self.until {
                if !until.test(local) {
                    return None;
                }
            }

            let value = timezone::local_to_utc(&*self.zone, local);
            if value < self.dtstart || self.last.map_or(false, |last| value <= last) {
                continue;
            }

            if let Some(count) = &mut self.count {
                if !count.test(value) {
                    return None;
                }
            }

            self.candidates.work_done();
            self.last = Some(value);
            return Some(value);
        }
    }

    fn fill(&mut self) {
        if self.state == State::Empty {
            self.state = match self.produce() {
                Some(value) => State::Buffered(value),
                None => {
                    debug!(dtstart = %self.dtstart, "rule exhausted");
                    State::Exhausted
                }
            };
        }
    }
}

impl Iterator for RRuleIterator {
    type Item = DateValue;

    fn next(&mut self) -> Option<DateValue> {
        self.fill();
        match self.state {
            State::Buffered(value) => {
                self.state = State::Empty;
                Some(value)
            }
            _ => None,
        }
    }
}

impl RecurrenceIterator for RRuleIterator {
    fn peek(&mut self) -> Option<DateValue> {
        self.fill();
        match self.state {
            State::Buffered(value) => Some(value),
            _ => None,
        }
    }

    fn advance_to(&mut self, date: DateValue) {
        match self.state {
            State::Exhausted => return,
            State::Buffered(value) if value >= date => return,
            State::Buffered(_) => self.state = State::Empty,
            State::Empty => {}
        }

        // Counted and positional rules must see every candidate.
        if self.count.is_none() && !self.candidates.has_set_pos() {
            let local = timezone::utc_to_local(&*self.zone, date);
            let day_before = time_utils::add_days(local.ymd(), -1);
            self.candidates
                .raise_threshold(DtBuilder::default().with_date(day_before));
        }

        while let Some(value) = self.peek() {
            if value >= date {
                break;
            }
            self.state = State::Empty;
        }
    }
}

/// Iterates an explicit RDATE or EXDATE list.
#[derive(Debug, Clone)]
pub struct RDateIterator {
    dates: Vec<DateValue>,
    index: usize,
}

impl RDateIterator {
    pub fn new(mut dates: Vec<DateValue>) -> RDateIterator {
        dates.sort();
        dates.dedup();
        RDateIterator { dates, index: 0 }
    }
}

impl FromStr for RDateIterator {
    type Err = crate::error::ParseError;

    /// A comma separated list of dates; `Z` suffixes are dropped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dates = s
            .split(',')
            .map(|d| DateValue::from_str(d.trim()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RDateIterator::new(dates))
    }
}

impl Iterator for RDateIterator {
    type Item = DateValue;

    fn next(&mut self) -> Option<DateValue> {
        let value = self.dates.get(self.index).copied();
        if value.is_some() {
            self.index += 1;
        }
        value
    }
}

impl RecurrenceIterator for RDateIterator {
    fn peek(&mut self) -> Option<DateValue> {
        self.dates.get(self.index).copied()
    }

    fn advance_to(&mut self, date: DateValue) {
        while self.dates.get(self.index).map_or(false, |&d| d < date) {
            self.index += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;
    use chrono_tz::America::Los_Angeles;
    use pretty_assertions::assert_eq;

    fn rrule(rule: &str, dtstart: &str, zone: SharedZone) -> RRuleIterator {
        let rule = RecurRule::from_str(rule).unwrap();
        let dtstart = DateValue::from_str(dtstart).unwrap();
        RRuleIterator::new(&rule, dtstart, zone, Limits::default())
    }

    fn render(iter: impl Iterator<Item = DateValue>, n: usize) -> Vec<String> {
        iter.take(n).map(|d| d.to_string()).collect()
    }

    #[test]
    fn converts_to_utc() {
        let iter = rrule(
            "FREQ=DAILY;COUNT=3",
            "20060401T090000",
            Arc::new(Los_Angeles),
        );
        // Daylight saving time starts on April 2nd 2006.
        assert_eq!(
            render(iter, 10),
            vec!["20060401T170000", "20060402T160000", "20060403T160000"]
        );
    }

    #[test]
    fn count_is_exact() {
        let iter = rrule("FREQ=WEEKLY;COUNT=4;BYDAY=TU,TH", "20060411", Arc::new(Utc));
        assert_eq!(
            render(iter, 10),
            vec!["20060411", "20060413", "20060418", "20060420"]
        );
    }

    #[test]
    fn until_utc_is_compared_in_local_time() {
        // 20060413T160000Z is 09:00 in Los Angeles.
        let iter = rrule(
            "FREQ=DAILY;UNTIL=20060413T160000Z",
            "20060411T090000",
            Arc::new(Los_Angeles),
        );
        assert_eq!(
            render(iter, 10),
            vec!["20060411T160000", "20060412T160000", "20060413T160000"]
        );
    }

    #[test]
    fn start_not_matching_rule_is_skipped() {
        let iter = rrule("FREQ=MONTHLY;BYMONTHDAY=1;COUNT=2", "20060413", Arc::new(Utc));
        assert_eq!(render(iter, 10), vec!["20060501", "20060601"]);
    }

    #[test]
    fn has_next_does_not_advance() {
        let mut iter = rrule("FREQ=DAILY;COUNT=2", "20060101", Arc::new(Utc));
        assert!(iter.has_next());
        assert!(iter.has_next());
        assert_eq!(iter.peek(), Some(DateValue::date(2006, 1, 1)));
        assert_eq!(iter.next(), Some(DateValue::date(2006, 1, 1)));
        assert!(iter.has_next());
        assert_eq!(iter.next(), Some(DateValue::date(2006, 1, 2)));
        assert!(!iter.has_next());
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn advance_to_skips_ahead() {
        let mut iter = rrule("FREQ=DAILY;INTERVAL=2", "20060101", Arc::new(Utc));
        iter.advance_to(DateValue::date(2106, 1, 1));
        // 36524 days separate the two dates.
        assert_eq!(render(iter, 2), vec!["21060101", "21060103"]);
    }

    #[test]
    fn advance_to_consumes_count() {
        let mut iter = rrule("FREQ=DAILY;COUNT=5", "20060101", Arc::new(Utc));
        iter.advance_to(DateValue::date(2006, 1, 4));
        assert_eq!(render(iter, 10), vec!["20060104", "20060105"]);
    }

    #[test]
    fn advance_to_never_goes_backwards() {
        let mut iter = rrule("FREQ=DAILY", "20060101", Arc::new(Utc));
        iter.advance_to(DateValue::date(2006, 3, 1));
        iter.advance_to(DateValue::date(2006, 1, 1));
        assert_eq!(iter.next(), Some(DateValue::date(2006, 3, 1)));
    }

    #[test]
    fn rdates_sorted_and_deduplicated() {
        let mut iter = RDateIterator::from_str("20060418,20060412,20060418,20060101").unwrap();
        assert_eq!(iter.peek(), Some(DateValue::date(2006, 1, 1)));
        iter.advance_to(DateValue::date(2006, 4, 13));
        assert_eq!(render(iter, 10), vec!["20060418"]);
    }
}
