//! Entry points that turn parsed or textual recurrence lines into iterators.

use tracing::debug;

use crate::compound::{BoxedIterator, CompoundIterator};
use crate::config::Limits;
use crate::error::ParseError;
use crate::iterator::{RDateIterator, RRuleIterator};
use crate::property::{self, RecurRule, RecurrenceLine};
use crate::timezone::{self, SharedZone};
use crate::values::DateValue;

/// Iterates a single rule. `dtstart` is local wall clock time in `zone`.
pub fn create_recurrence_iterator(
    rule: &RecurRule,
    dtstart: DateValue,
    zone: SharedZone,
) -> RRuleIterator {
    create_recurrence_iterator_with_limits(rule, dtstart, zone, Limits::default())
}

pub fn create_recurrence_iterator_with_limits(
    rule: &RecurRule,
    dtstart: DateValue,
    zone: SharedZone,
    limits: Limits,
) -> RRuleIterator {
    RRuleIterator::new(rule, dtstart, zone, limits)
}

/// Combines already parsed lines. Only the instants the lines themselves
/// produce are included; `dtstart` anchors the rules.
pub fn create_compound_iterator(
    lines: &[RecurrenceLine],
    dtstart: DateValue,
    zone: SharedZone,
) -> CompoundIterator {
    create_compound_iterator_with_limits(lines, dtstart, zone, Limits::default())
}

pub fn create_compound_iterator_with_limits(
    lines: &[RecurrenceLine],
    dtstart: DateValue,
    zone: SharedZone,
    limits: Limits,
) -> CompoundIterator {
    let (inclusions, exclusions) = split_lines(lines, dtstart, &zone, limits);
    CompoundIterator::new(inclusions, exclusions)
}

fn split_lines(
    lines: &[RecurrenceLine],
    dtstart: DateValue,
    zone: &SharedZone,
    limits: Limits,
) -> (Vec<BoxedIterator>, Vec<BoxedIterator>) {
    let mut inclusions: Vec<BoxedIterator> = Vec::new();
    let mut exclusions: Vec<BoxedIterator> = Vec::new();

    for line in lines {
        let iter: BoxedIterator = match line {
            RecurrenceLine::Rule(rule) => Box::new(RRuleIterator::new(
                rule,
                dtstart,
                zone.clone(),
                limits,
            )),
            RecurrenceLine::Dates(list) => Box::new(RDateIterator::new(list.dates.clone())),
        };

        if line.is_exclusion() {
            exclusions.push(iter);
        } else {
            inclusions.push(iter);
        }
    }

    (inclusions, exclusions)
}

/// Parses multi-line RRULE, EXRULE, RDATE and EXDATE text and iterates the
/// resulting set. The start itself is always included unless excluded.
///
/// Naive date-times in RDATE and EXDATE lines without a TZID are read in
/// `zone`.
pub fn parse_recurrence_iterator(
    text: &str,
    dtstart: DateValue,
    zone: SharedZone,
) -> Result<CompoundIterator, ParseError> {
    parse_recurrence_iterator_with_limits(text, dtstart, zone, Limits::default())
}

pub fn parse_recurrence_iterator_with_limits(
    text: &str,
    dtstart: DateValue,
    zone: SharedZone,
    limits: Limits,
) -> Result<CompoundIterator, ParseError> {
    let lines = property::parse_content_lines(text, &*zone)?;
    let (mut inclusions, exclusions) = split_lines(&lines, dtstart, &zone, limits);

    let start = timezone::local_to_utc(&*zone, dtstart);
    inclusions.push(Box::new(RDateIterator::new(vec![start])));

    let compound = CompoundIterator::new(inclusions, exclusions);
    debug!(
        dtstart = %dtstart,
        inclusions = compound.inclusion_count(),
        exclusions = compound.exclusion_count(),
        "assembled recurrence set"
    );
    Ok(compound)
}
