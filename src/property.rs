//! The recurrence properties: RRULE, EXRULE, RDATE and EXDATE.

use std::fmt;
use std::str::FromStr;

use chrono::Weekday;
use chrono_tz::Tz;
use itertools::Itertools;
use tracing::debug;

use crate::error::{parse_bail, InProduction, ParseError};
use crate::parameters::{Parameter, ParameterSchema, ParameterSet, ValueType};
use crate::parser::{self, ContentLine};
use crate::timezone::{self, Offseter};
use crate::values::{
    parse_date_text, parse_duration, weekday_from_ical, weekday_to_ical, DateValue, PeriodValue,
    WeekdayNum,
};
use crate::vcal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Frequency {
    Secondly,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Secondly => "SECONDLY",
            Frequency::Minutely => "MINUTELY",
            Frequency::Hourly => "HOURLY",
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        }
    }
}

impl FromStr for Frequency {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match &s.to_ascii_uppercase() as &str {
            "SECONDLY" => Frequency::Secondly,
            "MINUTELY" => Frequency::Minutely,
            "HOURLY" => Frequency::Hourly,
            "DAILY" => Frequency::Daily,
            "WEEKLY" => Frequency::Weekly,
            "MONTHLY" => Frequency::Monthly,
            "YEARLY" => Frequency::Yearly,
            _ => parse_bail!("invalid frequency '{}'", s),
        })
    }
}

/// When a rule stops producing instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndCondition {
    Count(u32),
    /// A bound in the rule's local time.
    Until(DateValue),
    /// A bound written with the `Z` suffix.
    UntilUtc(DateValue),
    Infinite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    RRule,
    ExRule,
}

impl RuleKind {
    pub fn name(self) -> &'static str {
        match self {
            RuleKind::RRule => "RRULE",
            RuleKind::ExRule => "EXRULE",
        }
    }
}

/// A parsed `recur` value together with the property it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurRule {
    pub kind: RuleKind,
    pub frequency: Frequency,
    /// Unset unless the rule carries `WKST`; Monday applies by default.
    pub week_start: Option<Weekday>,
    pub end_condition: EndCondition,
    pub interval: u32,
    pub by_day: Vec<WeekdayNum>,
    pub by_month: Vec<u32>,
    pub by_month_day: Vec<i32>,
    pub by_week_number: Vec<i32>,
    pub by_year_day: Vec<i32>,
    pub by_hour: Vec<u32>,
    pub by_minute: Vec<u32>,
    pub by_second: Vec<u32>,
    pub by_set_pos: Vec<i32>,
    /// `X-` parameters on the content line.
    pub parameters: ParameterSet,
}

impl RecurRule {
    pub fn new(frequency: Frequency) -> RecurRule {
        RecurRule {
            kind: RuleKind::RRule,
            frequency,
            week_start: None,
            end_condition: EndCondition::Infinite,
            interval: 1,
            by_day: Vec::new(),
            by_month: Vec::new(),
            by_month_day: Vec::new(),
            by_week_number: Vec::new(),
            by_year_day: Vec::new(),
            by_hour: Vec::new(),
            by_minute: Vec::new(),
            by_second: Vec::new(),
            by_set_pos: Vec::new(),
            parameters: ParameterSet::default(),
        }
    }

    pub fn week_start_or_default(&self) -> Weekday {
        self.week_start.unwrap_or(Weekday::Mon)
    }

    /// Parses an RRULE or EXRULE content line.
    pub fn from_content_line(line: ContentLine) -> Result<RecurRule, ParseError> {
        let kind = match &line.name.to_ascii_uppercase() as &str {
            "RRULE" => RuleKind::RRule,
            "EXRULE" => RuleKind::ExRule,
            _ => parse_bail!("'{}' is not a recurrence rule", line.name),
        };

        let parameters = ParameterSet::parse(line.parameters, ParameterSchema::Rule)?;
        let mut rule = RecurRule::from_str(&line.value)?;
        rule.kind = kind;
        rule.parameters = parameters;

        Ok(rule)
    }

    /// The `recur` value in canonical part order.
    pub fn body(&self) -> String {
        let mut parts = vec![format!("FREQ={}", self.frequency.as_str())];

        if let Some(week_start) = self.week_start {
            parts.push(format!("WKST={}", weekday_to_ical(week_start)));
        }

        match self.end_condition {
            EndCondition::Until(until) => parts.push(format!("UNTIL={}", until)),
            EndCondition::UntilUtc(until) => parts.push(format!("UNTIL={}Z", until)),
            EndCondition::Count(count) => parts.push(format!("COUNT={}", count)),
            EndCondition::Infinite => {}
        }

        if self.interval != 1 {
            parts.push(format!("INTERVAL={}", self.interval));
        }

        fn push_list<T: fmt::Display>(parts: &mut Vec<String>, name: &str, values: &[T]) {
            if !values.is_empty() {
                parts.push(format!("{}={}", name, values.iter().join(",")));
            }
        }

        push_list(&mut parts, "BYYEARDAY", &self.by_year_day);
        push_list(&mut parts, "BYMONTH", &self.by_month);
        push_list(&mut parts, "BYMONTHDAY", &self.by_month_day);
        push_list(&mut parts, "BYWEEKNO", &self.by_week_number);
        push_list(&mut parts, "BYDAY", &self.by_day);
        push_list(&mut parts, "BYHOUR", &self.by_hour);
        push_list(&mut parts, "BYMINUTE", &self.by_minute);
        push_list(&mut parts, "BYSECOND", &self.by_second);
        push_list(&mut parts, "BYSETPOS", &self.by_set_pos);

        parts.join(";")
    }

    pub fn to_ical(&self) -> String {
        ContentLine {
            name: self.kind.name().to_string(),
            parameters: self.parameters.to_parser_parameters(),
            value: self.body(),
        }
        .as_string()
    }
}

/// One `KEY=VALUE` part of a `recur` value.
#[derive(Debug, Clone, PartialEq)]
enum RecurPart {
    Freq(Frequency),
    Until(EndCondition),
    Count(u32),
    Interval(u32),
    WeekStart(Weekday),
    ByDay(Vec<WeekdayNum>),
    ByMonth(Vec<u32>),
    ByMonthDay(Vec<i32>),
    ByWeekNo(Vec<i32>),
    ByYearDay(Vec<i32>),
    ByHour(Vec<u32>),
    ByMinute(Vec<u32>),
    BySecond(Vec<u32>),
    BySetPos(Vec<i32>),
    Extension(String),
}

/// Parses a comma separated list of integers whose absolute values must lie
/// in `min..=max`. Negative values are only accepted when `signed` is set.
fn int_list(value: &str, min: i32, max: i32, signed: bool) -> Result<Vec<i32>, ParseError> {
    value
        .split(',')
        .map(|item| {
            let n = item
                .trim()
                .parse::<i32>()
                .map_err(|_| ParseError::new(format!("'{}' is not a number", item)))?;
            let in_range = n.checked_abs().map_or(false, |abs| (min..=max).contains(&abs));
            if (n < 0 && !signed) || !in_range {
                parse_bail!("'{}' is out of range", item);
            }
            Ok(n)
        })
        .collect()
}

fn unsigned_list(value: &str, min: i32, max: i32) -> Result<Vec<u32>, ParseError> {
    Ok(int_list(value, min, max, false)?
        .into_iter()
        .map(|n| n as u32)
        .collect())
}

fn positive_int(value: &str) -> Result<u32, ParseError> {
    match value.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => parse_bail!("'{}' is not a positive integer", value),
    }
}

impl FromStr for RecurPart {
    type Err = ParseError;

    fn from_str(part: &str) -> Result<Self, Self::Err> {
        let split_pos = match part.find('=') {
            Some(pos) => pos,
            None => parse_bail!("rule part '{}' has no value", part),
        };
        let (name, tail) = part.split_at(split_pos);
        let value = &tail[1..];
        let name = name.trim().to_ascii_uppercase();

        let parsed = match &name as &str {
            "FREQ" => value.parse().map(RecurPart::Freq),
            "UNTIL" => parse_date_text(value).map(|(date, utc)| {
                RecurPart::Until(if utc {
                    EndCondition::UntilUtc(date)
                } else {
                    EndCondition::Until(date)
                })
            }),
            "COUNT" => positive_int(value).map(RecurPart::Count),
            "INTERVAL" => positive_int(value).map(RecurPart::Interval),
            "WKST" => weekday_from_ical(value.trim())
                .map(RecurPart::WeekStart)
                .ok_or_else(|| ParseError::new(format!("invalid weekday '{}'", value))),
            "BYDAY" => value
                .split(',')
                .map(WeekdayNum::from_str)
                .collect::<Result<Vec<_>, _>>()
                .map(RecurPart::ByDay),
            "BYMONTH" => unsigned_list(value, 1, 12).map(RecurPart::ByMonth),
            "BYMONTHDAY" => int_list(value, 1, 31, true).map(RecurPart::ByMonthDay),
            "BYWEEKNO" => int_list(value, 1, 53, true).map(RecurPart::ByWeekNo),
            "BYYEARDAY" => int_list(value, 1, 366, true).map(RecurPart::ByYearDay),
            "BYHOUR" => unsigned_list(value, 0, 23).map(RecurPart::ByHour),
            "BYMINUTE" => unsigned_list(value, 0, 59).map(RecurPart::ByMinute),
            "BYSECOND" => unsigned_list(value, 0, 60).map(RecurPart::BySecond),
            "BYSETPOS" => int_list(value, 1, 366, true).map(RecurPart::BySetPos),
            _ if name.starts_with("X-") => Ok(RecurPart::Extension(name.clone())),
            _ => Err(ParseError::new(format!("unknown rule part '{}'", part))),
        };

        parsed.in_production(&name)
    }
}

impl FromStr for RecurRule {
    type Err = ParseError;

    /// Parses a bare `recur` value such as `FREQ=DAILY;COUNT=5`.
    fn from_str(rule_value_string: &str) -> Result<Self, Self::Err> {
        parse_recur(rule_value_string).in_production("recur")
    }
}

fn parse_recur(rule_value_string: &str) -> Result<RecurRule, ParseError> {
    let mut frequency = None;
    let mut rule = RecurRule::new(Frequency::Yearly);
    let mut has_until = false;
    let mut has_count = false;
    let mut seen = Vec::new();

    for part in rule_value_string.split(';') {
        if part.trim().is_empty() {
            continue;
        }

        let part = part.parse::<RecurPart>()?;
        if let RecurPart::Extension(name) = &part {
            debug!(part = %name, "ignoring extension rule part");
            continue;
        }

        let discriminant = std::mem::discriminant(&part);
        if seen.contains(&discriminant) {
            parse_bail!("duplicate rule part in '{}'", rule_value_string);
        }
        seen.push(discriminant);

        match part {
            RecurPart::Freq(f) => frequency = Some(f),
            RecurPart::Until(end) => {
                has_until = true;
                rule.end_condition = end;
            }
            RecurPart::Count(count) => {
                has_count = true;
                rule.end_condition = EndCondition::Count(count);
            }
            RecurPart::Interval(interval) => rule.interval = interval,
            RecurPart::WeekStart(day) => rule.week_start = Some(day),
            RecurPart::ByDay(v) => rule.by_day = v,
            RecurPart::ByMonth(v) => rule.by_month = v,
            RecurPart::ByMonthDay(v) => rule.by_month_day = v,
            RecurPart::ByWeekNo(v) => rule.by_week_number = v,
            RecurPart::ByYearDay(v) => rule.by_year_day = v,
            RecurPart::ByHour(v) => rule.by_hour = v,
            RecurPart::ByMinute(v) => rule.by_minute = v,
            RecurPart::BySecond(v) => rule.by_second = v,
            RecurPart::BySetPos(v) => rule.by_set_pos = v,
            RecurPart::Extension(_) => {}
        }
    }

    if has_until && has_count {
        parse_bail!("UNTIL and COUNT are mutually exclusive");
    }

    match frequency {
        Some(frequency) => {
            rule.frequency = frequency;
            Ok(rule)
        }
        None => parse_bail!("missing FREQ in '{}'", rule_value_string),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateListKind {
    RDate,
    ExDate,
}

impl DateListKind {
    pub fn name(self) -> &'static str {
        match self {
            DateListKind::RDate => "RDATE",
            DateListKind::ExDate => "EXDATE",
        }
    }
}

/// An explicit list of instants from an RDATE or EXDATE line.
///
/// Date-times are stored in UTC. Date-only values are kept as dates.
#[derive(Debug, Clone, PartialEq)]
pub struct RDateList {
    pub kind: DateListKind,
    pub value_type: ValueType,
    /// The zone naive values were read in, if the line named one.
    pub tzid: Option<Tz>,
    pub dates: Vec<DateValue>,
    /// Set when `value_type` is [`ValueType::Period`]; `dates` then holds
    /// the period starts.
    pub periods: Vec<PeriodValue>,
    pub parameters: ParameterSet,
}

impl RDateList {
    /// Parses an RDATE or EXDATE line. Naive date-times without a TZID are
    /// read in `fallback`.
    pub fn from_content_line(
        line: ContentLine,
        fallback: &dyn Offseter,
    ) -> Result<RDateList, ParseError> {
        let kind = match &line.name.to_ascii_uppercase() as &str {
            "RDATE" => DateListKind::RDate,
            "EXDATE" => DateListKind::ExDate,
            _ => parse_bail!("'{}' is not a date list", line.name),
        };

        let parameters = ParameterSet::parse(line.parameters, ParameterSchema::DateList)?;
        let tzid = match parameters.get_tzid() {
            Some(name) => Some(timezone::resolve_tzid(name).in_production("TZID")?),
            None => None,
        };
        let zone: &dyn Offseter = match &tzid {
            Some(tz) => tz,
            None => fallback,
        };

        let declared = parameters.get_value_data_type();
        let mut dates = Vec::new();
        let mut periods = Vec::new();
        let mut saw_time = false;

        for item in line.value.split(',') {
            let item = item.trim();
            if item.is_empty() {
                parse_bail!("empty value in '{}'", line.value);
            }

            if declared == Some(ValueType::Period) {
                let period = parse_period(item, zone)?;
                saw_time |= period.start().has_time();
                dates.push(period.start());
                periods.push(period);
                continue;
            }

            let value = parse_instant(item, zone)?;
            match declared {
                Some(ValueType::Date) if value.has_time() => {
                    parse_bail!("'{}' is not a DATE", item)
                }
                Some(ValueType::DateTime) if !value.has_time() => {
                    parse_bail!("'{}' is not a DATE-TIME", item)
                }
                _ => {}
            }
            saw_time |= value.has_time();
            dates.push(value);
        }

        let value_type = match declared {
            Some(value_type) => value_type,
            None if saw_time => ValueType::DateTime,
            None => ValueType::Date,
        };

        Ok(RDateList {
            kind,
            value_type,
            tzid,
            dates,
            periods,
            parameters,
        })
    }

    pub fn to_ical(&self) -> String {
        let render = |value: DateValue| -> String {
            match (value.has_time(), &self.tzid) {
                (false, _) => value.to_string(),
                (true, Some(tz)) => timezone::utc_to_local(tz, value).to_string(),
                (true, None) => format!("{}Z", value),
            }
        };

        let value = if self.periods.is_empty() {
            self.dates.iter().map(|d| render(*d)).join(",")
        } else {
            self.periods
                .iter()
                .map(|p| format!("{}/{}", render(p.start()), render(p.end())))
                .join(",")
        };

        let mut parameters = self.parameters.clone();
        if parameters.get_value_data_type().is_none() && self.value_type != ValueType::DateTime {
            parameters.push(Parameter::ValueDataType(self.value_type));
        }

        ContentLine {
            name: self.kind.name().to_string(),
            parameters: parameters.to_parser_parameters(),
            value,
        }
        .as_string()
    }
}

/// A date or date-time, converted to UTC unless it is a date or already UTC.
fn parse_instant(text: &str, zone: &dyn Offseter) -> Result<DateValue, ParseError> {
    let (value, utc) = parse_date_text(text)?;
    if utc {
        Ok(value)
    } else {
        Ok(timezone::local_to_utc(zone, value))
    }
}

fn parse_period(text: &str, zone: &dyn Offseter) -> Result<PeriodValue, ParseError> {
    let (start, end) = match text.find('/') {
        Some(pos) => (&text[..pos], &text[pos + 1..]),
        None => parse_bail!("period '{}' has no end", text),
    };

    let start = parse_instant(start, zone)?;
    let period = if end.starts_with(&['P', 'p', '+', '-'] as &[_]) {
        PeriodValue::with_duration(start, parse_duration(end)?)
    } else {
        PeriodValue::new(start, parse_instant(end, zone)?)
    };

    period.map_err(|e| ParseError::new(format!("invalid period '{}': {}", text, e)))
}

/// One recurrence property.
#[derive(Debug, Clone, PartialEq)]
pub enum RecurrenceLine {
    Rule(RecurRule),
    Dates(RDateList),
}

impl RecurrenceLine {
    pub fn is_exclusion(&self) -> bool {
        match self {
            RecurrenceLine::Rule(rule) => rule.kind == RuleKind::ExRule,
            RecurrenceLine::Dates(list) => list.kind == DateListKind::ExDate,
        }
    }

    pub fn to_ical(&self) -> String {
        match self {
            RecurrenceLine::Rule(rule) => rule.to_ical(),
            RecurrenceLine::Dates(list) => list.to_ical(),
        }
    }
}

/// Parses a single line, rewriting legacy vCalendar syntax first.
pub fn parse_recurrence_line(
    text: &str,
    fallback: &dyn Offseter,
) -> Result<RecurrenceLine, ParseError> {
    let text = vcal::rewrite(text);
    let line = ContentLine::parse(&text)?;
    let name = line.name.to_ascii_uppercase();

    let parsed = match &name as &str {
        "RRULE" | "EXRULE" => RecurRule::from_content_line(line).map(RecurrenceLine::Rule),
        "RDATE" | "EXDATE" => {
            RDateList::from_content_line(line, fallback).map(RecurrenceLine::Dates)
        }
        _ => Err(ParseError::new(format!("unknown property '{}'", line.name))),
    };

    parsed.in_production(&name)
}

/// Parses multi-line rule text. Folded lines are joined and blank lines are
/// skipped.
pub fn parse_content_lines(
    text: &str,
    fallback: &dyn Offseter,
) -> Result<Vec<RecurrenceLine>, ParseError> {
    parser::unfold_lines(text)
        .iter()
        .map(|line| parse_recurrence_line(line, fallback))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    macro_rules! add_rrule_test {
        ($name:ident; parse $string:expr => $expected:expr) => {
            #[test]
            fn $name() {
                let rule = RecurRule::from_str($string).unwrap();
                assert_eq!(rule, $expected);
            }
        };

        ($name:ident; render $string:expr => $expected:expr) => {
            #[test]
            fn $name() {
                let line = parse_recurrence_line($string, &Utc).unwrap();
                assert_eq!(line.to_ical(), $expected);
            }
        };

        ($name:ident; error $string:expr => $productions:expr) => {
            #[test]
            fn $name() {
                let err = parse_recurrence_line($string, &Utc).unwrap_err();
                let expected: Vec<&str> = $productions.to_vec();
                assert_eq!(err.productions, expected);
            }
        };
    }

    fn rule_with(frequency: Frequency, f: impl FnOnce(&mut RecurRule)) -> RecurRule {
        let mut rule = RecurRule::new(frequency);
        f(&mut rule);
        rule
    }

    add_rrule_test!(parse_weekly_byday;
        parse "FREQ=WEEKLY;BYDAY=MO,WE,FR;UNTIL=20061231T235959Z" =>
        rule_with(Frequency::Weekly, |r| {
            r.by_day = vec![
                WeekdayNum::every(Weekday::Mon),
                WeekdayNum::every(Weekday::Wed),
                WeekdayNum::every(Weekday::Fri),
            ];
            r.end_condition = EndCondition::UntilUtc(DateValue::date_time(2006, 12, 31, 23, 59, 59));
        }));

    add_rrule_test!(parse_lower_case_and_negative_lists;
        parse "freq=monthly;bymonthday=-1,15;byday=-1su;wkst=su;count=4" =>
        rule_with(Frequency::Monthly, |r| {
            r.by_month_day = vec![-1, 15];
            r.by_day = vec![WeekdayNum::new(-1, Weekday::Sun).unwrap()];
            r.week_start = Some(Weekday::Sun);
            r.end_condition = EndCondition::Count(4);
        }));

    add_rrule_test!(parse_ignores_extension_parts;
        parse "FREQ=DAILY;X-NAME=foo;INTERVAL=3;UNTIL=20060501" =>
        rule_with(Frequency::Daily, |r| {
            r.interval = 3;
            r.end_condition = EndCondition::Until(DateValue::date(2006, 5, 1));
        }));

    add_rrule_test!(render_canonical_order;
        render "RRULE:BYSETPOS=-1;BYDAY=MO,TU;INTERVAL=2;FREQ=MONTHLY;COUNT=3;BYHOUR=9,17" =>
        "RRULE:FREQ=MONTHLY;COUNT=3;INTERVAL=2;BYDAY=MO,TU;BYHOUR=9,17;BYSETPOS=-1");

    add_rrule_test!(render_week_start_after_freq;
        render "EXRULE:FREQ=YEARLY;BYWEEKNO=20;BYDAY=MO;WKST=SU;BYYEARDAY=1,-1;BYMONTH=5" =>
        "EXRULE:FREQ=YEARLY;WKST=SU;BYYEARDAY=1,-1;BYMONTH=5;BYWEEKNO=20;BYDAY=MO");

    add_rrule_test!(render_keeps_extension_params;
        render "RRULE;X-SOURCE=import:FREQ=DAILY;INTERVAL=1;UNTIL=20060101T000000Z" =>
        "RRULE;X-SOURCE=import:FREQ=DAILY;UNTIL=20060101T000000Z");

    add_rrule_test!(render_rdate_in_zone;
        render "RDATE;TZID=America/New_York:20060417T090000,20060418T090000" =>
        "RDATE;TZID=America/New_York:20060417T090000,20060418T090000");

    add_rrule_test!(render_exdate_dates;
        render "EXDATE;VALUE=DATE:20060416" =>
        "EXDATE;VALUE=DATE:20060416");

    add_rrule_test!(render_vcal_rewrite;
        render "W1 MO TH #4" =>
        "RRULE:FREQ=WEEKLY;COUNT=4;BYDAY=MO,TH");

    add_rrule_test!(error_missing_freq;
        error "RRULE:INTERVAL=2" => ["RRULE", "recur"]);

    add_rrule_test!(error_until_and_count;
        error "RRULE:FREQ=DAILY;COUNT=2;UNTIL=20060101" => ["RRULE", "recur"]);

    add_rrule_test!(error_month_day_out_of_range;
        error "RRULE:FREQ=MONTHLY;BYMONTHDAY=1,32" => ["RRULE", "recur", "BYMONTHDAY"]);

    add_rrule_test!(error_month_day_at_integer_minimum;
        error "RRULE:FREQ=MONTHLY;BYMONTHDAY=-2147483648" => ["RRULE", "recur", "BYMONTHDAY"]);

    add_rrule_test!(error_set_pos_past_integer_range;
        error "RRULE:FREQ=MONTHLY;BYDAY=MO;BYSETPOS=-2147483649" => ["RRULE", "recur", "BYSETPOS"]);

    add_rrule_test!(error_period_past_the_calendar;
        error "RDATE;VALUE=PERIOD:20060101/P99999999D" => ["RDATE"]);

    add_rrule_test!(error_negative_hour;
        error "RRULE:FREQ=DAILY;BYHOUR=-1" => ["RRULE", "recur", "BYHOUR"]);

    add_rrule_test!(error_unknown_part;
        error "RRULE:FREQ=DAILY;BYFOO=1" => ["RRULE", "recur", "BYFOO"]);

    add_rrule_test!(error_unknown_parameter;
        error "RRULE;CN=x:FREQ=DAILY" => ["RRULE", "CN"]);

    add_rrule_test!(error_duplicate_parameter;
        error "RDATE;X-A=1;x-a=2:20060101" => ["RDATE"]);

    add_rrule_test!(error_unknown_tzid;
        error "RDATE;TZID=Nowhere/Land:20060101T090000" => ["RDATE", "TZID"]);

    add_rrule_test!(error_unknown_property;
        error "DTSTART:20060101" => ["DTSTART"]);

    #[test]
    fn rdates_are_normalised_to_utc() {
        let line =
            parse_recurrence_line("RDATE;TZID=America/New_York:20060417T090000,20060418", &Utc)
                .unwrap();

        match line {
            RecurrenceLine::Dates(list) => {
                assert_eq!(list.kind, DateListKind::RDate);
                assert_eq!(list.value_type, ValueType::DateTime);
                assert_eq!(
                    list.dates,
                    vec![
                        DateValue::date_time(2006, 4, 17, 13, 0, 0),
                        DateValue::date(2006, 4, 18),
                    ]
                );
            }
            other => panic!("unexpected line {:?}", other),
        }
    }

    #[test]
    fn periods_use_their_start() {
        let line = parse_recurrence_line(
            "RDATE;VALUE=PERIOD:19970101T180000Z/19970102T070000Z,19970308T160000Z/PT8H30M",
            &Utc,
        )
        .unwrap();

        match line {
            RecurrenceLine::Dates(list) => {
                assert_eq!(
                    list.dates,
                    vec![
                        DateValue::date_time(1997, 1, 1, 18, 0, 0),
                        DateValue::date_time(1997, 3, 8, 16, 0, 0),
                    ]
                );
                assert_eq!(
                    list.periods[1].end(),
                    DateValue::date_time(1997, 3, 9, 0, 30, 0)
                );
            }
            other => panic!("unexpected line {:?}", other),
        }
    }

    #[test]
    fn mismatched_value_type_is_rejected() {
        assert!(parse_recurrence_line("EXDATE;VALUE=DATE:20060416T090000", &Utc).is_err());
        assert!(parse_recurrence_line("EXDATE;VALUE=DATE-TIME:20060416", &Utc).is_err());
    }

    #[test]
    fn multi_line_text_tolerates_blank_lines_and_folds() {
        let text = "\nRRULE:FREQ=WEEKLY;\n BYDAY=MO\n\nEXDATE:20060417\n";
        let lines = parse_content_lines(text, &Utc).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(!lines[0].is_exclusion());
        assert!(lines[1].is_exclusion());
    }

    #[test]
    fn rule_round_trip() {
        let text = "RRULE:FREQ=YEARLY;UNTIL=20101231;INTERVAL=2;BYMONTH=1,2;BYDAY=1SU,-1SA;BYSETPOS=1,-1";
        let line = parse_recurrence_line(text, &Utc).unwrap();
        assert_eq!(line.to_ical(), text);
        assert_eq!(parse_recurrence_line(&line.to_ical(), &Utc).unwrap(), line);
    }
}
