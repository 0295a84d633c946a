//! Drives a chain of field generators to produce the local candidates of a
//! rule in chronological order, and applies BYSETPOS over whole periods.

use std::collections::VecDeque;

use chrono::Weekday;
use tracing::debug;

use crate::config::Limits;
use crate::filters::{week_interval_filter, ByFilter, DateFilter};
use crate::generators::{
    by_day_generator, by_hour_generator, by_minute_generator, by_month_day_generator,
    by_month_generator, by_second_generator, by_week_no_generator, by_year_day_generator,
    serial_day_generator, serial_hour_generator, serial_minute_generator,
    serial_month_generator, serial_second_generator, serial_year_generator, DtBuilder, Field,
    Generator,
};
use crate::property::{Frequency, RecurRule};
use crate::time_utils;
use crate::values::DateValue;

/// The field whose period a frequency steps through.
fn frequency_field(frequency: Frequency) -> Field {
    match frequency {
        Frequency::Yearly => Field::Year,
        Frequency::Monthly => Field::Month,
        Frequency::Weekly | Frequency::Daily => Field::Day,
        Frequency::Hourly => Field::Hour,
        Frequency::Minutely => Field::Minute,
        Frequency::Secondly => Field::Second,
    }
}

/// The first instant of the FREQ period containing `b`.
pub fn period_start(b: DtBuilder, frequency: Frequency, week_start: Weekday) -> DtBuilder {
    let truncated = b.truncate(frequency_field(frequency));
    if frequency == Frequency::Weekly {
        truncated.with_date(time_utils::start_of_week(truncated.ymd(), week_start))
    } else {
        truncated
    }
}

/// Produces every candidate of a rule at or after a threshold, ascending.
///
/// The generators form a cascade, coarsest first. Each successful step
/// descends to the next finer field, each exhausted field returns control to
/// its parent, and a candidate is complete once the seconds are set.
#[derive(Debug)]
pub struct InstanceGenerator {
    generators: Vec<Box<dyn Generator + Send>>,
    filters: Vec<Box<dyn DateFilter + Send>>,
    builder: DtBuilder,
    threshold: DtBuilder,
    primed: bool,
    exhausted: bool,
    years_without_instance: u32,
    limits: Limits,
}

impl InstanceGenerator {
    fn new(
        generators: Vec<Box<dyn Generator + Send>>,
        filters: Vec<Box<dyn DateFilter + Send>>,
        threshold: DtBuilder,
        limits: Limits,
    ) -> InstanceGenerator {
        InstanceGenerator {
            generators,
            filters,
            builder: DtBuilder::default(),
            threshold,
            primed: false,
            exhausted: false,
            years_without_instance: 0,
            limits,
        }
    }

    /// Candidates before `threshold` are skipped without being produced.
    /// The threshold never moves backwards.
    pub fn raise_threshold(&mut self, threshold: DtBuilder) {
        if threshold > self.threshold {
            self.threshold = threshold;
        }
    }

    /// Called when an instance has been emitted, resetting the count of
    /// unproductive years.
    pub fn work_done(&mut self) {
        self.years_without_instance = 0;
    }

    pub fn next_candidate(&mut self) -> Option<DtBuilder> {
        if self.exhausted {
            return None;
        }

        let finest = self.generators.len() - 1;
        let mut level = if self.primed { finest } else { 0 };
        self.primed = true;

        loop {
            if !self.generators[level].generate(&mut self.builder) {
                if level == 0 {
                    self.exhausted = true;
                    return None;
                }
                level -= 1;
                continue;
            }

            let field = self.generators[level].field();

            if field == Field::Year && self.builder.year >= self.threshold.year {
                self.years_without_instance += 1;
                if self.years_without_instance > self.limits.max_years_between_instances {
                    debug!(
                        year = self.builder.year,
                        limit = self.limits.max_years_between_instances,
                        "no instance found, giving up"
                    );
                    self.exhausted = true;
                    return None;
                }
            }

            if self.builder.truncate(field) < self.threshold.truncate(field) {
                continue;
            }

            let builder = &self.builder;
            if !self
                .filters
                .iter()
                .filter(|f| f.field() == field)
                .all(|f| f.accepts(builder))
            {
                continue;
            }

            if level == finest {
                return Some(self.builder);
            }
            level += 1;
        }
    }
}

/// The generator chain for one rule and start.
pub struct ChainBuilder<'a> {
    rule: &'a RecurRule,
    start: DtBuilder,
    date_only: bool,
    limits: Limits,
}

impl<'a> ChainBuilder<'a> {
    pub fn new(rule: &'a RecurRule, dtstart: DateValue, limits: Limits) -> ChainBuilder<'a> {
        ChainBuilder {
            rule,
            start: DtBuilder::from_value(dtstart),
            date_only: !dtstart.has_time(),
            limits,
        }
    }

    /// Builds the candidate stream. With BYSETPOS the cascade starts at the
    /// beginning of the FREQ period holding the start, so that positions are
    /// counted over whole periods.
    pub fn build(self) -> Candidates {
        let rule = self.rule;
        let frequency = rule.frequency;
        let week_start = rule.week_start_or_default();
        let interval = rule.interval;
        let start = self.start;

        let set_pos = !rule.by_set_pos.is_empty();
        let threshold = if set_pos {
            period_start(start, frequency, week_start)
        } else {
            start
        };

        let mut filters: Vec<Box<dyn DateFilter + Send>> = Vec::new();

        let interval_if = |f: Frequency| if frequency == f { interval } else { 1 };

        let year: Box<dyn Generator + Send> = Box::new(serial_year_generator(
            interval_if(Frequency::Yearly),
            threshold,
            self.limits.max_year,
        ));

        // Day level selection. BY-lists not used to generate become filters.
        let mut by_month_used = false;
        let mut by_month_day_used = false;
        let mut by_year_day_used = false;
        let mut by_week_no_used = false;
        let mut by_day_used = false;
        let mut default_month: Option<Vec<u32>> = None;

        let day: Box<dyn Generator + Send> = match frequency {
            Frequency::Yearly | Frequency::Monthly => {
                if frequency == Frequency::Yearly && !rule.by_year_day.is_empty() {
                    by_year_day_used = true;
                    Box::new(by_year_day_generator(&rule.by_year_day))
                } else if !rule.by_month_day.is_empty() {
                    by_month_day_used = true;
                    Box::new(by_month_day_generator(&rule.by_month_day))
                } else if frequency == Frequency::Yearly && !rule.by_week_number.is_empty() {
                    by_week_no_used = true;
                    Box::new(by_week_no_generator(&rule.by_week_number, week_start))
                } else if !rule.by_day.is_empty() {
                    by_day_used = true;
                    let in_year = frequency == Frequency::Yearly && rule.by_month.is_empty();
                    Box::new(by_day_generator(&rule.by_day, in_year))
                } else {
                    if frequency == Frequency::Yearly && rule.by_month.is_empty() {
                        default_month = Some(vec![start.month]);
                    }
                    Box::new(by_month_day_generator(&[start.day as i32]))
                }
            }
            Frequency::Weekly => {
                if !rule.by_day.is_empty() {
                    by_day_used = true;
                    if interval > 1 {
                        filters.push(Box::new(week_interval_filter(
                            interval,
                            week_start,
                            start.to_date(),
                        )));
                    }
                    Box::new(by_day_generator(&rule.by_day, false))
                } else {
                    Box::new(serial_day_generator(interval.saturating_mul(7), start))
                }
            }
            Frequency::Daily => Box::new(serial_day_generator(interval, start)),
            Frequency::Hourly | Frequency::Minutely | Frequency::Secondly => {
                Box::new(serial_day_generator(1, start))
            }
        };

        let month: Box<dyn Generator + Send> = if let Some(months) = &default_month {
            Box::new(by_month_generator(months))
        } else if !rule.by_month.is_empty()
            && !(frequency == Frequency::Monthly && interval > 1)
        {
            by_month_used = true;
            Box::new(by_month_generator(&rule.by_month))
        } else {
            Box::new(serial_month_generator(interval_if(Frequency::Monthly), threshold))
        };

        if !rule.by_month.is_empty() && !by_month_used {
            filters.push(Box::new(ByFilter::Month(rule.by_month.clone())));
        }
        if !rule.by_month_day.is_empty() && !by_month_day_used {
            filters.push(Box::new(ByFilter::MonthDay(rule.by_month_day.clone())));
        }
        if !rule.by_year_day.is_empty() && !by_year_day_used {
            filters.push(Box::new(ByFilter::YearDay(rule.by_year_day.clone())));
        }
        if !rule.by_week_number.is_empty() && !by_week_no_used {
            filters.push(Box::new(ByFilter::WeekNo {
                weeks: rule.by_week_number.clone(),
                week_start,
            }));
        }
        if !rule.by_day.is_empty() && !by_day_used {
            let in_year = frequency == Frequency::Yearly && rule.by_month.is_empty();
            filters.push(Box::new(ByFilter::Day {
                days: rule.by_day.clone(),
                in_year,
            }));
        }

        let (hour, minute, second) = if self.date_only {
            (
                Box::new(by_hour_generator(&[0])) as Box<dyn Generator + Send>,
                Box::new(by_minute_generator(&[0])) as Box<dyn Generator + Send>,
                Box::new(by_second_generator(&[0])) as Box<dyn Generator + Send>,
            )
        } else {
            (
                self.time_generator(Field::Hour, &mut filters),
                self.time_generator(Field::Minute, &mut filters),
                self.time_generator(Field::Second, &mut filters),
            )
        };

        let generators = vec![year, month, day, hour, minute, second];
        let instances = InstanceGenerator::new(generators, filters, threshold, self.limits);

        Candidates {
            instances,
            set_pos: if set_pos {
                Some(SetPos::new(rule.by_set_pos.clone(), frequency, week_start))
            } else {
                None
            },
        }
    }

    /// Hour, minute or second generator. The FREQ field steps by the
    /// interval, finer fields take every value, and coarser ones repeat the
    /// start's value unless a BY-list says otherwise.
    fn time_generator(
        &self,
        field: Field,
        filters: &mut Vec<Box<dyn DateFilter + Send>>,
    ) -> Box<dyn Generator + Send> {
        let rule = self.rule;
        let (list, start_value, freq) = match field {
            Field::Hour => (&rule.by_hour, self.start.hour, Frequency::Hourly),
            Field::Minute => (&rule.by_minute, self.start.minute, Frequency::Minutely),
            _ => (&rule.by_second, self.start.second, Frequency::Secondly),
        };

        let serial = |interval: u32| -> Box<dyn Generator + Send> {
            match field {
                Field::Hour => Box::new(serial_hour_generator(interval, self.start)),
                Field::Minute => Box::new(serial_minute_generator(interval, self.start)),
                _ => Box::new(serial_second_generator(interval, self.start)),
            }
        };
        let by_list = |values: &[u32]| -> Box<dyn Generator + Send> {
            match field {
                Field::Hour => Box::new(by_hour_generator(values)),
                Field::Minute => Box::new(by_minute_generator(values)),
                _ => Box::new(by_second_generator(values)),
            }
        };
        let as_filter = |values: &[u32]| -> ByFilter {
            match field {
                Field::Hour => ByFilter::Hour(values.to_vec()),
                Field::Minute => ByFilter::Minute(values.to_vec()),
                _ => ByFilter::Second(values.to_vec()),
            }
        };

        if rule.frequency == freq {
            if list.is_empty() {
                serial(rule.interval)
            } else if rule.interval == 1 {
                by_list(list)
            } else {
                filters.push(Box::new(as_filter(list)));
                serial(rule.interval)
            }
        } else if rule.frequency < freq {
            if list.is_empty() {
                serial(1)
            } else {
                by_list(list)
            }
        } else if list.is_empty() {
            by_list(&[start_value])
        } else {
            by_list(list)
        }
    }
}

/// BYSETPOS selection over the candidates of one FREQ period at a time.
#[derive(Debug)]
struct SetPos {
    positions: Vec<i32>,
    frequency: Frequency,
    week_start: Weekday,
    pushback: Option<DtBuilder>,
    selected: VecDeque<DtBuilder>,
}

impl SetPos {
    fn new(positions: Vec<i32>, frequency: Frequency, week_start: Weekday) -> SetPos {
        SetPos {
            positions,
            frequency,
            week_start,
            pushback: None,
            selected: VecDeque::new(),
        }
    }

    fn next(&mut self, instances: &mut InstanceGenerator) -> Option<DtBuilder> {
        loop {
            if let Some(b) = self.selected.pop_front() {
                return Some(b);
            }

            let first = match self.pushback.take() {
                Some(b) => b,
                None => instances.next_candidate()?,
            };
            let period = period_start(first, self.frequency, self.week_start);

            let mut candidates = vec![first];
            while let Some(b) = instances.next_candidate() {
                if period_start(b, self.frequency, self.week_start) == period {
                    candidates.push(b);
                } else {
                    self.pushback = Some(b);
                    break;
                }
            }

            let len = candidates.len() as i32;
            let mut indices: Vec<usize> = self
                .positions
                .iter()
                .filter_map(|&p| {
                    let resolved = if p > 0 { p - 1 } else { len + p };
                    if resolved >= 0 && resolved < len {
                        Some(resolved as usize)
                    } else {
                        None
                    }
                })
                .collect();
            indices.sort_unstable();
            indices.dedup();

            self.selected = indices.into_iter().map(|i| candidates[i]).collect();
        }
    }
}

/// Local candidates of one rule, after BYSETPOS.
#[derive(Debug)]
pub struct Candidates {
    instances: InstanceGenerator,
    set_pos: Option<SetPos>,
}

impl Candidates {
    pub fn next(&mut self) -> Option<DtBuilder> {
        match &mut self.set_pos {
            Some(set_pos) => set_pos.next(&mut self.instances),
            None => self.instances.next_candidate(),
        }
    }

    pub fn has_set_pos(&self) -> bool {
        self.set_pos.is_some()
    }

    pub fn raise_threshold(&mut self, threshold: DtBuilder) {
        self.instances.raise_threshold(threshold);
    }

    pub fn work_done(&mut self) {
        self.instances.work_done();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn candidates(rule: &str, start: &str, n: usize) -> Vec<String> {
        let rule = RecurRule::from_str(rule).unwrap();
        let start = DateValue::from_str(start).unwrap();
        let mut c = ChainBuilder::new(&rule, start, Limits::default()).build();
        let mut out = Vec::new();
        while out.len() < n {
            match c.next() {
                Some(b) if start.has_time() => out.push(b.to_date_time().to_string()),
                Some(b) => out.push(b.to_date().to_string()),
                None => break,
            }
        }
        out
    }

    #[test]
    fn period_starts() {
        let b = DtBuilder::from_value(DateValue::date_time(2006, 1, 1, 9, 30, 0));
        assert_eq!(
            period_start(b, Frequency::Weekly, Weekday::Mon),
            DtBuilder::from_value(DateValue::date_time(2005, 12, 26, 0, 0, 0))
        );
        assert_eq!(
            period_start(b, Frequency::Hourly, Weekday::Mon),
            DtBuilder::from_value(DateValue::date_time(2006, 1, 1, 9, 0, 0))
        );
        assert_eq!(
            period_start(b, Frequency::Yearly, Weekday::Mon),
            DtBuilder::from_value(DateValue::date_time(2006, 1, 1, 0, 0, 0))
        );
    }

    #[test]
    fn monthly_by_negative_month_days() {
        assert_eq!(
            candidates(
                "FREQ=MONTHLY;BYMONTHDAY=31,-16,23,-4,-19,-23,6,-4,-10,1,10",
                "20060501",
                11
            ),
            vec![
                "20060501", "20060506", "20060509", "20060510", "20060513", "20060516",
                "20060522", "20060523", "20060528", "20060531", "20060601",
            ]
        );
    }

    #[test]
    fn candidates_start_at_the_start() {
        assert_eq!(
            candidates("FREQ=WEEKLY;BYDAY=MO,WE,FR", "20060412T090000", 4),
            vec![
                "20060412T090000",
                "20060414T090000",
                "20060417T090000",
                "20060419T090000"
            ]
        );
    }

    #[test]
    fn hourly_interval_crosses_days() {
        assert_eq!(
            candidates("FREQ=HOURLY;INTERVAL=7", "20060413T200000", 3),
            vec!["20060413T200000", "20060414T030000", "20060414T100000"]
        );
    }

    #[test]
    fn set_pos_counts_the_whole_first_period() {
        // The last weekday of each month; the start is mid month.
        assert_eq!(
            candidates(
                "FREQ=MONTHLY;BYDAY=MO,TU,WE,TH,FR;BYSETPOS=-1",
                "20060413",
                3
            ),
            vec!["20060428", "20060531", "20060630"]
        );
    }

    #[test]
    fn set_pos_weekly_period_spans_years() {
        // Week of Monday 2005-12-26: the second of its Sundays and Mondays
        // is Sunday January 1st.
        assert_eq!(
            candidates("FREQ=WEEKLY;BYDAY=MO,SU;BYSETPOS=2", "20051226", 2),
            vec!["20060101", "20060108"]
        );
    }

    #[test]
    fn impossible_rules_exhaust() {
        let rule = RecurRule::from_str("FREQ=YEARLY;BYMONTH=2;BYMONTHDAY=30").unwrap();
        let limits = Limits::default().with_max_years_between_instances(50);
        let mut c = ChainBuilder::new(&rule, DateValue::date(2006, 1, 1), limits).build();
        assert_eq!(c.next(), None);
        assert_eq!(c.next(), None);
    }

    #[test]
    fn raised_threshold_skips_ahead() {
        let rule = RecurRule::from_str("FREQ=DAILY;INTERVAL=3").unwrap();
        let mut c =
            ChainBuilder::new(&rule, DateValue::date(2006, 1, 1), Limits::default()).build();
        assert_eq!(c.next().map(|b| b.to_date()), Some(DateValue::date(2006, 1, 1)));
        c.raise_threshold(DtBuilder::from_value(DateValue::date(2010, 1, 1)));
        // 2010-01-01 is 1461 days after the start; 1461 % 3 == 0.
        assert_eq!(c.next().map(|b| b.to_date()), Some(DateValue::date(2010, 1, 1)));
        assert_eq!(c.next().map(|b| b.to_date()), Some(DateValue::date(2010, 1, 4)));
    }
}
