//! Parsing and lazy expansion of RFC 2445 recurrence sets.
//!
//! RRULE, EXRULE, RDATE and EXDATE lines (plus legacy vCalendar rules) are
//! parsed into [`property::RecurrenceLine`]s, and [`factory`] turns them into
//! ordered, duplicate free iterators of the instants they describe.

#[macro_use]
extern crate pest_derive;

pub mod compound;
pub mod config;
pub mod error;
pub mod factory;
pub mod filters;
pub mod generators;
pub mod instances;
pub mod iterator;
pub mod parameters;
pub mod parser;
pub mod property;
pub mod time_utils;
pub mod timezone;
pub mod values;
pub mod vcal;

pub use compound::CompoundIterator;
pub use config::Limits;
pub use error::{Error, ParseError};
pub use factory::{
    create_compound_iterator, create_recurrence_iterator, parse_recurrence_iterator,
};
pub use iterator::{RDateIterator, RRuleIterator, RecurrenceIterator};
pub use property::{RecurRule, RecurrenceLine};
pub use timezone::{Offseter, SharedZone};
pub use values::{DateValue, PeriodValue, TimeValue, WeekdayNum};
