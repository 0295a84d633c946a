use std::io::{stdin, Read};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ics_recur::factory::parse_recurrence_iterator_with_limits;
use ics_recur::timezone::{self, resolve_tzid, SharedZone};
use ics_recur::values::parse_date_text;
use ics_recur::{DateValue, Limits, RecurrenceIterator};

/// Expands the recurrence lines read from stdin.
#[derive(Parser)]
#[command(name = "expand")]
struct Cli {
    /// Start of the series, e.g. "20060413" or "20060413T090000"
    #[arg(long)]
    dtstart: String,

    /// Time zone naive values are read in
    #[arg(long, default_value = "UTC")]
    tz: String,

    /// Maximum number of instants to print
    #[arg(long, default_value_t = 10)]
    limit: usize,

    /// Skip instants before this one
    #[arg(long)]
    advance_to: Option<String>,

    /// Give up after this many years without an instant
    #[arg(long, default_value_t = 1000)]
    max_years: u32,
}

/// Reads a date in the given zone; values with a `Z` suffix are in UTC.
fn read_local(text: &str, zone: &SharedZone) -> Result<DateValue> {
    let (value, utc) = parse_date_text(text).with_context(|| format!("bad date '{}'", text))?;
    Ok(if utc {
        timezone::utc_to_local(&**zone, value)
    } else {
        value
    })
}

fn render(value: DateValue) -> String {
    if value.has_time() {
        format!("{}Z", value)
    } else {
        value.to_string()
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let zone: SharedZone = Arc::new(resolve_tzid(&cli.tz)?);
    let dtstart = read_local(&cli.dtstart, &zone)?;

    let mut data = String::new();
    stdin().read_to_string(&mut data)?;

    let limits = Limits::default().with_max_years_between_instances(cli.max_years);
    let mut iter = parse_recurrence_iterator_with_limits(&data, dtstart, zone.clone(), limits)?;

    if let Some(text) = &cli.advance_to {
        let local = read_local(text, &zone)?;
        iter.advance_to(timezone::local_to_utc(&*zone, local));
    }

    let output = iter.take(cli.limit).map(render).collect::<Vec<_>>();
    println!("{}", output.join(","));

    Ok(())
}
