use std::fmt::Display;

use anyhow::Result;
use chrono::{DateTime, Duration, Local};
use chrono_english::parse_date_string;
use clap::{CommandFactory, ValueEnum};

use crate::store::{
    activity_store::ActivityStore, entities::ActivityRecord, snapshot::SnapshotStorage,
};

use super::Args;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

/// Command to list logged activities between two dates. Defaults to the
/// trailing week when no bounds are given.
pub fn process_history_command<S: SnapshotStorage>(
    store: &ActivityStore<S>,
    start_date: Option<String>,
    end_date: Option<String>,
    date_style: DateStyle,
) -> Result<()> {
    let (start, end) = parse_range(start_date, end_date, date_style)?;

    let mut shown = 0;
    for record in store
        .activities()
        .iter()
        .filter(|r| in_range(r, start, end))
    {
        println!("{}", format_record(record));
        shown += 1;
    }

    if shown == 0 {
        println!(
            "No activities between {} and {}",
            start.format("%x %H:%M"),
            end.format("%x %H:%M")
        );
    }
    Ok(())
}

fn in_range(record: &ActivityRecord, start: DateTime<Local>, end: DateTime<Local>) -> bool {
    let moment = record.timestamp.with_timezone(&Local);
    moment >= start && moment <= end
}

fn format_record(record: &ActivityRecord) -> String {
    format!(
        "#{}\t{}\t{}\t{}\t{:.2} kg{}",
        record.id,
        record.timestamp.with_timezone(&Local).format("%x %H:%M"),
        record.category,
        record.name,
        record.carbon_kg,
        if record.is_reduction { " avoided" } else { "" }
    )
}

/// Also provides sensible defaults for the `history` command.
fn parse_range(
    start_date: Option<String>,
    end_date: Option<String>,
    date_style: DateStyle,
) -> Result<(DateTime<Local>, DateTime<Local>)> {
    let now = Local::now();
    let dialect: chrono_english::Dialect = date_style.into();

    let start = match start_date.map(|s| parse_date_string(&s, now, dialect)) {
        Some(Ok(v)) => v.with_timezone(&Local),
        Some(Err(e)) => {
            return Err(Args::command()
                .error(
                    clap::error::ErrorKind::ValueValidation,
                    format!("Failed to validate start date {e}"),
                )
                .into());
        }
        None => now - Duration::days(7),
    };
    let end = match end_date.map(|s| parse_date_string(&s, now, dialect)) {
        Some(Ok(v)) => v.with_timezone(&Local),
        Some(Err(e)) => {
            return Err(Args::command()
                .error(
                    clap::error::ErrorKind::ValueValidation,
                    format!("Failed to validate end date {e}"),
                )
                .into());
        }
        None => now,
    };

    Ok((start, end))
}
