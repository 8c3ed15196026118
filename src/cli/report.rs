use std::{fmt::Display, io::IsTerminal, sync::Arc};

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, ValueEnum};
use tracing::error;

use crate::{
    config::{ConfigArgs, TrackerConfig},
    daemon::storage::usage_store::UsageStore,
    report::DailyReport,
    utils::clock::DefaultClock,
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

#[derive(Debug, Parser)]
pub struct ReportCommand {
    #[command(flatten)]
    pub config: ConfigArgs,
    #[arg(
        long = "date",
        short,
        help = "Day to report. Examples are \"today\", \"yesterday\", \"15/03/2025\""
    )]
    date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[arg(short, long, help = "Show only the top entries of each list")]
    top: Option<usize>,
}

/// Command to process `report` command. Prints the ranked application and site usage of a
/// single day.
pub async fn process_report_command(
    ReportCommand {
        date,
        date_style,
        top,
        ..
    }: ReportCommand,
    config: &TrackerConfig,
) -> Result<()> {
    let day = parse_day(date, date_style, Local::now())?;

    let store = UsageStore::connect(config.db_path.as_deref(), Arc::new(DefaultClock));
    if store.is_dry() {
        println!("No usage database available, nothing to report.");
        return Ok(());
    }

    let records = store
        .try_daily_snapshot(day)
        .await
        .inspect_err(|e| error!("Error fetching usage {e}"))?;
    let report = DailyReport::build(day, &records, top);
    if report.is_empty() {
        println!("No usage data for {day}.");
        return Ok(());
    }

    print!("{}", report.render(std::io::stdout().is_terminal()));
    Ok(())
}

/// Defaults to the current day.
fn parse_day(date: Option<String>, date_style: DateStyle, now: DateTime<Local>) -> Result<NaiveDate> {
    let Some(date) = date else {
        return Ok(now.date_naive());
    };
    match parse_date_string(&date, now, date_style.into()) {
        Ok(v) => Ok(v.date_naive()),
        Err(e) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate date {e}"),
            )
            .into()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Local, NaiveDate, TimeZone};

    use super::{parse_day, DateStyle};

    #[test]
    fn report_day_parsing() -> anyhow::Result<()> {
        let now = Local.with_ymd_and_hms(2025, 3, 16, 12, 0, 0).unwrap();

        assert_eq!(parse_day(None, DateStyle::Uk, now)?, now.date_naive());
        assert_eq!(
            parse_day(Some("yesterday".into()), DateStyle::Uk, now)?,
            now.date_naive() - Duration::days(1)
        );
        assert_eq!(
            parse_day(Some("15/03/2025".into()), DateStyle::Uk, now)?,
            NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()
        );
        assert_eq!(
            parse_day(Some("03/15/2025".into()), DateStyle::Us, now)?,
            NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()
        );
        assert!(parse_day(Some("not a date".into()), DateStyle::Uk, now).is_err());
        Ok(())
    }
}
