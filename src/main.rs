// src/main.rs

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use hourboard_core::business_calendar::Holiday;
use hourboard_core::clock::Clock;
use hourboard_core::datasource::{
    CsvHolidaySource, CsvTimeEntrySource, HolidaySource, JsonCaseSource, SourceError,
};
use hourboard_core::filters::FilterEntry;
use hourboard_core::service::{AnalyticsService, DateArg};
use hourboard_core::snapshot::{DatasetSnapshot, SnapshotRefresher, SnapshotStore};
use hourboard_core::summary::Dimension;

// --- Configuration ---

fn default_window_weeks() -> u32 {
    26
}

/// Read from `HOURBOARD_*` environment variables; command-line flags override.
#[derive(Debug, Clone, Deserialize)]
struct AppConfig {
    #[serde(default)]
    entries_path: Option<String>,
    #[serde(default)]
    cases_path: Option<String>,
    #[serde(default)]
    holidays_path: Option<String>,
    /// Reference date standing in for today, `YYYY-MM-DD`.
    #[serde(default)]
    as_of: Option<String>,
    /// How many weeks of entries to pull into the snapshot.
    #[serde(default = "default_window_weeks")]
    window_weeks: u32,
}

impl AppConfig {
    fn from_env() -> Result<Self, envy::Error> {
        dotenv::dotenv().ok();
        envy::prefixed("HOURBOARD_").from_env::<AppConfig>()
    }
}

// --- CLI ---

#[derive(Parser)]
#[command(name = "hourboard")]
#[command(about = "Timesheet analytics over local snapshot files", long_about = None)]
struct Cli {
    /// Time entries CSV (overrides HOURBOARD_ENTRIES_PATH)
    #[arg(long)]
    entries: Option<String>,

    /// Cases JSON (overrides HOURBOARD_CASES_PATH)
    #[arg(long)]
    cases: Option<String>,

    /// Holidays CSV (overrides HOURBOARD_HOLIDAYS_PATH)
    #[arg(long)]
    holidays: Option<String>,

    /// Reference date standing in for today, YYYY-MM-DD (overrides HOURBOARD_AS_OF)
    #[arg(long)]
    as_of: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summary statistics for a date range, optionally grouped
    Summary {
        /// Range start, YYYY-MM-DD; defaults to the trailing six-week window
        #[arg(long)]
        start: Option<String>,
        /// Range end, YYYY-MM-DD
        #[arg(long)]
        end: Option<String>,
        /// Grouping dimension (worker|client|case|sponsor|account-manager|date|week|offer|kind)
        #[arg(long)]
        by: Option<String>,
        /// Child dimension to drill one level down
        #[arg(long)]
        children: Option<String>,
        /// Repeatable filter, FIELD=V1,V2
        #[arg(long = "filter", value_name = "FIELD=V1,V2")]
        filters: Vec<String>,
    },
    /// Day-by-day review of the week containing the date of interest
    WeekReview {
        #[arg(long)]
        date: Option<String>,
        #[arg(long = "filter", value_name = "FIELD=V1,V2")]
        filters: Vec<String>,
    },
    /// Correctness buckets over the trailing six-week window
    Timeliness {
        #[arg(long)]
        date: Option<String>,
        #[arg(long = "filter", value_name = "FIELD=V1,V2")]
        filters: Vec<String>,
    },
    /// Daily hours per work kind over a date range
    Allocation {
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long = "filter", value_name = "FIELD=V1,V2")]
        filters: Vec<String>,
    },
    /// Expected fees per client for the month of the date of interest
    Revenue {
        #[arg(long)]
        date: Option<String>,
        /// Restrict to one account manager, by name or slug
        #[arg(long)]
        account_manager: Option<String>,
        #[arg(long = "filter", value_name = "FIELD=V1,V2")]
        filters: Vec<String>,
    },
    /// Business-day distribution of approved hours for the month
    Projection {
        #[arg(long)]
        date: Option<String>,
    },
    /// Fixed-revenue comparison against the three prior months
    Forecast {
        #[arg(long)]
        date: Option<String>,
    },
    /// Case update staleness report
    Staleness,
}

/// Parses repeatable `FIELD=V1,V2` occurrences into filter entries.
fn parse_filters(raw: &[String]) -> Result<Vec<FilterEntry>> {
    raw.iter()
        .map(|spec| {
            let (field, values) = spec
                .split_once('=')
                .ok_or_else(|| anyhow!("Filter must look like FIELD=V1,V2, got '{}'", spec))?;
            Ok(FilterEntry {
                field: field.trim().to_string(),
                selected_values: values
                    .split(',')
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .collect(),
            })
        })
        .collect()
}

fn parse_dimension(raw: &str) -> Result<Dimension> {
    raw.parse::<Dimension>().map_err(|e| anyhow!("{}", e))
}

/// Holiday input for the refresher; reports run holiday-free when no file is
/// configured.
enum HolidayInput {
    File(CsvHolidaySource),
    Empty,
}

#[async_trait]
impl HolidaySource for HolidayInput {
    async fn fetch_holiday_set(&self, year: i32) -> Result<Vec<Holiday>, SourceError> {
        match self {
            HolidayInput::File(source) => source.fetch_holiday_set(year).await,
            HolidayInput::Empty => Ok(Vec::new()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env().context("Reading HOURBOARD_* environment failed")?;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Setting default tracing subscriber failed")?;

    let cli = Cli::parse();

    let entries_path = cli.entries.or(config.entries_path).ok_or_else(|| {
        anyhow!("No time entries file: pass --entries or set HOURBOARD_ENTRIES_PATH")
    })?;
    let cases_path = cli
        .cases
        .or(config.cases_path)
        .ok_or_else(|| anyhow!("No cases file: pass --cases or set HOURBOARD_CASES_PATH"))?;
    let holidays_path = cli.holidays.or(config.holidays_path);

    let clock = match cli.as_of.or(config.as_of) {
        Some(text) => {
            let date = NaiveDate::parse_from_str(&text, "%Y-%m-%d")
                .map_err(|_| anyhow!("Invalid as-of date '{}', expected YYYY-MM-DD", text))?;
            Clock::fixed(date.and_hms_opt(12, 0, 0).unwrap())
        }
        None => Clock::system(),
    };

    let holiday_source = match holidays_path {
        Some(path) => HolidayInput::File(CsvHolidaySource::new(path)),
        None => HolidayInput::Empty,
    };
    let refresher = SnapshotRefresher::new(
        CsvTimeEntrySource::new(&entries_path),
        JsonCaseSource::new(&cases_path),
        holiday_source,
    )
    .with_window_weeks(config.window_weeks);

    let store = Arc::new(SnapshotStore::new(DatasetSnapshot::empty(clock.now())));
    refresher
        .refresh(&store, &clock)
        .await
        .context("Building the dataset snapshot failed")?;
    info!("Snapshot ready, running report");

    let service = AnalyticsService::new(store, clock);
    let output = run_command(&service, cli.command)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run_command(service: &AnalyticsService, command: Commands) -> Result<serde_json::Value> {
    let value = match command {
        Commands::Summary { start, end, by, children, filters } => {
            let filters = parse_filters(&filters)?;
            let start = start.map(DateArg::from);
            let end = end.map(DateArg::from);
            match by {
                Some(by) => {
                    let dimension = parse_dimension(&by)?;
                    let child = children.as_deref().map(parse_dimension).transpose()?;
                    serde_json::to_value(
                        service.group_summaries(start, end, dimension, child, &filters)?,
                    )?
                }
                None => serde_json::to_value(service.summary(start, end, &filters)?)?,
            }
        }
        Commands::WeekReview { date, filters } => {
            let filters = parse_filters(&filters)?;
            serde_json::to_value(service.week_review(date.map(DateArg::from), &filters)?)?
        }
        Commands::Timeliness { date, filters } => {
            let filters = parse_filters(&filters)?;
            serde_json::to_value(service.timeliness_review(date.map(DateArg::from), &filters)?)?
        }
        Commands::Allocation { start, end, filters } => {
            let filters = parse_filters(&filters)?;
            serde_json::to_value(service.allocation(
                start.map(DateArg::from),
                end.map(DateArg::from),
                &filters,
            )?)?
        }
        Commands::Revenue { date, account_manager, filters } => {
            let filters = parse_filters(&filters)?;
            serde_json::to_value(service.revenue_tracking(
                date.map(DateArg::from),
                account_manager.as_deref(),
                &filters,
            )?)?
        }
        Commands::Projection { date } => {
            serde_json::to_value(service.revenue_projection(date.map(DateArg::from))?)?
        }
        Commands::Forecast { date } => {
            serde_json::to_value(service.forecast(date.map(DateArg::from))?)?
        }
        Commands::Staleness => serde_json::to_value(service.staleness()?)?,
    };
    Ok(value)
}
