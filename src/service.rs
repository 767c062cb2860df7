// src/service.rs

use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::clock::Clock;
use crate::datasource::SourceError;
use crate::filters::{FieldOptions, FilterEntry, TIMESHEET_FIELDS};
use crate::records::Case;
use crate::revenue::{self, Forecast, MonthProjection, RevenueTracking};
use crate::snapshot::{DatasetSnapshot, SnapshotStore};
use crate::staleness::{staleness_report, StalenessReport};
use crate::summary::{group_with_children, Dimension, GroupedSummary, SummaryStatistics};
use crate::timesheet::{
    AllocationReport, TimelinessReview, TimesheetAggregator, WeekReview, REVIEW_WINDOW_WEEKS,
};
use crate::week_calendar;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Invalid date input '{0}', expected YYYY-MM-DD")]
    InvalidDateInput(String),
    #[error("Upstream data source failed: {0}")]
    UpstreamFetch(#[from] SourceError),
}

/// Wire shape for failures crossing the query boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

impl ErrorBody {
    pub fn internal(message: impl Into<String>) -> Self {
        Self { kind: "internal".to_string(), message: message.into() }
    }
}

impl From<&AnalyticsError> for ErrorBody {
    fn from(error: &AnalyticsError) -> Self {
        let kind = match error {
            AnalyticsError::InvalidDateInput(_) => "bad_input",
            AnalyticsError::UpstreamFetch(_) => "upstream_unavailable",
        };
        Self { kind: kind.to_string(), message: error.to_string() }
    }
}

/// Date parameter accepted as a native date or a `YYYY-MM-DD` string.
#[derive(Debug, Clone)]
pub enum DateArg {
    Date(NaiveDate),
    Text(String),
}

impl DateArg {
    fn resolve(&self) -> Result<NaiveDate, AnalyticsError> {
        match self {
            DateArg::Date(date) => Ok(*date),
            DateArg::Text(text) => NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map_err(|_| AnalyticsError::InvalidDateInput(text.clone())),
        }
    }
}

impl From<NaiveDate> for DateArg {
    fn from(date: NaiveDate) -> Self {
        DateArg::Date(date)
    }
}

impl From<&str> for DateArg {
    fn from(text: &str) -> Self {
        DateArg::Text(text.to_string())
    }
}

impl From<String> for DateArg {
    fn from(text: String) -> Self {
        DateArg::Text(text)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReport {
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(flatten)]
    pub stats: SummaryStatistics,
    pub filterable_fields: Vec<FieldOptions>,
}

/// Facade over one snapshot store: every report method grabs the current
/// snapshot once and computes against that consistent view.
pub struct AnalyticsService {
    store: Arc<SnapshotStore>,
    clock: Clock,
}

impl AnalyticsService {
    pub fn new(store: Arc<SnapshotStore>, clock: Clock) -> Self {
        Self { store, clock }
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    fn snapshot(&self) -> Arc<DatasetSnapshot> {
        self.store.current()
    }

    fn resolve_date(&self, arg: Option<DateArg>) -> Result<NaiveDate, AnalyticsError> {
        match arg {
            Some(arg) => arg.resolve(),
            None => Ok(self.clock.today()),
        }
    }

    /// Explicit range, or the trailing review window when either end is open.
    fn resolve_range(
        &self,
        start: Option<DateArg>,
        end: Option<DateArg>,
    ) -> Result<(NaiveDate, NaiveDate), AnalyticsError> {
        let (window_start, window_end) =
            week_calendar::n_weeks_window(REVIEW_WINDOW_WEEKS, self.clock.today());
        let start = match start {
            Some(arg) => arg.resolve()?,
            None => window_start.date(),
        };
        let end = match end {
            Some(arg) => arg.resolve()?,
            None => window_end.date(),
        };
        Ok((start, end))
    }

    pub fn summary(
        &self,
        start: Option<DateArg>,
        end: Option<DateArg>,
        filters: &[FilterEntry],
    ) -> Result<SummaryReport, AnalyticsError> {
        let (start, end) = self.resolve_range(start, end)?;
        let snapshot = self.snapshot();
        let rows = TimesheetAggregator::new(&snapshot.entries).entries_between(start, end);
        let (rows, filterable_fields) = TIMESHEET_FIELDS.apply(rows, filters);
        debug!("Summary over {} - {} covers {} rows", start, end, rows.len());
        Ok(SummaryReport {
            start,
            end,
            stats: SummaryStatistics::from_entries(&rows),
            filterable_fields,
        })
    }

    pub fn group_summaries(
        &self,
        start: Option<DateArg>,
        end: Option<DateArg>,
        dimension: Dimension,
        child: Option<Dimension>,
        filters: &[FilterEntry],
    ) -> Result<Vec<GroupedSummary>, AnalyticsError> {
        let (start, end) = self.resolve_range(start, end)?;
        let snapshot = self.snapshot();
        let rows = TimesheetAggregator::new(&snapshot.entries).entries_between(start, end);
        let (rows, _) = TIMESHEET_FIELDS.apply(rows, filters);
        Ok(group_with_children(&rows, dimension, child))
    }

    pub fn week_review(
        &self,
        date: Option<DateArg>,
        filters: &[FilterEntry],
    ) -> Result<WeekReview, AnalyticsError> {
        let date = self.resolve_date(date)?;
        let snapshot = self.snapshot();
        Ok(TimesheetAggregator::new(&snapshot.entries).week_review(date, filters))
    }

    pub fn timeliness_review(
        &self,
        date: Option<DateArg>,
        filters: &[FilterEntry],
    ) -> Result<TimelinessReview, AnalyticsError> {
        let date = self.resolve_date(date)?;
        let snapshot = self.snapshot();
        Ok(TimesheetAggregator::new(&snapshot.entries).timeliness_review(date, filters))
    }

    pub fn allocation(
        &self,
        start: Option<DateArg>,
        end: Option<DateArg>,
        filters: &[FilterEntry],
    ) -> Result<AllocationReport, AnalyticsError> {
        let (start, end) = self.resolve_range(start, end)?;
        let snapshot = self.snapshot();
        Ok(TimesheetAggregator::new(&snapshot.entries).allocation(start, end, filters))
    }

    pub fn revenue_tracking(
        &self,
        date: Option<DateArg>,
        account_manager: Option<&str>,
        filters: &[FilterEntry],
    ) -> Result<RevenueTracking, AnalyticsError> {
        let date = self.resolve_date(date)?;
        let snapshot = self.snapshot();
        Ok(revenue::revenue_tracking(
            &snapshot.cases,
            &snapshot.holidays,
            date,
            account_manager,
            filters,
        ))
    }

    pub fn revenue_projection(
        &self,
        date: Option<DateArg>,
    ) -> Result<MonthProjection, AnalyticsError> {
        let date = self.resolve_date(date)?;
        let snapshot = self.snapshot();
        Ok(revenue::revenue_projection(
            &snapshot.cases,
            &snapshot.entries,
            &snapshot.holidays,
            date,
        ))
    }

    pub fn forecast(&self, date: Option<DateArg>) -> Result<Forecast, AnalyticsError> {
        let date = self.resolve_date(date)?;
        let snapshot = self.snapshot();
        Ok(revenue::forecast(&snapshot.cases, &snapshot.holidays, date))
    }

    /// Staleness over active cases, with workers attributed from the trailing
    /// review window.
    pub fn staleness(&self) -> Result<StalenessReport, AnalyticsError> {
        let snapshot = self.snapshot();
        let (start, end) = week_calendar::n_weeks_window(REVIEW_WINDOW_WEEKS, self.clock.today());
        let recent = TimesheetAggregator::new(&snapshot.entries)
            .entries_between(start.date(), end.date());
        Ok(staleness_report(&snapshot.cases, &recent, self.clock.now()))
    }

    pub fn case(&self, id_or_slug: &str) -> Option<Case> {
        self.snapshot().find_case(id_or_slug).cloned()
    }
}
