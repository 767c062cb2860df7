// src/lib.rs
//
// Timesheet aggregation engine: Sunday-start week arithmetic, progressive
// filtering, summary statistics, timeliness and week reviews, revenue
// projections and case staleness, all computed over immutable dataset
// snapshots.

pub mod business_calendar;
pub mod cache;
pub mod clock;
pub mod datasource;
pub mod filters;
pub mod records;
pub mod revenue;
pub mod service;
pub mod snapshot;
pub mod staleness;
pub mod summary;
pub mod timesheet;
pub mod week_calendar;


pub use business_calendar::{Holiday, HolidayCalendar};
pub use cache::RangeCache;
pub use clock::Clock;
pub use datasource::{
    CaseSource, CsvHolidaySource, CsvTimeEntrySource, HolidaySource, InMemorySource,
    JsonCaseSource, SourceError, TimeEntrySource,
};
pub use filters::{FieldOptions, FilterEntry};
pub use records::{Case, CaseTracker, Correctness, EngagementKind, Kind, TimeEntry};
pub use service::{AnalyticsError, AnalyticsService, DateArg, ErrorBody, SummaryReport};
pub use snapshot::{DatasetSnapshot, SnapshotRefresher, SnapshotStore};
pub use staleness::{StalenessReport, StalenessStatus};
pub use summary::{Dimension, GroupedSummary, SummaryStatistics};
pub use timesheet::{TimesheetAggregator, REVIEW_WINDOW_WEEKS};
