// src/snapshot.rs

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use std::sync::{Arc, RwLock};
use tracing::{error, info};

use crate::business_calendar::{Holiday, HolidayCalendar};
use crate::cache::RangeCache;
use crate::clock::Clock;
use crate::datasource::{CaseSource, HolidaySource, SourceError, TimeEntrySource};
use crate::records::{Case, TimeEntry};
use crate::week_calendar;

/// Immutable view of all ingested data. Reports read one snapshot end to end;
/// refreshes build a new snapshot and swap it in wholesale.
#[derive(Debug, Clone)]
pub struct DatasetSnapshot {
    pub entries: Vec<TimeEntry>,
    pub cases: Vec<Case>,
    pub holidays: HolidayCalendar,
    pub built_at: NaiveDateTime,
}

impl DatasetSnapshot {
    /// Normalizes and validates raw rows into a snapshot. Negative hours
    /// reject the whole build; a snapshot is never partially valid.
    pub fn build(
        entries: Vec<TimeEntry>,
        cases: Vec<Case>,
        holidays: Vec<Holiday>,
        built_at: NaiveDateTime,
    ) -> Result<Self, SourceError> {
        let mut normalized = Vec::with_capacity(entries.len());
        for entry in entries {
            entry
                .check_hours()
                .map_err(|e| SourceError::InvalidRow(e.to_string()))?;
            normalized.push(entry.normalize());
        }
        Ok(Self {
            entries: normalized,
            cases,
            holidays: HolidayCalendar::new(holidays),
            built_at,
        })
    }

    pub fn empty(built_at: NaiveDateTime) -> Self {
        Self {
            entries: Vec::new(),
            cases: Vec::new(),
            holidays: HolidayCalendar::default(),
            built_at,
        }
    }

    /// Looks a case up by id or slug.
    pub fn find_case(&self, id_or_slug: &str) -> Option<&Case> {
        self.cases.iter().find(|c| c.id == id_or_slug || c.slug == id_or_slug)
    }
}

/// Shared handle the query side reads and the refresher swaps. Readers keep
/// working against the snapshot they grabbed even while a swap happens.
pub struct SnapshotStore {
    current: RwLock<Arc<DatasetSnapshot>>,
}

impl SnapshotStore {
    pub fn new(snapshot: DatasetSnapshot) -> Self {
        Self { current: RwLock::new(Arc::new(snapshot)) }
    }

    pub fn current(&self) -> Arc<DatasetSnapshot> {
        self.current.read().unwrap().clone()
    }

    pub fn replace(&self, snapshot: DatasetSnapshot) {
        let mut slot = self.current.write().unwrap();
        info!(
            "Swapping dataset snapshot: {} entries, {} cases, {} holidays",
            snapshot.entries.len(),
            snapshot.cases.len(),
            snapshot.holidays.len()
        );
        *slot = Arc::new(snapshot);
    }
}

/// Pulls all three sources, builds a fresh snapshot and swaps it into the
/// store. Any source failure aborts the refresh and leaves the previous
/// snapshot serving.
pub struct SnapshotRefresher<E, C, H> {
    entry_source: E,
    case_source: C,
    holiday_source: H,
    holiday_cache: RangeCache<Vec<Holiday>>,
    window_weeks: u32,
}

const DEFAULT_FETCH_WINDOW_WEEKS: u32 = 26;

impl<E, C, H> SnapshotRefresher<E, C, H>
where
    E: TimeEntrySource,
    C: CaseSource,
    H: HolidaySource,
{
    pub fn new(entry_source: E, case_source: C, holiday_source: H) -> Self {
        Self {
            entry_source,
            case_source,
            holiday_source,
            holiday_cache: RangeCache::new(),
            window_weeks: DEFAULT_FETCH_WINDOW_WEEKS,
        }
    }

    pub fn with_window_weeks(mut self, weeks: u32) -> Self {
        self.window_weeks = weeks;
        self
    }

    pub async fn refresh(
        &self,
        store: &SnapshotStore,
        clock: &Clock,
    ) -> Result<Arc<DatasetSnapshot>, SourceError> {
        let (start, end) = week_calendar::n_weeks_window(self.window_weeks, clock.today());
        let (after, before) = (start.date(), end.date());
        info!("Refreshing dataset snapshot for {} - {}", after, before);

        let entries = match self.entry_source.fetch_time_entries(after, before).await {
            Ok(entries) => entries,
            Err(e) => {
                error!("Time entry fetch failed, keeping previous snapshot: {}", e);
                return Err(e);
            }
        };
        let cases = match self.case_source.fetch_cases().await {
            Ok(cases) => cases,
            Err(e) => {
                error!("Case fetch failed, keeping previous snapshot: {}", e);
                return Err(e);
            }
        };
        let mut holidays = Vec::new();
        for year in after.year()..=before.year() {
            holidays.extend(self.holiday_set_for_year(year).await?);
        }

        let snapshot = DatasetSnapshot::build(entries, cases, holidays, clock.now())?;
        store.replace(snapshot);
        Ok(store.current())
    }

    async fn holiday_set_for_year(&self, year: i32) -> Result<Vec<Holiday>, SourceError> {
        let key = format!("holidays:{}", year);
        if let Some(cached) = self.holiday_cache.get(&key) {
            return Ok(cached);
        }
        let fetched = self.holiday_source.fetch_holiday_set(year).await?;
        let jan_1 = NaiveDate::from_ymd_opt(year, 1, 1).unwrap();
        let dec_31 = NaiveDate::from_ymd_opt(year, 12, 31).unwrap();
        self.holiday_cache.insert(&key, Some((jan_1, dec_31)), fetched.clone());
        Ok(fetched)
    }

    /// Admin hook: drops cached holiday sets overlapping `[start, end]` so the
    /// next refresh re-fetches them.
    pub fn invalidate_holidays(&self, start: NaiveDate, end: NaiveDate) -> usize {
        self.holiday_cache.invalidate_overlapping(start, end)
    }
}
