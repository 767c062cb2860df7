// src/datasource.rs

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::fs::File;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

use crate::business_calendar::Holiday;
use crate::records::{Case, Kind, TimeEntry};

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("JSON error in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid row: {0}")]
    InvalidRow(String),
    #[error("Data source unavailable: {0}")]
    Unavailable(String),
}

// --- Source traits ---

#[async_trait]
pub trait TimeEntrySource: Send + Sync {
    /// Entries with a work date inside the inclusive `[after, before]` range.
    async fn fetch_time_entries(
        &self,
        after: NaiveDate,
        before: NaiveDate,
    ) -> Result<Vec<TimeEntry>, SourceError>;
}

#[async_trait]
pub trait CaseSource: Send + Sync {
    async fn fetch_cases(&self) -> Result<Vec<Case>, SourceError>;
}

#[async_trait]
pub trait HolidaySource: Send + Sync {
    async fn fetch_holiday_set(&self, year: i32) -> Result<Vec<Holiday>, SourceError>;
}

// --- In-memory source ---

/// Serves fixed collections; used by tests and seeding tools.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    pub entries: Vec<TimeEntry>,
    pub cases: Vec<Case>,
    pub holidays: Vec<Holiday>,
}

#[async_trait]
impl TimeEntrySource for InMemorySource {
    async fn fetch_time_entries(
        &self,
        after: NaiveDate,
        before: NaiveDate,
    ) -> Result<Vec<TimeEntry>, SourceError> {
        Ok(self
            .entries
            .iter()
            .filter(|e| e.date >= after && e.date <= before)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CaseSource for InMemorySource {
    async fn fetch_cases(&self) -> Result<Vec<Case>, SourceError> {
        Ok(self.cases.clone())
    }
}

#[async_trait]
impl HolidaySource for InMemorySource {
    async fn fetch_holiday_set(&self, year: i32) -> Result<Vec<Holiday>, SourceError> {
        Ok(self.holidays.iter().filter(|h| h.date.year() == year).cloned().collect())
    }
}

// --- File-backed sources ---

/// CSV time entries: one row per entry, ISO dates, column names matching the
/// struct fields.
pub struct CsvTimeEntrySource {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CsvEntryRow {
    date: NaiveDate,
    hours: f64,
    worker_id: String,
    worker_name: String,
    worker_slug: String,
    client_id: String,
    client_name: String,
    case_id: String,
    case_title: String,
    #[serde(default)]
    sponsor: Option<String>,
    #[serde(default)]
    account_manager_name: Option<String>,
    kind: String,
    #[serde(default)]
    products_or_services: Option<String>,
    created_at: NaiveDateTime,
    #[serde(default)]
    correctness: Option<String>,
    #[serde(default)]
    comment: Option<String>,
}

impl CsvEntryRow {
    fn into_entry(self) -> Result<TimeEntry, SourceError> {
        let kind: Kind = self
            .kind
            .parse()
            .map_err(|e: crate::records::UnknownKind| SourceError::InvalidRow(e.to_string()))?;
        let entry = TimeEntry {
            date: self.date,
            hours: self.hours,
            worker_id: self.worker_id,
            worker_name: self.worker_name,
            worker_slug: self.worker_slug,
            client_id: self.client_id,
            client_name: self.client_name,
            case_id: self.case_id,
            case_title: self.case_title,
            sponsor: self.sponsor,
            account_manager_name: self.account_manager_name,
            kind,
            products_or_services: self.products_or_services,
            week: String::new(),
            created_at: self.created_at,
            correctness: self.correctness.unwrap_or_default(),
            comment: self.comment,
        };
        entry
            .check_hours()
            .map_err(|e| SourceError::InvalidRow(e.to_string()))?;
        Ok(entry.normalize())
    }
}

impl CsvTimeEntrySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<Vec<TimeEntry>, SourceError> {
        let path = self.path.display().to_string();
        let file = File::open(&self.path).map_err(|source| SourceError::Io {
            path: path.clone(),
            source,
        })?;
        let mut reader = csv::Reader::from_reader(file);
        let mut entries = Vec::new();
        for row in reader.deserialize::<CsvEntryRow>() {
            let row = row.map_err(|source| SourceError::Csv { path: path.clone(), source })?;
            entries.push(row.into_entry()?);
        }
        info!("Loaded {} time entries from {}", entries.len(), path);
        Ok(entries)
    }
}

#[async_trait]
impl TimeEntrySource for CsvTimeEntrySource {
    async fn fetch_time_entries(
        &self,
        after: NaiveDate,
        before: NaiveDate,
    ) -> Result<Vec<TimeEntry>, SourceError> {
        let entries = self.load()?;
        Ok(entries.into_iter().filter(|e| e.date >= after && e.date <= before).collect())
    }
}

/// JSON case metadata: a top-level array of camelCase case objects.
pub struct JsonCaseSource {
    path: PathBuf,
}

impl JsonCaseSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CaseSource for JsonCaseSource {
    async fn fetch_cases(&self) -> Result<Vec<Case>, SourceError> {
        let path = self.path.display().to_string();
        let file = File::open(&self.path).map_err(|source| SourceError::Io {
            path: path.clone(),
            source,
        })?;
        let cases: Vec<Case> = serde_json::from_reader(file)
            .map_err(|source| SourceError::Json { path: path.clone(), source })?;
        info!("Loaded {} cases from {}", cases.len(), path);
        Ok(cases)
    }
}

/// CSV holidays: `date,name` rows across any number of years.
pub struct CsvHolidaySource {
    path: PathBuf,
}

impl CsvHolidaySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl HolidaySource for CsvHolidaySource {
    async fn fetch_holiday_set(&self, year: i32) -> Result<Vec<Holiday>, SourceError> {
        let path = self.path.display().to_string();
        let file = File::open(&self.path).map_err(|source| SourceError::Io {
            path: path.clone(),
            source,
        })?;
        let mut reader = csv::Reader::from_reader(file);
        let mut holidays = Vec::new();
        for row in reader.deserialize::<Holiday>() {
            let holiday = row.map_err(|source| SourceError::Csv { path: path.clone(), source })?;
            if holiday.date.year() == year {
                holidays.push(holiday);
            }
        }
        Ok(holidays)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("hourboard-{}-{}", std::process::id(), name));
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn d(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| panic!("Invalid date string format: {}", date_str))
    }

    const ENTRY_HEADER: &str = "date,hours,worker_id,worker_name,worker_slug,client_id,client_name,case_id,case_title,sponsor,account_manager_name,kind,products_or_services,created_at,correctness,comment\n";

    #[tokio::test]
    async fn csv_entries_load_and_normalize() {
        let csv = format!(
            "{}2023-05-10,4.5,w1,Alice,alice,c1,Acme,k1,Acme Case,,Ana,Consulting,,2023-05-10T12:00:00,,\n",
            ENTRY_HEADER
        );
        let path = temp_file("entries-ok.csv", &csv);
        let source = CsvTimeEntrySource::new(&path);
        let entries = source.fetch_time_entries(d("2023-05-01"), d("2023-05-31")).await.unwrap();

        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.hours, 4.5);
        assert_eq!(entry.kind, Kind::Consulting);
        assert_eq!(entry.week, "07/05 - 13/05", "week label is derived on load");
        assert_eq!(entry.correctness, "OK", "blank correctness is derived on load");
        assert_eq!(entry.sponsor, None, "empty CSV field maps to None");
        assert_eq!(entry.account_manager_name.as_deref(), Some("Ana"));
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn csv_range_filter_is_inclusive() {
        let csv = format!(
            "{}2023-05-01,1,w1,Alice,alice,c1,Acme,k1,Acme Case,,,Internal,,2023-05-01T12:00:00,,\n\
             2023-05-31,2,w1,Alice,alice,c1,Acme,k1,Acme Case,,,Internal,,2023-05-31T12:00:00,,\n\
             2023-06-01,3,w1,Alice,alice,c1,Acme,k1,Acme Case,,,Internal,,2023-06-01T12:00:00,,\n",
            ENTRY_HEADER
        );
        let path = temp_file("entries-range.csv", &csv);
        let source = CsvTimeEntrySource::new(&path);
        let entries = source.fetch_time_entries(d("2023-05-01"), d("2023-05-31")).await.unwrap();
        assert_eq!(entries.len(), 2);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn negative_hours_are_rejected() {
        let csv = format!(
            "{}2023-05-10,-2,w1,Alice,alice,c1,Acme,k1,Acme Case,,,Consulting,,2023-05-10T12:00:00,,\n",
            ENTRY_HEADER
        );
        let path = temp_file("entries-negative.csv", &csv);
        let source = CsvTimeEntrySource::new(&path);
        let result = source.fetch_time_entries(d("2023-05-01"), d("2023-05-31")).await;
        assert!(matches!(result, Err(SourceError::InvalidRow(_))));
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn unknown_kind_is_rejected() {
        let csv = format!(
            "{}2023-05-10,2,w1,Alice,alice,c1,Acme,k1,Acme Case,,,Gardening,,2023-05-10T12:00:00,,\n",
            ENTRY_HEADER
        );
        let path = temp_file("entries-kind.csv", &csv);
        let source = CsvTimeEntrySource::new(&path);
        let result = source.fetch_time_entries(d("2023-05-01"), d("2023-05-31")).await;
        assert!(matches!(result, Err(SourceError::InvalidRow(_))));
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn missing_files_surface_as_io_errors() {
        let entries = CsvTimeEntrySource::new("/nonexistent/hourboard-entries.csv");
        let result = entries.fetch_time_entries(d("2023-05-01"), d("2023-05-31")).await;
        assert!(matches!(result, Err(SourceError::Io { .. })));

        let cases = JsonCaseSource::new("/nonexistent/hourboard-cases.json");
        assert!(matches!(cases.fetch_cases().await, Err(SourceError::Io { .. })));
    }

    #[tokio::test]
    async fn json_cases_load_with_defaults() {
        let json = r#"[
            {
                "id": "k1",
                "slug": "acme-upgrade",
                "title": "Acme Upgrade",
                "clientName": "Acme",
                "isActive": true,
                "weeklyApprovedHours": 20.0,
                "trackerInfo": [{"kind": "Consulting", "rate": "100", "dueOn": null}],
                "startOfContract": "2023-01-01",
                "createdAt": "2023-01-01T09:00:00",
                "hasDescription": true
            }
        ]"#;
        let path = temp_file("cases.json", json);
        let source = JsonCaseSource::new(&path);
        let cases = source.fetch_cases().await.unwrap();

        assert_eq!(cases.len(), 1);
        let case = &cases[0];
        assert_eq!(case.slug, "acme-upgrade");
        assert_eq!(case.weekly_approved_hours, Some(20.0));
        assert_eq!(case.tracker_info.len(), 1);
        assert_eq!(case.pre_contracted_value, None);
        assert_eq!(case.last_updated, None);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn holiday_source_filters_by_year() {
        let csv = "date,name\n2022-12-25,Christmas\n2023-05-01,Labour Day\n2023-06-08,Corpus Christi\n";
        let path = temp_file("holidays.csv", csv);
        let source = CsvHolidaySource::new(&path);
        let holidays = source.fetch_holiday_set(2023).await.unwrap();
        assert_eq!(holidays.len(), 2);
        assert!(holidays.iter().all(|h| h.date.year() == 2023));
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn in_memory_source_honours_the_range() {
        let entry = TimeEntry {
            date: d("2023-05-10"),
            hours: 2.0,
            worker_id: "w1".to_string(),
            worker_name: "Alice".to_string(),
            worker_slug: "alice".to_string(),
            client_id: "c1".to_string(),
            client_name: "Acme".to_string(),
            case_id: "k1".to_string(),
            case_title: "Acme Case".to_string(),
            sponsor: None,
            account_manager_name: None,
            kind: Kind::Consulting,
            products_or_services: None,
            week: String::new(),
            created_at: d("2023-05-10").and_hms_opt(12, 0, 0).unwrap(),
            correctness: String::new(),
            comment: None,
        }
        .normalize();
        let source = InMemorySource { entries: vec![entry], ..Default::default() };

        let hit = source.fetch_time_entries(d("2023-05-01"), d("2023-05-31")).await.unwrap();
        assert_eq!(hit.len(), 1);
        let miss = source.fetch_time_entries(d("2023-06-01"), d("2023-06-30")).await.unwrap();
        assert!(miss.is_empty());
    }
}
