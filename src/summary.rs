// src/summary.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use thiserror::Error;

use crate::records::{Kind, TimeEntry};
use crate::week_calendar;

// --- Scalar statistics ---

/// Mean of a sample; zero for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample (n - 1) standard deviation; zero for fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

fn spread(values: &[f64]) -> (f64, f64) {
    (mean(values), sample_std_dev(values))
}

// --- Summary statistics ---

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekHours {
    pub week: String,
    pub hours: f64,
}

/// Aggregate view of a row collection: totals, distinct counts, per-dimension
/// hour spreads, per-kind totals and a chronological weekly series.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStatistics {
    pub total_entries: usize,
    pub total_hours: f64,
    pub unique_workers: usize,
    pub unique_clients: usize,
    pub unique_cases: usize,
    pub unique_sponsors: usize,
    pub unique_account_managers: usize,
    pub unique_weeks: usize,
    pub unique_working_days: usize,
    pub average_hours_per_entry: f64,
    pub std_dev_hours_per_entry: f64,
    pub average_hours_per_day: f64,
    pub std_dev_hours_per_day: f64,
    pub average_hours_per_worker: f64,
    pub std_dev_hours_per_worker: f64,
    pub average_hours_per_client: f64,
    pub std_dev_hours_per_client: f64,
    pub average_hours_per_case: f64,
    pub std_dev_hours_per_case: f64,
    pub average_hours_per_sponsor: f64,
    pub std_dev_hours_per_sponsor: f64,
    pub average_hours_per_account_manager: f64,
    pub std_dev_hours_per_account_manager: f64,
    pub average_hours_per_week: f64,
    pub std_dev_hours_per_week: f64,
    pub total_consulting_hours: f64,
    pub total_hands_on_hours: f64,
    pub total_squad_hours: f64,
    pub total_internal_hours: f64,
    pub weekly_hours: Vec<WeekHours>,
}

impl SummaryStatistics {
    /// Aggregates a row collection. Empty input produces all-zero statistics
    /// rather than an error.
    pub fn from_entries(entries: &[TimeEntry]) -> Self {
        if entries.is_empty() {
            return SummaryStatistics::default();
        }

        let per_entry: Vec<f64> = entries.iter().map(|e| e.hours).collect();
        let total_hours: f64 = per_entry.iter().sum();

        // BTreeMaps keep the date-keyed series chronological.
        let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        let mut by_week: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        let mut by_worker: HashMap<&str, f64> = HashMap::new();
        let mut by_client: HashMap<&str, f64> = HashMap::new();
        let mut by_case: HashMap<&str, f64> = HashMap::new();
        let mut by_sponsor: HashMap<&str, f64> = HashMap::new();
        let mut by_account_manager: HashMap<&str, f64> = HashMap::new();
        let mut consulting = 0.0;
        let mut hands_on = 0.0;
        let mut squad = 0.0;
        let mut internal = 0.0;

        for e in entries {
            *by_date.entry(e.date).or_insert(0.0) += e.hours;
            *by_week.entry(week_calendar::week_start(e.date)).or_insert(0.0) += e.hours;
            *by_worker.entry(e.worker_name.as_str()).or_insert(0.0) += e.hours;
            *by_client.entry(e.client_name.as_str()).or_insert(0.0) += e.hours;
            *by_case.entry(e.case_title.as_str()).or_insert(0.0) += e.hours;
            if let Some(sponsor) = &e.sponsor {
                *by_sponsor.entry(sponsor.as_str()).or_insert(0.0) += e.hours;
            }
            if let Some(manager) = &e.account_manager_name {
                *by_account_manager.entry(manager.as_str()).or_insert(0.0) += e.hours;
            }
            match e.kind {
                Kind::Consulting => consulting += e.hours,
                Kind::HandsOn => hands_on += e.hours,
                Kind::Squad => squad += e.hours,
                Kind::Internal => internal += e.hours,
            }
        }

        let totals = |map: &HashMap<&str, f64>| map.values().copied().collect::<Vec<f64>>();
        let (avg_entry, std_entry) = spread(&per_entry);
        let (avg_day, std_day) = spread(&by_date.values().copied().collect::<Vec<f64>>());
        let (avg_week, std_week) = spread(&by_week.values().copied().collect::<Vec<f64>>());
        let (avg_worker, std_worker) = spread(&totals(&by_worker));
        let (avg_client, std_client) = spread(&totals(&by_client));
        let (avg_case, std_case) = spread(&totals(&by_case));
        let (avg_sponsor, std_sponsor) = spread(&totals(&by_sponsor));
        let (avg_manager, std_manager) = spread(&totals(&by_account_manager));

        SummaryStatistics {
            total_entries: entries.len(),
            total_hours,
            unique_workers: by_worker.len(),
            unique_clients: by_client.len(),
            unique_cases: by_case.len(),
            unique_sponsors: by_sponsor.len(),
            unique_account_managers: by_account_manager.len(),
            unique_weeks: by_week.len(),
            unique_working_days: by_date.len(),
            average_hours_per_entry: avg_entry,
            std_dev_hours_per_entry: std_entry,
            average_hours_per_day: avg_day,
            std_dev_hours_per_day: std_day,
            average_hours_per_worker: avg_worker,
            std_dev_hours_per_worker: std_worker,
            average_hours_per_client: avg_client,
            std_dev_hours_per_client: std_client,
            average_hours_per_case: avg_case,
            std_dev_hours_per_case: std_case,
            average_hours_per_sponsor: avg_sponsor,
            std_dev_hours_per_sponsor: std_sponsor,
            average_hours_per_account_manager: avg_manager,
            std_dev_hours_per_account_manager: std_manager,
            average_hours_per_week: avg_week,
            std_dev_hours_per_week: std_week,
            total_consulting_hours: consulting,
            total_hands_on_hours: hands_on,
            total_squad_hours: squad,
            total_internal_hours: internal,
            weekly_hours: by_week
                .iter()
                .map(|(start, hours)| WeekHours {
                    week: week_calendar::week_label(*start),
                    hours: *hours,
                })
                .collect(),
        }
    }
}

// --- Grouped summaries ---

/// Grouping axes for drill-down summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dimension {
    Worker,
    Client,
    Case,
    Sponsor,
    AccountManager,
    Date,
    Week,
    Offer,
    Kind,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Unknown grouping dimension '{0}'")]
pub struct UnknownDimension(pub String);

impl FromStr for Dimension {
    type Err = UnknownDimension;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "worker" => Ok(Dimension::Worker),
            "client" => Ok(Dimension::Client),
            "case" => Ok(Dimension::Case),
            "sponsor" => Ok(Dimension::Sponsor),
            "account-manager" | "accountManager" => Ok(Dimension::AccountManager),
            "date" => Ok(Dimension::Date),
            "week" => Ok(Dimension::Week),
            "offer" => Ok(Dimension::Offer),
            "kind" => Ok(Dimension::Kind),
            other => Err(UnknownDimension(other.to_string())),
        }
    }
}

impl Dimension {
    /// Group label for a row; rows without a value for the axis are skipped.
    fn label_of(&self, entry: &TimeEntry) -> Option<String> {
        match self {
            Dimension::Worker => Some(entry.worker_name.clone()),
            Dimension::Client => Some(entry.client_name.clone()),
            Dimension::Case => Some(entry.case_title.clone()),
            Dimension::Sponsor => entry.sponsor.clone(),
            Dimension::AccountManager => entry.account_manager_name.clone(),
            Dimension::Date => Some(entry.date.format("%Y-%m-%d").to_string()),
            Dimension::Week => Some(entry.week.clone()),
            Dimension::Offer => entry.products_or_services.clone(),
            Dimension::Kind => Some(entry.kind.to_string()),
        }
    }

    fn sort_date(&self, entry: &TimeEntry) -> Option<NaiveDate> {
        match self {
            Dimension::Date => Some(entry.date),
            Dimension::Week => Some(week_calendar::week_start(entry.date)),
            _ => None,
        }
    }
}

/// One group of a drill-down: its label, the full summary statistics of its
/// rows, and optional one-level-deeper child groups.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedSummary {
    pub label: String,
    #[serde(flatten)]
    pub stats: SummaryStatistics,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<GroupedSummary>,
}

/// Groups rows along one dimension. Calendar dimensions come back in
/// chronological order; every other dimension by descending hours with ties
/// broken by label.
pub fn group_by(entries: &[TimeEntry], dimension: Dimension) -> Vec<GroupedSummary> {
    group_with_children(entries, dimension, None)
}

/// Same as [`group_by`] but each group additionally carries child groups
/// along `child` one level down.
pub fn group_with_children(
    entries: &[TimeEntry],
    dimension: Dimension,
    child: Option<Dimension>,
) -> Vec<GroupedSummary> {
    struct Bucket {
        sort_date: Option<NaiveDate>,
        hours: f64,
        rows: Vec<TimeEntry>,
    }

    let mut buckets: HashMap<String, Bucket> = HashMap::new();
    for entry in entries {
        let Some(label) = dimension.label_of(entry) else {
            continue;
        };
        let bucket = buckets.entry(label).or_insert_with(|| Bucket {
            sort_date: dimension.sort_date(entry),
            hours: 0.0,
            rows: Vec::new(),
        });
        bucket.hours += entry.hours;
        bucket.rows.push(entry.clone());
    }

    let mut ordered: Vec<(String, Bucket)> = buckets.into_iter().collect();
    if matches!(dimension, Dimension::Date | Dimension::Week) {
        ordered.sort_by_key(|(_, b)| b.sort_date);
    } else {
        ordered.sort_by(|(label_a, a), (label_b, b)| {
            b.hours
                .partial_cmp(&a.hours)
                .unwrap_or(Ordering::Equal)
                .then_with(|| label_a.cmp(label_b))
        });
    }

    ordered
        .into_iter()
        .map(|(label, bucket)| GroupedSummary {
            label,
            stats: SummaryStatistics::from_entries(&bucket.rows),
            children: match child {
                Some(child_dim) => group_by(&bucket.rows, child_dim),
                None => Vec::new(),
            },
        })
        .collect()
}
