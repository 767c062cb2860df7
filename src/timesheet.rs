// src/timesheet.rs

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::filters::{FieldOptions, FilterEntry, TIMESHEET_FIELDS};
use crate::records::{Correctness, Kind, TimeEntry};
use crate::week_calendar;

/// Whole weeks, before the reference week, covered by the rolling review
/// window used for timeliness and week reviews.
pub const REVIEW_WINDOW_WEEKS: u32 = 6;

/// Read-side aggregation over one immutable entry collection.
pub struct TimesheetAggregator<'a> {
    entries: &'a [TimeEntry],
}

impl<'a> TimesheetAggregator<'a> {
    pub fn new(entries: &'a [TimeEntry]) -> Self {
        Self { entries }
    }

    /// Rows whose date falls inside the inclusive day range.
    pub fn entries_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<TimeEntry> {
        self.entries
            .iter()
            .filter(|e| e.date >= start && e.date <= end)
            .cloned()
            .collect()
    }

    fn window_rows(
        &self,
        date_of_interest: NaiveDate,
        filters: &[FilterEntry],
    ) -> (Vec<TimeEntry>, Vec<FieldOptions>) {
        let (start, end) = week_calendar::n_weeks_window(REVIEW_WINDOW_WEEKS, date_of_interest);
        let rows = self.entries_between(start.date(), end.date());
        debug!(
            "Review window {} - {} holds {} entries",
            start.date(),
            end.date(),
            rows.len()
        );
        TIMESHEET_FIELDS.apply(rows, filters)
    }

    /// Partitions the trailing window into correctness buckets with per-worker
    /// breakdowns and percentage-of-hours shares.
    pub fn timeliness_review(
        &self,
        date_of_interest: NaiveDate,
        filters: &[FilterEntry],
    ) -> TimelinessReview {
        let (rows, filterable_fields) = self.window_rows(date_of_interest, filters);
        let (start, end) = week_calendar::n_weeks_window(REVIEW_WINDOW_WEEKS, date_of_interest);

        let total_entries = rows.len();
        let total_hours: f64 = rows.iter().map(|e| e.hours).sum();

        let mut partitions: HashMap<Correctness, Vec<&TimeEntry>> = HashMap::new();
        for row in &rows {
            partitions.entry(row.correctness_bucket()).or_default().push(row);
        }

        // With no hours at all the review reports full compliance: everything
        // that was logged (nothing) was logged on time.
        let bucket = |correctness: Correctness, zero_share: f64| {
            let members = partitions.get(&correctness).map(Vec::as_slice).unwrap_or(&[]);
            let hours: f64 = members.iter().map(|e| e.hours).sum();
            let percentage = if total_hours > 0.0 {
                hours / total_hours * 100.0
            } else {
                zero_share
            };
            TimelinessBucket {
                entries: members.len(),
                hours,
                percentage,
                workers: worker_breakdown(members),
            }
        };

        TimelinessReview {
            date_of_interest,
            start: start.date(),
            end: end.date(),
            total_entries,
            total_hours,
            early_wtf: bucket(Correctness::EarlyWtf, 0.0),
            ok: bucket(Correctness::Ok, 100.0),
            acceptable: bucket(Correctness::Acceptable, 0.0),
            late: bucket(Correctness::Late, 0.0),
            filterable_fields,
        }
    }

    /// Day-by-day analysis of the week containing `date_of_interest`, each day
    /// compared against its previous occurrences inside the review window.
    pub fn week_review(&self, date_of_interest: NaiveDate, filters: &[FilterEntry]) -> WeekReview {
        let (rows, filterable_fields) = self.window_rows(date_of_interest, filters);

        let mut by_date: HashMap<NaiveDate, DayHours> = HashMap::new();
        for row in &rows {
            by_date
                .entry(row.date)
                .or_insert_with(|| DayHours::zeroed(row.date))
                .add(row.kind, row.hours);
        }

        let week_start = week_calendar::week_start(date_of_interest);
        let mut days: Vec<DayAnalysis> = (0..7)
            .map(|offset| {
                let date = week_start + Duration::days(offset);
                day_analysis(date, &by_date)
            })
            .collect();

        // Vec built Sunday-first; pop in reverse to move the days out.
        let saturday = days.pop().unwrap();
        let friday = days.pop().unwrap();
        let thursday = days.pop().unwrap();
        let wednesday = days.pop().unwrap();
        let tuesday = days.pop().unwrap();
        let monday = days.pop().unwrap();
        let sunday = days.pop().unwrap();

        WeekReview {
            date_of_interest,
            week: week_calendar::week_label(date_of_interest),
            filterable_fields,
            sunday,
            monday,
            tuesday,
            wednesday,
            thursday,
            friday,
            saturday,
        }
    }

    /// Daily hour series per kind over an explicit date range.
    pub fn allocation(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        filters: &[FilterEntry],
    ) -> AllocationReport {
        let rows = self.entries_between(start, end);
        let (rows, filterable_fields) = TIMESHEET_FIELDS.apply(rows, filters);

        let mut series: HashMap<Kind, BTreeMap<NaiveDate, f64>> = HashMap::new();
        for row in &rows {
            *series.entry(row.kind).or_default().entry(row.date).or_insert(0.0) += row.hours;
        }

        let mut take = |kind: Kind| -> Vec<DailyHours> {
            series
                .remove(&kind)
                .unwrap_or_default()
                .into_iter()
                .map(|(date, hours)| DailyHours { date, hours })
                .collect()
        };

        AllocationReport {
            start,
            end,
            by_kind: AllocationByKind {
                consulting: take(Kind::Consulting),
                internal: take(Kind::Internal),
                hands_on: take(Kind::HandsOn),
                squad: take(Kind::Squad),
            },
            filterable_fields,
        }
    }
}

fn worker_breakdown(rows: &[&TimeEntry]) -> Vec<WorkerHours> {
    let mut by_worker: HashMap<(&str, &str), (usize, f64)> = HashMap::new();
    for row in rows {
        let slot = by_worker
            .entry((row.worker_name.as_str(), row.worker_slug.as_str()))
            .or_insert((0, 0.0));
        slot.0 += 1;
        slot.1 += row.hours;
    }
    let mut workers: Vec<WorkerHours> = by_worker
        .into_iter()
        .map(|((name, slug), (entries, hours))| WorkerHours {
            worker_name: name.to_string(),
            worker_slug: slug.to_string(),
            entries,
            hours,
        })
        .collect();
    workers.sort_by(|a, b| {
        b.hours
            .partial_cmp(&a.hours)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.worker_name.cmp(&b.worker_name))
    });
    workers
}

fn day_analysis(date: NaiveDate, by_date: &HashMap<NaiveDate, DayHours>) -> DayAnalysis {
    let lookup = |d: NaiveDate| by_date.get(&d).cloned().unwrap_or_else(|| DayHours::zeroed(d));

    let this_week = lookup(date);
    // Oldest occurrence first; zero-filled when nothing was logged.
    let history: Vec<DayHours> = (1..=REVIEW_WINDOW_WEEKS as i64)
        .rev()
        .map(|weeks_back| lookup(date - Duration::days(weeks_back * 7)))
        .collect();

    // Strict comparisons keep the earliest occurrence on ties.
    let mut best = history[0].clone();
    let mut worst = history[0].clone();
    for day in &history[1..] {
        if day.total > best.total {
            best = day.clone();
        }
        if day.total < worst.total {
            worst = day.clone();
        }
    }
    let average_hours = history.iter().map(|d| d.total).sum::<f64>() / history.len() as f64;

    DayAnalysis { date, this_week, history, best, worst, average_hours }
}

// --- Report shapes ---

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerHours {
    pub worker_name: String,
    pub worker_slug: String,
    pub entries: usize,
    pub hours: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinessBucket {
    pub entries: usize,
    pub hours: f64,
    /// Share of the window's total hours, in percent.
    pub percentage: f64,
    pub workers: Vec<WorkerHours>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinessReview {
    pub date_of_interest: NaiveDate,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub total_entries: usize,
    pub total_hours: f64,
    pub early_wtf: TimelinessBucket,
    pub ok: TimelinessBucket,
    pub acceptable: TimelinessBucket,
    pub late: TimelinessBucket,
    pub filterable_fields: Vec<FieldOptions>,
}

/// Hours logged on one date, split by kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayHours {
    pub date: NaiveDate,
    pub consulting: f64,
    pub hands_on: f64,
    pub squad: f64,
    pub internal: f64,
    pub total: f64,
}

impl DayHours {
    fn zeroed(date: NaiveDate) -> Self {
        DayHours { date, consulting: 0.0, hands_on: 0.0, squad: 0.0, internal: 0.0, total: 0.0 }
    }

    fn add(&mut self, kind: Kind, hours: f64) {
        match kind {
            Kind::Consulting => self.consulting += hours,
            Kind::HandsOn => self.hands_on += hours,
            Kind::Squad => self.squad += hours,
            Kind::Internal => self.internal += hours,
        }
        self.total += hours;
    }
}

/// One weekday of the reference week compared against its past occurrences.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayAnalysis {
    pub date: NaiveDate,
    pub this_week: DayHours,
    /// Previous same-weekday occurrences inside the window, oldest first.
    pub history: Vec<DayHours>,
    pub best: DayHours,
    pub worst: DayHours,
    pub average_hours: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekReview {
    pub date_of_interest: NaiveDate,
    pub week: String,
    pub filterable_fields: Vec<FieldOptions>,
    pub sunday: DayAnalysis,
    pub monday: DayAnalysis,
    pub tuesday: DayAnalysis,
    pub wednesday: DayAnalysis,
    pub thursday: DayAnalysis,
    pub friday: DayAnalysis,
    pub saturday: DayAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyHours {
    pub date: NaiveDate,
    pub hours: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationByKind {
    pub consulting: Vec<DailyHours>,
    pub internal: Vec<DailyHours>,
    pub hands_on: Vec<DailyHours>,
    pub squad: Vec<DailyHours>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationReport {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub by_kind: AllocationByKind,
    pub filterable_fields: Vec<FieldOptions>,
}
