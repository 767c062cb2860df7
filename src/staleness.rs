// src/staleness.rs

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use crate::records::{Case, TimeEntry};

pub const STALE_AFTER_DAYS: i64 = 30;
pub const STALE_WARNING_DAYS: i64 = 21;
pub const NEW_CASE_GRACE_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StalenessStatus {
    Stale,
    StaleInOneWeek,
    NoDescription,
    UpToDate,
}

/// Classifies one case's update hygiene.
///
/// The order is a policy: the new-case grace period wins over every other
/// condition, then a missing description, then the age of the last update. A
/// case past the grace period that was never updated measures its staleness
/// from the creation timestamp.
pub fn classify_case(case: &Case, now: NaiveDateTime) -> StalenessStatus {
    let age_days = (now - case.created_at).num_days();
    if case.last_updated.is_none() && age_days < NEW_CASE_GRACE_DAYS {
        return StalenessStatus::UpToDate;
    }
    if !case.has_description {
        return StalenessStatus::NoDescription;
    }
    let idle_days = (now - case.last_updated.unwrap_or(case.created_at)).num_days();
    if idle_days > STALE_AFTER_DAYS {
        StalenessStatus::Stale
    } else if idle_days >= STALE_WARNING_DAYS {
        StalenessStatus::StaleInOneWeek
    } else {
        StalenessStatus::UpToDate
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseStaleness {
    pub case_title: String,
    pub case_slug: String,
    pub client_name: String,
    pub last_updated: Option<NaiveDateTime>,
    pub days_since_update: i64,
    /// Workers who logged time on the case inside the recent-entry window.
    pub workers: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StalenessReport {
    pub stale_cases: Vec<CaseStaleness>,
    pub stale_in_one_week_cases: Vec<CaseStaleness>,
    pub no_description_cases: Vec<CaseStaleness>,
    pub up_to_date_cases: Vec<CaseStaleness>,
}

/// Buckets every active case by staleness. `recent_entries` should already be
/// limited to the trailing review window; they only attribute workers.
pub fn staleness_report(
    cases: &[Case],
    recent_entries: &[TimeEntry],
    now: NaiveDateTime,
) -> StalenessReport {
    let mut workers_by_case: HashMap<&str, BTreeSet<&str>> = HashMap::new();
    for entry in recent_entries {
        workers_by_case
            .entry(entry.case_id.as_str())
            .or_default()
            .insert(entry.worker_name.as_str());
    }

    let mut report = StalenessReport::default();
    for case in cases.iter().filter(|c| c.is_active) {
        let reference = case.last_updated.unwrap_or(case.created_at);
        let item = CaseStaleness {
            case_title: case.title.clone(),
            case_slug: case.slug.clone(),
            client_name: case.client_name.clone(),
            last_updated: case.last_updated,
            days_since_update: (now - reference).num_days(),
            workers: workers_by_case
                .get(case.id.as_str())
                .map(|set| set.iter().map(|w| w.to_string()).collect())
                .unwrap_or_default(),
        };
        match classify_case(case, now) {
            StalenessStatus::Stale => report.stale_cases.push(item),
            StalenessStatus::StaleInOneWeek => report.stale_in_one_week_cases.push(item),
            StalenessStatus::NoDescription => report.no_description_cases.push(item),
            StalenessStatus::UpToDate => report.up_to_date_cases.push(item),
        }
    }

    // Longest-idle first inside every bucket.
    for bucket in [
        &mut report.stale_cases,
        &mut report.stale_in_one_week_cases,
        &mut report.no_description_cases,
        &mut report.up_to_date_cases,
    ] {
        bucket.sort_by(|a, b| {
            b.days_since_update
                .cmp(&a.days_since_update)
                .then_with(|| a.case_title.cmp(&b.case_title))
        });
    }
    report
}
