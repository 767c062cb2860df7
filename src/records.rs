// src/records.rs

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::week_calendar;

// --- Work kinds ---

/// Category of logged work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    Consulting,
    HandsOn,
    Squad,
    Internal,
}

impl Kind {
    pub const ALL: [Kind; 4] = [Kind::Consulting, Kind::HandsOn, Kind::Squad, Kind::Internal];

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Consulting => "Consulting",
            Kind::HandsOn => "HandsOn",
            Kind::Squad => "Squad",
            Kind::Internal => "Internal",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Unknown work kind '{0}'")]
pub struct UnknownKind(pub String);

impl FromStr for Kind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Consulting" | "consulting" => Ok(Kind::Consulting),
            "HandsOn" | "handsOn" | "hands_on" | "hands-on" => Ok(Kind::HandsOn),
            "Squad" | "squad" => Ok(Kind::Squad),
            "Internal" | "internal" => Ok(Kind::Internal),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

/// Engagement type named on a case's contract trackers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngagementKind {
    Consulting,
    HandsOn,
    Squad,
}

// --- Correctness labels ---

pub const CORRECTNESS_OK: &str = "OK";
pub const CORRECTNESS_ACCEPTABLE: &str = "Acceptable (1)";
pub const CORRECTNESS_EARLY_PREFIX: &str = "WTF -";

/// Buckets of how timely an entry was logged relative to the work date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Correctness {
    EarlyWtf,
    Ok,
    Acceptable,
    Late,
}

impl Correctness {
    /// Buckets a stored correctness label. The partition is exhaustive: any
    /// label that is neither OK, one-week-acceptable nor early counts as late.
    pub fn classify(label: &str) -> Correctness {
        if label.starts_with(CORRECTNESS_EARLY_PREFIX) {
            Correctness::EarlyWtf
        } else if label == CORRECTNESS_OK {
            Correctness::Ok
        } else if label == CORRECTNESS_ACCEPTABLE {
            Correctness::Acceptable
        } else {
            Correctness::Late
        }
    }
}

/// Derives the correctness label from the gap, in whole weeks, between the
/// week the work happened and the week the entry was created.
pub fn derive_correctness(date: NaiveDate, created_at: NaiveDateTime) -> String {
    let worked_week = week_calendar::week_start(date);
    let created_week = week_calendar::week_start(created_at.date());
    let weeks = (created_week - worked_week).num_days() / 7;
    if weeks < 0 {
        format!("{} {}", CORRECTNESS_EARLY_PREFIX, -weeks)
    } else if weeks == 0 {
        CORRECTNESS_OK.to_string()
    } else if weeks == 1 {
        CORRECTNESS_ACCEPTABLE.to_string()
    } else {
        format!("Late ({})", weeks)
    }
}

// --- Time entries ---

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Negative hours ({hours}) for {worker} on {date}")]
pub struct InvalidTimeEntry {
    pub worker: String,
    pub date: NaiveDate,
    pub hours: f64,
}

/// One row of logged time after ingestion normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub date: NaiveDate,
    pub hours: f64,
    pub worker_id: String,
    pub worker_name: String,
    pub worker_slug: String,
    pub client_id: String,
    pub client_name: String,
    pub case_id: String,
    pub case_title: String,
    #[serde(default)]
    pub sponsor: Option<String>,
    #[serde(default)]
    pub account_manager_name: Option<String>,
    pub kind: Kind,
    #[serde(default)]
    pub products_or_services: Option<String>,
    /// Canonical `"DD/MM - DD/MM"` label of the week containing `date`.
    #[serde(default)]
    pub week: String,
    pub created_at: NaiveDateTime,
    #[serde(default)]
    pub correctness: String,
    #[serde(default)]
    pub comment: Option<String>,
}

impl TimeEntry {
    /// Fills fields a raw row may omit: the week label and, when blank, the
    /// derived correctness classification.
    pub fn normalize(mut self) -> Self {
        if self.week.is_empty() {
            self.week = week_calendar::week_label(self.date);
        }
        if self.correctness.is_empty() {
            self.correctness = derive_correctness(self.date, self.created_at);
        }
        self
    }

    pub fn check_hours(&self) -> Result<(), InvalidTimeEntry> {
        if self.hours < 0.0 {
            return Err(InvalidTimeEntry {
                worker: self.worker_name.clone(),
                date: self.date,
                hours: self.hours,
            });
        }
        Ok(())
    }

    pub fn correctness_bucket(&self) -> Correctness {
        Correctness::classify(&self.correctness)
    }
}

// --- Cases ---

/// Rate or due-date information attached to a case's contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseTracker {
    pub kind: EngagementKind,
    /// Hourly rate in cents of the account currency.
    #[serde(default)]
    pub rate: Option<Decimal>,
    #[serde(default)]
    pub due_on: Option<NaiveDate>,
}

/// Engagement metadata a timesheet row points at through `case_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub client_name: String,
    #[serde(default)]
    pub account_manager_name: Option<String>,
    #[serde(default)]
    pub sponsor: Option<String>,
    #[serde(default)]
    pub offer_name: Option<String>,
    pub is_active: bool,
    #[serde(default)]
    pub weekly_approved_hours: Option<f64>,
    /// Fixed monthly value for pre-contracted engagements; such cases never
    /// enter the hourly fee projection.
    #[serde(default)]
    pub pre_contracted_value: Option<Decimal>,
    #[serde(default)]
    pub tracker_info: Vec<CaseTracker>,
    #[serde(default)]
    pub start_of_contract: Option<NaiveDate>,
    #[serde(default)]
    pub end_of_contract: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    #[serde(default)]
    pub last_updated: Option<NaiveDateTime>,
    #[serde(default)]
    pub has_description: bool,
}

impl Case {
    pub fn is_pre_contracted(&self) -> bool {
        self.pre_contracted_value.is_some()
    }

    /// First consulting tracker carrying a rate, if any.
    pub fn consulting_tracker(&self) -> Option<&CaseTracker> {
        self.tracker_info
            .iter()
            .find(|t| t.kind == EngagementKind::Consulting && t.rate.is_some())
    }

    /// Whether `date` falls inside the contract window. Missing bounds are
    /// open-ended.
    pub fn contract_contains(&self, date: NaiveDate) -> bool {
        if let Some(start) = self.start_of_contract {
            if date < start {
                return false;
            }
        }
        if let Some(end) = self.end_of_contract {
            if date > end {
                return false;
            }
        }
        true
    }

    /// Matches the account manager by display name or slug.
    pub fn matches_account_manager(&self, name_or_slug: &str) -> bool {
        match &self.account_manager_name {
            Some(name) => name == name_or_slug || slugify(name) == name_or_slug,
            None => false,
        }
    }
}

/// Lowercased, dash-separated form of a display name.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_dash = true;
    for c in name.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| panic!("Invalid date string format: {}", date_str))
    }

    fn dt(date_str: &str, hour: u32) -> NaiveDateTime {
        d(date_str).and_hms_opt(hour, 0, 0).unwrap()
    }

    #[test]
    fn entry_logged_in_the_work_week_is_ok() {
        // Work Wednesday, logged Friday of the same week.
        assert_eq!(derive_correctness(d("2023-05-10"), dt("2023-05-12", 17)), "OK");
    }

    #[test]
    fn entry_logged_one_week_late_is_acceptable() {
        assert_eq!(
            derive_correctness(d("2023-05-10"), dt("2023-05-16", 9)),
            "Acceptable (1)"
        );
    }

    #[test]
    fn entry_logged_two_weeks_late_is_late_two() {
        assert_eq!(derive_correctness(d("2023-05-10"), dt("2023-05-22", 9)), "Late (2)");
    }

    #[test]
    fn entry_logged_before_the_work_week_is_early() {
        assert_eq!(derive_correctness(d("2023-05-10"), dt("2023-05-05", 9)), "WTF - 1");
        assert_eq!(derive_correctness(d("2023-05-10"), dt("2023-04-25", 9)), "WTF - 2");
    }

    #[test]
    fn classification_partitions_every_label() {
        assert_eq!(Correctness::classify("OK"), Correctness::Ok);
        assert_eq!(Correctness::classify("Acceptable (1)"), Correctness::Acceptable);
        assert_eq!(Correctness::classify("WTF - 3"), Correctness::EarlyWtf);
        assert_eq!(Correctness::classify("Late (2)"), Correctness::Late);
        assert_eq!(Correctness::classify("anything else"), Correctness::Late);
    }

    #[test]
    fn kind_round_trips_through_strings() {
        for kind in Kind::ALL {
            assert_eq!(kind.as_str().parse::<Kind>().unwrap(), kind);
        }
        assert_eq!("handsOn".parse::<Kind>().unwrap(), Kind::HandsOn);
        assert!("Unknown".parse::<Kind>().is_err());
    }

    #[test]
    fn slugify_flattens_names() {
        assert_eq!(slugify("Ana Beatriz"), "ana-beatriz");
        assert_eq!(slugify("  João  da Silva "), "joão-da-silva");
        assert_eq!(slugify("X"), "x");
    }

    #[test]
    fn contract_window_bounds_are_inclusive() {
        let case = Case {
            id: "c1".to_string(),
            slug: "c1".to_string(),
            title: "Case".to_string(),
            client_name: "Client".to_string(),
            account_manager_name: None,
            sponsor: None,
            offer_name: None,
            is_active: true,
            weekly_approved_hours: None,
            pre_contracted_value: None,
            tracker_info: Vec::new(),
            start_of_contract: Some(d("2023-05-01")),
            end_of_contract: Some(d("2023-05-31")),
            created_at: dt("2023-01-01", 0),
            last_updated: None,
            has_description: true,
        };
        assert!(case.contract_contains(d("2023-05-01")));
        assert!(case.contract_contains(d("2023-05-31")));
        assert!(!case.contract_contains(d("2023-04-30")));
        assert!(!case.contract_contains(d("2023-06-01")));
    }
}
