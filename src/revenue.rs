// src/revenue.rs

use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

use crate::business_calendar::{first_day_of_month, last_day_of_month, HolidayCalendar};
use crate::filters::{FieldOptions, FilterEntry, CASE_FIELDS};
use crate::records::{Case, EngagementKind, TimeEntry};
use crate::week_calendar;

/// Weekly approved hours are quoted per five-workday week.
pub const WORKDAYS_PER_WEEK: f64 = 5.0;

/// Same calendar day `months` months earlier, clamped into shorter months.
pub fn months_back(date: NaiveDate, months: u32) -> NaiveDate {
    let mut year = date.year();
    let mut month = date.month() as i32 - months as i32;
    while month < 1 {
        month += 12;
        year -= 1;
    }
    let first = NaiveDate::from_ymd_opt(year, month as u32, 1).unwrap();
    let day = date.day().min(last_day_of_month(first).day());
    NaiveDate::from_ymd_opt(year, month as u32, day).unwrap()
}

// --- Approved-versus-actual reconciliation ---

/// One Sunday-start week of a case's approval reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseApprovalWeek {
    pub week: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub approved_hours: f64,
    pub actual_hours: f64,
    /// Approved minus actual; negative when the team overshot.
    pub difference: f64,
}

/// Approved-versus-actual hours for one case, week by week, across every week
/// overlapping the inclusive `[start, end]` range.
pub fn case_approval_weeks(
    case: &Case,
    entries: &[TimeEntry],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<CaseApprovalWeek> {
    let approved = case.weekly_approved_hours.unwrap_or(0.0);
    let mut weeks = Vec::new();
    let mut week_start = week_calendar::week_start(start);
    while week_start <= end {
        let week_end = week_start + Duration::days(6);
        let actual: f64 = entries
            .iter()
            .filter(|e| e.case_id == case.id && e.date >= week_start && e.date <= week_end)
            .map(|e| e.hours)
            .sum();
        weeks.push(CaseApprovalWeek {
            week: week_calendar::week_label(week_start),
            start: week_start,
            end: week_end,
            approved_hours: approved,
            actual_hours: actual,
            difference: approved - actual,
        });
        week_start += Duration::days(7);
    }
    weeks
}

// --- Revenue tracking ---

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseRevenue {
    pub case_title: String,
    pub case_slug: String,
    pub kind: EngagementKind,
    pub pre_contracted: bool,
    /// Hours expected for the month; zero for fixed-value engagements.
    pub expected_hours: f64,
    pub rate: Option<Decimal>,
    pub fee: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRevenue {
    pub client_name: String,
    pub consulting_fee: Decimal,
    pub consulting_pre_fee: Decimal,
    pub hands_on_fee: Decimal,
    pub squad_fee: Decimal,
    pub total_fee: Decimal,
    pub cases: Vec<CaseRevenue>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueTracking {
    pub date_of_interest: NaiveDate,
    pub clients: Vec<ClientRevenue>,
    pub total_consulting_fee: Decimal,
    pub total_consulting_pre_fee: Decimal,
    pub total_hands_on_fee: Decimal,
    pub total_squad_fee: Decimal,
    pub total_fee: Decimal,
    pub filterable_fields: Vec<FieldOptions>,
}

/// Expected fees for the month containing `date_of_interest`, per client.
///
/// Hourly engagements project `weekly_approved_hours / 5` across the month's
/// business days inside the contract and tracker window; the fee applies the
/// consulting rate in cents. Pre-contracted cases report their fixed value
/// under the tracker's kind instead. Cases without the metadata to price
/// either way are skipped.
pub fn revenue_tracking(
    cases: &[Case],
    calendar: &HolidayCalendar,
    date_of_interest: NaiveDate,
    account_manager: Option<&str>,
    filters: &[FilterEntry],
) -> RevenueTracking {
    let population: Vec<Case> = cases
        .iter()
        .filter(|c| c.is_active && c.contract_contains(date_of_interest))
        .cloned()
        .collect();
    let (population, filterable_fields) = CASE_FIELDS.apply(population, filters);
    let population: Vec<Case> = match account_manager {
        Some(manager) => population
            .into_iter()
            .filter(|c| c.matches_account_manager(manager))
            .collect(),
        None => population,
    };

    let mut clients: BTreeMap<String, ClientRevenue> = BTreeMap::new();
    for case in &population {
        let Some(revenue) = case_revenue_for_month(case, calendar, date_of_interest) else {
            debug!("Skipping case without pricing metadata: {}", case.slug);
            continue;
        };
        let client = clients
            .entry(case.client_name.clone())
            .or_insert_with(|| ClientRevenue {
                client_name: case.client_name.clone(),
                consulting_fee: Decimal::ZERO,
                consulting_pre_fee: Decimal::ZERO,
                hands_on_fee: Decimal::ZERO,
                squad_fee: Decimal::ZERO,
                total_fee: Decimal::ZERO,
                cases: Vec::new(),
            });
        match (revenue.kind, revenue.pre_contracted) {
            (EngagementKind::Consulting, false) => client.consulting_fee += revenue.fee,
            (EngagementKind::Consulting, true) => client.consulting_pre_fee += revenue.fee,
            (EngagementKind::HandsOn, _) => client.hands_on_fee += revenue.fee,
            (EngagementKind::Squad, _) => client.squad_fee += revenue.fee,
        }
        client.total_fee += revenue.fee;
        client.cases.push(revenue);
    }

    let mut clients: Vec<ClientRevenue> = clients.into_values().collect();
    clients.sort_by(|a, b| {
        b.total_fee
            .cmp(&a.total_fee)
            .then_with(|| a.client_name.cmp(&b.client_name))
    });
    for client in &mut clients {
        client.cases.sort_by(|a, b| {
            b.fee.cmp(&a.fee).then_with(|| a.case_title.cmp(&b.case_title))
        });
    }

    let sum = |pick: fn(&ClientRevenue) -> Decimal| -> Decimal {
        clients.iter().map(pick).sum()
    };
    RevenueTracking {
        date_of_interest,
        total_consulting_fee: sum(|c| c.consulting_fee),
        total_consulting_pre_fee: sum(|c| c.consulting_pre_fee),
        total_hands_on_fee: sum(|c| c.hands_on_fee),
        total_squad_fee: sum(|c| c.squad_fee),
        total_fee: sum(|c| c.total_fee),
        clients,
        filterable_fields,
    }
}

fn case_revenue_for_month(
    case: &Case,
    calendar: &HolidayCalendar,
    date: NaiveDate,
) -> Option<CaseRevenue> {
    if let Some(value) = case.pre_contracted_value {
        let kind = case
            .tracker_info
            .first()
            .map(|t| t.kind)
            .unwrap_or(EngagementKind::Consulting);
        return Some(CaseRevenue {
            case_title: case.title.clone(),
            case_slug: case.slug.clone(),
            kind,
            pre_contracted: true,
            expected_hours: 0.0,
            rate: None,
            fee: value,
        });
    }

    let tracker = case.consulting_tracker()?;
    let rate = tracker.rate?;
    let approved = case.weekly_approved_hours?;

    let month_start = first_day_of_month(date);
    let month_end = last_day_of_month(date);
    let from = match case.start_of_contract {
        Some(start) => start.max(month_start),
        None => month_start,
    };
    let mut to = month_end;
    if let Some(due) = tracker.due_on {
        to = to.min(due);
    }
    if let Some(end) = case.end_of_contract {
        to = to.min(end);
    }

    let days = calendar.business_days(from, to).len();
    let expected_hours = approved / WORKDAYS_PER_WEEK * days as f64;
    let fee = Decimal::from_f64(expected_hours).unwrap_or_default() * rate / dec!(100);
    Some(CaseRevenue {
        case_title: case.title.clone(),
        case_slug: case.slug.clone(),
        kind: EngagementKind::Consulting,
        pre_contracted: false,
        expected_hours,
        rate: Some(rate),
        fee,
    })
}

// --- Month projection ---

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyExpected {
    pub date: NaiveDate,
    pub hours: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseProjection {
    pub case_title: String,
    pub case_slug: String,
    pub client_name: String,
    pub pre_contracted: bool,
    pub expected_hours: f64,
    pub weeks: Vec<CaseApprovalWeek>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthProjection {
    pub date_of_interest: NaiveDate,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Expected hours per business day of the month, all cases combined.
    pub expected_work_hours: Vec<DailyExpected>,
    /// Share of the daily expectation coming from pre-contracted cases.
    pub pre_contracted_expected_work_hours: Vec<DailyExpected>,
    pub total_expected_hours: f64,
    pub cases: Vec<CaseProjection>,
}

/// Distributes each active case's approved hours across the business days of
/// the month containing `date_of_interest`.
///
/// The week containing the month's first day contributes only its remaining
/// difference (approved minus already-logged, floored at zero); every later
/// week contributes its full approved hours. A week's contribution is spread
/// evenly over its business days that fall inside the month.
pub fn revenue_projection(
    cases: &[Case],
    entries: &[TimeEntry],
    calendar: &HolidayCalendar,
    date_of_interest: NaiveDate,
) -> MonthProjection {
    let month_start = first_day_of_month(date_of_interest);
    let month_end = last_day_of_month(date_of_interest);

    let mut daily: BTreeMap<NaiveDate, f64> = calendar
        .business_days(month_start, month_end)
        .into_iter()
        .map(|d| (d, 0.0))
        .collect();
    let mut pre_daily: BTreeMap<NaiveDate, f64> = daily.clone();

    let mut case_projections = Vec::new();
    for case in cases.iter().filter(|c| c.is_active) {
        if case.weekly_approved_hours.is_none() {
            continue;
        }
        let weeks = case_approval_weeks(case, entries, month_start, month_end);
        let mut case_total = 0.0;
        for (index, week) in weeks.iter().enumerate() {
            let contribution = if index == 0 {
                week.difference.max(0.0)
            } else {
                week.approved_hours
            };
            let days = calendar.business_days(week.start.max(month_start), week.end.min(month_end));
            if days.is_empty() {
                continue;
            }
            let per_day = contribution / days.len() as f64;
            for day in days {
                *daily.entry(day).or_insert(0.0) += per_day;
                if case.is_pre_contracted() {
                    *pre_daily.entry(day).or_insert(0.0) += per_day;
                }
            }
            case_total += contribution;
        }
        case_projections.push(CaseProjection {
            case_title: case.title.clone(),
            case_slug: case.slug.clone(),
            client_name: case.client_name.clone(),
            pre_contracted: case.is_pre_contracted(),
            expected_hours: case_total,
            weeks,
        });
    }

    case_projections.sort_by(|a, b| {
        b.expected_hours
            .partial_cmp(&a.expected_hours)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.case_title.cmp(&b.case_title))
    });

    let total_expected_hours = daily.values().sum();
    let series = |map: BTreeMap<NaiveDate, f64>| -> Vec<DailyExpected> {
        map.into_iter().map(|(date, hours)| DailyExpected { date, hours }).collect()
    };
    MonthProjection {
        date_of_interest,
        start: month_start,
        end: month_end,
        expected_work_hours: series(daily),
        pre_contracted_expected_work_hours: series(pre_daily),
        total_expected_hours,
        cases: case_projections,
    }
}

// --- Forecast ---

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastColumns {
    pub in_analysis: Decimal,
    pub one_month_ago: Decimal,
    pub two_months_ago: Decimal,
    pub three_months_ago: Decimal,
    pub same_day_one_month_ago: Decimal,
    pub same_day_two_months_ago: Decimal,
    pub same_day_three_months_ago: Decimal,
}

impl ForecastColumns {
    fn is_zero(&self) -> bool {
        *self == ForecastColumns::default()
    }

    fn add(&mut self, other: &ForecastColumns) {
        self.in_analysis += other.in_analysis;
        self.one_month_ago += other.one_month_ago;
        self.two_months_ago += other.two_months_ago;
        self.three_months_ago += other.three_months_ago;
        self.same_day_one_month_ago += other.same_day_one_month_ago;
        self.same_day_two_months_ago += other.same_day_two_months_ago;
        self.same_day_three_months_ago += other.same_day_three_months_ago;
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientForecast {
    pub client_name: String,
    #[serde(flatten)]
    pub fees: ForecastColumns,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastKind {
    pub clients: Vec<ClientForecast>,
    pub totals: ForecastColumns,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastByKind {
    pub squad: ForecastKind,
    pub consulting_pre: ForecastKind,
    pub hands_on: ForecastKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Forecast {
    pub date_of_interest: NaiveDate,
    pub by_kind: ForecastByKind,
}

/// Compares fixed (pre-contracted) revenue against the three prior months.
///
/// Revenue tracking runs at the date of interest, at the same calendar day
/// one, two and three months earlier, and at each of those months' last day.
/// The month-end runs fill the `*_months_ago` columns; the same-day runs
/// support mid-month comparisons. Clients with all-zero rows are dropped.
pub fn forecast(
    cases: &[Case],
    calendar: &HolidayCalendar,
    date_of_interest: NaiveDate,
) -> Forecast {
    let references: [NaiveDate; 7] = [
        date_of_interest,
        last_day_of_month(months_back(date_of_interest, 1)),
        last_day_of_month(months_back(date_of_interest, 2)),
        last_day_of_month(months_back(date_of_interest, 3)),
        months_back(date_of_interest, 1),
        months_back(date_of_interest, 2),
        months_back(date_of_interest, 3),
    ];
    let runs: Vec<RevenueTracking> = references
        .iter()
        .map(|date| revenue_tracking(cases, calendar, *date, None, &[]))
        .collect();

    let by_kind = |pick: fn(&ClientRevenue) -> Decimal| -> ForecastKind {
        let mut rows: BTreeMap<String, ForecastColumns> = BTreeMap::new();
        for (index, run) in runs.iter().enumerate() {
            for client in &run.clients {
                let fee = pick(client);
                if fee == Decimal::ZERO {
                    continue;
                }
                let columns = rows.entry(client.client_name.clone()).or_default();
                match index {
                    0 => columns.in_analysis += fee,
                    1 => columns.one_month_ago += fee,
                    2 => columns.two_months_ago += fee,
                    3 => columns.three_months_ago += fee,
                    4 => columns.same_day_one_month_ago += fee,
                    5 => columns.same_day_two_months_ago += fee,
                    _ => columns.same_day_three_months_ago += fee,
                }
            }
        }
        let mut totals = ForecastColumns::default();
        let clients: Vec<ClientForecast> = rows
            .into_iter()
            .filter(|(_, columns)| !columns.is_zero())
            .map(|(client_name, fees)| {
                totals.add(&fees);
                ClientForecast { client_name, fees }
            })
            .collect();
        ForecastKind { clients, totals }
    };

    Forecast {
        date_of_interest,
        by_kind: ForecastByKind {
            squad: by_kind(|c| c.squad_fee),
            consulting_pre: by_kind(|c| c.consulting_pre_fee),
            hands_on: by_kind(|c| c.hands_on_fee),
        },
    }
}
