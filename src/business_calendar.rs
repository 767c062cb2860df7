// src/business_calendar.rs

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A dated public holiday as delivered by the regional holiday source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
}

/// Business-day arithmetic over a set of regional holidays.
///
/// A business day is Monday through Friday excluding any date in the holiday
/// set. Weekend holidays are carried in the set but never subtract a workday.
#[derive(Debug, Clone, Default)]
pub struct HolidayCalendar {
    holidays: BTreeMap<NaiveDate, String>,
}

impl HolidayCalendar {
    pub fn new(holidays: impl IntoIterator<Item = Holiday>) -> Self {
        Self {
            holidays: holidays.into_iter().map(|h| (h.date, h.name)).collect(),
        }
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains_key(&date)
    }

    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.is_holiday(date)
    }

    /// Business days in the inclusive range. Empty when `start > end`.
    pub fn business_days(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        let mut days = Vec::new();
        let mut date = start;
        while date <= end {
            if self.is_business_day(date) {
                days.push(date);
            }
            date += Duration::days(1);
        }
        days
    }

    /// Holidays falling inside the inclusive range, in date order. Empty when
    /// `start > end`.
    pub fn holidays_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<(NaiveDate, String)> {
        if start > end {
            return Vec::new();
        }
        self.holidays
            .range(start..=end)
            .map(|(date, name)| (*date, name.clone()))
            .collect()
    }

    /// Business days of one calendar month. Empty for an invalid month number.
    pub fn working_days_in_month(&self, year: i32, month: u32) -> Vec<NaiveDate> {
        let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
            return Vec::new();
        };
        let last = last_day_of_month(first);
        self.business_days(first, last)
    }

    pub fn len(&self) -> usize {
        self.holidays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holidays.is_empty()
    }
}

/// Last calendar day of the month containing `date`.
pub fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap() - Duration::days(1)
}

/// First calendar day of the month containing `date`.
pub fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| panic!("Invalid date string format: {}", date_str))
    }

    fn calendar_with(dates: &[(&str, &str)]) -> HolidayCalendar {
        HolidayCalendar::new(dates.iter().map(|(date, name)| Holiday {
            date: d(date),
            name: name.to_string(),
        }))
    }

    #[test]
    fn weekends_are_never_business_days() {
        let calendar = HolidayCalendar::default();
        // 2023-05-07 is a Sunday, 2023-05-13 a Saturday.
        let days = calendar.business_days(d("2023-05-07"), d("2023-05-13"));
        assert_eq!(
            days,
            vec![d("2023-05-08"), d("2023-05-09"), d("2023-05-10"), d("2023-05-11"), d("2023-05-12")]
        );
    }

    #[test]
    fn holidays_on_weekdays_are_excluded() {
        let calendar = calendar_with(&[("2023-05-10", "Mid-week holiday")]);
        let days = calendar.business_days(d("2023-05-08"), d("2023-05-12"));
        assert_eq!(days, vec![d("2023-05-08"), d("2023-05-09"), d("2023-05-11"), d("2023-05-12")]);
    }

    #[test]
    fn weekend_holiday_does_not_double_subtract() {
        // 2023-05-13 is already a Saturday.
        let calendar = calendar_with(&[("2023-05-13", "Weekend holiday")]);
        let days = calendar.business_days(d("2023-05-08"), d("2023-05-14"));
        assert_eq!(days.len(), 5);
    }

    #[test]
    fn inverted_range_is_empty_not_an_error() {
        let calendar = HolidayCalendar::default();
        assert!(calendar.business_days(d("2023-05-12"), d("2023-05-08")).is_empty());
        assert!(calendar.holidays_in_range(d("2023-05-12"), d("2023-05-08")).is_empty());
    }

    #[test]
    fn holidays_in_range_come_back_dated_and_named() {
        let calendar = calendar_with(&[
            ("2023-05-01", "Labour Day"),
            ("2023-06-08", "Corpus Christi"),
            ("2023-12-25", "Christmas"),
        ]);
        let listed = calendar.holidays_in_range(d("2023-05-01"), d("2023-06-30"));
        assert_eq!(
            listed,
            vec![
                (d("2023-05-01"), "Labour Day".to_string()),
                (d("2023-06-08"), "Corpus Christi".to_string()),
            ]
        );
    }

    #[test]
    fn february_2023_has_twenty_working_days() {
        let calendar = HolidayCalendar::default();
        assert_eq!(calendar.working_days_in_month(2023, 2).len(), 20);
    }

    #[test]
    fn invalid_month_yields_empty() {
        let calendar = HolidayCalendar::default();
        assert!(calendar.working_days_in_month(2023, 13).is_empty());
    }

    #[test]
    fn month_edges() {
        assert_eq!(first_day_of_month(d("2023-05-10")), d("2023-05-01"));
        assert_eq!(last_day_of_month(d("2023-05-10")), d("2023-05-31"));
        assert_eq!(last_day_of_month(d("2023-02-14")), d("2023-02-28"));
        assert_eq!(last_day_of_month(d("2024-02-14")), d("2024-02-29"));
        assert_eq!(last_day_of_month(d("2023-12-05")), d("2023-12-31"));
    }
}
