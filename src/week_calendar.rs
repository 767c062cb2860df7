// src/week_calendar.rs

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};

// Every report window in the crate is aligned to Sunday-start weeks. A week
// runs Sunday 00:00:00.000000 through Saturday 23:59:59.999999, timezone-naive.

/// Sunday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_sunday() as i64)
}

/// Saturday of the week containing `date`.
pub fn week_end(date: NaiveDate) -> NaiveDate {
    week_start(date) + Duration::days(6)
}

/// Inclusive datetime bounds of the week containing `date`.
pub fn week_bounds(date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = week_start(date);
    (start.and_time(NaiveTime::MIN), end_of_day(start + Duration::days(6)))
}

/// Window covering the week of `reference` plus the `n` whole weeks before it.
///
/// The start is the Sunday opening the week `n * 7` days before `reference`;
/// the end is the Saturday closing the reference week.
pub fn n_weeks_window(n: u32, reference: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let (start, _) = week_bounds(reference - Duration::days(n as i64 * 7));
    let (_, end) = week_bounds(reference);
    (start, end)
}

/// Canonical `"DD/MM - DD/MM"` label for the week containing `date`.
pub fn week_label(date: NaiveDate) -> String {
    let start = week_start(date);
    let end = start + Duration::days(6);
    format!("{} - {}", start.format("%d/%m"), end.format("%d/%m"))
}

/// Label of the week `n` weeks before the one containing `reference`.
pub fn previous_week_label(n: u32, reference: NaiveDate) -> String {
    week_label(reference - Duration::days(n as i64 * 7))
}

fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn d(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| panic!("Invalid date string format: {}", date_str))
    }

    #[test]
    fn week_of_a_wednesday_runs_sunday_through_saturday() {
        // 2023-05-10 is a Wednesday.
        let (start, end) = week_bounds(d("2023-05-10"));
        assert_eq!(start.date(), d("2023-05-07"));
        assert_eq!(start.time(), NaiveTime::MIN);
        assert_eq!(end.date(), d("2023-05-13"));
        assert_eq!(end.time(), NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).unwrap());
    }

    #[test]
    fn sunday_is_its_own_week_start() {
        let sunday = d("2023-05-07");
        assert_eq!(week_start(sunday), sunday);
        assert_eq!(week_end(sunday), d("2023-05-13"));
    }

    #[test]
    fn saturday_closes_the_week_it_opens_nothing() {
        let saturday = d("2023-05-13");
        assert_eq!(week_start(saturday), d("2023-05-07"));
        assert_eq!(week_end(saturday), saturday);
    }

    #[test]
    fn bounds_always_start_sunday_and_end_saturday() {
        let mut date = d("2023-01-01");
        while date <= d("2023-03-01") {
            let (start, end) = week_bounds(date);
            assert_eq!(start.weekday(), Weekday::Sun, "start of week for {}", date);
            assert_eq!(end.weekday(), Weekday::Sat, "end of week for {}", date);
            assert!(start.date() <= date && date <= end.date());
            date += Duration::days(1);
        }
    }

    #[test]
    fn four_week_window_reaches_back_to_the_right_sunday() {
        let (start, end) = n_weeks_window(4, d("2023-05-13"));
        assert_eq!(start.date(), d("2023-04-09"));
        assert_eq!(start.time(), NaiveTime::MIN);
        assert_eq!(end.date(), d("2023-05-13"));
        assert_eq!(end.time(), NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).unwrap());
    }

    #[test]
    fn window_start_is_n_weeks_before_the_reference_week() {
        for n in 1..=8u32 {
            let reference = d("2023-05-10");
            let (start, end) = n_weeks_window(n, reference);
            let (ref_start, ref_end) = week_bounds(reference);
            assert_eq!(end, ref_end);
            assert_eq!(start.date(), ref_start.date() - Duration::days(n as i64 * 7));
        }
    }

    #[test]
    fn label_uses_day_slash_month_for_both_ends() {
        assert_eq!(week_label(d("2023-05-10")), "07/05 - 13/05");
        // Week straddling a month boundary.
        assert_eq!(week_label(d("2023-05-01")), "30/04 - 06/05");
        // Week straddling a year boundary.
        assert_eq!(week_label(d("2023-01-02")), "01/01 - 07/01");
        assert_eq!(week_label(d("2022-12-31")), "25/12 - 31/12");
    }

    #[test]
    fn previous_week_labels_walk_backwards() {
        let reference = d("2023-05-10");
        assert_eq!(previous_week_label(0, reference), "07/05 - 13/05");
        assert_eq!(previous_week_label(1, reference), "30/04 - 06/05");
        assert_eq!(previous_week_label(2, reference), "23/04 - 29/04");
    }
}
