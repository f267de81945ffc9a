use chrono::{Datelike, Days, NaiveDate};

use crate::time::TimeWindow;
use crate::{Error, Result};

/// How messages are chosen for deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    OlderThan { days: u32 },
    Window(TimeWindow),
}

impl Selection {
    /// Builds the server-side predicate. In window mode the predicate matches a superset of
    /// the window; the refiner narrows it back down.
    pub fn search_query(&self, today: NaiveDate) -> Result<String> {
        match self {
            Selection::OlderThan { days } => {
                let cutoff = today
                    .checked_sub_days(Days::new(u64::from(*days)))
                    .ok_or_else(|| {
                        Error::InvalidArgument(format!("--days {} is out of range", days))
                    })?;
                Ok(format!("BEFORE {}", imap_date(cutoff)))
            }
            Selection::Window(window) => {
                let start_day = window.start().date_naive();
                let since = format!("SINCE {}", imap_date(start_day));
                match window.end().date_naive().checked_add_days(Days::new(1)) {
                    Some(after_end) => Ok(format!("{} BEFORE {}", since, imap_date(after_end))),
                    None => Ok(since),
                }
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Selection::OlderThan { days } => format!("OLDER THAN {} DAYS", days),
            Selection::Window(window) => format!(
                "TIME RANGE {} .. {}",
                crate::format_timestamp(&window.start()),
                crate::format_timestamp(&window.end())
            ),
        }
    }
}

pub fn imap_date(date: NaiveDate) -> String {
    imap_date_from_parts(date.year(), date.month(), date.day())
}

fn imap_date_from_parts(year: i32, month: u32, day: u32) -> String {
    let month = match month {
        1 => "Jan",
        2 => "Feb",
        3 => "Mar",
        4 => "Apr",
        5 => "May",
        6 => "Jun",
        7 => "Jul",
        8 => "Aug",
        9 => "Sep",
        10 => "Oct",
        11 => "Nov",
        12 => "Dec",
        _ => "Jan",
    };
    format!("{:02}-{}-{}", day, month, year)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use super::{Selection, imap_date};
    use crate::time::TimeWindow;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn imap_dates_use_english_months_and_two_digit_days() {
        assert_eq!(imap_date(day(2024, 2, 1)), "01-Feb-2024");
        assert_eq!(imap_date(day(2023, 12, 25)), "25-Dec-2023");
    }

    #[test]
    fn older_than_counts_calendar_days_back_from_today() {
        let today = day(2025, 2, 1);
        let query = |days| Selection::OlderThan { days }.search_query(today).unwrap();
        assert_eq!(query(0), "BEFORE 01-Feb-2025");
        assert_eq!(query(7), "BEFORE 25-Jan-2025");
        // 2024 is a leap year, so a year back is 366 days.
        assert_eq!(query(366), "BEFORE 01-Feb-2024");
        assert_eq!(query(365), "BEFORE 02-Feb-2024");
    }

    #[test]
    fn window_adds_one_day_past_the_end() {
        let window = TimeWindow::parse("2023-06-10 09:00", "2023-06-10 10:00").unwrap();
        let query = Selection::Window(window).search_query(day(2025, 1, 1)).unwrap();
        assert_eq!(query, "SINCE 10-Jun-2023 BEFORE 11-Jun-2023");
    }

    #[test]
    fn window_crossing_month_and_year_boundaries() {
        let window = TimeWindow::parse("2023-12-31 23:00", "2023-12-31 23:59").unwrap();
        let query = Selection::Window(window).search_query(day(2025, 1, 1)).unwrap();
        assert_eq!(query, "SINCE 31-Dec-2023 BEFORE 01-Jan-2024");
    }

    #[test]
    fn window_predicate_covers_every_instant_in_range() {
        let window = TimeWindow::parse("2023-06-01 13:37", "2023-06-04 00:00").unwrap();
        let since = window.start().date_naive();
        let before = window.end().date_naive() + Duration::days(1);
        let mut instant = window.start();
        while instant <= window.end() {
            let date = instant.date_naive();
            assert!(since <= date && date < before, "{} not covered", instant);
            instant += Duration::minutes(17);
        }
    }

    #[test]
    fn out_of_range_day_count_is_an_argument_error() {
        let err = Selection::OlderThan { days: u32::MAX }
            .search_query(day(2025, 2, 1))
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
