//! Reposition date computation.
//!
//! Dates always roll forward from the order's previous scheduled date, never
//! from the wall clock, so a late confirmation does not drift the cycle.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Next reposition date after a confirmed delivery.
///
/// The client's periodicity is anchored on the previous scheduled date.
#[must_use]
pub fn next_delivery_date(previous: NaiveDate, periodicity_days: i64) -> NaiveDate {
    previous + Duration::days(periodicity_days)
}

/// Next reposition date after a confirmed return: the first business day
/// strictly after the previous scheduled date (Saturday/Sunday skipped).
#[must_use]
pub fn next_business_day(previous: NaiveDate) -> NaiveDate {
    let mut date = previous + Duration::days(1);
    while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        date += Duration::days(1);
    }
    date
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_next_delivery_date_anchored_on_previous() {
        assert_eq!(next_delivery_date(date(2024, 3, 4), 7), date(2024, 3, 11));
        assert_eq!(next_delivery_date(date(2024, 3, 4), 14), date(2024, 3, 18));
        assert_eq!(next_delivery_date(date(2024, 2, 28), 2), date(2024, 3, 1));
    }

    #[test]
    fn test_next_business_day_midweek() {
        // Monday -> Tuesday
        assert_eq!(next_business_day(date(2024, 3, 4)), date(2024, 3, 5));
        // Thursday -> Friday
        assert_eq!(next_business_day(date(2024, 3, 7)), date(2024, 3, 8));
    }

    #[test]
    fn test_next_business_day_skips_weekend() {
        // Friday -> Monday
        assert_eq!(next_business_day(date(2024, 3, 8)), date(2024, 3, 11));
        // Saturday -> Monday
        assert_eq!(next_business_day(date(2024, 3, 9)), date(2024, 3, 11));
        // Sunday -> Monday
        assert_eq!(next_business_day(date(2024, 3, 10)), date(2024, 3, 11));
    }
}
