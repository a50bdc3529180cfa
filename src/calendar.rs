//! Calendar arithmetic shared by the recurrence and invoice logic.
//!
//! Months stored in the database are zero-based indices (January is 0), which
//! is what [month_index] produces. Business days are Monday to Friday.

use time::{Date, Duration, Month, Weekday};

use crate::Error;

/// Whether `date` falls on a weekday.
pub fn is_business_day(date: Date) -> bool {
    !matches!(date.weekday(), Weekday::Saturday | Weekday::Sunday)
}

/// Count the business days from the first of `date`'s month up to and
/// including `date`.
///
/// A weekend date has the same count as the Friday before it.
pub fn business_day_count(date: Date) -> u8 {
    (1..=date.day())
        .filter_map(|day| date.replace_day(day).ok())
        .filter(|day| is_business_day(*day))
        .count() as u8
}

/// Whether `date` is the last weekday of its month.
pub fn is_last_business_day(date: Date) -> bool {
    is_business_day(date)
        && (date.day() + 1..=31)
            .filter_map(|day| date.replace_day(day).ok())
            .all(|day| !is_business_day(day))
}

/// The number of business days in the month.
///
/// # Errors
/// Returns [Error::DateOutOfRange] if `year` is outside the supported range.
#[cfg(test)]
pub fn business_days_in_month(year: i32, month: Month) -> Result<u8, Error> {
    let first = Date::from_calendar_date(year, month, 1)
        .map_err(|_| Error::DateOutOfRange(format!("{year}-{month}")))?;

    Ok((1..=31)
        .filter_map(|day| first.replace_day(day).ok())
        .filter(|day| is_business_day(*day))
        .count() as u8)
}

/// The zero-based month index of `date`, e.g. 2 for March.
pub fn month_index(date: Date) -> u8 {
    u8::from(date.month()) - 1
}

/// Build a date from a one-based `month` and a `day` that may overflow.
///
/// Months past December roll into the following year and days past the end
/// of the month roll into the following month, so `(2024, 13, 1)` is
/// 2025-01-01 and `(2024, 2, 31)` is 2024-03-02.
///
/// # Errors
/// Returns [Error::DateOutOfRange] if the resulting date is not representable.
pub fn date_from_parts(year: i32, month: i32, day: u8) -> Result<Date, Error> {
    let out_of_range = || Error::DateOutOfRange(format!("{year}-{month}-{day}"));

    let zero_based = month - 1;
    let year = year + zero_based.div_euclid(12);
    let month = Month::try_from((zero_based.rem_euclid(12) + 1) as u8).map_err(|_| out_of_range())?;

    Date::from_calendar_date(year, month, 1)
        .map_err(|_| out_of_range())?
        .checked_add(Duration::days(i64::from(day) - 1))
        .ok_or_else(out_of_range)
}

/// Step a (year, zero-based month) pair by `delta` months.
pub fn shift_month(year: i32, month: u8, delta: i32) -> (i32, u8) {
    let total = year * 12 + i32::from(month) + delta;

    (total.div_euclid(12), total.rem_euclid(12) as u8)
}

#[cfg(test)]
mod tests {
    use time::{Month, macros::date};

    use crate::calendar::{
        business_day_count, business_days_in_month, date_from_parts, is_business_day,
        is_last_business_day, month_index, shift_month,
    };

    #[test]
    fn first_monday_of_month_is_first_business_day() {
        assert_eq!(business_day_count(date!(2024 - 01 - 01)), 1);
    }

    #[test]
    fn weekends_do_not_increment_count() {
        let friday = business_day_count(date!(2024 - 01 - 05));
        let saturday = business_day_count(date!(2024 - 01 - 06));
        let sunday = business_day_count(date!(2024 - 01 - 07));

        assert_eq!(friday, 5);
        assert_eq!(saturday, friday);
        assert_eq!(sunday, friday);
        assert_eq!(business_day_count(date!(2024 - 01 - 08)), 6);
    }

    #[test]
    fn month_starting_on_weekend_has_zero_count_until_monday() {
        // 2024-06-01 is a Saturday.
        assert_eq!(business_day_count(date!(2024 - 06 - 01)), 0);
        assert_eq!(business_day_count(date!(2024 - 06 - 02)), 0);
        assert_eq!(business_day_count(date!(2024 - 06 - 03)), 1);
    }

    #[test]
    fn weekend_is_not_business_day() {
        assert!(is_business_day(date!(2024 - 01 - 05)));
        assert!(!is_business_day(date!(2024 - 01 - 06)));
        assert!(!is_business_day(date!(2024 - 01 - 07)));
    }

    #[test]
    fn last_business_day_skips_trailing_weekend() {
        // 2024-08-31 is a Saturday, so Friday the 30th is the last business day.
        assert!(is_last_business_day(date!(2024 - 08 - 30)));
        assert!(!is_last_business_day(date!(2024 - 08 - 29)));
        assert!(!is_last_business_day(date!(2024 - 08 - 31)));
    }

    #[test]
    fn last_day_of_month_on_weekday_is_last_business_day() {
        assert!(is_last_business_day(date!(2024 - 01 - 31)));
        assert!(is_last_business_day(date!(2024 - 02 - 29)));
    }

    #[test]
    fn counts_business_days_in_month() {
        assert_eq!(business_days_in_month(2024, Month::January), Ok(23));
        assert_eq!(business_days_in_month(2024, Month::February), Ok(21));
        assert_eq!(business_days_in_month(2023, Month::February), Ok(20));
    }

    #[test]
    fn month_index_is_zero_based() {
        assert_eq!(month_index(date!(2024 - 01 - 15)), 0);
        assert_eq!(month_index(date!(2024 - 03 - 15)), 2);
        assert_eq!(month_index(date!(2024 - 12 - 15)), 11);
    }

    #[test]
    fn date_from_parts_rolls_over_months_and_days() {
        assert_eq!(date_from_parts(2024, 1, 5), Ok(date!(2024 - 01 - 05)));
        assert_eq!(date_from_parts(2024, 13, 1), Ok(date!(2025 - 01 - 01)));
        assert_eq!(date_from_parts(2024, 14, 5), Ok(date!(2025 - 02 - 05)));
        assert_eq!(date_from_parts(2024, 2, 31), Ok(date!(2024 - 03 - 02)));
        assert_eq!(date_from_parts(2023, 2, 31), Ok(date!(2023 - 03 - 03)));
    }

    #[test]
    fn shift_month_wraps_years() {
        assert_eq!(shift_month(2024, 0, -1), (2023, 11));
        assert_eq!(shift_month(2024, 0, -2), (2023, 10));
        assert_eq!(shift_month(2024, 11, 1), (2025, 0));
        assert_eq!(shift_month(2024, 5, 0), (2024, 5));
    }
}
