//! Calendar date to spreadsheet day-serial conversion

use chrono::NaiveDate;

/// Convert a calendar date to the spreadsheet's day-serial integer.
///
/// Serials count days from an epoch of 1899-12-30. That epoch deliberately
/// absorbs the format's historical bug of treating 1900 as a leap year: for
/// every date from 1900-03-01 onward the result matches what consuming
/// applications expect (1900-03-01 is serial 61), which is the only span
/// business documents use.
///
/// ```
/// use chrono::NaiveDate;
/// use docstamp_core::date_to_serial;
///
/// let d = NaiveDate::from_ymd_opt(1900, 3, 1).unwrap();
/// assert_eq!(date_to_serial(d), 61);
/// ```
pub fn date_to_serial(date: NaiveDate) -> i64 {
    (date - epoch()).num_days()
}

fn epoch() -> NaiveDate {
    // 1899-12-30 is always a valid date
    NaiveDate::from_ymd_opt(1899, 12, 30).expect("fixed epoch date")
}
