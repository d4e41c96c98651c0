//! Fixed-format rendering of numbers and dates for the audit file.
//!
//! The consuming validator is strict: monetary fields carry exactly two
//! decimal places with a `.` separator and no grouping, dates are
//! `YYYY-MM-DD`, date-times carry seconds and no fractional component.
//! Nothing here is locale-dependent.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::{Decimal, RoundingStrategy};

/// Round a monetary value to the file's fixed precision (2 decimal places,
/// midpoint away from zero).
pub fn round_amount(d: Decimal) -> Decimal {
    d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Render a monetary value with exactly two decimal places.
pub fn format_amount(d: Decimal) -> String {
    let s = round_amount(d).to_string();
    match s.find('.') {
        Some(dot) => {
            let decimals = s.len() - dot - 1;
            if decimals < 2 {
                format!("{s}{}", "0".repeat(2 - decimals))
            } else {
                s
            }
        }
        None => format!("{s}.00"),
    }
}

/// Render a date as `YYYY-MM-DD`.
pub fn format_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// Render a date-time as `YYYY-MM-DDTHH:MM:SS`.
pub fn format_datetime(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn format_amount_cases() {
        assert_eq!(format_amount(dec!(100)), "100.00");
        assert_eq!(format_amount(dec!(1500.0)), "1500.00");
        assert_eq!(format_amount(dec!(49.9)), "49.90");
        assert_eq!(format_amount(dec!(1833.48)), "1833.48");
        assert_eq!(format_amount(dec!(0.005)), "0.01");
        assert_eq!(format_amount(dec!(-5)), "-5.00");
        assert_eq!(format_amount(dec!(1700.004)), "1700.00");
    }

    #[test]
    fn format_dates() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(format_date(d), "2024-01-31");
        let dt = d.and_hms_opt(13, 5, 9).unwrap();
        assert_eq!(format_datetime(dt), "2024-01-31T13:05:09");
    }
}
