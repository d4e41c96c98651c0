use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::error::SaftError;

/// The closed reporting interval of a generation run, both ends inclusive.
///
/// Construction rejects inverted intervals, so a `Period` value is always
/// well-formed and no extractor ever sees start > end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    start: NaiveDate,
    end: NaiveDate,
}

impl Period {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, SaftError> {
        if start > end {
            return Err(SaftError::Configuration(format!(
                "period start {start} is after period end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// The fiscal year reported in the header — the year of the period end,
    /// matching the tax authority's convention.
    pub fn fiscal_year(&self) -> i32 {
        self.end.year()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn rejects_inverted_interval() {
        let err = Period::new(date(2024, 2, 1), date(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, SaftError::Configuration(_)));
    }

    #[test]
    fn single_day_period_is_valid() {
        let p = Period::new(date(2024, 6, 15), date(2024, 6, 15)).unwrap();
        assert!(p.contains(date(2024, 6, 15)));
        assert!(!p.contains(date(2024, 6, 16)));
        assert_eq!(p.fiscal_year(), 2024);
    }
}
