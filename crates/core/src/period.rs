use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::money::Money;

/// Average month length used for monthly rates.
const DAYS_PER_MONTH: Decimal = Decimal::from_parts(3044, 0, 0, false, 2);
const DAYS_PER_WEEK: Decimal = Decimal::from_parts(7, 0, 0, false, 0);

/// Inclusive date window; a missing bound is unbounded on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.from, self.to) {
            (Some(from), Some(to)) => write!(f, "{from} to {to}"),
            (Some(from), None) => write!(f, "from {from}"),
            (None, Some(to)) => write!(f, "until {to}"),
            (None, None) => write!(f, "all dates"),
        }
    }
}

impl DateWindow {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        DateWindow { from, to }
    }

    pub fn unbounded() -> Self {
        DateWindow::default()
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }

    /// Days covered, counting both endpoints. `None` unless both bounds are set.
    pub fn days(self) -> Option<i64> {
        let (from, to) = (self.from?, self.to?);
        Some((to - from).num_days() + 1)
    }

    pub fn rates(self, total: Money) -> PeriodRates {
        let Some(days) = self.days() else {
            return PeriodRates::default();
        };
        let days = Decimal::from(days);

        let weeks = days / DAYS_PER_WEEK;
        if weeks < Decimal::ONE {
            return PeriodRates::default();
        }
        let weekly = Some(Rate {
            per_unit: Money::from_decimal(total.as_decimal() / weeks),
            units: weeks.round_dp(2),
        });

        let months = days / DAYS_PER_MONTH;
        let monthly = (months >= Decimal::ONE).then(|| Rate {
            per_unit: Money::from_decimal(total.as_decimal() / months),
            units: months.round_dp(2),
        });

        PeriodRates { weekly, monthly }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rate {
    pub per_unit: Money,
    /// Number of weeks or months in the window, to 2 dp.
    pub units: Decimal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeriodRates {
    pub weekly: Option<Rate>,
    pub monthly: Option<Rate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn window(from: (i32, u32, u32), to: (i32, u32, u32)) -> DateWindow {
        DateWindow::new(Some(date(from.0, from.1, from.2)), Some(date(to.0, to.1, to.2)))
    }

    #[test]
    fn contains_is_inclusive_on_both_ends() {
        let w = window((2024, 1, 1), (2024, 12, 31));
        assert!(w.contains(date(2024, 6, 15)));
        assert!(w.contains(date(2024, 1, 1)));
        assert!(w.contains(date(2024, 12, 31)));
        assert!(!w.contains(date(2023, 12, 31)));
        assert!(!w.contains(date(2025, 1, 1)));
    }

    #[test]
    fn open_bounds_are_unbounded() {
        let from_only = DateWindow::new(Some(date(2024, 3, 1)), None);
        assert!(from_only.contains(date(2099, 1, 1)));
        assert!(!from_only.contains(date(2024, 2, 29)));

        let to_only = DateWindow::new(None, Some(date(2024, 3, 1)));
        assert!(to_only.contains(date(1990, 1, 1)));
        assert!(!to_only.contains(date(2024, 3, 2)));

        assert!(DateWindow::unbounded().contains(date(2024, 3, 1)));
    }

    #[test]
    fn inverted_window_contains_nothing() {
        let w = window((2024, 2, 1), (2024, 1, 1));
        assert!(!w.contains(date(2024, 1, 15)));
        assert!(!w.contains(date(2024, 1, 1)));
        assert!(!w.contains(date(2024, 2, 1)));
    }

    #[test]
    fn days_counts_both_endpoints() {
        assert_eq!(window((2024, 1, 1), (2024, 1, 1)).days(), Some(1));
        assert_eq!(window((2024, 1, 1), (2024, 1, 14)).days(), Some(14));
        assert_eq!(DateWindow::new(Some(date(2024, 1, 1)), None).days(), None);
    }

    #[test]
    fn fourteen_days_gives_weekly_rate_only() {
        let rates = window((2024, 1, 1), (2024, 1, 14)).rates(Money::from_cents(200000));
        let weekly = rates.weekly.unwrap();
        assert_eq!(weekly.per_unit, Money::from_cents(100000));
        assert_eq!(weekly.units, Decimal::from(2));
        assert!(rates.monthly.is_none());
    }

    #[test]
    fn under_a_week_has_no_rates() {
        let rates = window((2024, 1, 1), (2024, 1, 6)).rates(Money::from_cents(700));
        assert_eq!(rates, PeriodRates::default());
    }

    #[test]
    fn exactly_seven_days_is_one_week() {
        let rates = window((2024, 1, 1), (2024, 1, 7)).rates(Money::from_cents(700));
        assert_eq!(rates.weekly.unwrap().per_unit, Money::from_cents(700));
    }

    #[test]
    fn monthly_rate_needs_more_than_thirty_days() {
        // 30 days is 0.99 average months.
        let thirty = window((2024, 1, 1), (2024, 1, 30)).rates(Money::from_cents(3044));
        assert!(thirty.weekly.is_some());
        assert!(thirty.monthly.is_none());

        let thirty_one = window((2024, 1, 1), (2024, 1, 31)).rates(Money::from_cents(3100));
        let monthly = thirty_one.monthly.unwrap();
        assert_eq!(monthly.units, Decimal::new(102, 2));
        assert_eq!(monthly.per_unit, Money::from_cents(3044));
    }

    #[test]
    fn open_window_has_no_rates() {
        let w = DateWindow::new(None, Some(date(2024, 12, 31)));
        assert_eq!(w.rates(Money::from_cents(100)), PeriodRates::default());
    }

    #[test]
    fn display() {
        assert_eq!(window((2024, 1, 1), (2024, 12, 31)).to_string(), "2024-01-01 to 2024-12-31");
        assert_eq!(DateWindow::unbounded().to_string(), "all dates");
    }
}
