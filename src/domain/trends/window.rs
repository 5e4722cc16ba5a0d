use anyhow::{Result, anyhow};
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_ROLLING_MONTHS: u32 = 6;

/// Where the rolling window ends. Chosen explicitly per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WindowAnchor {
    /// Latest sale date across the whole sales snapshot
    #[default]
    LatestSale,
    /// The date the run was invoked
    RunDate,
    Fixed(NaiveDate),
}

impl WindowAnchor {
    /// Resolve to a concrete date. `LatestSale` falls back to `run_date`
    /// when there are no sale dates at all.
    pub fn resolve(
        &self,
        sale_dates: impl IntoIterator<Item = NaiveDate>,
        run_date: NaiveDate,
    ) -> NaiveDate {
        match self {
            WindowAnchor::LatestSale => sale_dates.into_iter().max().unwrap_or(run_date),
            WindowAnchor::RunDate => run_date,
            WindowAnchor::Fixed(date) => *date,
        }
    }
}

impl FromStr for WindowAnchor {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "latest-sale" | "latest_sale" => Ok(WindowAnchor::LatestSale),
            "run-date" | "run_date" | "today" => Ok(WindowAnchor::RunDate),
            other => NaiveDate::parse_from_str(other, "%Y-%m-%d")
                .map(WindowAnchor::Fixed)
                .map_err(|_| {
                    anyhow!(
                        "Invalid window anchor: {}. Must be 'latest-sale', 'run-date' or YYYY-MM-DD",
                        s
                    )
                }),
        }
    }
}

impl fmt::Display for WindowAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowAnchor::LatestSale => write!(f, "latest-sale"),
            WindowAnchor::RunDate => write!(f, "run-date"),
            WindowAnchor::Fixed(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

/// Current and previous trailing windows of equal length ending at `end`.
///
/// Current covers `[start, end]`, previous covers `[prev_start, start)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollingWindow {
    pub prev_start: NaiveDate,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl RollingWindow {
    pub fn ending_at(end: NaiveDate, months: u32) -> Self {
        let length = Months::new(months);
        let start = end.checked_sub_months(length).unwrap_or(NaiveDate::MIN);
        let prev_start = start.checked_sub_months(length).unwrap_or(NaiveDate::MIN);
        Self {
            prev_start,
            start,
            end,
        }
    }

    pub fn in_current(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn in_previous(&self, date: NaiveDate) -> bool {
        date >= self.prev_start && date < self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_window_bounds() {
        let window = RollingWindow::ending_at(date(2024, 6, 30), 6);
        assert_eq!(window.start, date(2023, 12, 30));
        assert_eq!(window.prev_start, date(2023, 6, 30));

        assert!(window.in_current(date(2024, 6, 30)));
        assert!(window.in_current(date(2023, 12, 30)));
        assert!(!window.in_current(date(2024, 7, 1)));
        assert!(window.in_previous(date(2023, 12, 29)));
        assert!(window.in_previous(date(2023, 6, 30)));
        assert!(!window.in_previous(date(2023, 12, 30)));
        assert!(!window.in_previous(date(2023, 6, 29)));
    }

    #[test]
    fn test_month_end_clamping() {
        let window = RollingWindow::ending_at(date(2024, 8, 31), 6);
        assert_eq!(window.start, date(2024, 2, 29));
    }

    #[test]
    fn test_anchor_resolution() {
        let today = date(2025, 1, 15);
        let sales = vec![date(2024, 3, 1), date(2024, 9, 12), date(2024, 5, 5)];

        assert_eq!(
            WindowAnchor::LatestSale.resolve(sales.clone(), today),
            date(2024, 9, 12)
        );
        assert_eq!(WindowAnchor::RunDate.resolve(sales.clone(), today), today);
        assert_eq!(
            WindowAnchor::Fixed(date(2024, 1, 1)).resolve(sales, today),
            date(2024, 1, 1)
        );
        assert_eq!(WindowAnchor::LatestSale.resolve(Vec::new(), today), today);
    }

    #[test]
    fn test_anchor_parsing() {
        assert_eq!(
            WindowAnchor::from_str("latest-sale").unwrap(),
            WindowAnchor::LatestSale
        );
        assert_eq!(WindowAnchor::from_str("RUN-DATE").unwrap(), WindowAnchor::RunDate);
        assert_eq!(
            WindowAnchor::from_str("2024-02-29").unwrap(),
            WindowAnchor::Fixed(date(2024, 2, 29))
        );
        assert!(WindowAnchor::from_str("yesterday").is_err());
    }
}
