use anyhow::{Result, anyhow};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Decimal places of every published monetary value and percentage
pub const OUTPUT_DECIMAL_PLACES: u32 = 2;

/// Composite upsert key of a trend row
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrendKey {
    pub group_label: String,
    pub time_range: String,
}

impl fmt::Display for TrendKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.group_label, self.time_range)
    }
}

/// One published trend statistic row.
///
/// Prices and `growth_pct` are rounded to two decimals when the row is built.
/// Rolling fields are all `None` when the current window held no sales.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendRow {
    pub group_label: String,
    /// `YYYY-MM` month label
    pub time_range: String,
    pub volume: u64,
    pub avg_price: Option<Decimal>,
    pub median_price: Option<Decimal>,
    pub top_price: Option<Decimal>,
    pub volume_6mo: Option<u64>,
    pub avg_price_6mo: Option<Decimal>,
    pub median_price_6mo: Option<Decimal>,
    pub top_price_6mo: Option<Decimal>,
    pub growth_pct: Option<Decimal>,
}

impl TrendRow {
    pub fn key(&self) -> TrendKey {
        TrendKey {
            group_label: self.group_label.clone(),
            time_range: self.time_range.clone(),
        }
    }
}

/// Round a computed value for publication. Null stays null.
pub fn round_output(value: Option<Decimal>) -> Option<Decimal> {
    value.map(|v| v.round_dp(OUTPUT_DECIMAL_PLACES))
}

/// Shape of the rows a run produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrendGranularity {
    /// One row per group labelled with the as-of month
    #[default]
    Snapshot,
    /// One row per group and calendar month with sales
    Monthly,
}

impl FromStr for TrendGranularity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "snapshot" => Ok(TrendGranularity::Snapshot),
            "monthly" => Ok(TrendGranularity::Monthly),
            _ => Err(anyhow!(
                "Invalid trend granularity: {}. Must be 'snapshot' or 'monthly'",
                s
            )),
        }
    }
}

impl fmt::Display for TrendGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendGranularity::Snapshot => write!(f, "snapshot"),
            TrendGranularity::Monthly => write!(f, "monthly"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_output() {
        assert_eq!(round_output(Some(dec!(33.33333))), Some(dec!(33.33)));
        assert_eq!(round_output(Some(dec!(2.675))), Some(dec!(2.68)));
        assert_eq!(round_output(Some(dec!(2.665))), Some(dec!(2.66)));
        assert_eq!(round_output(None), None);
    }

    #[test]
    fn test_key_display() {
        let key = TrendKey {
            group_label: "ai-prefix".to_string(),
            time_range: "2024-06".to_string(),
        };
        assert_eq!(key.to_string(), "ai-prefix@2024-06");
    }

    #[test]
    fn test_granularity_parsing() {
        assert_eq!(
            TrendGranularity::from_str("Monthly").unwrap(),
            TrendGranularity::Monthly
        );
        assert!(TrendGranularity::from_str("weekly").is_err());
    }
}
