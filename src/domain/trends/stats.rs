use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Shared statistics helpers over sale prices.
///
/// All helpers return `None` for empty input so that missing data never turns
/// into a zero.
pub struct Stats;

impl Stats {
    pub fn mean(values: &[Decimal]) -> Option<Decimal> {
        if values.is_empty() {
            return None;
        }
        let sum: Decimal = values.iter().sum();
        sum.checked_div(Decimal::from(values.len()))
    }

    /// Discrete median: the average of the two central values for even counts.
    pub fn median(values: &[Decimal]) -> Option<Decimal> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort();

        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            Some((sorted[mid - 1] + sorted[mid]) / Decimal::TWO)
        } else {
            Some(sorted[mid])
        }
    }

    pub fn max(values: &[Decimal]) -> Option<Decimal> {
        values.iter().copied().max()
    }

    /// Percentage change from `previous` to `current`.
    ///
    /// Undefined (None) without a baseline or with a zero baseline.
    pub fn growth_pct(current: Option<Decimal>, previous: Option<Decimal>) -> Option<Decimal> {
        let (current, previous) = (current?, previous?);
        if previous.is_zero() {
            return None;
        }
        (current - previous)
            .checked_div(previous)?
            .checked_mul(Decimal::ONE_HUNDRED)
    }
}

/// Volume plus average, median and top price over one set of sales
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PriceStats {
    pub volume: u64,
    pub avg_price: Option<Decimal>,
    pub median_price: Option<Decimal>,
    pub top_price: Option<Decimal>,
}

impl PriceStats {
    pub fn from_prices(prices: &[Decimal]) -> Self {
        Self {
            volume: prices.len() as u64,
            avg_price: Stats::mean(prices),
            median_price: Stats::median(prices),
            top_price: Stats::max(prices),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.volume == 0
    }
}
