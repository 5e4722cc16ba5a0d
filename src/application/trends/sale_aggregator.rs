use crate::domain::catalog::SaleRecord;
use crate::domain::trends::{
    DEFAULT_ROLLING_MONTHS, PriceStats, RollingWindow, Stats, TrendGranularity, TrendRow,
    round_output,
};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Statistics for one calendar month with sales
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyTrend {
    /// `YYYY-MM`
    pub month: String,
    pub stats: PriceStats,
    /// Change of the average versus the previous month that had sales
    pub growth_pct: Option<Decimal>,
}

/// Unrounded statistics for one group's sales
#[derive(Debug, Clone, PartialEq)]
pub struct TrendSnapshot {
    pub as_of: NaiveDate,
    pub window: RollingWindow,
    pub full: PriceStats,
    /// `None` when the current window holds no sales
    pub rolling: Option<PriceStats>,
    pub previous_avg: Option<Decimal>,
    pub growth_pct: Option<Decimal>,
    pub monthly: Vec<MonthlyTrend>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggregateResult {
    /// No sales for the group; it contributes no rows this run
    NoData,
    Computed(TrendSnapshot),
}

/// Aggregates one group's sales into full-history, rolling-window and monthly
/// statistics. Values stay unrounded until rows are built.
#[derive(Debug, Clone, Copy)]
pub struct SaleAggregator {
    rolling_months: u32,
}

impl Default for SaleAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_ROLLING_MONTHS)
    }
}

impl SaleAggregator {
    pub fn new(rolling_months: u32) -> Self {
        Self { rolling_months }
    }

    /// `sales` must already be restricted to the group's domains.
    pub fn aggregate<'a>(
        &self,
        sales: impl IntoIterator<Item = &'a SaleRecord>,
        as_of: NaiveDate,
    ) -> AggregateResult {
        let mut sales: Vec<&SaleRecord> = sales.into_iter().collect();
        if sales.is_empty() {
            return AggregateResult::NoData;
        }
        sales.sort_by_key(|s| s.date);

        let window = RollingWindow::ending_at(as_of, self.rolling_months);

        let all_prices: Vec<Decimal> = sales.iter().map(|s| s.price_adjusted).collect();
        let current_prices: Vec<Decimal> = sales
            .iter()
            .filter(|s| window.in_current(s.date))
            .map(|s| s.price_adjusted)
            .collect();
        let previous_prices: Vec<Decimal> = sales
            .iter()
            .filter(|s| window.in_previous(s.date))
            .map(|s| s.price_adjusted)
            .collect();

        let rolling = if current_prices.is_empty() {
            None
        } else {
            Some(PriceStats::from_prices(&current_prices))
        };
        let previous_avg = Stats::mean(&previous_prices);
        let growth_pct = Stats::growth_pct(
            rolling.as_ref().and_then(|r| r.avg_price),
            previous_avg,
        );

        AggregateResult::Computed(TrendSnapshot {
            as_of,
            window,
            full: PriceStats::from_prices(&all_prices),
            rolling,
            previous_avg,
            growth_pct,
            monthly: monthly_trends(&sales),
        })
    }
}

fn monthly_trends(sorted_sales: &[&SaleRecord]) -> Vec<MonthlyTrend> {
    let mut by_month: BTreeMap<(i32, u32), Vec<Decimal>> = BTreeMap::new();
    for sale in sorted_sales {
        by_month
            .entry((sale.date.year(), sale.date.month()))
            .or_default()
            .push(sale.price_adjusted);
    }

    let mut previous_avg: Option<Decimal> = None;
    by_month
        .into_iter()
        .map(|((year, month), prices)| {
            let stats = PriceStats::from_prices(&prices);
            let growth_pct = Stats::growth_pct(stats.avg_price, previous_avg);
            previous_avg = stats.avg_price;
            MonthlyTrend {
                month: format!("{:04}-{:02}", year, month),
                stats,
                growth_pct,
            }
        })
        .collect()
}

impl TrendSnapshot {
    /// Build publishable rows for `group_label`, rounding every value here.
    pub fn to_rows(&self, group_label: &str, granularity: TrendGranularity) -> Vec<TrendRow> {
        match granularity {
            TrendGranularity::Snapshot => vec![self.snapshot_row(group_label)],
            TrendGranularity::Monthly => self
                .monthly
                .iter()
                .map(|m| TrendRow {
                    group_label: group_label.to_string(),
                    time_range: m.month.clone(),
                    volume: m.stats.volume,
                    avg_price: round_output(m.stats.avg_price),
                    median_price: round_output(m.stats.median_price),
                    top_price: round_output(m.stats.top_price),
                    volume_6mo: None,
                    avg_price_6mo: None,
                    median_price_6mo: None,
                    top_price_6mo: None,
                    growth_pct: round_output(m.growth_pct),
                })
                .collect(),
        }
    }

    fn snapshot_row(&self, group_label: &str) -> TrendRow {
        let rolling = self.rolling.as_ref();
        TrendRow {
            group_label: group_label.to_string(),
            time_range: self.as_of.format("%Y-%m").to_string(),
            volume: self.full.volume,
            avg_price: round_output(self.full.avg_price),
            median_price: round_output(self.full.median_price),
            top_price: round_output(self.full.top_price),
            volume_6mo: rolling.map(|r| r.volume),
            avg_price_6mo: round_output(rolling.and_then(|r| r.avg_price)),
            median_price_6mo: round_output(rolling.and_then(|r| r.median_price)),
            top_price_6mo: round_output(rolling.and_then(|r| r.top_price)),
            growth_pct: round_output(self.growth_pct),
        }
    }
}
