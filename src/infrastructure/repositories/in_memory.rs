//! In-Memory Repository Implementations
//!
//! Thread-safe, in-memory implementations of the repository traits defined
//! in `domain::repositories`.
//!
//! # Features
//!
//! - **Thread-safe**: Uses `Arc<RwLock>` for concurrent access
//! - **Atomic writes**: each batch is applied under a single write lock
//! - **Testing**: Ideal for unit tests and embedding the engine
//!
//! # Limitations
//!
//! - Data is lost on process exit
//! - No sharing across processes

use crate::domain::catalog::{DomainRecord, Group, SaleRecord};
use crate::domain::repositories::{MarketDataRepository, TrendRepository};
use crate::domain::trends::{TrendKey, TrendRow};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Fixed snapshots of domains, sales and groups
pub struct InMemoryMarketDataRepository {
    domains: Vec<DomainRecord>,
    sales: Vec<SaleRecord>,
    groups: Vec<Group>,
}

impl InMemoryMarketDataRepository {
    pub fn new(domains: Vec<DomainRecord>, sales: Vec<SaleRecord>, groups: Vec<Group>) -> Self {
        Self {
            domains,
            sales,
            groups,
        }
    }
}

#[async_trait]
impl MarketDataRepository for InMemoryMarketDataRepository {
    async fn load_domains(&self) -> Result<Vec<DomainRecord>> {
        Ok(self.domains.clone())
    }

    async fn load_sales(&self) -> Result<Vec<SaleRecord>> {
        Ok(self.sales.clone())
    }

    async fn load_groups(&self) -> Result<Vec<Group>> {
        Ok(self.groups.clone())
    }
}

/// In-memory keyed trend collection
pub struct InMemoryTrendRepository {
    rows: Arc<RwLock<BTreeMap<TrendKey, TrendRow>>>,
}

impl InMemoryTrendRepository {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }
}

impl Default for InMemoryTrendRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TrendRepository for InMemoryTrendRepository {
    async fn load_all(&self) -> Result<Vec<TrendRow>> {
        Ok(self.rows.read().await.values().cloned().collect())
    }

    async fn upsert_batch(&self, rows: &[TrendRow]) -> Result<u64> {
        let mut stored = self.rows.write().await;
        for row in rows {
            stored.insert(row.key(), row.clone());
        }
        Ok(rows.len() as u64)
    }

    async fn replace_all(&self, rows: &[TrendRow]) -> Result<u64> {
        let fresh: BTreeMap<TrendKey, TrendRow> =
            rows.iter().map(|r| (r.key(), r.clone())).collect();
        let previous = std::mem::replace(&mut *self.rows.write().await, fresh);
        Ok(previous.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row(group: &str, month: &str, volume: u64) -> TrendRow {
        TrendRow {
            group_label: group.to_string(),
            time_range: month.to_string(),
            volume,
            avg_price: Some(dec!(10)),
            median_price: Some(dec!(10)),
            top_price: Some(dec!(10)),
            volume_6mo: None,
            avg_price_6mo: None,
            median_price_6mo: None,
            top_price_6mo: None,
            growth_pct: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_overwrites_by_key() {
        let repo = InMemoryTrendRepository::new();
        repo.upsert_batch(&[row("ai", "2024-05", 1), row("ai", "2024-06", 2)])
            .await
            .unwrap();
        repo.upsert_batch(&[row("ai", "2024-06", 7)]).await.unwrap();

        let rows = repo.load_all().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].volume, 7);
    }

    #[tokio::test]
    async fn test_replace_all_returns_cleared_count() {
        let repo = InMemoryTrendRepository::new();
        repo.upsert_batch(&[row("ai", "2024-05", 1), row("io", "2024-05", 2)])
            .await
            .unwrap();

        let cleared = repo.replace_all(&[row("ai", "2024-06", 3)]).await.unwrap();

        assert_eq!(cleared, 2);
        let rows = repo.load_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].time_range, "2024-06");
    }
}
