//! Repository Pattern Abstractions
//!
//! The trend engine reads from one store and writes to another through these
//! traits, so the computation never depends on a concrete backend.
//!
//! # Design
//!
//! - `MarketDataRepository`: read-only snapshots of domains, sales and groups
//! - `TrendRepository`: the keyed trend collection the reconciler writes to
//!
//! # Implementations
//!
//! - SQLite via `sqlx` (`infrastructure::persistence`)
//! - In-memory via `tokio::sync::RwLock` (`infrastructure::repositories`)
//!
//! # Example
//!
//! ```rust,no_run
//! use dntrends::domain::repositories::TrendRepository;
//! use dntrends::infrastructure::InMemoryTrendRepository;
//!
//! # async {
//! let repo = InMemoryTrendRepository::new();
//! let rows = repo.load_all().await?;
//! # anyhow::Ok(())
//! # };
//! ```

use crate::domain::catalog::{DomainRecord, Group, SaleRecord};
use crate::domain::trends::TrendRow;
use anyhow::Result;
use async_trait::async_trait;

/// Source of the read-only snapshots a run computes over
#[async_trait]
pub trait MarketDataRepository: Send + Sync {
    async fn load_domains(&self) -> Result<Vec<DomainRecord>>;

    async fn load_sales(&self) -> Result<Vec<SaleRecord>>;

    /// Groups with their criteria already validated (see `Group::criteria`)
    async fn load_groups(&self) -> Result<Vec<Group>>;
}

/// Keyed trend collection. Both write operations must be atomic.
#[async_trait]
pub trait TrendRepository: Send + Sync {
    async fn load_all(&self) -> Result<Vec<TrendRow>>;

    /// Insert or update every row by `(group_label, time_range)`.
    /// Returns the number of rows written.
    async fn upsert_batch(&self, rows: &[TrendRow]) -> Result<u64>;

    /// Delete every stored row, then insert `rows`.
    /// Returns the number of rows deleted.
    async fn replace_all(&self, rows: &[TrendRow]) -> Result<u64>;
}
