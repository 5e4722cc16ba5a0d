use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::config::StoreEnvConfig;
use crate::domain::repositories::{MarketDataRepository, TrendRepository};
use crate::infrastructure::persistence::database::Database;
use crate::infrastructure::persistence::repositories::{
    SqliteMarketDataRepository, SqliteTrendRepository,
};

pub struct PersistenceHandle {
    pub db: Database,
    pub market_data: Arc<dyn MarketDataRepository>,
    pub trend_store: Arc<dyn TrendRepository>,
}

pub struct PersistenceBootstrap;

impl PersistenceBootstrap {
    pub async fn init(store: &StoreEnvConfig) -> Result<PersistenceHandle> {
        info!("Initializing Database at {}", store.endpoint);

        let db = Database::new(&store.endpoint, &store.credential)
            .await
            .context("Failed to initialize database")?;

        let market_data = Arc::new(SqliteMarketDataRepository::new(db.pool.clone()));
        let trend_store = Arc::new(SqliteTrendRepository::new(db.pool.clone()));

        Ok(PersistenceHandle {
            db,
            market_data,
            trend_store,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bootstrap_opens_empty_store() {
        let store = StoreEnvConfig {
            endpoint: "sqlite::memory:".to_string(),
            credential: "key".to_string(),
        };
        let handle = PersistenceBootstrap::init(&store).await.unwrap();

        assert!(handle.market_data.load_domains().await.unwrap().is_empty());
        assert!(handle.trend_store.load_all().await.unwrap().is_empty());

        handle.db.close().await;
    }
}
