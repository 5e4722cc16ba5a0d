use anyhow::{Context, Result};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tokio::fs;
use tracing::info;

/// Handle to the trend database. Created once per run and passed explicitly
/// to the repositories that need it.
#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    /// Connect to `db_url` and make sure the schema exists.
    ///
    /// A non-empty `credential` is sent as the SQLCipher `key` pragma; plain
    /// SQLite builds ignore it.
    pub async fn new(db_url: &str, credential: &str) -> Result<Self> {
        // Ensure the directory exists if it's a file path
        if let Some(path_part) = db_url.strip_prefix("sqlite://") {
            let path = Path::new(path_part);
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
                && !parent.exists()
            {
                fs::create_dir_all(parent)
                    .await
                    .context("Failed to create database directory")?;
            }
        }

        let in_memory = db_url.contains(":memory:") || db_url.contains("mode=memory");

        let mut options = SqliteConnectOptions::from_str(db_url)
            .with_context(|| format!("Invalid database url: {}", db_url))?
            .create_if_missing(true);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }
        if !credential.is_empty() {
            options = options.pragma("key", format!("'{}'", credential.replace('\'', "''")));
        }

        // Every connection to an in-memory database sees its own database,
        // so keep exactly one alive for the lifetime of the pool.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .context("Failed to connect to SQLite database")?;

        info!("Connected to database: {}", db_url);

        let db = Self { pool };
        db.init().await?;

        Ok(db)
    }

    /// Release every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connections closed.");
    }

    /// Initialize database schema
    async fn init(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;

        // 1. Domains
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS dn (
                id TEXT PRIMARY KEY,
                dn_name TEXT NOT NULL,
                tld TEXT NOT NULL DEFAULT '',
                word_count INTEGER NOT NULL DEFAULT 0,
                keywords TEXT,
                group_id TEXT
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create dn table")?;

        // 2. Sales
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sales (
                id TEXT PRIMARY KEY,
                dn_id TEXT NOT NULL,
                date DATE NOT NULL,
                price_adjusted TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_sales_dn_date
            ON sales (dn_id, date);
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create sales table")?;

        // 3. Groups
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS dn_groups (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                filters TEXT
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create dn_groups table")?;

        // 4. Trends, keyed by (group label, time range)
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trends (
                keyword_group TEXT NOT NULL,
                time_range TEXT NOT NULL,
                volume INTEGER NOT NULL,
                avg_price TEXT,
                median_price TEXT,
                top_price TEXT,
                volume_6mo INTEGER,
                avg_price_6mo TEXT,
                median_price_6mo TEXT,
                top_price_6mo TEXT,
                growth_pct TEXT,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (keyword_group, time_range)
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create trends table")?;

        info!("Database schema initialized.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;

    #[tokio::test]
    async fn test_in_memory_schema_is_shared_across_queries() {
        let db = Database::new("sqlite::memory:", "").await.unwrap();

        for _ in 0..3 {
            let row = sqlx::query(
                "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' \
                 AND name IN ('dn', 'sales', 'dn_groups', 'trends')",
            )
            .fetch_one(&db.pool)
            .await
            .unwrap();
            let count: i64 = row.try_get("count").unwrap();
            assert_eq!(count, 4);
        }

        db.close().await;
    }

    #[tokio::test]
    async fn test_credential_is_accepted_by_plain_sqlite() {
        let db = Database::new("sqlite::memory:", "s3cr'et").await.unwrap();
        assert!(!db.pool.is_closed());
        db.close().await;
        assert!(db.pool.is_closed());
    }
}
