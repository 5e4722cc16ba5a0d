use crate::domain::catalog::{DomainRecord, Group, SaleRecord};
use crate::domain::repositories::{MarketDataRepository, TrendRepository};
use crate::domain::trends::TrendRow;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::str::FromStr;
use tracing::{info, warn};

pub struct SqliteMarketDataRepository {
    pool: SqlitePool,
}

impl SqliteMarketDataRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn save_domain(&self, domain: &DomainRecord) -> Result<()> {
        let keywords = serde_json::to_string(&domain.keywords)?;
        sqlx::query(
            r#"
            INSERT INTO dn (id, dn_name, tld, word_count, keywords, group_id)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                dn_name = excluded.dn_name,
                tld = excluded.tld,
                word_count = excluded.word_count,
                keywords = excluded.keywords,
                group_id = excluded.group_id
            "#,
        )
        .bind(&domain.id)
        .bind(&domain.name)
        .bind(&domain.tld)
        .bind(domain.word_count as i64)
        .bind(keywords)
        .bind(&domain.group_id)
        .execute(&self.pool)
        .await
        .context("Failed to save domain")?;
        Ok(())
    }

    pub async fn save_sale(&self, sale: &SaleRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sales (id, dn_id, date, price_adjusted)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.domain_id)
        .bind(sale.date)
        .bind(sale.price_adjusted.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to save sale")?;
        Ok(())
    }

    /// `filters` is stored verbatim; it is validated when groups are loaded.
    pub async fn save_group(&self, id: &str, name: &str, filters: Option<&str>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO dn_groups (id, name, filters)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                filters = excluded.filters
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(filters)
        .execute(&self.pool)
        .await
        .context("Failed to save group")?;
        Ok(())
    }
}

#[async_trait]
impl MarketDataRepository for SqliteMarketDataRepository {
    async fn load_domains(&self) -> Result<Vec<DomainRecord>> {
        let rows = sqlx::query(
            "SELECT id, dn_name, tld, word_count, keywords, group_id FROM dn ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to load domains")?;

        let mut domains = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id")?;
            let word_count: i64 = row.try_get("word_count")?;
            let keywords_json: Option<String> = row.try_get("keywords")?;

            let keywords = match keywords_json.as_deref().map(str::trim) {
                None | Some("") => Vec::new(),
                Some(text) => serde_json::from_str::<Vec<String>>(text).unwrap_or_else(|e| {
                    warn!("Ignoring unreadable keywords for domain {}: {}", id, e);
                    Vec::new()
                }),
            };

            domains.push(DomainRecord {
                word_count: u32::try_from(word_count)
                    .with_context(|| format!("Invalid word_count {} for domain {}", word_count, id))?,
                name: row.try_get("dn_name")?,
                tld: row.try_get("tld")?,
                keywords,
                group_id: row.try_get("group_id")?,
                id,
            });
        }
        Ok(domains)
    }

    async fn load_sales(&self) -> Result<Vec<SaleRecord>> {
        let rows = sqlx::query_as::<_, (String, String, NaiveDate, String)>(
            "SELECT id, dn_id, date, price_adjusted FROM sales ORDER BY date ASC",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to load sales")?;

        rows.into_iter()
            .map(|(id, domain_id, date, price)| {
                let price_adjusted = Decimal::from_str(&price)
                    .with_context(|| format!("Invalid price '{}' for sale {}", price, id))?;
                Ok(SaleRecord {
                    id,
                    domain_id,
                    date,
                    price_adjusted,
                })
            })
            .collect()
    }

    async fn load_groups(&self) -> Result<Vec<Group>> {
        let rows = sqlx::query_as::<_, (String, String, Option<String>)>(
            "SELECT id, name, filters FROM dn_groups ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to load groups")?;

        Ok(rows
            .into_iter()
            .map(|(id, name, filters)| {
                let raw = filters.map(Value::String);
                Group::from_raw(id, name, raw.as_ref())
            })
            .collect())
    }
}

const UPSERT_TREND: &str = r#"
    INSERT INTO trends (
        keyword_group, time_range, volume, avg_price, median_price, top_price,
        volume_6mo, avg_price_6mo, median_price_6mo, top_price_6mo, growth_pct, updated_at
    )
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT(keyword_group, time_range) DO UPDATE SET
        volume = excluded.volume,
        avg_price = excluded.avg_price,
        median_price = excluded.median_price,
        top_price = excluded.top_price,
        volume_6mo = excluded.volume_6mo,
        avg_price_6mo = excluded.avg_price_6mo,
        median_price_6mo = excluded.median_price_6mo,
        top_price_6mo = excluded.top_price_6mo,
        growth_pct = excluded.growth_pct,
        updated_at = excluded.updated_at
"#;

pub struct SqliteTrendRepository {
    pool: SqlitePool,
}

impl SqliteTrendRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn write_row(conn: &mut SqliteConnection, row: &TrendRow, updated_at: i64) -> Result<()> {
        sqlx::query(UPSERT_TREND)
            .bind(&row.group_label)
            .bind(&row.time_range)
            .bind(row.volume as i64)
            .bind(row.avg_price.map(|d| d.to_string()))
            .bind(row.median_price.map(|d| d.to_string()))
            .bind(row.top_price.map(|d| d.to_string()))
            .bind(row.volume_6mo.map(|v| v as i64))
            .bind(row.avg_price_6mo.map(|d| d.to_string()))
            .bind(row.median_price_6mo.map(|d| d.to_string()))
            .bind(row.top_price_6mo.map(|d| d.to_string()))
            .bind(row.growth_pct.map(|d| d.to_string()))
            .bind(updated_at)
            .execute(&mut *conn)
            .await
            .with_context(|| format!("Failed to write trend row {}", row.key()))?;
        Ok(())
    }

    fn map_row(row: &SqliteRow) -> Result<TrendRow> {
        let volume: i64 = row.try_get("volume")?;
        let volume_6mo: Option<i64> = row.try_get("volume_6mo")?;
        Ok(TrendRow {
            group_label: row.try_get("keyword_group")?,
            time_range: row.try_get("time_range")?,
            volume: volume.max(0) as u64,
            avg_price: decimal_column(row, "avg_price")?,
            median_price: decimal_column(row, "median_price")?,
            top_price: decimal_column(row, "top_price")?,
            volume_6mo: volume_6mo.map(|v| v.max(0) as u64),
            avg_price_6mo: decimal_column(row, "avg_price_6mo")?,
            median_price_6mo: decimal_column(row, "median_price_6mo")?,
            top_price_6mo: decimal_column(row, "top_price_6mo")?,
            growth_pct: decimal_column(row, "growth_pct")?,
        })
    }
}

fn decimal_column(row: &SqliteRow, column: &str) -> Result<Option<Decimal>> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|text| {
        Decimal::from_str(&text)
            .with_context(|| format!("Invalid decimal '{}' in column {}", text, column))
    })
    .transpose()
}

#[async_trait]
impl TrendRepository for SqliteTrendRepository {
    async fn load_all(&self) -> Result<Vec<TrendRow>> {
        let rows = sqlx::query("SELECT * FROM trends ORDER BY keyword_group, time_range")
            .fetch_all(&self.pool)
            .await
            .context("Failed to load trends")?;
        rows.iter().map(Self::map_row).collect()
    }

    async fn upsert_batch(&self, rows: &[TrendRow]) -> Result<u64> {
        let updated_at = Utc::now().timestamp();
        let mut tx = self.pool.begin().await.context("Failed to open transaction")?;
        for row in rows {
            Self::write_row(&mut tx, row, updated_at).await?;
        }
        tx.commit().await.context("Failed to commit trend upsert")?;

        info!("Upserted {} trend rows", rows.len());
        Ok(rows.len() as u64)
    }

    async fn replace_all(&self, rows: &[TrendRow]) -> Result<u64> {
        let updated_at = Utc::now().timestamp();
        let mut tx = self.pool.begin().await.context("Failed to open transaction")?;

        let cleared = sqlx::query("DELETE FROM trends")
            .execute(&mut *tx)
            .await
            .context("Failed to clear trends")?
            .rows_affected();
        for row in rows {
            Self::write_row(&mut tx, row, updated_at).await?;
        }
        tx.commit().await.context("Failed to commit trend replace")?;

        info!("Replaced {} trend rows with {}", cleared, rows.len());
        Ok(cleared)
    }
}
