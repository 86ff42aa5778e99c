//! PostgreSQL store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::model::{
    InsertOutcome, NewPurchase, Poster, PosterSummary, Purchase, PurchaseDetails, PurchaseStatus,
};
use crate::store::{CatalogStore, PurchaseStore};

const SCHEMA: &str = include_str!("../migrations/0001_schema.sql");

const PURCHASE_COLUMNS: &str = "id, stripe_session_id, poster_id, customer_email, status, \
     receipt_url, canva_link, created_at";

const POSTER_COLUMNS: &str =
    "id, title, description, image_url, price_cents, currency, canva_link, is_published";

#[derive(sqlx::FromRow)]
struct PurchaseRow {
    id: Uuid,
    stripe_session_id: String,
    poster_id: Uuid,
    customer_email: Option<String>,
    status: String,
    receipt_url: Option<String>,
    canva_link: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<PurchaseRow> for Purchase {
    fn from(row: PurchaseRow) -> Self {
        Self {
            id: row.id,
            stripe_session_id: row.stripe_session_id,
            poster_id: row.poster_id,
            customer_email: row.customer_email,
            status: PurchaseStatus::parse(&row.status),
            receipt_url: row.receipt_url,
            canva_link: row.canva_link,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PurchaseJoinRow {
    #[sqlx(flatten)]
    purchase: PurchaseRow,
    poster_ref: Option<Uuid>,
    poster_title: Option<String>,
    poster_image_url: Option<String>,
}

impl From<PurchaseJoinRow> for PurchaseDetails {
    fn from(row: PurchaseJoinRow) -> Self {
        let poster = match (row.poster_ref, row.poster_title) {
            (Some(id), Some(title)) => Some(PosterSummary {
                id,
                title,
                image_url: row.poster_image_url,
            }),
            _ => None,
        };
        Self {
            purchase: row.purchase.into(),
            poster,
        }
    }
}

/// Store backed by a PostgreSQL connection pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect a new pool
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        tracing::info!(max_connections, "Connected to PostgreSQL");
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create tables and indexes if they are missing
    pub async fn migrate(&self) -> Result<()> {
        self.pool.execute(SCHEMA).await?;
        tracing::info!("Database schema applied");
        Ok(())
    }

    async fn fetch_purchase(&self, session_id: &str) -> Result<Option<Purchase>> {
        let sql = format!("SELECT {PURCHASE_COLUMNS} FROM purchases WHERE stripe_session_id = $1");
        let row = sqlx::query_as::<_, PurchaseRow>(&sql)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn get_poster(&self, id: Uuid) -> Result<Option<Poster>> {
        let sql = format!("SELECT {POSTER_COLUMNS} FROM posters WHERE id = $1");
        let poster = sqlx::query_as::<_, Poster>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(poster)
    }

    async fn list_published(&self) -> Result<Vec<Poster>> {
        let sql =
            format!("SELECT {POSTER_COLUMNS} FROM posters WHERE is_published ORDER BY title");
        let posters = sqlx::query_as::<_, Poster>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(posters)
    }
}

#[async_trait]
impl PurchaseStore for PgStore {
    async fn insert_if_absent(&self, purchase: &NewPurchase) -> Result<InsertOutcome> {
        purchase.validate()?;

        let sql = format!(
            "INSERT INTO purchases \
                 (stripe_session_id, poster_id, customer_email, status, receipt_url, canva_link) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (stripe_session_id) DO NOTHING \
             RETURNING {PURCHASE_COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, PurchaseRow>(&sql)
            .bind(&purchase.stripe_session_id)
            .bind(purchase.poster_id)
            .bind(&purchase.customer_email)
            .bind(purchase.status.as_str())
            .bind(&purchase.receipt_url)
            .bind(&purchase.canva_link)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = inserted {
            return Ok(InsertOutcome::Created(row.into()));
        }

        tracing::debug!(session_id = %purchase.stripe_session_id, "Purchase already recorded");
        self.fetch_purchase(&purchase.stripe_session_id)
            .await?
            .map(InsertOutcome::Existing)
            .ok_or_else(|| StoreError::Conflict(purchase.stripe_session_id.clone()))
    }

    async fn get_purchase(&self, session_id: &str) -> Result<Option<Purchase>> {
        self.fetch_purchase(session_id).await
    }

    async fn get_purchase_with_poster(&self, session_id: &str) -> Result<Option<PurchaseDetails>> {
        let row = sqlx::query_as::<_, PurchaseJoinRow>(
            "SELECT p.id, p.stripe_session_id, p.poster_id, p.customer_email, p.status, \
                    p.receipt_url, p.canva_link, p.created_at, \
                    c.id AS poster_ref, c.title AS poster_title, c.image_url AS poster_image_url \
             FROM purchases p \
             LEFT JOIN posters c ON c.id = p.poster_id \
             WHERE p.stripe_session_id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn set_receipt_url(&self, session_id: &str, receipt_url: &str) -> Result<bool> {
        let result =
            sqlx::query("UPDATE purchases SET receipt_url = $2 WHERE stripe_session_id = $1")
                .bind(session_id)
                .bind(receipt_url)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_purchase(&self, session_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM purchases WHERE stripe_session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn recent_purchases(&self, limit: u32) -> Result<Vec<Purchase>> {
        let sql =
            format!("SELECT {PURCHASE_COLUMNS} FROM purchases ORDER BY created_at DESC LIMIT $1");
        let rows = sqlx::query_as::<_, PurchaseRow>(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count_purchases(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM purchases")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}
