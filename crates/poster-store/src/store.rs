//! Storage traits
//!
//! Handlers only see these traits. [`crate::PgStore`] backs them with
//! PostgreSQL and [`crate::MemoryStore`] with a pair of maps.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::model::{InsertOutcome, NewPurchase, Poster, Purchase, PurchaseDetails};

/// Read access to the poster catalog
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Get a poster by id, published or not
    async fn get_poster(&self, id: Uuid) -> Result<Option<Poster>>;

    /// All published posters ordered by title
    async fn list_published(&self) -> Result<Vec<Poster>>;
}

/// Purchase persistence
#[async_trait]
pub trait PurchaseStore: Send + Sync {
    /// Insert unless a row for the same session id exists.
    ///
    /// The check and the write are a single atomic step, so concurrent
    /// deliveries of the same session produce exactly one row.
    async fn insert_if_absent(&self, purchase: &NewPurchase) -> Result<InsertOutcome>;

    /// Get a purchase by payment session id
    async fn get_purchase(&self, session_id: &str) -> Result<Option<Purchase>>;

    /// Get a purchase together with its poster
    async fn get_purchase_with_poster(&self, session_id: &str) -> Result<Option<PurchaseDetails>>;

    /// Record the receipt URL. Returns false if no row matched.
    async fn set_receipt_url(&self, session_id: &str, receipt_url: &str) -> Result<bool>;

    /// Delete a purchase. Returns false if no row matched.
    async fn delete_purchase(&self, session_id: &str) -> Result<bool>;

    /// Newest purchases first
    async fn recent_purchases(&self, limit: u32) -> Result<Vec<Purchase>>;

    async fn count_purchases(&self) -> Result<u64>;
}

/// Everything the server needs from a backing store
pub trait Store: CatalogStore + PurchaseStore {}

impl<T: CatalogStore + PurchaseStore> Store for T {}
