//! In-memory store (for development and tests)

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::Result;
use crate::model::{InsertOutcome, NewPurchase, Poster, Purchase, PurchaseDetails};
use crate::store::{CatalogStore, PurchaseStore};

/// Catalog and purchases held in process memory
pub struct MemoryStore {
    posters: RwLock<HashMap<Uuid, Poster>>,
    purchases: RwLock<HashMap<String, Purchase>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            posters: RwLock::new(HashMap::new()),
            purchases: RwLock::new(HashMap::new()),
        }
    }

    /// Seed the catalog
    pub fn with_posters(posters: impl IntoIterator<Item = Poster>) -> Self {
        let store = Self::new();
        for poster in posters {
            store.upsert_poster(poster);
        }
        store
    }

    pub fn upsert_poster(&self, poster: Poster) {
        self.posters.write().insert(poster.id, poster);
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn get_poster(&self, id: Uuid) -> Result<Option<Poster>> {
        Ok(self.posters.read().get(&id).cloned())
    }

    async fn list_published(&self) -> Result<Vec<Poster>> {
        let mut posters: Vec<Poster> = self
            .posters
            .read()
            .values()
            .filter(|p| p.is_published)
            .cloned()
            .collect();
        posters.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(posters)
    }
}

#[async_trait]
impl PurchaseStore for MemoryStore {
    async fn insert_if_absent(&self, purchase: &NewPurchase) -> Result<InsertOutcome> {
        purchase.validate()?;

        // Check and insert under one write guard
        let mut purchases = self.purchases.write();
        if let Some(existing) = purchases.get(&purchase.stripe_session_id) {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }

        let row = purchase.clone().into_purchase(Uuid::new_v4(), Utc::now());
        purchases.insert(row.stripe_session_id.clone(), row.clone());
        Ok(InsertOutcome::Created(row))
    }

    async fn get_purchase(&self, session_id: &str) -> Result<Option<Purchase>> {
        Ok(self.purchases.read().get(session_id).cloned())
    }

    async fn get_purchase_with_poster(&self, session_id: &str) -> Result<Option<PurchaseDetails>> {
        let Some(purchase) = self.purchases.read().get(session_id).cloned() else {
            return Ok(None);
        };
        let poster = self.posters.read().get(&purchase.poster_id).map(Poster::summary);
        Ok(Some(PurchaseDetails { purchase, poster }))
    }

    async fn set_receipt_url(&self, session_id: &str, receipt_url: &str) -> Result<bool> {
        let mut purchases = self.purchases.write();
        match purchases.get_mut(session_id) {
            Some(purchase) => {
                purchase.receipt_url = Some(receipt_url.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_purchase(&self, session_id: &str) -> Result<bool> {
        Ok(self.purchases.write().remove(session_id).is_some())
    }

    async fn recent_purchases(&self, limit: u32) -> Result<Vec<Purchase>> {
        let mut purchases: Vec<Purchase> = self.purchases.read().values().cloned().collect();
        purchases.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        purchases.truncate(limit as usize);
        Ok(purchases)
    }

    async fn count_purchases(&self) -> Result<u64> {
        Ok(self.purchases.read().len() as u64)
    }
}
