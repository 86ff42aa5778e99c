//! Catalog and purchase records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, StoreError};

/// A sellable poster from the catalog
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Poster {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,

    /// Price in the smallest currency unit
    pub price_cents: i64,

    /// Lowercase ISO 4217 code (e.g. "usd")
    pub currency: String,

    /// Delivery link sent to the buyer after payment
    pub canva_link: Option<String>,

    pub is_published: bool,
}

impl Poster {
    /// Create an unpublished poster priced in USD
    pub fn new(title: impl Into<String>, price_cents: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: None,
            image_url: None,
            price_cents,
            currency: "usd".into(),
            canva_link: None,
            is_published: false,
        }
    }

    #[must_use]
    pub fn published(mut self) -> Self {
        self.is_published = true;
        self
    }

    #[must_use]
    pub fn with_canva_link(mut self, link: impl Into<String>) -> Self {
        self.canva_link = Some(link.into());
        self
    }

    pub fn summary(&self) -> PosterSummary {
        PosterSummary {
            id: self.id,
            title: self.title.clone(),
            image_url: self.image_url.clone(),
        }
    }
}

/// The slice of a poster shown next to a purchase
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosterSummary {
    pub id: Uuid,
    pub title: String,
    pub image_url: Option<String>,
}

/// Purchase lifecycle status
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PurchaseStatus {
    /// Payment finished
    #[default]
    Completed,
    /// Recorded before payment finished
    Pending,
    /// Written by the diagnostic probe
    Probe,
    /// Any value written by another tool
    Other(String),
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Completed => "completed",
            Self::Pending => "pending",
            Self::Probe => "probe",
            Self::Other(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "completed" => Self::Completed,
            "pending" => Self::Pending,
            "probe" => Self::Probe,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for PurchaseStatus {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<PurchaseStatus> for String {
    fn from(status: PurchaseStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded purchase, keyed by the payment provider's session id
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: Uuid,
    pub stripe_session_id: String,
    pub poster_id: Uuid,
    pub customer_email: Option<String>,
    pub status: PurchaseStatus,
    pub receipt_url: Option<String>,
    pub canva_link: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for a purchase that has not been written yet
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPurchase {
    pub stripe_session_id: String,
    pub poster_id: Uuid,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub status: PurchaseStatus,
    #[serde(default)]
    pub receipt_url: Option<String>,
    #[serde(default)]
    pub canva_link: Option<String>,
}

impl NewPurchase {
    /// A completed purchase with no optional fields set
    pub fn completed(session_id: impl Into<String>, poster_id: Uuid) -> Self {
        Self {
            stripe_session_id: session_id.into(),
            poster_id,
            customer_email: None,
            status: PurchaseStatus::Completed,
            receipt_url: None,
            canva_link: None,
        }
    }

    /// Reject rows the purchases table would accept but nobody could look up
    pub fn validate(&self) -> Result<()> {
        if self.stripe_session_id.trim().is_empty() {
            return Err(StoreError::Invalid("stripe_session_id is empty".into()));
        }
        Ok(())
    }

    pub(crate) fn into_purchase(self, id: Uuid, created_at: DateTime<Utc>) -> Purchase {
        Purchase {
            id,
            stripe_session_id: self.stripe_session_id,
            poster_id: self.poster_id,
            customer_email: self.customer_email,
            status: self.status,
            receipt_url: self.receipt_url,
            canva_link: self.canva_link,
            created_at,
        }
    }
}

/// Purchase joined with its catalog row
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseDetails {
    pub purchase: Purchase,

    /// None when the poster row no longer exists
    pub poster: Option<PosterSummary>,
}

/// Result of an insert guarded by the session-id uniqueness constraint
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written
    Created(Purchase),
    /// A row for this session already existed and was left untouched
    Existing(Purchase),
}

impl InsertOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    pub fn purchase(&self) -> &Purchase {
        match self {
            Self::Created(p) | Self::Existing(p) => p,
        }
    }

    pub fn into_purchase(self) -> Purchase {
        match self {
            Self::Created(p) | Self::Existing(p) => p,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_unknown_values() {
        assert_eq!(PurchaseStatus::parse("completed"), PurchaseStatus::Completed);
        let refunded = PurchaseStatus::parse("refunded");
        assert_eq!(refunded.as_str(), "refunded");
    }

    #[test]
    fn test_status_serializes_as_plain_string() {
        let json = serde_json::to_string(&PurchaseStatus::Probe).unwrap();
        assert_eq!(json, "\"probe\"");
    }

    #[test]
    fn test_new_purchase_defaults_from_json() {
        let poster_id = Uuid::new_v4();
        let json = serde_json::json!({
            "stripe_session_id": "cs_test_1",
            "poster_id": poster_id,
        });
        let purchase: NewPurchase = serde_json::from_value(json).unwrap();
        assert_eq!(purchase.status, PurchaseStatus::Completed);
        assert!(purchase.customer_email.is_none());
    }

    #[test]
    fn test_blank_session_id_is_invalid() {
        let purchase = NewPurchase::completed("  ", Uuid::new_v4());
        assert!(matches!(purchase.validate(), Err(StoreError::Invalid(_))));
    }
}
