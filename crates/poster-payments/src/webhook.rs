//! Stripe Webhook Handling
//!
//! Verifies signed deliveries and turns `checkout.session.completed` events
//! into purchase rows, receipt links and a confirmation email.

use std::sync::Arc;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use uuid::Uuid;

use poster_store::{CatalogStore, NewPurchase, Purchase, PurchaseStatus, PurchaseStore};

use crate::checkout::PaymentGateway;
use crate::email::{Mailer, PurchaseEmail};
use crate::error::{PaymentError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Deliveries signed further than this from now are rejected
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

/// Verify a `Stripe-Signature` header against the raw request body
pub fn verify_signature(payload: &[u8], signature_header: &str, secret: &str) -> Result<()> {
    verify_signature_at(payload, signature_header, secret, chrono::Utc::now().timestamp())
}

fn verify_signature_at(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    now: i64,
) -> Result<()> {
    let mut timestamp = None;
    let mut candidates = Vec::new();

    // t=<unix>,v1=<hex>[,v1=<hex>...]; other schemes are ignored
    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| PaymentError::WebhookSignature("missing timestamp".into()))?;
    if candidates.is_empty() {
        return Err(PaymentError::WebhookSignature("missing v1 signature".into()));
    }

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| PaymentError::WebhookSignature("invalid timestamp".into()))?;
    if now.abs_diff(ts) > SIGNATURE_TOLERANCE_SECS.unsigned_abs() {
        return Err(PaymentError::WebhookSignature("timestamp outside tolerance".into()));
    }

    let mac = signed_mac(payload, secret, timestamp)?;
    let matched = candidates.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });

    if matched {
        Ok(())
    } else {
        Err(PaymentError::WebhookSignature("no matching signature".into()))
    }
}

fn signed_mac(payload: &[u8], secret: &str, timestamp: &str) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| PaymentError::Config("invalid webhook secret".into()))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Build a `Stripe-Signature` header value for a payload.
///
/// Used by local tooling and tests that replay deliveries.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> Result<String> {
    let ts = timestamp.to_string();
    let mac = signed_mac(payload, secret, &ts)?;
    Ok(format!("t={ts},v1={}", hex::encode(mac.finalize().into_bytes())))
}

/// The parts of a Checkout Session object this shop reads
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionDetails {
    pub session_id: String,

    /// From `metadata.poster_id`, falling back to `client_reference_id`
    pub poster_id: Option<Uuid>,

    /// From `customer_details.email`, falling back to `customer_email`
    pub customer_email: Option<String>,

    pub payment_intent_id: Option<String>,

    /// Session status (`open`, `complete`, `expired`)
    pub status: Option<String>,

    /// Payment status (`paid`, `unpaid`, `no_payment_required`)
    pub payment_status: Option<String>,
}

impl SessionDetails {
    /// Read a Checkout Session JSON object
    pub fn from_object(object: &Value) -> Result<Self> {
        let session_id = object
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| PaymentError::WebhookParse("session object has no id".into()))?
            .to_string();

        let poster_id = object
            .pointer("/metadata/poster_id")
            .and_then(Value::as_str)
            .or_else(|| object.get("client_reference_id").and_then(Value::as_str))
            .and_then(|raw| Uuid::parse_str(raw).ok());

        let customer_email = object
            .pointer("/customer_details/email")
            .and_then(Value::as_str)
            .or_else(|| object.get("customer_email").and_then(Value::as_str))
            .map(str::to_string);

        // Either an id or an expanded object
        let payment_intent_id = match object.get("payment_intent") {
            Some(Value::String(id)) => Some(id.clone()),
            Some(Value::Object(intent)) => intent.get("id").and_then(Value::as_str).map(str::to_string),
            _ => None,
        };

        let text = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_string);

        Ok(Self {
            session_id,
            poster_id,
            customer_email,
            payment_intent_id,
            status: text("status"),
            payment_status: text("payment_status"),
        })
    }

    /// Completed and paid
    pub fn is_paid(&self) -> bool {
        self.status.as_deref() == Some("complete") && self.payment_status.as_deref() == Some("paid")
    }
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(default)]
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
}

#[derive(Deserialize)]
struct RawEventData {
    object: Value,
}

/// Parsed webhook event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookEvent {
    /// Checkout completed - record the purchase
    CheckoutCompleted {
        event_id: String,
        session: SessionDetails,
    },

    /// Unhandled event type
    Other { event_id: String, event_type: String },
}

impl WebhookEvent {
    /// Parse an event body (signature must already be verified)
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let raw: RawEvent =
            serde_json::from_slice(payload).map_err(|e| PaymentError::WebhookParse(e.to_string()))?;

        if raw.event_type == CHECKOUT_COMPLETED {
            Ok(Self::CheckoutCompleted {
                event_id: raw.id,
                session: SessionDetails::from_object(&raw.data.object)?,
            })
        } else {
            Ok(Self::Other {
                event_id: raw.id,
                event_type: raw.event_type,
            })
        }
    }
}

/// What processing a webhook did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// First delivery for this session; row written
    Recorded(Purchase),

    /// Row already existed; nothing written, no email sent
    Duplicate(Purchase),

    /// Event type this shop does not act on
    Ignored { event_type: String },
}

/// Webhook handler
pub struct WebhookHandler<S: CatalogStore + PurchaseStore + ?Sized> {
    store: Arc<S>,
    gateway: Arc<dyn PaymentGateway>,
    mailer: Option<Arc<dyn Mailer>>,
}

impl<S: CatalogStore + PurchaseStore + ?Sized> WebhookHandler<S> {
    pub fn new(
        store: Arc<S>,
        gateway: Arc<dyn PaymentGateway>,
        mailer: Option<Arc<dyn Mailer>>,
    ) -> Self {
        Self {
            store,
            gateway,
            mailer,
        }
    }

    /// Verify webhook signature and parse event
    pub fn parse_event(&self, payload: &[u8], signature: &str) -> Result<WebhookEvent> {
        verify_signature(payload, signature, self.gateway.webhook_secret())?;
        WebhookEvent::parse(payload)
    }

    /// Process a webhook event
    pub async fn handle(&self, event: WebhookEvent) -> Result<WebhookOutcome> {
        match event {
            WebhookEvent::CheckoutCompleted { event_id, session } => {
                tracing::info!(
                    event_id = %event_id,
                    session_id = %session.session_id,
                    "Processing checkout completion"
                );
                self.record_purchase(session).await
            }

            WebhookEvent::Other {
                event_id,
                event_type,
            } => {
                tracing::debug!(event_id = %event_id, event_type = %event_type, "Unhandled webhook event");
                Ok(WebhookOutcome::Ignored { event_type })
            }
        }
    }

    async fn record_purchase(&self, session: SessionDetails) -> Result<WebhookOutcome> {
        let poster_id = session.poster_id.ok_or_else(|| {
            PaymentError::WebhookParse(format!("session {} has no poster_id", session.session_id))
        })?;

        let poster = self.store.get_poster(poster_id).await?;
        if poster.is_none() {
            tracing::warn!(poster_id = %poster_id, "Purchased poster not in catalog");
        }

        let new_purchase = NewPurchase {
            stripe_session_id: session.session_id.clone(),
            poster_id,
            customer_email: session.customer_email.clone(),
            status: PurchaseStatus::Completed,
            receipt_url: None,
            canva_link: poster.as_ref().and_then(|p| p.canva_link.clone()),
        };

        let outcome = self.store.insert_if_absent(&new_purchase).await?;
        if !outcome.is_created() {
            tracing::info!(session_id = %session.session_id, "Duplicate delivery ignored");
            return Ok(WebhookOutcome::Duplicate(outcome.into_purchase()));
        }

        let mut purchase = outcome.into_purchase();
        tracing::info!(
            session_id = %purchase.stripe_session_id,
            poster_id = %poster_id,
            "Recorded purchase"
        );

        if let Some(receipt_url) = self.lookup_receipt(&session).await {
            match self.store.set_receipt_url(&purchase.stripe_session_id, &receipt_url).await {
                Ok(_) => purchase.receipt_url = Some(receipt_url),
                Err(e) => tracing::warn!(error = %e, "Failed to store receipt URL"),
            }
        }

        self.send_confirmation(&purchase, poster.as_ref().map(|p| p.title.as_str()))
            .await;

        Ok(WebhookOutcome::Recorded(purchase))
    }

    async fn lookup_receipt(&self, session: &SessionDetails) -> Option<String> {
        let intent_id = session.payment_intent_id.as_deref()?;
        match self.gateway.receipt_url(intent_id).await {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(error = %e, payment_intent = %intent_id, "Receipt lookup failed");
                None
            }
        }
    }

    async fn send_confirmation(&self, purchase: &Purchase, poster_title: Option<&str>) {
        let Some(mailer) = &self.mailer else {
            tracing::debug!("Email not configured, skipping confirmation");
            return;
        };
        let Some(to_email) = purchase.customer_email.clone() else {
            tracing::warn!(session_id = %purchase.stripe_session_id, "No customer email on session");
            return;
        };

        let email = PurchaseEmail {
            to_email,
            customer_name: None,
            poster_title: poster_title.unwrap_or("your poster").to_string(),
            canva_link: purchase.canva_link.clone(),
            receipt_url: purchase.receipt_url.clone(),
            session_id: Some(purchase.stripe_session_id.clone()),
        };

        if let Err(e) = mailer.send(&email).await {
            tracing::warn!(error = %e, session_id = %purchase.stripe_session_id, "Confirmation email failed");
        }
    }
}
