//! Stripe Checkout Integration
//!
//! Implements the "Stripe Checkout (Hosted)" approach: one one-off payment
//! session per poster, paid on Stripe's page.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stripe::{
    CheckoutSession as StripeCheckoutSession, CheckoutSessionMode, Client,
    CreateCheckoutSession, CreateCheckoutSessionLineItems,
    CreateCheckoutSessionLineItemsPriceData,
    CreateCheckoutSessionLineItemsPriceDataProductData, Currency, ListCheckoutSessions,
    PaymentIntent, PaymentIntentId,
};

use poster_store::Poster;

use crate::error::{PaymentError, Result};
use crate::webhook::SessionDetails;

/// Operations the shop needs from the payment provider
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Secret used to sign webhook deliveries
    fn webhook_secret(&self) -> &str;

    /// Open a hosted checkout session for a single poster
    async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession>;

    /// Receipt URL of the charge behind a payment intent, if Stripe has one
    async fn receipt_url(&self, payment_intent_id: &str) -> Result<Option<String>>;

    /// Most recent checkout sessions, newest first
    async fn recent_sessions(&self, limit: u8) -> Result<Vec<SessionDetails>>;
}

/// Stripe client wrapper
pub struct StripeClient {
    client: Client,
    webhook_secret: String,
}

impl StripeClient {
    /// Create a new Stripe client
    pub fn new(secret_key: &str, webhook_secret: &str) -> Self {
        Self {
            client: Client::new(secret_key),
            webhook_secret: webhook_secret.to_string(),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let secret_key = std::env::var("STRIPE_SECRET_KEY")
            .map_err(|_| PaymentError::Config("STRIPE_SECRET_KEY not set".into()))?;
        let webhook_secret = std::env::var("STRIPE_WEBHOOK_SECRET")
            .map_err(|_| PaymentError::Config("STRIPE_WEBHOOK_SECRET not set".into()))?;

        Ok(Self::new(&secret_key, &webhook_secret))
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    fn webhook_secret(&self) -> &str {
        &self.webhook_secret
    }

    async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession> {
        let poster = &request.poster;
        let currency = parse_currency(&poster.currency)?;
        let poster_id = poster.id.to_string();

        let mut params = CreateCheckoutSession::new();
        params.mode = Some(CheckoutSessionMode::Payment);
        params.success_url = Some(&request.success_url);
        params.cancel_url = Some(&request.cancel_url);
        params.client_reference_id = Some(&poster_id);
        params.customer_email = request.customer_email.as_deref();

        // Webhook and backfill read the poster back from here
        let mut metadata = std::collections::HashMap::new();
        metadata.insert("poster_id".to_string(), poster_id.clone());
        params.metadata = Some(metadata);

        params.line_items = Some(vec![CreateCheckoutSessionLineItems {
            quantity: Some(1),
            price_data: Some(CreateCheckoutSessionLineItemsPriceData {
                currency,
                unit_amount: Some(poster.price_cents),
                product_data: Some(CreateCheckoutSessionLineItemsPriceDataProductData {
                    name: poster.title.clone(),
                    description: poster.description.clone(),
                    images: poster.image_url.clone().map(|url| vec![url]),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }]);

        let session = StripeCheckoutSession::create(&self.client, params)
            .await
            .map_err(|e| PaymentError::Stripe(e.to_string()))?;

        let url = session
            .url
            .ok_or_else(|| PaymentError::Stripe("No checkout URL returned".into()))?;

        tracing::info!(
            session_id = %session.id,
            poster_id = %poster_id,
            "Created checkout session"
        );

        Ok(CheckoutSession {
            id: session.id.to_string(),
            url,
        })
    }

    async fn receipt_url(&self, payment_intent_id: &str) -> Result<Option<String>> {
        let id: PaymentIntentId = payment_intent_id
            .parse()
            .map_err(|_| PaymentError::InvalidRequest(format!("bad payment intent id: {payment_intent_id}")))?;

        let intent = PaymentIntent::retrieve(&self.client, &id, &["latest_charge"])
            .await
            .map_err(|e| PaymentError::Stripe(e.to_string()))?;

        let value = serde_json::to_value(&intent).map_err(|e| PaymentError::Stripe(e.to_string()))?;
        Ok(value
            .pointer("/latest_charge/receipt_url")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string))
    }

    async fn recent_sessions(&self, limit: u8) -> Result<Vec<SessionDetails>> {
        let mut params = ListCheckoutSessions::new();
        params.limit = Some(u64::from(limit));

        let sessions = StripeCheckoutSession::list(&self.client, &params)
            .await
            .map_err(|e| PaymentError::Stripe(e.to_string()))?;

        sessions
            .data
            .iter()
            .map(|session| {
                let value = serde_json::to_value(session)
                    .map_err(|e| PaymentError::Stripe(e.to_string()))?;
                SessionDetails::from_object(&value)
            })
            .collect()
    }
}

/// Map a catalog currency code onto Stripe's currency enum
fn parse_currency(code: &str) -> Result<Currency> {
    serde_json::from_value(serde_json::Value::String(code.trim().to_lowercase()))
        .map_err(|_| PaymentError::Config(format!("unsupported catalog currency: {code}")))
}

/// Request to create a checkout session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Poster being bought
    pub poster: Poster,

    /// Prefills the email field on the hosted page
    #[serde(default)]
    pub customer_email: Option<String>,

    /// URL to redirect after successful payment
    pub success_url: String,

    /// URL to redirect if checkout is cancelled
    pub cancel_url: String,
}

/// Result of creating a checkout session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Stripe session ID
    pub id: String,

    /// URL to redirect user to
    pub url: String,
}
