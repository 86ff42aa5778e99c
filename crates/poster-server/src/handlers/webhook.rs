//! Stripe webhook receiver

use axum::{Json, body::Bytes, extract::State, http::HeaderMap};
use serde::Serialize;

use poster_payments::{WebhookHandler, WebhookOutcome};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate: Option<bool>,
}

/// Stripe webhook handler. Needs the raw body for signature verification.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    let gateway = state
        .payments
        .clone()
        .ok_or_else(|| ApiError::internal("Payments not configured"))?;

    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::bad_request("Missing Stripe signature"))?;

    let handler = WebhookHandler::new(state.store.clone(), gateway, state.mailer.clone());

    let event = handler.parse_event(&body, signature).map_err(|e| {
        tracing::warn!(error = %e, "Webhook rejected");
        ApiError::from(e)
    })?;

    let duplicate = match handler.handle(event).await? {
        WebhookOutcome::Recorded(_) => Some(false),
        WebhookOutcome::Duplicate(_) => Some(true),
        WebhookOutcome::Ignored { .. } => None,
    };

    Ok(Json(WebhookResponse {
        received: true,
        duplicate,
    }))
}
