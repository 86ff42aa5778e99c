//! Checkout initiator

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use poster_payments::CheckoutRequest;
use poster_store::CatalogStore;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
    #[serde(default)]
    pub poster_id: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub url: String,
    pub session_id: String,
}

/// Create Stripe checkout session for one published poster
pub async fn create_checkout(
    State(state): State<AppState>,
    body: Result<Json<CheckoutBody>, JsonRejection>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let Json(body) = body?;

    let raw_id = body
        .poster_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("poster_id is required"))?;
    let poster_id = Uuid::parse_str(raw_id.trim())
        .map_err(|_| ApiError::bad_request("poster_id must be a UUID"))?;

    let payments = state
        .payments
        .as_ref()
        .ok_or_else(|| ApiError::internal("Payments not configured"))?;

    let poster = state
        .store
        .get_poster(poster_id)
        .await?
        .filter(|p| p.is_published)
        .ok_or_else(|| ApiError::not_found("Poster not found"))?;

    let site = &state.config.site_url;
    let request = CheckoutRequest {
        success_url: format!("{site}/success?session_id={{CHECKOUT_SESSION_ID}}"),
        cancel_url: format!("{site}/posters/{poster_id}?canceled=true"),
        customer_email: body.customer_email.filter(|e| !e.trim().is_empty()),
        poster,
    };

    let session = payments.create_checkout_session(request).await?;

    Ok(Json(CheckoutResponse {
        url: session.url,
        session_id: session.id,
    }))
}
