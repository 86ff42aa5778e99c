//! Purchase lookup and writer

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use poster_store::{NewPurchase, PosterSummary, Purchase, PurchaseStatus, PurchaseStore};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub session_id: String,
    pub poster_id: Uuid,
    pub status: PurchaseStatus,
    pub customer_email: Option<String>,
    pub receipt_url: Option<String>,
    pub canva_link: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<PosterSummary>,
}

impl PurchaseResponse {
    pub fn new(purchase: Purchase, poster: Option<PosterSummary>) -> Self {
        Self {
            session_id: purchase.stripe_session_id,
            poster_id: purchase.poster_id,
            status: purchase.status,
            customer_email: purchase.customer_email,
            receipt_url: purchase.receipt_url,
            canva_link: purchase.canva_link,
            created_at: purchase.created_at,
            poster,
        }
    }
}

/// Look up a purchase by checkout session id.
///
/// If the joined query fails the purchase is served without its poster.
pub async fn get_purchase(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<PurchaseResponse>, ApiError> {
    let response = match state.store.get_purchase_with_poster(&session_id).await {
        Ok(details) => details.map(|d| PurchaseResponse::new(d.purchase, d.poster)),
        Err(e) => {
            tracing::warn!(error = %e, session_id = %session_id, "Joined purchase lookup failed, retrying without poster");
            state
                .store
                .get_purchase(&session_id)
                .await?
                .map(|p| PurchaseResponse::new(p, None))
        }
    };

    response
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Purchase not found"))
}

#[derive(Debug, Deserialize)]
pub struct PurchaseBody {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub poster_id: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub receipt_url: Option<String>,
    #[serde(default)]
    pub canva_link: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PurchaseWriteResponse {
    pub created: bool,
    pub purchase: PurchaseResponse,
}

/// Record a purchase unless one exists for the session
pub async fn create_purchase(
    State(state): State<AppState>,
    body: Result<Json<PurchaseBody>, JsonRejection>,
) -> Result<(StatusCode, Json<PurchaseWriteResponse>), ApiError> {
    let Json(body) = body?;

    let session_id = body
        .session_id
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("session_id is required"))?;
    let poster_id = body
        .poster_id
        .ok_or_else(|| ApiError::bad_request("poster_id is required"))
        .and_then(|raw| {
            Uuid::parse_str(raw.trim()).map_err(|_| ApiError::bad_request("poster_id must be a UUID"))
        })?;

    let new_purchase = NewPurchase {
        stripe_session_id: session_id,
        poster_id,
        customer_email: body.customer_email,
        status: body
            .status
            .as_deref()
            .map_or(PurchaseStatus::Completed, PurchaseStatus::parse),
        receipt_url: body.receipt_url,
        canva_link: body.canva_link,
    };

    let outcome = state.store.insert_if_absent(&new_purchase).await?;
    let created = outcome.is_created();
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };

    tracing::info!(session_id = %new_purchase.stripe_session_id, created, "Purchase write");

    Ok((
        status,
        Json(PurchaseWriteResponse {
            created,
            purchase: PurchaseResponse::new(outcome.into_purchase(), None),
        }),
    ))
}
