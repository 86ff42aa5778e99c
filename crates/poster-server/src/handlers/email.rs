//! Email dispatcher

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use serde::Serialize;

use poster_payments::PurchaseEmail;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SendEmailResponse {
    pub sent: bool,
}

/// Send a purchase email through the template provider
pub async fn send_email(
    State(state): State<AppState>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<SendEmailResponse>, ApiError> {
    let Json(body) = body?;

    let text = |key: &str| {
        body.get(key)
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let email = PurchaseEmail {
        to_email: text("to_email").ok_or_else(|| ApiError::bad_request("to_email is required"))?,
        customer_name: text("customer_name"),
        poster_title: text("poster_title")
            .ok_or_else(|| ApiError::bad_request("poster_title is required"))?,
        canva_link: text("canva_link"),
        receipt_url: text("receipt_url"),
        session_id: text("session_id"),
    };

    let mailer = state
        .mailer
        .as_ref()
        .ok_or_else(|| ApiError::internal("Email not configured"))?;

    mailer.send(&email).await?;

    Ok(Json(SendEmailResponse { sent: true }))
}
