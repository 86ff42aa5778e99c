//! HTTP Handlers

mod checkout;
mod diagnostics;
mod email;
mod health;
mod posters;
mod purchases;
mod sitemap;
mod webhook;

use crate::error::ApiError;

pub use checkout::create_checkout;
pub use diagnostics::{
    backfill, config_dump, delete_probe_purchase, list_recent_purchases, run_probe,
};
pub use email::send_email;
pub use health::health_check;
pub use posters::list_posters;
pub use purchases::{create_purchase, get_purchase};
pub use sitemap::sitemap;
pub use webhook::stripe_webhook;

/// Answers methods a route does not register.
/// `OPTIONS` never gets here: the CORS layer replies to it first.
pub async fn method_fallback() -> ApiError {
    ApiError::method_not_allowed()
}

pub async fn not_found() -> ApiError {
    ApiError::not_found("Not found")
}
