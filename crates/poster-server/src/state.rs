//! Application State

use std::sync::Arc;

use poster_payments::{Mailer, PaymentGateway};
use poster_store::Store;

use crate::config::ServerConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,

    /// Catalog and purchases (PostgreSQL, or in-memory without DATABASE_URL)
    pub store: Arc<dyn Store>,

    /// "postgres" or "memory"
    pub store_kind: &'static str,

    /// Stripe client (optional - None if not configured)
    pub payments: Option<Arc<dyn PaymentGateway>>,

    /// Email dispatcher (optional - None if not configured)
    pub mailer: Option<Arc<dyn Mailer>>,
}
