//! Poster shop HTTP Server
//!
//! Axum-based server for checkout, Stripe webhooks, purchase lookup and
//! purchase emails.

mod config;
mod error;
mod handlers;
mod routes;
mod state;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use poster_payments::{EmailJsConfig, EmailJsMailer, Mailer, PaymentGateway, StripeClient};
use poster_store::{MemoryStore, PgStore, Store};

use crate::config::ServerConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env();

    // Storage
    let (store, store_kind): (Arc<dyn Store>, &'static str) = match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url, config.database_max_connections).await?;
            if config.database_auto_migrate {
                store.migrate().await?;
            }
            let store: Arc<dyn Store> = Arc::new(store);
            (store, "postgres")
        }
        None => {
            tracing::warn!("⚠ DATABASE_URL not set - using in-memory store");
            tracing::warn!("  Purchases will be lost on restart");
            let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
            (store, "memory")
        }
    };

    // Payments
    let payments: Option<Arc<dyn PaymentGateway>> = match StripeClient::from_env() {
        Ok(client) => {
            tracing::info!("✓ Stripe configured");
            Some(Arc::new(client) as Arc<dyn PaymentGateway>)
        }
        Err(e) => {
            tracing::warn!("⚠ Stripe not configured - payments disabled ({e})");
            tracing::warn!("  Set STRIPE_SECRET_KEY and STRIPE_WEBHOOK_SECRET in .env");
            None
        }
    };

    // Email
    let mailer: Option<Arc<dyn Mailer>> = match EmailJsConfig::from_env() {
        Ok(email_config) => {
            tracing::info!("✓ Email configured");
            Some(Arc::new(EmailJsMailer::new(email_config)) as Arc<dyn Mailer>)
        }
        Err(e) => {
            tracing::warn!("⚠ Email not configured - purchase emails disabled ({e})");
            None
        }
    };

    if config.diagnostics_enabled {
        tracing::warn!("⚠ Diagnostic routes enabled");
    }

    let addr = config.bind_addr.clone();
    let site_url = config.site_url.clone();

    // Build application state
    let state = AppState {
        config: Arc::new(config),
        store,
        store_kind,
        payments,
        mailer,
    };

    let app = routes::router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🖼  poster-server running on http://{}", addr);
    tracing::info!("   site: {}", site_url);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                      - Health check");
    tracing::info!("  GET  /sitemap.xml                 - Sitemap");
    tracing::info!("  GET  /api/posters                 - Published posters");
    tracing::info!("  POST /api/checkout                - Create Stripe checkout");
    tracing::info!("  POST /api/webhook                 - Stripe webhook");
    tracing::info!("  POST /api/purchases               - Record purchase");
    tracing::info!("  GET  /api/purchases/:session_id   - Look up purchase");
    tracing::info!("  POST /api/send-email              - Send purchase email");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
