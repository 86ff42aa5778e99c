//! Server Configuration
//!
//! Read once at startup from the environment (after `.env` is loaded).

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_SITE_URL: &str = "http://localhost:3000";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Settings owned by the server itself.
///
/// Stripe and email settings are read by their clients' `from_env()`.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Listen address
    pub bind_addr: String,

    /// Public site root, without a trailing slash
    pub site_url: String,

    /// PostgreSQL URL; None falls back to the in-memory store
    pub database_url: Option<String>,

    pub database_max_connections: u32,

    /// Apply the bundled schema at startup
    pub database_auto_migrate: bool,

    /// Mount the diagnostic and backfill routes
    pub diagnostics_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.into(),
            site_url: DEFAULT_SITE_URL.into(),
            database_url: None,
            database_max_connections: DEFAULT_MAX_CONNECTIONS,
            database_auto_migrate: false,
            diagnostics_enabled: false,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());
        let flag = |key: &str| {
            non_empty(key).is_some_and(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
        };

        let site_url = non_empty("SITE_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_SITE_URL.into());

        Self {
            bind_addr: non_empty("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into()),
            site_url,
            database_url: non_empty("DATABASE_URL"),
            database_max_connections: non_empty("DATABASE_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
            database_auto_migrate: flag("DATABASE_AUTO_MIGRATE"),
            diagnostics_enabled: flag("DIAGNOSTICS_ENABLED"),
        }
    }
}
