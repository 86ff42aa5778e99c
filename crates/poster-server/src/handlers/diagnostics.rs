//! Diagnostic probes
//!
//! Only mounted when `DIAGNOSTICS_ENABLED` is set. Used for manual
//! troubleshooting of the purchases table and the Stripe connection.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use uuid::Uuid;

use poster_payments::{BackfillReport, MAX_BACKFILL_SESSIONS, backfill_purchases};
use poster_store::{NewPurchase, PurchaseStatus, PurchaseStore};

use crate::error::ApiError;
use crate::handlers::purchases::PurchaseResponse;
use crate::state::AppState;

/// Session ids written by the probe start with this
pub const PROBE_PREFIX: &str = "diag_";

const RECENT_LIMIT: u32 = 20;

/// Variables reported by the config probe
const CONFIG_VARS: &[&str] = &[
    "SITE_URL",
    "DATABASE_URL",
    "STRIPE_SECRET_KEY",
    "STRIPE_WEBHOOK_SECRET",
    "EMAILJS_SERVICE_ID",
    "EMAILJS_TEMPLATE_ID",
    "EMAILJS_PUBLIC_KEY",
    "EMAILJS_PRIVATE_KEY",
];

fn env_presence(lookup: impl Fn(&str) -> Option<String>) -> BTreeMap<&'static str, bool> {
    CONFIG_VARS
        .iter()
        .map(|&name| (name, lookup(name).is_some_and(|v| !v.trim().is_empty())))
        .collect()
}

#[derive(Debug, Serialize)]
pub struct ConfigDump {
    pub store: &'static str,
    pub site_url: String,
    pub payments_configured: bool,
    pub email_configured: bool,
    pub database_auto_migrate: bool,
    pub env: BTreeMap<&'static str, bool>,
}

/// Which integrations are wired up. Never echoes secrets.
pub async fn config_dump(State(state): State<AppState>) -> Json<ConfigDump> {
    Json(ConfigDump {
        store: state.store_kind,
        site_url: state.config.site_url.clone(),
        payments_configured: state.payments.is_some(),
        email_configured: state.mailer.is_some(),
        database_auto_migrate: state.config.database_auto_migrate,
        env: env_presence(|name| std::env::var(name).ok()),
    })
}

#[derive(Debug, Serialize)]
pub struct RecentPurchases {
    pub count: u64,
    pub recent: Vec<PurchaseResponse>,
}

pub async fn list_recent_purchases(
    State(state): State<AppState>,
) -> Result<Json<RecentPurchases>, ApiError> {
    let count = state.store.count_purchases().await?;
    let recent = state
        .store
        .recent_purchases(RECENT_LIMIT)
        .await?
        .into_iter()
        .map(|p| PurchaseResponse::new(p, None))
        .collect();

    Ok(Json(RecentPurchases { count, recent }))
}

#[derive(Debug, Serialize)]
pub struct ProbeStep {
    pub step: &'static str,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbeStep {
    fn from_result<T>(step: &'static str, result: Result<T, String>) -> Self {
        match result {
            Ok(_) => Self {
                step,
                ok: true,
                error: None,
            },
            Err(error) => Self {
                step,
                ok: false,
                error: Some(error),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProbeReport {
    pub session_id: String,
    pub ok: bool,
    pub steps: Vec<ProbeStep>,
}

/// Insert, read back and delete a throwaway purchase row
pub async fn run_probe(State(state): State<AppState>) -> Json<ProbeReport> {
    let session_id = format!("{PROBE_PREFIX}{}", Uuid::new_v4().simple());
    let probe = NewPurchase {
        stripe_session_id: session_id.clone(),
        poster_id: Uuid::nil(),
        customer_email: Some("probe@diagnostics.invalid".into()),
        status: PurchaseStatus::Probe,
        receipt_url: None,
        canva_link: None,
    };

    let insert = state
        .store
        .insert_if_absent(&probe)
        .await
        .map_err(|e| e.to_string());

    let select = match state.store.get_purchase(&session_id).await {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err("probe row not found".to_string()),
        Err(e) => Err(e.to_string()),
    };

    let delete = match state.store.delete_purchase(&session_id).await {
        Ok(true) => Ok(()),
        Ok(false) => Err("probe row not deleted".to_string()),
        Err(e) => Err(e.to_string()),
    };

    let steps = vec![
        ProbeStep::from_result("insert", insert),
        ProbeStep::from_result("select", select),
        ProbeStep::from_result("delete", delete),
    ];
    let ok = steps.iter().all(|s| s.ok);
    tracing::info!(session_id = %session_id, ok, "Diagnostic probe finished");

    Json(ProbeReport {
        session_id,
        ok,
        steps,
    })
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

/// Remove a leftover probe row. Real purchases cannot be deleted here.
pub async fn delete_probe_purchase(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    if !session_id.starts_with(PROBE_PREFIX) {
        return Err(ApiError::bad_request(format!(
            "only {PROBE_PREFIX}* sessions can be deleted"
        )));
    }

    if state.store.delete_purchase(&session_id).await? {
        Ok(Json(DeleteResponse { deleted: true }))
    } else {
        Err(ApiError::not_found("Purchase not found"))
    }
}

/// Import recent paid Stripe sessions as purchases
pub async fn backfill(State(state): State<AppState>) -> Result<Json<BackfillReport>, ApiError> {
    let gateway = state
        .payments
        .as_ref()
        .ok_or_else(|| ApiError::internal("Payments not configured"))?;

    let report =
        backfill_purchases(gateway.as_ref(), state.store.as_ref(), MAX_BACKFILL_SESSIONS).await?;
    Ok(Json(report))
}
