//! Router assembly

use axum::{
    Router,
    routing::{MethodRouter, delete, get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{
    backfill, config_dump, create_checkout, create_purchase, delete_probe_purchase,
    get_purchase, health_check, list_posters, list_recent_purchases, method_fallback, not_found,
    run_probe, send_email, sitemap, stripe_webhook,
};
use crate::state::AppState;

fn route(method_router: MethodRouter<AppState>) -> MethodRouter<AppState> {
    method_router.fallback(method_fallback)
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        // Health & static
        .route("/health", route(get(health_check)))
        .route("/sitemap.xml", route(get(sitemap)))

        // Catalog & checkout
        .route("/api/posters", route(get(list_posters)))
        .route("/api/checkout", route(post(create_checkout)))
        .route("/api/webhook", route(post(stripe_webhook)))

        // Purchases & fulfillment
        .route("/api/purchases", route(post(create_purchase)))
        .route("/api/purchases/{session_id}", route(get(get_purchase)))
        .route("/api/send-email", route(post(send_email)));

    if state.config.diagnostics_enabled {
        app = app
            .route("/api/diagnostics/config", route(get(config_dump)))
            .route("/api/diagnostics/purchases", route(get(list_recent_purchases)))
            .route(
                "/api/diagnostics/purchases/{session_id}",
                route(delete(delete_probe_purchase)),
            )
            .route("/api/diagnostics/probe", route(post(run_probe)))
            .route("/api/diagnostics/backfill", route(post(backfill)));
    }

    app.fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use parking_lot::Mutex;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use uuid::Uuid;

    use poster_payments::{
        CheckoutRequest, CheckoutSession, Mailer, PaymentError, PaymentGateway, PurchaseEmail,
        SessionDetails, sign_payload,
    };
    use poster_store::{
        CatalogStore, InsertOutcome, MemoryStore, NewPurchase, Poster, Purchase,
        PurchaseDetails, PurchaseStore, StoreError,
    };

    use super::*;
    use crate::config::ServerConfig;

    const SECRET: &str = "whsec_router_test";

    #[derive(Default)]
    struct FakeGateway {
        created: Mutex<Vec<CheckoutRequest>>,
    }

    #[async_trait]
    impl PaymentGateway for FakeGateway {
        fn webhook_secret(&self) -> &str {
            SECRET
        }

        async fn create_checkout_session(
            &self,
            request: CheckoutRequest,
        ) -> poster_payments::Result<CheckoutSession> {
            let id = format!("cs_test_{}", request.poster.id.simple());
            self.created.lock().push(request);
            Ok(CheckoutSession {
                url: format!("https://checkout.stripe.com/c/pay/{id}"),
                id,
            })
        }

        async fn receipt_url(&self, _id: &str) -> poster_payments::Result<Option<String>> {
            Ok(None)
        }

        async fn recent_sessions(&self, _limit: u8) -> poster_payments::Result<Vec<SessionDetails>> {
            Err(PaymentError::Stripe("listing unavailable".into()))
        }
    }

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<PurchaseEmail>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: &PurchaseEmail) -> poster_payments::Result<()> {
            self.sent.lock().push(email.clone());
            Ok(())
        }
    }

    /// Memory store whose joined lookup always fails
    struct BrokenJoinStore(MemoryStore);

    #[async_trait]
    impl CatalogStore for BrokenJoinStore {
        async fn get_poster(&self, id: Uuid) -> poster_store::Result<Option<Poster>> {
            self.0.get_poster(id).await
        }

        async fn list_published(&self) -> poster_store::Result<Vec<Poster>> {
            self.0.list_published().await
        }
    }

    #[async_trait]
    impl PurchaseStore for BrokenJoinStore {
        async fn insert_if_absent(&self, p: &NewPurchase) -> poster_store::Result<InsertOutcome> {
            self.0.insert_if_absent(p).await
        }

        async fn get_purchase(&self, id: &str) -> poster_store::Result<Option<Purchase>> {
            self.0.get_purchase(id).await
        }

        async fn get_purchase_with_poster(
            &self,
            _id: &str,
        ) -> poster_store::Result<Option<PurchaseDetails>> {
            Err(StoreError::Conflict("join unavailable".into()))
        }

        async fn set_receipt_url(&self, id: &str, url: &str) -> poster_store::Result<bool> {
            self.0.set_receipt_url(id, url).await
        }

        async fn delete_purchase(&self, id: &str) -> poster_store::Result<bool> {
            self.0.delete_purchase(id).await
        }

        async fn recent_purchases(&self, limit: u32) -> poster_store::Result<Vec<Purchase>> {
            self.0.recent_purchases(limit).await
        }

        async fn count_purchases(&self) -> poster_store::Result<u64> {
            self.0.count_purchases().await
        }
    }

    struct Harness {
        app: Router,
        store: Arc<MemoryStore>,
        gateway: Arc<FakeGateway>,
        mailer: Arc<RecordingMailer>,
        published: Poster,
        draft: Poster,
    }

    fn harness(diagnostics_enabled: bool) -> Harness {
        let published = Poster::new("Night Market", 2500)
            .published()
            .with_canva_link("https://canva.example/design/1");
        let draft = Poster::new("Unreleased", 1500);
        let store = Arc::new(MemoryStore::with_posters([published.clone(), draft.clone()]));
        let gateway = Arc::new(FakeGateway::default());
        let mailer = Arc::new(RecordingMailer::default());

        let state = AppState {
            config: Arc::new(ServerConfig {
                site_url: "https://posters.example".into(),
                diagnostics_enabled,
                ..ServerConfig::default()
            }),
            store: store.clone(),
            store_kind: "memory",
            payments: Some(gateway.clone() as Arc<dyn PaymentGateway>),
            mailer: Some(mailer.clone() as Arc<dyn Mailer>),
        };

        Harness {
            app: router(state),
            store,
            gateway,
            mailer,
            published,
            draft,
        }
    }

    fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn webhook_request(payload: &[u8], signature: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/webhook")
            .header("stripe-signature", signature)
            .body(Body::from(payload.to_vec()))
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn completed_payload(session_id: &str, poster_id: Uuid) -> Vec<u8> {
        json!({
            "id": "evt_router",
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": session_id,
                "status": "complete",
                "payment_status": "paid",
                "metadata": { "poster_id": poster_id.to_string() },
                "customer_details": { "email": "buyer@example.com" }
            }}
        })
        .to_string()
        .into_bytes()
    }

    #[tokio::test]
    async fn test_checkout_for_published_poster_returns_url() {
        let h = harness(false);
        let (status, body) = send(
            &h.app,
            json_request("POST", "/api/checkout", &json!({ "poster_id": h.published.id })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["url"].as_str().unwrap().starts_with("https://checkout.stripe.com/"));

        let created = h.gateway.created.lock();
        assert_eq!(
            created[0].success_url,
            "https://posters.example/success?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(
            created[0].cancel_url,
            format!("https://posters.example/posters/{}?canceled=true", h.published.id)
        );
    }

    #[tokio::test]
    async fn test_checkout_for_unpublished_or_missing_poster_is_404() {
        let h = harness(false);
        for id in [h.draft.id, Uuid::new_v4()] {
            let (status, body) =
                send(&h.app, json_request("POST", "/api/checkout", &json!({ "poster_id": id }))).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body["error"], "Poster not found");
        }
        assert!(h.gateway.created.lock().is_empty());
    }

    #[tokio::test]
    async fn test_checkout_validates_input() {
        let h = harness(false);
        let (status, body) = send(&h.app, json_request("POST", "/api/checkout", &json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "poster_id is required");

        let (status, _) = send(
            &h.app,
            json_request("POST", "/api/checkout", &json!({ "poster_id": "not-a-uuid" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_webhook_with_bad_signature_writes_nothing() {
        let h = harness(false);
        let payload = completed_payload("cs_bad_sig", h.published.id);
        let now = chrono::Utc::now().timestamp();
        let forged = sign_payload(&payload, "whsec_wrong", now).unwrap();

        let (status, body) = send(&h.app, webhook_request(&payload, &forged)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid signature");
        assert_eq!(h.store.count_purchases().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_webhook_without_signature_is_400() {
        let h = harness(false);
        let request = Request::builder()
            .method("POST")
            .uri("/api/webhook")
            .body(Body::from("{}"))
            .unwrap();
        let (status, _) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_webhook_delivered_twice_records_one_purchase() {
        let h = harness(false);
        let payload = completed_payload("cs_twice", h.published.id);
        let signature = sign_payload(&payload, SECRET, chrono::Utc::now().timestamp()).unwrap();

        let (status, body) = send(&h.app, webhook_request(&payload, &signature)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["duplicate"], false);

        let (status, body) = send(&h.app, webhook_request(&payload, &signature)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["duplicate"], true);

        assert_eq!(h.store.count_purchases().await.unwrap(), 1);
        assert_eq!(h.mailer.sent.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_webhook_ignores_other_events() {
        let h = harness(false);
        let payload = br#"{"id":"evt_x","type":"payment_intent.created","data":{"object":{}}}"#;
        let signature = sign_payload(payload, SECRET, chrono::Utc::now().timestamp()).unwrap();

        let (status, body) = send(&h.app, webhook_request(payload, &signature)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "received": true }));
    }

    #[tokio::test]
    async fn test_purchase_lookup_joins_poster() {
        let h = harness(false);
        h.store
            .insert_if_absent(&NewPurchase::completed("cs_lookup", h.published.id))
            .await
            .unwrap();

        let (status, body) = send(&h.app, empty_request("GET", "/api/purchases/cs_lookup")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session_id"], "cs_lookup");
        assert_eq!(body["poster"]["title"], "Night Market");
    }

    #[tokio::test]
    async fn test_purchase_lookup_unknown_session_is_404() {
        let h = harness(false);
        let (status, body) = send(&h.app, empty_request("GET", "/api/purchases/cs_nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Purchase not found");
    }

    #[tokio::test]
    async fn test_purchase_lookup_falls_back_when_join_fails() {
        let memory = MemoryStore::new();
        let poster_id = Uuid::new_v4();
        memory
            .insert_if_absent(&NewPurchase::completed("cs_fallback", poster_id))
            .await
            .unwrap();

        let state = AppState {
            config: Arc::new(ServerConfig::default()),
            store: Arc::new(BrokenJoinStore(memory)),
            store_kind: "memory",
            payments: None,
            mailer: None,
        };
        let app = router(state);

        let (status, body) = send(&app, empty_request("GET", "/api/purchases/cs_fallback")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session_id"], "cs_fallback");
        assert!(body.get("poster").is_none());
    }

    #[tokio::test]
    async fn test_purchase_writer_is_idempotent() {
        let h = harness(false);
        let body = json!({
            "session_id": "cs_manual",
            "poster_id": h.published.id,
            "customer_email": "buyer@example.com"
        });

        let (status, first) = send(&h.app, json_request("POST", "/api/purchases", &body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(first["created"], true);

        let (status, second) = send(&h.app, json_request("POST", "/api/purchases", &body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["created"], false);
        assert_eq!(h.store.count_purchases().await.unwrap(), 1);

        let (status, _) = send(
            &h.app,
            json_request("POST", "/api/purchases", &json!({ "poster_id": h.published.id })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_send_email_requires_recipient_and_title() {
        let h = harness(false);
        let (status, _) = send(
            &h.app,
            json_request("POST", "/api/send-email", &json!({ "poster_title": "X" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &h.app,
            json_request(
                "POST",
                "/api/send-email",
                &json!({ "to_email": "buyer@example.com", "poster_title": "Night Market" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sent"], true);
        assert_eq!(h.mailer.sent.lock()[0].poster_title, "Night Market");
    }

    #[tokio::test]
    async fn test_sitemap_is_xml_when_site_url_unset() {
        let state = AppState {
            config: Arc::new(ServerConfig::default()),
            store: Arc::new(MemoryStore::new()),
            store_kind: "memory",
            payments: None,
            mailer: None,
        };
        let response = router(state)
            .oneshot(empty_request("GET", "/sitemap.xml"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response.headers()["content-type"]
                .to_str()
                .unwrap()
                .starts_with("application/xml")
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let xml = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(xml.contains("<loc>http://localhost:3000/</loc>"));
    }

    #[tokio::test]
    async fn test_wrong_method_is_405_and_options_is_answered() {
        let h = harness(false);
        let (status, body) = send(&h.app, empty_request("GET", "/api/checkout")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["error"], "Method not allowed");

        let request = Request::builder()
            .method("OPTIONS")
            .uri("/api/checkout")
            .header("origin", "https://posters.example")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();
        let response = h.app.clone().oneshot(request).await.unwrap();
        assert!(response.status().is_success());
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }

    #[tokio::test]
    async fn test_payments_unconfigured_is_500() {
        let state = AppState {
            config: Arc::new(ServerConfig::default()),
            store: Arc::new(MemoryStore::new()),
            store_kind: "memory",
            payments: None,
            mailer: None,
        };
        let app = router(state);
        let (status, body) = send(
            &app,
            json_request("POST", "/api/checkout", &json!({ "poster_id": Uuid::new_v4() })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Payments not configured");
    }

    #[tokio::test]
    async fn test_diagnostics_hidden_unless_enabled() {
        let h = harness(false);
        let (status, _) = send(&h.app, empty_request("POST", "/api/diagnostics/probe")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_diagnostic_probe_leaves_no_rows() {
        let h = harness(true);
        let (status, body) = send(&h.app, empty_request("POST", "/api/diagnostics/probe")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["steps"].as_array().unwrap().len(), 3);
        assert_eq!(h.store.count_purchases().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_diagnostic_delete_only_touches_probe_rows() {
        let h = harness(true);
        h.store
            .insert_if_absent(&NewPurchase::completed("cs_real", h.published.id))
            .await
            .unwrap();

        let (status, _) =
            send(&h.app, empty_request("DELETE", "/api/diagnostics/purchases/cs_real")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(h.store.count_purchases().await.unwrap(), 1);

        let (status, _) =
            send(&h.app, empty_request("DELETE", "/api/diagnostics/purchases/diag_gone")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_backfill_surfaces_listing_failure() {
        let h = harness(true);
        let (status, body) = send(&h.app, empty_request("POST", "/api/diagnostics/backfill")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["details"], "Stripe error: listing unavailable");
    }

    #[tokio::test]
    async fn test_posters_listing_hides_drafts_and_links() {
        let h = harness(false);
        let (status, body) = send(&h.app, empty_request("GET", "/api/posters")).await;
        assert_eq!(status, StatusCode::OK);
        let posters = body.as_array().unwrap();
        assert_eq!(posters.len(), 1);
        assert_eq!(posters[0]["title"], "Night Market");
        assert!(posters[0].get("canva_link").is_none());
    }

    #[tokio::test]
    async fn test_health_reports_configuration() {
        let h = harness(false);
        let (status, body) = send(&h.app, empty_request("GET", "/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["payments_configured"], true);
        assert_eq!(body["store"], "memory");
    }

    #[tokio::test]
    async fn test_diagnostic_config_never_echoes_values() {
        let h = harness(true);
        let (status, body) = send(&h.app, empty_request("GET", "/api/diagnostics/config")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["env"]["STRIPE_SECRET_KEY"].is_boolean());
        assert_eq!(body["email_configured"], true);
    }

    #[tokio::test]
    async fn test_diagnostic_purchases_lists_twenty_newest() {
        let h = harness(true);
        for i in 0..25 {
            h.store
                .insert_if_absent(&NewPurchase::completed(format!("cs_{i:02}"), h.published.id))
                .await
                .unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let (status, body) = send(&h.app, empty_request("GET", "/api/diagnostics/purchases")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 25);

        let recent = body["recent"].as_array().unwrap();
        assert_eq!(recent.len(), 20);
        assert_eq!(recent[0]["session_id"], "cs_24");
        assert_eq!(recent[19]["session_id"], "cs_05");
    }
}
