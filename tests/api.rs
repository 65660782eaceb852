//! Integration tests for the REST API over in-memory backends.
//!
//! Tests: pricing read and quote, sync trigger and status, event intake
//! and flush, session lifecycle, inquiries, authorization.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::Duration;
use serde_json::{Value, json};
use tokio_test::assert_ok;
use tower::ServiceExt;

use nest_pricing_gateway::api::build_router;
use nest_pricing_gateway::api::extract::ADMIN_PASSWORD_HEADER;
use nest_pricing_gateway::app_state::{AppState, Backends};
use nest_pricing_gateway::buffer::MemoryEventBuffer;
use nest_pricing_gateway::domain::{AuthPolicy, SystemClock};
use nest_pricing_gateway::persistence::{
    MemoryAnalyticsStore, MemoryInquiryStore, MemorySnapshotStore,
};
use nest_pricing_gateway::sheets::{CellValue, SheetSource, StaticSheetSource};

const CRON_SECRET: &str = "cron-secret";
const ADMIN_PASSWORD: &str = "admin-pw";

struct TestApp {
    state: AppState,
    source: Arc<StaticSheetSource>,
}

fn row(key: &str, name: &str, price: f64) -> Vec<CellValue> {
    vec![key.into(), name.into(), price.into()]
}

fn workbook() -> StaticSheetSource {
    StaticSheetSource::new()
        .with_rows(
            "Nest",
            vec![
                vec!["nest80".into(), "Nest 80".into(), 177_000.0.into(), 75.0.into()],
                vec!["nest100".into(), "Nest 100".into(), 213_000.0.into(), 95.0.into()],
            ],
        )
        .with_rows(
            "Gebaeudehuelle",
            vec![
                row("trapezblech", "Trapezblech", 0.0),
                row("holzlattung", "Holzlattung Laerche", 9_600.0),
            ],
        )
        .with_rows("Innenverkleidung", vec![row("kiefer", "Kiefer", 0.0)])
        .with_rows("Fussboden", vec![row("parkett", "Parkett Eiche", 0.0)])
        .with_rows("Fenster", vec![row("holz", "Holz Fenster", 400.0)])
        .with_rows("Belichtungspaket", vec![row("light", "Light", 0.0)])
        .with_rows(
            "PV-Anlage",
            vec![vec!["pv".into(), "PV Modul".into(), 1_500.0.into(), 10.0.into()]],
        )
        .with_rows("Planungspaket", vec![row("basis", "Basis", 0.0)])
        .with_rows(
            "Optionen",
            vec![
                row("grundstueckscheck", "Grundstückscheck", 490.0),
                vec!["kamin".into(), "Kamin".into(), "-".into()],
            ],
        )
}

fn test_app() -> TestApp {
    let source = Arc::new(workbook());
    let backends = Backends {
        source: Arc::clone(&source) as Arc<dyn SheetSource>,
        snapshots: Arc::new(MemorySnapshotStore::new(10)),
        analytics: Arc::new(MemoryAnalyticsStore::new()),
        inquiries: Arc::new(MemoryInquiryStore::new()),
        buffer: Arc::new(MemoryEventBuffer::new(100)),
    };
    let auth = AuthPolicy {
        cron_secret: Some(CRON_SECRET.to_string()),
        admin_password: Some(ADMIN_PASSWORD.to_string()),
    };
    let state = AppState::new(backends, Duration::seconds(300), auth, Arc::new(SystemClock));
    TestApp { state, source }
}

impl TestApp {
    fn router(&self) -> Router {
        build_router().with_state(self.state.clone())
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        if bytes.is_empty() {
            return (status, Value::Null);
        }
        let body: Value = assert_ok!(serde_json::from_slice(&bytes));
        (status, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn get_as_admin(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .header(ADMIN_PASSWORD_HEADER, ADMIN_PASSWORD)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    async fn json(&self, method: Method, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn sync(&self, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/pricing/sync")
            .header(header::AUTHORIZATION, format!("Bearer {CRON_SECRET}"));
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();
        self.send(request).await
    }

    async fn flush(&self) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/analytics/flush")
            .header(header::AUTHORIZATION, format!("Bearer {CRON_SECRET}"))
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }
}

#[tokio::test]
async fn health_is_public() {
    let app = test_app();
    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn pricing_before_first_sync_is_not_found() {
    let app = test_app();
    let (status, body) = app.get("/api/v1/pricing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], 2001);
}

#[tokio::test]
async fn sync_requires_credentials() {
    let app = test_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/pricing/sync")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/pricing/sync")
        .header(header::AUTHORIZATION, "Bearer wrong")
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sync_then_read_returns_prices_in_cents() {
    let app = test_app();
    let (status, report) = app.sync(None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["success"], true);
    assert_eq!(report["version"], 1);
    assert_eq!(report["written"], true);
    assert_eq!(report["itemsAdded"], 12);
    assert_eq!(report["itemsUnchanged"], 0);

    let (status, body) = app.get("/api/v1/pricing").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["version"], 1);
    assert_eq!(body["cached"], false);
    assert_eq!(body["data"]["nest"]["nest80"]["price"], 17_700_000);
    assert_eq!(body["data"]["nest"]["nest100"]["price"], 21_300_000);
    assert_eq!(body["data"]["nest"]["nest80"]["squareMeters"], 75);
    assert_eq!(body["data"]["optionen"]["kamin"]["onRequest"], true);

    let (_, body) = app.get("/api/v1/pricing").await;
    assert_eq!(body["cached"], true);
}

#[tokio::test]
async fn second_sync_with_unchanged_source_reports_no_changes() {
    let app = test_app();
    app.sync(None).await;
    let (status, report) = app.sync(None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["itemsAdded"], 0);
    assert_eq!(report["itemsUpdated"], 0);
    assert_eq!(report["itemsRemoved"], 0);
    assert_eq!(report["itemsUnchanged"], 12);
    assert_eq!(report["written"], false);
    assert_eq!(report["version"], 1);

    let (_, report) = app.sync(Some(json!({ "forceRefresh": true }))).await;
    assert_eq!(report["written"], true);
    assert_eq!(report["version"], 2);
}

#[tokio::test]
async fn price_change_invalidates_cache() {
    let app = test_app();
    app.sync(None).await;
    app.get("/api/v1/pricing").await;

    app.source
        .set_rows(
            "Fenster",
            vec![row("holz", "Holz Fenster", 450.0), row("alu", "Alu Fenster", 500.0)],
        )
        .await;
    let (_, report) = app.sync(None).await;
    assert_eq!(report["itemsUpdated"], 1);
    assert_eq!(report["itemsAdded"], 1);
    assert_eq!(report["changes"][0]["category"], "fenster");

    let (_, body) = app.get("/api/v1/pricing").await;
    assert_eq!(body["cached"], false);
    assert_eq!(body["version"], 2);
    assert_eq!(body["data"]["fenster"]["holz"]["price"], 45_000);
}

#[tokio::test]
async fn sync_with_unreachable_source_keeps_serving_previous_snapshot() {
    let app = test_app();
    app.sync(None).await;
    app.source
        .set_unavailable(Some("connection refused".to_string()))
        .await;

    let (status, body) = app.sync(None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);

    let (status, body) = app.get("/api/v1/pricing").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], 1);

    let (status, body) = app.get_as_admin("/api/v1/pricing/sync/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lastSync"]["status"], "failed");
}

#[tokio::test]
async fn sync_status_requires_credentials() {
    let app = test_app();
    let (status, _) = app.get("/api/v1/pricing/sync/status").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.get_as_admin("/api/v1/pricing/sync/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lastSync"], Value::Null);
}

#[tokio::test]
async fn quote_prices_configuration() {
    let app = test_app();
    app.sync(None).await;

    let configuration = json!({
        "nest": "nest80",
        "selections": [
            { "category": "gebaeudehuelle", "value": "trapezblech" },
            { "category": "pvanlage", "value": "pv", "quantity": 2 },
        ],
        "grundstueckscheck": true,
    });
    let (status, body) = app
        .json(Method::POST, "/api/v1/pricing/quote", json!({ "configuration": configuration }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pricingVersion"], 1);
    assert_eq!(body["basePrice"], 17_700_000);
    assert_eq!(body["totalPrice"], 18_049_000);
    assert_eq!(body["squareMeters"], 75);
    assert_eq!(body["pricePerSquareMeter"], 240_653);
    assert_eq!(body["options"][1]["unitPrice"], 150_000);
    assert_eq!(body["options"][1]["price"], 300_000);
}

#[tokio::test]
async fn quote_with_unknown_category_is_rejected() {
    let app = test_app();
    app.sync(None).await;

    let configuration = json!({
        "nest": "nest80",
        "selections": [{ "category": "dach", "value": "flach" }],
    });
    let (status, body) = app
        .json(Method::POST, "/api/v1/pricing/quote", json!({ "configuration": configuration }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], 1002);
}

#[tokio::test]
async fn quote_with_price_on_request_is_rejected() {
    let app = test_app();
    app.sync(None).await;

    let configuration = json!({
        "nest": "nest80",
        "selections": [{ "category": "optionen", "value": "kamin" }],
    });
    let (status, _) = app
        .json(Method::POST, "/api/v1/pricing/quote", json!({ "configuration": configuration }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn events_are_flushed_into_session() {
    let app = test_app();
    for (event_type, value) in [("click", None), ("selection", Some("nest80"))] {
        let (status, body) = app
            .json(
                Method::POST,
                "/api/v1/sessions/s-1/events",
                json!({ "eventType": event_type, "category": "nest", "value": value }),
            )
            .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert!(body["eventId"].is_string());
    }

    let (status, _) = app.get("/api/v1/sessions/s-1").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.get_as_admin("/api/v1/sessions/s-1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, report) = app.flush().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["success"], true);
    assert_eq!(report["sessionsFlushed"], 1);
    assert_eq!(report["eventsFlushed"], 2);

    let (status, session) = app.get_as_admin("/api/v1/sessions/s-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["status"], "ACTIVE");
    assert_eq!(session["eventCount"], 2);
}

#[tokio::test]
async fn flush_with_nothing_pending_reports_zeros() {
    let app = test_app();
    let (status, report) = app.flush().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        report,
        json!({ "success": true, "sessionsFlushed": 0, "eventsFlushed": 0, "errors": [] })
    );

    let request = Request::builder()
        .uri("/api/v1/analytics/flush")
        .header(ADMIN_PASSWORD_HEADER, ADMIN_PASSWORD)
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn flush_requires_credentials() {
    let app = test_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/analytics/flush")
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn event_without_type_is_rejected() {
    let app = test_app();
    let (status, body) = app
        .json(
            Method::POST,
            "/api/v1/sessions/s-1/events",
            json!({ "eventType": " ", "category": "nest" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 1001);
}

#[tokio::test]
async fn session_lifecycle_transitions() {
    let app = test_app();
    let uri = "/api/v1/sessions/s-2/status";

    let request = Request::builder()
        .method(Method::PATCH)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
        .body(Body::from(json!({ "status": "IN_CART" }).to_string()))
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "IN_CART");
    assert_eq!(body["ipAddress"], "203.0.113.9");

    let (status, body) = app.json(Method::PATCH, uri, json!({ "status": "COMPLETED" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "COMPLETED");

    let (status, body) = app.json(Method::PATCH, uri, json!({ "status": "ACTIVE" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], 1003);

    let (status, _) = app.json(Method::PATCH, uri, json!({ "status": "SHIPPED" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn inquiry_keeps_its_quoted_price() {
    let app = test_app();
    app.sync(None).await;

    let request = json!({
        "sessionId": "s-3",
        "name": "Anna Muster",
        "email": "anna@example.com",
        "message": "Bitte um Rückruf",
        "configuration": {
            "nest": "nest100",
            "selections": [{ "category": "gebaeudehuelle", "value": "holzlattung" }],
        },
    });
    let (status, created) = app.json(Method::POST, "/api/v1/inquiries", request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["totalPrice"], 22_260_000);
    assert_eq!(created["pricingVersion"], 1);
    let id = created["inquiryId"].as_str().unwrap().to_string();

    app.source
        .set_rows("Gebaeudehuelle", vec![row("holzlattung", "Holzlattung Laerche", 12_000.0)])
        .await;
    let (_, report) = app.sync(None).await;
    assert_eq!(report["version"], 2);

    let uri = format!("/api/v1/inquiries/{id}");
    let (status, _) = app.get(&uri).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.get_as_admin(&uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["inquiry"]["totalPrice"], 22_260_000);
    assert_eq!(body["inquiry"]["pricingVersion"], 1);
    assert_eq!(body["inquiry"]["email"], "anna@example.com");

    let (_, session) = app.get_as_admin("/api/v1/sessions/s-3").await;
    assert_eq!(session["totalPrice"], 22_260_000);
}

#[tokio::test]
async fn inquiry_with_bad_email_is_rejected() {
    let app = test_app();
    app.sync(None).await;

    let request = json!({
        "name": "Anna",
        "email": "not-an-email",
        "configuration": { "nest": "nest80" },
    });
    let (status, body) = app.json(Method::POST, "/api/v1/inquiries", request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn unknown_inquiry_is_not_found() {
    let app = test_app();
    let (status, body) = app
        .get_as_admin("/api/v1/inquiries/00000000-0000-4000-8000-000000000000")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 2003);
}
