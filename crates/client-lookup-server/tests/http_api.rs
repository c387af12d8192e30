//! HTTP-level tests for the client lookup server.
//!
//! Drives the router in-process with `oneshot`: login, role gating, preview
//! versus search, uploads in both ingest modes, and error status mapping.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use client_lookup_core::{
    AccessController, BundledDefault, DatasetResolver, FileTableStore, IngestMode,
    LookupService, MemoryTableStore, NoPersistence, NormalizeOptions, Record, Secrets, Table,
    TableStore,
};
use client_lookup_server::{build_router, AppState};

// ── Test app builder ───────────────────────────────────────────

fn default_table() -> Table {
    let mut rows = vec![
        Record::new("Alice Smith", "VIP", "Tom"),
        Record::new("Bob Jones", "Standard", "Tom"),
        Record::new("Carol Smith", "VIP", "Jane"),
    ];
    rows.extend((0..25).map(|i| Record::new(format!("Filler {i}"), "Prospect", "Lee")));
    Table::new(rows)
}

fn app_with(store: Arc<dyn TableStore>, mode: IngestMode, max_upload_bytes: usize) -> axum::Router {
    let resolver = DatasetResolver::new(
        store,
        BundledDefault::preloaded("crm_contacts.csv", default_table()),
        mode,
    )
    .with_max_upload_bytes(max_upload_bytes);
    let service = LookupService::new(
        AccessController::new(Secrets::new("user-pw", "admin-pw").unwrap()),
        resolver,
        20,
    );
    build_router(AppState::new(service, max_upload_bytes))
}

fn service(store: Arc<dyn TableStore>, mode: IngestMode) -> LookupService {
    let resolver = DatasetResolver::new(
        store,
        BundledDefault::preloaded("crm_contacts.csv", default_table()),
        mode,
    );
    LookupService::new(
        AccessController::new(Secrets::new("user-pw", "admin-pw").unwrap()),
        resolver,
        20,
    )
}

fn session_app() -> axum::Router {
    app_with(Arc::new(NoPersistence), IngestMode::SessionOverride, 1024 * 1024)
}

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

async fn login(app: &axum::Router, credential: &str) -> (StatusCode, Value) {
    let req = Request::post("/api/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "credential": credential }).to_string()))
        .unwrap();
    send(app, req).await
}

async fn token(app: &axum::Router, credential: &str) -> String {
    let (status, body) = login(app, credential).await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["data"]["session_id"].as_str().unwrap().to_string()
}

fn get(uri: &str, token: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

fn post(uri: &str, token: &str, body: impl Into<Body>) -> Request<Body> {
    Request::post(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(body.into())
        .unwrap()
}

// ── Tests ──────────────────────────────────────────────────────

#[tokio::test]
async fn health_is_public() {
    let app = session_app();
    let req = Request::get("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], "OK");
}

#[tokio::test]
async fn login_grants_roles() {
    let app = session_app();

    let (status, body) = login(&app, "user-pw").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "user");

    let (status, body) = login(&app, "admin-pw").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "admin");
    assert!(body["data"]["expires_at"].is_string());

    let (status, body) = login(&app, "nope").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("Incorrect"));
}

#[tokio::test]
async fn search_requires_session() {
    let app = session_app();
    let req = Request::get("/api/search?q=smith").body(Body::empty()).unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, get("/api/search?q=smith", "not-a-uuid")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn blank_query_previews_and_query_searches() {
    let app = session_app();
    let user = token(&app, "user-pw").await;

    let (status, body) = send(&app, get("/api/search", &user)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["mode"], "preview");
    assert_eq!(body["data"]["rows"].as_array().unwrap().len(), 20);
    assert_eq!(body["data"]["source"]["rows"], 28);

    let (status, body) = send(&app, get("/api/search?q=SMITH", &user)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["mode"], "results");
    let names: Vec<&str> = body["data"]["matches"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Alice Smith", "Carol Smith"]);

    let (_, body) = send(&app, get("/api/search?q=tom", &user)).await;
    assert_eq!(body["data"]["matches"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn limit_reports_truncation() {
    let app = session_app();
    let user = token(&app, "user-pw").await;

    let (status, body) = send(&app, get("/api/search?q=filler&limit=5", &user)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["matches"].as_array().unwrap().len(), 5);
    assert_eq!(body["data"]["truncated"], 20);
}

#[tokio::test]
async fn non_admin_upload_is_forbidden() {
    let app = session_app();
    let user = token(&app, "user-pw").await;

    let (status, _) = send(
        &app,
        post("/api/admin/upload?filename=new.csv", &user, "Zed,VIP,Tom\n"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = send(&app, get("/api/source", &user)).await;
    assert_eq!(body["data"]["kind"], "bundled-default");
}

#[tokio::test]
async fn session_override_is_private_until_reverted() {
    let app = session_app();
    let admin = token(&app, "admin-pw").await;
    let user = token(&app, "user-pw").await;

    let (status, body) = send(
        &app,
        post(
            "/api/admin/upload?filename=mine.csv",
            &admin,
            "Zed Zulu,VIP,Tom\nYan Yu,Standard,Jane\n",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["mode"], "session_override");
    assert_eq!(body["data"]["source"]["kind"], "session-override");
    assert_eq!(body["data"]["source"]["filename"], "mine.csv");
    assert_eq!(body["data"]["source"]["rows"], 2);

    let (_, body) = send(&app, get("/api/search?q=zulu", &admin)).await;
    assert_eq!(body["data"]["matches"].as_array().unwrap().len(), 1);

    // Other sessions still see the default.
    let (_, body) = send(&app, get("/api/search?q=zulu", &user)).await;
    assert!(body["data"]["matches"].as_array().unwrap().is_empty());

    let (status, body) = send(&app, post("/api/admin/revert", &admin, Body::empty())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["source"]["kind"], "bundled-default");

    let (_, body) = send(&app, get("/api/search?q=zulu", &admin)).await;
    assert!(body["data"]["matches"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_upload_is_unprocessable() {
    let app = session_app();
    let admin = token(&app, "admin-pw").await;

    let (status, body) = send(
        &app,
        post("/api/admin/upload?filename=bad.csv", &admin, "only,two\n"),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);

    let (_, body) = send(&app, get("/api/source", &admin)).await;
    assert_eq!(body["data"]["kind"], "bundled-default");
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let app = app_with(Arc::new(NoPersistence), IngestMode::SessionOverride, 64);
    let admin = token(&app, "admin-pw").await;

    let (status, _) = send(
        &app,
        post(
            "/api/admin/upload?filename=big.csv",
            &admin,
            "a,b,c\n".repeat(100),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn shared_upload_is_visible_to_other_sessions() {
    let store = Arc::new(MemoryTableStore::new());
    let app = app_with(store.clone(), IngestMode::PersistedShared, 1024 * 1024);
    let user = token(&app, "user-pw").await;
    let admin = token(&app, "admin-pw").await;

    let (status, body) = send(
        &app,
        post(
            "/api/admin/upload?filename=shared.csv",
            &admin,
            "Dana Smith,Prospect,Lee\n",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["source"]["kind"], "persisted-shared");

    let (_, body) = send(&app, get("/api/search?q=smith", &user)).await;
    let matches = body["data"]["matches"].as_array().unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0]["advisor"], "Lee");
    assert!(store.load().unwrap().is_some());

    let (status, body) = send(&app, post("/api/admin/reset-shared", &admin, Body::empty())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["source"]["kind"], "bundled-default");

    let (_, body) = send(&app, get("/api/search?q=smith", &user)).await;
    assert_eq!(body["data"]["matches"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn reset_shared_without_store_conflicts() {
    let app = session_app();
    let admin = token(&app, "admin-pw").await;
    let (status, _) = send(&app, post("/api/admin/reset-shared", &admin, Body::empty())).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn missing_default_is_service_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = DatasetResolver::new(
        Arc::new(FileTableStore::new(dir.path().join("shared.json"))),
        BundledDefault::new(dir.path().join("absent.csv"), NormalizeOptions::default()),
        IngestMode::SessionOverride,
    );
    let service = LookupService::new(
        AccessController::new(Secrets::new("user-pw", "admin-pw").unwrap()),
        resolver,
        20,
    );
    let app = build_router(AppState::new(service, 1024));
    let user = token(&app, "user-pw").await;

    let (status, body) = send(&app, get("/api/source", &user)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("absent.csv"));
}

#[tokio::test]
async fn logout_ends_session() {
    let app = session_app();
    let user = token(&app, "user-pw").await;

    let (status, _) = send(&app, post("/api/logout", &user, Body::empty())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, get("/api/source", &user)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_session_is_unauthenticated() {
    let state = AppState::new(service(Arc::new(NoPersistence), IngestMode::SessionOverride), 1024)
        .with_session_ttl(chrono::Duration::zero());
    let sessions = state.sessions.clone();
    let app = build_router(state);
    let user = token(&app, "user-pw").await;

    let (status, _) = send(&app, get("/api/search?q=smith", &user)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(sessions.read().await.is_empty());
}

#[tokio::test]
async fn upload_after_logout_is_unauthenticated() {
    let state = AppState::new(
        service(Arc::new(NoPersistence), IngestMode::SessionOverride),
        1024 * 1024,
    );
    let sessions = state.sessions.clone();
    let app = build_router(state);
    let admin = token(&app, "admin-pw").await;

    let (status, _) = send(&app, post("/api/logout", &admin, Body::empty())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        post("/api/admin/upload?filename=late.csv", &admin, "Late,VIP,Tom\n"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(sessions.read().await.is_empty());
}
