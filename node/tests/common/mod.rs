// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use mams_node::auth::{AuthGate, TokenSigner, UserStore};
use mams_node::config::NodeConfig;
use mams_node::engine::Engine;
use mams_node::server::{build_router, AppState};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt; // for oneshot

pub const TOOL_KEY: &str = "test-tool-key";

pub struct TestNode {
    pub app: Router,
    pub cfg: NodeConfig,
    // dropped last so the data dir outlives the router
    pub dir: TempDir,
}

pub fn config(dir: &TempDir, tool_key: Option<&str>) -> NodeConfig {
    NodeConfig {
        data_dir: dir.path().to_path_buf(),
        token_secret: "integration-secret".to_string(),
        admin_tool_key: tool_key.map(str::to_string),
        ..NodeConfig::default()
    }
}

pub fn app_for(cfg: &NodeConfig) -> Router {
    let engine = Engine::open(cfg).unwrap();
    let users = UserStore::open(cfg.users_path()).unwrap();
    let gate = AuthGate::new(
        TokenSigner::new(&cfg.token_secret, cfg.token_ttl_secs),
        cfg.admin_tool_key.as_deref(),
    );
    build_router(AppState::new(engine, users, gate))
}

pub fn node(tool_key: Option<&str>) -> TestNode {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&dir, tool_key);
    TestNode {
        app: app_for(&cfg),
        cfg,
        dir,
    }
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    send_with(app, method, uri, &[], token, body).await
}

pub async fn send_with(
    app: &Router,
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let body = match body {
        Some(value) => Body::from(serde_json::to_vec(&value).unwrap()),
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Registers `username` with `role` and returns a session token.
pub async fn login_as(app: &Router, username: &str, role: &str) -> String {
    let (status, _) = send(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({"username": username, "password": "pw123", "role": role})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        app,
        "POST",
        "/auth/login",
        None,
        Some(json!({"username": username, "password": "pw123"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

/// The active entry for (`base`, `equipment_type`), if listed.
pub fn find_asset<'a>(assets: &'a Value, base: &str, equipment_type: &str) -> Option<&'a Value> {
    assets
        .as_array()?
        .iter()
        .find(|a| a["base"] == base && a["equipmentType"] == equipment_type)
}
