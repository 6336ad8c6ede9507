// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
mod common;

use axum::http::StatusCode;
use common::{find_asset, login_as, node, send, send_with, TOOL_KEY};
use serde_json::json;

const TOOL_HEADER: &str = "x-admin-tool-key";

#[tokio::test]
async fn test_replace_with_tool_key() {
    let node = node(Some(TOOL_KEY));
    let app = &node.app;
    let token = login_as(app, "alice", "Logistics Officer").await;

    // 1. Seed two purchases through the normal API
    for qty in [5, 7] {
        send(
            app,
            "POST",
            "/purchases",
            Some(&token),
            Some(json!({"base": "Base Alpha", "equipmentType": "Weapons", "quantity": qty})),
        )
        .await;
    }

    // 2. Replace with one good item and one bad one
    let (status, outcome) = send_with(
        app,
        "POST",
        "/admin/purchases/replace",
        &[(TOOL_HEADER, TOOL_KEY)],
        None,
        Some(json!({"purchases": [
            {"base": "Base Beta", "equipmentType": "Vehicles", "quantity": 3, "description": "import"},
            {"base": "", "equipmentType": "Vehicles", "quantity": 3}
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["ok"], true);
    assert_eq!(outcome["inserted"], 1);
    assert_eq!(outcome["skipped"], 1);
    assert!(outcome["firstError"].as_str().unwrap().contains("base"));

    // 3. Old purchases are hidden, their stock stays
    let (_, list) = send(app, "GET", "/purchases", Some(&token), None).await;
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["base"], "Base Beta");
    assert_eq!(list[0]["notes"], "import");

    let (_, assets) = send(app, "GET", "/assets", Some(&token), None).await;
    assert_eq!(find_asset(&assets, "Base Alpha", "Weapons").unwrap()["quantity"], 12);
    assert_eq!(find_asset(&assets, "Base Beta", "Vehicles").unwrap()["quantity"], 3);
}

#[tokio::test]
async fn test_tool_grant_is_explicit() {
    // 1. No key configured: header alone is not enough
    let closed = node(None);
    let (status, _) = send_with(
        &closed.app,
        "POST",
        "/admin/transfers/replace",
        &[(TOOL_HEADER, TOOL_KEY)],
        None,
        Some(json!({"items": []})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&closed.app, "POST", "/admin/transfers/replace", None, Some(json!({"items": []}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // 2. Wrong key
    let open = node(Some(TOOL_KEY));
    let (status, _) = send_with(
        &open.app,
        "POST",
        "/admin/transfers/replace",
        &[(TOOL_HEADER, "guess")],
        None,
        Some(json!({"items": []})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // 3. The tool grant opens nothing else
    let (status, _) = send_with(&open.app, "GET", "/assets", &[(TOOL_HEADER, TOOL_KEY)], None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_replace_with_session_token() {
    let node = node(None);
    let app = &node.app;

    // 1. Non-admin session is forbidden
    let officer = login_as(app, "alice", "Logistics Officer").await;
    let (status, _) = send(app, "POST", "/admin/assignments/replace", Some(&officer), Some(json!({"items": []}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // 2. Admin session works; adjustments are not replaceable
    let admin = login_as(app, "root", "Admin").await;
    let (status, outcome) = send(app, "POST", "/admin/assignments/replace", Some(&admin), Some(json!({"items": []}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["inserted"], 0);

    let (status, _) = send(app, "POST", "/admin/adjustments/replace", Some(&admin), Some(json!({"items": []}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
