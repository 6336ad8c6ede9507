// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
mod common;

use axum::http::StatusCode;
use common::{find_asset, login_as, node, send};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_purchase_transfer_assign_flow() {
    let node = node(None);
    let app = &node.app;

    // 1. Register + login as a logistics officer
    let token = login_as(app, "alice", "Logistics Officer").await;

    // 2. Purchase creates the entry
    let (status, event) = send(
        app,
        "POST",
        "/purchases",
        Some(&token),
        Some(json!({"base": "Base Alpha", "equipmentType": "Weapons", "quantity": 50})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(event["kind"], "purchase");

    let (_, assets) = send(app, "GET", "/assets", Some(&token), None).await;
    assert_eq!(assets.as_array().unwrap().len(), 1);
    let alpha = find_asset(&assets, "Base Alpha", "Weapons").unwrap();
    assert_eq!(alpha["quantity"], 50);
    assert_eq!(alpha["assigned"], 0);
    assert_eq!(alpha["expended"], 0);

    // 3. Transfer moves stock and creates the destination
    let (status, _) = send(
        app,
        "POST",
        "/transfers",
        Some(&token),
        Some(json!({
            "fromLocation": "Base Alpha",
            "toLocation": "Base Beta",
            "equipmentType": "Weapons",
            "quantity": 20
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, assets) = send(app, "GET", "/assets", Some(&token), None).await;
    assert_eq!(find_asset(&assets, "Base Alpha", "Weapons").unwrap()["quantity"], 30);
    assert_eq!(find_asset(&assets, "Base Beta", "Weapons").unwrap()["quantity"], 20);

    // 4. Oversized transfer is refused and changes nothing
    let (status, body) = send(
        app,
        "POST",
        "/transfers",
        Some(&token),
        Some(json!({
            "fromLocation": "Base Alpha",
            "toLocation": "Base Beta",
            "equipmentType": "Weapons",
            "quantity": 999
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("insufficient stock"));

    let (_, assets) = send(app, "GET", "/assets", Some(&token), None).await;
    assert_eq!(find_asset(&assets, "Base Alpha", "Weapons").unwrap()["quantity"], 30);

    // 5. Assignment moves stock into `assigned`
    let (status, event) = send(
        app,
        "POST",
        "/assignments",
        Some(&token),
        Some(json!({
            "base": "Base Alpha",
            "equipmentType": "Weapons",
            "quantity": 10,
            "assignee": "Pvt. Smith"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(event["assignee"], "Pvt. Smith");

    let (_, assets) = send(app, "GET", "/assets", Some(&token), None).await;
    let alpha = find_asset(&assets, "Base Alpha", "Weapons").unwrap();
    assert_eq!(alpha["quantity"], 20);
    assert_eq!(alpha["assigned"], 10);

    let (status, metrics) = send(app, "GET", "/dashboard/metrics?base=Base%20Alpha", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(metrics["assigned"], 10);
    assert_eq!(metrics["purchases"], 50);
    assert_eq!(metrics["transfersOut"], 20);
    assert_eq!(metrics["transfersIn"], 0);
    assert_eq!(metrics["closingBalance"], 20);
    assert_eq!(metrics["netMovement"], 30);
}

#[tokio::test]
async fn test_credentials_and_roles() {
    let node = node(None);
    let app = &node.app;

    // 1. No token, bad token
    let (status, _) = send(app, "GET", "/assets", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(app, "GET", "/assets", Some("deadbeef.cafe"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // 2. Wrong password
    login_as(app, "bob", "Base Commander").await;
    let (status, _) = send(
        app,
        "POST",
        "/auth/login",
        None,
        Some(json!({"username": "bob", "password": "nope"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // 3. Commanders may not purchase or read the audit log
    let commander = {
        let (_, body) = send(
            app,
            "POST",
            "/auth/login",
            None,
            Some(json!({"username": "bob", "password": "pw123"})),
        )
        .await;
        body["token"].as_str().unwrap().to_string()
    };
    let (status, _) = send(
        app,
        "POST",
        "/purchases",
        Some(&commander),
        Some(json!({"base": "Base Alpha", "equipmentType": "Weapons", "quantity": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(app, "GET", "/events", Some(&commander), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // 4. Duplicate username
    let (status, _) = send(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({"username": "bob", "password": "x", "role": "Admin"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // 5. Unknown role
    let (status, _) = send(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({"username": "carol", "password": "x", "role": "Quartermaster"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_validation_and_missing_entries() {
    let node = node(None);
    let app = &node.app;
    let token = login_as(app, "admin", "Admin").await;

    // 1. Zero quantity
    let (status, _) = send(
        app,
        "POST",
        "/purchases",
        Some(&token),
        Some(json!({"base": "Base Alpha", "equipmentType": "Weapons", "quantity": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // 2. Malformed JSON
    let (status, body) = common::send_with(app, "POST", "/purchases", &[], Some(&token), Some(json!("not an object"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    // 3. Transfer from a base that holds nothing
    let (status, _) = send(
        app,
        "POST",
        "/transfers",
        Some(&token),
        Some(json!({"fromLocation": "Nowhere", "toLocation": "Base Beta", "equipmentType": "Weapons", "quantity": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // 4. Expenditure against an absent entry, then an oversized one
    let (status, _) = send(
        app,
        "POST",
        "/expenditures",
        Some(&token),
        Some(json!({"base": "Base Alpha", "equipmentType": "Ammunition", "quantity": 1, "reason": "training"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    send(
        app,
        "POST",
        "/purchases",
        Some(&token),
        Some(json!({"base": "Base Alpha", "equipmentType": "ammo", "quantity": 100})),
    )
    .await;
    let (status, _) = send(
        app,
        "POST",
        "/expenditures",
        Some(&token),
        Some(json!({"base": "Base Alpha", "equipmentType": "Ammunition", "quantity": 101, "reason": "training"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        app,
        "POST",
        "/expenditures",
        Some(&token),
        Some(json!({"base": "Base Alpha", "equipmentType": "Ammunition", "quantity": 40, "reason": "training"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, assets) = send(app, "GET", "/assets", Some(&token), None).await;
    let ammo = find_asset(&assets, "Base Alpha", "Ammunition").unwrap();
    assert_eq!(ammo["quantity"], 60);
    assert_eq!(ammo["expended"], 40);
}

#[tokio::test]
async fn test_client_ref_resubmit_is_idempotent() {
    let node = node(None);
    let app = &node.app;
    let token = login_as(app, "alice", "Logistics Officer").await;
    let client_ref = Uuid::new_v4().to_string();

    let body = json!({
        "base": "Base Alpha",
        "equipmentType": "Vehicles",
        "quantity": 4,
        "clientRef": client_ref
    });
    let (first, a) = send(app, "POST", "/purchases", Some(&token), Some(body.clone())).await;
    let (second, b) = send(app, "POST", "/purchases", Some(&token), Some(body)).await;
    assert_eq!(first, StatusCode::CREATED);
    assert_eq!(second, StatusCode::OK);
    assert_eq!(a["id"], b["id"]);

    let (_, assets) = send(app, "GET", "/assets", Some(&token), None).await;
    assert_eq!(find_asset(&assets, "Base Alpha", "Vehicles").unwrap()["quantity"], 4);
}

#[tokio::test]
async fn test_asset_lifecycle() {
    let node = node(None);
    let app = &node.app;
    let token = login_as(app, "admin", "Admin").await;

    // 1. Create
    let (status, asset) = send(
        app,
        "POST",
        "/assets",
        Some(&token),
        Some(json!({"base": "Base Gamma", "equipmentType": "supplies", "quantity": 12})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(asset["equipmentType"], "Supplies");
    let id = asset["id"].as_u64().unwrap();

    let (status, _) = send(
        app,
        "POST",
        "/assets",
        Some(&token),
        Some(json!({"base": "Base Gamma", "equipmentType": "Supplies"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // 2. Update
    let (status, asset) = send(
        app,
        "PUT",
        &format!("/assets/{}", id),
        Some(&token),
        Some(json!({"quantity": 7, "assigned": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(asset["quantity"], 7);
    assert_eq!(asset["assigned"], 2);

    // 3. Retire hides it
    let (status, _) = send(app, "DELETE", &format!("/assets/{}", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(app, "GET", &format!("/assets/{}", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, assets) = send(app, "GET", "/assets", Some(&token), None).await;
    assert!(find_asset(&assets, "Base Gamma", "Supplies").is_none());

    // 4. Audit log shows the adjustments
    let (status, events) = send(app, "GET", "/events?kind=adjustment", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(events.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_listing_and_dashboard() {
    let node = node(None);
    let app = &node.app;
    let token = login_as(app, "alice", "Logistics Officer").await;

    for (base, ty, qty, date) in [
        ("Base Alpha", "Weapons", 10, "2025-01-10"),
        ("Base Alpha", "Vehicles", 30, "2025-01-12"),
        ("Base Beta", "Weapons", 60, "2025-01-11"),
    ] {
        let (status, _) = send(
            app,
            "POST",
            "/purchases",
            Some(&token),
            Some(json!({"base": base, "equipmentType": ty, "quantity": qty, "date": date})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    // 1. Newest business date first
    let (_, list) = send(app, "GET", "/purchases", Some(&token), None).await;
    let dates: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["date"].as_str().unwrap())
        .collect();
    assert!(dates[0].starts_with("2025-01-12"));
    assert!(dates[2].starts_with("2025-01-10"));

    // 2. Filters
    let (_, list) = send(app, "GET", "/purchases?base=Base%20Alpha&equipmentType=weapon", Some(&token), None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    let (_, list) = send(app, "GET", "/purchases?date=2025-01-11", Some(&token), None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    let (status, _) = send(app, "GET", "/purchases?date=someday", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // 3. Summary and breakdown
    let (_, summary) = send(app, "GET", "/dashboard/summary", Some(&token), None).await;
    assert_eq!(summary["assetCount"], 3);
    assert_eq!(summary["purchases"], 3);
    assert_eq!(summary["transfers"], 0);

    let (_, breakdown) = send(app, "GET", "/dashboard/breakdown", Some(&token), None).await;
    let types = breakdown["types"].as_array().unwrap();
    assert_eq!(types[0]["label"], "Weapons");
    assert_eq!(types[0]["value"], 70);
    assert_eq!(types[1]["label"], "Vehicles");
    assert_eq!(breakdown["availability"]["available"], 100);
}

#[tokio::test]
async fn test_health_is_public() {
    let node = node(None);
    let (status, health) = send(&node.app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["ok"], true);
    assert_eq!(health["service"], "mams-node");
    assert_eq!(health["events"], 0);
}
