// In-process integration tests: full router over the in-memory store

#[path = "../common/mod.rs"]
mod common;

use axum::http::StatusCode;
use common::{register_user, send_json, test_app};
use serde_json::json;

#[tokio::test]
async fn test_health_endpoint_is_public() {
    let (app, _store) = test_app();

    let (status, body) = send_json(&app, "GET", "/healthz", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"], "ok");
}

#[tokio::test]
async fn test_item_routes_require_auth() {
    let (app, _store) = test_app();

    let (status, body) = send_json(&app, "GET", "/items", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("missing token"));

    let (status, _) = send_json(&app, "GET", "/transactions", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_full_receive_issue_flow() {
    let (app, _store) = test_app();
    let token = register_user(&app, "alice").await;

    // Receive 10 Widgets.
    let (status, item) = send_json(
        &app,
        "POST",
        "/items",
        Some(&token),
        Some(json!({ "sku": "SKU-1", "name": "Widget", "quantity": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(item["quantity"], 10);
    let item_id = item["id"].as_i64().unwrap();

    // Issue 3.
    let (status, item) = send_json(
        &app,
        "POST",
        &format!("/items/{}/issue", item_id),
        Some(&token),
        Some(json!({ "quantity": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["quantity"], 7);

    // Over-issue conflicts and mutates nothing.
    let (status, body) = send_json(
        &app,
        "POST",
        &format!("/items/{}/issue", item_id),
        Some(&token),
        Some(json!({ "quantity": 100 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("Insufficient stock"));

    let (status, body) = send_json(&app, "GET", "/items", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["quantity"], 7);

    // Ledger: issue first (most recent), attributed; receipt anonymous.
    let (status, body) = send_json(&app, "GET", "/transactions", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let movements = body["movements"].as_array().unwrap();
    assert_eq!(movements.len(), 2);
    assert_eq!(movements[0]["kind"], "ISSUE");
    assert_eq!(movements[0]["quantity"], 3);
    assert_eq!(movements[0]["username"], "alice");
    assert_eq!(movements[1]["kind"], "RECEIVE");
    assert!(movements[1].get("username").is_none());
}

#[tokio::test]
async fn test_receive_validation_errors_are_400() {
    let (app, _store) = test_app();
    let token = register_user(&app, "alice").await;

    let (status, _) = send_json(
        &app,
        "POST",
        "/items",
        Some(&token),
        Some(json!({ "sku": "", "name": "Widget", "quantity": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(
        &app,
        "POST",
        "/items",
        Some(&token),
        Some(json!({ "sku": "SKU-1", "name": "Widget", "quantity": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_issue_against_missing_item_is_404() {
    let (app, _store) = test_app();
    let token = register_user(&app, "alice").await;

    let (status, _) = send_json(
        &app,
        "POST",
        "/items/42/issue",
        Some(&token),
        Some(json!({ "quantity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_registration_is_409() {
    let (app, _store) = test_app();
    register_user(&app, "alice").await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "username": "alice", "password": "a long password" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("alice"));
}

#[tokio::test]
async fn test_login_and_reuse_token() {
    let (app, _store) = test_app();
    register_user(&app, "alice").await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": "alice", "password": "a long password" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();
    assert_eq!(body["user"]["username"], "alice");

    let (status, _) = send_json(&app, "GET", "/items", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_json(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": "alice", "password": "wrong password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_transactions_limit_is_clamped() {
    let (app, _store) = test_app();
    let token = register_user(&app, "alice").await;

    for _ in 0..3 {
        send_json(
            &app,
            "POST",
            "/items",
            Some(&token),
            Some(json!({ "sku": "SKU-1", "name": "Widget", "quantity": 1 })),
        )
        .await;
    }

    let (status, body) = send_json(&app, "GET", "/transactions?limit=2", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["movements"].as_array().unwrap().len(), 2);

    let (status, body) = send_json(&app, "GET", "/transactions?limit=0", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["movements"].as_array().unwrap().len(), 1);
}
