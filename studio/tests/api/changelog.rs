//! Changelog ledger over HTTP

use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::common::TestApp;

fn description_edit(old: &str, new: &str) -> Value {
    json!({
        "type": "description_changed",
        "actionName": "search",
        "oldValue": old,
        "newValue": new,
        "description": format!("Description set to '{}'", new)
    })
}

#[tokio::test]
async fn test_repeated_edits_consolidate() {
    let app = TestApp::new();

    let (status, first) = app.post("/changelog/s1", description_edit("a", "b")).await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = app.post("/changelog/s1", description_edit("b", "c")).await;

    assert_eq!(second["entry"]["oldValue"], "a");
    assert_eq!(second["entry"]["newValue"], "c");
    assert_eq!(second["entry"]["timestamp"], first["entry"]["timestamp"]);
    assert_ne!(second["entry"]["id"], first["entry"]["id"]);

    let (status, body) = app.get("/changelog/s1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entries"].as_array().unwrap().len(), 1);
    assert_eq!(body["uncommittedCount"], 1);

    // Other sessions are independent
    let (_, body) = app.get("/changelog/s2").await;
    assert_eq!(body["entries"], json!([]));
}

#[tokio::test]
async fn test_commit_starts_a_new_row() {
    let app = TestApp::new();
    app.post("/changelog/s1", description_edit("a", "b")).await;

    let (status, body) = app.post_empty("/changelog/s1/commit").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let (_, body) = app.post_empty("/changelog/s1/commit").await;
    assert_eq!(body["count"], 0);

    app.post("/changelog/s1", description_edit("b", "c")).await;
    let (_, body) = app.get("/changelog/s1").await;
    assert_eq!(body["entries"].as_array().unwrap().len(), 2);
    assert_eq!(body["entries"][0]["committed"], true);
    assert_eq!(body["uncommittedCount"], 1);
}

#[tokio::test]
async fn test_clear_and_delete() {
    let app = TestApp::new();
    let (_, body) = app.post("/changelog/s1", description_edit("a", "b")).await;
    let entry_id = body["entry"]["id"].as_str().unwrap().to_string();
    app.post(
        "/changelog/s1",
        json!({"type": "resource_added", "resourceUri": "ui://widgets/cart.html", "description": "Added cart"}),
    )
    .await;

    let (status, body) = app.delete(&format!("/changelog/s1/{}", entry_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entry"]["actionName"], "search");

    let (status, _) = app.delete(&format!("/changelog/s1/{}", entry_id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.delete("/changelog/s1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let (_, body) = app.get("/changelog/s1").await;
    assert_eq!(body["entries"], json!([]));
}

#[tokio::test]
async fn test_invalid_entries_are_rejected() {
    let app = TestApp::new();

    let (status, _) = app
        .post(
            "/changelog/s1",
            json!({"type": "teleported", "description": "?"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/changelog/s1",
            json!({"type": "action_added", "actionName": "x", "description": " "}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
