//! Command execution and environment deploys over HTTP

use axum::http::StatusCode;
use serde_json::json;

use crate::common::TestApp;

#[tokio::test]
async fn test_execute_foreground() {
    let app = TestApp::new();

    let (status, body) = app
        .post("/bash/execute", json!({"command": "echo hello && echo oops >&2"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "success");
    assert_eq!(body["exitCode"], 0);
    let output = body["output"].as_str().unwrap();
    assert!(output.contains("hello"));
    assert!(output.contains("oops"));
    assert!(body.get("message").is_none());
}

#[tokio::test]
async fn test_failing_command_is_not_an_http_error() {
    let app = TestApp::new();

    let (status, body) = app
        .post("/bash/execute", json!({"command": "exit 3"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["status"], "failed");
    assert_eq!(body["exitCode"], 3);
}

#[tokio::test]
async fn test_empty_command_is_rejected() {
    let app = TestApp::new();

    let (status, _) = app.post("/bash/execute", json!({"command": "  "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.post("/bash/execute", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_background_session_kill() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/bash/execute",
            json!({"command": "echo started; sleep 30", "background": true}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "running");
    assert_eq!(body["message"], "Command started in background");
    let session_id = body["sessionId"].as_str().unwrap().to_string();

    let (_, body) = app.get("/bash/sessions").await;
    assert_eq!(body["sessions"][0]["sessionId"], session_id.as_str());

    let (status, body) = app.get(&format!("/bash/output/{}", session_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessionId"], session_id.as_str());

    let (status, body) = app.post_empty(&format!("/bash/kill/{}", session_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) = app.post_empty(&format!("/bash/kill/{}", session_id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.get("/bash/sessions").await;
    assert_eq!(body["sessions"], json!([]));
}

#[tokio::test]
async fn test_unknown_environment_is_not_found() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/bash/execute",
            json!({"command": "true", "environmentId": "no-such-env"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("no-such-env"));

    let (_, body) = app.get("/deployments/no-such-env").await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_unknown_session_output() {
    let app = TestApp::new();
    let (status, _) = app.get("/bash/output/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_environment_deploy_records_history() {
    let app = TestApp::with_server().await;

    let (status, body) = app
        .post(
            "/environments/srv",
            json!({
                "id": "preview",
                "name": "Preview",
                "deployCommand": "echo deploying $TARGET",
                "env": {"TARGET": "preview"}
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["serverId"], "srv");

    let (status, _) = app
        .post("/environments/srv", json!({"id": "preview", "name": "Dup"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.post_empty("/environments/srv/preview/deploy").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let deployment_id = body["deploymentId"].as_str().unwrap().to_string();

    let (status, body) = app.get("/deployments/preview").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["deployments"][0]["status"], "success");

    let (status, body) = app
        .get(&format!("/deployments/preview/{}", deployment_id))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["serverId"], "srv");
    assert_eq!(body["description"], "Deploy to Preview");
    assert!(body["output"].as_str().unwrap().contains("deploying preview"));
    assert!(body["completedAt"].is_string());

    let (status, _) = app.get("/deployments/preview/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_environment_without_command() {
    let app = TestApp::with_server().await;
    app.post("/environments/srv", json!({"id": "live", "name": "Live"}))
        .await;

    let (status, body) = app.post_empty("/environments/srv/live/deploy").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("deploy command"));

    let (_, body) = app.get("/deployments/live").await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_running_deploy_blocks_environment_delete() {
    let app = TestApp::with_server().await;
    app.post(
        "/environments/srv",
        json!({"id": "preview", "name": "Preview", "deployCommand": "sleep 30"}),
    )
    .await;

    let (_, body) = app
        .post_empty("/environments/srv/preview/deploy?background=true")
        .await;
    assert_eq!(body["status"], "running");
    let session_id = body["sessionId"].as_str().unwrap().to_string();

    let (status, _) = app.delete("/environments/srv/preview").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.delete("/servers/srv").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.post_empty(&format!("/bash/kill/{}", session_id)).await;

    let (_, body) = app.get("/deployments/preview").await;
    assert_eq!(body["deployments"][0]["status"], "killed");

    let (status, _) = app.delete("/environments/srv/preview").await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.get("/deployments/preview").await;
    assert_eq!(body["total"], 0);
    let (_, body) = app.get("/environments/srv").await;
    assert_eq!(body["environments"], json!([]));
}
