//! Merged views, drafts and deploy transitions over HTTP

use axum::http::StatusCode;
use serde_json::json;

use crate::common::{keys, live_tool, live_widget, TestApp};

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let (status, body) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["runningSessions"], 0);
}

#[tokio::test]
async fn test_server_registry() {
    let app = TestApp::with_server().await;

    let (status, body) = app.get("/servers").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["servers"][0]["command"], "node");

    let (status, _) = app
        .post("/servers", json!({"id": "srv", "name": "Again", "command": "node"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.get("/servers/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("missing"));

    let (status, _) = app.delete("/servers/srv").await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.get("/servers").await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_unknown_server_is_not_found() {
    let app = TestApp::new();
    let (status, _) = app.get("/actions/nope/merged").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_merged_actions_prefer_drafts() {
    let app = TestApp::with_server().await;
    app.gateway.set_tools(vec![
        live_tool("search", "Search the catalog"),
        live_tool("checkout", "Start checkout"),
    ]);

    let (status, _) = app
        .post(
            "/actions/srv/drafts/search",
            json!({"name": "search", "description": "Search products", "deployed": true}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post(
            "/actions/srv/drafts/compare",
            json!({"name": "compare", "description": "Compare two products"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/actions/srv/merged").await;
    assert_eq!(status, StatusCode::OK);

    let tools = &body["tools"];
    assert_eq!(keys(tools, "name"), vec!["search", "checkout", "compare"]);
    assert_eq!(tools[0]["description"], "Search products");
    assert_eq!(tools[0]["draft"], true);
    assert_eq!(tools[1]["description"], "Start checkout");
    assert_eq!(tools[2]["deployed"], false);
}

#[tokio::test]
async fn test_draft_body_must_match_path() {
    let app = TestApp::with_server().await;

    let (status, body) = app
        .post(
            "/actions/srv/drafts/search",
            json!({"name": "other", "description": ""}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("other"));
}

#[tokio::test]
async fn test_route_segment_names_are_reserved() {
    let app = TestApp::with_server().await;

    let (status, body) = app
        .post(
            "/actions/srv/drafts/merged",
            json!({"name": "merged", "description": ""}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("reserved"));

    // The drafts deploy route answers, no draft is created
    let (status, body) = app
        .post(
            "/actions/srv/drafts/deploy",
            json!({"name": "deploy", "description": ""}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["written"], json!([]));

    let (_, body) = app.get("/actions/srv/merged").await;
    assert_eq!(body["tools"], json!([]));
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = TestApp::with_server().await;

    let (status, _) = app
        .post("/actions/srv/drafts/search", json!({"description": 42}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.post("/servers", json!(["not", "an", "object"])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_gateway_down_serves_stored_actions() {
    let app = TestApp::with_server().await;
    app.gateway.set_tools(vec![live_tool("search", "Search")]);
    app.post(
        "/actions/srv/drafts/compare",
        json!({"name": "compare", "description": "Compare"}),
    )
    .await;

    app.gateway.go_down();

    let (status, body) = app.get("/actions/srv/merged").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(keys(&body["tools"], "name"), vec!["compare"]);

    let (status, _) = app.post_empty("/actions/srv/discover").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_discover_keeps_dirty_drafts() {
    let app = TestApp::with_server().await;
    app.gateway.set_tools(vec![
        live_tool("search", "Search"),
        live_tool("checkout", "Checkout"),
    ]);
    app.post(
        "/actions/srv/drafts/search",
        json!({"name": "search", "description": "Edited", "deployed": true}),
    )
    .await;

    let (status, body) = app.post_empty("/actions/srv/discover").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tools"], 1);
    assert_eq!(body["skipped"], json!(["search"]));

    let (_, body) = app.get("/actions/srv/merged").await;
    assert_eq!(body["tools"][0]["description"], "Edited");
}

#[tokio::test]
async fn test_delete_live_action_then_mark_deployed() {
    let app = TestApp::with_server().await;
    app.gateway.set_tools(vec![live_tool("search", "Search")]);

    let (status, body) = app.delete("/actions/srv/search").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["action"]["deleted"], true);

    let (_, body) = app.get("/actions/srv/merged").await;
    assert_eq!(body["tools"][0]["deleted"], true);

    let (status, body) = app.post_empty("/actions/srv/mark-deployed").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deployed"], json!(["search"]));

    // The tombstone stays stored, settled as deployed
    app.gateway.set_tools(vec![]);
    let (_, body) = app.get("/actions/srv/merged").await;
    let tombstone = &body["tools"][0];
    assert_eq!(tombstone["name"], "search");
    assert_eq!(tombstone["deleted"], true);
    assert_eq!(tombstone["deployed"], true);
    assert_eq!(tombstone["draft"], false);

    let (_, body) = app.post_empty("/actions/srv/mark-deployed").await;
    assert_eq!(body["deployed"], json!([]));
}

#[tokio::test]
async fn test_delete_undeployed_action_is_immediate() {
    let app = TestApp::with_server().await;
    app.post(
        "/actions/srv/drafts/compare",
        json!({"name": "compare", "description": "Compare"}),
    )
    .await;

    let (status, _) = app.delete("/actions/srv/compare").await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get("/actions/srv/merged").await;
    assert_eq!(body["tools"], json!([]));

    let (status, _) = app.delete("/actions/srv/compare").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_revert_drops_changelog_entry() {
    let app = TestApp::with_server().await;
    app.gateway.set_tools(vec![live_tool("search", "Search")]);
    app.post(
        "/actions/srv/drafts/search",
        json!({"name": "search", "description": "Edited", "deployed": true}),
    )
    .await;

    let (_, body) = app
        .post(
            "/changelog/s1",
            json!({
                "type": "description_changed",
                "actionName": "search",
                "oldValue": "Search",
                "newValue": "Edited",
                "description": "Updated search description"
            }),
        )
        .await;
    let entry_id = body["entry"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .delete(&format!(
            "/actions/srv/drafts/search?sessionId=s1&entryId={}",
            entry_id
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get("/actions/srv/merged").await;
    assert_eq!(body["tools"][0]["description"], "Search");

    let (_, body) = app.get("/changelog/s1").await;
    assert_eq!(body["entries"], json!([]));

    let (status, _) = app.delete("/actions/srv/drafts/search").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deploy_drafts_writes_export_files() {
    let app = TestApp::with_server().await;
    app.post(
        "/actions/srv/drafts/compare",
        json!({"name": "compare", "description": "Compare"}),
    )
    .await;

    let (status, body) = app.post_empty("/actions/srv/drafts/deploy").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["written"], json!(["compare"]));

    let path = app.dir.path().join("export/srv/actions/compare.json");
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(written["description"], "Compare");

    // Deploying drafts does not settle them
    let (_, body) = app.get("/actions/srv/merged").await;
    assert_eq!(body["tools"][0]["draft"], true);
}

#[tokio::test]
async fn test_same_named_widgets_export_separately() {
    let app = TestApp::with_server().await;
    for uri in ["ui://shop/card.html", "ui://news/card.html"] {
        let (status, _) = app
            .post("/resources/srv/drafts", json!({"uri": uri, "name": "Card"}))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = app.post_empty("/actions/srv/drafts/deploy").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["resources"],
        json!(["ui://shop/card.html", "ui://news/card.html"])
    );
    let widgets = app.dir.path().join("export/srv/widgets");
    assert!(widgets.join("shop_card.json").exists());
    assert!(widgets.join("news_card.json").exists());

    // Same file name after sanitizing
    app.post(
        "/resources/srv/drafts",
        json!({"uri": "app://shop/card.htm", "name": "Card"}),
    )
    .await;
    let (status, body) = app.post_empty("/actions/srv/drafts/deploy").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("both export to"));
}

#[tokio::test]
async fn test_mark_deployed_commits_session() {
    let app = TestApp::with_server().await;
    app.post(
        "/actions/srv/drafts/compare",
        json!({"name": "compare", "description": "Compare"}),
    )
    .await;
    app.post(
        "/changelog/s1",
        json!({"type": "action_added", "actionName": "compare", "description": "Added compare"}),
    )
    .await;

    let (status, body) = app
        .post_empty("/actions/srv/mark-deployed?sessionId=s1")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deployed"], json!(["compare"]));
    assert_eq!(body["committed"], 1);

    let (_, body) = app.get("/actions/srv/merged").await;
    assert_eq!(body["tools"][0]["draft"], false);
    assert_eq!(body["tools"][0]["deployed"], true);

    let (_, body) = app.get("/changelog/s1").await;
    assert_eq!(body["uncommittedCount"], 0);
}

#[tokio::test]
async fn test_resource_drafts_and_linking() {
    let app = TestApp::with_server().await;
    app.gateway.set_tools(vec![live_tool("search", "Search")]);
    app.gateway
        .set_resources(vec![live_widget("ui://widgets/search-widget.html", "Search widget")]);

    let (status, body) = app
        .post(
            "/resources/srv/drafts",
            json!({"uri": "ui://widgets/cart.html", "name": "Cart", "actionName": "missing"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("missing"));

    let (status, _) = app
        .post(
            "/resources/srv/drafts",
            json!({"uri": "ui://widgets/cart.html", "name": "Cart", "actionName": "search"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/resources/srv/merged").await;
    assert_eq!(status, StatusCode::OK);
    let resources = &body["resources"];
    assert_eq!(
        keys(resources, "uri"),
        vec!["ui://widgets/search-widget.html", "ui://widgets/cart.html"]
    );
    assert_eq!(resources[0]["actionName"], "search");
    assert_eq!(resources[1]["draft"], true);

    // Direct actionName wins over the filename stem
    let (status, body) = app.get("/actions/srv/search/widget").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["uri"], "ui://widgets/cart.html");
}

#[tokio::test]
async fn test_action_without_widget_is_null() {
    let app = TestApp::with_server().await;
    app.gateway.set_tools(vec![live_tool("search", "Search")]);

    let (status, body) = app.get("/actions/srv/search/widget").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_null());

    let (status, _) = app.get("/actions/srv/missing/widget").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_resource_delete_and_revert_by_uri() {
    let app = TestApp::with_server().await;
    app.gateway
        .set_resources(vec![live_widget("ui://widgets/search.html", "Search widget")]);

    let (status, body) = app
        .delete("/resources/srv?uri=ui://widgets/search.html")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resource"]["deleted"], true);

    let (_, body) = app.get("/resources/srv/merged").await;
    assert_eq!(body["resources"][0]["deleted"], true);

    let (status, _) = app
        .delete("/resources/srv/drafts?uri=ui://widgets/search.html")
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get("/resources/srv/merged").await;
    assert_eq!(body["resources"][0]["deleted"], false);

    let (status, body) = app.post_empty("/resources/srv/mark-deployed").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deployed"], json!([]));
}

#[tokio::test]
async fn test_call_is_proxied() {
    let app = TestApp::with_server().await;

    let (status, body) = app
        .post("/actions/srv/search/call", json!({"arguments": {"q": "shoes"}}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["content"][0]["text"], "called search");
    assert_eq!(body["result"]["arguments"]["q"], "shoes");

    app.gateway.go_down();
    let (status, _) = app.post("/actions/srv/search/call", json!({})).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}
