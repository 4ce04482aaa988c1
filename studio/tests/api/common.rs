//! Shared fixture for the API tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

use mcp_studio::gateway::LiveGateway;
use mcp_studio::models::{Action, OverlayFlags, ServerRecord, WidgetResource};
use mcp_studio::overlay::FileExporter;
use mcp_studio::supervisor::SupervisorConfig;
use mcp_studio::web::{create_router, AppState};
use mcp_studio::Store;

/// Live gateway serving canned tools and resources
#[derive(Default)]
pub struct FakeGateway {
    pub tools: Mutex<Vec<Action>>,
    pub resources: Mutex<Vec<WidgetResource>>,
    pub down: AtomicBool,
}

impl FakeGateway {
    pub fn set_tools(&self, tools: Vec<Action>) {
        *self.tools.lock().unwrap() = tools;
    }

    pub fn set_resources(&self, resources: Vec<WidgetResource>) {
        *self.resources.lock().unwrap() = resources;
    }

    pub fn go_down(&self) {
        self.down.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.down.load(Ordering::SeqCst) {
            return Err(anyhow!("connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl LiveGateway for FakeGateway {
    async fn list_tools(&self, _server: &ServerRecord) -> anyhow::Result<Vec<Action>> {
        self.check()?;
        Ok(self.tools.lock().unwrap().clone())
    }

    async fn list_resources(&self, _server: &ServerRecord) -> anyhow::Result<Vec<WidgetResource>> {
        self.check()?;
        Ok(self.resources.lock().unwrap().clone())
    }

    async fn call_tool(
        &self,
        _server: &ServerRecord,
        tool_name: &str,
        arguments: Option<Value>,
    ) -> anyhow::Result<Value> {
        self.check()?;
        Ok(json!({
            "content": [{"type": "text", "text": format!("called {}", tool_name)}],
            "arguments": arguments,
        }))
    }
}

pub fn live_tool(name: &str, description: &str) -> Action {
    let mut action = Action::new(name, description);
    action.flags = OverlayFlags::live();
    action
}

pub fn live_widget(uri: &str, name: &str) -> WidgetResource {
    let mut resource = WidgetResource::new(uri, name);
    resource.flags = OverlayFlags::live();
    resource
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub gateway: Arc<FakeGateway>,
    pub dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let dir = tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path().join("store.json")).unwrap());
        let gateway = Arc::new(FakeGateway::default());
        let exporter = Arc::new(FileExporter::new(dir.path().join("export")));

        let state = AppState::new(
            store,
            gateway.clone(),
            exporter,
            SupervisorConfig::default(),
        );
        let router = create_router(state.clone());

        Self {
            router,
            state,
            gateway,
            dir,
        }
    }

    /// App with server `srv` already registered
    pub async fn with_server() -> Self {
        let app = Self::new();
        let (status, _) = app
            .post(
                "/servers",
                json!({"id": "srv", "name": "Test server", "command": "node", "args": ["server.js"]}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        app
    }

    pub async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(value) => builder
                .header("content-type", "application/json")
                .body(Body::from(value.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request("GET", uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request("POST", uri, Some(body)).await
    }

    pub async fn post_empty(&self, uri: &str) -> (StatusCode, Value) {
        self.request("POST", uri, None).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.request("DELETE", uri, None).await
    }
}

/// Names of a JSON array of records, by `key`
pub fn keys(list: &Value, key: &str) -> Vec<String> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|item| item[key].as_str().unwrap().to_string())
        .collect()
}
