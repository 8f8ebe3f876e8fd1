//! `stbl-mcp serve` — the stdio tool server.
//!
//! Speaks line-delimited JSON: one request per stdin line, one response per
//! stdout line. Engine notifications (connections, matches, errors) are
//! logged to stderr so the protocol channel stays clean.
//!
//! Requests:
//! - `{"op":"list_tools"}`
//! - `{"op":"call","id":"...","name":"stbl_write","arguments":{...}}`
//! - `{"op":"shutdown"}`

use serde::Deserialize;
use std::sync::Arc;
use stbl_chain::SimulatedClient;
use stbl_config::AppConfig;
use stbl_core::tool::{ToolCall, ToolRegistry};
use stbl_core::EngineNotification;
use stbl_events::{EngineConfig, EventEngine, ReconnectPolicy};
use stbl_storage::Store;
use stbl_tools::{ToolContext, default_registry};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

#[derive(Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Request {
    ListTools,
    Call {
        #[serde(default)]
        id: Option<String>,
        name: String,
        #[serde(default)]
        arguments: serde_json::Value,
    },
    Shutdown,
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let store = Arc::new(Store::open(config.storage_dir()));
    store.initialize().await?;

    let engine = Arc::new(EventEngine::new(engine_config(&config)));
    let ctx = ToolContext {
        client: Arc::new(SimulatedClient::new()),
        store,
        engine: Arc::clone(&engine),
        config: Arc::new(Mutex::new(config)),
        config_path: Some(AppConfig::config_path()),
    };
    let registry = default_registry(&ctx);

    // Surface engine notifications on stderr for operators
    let mut notifications = engine.subscribe_notifications();
    tokio::spawn(async move {
        while let Ok(n) = notifications.recv().await {
            match n.as_ref() {
                EngineNotification::Connected => info!("Event stream connected"),
                EngineNotification::Disconnected => warn!("Event stream disconnected"),
                EngineNotification::Error { detail } => warn!(%detail, "Event stream error"),
                EngineNotification::SubscriptionMatched {
                    subscription_id,
                    event,
                } => info!(%subscription_id, kind = %event.kind, "Subscription matched"),
                EngineNotification::MaxReconnectsReached => {
                    error!("Event stream gave up reconnecting")
                }
            }
        }
    });

    info!(tools = registry.names().len(), "stbl-mcp serving on stdio");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let (response, shutdown) = handle_line(&registry, &line).await;
        stdout.write_all(response.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
        if shutdown {
            break;
        }
    }

    engine.disconnect().await;
    info!("stbl-mcp stopped");
    Ok(())
}

fn engine_config(config: &AppConfig) -> EngineConfig {
    EngineConfig {
        url: config.events.ws_url.clone(),
        buffer_capacity: config.events.buffer_capacity,
        recent_limit: config.events.recent_limit,
        query_limit: config.events.query_limit,
        reconnect: ReconnectPolicy {
            base_delay: std::time::Duration::from_millis(config.events.reconnect.base_delay_ms),
            max_attempts: config.events.reconnect.max_attempts,
        },
    }
}

/// Dispatch one request line. Returns the response line and whether the
/// server should shut down.
async fn handle_line(registry: &ToolRegistry, line: &str) -> (String, bool) {
    let request: Request = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            return (
                serde_json::json!({ "error": format!("Bad request: {e}") }).to_string(),
                false,
            );
        }
    };

    match request {
        Request::ListTools => (
            serde_json::json!({ "tools": registry.definitions() }).to_string(),
            false,
        ),
        Request::Call {
            id,
            name,
            arguments,
        } => {
            let call = ToolCall {
                id: id.clone(),
                name,
                arguments,
            };
            let response = match registry.execute(&call).await {
                Ok(result) => serde_json::json!({
                    "id": id,
                    "success": result.success,
                    "output": result.output,
                    "data": result.data,
                }),
                Err(e) => serde_json::json!({
                    "id": id,
                    "success": false,
                    "error": e.to_string(),
                }),
            };
            (response.to_string(), false)
        }
        Request::Shutdown => (serde_json::json!({ "ok": true }).to_string(), true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stbl_tools::ToolContext;

    async fn test_registry(dir: &std::path::Path) -> ToolRegistry {
        let ctx = ToolContext {
            client: Arc::new(SimulatedClient::new()),
            store: Arc::new(Store::open(dir)),
            engine: Arc::new(EventEngine::new(EngineConfig::default())),
            config: Arc::new(Mutex::new(AppConfig::default())),
            config_path: None,
        };
        default_registry(&ctx)
    }

    #[tokio::test]
    async fn list_tools_responds_with_definitions() {
        let dir = tempfile::tempdir().unwrap();
        let registry = test_registry(dir.path()).await;

        let (response, shutdown) = handle_line(&registry, r#"{"op":"list_tools"}"#).await;
        assert!(!shutdown);
        let json: serde_json::Value = serde_json::from_str(&response).unwrap();
        assert!(json["tools"].as_array().unwrap().len() >= 10);
    }

    #[tokio::test]
    async fn call_dispatches_and_echoes_id() {
        let dir = tempfile::tempdir().unwrap();
        let registry = test_registry(dir.path()).await;

        let (response, _) = handle_line(
            &registry,
            r#"{"op":"call","id":"req-7","name":"stbl_write","arguments":{"message":"hi"}}"#,
        )
        .await;
        let json: serde_json::Value = serde_json::from_str(&response).unwrap();
        assert_eq!(json["id"], "req-7");
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["gasUsed"], 0);
    }

    #[tokio::test]
    async fn unknown_tool_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let registry = test_registry(dir.path()).await;

        let (response, _) = handle_line(
            &registry,
            r#"{"op":"call","name":"no_such_tool","arguments":{}}"#,
        )
        .await;
        let json: serde_json::Value = serde_json::from_str(&response).unwrap();
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().contains("no_such_tool"));
    }

    #[tokio::test]
    async fn malformed_line_reports_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let registry = test_registry(dir.path()).await;

        let (response, shutdown) = handle_line(&registry, "{{{not json").await;
        assert!(!shutdown);
        let json: serde_json::Value = serde_json::from_str(&response).unwrap();
        assert!(json["error"].as_str().unwrap().starts_with("Bad request"));
    }

    #[tokio::test]
    async fn shutdown_request_stops_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let registry = test_registry(dir.path()).await;

        let (response, shutdown) = handle_line(&registry, r#"{"op":"shutdown"}"#).await;
        assert!(shutdown);
        let json: serde_json::Value = serde_json::from_str(&response).unwrap();
        assert_eq!(json["ok"], true);
    }
}
