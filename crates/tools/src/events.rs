//! Event subscription tools.
//!
//! Six tools over the shared [`EventEngine`]: subscribe, unsubscribe, list
//! subscriptions, fetch recent events, query buffered events by filter,
//! and report engine status. `subscribe_events` connects the live stream
//! on demand; a failed connect still registers the subscription, which
//! starts receiving once a later connect succeeds.

use crate::ToolContext;
use async_trait::async_trait;
use std::sync::Arc;
use stbl_core::EventFilter;
use stbl_core::error::ToolError;
use stbl_core::tool::{Tool, ToolResult};
use stbl_events::EventEngine;
use tracing::warn;

fn filter_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "description": "Field-value equality constraints. Absent fields match anything; keys beyond type/contract/event constrain the event payload.",
        "properties": {
            "type": { "type": "string", "description": "Event kind, e.g. contract_event" },
            "contract": { "type": "string", "description": "Originating contract address" },
            "event": { "type": "string", "description": "Contract event name" }
        },
        "additionalProperties": true
    })
}

fn parse_filter(value: &serde_json::Value) -> Result<EventFilter, ToolError> {
    if value.is_null() {
        return Ok(EventFilter::new());
    }
    serde_json::from_value(value.clone())
        .map_err(|e| ToolError::InvalidArguments(format!("Bad 'filter': {e}")))
}

fn parse_limit(value: &serde_json::Value) -> Result<Option<usize>, ToolError> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Number(n) => n
            .as_u64()
            .map(|n| Some(n as usize))
            .ok_or_else(|| ToolError::InvalidArguments("'limit' must be a non-negative integer".into())),
        _ => Err(ToolError::InvalidArguments(
            "'limit' must be a non-negative integer".into(),
        )),
    }
}

// ── subscribe_events ──────────────────────────────────────────────────

pub struct SubscribeEventsTool {
    engine: Arc<EventEngine>,
}

impl SubscribeEventsTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            engine: Arc::clone(&ctx.engine),
        }
    }
}

#[async_trait]
impl Tool for SubscribeEventsTool {
    fn name(&self) -> &str {
        "subscribe_events"
    }

    fn description(&self) -> &str {
        "Subscribe to live chain events matching a filter. Connects the event stream if it is not already live."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "filter": filter_schema()
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let filter = parse_filter(&arguments["filter"])?;

        if !self.engine.status().await.connected {
            if let Err(e) = self.engine.connect().await {
                warn!(error = %e, "Event stream connect failed; subscription registered anyway");
            }
        }

        let subscription = self.engine.subscribe(filter).await;
        let connected = self.engine.status().await.connected;
        ToolResult::json(serde_json::json!({
            "subscription": subscription,
            "connected": connected,
        }))
    }
}

// ── unsubscribe_events ────────────────────────────────────────────────

pub struct UnsubscribeEventsTool {
    engine: Arc<EventEngine>,
}

impl UnsubscribeEventsTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            engine: Arc::clone(&ctx.engine),
        }
    }
}

#[async_trait]
impl Tool for UnsubscribeEventsTool {
    fn name(&self) -> &str {
        "unsubscribe_events"
    }

    fn description(&self) -> &str {
        "Remove an event subscription by id. Reports whether anything was removed."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "subscription_id": {
                    "type": "string",
                    "description": "The subscription id returned by subscribe_events"
                }
            },
            "required": ["subscription_id"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let id = arguments["subscription_id"].as_str().ok_or_else(|| {
            ToolError::InvalidArguments("Missing 'subscription_id' argument".into())
        })?;
        let removed = self.engine.unsubscribe(id).await;
        ToolResult::json(serde_json::json!({
            "subscriptionId": id,
            "removed": removed,
        }))
    }
}

// ── list_subscriptions ────────────────────────────────────────────────

pub struct ListSubscriptionsTool {
    engine: Arc<EventEngine>,
}

impl ListSubscriptionsTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            engine: Arc::clone(&ctx.engine),
        }
    }
}

#[async_trait]
impl Tool for ListSubscriptionsTool {
    fn name(&self) -> &str {
        "list_subscriptions"
    }

    fn description(&self) -> &str {
        "List all event subscriptions with their filters and match counts."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let subscriptions = self.engine.subscriptions().await;
        ToolResult::json(serde_json::json!({
            "count": subscriptions.len(),
            "subscriptions": subscriptions,
        }))
    }
}

// ── recent_events ─────────────────────────────────────────────────────

pub struct RecentEventsTool {
    engine: Arc<EventEngine>,
}

impl RecentEventsTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            engine: Arc::clone(&ctx.engine),
        }
    }
}

#[async_trait]
impl Tool for RecentEventsTool {
    fn name(&self) -> &str {
        "recent_events"
    }

    fn description(&self) -> &str {
        "Return the most recently buffered chain events, oldest first."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of events to return (default 50)"
                }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let limit = parse_limit(&arguments["limit"])?;
        let events = self.engine.recent_events(limit).await;
        ToolResult::json(serde_json::json!({
            "count": events.len(),
            "events": events,
        }))
    }
}

// ── query_events ──────────────────────────────────────────────────────

pub struct QueryEventsTool {
    engine: Arc<EventEngine>,
}

impl QueryEventsTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            engine: Arc::clone(&ctx.engine),
        }
    }
}

#[async_trait]
impl Tool for QueryEventsTool {
    fn name(&self) -> &str {
        "query_events"
    }

    fn description(&self) -> &str {
        "Search buffered chain events with a filter, keeping the newest matches."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "filter": filter_schema(),
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of matches to return (default 100)"
                }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let filter = parse_filter(&arguments["filter"])?;
        let limit = parse_limit(&arguments["limit"])?;
        let events = self.engine.query_events(&filter, limit).await;
        ToolResult::json(serde_json::json!({
            "count": events.len(),
            "events": events,
        }))
    }
}

// ── events_status ─────────────────────────────────────────────────────

pub struct EventsStatusTool {
    engine: Arc<EventEngine>,
}

impl EventsStatusTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            engine: Arc::clone(&ctx.engine),
        }
    }
}

#[async_trait]
impl Tool for EventsStatusTool {
    fn name(&self) -> &str {
        "events_status"
    }

    fn description(&self) -> &str {
        "Report the event engine's connection state, subscription count, buffer size, and reconnect attempts."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        ToolResult::json(self.engine.status().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_context;

    #[tokio::test]
    async fn subscribe_connects_and_registers() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(dir.path());
        let tool = SubscribeEventsTool::new(&ctx);

        let result = tool
            .execute(serde_json::json!({"filter": {"type": "block"}}))
            .await
            .unwrap();

        let data = result.data.unwrap();
        assert_eq!(data["connected"], true);
        let id = data["subscription"]["id"].as_str().unwrap();
        assert!(id.starts_with("sub_"));
        assert_eq!(data["subscription"]["filter"]["type"], "block");

        assert_eq!(ctx.engine.subscriptions().await.len(), 1);
    }

    #[tokio::test]
    async fn unsubscribe_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(dir.path());
        let sub = ctx.engine.subscribe(EventFilter::new()).await;

        let tool = UnsubscribeEventsTool::new(&ctx);
        let result = tool
            .execute(serde_json::json!({"subscription_id": sub.id}))
            .await
            .unwrap();
        assert_eq!(result.data.unwrap()["removed"], true);

        let again = tool
            .execute(serde_json::json!({"subscription_id": sub.id}))
            .await
            .unwrap();
        assert_eq!(again.data.unwrap()["removed"], false);
    }

    #[tokio::test]
    async fn list_and_status_report_counts() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(dir.path());
        ctx.engine.subscribe(EventFilter::new()).await;
        ctx.engine
            .subscribe(EventFilter::new().with_kind("block"))
            .await;

        let list = ListSubscriptionsTool::new(&ctx)
            .execute(serde_json::json!({}))
            .await
            .unwrap();
        assert_eq!(list.data.unwrap()["count"], 2);

        let status = EventsStatusTool::new(&ctx)
            .execute(serde_json::json!({}))
            .await
            .unwrap();
        let data = status.data.unwrap();
        assert_eq!(data["subscriptions"], 2);
        assert_eq!(data["connected"], false);
        assert_eq!(data["state"], "disconnected");
    }

    #[tokio::test]
    async fn recent_and_query_on_empty_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(dir.path());

        let recent = RecentEventsTool::new(&ctx)
            .execute(serde_json::json!({"limit": 10}))
            .await
            .unwrap();
        assert_eq!(recent.data.unwrap()["count"], 0);

        let query = QueryEventsTool::new(&ctx)
            .execute(serde_json::json!({"filter": {"type": "block"}}))
            .await
            .unwrap();
        assert_eq!(query.data.unwrap()["count"], 0);
    }

    #[tokio::test]
    async fn bad_limit_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(dir.path());
        let err = RecentEventsTool::new(&ctx)
            .execute(serde_json::json!({"limit": "ten"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
