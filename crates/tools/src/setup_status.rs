//! `setup_status` — report onboarding state and local record counts.

use crate::ToolContext;
use async_trait::async_trait;
use std::sync::Arc;
use stbl_config::AppConfig;
use stbl_core::error::ToolError;
use stbl_core::tool::{Tool, ToolResult};
use stbl_events::EventEngine;
use stbl_storage::Store;
use tokio::sync::Mutex;

pub struct SetupStatusTool {
    store: Arc<Store>,
    engine: Arc<EventEngine>,
    config: Arc<Mutex<AppConfig>>,
}

impl SetupStatusTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            store: Arc::clone(&ctx.store),
            engine: Arc::clone(&ctx.engine),
            config: Arc::clone(&ctx.config),
        }
    }
}

#[async_trait]
impl Tool for SetupStatusTool {
    fn name(&self) -> &str {
        "setup_status"
    }

    fn description(&self) -> &str {
        "Report onboarding progress: API key kind, discovered address, local record counts, and event stream status."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let (setup_complete, user_address, api_key_kind) = {
            let config = self.config.lock().await;
            let kind = if config.has_production_key() {
                "production"
            } else {
                "try-it-out"
            };
            (config.setup_complete, config.user_address.clone(), kind)
        };
        let counts = self.store.counts().await;
        let events = self.engine.status().await;

        ToolResult::json(serde_json::json!({
            "setupComplete": setup_complete,
            "apiKey": api_key_kind,
            "userAddress": user_address,
            "storage": counts,
            "events": events,
        }))
    }
}
