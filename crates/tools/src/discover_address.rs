//! `discover_address` — learn the caller's chain address via the probe
//! contract and persist it in config and the address book.

use crate::ToolContext;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use stbl_chain::{AddressDiscovery, ChainClient};
use stbl_config::AppConfig;
use stbl_core::error::ToolError;
use stbl_core::tool::{Tool, ToolResult};
use stbl_storage::Store;
use tokio::sync::Mutex;
use tracing::{info, warn};

pub struct DiscoverAddressTool {
    client: Arc<dyn ChainClient>,
    store: Arc<Store>,
    config: Arc<Mutex<AppConfig>>,
    config_path: Option<PathBuf>,
}

impl DiscoverAddressTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            client: Arc::clone(&ctx.client),
            store: Arc::clone(&ctx.store),
            config: Arc::clone(&ctx.config),
            config_path: ctx.config_path.clone(),
        }
    }
}

#[async_trait]
impl Tool for DiscoverAddressTool {
    fn name(&self) -> &str {
        "discover_address"
    }

    fn description(&self) -> &str {
        "Discover your chain address by deploying a probe contract that records its deployer, then reading the address back. The result is saved to config."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        // Already discovered: report the known address without re-probing
        if let Some(address) = self.config.lock().await.user_address.clone() {
            return ToolResult::json(serde_json::json!({
                "address": address,
                "alreadyDiscovered": true,
            }));
        }

        let discovery = AddressDiscovery::new(Arc::clone(&self.client), Arc::clone(&self.store));
        let result = discovery
            .discover()
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: e.to_string(),
            })?;

        {
            let mut config = self.config.lock().await;
            config.user_address = Some(result.address.clone());
            config.setup_complete = true;
            if let Some(path) = &self.config_path {
                if let Err(e) = config.save_to(path) {
                    warn!(error = %e, "Address discovered but config save failed");
                }
            }
        }
        info!(address = %result.address, "Caller address discovered");

        ToolResult::json(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_context;

    #[tokio::test]
    async fn discovers_and_updates_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = test_context(dir.path());
        let config_path = dir.path().join("config.toml");
        ctx.config_path = Some(config_path.clone());
        let tool = DiscoverAddressTool::new(&ctx);

        let result = tool.execute(serde_json::json!({})).await.unwrap();
        assert!(result.success);

        let address = result.data.unwrap()["address"].as_str().unwrap().to_string();
        assert!(stbl_core::is_valid_address(&address));

        let config = ctx.config.lock().await;
        assert_eq!(config.user_address.as_deref(), Some(address.as_str()));
        assert!(config.setup_complete);
        drop(config);

        let saved = AppConfig::load_from(&config_path).unwrap();
        assert_eq!(saved.user_address.as_deref(), Some(address.as_str()));

        // The probe deployment landed in storage
        let counts = ctx.store.counts().await;
        assert_eq!(counts.contracts, 1);
        assert_eq!(counts.addresses, 1);
    }

    #[tokio::test]
    async fn second_run_reuses_known_address() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(dir.path());
        let tool = DiscoverAddressTool::new(&ctx);

        let first = tool.execute(serde_json::json!({})).await.unwrap();
        let address = first.data.unwrap()["address"].as_str().unwrap().to_string();

        let second = tool.execute(serde_json::json!({})).await.unwrap();
        let data = second.data.unwrap();
        assert_eq!(data["address"], address.as_str());
        assert_eq!(data["alreadyDiscovered"], true);

        // No second probe deployment
        assert_eq!(ctx.store.counts().await.contracts, 1);
    }
}
