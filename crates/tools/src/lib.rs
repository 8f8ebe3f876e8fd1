//! Built-in tool implementations for stbl-mcp.
//!
//! Tools give a calling agent the ability to interact with the Stability
//! chain: post messages, read and write contract state, deploy contracts,
//! discover the caller's address, and manage live event subscriptions.

pub mod deploy_contract;
pub mod discover_address;
pub mod events;
pub mod post_message;
pub mod read_contract;
pub mod setup_status;
pub mod write_contract;

use std::path::PathBuf;
use std::sync::Arc;
use stbl_chain::ChainClient;
use stbl_config::AppConfig;
use stbl_core::tool::ToolRegistry;
use stbl_events::EventEngine;
use stbl_storage::Store;
use tokio::sync::Mutex;

/// Shared services the tools operate on.
#[derive(Clone)]
pub struct ToolContext {
    pub client: Arc<dyn ChainClient>,
    pub store: Arc<Store>,
    pub engine: Arc<EventEngine>,
    pub config: Arc<Mutex<AppConfig>>,
    /// Where config updates are persisted. `None` disables persistence
    /// (used by tests).
    pub config_path: Option<PathBuf>,
}

/// Create the default tool registry with every built-in tool.
pub fn default_registry(ctx: &ToolContext) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(post_message::PostMessageTool::new(ctx)));
    registry.register(Box::new(read_contract::ReadContractTool::new(ctx)));
    registry.register(Box::new(write_contract::WriteContractTool::new(ctx)));
    registry.register(Box::new(deploy_contract::DeployContractTool::new(ctx)));
    registry.register(Box::new(discover_address::DiscoverAddressTool::new(ctx)));
    registry.register(Box::new(setup_status::SetupStatusTool::new(ctx)));
    registry.register(Box::new(events::SubscribeEventsTool::new(ctx)));
    registry.register(Box::new(events::UnsubscribeEventsTool::new(ctx)));
    registry.register(Box::new(events::ListSubscriptionsTool::new(ctx)));
    registry.register(Box::new(events::RecentEventsTool::new(ctx)));
    registry.register(Box::new(events::QueryEventsTool::new(ctx)));
    registry.register(Box::new(events::EventsStatusTool::new(ctx)));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_registry_has_all_tools() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_support::test_context(dir.path());
        let registry = default_registry(&ctx);

        let names: Vec<String> = registry
            .definitions()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "discover_address",
                "events_status",
                "list_subscriptions",
                "query_events",
                "recent_events",
                "setup_status",
                "stbl_deploy",
                "stbl_read",
                "stbl_write",
                "stbl_write_contract",
                "subscribe_events",
                "unsubscribe_events",
            ]
        );
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;
    use stbl_chain::SimulatedClient;
    use stbl_core::error::EventError;
    use stbl_events::{EngineConfig, EventTransport, TransportConn, TransportFrame};
    use tokio::sync::mpsc;

    /// A transport whose connections accept but never deliver. Enough for
    /// tool tests, which exercise the registry and buffer surface.
    pub struct IdleTransport;

    #[async_trait]
    impl EventTransport for IdleTransport {
        async fn open(&self, _url: &str) -> Result<TransportConn, EventError> {
            let (tx, rx) = mpsc::channel::<TransportFrame>(1);
            // Keep the sender alive so the connection stays open
            tokio::spawn(async move {
                tx.closed().await;
            });
            Ok(TransportConn::new(rx, None))
        }
    }

    pub fn test_context(dir: &std::path::Path) -> ToolContext {
        ToolContext {
            client: Arc::new(SimulatedClient::new()),
            store: Arc::new(Store::open(dir)),
            engine: Arc::new(EventEngine::with_transport(
                EngineConfig::default(),
                Arc::new(IdleTransport),
            )),
            config: Arc::new(Mutex::new(AppConfig::default())),
            config_path: None,
        }
    }
}
