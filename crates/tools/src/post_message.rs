//! `stbl_write` — post a plain message to the chain (zero gas).

use crate::ToolContext;
use async_trait::async_trait;
use std::sync::Arc;
use stbl_chain::ChainClient;
use stbl_config::AppConfig;
use stbl_core::error::ToolError;
use stbl_core::record::{TransactionRecord, TxKind, TxStatus};
use stbl_core::tool::{Tool, ToolResult};
use stbl_storage::Store;
use tokio::sync::Mutex;
use tracing::warn;

pub struct PostMessageTool {
    client: Arc<dyn ChainClient>,
    store: Arc<Store>,
    config: Arc<Mutex<AppConfig>>,
}

impl PostMessageTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            client: Arc::clone(&ctx.client),
            store: Arc::clone(&ctx.store),
            config: Arc::clone(&ctx.config),
        }
    }
}

#[async_trait]
impl Tool for PostMessageTool {
    fn name(&self) -> &str {
        "stbl_write"
    }

    fn description(&self) -> &str {
        "Post a plain message to the Stability blockchain. Zero gas: no wallet or funds needed."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "The message to post to the chain"
                }
            },
            "required": ["message"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let message = arguments["message"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'message' argument".into()))?;

        let receipt = self
            .client
            .post_message(message)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: e.to_string(),
            })?;

        let from = self.config.lock().await.user_address.clone();
        let record = TransactionRecord {
            hash: receipt.transaction_hash.clone(),
            kind: TxKind::Message,
            timestamp: receipt.timestamp,
            from,
            to: None,
            method: None,
            args: vec![serde_json::Value::String(message.to_string())],
            gas_used: Some(receipt.gas_used),
            status: TxStatus::Success,
            block_number: Some(receipt.block_number),
            details: Some(serde_json::json!({ "messageId": receipt.message_id })),
        };
        if let Err(e) = self.store.add_transaction(record).await {
            warn!(error = %e, "Message posted but history write failed");
        }

        ToolResult::json(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_context;

    #[tokio::test]
    async fn posts_and_records_transaction() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(dir.path());
        let tool = PostMessageTool::new(&ctx);

        let result = tool
            .execute(serde_json::json!({"message": "hello chain"}))
            .await
            .unwrap();

        assert!(result.success);
        let data = result.data.unwrap();
        assert_eq!(data["gasUsed"], 0);
        assert!(data["messageId"].as_str().unwrap().starts_with("zkt_"));

        let history = ctx.store.transaction_history().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind, TxKind::Message);
    }

    #[tokio::test]
    async fn missing_message_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let tool = PostMessageTool::new(&test_context(dir.path()));
        let err = tool.execute(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
