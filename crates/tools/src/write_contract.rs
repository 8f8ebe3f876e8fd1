//! `stbl_write_contract` — call a state-changing contract method.

use crate::ToolContext;
use crate::read_contract::parse_call;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use stbl_chain::{ChainClient, ContractWrite};
use stbl_config::AppConfig;
use stbl_core::error::ToolError;
use stbl_core::record::{TransactionRecord, TxKind, TxStatus};
use stbl_core::tool::{Tool, ToolResult};
use stbl_storage::Store;
use tokio::sync::Mutex;
use tracing::warn;

pub struct WriteContractTool {
    client: Arc<dyn ChainClient>,
    store: Arc<Store>,
    config: Arc<Mutex<AppConfig>>,
}

impl WriteContractTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            client: Arc::clone(&ctx.client),
            store: Arc::clone(&ctx.store),
            config: Arc::clone(&ctx.config),
        }
    }
}

#[async_trait]
impl Tool for WriteContractTool {
    fn name(&self) -> &str {
        "stbl_write_contract"
    }

    fn description(&self) -> &str {
        "Call a state-changing method on a deployed contract. Zero gas; the transaction is recorded in local history."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "contract_address": {
                    "type": "string",
                    "description": "Address of the contract (0x + 40 hex chars)"
                },
                "method": {
                    "type": "string",
                    "description": "Name of the method to call"
                },
                "args": {
                    "type": "array",
                    "description": "Positional method arguments",
                    "default": []
                }
            },
            "required": ["contract_address", "method"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let call = parse_call(&arguments)?;
        let write = ContractWrite {
            contract_address: call.contract_address,
            method: call.method,
            args: call.args,
        };

        let receipt = self
            .client
            .write_contract(&write)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: e.to_string(),
            })?;

        let from = self.config.lock().await.user_address.clone();
        let record = TransactionRecord {
            hash: receipt.transaction_hash.clone(),
            kind: TxKind::Call,
            timestamp: Utc::now(),
            from,
            to: Some(receipt.contract_address.clone()),
            method: Some(receipt.method.clone()),
            args: write.args.clone(),
            gas_used: Some(receipt.gas_used),
            status: TxStatus::Success,
            block_number: Some(receipt.block_number),
            details: None,
        };
        if let Err(e) = self.store.add_transaction(record).await {
            warn!(error = %e, "Contract write succeeded but history write failed");
        }

        ToolResult::json(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_context;

    #[tokio::test]
    async fn writes_and_records_call() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(dir.path());
        let tool = WriteContractTool::new(&ctx);

        let result = tool
            .execute(serde_json::json!({
                "contract_address": "0x1234567890abcdef1234567890abcdef12345678",
                "method": "transfer",
                "args": ["0xabc", 100]
            }))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.data.unwrap()["gasUsed"], 0);

        let history = ctx.store.transaction_history().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind, TxKind::Call);
        assert_eq!(history[0].method.as_deref(), Some("transfer"));
        assert_eq!(history[0].args.len(), 2);
    }
}
