//! `stbl_deploy` — deploy a contract and register it locally.

use crate::ToolContext;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use stbl_chain::{ChainClient, DeployRequest};
use stbl_config::AppConfig;
use stbl_core::error::ToolError;
use stbl_core::record::{ContractDeployment, TransactionRecord, TxKind, TxStatus};
use stbl_core::tool::{Tool, ToolResult};
use stbl_storage::Store;
use tokio::sync::Mutex;
use tracing::warn;

pub struct DeployContractTool {
    client: Arc<dyn ChainClient>,
    store: Arc<Store>,
    config: Arc<Mutex<AppConfig>>,
}

impl DeployContractTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            client: Arc::clone(&ctx.client),
            store: Arc::clone(&ctx.store),
            config: Arc::clone(&ctx.config),
        }
    }
}

#[async_trait]
impl Tool for DeployContractTool {
    fn name(&self) -> &str {
        "stbl_deploy"
    }

    fn description(&self) -> &str {
        "Deploy a smart contract from Solidity source (or a precompiled ABI) and record it in the local contract registry."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "source": {
                    "type": "string",
                    "description": "Solidity source code to compile and deploy"
                },
                "abi": {
                    "type": "array",
                    "description": "Precompiled contract ABI (alternative to source)",
                    "default": []
                },
                "constructor_args": {
                    "type": "array",
                    "description": "Constructor arguments",
                    "default": []
                },
                "name": {
                    "type": "string",
                    "description": "Human-readable contract name"
                }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let request = DeployRequest {
            source: arguments["source"].as_str().map(str::to_string),
            abi: arguments["abi"].as_array().cloned().unwrap_or_default(),
            constructor_args: arguments["constructor_args"]
                .as_array()
                .cloned()
                .unwrap_or_default(),
            name: arguments["name"].as_str().map(str::to_string),
        };
        if request.source.is_none() && request.abi.is_empty() {
            return Err(ToolError::InvalidArguments(
                "Either 'source' or 'abi' is required".into(),
            ));
        }

        let receipt = self
            .client
            .deploy_contract(&request)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: e.to_string(),
            })?;

        let now = Utc::now();
        let deployer = self
            .config
            .lock()
            .await
            .user_address
            .clone()
            .unwrap_or_else(|| "unknown".into());

        let deployment = ContractDeployment {
            address: receipt.contract_address.clone(),
            abi: request.abi.clone(),
            constructor_args: request.constructor_args.clone(),
            deployment_hash: receipt.transaction_hash.clone(),
            deployed_at: now,
            deployer: deployer.clone(),
            name: request.name.clone(),
            source: request.source.clone(),
        };
        if let Err(e) = self.store.add_deployed_contract(deployment).await {
            warn!(error = %e, "Deployment succeeded but registry write failed");
        }

        let record = TransactionRecord {
            hash: receipt.transaction_hash.clone(),
            kind: TxKind::Deploy,
            timestamp: now,
            from: Some(deployer),
            to: Some(receipt.contract_address.clone()),
            method: None,
            args: request.constructor_args,
            gas_used: Some(receipt.gas_used),
            status: TxStatus::Success,
            block_number: Some(receipt.block_number),
            details: request.name.map(|n| serde_json::json!({ "name": n })),
        };
        if let Err(e) = self.store.add_transaction(record).await {
            warn!(error = %e, "Deployment succeeded but history write failed");
        }

        ToolResult::json(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_context;

    #[tokio::test]
    async fn deploys_and_registers_contract() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(dir.path());
        let tool = DeployContractTool::new(&ctx);

        let result = tool
            .execute(serde_json::json!({
                "source": "contract Counter { uint256 public n; }",
                "name": "Counter"
            }))
            .await
            .unwrap();

        assert!(result.success);
        let address = result.data.unwrap()["contractAddress"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(stbl_core::is_valid_address(&address));

        let contract = ctx.store.contract_info(&address).await.unwrap();
        assert_eq!(contract.name.as_deref(), Some("Counter"));

        let history = ctx.store.transaction_history().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind, TxKind::Deploy);
    }

    #[tokio::test]
    async fn requires_source_or_abi() {
        let dir = tempfile::tempdir().unwrap();
        let tool = DeployContractTool::new(&test_context(dir.path()));
        let err = tool
            .execute(serde_json::json!({"name": "Nothing"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
