//! `stbl_read` — call a read-only contract method.

use crate::ToolContext;
use async_trait::async_trait;
use std::sync::Arc;
use stbl_chain::{ChainClient, ContractCall};
use stbl_core::error::ToolError;
use stbl_core::tool::{Tool, ToolResult};

pub struct ReadContractTool {
    client: Arc<dyn ChainClient>,
}

impl ReadContractTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            client: Arc::clone(&ctx.client),
        }
    }
}

#[async_trait]
impl Tool for ReadContractTool {
    fn name(&self) -> &str {
        "stbl_read"
    }

    fn description(&self) -> &str {
        "Call a read-only method on a deployed contract and return its output."
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
                    "description": "Name of the view method to call"
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
        let receipt = self
            .client
            .read_contract(&call)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: e.to_string(),
            })?;
        ToolResult::json(receipt)
    }
}

/// Shared argument shape for `stbl_read` and `stbl_write_contract`.
pub(crate) fn parse_call(arguments: &serde_json::Value) -> Result<ContractCall, ToolError> {
    let contract_address = arguments["contract_address"]
        .as_str()
        .ok_or_else(|| ToolError::InvalidArguments("Missing 'contract_address' argument".into()))?
        .to_string();
    let method = arguments["method"]
        .as_str()
        .ok_or_else(|| ToolError::InvalidArguments("Missing 'method' argument".into()))?
        .to_string();
    let args = arguments["args"].as_array().cloned().unwrap_or_default();
    Ok(ContractCall {
        contract_address,
        method,
        args,
    })
}
