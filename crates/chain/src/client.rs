//! The chain client trait and the simulated implementation.
//!
//! Stability transactions are zero gas, so every receipt reports
//! `gas_used: 0`. The simulated client mirrors the hosted API's response
//! shapes while fabricating hashes, block numbers, and read outputs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use stbl_core::error::ChainError;
use tracing::debug;

/// A read-only contract call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractCall {
    pub contract_address: String,
    pub method: String,
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
}

/// A state-changing contract call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractWrite {
    pub contract_address: String,
    pub method: String,
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
}

/// A contract deployment request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRequest {
    /// Solidity source to compile and deploy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default)]
    pub abi: Vec<serde_json::Value>,

    #[serde(default)]
    pub constructor_args: Vec<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Receipt for a posted chain message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageReceipt {
    pub success: bool,
    pub message_id: String,
    pub transaction_hash: String,
    pub block_number: u64,
    pub gas_used: u64,
    pub timestamp: DateTime<Utc>,
}

/// Receipt for a contract read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceipt {
    pub success: bool,
    pub contract_address: String,
    pub method: String,
    pub output: serde_json::Value,
}

/// Receipt for a contract write.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteReceipt {
    pub success: bool,
    pub contract_address: String,
    pub method: String,
    pub transaction_hash: String,
    pub block_number: u64,
    pub gas_used: u64,
}

/// Receipt for a contract deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployReceipt {
    pub success: bool,
    pub contract_address: String,
    pub transaction_hash: String,
    pub block_number: u64,
    pub gas_used: u64,
}

/// The four chain interactions the server performs.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Post a plain message to the chain (zero gas).
    async fn post_message(&self, message: &str) -> Result<MessageReceipt, ChainError>;

    /// Call a read-only contract method.
    async fn read_contract(&self, call: &ContractCall) -> Result<ReadReceipt, ChainError>;

    /// Call a state-changing contract method.
    async fn write_contract(&self, call: &ContractWrite) -> Result<WriteReceipt, ChainError>;

    /// Deploy a contract.
    async fn deploy_contract(&self, request: &DeployRequest) -> Result<DeployReceipt, ChainError>;
}

/// A client that fabricates receipts without touching the network.
///
/// Carries a stable identity address so discovery reads return the same
/// address for the lifetime of the client.
pub struct SimulatedClient {
    identity_address: String,
}

impl SimulatedClient {
    pub fn new() -> Self {
        Self {
            identity_address: random_address(),
        }
    }

    /// The address this client reports as the caller's identity.
    pub fn identity_address(&self) -> &str {
        &self.identity_address
    }
}

impl Default for SimulatedClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainClient for SimulatedClient {
    async fn post_message(&self, message: &str) -> Result<MessageReceipt, ChainError> {
        if message.is_empty() {
            return Err(ChainError::PostFailed("message must not be empty".into()));
        }
        let receipt = MessageReceipt {
            success: true,
            message_id: message_id(),
            transaction_hash: random_tx_hash(),
            block_number: random_block(),
            gas_used: 0,
            timestamp: Utc::now(),
        };
        debug!(message_id = %receipt.message_id, "Simulated message post");
        Ok(receipt)
    }

    async fn read_contract(&self, call: &ContractCall) -> Result<ReadReceipt, ChainError> {
        if !stbl_core::is_valid_address(&call.contract_address) {
            return Err(ChainError::InvalidAddress(call.contract_address.clone()));
        }
        // Identity reads answer with the client's stable address; everything
        // else gets an opaque simulated value.
        let output = match call.method.as_str() {
            "getDiscoveredAddress" | "getValidator" => {
                serde_json::Value::String(self.identity_address.clone())
            }
            _ => serde_json::Value::String(format!("result_{}", random_hex(8))),
        };
        Ok(ReadReceipt {
            success: true,
            contract_address: call.contract_address.clone(),
            method: call.method.clone(),
            output,
        })
    }

    async fn write_contract(&self, call: &ContractWrite) -> Result<WriteReceipt, ChainError> {
        if !stbl_core::is_valid_address(&call.contract_address) {
            return Err(ChainError::InvalidAddress(call.contract_address.clone()));
        }
        Ok(WriteReceipt {
            success: true,
            contract_address: call.contract_address.clone(),
            method: call.method.clone(),
            transaction_hash: random_tx_hash(),
            block_number: random_block(),
            gas_used: 0,
        })
    }

    async fn deploy_contract(&self, request: &DeployRequest) -> Result<DeployReceipt, ChainError> {
        if request.source.as_deref().is_none_or(str::is_empty) && request.abi.is_empty() {
            return Err(ChainError::DeployFailed(
                "either source or an ABI is required".into(),
            ));
        }
        let receipt = DeployReceipt {
            success: true,
            contract_address: random_address(),
            transaction_hash: random_tx_hash(),
            block_number: random_block(),
            gas_used: 0,
        };
        debug!(
            contract = %receipt.contract_address,
            name = request.name.as_deref().unwrap_or("<unnamed>"),
            "Simulated contract deployment"
        );
        Ok(receipt)
    }
}

fn random_hex(len: usize) -> String {
    const HEX: &[u8] = b"0123456789abcdef";
    let mut rng = rand::rng();
    (0..len)
        .map(|_| HEX[rng.random_range(0..16)] as char)
        .collect()
}

/// A fabricated transaction hash: `0x` plus 64 hex characters.
pub(crate) fn random_tx_hash() -> String {
    format!("0x{}", random_hex(64))
}

/// A fabricated address: `0x` plus 40 hex characters.
pub(crate) fn random_address() -> String {
    format!("0x{}", random_hex(40))
}

/// Simulated blocks land between 1,000,000 and 2,000,000.
fn random_block() -> u64 {
    rand::rng().random_range(1_000_000..2_000_000)
}

fn message_id() -> String {
    format!("zkt_{}_{}", Utc::now().timestamp_millis(), random_hex(8))
}
