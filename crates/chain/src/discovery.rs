//! Address discovery.
//!
//! The caller's chain address is discovered by deploying a small probe
//! contract that records `msg.sender` in its constructor, then reading the
//! recorded address back. The discovered address, the probe contract, and
//! the deployment transaction are all persisted.

use crate::client::{ChainClient, ContractCall, DeployRequest};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use stbl_core::error::{ChainError, Error, Result};
use stbl_core::record::{
    AddressInfo, AddressKind, ContractDeployment, TransactionRecord, TxKind, TxStatus,
};
use stbl_storage::Store;
use tracing::info;

/// Solidity source for the discovery probe. The constructor captures the
/// deployer's address so a follow-up read can return it.
const DISCOVERY_SOURCE: &str = r#"// SPDX-License-Identifier: MIT
pragma solidity ^0.8.0;

contract AddressDiscovery {
    address public discoveredAddress;

    constructor() {
        discoveredAddress = msg.sender;
    }

    function getDiscoveredAddress() public view returns (address) {
        return discoveredAddress;
    }
}
"#;

/// Outcome of a successful discovery run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryResult {
    /// The caller's discovered chain address.
    pub address: String,
    /// The probe contract that recorded it.
    pub probe_contract: String,
    /// The probe deployment transaction.
    pub transaction_hash: String,
}

/// Runs the probe-deploy-and-read discovery flow.
pub struct AddressDiscovery {
    client: Arc<dyn ChainClient>,
    store: Arc<Store>,
}

impl AddressDiscovery {
    pub fn new(client: Arc<dyn ChainClient>, store: Arc<Store>) -> Self {
        Self { client, store }
    }

    /// Deploy the probe, read the recorded address, and persist everything.
    pub async fn discover(&self) -> Result<DiscoveryResult> {
        let deploy = DeployRequest {
            source: Some(DISCOVERY_SOURCE.to_string()),
            abi: vec![],
            constructor_args: vec![],
            name: Some("AddressDiscovery".to_string()),
        };
        let receipt = self.client.deploy_contract(&deploy).await?;

        let read = ContractCall {
            contract_address: receipt.contract_address.clone(),
            method: "getDiscoveredAddress".to_string(),
            args: vec![],
        };
        let read_receipt = self.client.read_contract(&read).await?;
        let address = read_receipt
            .output
            .as_str()
            .unwrap_or_default()
            .to_string();

        if !stbl_core::is_valid_address(&address) {
            return Err(Error::Chain(ChainError::InvalidAddress(address)));
        }

        let now = Utc::now();
        self.store
            .add_address(AddressInfo {
                address: address.clone(),
                name: Some("My Address".to_string()),
                kind: AddressKind::User,
                first_seen: now,
                last_activity: Some(now),
                notes: Some("Discovered via probe contract".to_string()),
            })
            .await?;

        self.store
            .add_deployed_contract(ContractDeployment {
                address: receipt.contract_address.clone(),
                abi: vec![],
                constructor_args: vec![],
                deployment_hash: receipt.transaction_hash.clone(),
                deployed_at: now,
                deployer: address.clone(),
                name: Some("AddressDiscovery".to_string()),
                source: Some(DISCOVERY_SOURCE.to_string()),
            })
            .await?;

        self.store
            .add_transaction(TransactionRecord {
                hash: receipt.transaction_hash.clone(),
                kind: TxKind::Deploy,
                timestamp: now,
                from: Some(address.clone()),
                to: None,
                method: None,
                args: vec![],
                gas_used: Some(receipt.gas_used),
                status: TxStatus::Success,
                block_number: Some(receipt.block_number),
                details: Some(serde_json::json!({ "purpose": "address discovery" })),
            })
            .await?;

        info!(address = %address, probe = %receipt.contract_address, "Address discovered");

        Ok(DiscoveryResult {
            address,
            probe_contract: receipt.contract_address,
            transaction_hash: receipt.transaction_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SimulatedClient;

    #[tokio::test]
    async fn discovery_persists_address_contract_and_transaction() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path()));
        let client = Arc::new(SimulatedClient::new());
        let expected = client.identity_address().to_string();

        let discovery = AddressDiscovery::new(client, store.clone());
        let result = discovery.discover().await.unwrap();

        assert_eq!(result.address, expected);
        assert!(stbl_core::is_valid_address(&result.probe_contract));

        let info = store.address_info(&result.address).await.unwrap();
        assert_eq!(info.kind, AddressKind::User);

        let contract = store.contract_info(&result.probe_contract).await.unwrap();
        assert_eq!(contract.name.as_deref(), Some("AddressDiscovery"));
        assert_eq!(contract.deployer, result.address);

        let history = store.transaction_history().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].hash, result.transaction_hash);
        assert_eq!(history[0].kind, TxKind::Deploy);
    }

    #[tokio::test]
    async fn repeated_discovery_does_not_duplicate_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path()));
        let client = Arc::new(SimulatedClient::new());

        let discovery = AddressDiscovery::new(client, store.clone());
        discovery.discover().await.unwrap();
        discovery.discover().await.unwrap();

        // Same identity address both times, so the book stays at one entry.
        assert_eq!(store.counts().await.addresses, 1);
    }
}
