//! Persisted collaborator records: deployed contracts, transaction history,
//! and the address book.
//!
//! These are subscription-independent records the storage layer keeps on
//! disk as JSON. Field names stay camelCase for compatibility with files
//! written by earlier releases.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for a contract deployed through this server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractDeployment {
    pub address: String,

    #[serde(default)]
    pub abi: Vec<serde_json::Value>,

    #[serde(default)]
    pub constructor_args: Vec<serde_json::Value>,

    pub deployment_hash: String,

    pub deployed_at: DateTime<Utc>,

    pub deployer: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Solidity source, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// What kind of chain interaction a transaction record captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    Message,
    Deploy,
    Call,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Success,
    Failed,
}

/// One entry in the local transaction history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub hash: String,

    #[serde(rename = "type")]
    pub kind: TxKind,

    pub timestamp: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<u64>,

    pub status: TxStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressKind {
    User,
    Contract,
    External,
}

/// A known address with optional annotations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInfo {
    pub address: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "type")]
    pub kind: AddressKind,

    pub first_seen: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Basic address shape check: `0x` followed by 40 hex characters.
pub fn is_valid_address(address: &str) -> bool {
    address.len() == 42
        && address.starts_with("0x")
        && address[2..].chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_kind_serializes_lowercase() {
        let json = serde_json::to_string(&TxKind::Deploy).unwrap();
        assert_eq!(json, r#""deploy""#);
    }

    #[test]
    fn transaction_record_roundtrips_camel_case() {
        let record = TransactionRecord {
            hash: "0xabc".into(),
            kind: TxKind::Call,
            timestamp: Utc::now(),
            from: Some("0x1".into()),
            to: Some("0x2".into()),
            method: Some("transfer".into()),
            args: vec![serde_json::json!("0x3"), serde_json::json!(100)],
            gas_used: Some(0),
            status: TxStatus::Success,
            block_number: Some(42),
            details: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "call");
        assert!(json.get("blockNumber").is_some());
        let back: TransactionRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back.hash, "0xabc");
        assert_eq!(back.kind, TxKind::Call);
    }

    #[test]
    fn address_validation() {
        assert!(is_valid_address(
            "0x1234567890abcdefABCDEF1234567890abcdef12"
        ));
        assert!(!is_valid_address("0x1234"));
        assert!(!is_valid_address(
            "1234567890abcdefABCDEF1234567890abcdef1234"
        ));
        assert!(!is_valid_address(
            "0xZZ34567890abcdefABCDEF1234567890abcdef12"
        ));
    }
}
