//! The file-backed record store.
//!
//! Fast reads from in-memory copies, durable writes by flushing the whole
//! collection on every mutation. Upserts replace by key (contract address,
//! transaction hash, address) so records never duplicate.

use chrono::{Duration, Utc};
use serde::{Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use stbl_core::error::StorageError;
use stbl_core::record::{AddressInfo, ContractDeployment, TransactionRecord};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Transaction history is capped at this many records, newest first.
pub const MAX_TRANSACTIONS: usize = 1000;

/// Record counts across all collections.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StoreCounts {
    pub contracts: usize,
    pub transactions: usize,
    pub addresses: usize,
}

/// Full data export (for the `export` operation and backups).
#[derive(Debug, Clone, Serialize)]
pub struct ExportData {
    pub contracts: Vec<ContractDeployment>,
    pub transactions: Vec<TransactionRecord>,
    pub addresses: Vec<AddressInfo>,
}

/// Options for [`Store::cleanup`].
#[derive(Debug, Clone, Copy)]
pub struct CleanupOptions {
    /// Drop records older than this many days.
    pub older_than_days: i64,
    /// Cap on surviving transactions: at most this many of the newest are
    /// kept, and those newest survive even past the age cutoff.
    pub keep_transactions: usize,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            older_than_days: 30,
            keep_transactions: 100,
        }
    }
}

/// Result of a cleanup pass.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CleanupReport {
    pub deleted_transactions: usize,
    pub deleted_addresses: usize,
}

/// The file-backed store for contracts, transactions, and addresses.
pub struct Store {
    base_dir: PathBuf,
    contracts: RwLock<Vec<ContractDeployment>>,
    transactions: RwLock<Vec<TransactionRecord>>,
    addresses: RwLock<Vec<AddressInfo>>,
}

impl Store {
    /// Open a store rooted at `base_dir`, loading any existing records.
    ///
    /// Missing files start empty; they are created on first write (or by
    /// [`Store::initialize`]).
    pub fn open(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let contracts: Vec<ContractDeployment> =
            load_collection(&contracts_registry_path(&base_dir));
        let transactions: Vec<TransactionRecord> =
            load_collection(&transactions_path(&base_dir));
        let addresses: Vec<AddressInfo> = load_collection(&addresses_path(&base_dir));

        debug!(
            base_dir = %base_dir.display(),
            contracts = contracts.len(),
            transactions = transactions.len(),
            addresses = addresses.len(),
            "Store opened"
        );

        Self {
            base_dir,
            contracts: RwLock::new(contracts),
            transactions: RwLock::new(transactions),
            addresses: RwLock::new(addresses),
        }
    }

    /// Create the directory tree and seed empty collection files.
    pub async fn initialize(&self) -> Result<(), StorageError> {
        let artifacts = self.base_dir.join("contracts").join("artifacts");
        std::fs::create_dir_all(&artifacts).map_err(|e| StorageError::Write {
            path: artifacts.clone(),
            reason: e.to_string(),
        })?;

        for path in [
            contracts_registry_path(&self.base_dir),
            transactions_path(&self.base_dir),
            addresses_path(&self.base_dir),
        ] {
            if !path.exists() {
                write_json(&path, &Vec::<serde_json::Value>::new())?;
            }
        }
        Ok(())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    // ── Contracts ─────────────────────────────────────────────────────

    /// Snapshot of the deployed-contract registry.
    pub async fn deployed_contracts(&self) -> Vec<ContractDeployment> {
        self.contracts.read().await.clone()
    }

    /// Upsert a deployed contract (replaces any record with the same
    /// address) and write its artifact file.
    pub async fn add_deployed_contract(
        &self,
        contract: ContractDeployment,
    ) -> Result<(), StorageError> {
        let mut contracts = self.contracts.write().await;
        contracts.retain(|c| !c.address.eq_ignore_ascii_case(&contract.address));

        let artifact_path = self
            .base_dir
            .join("contracts")
            .join("artifacts")
            .join(format!("{}.json", contract.address));
        write_json(&artifact_path, &contract)?;

        contracts.push(contract);
        write_json(&contracts_registry_path(&self.base_dir), &*contracts)
    }

    /// Look up a deployed contract by address (case-insensitive).
    pub async fn contract_info(&self, address: &str) -> Option<ContractDeployment> {
        self.contracts
            .read()
            .await
            .iter()
            .find(|c| c.address.eq_ignore_ascii_case(address))
            .cloned()
    }

    // ── Transactions ──────────────────────────────────────────────────

    /// Snapshot of the transaction history, newest first.
    pub async fn transaction_history(&self) -> Vec<TransactionRecord> {
        self.transactions.read().await.clone()
    }

    /// Record a transaction. Replaces any record with the same hash,
    /// inserts at the newest end, and trims to [`MAX_TRANSACTIONS`].
    pub async fn add_transaction(&self, tx: TransactionRecord) -> Result<(), StorageError> {
        let mut transactions = self.transactions.write().await;
        transactions.retain(|t| t.hash != tx.hash);
        transactions.insert(0, tx);
        transactions.truncate(MAX_TRANSACTIONS);
        write_json(&transactions_path(&self.base_dir), &*transactions)
    }

    /// Apply an in-place update to the transaction with the given hash.
    /// Returns false when no such transaction exists.
    pub async fn update_transaction(
        &self,
        hash: &str,
        update: impl FnOnce(&mut TransactionRecord),
    ) -> Result<bool, StorageError> {
        let mut transactions = self.transactions.write().await;
        let Some(tx) = transactions.iter_mut().find(|t| t.hash == hash) else {
            return Ok(false);
        };
        update(tx);
        write_json(&transactions_path(&self.base_dir), &*transactions)?;
        Ok(true)
    }

    // ── Addresses ─────────────────────────────────────────────────────

    /// Snapshot of the address book.
    pub async fn address_book(&self) -> Vec<AddressInfo> {
        self.addresses.read().await.clone()
    }

    /// Upsert an address book entry (case-insensitive on the address).
    pub async fn add_address(&self, info: AddressInfo) -> Result<(), StorageError> {
        let mut addresses = self.addresses.write().await;
        addresses.retain(|a| !a.address.eq_ignore_ascii_case(&info.address));
        addresses.push(info);
        write_json(&addresses_path(&self.base_dir), &*addresses)
    }

    /// Look up an address book entry (case-insensitive).
    pub async fn address_info(&self, address: &str) -> Option<AddressInfo> {
        self.addresses
            .read()
            .await
            .iter()
            .find(|a| a.address.eq_ignore_ascii_case(address))
            .cloned()
    }

    // ── Utility ───────────────────────────────────────────────────────

    /// Record counts for status reporting.
    pub async fn counts(&self) -> StoreCounts {
        StoreCounts {
            contracts: self.contracts.read().await.len(),
            transactions: self.transactions.read().await.len(),
            addresses: self.addresses.read().await.len(),
        }
    }

    /// Export all records.
    pub async fn export(&self) -> ExportData {
        ExportData {
            contracts: self.deployed_contracts().await,
            transactions: self.transaction_history().await,
            addresses: self.address_book().await,
        }
    }

    /// Drop stale transactions and inactive addresses.
    ///
    /// A transaction survives when it is newer than the cutoff or within
    /// the newest `keep_transactions`; the history is then trimmed to that
    /// count. An address survives when it has no recorded activity or its
    /// last activity is newer than the cutoff.
    pub async fn cleanup(&self, options: CleanupOptions) -> Result<CleanupReport, StorageError> {
        let cutoff = Utc::now() - Duration::days(options.older_than_days);

        let deleted_transactions = {
            let mut transactions = self.transactions.write().await;
            let before = transactions.len();
            let kept: Vec<TransactionRecord> = transactions
                .iter()
                .enumerate()
                .filter(|(i, tx)| tx.timestamp > cutoff || *i < options.keep_transactions)
                .map(|(_, tx)| tx.clone())
                .take(options.keep_transactions)
                .collect();
            *transactions = kept;
            write_json(&transactions_path(&self.base_dir), &*transactions)?;
            before - transactions.len()
        };

        let deleted_addresses = {
            let mut addresses = self.addresses.write().await;
            let before = addresses.len();
            addresses.retain(|a| a.last_activity.is_none_or(|t| t > cutoff));
            write_json(&addresses_path(&self.base_dir), &*addresses)?;
            before - addresses.len()
        };

        Ok(CleanupReport {
            deleted_transactions,
            deleted_addresses,
        })
    }
}

fn contracts_registry_path(base: &Path) -> PathBuf {
    base.join("contracts").join("deployed.json")
}

fn transactions_path(base: &Path) -> PathBuf {
    base.join("transactions").join("history.json")
}

fn addresses_path(base: &Path) -> PathBuf {
    base.join("addresses").join("known.json")
}

/// Load a JSON collection; missing or corrupted files degrade to empty.
fn load_collection<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return Vec::new(),
    };
    match serde_json::from_str(&content) {
        Ok(records) => records,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Skipping corrupted record file");
            Vec::new()
        }
    }
}

/// Write a value as pretty JSON, creating parent directories as needed.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StorageError::Write {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    }
    let content =
        serde_json::to_string_pretty(value).map_err(|e| StorageError::Serde(e.to_string()))?;
    std::fs::write(path, content).map_err(|e| StorageError::Write {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
