//! `stbl-mcp cleanup` — drop stale transactions and inactive addresses.

use stbl_config::AppConfig;
use stbl_storage::{CleanupOptions, Store};

pub async fn run(older_than_days: i64, keep_transactions: usize) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let store = Store::open(config.storage_dir());

    let report = store
        .cleanup(CleanupOptions {
            older_than_days,
            keep_transactions,
        })
        .await?;

    println!(
        "Removed {} transactions and {} addresses older than {} days (kept the newest {} transactions).",
        report.deleted_transactions, report.deleted_addresses, older_than_days, keep_transactions
    );
    Ok(())
}
