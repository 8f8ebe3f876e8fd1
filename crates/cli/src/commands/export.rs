//! `stbl-mcp export` — dump all local records as JSON.

use stbl_config::AppConfig;
use stbl_storage::Store;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let store = Store::open(config.storage_dir());
    let data = store.export().await;
    println!("{}", serde_json::to_string_pretty(&data)?);
    Ok(())
}
