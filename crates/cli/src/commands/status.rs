//! `stbl-mcp status` — show config, storage, and onboarding status.

use stbl_config::AppConfig;
use stbl_storage::Store;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_path();

    println!("stbl-mcp Status");
    println!("===============\n");

    if !config_path.exists() {
        println!("No config found at {}", config_path.display());
        println!("Run `stbl-mcp onboard` to get started.\n");
        return Ok(());
    }

    let config = AppConfig::load()?;
    println!("Config:        {}", config_path.display());
    println!(
        "API key:       {}",
        if config.has_production_key() {
            "production"
        } else {
            "try-it-out (rate limited)"
        }
    );
    println!(
        "User address:  {}",
        config.user_address.as_deref().unwrap_or("(not discovered)")
    );
    println!(
        "Onboarding:    {}",
        if config.setup_complete {
            "complete"
        } else {
            "incomplete — call discover_address"
        }
    );
    println!("Event stream:  {}", config.events.ws_url);
    println!(
        "Reconnect:     base {}ms, max {} attempts",
        config.events.reconnect.base_delay_ms, config.events.reconnect.max_attempts
    );

    let store = Store::open(config.storage_dir());
    let counts = store.counts().await;
    println!("\nStorage ({}):", config.storage_dir().display());
    println!("  Contracts:     {}", counts.contracts);
    println!("  Transactions:  {}", counts.transactions);
    println!("  Addresses:     {}", counts.addresses);
    println!();

    Ok(())
}
