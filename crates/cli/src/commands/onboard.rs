//! `stbl-mcp onboard` — first-time setup.

use stbl_config::AppConfig;
use stbl_storage::Store;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = AppConfig::config_path();

    println!("stbl-mcp — First-Time Setup");
    println!("===========================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("Created config directory: {}", config_dir.display());
    } else {
        println!("Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\nConfig already exists at: {}", config_path.display());
        println!("Edit it manually or delete and re-run onboard.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("Created config.toml at: {}", config_path.display());
    }

    // Seed the storage tree so first tool calls find it in place
    let config = AppConfig::load()?;
    let store = Store::open(config.storage_dir());
    store.initialize().await?;
    println!("Initialized storage under: {}", config.storage_dir().display());

    println!("\nNext steps:");
    println!("  1. (optional) Edit {} and add a production API key", config_path.display());
    println!("  2. Run: stbl-mcp serve");
    println!("  3. Call the discover_address tool to finish onboarding\n");

    Ok(())
}
