//! `shopwright doctor`: diagnose setup problems.

use shopwright_config::AppConfig;
use shopwright_core::catalog::CatalogStore;
use shopwright_store::InMemoryCatalog;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Shopwright Doctor: System Diagnostics");
    println!("========================================\n");

    let mut issues = 0;

    println!("  ✅ Rust binary running");

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  ⚠️  No config file, using defaults ({})", config_path.display());
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Configuration valid");
            config
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            println!("\n  ⚠️  1 issue(s) found. See above for details.");
            return Ok(());
        }
    };

    if config.telegram.bot_token.is_some() {
        println!("  ✅ Bot token configured");
    } else {
        println!("  ⚠️  No bot token, `shopwright serve` will refuse to start");
        issues += 1;
    }

    if config.admins.is_empty() {
        println!("  ⚠️  No admins configured, add sender ids to `admins`");
        issues += 1;
    } else {
        println!("  ✅ {} admin(s) configured", config.admins.len());
    }

    let store = InMemoryCatalog::seeded(&config.store);
    match store.list_categories().await {
        Ok(categories) if !categories.is_empty() => {
            println!("  ✅ Catalog seeded with {} categories", categories.len());
        }
        Ok(_) => {
            println!("  ⚠️  No categories, products cannot be created");
            issues += 1;
        }
        Err(e) => {
            println!("  ❌ Catalog unavailable: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
