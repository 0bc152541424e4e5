//! `shopwright config`: configuration management commands.

use shopwright_config::AppConfig;

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let mut warnings = Vec::new();

            if config.telegram.bot_token.is_none() {
                warnings.push("No bot token set (set SHOPWRIGHT_BOT_TOKEN env var)");
            }

            if config.admins.is_empty() {
                warnings.push("No admins listed, the bot will ignore everyone");
            }

            if config.admins.iter().any(|a| a == "*") {
                warnings.push("admins contains \"*\", every sender is treated as admin");
            }

            if config.wizard.idle_timeout().is_none() {
                warnings.push("Idle eviction disabled, abandoned wizards are kept forever");
            }

            if config.store.categories.is_empty() {
                warnings.push("No categories seeded, the category step cannot be answered");
            }

            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Admins:      {}", config.admins.len());
            println!("   Keep token:  {:?}", config.wizard.keep_token);
            println!("   Categories:  {}", config.store.categories.join(", "));
            println!("   Info pages:  {}", config.store.info_pages.len());
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}
