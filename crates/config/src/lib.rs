//! Configuration loading, validation, and management for Shopwright.
//!
//! Loads configuration from `~/.shopwright/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.shopwright/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Sender IDs allowed to use the admin features.
    /// Empty = deny all, ["*"] = allow all.
    #[serde(default)]
    pub admins: Vec<String>,

    /// Product wizard settings
    #[serde(default)]
    pub wizard: WizardConfig,

    /// Seed data for the in-memory catalog
    #[serde(default)]
    pub store: StoreConfig,

    /// Telegram transport settings
    #[serde(default)]
    pub telegram: TelegramSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardConfig {
    /// Input meaning "keep the value the product already has"
    #[serde(default = "default_keep_token")]
    pub keep_token: String,

    /// Sessions untouched for this long are dropped. 0 disables eviction.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// How often the idle sweeper runs
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_keep_token() -> String {
    ".".into()
}
fn default_idle_timeout_secs() -> u64 {
    1800
}
fn default_sweep_interval_secs() -> u64 {
    60
}

impl WizardConfig {
    /// The idle timeout, or `None` when eviction is disabled.
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            keep_token: default_keep_token(),
            idle_timeout_secs: default_idle_timeout_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Category names, in display order
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,

    /// Info page name → page text
    #[serde(default = "default_info_pages")]
    pub info_pages: BTreeMap<String, String>,
}

fn default_categories() -> Vec<String> {
    vec!["Food".into(), "Drinks".into()]
}

fn default_info_pages() -> BTreeMap<String, String> {
    [
        ("main", "Welcome!"),
        ("about", "Italian Dream Pizzeria.\nWorking hours - 9-18."),
        (
            "payment",
            "Payment options:\n✅ By card in the bot\n✅ Upon receipt of the card/cash\n✅ At the establishment",
        ),
        (
            "shipping",
            "Delivery/Order Options:\n✅ Courier\n✅ Self-pickup\n✅ Eat at the establishment\n----------------------\nDelivery impossible:\n❌ Post",
        ),
        ("catalog", "Category:"),
        ("cart", "Cart is empty!"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            info_pages: default_info_pages(),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct TelegramSettings {
    /// Bot token from @BotFather
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,

    /// Use webhook mode instead of long polling
    #[serde(default)]
    pub use_webhook: bool,
}

impl std::fmt::Debug for TelegramSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSettings")
            .field("bot_token", &redact(&self.bot_token))
            .field("use_webhook", &self.use_webhook)
            .finish()
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.shopwright/config.toml).
    ///
    /// Environment variables override the file:
    /// - `SHOPWRIGHT_BOT_TOKEN`
    /// - `SHOPWRIGHT_ADMINS` (comma separated sender IDs)
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if let Ok(token) = std::env::var("SHOPWRIGHT_BOT_TOKEN") {
            config.telegram.bot_token = Some(token);
        }

        if let Ok(admins) = std::env::var("SHOPWRIGHT_ADMINS") {
            config.admins = parse_admin_list(&admins);
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".shopwright")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wizard.keep_token.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "wizard.keep_token must not be blank".into(),
            ));
        }

        if self.wizard.idle_timeout_secs > 0 && self.wizard.sweep_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "wizard.sweep_interval_secs must be > 0 when eviction is enabled".into(),
            ));
        }

        let mut seen = HashSet::new();
        for name in &self.store.categories {
            if name.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "store.categories must not contain blank names".into(),
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "store.categories contains '{name}' twice"
                )));
            }
        }

        Ok(())
    }

    /// Whether a sender may use the admin features.
    pub fn is_admin(&self, sender_id: &str) -> bool {
        self.admins.iter().any(|a| a == "*" || a == sender_id)
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            admins: vec![],
            wizard: WizardConfig::default(),
            store: StoreConfig::default(),
            telegram: TelegramSettings::default(),
        }
    }
}

fn parse_admin_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.wizard.keep_token, ".");
        assert_eq!(config.store.categories, vec!["Food", "Drinks"]);
        assert_eq!(config.store.info_pages.len(), 6);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.wizard.keep_token, config.wizard.keep_token);
        assert_eq!(parsed.store.categories, config.store.categories);
    }

    #[test]
    fn blank_keep_token_rejected() {
        let config = AppConfig {
            wizard: WizardConfig {
                keep_token: "  ".into(),
                ..WizardConfig::default()
            },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn duplicate_category_rejected() {
        let config = AppConfig {
            store: StoreConfig {
                categories: vec!["Food".into(), "Food".into()],
                ..StoreConfig::default()
            },
            ..AppConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Food"));
    }

    #[test]
    fn zero_sweep_interval_rejected_only_with_eviction() {
        let mut config = AppConfig::default();
        config.wizard.sweep_interval_secs = 0;
        assert!(config.validate().is_err());

        config.wizard.idle_timeout_secs = 0;
        assert!(config.validate().is_ok());
        assert!(config.wizard.idle_timeout().is_none());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().wizard.idle_timeout_secs, 1800);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
admins = ["1001", "1002"]

[wizard]
keep_token = "="
idle_timeout_secs = 600

[store]
categories = ["Pizza", "Desserts", "Drinks"]
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.admins, vec!["1001", "1002"]);
        assert_eq!(config.wizard.keep_token, "=");
        assert_eq!(config.wizard.idle_timeout(), Some(Duration::from_secs(600)));
        assert_eq!(config.wizard.sweep_interval_secs, 60);
        assert_eq!(config.store.categories.len(), 3);
        // Unspecified seed tables fall back to defaults
        assert!(config.store.info_pages.contains_key("about"));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "admins = [").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn admin_allowlist() {
        let mut config = AppConfig::default();
        assert!(!config.is_admin("1001"));

        config.admins = vec!["1001".into()];
        assert!(config.is_admin("1001"));
        assert!(!config.is_admin("1002"));

        config.admins = vec!["*".into()];
        assert!(config.is_admin("anyone"));
    }

    #[test]
    fn admin_list_parsing() {
        assert_eq!(parse_admin_list(" 1, 2 ,,3 "), vec!["1", "2", "3"]);
        assert!(parse_admin_list("").is_empty());
    }

    #[test]
    fn telegram_token_redacted_in_debug() {
        let settings = TelegramSettings {
            bot_token: Some("123:secret".into()),
            use_webhook: false,
        };
        let debug = format!("{settings:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("REDACTED"));
    }
}
