//! Configuration loading and config file resolution
//!
//! Configuration is read once at startup and is immutable afterwards.
//!
//! Config file priority order:
//! 1. Command-line argument (highest priority)
//! 2. `MAILLISTR_CONFIG` environment variable
//! 3. `./maillistr.toml` in the working directory
//! 4. `<user config dir>/maillistr/config.toml`
//!
//! A missing file is not fatal: built-in defaults are used and the binary
//! logs a warning once logging is up. Selected values can be overridden from
//! the environment after the file is read (see
//! [`TomlConfig::apply_env_overrides`]).

use crate::{Error, Result};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "MAILLISTR_CONFIG";
pub const API_KEY_ENV: &str = "MAILLISTR_API_KEY";
pub const DATABASE_ENV: &str = "MAILLISTR_DATABASE";
pub const BIND_ENV: &str = "MAILLISTR_BIND";
pub const MAILCHIMP_API_KEY_ENV: &str = "MAILLISTR_MAILCHIMP_API_KEY";

const LOCAL_CONFIG_FILE: &str = "maillistr.toml";

/// Number of random bytes in a generated API key (hex encoded to 30 chars)
const API_KEY_BYTES: usize = 15;

/// Service configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Admin API key, compared against the HTTP Basic password.
    /// Empty means no admin call can succeed.
    #[serde(default)]
    pub api_key: String,

    /// Path to SQLite database file (relative or absolute)
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// HTTP listen address
    #[serde(default = "default_bind")]
    pub bind: String,

    /// External subscription service
    #[serde(default)]
    pub mailchimp: MailchimpConfig,

    /// Background dispatch queue sizing
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Mailchimp integration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailchimpConfig {
    #[serde(default)]
    pub enabled: bool,

    /// API key in `<key>-<datacenter>` form
    #[serde(default)]
    pub api_key: String,

    /// Override for the API base URL (tests, proxies)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Timeout for a single outbound subscribe call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Dispatch queue settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Jobs buffered before new ones are dropped
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Concurrent outbound calls
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter directive (trace, debug, info, warn, error or a full EnvFilter string)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("maillistr.db")
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_max_in_flight() -> usize {
    16
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            database_path: default_database_path(),
            bind: default_bind(),
            mailchimp: MailchimpConfig::default(),
            dispatch: DispatchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for MailchimpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            max_in_flight: default_max_in_flight(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl TomlConfig {
    /// Load configuration for the server: file (or defaults), then
    /// environment overrides, then validation.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Read the config file only. Missing file yields defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: TomlConfig = toml::from_str(&content).map_err(|e| {
            Error::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        Ok(config)
    }

    /// Apply `MAILLISTR_*` environment overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var(API_KEY_ENV) {
            self.api_key = value;
        }
        if let Ok(value) = std::env::var(DATABASE_ENV) {
            self.database_path = PathBuf::from(value);
        }
        if let Ok(value) = std::env::var(BIND_ENV) {
            self.bind = value;
        }
        if let Ok(value) = std::env::var(MAILCHIMP_API_KEY_ENV) {
            self.mailchimp.api_key = value;
        }
    }

    /// Reject configurations the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.mailchimp.enabled && self.mailchimp.api_key.trim().is_empty() {
            return Err(Error::Config(
                "mailchimp.enabled requires mailchimp.api_key".to_string(),
            ));
        }
        if self.mailchimp.timeout_secs == 0 {
            return Err(Error::Config("mailchimp.timeout_secs must be > 0".to_string()));
        }
        if self.dispatch.queue_capacity == 0 {
            return Err(Error::Config("dispatch.queue_capacity must be > 0".to_string()));
        }
        if self.dispatch.max_in_flight == 0 {
            return Err(Error::Config("dispatch.max_in_flight must be > 0".to_string()));
        }
        Ok(())
    }

    /// Write the configuration back to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Resolve which config file to use
///
/// Always returns a path; the file may not exist yet (e.g. before `init`).
pub fn resolve_config_path(cli_arg: Option<&Path>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return PathBuf::from(path);
    }

    // Priority 3: working directory
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return local;
    }

    // Priority 4: user config directory
    if let Some(user) = dirs::config_dir().map(|d| d.join("maillistr").join("config.toml")) {
        if user.exists() {
            return user;
        }
    }

    local
}

/// Generate a random admin API key (hex encoded)
pub fn generate_api_key() -> String {
    let mut bytes = [0u8; API_KEY_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_key_is_30_hex_chars() {
        let key = generate_api_key();
        assert_eq!(key.len(), 30);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generated_keys_differ() {
        assert_ne!(generate_api_key(), generate_api_key());
    }

    #[test]
    fn test_validate_rejects_mailchimp_without_key() {
        let mut config = TomlConfig::default();
        config.mailchimp.enabled = true;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        config.mailchimp.api_key = "abc-us2".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        let mut config = TomlConfig::default();
        config.dispatch.queue_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = TomlConfig::default();
        config.dispatch.max_in_flight = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: TomlConfig = toml::from_str(
            r#"
            api_key = "secret"

            [mailchimp]
            enabled = true
            api_key = "k-us5"
            "#,
        )
        .unwrap();

        assert_eq!(config.api_key, "secret");
        assert_eq!(config.bind, "127.0.0.1:5000");
        assert_eq!(config.database_path, PathBuf::from("maillistr.db"));
        assert!(config.mailchimp.enabled);
        assert_eq!(config.mailchimp.timeout_secs, 10);
        assert_eq!(config.dispatch.queue_capacity, 1024);
        assert_eq!(config.logging.level, "info");
    }
}
