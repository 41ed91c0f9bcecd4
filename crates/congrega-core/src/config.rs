//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/congrega/config.toml)
//! 3. Environment variables (CONGREGA_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::listing::DEFAULT_PAGE_SIZE;
use crate::session::AccessPolicy;
use crate::validate::DEFAULT_MAX_IMAGE_BYTES;
use crate::welcome::DEFAULT_WELCOME_MODEL;

/// Environment variable prefix
const ENV_PREFIX: &str = "CONGREGA";

/// Which document store backs the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Data file in `data_dir`, shared admin password
    #[default]
    Local,
    /// Document server at `remote_url`
    Remote,
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Backend::Local),
            "remote" => Ok(Backend::Remote),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Local => f.write_str("local"),
            Backend::Remote => f.write_str("remote"),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for the local data file
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub backend: Backend,

    /// Document server URL (remote backend)
    #[serde(default)]
    pub remote_url: Option<String>,

    /// Who may add events and prayer requests
    #[serde(default)]
    pub access_policy: AccessPolicy,

    /// Shared administrator password (local backend)
    #[serde(default)]
    pub admin_password: Option<String>,

    /// API key for generated welcome messages
    #[serde(default)]
    pub welcome_api_key: Option<String>,

    #[serde(default = "default_welcome_model")]
    pub welcome_model: String,

    /// Largest accepted event image, in decoded bytes
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,

    /// Items per page in list views
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Write logs here instead of stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backend: Backend::Local,
            remote_url: None,
            access_policy: AccessPolicy::Open,
            admin_password: None,
            welcome_api_key: None,
            welcome_model: default_welcome_model(),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            page_size: DEFAULT_PAGE_SIZE,
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (CONGREGA_DATA_DIR, CONGREGA_BACKEND, ...)
    /// 2. Config file (~/.config/congrega/config.toml or CONGREGA_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring an explicit file from the command line
    pub fn load_with_cli_override(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(format!("{}_BACKEND", ENV_PREFIX)) {
            match val.parse() {
                Ok(backend) => self.backend = backend,
                Err(e) => warn!("Ignoring {}_BACKEND: {}", ENV_PREFIX, e),
            }
        }

        if let Ok(val) = std::env::var(format!("{}_REMOTE_URL", ENV_PREFIX)) {
            self.remote_url = non_empty(val);
        }

        if let Ok(val) = std::env::var(format!("{}_ACCESS_POLICY", ENV_PREFIX)) {
            match val.parse() {
                Ok(policy) => self.access_policy = policy,
                Err(e) => warn!("Ignoring {}_ACCESS_POLICY: {}", ENV_PREFIX, e),
            }
        }

        if let Ok(val) = std::env::var(format!("{}_ADMIN_PASSWORD", ENV_PREFIX)) {
            self.admin_password = non_empty(val);
        }

        if let Ok(val) = std::env::var(format!("{}_WELCOME_API_KEY", ENV_PREFIX)) {
            self.welcome_api_key = non_empty(val);
        }

        if let Ok(val) = std::env::var(format!("{}_LOG_FILE", ENV_PREFIX)) {
            self.log_file = non_empty(val).map(PathBuf::from);
        }
    }

    /// Reject combinations that cannot start a session
    fn validate(&self) -> Result<()> {
        if self.backend == Backend::Remote && self.remote_url.is_none() {
            anyhow::bail!(
                "backend = \"remote\" requires remote_url (or {}_REMOTE_URL)",
                ENV_PREFIX
            );
        }
        if self.page_size == 0 {
            anyhow::bail!("page_size must be at least 1");
        }
        Ok(())
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with CONGREGA_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("congrega")
            .join("config.toml")
    }

    /// Get the path to the local data file
    pub fn local_store_path(&self) -> PathBuf {
        self.data_dir.join("congrega.json")
    }
}

fn non_empty(val: String) -> Option<String> {
    if val.is_empty() {
        None
    } else {
        Some(val)
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("congrega")
}

fn default_welcome_model() -> String {
    DEFAULT_WELCOME_MODEL.to_string()
}

fn default_max_image_bytes() -> usize {
    DEFAULT_MAX_IMAGE_BYTES
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "CONGREGA_CONFIG",
        "CONGREGA_DATA_DIR",
        "CONGREGA_BACKEND",
        "CONGREGA_REMOTE_URL",
        "CONGREGA_ACCESS_POLICY",
        "CONGREGA_ADMIN_PASSWORD",
        "CONGREGA_WELCOME_API_KEY",
        "CONGREGA_LOG_FILE",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.backend, Backend::Local);
        assert_eq!(config.access_policy, AccessPolicy::Open);
        assert!(config.remote_url.is_none());
        assert!(config.admin_password.is_none());
        assert_eq!(config.welcome_model, "gemini-2.5-flash");
        assert_eq!(config.max_image_bytes, 1024 * 1024);
        assert_eq!(config.page_size, 10);
        assert!(config.data_dir.ends_with("congrega"));
    }

    #[test]
    fn test_local_store_path() {
        let config = Config::default();
        assert!(config.local_store_path().ends_with("congrega.json"));
    }

    #[test]
    fn test_env_override_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("CONGREGA_DATA_DIR", "/tmp/congrega-test");
        config.apply_env_overrides();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/congrega-test"));
    }

    #[test]
    fn test_env_override_backend_and_policy() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("CONGREGA_BACKEND", "remote");
        env::set_var("CONGREGA_ACCESS_POLICY", "STRICT");
        config.apply_env_overrides();
        assert_eq!(config.backend, Backend::Remote);
        assert_eq!(config.access_policy, AccessPolicy::Strict);

        // Unknown values are ignored
        env::set_var("CONGREGA_BACKEND", "cloud");
        env::set_var("CONGREGA_ACCESS_POLICY", "lenient");
        config.apply_env_overrides();
        assert_eq!(config.backend, Backend::Remote);
        assert_eq!(config.access_policy, AccessPolicy::Strict);
    }

    #[test]
    fn test_env_override_secrets() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("CONGREGA_ADMIN_PASSWORD", "igreja2024");
        env::set_var("CONGREGA_WELCOME_API_KEY", "key-123");
        config.apply_env_overrides();
        assert_eq!(config.admin_password.as_deref(), Some("igreja2024"));
        assert_eq!(config.welcome_api_key.as_deref(), Some("key-123"));

        // Empty string clears it
        env::set_var("CONGREGA_WELCOME_API_KEY", "");
        config.apply_env_overrides();
        assert!(config.welcome_api_key.is_none());
    }

    #[test]
    fn test_remote_backend_requires_url() {
        let _guard = EnvGuard::new(ENV_VARS);

        let err = Config::load_from_str(r#"backend = "remote""#).unwrap_err();
        assert!(err.to_string().contains("remote_url"));

        let config = Config::load_from_str(
            r#"
            backend = "remote"
            remote_url = "wss://igreja.example.com/store"
        "#,
        )
        .unwrap();
        assert_eq!(config.backend, Backend::Remote);
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            access_policy = "strict"
            admin_password = "segredo"
            page_size = 25
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.access_policy, AccessPolicy::Strict);
        assert_eq!(config.admin_password.as_deref(), Some("segredo"));
        assert_eq!(config.page_size, 25);
        assert_eq!(config.max_image_bytes, DEFAULT_MAX_IMAGE_BYTES);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let config = Config {
            data_dir: temp_dir.path().join("data"),
            backend: Backend::Remote,
            remote_url: Some("ws://localhost:3030".to_string()),
            welcome_model: "gemini-2.0-flash".to_string(),
            ..Config::default()
        };
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_with_cli_override(Some(&path)).unwrap();
        assert_eq!(loaded.backend, Backend::Remote);
        assert_eq!(loaded.remote_url, config.remote_url);
        assert_eq!(loaded.welcome_model, "gemini-2.0-flash");
        assert!(loaded.data_dir.exists());
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        env::set_var("CONGREGA_DATA_DIR", temp_dir.path().join("data"));

        let path = temp_dir.path().join("missing.toml");
        let config = Config::load_from_path(&path).unwrap();
        // Should return defaults when file doesn't exist
        assert_eq!(config.backend, Backend::Local);
        assert!(config.remote_url.is_none());
    }
}
