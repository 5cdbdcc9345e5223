//! Layered configuration for taskboard.
//!
//! Values are resolved in order, later layers winning:
//! built-in defaults → `taskboard.toml` → environment (`TASKBOARD_*`, with
//! a `.env` file loaded first) → command-line flags.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 4000
//! cors = true
//!
//! [storage]
//! db_path = ".taskboard/boards.db"
//!
//! [client]
//! base_url = "http://localhost:4000"
//!
//! [logging]
//! level = "info"
//! json = false
//! dir = ".taskboard/logs"
//! ```

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "taskboard.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Send permissive CORS headers
    #[serde(default = "default_cors")]
    pub cors: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    4000
}

fn default_cors() -> bool {
    true
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors: default_cors(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSection {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from(".taskboard/boards.db")
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSection {
    /// Where the sync client sends its requests
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    "http://localhost:4000".to_string()
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
    /// Directory for daily-rolling log files; stderr only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
            dir: None,
        }
    }
}

/// The complete taskboard.toml structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskboardConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub client: ClientSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl TaskboardConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse taskboard.toml")
    }

    /// Load `path` if given (it must exist), else `taskboard.toml` in the
    /// working directory if present, else defaults. Environment overrides
    /// are applied on top.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None if Path::new(CONFIG_FILE).exists() => Self::load(Path::new(CONFIG_FILE))?,
            None => Self::default(),
        };
        // A missing .env is fine
        let _ = dotenvy::dotenv();
        config.apply_env_from(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `TASKBOARD_*` overrides using `lookup` to read variables.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("TASKBOARD_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("TASKBOARD_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("TASKBOARD_PORT is not a port number: {}", port))?;
        }
        if let Some(cors) = lookup("TASKBOARD_CORS") {
            self.server.cors = parse_bool("TASKBOARD_CORS", &cors)?;
        }
        if let Some(db_path) = lookup("TASKBOARD_DB_PATH") {
            self.storage.db_path = PathBuf::from(db_path);
        }
        if let Some(url) = lookup("TASKBOARD_URL") {
            self.client.base_url = url;
        }
        if let Some(level) = lookup("TASKBOARD_LOG") {
            self.logging.level = level;
        }
        if let Some(json) = lookup("TASKBOARD_LOG_JSON") {
            self.logging.json = parse_bool("TASKBOARD_LOG_JSON", &json)?;
        }
        if let Some(dir) = lookup("TASKBOARD_LOG_DIR") {
            self.logging.dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    /// Validate configuration and return warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.server.port == 0 {
            warnings.push("server.port is 0; the OS will pick a random port".to_string());
        }
        if !self.client.base_url.starts_with("http://")
            && !self.client.base_url.starts_with("https://")
        {
            warnings.push(format!(
                "client.base_url '{}' has no http:// or https:// scheme",
                self.client.base_url
            ));
        }
        warnings
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value {
        "1" | "true" | "TRUE" | "yes" | "YES" => Ok(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Ok(false),
        other => bail!("{} must be true or false, got '{}'", key, other),
    }
}
