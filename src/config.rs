//! Service configuration
//!
//! Loaded from an optional YAML file (path in `OFFICE_CONFIG`), then
//! overridden by environment variables. `.env` files are picked up by
//! [`OfficeConfig::load`].

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OfficeConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub agent: AgentConfig,
    pub learning: LearningConfig,
    pub disk: DiskConfig,
    pub printer: PrinterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Which command store backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub database_url: String,
    pub max_connections: u32,
    pub connection_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            database_url: "postgresql://localhost:5432/site_office".to_string(),
            max_connections: 10,
            connection_timeout_secs: 30,
        }
    }
}

impl StoreConfig {
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub enabled: bool,
    pub poll_interval_secs: u64,
    pub batch_size: usize,
    pub output_dir: PathBuf,
    /// Index every generated document as a learning example
    pub learn_from_generated: bool,
    /// Upload generated documents under this disk folder when the disk is configured
    pub disk_upload_dir: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: 5,
            batch_size: 10,
            output_dir: PathBuf::from("generated"),
            learn_from_generated: false,
            disk_upload_dir: None,
        }
    }
}

impl AgentConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    pub examples_dir: PathBuf,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            examples_dir: PathBuf::from("learning_examples"),
        }
    }
}

pub const YANDEX_DISK_API_BASE: &str = "https://cloud-api.yandex.net/v1/disk";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskConfig {
    pub token: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: YANDEX_DISK_API_BASE.to_string(),
            timeout_secs: 30,
        }
    }
}

impl DiskConfig {
    pub fn is_configured(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterConfig {
    /// Print program; `None` disables printing
    pub command: Option<String>,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            command: Some("lp".to_string()),
        }
    }
}

impl OfficeConfig {
    /// Load `.env`, the YAML file named by `OFFICE_CONFIG` (if any), then
    /// apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut config = match std::env::var("OFFICE_CONFIG") {
            Ok(path) => Self::load_from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load from a YAML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::load_from_str(&content)
    }

    /// Load from a YAML string
    pub fn load_from_str(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply overrides from an environment lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.store.database_url = url;
        }
        if let Some(size) = lookup("DATABASE_POOL_SIZE") {
            self.store.max_connections = parse_value("DATABASE_POOL_SIZE", &size)?;
        }
        if let Some(backend) = lookup("OFFICE_STORE") {
            self.store.backend = match backend.trim().to_lowercase().as_str() {
                "memory" => StoreBackend::Memory,
                "postgres" | "postgresql" => StoreBackend::Postgres,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "OFFICE_STORE".to_string(),
                        value: backend,
                    })
                }
            };
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = parse_value("PORT", &port)?;
        }
        if let Some(dir) = lookup("OFFICE_OUTPUT_DIR") {
            self.agent.output_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("OFFICE_LEARNING_DIR") {
            self.learning.examples_dir = PathBuf::from(dir);
        }
        if let Some(secs) = lookup("AGENT_POLL_INTERVAL_SECS") {
            self.agent.poll_interval_secs = parse_value("AGENT_POLL_INTERVAL_SECS", &secs)?;
        }
        if let Some(size) = lookup("AGENT_BATCH_SIZE") {
            self.agent.batch_size = parse_value("AGENT_BATCH_SIZE", &size)?;
        }
        if let Some(token) = lookup("YANDEX_DISK_TOKEN") {
            self.disk.token = Some(token);
        }
        if let Some(url) = lookup("YANDEX_DISK_BASE_URL") {
            self.disk.base_url = url;
        }
        if let Some(dir) = lookup("YANDEX_DISK_UPLOAD_DIR") {
            self.agent.disk_upload_dir = Some(dir);
        }
        if let Some(command) = lookup("OFFICE_PRINT_COMMAND") {
            self.printer.command = match command.trim() {
                "" | "none" | "off" => None,
                other => Some(other.to_string()),
            };
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Hide the password part of a database URL for logging
pub fn mask_database_url(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url) {
        let mut masked = parsed.clone();
        if parsed.password().is_some() {
            let _ = masked.set_password(Some("***"));
        }
        masked.to_string()
    } else if url.chars().count() > 20 {
        let chars: Vec<char> = url.chars().collect();
        let head: String = chars[..10].iter().collect();
        let tail: String = chars[chars.len() - 10..].iter().collect();
        format!("{}***{}", head, tail)
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE_CONFIG: &str = r#"
server:
  port: 9000
store:
  backend: postgres
  database_url: "postgresql://office:secret@db:5432/office"
agent:
  poll_interval_secs: 2
  output_dir: "/var/office/out"
disk:
  token: "abc"
printer:
  command: null
"#;

    #[test]
    fn test_load_from_str() {
        let config = OfficeConfig::load_from_str(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.store.backend, StoreBackend::Postgres);
        assert_eq!(config.agent.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.agent.batch_size, 10);
        assert!(config.disk.is_configured());
        assert_eq!(config.disk.base_url, YANDEX_DISK_API_BASE);
        assert!(config.printer.command.is_none());
    }

    #[test]
    fn test_example_file() {
        let config =
            OfficeConfig::load_from_str(include_str!("../config/office.example.yaml")).unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert!(config.agent.disk_upload_dir.is_none());
        assert!(!config.disk.is_configured());
    }

    #[test]
    fn test_defaults() {
        let config = OfficeConfig::default();
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert!(!config.disk.is_configured());
        assert_eq!(config.printer.command.as_deref(), Some("lp"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("OFFICE_STORE", "postgresql"),
            ("PORT", "8080"),
            ("AGENT_BATCH_SIZE", "3"),
            ("YANDEX_DISK_TOKEN", "token"),
            ("OFFICE_PRINT_COMMAND", "off"),
        ]
        .into_iter()
        .collect();

        let mut config = OfficeConfig::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.store.backend, StoreBackend::Postgres);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.agent.batch_size, 3);
        assert_eq!(config.disk.token.as_deref(), Some("token"));
        assert!(config.printer.command.is_none());
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = OfficeConfig::default();
        let err = config
            .apply_env(|key| (key == "PORT").then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "PORT"));
    }

    #[test]
    fn test_mask_database_url() {
        let masked = mask_database_url("postgresql://office:secret@db:5432/office");
        assert!(!masked.contains("secret"));
        assert!(masked.contains("***"));
        assert_eq!(mask_database_url("short"), "***");
    }
}
