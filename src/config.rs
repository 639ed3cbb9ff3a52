//! Configuration loading for Courier.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::core::IngestConfig;
use crate::error::Error;
use crate::queue::DEFAULT_INTAKE;

pub type Result<T> = std::result::Result<T, Error>;

/// Get the Courier home directory (~/.courier).
pub fn get_home_dir() -> Result<PathBuf> {
    let home = directories::UserDirs::new()
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

    Ok(home.home_dir().join(".courier"))
}

/// Get the settings file path.
pub fn get_settings_path() -> Result<PathBuf> {
    Ok(get_home_dir()?.join("settings.json"))
}

/// Load settings from ~/.courier/settings.json, falling back to defaults
/// when the file does not exist.
pub fn load_settings() -> Result<Settings> {
    let path = get_settings_path()?;

    if !path.exists() {
        tracing::debug!("No settings at {}, using defaults", path.display());
        let settings = Settings::default();
        validate_settings(&settings)?;
        return Ok(settings);
    }

    let content = std::fs::read_to_string(&path)?;
    let settings = parse_settings(&content)?;

    tracing::debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

/// Parse and validate a settings document.
pub fn parse_settings(content: &str) -> Result<Settings> {
    let settings: Settings = serde_json::from_str(content)?;
    validate_settings(&settings)?;
    Ok(settings)
}

fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.server.port == 0 {
        return Err(Error::Config("server.port must be non-zero".to_string()));
    }
    if settings.queue.intake.is_empty() {
        return Err(Error::Config("queue.intake must not be empty".to_string()));
    }
    if settings.queue.poll_interval_ms == 0 {
        return Err(Error::Config(
            "queue.poll_interval_ms must be greater than zero".to_string(),
        ));
    }
    if settings.store.busy_timeout_ms == 0 {
        return Err(Error::Config(
            "store.busy_timeout_ms must be greater than zero".to_string(),
        ));
    }
    if let Some(filter) = &settings.logging.filter {
        tracing_subscriber::EnvFilter::try_new(filter)
            .map_err(|e| Error::Config(format!("logging.filter '{}': {}", filter, e)))?;
    }
    Ok(())
}

/// HTTP server configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Message store configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file. Defaults to ~/.courier/messages.db.
    pub path: Option<PathBuf>,
    /// How long a write waits on a locked database before it fails.
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: 5000,
        }
    }
}

/// Queue configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct QueueConfig {
    /// Queue root directory. Defaults to ~/.courier/queue.
    pub dir: Option<PathBuf>,
    /// Intake list name.
    pub intake: String,
    /// Idle wait after an empty poll.
    pub poll_interval_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            dir: None,
            intake: DEFAULT_INTAKE.to_string(),
            poll_interval_ms: 1000,
        }
    }
}

/// Logging configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub filter: Option<String>,
    /// Directory for the rolling log files. Defaults to the platform data dir.
    pub dir: Option<PathBuf>,
}

/// Main settings structure.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub queue: QueueConfig,
    pub logging: LoggingConfig,
}

impl Settings {
    pub fn store_path(&self) -> Result<PathBuf> {
        match &self.store.path {
            Some(path) => Ok(path.clone()),
            None => Ok(get_home_dir()?.join("messages.db")),
        }
    }

    pub fn queue_dir(&self) -> Result<PathBuf> {
        match &self.queue.dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(get_home_dir()?.join("queue")),
        }
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.store.busy_timeout_ms)
    }

    pub fn ingest_config(&self) -> IngestConfig {
        IngestConfig {
            intake: self.queue.intake.clone(),
            poll_interval: Duration::from_millis(self.queue.poll_interval_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = parse_settings("{}").unwrap();

        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.queue.intake, "incoming");

        let ingest = settings.ingest_config();
        assert_eq!(ingest.poll_interval, Duration::from_secs(1));
        assert_eq!(settings.busy_timeout(), Duration::from_secs(5));
        assert!(settings.logging.filter.is_none());
    }

    #[test]
    fn test_partial_override() {
        let settings = parse_settings(
            r#"{
                "server": { "port": 9090 },
                "store": { "path": "/tmp/m.db", "busy_timeout_ms": 250 },
                "logging": { "filter": "warn,courier=info", "dir": "/var/log/courier" }
            }"#,
        )
        .unwrap();

        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.store_path().unwrap(), PathBuf::from("/tmp/m.db"));
        assert_eq!(settings.busy_timeout(), Duration::from_millis(250));
        assert_eq!(settings.logging.filter.as_deref(), Some("warn,courier=info"));
        assert_eq!(settings.logging.dir, Some(PathBuf::from("/var/log/courier")));
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            parse_settings(r#"{"queue": {"intake": ""}}"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            parse_settings(r#"{"queue": {"poll_interval_ms": 0}}"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            parse_settings(r#"{"server": {"port": 0}}"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            parse_settings(r#"{"store": {"busy_timeout_ms": 0}}"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            parse_settings(r#"{"logging": {"filter": "courier=loud"}}"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(parse_settings("not json"), Err(Error::Json(_))));
    }
}
