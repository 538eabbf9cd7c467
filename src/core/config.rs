//! # Configuration Module
//!
//! Startup configuration for the mock backend: logging, where state is persisted, which
//! live backend unmatched requests go to, the fixtures to seed and any resources to declare
//! explicitly.
//!
//! ## Key Features
//! - YAML/JSON configuration parsing with serde
//! - Environment variable override support (`MOCK_BACKEND_*`)
//! - Validation with detailed error messages, including route template compilation
//! - [`BackendConfig::bootstrap`] turns a validated config into a ready `RouterBuilder`

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use crate::core::error::{MockError, MockResult};
use crate::core::types::Record;
use crate::observability::config::{LogConfig, LogFormat};
use crate::passthrough::{HttpPassthrough, OfflinePassthrough, Passthrough};
use crate::routing::router::RouterBuilder;
use crate::routing::template::RouteTemplate;
use crate::storage::{FileSlot, MemorySlot, PersistenceSlot};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Logging settings
    pub logging: LogConfig,

    /// Where fixtures and collections are persisted
    pub storage: StorageConfig,

    /// Live backend for unmatched requests
    pub passthrough: PassthroughConfig,

    /// Seed datasets, in declaration order
    pub fixtures: Vec<FixtureDefinition>,

    /// Explicitly declared resources, registered before auto-routing
    pub resources: Vec<ResourceDefinition>,

    /// Directory relative fixture paths are resolved against
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

/// Persistence backend selection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Process-local, lost on exit
    #[default]
    Memory,
    /// JSON document on disk
    File { path: PathBuf },
}

/// Live backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PassthroughConfig {
    /// Base URL unmatched requests are forwarded to; offline when absent
    pub base_url: Option<String>,

    /// Timeout for forwarded requests
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for PassthroughConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// One seed dataset: inline records or a JSON file holding an array of records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureDefinition {
    /// Collection name
    pub key: String,

    /// Inline records
    #[serde(default)]
    pub data: Option<Vec<Record>>,

    /// JSON file with the records
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// An explicit resource declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDefinition {
    /// Collection path, e.g. `/users`
    pub collection_path: String,

    /// Item path, defaults to `collection_path + "/{id}"`
    #[serde(default)]
    pub item_path: Option<String>,

    /// Backing collection; anonymous in-memory store when absent
    #[serde(default)]
    pub name: Option<String>,
}

impl BackendConfig {
    /// Load configuration from a YAML file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> MockResult<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| MockError::config(format!("Failed to read config file {}: {}", path.display(), e)))?;

        let mut config: BackendConfig = serde_yaml::from_str(&content)
            .map_err(|e| MockError::config(format!("Failed to parse config: {}", e)))?;
        config.base_dir = path.parent().map(Path::to_path_buf);

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from JSON
    pub async fn load_from_json<P: AsRef<Path>>(path: P) -> MockResult<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| MockError::config(format!("Failed to read config file {}: {}", path.display(), e)))?;

        let mut config: BackendConfig = serde_json::from_str(&content)
            .map_err(|e| MockError::config(format!("Failed to parse JSON config: {}", e)))?;
        config.base_dir = path.parent().map(Path::to_path_buf);

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    ///
    /// Recognised variables:
    /// - `MOCK_BACKEND_LOG_LEVEL`, `MOCK_BACKEND_LOG_FORMAT` (`json` or `text`)
    /// - `MOCK_BACKEND_STORAGE_PATH` switches storage to a file at that path
    /// - `MOCK_BACKEND_PASSTHROUGH_URL`, `MOCK_BACKEND_PASSTHROUGH_TIMEOUT` (e.g. `5s`)
    pub fn apply_env_overrides(&mut self) -> MockResult<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides using `lookup` as the variable source
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> MockResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("MOCK_BACKEND_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Some(format) = lookup("MOCK_BACKEND_LOG_FORMAT") {
            self.logging.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" => LogFormat::Text,
                other => {
                    return Err(MockError::config(format!("Invalid MOCK_BACKEND_LOG_FORMAT: {}", other)))
                }
            };
        }

        if let Some(path) = lookup("MOCK_BACKEND_STORAGE_PATH") {
            self.storage = StorageConfig::File { path: PathBuf::from(path) };
        }

        if let Some(url) = lookup("MOCK_BACKEND_PASSTHROUGH_URL") {
            self.passthrough.base_url = Some(url);
        }

        if let Some(timeout) = lookup("MOCK_BACKEND_PASSTHROUGH_TIMEOUT") {
            self.passthrough.timeout = humantime::parse_duration(&timeout)
                .map_err(|e| MockError::config(format!("Invalid MOCK_BACKEND_PASSTHROUGH_TIMEOUT: {}", e)))?;
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> MockResult<()> {
        if !self.logging.is_valid_level() {
            return Err(MockError::config(format!("Invalid log level: {}", self.logging.level)));
        }

        if let Some(base_url) = &self.passthrough.base_url {
            let url = Url::parse(base_url)
                .map_err(|e| MockError::config(format!("Invalid passthrough base_url '{}': {}", base_url, e)))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(MockError::config(format!(
                    "Passthrough base_url must be http or https: {}",
                    base_url
                )));
            }
        }

        if self.passthrough.timeout.is_zero() {
            return Err(MockError::config("Passthrough timeout must be greater than zero"));
        }

        let mut keys = HashSet::new();
        for fixture in &self.fixtures {
            if fixture.key.is_empty() || fixture.key.contains('/') {
                return Err(MockError::config(format!("Invalid fixture key: '{}'", fixture.key)));
            }
            if !keys.insert(fixture.key.as_str()) {
                return Err(MockError::config(format!("Duplicate fixture key: {}", fixture.key)));
            }
            match (&fixture.data, &fixture.path) {
                (Some(_), None) | (None, Some(_)) => {}
                _ => {
                    return Err(MockError::config(format!(
                        "Fixture '{}' needs exactly one of 'data' or 'path'",
                        fixture.key
                    )))
                }
            }
        }

        for resource in &self.resources {
            if !resource.collection_path.starts_with('/') {
                return Err(MockError::config(format!(
                    "Resource path must start with '/': {}",
                    resource.collection_path
                )));
            }
            RouteTemplate::compile(&resource.collection_path)?;
            if let Some(item_path) = &resource.item_path {
                RouteTemplate::compile(item_path)?;
            }
        }

        Ok(())
    }

    /// Open the configured persistence slot
    pub fn open_storage(&self) -> MockResult<Arc<dyn PersistenceSlot>> {
        Ok(match &self.storage {
            StorageConfig::Memory => Arc::new(MemorySlot::new()),
            StorageConfig::File { path } => Arc::new(FileSlot::open(self.resolve(path))?),
        })
    }

    /// Build the configured passthrough
    pub fn build_passthrough(&self) -> MockResult<Arc<dyn Passthrough>> {
        Ok(match &self.passthrough.base_url {
            Some(base_url) => Arc::new(HttpPassthrough::new(base_url, self.passthrough.timeout)?),
            None => Arc::new(OfflinePassthrough),
        })
    }

    /// Open storage, seed fixtures and declare resources
    ///
    /// The returned builder can take further routes before `build()` runs the auto-router.
    pub async fn bootstrap(&self) -> MockResult<RouterBuilder> {
        let mut builder = RouterBuilder::with_storage(self.open_storage()?).passthrough(self.build_passthrough()?);

        for fixture in &self.fixtures {
            let records = self.fixture_records(fixture).await?;
            builder = builder.fixture(&fixture.key, records)?;
        }

        for resource in &self.resources {
            builder = builder.register_resource(
                &resource.collection_path,
                resource.item_path.as_deref(),
                resource.name.as_deref(),
            )?;
        }

        if self.fixtures.is_empty() && self.resources.is_empty() {
            warn!("No fixtures or resources configured; every request will be passed through");
        }

        info!(
            fixtures = self.fixtures.len(),
            resources = self.resources.len(),
            "Bootstrapped mock backend"
        );

        Ok(builder)
    }

    async fn fixture_records(&self, fixture: &FixtureDefinition) -> MockResult<Vec<Record>> {
        if let Some(data) = &fixture.data {
            return Ok(data.clone());
        }

        let Some(path) = &fixture.path else {
            return Err(MockError::config(format!("Fixture '{}' has no data", fixture.key)));
        };

        let path = self.resolve(path);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| MockError::config(format!("Failed to read fixture file {}: {}", path.display(), e)))?;

        serde_json::from_str(&content).map_err(|e| {
            MockError::config(format!("Fixture file {} is not an array of objects: {}", path.display(), e))
        })
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
logging:
  level: debug
  format: json
storage:
  backend: file
  path: state/backend.json
passthrough:
  base_url: http://api.randomuser.me
  timeout: 5s
fixtures:
  - key: users
    data:
      - id: 1
        gender: male
resources:
  - collection_path: /notes
    name: notes
"#;

    #[test]
    fn test_parse_yaml() {
        let config: BackendConfig = serde_yaml::from_str(SAMPLE).unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(
            config.storage,
            StorageConfig::File { path: PathBuf::from("state/backend.json") }
        );
        assert_eq!(config.passthrough.timeout, Duration::from_secs(5));
        assert_eq!(config.fixtures[0].data.as_ref().unwrap().len(), 1);
        assert_eq!(config.resources[0].name.as_deref(), Some("notes"));
        config.validate().unwrap();
    }

    #[test]
    fn test_defaults() {
        let config: BackendConfig = serde_yaml::from_str("{}").unwrap();

        assert_eq!(config.storage, StorageConfig::Memory);
        assert!(config.passthrough.base_url.is_none());
        assert_eq!(config.passthrough.timeout, Duration::from_secs(30));
        config.validate().unwrap();
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("MOCK_BACKEND_LOG_LEVEL", "warn"),
            ("MOCK_BACKEND_STORAGE_PATH", "/tmp/mock.json"),
            ("MOCK_BACKEND_PASSTHROUGH_URL", "http://localhost:9000"),
            ("MOCK_BACKEND_PASSTHROUGH_TIMEOUT", "250ms"),
        ]
        .into_iter()
        .collect();

        let mut config = BackendConfig::default();
        config
            .apply_overrides_from(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.storage, StorageConfig::File { path: PathBuf::from("/tmp/mock.json") });
        assert_eq!(config.passthrough.base_url.as_deref(), Some("http://localhost:9000"));
        assert_eq!(config.passthrough.timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_override_rejected() {
        let mut config = BackendConfig::default();
        let err = config
            .apply_overrides_from(|key| (key == "MOCK_BACKEND_LOG_FORMAT").then(|| "xml".to_string()))
            .unwrap_err();
        assert!(matches!(err, MockError::Configuration { .. }));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = BackendConfig::default();
        config.fixtures = vec![
            FixtureDefinition { key: "users".into(), data: Some(Vec::new()), path: None },
            FixtureDefinition { key: "users".into(), data: Some(Vec::new()), path: None },
        ];
        assert!(config.validate().unwrap_err().to_string().contains("Duplicate"));

        let mut config = BackendConfig::default();
        config.fixtures = vec![FixtureDefinition { key: "users".into(), data: None, path: None }];
        assert!(config.validate().is_err());

        let mut config = BackendConfig::default();
        config.passthrough.base_url = Some("ftp://example.com".into());
        assert!(config.validate().is_err());

        let mut config = BackendConfig::default();
        config.resources = vec![ResourceDefinition {
            collection_path: "/a".into(),
            item_path: Some("/a/{x}{y}".into()),
            name: None,
        }];
        assert!(matches!(config.validate().unwrap_err(), MockError::Template { .. }));
    }

    #[test]
    fn test_relative_paths_resolve_against_config_dir() {
        let config = BackendConfig {
            base_dir: Some(PathBuf::from("/etc/mock")),
            ..Default::default()
        };

        assert_eq!(config.resolve(Path::new("users.json")), PathBuf::from("/etc/mock/users.json"));
        assert_eq!(config.resolve(Path::new("/abs/users.json")), PathBuf::from("/abs/users.json"));
    }
}
