//! Directory configuration
//!
//! A JSON file describing one flex directory:
//!
//! ```json
//! {
//!   "directory_type": "accounts",
//!   "storage_path": "./data/accounts",
//!   "indexed_fields": ["email"],
//!   "key_field": "email",
//!   "cache": { "enabled": true, "backend": "file" },
//!   "log_level": "warn"
//! }
//! ```
//!
//! Everything but `directory_type` and `storage_path` has a default.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::{CacheBackend, FileCache, MemoryCache};
use crate::entry::{STORAGE_KEY, STORAGE_TIMESTAMP};
use crate::flex::FlexDirectory;
use crate::index::{IndexFile, INDEX_DIR};
use crate::observability::{LogObserver, Logger, Observer, Severity};
use crate::store::FolderStore;

/// Default cache directory name under the index directory
pub const CACHE_DIR: &str = "cache";

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config JSON in {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Io { .. } => "FLEX_CONFIG_IO",
            ConfigError::Parse { .. } => "FLEX_CONFIG_PARSE",
            ConfigError::Invalid(_) => "FLEX_CONFIG_INVALID",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub backend: CacheBackendKind,

    /// File backend directory (default `<storage>/.flex/cache`)
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            backend: CacheBackendKind::default(),
            path: None,
        }
    }
}

fn default_cache_enabled() -> bool {
    true
}

fn default_log_level() -> Severity {
    Severity::Warn
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlexConfig {
    /// Object type name, used in cache keys and flex keys
    pub directory_type: String,

    /// Folder holding one JSON file per object
    pub storage_path: PathBuf,

    /// Index file (default `<storage>/.flex/index.json`)
    #[serde(default)]
    pub index_path: Option<PathBuf>,

    /// Row fields copied into index entries
    #[serde(default)]
    pub indexed_fields: Vec<String>,

    /// Key field of the default view (`storage_key` when unset)
    #[serde(default)]
    pub key_field: Option<String>,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default = "default_log_level")]
    pub log_level: Severity,
}

impl FlexConfig {
    /// Minimal configuration with every default applied.
    pub fn new(directory_type: impl Into<String>, storage_path: impl Into<PathBuf>) -> Self {
        Self {
            directory_type: directory_type.into(),
            storage_path: storage_path.into(),
            index_path: None,
            indexed_fields: Vec::new(),
            key_field: None,
            cache: CacheConfig::default(),
            log_level: default_log_level(),
        }
    }

    /// Load and validate configuration from a JSON file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> ConfigResult<Self> {
        let config: FlexConfig = serde_json::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let type_ok = !self.directory_type.is_empty()
            && self
                .directory_type
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'));
        if !type_ok {
            return Err(ConfigError::Invalid(format!(
                "directory_type '{}' must be non-empty and use only [A-Za-z0-9_-]",
                self.directory_type
            )));
        }

        if self.storage_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("storage_path must not be empty".into()));
        }

        for field in &self.indexed_fields {
            if field.is_empty() {
                return Err(ConfigError::Invalid("indexed_fields must not contain empty names".into()));
            }
            if field == STORAGE_KEY || field == STORAGE_TIMESTAMP {
                return Err(ConfigError::Invalid(format!(
                    "'{}' is always indexed and cannot be listed in indexed_fields",
                    field
                )));
            }
        }

        if let Some(key_field) = &self.key_field {
            if key_field.is_empty() {
                return Err(ConfigError::Invalid("key_field must not be empty".into()));
            }
        }

        Ok(())
    }

    pub fn index_path(&self) -> PathBuf {
        match &self.index_path {
            Some(path) => path.clone(),
            None => IndexFile::for_storage(&self.storage_path).path().to_path_buf(),
        }
    }

    pub fn cache_path(&self) -> PathBuf {
        match &self.cache.path {
            Some(path) => path.clone(),
            None => self.storage_path.join(INDEX_DIR).join(CACHE_DIR),
        }
    }

    pub fn logger(&self) -> Logger {
        Logger::new(self.log_level)
    }

    fn cache_backend(&self) -> Option<Box<dyn CacheBackend>> {
        if !self.cache.enabled {
            return None;
        }
        Some(match self.cache.backend {
            CacheBackendKind::Memory => Box::new(MemoryCache::new()),
            CacheBackendKind::File => Box::new(FileCache::new(self.cache_path())),
        })
    }

    /// Builds the folder-backed directory this configuration describes.
    pub fn build_directory(&self) -> Arc<FlexDirectory> {
        let observer: Arc<dyn Observer> = Arc::new(LogObserver::new(self.logger()));
        let builder = FlexDirectory::builder(
            self.directory_type.clone(),
            FolderStore::new(&self.storage_path),
            IndexFile::new(self.index_path()),
        )
        .observer(observer)
        .boxed_cache(self.cache_backend())
        .indexed_fields(self.indexed_fields.clone());

        let builder = match &self.key_field {
            Some(field) => builder.key_field(field.clone()),
            None => builder,
        };
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(json: &str) -> ConfigResult<FlexConfig> {
        FlexConfig::parse(json, Path::new("flex.json"))
    }

    #[test]
    fn test_defaults() {
        let config = parse(r#"{"directory_type": "pages", "storage_path": "/data/pages"}"#).unwrap();

        assert_eq!(config, FlexConfig::new("pages", "/data/pages"));
        assert!(config.cache.enabled);
        assert_eq!(config.cache.backend, CacheBackendKind::Memory);
        assert_eq!(config.log_level, Severity::Warn);
        assert_eq!(config.index_path(), PathBuf::from("/data/pages/.flex/index.json"));
        assert_eq!(config.cache_path(), PathBuf::from("/data/pages/.flex/cache"));
    }

    #[test]
    fn test_full_config() {
        let config = parse(
            r#"{
                "directory_type": "accounts",
                "storage_path": "/data/accounts",
                "index_path": "/var/index.json",
                "indexed_fields": ["email"],
                "key_field": "email",
                "cache": {"enabled": false, "backend": "file", "path": "/tmp/c"},
                "log_level": "trace"
            }"#,
        )
        .unwrap();

        assert_eq!(config.index_path(), PathBuf::from("/var/index.json"));
        assert_eq!(config.cache_path(), PathBuf::from("/tmp/c"));
        assert_eq!(config.key_field.as_deref(), Some("email"));
        assert!(config.cache_backend().is_none());
        assert_eq!(config.logger().min_severity(), Severity::Trace);
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            parse(r#"{"directory_type": "bad type", "storage_path": "x"}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            parse(r#"{"directory_type": "ok", "storage_path": ""}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            parse(r#"{"directory_type": "ok", "storage_path": "x", "indexed_fields": ["storage_key"]}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            parse(r#"{"directory_type": "ok"}"#),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = FlexConfig::load(&temp.path().join("nope.json")).unwrap_err();
        assert_eq!(err.code(), "FLEX_CONFIG_IO");
    }

    #[test]
    fn test_build_directory() {
        let temp = TempDir::new().unwrap();
        let mut config = FlexConfig::new("notes", temp.path());
        config.cache.backend = CacheBackendKind::File;

        let directory = config.build_directory();
        assert_eq!(directory.directory_type(), "notes");
        assert!(directory.cache().is_some());
        assert_eq!(directory.index_file().path(), config.index_path());
        assert!(directory.index().unwrap().is_empty());
    }
}
