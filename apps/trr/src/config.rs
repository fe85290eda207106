//! # Configuration
//!
//! Optional TOML file (`trr.toml` by default) with three sections:
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//!
//! [storage]
//! backend = "redb"      # or "memory"
//! path = "trr.redb"
//!
//! [assist]
//! endpoint = "http://localhost:9090/suggest"   # absent disables assist
//! timeout_ms = 2000
//! api_key = "..."
//! ```
//!
//! Every key is optional. CLI flags override file values.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use trr_core::{StorageBackend, TrrError};

/// Default assist timeout in milliseconds.
pub const DEFAULT_ASSIST_TIMEOUT_MS: u64 = 2_000;

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// SECTIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Which repository implementation backs the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Volatile, lost on exit.
    Memory,
    /// ACID database file.
    #[default]
    Redb,
}

impl StorageKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Redb => "redb",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageKind,
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageKind::Redb,
            path: PathBuf::from("trr.redb"),
        }
    }
}

impl StorageConfig {
    /// Open the configured backend.
    pub fn open(&self) -> Result<StorageBackend, TrrError> {
        match self.backend {
            StorageKind::Memory => Ok(StorageBackend::default()),
            StorageKind::Redb => StorageBackend::redb(&self.path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistConfig {
    pub endpoint: Option<String>,
    pub timeout_ms: u64,
    pub api_key: Option<String>,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_ms: DEFAULT_ASSIST_TIMEOUT_MS,
            api_key: None,
        }
    }
}

// =============================================================================
// ROOT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub assist: AssistConfig,
}

impl AppConfig {
    /// Parse a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, TrrError> {
        toml::from_str(text).map_err(|e| TrrError::Serialization(format!("Config: {}", e)))
    }

    /// Load `path`, or defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, TrrError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let metadata = std::fs::metadata(path)
            .map_err(|e| TrrError::Storage(format!("Cannot read config metadata: {}", e)))?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(TrrError::Serialization(format!(
                "Config file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let text = std::fs::read_to_string(path)
            .map_err(|e| TrrError::Storage(format!("Read config: {}", e)))?;
        let config = Self::from_toml(&text)?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Apply storage overrides from the command line.
    #[must_use]
    pub fn with_storage_overrides(
        mut self,
        backend: Option<StorageKind>,
        path: Option<PathBuf>,
    ) -> Self {
        if let Some(backend) = backend {
            self.storage.backend = backend;
        }
        if let Some(path) = path {
            self.storage.path = path;
        }
        self
    }
}

// =============================================================================
// TESTS
// =============================================================================
