//! Configuration management for the Trademore offline runtime
//!
//! Everything the browser worker used to keep in module-level constants
//! (cache names, manifests, API patterns) lives here and is handed to the
//! controller explicitly.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ConfigError, Result};
use crate::password::PartialPasswordConfig;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Offline cache & sync controller settings
    pub worker: WorkerConfig,

    /// Password rule overrides layered over the default rule set
    #[serde(skip_serializing_if = "PartialPasswordConfig::is_empty")]
    pub password: PartialPasswordConfig,

    /// Replacement word lists for the password checks
    #[serde(skip_serializing_if = "WordListConfig::is_empty")]
    pub wordlists: WordListConfig,

    /// Local store locations
    pub storage: StorageConfig,
}

/// Offline cache & sync controller settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Origin that relative manifest paths resolve against
    pub origin: String,

    /// Client windows whose URL contains this scope belong to the app
    pub scope: String,

    /// Namespace prefix and per-purpose versions
    pub cache: CacheNamesConfig,

    /// Paths pre-cached into the static namespace and served cache-first
    pub static_assets: Vec<String>,

    /// Paths pre-cached into the critical namespace
    pub critical_assets: Vec<String>,

    /// Path regexes served stale-while-revalidate from the API namespace
    pub api_patterns: Vec<String>,

    /// Pre-cached page served to offline navigations
    pub offline_page: String,

    /// Endpoint queued analytics events are replayed to
    pub analytics_endpoint: String,

    /// Move straight to activation once install finishes
    pub skip_waiting_on_install: bool,

    /// Parallel fetches while pre-caching
    pub precache_concurrency: usize,

    /// Header carrying a per-task idempotency key on replay (off when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_header: Option<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:8080".to_string(),
            scope: "http://localhost:8080/".to_string(),
            cache: CacheNamesConfig::default(),
            static_assets: DEFAULT_STATIC_ASSETS.iter().map(|s| s.to_string()).collect(),
            critical_assets: DEFAULT_CRITICAL_ASSETS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            api_patterns: DEFAULT_API_PATTERNS.iter().map(|s| s.to_string()).collect(),
            offline_page: "/offline.html".to_string(),
            analytics_endpoint: "/api/analytics".to_string(),
            skip_waiting_on_install: true,
            precache_concurrency: 6,
            idempotency_header: None,
        }
    }
}

/// Cache namespace naming: `{prefix}-{purpose}-{version}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheNamesConfig {
    pub prefix: String,
    pub static_version: String,
    pub dynamic_version: String,
    pub api_version: String,
    pub critical_version: String,
}

impl Default for CacheNamesConfig {
    fn default() -> Self {
        Self {
            prefix: "trademore".to_string(),
            static_version: "v3".to_string(),
            dynamic_version: "v3".to_string(),
            api_version: "v2".to_string(),
            critical_version: "v1".to_string(),
        }
    }
}

/// Local store locations (defaults under the XDG cache/data dirs)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_path: Option<PathBuf>,
}

/// Word list files; a list without a file stays compiled-in
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WordListConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub common_passwords: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyboard_patterns: Option<PathBuf>,
}

impl WordListConfig {
    pub fn is_empty(&self) -> bool {
        self.common_passwords.is_none() && self.keyboard_patterns.is_none()
    }
}

const DEFAULT_STATIC_ASSETS: &[&str] = &[
    "/",
    "/ar",
    "/offline.html",
    "/offline-enhanced.html",
    "/site.webmanifest",
    "/favicon.ico",
    "/favicon-16x16.png",
    "/favicon-32x32.png",
    "/apple-touch-icon.png",
    "/icon-192x192.png",
    "/icon-512x512.png",
    "/og-image.webp",
    "/critical.css",
    "/products",
    "/products/trading-instruments",
    "/products/payment-methods",
    "/products/platforms",
    "/products/account-types",
    "/get-funded",
    "/education",
    "/partners",
    "/contact",
    "/locales/en/common.json",
    "/locales/ar/common.json",
];

const DEFAULT_CRITICAL_ASSETS: &[&str] = &[
    "/products/trading-instruments",
    "/products/payment-methods",
    "/get-funded",
    "/education",
];

const DEFAULT_API_PATTERNS: &[&str] = &[
    r"/api/financial-data",
    r"/functions/financial-data",
    r"/functions/swap-rates",
];

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".trademore").join("config.yaml"))
    }

    /// Resolve an optional override to a concrete path
    pub fn resolve_path(path: Option<&str>) -> Result<PathBuf> {
        match path {
            Some(p) => Ok(PathBuf::from(p)),
            None => Self::default_path(),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound.into());
        }

        let contents = std::fs::read_to_string(&path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;

        Ok(config)
    }

    /// Load from the given (or default) path, falling back to defaults when
    /// no file exists yet
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        let path = Self::resolve_path(path)?;
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(path)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;

        std::fs::write(&path, contents)?;

        // Set file permissions to 600 on Unix systems
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&path, perms)?;
        }

        Ok(())
    }
}
