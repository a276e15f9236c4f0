//! Pre-cache manifest and URL classification inputs

use regex::RegexSet;
use reqwest::Url;

use crate::config::WorkerConfig;
use crate::error::ConfigError;

/// Compiled form of the manifest section of [`WorkerConfig`].
#[derive(Debug, Clone)]
pub struct Manifest {
    origin: Url,
    scope: String,
    static_assets: Vec<String>,
    critical_assets: Vec<String>,
    api_patterns: RegexSet,
    offline_page: String,
    analytics_endpoint: String,
}

impl Manifest {
    pub fn from_config(config: &WorkerConfig) -> Result<Self, ConfigError> {
        let origin = Url::parse(&config.origin)
            .map_err(|e| ConfigError::Invalid(format!("origin {:?}: {}", config.origin, e)))?;

        let api_patterns = RegexSet::new(&config.api_patterns)
            .map_err(|e| ConfigError::Invalid(format!("API pattern: {}", e)))?;

        Ok(Self {
            origin,
            scope: config.scope.clone(),
            static_assets: config.static_assets.clone(),
            critical_assets: config.critical_assets.clone(),
            api_patterns,
            offline_page: config.offline_page.clone(),
            analytics_endpoint: config.analytics_endpoint.clone(),
        })
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn static_assets(&self) -> &[String] {
        &self.static_assets
    }

    pub fn critical_assets(&self) -> &[String] {
        &self.critical_assets
    }

    /// Resolve a manifest path (or absolute URL) against the origin.
    pub fn resolve(&self, path: &str) -> Option<Url> {
        self.origin.join(path).ok()
    }

    pub fn offline_page(&self) -> Option<Url> {
        self.resolve(&self.offline_page)
    }

    pub fn analytics_endpoint(&self) -> Option<Url> {
        self.resolve(&self.analytics_endpoint)
    }

    /// URL path matches one of the API patterns.
    pub fn is_api(&self, url: &Url) -> bool {
        self.api_patterns.is_match(url.path())
    }

    /// URL equals a manifest entry, either as the full URL or by path.
    pub fn is_static(&self, url: &Url) -> bool {
        let full = url.as_str();
        let path = url.path();
        self.static_assets
            .iter()
            .any(|asset| asset == full || asset == path)
    }
}
