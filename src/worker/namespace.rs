//! Versioned cache namespaces

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::CacheNamesConfig;

/// What a namespace holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CachePurpose {
    Static,
    Dynamic,
    Api,
    Critical,
}

impl CachePurpose {
    pub const ALL: [CachePurpose; 4] = [
        CachePurpose::Static,
        CachePurpose::Dynamic,
        CachePurpose::Api,
        CachePurpose::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CachePurpose::Static => "static",
            CachePurpose::Dynamic => "dynamic",
            CachePurpose::Api => "api",
            CachePurpose::Critical => "critical",
        }
    }
}

impl fmt::Display for CachePurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The current namespace name for each purpose.
///
/// Exactly one name per purpose is current; any other namespace found in the
/// store belongs to an older deployment and is deleted on activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNamespaces {
    static_name: String,
    dynamic_name: String,
    api_name: String,
    critical_name: String,
}

impl CacheNamespaces {
    pub fn from_config(config: &CacheNamesConfig) -> Self {
        let name = |purpose: CachePurpose, version: &str| {
            format!("{}-{}-{}", config.prefix, purpose, version)
        };
        Self {
            static_name: name(CachePurpose::Static, &config.static_version),
            dynamic_name: name(CachePurpose::Dynamic, &config.dynamic_version),
            api_name: name(CachePurpose::Api, &config.api_version),
            critical_name: name(CachePurpose::Critical, &config.critical_version),
        }
    }

    pub fn name(&self, purpose: CachePurpose) -> &str {
        match purpose {
            CachePurpose::Static => &self.static_name,
            CachePurpose::Dynamic => &self.dynamic_name,
            CachePurpose::Api => &self.api_name,
            CachePurpose::Critical => &self.critical_name,
        }
    }

    pub fn current(&self) -> [&str; 4] {
        CachePurpose::ALL.map(|purpose| self.name(purpose))
    }

    pub fn is_current(&self, name: &str) -> bool {
        self.current().contains(&name)
    }

    pub fn purpose_of(&self, name: &str) -> Option<CachePurpose> {
        CachePurpose::ALL
            .into_iter()
            .find(|purpose| self.name(*purpose) == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_names() {
        let names = CacheNamespaces::from_config(&CacheNamesConfig::default());
        assert_eq!(names.name(CachePurpose::Static), "trademore-static-v3");
        assert_eq!(names.name(CachePurpose::Dynamic), "trademore-dynamic-v3");
        assert_eq!(names.name(CachePurpose::Api), "trademore-api-v2");
        assert_eq!(names.name(CachePurpose::Critical), "trademore-critical-v1");
    }

    #[test]
    fn test_is_current() {
        let names = CacheNamespaces::from_config(&CacheNamesConfig::default());
        assert!(names.is_current("trademore-api-v2"));
        assert!(!names.is_current("trademore-api-v1"));
        assert!(!names.is_current("something-else"));
    }

    #[test]
    fn test_version_bump_changes_name() {
        let config = CacheNamesConfig {
            static_version: "v4".to_string(),
            ..Default::default()
        };
        let names = CacheNamespaces::from_config(&config);
        assert_eq!(names.purpose_of("trademore-static-v4"), Some(CachePurpose::Static));
        assert_eq!(names.purpose_of("trademore-static-v3"), None);
    }
}
