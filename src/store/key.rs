//! Storage key generation using SHA-256 hashes

use sha2::{Digest, Sha256};

/// Deterministic key for a cached response.
///
/// Hash of the namespace and the request key, used to name blob files so the
/// same entry always lands on the same path.
pub fn cache_key(namespace: &str, request_key: &str) -> String {
    let mut hasher = Sha256::new();

    hasher.update(namespace.as_bytes());
    hasher.update(b"|");
    hasher.update(request_key.as_bytes());

    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_deterministic() {
        let key1 = cache_key("trademore-static-v3", "https://trademore.test/");
        let key2 = cache_key("trademore-static-v3", "https://trademore.test/");
        assert_eq!(key1, key2);
        assert_eq!(key1.len(), 64);
    }

    #[test]
    fn test_cache_key_different_namespaces() {
        let key1 = cache_key("trademore-static-v3", "https://trademore.test/");
        let key2 = cache_key("trademore-dynamic-v3", "https://trademore.test/");
        assert_ne!(key1, key2);
    }

    #[test]
    fn test_cache_key_separator_matters() {
        assert_ne!(cache_key("ab", "c"), cache_key("a", "bc"));
    }
}
