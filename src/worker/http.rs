//! Request and response snapshots exchanged with the ports

use std::collections::BTreeMap;

use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};

/// How the page issued a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Full-page navigation
    Navigate,
    #[default]
    Cors,
    NoCors,
    SameOrigin,
}

/// An intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub mode: RequestMode,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Vec<u8>>,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            mode: RequestMode::default(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// A top-level navigation to `url`.
    pub fn navigate(url: Url) -> Self {
        Self {
            mode: RequestMode::Navigate,
            ..Self::get(url)
        }
    }

    pub fn post(url: Url, body: Vec<u8>, headers: BTreeMap<String, String>) -> Self {
        Self {
            headers,
            body: Some(body),
            ..Self::new(Method::POST, url)
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    /// Key under which the response is cached: the URL without fragment.
    pub fn cache_key(&self) -> String {
        url_key(&self.url)
    }
}

pub fn url_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

/// A stored or fetched response snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    /// Synthetic 503 served when neither network nor cache can answer.
    pub fn offline() -> Self {
        Self::new(503, "Offline").with_header("content-type", "text/plain")
    }

    /// Only a plain 200 is written back to the cache.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_cache_key_drops_fragment() {
        let request = Request::get(url("https://trademore.test/education#top"));
        assert_eq!(request.cache_key(), "https://trademore.test/education");
    }

    #[test]
    fn test_cache_key_keeps_query() {
        let request = Request::get(url("https://trademore.test/api/financial-data?s=EURUSD"));
        assert!(request.cache_key().ends_with("?s=EURUSD"));
    }

    #[test]
    fn test_navigate_mode() {
        let request = Request::navigate(url("https://trademore.test/"));
        assert_eq!(request.mode, RequestMode::Navigate);
        assert_eq!(request.method, Method::GET);
    }

    #[test]
    fn test_offline_response() {
        let response = Response::offline();
        assert_eq!(response.status, 503);
        assert_eq!(response.text(), "Offline");
        assert_eq!(response.header("Content-Type"), Some("text/plain"));
        assert!(!response.is_cacheable());
    }

    #[test]
    fn test_only_200_is_cacheable() {
        assert!(Response::new(200, "").is_cacheable());
        assert!(!Response::new(204, "").is_cacheable());
        assert!(Response::new(204, "").is_success());
        assert!(!Response::new(404, "").is_success());
    }
}
