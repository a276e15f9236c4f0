//! Per-request cache strategy selection and execution

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::http::{Request, RequestMode, Response, url_key};
use super::lifetime::Lifetime;
use super::manifest::Manifest;
use super::namespace::{CacheNamespaces, CachePurpose};
use super::ports::{NetworkFetcher, ResponseCache};

/// How a GET request is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Cached copy now, network refresh in the background (API data)
    StaleWhileRevalidate,
    /// Cache, then network (pre-cached static assets)
    CacheFirst,
    /// Network, then cache, then the offline page (navigations)
    NetworkFirstWithOfflinePage,
    /// Network, then cache (everything else)
    NetworkFirst,
}

impl Strategy {
    /// First match wins: API pattern, static manifest entry, navigation.
    pub fn classify(manifest: &Manifest, request: &Request) -> Self {
        if manifest.is_api(&request.url) {
            Strategy::StaleWhileRevalidate
        } else if manifest.is_static(&request.url) {
            Strategy::CacheFirst
        } else if request.mode == RequestMode::Navigate {
            Strategy::NetworkFirstWithOfflinePage
        } else {
            Strategy::NetworkFirst
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::StaleWhileRevalidate => "stale-while-revalidate",
            Strategy::CacheFirst => "cache-first",
            Strategy::NetworkFirstWithOfflinePage => "network-first-offline-page",
            Strategy::NetworkFirst => "network-first",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs strategies against the cache and network ports.
///
/// Never fails: every network or store error degrades to a cached response
/// or the synthetic 503.
#[derive(Clone)]
pub struct Dispatcher {
    cache: Arc<dyn ResponseCache>,
    network: Arc<dyn NetworkFetcher>,
    namespaces: CacheNamespaces,
    manifest: Manifest,
    lifetime: Arc<Lifetime>,
}

impl Dispatcher {
    pub fn new(
        cache: Arc<dyn ResponseCache>,
        network: Arc<dyn NetworkFetcher>,
        namespaces: CacheNamespaces,
        manifest: Manifest,
        lifetime: Arc<Lifetime>,
    ) -> Self {
        Self {
            cache,
            network,
            namespaces,
            manifest,
            lifetime,
        }
    }

    pub async fn dispatch(&self, request: &Request) -> (Response, Strategy) {
        let strategy = Strategy::classify(&self.manifest, request);
        log::debug!("{} {} via {}", request.method, request.url, strategy);

        let response = match strategy {
            Strategy::StaleWhileRevalidate => {
                self.stale_while_revalidate(request, CachePurpose::Api)
                    .await
            }
            Strategy::CacheFirst => self.cache_first(request, CachePurpose::Static).await,
            Strategy::NetworkFirstWithOfflinePage => {
                self.network_first_with_offline_page(request).await
            }
            Strategy::NetworkFirst => self.network_first(request, CachePurpose::Dynamic).await,
        };
        (response, strategy)
    }

    async fn stale_while_revalidate(&self, request: &Request, purpose: CachePurpose) -> Response {
        let namespace = self.namespaces.name(purpose).to_string();
        let key = request.cache_key();

        let cached = match self.cache.match_in(&namespace, &key).await {
            Ok(cached) => cached,
            Err(e) => {
                log::warn!("Cache lookup failed for {}: {}", key, e);
                None
            }
        };

        match cached {
            Some(stale) => {
                log::debug!("Serving {} from {}, revalidating", key, namespace);
                let cache = self.cache.clone();
                let network = self.network.clone();
                let request = request.clone();
                self.lifetime.wait_until(async move {
                    match network.fetch(&request).await {
                        Ok(fresh) if fresh.is_cacheable() => {
                            store(cache.as_ref(), &namespace, &key, &fresh).await;
                        }
                        Ok(fresh) => {
                            log::debug!("Revalidation of {} returned {}", key, fresh.status)
                        }
                        Err(e) => log::debug!("Revalidation of {} failed: {}", key, e),
                    }
                });
                stale
            }
            None => match self.network.fetch(request).await {
                Ok(response) => {
                    if response.is_cacheable() {
                        self.store_later(&namespace, &key, &response);
                    }
                    response
                }
                Err(e) => {
                    log::warn!("Network failed for {} with nothing cached: {}", key, e);
                    Response::offline()
                }
            },
        }
    }

    async fn cache_first(&self, request: &Request, purpose: CachePurpose) -> Response {
        let key = request.cache_key();
        if let Some(cached) = self.lookup_any(&key).await {
            log::debug!("Cache hit for {}", key);
            return cached;
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_cacheable() {
                    self.store_later(self.namespaces.name(purpose), &key, &response);
                }
                response
            }
            Err(e) => {
                log::debug!("Network failed for {}: {}", key, e);
                Response::offline()
            }
        }
    }

    async fn network_first(&self, request: &Request, purpose: CachePurpose) -> Response {
        let key = request.cache_key();
        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_cacheable() {
                    self.store_later(self.namespaces.name(purpose), &key, &response);
                }
                response
            }
            Err(e) => {
                log::debug!("Network failed for {}, trying cache: {}", key, e);
                self.lookup_any(&key).await.unwrap_or_else(Response::offline)
            }
        }
    }

    async fn network_first_with_offline_page(&self, request: &Request) -> Response {
        let key = request.cache_key();
        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_cacheable() {
                    self.store_later(self.namespaces.name(CachePurpose::Dynamic), &key, &response);
                }
                response
            }
            Err(e) => {
                log::debug!("Navigation to {} failed offline: {}", key, e);
                if let Some(cached) = self.lookup_any(&key).await {
                    return cached;
                }
                if let Some(page) = self.manifest.offline_page()
                    && let Some(offline) = self.lookup_any(&url_key(&page)).await
                {
                    return offline;
                }
                Response::offline()
            }
        }
    }

    async fn lookup_any(&self, key: &str) -> Option<Response> {
        match self.cache.match_any(key).await {
            Ok(found) => found,
            Err(e) => {
                log::warn!("Cache lookup failed for {}: {}", key, e);
                None
            }
        }
    }

    /// Write back without holding up the response.
    fn store_later(&self, namespace: &str, key: &str, response: &Response) {
        let cache = self.cache.clone();
        let namespace = namespace.to_string();
        let key = key.to_string();
        let response = response.clone();
        self.lifetime.wait_until(async move {
            store(cache.as_ref(), &namespace, &key, &response).await;
        });
    }
}

async fn store(cache: &dyn ResponseCache, namespace: &str, key: &str, response: &Response) {
    match cache.put(namespace, key, response).await {
        Ok(()) => log::debug!("Cached {} in {}", key, namespace),
        Err(e) => log::warn!("Failed to cache {} in {}: {}", key, namespace, e),
    }
}
