//! Narrow interfaces to the host platform
//!
//! The controller only talks to the outside world through these traits, so
//! it runs the same against SQLite + reqwest in the CLI and against the
//! in-memory fakes in tests.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http::{Request, Response};
use super::push::NotificationRequest;
use super::queue::{NewTask, QueueKind, QueuedTask, SyncTag};
use crate::error::{CacheError, NetworkError, QueueError, Result};

/// Namespaced response store (the browser's Cache Storage).
///
/// Every write is atomic per entry.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Create the namespace if missing.
    async fn open(&self, namespace: &str) -> std::result::Result<(), CacheError>;

    /// Look up `key` in one namespace.
    async fn match_in(
        &self,
        namespace: &str,
        key: &str,
    ) -> std::result::Result<Option<Response>, CacheError>;

    /// Look up `key` across all namespaces in creation order.
    async fn match_any(&self, key: &str) -> std::result::Result<Option<Response>, CacheError>;

    /// Store `response` under `key`, creating the namespace if needed.
    async fn put(
        &self,
        namespace: &str,
        key: &str,
        response: &Response,
    ) -> std::result::Result<(), CacheError>;

    /// Drop a namespace and all its entries. Returns whether it existed.
    async fn delete(&self, namespace: &str) -> std::result::Result<bool, CacheError>;

    /// Names of all namespaces.
    async fn keys(&self) -> std::result::Result<Vec<String>, CacheError>;
}

/// Outbound HTTP.
#[async_trait]
pub trait NetworkFetcher: Send + Sync {
    /// Transport failures are errors; HTTP error statuses are responses.
    async fn fetch(&self, request: &Request) -> std::result::Result<Response, NetworkError>;
}

/// Durable store of deferred requests, one logical table per [`QueueKind`].
#[async_trait]
pub trait DurableQueue: Send + Sync {
    /// Persist a task and return its auto-increment id.
    async fn add(&self, task: &NewTask) -> std::result::Result<i64, QueueError>;

    /// All tasks of a kind, oldest first.
    async fn list(&self, kind: QueueKind) -> std::result::Result<Vec<QueuedTask>, QueueError>;

    /// Remove one task. Returns whether it existed.
    async fn delete(&self, kind: QueueKind, id: i64) -> std::result::Result<bool, QueueError>;
}

/// Background-sync registration.
#[async_trait]
pub trait SyncManager: Send + Sync {
    /// Ask the platform to fire `tag` once connectivity returns.
    /// `Ok(false)` means the platform has no background sync.
    async fn register(&self, tag: SyncTag) -> Result<bool>;
}

/// A browser window controlled (or controllable) by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowClient {
    pub id: String,
    pub url: String,
    pub focusable: bool,
}

/// Window enumeration and control.
#[async_trait]
pub trait Clients: Send + Sync {
    /// Take control of all open clients without a reload.
    async fn claim(&self) -> Result<()>;

    /// All window clients, including uncontrolled ones.
    async fn windows(&self) -> Result<Vec<WindowClient>>;

    async fn navigate(&self, id: &str, url: &str) -> Result<()>;

    async fn focus(&self, id: &str) -> Result<()>;

    /// Open a new window. `Ok(false)` means the platform cannot.
    async fn open_window(&self, url: &str) -> Result<bool>;
}

/// System notification display.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn show(&self, notification: &NotificationRequest) -> Result<()>;
}

/// All ports the controller needs, shareable across tasks.
#[derive(Clone)]
pub struct Ports {
    pub cache: Arc<dyn ResponseCache>,
    pub network: Arc<dyn NetworkFetcher>,
    pub queue: Arc<dyn DurableQueue>,
    pub sync: Arc<dyn SyncManager>,
    pub clients: Arc<dyn Clients>,
    pub notifier: Arc<dyn Notifier>,
}
