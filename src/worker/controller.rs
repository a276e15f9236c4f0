//! Worker lifecycle and event handlers

use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use futures::stream::{self, StreamExt};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::http::{Request, Response};
use super::lifetime::Lifetime;
use super::manifest::Manifest;
use super::namespace::{CacheNamespaces, CachePurpose};
use super::ports::Ports;
use super::push::{self, ClickOutcome, NotificationData, NotificationRequest, PushPayload};
use super::queue::{OfflineQueue, SyncTag};
use super::strategy::{Dispatcher, Strategy};
use super::sync::{SyncEngine, SyncReport};
use crate::config::WorkerConfig;
use crate::error::{Error, Result};

/// Per-deployment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Installing,
    Waiting,
    Activating,
    Active,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Installing => "installing",
            LifecycleState::Waiting => "waiting",
            LifecycleState::Activating => "activating",
            LifecycleState::Active => "active",
        };
        f.write_str(s)
    }
}

/// One manifest entry that could not be pre-cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrecacheFailure {
    pub namespace: String,
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub cached: usize,
    pub failed: Vec<PrecacheFailure>,
    pub state: LifecycleState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationReport {
    pub deleted: Vec<String>,
    pub claimed: bool,
}

/// Answer to an intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Not handled; the page talks to the network itself
    Passthrough,
    Respond(Response, Strategy),
}

/// Control messages posted by pages as `{"type": ...}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    SkipWaiting,
    ClearCaches,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reply", rename_all = "kebab-case")]
pub enum MessageReply {
    SkippedWaiting { state: LifecycleState },
    CachesCleared { deleted: Vec<String> },
    Ignored,
}

/// The offline cache & sync controller.
pub struct ServiceWorker {
    ports: Ports,
    manifest: Manifest,
    namespaces: CacheNamespaces,
    state: Mutex<LifecycleState>,
    skip_requested: AtomicBool,
    skip_waiting_on_install: bool,
    precache_concurrency: usize,
    lifetime: Arc<Lifetime>,
    dispatcher: Dispatcher,
    queue: OfflineQueue,
    sync: SyncEngine,
}

impl ServiceWorker {
    /// A freshly registered worker, about to install.
    pub fn new(config: &WorkerConfig, ports: Ports) -> Result<Self> {
        Self::with_state(config, ports, LifecycleState::Installing)
    }

    /// A worker installed by an earlier process, waiting to activate.
    pub fn installed(config: &WorkerConfig, ports: Ports) -> Result<Self> {
        Self::with_state(config, ports, LifecycleState::Waiting)
    }

    /// A worker that already went through install and activation in an
    /// earlier process.
    pub fn resume(config: &WorkerConfig, ports: Ports) -> Result<Self> {
        Self::with_state(config, ports, LifecycleState::Active)
    }

    fn with_state(config: &WorkerConfig, ports: Ports, state: LifecycleState) -> Result<Self> {
        let manifest = Manifest::from_config(config)?;
        let namespaces = CacheNamespaces::from_config(&config.cache);
        let lifetime = Arc::new(Lifetime::new());

        let dispatcher = Dispatcher::new(
            ports.cache.clone(),
            ports.network.clone(),
            namespaces.clone(),
            manifest.clone(),
            lifetime.clone(),
        );
        let queue = OfflineQueue::new(ports.queue.clone(), ports.sync.clone());
        let sync = SyncEngine::new(
            queue.clone(),
            ports.network.clone(),
            manifest.clone(),
            config.idempotency_header.clone(),
        );

        Ok(Self {
            ports,
            manifest,
            namespaces,
            state: Mutex::new(state),
            skip_requested: AtomicBool::new(false),
            skip_waiting_on_install: config.skip_waiting_on_install,
            precache_concurrency: config.precache_concurrency.max(1),
            lifetime,
            dispatcher,
            queue,
            sync,
        })
    }

    pub fn state(&self) -> LifecycleState {
        match self.state.lock() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set_state(&self, next: LifecycleState) {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *state != next {
            log::info!("Worker {} -> {}", *state, next);
            *state = next;
        }
    }

    fn require(&self, allowed: &[LifecycleState], action: &str) -> Result<()> {
        let state = self.state();
        if allowed.contains(&state) {
            Ok(())
        } else {
            Err(Error::Other(format!("cannot {} while {}", action, state)))
        }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn namespaces(&self) -> &CacheNamespaces {
        &self.namespaces
    }

    pub fn queue(&self) -> &OfflineQueue {
        &self.queue
    }

    pub fn lifetime(&self) -> &Lifetime {
        &self.lifetime
    }

    /// Await all background work. Call before dropping the worker.
    pub async fn settle(&self) {
        self.lifetime.settle().await;
    }

    /// Open the namespaces and pre-cache the static and critical manifests.
    ///
    /// Individual asset failures are reported, never fatal.
    pub async fn install(&self) -> Result<InstallReport> {
        self.require(&[LifecycleState::Installing], "install")?;
        log::info!("Installing worker");

        for purpose in [CachePurpose::Static, CachePurpose::Api, CachePurpose::Critical] {
            self.ports.cache.open(self.namespaces.name(purpose)).await?;
        }

        let mut cached = 0;
        let mut failed = Vec::new();
        for (purpose, assets) in [
            (CachePurpose::Static, self.manifest.static_assets()),
            (CachePurpose::Critical, self.manifest.critical_assets()),
        ] {
            let (ok, errors) = self.precache(purpose, assets).await;
            cached += ok;
            failed.extend(errors);
        }

        for failure in &failed {
            log::warn!(
                "Pre-cache of {} into {} failed: {}",
                failure.path,
                failure.namespace,
                failure.reason
            );
        }

        self.set_state(LifecycleState::Waiting);
        if self.skip_waiting_on_install || self.skip_requested.load(Ordering::SeqCst) {
            self.set_state(LifecycleState::Activating);
        }

        Ok(InstallReport {
            cached,
            failed,
            state: self.state(),
        })
    }

    async fn precache(
        &self,
        purpose: CachePurpose,
        assets: &[String],
    ) -> (usize, Vec<PrecacheFailure>) {
        let namespace = self.namespaces.name(purpose);

        let results: Vec<std::result::Result<(), PrecacheFailure>> = stream::iter(assets)
            .map(|path| async move {
                let fail = |reason: String| PrecacheFailure {
                    namespace: namespace.to_string(),
                    path: path.clone(),
                    reason,
                };

                let url = self
                    .manifest
                    .resolve(path)
                    .ok_or_else(|| fail("unresolvable path".to_string()))?;
                let request = Request::get(url);
                let response = self
                    .ports
                    .network
                    .fetch(&request)
                    .await
                    .map_err(|e| fail(e.to_string()))?;
                if !response.is_cacheable() {
                    return Err(fail(format!("status {}", response.status)));
                }
                self.ports
                    .cache
                    .put(namespace, &request.cache_key(), &response)
                    .await
                    .map_err(|e| fail(e.to_string()))
            })
            .buffer_unordered(self.precache_concurrency)
            .collect()
            .await;

        let mut cached = 0;
        let mut failed = Vec::new();
        for result in results {
            match result {
                Ok(()) => cached += 1,
                Err(failure) => failed.push(failure),
            }
        }
        log::info!("Pre-cached {}/{} into {}", cached, assets.len(), namespace);
        (cached, failed)
    }

    /// Move a waiting worker straight to activation.
    pub fn skip_waiting(&self) -> LifecycleState {
        self.skip_requested.store(true, Ordering::SeqCst);
        if self.state() == LifecycleState::Waiting {
            self.set_state(LifecycleState::Activating);
        }
        self.state()
    }

    /// Evict namespaces from older deployments and claim all clients.
    pub async fn activate(&self) -> Result<ActivationReport> {
        self.require(
            &[LifecycleState::Waiting, LifecycleState::Activating],
            "activate",
        )?;
        self.set_state(LifecycleState::Activating);

        let mut deleted = Vec::new();
        for name in self.ports.cache.keys().await? {
            if self.namespaces.is_current(&name) {
                continue;
            }
            if self.ports.cache.delete(&name).await? {
                log::info!("Deleted stale cache namespace {}", name);
                deleted.push(name);
            }
        }

        let claimed = match self.ports.clients.claim().await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to claim clients: {}", e);
                false
            }
        };

        self.set_state(LifecycleState::Active);
        Ok(ActivationReport { deleted, claimed })
    }

    /// Answer an intercepted request. Only GETs reaching an active worker
    /// are handled.
    pub async fn handle_fetch(&self, request: &Request) -> Dispatch {
        if request.method != Method::GET {
            return Dispatch::Passthrough;
        }
        if self.state() != LifecycleState::Active {
            log::debug!("Worker not active, passing {} through", request.url);
            return Dispatch::Passthrough;
        }
        let (response, strategy) = self.dispatcher.dispatch(request).await;
        Dispatch::Respond(response, strategy)
    }

    /// Handle a platform sync event. Unknown tags are ignored.
    pub async fn handle_sync(&self, tag: &str) -> Option<SyncReport> {
        match tag.parse::<SyncTag>() {
            Ok(tag) => Some(self.sync(tag).await),
            Err(e) => {
                log::debug!("Ignoring sync event: {}", e);
                None
            }
        }
    }

    pub async fn sync(&self, tag: SyncTag) -> SyncReport {
        self.sync.run(tag).await
    }

    /// Render a push payload and show it.
    pub async fn handle_push(&self, data: Option<&[u8]>) -> Result<NotificationRequest> {
        let notification = NotificationRequest::from_payload(PushPayload::parse(data), Utc::now());
        self.ports.notifier.show(&notification).await?;
        Ok(notification)
    }

    pub async fn handle_notification_click(
        &self,
        action: Option<&str>,
        data: &NotificationData,
    ) -> Result<ClickOutcome> {
        push::route_click(self.ports.clients.as_ref(), &self.manifest, action, data).await
    }

    /// Handle a `{"type": ...}` control message. Unknown types are ignored.
    pub async fn handle_message(&self, message: &serde_json::Value) -> Result<MessageReply> {
        let message = match WorkerMessage::deserialize(message) {
            Ok(message) => message,
            Err(e) => {
                log::debug!("Ignoring message {}: {}", message, e);
                return Ok(MessageReply::Ignored);
            }
        };

        match message {
            WorkerMessage::SkipWaiting => Ok(MessageReply::SkippedWaiting {
                state: self.skip_waiting(),
            }),
            WorkerMessage::ClearCaches => Ok(MessageReply::CachesCleared {
                deleted: self.clear_caches().await?,
            }),
        }
    }

    /// Delete every namespace, current ones included.
    pub async fn clear_caches(&self) -> Result<Vec<String>> {
        let mut deleted = Vec::new();
        for name in self.ports.cache.keys().await? {
            if self.ports.cache.delete(&name).await? {
                deleted.push(name);
            }
        }
        log::info!("Cleared {} cache namespaces", deleted.len());
        Ok(deleted)
    }
}
