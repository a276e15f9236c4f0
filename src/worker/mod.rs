//! Offline cache & sync controller
//!
//! The service-worker state machine: versioned cache namespaces, per-request
//! strategy dispatch, the durable offline queue with background-sync replay,
//! and push notification handling. All I/O goes through the traits in
//! [`ports`].

pub mod controller;
pub mod headless;
pub mod http;
pub mod lifetime;
pub mod manifest;
pub mod namespace;
pub mod ports;
pub mod push;
pub mod queue;
pub mod strategy;
pub mod sync;

#[cfg(test)]
pub mod testing;

pub use controller::{
    ActivationReport, Dispatch, InstallReport, LifecycleState, MessageReply, PrecacheFailure,
    ServiceWorker, WorkerMessage,
};
pub use headless::HeadlessPlatform;
pub use http::{Request, RequestMode, Response};
pub use lifetime::Lifetime;
pub use manifest::Manifest;
pub use namespace::{CacheNamespaces, CachePurpose};
pub use ports::{
    Clients, DurableQueue, NetworkFetcher, Notifier, Ports, ResponseCache, SyncManager,
    WindowClient,
};
pub use push::{ClickOutcome, NotificationData, NotificationRequest, PushPayload};
pub use queue::{AnalyticsEvent, NewTask, OfflineQueue, QueueKind, QueuedTask, SyncTag};
pub use strategy::Strategy;
pub use sync::SyncReport;
