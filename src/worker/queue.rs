//! Offline task queue: task model, sync tags and the enqueue helper

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::ports::{DurableQueue, SyncManager};

/// Which logical table a task lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum QueueKind {
    Forms,
    Analytics,
}

impl QueueKind {
    pub const ALL: [QueueKind; 2] = [QueueKind::Forms, QueueKind::Analytics];

    pub fn table(&self) -> &'static str {
        match self {
            QueueKind::Forms => "queued_forms",
            QueueKind::Analytics => "queued_analytics",
        }
    }

    pub fn sync_tag(&self) -> SyncTag {
        match self {
            QueueKind::Forms => SyncTag::FormSubmission,
            QueueKind::Analytics => SyncTag::AnalyticsSync,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueKind::Forms => "forms",
            QueueKind::Analytics => "analytics",
        }
    }
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named background-sync registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncTag {
    FormSubmission,
    AnalyticsSync,
}

impl SyncTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncTag::FormSubmission => "form-submission",
            SyncTag::AnalyticsSync => "analytics-sync",
        }
    }

    pub fn kind(&self) -> QueueKind {
        match self {
            SyncTag::FormSubmission => QueueKind::Forms,
            SyncTag::AnalyticsSync => QueueKind::Analytics,
        }
    }
}

impl fmt::Display for SyncTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "form-submission" => Ok(SyncTag::FormSubmission),
            "analytics-sync" => Ok(SyncTag::AnalyticsSync),
            other => Err(format!("unknown sync tag: {}", other)),
        }
    }
}

/// A task about to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub kind: QueueKind,
    pub url: String,
    pub payload: Vec<u8>,
    pub headers: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl NewTask {
    pub fn new(kind: QueueKind, url: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            url: url.into(),
            payload: payload.into(),
            headers: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn into_queued(self, id: i64) -> QueuedTask {
        QueuedTask {
            id,
            kind: self.kind,
            url: self.url,
            payload: self.payload,
            headers: self.headers,
            created_at: self.created_at,
        }
    }
}

/// A persisted, not-yet-delivered request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedTask {
    pub id: i64,
    pub kind: QueueKind,
    pub url: String,
    #[serde(with = "payload_text")]
    pub payload: Vec<u8>,
    pub headers: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl QueuedTask {
    /// Stable per-task key for endpoints that deduplicate replays.
    pub fn idempotency_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.kind.table().as_bytes());
        hasher.update(b"|");
        hasher.update(self.id.to_le_bytes());
        hasher.update(b"|");
        hasher.update(self.created_at.timestamp_millis().to_le_bytes());
        hasher.update(b"|");
        hasher.update(self.url.as_bytes());
        hasher.update(b"|");
        hasher.update(&self.payload);
        hex(&hasher.finalize())
    }

    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Payloads are shown as text in JSON output.
mod payload_text {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(payload: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(payload))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        String::deserialize(deserializer).map(String::into_bytes)
    }
}

/// Body stored for a queued analytics event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Store-plus-sync front end over the queue ports.
///
/// Store failures are logged and swallowed: writers get `None`, readers get
/// an empty list.
#[derive(Clone)]
pub struct OfflineQueue {
    store: Arc<dyn DurableQueue>,
    sync: Arc<dyn SyncManager>,
}

impl OfflineQueue {
    pub fn new(store: Arc<dyn DurableQueue>, sync: Arc<dyn SyncManager>) -> Self {
        Self { store, sync }
    }

    /// Persist a task and request its sync registration.
    pub async fn enqueue(&self, task: NewTask) -> Option<i64> {
        let kind = task.kind;
        let id = match self.store.add(&task).await {
            Ok(id) => id,
            Err(e) => {
                log::warn!("Failed to queue {} task for {}: {}", kind, task.url, e);
                return None;
            }
        };
        log::debug!("Queued {} task {} for {}", kind, id, task.url);

        self.request_sync(kind.sync_tag()).await;
        Some(id)
    }

    pub async fn enqueue_form(
        &self,
        url: &str,
        body: Vec<u8>,
        headers: BTreeMap<String, String>,
    ) -> Option<i64> {
        self.enqueue(NewTask::new(QueueKind::Forms, url, body).with_headers(headers))
            .await
    }

    /// Queue an analytics event as a JSON `{event, data}` body.
    pub async fn enqueue_event(
        &self,
        endpoint: &str,
        event: &str,
        data: serde_json::Value,
    ) -> Option<i64> {
        let body = AnalyticsEvent {
            event: event.to_string(),
            data,
        };
        let payload = match serde_json::to_vec(&body) {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!("Failed to encode analytics event {}: {}", event, e);
                return None;
            }
        };
        self.enqueue(
            NewTask::new(QueueKind::Analytics, endpoint, payload)
                .with_header("content-type", "application/json"),
        )
        .await
    }

    /// Tasks of `kind`, oldest first; empty on store failure.
    pub async fn pending(&self, kind: QueueKind) -> Vec<QueuedTask> {
        match self.store.list(kind).await {
            Ok(tasks) => tasks,
            Err(e) => {
                log::warn!("Failed to read {} queue: {}", kind, e);
                Vec::new()
            }
        }
    }

    /// Remove a delivered task. Returns whether it was removed.
    pub async fn remove(&self, kind: QueueKind, id: i64) -> bool {
        match self.store.delete(kind, id).await {
            Ok(removed) => removed,
            Err(e) => {
                log::warn!("Failed to remove {} task {}: {}", kind, id, e);
                false
            }
        }
    }

    /// Ask the platform for a sync; unsupported platforms are not an error.
    pub async fn request_sync(&self, tag: SyncTag) -> bool {
        match self.sync.register(tag).await {
            Ok(true) => {
                log::debug!("Registered background sync {}", tag);
                true
            }
            Ok(false) => {
                log::debug!("Background sync unavailable, {} stays queued", tag);
                false
            }
            Err(e) => {
                log::warn!("Failed to register background sync {}: {}", tag, e);
                false
            }
        }
    }
}
