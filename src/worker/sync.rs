//! Background-sync replay of queued tasks

use std::sync::Arc;

use reqwest::Url;
use serde::Serialize;

use super::http::Request;
use super::manifest::Manifest;
use super::ports::NetworkFetcher;
use super::queue::{OfflineQueue, QueueKind, QueuedTask, SyncTag};

/// Outcome of one sync event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Acknowledged (2xx/3xx) and removed
    pub delivered: usize,
    /// Refused by the server (4xx) and removed
    pub rejected: usize,
    /// Failed in transit or with 5xx; kept for the next sync
    pub retained: usize,
}

impl SyncReport {
    pub fn attempted(&self) -> usize {
        self.delivered + self.rejected + self.retained
    }
}

enum Replay {
    Delivered,
    Rejected(u16),
    Retry(String),
}

/// Replays queued tasks one at a time, oldest first.
#[derive(Clone)]
pub struct SyncEngine {
    queue: OfflineQueue,
    network: Arc<dyn NetworkFetcher>,
    manifest: Manifest,
    idempotency_header: Option<String>,
}

impl SyncEngine {
    pub fn new(
        queue: OfflineQueue,
        network: Arc<dyn NetworkFetcher>,
        manifest: Manifest,
        idempotency_header: Option<String>,
    ) -> Self {
        Self {
            queue,
            network,
            manifest,
            idempotency_header,
        }
    }

    /// Drain the queue behind `tag`. A failing task never stops the batch.
    pub async fn run(&self, tag: SyncTag) -> SyncReport {
        let kind = tag.kind();
        let mut report = SyncReport::default();

        for task in self.queue.pending(kind).await {
            match self.replay(&task).await {
                Replay::Delivered => {
                    if self.queue.remove(kind, task.id).await {
                        report.delivered += 1;
                    } else {
                        // Sent but still stored: it will be sent again.
                        report.retained += 1;
                    }
                }
                Replay::Rejected(status) => {
                    log::warn!(
                        "Dropping {} task {}: server rejected it with {}",
                        kind,
                        task.id,
                        status
                    );
                    if self.queue.remove(kind, task.id).await {
                        report.rejected += 1;
                    } else {
                        report.retained += 1;
                    }
                }
                Replay::Retry(reason) => {
                    log::warn!("Replay of {} task {} failed: {}", kind, task.id, reason);
                    report.retained += 1;
                }
            }
        }

        log::info!(
            "Sync {}: {} delivered, {} rejected, {} retained",
            tag,
            report.delivered,
            report.rejected,
            report.retained
        );
        report
    }

    async fn replay(&self, task: &QueuedTask) -> Replay {
        let url = match self.target(task) {
            Some(url) => url,
            None => return Replay::Rejected(0),
        };

        let mut request = Request::post(url, task.payload.clone(), task.headers.clone());
        if task.kind == QueueKind::Analytics {
            request = request.with_header("content-type", "application/json");
        }
        if let Some(header) = &self.idempotency_header {
            request = request.with_header(header, &task.idempotency_key());
        }

        match self.network.fetch(&request).await {
            Ok(response) if response.status < 400 => Replay::Delivered,
            Ok(response) if response.status < 500 => Replay::Rejected(response.status),
            Ok(response) => Replay::Retry(format!("server returned {}", response.status)),
            Err(e) => Replay::Retry(e.to_string()),
        }
    }

    /// Forms go back where they came from; analytics always go to the
    /// configured endpoint.
    fn target(&self, task: &QueuedTask) -> Option<Url> {
        let target = match task.kind {
            QueueKind::Forms => self.manifest.resolve(&task.url),
            QueueKind::Analytics => self.manifest.analytics_endpoint(),
        };
        if target.is_none() {
            log::warn!("{} task {} has an unusable URL {:?}", task.kind, task.id, task.url);
        }
        target
    }
}
