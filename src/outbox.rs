//! Page-side "send now or queue for later" for forms and analytics
//!
//! Online submissions are tried immediately (forms with exponential backoff);
//! anything that cannot be delivered lands in the offline queue with a
//! background-sync registration so the worker replays it later.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::config::WorkerConfig;
use crate::error::Result;
use crate::worker::http::Request;
use crate::worker::manifest::Manifest;
use crate::worker::ports::NetworkFetcher;
use crate::worker::queue::{AnalyticsEvent, OfflineQueue, QueueKind};

/// Attempts and backoff for immediate form submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay after the failed attempt number `attempt` (0-based): 1s, 2s, 4s...
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// What happened to a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum Delivery {
    Sent { status: u16 },
    Queued { id: i64 },
    /// Neither sent nor stored; the failure was logged
    Lost,
}

pub struct Outbox {
    queue: OfflineQueue,
    network: Arc<dyn NetworkFetcher>,
    manifest: Manifest,
    online: AtomicBool,
    retry: RetryPolicy,
}

impl Outbox {
    pub fn new(
        config: &WorkerConfig,
        queue: OfflineQueue,
        network: Arc<dyn NetworkFetcher>,
    ) -> Result<Self> {
        Ok(Self {
            queue,
            network,
            manifest: Manifest::from_config(config)?,
            online: AtomicBool::new(true),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Connectivity is back: flip online and ask for both syncs.
    pub async fn back_online(&self) {
        self.set_online(true);
        for kind in QueueKind::ALL {
            self.queue.request_sync(kind.sync_tag()).await;
        }
    }

    /// POST a form now, or queue it for the `form-submission` sync.
    pub async fn submit_form(
        &self,
        url: &str,
        body: Vec<u8>,
        headers: BTreeMap<String, String>,
    ) -> Delivery {
        if self.is_online() {
            match self.manifest.resolve(url) {
                Some(target) => {
                    let request = Request::post(target, body.clone(), headers.clone());
                    match self.send_with_retry(&request).await {
                        Ok(status) => return Delivery::Sent { status },
                        Err(reason) => {
                            log::warn!("Form submission to {} failed, queuing: {}", url, reason)
                        }
                    }
                }
                None => log::warn!("Cannot resolve form URL {:?}, queuing", url),
            }
        }

        match self.queue.enqueue_form(url, body, headers).await {
            Some(id) => Delivery::Queued { id },
            None => Delivery::Lost,
        }
    }

    /// POST an analytics event once, or queue it for `analytics-sync`.
    pub async fn track_event(&self, event: &str, data: serde_json::Value) -> Delivery {
        let endpoint = self.manifest.analytics_endpoint();

        if self.is_online()
            && let Some(target) = endpoint.clone()
        {
            let body = AnalyticsEvent {
                event: event.to_string(),
                data: data.clone(),
            };
            match serde_json::to_vec(&body) {
                Ok(payload) => {
                    let request = Request::post(target, payload, BTreeMap::new())
                        .with_header("content-type", "application/json");
                    match self.network.fetch(&request).await {
                        Ok(response) if response.is_success() => {
                            return Delivery::Sent {
                                status: response.status,
                            };
                        }
                        Ok(response) => {
                            log::debug!("Analytics endpoint returned {}, queuing", response.status)
                        }
                        Err(e) => log::debug!("Analytics send failed, queuing: {}", e),
                    }
                }
                Err(e) => log::warn!("Failed to encode analytics event {}: {}", event, e),
            }
        }

        let endpoint = endpoint
            .map(|u| u.to_string())
            .unwrap_or_else(|| "/api/analytics".to_string());
        match self.queue.enqueue_event(&endpoint, event, data).await {
            Some(id) => Delivery::Queued { id },
            None => Delivery::Lost,
        }
    }

    async fn send_with_retry(&self, request: &Request) -> std::result::Result<u16, String> {
        let attempts = self.retry.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 0..attempts {
            match self.network.fetch(request).await {
                Ok(response) if response.is_success() => return Ok(response.status),
                Ok(response) => last_error = format!("HTTP {}", response.status),
                Err(e) => last_error = e.to_string(),
            }

            if attempt + 1 < attempts {
                let delay = self.retry.delay(attempt);
                log::debug!(
                    "Attempt {} failed ({}), retrying in {:?}",
                    attempt + 1,
                    last_error,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
        }
        Err(last_error)
    }
}
