//! Platform ports for running the worker without a browser
//!
//! There are no windows to control and nothing fires sync events, so sync
//! registration reports "unsupported" and replay is driven by hand.

use async_trait::async_trait;

use super::ports::{Clients, Notifier, SyncManager, WindowClient};
use super::push::NotificationRequest;
use super::queue::SyncTag;
use crate::error::{Error, Result};

#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessPlatform;

#[async_trait]
impl SyncManager for HeadlessPlatform {
    async fn register(&self, tag: SyncTag) -> Result<bool> {
        log::debug!("No background sync here; run `trademore queue sync` to replay {}", tag);
        Ok(false)
    }
}

#[async_trait]
impl Clients for HeadlessPlatform {
    async fn claim(&self) -> Result<()> {
        Ok(())
    }

    async fn windows(&self) -> Result<Vec<WindowClient>> {
        Ok(Vec::new())
    }

    async fn navigate(&self, id: &str, _url: &str) -> Result<()> {
        Err(Error::Other(format!("no window {}", id)))
    }

    async fn focus(&self, id: &str) -> Result<()> {
        Err(Error::Other(format!("no window {}", id)))
    }

    async fn open_window(&self, url: &str) -> Result<bool> {
        log::debug!("Cannot open a window for {}", url);
        Ok(false)
    }
}

#[async_trait]
impl Notifier for HeadlessPlatform {
    async fn show(&self, notification: &NotificationRequest) -> Result<()> {
        log::info!("Notification: {}: {}", notification.title, notification.body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sync_unsupported() {
        assert!(!HeadlessPlatform.register(SyncTag::FormSubmission).await.unwrap());
    }

    #[tokio::test]
    async fn test_no_windows() {
        let platform = HeadlessPlatform;
        assert!(platform.windows().await.unwrap().is_empty());
        assert!(!platform.open_window("https://trademore.test/").await.unwrap());
        assert!(platform.focus("w1").await.is_err());
    }
}
