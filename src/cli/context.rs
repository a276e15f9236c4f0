//! Command execution context
//!
//! Loads the configuration once and builds the stores, network client and
//! worker that commands share.

use std::sync::Arc;

use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::config::Config;
use crate::error::Result;
use crate::net::HttpFetcher;
use crate::outbox::Outbox;
use crate::store::{SqliteQueue, SqliteResponseCache};
use crate::worker::{HeadlessPlatform, OfflineQueue, Ports, ServiceWorker};

/// Context for command execution.
pub struct CommandContext {
    /// Loaded configuration with CLI overrides applied
    pub config: Config,
    /// Output format preference
    pub format: OutputFormat,
}

impl CommandContext {
    /// Load config from the given (or default) path, falling back to
    /// defaults when no file exists.
    pub fn new(opts: &GlobalOptions) -> Result<Self> {
        let mut config = Config::load_or_default(opts.config_ref())?;

        if let Some(origin) = opts.origin_ref() {
            config.worker.origin = origin.to_string();
            if !config.worker.scope.starts_with(origin) {
                config.worker.scope = format!("{}/", origin.trim_end_matches('/'));
            }
        }

        Ok(Self {
            config,
            format: opts.format,
        })
    }

    pub fn open_cache(&self) -> Result<SqliteResponseCache> {
        let cache = match &self.config.storage.cache_dir {
            Some(dir) => SqliteResponseCache::open_at(dir)?,
            None => SqliteResponseCache::open()?,
        };
        Ok(cache)
    }

    pub fn open_queue(&self) -> Result<SqliteQueue> {
        let queue = match &self.config.storage.queue_path {
            Some(path) => SqliteQueue::open_at(path)?,
            None => SqliteQueue::open()?,
        };
        Ok(queue)
    }

    /// Real stores and network, headless platform.
    pub fn ports(&self) -> Result<Ports> {
        Ok(Ports {
            cache: Arc::new(self.open_cache()?),
            network: Arc::new(HttpFetcher::new()?),
            queue: Arc::new(self.open_queue()?),
            sync: Arc::new(HeadlessPlatform),
            clients: Arc::new(HeadlessPlatform),
            notifier: Arc::new(HeadlessPlatform),
        })
    }

    /// Worker about to install.
    pub fn fresh_worker(&self) -> Result<ServiceWorker> {
        ServiceWorker::new(&self.config.worker, self.ports()?)
    }

    /// Worker installed by an earlier run.
    pub fn installed_worker(&self) -> Result<ServiceWorker> {
        ServiceWorker::installed(&self.config.worker, self.ports()?)
    }

    /// Worker activated by an earlier run.
    pub fn active_worker(&self) -> Result<ServiceWorker> {
        ServiceWorker::resume(&self.config.worker, self.ports()?)
    }

    pub fn outbox(&self) -> Result<Outbox> {
        let ports = self.ports()?;
        let queue = OfflineQueue::new(ports.queue.clone(), ports.sync.clone());
        Outbox::new(&self.config.worker, queue, ports.network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn opts(config: &std::path::Path, origin: Option<&str>) -> GlobalOptions {
        GlobalOptions {
            format: OutputFormat::Json,
            config: Some(config.display().to_string()),
            origin: origin.map(str::to_string),
        }
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let ctx = CommandContext::new(&opts(&dir.path().join("none.yaml"), None)).unwrap();
        assert_eq!(ctx.config, Config::default());
        assert_eq!(ctx.format, OutputFormat::Json);
    }

    #[test]
    fn test_origin_override_moves_scope() {
        let dir = TempDir::new().unwrap();
        let ctx = CommandContext::new(&opts(
            &dir.path().join("none.yaml"),
            Some("http://127.0.0.1:4000"),
        ))
        .unwrap();
        assert_eq!(ctx.config.worker.origin, "http://127.0.0.1:4000");
        assert_eq!(ctx.config.worker.scope, "http://127.0.0.1:4000/");
    }

    #[test]
    fn test_stores_open_at_configured_paths() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.cache_dir = Some(dir.path().join("cache"));
        config.storage.queue_path = Some(dir.path().join("queue.db"));
        let path = dir.path().join("config.yaml");
        config.save_to(path.clone()).unwrap();

        let ctx = CommandContext::new(&opts(&path, None)).unwrap();
        let cache = ctx.open_cache().unwrap();
        let queue = ctx.open_queue().unwrap();

        assert_eq!(cache.root(), dir.path().join("cache"));
        assert_eq!(queue.path(), dir.path().join("queue.db"));
    }
}
