//! Durable local stores
//!
//! SQLite-backed implementations of the response cache and offline queue
//! ports, with file blob storage for large response bodies.

pub mod key;
pub mod queue;
pub mod response_cache;

pub use key::cache_key;
pub use queue::SqliteQueue;
pub use response_cache::{CacheStats, ClearStats, EntrySummary, NamespaceStats, SqliteResponseCache};
