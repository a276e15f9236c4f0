//! SQLite-backed response cache with file blob support
//!
//! Small bodies are stored inline in SQLite, large bodies (>10KB) as files.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

use super::key::cache_key;
use crate::error::CacheError;
use crate::worker::http::Response;
use crate::worker::ports::ResponseCache;

/// Schema version - increment to trigger nuke-and-rebuild
const SCHEMA_VERSION: i32 = 1;

/// Bodies larger than this are stored as external blobs
const INLINE_THRESHOLD: usize = 10 * 1024; // 10KB

/// Distinguishes blob files written in the same nanosecond
static BLOB_SEQ: AtomicU64 = AtomicU64::new(0);

type Result<T> = std::result::Result<T, CacheError>;

/// Namespaced response store on SQLite.
///
/// The connection sits behind a mutex so the store can be shared between
/// the dispatcher and its background cache writes.
pub struct SqliteResponseCache {
    conn: Mutex<Connection>,
    root: PathBuf,
    blobs_dir: PathBuf,
}

struct StoredEntry {
    request_key: String,
    status: u16,
    headers: String,
    body: Option<Vec<u8>>,
    blob_path: Option<String>,
}

impl SqliteResponseCache {
    /// Open or create the cache at the default XDG cache location
    pub fn open() -> Result<Self> {
        let cache_dir = Self::cache_dir()?;
        Self::open_at(&cache_dir)
    }

    /// Get the cache directory path (~/.cache/trademore on Linux)
    pub fn cache_dir() -> Result<PathBuf> {
        let cache_base = dirs::cache_dir().ok_or(CacheError::NoHome)?;
        Ok(cache_base.join("trademore"))
    }

    /// Open the cache at a specific directory
    pub fn open_at(cache_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(cache_dir)
            .map_err(|e| CacheError::Io(format!("Failed to create cache dir: {}", e)))?;

        let db_path = cache_dir.join("responses.db");
        let blobs_dir = cache_dir.join("blobs");
        std::fs::create_dir_all(&blobs_dir)
            .map_err(|e| CacheError::Io(format!("Failed to create blobs dir: {}", e)))?;

        let conn = Connection::open(&db_path)?;

        // Check schema version - nuke if mismatched
        let version: i32 = conn
            .pragma_query_value(None, "user_version", |r| r.get(0))
            .unwrap_or(0);

        if version != 0 && version != SCHEMA_VERSION {
            log::info!(
                "Cache schema version mismatch ({} != {}), rebuilding",
                version,
                SCHEMA_VERSION
            );
            drop(conn);
            Self::nuke(&db_path, &blobs_dir)?;
            return Self::open_at(cache_dir);
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cache_namespaces (
                name TEXT PRIMARY KEY NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS cache_entries (
                namespace TEXT NOT NULL,
                request_key TEXT NOT NULL,
                status INTEGER NOT NULL,
                headers TEXT NOT NULL,
                body BLOB,
                blob_path TEXT,
                created_at INTEGER NOT NULL,
                size_bytes INTEGER NOT NULL,
                PRIMARY KEY (namespace, request_key)
            );

            CREATE INDEX IF NOT EXISTS idx_request_key ON cache_entries(request_key);
            "#,
        )?;

        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        Ok(Self {
            conn: Mutex::new(conn),
            root: cache_dir.to_path_buf(),
            blobs_dir,
        })
    }

    /// Directory holding the database and blobs
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CacheError::Io("cache connection lock poisoned".to_string()))
    }

    fn ensure_namespace(conn: &Connection, namespace: &str) -> Result<()> {
        conn.execute(
            "INSERT OR IGNORE INTO cache_namespaces (name, created_at) VALUES (?1, ?2)",
            params![namespace, Utc::now().timestamp()],
        )?;
        Ok(())
    }

    fn read_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredEntry> {
        Ok(StoredEntry {
            request_key: row.get(0)?,
            status: row.get(1)?,
            headers: row.get(2)?,
            body: row.get(3)?,
            blob_path: row.get(4)?,
        })
    }

    /// Turn a row into a response, dropping rows whose blob has gone missing.
    fn materialize(
        &self,
        conn: &Connection,
        namespace: &str,
        entry: StoredEntry,
    ) -> Result<Option<Response>> {
        let headers: BTreeMap<String, String> =
            serde_json::from_str(&entry.headers).map_err(|e| CacheError::Corrupt {
                key: entry.request_key.clone(),
                reason: e.to_string(),
            })?;

        let body = match (entry.body, entry.blob_path) {
            (Some(body), None) => body,
            (None, Some(blob_path)) => match std::fs::read(self.blobs_dir.join(&blob_path)) {
                Ok(body) => body,
                Err(e) => {
                    log::warn!("Failed to read blob {}: {}", blob_path, e);
                    // Delete stale entry
                    let _ = conn.execute(
                        "DELETE FROM cache_entries WHERE namespace = ?1 AND request_key = ?2",
                        params![namespace, entry.request_key],
                    );
                    return Ok(None);
                }
            },
            _ => {
                return Err(CacheError::Corrupt {
                    key: entry.request_key,
                    reason: "entry has neither inline body nor blob".to_string(),
                });
            }
        };

        Ok(Some(Response {
            status: entry.status,
            headers,
            body,
        }))
    }

    /// Store a response.
    ///
    /// Every blob write goes to a fresh file, so a reader never sees a body
    /// being overwritten. The old blob is removed only after the new row
    /// commits; a failed put leaves the previous entry untouched.
    fn put_entry(&self, namespace: &str, request_key: &str, response: &Response) -> Result<()> {
        let headers = serde_json::to_string(&response.headers).map_err(|e| CacheError::Corrupt {
            key: request_key.to_string(),
            reason: e.to_string(),
        })?;
        let now = Utc::now().timestamp();
        let size = response.body.len();
        let key = cache_key(namespace, request_key);

        let blob_path = if size > INLINE_THRESHOLD {
            Some(self.write_blob(&key, &response.body)?)
        } else {
            None
        };

        let committed = self.commit_entry(namespace, request_key, response, &headers, &blob_path, now);
        match committed {
            Ok(previous) => {
                if let Some(old) = previous.filter(|old| Some(old) != blob_path.as_ref())
                    && let Err(e) = std::fs::remove_file(self.blobs_dir.join(&old))
                {
                    log::debug!("Failed to remove replaced blob {}: {}", old, e);
                }
                Ok(())
            }
            Err(e) => {
                if let Some(new) = &blob_path {
                    let _ = std::fs::remove_file(self.blobs_dir.join(new));
                }
                Err(e)
            }
        }
    }

    /// Replace the row, returning the blob the previous row pointed at.
    fn commit_entry(
        &self,
        namespace: &str,
        request_key: &str,
        response: &Response,
        headers: &str,
        blob_path: &Option<String>,
        now: i64,
    ) -> Result<Option<String>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        Self::ensure_namespace(&tx, namespace)?;
        let previous: Option<String> = tx
            .query_row(
                "SELECT blob_path FROM cache_entries WHERE namespace = ?1 AND request_key = ?2",
                params![namespace, request_key],
                |r| r.get(0),
            )
            .optional()?
            .flatten();
        tx.execute(
            "INSERT OR REPLACE INTO cache_entries
             (namespace, request_key, status, headers, body, blob_path, created_at, size_bytes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                namespace,
                request_key,
                response.status,
                headers,
                blob_path.is_none().then_some(&response.body),
                blob_path,
                now,
                response.body.len() as i64
            ],
        )?;
        tx.commit()?;
        Ok(previous)
    }

    fn delete_namespace(&self, namespace: &str) -> Result<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let blobs: Vec<String> = {
            let mut stmt = tx.prepare(
                "SELECT blob_path FROM cache_entries WHERE namespace = ?1 AND blob_path IS NOT NULL",
            )?;
            stmt.query_map([namespace], |r| r.get(0))?
                .collect::<rusqlite::Result<_>>()?
        };
        let entries = tx.execute("DELETE FROM cache_entries WHERE namespace = ?1", [namespace])?;
        let names = tx.execute("DELETE FROM cache_namespaces WHERE name = ?1", [namespace])?;
        tx.commit()?;

        for blob in blobs {
            if let Err(e) = std::fs::remove_file(self.blobs_dir.join(&blob)) {
                log::debug!("Failed to remove blob {}: {}", blob, e);
            }
        }
        Ok(entries > 0 || names > 0)
    }

    /// Namespace names in creation order
    pub fn namespace_names(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT name FROM cache_namespaces ORDER BY rowid")?;
        let names = stmt
            .query_map([], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    /// Per-namespace entry counts and sizes, in creation order
    pub fn namespace_stats(&self) -> Result<Vec<NamespaceStats>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT n.name, n.created_at, COUNT(e.request_key), COALESCE(SUM(e.size_bytes), 0)
             FROM cache_namespaces n
             LEFT JOIN cache_entries e ON e.namespace = n.name
             GROUP BY n.name
             ORDER BY n.rowid",
        )?;
        let stats = stmt
            .query_map([], |r| {
                Ok(NamespaceStats {
                    name: r.get(0)?,
                    created_at: r.get(1)?,
                    entries: r.get::<_, i64>(2)? as usize,
                    size_bytes: r.get::<_, i64>(3)? as usize,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(stats)
    }

    /// Entries of one namespace (or all), without bodies
    pub fn entries(&self, namespace: Option<&str>) -> Result<Vec<EntrySummary>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT e.namespace, e.request_key, e.status, e.size_bytes, e.blob_path IS NOT NULL,
                    e.created_at
             FROM cache_entries e
             JOIN cache_namespaces n ON n.name = e.namespace
             WHERE ?1 IS NULL OR e.namespace = ?1
             ORDER BY n.rowid, e.request_key",
        )?;
        let entries = stmt
            .query_map([namespace], |r| {
                Ok(EntrySummary {
                    namespace: r.get(0)?,
                    request_key: r.get(1)?,
                    status: r.get(2)?,
                    size_bytes: r.get::<_, i64>(3)? as usize,
                    is_blob: r.get(4)?,
                    created_at: r.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// Remove every namespace and entry
    pub fn clear_all(&self) -> Result<ClearStats> {
        let conn = self.conn()?;
        let entries: i64 = conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |r| r.get(0))?;
        let namespaces: i64 =
            conn.query_row("SELECT COUNT(*) FROM cache_namespaces", [], |r| r.get(0))?;

        conn.execute_batch("DELETE FROM cache_entries; DELETE FROM cache_namespaces;")?;

        // Clear blobs directory
        if self.blobs_dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(&self.blobs_dir) {
                log::warn!("Failed to clear blobs directory: {}", e);
            }
            std::fs::create_dir_all(&self.blobs_dir)
                .map_err(|e| CacheError::Io(format!("Failed to recreate blobs dir: {}", e)))?;
        }

        Ok(ClearStats {
            namespaces_removed: namespaces as usize,
            entries_removed: entries as usize,
        })
    }

    /// Get cache statistics
    pub fn stats(&self) -> Result<CacheStats> {
        let conn = self.conn()?;

        let namespaces: i64 =
            conn.query_row("SELECT COUNT(*) FROM cache_namespaces", [], |r| r.get(0))?;

        let (total_entries, blob_entries, total_size): (i64, i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(blob_path IS NOT NULL), 0), COALESCE(SUM(size_bytes), 0)
             FROM cache_entries",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )?;

        let (oldest, newest): (Option<i64>, Option<i64>) = conn
            .query_row(
                "SELECT MIN(created_at), MAX(created_at) FROM cache_entries",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?
            .unwrap_or((None, None));

        Ok(CacheStats {
            namespaces: namespaces as usize,
            total_entries: total_entries as usize,
            blob_entries: blob_entries as usize,
            total_size_bytes: total_size as usize,
            oldest_entry: oldest,
            newest_entry: newest,
        })
    }

    /// Write a blob under a name no other put uses, sharded by first 2 chars
    /// of key. The file only appears under its final name once complete.
    fn write_blob(&self, key: &str, data: &[u8]) -> Result<String> {
        let shard = &key[..2.min(key.len())];
        let shard_dir = self.blobs_dir.join(shard);
        std::fs::create_dir_all(&shard_dir)
            .map_err(|e| CacheError::Io(format!("Failed to create shard dir: {}", e)))?;

        let seq = BLOB_SEQ.fetch_add(1, Ordering::Relaxed);
        let stamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let filename = format!("{}-{:x}-{:x}-{}.bin", key, stamp, std::process::id(), seq);
        let rel_path = format!("{}/{}", shard, filename);
        let tmp = shard_dir.join(format!(".{}.tmp", filename));

        let written = (|| -> std::io::Result<()> {
            let mut file = std::fs::File::create(&tmp)?;
            file.write_all(data)?;
            file.sync_all()?;
            std::fs::rename(&tmp, shard_dir.join(&filename))
        })();
        if let Err(e) = written {
            let _ = std::fs::remove_file(&tmp);
            return Err(CacheError::Io(format!("Failed to write blob: {}", e)));
        }

        Ok(rel_path)
    }

    /// Nuke the cache (delete DB and all blobs)
    fn nuke(db_path: &Path, blobs_dir: &Path) -> Result<()> {
        if db_path.exists() {
            std::fs::remove_file(db_path)
                .map_err(|e| CacheError::Io(format!("Failed to remove cache DB: {}", e)))?;
        }
        if blobs_dir.exists() {
            std::fs::remove_dir_all(blobs_dir)
                .map_err(|e| CacheError::Io(format!("Failed to remove blobs dir: {}", e)))?;
        }
        Ok(())
    }
}

#[async_trait]
impl ResponseCache for SqliteResponseCache {
    async fn open(&self, namespace: &str) -> Result<()> {
        let conn = self.conn()?;
        Self::ensure_namespace(&conn, namespace)
    }

    async fn match_in(&self, namespace: &str, key: &str) -> Result<Option<Response>> {
        let conn = self.conn()?;
        let entry = conn
            .query_row(
                "SELECT request_key, status, headers, body, blob_path FROM cache_entries
                 WHERE namespace = ?1 AND request_key = ?2",
                params![namespace, key],
                Self::read_entry,
            )
            .optional()?;

        match entry {
            Some(entry) => self.materialize(&conn, namespace, entry),
            None => Ok(None),
        }
    }

    async fn match_any(&self, key: &str) -> Result<Option<Response>> {
        let conn = self.conn()?;
        let found = conn
            .query_row(
                "SELECT e.namespace, e.request_key, e.status, e.headers, e.body, e.blob_path
                 FROM cache_entries e
                 JOIN cache_namespaces n ON n.name = e.namespace
                 WHERE e.request_key = ?1
                 ORDER BY n.rowid
                 LIMIT 1",
                [key],
                |r| {
                    let namespace: String = r.get(0)?;
                    let entry = StoredEntry {
                        request_key: r.get(1)?,
                        status: r.get(2)?,
                        headers: r.get(3)?,
                        body: r.get(4)?,
                        blob_path: r.get(5)?,
                    };
                    Ok((namespace, entry))
                },
            )
            .optional()?;

        match found {
            Some((namespace, entry)) => self.materialize(&conn, &namespace, entry),
            None => Ok(None),
        }
    }

    async fn put(&self, namespace: &str, key: &str, response: &Response) -> Result<()> {
        self.put_entry(namespace, key, response)
    }

    async fn delete(&self, namespace: &str) -> Result<bool> {
        self.delete_namespace(namespace)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        self.namespace_names()
    }
}

/// Statistics about cache clear operation
#[derive(Debug, Serialize)]
pub struct ClearStats {
    pub namespaces_removed: usize,
    pub entries_removed: usize,
}

/// Statistics about cache state
#[derive(Debug, Serialize)]
pub struct CacheStats {
    pub namespaces: usize,
    pub total_entries: usize,
    pub blob_entries: usize,
    pub total_size_bytes: usize,
    pub oldest_entry: Option<i64>,
    pub newest_entry: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NamespaceStats {
    pub name: String,
    pub created_at: i64,
    pub entries: usize,
    pub size_bytes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntrySummary {
    pub namespace: String,
    pub request_key: String,
    pub status: u16,
    pub size_bytes: usize,
    pub is_blob: bool,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_cache() -> (SqliteResponseCache, TempDir) {
        let dir = TempDir::new().unwrap();
        let cache = SqliteResponseCache::open_at(dir.path()).unwrap();
        (cache, dir)
    }

    fn page(body: &str) -> Response {
        Response::new(200, body).with_header("Content-Type", "text/html")
    }

    #[tokio::test]
    async fn test_put_match_inline() {
        let (cache, _dir) = test_cache();

        cache.put("static", "https://t.test/", &page("home")).await.unwrap();

        let hit = cache.match_in("static", "https://t.test/").await.unwrap().unwrap();
        assert_eq!(hit.text(), "home");
        assert_eq!(hit.header("content-type"), Some("text/html"));
        assert!(cache.match_in("dynamic", "https://t.test/").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_match_blob() {
        let (cache, _dir) = test_cache();
        let body = vec![b'x'; 20_000]; // 20KB - will use blob

        cache
            .put("api", "https://t.test/api", &Response::new(200, body.clone()))
            .await
            .unwrap();

        let hit = cache.match_in("api", "https://t.test/api").await.unwrap().unwrap();
        assert_eq!(hit.body, body);
        assert_eq!(cache.stats().unwrap().blob_entries, 1);
    }

    #[tokio::test]
    async fn test_missing_blob_is_a_miss() {
        let (cache, dir) = test_cache();
        cache
            .put("api", "k", &Response::new(200, vec![b'x'; 20_000]))
            .await
            .unwrap();

        std::fs::remove_dir_all(dir.path().join("blobs")).unwrap();

        assert!(cache.match_in("api", "k").await.unwrap().is_none());
        assert_eq!(cache.stats().unwrap().total_entries, 0);
    }

    #[tokio::test]
    async fn test_put_replaces() {
        let (cache, _dir) = test_cache();
        cache.put("api", "k", &page("old")).await.unwrap();
        cache.put("api", "k", &page("new")).await.unwrap();

        assert_eq!(cache.match_in("api", "k").await.unwrap().unwrap().text(), "new");
        assert_eq!(cache.stats().unwrap().total_entries, 1);
    }

    fn blob_files(dir: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for shard in std::fs::read_dir(dir.join("blobs")).unwrap() {
            for file in std::fs::read_dir(shard.unwrap().path()).unwrap() {
                files.push(file.unwrap().path());
            }
        }
        files
    }

    #[tokio::test]
    async fn test_blob_replace_removes_old_file() {
        let (cache, dir) = test_cache();
        cache.put("api", "k", &Response::new(200, vec![b'a'; 20_000])).await.unwrap();
        cache.put("api", "k", &Response::new(200, vec![b'b'; 20_000])).await.unwrap();

        assert_eq!(blob_files(dir.path()).len(), 1);
        let hit = cache.match_in("api", "k").await.unwrap().unwrap();
        assert!(hit.body.iter().all(|b| *b == b'b'));

        cache.put("api", "k", &page("small")).await.unwrap();
        assert!(blob_files(dir.path()).is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_reads_never_see_partial_blob() {
        let (cache, _dir) = test_cache();
        let cache = std::sync::Arc::new(cache);
        let size = 2 * 1024 * 1024;
        cache.put("api", "k", &Response::new(200, vec![b'a'; size])).await.unwrap();

        let writer = {
            let cache = cache.clone();
            tokio::spawn(async move {
                for i in 0..20 {
                    let fill = if i % 2 == 0 { b'b' } else { b'a' };
                    cache.put("api", "k", &Response::new(200, vec![fill; size])).await.unwrap();
                }
            })
        };

        let mut reads = 0;
        while !writer.is_finished() || reads == 0 {
            let hit = cache.match_in("api", "k").await.unwrap().unwrap();
            assert_eq!(hit.body.len(), size);
            let first = hit.body[0];
            assert!(hit.body.iter().all(|b| *b == first));
            reads += 1;
            tokio::task::yield_now().await;
        }
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_match_any_uses_creation_order() {
        let (cache, _dir) = test_cache();
        cache.open("first").await.unwrap();
        cache.open("second").await.unwrap();
        cache.put("second", "k", &page("from second")).await.unwrap();
        cache.put("first", "k", &page("from first")).await.unwrap();

        let hit = cache.match_any("k").await.unwrap().unwrap();
        assert_eq!(hit.text(), "from first");
        assert!(cache.match_any("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_creates_empty_namespace() {
        let (cache, _dir) = test_cache();
        cache.open("api").await.unwrap();
        cache.open("api").await.unwrap();

        assert_eq!(cache.keys().await.unwrap(), vec!["api"]);
    }

    #[tokio::test]
    async fn test_delete_namespace() {
        let (cache, _dir) = test_cache();
        cache.put("old", "a", &Response::new(200, vec![b'x'; 20_000])).await.unwrap();
        cache.put("new", "a", &page("keep")).await.unwrap();

        assert!(cache.delete("old").await.unwrap());
        assert!(!cache.delete("old").await.unwrap());

        assert_eq!(cache.keys().await.unwrap(), vec!["new"]);
        assert_eq!(cache.match_any("a").await.unwrap().unwrap().text(), "keep");
        assert_eq!(cache.stats().unwrap().blob_entries, 0);
    }

    #[tokio::test]
    async fn test_clear_all() {
        let (cache, _dir) = test_cache();
        cache.put("a", "k1", &page("1")).await.unwrap();
        cache.put("b", "k2", &page("2")).await.unwrap();

        let stats = cache.clear_all().unwrap();
        assert_eq!(stats.entries_removed, 2);
        assert_eq!(stats.namespaces_removed, 2);
        assert!(cache.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_namespace_stats_and_entries() {
        let (cache, _dir) = test_cache();
        cache.open("empty").await.unwrap();
        cache.put("pages", "k1", &page("12345")).await.unwrap();
        cache.put("pages", "k2", &page("123")).await.unwrap();

        let stats = cache.namespace_stats().unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].name, "empty");
        assert_eq!(stats[0].entries, 0);
        assert_eq!(stats[1].entries, 2);
        assert_eq!(stats[1].size_bytes, 8);

        let entries = cache.entries(Some("pages")).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].request_key, "k1");
        assert_eq!(cache.entries(None).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let cache = SqliteResponseCache::open_at(dir.path()).unwrap();
            cache.put("static", "k", &page("persisted")).await.unwrap();
        }
        let cache = SqliteResponseCache::open_at(dir.path()).unwrap();
        assert_eq!(
            cache.match_in("static", "k").await.unwrap().unwrap().text(),
            "persisted"
        );
    }
}
