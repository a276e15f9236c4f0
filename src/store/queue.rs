//! SQLite-backed durable queue for deferred requests

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{Connection, params};

use crate::error::QueueError;
use crate::worker::ports::DurableQueue;
use crate::worker::queue::{NewTask, QueueKind, QueuedTask};

type Result<T> = std::result::Result<T, QueueError>;

/// Two tables, one per [`QueueKind`], each with an auto-increment id and a
/// timestamp index for ordered replay.
pub struct SqliteQueue {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteQueue {
    /// Open or create the queue at the default XDG data location
    pub fn open() -> Result<Self> {
        Self::open_at(&Self::default_path()?)
    }

    /// ~/.local/share/trademore/offline-queue.db on Linux
    pub fn default_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir().ok_or(QueueError::NoHome)?;
        Ok(data_dir.join("trademore").join("offline-queue.db"))
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| QueueError::Io(format!("Failed to create queue dir: {}", e)))?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;

        for kind in QueueKind::ALL {
            let table = kind.table();
            conn.execute_batch(&format!(
                r#"
                CREATE TABLE IF NOT EXISTS {table} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    url TEXT NOT NULL,
                    payload BLOB NOT NULL,
                    headers TEXT NOT NULL,
                    timestamp INTEGER NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_{table}_timestamp ON {table}(timestamp);
                "#
            ))?;
        }

        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| QueueError::Io("queue connection lock poisoned".to_string()))
    }

    fn insert(&self, task: &NewTask) -> Result<i64> {
        let headers = serde_json::to_string(&task.headers)
            .map_err(|e| QueueError::Io(format!("Failed to encode headers: {}", e)))?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            &format!(
                "INSERT INTO {} (url, payload, headers, timestamp) VALUES (?1, ?2, ?3, ?4)",
                task.kind.table()
            ),
            params![
                task.url,
                task.payload,
                headers,
                task.created_at.timestamp_millis()
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(id)
    }

    fn select(&self, kind: QueueKind) -> Result<Vec<QueuedTask>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT id, url, payload, headers, timestamp FROM {} ORDER BY timestamp, id",
            kind.table()
        ))?;

        let rows = stmt.query_map([], |r| {
            Ok((
                r.get::<_, i64>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, Vec<u8>>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, i64>(4)?,
            ))
        })?;

        // A damaged row must not hide the rest of the queue.
        let mut tasks = Vec::new();
        for row in rows {
            let (id, url, payload, headers, timestamp) = match row {
                Ok(row) => row,
                Err(e) => {
                    log::warn!("Skipping unreadable {} row: {}", kind.table(), e);
                    continue;
                }
            };
            let headers: BTreeMap<String, String> = match serde_json::from_str(&headers) {
                Ok(headers) => headers,
                Err(e) => {
                    log::warn!("Task {} has bad headers, replaying without them: {}", id, e);
                    BTreeMap::new()
                }
            };
            tasks.push(QueuedTask {
                id,
                kind,
                url,
                payload,
                headers,
                created_at: from_millis(timestamp),
            });
        }
        Ok(tasks)
    }

    fn remove(&self, kind: QueueKind, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", kind.table()),
            [id],
        )?;
        Ok(deleted > 0)
    }

    /// Queued tasks of one kind
    pub fn count(&self, kind: QueueKind) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", kind.table()),
            [],
            |r| r.get(0),
        )?;
        Ok(count as usize)
    }

    /// Drop every task of one kind, returning how many were removed
    pub fn clear(&self, kind: QueueKind) -> Result<usize> {
        let conn = self.conn()?;
        let deleted = conn.execute(&format!("DELETE FROM {}", kind.table()), [])?;
        Ok(deleted)
    }
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
}

#[async_trait]
impl DurableQueue for SqliteQueue {
    async fn add(&self, task: &NewTask) -> Result<i64> {
        self.insert(task)
    }

    async fn list(&self, kind: QueueKind) -> Result<Vec<QueuedTask>> {
        self.select(kind)
    }

    async fn delete(&self, kind: QueueKind, id: i64) -> Result<bool> {
        self.remove(kind, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn test_queue() -> (SqliteQueue, TempDir) {
        let dir = TempDir::new().unwrap();
        let queue = SqliteQueue::open_at(&dir.path().join("queue.db")).unwrap();
        (queue, dir)
    }

    #[tokio::test]
    async fn test_add_list_ordered_by_timestamp() {
        let (queue, _dir) = test_queue();
        let now = Utc::now();

        let late = queue
            .add(&NewTask::new(QueueKind::Forms, "/api/contact", "t2").at(now))
            .await
            .unwrap();
        let early = queue
            .add(
                &NewTask::new(QueueKind::Forms, "/api/contact", "t1")
                    .at(now - ChronoDuration::seconds(5)),
            )
            .await
            .unwrap();

        let tasks = queue.list(QueueKind::Forms).await.unwrap();
        assert_eq!(
            tasks.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![early, late]
        );
        assert_eq!(tasks[0].payload_text(), "t1");
    }

    #[tokio::test]
    async fn test_delete_leaves_the_rest() {
        let (queue, _dir) = test_queue();
        let t1 = queue
            .add(&NewTask::new(QueueKind::Forms, "/a", "1"))
            .await
            .unwrap();
        let t2 = queue
            .add(&NewTask::new(QueueKind::Forms, "/a", "2"))
            .await
            .unwrap();

        assert!(queue.delete(QueueKind::Forms, t1).await.unwrap());
        assert!(!queue.delete(QueueKind::Forms, t1).await.unwrap());

        let tasks = queue.list(QueueKind::Forms).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, t2);
    }

    #[tokio::test]
    async fn test_kinds_are_separate_tables() {
        let (queue, _dir) = test_queue();
        queue
            .add(&NewTask::new(QueueKind::Forms, "/a", "form"))
            .await
            .unwrap();
        queue
            .add(&NewTask::new(QueueKind::Analytics, "/api/analytics", "{}"))
            .await
            .unwrap();

        assert_eq!(queue.count(QueueKind::Forms).unwrap(), 1);
        assert_eq!(queue.count(QueueKind::Analytics).unwrap(), 1);
        assert_eq!(queue.clear(QueueKind::Forms).unwrap(), 1);
        assert_eq!(queue.count(QueueKind::Analytics).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_headers_and_timestamp_round_trip() {
        let (queue, _dir) = test_queue();
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        queue
            .add(
                &NewTask::new(QueueKind::Forms, "/a", vec![0u8, 159, 146])
                    .with_header("content-type", "application/octet-stream")
                    .at(at),
            )
            .await
            .unwrap();

        let task = &queue.list(QueueKind::Forms).await.unwrap()[0];
        assert_eq!(task.created_at, at);
        assert_eq!(task.payload, vec![0u8, 159, 146]);
        assert_eq!(task.headers["content-type"], "application/octet-stream");
    }

    #[tokio::test]
    async fn test_ids_survive_reopen_and_never_reuse() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queue.db");
        let first = {
            let queue = SqliteQueue::open_at(&path).unwrap();
            let id = queue
                .add(&NewTask::new(QueueKind::Forms, "/a", "1"))
                .await
                .unwrap();
            queue.delete(QueueKind::Forms, id).await.unwrap();
            id
        };

        let queue = SqliteQueue::open_at(&path).unwrap();
        let second = queue
            .add(&NewTask::new(QueueKind::Forms, "/a", "2"))
            .await
            .unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_concurrent_adds_get_distinct_ids() {
        let (queue, _dir) = test_queue();
        let queue = Arc::new(queue);

        let mut handles = Vec::new();
        for i in 0..10 {
            let queue = queue.clone();
            handles.push(tokio::spawn(async move {
                queue
                    .add(&NewTask::new(QueueKind::Analytics, "/api/analytics", i.to_string()))
                    .await
                    .unwrap()
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 10);
        assert_eq!(queue.count(QueueKind::Analytics).unwrap(), 10);
    }

    #[tokio::test]
    async fn test_damaged_rows_do_not_hide_the_rest() {
        let (queue, _dir) = test_queue();
        let bad_headers = queue
            .add(&NewTask::new(QueueKind::Forms, "/a", "1").with_header("X-Trace", "1"))
            .await
            .unwrap();
        let bad_url = queue
            .add(&NewTask::new(QueueKind::Forms, "/b", "2"))
            .await
            .unwrap();
        let good = queue
            .add(&NewTask::new(QueueKind::Forms, "/c", "3"))
            .await
            .unwrap();

        {
            let conn = queue.conn().unwrap();
            conn.execute(
                "UPDATE queued_forms SET headers = 'not json' WHERE id = ?1",
                [bad_headers],
            )
            .unwrap();
            conn.execute(
                "UPDATE queued_forms SET url = X'00FF' WHERE id = ?1",
                [bad_url],
            )
            .unwrap();
        }

        let tasks = queue.list(QueueKind::Forms).await.unwrap();
        assert_eq!(
            tasks.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![bad_headers, good]
        );
        assert!(tasks[0].headers.is_empty());
        assert_eq!(tasks[0].url, "/a");
        assert_eq!(tasks[1].payload_text(), "3");
    }
}
