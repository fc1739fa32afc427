//! Durable hand-off queue and arrival-notification fan-out.
//!
//! The queue decouples SMTP ingest latency from indexing cost: the ingestor
//! appends envelopes, the worker drains them. It lives in its own SQLite
//! database file, so enqueued envelopes survive a process restart and both
//! the SMTP server and the worker can open it. The notification bus is a
//! separate, best-effort in-process fan-out and never a source of truth;
//! subscribers treat a notice as a hint and re-query for durable state.

use std::collections::HashMap;
use std::path::Path;
use std::sync::mpsc;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::config;
use crate::error::{VaultError, VaultResult};

fn qerr(e: impl std::fmt::Display) -> VaultError {
    VaultError::Queue(e.to_string())
}

/// Durable FIFO. Envelopes are committed on enqueue and removed on dequeue.
pub struct HandoffQueue {
    conn: Mutex<Connection>,
    queue_name: String,
    closed: Mutex<bool>,
    signal: Condvar,
}

impl HandoffQueue {
    pub fn open(path: &Path, queue_name: &str) -> VaultResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path).map_err(qerr)?;
        conn.execute_batch(&format!(
            "\
PRAGMA journal_mode = WAL;\n\
PRAGMA synchronous = NORMAL;\n\
PRAGMA busy_timeout = {busy_timeout};\n\
",
            busy_timeout = config::sqlite::PRAGMA_BUSY_TIMEOUT_MS,
        ))
        .map_err(qerr)?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS queue (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                queue_name TEXT NOT NULL,
                payload TEXT NOT NULL,
                enqueued_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_queue_name_seq ON queue(queue_name, seq);
            "#,
        )
        .map_err(qerr)?;

        let backlog: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM queue WHERE queue_name = ?1",
                params![queue_name],
                |r| r.get(0),
            )
            .map_err(qerr)?;
        log::info!(
            "Hand-off queue '{queue_name}' opened at {} ({backlog} pending)",
            path.display()
        );

        Ok(HandoffQueue {
            conn: Mutex::new(conn),
            queue_name: queue_name.to_string(),
            closed: Mutex::new(false),
            signal: Condvar::new(),
        })
    }

    /// Append to the tail. Durable once this returns.
    pub fn enqueue(&self, payload: &str) -> VaultResult<()> {
        {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO queue (queue_name, payload, enqueued_at) VALUES (?1, ?2, ?3)",
                params![self.queue_name, payload, Utc::now().to_rfc3339()],
            )
            .map_err(qerr)?;
        }
        self.signal.notify_all();
        Ok(())
    }

    /// Remove and return the head, blocking until one is available.
    /// Returns `Ok(None)` once the queue has been closed; in-process
    /// enqueues wake blocked callers immediately, cross-process producers
    /// are picked up on the poll interval.
    pub fn dequeue_blocking(&self) -> VaultResult<Option<String>> {
        loop {
            if *self.closed.lock().unwrap() {
                return Ok(None);
            }
            if let Some(payload) = self.try_dequeue()? {
                return Ok(Some(payload));
            }

            let guard = self.closed.lock().unwrap();
            if *guard {
                return Ok(None);
            }
            let (guard, _) = self
                .signal
                .wait_timeout(
                    guard,
                    Duration::from_millis(config::queue::DEQUEUE_POLL_INTERVAL_MS),
                )
                .unwrap();
            drop(guard);
        }
    }

    /// Non-blocking head removal.
    pub fn try_dequeue(&self) -> VaultResult<Option<String>> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(qerr)?;

        let head: Option<(i64, String)> = tx
            .query_row(
                "SELECT seq, payload FROM queue WHERE queue_name = ?1 ORDER BY seq ASC LIMIT 1",
                params![self.queue_name],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()
            .map_err(qerr)?;

        match head {
            Some((seq, payload)) => {
                tx.execute("DELETE FROM queue WHERE seq = ?1", params![seq])
                    .map_err(qerr)?;
                tx.commit().map_err(qerr)?;
                Ok(Some(payload))
            }
            None => Ok(None),
        }
    }

    /// Number of pending envelopes.
    pub fn pending(&self) -> VaultResult<u64> {
        let conn = self.conn.lock().unwrap();
        let n: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM queue WHERE queue_name = ?1",
                params![self.queue_name],
                |r| r.get(0),
            )
            .map_err(qerr)?;
        Ok(n as u64)
    }

    /// Wake every blocked dequeuer and make all future dequeues return
    /// `None`. Pending envelopes stay on disk for the next run.
    pub fn close(&self) {
        *self.closed.lock().unwrap() = true;
        self.signal.notify_all();
        log::info!("Hand-off queue '{}' closed", self.queue_name);
    }
}

/// Best-effort pub/sub for arrival notices. Per-subscriber delivery
/// cursors; late subscribers miss earlier messages; a dropped subscriber is
/// pruned on the next publish to its channel.
pub struct NotifyBus {
    channels: Mutex<HashMap<String, Vec<mpsc::Sender<String>>>>,
}

impl NotifyBus {
    pub fn new() -> Self {
        NotifyBus {
            channels: Mutex::new(HashMap::new()),
        }
    }

    pub fn subscribe(&self, channel: &str) -> Subscription {
        let (tx, rx) = mpsc::channel();
        self.channels
            .lock()
            .unwrap()
            .entry(channel.to_string())
            .or_default()
            .push(tx);
        Subscription { rx }
    }

    /// Deliver to current subscribers of `channel`. Returns how many
    /// received it.
    pub fn publish(&self, channel: &str, payload: &str) -> usize {
        let mut channels = self.channels.lock().unwrap();
        let Some(subs) = channels.get_mut(channel) else {
            return 0;
        };
        subs.retain(|tx| tx.send(payload.to_string()).is_ok());
        let delivered = subs.len();
        if subs.is_empty() {
            channels.remove(channel);
        }
        delivered
    }
}

impl Default for NotifyBus {
    fn default() -> Self {
        Self::new()
    }
}

/// One subscriber's view of a channel, in publish order.
pub struct Subscription {
    rx: mpsc::Receiver<String>,
}

impl Subscription {
    pub fn try_recv(&self) -> Option<String> {
        self.rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<String> {
        self.rx.recv_timeout(timeout).ok()
    }
}

/// Channel name for a recipient's arrival notices.
pub fn notify_channel(prefix: &str, recipient: &str) -> String {
    format!("{prefix}{recipient}")
}
