use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::config;
use crate::crypto::{FieldCipher, TokenSource};
use crate::error::{VaultError, VaultResult};
use crate::store::{Mailstore, Message};
use crate::tokenize::tokenize;

pub(crate) const ROW_COLUMNS: &str =
    "id, sender, recipient, subject, body, is_read, arrival_time, tags";

/// An undecrypted `messages` row as it sits on disk.
pub(crate) struct RawRow {
    pub id: String,
    pub sender: Vec<u8>,
    pub recipient: Vec<u8>,
    pub subject: Vec<u8>,
    pub body: Vec<u8>,
    pub is_read: bool,
    pub arrival_time: String,
    pub tags: String,
}

impl RawRow {
    pub(crate) fn from_row(r: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(RawRow {
            id: r.get(0)?,
            sender: r.get(1)?,
            recipient: r.get(2)?,
            subject: r.get(3)?,
            body: r.get(4)?,
            is_read: r.get(5)?,
            arrival_time: r.get(6)?,
            tags: r.get(7)?,
        })
    }
}

fn init_schema(conn: &Connection) -> VaultResult<()> {
    // auto_vacuum must be set before the schema exists, and FULL is what
    // makes deletions actually shrink the database image; without it the
    // size-bound eviction loop could never terminate by deleting rows.
    conn.execute_batch(&format!(
        "\
PRAGMA auto_vacuum = FULL;\n\
PRAGMA journal_mode = WAL;\n\
PRAGMA synchronous = NORMAL;\n\
PRAGMA busy_timeout = {busy_timeout};\n\
",
        busy_timeout = config::sqlite::PRAGMA_BUSY_TIMEOUT_MS,
    ))?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            id TEXT PRIMARY KEY,
            sender BLOB NOT NULL,
            recipient BLOB NOT NULL,
            subject BLOB,
            body BLOB,
            is_read BOOLEAN NOT NULL DEFAULT 0,
            arrival_time TEXT NOT NULL,
            tags TEXT NOT NULL DEFAULT '[]'
        );

        CREATE TABLE IF NOT EXISTS tokens (
            message_id TEXT NOT NULL,
            token_hash TEXT NOT NULL,
            token_source TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tokens_hash ON tokens(token_hash);
        CREATE INDEX IF NOT EXISTS idx_tokens_message ON tokens(message_id);
        "#,
    )?;

    Ok(())
}

fn logical_size(conn: &Connection) -> VaultResult<u64> {
    let page_count: i64 = conn.pragma_query_value(None, "page_count", |r| r.get(0))?;
    let page_size: i64 = conn.pragma_query_value(None, "page_size", |r| r.get(0))?;
    Ok((page_count * page_size) as u64)
}

impl Mailstore {
    /// Open (or create) the mailstore at `db_path`.
    pub fn open(db_path: &Path, cipher: FieldCipher, max_size_bytes: u64) -> VaultResult<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        init_schema(&conn)?;

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM messages", [], |r| r.get(0))?;
        log::info!(
            "Mailstore opened: {} ({} messages, bound {} bytes)",
            db_path.display(),
            count,
            max_size_bytes
        );

        Ok(Mailstore {
            conn: Mutex::new(conn),
            cipher,
            max_size_bytes,
        })
    }

    /// Number of stored messages.
    pub fn count(&self) -> VaultResult<u64> {
        let conn = self.conn.lock().unwrap();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM messages", [], |r| r.get(0))?;
        Ok(n as u64)
    }

    /// Insert a new message under a freshly allocated id. Returns the id.
    #[allow(clippy::too_many_arguments)]
    pub fn insert(
        &self,
        sender: &str,
        recipient: &str,
        subject: &str,
        body: &str,
        arrival_time: &str,
        tags: &[String],
    ) -> VaultResult<String> {
        let id = super::new_message_id();
        self.insert_with_id(&id, sender, recipient, subject, body, arrival_time, tags)?;
        Ok(id)
    }

    /// Insert a message under a caller-supplied id (the indexer worker path:
    /// the ingestor has already allocated it).
    ///
    /// The encrypted row and its full token set commit in one transaction;
    /// a duplicate id is rejected before anything is written. After commit
    /// the size-bound eviction loop runs.
    #[allow(clippy::too_many_arguments)]
    pub fn insert_with_id(
        &self,
        id: &str,
        sender: &str,
        recipient: &str,
        subject: &str,
        body: &str,
        arrival_time: &str,
        tags: &[String],
    ) -> VaultResult<()> {
        let enc_sender = self.cipher.encrypt(sender)?;
        let enc_recipient = self.cipher.encrypt(recipient)?;
        let enc_subject = self.cipher.encrypt(subject)?;
        let enc_body = self.cipher.encrypt(body)?;
        let tags_json = serde_json::to_string(tags)?;

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let exists: Option<i64> = tx
            .query_row("SELECT 1 FROM messages WHERE id = ?1", params![id], |r| {
                r.get(0)
            })
            .optional()?;
        if exists.is_some() {
            return Err(VaultError::DuplicateId(id.to_string()));
        }

        tx.execute(
            "INSERT INTO messages (id, sender, recipient, subject, body, is_read, arrival_time, tags)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7)",
            params![
                id,
                enc_sender,
                enc_recipient,
                enc_subject,
                enc_body,
                arrival_time,
                tags_json
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO tokens (message_id, token_hash, token_source) VALUES (?1, ?2, ?3)",
            )?;
            let fields = [
                (TokenSource::Sender, sender),
                (TokenSource::Recipient, recipient),
                (TokenSource::Subject, subject),
                (TokenSource::Body, body),
            ];
            for (source, text) in fields {
                for token in tokenize(text) {
                    let hash = self.cipher.token_hash(source, &token);
                    stmt.execute(params![id, hash, source.as_str()])?;
                }
            }
        }

        tx.commit()?;
        log::debug!("Inserted message {id}");

        self.enforce_max_size(&mut conn, id)
    }

    /// Fetch and decrypt one message (full body, no snippet). Returns
    /// `None` for a missing id, a failed recipient filter, or a row that no
    /// longer authenticates (logged, retained on disk).
    pub fn get(&self, id: &str, recipient_filter: Option<&str>) -> VaultResult<Option<Message>> {
        let conn = self.conn.lock().unwrap();

        let mut sql = format!("SELECT {ROW_COLUMNS} FROM messages WHERE id = ?1");
        let mut bind: Vec<rusqlite::types::Value> = vec![id.to_string().into()];
        if let Some(username) = recipient_filter {
            sql.push_str(&recipient_scope_sql(2));
            bind.push(self.recipient_scope_hash(username).into());
        }

        let raw = conn
            .query_row(&sql, rusqlite::params_from_iter(bind.iter()), RawRow::from_row)
            .optional()?;
        let Some(raw) = raw else { return Ok(None) };

        match self.decrypt_row(raw, true) {
            Ok(msg) => Ok(Some(msg)),
            Err(VaultError::Crypto(e)) => {
                log::error!("Failed to decrypt message {id}: {e}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Set the read flag. Returns whether a row changed.
    pub fn mark_read(
        &self,
        id: &str,
        recipient_filter: Option<&str>,
        read: bool,
    ) -> VaultResult<bool> {
        let conn = self.conn.lock().unwrap();

        let mut sql = "UPDATE messages SET is_read = ?1 WHERE id = ?2".to_string();
        let mut bind: Vec<rusqlite::types::Value> =
            vec![(read as i64).into(), id.to_string().into()];
        if let Some(username) = recipient_filter {
            sql.push_str(&recipient_scope_sql(3));
            bind.push(self.recipient_scope_hash(username).into());
        }

        let changed = conn.execute(&sql, rusqlite::params_from_iter(bind.iter()))?;
        Ok(changed > 0)
    }

    /// Delete a message and all of its token rows atomically. Returns
    /// whether a row was removed.
    pub fn delete(&self, id: &str, recipient_filter: Option<&str>) -> VaultResult<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut sql = "DELETE FROM messages WHERE id = ?1".to_string();
        let mut bind: Vec<rusqlite::types::Value> = vec![id.to_string().into()];
        if let Some(username) = recipient_filter {
            sql.push_str(&recipient_scope_sql(2));
            bind.push(self.recipient_scope_hash(username).into());
        }

        let changed = tx.execute(&sql, rusqlite::params_from_iter(bind.iter()))?;
        if changed > 0 {
            tx.execute("DELETE FROM tokens WHERE message_id = ?1", params![id])?;
        }
        tx.commit()?;

        if changed > 0 {
            log::info!("Deleted message {id}");
        }
        Ok(changed > 0)
    }

    /// Decrypt a raw row into the API shape. `include_body` selects the
    /// full body (get) versus the snippet (list results).
    pub(crate) fn decrypt_row(&self, raw: RawRow, include_body: bool) -> VaultResult<Message> {
        let sender = self.cipher.decrypt(&raw.sender)?;
        let recipient = self.cipher.decrypt(&raw.recipient)?;
        let subject = self.cipher.decrypt(&raw.subject)?;
        let body = self.cipher.decrypt(&raw.body)?;
        let tags: Vec<String> = serde_json::from_str(&raw.tags)?;
        let size_bytes = body.len();

        let (body, body_snippet) = if include_body {
            (Some(body), None)
        } else {
            (None, Some(super::query::body_snippet(&body)))
        };

        Ok(Message {
            id: raw.id,
            sender,
            recipient,
            subject,
            body,
            body_snippet,
            is_read: raw.is_read,
            arrival_time: raw.arrival_time,
            tags,
            size_bytes,
        })
    }

    /// Recipient scoping goes through the token index: the full recipient
    /// address, its local part, and its domain are all recipient-source
    /// tokens, so a username matches whichever form the caller knows.
    /// Equality against the encrypted column cannot work: every encryption
    /// carries a fresh nonce.
    pub(crate) fn recipient_scope_hash(&self, username: &str) -> String {
        self.cipher
            .token_hash(TokenSource::Recipient, username.trim().to_lowercase().as_str())
    }

    /// While the database image exceeds the bound, drop the message with
    /// the smallest arrival_time (and its tokens) one transaction at a
    /// time. The just-inserted message is never evicted.
    fn enforce_max_size(&self, conn: &mut Connection, protect_id: &str) -> VaultResult<()> {
        loop {
            let size = logical_size(conn)?;
            if size <= self.max_size_bytes {
                return Ok(());
            }

            let oldest: Option<String> = conn
                .query_row(
                    "SELECT id FROM messages ORDER BY arrival_time ASC LIMIT 1",
                    [],
                    |r| r.get(0),
                )
                .optional()?;
            let Some(oldest) = oldest else { return Ok(()) };
            if oldest == protect_id {
                log::warn!(
                    "Store still over size bound ({size} > {}) with only the newest message left",
                    self.max_size_bytes
                );
                return Ok(());
            }

            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute("DELETE FROM messages WHERE id = ?1", params![oldest])?;
            tx.execute("DELETE FROM tokens WHERE message_id = ?1", params![oldest])?;
            tx.commit()?;
            log::info!("Evicted oldest message {oldest} ({size} bytes > bound)");
        }
    }
}

/// `AND` fragment restricting a statement to messages carrying the given
/// recipient token hash. `param_idx` is the 1-based placeholder index.
fn recipient_scope_sql(param_idx: usize) -> String {
    format!(
        " AND EXISTS (SELECT 1 FROM tokens t \
         WHERE t.message_id = messages.id AND t.token_hash = ?{param_idx})"
    )
}
