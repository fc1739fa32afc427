use thiserror::Error;

/// Error kinds for the mailstore core.
///
/// Each variant carries a distinct handling policy:
///
/// - `Crypto`: AEAD authentication failed; the affected row is logged and
///   skipped, never returned.
/// - `DuplicateId`: an insert hit an existing id; the worker logs and drops
///   the payload (it is a retransmission).
/// - `Queue`: transient enqueue/dequeue failure; the ingestor propagates it
///   so the SMTP collaborator can return a transient failure to the MTA.
/// - `Config`: missing or malformed configuration; fatal at startup.
/// - `Decode`: malformed JSON dequeued; logged and dropped.
///
/// "Not found" is never an error: lookups return `Option`/`bool`.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("field decryption failed: {0}")]
    Crypto(String),
    #[error("duplicate message id: {0}")]
    DuplicateId(String),
    #[error("queue error: {0}")]
    Queue(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Db(#[from] rusqlite::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type VaultResult<T> = Result<T, VaultError>;
