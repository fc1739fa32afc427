// IMPORTANT:
// Keep ALL numeric values centralized here (repo rule: no hardcoded numeric
// values scattered around).

use std::env;
use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::error::{VaultError, VaultResult};

pub mod logging {
    pub const LOG_DIR: &str = "logs";
    pub const LOG_FILE_BASENAME: &str = "worker";

    pub const LOG_ROTATE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
    pub const LOG_ROTATE_KEEP_FILES: usize = 5;
}

pub mod sqlite {
    pub const PRAGMA_BUSY_TIMEOUT_MS: i64 = 2000;
}

pub mod crypto {
    pub const FIELD_KEY_LEN: usize = 32;
    pub const NONCE_LEN: usize = 12;

    /// Salt and cost for deriving the token-hashing key from the field key.
    /// Changing either invalidates every stored token hash.
    pub const TOKEN_KEY_SALT: &[u8] = b"search_tokens";
    pub const PBKDF2_ITERATIONS: u32 = 100_000;

    /// Token hashes are truncated to 64 bits. False-positive candidate
    /// matches are possible and tolerated: the candidate set is a superset
    /// and page materialization decrypts the real rows.
    pub const TOKEN_HASH_HEX_LEN: usize = 16;
}

pub mod store {
    pub const DEFAULT_DB_PATH: &str = "data/emails.db";
    pub const DEFAULT_MAX_SIZE_MB: u64 = 1024;

    pub const MESSAGE_ID_LEN: usize = 23;
    pub const SNIPPET_MAX_CHARS: usize = 100;
}

pub mod queue {
    pub const DEFAULT_ENDPOINT: &str = "data/queue.db";
    pub const DEFAULT_QUEUE_NAME: &str = "smtp_emails";
    pub const DEFAULT_NOTIFY_PREFIX: &str = "email_notify:";

    /// Cross-process producers cannot signal our condvar, so blocked
    /// dequeues re-poll at this interval.
    pub const DEQUEUE_POLL_INTERVAL_MS: u64 = 250;
}

/// Immutable runtime settings, built once at startup and passed to the
/// mailstore and pipeline constructors. No process-cached singletons.
#[derive(Clone)]
pub struct Settings {
    /// 32-byte AEAD key for field encryption (the token key is derived
    /// from it).
    pub field_key: [u8; crypto::FIELD_KEY_LEN],
    pub db_path: PathBuf,
    pub max_size_bytes: u64,
    pub queue_endpoint: PathBuf,
    pub queue_name: String,
    pub notify_prefix: String,
}

impl Settings {
    /// Load settings from the environment. Unknown variables are ignored.
    ///
    /// `FIELD_KEY` is required; a missing or malformed key is a hard error
    /// so the appliance never starts with an ephemeral key and silently
    /// strands its data.
    pub fn from_env() -> VaultResult<Self> {
        let key_b64 = env::var("FIELD_KEY").map_err(|_| {
            VaultError::Config(
                "FIELD_KEY environment variable is required \
                 (base64-encoded 32-byte key; generate with: openssl rand -base64 32)"
                    .into(),
            )
        })?;
        let field_key = decode_field_key(&key_b64)?;

        let max_size_mb = env_u64("MAX_SIZE_MB", store::DEFAULT_MAX_SIZE_MB)?;

        Ok(Settings {
            field_key,
            db_path: PathBuf::from(env_string("DB_PATH", store::DEFAULT_DB_PATH)),
            max_size_bytes: max_size_mb * 1024 * 1024,
            queue_endpoint: PathBuf::from(env_string("QUEUE_ENDPOINT", queue::DEFAULT_ENDPOINT)),
            queue_name: env_string("QUEUE_NAME", queue::DEFAULT_QUEUE_NAME),
            notify_prefix: env_string("NOTIFY_PREFIX", queue::DEFAULT_NOTIFY_PREFIX),
        })
    }
}

/// Decode a base64 field key, enforcing the exact key length.
pub fn decode_field_key(b64: &str) -> VaultResult<[u8; crypto::FIELD_KEY_LEN]> {
    let bytes = BASE64
        .decode(b64.trim())
        .map_err(|e| VaultError::Config(format!("FIELD_KEY is not valid base64: {e}")))?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| {
        VaultError::Config(format!(
            "FIELD_KEY must decode to {} bytes, got {len}",
            crypto::FIELD_KEY_LEN
        ))
    })
}

fn env_string(name: &str, default: &str) -> String {
    match env::var(name) {
        Ok(v) if !v.is_empty() => v,
        _ => default.to_string(),
    }
}

fn env_u64(name: &str, default: u64) -> VaultResult<u64> {
    match env::var(name) {
        Ok(v) if !v.is_empty() => v
            .trim()
            .parse::<u64>()
            .map_err(|_| VaultError::Config(format!("{name} must be an integer, got '{v}'"))),
        _ => Ok(default),
    }
}
