//! Encrypted mailstore with tokenized search.
//!
//! `db.rs` owns the on-disk schema, the write path, and eviction; `query.rs`
//! owns search planning (query text to token hashes) and page shaping. The
//! store holds one long-lived connection behind a mutex, so a single writer
//! at a time spans the message insert, the token bulk insert, and any
//! cascade delete.

pub mod db;
pub mod query;

pub use query::{QueryFilter, SortDir, SortKey};

use std::sync::Mutex;

use rusqlite::Connection;
use serde::Serialize;

use crate::config;
use crate::crypto::FieldCipher;

/// A fully decrypted message, shaped for the API collaborator.
///
/// List results carry `body_snippet` and omit `body`; `get` carries the full
/// `body` and omits the snippet.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: String,
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_snippet: Option<String>,
    pub is_read: bool,
    pub arrival_time: String,
    pub tags: Vec<String>,
    pub size_bytes: usize,
}

/// One page of query results, matching the collaborator API shape exactly.
#[derive(Debug, Clone, Serialize)]
pub struct MessagePage {
    pub items: Vec<Message>,
    pub total_items: u64,
    pub total_pages: u64,
    pub current_page: u64,
    pub page_size: u64,
}

pub struct Mailstore {
    conn: Mutex<Connection>,
    cipher: FieldCipher,
    max_size_bytes: u64,
}

/// Allocate a message id: 23 URL-safe chars from a dash-stripped hex UUID.
pub fn new_message_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    hex[..config::store::MESSAGE_ID_LEN].to_string()
}
