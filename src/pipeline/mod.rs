//! Arrival pipeline: the ingestor that feeds the hand-off queue and the
//! indexer worker that drains it into the mailstore.

pub mod ingest;
pub mod worker;

use serde::{Deserialize, Serialize};

/// Queue wire format (JSON, UTF-8). This is what the ingestor enqueues and
/// the worker decodes; at-least-once delivery means the worker may see the
/// same envelope twice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub id: String,
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub arrival_time: String,
    pub is_read: bool,
    pub tags: Vec<String>,
    pub size_bytes: usize,
}

/// Arrival notice published to subscribers (JSON, UTF-8). A hint only:
/// delivery may race the durable insert, so clients re-query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrivalNotice {
    pub id: String,
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub status: String,
    pub arrival_time: String,
}

pub const NOTICE_STATUS_RECEIVED: &str = "received";
