use std::sync::Arc;

use chrono::{SecondsFormat, Utc};

use crate::pipeline::{ArrivalNotice, Envelope, NOTICE_STATUS_RECEIVED};
use crate::queue::{notify_channel, HandoffQueue, NotifyBus};
use crate::store::new_message_id;
use crate::VaultResult;

/// A MIME message already reduced by the SMTP collaborator to a tagged
/// shape: either one part, or a flat list of parts.
#[derive(Debug, Clone)]
pub enum ParsedMessage {
    Singlepart {
        content_type: String,
        charset: Option<String>,
        payload: Vec<u8>,
    },
    Multipart { parts: Vec<MessagePart> },
}

#[derive(Debug, Clone)]
pub struct MessagePart {
    pub content_type: String,
    pub charset: Option<String>,
    pub payload: Vec<u8>,
}

impl ParsedMessage {
    /// Reduce to a single text body: prefer the first `text/plain` part,
    /// fall back to the first `text/html` part kept verbatim, else empty.
    pub fn body_text(&self) -> String {
        match self {
            ParsedMessage::Singlepart {
                charset, payload, ..
            } => decode_payload(payload, charset.as_deref()),
            ParsedMessage::Multipart { parts } => {
                let mut html: Option<&MessagePart> = None;
                for part in parts {
                    if part.content_type.eq_ignore_ascii_case("text/plain") {
                        return decode_payload(&part.payload, part.charset.as_deref());
                    }
                    if part.content_type.eq_ignore_ascii_case("text/html") && html.is_none() {
                        html = Some(part);
                    }
                }
                html.map(|p| decode_payload(&p.payload, p.charset.as_deref()))
                    .unwrap_or_default()
            }
        }
    }
}

/// Decode using the declared charset when we know it, UTF-8 with lossy
/// replacement otherwise.
fn decode_payload(payload: &[u8], charset: Option<&str>) -> String {
    match charset.and_then(|label| encoding_rs::Encoding::for_label(label.as_bytes())) {
        Some(encoding) => encoding.decode(payload).0.into_owned(),
        None => String::from_utf8_lossy(payload).into_owned(),
    }
}

/// Current UTC time, ISO-8601 with millisecond resolution. Fixed-width and
/// zone-suffixed, so stored timestamps sort lexicographically.
pub fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Ingest side of the pipeline, called synchronously from the SMTP
/// collaborator's message handler. Talks only to the queue and the bus;
/// it never opens the mailstore.
pub struct Ingestor {
    queue: Arc<HandoffQueue>,
    bus: Arc<NotifyBus>,
    notify_prefix: String,
}

impl Ingestor {
    pub fn new(queue: Arc<HandoffQueue>, bus: Arc<NotifyBus>, notify_prefix: &str) -> Self {
        Ingestor {
            queue,
            bus,
            notify_prefix: notify_prefix.to_string(),
        }
    }

    /// Accept one parsed message: allocate its id, enqueue the envelope,
    /// publish the arrival notice. Returns the allocated id.
    ///
    /// An enqueue failure propagates so the SMTP collaborator can answer
    /// the MTA with a transient failure and get a retry; a publish failure
    /// is logged and swallowed (notifications are best-effort).
    pub fn ingest(
        &self,
        sender: &str,
        recipient: &str,
        subject: &str,
        message: &ParsedMessage,
    ) -> VaultResult<String> {
        let id = new_message_id();
        let body = message.body_text();
        let size_bytes = body.len();
        let arrival_time = now_utc_iso();

        let envelope = Envelope {
            id: id.clone(),
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body,
            arrival_time: arrival_time.clone(),
            is_read: false,
            tags: vec![],
            size_bytes,
        };

        self.queue.enqueue(&serde_json::to_string(&envelope)?)?;

        let notice = ArrivalNotice {
            id: id.clone(),
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            status: NOTICE_STATUS_RECEIVED.to_string(),
            arrival_time,
        };
        match serde_json::to_string(&notice) {
            Ok(payload) => {
                let channel = notify_channel(&self.notify_prefix, recipient);
                let delivered = self.bus.publish(&channel, &payload);
                log::debug!("Arrival notice for {id} delivered to {delivered} subscriber(s)");
            }
            Err(e) => log::error!("Failed to encode arrival notice for {id}: {e}"),
        }

        log::info!("Message {id} received: {sender} -> {recipient}");
        log::info!("Subject: {subject}");
        Ok(id)
    }
}
