use crate::error::VaultError;
use crate::pipeline::Envelope;
use crate::queue::HandoffQueue;
use crate::store::Mailstore;
use crate::VaultResult;

/// Indexer worker loop: drain the hand-off queue into the mailstore until
/// the queue is closed.
///
/// Delivery is at-least-once, so a retransmitted envelope shows up as a
/// `DuplicateId`: logged and dropped, never fatal. A payload that does not
/// decode is logged and dropped too, and a failed insert is logged and the
/// loop moves on. Only a queue failure aborts the loop.
pub fn run_worker(queue: &HandoffQueue, store: &Mailstore) -> VaultResult<()> {
    log::info!("Worker started, draining hand-off queue");

    loop {
        let Some(blob) = queue.dequeue_blocking()? else {
            log::info!("Queue closed, worker shutting down");
            return Ok(());
        };
        process_envelope(store, &blob);
    }
}

fn process_envelope(store: &Mailstore, blob: &str) {
    let envelope: Envelope = match serde_json::from_str(blob) {
        Ok(e) => e,
        Err(e) => {
            log::error!("Dropping malformed queue payload: {e}");
            return;
        }
    };

    match store.insert_with_id(
        &envelope.id,
        &envelope.sender,
        &envelope.recipient,
        &envelope.subject,
        &envelope.body,
        &envelope.arrival_time,
        &envelope.tags,
    ) {
        Ok(()) => log::info!(
            "Message {} saved: {} -> {}",
            envelope.id,
            envelope.sender,
            envelope.recipient
        ),
        Err(VaultError::DuplicateId(id)) => {
            log::warn!("Duplicate message {id} dropped (retransmission)");
        }
        Err(e) => log::error!("Failed to store message {}: {e}", envelope.id),
    }
}
