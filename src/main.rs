use std::sync::Arc;

use anyhow::Context;

use mailvault::config::Settings;
use mailvault::crypto::FieldCipher;
use mailvault::pipeline::worker::run_worker;
use mailvault::queue::HandoffQueue;
use mailvault::store::Mailstore;

fn main() {
    if let Err(e) = real_main() {
        // Keep stderr noisy for operator bug reports; logs also go to file.
        eprintln!("[mailvault worker] fatal error: {e:?}");
        log::error!("Fatal error: {:?}", e);
        std::process::exit(1);
    }
}

fn real_main() -> anyhow::Result<()> {
    mailvault::logging::init_logging()?;

    let settings = Settings::from_env().context("loading settings")?;
    let cipher = FieldCipher::new(&settings.field_key).context("initializing field cipher")?;
    let store = Mailstore::open(&settings.db_path, cipher, settings.max_size_bytes)
        .context("opening mailstore")?;
    let queue = Arc::new(
        HandoffQueue::open(&settings.queue_endpoint, &settings.queue_name)
            .context("opening hand-off queue")?,
    );

    // Ctrl-C closes the queue, which unblocks the dequeue and lets the loop
    // finish the envelope in flight before exiting.
    let shutdown_queue = Arc::clone(&queue);
    ctrlc::set_handler(move || {
        log::info!("Interrupt received, closing queue");
        shutdown_queue.close();
    })
    .context("installing interrupt handler")?;

    run_worker(&queue, &store)?;

    log::info!("=== mailvault worker stopped ===");
    Ok(())
}
