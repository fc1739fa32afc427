use std::path::PathBuf;

use anyhow::Context;
use flexi_logger::{Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming};

use crate::config;

/// Start the rotating file logger for the worker binary.
///
/// File logs at debug, duplicated to stderr at warn+ so a supervising shell
/// still sees problems without scraping the log file.
pub fn init_logging() -> anyhow::Result<()> {
    let log_dir = PathBuf::from(config::logging::LOG_DIR);
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed creating log dir {}", log_dir.display()))?;

    Logger::try_with_str("debug")?
        .log_to_file(
            FileSpec::default()
                .directory(log_dir)
                .basename(config::logging::LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(config::logging::LOG_ROTATE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(config::logging::LOG_ROTATE_KEEP_FILES),
        )
        .duplicate_to_stderr(Duplicate::Warn)
        .format(flexi_logger::detailed_format)
        .start()
        .context("failed to start logger")?;

    log::info!("{}", "=".repeat(60));
    log::info!("mailvault worker starting");
    log::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    log::info!("Platform: {}", std::env::consts::OS);
    log::info!("{}", "=".repeat(60));

    Ok(())
}
