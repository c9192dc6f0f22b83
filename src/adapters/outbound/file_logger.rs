use crate::domains::logger::DomainLogger;
use chrono::Utc;
use std::sync::Arc;

/// Writes run logs through the global `log` facade once `fast_log` owns it.
struct FileBridge;

impl DomainLogger for FileBridge {
    fn info(&self, msg: &str) {
        log::info!("{} - {}", Utc::now().to_rfc3339(), msg);
    }

    fn warn(&self, msg: &str) {
        log::warn!("{} - {}", Utc::now().to_rfc3339(), msg);
    }

    fn error(&self, msg: &str) {
        log::error!("{} - {}", Utc::now().to_rfc3339(), msg);
    }
}

/// Install `fast_log` as the process-wide `log` backend writing to `path`
/// and return a domain logger that feeds it.
///
/// Must run before anything else claims the `log` facade.
pub fn init_file_logger(path: &str) -> Result<Arc<dyn DomainLogger>, String> {
    fast_log::init(
        fast_log::config::Config::new()
            .file(path)
            .level(log::LevelFilter::Info),
    )
    .map_err(|e| format!("Failed to initialize fast_log: {}", e))?;
    Ok(Arc::new(FileBridge))
}
