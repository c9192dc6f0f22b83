use crate::domains::logger::DomainLogger;
use std::sync::Arc;

/// Forwards domain log lines to `tracing` under the `run` target.
struct TracingBridge;

impl DomainLogger for TracingBridge {
    fn info(&self, msg: &str) {
        tracing::info!(target: "run", "{}", msg);
    }

    fn warn(&self, msg: &str) {
        tracing::warn!(target: "run", "{}", msg);
    }

    fn error(&self, msg: &str) {
        tracing::error!(target: "run", "{}", msg);
    }
}

pub fn init_tracing_logger() -> Arc<dyn DomainLogger> {
    Arc::new(TracingBridge)
}
