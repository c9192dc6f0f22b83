use std::sync::Arc;

/// Domain-level logging port.
/// Non-fallible from the caller's perspective; adapters decide where messages go.
pub trait DomainLogger: Send + Sync + 'static {
    fn info(&self, msg: &str);
    fn warn(&self, msg: &str);
    fn error(&self, msg: &str);
}

pub type DynLogger = Arc<dyn DomainLogger>;
