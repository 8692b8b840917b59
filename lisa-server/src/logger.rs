/// Sink for operational messages, injected into the components that report
/// them.
pub trait Logger: Send + Sync {
    fn debug(&self, message: &str);
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards to the process-wide `tracing` subscriber under the `lisa` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(target: "lisa", "{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "lisa", "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "lisa", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "lisa", "{message}");
    }
}
