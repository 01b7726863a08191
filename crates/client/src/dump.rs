//! `tracing`-backed dump logger.

use protocol::DumpLogger;

/// Emits request and response bytes as `debug` events on the `soap::dump`
/// target. Non-UTF-8 bytes are replaced.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDumpLogger;

impl DumpLogger for TracingDumpLogger {
    fn log_request(&self, operation: &str, dump: &[u8]) {
        tracing::debug!(
            target: "soap::dump",
            operation,
            bytes = dump.len(),
            request = %String::from_utf8_lossy(dump),
            "request dump"
        );
    }

    fn log_response(&self, operation: &str, dump: &[u8]) {
        tracing::debug!(
            target: "soap::dump",
            operation,
            bytes = dump.len(),
            response = %String::from_utf8_lossy(dump),
            "response dump"
        );
    }
}
