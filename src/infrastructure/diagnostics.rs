use crate::domain::ports::{Diagnostic, DiagnosticsSink};
use std::any::Any;
use tracing::{debug, error, warn};

/// Forwards diagnostics to `tracing` as warning events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticsSink for TracingDiagnostics {
    fn record(&self, diagnostic: Diagnostic) {
        warn!(
            request_id = %diagnostic.request_id,
            stage = ?diagnostic.stage,
            detail = %diagnostic.detail,
            "pix key registration hit an internal failure"
        );
    }
}

/// Text carried by a panic payload, when it is a string.
pub fn panic_payload(payload: &(dyn Any + Send)) -> Option<&str> {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
}

/// Replaces the default panic hook, which prints the payload to stderr.
///
/// Panics are reported as `error!` events carrying only their location. The
/// payload is emitted at `debug` level, so it stays out of the default output.
pub fn route_panics_through_tracing() {
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown".to_string());
        error!(%location, "a task panicked");
        if let Some(payload) = panic_payload(info.payload()) {
            debug!(%location, payload, "panic payload");
        }
    }));
}
