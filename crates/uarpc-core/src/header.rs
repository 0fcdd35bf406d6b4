//! Request and response headers.
//!
//! Headers carry the call metadata that is independent of any particular
//! operation: the correlation handle, timestamps, the client's timeout hint
//! and the diagnostics it asked for. Payload bytes are opaque to this layer.

use bitflags::bitflags;

use crate::status::StatusCode;

/// Correlation handle assigned by the caller, echoed back in the response.
pub type RequestHandle = u64;

bitflags! {
    /// Diagnostics the client asks the server to return with a fault.
    ///
    /// Status code and message are always carried; these flags only control
    /// the optional attachments.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct DiagnosticsMask: u32 {
        /// Return the symbolic name of the service-level status.
        const SERVICE_SYMBOLIC_ID = 1 << 0;
        /// Return human-readable text for the service-level status.
        const SERVICE_LOCALIZED_TEXT = 1 << 1;
        /// Return the free-form diagnostic attachment (inner cause, context).
        const SERVICE_ADDITIONAL_INFO = 1 << 2;
    }
}

/// Metadata sent with every request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestHeader {
    /// Correlation handle; the response echoes it back.
    pub request_handle: RequestHandle,
    /// When the request was issued (monotonic nanoseconds).
    pub timestamp_ns: u64,
    /// How long the client is willing to wait, in milliseconds. Zero means
    /// no hint. Enforcing it is the transport's responsibility.
    pub timeout_hint_ms: u32,
    /// Diagnostics the client wants attached to faults.
    pub diagnostics: DiagnosticsMask,
}

impl RequestHeader {
    /// Create a header with the current timestamp, no timeout hint and no
    /// diagnostics requested.
    pub fn new(request_handle: RequestHandle) -> Self {
        Self {
            request_handle,
            timestamp_ns: now_ns(),
            timeout_hint_ms: 0,
            diagnostics: DiagnosticsMask::empty(),
        }
    }
}

/// Metadata sent with every response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResponseHeader {
    /// Echo of the request's correlation handle.
    pub request_handle: RequestHandle,
    /// Overall result of the call. `Good` iff the body carries a payload.
    pub service_result: StatusCode,
    /// When the response was produced (monotonic nanoseconds).
    pub timestamp_ns: u64,
}

/// Get current monotonic time in nanoseconds.
pub fn now_ns() -> u64 {
    use std::time::Instant;
    static START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
    let start = START.get_or_init(Instant::now);
    start.elapsed().as_nanos() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_request_header_defaults() {
        let header = RequestHeader::new(7);
        assert_eq!(header.request_handle, 7);
        assert_eq!(header.timeout_hint_ms, 0);
        assert_eq!(header.diagnostics, DiagnosticsMask::empty());
    }

    #[test]
    fn now_ns_is_monotonic() {
        let a = now_ns();
        let b = now_ns();
        assert!(b >= a);
    }

    #[test]
    fn diagnostics_mask_flags() {
        let mask = DiagnosticsMask::SERVICE_SYMBOLIC_ID | DiagnosticsMask::SERVICE_ADDITIONAL_INFO;
        assert!(mask.contains(DiagnosticsMask::SERVICE_ADDITIONAL_INFO));
        assert!(!mask.contains(DiagnosticsMask::SERVICE_LOCALIZED_TEXT));
    }
}
