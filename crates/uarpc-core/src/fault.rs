//! Structured fault values.
//!
//! A [`ServiceFault`] is the one shape every failure converges to, whatever
//! its origin: a routing miss, an error raised by a handler, or a transport
//! failure converted at the boundary. Status code and message are always
//! carried; the diagnostic attachment is optional and never required for
//! correct behavior.

use std::fmt;

use crate::status::StatusCode;
use crate::transport::TransportError;

/// A typed failure result, distinct from a successful payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceFault {
    /// What went wrong, from the status taxonomy.
    pub status: StatusCode,
    /// Short human-readable description.
    pub message: String,
    /// Optional free-form attachment: inner cause, handler context.
    /// Returned to clients only when their diagnostics mask asks for it.
    pub diagnostic: Option<String>,
}

impl ServiceFault {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            diagnostic: None,
        }
    }

    /// Attach diagnostic context.
    pub fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        self.diagnostic = Some(diagnostic.into());
        self
    }

    /// Drop the optional attachment, keeping status and message intact.
    pub fn without_diagnostic(mut self) -> Self {
        self.diagnostic = None;
        self
    }
}

impl fmt::Display for ServiceFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status.name(), self.message)
    }
}

impl std::error::Error for ServiceFault {}

impl From<TransportError> for ServiceFault {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Closed => ServiceFault::new(
                StatusCode::BadConnectionClosed,
                "transport closed before the call completed",
            ),
        }
    }
}
