#![doc = include_str!("../README.md")]
#![forbid(unsafe_op_in_unsafe_fn)]

mod endpoint;
mod proxy;

pub use endpoint::Endpoint;
pub use proxy::{CallError, CallOptions, CallProxy, PendingCall};

// Re-export core types so callers need only one crate.
pub use uarpc_core::{
    DiagnosticsMask, DispatchMetricsSnapshot, Envelope, OperationDescriptor, OperationHandler,
    OperationId, RegisterError, RequestEnvelope, RequestHandle, RequestHeader, ResponseBody,
    ResponseEnvelope, ResponseHeader, ServiceFault, ServiceRouter, StatusCode, Transport,
    TransportError, handler_fn,
};

#[cfg(feature = "mem")]
pub use uarpc_core::mem::MemTransport;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use uarpc::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        CallError, CallProxy, Endpoint, OperationDescriptor, OperationId, ServiceFault,
        ServiceRouter, StatusCode, Transport, handler_fn,
    };
}
