//! Request and response envelopes.
//!
//! An envelope is the header+payload wrapper around a call, independent of
//! wire encoding. The transport hands the router decoded [`RequestEnvelope`]s
//! and re-encodes the [`ResponseEnvelope`]s it gets back; this layer never
//! touches wire bytes.

use bytes::Bytes;

use crate::fault::ServiceFault;
use crate::header::{RequestHandle, RequestHeader, ResponseHeader, now_ns};
use crate::operation::OperationId;
use crate::status::StatusCode;

/// One decoded request, consumed exactly once by the matching handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestEnvelope {
    /// Routing key: which operation this request is for.
    pub operation: OperationId,
    pub header: RequestHeader,
    /// Opaque to the router; only the handler interprets it.
    pub payload: Bytes,
}

impl RequestEnvelope {
    pub fn new(operation: OperationId, header: RequestHeader, payload: Bytes) -> Self {
        Self {
            operation,
            header,
            payload,
        }
    }
}

/// Either a successful payload or a fault. Never both, never neither.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResponseBody {
    Payload(Bytes),
    Fault(ServiceFault),
}

/// One response per request, success or fault.
///
/// Built only through [`ResponseEnvelope::good`] and
/// [`ResponseEnvelope::fault`], which keep `header.service_result`
/// consistent with the body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseEnvelope {
    pub header: ResponseHeader,
    body: ResponseBody,
}

impl ResponseEnvelope {
    /// Build a successful response.
    pub fn good(request_handle: RequestHandle, payload: Bytes) -> Self {
        Self {
            header: ResponseHeader {
                request_handle,
                service_result: StatusCode::Good,
                timestamp_ns: now_ns(),
            },
            body: ResponseBody::Payload(payload),
        }
    }

    /// Build a fault response.
    pub fn fault(request_handle: RequestHandle, fault: ServiceFault) -> Self {
        Self {
            header: ResponseHeader {
                request_handle,
                service_result: fault.status,
                timestamp_ns: now_ns(),
            },
            body: ResponseBody::Fault(fault),
        }
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    pub fn into_body(self) -> ResponseBody {
        self.body
    }

    pub fn is_good(&self) -> bool {
        matches!(self.body, ResponseBody::Payload(_))
    }
}

/// What crosses the transport boundary, in either direction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Envelope {
    Request(RequestEnvelope),
    Response(ResponseEnvelope),
}
