//! Request routing: one handler per operation, one response per request.
//!
//! A [`ServiceRouter`] is built once at startup (register every operation,
//! single-threaded), then serves concurrent dispatches for the rest of its
//! life. The first `dispatch` seals the table: late registrations are
//! rejected so the table cannot change shape under live traffic.
//!
//! `dispatch` never propagates an error to its caller. A routing miss, a
//! handler error and a handler panic all come back as a fault response;
//! "invoke, then always respond" is the contract the endpoint relies on.

use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use futures::FutureExt;
use futures::future::BoxFuture;

use crate::envelope::{RequestEnvelope, ResponseEnvelope};
use crate::fault::ServiceFault;
use crate::header::DiagnosticsMask;
use crate::observe::{DispatchMetrics, DispatchMetricsSnapshot};
use crate::operation::OperationId;
use crate::status::StatusCode;

/// Business logic behind one operation.
///
/// The handler receives the decoded request and returns either a result
/// payload or a [`ServiceFault`]. It must not build partial responses;
/// envelope construction belongs to the router.
pub trait OperationHandler: Send + Sync + 'static {
    fn invoke(&self, request: RequestEnvelope) -> BoxFuture<'static, Result<Bytes, ServiceFault>>;
}

/// Wrap an async closure as an [`OperationHandler`].
pub fn handler_fn<F, Fut>(f: F) -> impl OperationHandler
where
    F: Fn(RequestEnvelope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Bytes, ServiceFault>> + Send + 'static,
{
    struct FnHandler<F>(F);

    impl<F> OperationHandler for FnHandler<F>
    where
        F: Fn(RequestEnvelope) -> BoxFuture<'static, Result<Bytes, ServiceFault>>
            + Send
            + Sync
            + 'static,
    {
        fn invoke(
            &self,
            request: RequestEnvelope,
        ) -> BoxFuture<'static, Result<Bytes, ServiceFault>> {
            (self.0)(request)
        }
    }

    FnHandler(move |request| f(request).boxed())
}

/// Immutable registration record: identifier, name, opaque payload schema,
/// handler. Created once at router build time; lives as long as the router.
pub struct OperationDescriptor {
    operation: OperationId,
    name: &'static str,
    schema: Option<Bytes>,
    handler: Arc<dyn OperationHandler>,
}

impl OperationDescriptor {
    pub fn new(
        operation: OperationId,
        name: &'static str,
        handler: impl OperationHandler,
    ) -> Self {
        Self {
            operation,
            name,
            schema: None,
            handler: Arc::new(handler),
        }
    }

    /// Register a pre-wrapped Arc handler, useful when the same instance
    /// backs several operations.
    pub fn from_arc(
        operation: OperationId,
        name: &'static str,
        handler: Arc<dyn OperationHandler>,
    ) -> Self {
        Self {
            operation,
            name,
            schema: None,
            handler,
        }
    }

    /// Attach the request payload schema. Opaque to the router; carried for
    /// introspection only.
    pub fn with_schema(mut self, schema: Bytes) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn operation(&self) -> OperationId {
        self.operation
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn schema(&self) -> Option<&Bytes> {
        self.schema.as_ref()
    }
}

impl fmt::Debug for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationDescriptor")
            .field("operation", &self.operation)
            .field("name", &self.name)
            .field("schema", &self.schema.as_ref().map(Bytes::len))
            .finish_non_exhaustive()
    }
}

/// Errors that can occur during registration.
///
/// These are defects in the calling code, not runtime conditions, so they
/// surface as hard errors rather than faults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    /// The operation identifier is already registered. Registering twice
    /// would silently change behavior, so the second attempt is rejected.
    DuplicateOperation(OperationId),

    /// Operation identifier 0 is reserved.
    ReservedOperation,

    /// The router has served its first dispatch; the table is sealed.
    Sealed,
}

impl fmt::Display for RegisterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterError::DuplicateOperation(id) => {
                write!(f, "operation {id} is already registered")
            }
            RegisterError::ReservedOperation => {
                write!(f, "operation 0 is reserved and cannot be registered")
            }
            RegisterError::Sealed => {
                write!(f, "router is sealed; registration is only allowed before the first dispatch")
            }
        }
    }
}

impl std::error::Error for RegisterError {}

/// Maps each request to the one handler registered for its operation.
///
/// # Thread Safety
///
/// Registration takes `&mut self` and happens before the router is shared,
/// so it needs no locking. After sealing, the table is immutable and
/// concurrent `dispatch` calls read it freely.
pub struct ServiceRouter {
    handlers: HashMap<OperationId, OperationDescriptor>,
    sealed: AtomicBool,
    metrics: DispatchMetrics,
}

impl ServiceRouter {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            sealed: AtomicBool::new(false),
            metrics: DispatchMetrics::default(),
        }
    }

    /// Register an operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier is reserved, already registered,
    /// or the router is sealed.
    pub fn register(&mut self, descriptor: OperationDescriptor) -> Result<(), RegisterError> {
        if self.sealed.load(Ordering::Acquire) {
            return Err(RegisterError::Sealed);
        }

        let operation = descriptor.operation();
        if operation.is_reserved() {
            return Err(RegisterError::ReservedOperation);
        }
        if self.handlers.contains_key(&operation) {
            return Err(RegisterError::DuplicateOperation(operation));
        }

        self.handlers.insert(operation, descriptor);
        Ok(())
    }

    /// Route a request to its handler and always produce a response.
    ///
    /// The first call seals the router. An unknown operation produces a
    /// `BadServiceUnsupported` fault without invoking anything; a handler
    /// error or panic produces a fault carrying the handler's status and
    /// message. This method itself never panics and never returns an error.
    pub async fn dispatch(&self, request: RequestEnvelope) -> ResponseEnvelope {
        self.sealed.store(true, Ordering::Release);
        self.metrics.dispatched.fetch_add(1, Ordering::Relaxed);

        let operation = request.operation;
        let request_handle = request.header.request_handle;
        let diagnostics = request.header.diagnostics;

        let Some(descriptor) = self.handlers.get(&operation) else {
            self.metrics.unknown_operation.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                operation = %operation,
                request_handle,
                "no handler registered for operation"
            );
            let fault = ServiceFault::new(
                StatusCode::BadServiceUnsupported,
                format!("operation {operation} is not supported"),
            );
            return ResponseEnvelope::fault(request_handle, fault);
        };

        tracing::debug!(
            operation = %operation,
            name = descriptor.name(),
            request_handle,
            "dispatching request"
        );

        match AssertUnwindSafe(descriptor.handler.invoke(request))
            .catch_unwind()
            .await
        {
            Ok(Ok(payload)) => {
                self.metrics.good.fetch_add(1, Ordering::Relaxed);
                ResponseEnvelope::good(request_handle, payload)
            }
            Ok(Err(fault)) => {
                self.metrics.handler_faults.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    operation = %operation,
                    status = %fault.status,
                    request_handle,
                    "handler returned fault"
                );
                ResponseEnvelope::fault(request_handle, redact(fault, diagnostics))
            }
            Err(panic) => {
                self.metrics.handler_faults.fetch_add(1, Ordering::Relaxed);
                let message = panic_message(panic.as_ref());
                tracing::warn!(
                    operation = %operation,
                    request_handle,
                    panic = %message,
                    "handler panicked"
                );
                let fault = ServiceFault::new(StatusCode::BadInternalError, message);
                ResponseEnvelope::fault(request_handle, fault)
            }
        }
    }

    /// Look up the registered name for an operation.
    pub fn operation_name(&self, operation: OperationId) -> Option<&'static str> {
        self.handlers.get(&operation).map(OperationDescriptor::name)
    }

    /// Look up the registered payload schema for an operation.
    pub fn operation_schema(&self, operation: OperationId) -> Option<&Bytes> {
        self.handlers
            .get(&operation)
            .and_then(OperationDescriptor::schema)
    }

    pub fn has_handler(&self, operation: OperationId) -> bool {
        self.handlers.contains_key(&operation)
    }

    /// Get an iterator over all registered operation identifiers.
    pub fn operations(&self) -> impl Iterator<Item = OperationId> + '_ {
        self.handlers.keys().copied()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    pub fn metrics(&self) -> DispatchMetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl Default for ServiceRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ServiceRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRouter")
            .field("handlers", &self.handler_count())
            .field("sealed", &self.is_sealed())
            .finish()
    }
}

/// Keep the fault's status and message; attach the optional diagnostic only
/// if the request asked for it.
fn redact(fault: ServiceFault, diagnostics: DiagnosticsMask) -> ServiceFault {
    if diagnostics.contains(DiagnosticsMask::SERVICE_ADDITIONAL_INFO) {
        fault
    } else {
        fault.without_diagnostic()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
