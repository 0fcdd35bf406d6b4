//! Client-side call proxy.
//!
//! The proxy owns the pending-call table and a receive pump that matches
//! inbound responses to their callers by correlation handle. Each call is
//! available in two equivalent forms:
//!
//! - `call` awaits the full round trip and is defined as
//!   `begin_call` + `wait`, so the two forms cannot drift apart;
//! - `begin_call` registers a [`PendingCall`] and sends the request without
//!   waiting for the response.
//!
//! The pending-call slot is the single concurrency-sensitive object here:
//! the pump writes it exactly once, the caller reads it exactly once, and a
//! `oneshot` channel enforces both.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use uarpc_core::{
    DiagnosticsMask, Envelope, OperationId, RequestEnvelope, RequestHandle, RequestHeader,
    ResponseBody, ResponseEnvelope, ServiceFault, Transport, TransportError, now_ns,
};

/// Per-call knobs carried in the request header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Timeout hint in milliseconds; zero means no hint. Enforcement is the
    /// transport's responsibility.
    pub timeout_hint_ms: u32,
    /// Diagnostics to request with faults.
    pub diagnostics: DiagnosticsMask,
}

/// Errors surfaced by the client call surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// The call failed: the service reported a fault, or the transport
    /// failed and was converted to one at the boundary.
    Fault(ServiceFault),

    /// The pending call's result was already retrieved. This is a defect in
    /// the calling code, not a runtime condition.
    AlreadyRetrieved,
}

impl CallError {
    /// The fault carried by this error, if it is one.
    pub fn fault(&self) -> Option<&ServiceFault> {
        match self {
            CallError::Fault(fault) => Some(fault),
            CallError::AlreadyRetrieved => None,
        }
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallError::Fault(fault) => write!(f, "call faulted: {fault}"),
            CallError::AlreadyRetrieved => {
                write!(f, "pending call result was already retrieved")
            }
        }
    }
}

impl std::error::Error for CallError {}

type CompletionCallback = Box<dyn FnOnce(&ResponseEnvelope) + Send>;

struct PendingSlot {
    tx: oneshot::Sender<ResponseEnvelope>,
    on_complete: Option<CompletionCallback>,
}

/// Handle for an in-flight asynchronous call.
///
/// Completed exactly once by the proxy's receive pump; retrieved exactly
/// once through [`PendingCall::wait`].
pub struct PendingCall {
    request_handle: RequestHandle,
    slot: Option<oneshot::Receiver<ResponseEnvelope>>,
}

impl PendingCall {
    pub fn request_handle(&self) -> RequestHandle {
        self.request_handle
    }

    /// Retrieve the result, waiting for completion if necessary.
    ///
    /// A fault response surfaces as [`CallError::Fault`], never as a
    /// success with an empty payload. Calling `wait` a second time returns
    /// [`CallError::AlreadyRetrieved`].
    pub async fn wait(&mut self) -> Result<Bytes, CallError> {
        let Some(slot) = self.slot.take() else {
            return Err(CallError::AlreadyRetrieved);
        };

        let response = match slot.await {
            Ok(response) => response,
            // The proxy went away without completing us; same shape as any
            // other transport death.
            Err(_) => ResponseEnvelope::fault(
                self.request_handle,
                ServiceFault::from(TransportError::Closed),
            ),
        };

        match response.into_body() {
            ResponseBody::Payload(payload) => Ok(payload),
            ResponseBody::Fault(fault) => Err(CallError::Fault(fault)),
        }
    }
}

impl fmt::Debug for PendingCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCall")
            .field("request_handle", &self.request_handle)
            .field("retrieved", &self.slot.is_none())
            .finish()
    }
}

struct ProxyShared<T> {
    transport: T,
    pending: Mutex<HashMap<RequestHandle, PendingSlot>>,
    next_handle: AtomicU64,
    /// Set by the pump right before it drains the table on shutdown.
    down: AtomicBool,
}

/// Client call site over one transport.
///
/// # Thread Safety
///
/// All call forms take `&self`; the proxy can be shared across tasks.
pub struct CallProxy<T: Transport> {
    shared: Arc<ProxyShared<T>>,
    pump: JoinHandle<()>,
}

impl<T: Transport> CallProxy<T> {
    /// Create a proxy and spawn its receive pump.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(transport: T) -> Self {
        let shared = Arc::new(ProxyShared {
            transport,
            pending: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
            down: AtomicBool::new(false),
        });
        let pump = tokio::spawn(pump(Arc::clone(&shared)));
        Self { shared, pump }
    }

    /// Synchronous form: issue the request and await the response.
    ///
    /// Defined as `begin_call` followed by `wait`, so the sync and async
    /// forms are equivalent by construction.
    pub async fn call(&self, operation: OperationId, payload: Bytes) -> Result<Bytes, CallError> {
        let mut pending = self.begin_call(operation, payload).await?;
        pending.wait().await
    }

    /// Asynchronous form: issue the request and return a [`PendingCall`].
    pub async fn begin_call(
        &self,
        operation: OperationId,
        payload: Bytes,
    ) -> Result<PendingCall, CallError> {
        self.begin_call_inner(operation, payload, CallOptions::default(), None)
            .await
    }

    /// Asynchronous form with options and a completion callback.
    ///
    /// `on_complete` is invoked exactly once, by the task that observes
    /// completion, with the full response envelope. That includes the fault
    /// response synthesized when the transport dies first.
    pub async fn begin_call_with<F>(
        &self,
        operation: OperationId,
        payload: Bytes,
        options: CallOptions,
        on_complete: F,
    ) -> Result<PendingCall, CallError>
    where
        F: FnOnce(&ResponseEnvelope) + Send + 'static,
    {
        self.begin_call_inner(operation, payload, options, Some(Box::new(on_complete)))
            .await
    }

    async fn begin_call_inner(
        &self,
        operation: OperationId,
        payload: Bytes,
        options: CallOptions,
        on_complete: Option<CompletionCallback>,
    ) -> Result<PendingCall, CallError> {
        // A closed transport fails the call here and now; a pending call
        // that can never complete must never be handed out.
        if self.shared.transport.is_closed() {
            return Err(CallError::Fault(ServiceFault::from(TransportError::Closed)));
        }

        let request_handle = self.shared.next_handle.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.shared
            .pending
            .lock()
            .insert(request_handle, PendingSlot { tx, on_complete });

        let request = RequestEnvelope {
            operation,
            header: RequestHeader {
                request_handle,
                timestamp_ns: now_ns(),
                timeout_hint_ms: options.timeout_hint_ms,
                diagnostics: options.diagnostics,
            },
            payload,
        };

        if let Err(err) = self.shared.transport.send(Envelope::Request(request)).await {
            self.shared.pending.lock().remove(&request_handle);
            return Err(CallError::Fault(ServiceFault::from(err)));
        }

        // The pump drains the table under the same lock after setting the
        // flag; if the flag reads false here, our slot either gets drained
        // or completed normally. If it reads true, the drain may have run
        // before our insert landed, so finish the call ourselves.
        if self.shared.down.load(Ordering::Acquire)
            && let Some(slot) = self.shared.pending.lock().remove(&request_handle)
        {
            fail_slot(request_handle, slot);
            return Err(CallError::Fault(ServiceFault::from(TransportError::Closed)));
        }

        Ok(PendingCall {
            request_handle,
            slot: Some(rx),
        })
    }

    /// Close the underlying transport. Outstanding pending calls are failed
    /// with a `BadConnectionClosed` fault by the pump.
    pub fn close(&self) {
        self.shared.transport.close();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.transport.is_closed()
    }
}

impl<T: Transport> Drop for CallProxy<T> {
    fn drop(&mut self) {
        self.shared.transport.close();
        self.pump.abort();
    }
}

impl<T: Transport> fmt::Debug for CallProxy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallProxy")
            .field("pending", &self.shared.pending.lock().len())
            .field("closed", &self.shared.transport.is_closed())
            .finish()
    }
}

async fn pump<T: Transport>(shared: Arc<ProxyShared<T>>) {
    loop {
        match shared.transport.recv().await {
            Ok(Envelope::Response(response)) => deliver(&shared, response),
            Ok(Envelope::Request(request)) => {
                tracing::warn!(
                    operation = %request.operation,
                    request_handle = request.header.request_handle,
                    "ignoring inbound request on client transport"
                );
            }
            Err(TransportError::Closed) => break,
        }
    }

    fail_outstanding(&shared);
}

/// Complete the matching pending call. Late or unmatched responses are
/// logged and dropped.
fn deliver<T>(shared: &ProxyShared<T>, response: ResponseEnvelope) {
    let request_handle = response.header.request_handle;
    let Some(mut slot) = shared.pending.lock().remove(&request_handle) else {
        tracing::warn!(request_handle, "response does not match any pending call");
        return;
    };

    if let Some(on_complete) = slot.on_complete.take() {
        on_complete(&response);
    }
    // The caller may have dropped its PendingCall; nothing left to do then.
    let _ = slot.tx.send(response);
}

/// The transport is gone: no pending call may be left unresolved.
fn fail_outstanding<T>(shared: &ProxyShared<T>) {
    shared.down.store(true, Ordering::Release);

    let drained: Vec<_> = {
        let mut pending = shared.pending.lock();
        pending.drain().collect()
    };
    if drained.is_empty() {
        return;
    }

    tracing::debug!(
        count = drained.len(),
        "failing pending calls after transport close"
    );
    for (request_handle, slot) in drained {
        fail_slot(request_handle, slot);
    }
}

fn fail_slot(request_handle: RequestHandle, mut slot: PendingSlot) {
    let response =
        ResponseEnvelope::fault(request_handle, ServiceFault::from(TransportError::Closed));
    if let Some(on_complete) = slot.on_complete.take() {
        on_complete(&response);
    }
    let _ = slot.tx.send(response);
}
