//! Server-side endpoint: drives a router from a transport.

use std::sync::Arc;

use uarpc_core::{Envelope, ServiceRouter, Transport, TransportError};

/// Receives requests from a transport, dispatches them through a sealed
/// [`ServiceRouter`], and sends back exactly one response per request.
///
/// Concurrent requests each get their own task; no ordering is guaranteed
/// between their responses.
pub struct Endpoint<T: Transport> {
    transport: Arc<T>,
    router: Arc<ServiceRouter>,
}

impl<T: Transport> Endpoint<T> {
    pub fn new(transport: T, router: Arc<ServiceRouter>) -> Self {
        Self {
            transport: Arc::new(transport),
            router,
        }
    }

    /// Serve until the transport closes.
    ///
    /// A response that cannot be delivered because the transport closed
    /// underneath us is logged and dropped; the response was still produced,
    /// delivery is the transport's concern.
    pub async fn serve(self) -> Result<(), TransportError> {
        loop {
            let envelope = match self.transport.recv().await {
                Ok(envelope) => envelope,
                Err(TransportError::Closed) => {
                    tracing::debug!("endpoint transport closed, stopping");
                    return Ok(());
                }
            };

            match envelope {
                Envelope::Request(request) => {
                    let router = Arc::clone(&self.router);
                    let transport = Arc::clone(&self.transport);
                    tokio::spawn(async move {
                        let request_handle = request.header.request_handle;
                        let response = router.dispatch(request).await;
                        if let Err(err) = transport.send(Envelope::Response(response)).await {
                            tracing::debug!(
                                request_handle,
                                error = %err,
                                "response dropped, transport closed"
                            );
                        }
                    });
                }
                Envelope::Response(response) => {
                    tracing::warn!(
                        request_handle = response.header.request_handle,
                        "ignoring inbound response on endpoint transport"
                    );
                }
            }
        }
    }
}
