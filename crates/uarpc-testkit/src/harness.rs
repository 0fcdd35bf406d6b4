//! Loopback wiring: a proxy and an endpoint over an in-memory pair.

use std::sync::Arc;

use tokio::task::JoinHandle;
use uarpc::{CallProxy, Endpoint, MemTransport, ServiceRouter, Transport, TransportError};

/// A client proxy connected to a live endpoint serving a router.
pub struct Loopback {
    pub proxy: CallProxy<MemTransport>,
    server_transport: MemTransport,
    server: JoinHandle<Result<(), TransportError>>,
}

impl Loopback {
    /// Wire a proxy to an endpoint serving `router`.
    ///
    /// Must be called from within a tokio runtime; the endpoint runs on its
    /// own task until the transport closes.
    pub fn spawn(router: ServiceRouter) -> Self {
        let (client_end, server_end) = MemTransport::pair();
        let server_transport = server_end.clone();
        let endpoint = Endpoint::new(server_end, Arc::new(router));
        let server = tokio::spawn(endpoint.serve());
        let proxy = CallProxy::new(client_end);
        Self {
            proxy,
            server_transport,
            server,
        }
    }

    /// Close the link from the server side, as if the server died with
    /// calls still in flight.
    pub fn close_server(&self) {
        self.server_transport.close();
    }

    /// Stop serving and wait for the endpoint task to finish.
    pub async fn shutdown(self) -> Result<(), TransportError> {
        self.server_transport.close();
        self.server.await.expect("endpoint task panicked")
    }
}
