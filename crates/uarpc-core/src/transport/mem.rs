//! In-process transport backed by bounded channels.
//!
//! [`MemTransport::pair`] returns two connected ends. Closing either end
//! shuts the whole link down: both sides' blocked `recv` calls wake with
//! [`TransportError::Closed`]. That wake-up is what lets the client proxy
//! fail its outstanding pending calls instead of leaving them unresolved.

use std::sync::Arc;

use futures::future::{self, Either};
use futures::pin_mut;
use tokio::sync::{Mutex, mpsc, watch};

use crate::envelope::Envelope;

use super::{Transport, TransportError};

const CHANNEL_CAPACITY: usize = 64;

#[derive(Clone, Debug)]
pub struct MemTransport {
    inner: Arc<MemInner>,
}

#[derive(Debug)]
struct MemInner {
    tx: mpsc::Sender<Envelope>,
    rx: Mutex<mpsc::Receiver<Envelope>>,
    /// Shared by both ends; flipping it to true closes the link.
    closed_tx: Arc<watch::Sender<bool>>,
    closed_rx: watch::Receiver<bool>,
}

impl MemTransport {
    pub fn pair() -> (Self, Self) {
        let (tx_a, rx_a) = mpsc::channel(CHANNEL_CAPACITY);
        let (tx_b, rx_b) = mpsc::channel(CHANNEL_CAPACITY);
        let (closed_tx, closed_rx) = watch::channel(false);
        let closed_tx = Arc::new(closed_tx);

        let inner_a = Arc::new(MemInner {
            tx: tx_b,
            rx: Mutex::new(rx_a),
            closed_tx: Arc::clone(&closed_tx),
            closed_rx: closed_rx.clone(),
        });

        let inner_b = Arc::new(MemInner {
            tx: tx_a,
            rx: Mutex::new(rx_b),
            closed_tx,
            closed_rx,
        });

        (Self { inner: inner_a }, Self { inner: inner_b })
    }
}

impl Transport for MemTransport {
    async fn send(&self, envelope: Envelope) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        self.inner
            .tx
            .send(envelope)
            .await
            .map_err(|_| TransportError::Closed)
    }

    async fn recv(&self) -> Result<Envelope, TransportError> {
        let mut rx = self.inner.rx.lock().await;
        let mut closed = self.inner.closed_rx.clone();

        // wait_for checks the current value first, so a close that happened
        // before this call is observed immediately.
        let shutdown = closed.wait_for(|closed| *closed);
        let next = rx.recv();
        pin_mut!(shutdown, next);

        match future::select(shutdown, next).await {
            Either::Left(_) => Err(TransportError::Closed),
            Either::Right((received, _)) => received.ok_or(TransportError::Closed),
        }
    }

    fn close(&self) {
        self.inner.closed_tx.send_replace(true);
    }

    fn is_closed(&self) -> bool {
        *self.inner.closed_tx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use crate::envelope::{Envelope, RequestEnvelope};
    use crate::header::RequestHeader;
    use crate::operation::OperationId;

    use super::*;

    fn request(handle: u64) -> Envelope {
        Envelope::Request(RequestEnvelope::new(
            OperationId::new(1),
            RequestHeader::new(handle),
            Bytes::from_static(b"payload"),
        ))
    }

    #[tokio::test]
    async fn pair_delivers_both_directions() {
        let (a, b) = MemTransport::pair();

        let forward = request(1);
        a.send(forward.clone()).await.unwrap();
        assert_eq!(b.recv().await.unwrap(), forward);

        let backward = request(2);
        b.send(backward.clone()).await.unwrap();
        assert_eq!(a.recv().await.unwrap(), backward);
    }

    #[tokio::test]
    async fn close_is_visible_on_both_ends() {
        let (a, b) = MemTransport::pair();
        assert!(!a.is_closed());
        assert!(!b.is_closed());

        a.close();
        assert!(a.is_closed());
        assert!(b.is_closed());

        assert_eq!(a.send(request(1)).await, Err(TransportError::Closed));
        assert_eq!(b.recv().await.unwrap_err(), TransportError::Closed);
    }

    #[tokio::test]
    async fn close_wakes_blocked_recv() {
        let (a, b) = MemTransport::pair();

        let waiter = tokio::spawn(async move { b.recv().await });
        // Give the recv a chance to park before closing.
        tokio::task::yield_now().await;

        a.close();
        let result = waiter.await.unwrap();
        assert_eq!(result.unwrap_err(), TransportError::Closed);
    }
}
