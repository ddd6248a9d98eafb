//! In-memory implementations for exercising the protocol without real I/O.
//!
//! Enabled by the `test-utils` feature. [`duplex`] hands back two connected
//! [`InMemoryTransport`] halves; what one sends the other receives, in
//! order, with closure propagating once the buffer drains.

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use crate::envelope::WireEnvelope;
use crate::error::TransportError;
use crate::transport::Transport;

/// One half of an in-memory duplex channel.
pub struct InMemoryTransport {
    tx: Mutex<Option<mpsc::Sender<WireEnvelope>>>,
    rx: Mutex<mpsc::Receiver<WireEnvelope>>,
}

/// Create a connected pair of in-memory transports.
pub fn duplex(capacity: usize) -> (InMemoryTransport, InMemoryTransport) {
    let (a_tx, a_rx) = mpsc::channel(capacity);
    let (b_tx, b_rx) = mpsc::channel(capacity);
    (
        InMemoryTransport {
            tx: Mutex::new(Some(a_tx)),
            rx: Mutex::new(b_rx),
        },
        InMemoryTransport {
            tx: Mutex::new(Some(b_tx)),
            rx: Mutex::new(a_rx),
        },
    )
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn send(&self, envelope: WireEnvelope) -> Result<(), TransportError> {
        let guard = self.tx.lock().await;
        match guard.as_ref() {
            Some(tx) => tx
                .send(envelope)
                .await
                .map_err(|_| TransportError::Closed),
            None => Err(TransportError::Closed),
        }
    }

    async fn recv(&self) -> Option<WireEnvelope> {
        self.rx.lock().await.recv().await
    }

    async fn close(&self) {
        self.tx.lock().await.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::WirePayload;
    use crate::id::RequestId;

    fn envelope(id: &str) -> WireEnvelope {
        WireEnvelope::new(RequestId::new(id), WirePayload::GetKernelInfo)
    }

    #[tokio::test]
    async fn messages_cross_in_order() {
        let (client, server) = duplex(8);
        client.send(envelope("1")).await.unwrap();
        client.send(envelope("2")).await.unwrap();
        assert_eq!(server.recv().await.unwrap().id.as_str(), "1");
        assert_eq!(server.recv().await.unwrap().id.as_str(), "2");
    }

    #[tokio::test]
    async fn close_drains_then_ends() {
        let (client, server) = duplex(8);
        client.send(envelope("1")).await.unwrap();
        client.close().await;
        assert!(client.send(envelope("2")).await.is_err());
        assert_eq!(server.recv().await.unwrap().id.as_str(), "1");
        assert!(server.recv().await.is_none());
    }
}
