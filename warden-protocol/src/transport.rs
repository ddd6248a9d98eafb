//! The transport boundary.
//!
//! Any ordered, at-most-once duplex pipe satisfies [`Transport`]: a
//! websocket, a widget comm channel, a child-process stdio pair. The
//! protocol requires ordering and at-most-once delivery; it does not
//! require exactly-once (the broker deduplicates by request id).

use async_trait::async_trait;

use crate::envelope::WireEnvelope;
use crate::error::TransportError;

/// An ordered, bidirectional message pipe between client and backend.
///
/// `recv` returning `None` is the closure signal: the session owning the
/// transport must tear down, cancelling pending requests and awaiting
/// approval cases.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transmit one envelope to the peer.
    async fn send(&self, envelope: WireEnvelope) -> Result<(), TransportError>;

    /// Receive the next envelope, or `None` once the channel is closed
    /// and drained.
    async fn recv(&self) -> Option<WireEnvelope>;

    /// Close the outbound half. The peer's `recv` drains whatever was
    /// already sent, then observes closure.
    async fn close(&self);
}
