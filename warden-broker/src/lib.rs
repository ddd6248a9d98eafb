//! # warden-broker — the single point where the channel is read and written
//!
//! The [`MessageBroker`] owns the in-flight request table. Every outbound
//! request gets a fresh unique id; every inbound response is matched to
//! its pending handle by `request_id`, not arrival order. A response with
//! no pending handle — a duplicate, or a straggler arriving after its
//! request timed out — is dropped silently; delivering at most one
//! terminal outcome per request id is the broker's one job.
//!
//! When the transport closes, every still-pending handle fails with
//! `SessionClosed` and the handler channel ends, which is the session's
//! signal to tear down.

#![deny(missing_docs)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use warden_protocol::{
    ApprovalRequestEvent, BrokerError, RequestId, ResponseBody, Transport, WireEnvelope,
    WireError, WirePayload,
};

/// Tunables for a [`MessageBroker`].
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// How long `send_request` waits for a response before failing with
    /// `Timeout` and discarding any later response for the same id.
    pub request_timeout: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
        }
    }
}

struct Shared {
    pending: Mutex<HashMap<RequestId, oneshot::Sender<ResponseBody>>>,
    closed: AtomicBool,
}

/// Correlates outbound requests with inbound responses over one transport.
///
/// Cloning shares the transport and the pending table. The read pump runs
/// as a background task from [`start`](MessageBroker::start) until the
/// transport closes.
#[derive(Clone)]
pub struct MessageBroker {
    transport: Arc<dyn Transport>,
    shared: Arc<Shared>,
    config: BrokerConfig,
}

impl MessageBroker {
    /// Attach a broker to a transport and start its read pump.
    ///
    /// Returns the broker and the stream of inbound non-response messages
    /// (new requests, and events when this end is a client). The stream
    /// ends when the transport closes, after every pending request has
    /// been failed with `SessionClosed`.
    pub fn start(
        transport: Arc<dyn Transport>,
        config: BrokerConfig,
    ) -> (Self, mpsc::UnboundedReceiver<WireEnvelope>) {
        let broker = Self {
            transport,
            shared: Arc::new(Shared {
                pending: Mutex::new(HashMap::new()),
                closed: AtomicBool::new(false),
            }),
            config,
        };

        let (handler_tx, handler_rx) = mpsc::unbounded_channel();
        let pump = broker.clone();
        tokio::spawn(async move {
            pump.run_pump(handler_tx).await;
        });

        (broker, handler_rx)
    }

    async fn run_pump(&self, handler_tx: mpsc::UnboundedSender<WireEnvelope>) {
        while let Some(envelope) = self.transport.recv().await {
            match envelope.payload {
                WirePayload::Response(body) => self.complete(body),
                _ => {
                    tracing::trace!(kind = envelope.payload.kind(), "inbound message");
                    if handler_tx.send(envelope).is_err() {
                        // Handler gone: the session is shutting down; keep
                        // draining responses so pending sends still resolve.
                        tracing::debug!("handler channel closed, draining responses only");
                    }
                }
            }
        }
        tracing::info!("transport closed, cascading to pending requests");
        self.fail_pending();
    }

    /// Complete the pending handle for a response. Idempotent: a duplicate
    /// response for an already-completed or timed-out id is dropped.
    fn complete(&self, body: ResponseBody) {
        let handle = {
            let mut pending = self.shared.pending.lock().expect("broker lock poisoned");
            pending.remove(&body.request_id)
        };
        match handle {
            Some(tx) => {
                // The waiter may have timed out between removal and here;
                // that also makes the response a straggler to drop.
                if tx.send(body).is_err() {
                    tracing::debug!("response arrived for a caller that gave up");
                }
            }
            None => {
                tracing::debug!(request_id = %body.request_id, "dropping duplicate or late response");
            }
        }
    }

    fn fail_pending(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        let drained: Vec<_> = {
            let mut pending = self.shared.pending.lock().expect("broker lock poisoned");
            pending.drain().collect()
        };
        for (request_id, tx) in drained {
            tracing::debug!(%request_id, "failing pending request: session closed");
            drop(tx);
        }
    }

    /// Whether the transport has closed.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Send a request and suspend until its response, a timeout, or
    /// session closure.
    ///
    /// The request is stamped with a fresh unique id. On timeout the
    /// pending handle is removed first, so a late response for the same id
    /// is discarded rather than delivered — one terminal outcome per id.
    pub async fn send_request(&self, payload: WirePayload) -> Result<ResponseBody, BrokerError> {
        if self.is_closed() {
            return Err(BrokerError::SessionClosed);
        }

        let id = RequestId::new(Uuid::new_v4().to_string());
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.shared.pending.lock().expect("broker lock poisoned");
            pending.insert(id.clone(), tx);
        }

        let envelope = WireEnvelope::new(id.clone(), payload);
        tracing::debug!(request_id = %id, kind = envelope.payload.kind(), "request sent");
        if let Err(e) = self.transport.send(envelope).await {
            let mut pending = self.shared.pending.lock().expect("broker lock poisoned");
            pending.remove(&id);
            return Err(BrokerError::Transport(e));
        }

        match tokio::time::timeout(self.config.request_timeout, rx).await {
            Ok(Ok(body)) => Ok(body),
            Ok(Err(_)) => Err(BrokerError::SessionClosed),
            Err(_elapsed) => {
                let mut pending = self.shared.pending.lock().expect("broker lock poisoned");
                pending.remove(&id);
                tracing::debug!(request_id = %id, "request timed out");
                Err(BrokerError::Timeout)
            }
        }
    }

    /// Send a success response for an inbound request.
    pub async fn respond_ok(
        &self,
        request_id: RequestId,
        data: serde_json::Value,
    ) -> Result<(), BrokerError> {
        let envelope =
            WireEnvelope::response_ok(self.fresh_id(), request_id, data);
        self.transport.send(envelope).await.map_err(Into::into)
    }

    /// Send an error response for an inbound request.
    pub async fn respond_err(
        &self,
        request_id: RequestId,
        error: WireError,
    ) -> Result<(), BrokerError> {
        tracing::debug!(%request_id, code = ?error.code, "responding with error");
        let envelope =
            WireEnvelope::response_err(self.fresh_id(), request_id, error);
        self.transport.send(envelope).await.map_err(Into::into)
    }

    /// Push an approval notification. Events carry no correlation — the
    /// client answers with a new `decide_approval` request.
    pub async fn notify(&self, event: ApprovalRequestEvent) -> Result<(), BrokerError> {
        let envelope = WireEnvelope::new(self.fresh_id(), WirePayload::ApprovalRequest(event));
        self.transport.send(envelope).await.map_err(Into::into)
    }

    /// Close the outbound half of the transport and fail pending requests.
    pub async fn close(&self) {
        self.transport.close().await;
        self.fail_pending();
    }

    fn fresh_id(&self) -> RequestId {
        RequestId::new(Uuid::new_v4().to_string())
    }
}
