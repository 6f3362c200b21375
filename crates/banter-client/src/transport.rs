//! Transport layer — thin client over `tokio-tungstenite`.
//!
//! One connect attempt = one spawned task = one [`TransportHandle`]. The
//! task reports everything that happens on the socket as [`TransportEvent`]s
//! in wire order; the handle is the only way to write or close.

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use banter_core::state::TransportEvent;

/// Seam between the session and the socket. Production code uses
/// [`WsConnector`]; tests substitute a scripted connector.
pub trait Connector: Send + Sync {
    /// Start a connect attempt. Must not block: the returned handle is live
    /// immediately and lifecycle events arrive on `events` as they happen.
    fn connect(&self, url: &str, events: mpsc::Sender<TransportEvent>) -> TransportHandle;
}

/// Exclusive handle to one transport connection, owned by the session for
/// exactly the lifetime of one connect attempt. Dropping it cancels the
/// connection task.
pub struct TransportHandle {
    outbound: mpsc::Sender<String>,
    cancel: CancellationToken,
}

impl TransportHandle {
    pub fn new(outbound: mpsc::Sender<String>, cancel: CancellationToken) -> Self {
        Self { outbound, cancel }
    }

    /// Queue one text frame for sending. Never blocks; returns false when
    /// the queue is full or the connection task is gone.
    pub fn send(&self, text: String) -> bool {
        match self.outbound.try_send(text) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("send queue full, dropping outbound frame");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Request a best-effort close. Idempotent.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for TransportHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Production connector over a real WebSocket.
pub struct WsConnector {
    outbound_queue: usize,
}

impl WsConnector {
    pub fn new(outbound_queue: usize) -> Self {
        Self { outbound_queue }
    }
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new(64)
    }
}

impl Connector for WsConnector {
    fn connect(&self, url: &str, events: mpsc::Sender<TransportEvent>) -> TransportHandle {
        let (outbound_tx, outbound_rx) = mpsc::channel(self.outbound_queue);
        let cancel = CancellationToken::new();
        drop(tokio::spawn(run_connection(
            url.to_owned(),
            events,
            outbound_rx,
            cancel.clone(),
        )));
        TransportHandle::new(outbound_tx, cancel)
    }
}

/// One connect attempt: dial, then pump frames until close, error, or
/// cancellation. Always ends with a `Closed` event.
async fn run_connection(
    url: String,
    events: mpsc::Sender<TransportEvent>,
    mut outbound_rx: mpsc::Receiver<String>,
    cancel: CancellationToken,
) {
    let ws = tokio::select! {
        () = cancel.cancelled() => {
            let _ = events.send(TransportEvent::Closed).await;
            return;
        }
        result = connect_async(&url) => match result {
            Ok((ws, _)) => ws,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "WebSocket connect failed");
                let _ = events.send(TransportEvent::Failed(e.to_string())).await;
                let _ = events.send(TransportEvent::Closed).await;
                return;
            }
        }
    };

    if events.send(TransportEvent::Opened).await.is_err() {
        return;
    }

    let (mut ws_tx, mut ws_rx) = ws.split();

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                let _ = ws_tx.send(Message::Close(None)).await;
                break;
            }
            frame = outbound_rx.recv() => {
                let Some(text) = frame else { break };
                if let Err(e) = ws_tx.send(Message::Text(text.into())).await {
                    tracing::warn!(error = %e, "WebSocket send failed");
                    let _ = events.send(TransportEvent::Failed(e.to_string())).await;
                    break;
                }
            }
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if events.send(TransportEvent::Frame(text.to_string())).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // ping/pong/binary are not part of the protocol
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "WebSocket read failed");
                        let _ = events.send(TransportEvent::Failed(e.to_string())).await;
                        break;
                    }
                }
            }
        }
    }

    let _ = events.send(TransportEvent::Closed).await;
}
