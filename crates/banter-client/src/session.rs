//! The session: owns one connection's lifecycle, state, and message log.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};

use banter_core::protocol::OutboundFrame;
use banter_core::state::{ConnectionState, SessionSnapshot, SessionState, TransportEvent};

use crate::config::ClientConfig;
use crate::transport::{Connector, TransportHandle, WsConnector};

/// Session over one chat server connection.
///
/// All state mutation funnels through a single event pump task consuming the
/// transport event channel, so transitions and log appends apply in
/// wire-arrival order. `start`/`stop`/`submit` are non-blocking and safe to
/// call from any task.
pub struct Session {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    state: Arc<Mutex<SessionState>>,
    transport: Mutex<Option<TransportHandle>>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl Session {
    /// Session using the production WebSocket transport.
    pub fn new(config: ClientConfig) -> Self {
        let connector = Arc::new(WsConnector::new(config.outbound_queue));
        Self::with_connector(config, connector)
    }

    /// Session with an injected connector. Tests use a scripted one to drive
    /// the session without a socket.
    pub fn with_connector(config: ClientConfig, connector: Arc<dyn Connector>) -> Self {
        let state = SessionState::new();
        let (snapshot_tx, _) = watch::channel(state.snapshot());
        Self {
            config,
            connector,
            state: Arc::new(Mutex::new(state)),
            transport: Mutex::new(None),
            snapshot_tx,
        }
    }

    /// Open a new transport connection to the configured endpoint. Returns
    /// without waiting for the connection to establish; a no-op while a
    /// transport is already owned.
    pub fn start(&self) {
        let mut transport = self.transport.lock();
        if transport.is_some() {
            tracing::debug!("start ignored, transport already owned");
            return;
        }

        let (event_tx, event_rx) = mpsc::channel(self.config.event_queue);
        let handle = self.connector.connect(&self.config.url, event_tx);
        *transport = Some(handle);

        drop(tokio::spawn(pump_events(
            event_rx,
            Arc::clone(&self.state),
            self.snapshot_tx.clone(),
        )));
    }

    /// Close and release the owned transport, if any. Idempotent; ownership
    /// is released even if the close is not clean. Events already queued are
    /// still drained by the pump.
    pub fn stop(&self) {
        if let Some(handle) = self.transport.lock().take() {
            tracing::debug!("closing transport");
            handle.close();
        }
    }

    /// Submit one outbound chat message. Silently rejected while not
    /// connected or when the text is blank. Never blocks and never appends
    /// locally; the message shows up in the log only when the server echoes
    /// it back.
    pub fn submit(&self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        if self.state.lock().connection() != ConnectionState::Connected {
            return;
        }

        // Emptiness is checked on the trimmed text; the wire carries the raw
        // value.
        let frame = OutboundFrame::message(text);
        if let Some(handle) = self.transport.lock().as_ref() {
            let _ = handle.send(frame.encode());
        }
    }

    /// Current observable state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.lock().snapshot()
    }

    /// Change notifications for the rendering layer. Each change carries a
    /// full snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }
}

/// Applies transport events to session state in arrival order and publishes
/// a snapshot after each one. Exits when the transport task drops its event
/// sender.
async fn pump_events(
    mut events: mpsc::Receiver<TransportEvent>,
    state: Arc<Mutex<SessionState>>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
) {
    while let Some(event) = events.recv().await {
        let snapshot = {
            let mut state = state.lock();
            state.apply(event);
            state.snapshot()
        };
        let _ = snapshot_tx.send(snapshot);
    }
}
