/// Client configuration. The endpoint is injected here, never hardcoded at
/// the call site.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// WebSocket endpoint of the chat server.
    pub url: String,
    /// Transport event queue depth.
    pub event_queue: usize,
    /// Outbound send queue depth.
    pub outbound_queue: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:3000".into(),
            event_queue: 256,
            outbound_queue: 64,
        }
    }
}
