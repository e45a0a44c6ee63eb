use crate::session::{EventDispatcher, SessionManager};
use crate::voice::BridgeCaptureSink;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Registry of active recordings (read-only from HTTP)
    pub manager: Arc<SessionManager>,

    /// Per-channel event queues
    pub dispatcher: Arc<EventDispatcher>,

    /// Receives audio pushed by the voice bridge
    pub capture: Arc<BridgeCaptureSink>,
}

impl AppState {
    pub fn new(manager: Arc<SessionManager>, capture: Arc<BridgeCaptureSink>) -> Self {
        let dispatcher = Arc::new(EventDispatcher::new(Arc::clone(&manager)));
        Self {
            manager,
            dispatcher,
            capture,
        }
    }
}
