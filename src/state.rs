use std::sync::Arc;

use crate::coordinator::SessionCoordinator;

/// Shared application state passed to all handlers via the axum State
/// extractor. The coordinator is constructed exactly once at startup and
/// shared by handle; nothing lives in process globals.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<SessionCoordinator>,
}
