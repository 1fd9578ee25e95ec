//! Domain error taxonomy for collaboration event handlers.
//!
//! Every handler converts its own failure into an `error` wire event sent
//! to the originating connection only; nothing here crosses into the room
//! registry or the broadcast relay.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollabError {
    /// User lacks access to the project. Reported to the sender; the
    /// connection stays alive and no state changes.
    #[error("Unauthorized access to project")]
    Unauthorized,

    /// Referenced entity missing at read time.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// External store read/write failed. No broadcast happens for the
    /// failed event.
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// External call exceeded the configured deadline. Treated exactly
    /// like a persistence/authorization failure by callers.
    #[error("external service timed out")]
    Timeout,
}

impl CollabError {
    /// Message carried by the `error` event sent back to the client.
    pub fn wire_message(&self) -> String {
        self.to_string()
    }
}
