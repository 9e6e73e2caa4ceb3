//! Error types for the conversation engine.

use concierge_core::error::ConciergeError;

/// Errors from the conversation engine.
///
/// None of these are fatal to the hosting page: a failed knowledge-base
/// load leaves the widget running in degraded mode, answering every query
/// with the fixed "still loading" message.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("knowledge base fetch failed: {0}")]
    Fetch(String),
    #[error("knowledge base document is malformed: {0}")]
    Malformed(String),
}

impl From<ConciergeError> for ChatError {
    fn from(err: ConciergeError) -> Self {
        match err {
            ConciergeError::Io(e) => ChatError::Fetch(e.to_string()),
            ConciergeError::Serialization(msg) => ChatError::Malformed(msg),
            other => ChatError::Malformed(other.to_string()),
        }
    }
}
