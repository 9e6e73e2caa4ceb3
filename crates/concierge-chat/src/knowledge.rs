//! Knowledge base loader.
//!
//! Fetches and parses the static FAQ document exactly once at startup. There
//! are no retries: if the single attempt fails, the widget runs for the rest
//! of the session in degraded mode (see [`crate::resolver`]).

use std::path::Path;

use concierge_core::types::KnowledgeBase;
use tracing::info;

use crate::error::ChatError;

/// Parse a FAQ document from its JSON text.
///
/// All four top-level fields (`greeting`, `default_response`,
/// `template_questions`, `questions`) are required; a document missing any
/// of them is rejected as malformed.
pub fn parse(json: &str) -> Result<KnowledgeBase, ChatError> {
    serde_json::from_str(json).map_err(|e| ChatError::Malformed(e.to_string()))
}

/// Load the FAQ document from disk.
///
/// One asynchronous read, one parse, no retries. The caller is expected to
/// log the error and keep running without a knowledge base on failure.
pub async fn load(path: &Path) -> Result<KnowledgeBase, ChatError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ChatError::Fetch(format!("{}: {}", path.display(), e)))?;
    let kb = parse(&content)?;
    info!(
        path = %path.display(),
        entries = kb.questions.len(),
        template_questions = kb.template_questions.len(),
        "Knowledge base loaded"
    );
    Ok(kb)
}
