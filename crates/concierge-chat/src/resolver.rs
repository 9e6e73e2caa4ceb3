//! Response resolver: visitor text to canned answer.
//!
//! Pure and deterministic. Matching is keyword containment on the
//! case-folded query; among matching entries the first in authoring order
//! wins. That ordering rule is the entire relevance policy; match count
//! and keyword length never factor in.

use concierge_core::types::KnowledgeBase;

/// Fixed reply while the knowledge base is absent (still loading, or the
/// single load attempt failed). Distinct from the document's own
/// `default_response`.
pub const STILL_LOADING_RESPONSE: &str =
    "I'm still loading my knowledge base. Please try again in a moment.";

/// Select the answer for a visitor query.
///
/// With no knowledge base, returns [`STILL_LOADING_RESPONSE`]. Otherwise
/// case-folds the query, scans entries in authoring order, and returns the
/// answer of the first entry with any keyword contained in the folded query.
/// Falls back to the document's `default_response` when nothing matches.
pub fn resolve(knowledge: Option<&KnowledgeBase>, query: &str) -> String {
    let Some(kb) = knowledge else {
        return STILL_LOADING_RESPONSE.to_string();
    };

    let folded = query.to_lowercase();

    for entry in &kb.questions {
        if entry
            .keywords
            .iter()
            .any(|kw| folded.contains(&kw.to_lowercase()))
        {
            return entry.answer.clone();
        }
    }

    kb.default_response.clone()
}
