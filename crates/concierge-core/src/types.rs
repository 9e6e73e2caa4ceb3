use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// Who authored a message in the conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The site visitor.
    User,
    /// The assistant.
    Bot,
}

// =============================================================================
// Newtype Wrappers
// =============================================================================

/// Epoch seconds. Presentation metadata only; matching never reads it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp())
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.0, 0).unwrap_or_default()
    }
}

// =============================================================================
// Messages and timeline entries
// =============================================================================

/// A single exchanged message in the conversation timeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub text: String,
    /// Presentation flag: the greeting is styled differently by the UI
    /// layer. Has no effect on matching.
    pub is_greeting: bool,
    pub created_at: Timestamp,
}

impl Message {
    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            text: text.into(),
            is_greeting: false,
            created_at: Timestamp::now(),
        }
    }

    /// Create a bot message, optionally flagged as the greeting.
    pub fn bot(text: impl Into<String>, is_greeting: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Bot,
            text: text.into(),
            is_greeting,
            created_at: Timestamp::now(),
        }
    }
}

/// One entry in the conversation timeline.
///
/// Messages are permanent; the typing marker is the only entry ever removed,
/// and the template-question block appears at most once per session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimelineEntry {
    Message(Message),
    Typing,
    TemplateQuestions { questions: Vec<String> },
}

impl TimelineEntry {
    pub fn is_typing(&self) -> bool {
        matches!(self, TimelineEntry::Typing)
    }

    pub fn as_message(&self) -> Option<&Message> {
        match self {
            TimelineEntry::Message(m) => Some(m),
            _ => None,
        }
    }
}

// =============================================================================
// Knowledge base
// =============================================================================

/// One authored FAQ entry: a keyword group and its canned answer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaqEntry {
    /// Case-insensitive tokens; a query matches if any keyword is a
    /// substring of the case-folded query text.
    pub keywords: Vec<String>,
    /// Rich-text answer, returned verbatim.
    pub answer: String,
}

/// The author-curated knowledge base, loaded once at startup.
///
/// Field names are the fixed wire names of the input document; all fields
/// are required, so deserialization fails if any is absent. Read-only after
/// load: entry order is significant, it is the resolver's tie-break rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    /// Shown on first open of the widget panel.
    pub greeting: String,
    /// Fallback answer when no entry matches.
    pub default_response: String,
    /// Suggested questions, shown once after the greeting.
    pub template_questions: Vec<String>,
    /// FAQ entries in authoring order.
    pub questions: Vec<FaqEntry>,
}
