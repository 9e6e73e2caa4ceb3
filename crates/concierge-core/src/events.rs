use serde::{Deserialize, Serialize};

use crate::types::Message;

/// Domain events emitted by the conversation engine.
///
/// Every atomic state transition of the timeline or the widget panel emits
/// exactly one event; no-ops (rejected empty input, duplicate typing marker,
/// repeated template block) emit nothing. The presentation layer subscribes
/// to these over a broadcast channel and re-renders incrementally.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub enum WidgetEvent {
    /// A user or bot message was appended to the timeline.
    MessageAppended { message: Message },

    /// The typing indicator became visible.
    TypingShown,

    /// The typing indicator was removed.
    TypingHidden,

    /// The template-question block was inserted (at most once per session).
    TemplateQuestionsShown { questions: Vec<String> },

    /// The widget panel was opened.
    PanelOpened,

    /// The widget panel was closed. History is retained.
    PanelClosed,
}
