//! Conversation timeline: the append-only message log.
//!
//! Holds exchanged messages plus two ephemeral artifacts: at most one typing
//! marker (the only entry ever removed) and at most one template-question
//! block per session. Every actual state change emits one [`WidgetEvent`]
//! on the broadcast channel; no-ops emit nothing.

use concierge_core::events::WidgetEvent;
use concierge_core::types::{Message, TimelineEntry};
use tokio::sync::broadcast;

/// Append-only ordered log of conversation entries.
pub struct Timeline {
    entries: Vec<TimelineEntry>,
    templates_shown: bool,
    events: broadcast::Sender<WidgetEvent>,
}

impl Timeline {
    /// Create a timeline with an event channel of the given capacity.
    pub fn new(event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity);
        Self {
            entries: Vec::new(),
            templates_shown: false,
            events,
        }
    }

    /// Subscribe to timeline and widget events.
    pub fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.events.subscribe()
    }

    /// The event sender, for co-publishers (the widget controller emits
    /// panel open/close events on the same channel).
    pub fn event_sender(&self) -> broadcast::Sender<WidgetEvent> {
        self.events.clone()
    }

    /// Append a user message. Whitespace-only text is silently rejected.
    ///
    /// Returns whether a message was appended.
    pub fn append_user(&mut self, text: &str) -> bool {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return false;
        }
        let message = Message::user(trimmed);
        self.entries.push(TimelineEntry::Message(message.clone()));
        self.emit(WidgetEvent::MessageAppended { message });
        true
    }

    /// Append a bot message, optionally flagged as the greeting.
    pub fn append_bot(&mut self, text: &str, is_greeting: bool) {
        let message = Message::bot(text, is_greeting);
        self.entries.push(TimelineEntry::Message(message.clone()));
        self.emit(WidgetEvent::MessageAppended { message });
    }

    /// Show the typing indicator. Idempotent: a second call while the marker
    /// is visible does nothing.
    pub fn show_typing(&mut self) {
        if self.has_typing() {
            return;
        }
        self.entries.push(TimelineEntry::Typing);
        self.emit(WidgetEvent::TypingShown);
    }

    /// Remove the typing indicator. No-op if none is present.
    pub fn hide_typing(&mut self) {
        if let Some(pos) = self.entries.iter().position(TimelineEntry::is_typing) {
            self.entries.remove(pos);
            self.emit(WidgetEvent::TypingHidden);
        }
    }

    /// Insert the template-question block. At most once per session; an
    /// empty list is a no-op.
    pub fn show_template_questions(&mut self, questions: &[String]) {
        if self.templates_shown || questions.is_empty() {
            return;
        }
        self.entries.push(TimelineEntry::TemplateQuestions {
            questions: questions.to_vec(),
        });
        self.templates_shown = true;
        self.emit(WidgetEvent::TemplateQuestionsShown {
            questions: questions.to_vec(),
        });
    }

    /// All entries in append order.
    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    /// Messages only, in append order (skips ephemeral artifacts).
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().filter_map(TimelineEntry::as_message)
    }

    /// Whether the typing marker is currently visible.
    pub fn has_typing(&self) -> bool {
        self.entries.iter().any(TimelineEntry::is_typing)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Send an event, ignoring the error when nobody is subscribed.
    fn emit(&self, event: WidgetEvent) {
        let _ = self.events.send(event);
    }
}
