//! Widget controller: the open/closed state machine.
//!
//! Owns the panel state and the greeting-shown flag, and is the sole mutator
//! of the conversation timeline. Each submission schedules one independent
//! delayed task (the simulated "thinking" pause); per submission the typing
//! marker is always shown before and hidden before its answer is appended.
//! Overlapping submissions share the single idempotent typing marker, so one
//! submission's marker can mask another's removal. That is the documented
//! behavior of rapid-fire input, not a hazard: the controller is the only
//! writer, and submissions are deliberately not serialized.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use concierge_core::events::WidgetEvent;
use concierge_core::types::KnowledgeBase;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::resolver::resolve;
use crate::timeline::Timeline;

/// Panel state. Process-wide single instance, mutated only by the controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WidgetState {
    pub is_open: bool,
    pub has_shown_greeting: bool,
}

/// The widget's conversation orchestrator.
///
/// Constructed with explicit references to its knowledge source and timeline
/// sink; there are no ambient globals. The knowledge slot is late-binding:
/// the startup load may complete after construction, and each resolution
/// reads the slot at its own fire time.
pub struct WidgetController {
    knowledge: Arc<OnceLock<Arc<KnowledgeBase>>>,
    timeline: Arc<Mutex<Timeline>>,
    state: Mutex<WidgetState>,
    events: broadcast::Sender<WidgetEvent>,
    typing_delay: Duration,
}

impl WidgetController {
    /// Create a controller over the given timeline sink.
    ///
    /// `knowledge` may be `None` when the startup load has not finished (or
    /// failed); until [`attach_knowledge`](Self::attach_knowledge) supplies
    /// a document, every answer is the fixed "still loading" message and the
    /// greeting is withheld. `typing_delay` is the simulated thinking pause;
    /// tests pass [`Duration::ZERO`].
    pub fn new(
        knowledge: Option<Arc<KnowledgeBase>>,
        timeline: Arc<Mutex<Timeline>>,
        typing_delay: Duration,
    ) -> Self {
        let events = match timeline.lock() {
            Ok(tl) => tl.event_sender(),
            Err(poisoned) => poisoned.into_inner().event_sender(),
        };
        let slot = Arc::new(OnceLock::new());
        if let Some(kb) = knowledge {
            let _ = slot.set(kb);
        }
        Self {
            knowledge: slot,
            timeline,
            state: Mutex::new(WidgetState::default()),
            events,
            typing_delay,
        }
    }

    /// Attach a knowledge base after construction.
    ///
    /// Returns false if one was already attached (the slot is write-once).
    pub fn attach_knowledge(&self, kb: Arc<KnowledgeBase>) -> bool {
        self.knowledge.set(kb).is_ok()
    }

    /// Open the panel.
    ///
    /// The first open with a knowledge base present appends the greeting and
    /// the template-question block, exactly once per session. Opening before
    /// the knowledge base arrives shows no greeting and leaves the flag
    /// unset, so a later open can still greet.
    pub fn open(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.is_open = true;

        if !state.has_shown_greeting {
            if let Some(kb) = self.knowledge.get() {
                let mut tl = self
                    .timeline
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                tl.append_bot(&kb.greeting, true);
                tl.show_template_questions(&kb.template_questions);
                state.has_shown_greeting = true;
            }
        }

        let _ = self.events.send(WidgetEvent::PanelOpened);
    }

    /// Close the panel. The timeline is untouched; reopening shows prior
    /// history and no new greeting. In-flight resolutions are not cancelled.
    pub fn close(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.is_open = false;
        let _ = self.events.send(WidgetEvent::PanelClosed);
    }

    /// Submit visitor text.
    ///
    /// Whitespace-only input is a silent no-op: nothing is appended and no
    /// task is scheduled. Otherwise the user message and typing marker are
    /// appended synchronously, and one task is spawned that sleeps for the
    /// typing delay, hides the marker, resolves the answer, and appends it.
    /// The returned handle lets callers await settling; dropping it does not
    /// cancel the resolution.
    pub fn submit(&self, text: &str) -> Option<JoinHandle<()>> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }

        {
            let mut tl = self
                .timeline
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            tl.append_user(trimmed);
            tl.show_typing();
        }

        let timeline = Arc::clone(&self.timeline);
        let knowledge = Arc::clone(&self.knowledge);
        let delay = self.typing_delay;
        let query = trimmed.to_string();

        Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let mut tl = timeline.lock().unwrap_or_else(PoisonError::into_inner);
            tl.hide_typing();
            let answer = resolve(knowledge.get().map(|kb| kb.as_ref()), &query);
            debug!(query = %query, answer_len = answer.len(), "Query resolved");
            tl.append_bot(&answer, false);
        }))
    }

    /// Select a suggested question: identical to typing and submitting it.
    pub fn select_template_question(&self, question: &str) -> Option<JoinHandle<()>> {
        self.submit(question)
    }

    /// Current panel state snapshot.
    pub fn state(&self) -> WidgetState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_open(&self) -> bool {
        self.state().is_open
    }

    pub fn has_shown_greeting(&self) -> bool {
        self.state().has_shown_greeting
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_core::types::{FaqEntry, Role, TimelineEntry};

    fn knowledge() -> Arc<KnowledgeBase> {
        Arc::new(KnowledgeBase {
            greeting: "Hi! Ask me anything.".to_string(),
            default_response: "Ask me about my work!".to_string(),
            template_questions: vec![
                "How can I contact you?".to_string(),
                "What do you do?".to_string(),
            ],
            questions: vec![
                FaqEntry {
                    keywords: vec!["contact".to_string(), "email".to_string()],
                    answer: "Reach me at a@b.com".to_string(),
                },
                FaqEntry {
                    keywords: vec!["contact".to_string()],
                    answer: "See the contact page".to_string(),
                },
            ],
        })
    }

    fn controller_with_knowledge() -> (WidgetController, Arc<Mutex<Timeline>>) {
        let timeline = Arc::new(Mutex::new(Timeline::new(64)));
        let controller = WidgetController::new(
            Some(knowledge()),
            Arc::clone(&timeline),
            Duration::ZERO,
        );
        (controller, timeline)
    }

    fn controller_without_knowledge() -> (WidgetController, Arc<Mutex<Timeline>>) {
        let timeline = Arc::new(Mutex::new(Timeline::new(64)));
        let controller =
            WidgetController::new(None, Arc::clone(&timeline), Duration::ZERO);
        (controller, timeline)
    }

    fn message_texts(timeline: &Arc<Mutex<Timeline>>) -> Vec<(Role, String)> {
        timeline
            .lock()
            .unwrap()
            .messages()
            .map(|m| (m.role, m.text.clone()))
            .collect()
    }

    // ---- Initial state ----

    #[test]
    fn test_initial_state_closed_not_greeted() {
        let (controller, _) = controller_with_knowledge();
        assert!(!controller.is_open());
        assert!(!controller.has_shown_greeting());
    }

    // ---- Open / close transitions ----

    #[test]
    fn test_open_shows_greeting_and_templates() {
        let (controller, timeline) = controller_with_knowledge();
        controller.open();

        assert!(controller.is_open());
        assert!(controller.has_shown_greeting());

        let tl = timeline.lock().unwrap();
        assert_eq!(tl.len(), 2);
        let greeting = tl.entries()[0].as_message().unwrap();
        assert!(greeting.is_greeting);
        assert_eq!(greeting.text, "Hi! Ask me anything.");
        assert!(matches!(
            tl.entries()[1],
            TimelineEntry::TemplateQuestions { .. }
        ));
    }

    #[test]
    fn test_greeting_shown_exactly_once() {
        let (controller, timeline) = controller_with_knowledge();
        controller.open();
        controller.open();
        controller.close();
        controller.open();

        let tl = timeline.lock().unwrap();
        // One greeting, one template block, nothing else
        assert_eq!(tl.len(), 2);
    }

    #[test]
    fn test_close_preserves_history() {
        let (controller, timeline) = controller_with_knowledge();
        controller.open();
        let before = timeline.lock().unwrap().len();
        controller.close();

        assert!(!controller.is_open());
        assert_eq!(timeline.lock().unwrap().len(), before);
    }

    #[test]
    fn test_open_without_knowledge_withholds_greeting() {
        let (controller, timeline) = controller_without_knowledge();
        controller.open();

        assert!(controller.is_open());
        assert!(!controller.has_shown_greeting());
        assert!(timeline.lock().unwrap().is_empty());
    }

    #[test]
    fn test_greeting_appears_on_first_open_after_attach() {
        let (controller, timeline) = controller_without_knowledge();
        controller.open();
        controller.close();

        assert!(controller.attach_knowledge(knowledge()));
        controller.open();

        assert!(controller.has_shown_greeting());
        assert_eq!(timeline.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_attach_knowledge_is_write_once() {
        let (controller, _) = controller_with_knowledge();
        assert!(!controller.attach_knowledge(knowledge()));
    }

    // ---- Submission ----

    #[tokio::test]
    async fn test_submit_orders_user_then_answer() {
        let (controller, timeline) = controller_with_knowledge();

        let handle = controller.submit("How can I contact you?").unwrap();
        // Synchronous part already ran: user message + typing marker
        {
            let tl = timeline.lock().unwrap();
            assert!(tl.has_typing());
            assert_eq!(tl.messages().count(), 1);
        }

        handle.await.unwrap();

        let tl = timeline.lock().unwrap();
        assert!(!tl.has_typing(), "no residual typing marker");
        let texts: Vec<_> = tl.messages().map(|m| m.text.clone()).collect();
        assert_eq!(texts, vec!["How can I contact you?", "Reach me at a@b.com"]);
    }

    #[tokio::test]
    async fn test_submit_no_match_gets_default_response() {
        let (controller, timeline) = controller_with_knowledge();
        controller.submit("hello").unwrap().await.unwrap();

        let messages = message_texts(&timeline);
        assert_eq!(messages[1], (Role::Bot, "Ask me about my work!".to_string()));
    }

    #[tokio::test]
    async fn test_submit_without_knowledge_degrades() {
        let (controller, timeline) = controller_without_knowledge();
        controller.submit("contact?").unwrap().await.unwrap();

        let messages = message_texts(&timeline);
        assert_eq!(messages[1].1, crate::resolver::STILL_LOADING_RESPONSE);
    }

    #[tokio::test]
    async fn test_empty_submit_schedules_nothing() {
        let (controller, timeline) = controller_with_knowledge();
        assert!(controller.submit("").is_none());
        assert!(controller.submit("   ").is_none());
        assert!(controller.submit("\n\t").is_none());
        assert!(timeline.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submit_accepted_while_closed() {
        // The state machine accepts submit in either state; reachability
        // through the open UI is the presentation layer's concern.
        let (controller, timeline) = controller_with_knowledge();
        controller.submit("email").unwrap().await.unwrap();
        assert_eq!(timeline.lock().unwrap().messages().count(), 2);
    }

    #[tokio::test]
    async fn test_close_does_not_cancel_pending_resolution() {
        let (controller, timeline) = controller_with_knowledge();
        let handle = controller.submit("contact").unwrap();
        controller.close();
        handle.await.unwrap();

        let messages = message_texts(&timeline);
        assert_eq!(messages[1].1, "Reach me at a@b.com");
    }

    #[tokio::test]
    async fn test_overlapping_submissions_share_one_typing_marker() {
        let (controller, timeline) = controller_with_knowledge();

        let first = controller.submit("contact").unwrap();
        let second = controller.submit("something else").unwrap();

        // Both pending; show_typing is idempotent so only one marker exists
        assert_eq!(
            timeline
                .lock()
                .unwrap()
                .entries()
                .iter()
                .filter(|e| e.is_typing())
                .count(),
            1
        );

        first.await.unwrap();
        second.await.unwrap();

        let tl = timeline.lock().unwrap();
        assert!(!tl.has_typing());
        let texts: Vec<_> = tl.messages().map(|m| m.text.clone()).collect();
        assert_eq!(
            texts,
            vec![
                "contact".to_string(),
                "something else".to_string(),
                "Reach me at a@b.com".to_string(),
                "Ask me about my work!".to_string(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_production_delay_keeps_typing_visible() {
        let timeline = Arc::new(Mutex::new(Timeline::new(64)));
        let controller = WidgetController::new(
            Some(knowledge()),
            Arc::clone(&timeline),
            Duration::from_millis(800),
        );

        let handle = controller.submit("contact").unwrap();
        assert!(timeline.lock().unwrap().has_typing());

        // Paused time auto-advances across the 800 ms sleep
        handle.await.unwrap();
        let tl = timeline.lock().unwrap();
        assert!(!tl.has_typing());
        assert_eq!(tl.messages().count(), 2);
    }

    #[tokio::test]
    async fn test_select_template_question_equals_submit() {
        let (controller, timeline) = controller_with_knowledge();
        controller
            .select_template_question("How can I contact you?")
            .unwrap()
            .await
            .unwrap();

        let messages = message_texts(&timeline);
        assert_eq!(messages[0], (Role::User, "How can I contact you?".to_string()));
        assert_eq!(messages[1], (Role::Bot, "Reach me at a@b.com".to_string()));
    }

    #[tokio::test]
    async fn test_late_attach_read_at_fire_time() {
        // Knowledge attached after the submit but before the delayed task
        // resolves: the resolution sees it, mirroring the source's
        // late-binding document slot.
        let timeline = Arc::new(Mutex::new(Timeline::new(64)));
        let controller = WidgetController::new(
            None,
            Arc::clone(&timeline),
            Duration::from_millis(50),
        );

        let handle = controller.submit("contact").unwrap();
        controller.attach_knowledge(knowledge());
        handle.await.unwrap();

        let messages: Vec<_> = timeline
            .lock()
            .unwrap()
            .messages()
            .map(|m| m.text.clone())
            .collect();
        assert_eq!(messages[1], "Reach me at a@b.com");
    }
}
