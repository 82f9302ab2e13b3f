//! Conversation state machine.
//!
//! One question is in flight at a time. Events move the session through
//! its phases:
//! - Idle -> Submitted (a question was accepted)
//! - Submitted -> Awaiting (the answer chain was started)
//! - Awaiting -> Idle (the answer arrived and the turn was recorded)
//! - any -> Idle (clear)
//!
//! Every completed turn and every clear bumps the generation. Inputs and
//! answers are tagged with the generation they were produced for, so
//! anything left over from before a clear is dropped instead of leaking
//! into the new conversation.

use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Where the session is in answering the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Ready for a new question.
    Idle,
    /// A question was accepted but the answer chain has not started.
    Submitted,
    /// Retrieval and synthesis are running.
    Awaiting,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "Idle"),
            Phase::Submitted => write!(f, "Submitted"),
            Phase::Awaiting => write!(f, "Awaiting"),
        }
    }
}

/// A question and the reply recorded for it. Never modified once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub user_text: String,
    pub bot_text: String,
    pub answered_at: DateTime<Utc>,
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The user submitted `text` while looking at `generation`.
    Submit { text: String, generation: u64 },
    /// The driver started answering the submitted question.
    Dispatch,
    /// The answer chain finished for `generation`.
    AnswerReady { generation: u64, answer: String },
    /// Reset the conversation.
    Clear,
}

/// Work the driver must perform after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Run retrieval and synthesis for `question`, then report back with
    /// `Event::AnswerReady` carrying the same generation.
    RequestAnswer { question: String, generation: u64 },
}

/// Why an event was refused. Refused submissions are not queued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Still answering the previous question.")]
    Busy,

    #[error("Please enter a question.")]
    Blank,

    #[error("That question is already being answered.")]
    Duplicate,

    #[error("That input was made before the conversation was cleared.")]
    Stale,

    #[error("Cannot {event} while {phase}.")]
    OutOfOrder { phase: Phase, event: &'static str },
}

/// Result of applying one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The state changed; perform the effect, if any.
    Applied(Option<Effect>),
    /// The event was refused and the state is unchanged.
    Rejected(Rejection),
    /// An answer for an outdated generation was dropped.
    Discarded,
}

/// Per-session conversation state.
#[derive(Debug, Clone)]
pub struct SessionState {
    id: Uuid,
    history: Vec<ConversationTurn>,
    pending_input: Option<String>,
    generation: u64,
    phase: Phase,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            history: Vec::new(),
            pending_input: None,
            generation: 0,
            phase: Phase::Idle,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Completed turns, oldest first.
    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    /// The question being answered, if any.
    pub fn pending_input(&self) -> Option<&str> {
        self.pending_input.as_deref()
    }

    /// True from acceptance of a question until its turn is recorded.
    pub fn awaiting_answer(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Apply one event.
    pub fn apply(&mut self, event: Event) -> Outcome {
        let from = self.phase;
        let outcome = match event {
            Event::Submit { text, generation } => self.submit(text, generation),
            Event::Dispatch => self.dispatch(),
            Event::AnswerReady { generation, answer } => self.answer_ready(generation, answer),
            Event::Clear => self.clear(),
        };

        match &outcome {
            Outcome::Applied(_) => tracing::debug!(
                "Session {}: {} -> {} (generation {})",
                self.id,
                from,
                self.phase,
                self.generation
            ),
            Outcome::Rejected(reason) => {
                tracing::debug!("Session {}: rejected in {}: {}", self.id, from, reason)
            }
            Outcome::Discarded => {
                tracing::warn!("Session {}: discarded answer for an outdated generation", self.id)
            }
        }

        outcome
    }

    fn submit(&mut self, text: String, generation: u64) -> Outcome {
        let question = text.trim();
        if question.is_empty() {
            return Outcome::Rejected(Rejection::Blank);
        }
        if generation != self.generation {
            return Outcome::Rejected(Rejection::Stale);
        }
        if self.pending_input.as_deref() == Some(question) {
            return Outcome::Rejected(Rejection::Duplicate);
        }
        if self.phase != Phase::Idle {
            return Outcome::Rejected(Rejection::Busy);
        }

        let question = question.to_string();
        self.pending_input = Some(question.clone());
        self.phase = Phase::Submitted;

        Outcome::Applied(Some(Effect::RequestAnswer {
            question,
            generation,
        }))
    }

    fn dispatch(&mut self) -> Outcome {
        if self.phase != Phase::Submitted {
            return Outcome::Rejected(Rejection::OutOfOrder {
                phase: self.phase,
                event: "dispatch",
            });
        }
        self.phase = Phase::Awaiting;
        Outcome::Applied(None)
    }

    fn answer_ready(&mut self, generation: u64, answer: String) -> Outcome {
        if generation != self.generation {
            return Outcome::Discarded;
        }
        if self.phase != Phase::Awaiting {
            return Outcome::Rejected(Rejection::OutOfOrder {
                phase: self.phase,
                event: "record an answer",
            });
        }

        // Awaiting implies a pending question.
        let user_text = self.pending_input.take().unwrap_or_default();
        self.history.push(ConversationTurn {
            user_text,
            bot_text: answer,
            answered_at: Utc::now(),
        });
        self.phase = Phase::Idle;
        self.generation += 1;

        Outcome::Applied(None)
    }

    fn clear(&mut self) -> Outcome {
        self.history.clear();
        self.pending_input = None;
        self.phase = Phase::Idle;
        self.generation += 1;
        Outcome::Applied(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submit(state: &mut SessionState, text: &str) -> Outcome {
        let generation = state.generation();
        state.apply(Event::Submit {
            text: text.to_string(),
            generation,
        })
    }

    fn answer(state: &mut SessionState, generation: u64, text: &str) -> Outcome {
        state.apply(Event::AnswerReady {
            generation,
            answer: text.to_string(),
        })
    }

    /// Submit, dispatch and answer one question.
    fn complete_turn(state: &mut SessionState, question: &str, reply: &str) {
        let generation = state.generation();
        assert!(matches!(submit(state, question), Outcome::Applied(Some(_))));
        assert_eq!(state.apply(Event::Dispatch), Outcome::Applied(None));
        assert_eq!(answer(state, generation, reply), Outcome::Applied(None));
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Idle.to_string(), "Idle");
        assert_eq!(Phase::Submitted.to_string(), "Submitted");
        assert_eq!(Phase::Awaiting.to_string(), "Awaiting");
    }

    #[test]
    fn test_new_session_is_idle_and_empty() {
        let state = SessionState::new();
        assert_eq!(state.phase(), Phase::Idle);
        assert!(state.history().is_empty());
        assert!(state.pending_input().is_none());
        assert!(!state.awaiting_answer());
        assert_eq!(state.generation(), 0);
    }

    #[test]
    fn test_accepted_submit_requests_answer() {
        let mut state = SessionState::new();

        let outcome = submit(&mut state, "  What was revenue?  ");

        assert_eq!(
            outcome,
            Outcome::Applied(Some(Effect::RequestAnswer {
                question: "What was revenue?".to_string(),
                generation: 0,
            }))
        );
        assert_eq!(state.phase(), Phase::Submitted);
        assert!(state.awaiting_answer());
        assert_eq!(state.pending_input(), Some("What was revenue?"));
    }

    #[test]
    fn test_blank_submit_rejected() {
        let mut state = SessionState::new();
        assert_eq!(
            submit(&mut state, "   \n"),
            Outcome::Rejected(Rejection::Blank)
        );
        assert_eq!(state.phase(), Phase::Idle);
    }

    #[test]
    fn test_single_flight() {
        let mut state = SessionState::new();
        submit(&mut state, "Q1");

        assert_eq!(submit(&mut state, "Q1"), Outcome::Rejected(Rejection::Duplicate));
        assert_eq!(submit(&mut state, "Q2"), Outcome::Rejected(Rejection::Busy));

        state.apply(Event::Dispatch);
        assert_eq!(submit(&mut state, "Q2"), Outcome::Rejected(Rejection::Busy));
        assert_eq!(state.pending_input(), Some("Q1"));

        answer(&mut state, 0, "A1");
        assert_eq!(state.history().len(), 1);
        assert!(matches!(submit(&mut state, "Q2"), Outcome::Applied(Some(_))));
    }

    #[test]
    fn test_stale_generation_rejected() {
        let mut state = SessionState::new();
        complete_turn(&mut state, "Q1", "A1");

        let outcome = state.apply(Event::Submit {
            text: "Q2".to_string(),
            generation: 0,
        });
        assert_eq!(outcome, Outcome::Rejected(Rejection::Stale));
        assert_eq!(state.phase(), Phase::Idle);
    }

    #[test]
    fn test_same_question_can_be_asked_again_after_answer() {
        let mut state = SessionState::new();
        complete_turn(&mut state, "Q1", "A1");
        complete_turn(&mut state, "Q1", "A1 again");
        assert_eq!(state.history().len(), 2);
    }

    #[test]
    fn test_answer_completes_turn() {
        let mut state = SessionState::new();
        complete_turn(&mut state, "What was revenue?", "$10M");

        let turn = &state.history()[0];
        assert_eq!(turn.user_text, "What was revenue?");
        assert_eq!(turn.bot_text, "$10M");
        assert!(state.pending_input().is_none());
        assert!(!state.awaiting_answer());
        assert_eq!(state.generation(), 1);
    }

    #[test]
    fn test_turns_are_in_submission_order() {
        let mut state = SessionState::new();
        for i in 0..5 {
            complete_turn(&mut state, &format!("Q{}", i), &format!("A{}", i));
        }

        let questions: Vec<&str> = state.history().iter().map(|t| t.user_text.as_str()).collect();
        assert_eq!(questions, vec!["Q0", "Q1", "Q2", "Q3", "Q4"]);
        assert!(state
            .history()
            .windows(2)
            .all(|w| w[0].answered_at <= w[1].answered_at));
        assert_eq!(state.generation(), 5);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut state = SessionState::new();
        complete_turn(&mut state, "Q1", "A1");
        submit(&mut state, "Q2");
        state.apply(Event::Dispatch);
        let in_flight = state.generation();

        assert_eq!(state.apply(Event::Clear), Outcome::Applied(None));

        assert!(state.history().is_empty());
        assert!(state.pending_input().is_none());
        assert!(!state.awaiting_answer());
        assert_eq!(state.phase(), Phase::Idle);
        assert!(state.generation() > in_flight);
    }

    #[test]
    fn test_answer_after_clear_is_discarded() {
        let mut state = SessionState::new();
        submit(&mut state, "Q1");
        state.apply(Event::Dispatch);
        state.apply(Event::Clear);

        assert_eq!(answer(&mut state, 0, "late"), Outcome::Discarded);
        assert!(state.history().is_empty());
        assert!(matches!(submit(&mut state, "Q1"), Outcome::Applied(Some(_))));
    }

    #[test]
    fn test_clear_from_idle() {
        let mut state = SessionState::new();
        assert_eq!(state.apply(Event::Clear), Outcome::Applied(None));
        assert_eq!(state.generation(), 1);
    }

    #[test]
    fn test_out_of_order_events() {
        let mut state = SessionState::new();

        assert!(matches!(
            state.apply(Event::Dispatch),
            Outcome::Rejected(Rejection::OutOfOrder { .. })
        ));

        submit(&mut state, "Q1");
        assert!(matches!(
            answer(&mut state, 0, "too early"),
            Outcome::Rejected(Rejection::OutOfOrder {
                phase: Phase::Submitted,
                ..
            })
        ));
        assert_eq!(state.pending_input(), Some("Q1"));
    }

    #[test]
    fn test_rejection_messages() {
        assert_eq!(Rejection::Blank.to_string(), "Please enter a question.");
        assert_eq!(
            Rejection::OutOfOrder {
                phase: Phase::Idle,
                event: "dispatch"
            }
            .to_string(),
            "Cannot dispatch while Idle."
        );
    }
}
