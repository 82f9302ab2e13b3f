//! Conversation driver: feeds events to the state machine and performs its
//! effects.

use crate::answerer::Answerer;
use crate::state::{ConversationTurn, Effect, Event, Outcome, Rejection, SessionState};
use std::sync::Arc;
use tracing::Instrument;

/// Prefix of the reply recorded when the answer chain fails.
pub const FAILED_ANSWER_PREFIX: &str = "Sorry, I could not answer that.";

/// What happened to one submitted question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AskOutcome {
    /// The turn was recorded with the model's answer.
    Answered(ConversationTurn),
    /// The chain failed; the turn was recorded with an error message.
    Failed(ConversationTurn),
    /// The question was refused and nothing was recorded.
    Rejected(Rejection),
}

/// A chat session bound to one answering chain.
pub struct Conversation {
    state: SessionState,
    answerer: Arc<dyn Answerer>,
}

impl Conversation {
    pub fn new(answerer: Arc<dyn Answerer>) -> Self {
        Self {
            state: SessionState::new(),
            answerer,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Ask a question as of the current generation and wait for the turn.
    pub async fn ask(&mut self, text: &str) -> AskOutcome {
        let generation = self.state.generation();
        self.submit(text, generation).await
    }

    /// Submit `text` as seen at `generation`, then run the answer chain.
    ///
    /// The answer chain always ends the turn: on failure the recorded reply
    /// is an error message, so the session never stays busy.
    pub async fn submit(&mut self, text: &str, generation: u64) -> AskOutcome {
        let outcome = self.state.apply(Event::Submit {
            text: text.to_string(),
            generation,
        });

        let (question, generation) = match outcome {
            Outcome::Applied(Some(Effect::RequestAnswer {
                question,
                generation,
            })) => (question, generation),
            Outcome::Rejected(reason) => return AskOutcome::Rejected(reason),
            Outcome::Applied(None) | Outcome::Discarded => {
                return AskOutcome::Rejected(Rejection::OutOfOrder {
                    phase: self.state.phase(),
                    event: "submit",
                })
            }
        };

        if let Outcome::Rejected(reason) = self.state.apply(Event::Dispatch) {
            return AskOutcome::Rejected(reason);
        }

        let span = tracing::info_span!(
            "turn",
            session = %self.state.id(),
            generation = generation
        );
        let result = self
            .answerer
            .answer(&question)
            .instrument(span.clone())
            .await;

        let _entered = span.enter();
        let (answer, failed) = match result {
            Ok(answer) => {
                tracing::info!("Answered ({} chars)", answer.len());
                (answer, false)
            }
            Err(e) => {
                tracing::error!("Answering failed: {}", e);
                (format!("{}\n\n{}", FAILED_ANSWER_PREFIX, e), true)
            }
        };

        match self.state.apply(Event::AnswerReady { generation, answer }) {
            Outcome::Applied(_) => {}
            Outcome::Rejected(reason) => return AskOutcome::Rejected(reason),
            Outcome::Discarded => return AskOutcome::Rejected(Rejection::Stale),
        }

        // AnswerReady was applied, so the turn was just appended.
        match self.state.history().last().cloned() {
            Some(turn) if failed => AskOutcome::Failed(turn),
            Some(turn) => AskOutcome::Answered(turn),
            None => AskOutcome::Rejected(Rejection::Stale),
        }
    }

    /// Forget the conversation; any in-flight answer will be dropped.
    pub fn clear(&mut self) {
        self.state.apply(Event::Clear);
        tracing::info!("Conversation cleared (session {})", self.state.id());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use filings_core::{AppError, AppResult};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Echo {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Answerer for Echo {
        async fn answer(&self, question: &str) -> AppResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("You asked: {}", question))
        }
    }

    struct Failing;

    #[async_trait]
    impl Answerer for Failing {
        async fn answer(&self, _question: &str) -> AppResult<String> {
            Err(AppError::Synthesis("the model did not answer within 120s".to_string()))
        }
    }

    fn echo() -> Arc<Echo> {
        Arc::new(Echo {
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_ask_records_turn() {
        let answerer = echo();
        let mut conversation = Conversation::new(answerer.clone());

        let outcome = conversation.ask("What is revenue?").await;

        match outcome {
            AskOutcome::Answered(turn) => {
                assert_eq!(turn.user_text, "What is revenue?");
                assert_eq!(turn.bot_text, "You asked: What is revenue?");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(conversation.state().history().len(), 1);
        assert!(!conversation.state().awaiting_answer());
        assert_eq!(answerer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_blank_question_never_reaches_answerer() {
        let answerer = echo();
        let mut conversation = Conversation::new(answerer.clone());

        assert_eq!(
            conversation.ask("   ").await,
            AskOutcome::Rejected(Rejection::Blank)
        );
        assert_eq!(answerer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stale_submission_never_reaches_answerer() {
        let answerer = echo();
        let mut conversation = Conversation::new(answerer.clone());
        let seen = conversation.state().generation();
        conversation.clear();

        assert_eq!(
            conversation.submit("Q", seen).await,
            AskOutcome::Rejected(Rejection::Stale)
        );
        assert_eq!(answerer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failure_completes_turn_with_error_message() {
        let mut conversation = Conversation::new(Arc::new(Failing));

        let outcome = conversation.ask("Q1").await;

        match outcome {
            AskOutcome::Failed(turn) => {
                assert!(turn.bot_text.starts_with(FAILED_ANSWER_PREFIX));
                assert!(turn.bot_text.contains("within 120s"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(!conversation.state().awaiting_answer());
        assert!(matches!(
            conversation.ask("Q2").await,
            AskOutcome::Failed(_)
        ));
        assert_eq!(conversation.state().history().len(), 2);
    }

    #[tokio::test]
    async fn test_clear_empties_history() {
        let mut conversation = Conversation::new(echo());
        conversation.ask("Q1").await;
        conversation.ask("Q2").await;

        conversation.clear();

        assert!(conversation.state().history().is_empty());
        assert!(matches!(
            conversation.ask("Q1").await,
            AskOutcome::Answered(_)
        ));
    }
}
