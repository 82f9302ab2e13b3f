//! Conversational layer of the filings chat.
//!
//! [`SessionState`] is an explicit state machine advanced by [`Event`]s;
//! [`Conversation`] drives it and runs the [`Answerer`] for each accepted
//! question.

pub mod answerer;
pub mod conversation;
pub mod state;


pub use answerer::Answerer;
pub use conversation::{AskOutcome, Conversation, FAILED_ANSWER_PREFIX};
pub use state::{ConversationTurn, Effect, Event, Outcome, Phase, Rejection, SessionState};
