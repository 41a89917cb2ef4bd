//! Conversation sessions and the interactive loop

pub mod chat;
pub mod repl;

pub use chat::{ChatSession, TurnOutcome};
pub use repl::{ExitStatus, LineSource, RustylineSource, SessionLoop, SessionOutcome, SessionState};
