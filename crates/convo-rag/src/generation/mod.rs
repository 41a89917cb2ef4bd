//! Query rewriting and grounded answer generation

pub mod composer;
pub mod prompt;
pub mod rewriter;

pub use composer::AnswerComposer;
pub use prompt::{PromptBuilder, NOT_FOUND_ANSWER, NO_HISTORY_PLACEHOLDER};
pub use rewriter::QueryRewriter;
