//! Per-turn query state

use crate::error::{Error, Result};

/// Working state of a single question (not persisted)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Verbatim user input
    pub original_question: String,
    /// Standalone form of the question; equals the original until rewritten
    pub rewritten_question: String,
}

impl Query {
    /// Create a query from user input. Blank input is rejected.
    pub fn new(question: impl Into<String>) -> Result<Self> {
        let question = question.into();
        if question.trim().is_empty() {
            return Err(Error::EmptyInput);
        }
        Ok(Self {
            rewritten_question: question.clone(),
            original_question: question,
        })
    }

    /// Set the standalone form of the question
    pub fn with_rewrite(mut self, rewritten: impl Into<String>) -> Self {
        self.rewritten_question = rewritten.into();
        self
    }

    /// Whether rewriting changed the question
    pub fn was_rewritten(&self) -> bool {
        self.rewritten_question != self.original_question
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_defaults_rewrite_to_original() {
        let query = Query::new("What is a heap?").unwrap();
        assert_eq!(query.rewritten_question, "What is a heap?");
        assert!(!query.was_rewritten());
    }

    #[test]
    fn test_blank_input_rejected() {
        assert!(matches!(Query::new(""), Err(Error::EmptyInput)));
        assert!(matches!(Query::new("   \t"), Err(Error::EmptyInput)));
    }

    #[test]
    fn test_with_rewrite() {
        let query = Query::new("and its uses?")
            .unwrap()
            .with_rewrite("What are the use cases of a stack?");
        assert_eq!(query.original_question, "and its uses?");
        assert!(query.was_rewritten());
    }
}
