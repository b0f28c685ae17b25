/// Optional semantic-search collaborator

pub mod breaker;
pub mod embedding;

pub use breaker::{CircuitBreaker, CircuitState};
pub use embedding::{cosine_similarity, EmbeddingGenerator, HashedEmbeddingIndex};

use crate::config::SemanticConfig;
use crate::error::Result;
use std::time::Duration;

/// Anything that can rank stored conversation ids by similarity to a query.
/// The store works without one and treats every error as "no answer".
pub trait SemanticIndex: Send {
    fn add(&mut self, id: &str, text: &str) -> Result<()>;

    fn query(&self, text: &str, top_k: usize) -> Result<Vec<String>>;

    /// Drops `id` so it is never returned again.
    fn remove(&mut self, _id: &str) -> Result<()> {
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A collaborator behind a circuit breaker.
pub struct GuardedIndex {
    index: Box<dyn SemanticIndex>,
    breaker: CircuitBreaker,
    top_k: usize,
}

impl GuardedIndex {
    pub fn new(index: Box<dyn SemanticIndex>, config: &SemanticConfig) -> Self {
        Self {
            index,
            breaker: CircuitBreaker::new(
                "semantic-index",
                config.failure_threshold,
                Duration::from_secs(config.cooldown_secs),
            ),
            top_k: config.top_k.max(1),
        }
    }

    /// The built-in hashed index, configured from `config`.
    pub fn local(config: &SemanticConfig) -> Self {
        Self::new(Box::new(HashedEmbeddingIndex::new(config.min_similarity)), config)
    }

    pub fn add(&mut self, id: &str, text: &str) -> Result<()> {
        let index = &mut self.index;
        self.breaker.call(|| index.add(id, text))
    }

    pub fn query(&self, text: &str) -> Result<Vec<String>> {
        self.breaker.call(|| self.index.query(text, self.top_k))
    }

    pub fn remove(&mut self, id: &str) -> Result<()> {
        let index = &mut self.index;
        self.breaker.call(|| index.remove(id))
    }

    pub fn clear(&mut self) -> Result<()> {
        let index = &mut self.index;
        self.breaker.call(|| index.clear())
    }

    pub fn state(&self) -> CircuitState {
        self.breaker.state()
    }
}

/// Text indexed for a conversation.
pub fn conversation_document(user_input: &str, assistant_response: &str, code_result: Option<&str>) -> String {
    let mut text = format!("User: {}\nAssistant: {}", user_input, assistant_response);
    if let Some(result) = code_result.filter(|r| !r.is_empty()) {
        text.push_str("\nResult: ");
        text.push_str(result);
    }
    text
}
