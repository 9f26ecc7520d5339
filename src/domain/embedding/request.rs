//! Embedding request types

use serde::{Deserialize, Serialize};

/// Input for embedding generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbeddingInput {
    /// Single text input
    Single(String),
    /// Batch of text inputs
    Batch(Vec<String>),
}

impl EmbeddingInput {
    /// Get all inputs as a vector
    pub fn as_vec(&self) -> Vec<&str> {
        match self {
            EmbeddingInput::Single(s) => vec![s.as_str()],
            EmbeddingInput::Batch(v) => v.iter().map(|s| s.as_str()).collect(),
        }
    }

    /// Get the number of inputs
    pub fn len(&self) -> usize {
        match self {
            EmbeddingInput::Single(_) => 1,
            EmbeddingInput::Batch(v) => v.len(),
        }
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        match self {
            EmbeddingInput::Single(s) => s.is_empty(),
            EmbeddingInput::Batch(v) => v.is_empty(),
        }
    }
}

/// Request to generate embeddings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// Model to use for embedding
    model: String,
    /// Input text(s) to embed
    input: EmbeddingInput,
    /// Optional dimensions (for models that support it)
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

impl EmbeddingRequest {
    /// Create a new embedding request
    pub fn new(model: impl Into<String>, input: EmbeddingInput) -> Self {
        Self {
            model: model.into(),
            input,
            dimensions: None,
        }
    }

    /// Create a request for a single text
    pub fn single(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(model, EmbeddingInput::Single(text.into()))
    }

    /// Create a request for a batch of texts
    pub fn batch(model: impl Into<String>, texts: Vec<String>) -> Self {
        Self::new(model, EmbeddingInput::Batch(texts))
    }

    /// Set the output dimensions
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Get the model
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the input
    pub fn input(&self) -> &EmbeddingInput {
        &self.input
    }

    /// Get all input texts
    pub fn inputs(&self) -> Vec<&str> {
        self.input.as_vec()
    }

    /// Get the requested dimensions
    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_input() {
        let request = EmbeddingRequest::single("test-model", "hello");

        assert_eq!(request.model(), "test-model");
        assert_eq!(request.inputs(), vec!["hello"]);
        assert_eq!(request.input().len(), 1);
    }

    #[test]
    fn test_batch_input() {
        let request = EmbeddingRequest::batch("test-model", vec!["a".into(), "b".into()]);

        assert_eq!(request.inputs(), vec!["a", "b"]);
        assert_eq!(request.input().len(), 2);
        assert!(!request.input().is_empty());
    }

    #[test]
    fn test_with_dimensions() {
        let request = EmbeddingRequest::single("test-model", "hello").with_dimensions(256);

        assert_eq!(request.dimensions(), Some(256));
    }
}
