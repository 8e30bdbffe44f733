//! # soqlforge-rag
//!
//! Retrieval-augmentation plumbing for the soqlforge pipeline:
//!
//! - Embedding provider contract with OpenAI- and Ollama-compatible
//!   implementations
//! - Rate-limit-aware chunked batch embedding
//! - The chat (generative) provider contract consumed by draft generation
//! - A vector-indexed store and retriever for few-shot SOQL examples
//!
//! Everything here is a quality enhancement to query generation: callers
//! must be able to proceed (with less context) when any of it is
//! unavailable, so retrieval entry points degrade to empty results instead
//! of raising.

pub mod chat;
pub mod embeddings;
pub mod error;
pub mod examples;

pub use chat::{ChatMessage, ChatProvider, ChatRole};
pub use embeddings::{BatchOptions, EmbeddingProvider, OllamaProvider, OpenAiProvider};
pub use error::RagError;
pub use examples::{ExampleRetriever, ExampleStore, InMemoryExampleStore, ScoredExample};
