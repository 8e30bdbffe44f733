//! Embedding generation.

pub mod batching;
pub mod provider;

pub use batching::{embed_in_batches, BatchOptions};
pub use provider::{EmbeddingProvider, OllamaProvider, OpenAiProvider};
