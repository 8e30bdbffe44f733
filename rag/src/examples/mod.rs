//! Few-shot example store and retriever.
//!
//! Worked question → SOQL pairs live in a vector index and are retrieved by
//! embedding similarity to the incoming question. Retrieval is a pure
//! quality enhancement: every failure path degrades to "no examples", never
//! to an error the generation loop would have to handle.

pub mod seed;

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use tokio::sync::OnceCell;

use soqlforge_core::types::{SoqlExample, StoredExample};

use crate::embeddings::{BatchOptions, EmbeddingProvider};
use crate::error::RagError;
use seed::{bundled_examples, example_content_hash};

/// A stored example with its similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredExample {
    pub example: StoredExample,
    pub similarity: f32,
}

/// Vector-indexed storage for few-shot examples.
///
/// Implementations must filter search results to the requested embedding
/// model: vectors produced under a different model are incomparable and
/// stay invisible (not deleted) until re-seeded.
#[async_trait]
pub trait ExampleStore: Send + Sync {
    async fn count(&self) -> Result<usize, RagError>;

    /// Insert examples with their pre-computed embeddings, parallel slices.
    async fn insert(
        &self,
        examples: &[StoredExample],
        embeddings: &[Vec<f32>],
    ) -> Result<usize, RagError>;

    /// Nearest neighbours of `query` among examples embedded under
    /// `embedding_model`.
    async fn search(
        &self,
        query: &[f32],
        k: usize,
        embedding_model: &str,
    ) -> Result<Vec<ScoredExample>, RagError>;
}

/// In-memory [`ExampleStore`] used by tests and local runs.
#[derive(Default)]
pub struct InMemoryExampleStore {
    entries: std::sync::RwLock<Vec<(StoredExample, Vec<f32>)>>,
}

impl InMemoryExampleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl ExampleStore for InMemoryExampleStore {
    async fn count(&self) -> Result<usize, RagError> {
        Ok(self.entries.read().expect("store lock poisoned").len())
    }

    async fn insert(
        &self,
        examples: &[StoredExample],
        embeddings: &[Vec<f32>],
    ) -> Result<usize, RagError> {
        if examples.len() != embeddings.len() {
            return Err(RagError::Store(format!(
                "mismatch: {} examples but {} embeddings",
                examples.len(),
                embeddings.len()
            )));
        }
        let mut entries = self.entries.write().expect("store lock poisoned");
        for (example, embedding) in examples.iter().zip(embeddings) {
            entries.push((example.clone(), embedding.clone()));
        }
        Ok(examples.len())
    }

    async fn search(
        &self,
        query: &[f32],
        k: usize,
        embedding_model: &str,
    ) -> Result<Vec<ScoredExample>, RagError> {
        let entries = self.entries.read().expect("store lock poisoned");
        let mut scored: Vec<ScoredExample> = entries
            .iter()
            .filter(|(example, _)| example.embedding_model == embedding_model)
            .map(|(example, embedding)| ScoredExample {
                example: example.clone(),
                similarity: cosine_similarity(query, embedding),
            })
            .collect();
        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        Ok(scored)
    }
}

/// Retrieves the most similar worked examples for a question.
pub struct ExampleRetriever {
    store: Arc<dyn ExampleStore>,
    provider: Arc<dyn EmbeddingProvider>,
    /// One-shot seeding guard; holds whether seeding succeeded. A failed
    /// attempt is recorded and never retried.
    seeded: OnceCell<bool>,
}

impl ExampleRetriever {
    pub fn new(store: Arc<dyn ExampleStore>, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            store,
            provider,
            seeded: OnceCell::new(),
        }
    }

    /// Find up to `k` examples similar to `question`.
    ///
    /// Returns an empty list on any failure (missing provider, unreachable
    /// store, nothing seeded) so callers can always proceed without
    /// examples.
    pub async fn find_similar(&self, question: &str, k: usize) -> Vec<SoqlExample> {
        self.ensure_seeded().await;

        let query = match self.provider.embed(question).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!("example retrieval skipped, embedding failed: {e}");
                return Vec::new();
            }
        };

        match self
            .store
            .search(&query, k, self.provider.model_name())
            .await
        {
            Ok(hits) => hits.into_iter().map(|h| h.example.example).collect(),
            Err(e) => {
                warn!("example retrieval skipped, store search failed: {e}");
                Vec::new()
            }
        }
    }

    /// Seed the store from the bundled set if it is empty. Runs at most
    /// once per retriever; a failed seed leaves the store empty and
    /// retrieval degraded.
    async fn ensure_seeded(&self) {
        self.seeded
            .get_or_init(|| async {
                match self.seed_if_empty().await {
                    Ok(inserted) => {
                        if inserted > 0 {
                            debug!("seeded example store with {inserted} bundled examples");
                        }
                        true
                    }
                    Err(e) => {
                        warn!("example store seeding failed, retrieval degraded: {e}");
                        false
                    }
                }
            })
            .await;
    }

    async fn seed_if_empty(&self) -> Result<usize, RagError> {
        if self.store.count().await? > 0 {
            return Ok(0);
        }

        let examples = bundled_examples();
        let questions: Vec<String> = examples.iter().map(|e| e.question.clone()).collect();
        let embeddings = self
            .provider
            .embed_batch(&questions, &BatchOptions::default())
            .await?;

        let model = self.provider.model_name().to_string();
        let stored: Vec<StoredExample> = examples
            .into_iter()
            .map(|example| {
                let content_hash = example_content_hash(&example);
                StoredExample {
                    example,
                    embedding_model: model.clone(),
                    content_hash,
                }
            })
            .collect();

        self.store.insert(&stored, &embeddings).await
    }
}
