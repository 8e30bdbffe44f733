//! Chunked batch embedding with rate-limit backoff.
//!
//! Large batches are split into fixed-size chunks processed sequentially
//! (not fanned out) specifically to stay inside upstream rate limits. A
//! rate-limited chunk is retried with exponential backoff before the whole
//! batch is failed; chunks that already succeeded are not re-embedded.

use std::time::Duration;

use log::{debug, warn};

use crate::embeddings::provider::EmbeddingProvider;
use crate::error::RagError;

/// Tuning for [`embed_in_batches`].
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Texts per upstream call
    pub batch_size: usize,
    /// Retries per chunk after a rate-limit signal
    pub max_retries: u32,
    /// First backoff delay; doubles per retry
    pub initial_backoff: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: 100,
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

/// Embed `texts` in sequential chunks, preserving input order.
///
/// Empty and whitespace-only inputs are filtered out of the upstream calls
/// and filled back in as zero vectors at their original positions.
pub async fn embed_in_batches<P>(
    provider: &P,
    texts: &[String],
    options: &BatchOptions,
) -> Result<Vec<Vec<f32>>, RagError>
where
    P: EmbeddingProvider + ?Sized,
{
    let dims = provider.dimensions();
    let mut results: Vec<Vec<f32>> = vec![vec![0.0; dims]; texts.len()];

    // Positions of texts that actually need an upstream call.
    let non_empty: Vec<(usize, String)> = texts
        .iter()
        .enumerate()
        .filter(|(_, t)| !t.trim().is_empty())
        .map(|(i, t)| (i, t.clone()))
        .collect();

    if non_empty.is_empty() {
        return Ok(results);
    }

    let batch_size = options.batch_size.max(1);
    for chunk in non_empty.chunks(batch_size) {
        let chunk_texts: Vec<String> = chunk.iter().map(|(_, t)| t.clone()).collect();
        let embeddings = embed_chunk_with_backoff(provider, &chunk_texts, options).await?;

        if embeddings.len() != chunk_texts.len() {
            return Err(RagError::Embedding(format!(
                "provider returned {} embeddings for {} inputs",
                embeddings.len(),
                chunk_texts.len()
            )));
        }

        for ((position, _), embedding) in chunk.iter().zip(embeddings) {
            results[*position] = embedding;
        }
    }

    Ok(results)
}

async fn embed_chunk_with_backoff<P>(
    provider: &P,
    texts: &[String],
    options: &BatchOptions,
) -> Result<Vec<Vec<f32>>, RagError>
where
    P: EmbeddingProvider + ?Sized,
{
    let mut backoff = options.initial_backoff;
    let mut attempt = 0;

    loop {
        match provider.embed_chunk(texts).await {
            Ok(embeddings) => return Ok(embeddings),
            Err(RagError::RateLimited(_)) if attempt < options.max_retries => {
                attempt += 1;
                debug!(
                    "embedding chunk rate limited (attempt {attempt}/{}), backing off {:?}",
                    options.max_retries, backoff
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
            Err(RagError::RateLimited(detail)) => {
                warn!(
                    "embedding chunk still rate limited after {} retries",
                    options.max_retries
                );
                return Err(RagError::RateLimited(detail));
            }
            Err(other) => return Err(other),
        }
    }
}
