//! Table-scoped field search.
//!
//! Global vector search over every field in a schema returns junk because
//! table context is lost, so each target object is searched independently
//! with the field index filtered to that object. The vector backend applies
//! its result limit *before* the equality filter, which forces a large
//! over-fetch; without it, fields of small objects are crowded out by big
//! ones and the search silently starves.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use log::debug;

use soqlforge_core::graph::FIELD_INDEX;
use soqlforge_core::types::{ScopedFieldResult, CORE_FIELDS};
use soqlforge_core::{GraphError, MetadataGraph};
use soqlforge_rag::EmbeddingProvider;

use crate::config::ContextConfig;

/// A scoped field search request.
#[derive(Debug, Clone)]
pub struct ScopedFieldQuery {
    /// Objects to search, each independently
    pub target_objects: Vec<String>,
    /// The natural-language query driving relevance
    pub query: String,
    /// Per-object field cap; defaults to the configured cap
    pub max_fields_per_object: Option<usize>,
    /// Similarity floor; defaults to the configured floor
    pub min_score: Option<f32>,
}

/// Searches fields per object over the filtered vector index.
pub struct ScopedFieldSearch {
    graph: Arc<dyn MetadataGraph>,
    provider: Arc<dyn EmbeddingProvider>,
    config: ContextConfig,
}

impl ScopedFieldSearch {
    pub fn new(
        graph: Arc<dyn MetadataGraph>,
        provider: Arc<dyn EmbeddingProvider>,
        config: ContextConfig,
    ) -> Self {
        Self {
            graph,
            provider,
            config,
        }
    }

    /// Search every target object concurrently.
    ///
    /// Objects are fully independent: one object's failure (or an empty
    /// vector index for it) produces a core-fields-only fallback for that
    /// object and never affects its siblings. If the embedding step itself
    /// fails, every object falls back.
    pub async fn search_fields_scoped(&self, request: &ScopedFieldQuery) -> Vec<ScopedFieldResult> {
        let max_fields = request
            .max_fields_per_object
            .unwrap_or(self.config.max_fields_per_object);
        let min_score = request.min_score.unwrap_or(self.config.min_field_score);

        let query_vector = match self.provider.embed(&request.query).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                debug!("scoped field search embedding failed, falling back: {e}");
                None
            }
        };

        let searches = request.target_objects.iter().map(|object| {
            let vector = query_vector.clone();
            async move {
                match vector {
                    Some(vector) => self
                        .search_one_object(object, &vector, max_fields, min_score)
                        .await
                        .unwrap_or_else(|e| {
                            debug!("scoped field search for {object} failed: {e}");
                            fallback_result(object)
                        }),
                    None => fallback_result(object),
                }
            }
        });

        join_all(searches).await
    }

    async fn search_one_object(
        &self,
        object: &str,
        query_vector: &[f32],
        max_fields: usize,
        min_score: f32,
    ) -> Result<ScopedFieldResult, GraphError> {
        let mut filter = HashMap::new();
        filter.insert("object_api_name".to_string(), object.to_string());

        // Over-fetch: the backend trims to top_k before filtering, so the
        // request size must dwarf the index partition we care about.
        let hits = self
            .graph
            .vector_search(
                FIELD_INDEX,
                query_vector,
                self.config.scoped_search_top_k,
                Some(&filter),
            )
            .await?;

        let mut vector_matched = Vec::new();
        let mut scores = Vec::new();
        let mut fields: Vec<String> = CORE_FIELDS.iter().map(|f| f.to_string()).collect();

        for hit in hits {
            if hit.score < min_score {
                continue;
            }
            // Defensive re-filter; cheap, and protects against backends
            // that return unfiltered hits.
            if hit.object_api_name.as_deref() != Some(object) {
                continue;
            }
            if fields.len() >= max_fields {
                break;
            }
            if fields.iter().any(|f| f.eq_ignore_ascii_case(&hit.api_name)) {
                continue;
            }
            fields.push(hit.api_name.clone());
            vector_matched.push(hit.api_name);
            scores.push(hit.score);
        }

        if vector_matched.is_empty() {
            return Ok(fallback_result(object));
        }

        Ok(ScopedFieldResult {
            object_api_name: object.to_string(),
            fields,
            vector_matched,
            scores,
            used_fallback: false,
        })
    }
}

/// The core-fields-only result used whenever vector search contributes
/// nothing for an object.
fn fallback_result(object: &str) -> ScopedFieldResult {
    ScopedFieldResult {
        object_api_name: object.to_string(),
        fields: CORE_FIELDS.iter().map(|f| f.to_string()).collect(),
        vector_matched: Vec::new(),
        scores: Vec::new(),
        used_fallback: true,
    }
}
