//! Tuning knobs for the grounding pipeline.
//!
//! The similarity thresholds and over-fetch constants here are empirically
//! chosen; they are configuration, not correctness invariants.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tuning for the value-grounding cascade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundingConfig {
    /// Results requested from each vector index in the vector tier
    pub vector_top_k: usize,
    /// Similarity floor below which vector hits are discarded
    pub min_similarity: f32,
    /// Wall-clock budget for grounding a whole batch of values
    #[serde(with = "duration_millis")]
    pub batch_timeout: Duration,
}

impl Default for GroundingConfig {
    fn default() -> Self {
        Self {
            vector_top_k: 5,
            min_similarity: 0.6,
            batch_timeout: Duration::from_secs(4),
        }
    }
}

/// Tuning for schema context building and scoped field search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Over-fetch size for table-scoped vector search. The vector backend
    /// applies its result limit before equality filters, so this must stay
    /// large or small tables starve.
    pub scoped_search_top_k: usize,
    /// Fields kept per object in scoped search
    pub max_fields_per_object: usize,
    /// Similarity floor for scoped field matches
    pub min_field_score: f32,
    /// Wall-clock budget for the draft-phase generative call
    #[serde(with = "duration_millis")]
    pub draft_timeout: Duration,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            scoped_search_top_k: 500,
            max_fields_per_object: soqlforge_core::types::MAX_FIELDS_PER_OBJECT,
            min_field_score: 0.5,
            draft_timeout: Duration::from_secs(3),
        }
    }
}

/// Tuning for the schema context cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Jaccard similarity required for a term-set hit
    pub similarity_threshold: f64,
    /// Entry time-to-live
    #[serde(with = "duration_millis")]
    pub ttl: Duration,
    /// Maximum entries per scope; oldest evicted first
    pub max_entries_per_scope: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.8,
            ttl: Duration::from_secs(300),
            max_entries_per_scope: 100,
        }
    }
}

/// Tuning for the query validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// LIMIT suggested when a query has none
    pub default_limit: u64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            default_limit: 1000,
        }
    }
}

/// All pipeline tuning in one place, for the service container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub grounding: GroundingConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub validator: ValidatorConfig,
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.context.scoped_search_top_k, 500);
        assert_eq!(config.cache.max_entries_per_scope, 100);
        assert_eq!(config.validator.default_limit, 1000);
        assert!((config.cache.similarity_threshold - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = PipelineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.cache.ttl, config.cache.ttl);
        assert_eq!(back.grounding.vector_top_k, config.grounding.vector_top_k);
    }
}
