//! The semantic grounding engine.
//!
//! Classifies free-text value fragments into schema-filter suggestions via
//! a short-circuiting cascade: cheap lexical checks, exact schema lookup,
//! fuzzy containment, an optional live-org probe, and finally vector
//! similarity. The first tier that produces anything wins; exact hits in
//! particular must never pay for an embedding call.
//!
//! Grounding never aborts a generation pipeline: every backing failure is
//! caught and treated as "no match for that tier".

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use log::debug;

use soqlforge_core::graph::{FIELD_INDEX, OBJECT_INDEX};
use soqlforge_core::parse::soql::DATE_LITERALS;
use soqlforge_core::types::{GroundedEntity, GroundingKind, GroundingResult};
use soqlforge_core::{MetadataGraph, ObjectRecord};
use soqlforge_rag::EmbeddingProvider;

use crate::config::GroundingConfig;
use crate::live::LiveOrg;

/// An object matched during object-scoped search, with its tier score.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectMatch {
    pub record: ObjectRecord,
    pub score: f32,
}

/// Grounds value fragments against the metadata graph.
pub struct GroundingEngine {
    graph: Arc<dyn MetadataGraph>,
    provider: Arc<dyn EmbeddingProvider>,
    live: Option<Arc<dyn LiveOrg>>,
    config: GroundingConfig,
}

impl GroundingEngine {
    pub fn new(
        graph: Arc<dyn MetadataGraph>,
        provider: Arc<dyn EmbeddingProvider>,
        config: GroundingConfig,
    ) -> Self {
        Self {
            graph,
            provider,
            live: None,
            config,
        }
    }

    /// Attach a live-org collaborator for the tertiary grounding tier.
    pub fn with_live(mut self, live: Arc<dyn LiveOrg>) -> Self {
        self.live = Some(live);
        self
    }

    /// Ground a single value fragment.
    pub async fn ground(&self, value: &str, org: &str) -> GroundedEntity {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return GroundedEntity::unknown(value);
        }

        // Lexically certain shapes never need the schema.
        if let Some(result) = classify_lexical(trimmed) {
            return GroundedEntity::new(trimmed, vec![result]);
        }

        // Tier 1: exact match. Short-circuits the whole cascade.
        let exact = self.ground_exact(trimmed, org).await;
        if !exact.is_empty() {
            return GroundedEntity::new(trimmed, exact);
        }

        // Tier 2: fuzzy containment over the same candidate pool.
        let fuzzy = self.ground_fuzzy(trimmed, org).await;
        if !fuzzy.is_empty() {
            return GroundedEntity::new(trimmed, fuzzy);
        }

        // Tier 3: live-org probe, when a connection exists.
        if let Some(result) = self.ground_live(trimmed, org).await {
            return GroundedEntity::new(trimmed, vec![result]);
        }

        // Tier 4: vector similarity.
        let vector = self.ground_vector(trimmed).await;
        if !vector.is_empty() {
            return GroundedEntity::new(trimmed, vector);
        }

        // Nothing matched. Proper nouns are statistically company names in
        // business data, so bias that way rather than giving up.
        if is_proper_noun(trimmed) {
            return GroundedEntity::new(trimmed, company_name_fallback(trimmed));
        }
        GroundedEntity::unknown(trimmed)
    }

    /// Ground a batch of values, deduplicating identical inputs and
    /// grounding unique values concurrently.
    ///
    /// The whole batch is bounded by the configured timeout: a slow batch
    /// loses the race and every value comes back ungrounded. Fast and
    /// ungrounded beats slow and perfect here.
    pub async fn ground_batch(&self, values: &[String], org: &str) -> Vec<GroundedEntity> {
        let mut unique: Vec<&String> = Vec::new();
        for value in values {
            if !unique.contains(&value) {
                unique.push(value);
            }
        }

        let work = join_all(unique.iter().map(|v| self.ground(v.as_str(), org)));
        let grounded = match tokio::time::timeout(self.config.batch_timeout, work).await {
            Ok(entities) => entities,
            Err(_) => {
                debug!(
                    "grounding batch of {} values timed out after {:?}",
                    unique.len(),
                    self.config.batch_timeout
                );
                unique
                    .iter()
                    .map(|v| GroundedEntity::unknown(v.as_str()))
                    .collect()
            }
        };

        let by_value: HashMap<&str, &GroundedEntity> = unique
            .iter()
            .zip(grounded.iter())
            .map(|(v, e)| (v.as_str(), e))
            .collect();

        values
            .iter()
            .map(|v| {
                by_value
                    .get(v.as_str())
                    .map(|e| (*e).clone())
                    .unwrap_or_else(|| GroundedEntity::unknown(v.as_str()))
            })
            .collect()
    }

    /// Object-scoped search with the same exact → fuzzy → vector cascade,
    /// reused by the schema context builder.
    pub async fn search_objects(&self, term: &str, org: &str) -> Vec<ObjectMatch> {
        let term = term.trim();
        if term.is_empty() {
            return Vec::new();
        }

        // Exact API name or label.
        if let Ok(Some(record)) = self.graph.get_object(org, term).await {
            return vec![ObjectMatch { record, score: 1.0 }];
        }

        // Singularised forms ("opportunities" → Opportunity).
        for candidate in crate::resolver::suffix_candidates(term) {
            if let Ok(Some(record)) = self.graph.get_object(org, &candidate).await {
                return vec![ObjectMatch { record, score: 0.9 }];
            }
        }
        if let Ok(candidates) = self.graph.find_objects(org, term).await {
            let exact_label: Vec<ObjectMatch> = candidates
                .iter()
                .filter(|o| o.label.eq_ignore_ascii_case(term))
                .map(|o| ObjectMatch {
                    record: o.clone(),
                    score: 0.95,
                })
                .collect();
            if !exact_label.is_empty() {
                return exact_label;
            }

            // Fuzzy containment.
            let fuzzy: Vec<ObjectMatch> = candidates
                .into_iter()
                .map(|record| {
                    let score = if starts_with_ignore_case(&record.api_name, term)
                        || starts_with_ignore_case(&record.label, term)
                    {
                        0.85
                    } else {
                        0.7
                    };
                    ObjectMatch { record, score }
                })
                .collect();
            if !fuzzy.is_empty() {
                return fuzzy;
            }
        }

        // Vector similarity over object embeddings.
        let query = match self.provider.embed(term).await {
            Ok(vector) => vector,
            Err(e) => {
                debug!("object search embedding for '{term}' failed: {e}");
                return Vec::new();
            }
        };
        let hits = match self
            .graph
            .vector_search(OBJECT_INDEX, &query, self.config.vector_top_k, None)
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                debug!("object vector search for '{term}' failed: {e}");
                return Vec::new();
            }
        };

        let mut matches = Vec::new();
        for hit in hits {
            if hit.score < self.config.min_similarity {
                continue;
            }
            if let Ok(Some(record)) = self.graph.get_object(org, &hit.api_name).await {
                matches.push(ObjectMatch {
                    record,
                    score: hit.score,
                });
            }
        }
        matches
    }

    async fn ground_exact(&self, value: &str, org: &str) -> Vec<GroundingResult> {
        let mut results = Vec::new();

        match self.graph.picklist_entries_like(org, value).await {
            Ok(entries) => {
                for entry in entries
                    .iter()
                    .filter(|e| e.value.eq_ignore_ascii_case(value))
                    .take(3)
                {
                    let node = format!("{}.{}", entry.object_api_name, entry.field_api_name);
                    results.push(
                        GroundingResult::new(GroundingKind::PicklistValue, 1.0)
                            .with_filter(
                                format!("{} = '{}'", entry.field_api_name, escape(&entry.value)),
                                node.clone(),
                            )
                            .with_matched_node(node),
                    );
                }
            }
            Err(e) => debug!("picklist exact lookup for '{value}' failed: {e}"),
        }
        if !results.is_empty() {
            return results;
        }

        match self.graph.get_object(org, value).await {
            Ok(Some(object)) => {
                results.push(
                    GroundingResult::new(GroundingKind::ObjectName, 0.95)
                        .with_matched_node(object.api_name.clone()),
                );
            }
            Ok(None) => {
                if let Ok(candidates) = self.graph.find_objects(org, value).await {
                    if let Some(object) = candidates
                        .iter()
                        .find(|o| o.label.eq_ignore_ascii_case(value))
                    {
                        results.push(
                            GroundingResult::new(GroundingKind::ObjectName, 0.95)
                                .with_matched_node(object.api_name.clone()),
                        );
                    }
                }
            }
            Err(e) => debug!("object exact lookup for '{value}' failed: {e}"),
        }

        results
    }

    async fn ground_fuzzy(&self, value: &str, org: &str) -> Vec<GroundingResult> {
        let mut results = Vec::new();

        match self.graph.picklist_entries_like(org, value).await {
            Ok(entries) => {
                for entry in entries.iter().take(5) {
                    let confidence = if starts_with_ignore_case(&entry.value, value) {
                        0.9
                    } else {
                        0.7
                    };
                    let node = format!("{}.{}", entry.object_api_name, entry.field_api_name);
                    results.push(
                        GroundingResult::new(GroundingKind::PicklistValue, confidence)
                            .with_filter(
                                format!("{} = '{}'", entry.field_api_name, escape(&entry.value)),
                                node.clone(),
                            )
                            .with_matched_node(node),
                    );
                }
            }
            Err(e) => debug!("picklist fuzzy lookup for '{value}' failed: {e}"),
        }

        match self.graph.find_objects(org, value).await {
            Ok(objects) => {
                for object in objects.iter().take(3) {
                    let confidence = if starts_with_ignore_case(&object.api_name, value)
                        || starts_with_ignore_case(&object.label, value)
                    {
                        0.85
                    } else {
                        0.7
                    };
                    results.push(
                        GroundingResult::new(GroundingKind::ObjectName, confidence)
                            .with_matched_node(object.api_name.clone()),
                    );
                }
            }
            Err(e) => debug!("object fuzzy lookup for '{value}' failed: {e}"),
        }

        results.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results
    }

    async fn ground_live(&self, value: &str, org: &str) -> Option<GroundingResult> {
        let live = self.live.as_ref()?;
        match live.count_matching(org, "Account", "Name", value).await {
            Ok(count) if count > 0 => Some(
                GroundingResult::new(GroundingKind::CompanyName, 0.8)
                    .with_filter(
                        format!("Account.Name LIKE '%{}%'", escape(value)),
                        "Account.Name",
                    )
                    .with_matched_node("Account.Name"),
            ),
            Ok(_) => None,
            Err(e) => {
                debug!("live grounding probe for '{value}' failed: {e}");
                None
            }
        }
    }

    async fn ground_vector(&self, value: &str) -> Vec<GroundingResult> {
        let query = match self.provider.embed(value).await {
            Ok(vector) => vector,
            Err(e) => {
                debug!("grounding embedding for '{value}' failed: {e}");
                return Vec::new();
            }
        };

        let mut results = Vec::new();

        match self
            .graph
            .vector_search(OBJECT_INDEX, &query, self.config.vector_top_k, None)
            .await
        {
            Ok(hits) => {
                for hit in hits.iter().filter(|h| h.score >= self.config.min_similarity) {
                    results.push(
                        GroundingResult::new(GroundingKind::ObjectName, hit.score)
                            .with_matched_node(hit.api_name.clone()),
                    );
                }
            }
            Err(e) => debug!("object vector grounding for '{value}' failed: {e}"),
        }

        match self
            .graph
            .vector_search(FIELD_INDEX, &query, self.config.vector_top_k, None)
            .await
        {
            Ok(hits) => {
                for hit in hits.iter().filter(|h| h.score >= self.config.min_similarity) {
                    let field = hit.api_name.clone();
                    let node = match &hit.object_api_name {
                        Some(object) => format!("{object}.{field}"),
                        None => field.clone(),
                    };
                    results.push(
                        GroundingResult::new(GroundingKind::FieldValue, hit.score)
                            .with_filter(
                                format!("{field} LIKE '%{}%'", escape(value)),
                                node.clone(),
                            )
                            .with_matched_node(node),
                    );
                }
            }
            Err(e) => debug!("field vector grounding for '{value}' failed: {e}"),
        }

        results.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results
    }
}

/// Classify shapes that are certain without touching the schema: record
/// ids, dates and date literals, and plain numbers.
fn classify_lexical(value: &str) -> Option<GroundingResult> {
    if is_record_id(value) {
        return Some(
            GroundingResult::new(GroundingKind::RecordId, 0.95)
                .with_filter(format!("Id = '{value}'"), "Id"),
        );
    }

    if is_iso_date(value) {
        return Some(GroundingResult::new(GroundingKind::DateLiteral, 0.9));
    }
    let upper = value.to_ascii_uppercase();
    if DATE_LITERALS
        .iter()
        .any(|d| upper == *d || upper.starts_with(&format!("{d}:")))
    {
        return Some(GroundingResult::new(GroundingKind::DateLiteral, 0.9));
    }

    if value.parse::<f64>().is_ok() {
        return Some(GroundingResult::new(GroundingKind::Numeric, 0.9));
    }

    None
}

/// Salesforce record ids are 15 or 18 alphanumeric characters and always
/// carry at least one digit (the key prefix).
fn is_record_id(value: &str) -> bool {
    (value.len() == 15 || value.len() == 18)
        && value.chars().all(|c| c.is_ascii_alphanumeric())
        && value.chars().any(|c| c.is_ascii_digit())
}

fn is_iso_date(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() >= 10
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes[5..7].iter().all(u8::is_ascii_digit)
        && bytes[7] == b'-'
        && bytes[8..10].iter().all(u8::is_ascii_digit)
}

/// A capitalised token sequence ("Acme", "Globex Holdings Inc").
fn is_proper_noun(value: &str) -> bool {
    let mut saw_token = false;
    for token in value.split_whitespace() {
        saw_token = true;
        let mut chars = token.chars();
        match chars.next() {
            Some(first) if first.is_uppercase() => {}
            _ => return false,
        }
    }
    saw_token
}

/// Ranked fallback suggestions for an ungrounded proper noun.
fn company_name_fallback(value: &str) -> Vec<GroundingResult> {
    let escaped = escape(value);
    vec![
        GroundingResult::new(GroundingKind::CompanyName, 0.6).with_filter(
            format!("Account.Name LIKE '%{escaped}%'"),
            "Account.Name",
        ),
        GroundingResult::new(GroundingKind::CompanyName, 0.55)
            .with_filter(format!("Name LIKE '%{escaped}%'"), "Name"),
    ]
}

fn escape(value: &str) -> String {
    value.replace('\'', "\\'")
}

fn starts_with_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack
        .get(..needle.len())
        .map(|prefix| prefix.eq_ignore_ascii_case(needle))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use soqlforge_core::graph::memory::InMemoryGraph;
    use soqlforge_core::graph::{NodeKind, ObjectRecord};
    use soqlforge_rag::RagError;

    struct CountingProvider {
        embed_calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl CountingProvider {
        fn new() -> Self {
            Self {
                embed_calls: AtomicUsize::new(0),
                delay: None,
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, RagError> {
            self.embed_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(vec![1.0, 0.0])
        }

        async fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "counting"
        }

        async fn is_available(&self) -> bool {
            true
        }
    }

    fn sample_graph() -> Arc<InMemoryGraph> {
        let graph = InMemoryGraph::new();
        graph.add_object(
            "org1",
            ObjectRecord {
                api_name: "Account".to_string(),
                label: "Account".to_string(),
                description: None,
                is_custom: false,
            },
        );
        graph.add_object(
            "org1",
            ObjectRecord {
                api_name: "Opportunity".to_string(),
                label: "Opportunity".to_string(),
                description: None,
                is_custom: false,
            },
        );
        graph.set_picklist(
            "org1",
            "Opportunity",
            "StageName",
            vec![
                "Prospecting".to_string(),
                "Closed Won".to_string(),
                "Closed Lost".to_string(),
            ],
        );
        Arc::new(graph)
    }

    fn engine_with(
        graph: Arc<InMemoryGraph>,
        provider: Arc<CountingProvider>,
    ) -> GroundingEngine {
        GroundingEngine::new(graph, provider, GroundingConfig::default())
    }

    #[tokio::test]
    async fn test_exact_picklist_match_short_circuits_vector_tier() {
        let provider = Arc::new(CountingProvider::new());
        let engine = engine_with(sample_graph(), provider.clone());

        let entity = engine.ground("Closed Won", "org1").await;
        let best = entity.best_match().unwrap();

        assert_eq!(best.kind, GroundingKind::PicklistValue);
        assert_eq!(best.confidence, 1.0);
        assert_eq!(
            best.suggested_filter.as_deref(),
            Some("StageName = 'Closed Won'")
        );
        // The vector tier must never have run.
        assert_eq!(provider.embed_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_exact_object_match_confidence() {
        let provider = Arc::new(CountingProvider::new());
        let engine = engine_with(sample_graph(), provider.clone());

        let entity = engine.ground("Opportunity", "org1").await;
        let best = entity.best_match().unwrap();

        assert_eq!(best.kind, GroundingKind::ObjectName);
        assert_eq!(best.confidence, 0.95);
        assert_eq!(provider.embed_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fuzzy_prefix_match_band() {
        let provider = Arc::new(CountingProvider::new());
        let engine = engine_with(sample_graph(), provider.clone());

        let entity = engine.ground("Closed", "org1").await;
        let best = entity.best_match().unwrap();

        assert_eq!(best.kind, GroundingKind::PicklistValue);
        assert!((0.7..=0.9).contains(&best.confidence));
        assert_eq!(provider.embed_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_proper_noun_falls_back_to_company_name() {
        let provider = Arc::new(CountingProvider::new());
        let engine = engine_with(sample_graph(), provider);

        let entity = engine.ground("Globex Holdings", "org1").await;
        assert_eq!(entity.results.len(), 2);

        let best = entity.best_match().unwrap();
        assert_eq!(best.kind, GroundingKind::CompanyName);
        assert!((best.confidence - 0.6).abs() < f32::EPSILON);
        assert_eq!(
            best.suggested_filter.as_deref(),
            Some("Account.Name LIKE '%Globex Holdings%'")
        );
        assert_eq!(
            entity.results[1].suggested_filter.as_deref(),
            Some("Name LIKE '%Globex Holdings%'")
        );
    }

    #[tokio::test]
    async fn test_non_proper_noun_is_unknown() {
        let provider = Arc::new(CountingProvider::new());
        let engine = engine_with(sample_graph(), provider);

        let entity = engine.ground("zzgarbage", "org1").await;
        let best = entity.best_match().unwrap();
        assert_eq!(best.kind, GroundingKind::Unknown);
        assert!((best.confidence - 0.3).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_lexical_classifications() {
        let provider = Arc::new(CountingProvider::new());
        let engine = engine_with(sample_graph(), provider);

        let id = engine.ground("0061x00000AbCdEfGH", "org1").await;
        assert_eq!(id.best_match().unwrap().kind, GroundingKind::RecordId);

        let date = engine.ground("2024-03-31", "org1").await;
        assert_eq!(date.best_match().unwrap().kind, GroundingKind::DateLiteral);

        let literal = engine.ground("LAST_N_DAYS:30", "org1").await;
        assert_eq!(
            literal.best_match().unwrap().kind,
            GroundingKind::DateLiteral
        );

        let number = engine.ground("50000", "org1").await;
        assert_eq!(number.best_match().unwrap().kind, GroundingKind::Numeric);
    }

    #[tokio::test]
    async fn test_vector_tier_reached_when_offline_tiers_miss() {
        let graph = sample_graph();
        graph.add_embedding(
            FIELD_INDEX,
            NodeKind::Field,
            "Industry",
            Some("Account"),
            "Industry",
            vec![1.0, 0.0],
        );
        let provider = Arc::new(CountingProvider::new());
        let engine = engine_with(graph, provider.clone());

        // Lowercase, not in any picklist or object name: reaches the
        // vector tier.
        let entity = engine.ground("manufacturing sector", "org1").await;
        assert_eq!(provider.embed_calls.load(Ordering::SeqCst), 1);

        let best = entity.best_match().unwrap();
        assert_eq!(best.kind, GroundingKind::FieldValue);
        assert_eq!(best.evidence.matched_node.as_deref(), Some("Account.Industry"));
    }

    #[tokio::test]
    async fn test_ground_batch_dedupes_and_preserves_order() {
        let provider = Arc::new(CountingProvider::new());
        let engine = engine_with(sample_graph(), provider);

        let values = vec![
            "Closed Won".to_string(),
            "50000".to_string(),
            "Closed Won".to_string(),
        ];
        let entities = engine.ground_batch(&values, "org1").await;

        assert_eq!(entities.len(), 3);
        assert_eq!(entities[0].value, "Closed Won");
        assert_eq!(entities[2].value, "Closed Won");
        assert_eq!(entities[0].results, entities[2].results);
        assert_eq!(
            entities[1].best_match().unwrap().kind,
            GroundingKind::Numeric
        );
    }

    #[tokio::test]
    async fn test_ground_batch_timeout_returns_ungrounded() {
        let mut provider = CountingProvider::new();
        provider.delay = Some(Duration::from_millis(200));
        let config = GroundingConfig {
            batch_timeout: Duration::from_millis(10),
            ..GroundingConfig::default()
        };
        let engine =
            GroundingEngine::new(sample_graph(), Arc::new(provider), config);

        // Values that miss the offline tiers, forcing the slow vector tier.
        let values = vec!["zzslow one".to_string(), "zzslow two".to_string()];
        let entities = engine.ground_batch(&values, "org1").await;

        assert_eq!(entities.len(), 2);
        for entity in entities {
            assert_eq!(entity.best_match().unwrap().kind, GroundingKind::Unknown);
        }
    }

    #[tokio::test]
    async fn test_search_objects_exact_then_fuzzy() {
        let provider = Arc::new(CountingProvider::new());
        let engine = engine_with(sample_graph(), provider.clone());

        let exact = engine.search_objects("account", "org1").await;
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].score, 1.0);

        let fuzzy = engine.search_objects("Opp", "org1").await;
        assert_eq!(fuzzy.len(), 1);
        assert_eq!(fuzzy[0].record.api_name, "Opportunity");
        assert!((0.7..1.0).contains(&fuzzy[0].score));
        assert_eq!(provider.embed_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_record_id_shape() {
        assert!(is_record_id("0061x00000AbCdE"));
        assert!(is_record_id("0061x00000AbCdEfGH"));
        // Right length, but no digit.
        assert!(!is_record_id("Characteristics"));
        assert!(!is_record_id("too-short"));
    }
}
