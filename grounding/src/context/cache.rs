//! Session-scoped schema context cache.
//!
//! Exact-string keys would miss trivially rephrased queries, so entries are
//! keyed by stopword-filtered term sets and matched by Jaccard similarity.
//! Entries carry a TTL and each scope is capacity-bounded with FIFO
//! eviction. Invalidation is explicit and per-scope only: a schema re-sync
//! does not clear the cache, which is an accepted staleness tradeoff.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::time::Instant;

use log::debug;

use soqlforge_core::types::SchemaContext;

use crate::config::CacheConfig;
use crate::context::terms::{jaccard_similarity, normalize_terms};

struct CacheEntry {
    context: SchemaContext,
    created_at: Instant,
    term_set: BTreeSet<String>,
}

/// Fuzzy-keyed, TTL-bounded cache of built schema contexts.
pub struct SchemaContextCache {
    config: CacheConfig,
    /// Scope key → entries ordered oldest-to-newest
    scopes: HashMap<String, VecDeque<CacheEntry>>,
}

impl SchemaContextCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            scopes: HashMap::new(),
        }
    }

    /// Look up a context for a query. Entries are scanned newest-to-oldest
    /// and the first non-expired entry whose term set clears the similarity
    /// threshold wins.
    pub fn get(&self, query: &str, scope: &str) -> Option<SchemaContext> {
        let entries = self.scopes.get(scope)?;
        let terms = normalize_terms(query);
        let now = Instant::now();

        for entry in entries.iter().rev() {
            if now.duration_since(entry.created_at) > self.config.ttl {
                continue;
            }
            let similarity = jaccard_similarity(&terms, &entry.term_set);
            if similarity >= self.config.similarity_threshold {
                debug!("schema context cache hit (similarity {similarity:.2})");
                return Some(entry.context.clone());
            }
        }
        None
    }

    /// Store a context. Expired entries in the scope are pruned lazily
    /// here; once at capacity the oldest entry is evicted.
    pub fn set(&mut self, query: &str, context: SchemaContext, scope: &str) {
        let entries = self.scopes.entry(scope.to_string()).or_default();
        let now = Instant::now();

        entries.retain(|e| now.duration_since(e.created_at) <= self.config.ttl);

        while entries.len() >= self.config.max_entries_per_scope.max(1) {
            entries.pop_front();
        }

        entries.push_back(CacheEntry {
            context,
            created_at: now,
            term_set: normalize_terms(query),
        });
    }

    /// Drop every entry for one scope.
    pub fn invalidate_scope(&mut self, scope: &str) {
        self.scopes.remove(scope);
    }

    /// Number of live entries in a scope (expired entries included until
    /// the next write prunes them).
    pub fn len(&self, scope: &str) -> usize {
        self.scopes.get(scope).map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self, scope: &str) -> bool {
        self.len(scope) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use soqlforge_core::types::SchemaContext;

    fn config_with_ttl(ttl: Duration) -> CacheConfig {
        CacheConfig {
            ttl,
            ..CacheConfig::default()
        }
    }

    #[test]
    fn test_similar_query_hits() {
        let mut cache = SchemaContextCache::new(CacheConfig::default());
        let ctx = SchemaContext::empty();

        cache.set("show accounts in california", ctx.clone(), "org1");

        let hit = cache.get("show me accounts located in california", "org1");
        assert_eq!(hit, Some(ctx));
    }

    #[test]
    fn test_dissimilar_query_misses() {
        let mut cache = SchemaContextCache::new(CacheConfig::default());
        cache.set("show accounts in california", SchemaContext::empty(), "org1");

        assert!(cache
            .get("list all opportunities closing this quarter", "org1")
            .is_none());
    }

    #[test]
    fn test_scopes_are_isolated() {
        let mut cache = SchemaContextCache::new(CacheConfig::default());
        cache.set("accounts in california", SchemaContext::empty(), "org1");

        assert!(cache.get("accounts in california", "org2").is_none());
        assert!(cache.get("accounts in california", "org1").is_some());
    }

    #[test]
    fn test_ttl_expiry() {
        let mut cache = SchemaContextCache::new(config_with_ttl(Duration::from_millis(50)));
        cache.set("accounts in california", SchemaContext::empty(), "org1");

        std::thread::sleep(Duration::from_millis(100));
        assert!(cache.get("accounts in california", "org1").is_none());
    }

    #[test]
    fn test_capacity_evicts_oldest_first() {
        let config = CacheConfig {
            max_entries_per_scope: 2,
            ..CacheConfig::default()
        };
        let mut cache = SchemaContextCache::new(config);

        cache.set("first unique alpha", SchemaContext::empty(), "org1");
        cache.set("second unique bravo", SchemaContext::empty(), "org1");
        cache.set("third unique charlie", SchemaContext::empty(), "org1");

        assert_eq!(cache.len("org1"), 2);
        assert!(cache.get("first unique alpha", "org1").is_none());
        assert!(cache.get("third unique charlie", "org1").is_some());
    }

    #[test]
    fn test_expired_entries_pruned_on_write() {
        let mut cache = SchemaContextCache::new(config_with_ttl(Duration::from_millis(10)));
        cache.set("stale query one", SchemaContext::empty(), "org1");
        std::thread::sleep(Duration::from_millis(30));

        cache.set("fresh query two", SchemaContext::empty(), "org1");
        assert_eq!(cache.len("org1"), 1);
    }

    #[test]
    fn test_explicit_invalidation() {
        let mut cache = SchemaContextCache::new(CacheConfig::default());
        cache.set("accounts in california", SchemaContext::empty(), "org1");
        cache.set("accounts in california", SchemaContext::empty(), "org2");

        cache.invalidate_scope("org1");
        assert!(cache.is_empty("org1"));
        assert!(cache.get("accounts in california", "org2").is_some());
    }

    #[test]
    fn test_newest_entry_wins_on_tie() {
        use soqlforge_core::types::ObjectSchema;

        let mut cache = SchemaContextCache::new(CacheConfig::default());
        let older = SchemaContext::empty();
        let newer = SchemaContext::new(vec![ObjectSchema {
            api_name: "Account".to_string(),
            label: "Account".to_string(),
            description: None,
            fields: Vec::new(),
            parent_relationships: Vec::new(),
            child_relationships: Vec::new(),
        }]);

        // Same term set twice; the scan is newest-to-oldest so the second
        // write must be returned.
        cache.set("accounts in california", older, "org1");
        cache.set("accounts in california", newer.clone(), "org1");

        let hit = cache.get("accounts in california", "org1").unwrap();
        assert_eq!(hit, newer);
        assert_eq!(cache.len("org1"), 2);
    }
}
