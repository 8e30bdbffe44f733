//! Entity resolution.
//!
//! Maps a bare name from a query or an error message ("Accounts",
//! "Opportunity", "Invoice_Items__r") to a canonical schema object. Used to
//! repair validation errors that reference an unrecognised object or
//! relationship.

use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use soqlforge_core::types::RelationshipInfo;
use soqlforge_core::MetadataGraph;

/// How a name was resolved to an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionKind {
    /// Direct object API-name or label match
    Object,
    /// Matched a parent relationship name; resolved to its target
    Relationship,
    /// Matched a child relationship name; resolved to its target
    ChildRelationship,
    /// Matched after stripping a plural or relationship suffix
    Heuristic,
}

/// A successful resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEntity {
    pub resolved_api_name: String,
    pub kind: ResolutionKind,
    /// Present when the match went through a relationship
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<RelationshipInfo>,
}

/// Resolves bare names against the metadata graph.
pub struct EntityResolver {
    graph: Arc<dyn MetadataGraph>,
}

impl EntityResolver {
    pub fn new(graph: Arc<dyn MetadataGraph>) -> Self {
        Self { graph }
    }

    /// Resolve `name` to a canonical object, trying in order: direct object
    /// match, relationship name (both directions), then suffix-stripping
    /// heuristics. Each tier is a separate graph query; the first hit wins.
    /// Graph failures degrade to `None`.
    pub async fn resolve(&self, name: &str, org: &str) -> Option<ResolvedEntity> {
        // (a) direct object match
        match self.graph.get_object(org, name).await {
            Ok(Some(object)) => {
                return Some(ResolvedEntity {
                    resolved_api_name: object.api_name,
                    kind: ResolutionKind::Object,
                    relationship: None,
                });
            }
            Ok(None) => {}
            Err(e) => debug!("object lookup for '{name}' failed: {e}"),
        }

        // (b) relationship name, field-declared direction first
        match self.graph.relationship_named(org, name).await {
            Ok(Some(record)) => {
                return Some(ResolvedEntity {
                    resolved_api_name: record.target_object.clone(),
                    kind: ResolutionKind::Relationship,
                    relationship: Some(RelationshipInfo::from_record(&record)),
                });
            }
            Ok(None) => {}
            Err(e) => debug!("relationship lookup for '{name}' failed: {e}"),
        }

        match self.graph.child_relationship_named(org, name).await {
            Ok(Some(record)) => {
                return Some(ResolvedEntity {
                    resolved_api_name: record.target_object.clone(),
                    kind: ResolutionKind::ChildRelationship,
                    relationship: Some(RelationshipInfo::from_record(&record)),
                });
            }
            Ok(None) => {}
            Err(e) => debug!("child relationship lookup for '{name}' failed: {e}"),
        }

        // (c) suffix-stripping heuristics
        for candidate in suffix_candidates(name) {
            match self.graph.get_object(org, &candidate).await {
                Ok(Some(object)) => {
                    return Some(ResolvedEntity {
                        resolved_api_name: object.api_name,
                        kind: ResolutionKind::Heuristic,
                        relationship: None,
                    });
                }
                Ok(None) => {}
                Err(e) => debug!("heuristic lookup for '{candidate}' failed: {e}"),
            }
        }

        None
    }
}

/// Candidate object names derived by stripping pluralising or relationship
/// suffixes, most specific first. Shared with object-scoped search, which
/// needs the same singularisation.
pub(crate) fn suffix_candidates(name: &str) -> Vec<String> {
    let mut candidates = Vec::new();

    // Custom relationship names map to custom objects: Foo__r → Foo__c
    if let Some(stem) = name.strip_suffix("__r") {
        candidates.push(format!("{stem}__c"));
    }

    // Lookup field names: AccountId → Account
    if let Some(stem) = name.strip_suffix("Id") {
        if !stem.is_empty() {
            candidates.push(stem.to_string());
        }
    }

    // Plurals: Opportunities → Opportunity, Statuses → Status, Leads → Lead
    if let Some(stem) = name.strip_suffix("ies") {
        candidates.push(format!("{stem}y"));
    }
    if let Some(stem) = name.strip_suffix("es") {
        candidates.push(stem.to_string());
    }
    if let Some(stem) = name.strip_suffix('s') {
        candidates.push(stem.to_string());
    }

    candidates.dedup();
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use soqlforge_core::graph::memory::InMemoryGraph;
    use soqlforge_core::graph::{ObjectRecord, RelationshipRecord};

    fn graph_with_sales_objects() -> Arc<InMemoryGraph> {
        let graph = InMemoryGraph::new();
        for name in ["Account", "Opportunity", "Contact", "Invoice__c"] {
            graph.add_object(
                "org1",
                ObjectRecord {
                    api_name: name.to_string(),
                    label: name.trim_end_matches("__c").to_string(),
                    description: None,
                    is_custom: name.ends_with("__c"),
                },
            );
        }
        graph.add_relationship(
            "org1",
            RelationshipRecord {
                relationship_name: "Account".to_string(),
                source_object: "Contact".to_string(),
                target_object: "Account".to_string(),
                field_api_name: "AccountId".to_string(),
                is_child: false,
            },
        );
        graph.add_relationship(
            "org1",
            RelationshipRecord {
                relationship_name: "Contacts".to_string(),
                source_object: "Account".to_string(),
                target_object: "Contact".to_string(),
                field_api_name: "AccountId".to_string(),
                is_child: true,
            },
        );
        Arc::new(graph)
    }

    #[tokio::test]
    async fn test_direct_object_match() {
        let resolver = EntityResolver::new(graph_with_sales_objects());
        let resolved = resolver.resolve("Opportunity", "org1").await.unwrap();
        assert_eq!(resolved.resolved_api_name, "Opportunity");
        assert_eq!(resolved.kind, ResolutionKind::Object);
    }

    #[tokio::test]
    async fn test_child_relationship_name_resolves_to_target() {
        let resolver = EntityResolver::new(graph_with_sales_objects());
        let resolved = resolver.resolve("Contacts", "org1").await.unwrap();
        assert_eq!(resolved.resolved_api_name, "Contact");
        assert_eq!(resolved.kind, ResolutionKind::ChildRelationship);
        assert!(resolved.relationship.is_some());
    }

    #[tokio::test]
    async fn test_plural_heuristic() {
        let resolver = EntityResolver::new(graph_with_sales_objects());
        let resolved = resolver.resolve("Opportunities", "org1").await.unwrap();
        assert_eq!(resolved.resolved_api_name, "Opportunity");
        assert_eq!(resolved.kind, ResolutionKind::Heuristic);
    }

    #[tokio::test]
    async fn test_custom_relationship_suffix_heuristic() {
        let resolver = EntityResolver::new(graph_with_sales_objects());
        let resolved = resolver.resolve("Invoice__r", "org1").await.unwrap();
        assert_eq!(resolved.resolved_api_name, "Invoice__c");
        assert_eq!(resolved.kind, ResolutionKind::Heuristic);
    }

    #[tokio::test]
    async fn test_lookup_field_suffix_heuristic() {
        let resolver = EntityResolver::new(graph_with_sales_objects());
        let resolved = resolver.resolve("AccountId", "org1").await.unwrap();
        assert_eq!(resolved.resolved_api_name, "Account");
    }

    #[tokio::test]
    async fn test_unresolvable_name_returns_none() {
        let resolver = EntityResolver::new(graph_with_sales_objects());
        assert!(resolver.resolve("Warehouse", "org1").await.is_none());
    }

    #[test]
    fn test_suffix_candidates_order() {
        assert_eq!(suffix_candidates("Statuses"), vec!["Status", "Statuse"]);
        assert_eq!(suffix_candidates("Opportunities"), vec!["Opportunity", "Opportuniti", "Opportunitie"]);
        assert_eq!(suffix_candidates("Invoice__r"), vec!["Invoice__c"]);
    }
}
