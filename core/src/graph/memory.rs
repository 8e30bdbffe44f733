//! In-memory metadata graph.
//!
//! Reference [`MetadataGraph`] implementation backed by plain maps and
//! brute-force cosine similarity. Used by tests and local development; it
//! deliberately reproduces the production backend's quirk of applying the
//! vector-search result limit before any equality filter.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{
    FieldRecord, GraphError, MetadataGraph, NodeKind, ObjectRecord, PicklistEntry,
    RelationshipRecord, ScoredNode,
};

#[derive(Debug, Clone)]
struct EmbeddedNode {
    kind: NodeKind,
    api_name: String,
    object_api_name: Option<String>,
    label: String,
    properties: HashMap<String, serde_json::Value>,
    vector: Vec<f32>,
}

#[derive(Debug, Default)]
struct OrgData {
    objects: Vec<ObjectRecord>,
    fields: HashMap<String, Vec<FieldRecord>>,
    picklists: HashMap<(String, String), Vec<String>>,
    relationships: Vec<RelationshipRecord>,
}

/// A self-contained metadata graph held entirely in process memory.
#[derive(Debug, Default)]
pub struct InMemoryGraph {
    orgs: RwLock<HashMap<String, OrgData>>,
    /// index name → embedded nodes
    indexes: RwLock<HashMap<String, Vec<EmbeddedNode>>>,
}

impl InMemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_object(&self, org: &str, object: ObjectRecord) {
        let mut orgs = self.orgs.write().expect("graph lock poisoned");
        orgs.entry(org.to_string()).or_default().objects.push(object);
    }

    pub fn add_field(&self, org: &str, object_api_name: &str, field: FieldRecord) {
        let mut orgs = self.orgs.write().expect("graph lock poisoned");
        orgs.entry(org.to_string())
            .or_default()
            .fields
            .entry(object_api_name.to_string())
            .or_default()
            .push(field);
    }

    pub fn set_picklist(
        &self,
        org: &str,
        object_api_name: &str,
        field_api_name: &str,
        values: Vec<String>,
    ) {
        let mut orgs = self.orgs.write().expect("graph lock poisoned");
        orgs.entry(org.to_string()).or_default().picklists.insert(
            (object_api_name.to_string(), field_api_name.to_string()),
            values,
        );
    }

    pub fn add_relationship(&self, org: &str, relationship: RelationshipRecord) {
        let mut orgs = self.orgs.write().expect("graph lock poisoned");
        orgs.entry(org.to_string())
            .or_default()
            .relationships
            .push(relationship);
    }

    /// Register a node in a vector index.
    pub fn add_embedding(
        &self,
        index: &str,
        kind: NodeKind,
        api_name: &str,
        object_api_name: Option<&str>,
        label: &str,
        vector: Vec<f32>,
    ) {
        self.add_embedding_with_properties(
            index,
            kind,
            api_name,
            object_api_name,
            label,
            vector,
            HashMap::new(),
        );
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_embedding_with_properties(
        &self,
        index: &str,
        kind: NodeKind,
        api_name: &str,
        object_api_name: Option<&str>,
        label: &str,
        vector: Vec<f32>,
        properties: HashMap<String, serde_json::Value>,
    ) {
        let mut indexes = self.indexes.write().expect("graph lock poisoned");
        indexes.entry(index.to_string()).or_default().push(EmbeddedNode {
            kind,
            api_name: api_name.to_string(),
            object_api_name: object_api_name.map(|o| o.to_string()),
            label: label.to_string(),
            properties,
            vector,
        });
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

fn matches_filter(node: &EmbeddedNode, filter: &HashMap<String, String>) -> bool {
    filter.iter().all(|(key, expected)| match key.as_str() {
        "object_api_name" => node.object_api_name.as_deref() == Some(expected.as_str()),
        "api_name" => node.api_name == *expected,
        other => node
            .properties
            .get(other)
            .and_then(|v| v.as_str())
            .map(|v| v == expected)
            .unwrap_or(false),
    })
}

#[async_trait]
impl MetadataGraph for InMemoryGraph {
    async fn get_object(
        &self,
        org: &str,
        api_name: &str,
    ) -> Result<Option<ObjectRecord>, GraphError> {
        let orgs = self.orgs.read().expect("graph lock poisoned");
        Ok(orgs.get(org).and_then(|data| {
            data.objects
                .iter()
                .find(|o| o.api_name.eq_ignore_ascii_case(api_name))
                .cloned()
        }))
    }

    async fn find_objects(&self, org: &str, term: &str) -> Result<Vec<ObjectRecord>, GraphError> {
        let needle = term.to_lowercase();
        let orgs = self.orgs.read().expect("graph lock poisoned");
        Ok(orgs
            .get(org)
            .map(|data| {
                data.objects
                    .iter()
                    .filter(|o| {
                        o.api_name.to_lowercase().contains(&needle)
                            || o.label.to_lowercase().contains(&needle)
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn fields_of(
        &self,
        org: &str,
        object_api_name: &str,
    ) -> Result<Vec<FieldRecord>, GraphError> {
        let orgs = self.orgs.read().expect("graph lock poisoned");
        Ok(orgs
            .get(org)
            .and_then(|data| {
                data.fields
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(object_api_name))
                    .map(|(_, fields)| fields.clone())
            })
            .unwrap_or_default())
    }

    async fn picklist_values(
        &self,
        org: &str,
        object_api_name: &str,
        field_api_name: &str,
    ) -> Result<Vec<String>, GraphError> {
        let orgs = self.orgs.read().expect("graph lock poisoned");
        Ok(orgs
            .get(org)
            .and_then(|data| {
                data.picklists
                    .get(&(object_api_name.to_string(), field_api_name.to_string()))
                    .cloned()
            })
            .unwrap_or_default())
    }

    async fn picklist_entries_like(
        &self,
        org: &str,
        fragment: &str,
    ) -> Result<Vec<PicklistEntry>, GraphError> {
        let needle = fragment.to_lowercase();
        let orgs = self.orgs.read().expect("graph lock poisoned");
        let mut entries = Vec::new();
        if let Some(data) = orgs.get(org) {
            for ((object, field), values) in &data.picklists {
                for value in values {
                    if value.to_lowercase().contains(&needle) {
                        entries.push(PicklistEntry {
                            object_api_name: object.clone(),
                            field_api_name: field.clone(),
                            value: value.clone(),
                        });
                    }
                }
            }
        }
        entries.sort_by(|a, b| {
            (&a.object_api_name, &a.field_api_name, &a.value)
                .cmp(&(&b.object_api_name, &b.field_api_name, &b.value))
        });
        Ok(entries)
    }

    async fn parent_relationships(
        &self,
        org: &str,
        object_api_name: &str,
    ) -> Result<Vec<RelationshipRecord>, GraphError> {
        let orgs = self.orgs.read().expect("graph lock poisoned");
        Ok(orgs
            .get(org)
            .map(|data| {
                data.relationships
                    .iter()
                    .filter(|r| {
                        !r.is_child && r.source_object.eq_ignore_ascii_case(object_api_name)
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn child_relationships(
        &self,
        org: &str,
        object_api_name: &str,
    ) -> Result<Vec<RelationshipRecord>, GraphError> {
        let orgs = self.orgs.read().expect("graph lock poisoned");
        Ok(orgs
            .get(org)
            .map(|data| {
                data.relationships
                    .iter()
                    .filter(|r| r.is_child && r.source_object.eq_ignore_ascii_case(object_api_name))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn relationship_named(
        &self,
        org: &str,
        relationship_name: &str,
    ) -> Result<Option<RelationshipRecord>, GraphError> {
        let orgs = self.orgs.read().expect("graph lock poisoned");
        Ok(orgs.get(org).and_then(|data| {
            data.relationships
                .iter()
                .find(|r| {
                    !r.is_child && r.relationship_name.eq_ignore_ascii_case(relationship_name)
                })
                .cloned()
        }))
    }

    async fn child_relationship_named(
        &self,
        org: &str,
        relationship_name: &str,
    ) -> Result<Option<RelationshipRecord>, GraphError> {
        let orgs = self.orgs.read().expect("graph lock poisoned");
        Ok(orgs.get(org).and_then(|data| {
            data.relationships
                .iter()
                .find(|r| {
                    r.is_child && r.relationship_name.eq_ignore_ascii_case(relationship_name)
                })
                .cloned()
        }))
    }

    async fn vector_search(
        &self,
        index: &str,
        query: &[f32],
        top_k: usize,
        filter: Option<&HashMap<String, String>>,
    ) -> Result<Vec<ScoredNode>, GraphError> {
        let indexes = self.indexes.read().expect("graph lock poisoned");
        let nodes = match indexes.get(index) {
            Some(nodes) => nodes,
            None => return Ok(Vec::new()),
        };

        let mut scored: Vec<(f32, &EmbeddedNode)> = nodes
            .iter()
            .map(|n| (cosine_similarity(query, &n.vector), n))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        // Limit first, then filter: this mirrors the production backend,
        // which trims to top_k before applying equality filters.
        scored.truncate(top_k);
        if let Some(filter) = filter {
            scored.retain(|(_, n)| matches_filter(n, filter));
        }

        Ok(scored
            .into_iter()
            .map(|(score, n)| ScoredNode {
                kind: n.kind,
                api_name: n.api_name.clone(),
                object_api_name: n.object_api_name.clone(),
                label: n.label.clone(),
                score,
                properties: n.properties.clone(),
            })
            .collect())
    }
}
