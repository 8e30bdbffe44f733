//! The metadata-graph query contract.
//!
//! Org metadata (objects, fields, relationships, picklists) is mirrored into
//! a property graph by an external ingestion pipeline. This module defines
//! the read-only query surface the grounding pipeline consumes, plus the
//! record types those queries return. The graph engine itself is a black
//! box; [`memory::InMemoryGraph`] is the reference implementation used by
//! tests and local runs.

pub mod memory;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Vector index over object-level embeddings.
pub const OBJECT_INDEX: &str = "object_embeddings";

/// Vector index over field-level embeddings.
pub const FIELD_INDEX: &str = "field_embeddings";

/// Vector index over stored few-shot examples.
pub const EXAMPLE_INDEX: &str = "example_embeddings";

/// Errors surfaced by a metadata-graph backend.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("graph query failed: {0}")]
    Query(String),

    #[error("vector index '{0}' is not available")]
    IndexUnavailable(String),

    #[error("graph backend unavailable: {0}")]
    Unavailable(String),
}

/// An object node as stored in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub api_name: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// True for custom (`__c`) objects
    #[serde(default)]
    pub is_custom: bool,
}

/// A field node as stored in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub api_name: String,
    pub label: String,
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Target objects for reference fields; two or more entries mean the
    /// field is polymorphic
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reference_to: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_name: Option<String>,
}

/// A relationship edge as stored in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    /// SOQL-visible relationship name
    pub relationship_name: String,
    /// Object the relationship is declared on
    pub source_object: String,
    /// Object on the far side
    pub target_object: String,
    /// Field carrying the relationship
    pub field_api_name: String,
    /// True for child (one-to-many) relationships
    pub is_child: bool,
}

/// A picklist value together with the field that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PicklistEntry {
    pub object_api_name: String,
    pub field_api_name: String,
    pub value: String,
}

/// What kind of node a vector hit refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Object,
    Field,
    Example,
}

/// A scored node returned from a vector-similarity query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredNode {
    pub kind: NodeKind,
    /// API name of the matched node
    pub api_name: String,
    /// Owning object for field nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_api_name: Option<String>,
    pub label: String,
    /// Cosine similarity in `[0, 1]`
    pub score: f32,
    /// Arbitrary node properties carried back to the caller
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub properties: HashMap<String, serde_json::Value>,
}

/// Read-only query contract over the org metadata graph.
///
/// All queries are scoped by an org key so one graph can host several
/// synced orgs. Every method returns empty / `None` rather than erroring
/// when nothing matches; [`GraphError`] is reserved for backend failures.
#[async_trait]
pub trait MetadataGraph: Send + Sync {
    /// Exact lookup of an object by API name (case-insensitive).
    async fn get_object(&self, org: &str, api_name: &str)
        -> Result<Option<ObjectRecord>, GraphError>;

    /// Objects whose API name or label contains `term`
    /// (case-insensitive).
    async fn find_objects(&self, org: &str, term: &str) -> Result<Vec<ObjectRecord>, GraphError>;

    /// All fields of an object.
    async fn fields_of(&self, org: &str, object_api_name: &str)
        -> Result<Vec<FieldRecord>, GraphError>;

    /// Values of a picklist field, in org-defined order.
    async fn picklist_values(
        &self,
        org: &str,
        object_api_name: &str,
        field_api_name: &str,
    ) -> Result<Vec<String>, GraphError>;

    /// Picklist entries across the whole schema whose value contains
    /// `fragment` (case-insensitive). Callers derive exact / prefix /
    /// containment tiers from the returned values.
    async fn picklist_entries_like(
        &self,
        org: &str,
        fragment: &str,
    ) -> Result<Vec<PicklistEntry>, GraphError>;

    /// Outgoing (parent) relationships declared on an object.
    async fn parent_relationships(
        &self,
        org: &str,
        object_api_name: &str,
    ) -> Result<Vec<RelationshipRecord>, GraphError>;

    /// Incoming (child) relationships targeting an object's subquery names.
    async fn child_relationships(
        &self,
        org: &str,
        object_api_name: &str,
    ) -> Result<Vec<RelationshipRecord>, GraphError>;

    /// Resolve a relationship name in the field-declared direction
    /// (`Contact.Account` → Account).
    async fn relationship_named(
        &self,
        org: &str,
        relationship_name: &str,
    ) -> Result<Option<RelationshipRecord>, GraphError>;

    /// Resolve a relationship name in the child direction
    /// (`Account.Contacts` → Contact).
    async fn child_relationship_named(
        &self,
        org: &str,
        relationship_name: &str,
    ) -> Result<Option<RelationshipRecord>, GraphError>;

    /// Nearest-neighbour search over a named vector index.
    ///
    /// Contract caveat: the backend applies `top_k` BEFORE the equality
    /// `filter`, so a filtered search over a small partition of a large
    /// index must over-fetch and trim client-side or it will starve.
    async fn vector_search(
        &self,
        index: &str,
        query: &[f32],
        top_k: usize,
        filter: Option<&HashMap<String, String>>,
    ) -> Result<Vec<ScoredNode>, GraphError>;
}
