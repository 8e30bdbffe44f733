//! Org schema data model.
//!
//! These types describe the slice of an org's schema that is relevant to a
//! single natural-language query. They are built fresh per request from
//! metadata-graph records and discarded afterwards; nothing here persists.

use serde::{Deserialize, Serialize};

use crate::graph::{FieldRecord, ObjectRecord, RelationshipRecord};

/// Maximum number of objects included in a single schema context.
pub const MAX_OBJECTS: usize = 5;

/// Maximum number of fields kept per object after relevance ranking.
pub const MAX_FIELDS_PER_OBJECT: usize = 25;

/// Maximum number of picklist values attached to a field.
pub const MAX_PICKLIST_VALUES: usize = 50;

/// Fields that are always kept on every object, bypassing relevance ranking.
///
/// These are the columns nearly every generated query needs: the record id,
/// its display name, audit timestamps, and ownership.
pub const CORE_FIELDS: [&str; 5] = [
    "Id",
    "Name",
    "CreatedDate",
    "LastModifiedDate",
    "OwnerId",
];

/// Returns true if `api_name` is part of the always-include field set.
pub fn is_core_field(api_name: &str) -> bool {
    CORE_FIELDS.iter().any(|f| f.eq_ignore_ascii_case(api_name))
}

/// A field on an org object, enriched with relationship metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// API name of the field (e.g. `StageName`)
    pub api_name: String,
    /// Human-readable label
    pub label: String,
    /// Field type as reported by the org (e.g. `picklist`, `reference`)
    pub field_type: String,
    /// Help text / description, when the org has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Picklist values, capped at [`MAX_PICKLIST_VALUES`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picklist_values: Option<Vec<String>>,
    /// True when the field can point at more than one target object
    pub is_polymorphic: bool,
    /// Possible target objects for a polymorphic reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polymorphic_targets: Option<Vec<String>>,
    /// Relationship name used in dot-path queries, set only for
    /// polymorphic fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_name: Option<String>,
}

impl FieldSchema {
    /// Build a `FieldSchema` from a raw graph record.
    ///
    /// A field is polymorphic iff its reference-target list has at least two
    /// entries. For polymorphic fields without an explicit relationship name
    /// in the graph, the name is inferred by stripping a trailing `Id` from
    /// the API name (`WhoId` → `Who`).
    pub fn from_record(record: &FieldRecord) -> Self {
        let is_polymorphic = record.reference_to.len() >= 2;
        let relationship_name = if is_polymorphic {
            record
                .relationship_name
                .clone()
                .or_else(|| infer_relationship_name(&record.api_name))
        } else {
            None
        };

        Self {
            api_name: record.api_name.clone(),
            label: record.label.clone(),
            field_type: record.field_type.clone(),
            description: record.description.clone(),
            picklist_values: None,
            is_polymorphic,
            polymorphic_targets: if is_polymorphic {
                Some(record.reference_to.clone())
            } else {
                None
            },
            relationship_name,
        }
    }

    /// True for reference-typed fields (lookups and master-detail).
    pub fn is_reference(&self) -> bool {
        self.field_type.eq_ignore_ascii_case("reference")
    }

    /// True for picklist and multi-select picklist fields.
    pub fn is_picklist(&self) -> bool {
        let t = self.field_type.to_ascii_lowercase();
        t == "picklist" || t == "multipicklist"
    }

    /// Attach picklist values, truncating to [`MAX_PICKLIST_VALUES`].
    pub fn with_picklist_values(mut self, mut values: Vec<String>) -> Self {
        values.truncate(MAX_PICKLIST_VALUES);
        self.picklist_values = Some(values);
        self
    }
}

/// Strip a trailing `Id` from a reference field name to guess its
/// relationship name.
fn infer_relationship_name(api_name: &str) -> Option<String> {
    api_name
        .strip_suffix("Id")
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// A parent or child relationship attached to an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipInfo {
    /// Name used in SOQL (`Account` in `Contact.Account.Name`, `Contacts`
    /// in a child subquery)
    pub relationship_name: String,
    /// Object on the far side of the relationship
    pub target_object: String,
    /// Field that carries the relationship
    pub field_api_name: String,
}

impl RelationshipInfo {
    /// Build a `RelationshipInfo` from a raw graph record.
    pub fn from_record(record: &RelationshipRecord) -> Self {
        Self {
            relationship_name: record.relationship_name.clone(),
            target_object: record.target_object.clone(),
            field_api_name: record.field_api_name.clone(),
        }
    }
}

/// One object's worth of schema, pruned to the fields that matter for the
/// current query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSchema {
    /// API name of the object (e.g. `Opportunity`)
    pub api_name: String,
    /// Human-readable label
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Pruned field list, at most [`MAX_FIELDS_PER_OBJECT`] entries
    pub fields: Vec<FieldSchema>,
    /// Outgoing lookup relationships (dot-path traversal)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_relationships: Vec<RelationshipInfo>,
    /// Incoming relationships (child subqueries)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_relationships: Vec<RelationshipInfo>,
}

impl ObjectSchema {
    /// Build an `ObjectSchema` shell from a raw graph record, with no
    /// fields or relationships attached yet.
    pub fn from_record(record: &ObjectRecord) -> Self {
        Self {
            api_name: record.api_name.clone(),
            label: record.label.clone(),
            description: record.description.clone(),
            fields: Vec::new(),
            parent_relationships: Vec::new(),
            child_relationships: Vec::new(),
        }
    }

    /// True if any selected field is polymorphic.
    pub fn has_polymorphic_fields(&self) -> bool {
        self.fields.iter().any(|f| f.is_polymorphic)
    }
}

/// Aggregate counts over a schema context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SchemaStats {
    pub object_count: usize,
    pub total_fields: usize,
    pub total_relationships: usize,
}

/// The token-budgeted schema slice handed to the generation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaContext {
    pub objects: Vec<ObjectSchema>,
    pub stats: SchemaStats,
}

impl SchemaContext {
    /// Build a context from pruned objects, computing stats.
    pub fn new(objects: Vec<ObjectSchema>) -> Self {
        let stats = SchemaStats {
            object_count: objects.len(),
            total_fields: objects.iter().map(|o| o.fields.len()).sum(),
            total_relationships: objects
                .iter()
                .map(|o| o.parent_relationships.len() + o.child_relationships.len())
                .sum(),
        };
        Self { objects, stats }
    }

    /// An empty context, returned when nothing in the schema matched.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Result of a table-scoped field search for one object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopedFieldResult {
    pub object_api_name: String,
    /// Selected field API names: vector matches merged with the core set
    pub fields: Vec<String>,
    /// The subset of `fields` that came from vector similarity
    pub vector_matched: Vec<String>,
    /// Similarity score per vector-matched field, parallel to
    /// `vector_matched`
    pub scores: Vec<f32>,
    /// True iff no vector match survived and `fields` is exactly the core
    /// set
    pub used_fallback: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_field(api_name: &str, targets: &[&str], rel: Option<&str>) -> FieldRecord {
        FieldRecord {
            api_name: api_name.to_string(),
            label: api_name.to_string(),
            field_type: "reference".to_string(),
            description: None,
            reference_to: targets.iter().map(|t| t.to_string()).collect(),
            relationship_name: rel.map(|r| r.to_string()),
        }
    }

    #[test]
    fn test_polymorphic_detection_two_targets() {
        let record = reference_field("WhoId", &["Contact", "Lead"], None);
        let field = FieldSchema::from_record(&record);

        assert!(field.is_polymorphic);
        assert_eq!(
            field.polymorphic_targets,
            Some(vec!["Contact".to_string(), "Lead".to_string()])
        );
    }

    #[test]
    fn test_single_target_is_not_polymorphic() {
        let record = reference_field("AccountId", &["Account"], None);
        let field = FieldSchema::from_record(&record);

        assert!(!field.is_polymorphic);
        assert!(field.polymorphic_targets.is_none());
        assert!(field.relationship_name.is_none());
    }

    #[test]
    fn test_relationship_name_inferred_from_id_suffix() {
        let record = reference_field("WhatId", &["Account", "Opportunity"], None);
        let field = FieldSchema::from_record(&record);

        assert_eq!(field.relationship_name, Some("What".to_string()));
    }

    #[test]
    fn test_explicit_relationship_name_wins() {
        let record = reference_field("WhoId", &["Contact", "Lead"], Some("Who"));
        let field = FieldSchema::from_record(&record);

        assert_eq!(field.relationship_name, Some("Who".to_string()));
    }

    #[test]
    fn test_picklist_values_capped() {
        let record = FieldRecord {
            api_name: "StageName".to_string(),
            label: "Stage".to_string(),
            field_type: "picklist".to_string(),
            description: None,
            reference_to: Vec::new(),
            relationship_name: None,
        };
        let values: Vec<String> = (0..80).map(|i| format!("Stage {i}")).collect();
        let field = FieldSchema::from_record(&record).with_picklist_values(values);

        assert_eq!(field.picklist_values.unwrap().len(), MAX_PICKLIST_VALUES);
    }

    #[test]
    fn test_schema_context_stats() {
        let mut object = ObjectSchema {
            api_name: "Account".to_string(),
            label: "Account".to_string(),
            description: None,
            fields: Vec::new(),
            parent_relationships: Vec::new(),
            child_relationships: Vec::new(),
        };
        object.fields.push(FieldSchema::from_record(&FieldRecord {
            api_name: "Name".to_string(),
            label: "Account Name".to_string(),
            field_type: "string".to_string(),
            description: None,
            reference_to: Vec::new(),
            relationship_name: None,
        }));
        object.child_relationships.push(RelationshipInfo {
            relationship_name: "Contacts".to_string(),
            target_object: "Contact".to_string(),
            field_api_name: "AccountId".to_string(),
        });

        let ctx = SchemaContext::new(vec![object]);
        assert_eq!(ctx.stats.object_count, 1);
        assert_eq!(ctx.stats.total_fields, 1);
        assert_eq!(ctx.stats.total_relationships, 1);
    }

    #[test]
    fn test_core_field_set() {
        assert!(is_core_field("Id"));
        assert!(is_core_field("ownerid"));
        assert!(!is_core_field("StageName"));
    }
}
