//! Shared data model for the grounding pipeline.

pub mod example;
pub mod grounding;
pub mod schema;
pub mod validation;

pub use example::{SoqlExample, StoredExample};
pub use grounding::{GroundedEntity, GroundingEvidence, GroundingKind, GroundingResult};
pub use schema::{
    is_core_field, FieldSchema, ObjectSchema, RelationshipInfo, SchemaContext, SchemaStats,
    ScopedFieldResult, CORE_FIELDS, MAX_FIELDS_PER_OBJECT, MAX_OBJECTS, MAX_PICKLIST_VALUES,
};
pub use validation::{MessageKind, ValidationMessage, ValidationReport};
