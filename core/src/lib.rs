//! # soqlforge-core
//!
//! Shared foundation for the soqlforge grounding pipeline:
//!
//! - **Types**: the schema slice, grounding, validation, and example data
//!   model
//! - **Parse**: a tokenizer and recursive-descent parser for candidate SOQL
//!   strings
//! - **Graph**: the read-only metadata-graph query contract and an
//!   in-memory reference implementation
//!
//! ## Example
//!
//! ```rust
//! use soqlforge_core::parse::parse_soql;
//!
//! let ast = parse_soql("SELECT Id, Account.Name FROM Contact LIMIT 10").unwrap();
//! assert_eq!(ast.main_object, "Contact");
//! assert_eq!(ast.parent_lookups.len(), 1);
//! ```

pub mod graph;
pub mod parse;
pub mod types;

// Re-export commonly used types for convenience
pub use graph::{
    FieldRecord, GraphError, MetadataGraph, NodeKind, ObjectRecord, PicklistEntry,
    RelationshipRecord, ScoredNode,
};
pub use parse::{parse_soql, ParseError, ParsedQueryAst};
pub use types::{
    FieldSchema, GroundedEntity, GroundingKind, GroundingResult, MessageKind, ObjectSchema,
    SchemaContext, ScopedFieldResult, SoqlExample, StoredExample, ValidationMessage,
    ValidationReport,
};
