//! # soqlforge-grounding
//!
//! The retrieval-augmented query-grounding pipeline: everything between a
//! free-form natural-language request and a validated, schema-aware SOQL
//! candidate.
//!
//! - **engine**: classifies value fragments into schema-filter
//!   suggestions via a short-circuiting exact/fuzzy/live/vector cascade
//! - **resolver**: maps bare names to canonical schema objects
//! - **context**: prunes a huge schema down to the objects and fields a
//!   query needs, with table-scoped vector search, draft-phase extraction,
//!   anti-pattern warnings, and a fuzzy-keyed cache
//! - **validate**: checks candidate queries against graph-derived schema
//!   facts, governor-limit heuristics, and virtual-object restrictions
//! - **services**: the explicit container that wires backends into the
//!   per-request components
//!
//! Design stance: degraded dependencies (embedding, vector, graph, chat)
//! never raise out of this crate. Every such path has a fallback (fewer
//! fields, an empty result, a skipped tier) so the enclosing generation
//! loop always gets something usable.

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod live;
pub mod resolver;
pub mod services;
pub mod validate;

pub use config::{CacheConfig, ContextConfig, GroundingConfig, PipelineConfig, ValidatorConfig};
pub use context::{
    ContextBuildResult, SchemaContextBuilder, SchemaContextCache, ScopedFieldQuery,
    ScopedFieldSearch,
};
pub use engine::{GroundingEngine, ObjectMatch};
pub use error::GroundingError;
pub use live::LiveOrg;
pub use resolver::{EntityResolver, ResolutionKind, ResolvedEntity};
pub use services::{ServiceContainer, Services};
pub use validate::QueryValidator;
