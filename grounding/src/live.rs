//! Optional live-org collaborator.
//!
//! When a connection to the actual org is available it can answer two
//! questions the offline graph cannot: "does a record with this value
//! exist right now?" and "what child relationships does this object really
//! have?". Absence of a live connection always degrades gracefully.

use async_trait::async_trait;

use soqlforge_core::RelationshipRecord;

use crate::error::GroundingError;

/// Read-only access to a live org instance.
#[async_trait]
pub trait LiveOrg: Send + Sync {
    /// Count records of `object` whose `field` contains `value`.
    ///
    /// Used as the tertiary grounding tier for free-text values.
    async fn count_matching(
        &self,
        org: &str,
        object_api_name: &str,
        field_api_name: &str,
        value: &str,
    ) -> Result<u64, GroundingError>;

    /// Describe an object's child relationships straight from the org.
    ///
    /// Used as a just-in-time fallback when the metadata graph has no
    /// record for a child relationship named in a subquery.
    async fn describe_child_relationships(
        &self,
        org: &str,
        object_api_name: &str,
    ) -> Result<Vec<RelationshipRecord>, GroundingError>;
}
