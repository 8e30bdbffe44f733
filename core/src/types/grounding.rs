//! Value-grounding results.
//!
//! The grounding engine classifies free-text value fragments ("Acme Corp",
//! "Closed Won", "2024-01-31") into schema-aware filter suggestions. These
//! types carry the classification, its confidence, and the evidence trail.

use serde::{Deserialize, Serialize};

/// What kind of schema element a value fragment was resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundingKind {
    /// A proper-noun value that most likely names an account/company
    CompanyName,
    /// An exact or near value of some picklist field (status, stage, ...)
    PicklistValue,
    /// The name of a schema object itself
    ObjectName,
    /// A value that vector search associated with a specific field
    FieldValue,
    /// An ISO date/datetime or a SOQL date literal (`LAST_MONTH`, ...)
    DateLiteral,
    /// A plain numeric value
    Numeric,
    /// A 15- or 18-character record id
    RecordId,
    /// Nothing matched
    Unknown,
}

/// Supporting evidence for a grounding result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundingEvidence {
    /// Graph node the value was matched against (`Object.Field` or an
    /// object API name), when a match exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_node: Option<String>,
}

/// A single classification of a value fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundingResult {
    pub kind: GroundingKind,
    /// Confidence in `[0, 1]`
    pub confidence: f32,
    /// A ready-to-use SOQL filter fragment, when one can be suggested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_filter: Option<String>,
    /// Field paths the filter applies to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    pub evidence: GroundingEvidence,
}

impl GroundingResult {
    pub fn new(kind: GroundingKind, confidence: f32) -> Self {
        Self {
            kind,
            confidence: confidence.clamp(0.0, 1.0),
            suggested_filter: None,
            fields: Vec::new(),
            evidence: GroundingEvidence::default(),
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>, field: impl Into<String>) -> Self {
        self.suggested_filter = Some(filter.into());
        self.fields.push(field.into());
        self
    }

    pub fn with_matched_node(mut self, node: impl Into<String>) -> Self {
        self.evidence.matched_node = Some(node.into());
        self
    }
}

/// All classifications produced for one input value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundedEntity {
    /// The raw input fragment
    pub value: String,
    /// Candidate classifications, ranked by the engine
    pub results: Vec<GroundingResult>,
}

impl GroundedEntity {
    pub fn new(value: impl Into<String>, results: Vec<GroundingResult>) -> Self {
        Self {
            value: value.into(),
            results,
        }
    }

    /// A fully-ungrounded entity.
    pub fn unknown(value: impl Into<String>) -> Self {
        Self::new(value, vec![GroundingResult::new(GroundingKind::Unknown, 0.3)])
    }

    /// The highest-confidence classification, if any result exists.
    pub fn best_match(&self) -> Option<&GroundingResult> {
        self.results.iter().max_by(|a, b| {
            a.confidence
                .partial_cmp(&b.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }
}
