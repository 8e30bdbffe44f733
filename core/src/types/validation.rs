//! Validation messages surfaced by the query validator.

use serde::{Deserialize, Serialize};

/// Severity / handling class of a validation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Blocks acceptance of the query
    Error,
    /// Advisory only
    Warning,
    /// A safe rewrite the caller may auto-apply
    Correction,
}

/// One finding from the validation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationMessage {
    pub kind: MessageKind,
    pub message: String,
    /// The offending fragment (or the full query for corrections)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
    /// Suggested replacement, when one exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrected: Option<String>,
}

impl ValidationMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Error,
            message: message.into(),
            original: None,
            corrected: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Warning,
            message: message.into(),
            original: None,
            corrected: None,
        }
    }

    pub fn correction(
        message: impl Into<String>,
        original: impl Into<String>,
        corrected: impl Into<String>,
    ) -> Self {
        Self {
            kind: MessageKind::Correction,
            message: message.into(),
            original: Some(original.into()),
            corrected: Some(corrected.into()),
        }
    }

    /// Attach the original/suggested pair to an error or warning.
    pub fn with_suggestion(
        mut self,
        original: impl Into<String>,
        corrected: impl Into<String>,
    ) -> Self {
        self.original = Some(original.into());
        self.corrected = Some(corrected.into());
        self
    }
}

/// The complete outcome of validating one candidate query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub messages: Vec<ValidationMessage>,
}

impl ValidationReport {
    /// Build a report; validity is derived from the absence of errors.
    pub fn from_messages(messages: Vec<ValidationMessage>) -> Self {
        let is_valid = !messages.iter().any(|m| m.kind == MessageKind::Error);
        Self { is_valid, messages }
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationMessage> {
        self.messages.iter().filter(|m| m.kind == MessageKind::Error)
    }

    pub fn corrections(&self) -> impl Iterator<Item = &ValidationMessage> {
        self.messages
            .iter()
            .filter(|m| m.kind == MessageKind::Correction)
    }
}
