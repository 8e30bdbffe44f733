//! Few-shot example records.

use serde::{Deserialize, Serialize};

/// A worked question → SOQL pair used as a few-shot example.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoqlExample {
    pub question: String,
    pub soql: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SoqlExample {
    pub fn new(question: impl Into<String>, soql: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            soql: soql.into(),
            description: None,
        }
    }
}

/// A stored example as it lives in the vector index.
///
/// `embedding_model` records which model produced the stored vector; search
/// filters on it so examples embedded under a retired model become invisible
/// (not deleted) until re-seeded. `content_hash` detects drift between the
/// stored text and what the bundled set currently contains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredExample {
    #[serde(flatten)]
    pub example: SoqlExample,
    pub embedding_model: String,
    pub content_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_example_flattens_on_serialize() {
        let stored = StoredExample {
            example: SoqlExample::new("how many accounts?", "SELECT COUNT() FROM Account"),
            embedding_model: "nomic-embed-text".to_string(),
            content_hash: "abc".to_string(),
        };

        let json = serde_json::to_value(&stored).unwrap();
        assert_eq!(json["question"], "how many accounts?");
        assert_eq!(json["embedding_model"], "nomic-embed-text");
    }
}
