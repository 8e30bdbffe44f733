//! Draft-phase field extraction.
//!
//! A cheap generative call produces a rough draft query from the current
//! schema slice; which fields the model "reached for" is a useful pruning
//! signal even when the draft itself is syntactically broken. The extractor
//! therefore never parses the draft: it scans for identifier-shaped tokens
//! and keeps only those that exactly match a known field name, which
//! tolerates any amount of malformed punctuation around them.
//!
//! The whole phase is a race against a timer. On timeout the pipeline
//! proceeds without the signal; the underlying call is left to finish on
//! its own and its result is discarded.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use regex::Regex;

use soqlforge_core::types::CORE_FIELDS;
use soqlforge_rag::{ChatMessage, ChatProvider};

/// Ask `chat` for a draft query and mine it for known field names.
///
/// `known_fields` maps each object API name to its full field list; only
/// case-sensitive exact members are kept. Returns `None` when the call
/// fails or loses the race, in which case the caller omits the signal.
pub async fn extract_draft_fields(
    chat: Arc<dyn ChatProvider>,
    query: &str,
    known_fields: &HashMap<String, Vec<String>>,
    timeout: Duration,
) -> Option<HashMap<String, Vec<String>>> {
    let messages = draft_messages(query, known_fields);

    // Spawned so a timeout abandons the result without cancelling the
    // in-flight call.
    let handle = tokio::spawn(async move { chat.complete(&messages).await });

    let draft = match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(Ok(text))) => text,
        Ok(Ok(Err(e))) => {
            debug!("draft generation failed, omitting signal: {e}");
            return None;
        }
        Ok(Err(e)) => {
            debug!("draft generation task aborted: {e}");
            return None;
        }
        Err(_) => {
            debug!("draft generation lost the race after {timeout:?}, omitting signal");
            return None;
        }
    };

    Some(extract_known_fields(&draft, known_fields))
}

fn draft_messages(query: &str, known_fields: &HashMap<String, Vec<String>>) -> Vec<ChatMessage> {
    let mut schema = String::new();
    let mut objects: Vec<&String> = known_fields.keys().collect();
    objects.sort();
    for object in objects {
        schema.push_str(object);
        schema.push_str(": ");
        schema.push_str(&known_fields[object].join(", "));
        schema.push('\n');
    }

    vec![
        ChatMessage::system(
            "Draft a single SOQL query for the request. Use only the listed fields. \
             Reply with the query alone.",
        ),
        ChatMessage::user(format!("Schema:\n{schema}\nRequest: {query}")),
    ]
}

/// Scan a (possibly malformed) draft for identifier-shaped tokens and keep
/// the ones naming a known field, merged with the core field set.
pub fn extract_known_fields(
    draft: &str,
    known_fields: &HashMap<String, Vec<String>>,
) -> HashMap<String, Vec<String>> {
    let identifier = Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("static regex");
    let tokens: Vec<&str> = identifier.find_iter(draft).map(|m| m.as_str()).collect();

    let mut extracted = HashMap::new();
    for (object, fields) in known_fields {
        let mut kept: Vec<String> = CORE_FIELDS.iter().map(|f| f.to_string()).collect();
        for token in &tokens {
            // Case-sensitive: the draft must have used the exact API name.
            if fields.iter().any(|f| f == token) && !kept.iter().any(|f| f == token) {
                kept.push((*token).to_string());
            }
        }
        extracted.insert(object.clone(), kept);
    }
    extracted
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use soqlforge_rag::RagError;

    struct ScriptedChat {
        reply: Option<String>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl ChatProvider for ScriptedChat {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, RagError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.reply
                .clone()
                .ok_or_else(|| RagError::Chat("model offline".to_string()))
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn known() -> HashMap<String, Vec<String>> {
        let mut map = HashMap::new();
        map.insert(
            "Opportunity".to_string(),
            vec![
                "Id".to_string(),
                "Name".to_string(),
                "StageName".to_string(),
                "Amount".to_string(),
                "CloseDate".to_string(),
            ],
        );
        map
    }

    #[tokio::test]
    async fn test_extracts_fields_from_malformed_draft() {
        // Broken punctuation everywhere; the known identifiers still count.
        let chat = Arc::new(ScriptedChat {
            reply: Some("SELCT StageName,, Amount FORM Opportunity WHERE ((".to_string()),
            delay: None,
        });

        let result = extract_draft_fields(chat, "pipeline by stage", &known(), Duration::from_secs(1))
            .await
            .unwrap();

        let fields = &result["Opportunity"];
        assert!(fields.contains(&"StageName".to_string()));
        assert!(fields.contains(&"Amount".to_string()));
        // Core set always merged in.
        assert!(fields.contains(&"Id".to_string()));
        assert!(fields.contains(&"OwnerId".to_string()));
    }

    #[tokio::test]
    async fn test_matching_is_case_sensitive() {
        let chat = Arc::new(ScriptedChat {
            reply: Some("select stagename, AMOUNT from Opportunity".to_string()),
            delay: None,
        });

        let result = extract_draft_fields(chat, "q", &known(), Duration::from_secs(1))
            .await
            .unwrap();

        let fields = &result["Opportunity"];
        assert!(!fields.contains(&"StageName".to_string()));
        assert!(!fields.contains(&"Amount".to_string()));
    }

    #[tokio::test]
    async fn test_timeout_omits_signal() {
        let chat = Arc::new(ScriptedChat {
            reply: Some("SELECT StageName FROM Opportunity".to_string()),
            delay: Some(Duration::from_millis(200)),
        });

        let result =
            extract_draft_fields(chat, "q", &known(), Duration::from_millis(10)).await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_chat_failure_omits_signal() {
        let chat = Arc::new(ScriptedChat {
            reply: None,
            delay: None,
        });

        let result = extract_draft_fields(chat, "q", &known(), Duration::from_secs(1)).await;
        assert!(result.is_none());
    }

    #[test]
    fn test_unknown_identifiers_are_dropped() {
        let mut result = extract_known_fields(
            "SELECT Bogus__c, CloseDate FROM Opportunity",
            &known(),
        );
        let fields = result.remove("Opportunity").unwrap();
        assert!(fields.contains(&"CloseDate".to_string()));
        assert!(!fields.contains(&"Bogus__c".to_string()));
    }
}
