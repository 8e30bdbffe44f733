//! Bundled few-shot examples.
//!
//! A small, curated set of question → SOQL pairs used to seed an empty
//! example store on first use. Orgs typically replace these with their own
//! curated examples over time; the bundle just keeps retrieval useful from
//! day one.

use sha2::{Digest, Sha256};

use soqlforge_core::types::SoqlExample;

/// Compute the SHA-256 content hash stored next to each example.
///
/// The hash covers question and query text so drift between a stored
/// example and the current bundle is detectable.
pub fn example_content_hash(example: &SoqlExample) -> String {
    let mut hasher = Sha256::new();
    hasher.update(example.question.as_bytes());
    hasher.update(b"\n");
    hasher.update(example.soql.as_bytes());
    hex::encode(hasher.finalize())
}

/// The bundled example set.
pub fn bundled_examples() -> Vec<SoqlExample> {
    vec![
        SoqlExample::new(
            "how many accounts do we have?",
            "SELECT COUNT() FROM Account",
        ),
        SoqlExample::new(
            "show me all open opportunities over 50k",
            "SELECT Id, Name, Amount, StageName FROM Opportunity WHERE IsClosed = false AND Amount > 50000 LIMIT 200",
        ),
        SoqlExample::new(
            "list contacts at Acme with their account name",
            "SELECT Id, Name, Email, Account.Name FROM Contact WHERE Account.Name LIKE 'Acme%' LIMIT 200",
        ),
        SoqlExample::new(
            "which accounts have no open cases?",
            "SELECT Id, Name FROM Account WHERE Id NOT IN (SELECT AccountId FROM Case WHERE IsClosed = false) LIMIT 200",
        ),
        SoqlExample::new(
            "opportunities closing this quarter by stage",
            "SELECT StageName, COUNT(Id) total, SUM(Amount) pipeline FROM Opportunity WHERE CloseDate = THIS_QUARTER GROUP BY StageName",
        ),
        SoqlExample::new(
            "cases opened in the last 30 days with their contact emails",
            "SELECT Id, CaseNumber, Subject, Contact.Email FROM Case WHERE CreatedDate = LAST_N_DAYS:30 ORDER BY CreatedDate DESC LIMIT 200",
        ),
        SoqlExample::new(
            "accounts with their related contacts",
            "SELECT Id, Name, (SELECT Id, Name, Email FROM Contacts) FROM Account LIMIT 100",
        ),
        SoqlExample::new(
            "leads created this month that are not yet converted",
            "SELECT Id, Name, Company, Status FROM Lead WHERE CreatedDate = THIS_MONTH AND IsConverted = false LIMIT 200",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_is_non_empty_and_distinct() {
        let examples = bundled_examples();
        assert!(examples.len() >= 5);

        let mut hashes: Vec<String> = examples.iter().map(example_content_hash).collect();
        hashes.sort();
        hashes.dedup();
        assert_eq!(hashes.len(), examples.len());
    }

    #[test]
    fn test_content_hash_is_deterministic() {
        let example = SoqlExample::new("q", "SELECT Id FROM Account");
        assert_eq!(example_content_hash(&example), example_content_hash(&example));
    }
}
