//! Candidate query validation.
//!
//! A state-free pipeline over one parsed query: resolve the main object,
//! apply virtual-object constraints, walk relationship paths, and run the
//! governor heuristics. The output is a list of messages: errors block,
//! warnings advise, corrections are safe rewrites the caller may
//! auto-apply. Nothing here executes the query or raises for a degraded
//! backend.

pub mod governor;
pub mod relationships;
pub mod virtual_objects;

use std::sync::Arc;

use soqlforge_core::parse::parse_soql;
use soqlforge_core::types::{ValidationMessage, ValidationReport};
use soqlforge_core::MetadataGraph;

use crate::config::ValidatorConfig;
use crate::live::LiveOrg;
use crate::resolver::{EntityResolver, ResolutionKind};

pub use virtual_objects::{is_virtual_object, VIRTUAL_OBJECTS};

/// Validates candidate SOQL against graph-derived schema facts.
pub struct QueryValidator {
    graph: Arc<dyn MetadataGraph>,
    resolver: EntityResolver,
    live: Option<Arc<dyn LiveOrg>>,
    config: ValidatorConfig,
}

impl QueryValidator {
    pub fn new(graph: Arc<dyn MetadataGraph>, config: ValidatorConfig) -> Self {
        let resolver = EntityResolver::new(graph.clone());
        Self {
            graph,
            resolver,
            live: None,
            config,
        }
    }

    /// Attach a live-org collaborator for just-in-time relationship
    /// lookups.
    pub fn with_live(mut self, live: Arc<dyn LiveOrg>) -> Self {
        self.live = Some(live);
        self
    }

    /// Validate one candidate query string.
    pub async fn validate(&self, soql: &str, org: &str) -> ValidationReport {
        let ast = match parse_soql(soql) {
            Ok(ast) => ast,
            Err(e) => {
                return ValidationReport::from_messages(vec![ValidationMessage::error(format!(
                    "query does not parse: {e}"
                ))]);
            }
        };

        let mut messages = Vec::new();

        // Resolve the main object; a heuristic or relationship match means
        // the written name itself is wrong, which is an error with the
        // canonical name as the suggestion.
        let main_object = match self.resolver.resolve(&ast.main_object, org).await {
            Some(resolved) => {
                if resolved.kind != ResolutionKind::Object {
                    messages.push(
                        ValidationMessage::error(format!(
                            "unknown object '{}' in FROM clause",
                            ast.main_object
                        ))
                        .with_suggestion(
                            ast.main_object.clone(),
                            resolved.resolved_api_name.clone(),
                        ),
                    );
                }
                resolved.resolved_api_name
            }
            None => {
                messages.push(ValidationMessage::error(format!(
                    "unknown object '{}' in FROM clause",
                    ast.main_object
                )));
                // Continue best-effort with the written name; the virtual
                // checks are purely name-based.
                ast.main_object.clone()
            }
        };

        let is_virtual = is_virtual_object(&main_object);
        if is_virtual {
            messages.extend(virtual_objects::check_virtual_constraints(&ast));
        }

        messages.extend(
            relationships::validate_relationships(
                &self.graph,
                self.live.as_ref(),
                &ast,
                &main_object,
                org,
            )
            .await,
        );

        messages.extend(governor::check_governor_limits(
            &ast,
            soql,
            is_virtual,
            &self.config,
        ));

        ValidationReport::from_messages(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use soqlforge_core::graph::memory::InMemoryGraph;
    use soqlforge_core::graph::{FieldRecord, ObjectRecord, RelationshipRecord};
    use soqlforge_core::types::MessageKind;

    use crate::error::GroundingError;

    fn field(api_name: &str, field_type: &str) -> FieldRecord {
        FieldRecord {
            api_name: api_name.to_string(),
            label: api_name.to_string(),
            field_type: field_type.to_string(),
            description: None,
            reference_to: Vec::new(),
            relationship_name: None,
        }
    }

    fn object(api_name: &str) -> ObjectRecord {
        ObjectRecord {
            api_name: api_name.to_string(),
            label: api_name.to_string(),
            description: None,
            is_custom: false,
        }
    }

    fn sales_graph() -> Arc<InMemoryGraph> {
        let graph = InMemoryGraph::new();
        for name in ["Account", "Contact", "Opportunity", "EntityDefinition"] {
            graph.add_object("org1", object(name));
        }
        for f in [field("Id", "id"), field("Name", "string"), field("Industry", "picklist")] {
            graph.add_field("org1", "Account", f);
        }
        for f in [
            field("Id", "id"),
            field("Name", "string"),
            field("Email", "email"),
            field("AccountId", "reference"),
        ] {
            graph.add_field("org1", "Contact", f);
        }
        for f in [field("Id", "id"), field("Name", "string"), field("QualifiedApiName", "string")] {
            graph.add_field("org1", "EntityDefinition", f);
        }
        graph.add_relationship(
            "org1",
            RelationshipRecord {
                relationship_name: "Account".to_string(),
                source_object: "Contact".to_string(),
                target_object: "Account".to_string(),
                field_api_name: "AccountId".to_string(),
                is_child: false,
            },
        );
        graph.add_relationship(
            "org1",
            RelationshipRecord {
                relationship_name: "Owner".to_string(),
                source_object: "Account".to_string(),
                target_object: "User".to_string(),
                field_api_name: "OwnerId".to_string(),
                is_child: false,
            },
        );
        graph.add_relationship(
            "org1",
            RelationshipRecord {
                relationship_name: "Contacts".to_string(),
                source_object: "Account".to_string(),
                target_object: "Contact".to_string(),
                field_api_name: "AccountId".to_string(),
                is_child: true,
            },
        );
        Arc::new(graph)
    }

    fn validator() -> QueryValidator {
        QueryValidator::new(sales_graph(), ValidatorConfig::default())
    }

    #[tokio::test]
    async fn test_valid_query_gets_only_limit_correction() {
        let report = validator().validate("SELECT Id FROM Account", "org1").await;

        assert!(report.is_valid);
        assert_eq!(report.messages.len(), 1);

        let correction = &report.messages[0];
        assert_eq!(correction.kind, MessageKind::Correction);
        assert_eq!(
            correction.corrected.as_deref(),
            Some("SELECT Id FROM Account LIMIT 1000")
        );
    }

    #[tokio::test]
    async fn test_virtual_object_or_is_single_error_without_correction() {
        let report = validator()
            .validate(
                "SELECT Id FROM EntityDefinition WHERE Name = 'x' OR Name = 'y'",
                "org1",
            )
            .await;

        assert!(!report.is_valid);
        assert_eq!(report.messages.len(), 1);
        assert_eq!(report.messages[0].kind, MessageKind::Error);
        assert!(report.messages[0].message.contains("OR"));
        assert_eq!(report.corrections().count(), 0);
    }

    #[tokio::test]
    async fn test_relationship_typo_suggests_account() {
        let report = validator()
            .validate("SELECT Id, Accnt.Name FROM Contact LIMIT 10", "org1")
            .await;

        assert!(!report.is_valid);
        let error = report.errors().next().unwrap();
        assert!(error.message.contains("Accnt"));
        assert_eq!(error.corrected.as_deref(), Some("Account"));
    }

    #[tokio::test]
    async fn test_multi_segment_path_walks_targets() {
        let report = validator()
            .validate("SELECT Account.Owner.Id FROM Contact LIMIT 10", "org1")
            .await;
        // Contact → Account → Owner resolves; User has no fields recorded,
        // so the final segment is inconclusive, not an error.
        assert!(report.is_valid);
    }

    #[tokio::test]
    async fn test_parent_lookup_final_field_checked() {
        let report = validator()
            .validate("SELECT Account.Industy FROM Contact LIMIT 10", "org1")
            .await;

        assert!(!report.is_valid);
        let error = report.errors().next().unwrap();
        assert_eq!(error.corrected.as_deref(), Some("Industry"));
    }

    #[tokio::test]
    async fn test_unknown_child_relationship_suggested() {
        let report = validator()
            .validate(
                "SELECT Id, (SELECT Id FROM Contact) FROM Account LIMIT 10",
                "org1",
            )
            .await;

        assert!(!report.is_valid);
        let error = report.errors().next().unwrap();
        assert!(error.message.contains("child relationship"));
        assert_eq!(error.corrected.as_deref(), Some("Contacts"));
    }

    #[tokio::test]
    async fn test_live_fallback_confirms_missing_graph_record() {
        struct LiveWithInvoices;

        #[async_trait]
        impl LiveOrg for LiveWithInvoices {
            async fn count_matching(
                &self,
                _org: &str,
                _object: &str,
                _field: &str,
                _value: &str,
            ) -> Result<u64, GroundingError> {
                Ok(0)
            }

            async fn describe_child_relationships(
                &self,
                _org: &str,
                _object: &str,
            ) -> Result<Vec<RelationshipRecord>, GroundingError> {
                Ok(vec![RelationshipRecord {
                    relationship_name: "Invoices__r".to_string(),
                    source_object: "Opportunity".to_string(),
                    target_object: "Invoice__c".to_string(),
                    field_api_name: "Opportunity__c".to_string(),
                    is_child: true,
                }])
            }
        }

        // The graph has no child relationships for Opportunity; the live
        // describe supplies them just in time.
        let validator = QueryValidator::new(sales_graph(), ValidatorConfig::default())
            .with_live(Arc::new(LiveWithInvoices));

        let report = validator
            .validate(
                "SELECT Id, (SELECT Id FROM Invoices__r) FROM Opportunity LIMIT 10",
                "org1",
            )
            .await;
        assert!(report.is_valid);

        let report = validator
            .validate(
                "SELECT Id, (SELECT Id FROM Invoice__r) FROM Opportunity LIMIT 10",
                "org1",
            )
            .await;
        assert!(!report.is_valid);
        let error = report.errors().next().unwrap();
        assert_eq!(error.corrected.as_deref(), Some("Invoices__r"));
    }

    #[tokio::test]
    async fn test_unknown_object_with_heuristic_suggestion() {
        let report = validator()
            .validate("SELECT Id FROM Accounts LIMIT 10", "org1")
            .await;

        assert!(!report.is_valid);
        let error = report.errors().next().unwrap();
        assert!(error.message.contains("Accounts"));
        assert_eq!(error.corrected.as_deref(), Some("Account"));
    }

    #[tokio::test]
    async fn test_unknown_select_field_suggested() {
        let report = validator()
            .validate("SELECT Id, Emial FROM Contact LIMIT 10", "org1")
            .await;

        assert!(!report.is_valid);
        let error = report.errors().next().unwrap();
        assert_eq!(error.corrected.as_deref(), Some("Email"));
    }

    #[tokio::test]
    async fn test_unparseable_query_is_single_error() {
        let report = validator().validate("SELECT FROM WHERE", "org1").await;
        assert!(!report.is_valid);
        assert_eq!(report.messages.len(), 1);
        assert!(report.messages[0].message.contains("does not parse"));
    }
}
