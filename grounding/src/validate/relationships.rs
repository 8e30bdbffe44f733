//! Relationship path and field validation.
//!
//! Walks dot-notation parent lookups segment by segment against the
//! graph's relationship records, validates child subquery names, and
//! checks select-list fields against the main object. Every miss is paired
//! with the closest known name (Jaro-Winkler) so a repair loop has
//! something concrete to substitute.

use std::sync::Arc;

use log::debug;

use soqlforge_core::parse::ParsedQueryAst;
use soqlforge_core::types::ValidationMessage;
use soqlforge_core::{MetadataGraph, RelationshipRecord};

use crate::live::LiveOrg;

/// Similarity floor below which a suggestion is considered noise.
const SUGGESTION_FLOOR: f64 = 0.5;

/// Validate parent lookups, child subqueries, and select-list fields.
///
/// `main_object` is the resolved canonical API name. Graph failures make
/// the affected check inconclusive and silent: an unreachable backend must
/// not condemn a possibly-correct query.
pub async fn validate_relationships(
    graph: &Arc<dyn MetadataGraph>,
    live: Option<&Arc<dyn LiveOrg>>,
    ast: &ParsedQueryAst,
    main_object: &str,
    org: &str,
) -> Vec<ValidationMessage> {
    let mut messages = Vec::new();

    for lookup in &ast.parent_lookups {
        let mut current = main_object.to_string();
        let mut path_ok = true;

        for segment in &lookup.path {
            let relationships = match graph.parent_relationships(org, &current).await {
                Ok(r) => r,
                Err(e) => {
                    debug!("relationship fetch for {current} failed, skipping path check: {e}");
                    path_ok = false;
                    break;
                }
            };
            if relationships.is_empty() {
                // Nothing recorded for this object; inconclusive.
                path_ok = false;
                break;
            }

            match relationships
                .iter()
                .find(|r| r.relationship_name.eq_ignore_ascii_case(segment))
            {
                Some(record) => current = record.target_object.clone(),
                None => {
                    let known: Vec<&str> = relationships
                        .iter()
                        .map(|r| r.relationship_name.as_str())
                        .collect();
                    let mut message = ValidationMessage::error(format!(
                        "unknown relationship '{segment}' on {current} in path '{}'",
                        lookup.raw
                    ));
                    if let Some(closest) = closest_name(segment, &known) {
                        message = message.with_suggestion(segment.clone(), closest);
                    }
                    messages.push(message);
                    path_ok = false;
                    break;
                }
            }
        }

        if path_ok {
            messages.extend(
                check_field_exists(graph, org, &current, &lookup.target_field, &lookup.raw).await,
            );
        }
    }

    messages.extend(validate_subqueries(graph, live, ast, main_object, org).await);

    // Plain select-list fields must exist on the main object.
    for field in ast.fields.iter().filter(|f| !f.contains('.')) {
        messages.extend(check_field_exists(graph, org, main_object, field, field).await);
    }

    messages
}

async fn validate_subqueries(
    graph: &Arc<dyn MetadataGraph>,
    live: Option<&Arc<dyn LiveOrg>>,
    ast: &ParsedQueryAst,
    main_object: &str,
    org: &str,
) -> Vec<ValidationMessage> {
    if ast.subqueries.is_empty() {
        return Vec::new();
    }

    let mut messages = Vec::new();

    let graph_children = match graph.child_relationships(org, main_object).await {
        Ok(children) => children,
        Err(e) => {
            debug!("child relationship fetch for {main_object} failed: {e}");
            Vec::new()
        }
    };

    // Just-in-time fallback: when the graph has no record at all, ask the
    // live org before condemning the subquery.
    let children: Vec<RelationshipRecord> = if graph_children.is_empty() {
        match live {
            Some(live) => match live.describe_child_relationships(org, main_object).await {
                Ok(described) => {
                    debug!(
                        "graph had no child relationships for {main_object}; live describe \
                         returned {}",
                        described.len()
                    );
                    described
                }
                Err(e) => {
                    debug!("live child relationship describe failed: {e}");
                    Vec::new()
                }
            },
            None => Vec::new(),
        }
    } else {
        graph_children
    };

    if children.is_empty() {
        // No record anywhere; inconclusive rather than wrong.
        return messages;
    }

    for subquery in &ast.subqueries {
        let found = children
            .iter()
            .any(|r| r.relationship_name.eq_ignore_ascii_case(&subquery.relationship_name));
        if found {
            continue;
        }

        let known: Vec<&str> = children
            .iter()
            .map(|r| r.relationship_name.as_str())
            .collect();
        let mut message = ValidationMessage::error(format!(
            "unknown child relationship '{}' on {main_object}",
            subquery.relationship_name
        ));
        if let Some(closest) = closest_name(&subquery.relationship_name, &known) {
            message = message.with_suggestion(subquery.relationship_name.clone(), closest);
        }
        messages.push(message);
    }

    messages
}

async fn check_field_exists(
    graph: &Arc<dyn MetadataGraph>,
    org: &str,
    object: &str,
    field: &str,
    context: &str,
) -> Vec<ValidationMessage> {
    let fields = match graph.fields_of(org, object).await {
        Ok(fields) => fields,
        Err(e) => {
            debug!("field fetch for {object} failed, skipping field check: {e}");
            return Vec::new();
        }
    };
    if fields.is_empty() {
        // Unknown schema for this object; inconclusive.
        return Vec::new();
    }

    if fields.iter().any(|f| f.api_name.eq_ignore_ascii_case(field)) {
        return Vec::new();
    }

    let known: Vec<&str> = fields.iter().map(|f| f.api_name.as_str()).collect();
    let mut message = ValidationMessage::error(format!(
        "no field '{field}' on {object} (referenced as '{context}')"
    ));
    if let Some(closest) = closest_name(field, &known) {
        message = message.with_suggestion(field.to_string(), closest);
    }
    vec![message]
}

/// The closest known name by Jaro-Winkler similarity, if any clears the
/// noise floor.
fn closest_name(input: &str, known: &[&str]) -> Option<String> {
    known
        .iter()
        .map(|candidate| {
            (
                strsim::jaro_winkler(&input.to_lowercase(), &candidate.to_lowercase()),
                *candidate,
            )
        })
        .filter(|(score, _)| *score >= SUGGESTION_FLOOR)
        .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(_, candidate)| candidate.to_string())
}
