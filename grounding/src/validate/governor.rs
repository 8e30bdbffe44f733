//! Governor-limit heuristics.
//!
//! Pre-execution defence against the platform's resource ceilings: leading
//! wildcards defeat index selectivity on any object, and an unbounded row
//! count is one correction away from a safe default.

use soqlforge_core::parse::{CompareOp, ParsedQueryAst, SoqlValue};
use soqlforge_core::types::ValidationMessage;

use crate::config::ValidatorConfig;

/// Run the governor heuristics over a parsed query.
///
/// `is_virtual` suppresses the LIMIT correction entirely: LIMIT itself is
/// disallowed on virtual objects, so suggesting one would be a new error.
pub fn check_governor_limits(
    ast: &ParsedQueryAst,
    soql: &str,
    is_virtual: bool,
    config: &ValidatorConfig,
) -> Vec<ValidationMessage> {
    let mut messages = Vec::new();

    for comparison in ast.where_comparisons() {
        if comparison.op != CompareOp::Like {
            continue;
        }
        if let SoqlValue::Str(pattern) = &comparison.value {
            if pattern.starts_with('%') {
                messages.push(ValidationMessage::warning(format!(
                    "LIKE '{pattern}' on {} has a leading wildcard; the filter cannot use an \
                     index and the query may be rejected as non-selective on large objects",
                    comparison.field_path
                )));
            }
        }
    }

    if !is_virtual && ast.limit.is_none() && !ast.has_aggregates() {
        messages.push(ValidationMessage::correction(
            format!(
                "no LIMIT clause; adding LIMIT {} to bound the row count",
                config.default_limit
            ),
            soql.trim().to_string(),
            format!("{} LIMIT {}", soql.trim(), config.default_limit),
        ));
    }

    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use soqlforge_core::parse::parse_soql;
    use soqlforge_core::types::MessageKind;

    fn check(soql: &str, is_virtual: bool) -> Vec<ValidationMessage> {
        let ast = parse_soql(soql).unwrap();
        check_governor_limits(&ast, soql, is_virtual, &ValidatorConfig::default())
    }

    #[test]
    fn test_missing_limit_yields_exactly_one_correction() {
        let messages = check("SELECT Id FROM Account", false);
        assert_eq!(messages.len(), 1);

        let correction = &messages[0];
        assert_eq!(correction.kind, MessageKind::Correction);
        assert_eq!(
            correction.corrected.as_deref(),
            Some("SELECT Id FROM Account LIMIT 1000")
        );
    }

    #[test]
    fn test_existing_limit_passes() {
        assert!(check("SELECT Id FROM Account LIMIT 50", false).is_empty());
    }

    #[test]
    fn test_aggregate_query_needs_no_limit() {
        assert!(check("SELECT COUNT() FROM Account", false).is_empty());
    }

    #[test]
    fn test_leading_wildcard_warns_universally() {
        let messages = check(
            "SELECT Id FROM Account WHERE Name LIKE '%corp%' LIMIT 10",
            false,
        );
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind, MessageKind::Warning);
        assert!(messages[0].message.contains("leading wildcard"));

        // Applies on virtual objects too, where the limit correction is
        // suppressed.
        let messages = check(
            "SELECT DurableId FROM EntityDefinition WHERE Label LIKE '%def%'",
            true,
        );
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind, MessageKind::Warning);
    }

    #[test]
    fn test_trailing_wildcard_is_fine() {
        let messages = check("SELECT Id FROM Account WHERE Name LIKE 'Acme%' LIMIT 10", false);
        assert!(messages.is_empty());
    }

    #[test]
    fn test_limit_correction_suppressed_for_virtual_objects() {
        let messages = check("SELECT DurableId FROM EntityDefinition", true);
        assert!(messages.is_empty());
    }
}
