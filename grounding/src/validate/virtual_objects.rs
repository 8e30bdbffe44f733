//! Constraint checks for reflective metadata objects.
//!
//! A fixed set of virtual objects (EntityDefinition and friends) is served
//! by the platform's metadata layer, not the query engine, and rejects most
//! query constructs outright. Each disallowed construct found in the AST is
//! reported as its own error so a repair loop can fix them one by one.

use soqlforge_core::parse::ParsedQueryAst;
use soqlforge_core::types::ValidationMessage;

/// Objects with platform-imposed query restrictions.
pub const VIRTUAL_OBJECTS: [&str; 8] = [
    "EntityDefinition",
    "FieldDefinition",
    "EntityParticle",
    "RelationshipInfo",
    "RelationshipDomain",
    "Publisher",
    "UserEntityAccess",
    "UserFieldAccess",
];

/// True if `object_api_name` is one of the restricted metadata objects.
pub fn is_virtual_object(object_api_name: &str) -> bool {
    VIRTUAL_OBJECTS
        .iter()
        .any(|v| v.eq_ignore_ascii_case(object_api_name))
}

/// Report every restricted construct the query uses. Only meaningful when
/// the main object is virtual.
pub fn check_virtual_constraints(ast: &ParsedQueryAst) -> Vec<ValidationMessage> {
    let object = &ast.main_object;
    let mut messages = Vec::new();

    if ast.has_aggregates() {
        messages.push(ValidationMessage::error(format!(
            "COUNT() and aggregate functions are not supported on {object}"
        )));
    }
    if !ast.group_by.is_empty() {
        messages.push(ValidationMessage::error(format!(
            "GROUP BY is not supported on {object}"
        )));
    }
    if ast.limit.is_some() {
        messages.push(ValidationMessage::error(format!(
            "LIMIT is not supported on {object}"
        )));
    }
    if ast.offset.is_some() {
        messages.push(ValidationMessage::error(format!(
            "OFFSET is not supported on {object}"
        )));
    }

    if let Some(where_clause) = &ast.where_clause {
        if where_clause.contains_or() {
            messages.push(ValidationMessage::error(format!(
                "OR is not supported in filters on {object}"
            )));
        }
        if where_clause
            .comparisons()
            .iter()
            .any(|c| c.op.is_inequality())
        {
            messages.push(ValidationMessage::error(format!(
                "inequality comparisons (!= / <>) are not supported on {object}"
            )));
        }
    }

    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use soqlforge_core::parse::parse_soql;

    #[test]
    fn test_virtual_object_set() {
        assert!(is_virtual_object("EntityDefinition"));
        assert!(is_virtual_object("fielddefinition"));
        assert!(!is_virtual_object("Account"));
    }

    #[test]
    fn test_or_filter_reported_once() {
        let ast =
            parse_soql("SELECT Id FROM EntityDefinition WHERE Name = 'x' OR Name = 'y'").unwrap();
        let messages = check_virtual_constraints(&ast);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].message.contains("OR"));
    }

    #[test]
    fn test_each_construct_reported_distinctly() {
        let ast = parse_soql(
            "SELECT COUNT() FROM EntityDefinition WHERE QualifiedApiName != 'Account' LIMIT 10 OFFSET 5",
        )
        .unwrap();
        let messages = check_virtual_constraints(&ast);

        assert_eq!(messages.len(), 4);
        let all = messages
            .iter()
            .map(|m| m.message.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        assert!(all.contains("COUNT()"));
        assert!(all.contains("LIMIT"));
        assert!(all.contains("OFFSET"));
        assert!(all.contains("!="));
    }

    #[test]
    fn test_clean_virtual_query_passes() {
        let ast = parse_soql(
            "SELECT QualifiedApiName FROM EntityDefinition WHERE QualifiedApiName = 'Account'",
        )
        .unwrap();
        assert!(check_virtual_constraints(&ast).is_empty());
    }
}
