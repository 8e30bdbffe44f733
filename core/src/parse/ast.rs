//! The parsed query tree.

use serde::{Deserialize, Serialize};

/// Comparison operators recognised in WHERE clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Gt,
    Le,
    Ge,
    Like,
    In,
    NotIn,
    Includes,
    Excludes,
}

impl CompareOp {
    /// True for `!=` and `<>`.
    pub fn is_inequality(self) -> bool {
        self == CompareOp::Neq
    }
}

/// A literal value in a WHERE comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoqlValue {
    Str(String),
    Number(f64),
    Bool(bool),
    Null,
    /// A SOQL date literal such as `TODAY` or `LAST_N_DAYS:30`
    DateLiteral(String),
    /// Value list for `IN (...)`
    List(Vec<SoqlValue>),
}

/// A single field comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// Possibly-dotted field path, as written
    pub field_path: String,
    pub op: CompareOp,
    pub value: SoqlValue,
}

/// Boolean expression tree for the WHERE clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhereExpr {
    And(Vec<WhereExpr>),
    Or(Vec<WhereExpr>),
    Not(Box<WhereExpr>),
    Cmp(Comparison),
}

impl WhereExpr {
    /// True if any `OR` node appears anywhere in the tree.
    pub fn contains_or(&self) -> bool {
        match self {
            WhereExpr::Or(_) => true,
            WhereExpr::And(children) => children.iter().any(WhereExpr::contains_or),
            WhereExpr::Not(inner) => inner.contains_or(),
            WhereExpr::Cmp(_) => false,
        }
    }

    /// Iterate all leaf comparisons in the tree.
    pub fn comparisons(&self) -> Vec<&Comparison> {
        let mut out = Vec::new();
        self.collect_comparisons(&mut out);
        out
    }

    fn collect_comparisons<'a>(&'a self, out: &mut Vec<&'a Comparison>) {
        match self {
            WhereExpr::And(children) | WhereExpr::Or(children) => {
                for child in children {
                    child.collect_comparisons(out);
                }
            }
            WhereExpr::Not(inner) => inner.collect_comparisons(out),
            WhereExpr::Cmp(cmp) => out.push(cmp),
        }
    }
}

/// An aggregate call in the select list, e.g. `COUNT()` or `SUM(Amount)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateCall {
    /// Upper-cased function name (`COUNT`, `SUM`, ...)
    pub function: String,
    /// Argument field path; `None` for bare `COUNT()`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argument: Option<String>,
    /// Optional result alias
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// A dot-path traversal to a parent object, e.g. `Account.Owner.Name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentLookup {
    /// Relationship segments, excluding the final field (`["Account",
    /// "Owner"]`)
    pub path: Vec<String>,
    /// The field selected on the final target object (`Name`)
    pub target_field: String,
    /// The path exactly as written
    pub raw: String,
}

/// A child relationship subquery in the select list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subquery {
    /// The child relationship name in the inner FROM
    pub relationship_name: String,
    /// Fields selected inside the subquery
    pub fields: Vec<String>,
}

/// One ORDER BY term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field_path: String,
    pub descending: bool,
}

/// The immutable parse result for one candidate query string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedQueryAst {
    /// Object named in the outer FROM
    pub main_object: String,
    /// All plain (non-aggregate) select items, dotted paths included
    pub fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aggregates: Vec<AggregateCall>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<WhereExpr>,
    /// Dot-path select items, pre-split for relationship validation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_lookups: Vec<ParentLookup>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subqueries: Vec<Subquery>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

impl ParsedQueryAst {
    /// True if the query uses any aggregate function (including `COUNT()`).
    pub fn has_aggregates(&self) -> bool {
        !self.aggregates.is_empty()
    }

    /// All comparisons across the WHERE tree, or empty.
    pub fn where_comparisons(&self) -> Vec<&Comparison> {
        self.where_clause
            .as_ref()
            .map(|w| w.comparisons())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmp(path: &str, op: CompareOp) -> WhereExpr {
        WhereExpr::Cmp(Comparison {
            field_path: path.to_string(),
            op,
            value: SoqlValue::Str("x".to_string()),
        })
    }

    #[test]
    fn test_contains_or_nested() {
        let tree = WhereExpr::And(vec![
            cmp("Name", CompareOp::Eq),
            WhereExpr::Not(Box::new(WhereExpr::Or(vec![
                cmp("StageName", CompareOp::Eq),
                cmp("Amount", CompareOp::Gt),
            ]))),
        ]);
        assert!(tree.contains_or());

        let flat = WhereExpr::And(vec![cmp("Name", CompareOp::Eq)]);
        assert!(!flat.contains_or());
    }

    #[test]
    fn test_comparisons_collects_all_leaves() {
        let tree = WhereExpr::Or(vec![
            cmp("A", CompareOp::Eq),
            WhereExpr::And(vec![cmp("B", CompareOp::Like), cmp("C", CompareOp::Neq)]),
        ]);
        let leaves = tree.comparisons();
        assert_eq!(leaves.len(), 3);
        assert!(leaves.iter().any(|c| c.op.is_inequality()));
    }
}
