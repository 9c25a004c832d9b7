//! Predicate construction from a [`CriteriaSet`].
//!
//! A predicate is a flat list of `(attribute, comparison)` clauses that must
//! all hold. It can be rendered onto a `sqlx` query builder, where
//! relationship attributes become LEFT JOINs against the related table, or
//! evaluated directly against rows held in memory.

use crate::core::criteria::{CriteriaSet, FilterSpec, FilterValue};
use crate::core::schema::AttributeDef;
use sqlx::{Postgres, QueryBuilder};
use std::cmp::Ordering;

/// A single leaf comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    Equals(FilterValue),
    NotEquals(FilterValue),
    In(Vec<FilterValue>),
    NotIn(Vec<FilterValue>),
    Specified(bool),
    GreaterThan(FilterValue),
    GreaterOrEqual(FilterValue),
    LessThan(FilterValue),
    LessOrEqual(FilterValue),
    Contains(String),
    DoesNotContain(String),
}

impl Comparison {
    /// Evaluate against an attribute value with SQL NULL semantics:
    /// only `Specified` can be true for a missing value.
    pub fn evaluate(&self, value: Option<&FilterValue>) -> bool {
        match self {
            Comparison::Specified(specified) => value.is_some() == *specified,
            Comparison::In(values) if values.is_empty() => false,
            Comparison::NotIn(values) if values.is_empty() => true,
            _ => match value {
                Some(value) => self.evaluate_present(value),
                None => false,
            },
        }
    }

    fn evaluate_present(&self, value: &FilterValue) -> bool {
        let ordering = |other: &FilterValue| value.compare(other);
        let is_equal = |other: &FilterValue| ordering(other) == Some(Ordering::Equal);

        match self {
            Comparison::Equals(v) => is_equal(v),
            Comparison::NotEquals(v) => !is_equal(v),
            Comparison::In(values) => values.iter().any(is_equal),
            Comparison::NotIn(values) => !values.iter().any(is_equal),
            Comparison::Specified(specified) => *specified,
            Comparison::GreaterThan(v) => ordering(v) == Some(Ordering::Greater),
            Comparison::GreaterOrEqual(v) => {
                matches!(ordering(v), Some(Ordering::Greater | Ordering::Equal))
            }
            Comparison::LessThan(v) => ordering(v) == Some(Ordering::Less),
            Comparison::LessOrEqual(v) => {
                matches!(ordering(v), Some(Ordering::Less | Ordering::Equal))
            }
            Comparison::Contains(needle) => value
                .as_text()
                .is_some_and(|text| contains_ignore_case(text, needle)),
            Comparison::DoesNotContain(needle) => value
                .as_text()
                .is_some_and(|text| !contains_ignore_case(text, needle)),
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_uppercase().contains(&needle.to_uppercase())
}

/// One attribute constrained by one comparison
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub attribute: &'static AttributeDef,
    pub comparison: Comparison,
}

/// Anything that exposes attribute values by name, for in-memory evaluation.
///
/// Relationship attributes (`senderId`) report the related entity's id, or
/// `None` when the relation is absent, which is what the LEFT JOIN yields.
pub trait Row {
    fn attribute(&self, name: &str) -> Option<FilterValue>;
}

/// Conjunction of clauses over one entity table
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    table: &'static str,
    clauses: Vec<Clause>,
}

/// Fold a criteria set into a single predicate.
///
/// Clauses are emitted in attribute-name order, and within an attribute in
/// the fixed order of [`FilterSpec`]'s fields, so equal inputs produce equal
/// predicates.
pub fn build(criteria: &CriteriaSet) -> Predicate {
    let mut clauses = Vec::new();

    for (attribute, spec) in criteria.iter() {
        for comparison in comparisons(spec) {
            clauses.push(Clause {
                attribute,
                comparison,
            });
        }
    }

    Predicate {
        table: criteria.schema().table,
        clauses,
    }
}

fn comparisons(spec: &FilterSpec) -> Vec<Comparison> {
    let mut out = Vec::new();

    if let Some(v) = &spec.equals {
        out.push(Comparison::Equals(v.clone()));
    }
    if let Some(v) = &spec.not_equals {
        out.push(Comparison::NotEquals(v.clone()));
    }
    if let Some(values) = &spec.in_values {
        out.push(Comparison::In(values.clone()));
    }
    if let Some(values) = &spec.not_in {
        out.push(Comparison::NotIn(values.clone()));
    }
    if let Some(specified) = spec.specified {
        out.push(Comparison::Specified(specified));
    }
    if let Some(v) = &spec.greater_than {
        out.push(Comparison::GreaterThan(v.clone()));
    }
    if let Some(v) = &spec.greater_or_equal {
        out.push(Comparison::GreaterOrEqual(v.clone()));
    }
    if let Some(v) = &spec.less_than {
        out.push(Comparison::LessThan(v.clone()));
    }
    if let Some(v) = &spec.less_or_equal {
        out.push(Comparison::LessOrEqual(v.clone()));
    }
    if let Some(needle) = &spec.contains {
        out.push(Comparison::Contains(needle.clone()));
    }
    if let Some(needle) = &spec.does_not_contain {
        out.push(Comparison::DoesNotContain(needle.clone()));
    }

    out
}

impl Predicate {
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_tautology(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches<R: Row + ?Sized>(&self, row: &R) -> bool {
        self.clauses.iter().all(|clause| {
            let value = row.attribute(clause.attribute.name);
            clause.comparison.evaluate(value.as_ref())
        })
    }

    /// Relationship attributes that need a join, one per alias
    pub fn joins(&self) -> Vec<&'static AttributeDef> {
        let mut joined: Vec<&'static AttributeDef> = Vec::new();
        for clause in &self.clauses {
            if let Some(relation) = clause.attribute.relation {
                let seen = joined
                    .iter()
                    .any(|a| a.relation.is_some_and(|r| r.alias == relation.alias));
                if !seen {
                    joined.push(clause.attribute);
                }
            }
        }
        joined
    }

    /// Append ` LEFT JOIN ...` for each filtered relationship
    pub fn push_joins(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        for attribute in self.joins() {
            if let Some(relation) = attribute.relation {
                qb.push(format!(
                    " LEFT JOIN {table} AS {alias} ON {alias}.{target} = {base}.{column}",
                    table = relation.table,
                    alias = relation.alias,
                    target = relation.target_column,
                    base = self.table,
                    column = attribute.column,
                ));
            }
        }
    }

    /// Append ` WHERE ...` with every value bound as a parameter.
    /// Nothing is appended for a tautology.
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        for (i, clause) in self.clauses.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            self.push_clause(qb, clause);
        }
    }

    fn push_clause(&self, qb: &mut QueryBuilder<'_, Postgres>, clause: &Clause) {
        let column = self.column_expr(clause.attribute);

        match &clause.comparison {
            Comparison::Equals(v) => {
                qb.push(format!("{column} = "));
                push_value(qb, v);
            }
            Comparison::NotEquals(v) => {
                qb.push(format!("{column} <> "));
                push_value(qb, v);
            }
            Comparison::In(values) if values.is_empty() => {
                qb.push("FALSE");
            }
            Comparison::NotIn(values) if values.is_empty() => {
                qb.push("TRUE");
            }
            Comparison::In(values) => {
                qb.push(format!("{column} IN ("));
                push_list(qb, values);
                qb.push(")");
            }
            Comparison::NotIn(values) => {
                qb.push(format!("{column} NOT IN ("));
                push_list(qb, values);
                qb.push(")");
            }
            Comparison::Specified(true) => {
                qb.push(format!("{column} IS NOT NULL"));
            }
            Comparison::Specified(false) => {
                qb.push(format!("{column} IS NULL"));
            }
            Comparison::GreaterThan(v) => {
                qb.push(format!("{column} > "));
                push_value(qb, v);
            }
            Comparison::GreaterOrEqual(v) => {
                qb.push(format!("{column} >= "));
                push_value(qb, v);
            }
            Comparison::LessThan(v) => {
                qb.push(format!("{column} < "));
                push_value(qb, v);
            }
            Comparison::LessOrEqual(v) => {
                qb.push(format!("{column} <= "));
                push_value(qb, v);
            }
            Comparison::Contains(needle) => {
                qb.push(format!("UPPER({column}) LIKE UPPER("));
                qb.push_bind(like_pattern(needle));
                qb.push(")");
            }
            Comparison::DoesNotContain(needle) => {
                qb.push(format!("UPPER({column}) NOT LIKE UPPER("));
                qb.push_bind(like_pattern(needle));
                qb.push(")");
            }
        }
    }

    fn column_expr(&self, attribute: &AttributeDef) -> String {
        match attribute.relation {
            Some(relation) => format!("{}.{}", relation.alias, relation.target_column),
            None => format!("{}.{}", self.table, attribute.column),
        }
    }
}

/// Bind a filter value as the next query parameter
pub fn push_value(qb: &mut QueryBuilder<'_, Postgres>, value: &FilterValue) {
    match value {
        FilterValue::Long(v) => qb.push_bind(*v),
        FilterValue::Double(v) => qb.push_bind(*v),
        FilterValue::Text(v) => qb.push_bind(v.clone()),
        FilterValue::Bool(v) => qb.push_bind(*v),
        FilterValue::Timestamp(v) => qb.push_bind(*v),
    };
}

fn push_list(qb: &mut QueryBuilder<'_, Postgres>, values: &[FilterValue]) {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        push_value(qb, value);
    }
}

/// `%needle%` with LIKE wildcards in the needle escaped
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{EntitySchema, ValueKind};
    use std::collections::HashMap;

    static MESSAGE: EntitySchema = EntitySchema {
        entity: "directMessage",
        table: "direct_message",
        attributes: &[
            AttributeDef::column("id", "id", ValueKind::Long),
            AttributeDef::column("message", "message", ValueKind::Text),
            AttributeDef::joined("senderId", "sender_id", "profile", "sender"),
            AttributeDef::joined("recipientId", "recipient_id", "profile", "recipient"),
        ],
    };

    struct TestRow(HashMap<&'static str, FilterValue>);

    impl Row for TestRow {
        fn attribute(&self, name: &str) -> Option<FilterValue> {
            self.0.get(name).cloned()
        }
    }

    fn row(id: i64, message: Option<&str>, sender: Option<i64>) -> TestRow {
        let mut values = HashMap::new();
        values.insert("id", FilterValue::Long(id));
        if let Some(m) = message {
            values.insert("message", FilterValue::Text(m.to_string()));
        }
        if let Some(s) = sender {
            values.insert("senderId", FilterValue::Long(s));
        }
        TestRow(values)
    }

    fn sql(predicate: &Predicate) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT direct_message.* FROM direct_message");
        predicate.push_joins(&mut qb);
        predicate.push_where(&mut qb);
        qb.sql().to_string()
    }

    #[test]
    fn test_empty_criteria_is_tautology() {
        let predicate = build(&CriteriaSet::new(&MESSAGE));
        assert!(predicate.is_tautology());
        assert!(predicate.matches(&row(1, None, None)));
        assert_eq!(sql(&predicate), "SELECT direct_message.* FROM direct_message");
    }

    #[test]
    fn test_relationship_filter_renders_left_join() {
        let criteria = CriteriaSet::new(&MESSAGE)
            .with("senderId", FilterSpec::new().equals(7_i64))
            .unwrap();
        let predicate = build(&criteria);
        assert_eq!(
            sql(&predicate),
            "SELECT direct_message.* FROM direct_message \
             LEFT JOIN profile AS sender ON sender.id = direct_message.sender_id \
             WHERE sender.id = $1"
        );
    }

    #[test]
    fn test_join_emitted_once_per_relation() {
        let criteria = CriteriaSet::new(&MESSAGE)
            .with(
                "senderId",
                FilterSpec::new().greater_than(1_i64).less_than(9_i64),
            )
            .unwrap();
        let predicate = build(&criteria);
        assert_eq!(predicate.joins().len(), 1);
        assert!(sql(&predicate).ends_with("WHERE sender.id > $1 AND sender.id < $2"));
    }

    #[test]
    fn test_no_join_without_relationship_filter() {
        let criteria = CriteriaSet::new(&MESSAGE)
            .with("message", FilterSpec::<&str>::new().specified(true))
            .unwrap();
        let rendered = sql(&build(&criteria));
        assert!(!rendered.contains("JOIN"));
        assert!(rendered.ends_with("WHERE direct_message.message IS NOT NULL"));
    }

    #[test]
    fn test_in_list_binds_each_value() {
        let criteria = CriteriaSet::new(&MESSAGE)
            .with("id", FilterSpec::new().in_values([1_i64, 2, 3]))
            .unwrap();
        assert!(sql(&build(&criteria)).ends_with("WHERE direct_message.id IN ($1, $2, $3)"));
    }

    #[test]
    fn test_empty_in_matches_nothing() {
        let criteria = CriteriaSet::new(&MESSAGE)
            .with("id", FilterSpec::new().in_values(Vec::<i64>::new()))
            .unwrap();
        let predicate = build(&criteria);
        assert!(!predicate.matches(&row(1, None, None)));
        assert!(sql(&predicate).ends_with("WHERE FALSE"));
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let criteria = CriteriaSet::new(&MESSAGE)
            .with("message", FilterSpec::<&str>::new().contains("HELLO"))
            .unwrap();
        let predicate = build(&criteria);
        assert!(predicate.matches(&row(1, Some("well hello there"), None)));
        assert!(!predicate.matches(&row(2, Some("goodbye"), None)));
        assert!(!predicate.matches(&row(3, None, None)));
        assert!(sql(&predicate).ends_with("WHERE UPPER(direct_message.message) LIKE UPPER($1)"));
    }

    #[test]
    fn test_null_fails_every_comparison_but_specified() {
        let missing = None;
        let one = FilterValue::Long(1);
        assert!(!Comparison::Equals(one.clone()).evaluate(missing));
        assert!(!Comparison::NotEquals(one.clone()).evaluate(missing));
        assert!(!Comparison::NotIn(vec![one.clone()]).evaluate(missing));
        assert!(!Comparison::LessThan(one).evaluate(missing));
        assert!(Comparison::Specified(false).evaluate(missing));
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_build_is_deterministic() {
        let make = || {
            CriteriaSet::new(&MESSAGE)
                .with("recipientId", FilterSpec::new().equals(2_i64))
                .unwrap()
                .with("id", FilterSpec::new().not_equals(5_i64))
                .unwrap()
        };
        assert_eq!(build(&make()), build(&make()));
        assert_eq!(sql(&build(&make())), sql(&build(&make())));
    }
}
