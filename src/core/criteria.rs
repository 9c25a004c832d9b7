//! Typed filter values, per-attribute filter specs and the criteria set
//! that groups them for one entity.

use crate::core::schema::{AttributeDef, EntitySchema, ValueKind};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while assembling a criteria set
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CriteriaError {
    #[error("Unknown attribute '{attribute}' for {entity}")]
    UnknownAttribute {
        entity: &'static str,
        attribute: String,
    },

    #[error("Attribute '{attribute}' expects {expected} values, got {found}")]
    KindMismatch {
        attribute: &'static str,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("Operator '{operator}' is not supported on {kind} attribute '{attribute}'")]
    UnsupportedOperator {
        attribute: &'static str,
        operator: &'static str,
        kind: ValueKind,
    },

    #[error("Attribute '{0}' already has a filter")]
    DuplicateAttribute(&'static str),
}

/// A typed value compared against an attribute
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    Long(i64),
    Double(f64),
    Text(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl FilterValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            FilterValue::Long(_) => ValueKind::Long,
            FilterValue::Double(_) => ValueKind::Double,
            FilterValue::Text(_) => ValueKind::Text,
            FilterValue::Bool(_) => ValueKind::Bool,
            FilterValue::Timestamp(_) => ValueKind::Timestamp,
        }
    }

    /// Order two values of the same kind. Values of different kinds,
    /// and NaN doubles, are incomparable.
    pub fn compare(&self, other: &FilterValue) -> Option<Ordering> {
        match (self, other) {
            (FilterValue::Long(a), FilterValue::Long(b)) => Some(a.cmp(b)),
            (FilterValue::Double(a), FilterValue::Double(b)) => a.partial_cmp(b),
            (FilterValue::Text(a), FilterValue::Text(b)) => Some(a.cmp(b)),
            (FilterValue::Bool(a), FilterValue::Bool(b)) => Some(a.cmp(b)),
            (FilterValue::Timestamp(a), FilterValue::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FilterValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Long(value)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Double(value)
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(value: DateTime<Utc>) -> Self {
        FilterValue::Timestamp(value)
    }
}

/// The optional comparisons a client may supply for one attribute.
///
/// Every field that is set must hold for a row to match. A spec with no
/// field set places no constraint on the attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec<V = FilterValue> {
    pub equals: Option<V>,
    pub not_equals: Option<V>,
    pub in_values: Option<Vec<V>>,
    pub not_in: Option<Vec<V>>,
    /// `true`: attribute must be non-null, `false`: must be null
    pub specified: Option<bool>,
    pub greater_than: Option<V>,
    pub greater_or_equal: Option<V>,
    pub less_than: Option<V>,
    pub less_or_equal: Option<V>,
    pub contains: Option<String>,
    pub does_not_contain: Option<String>,
}

impl<V> Default for FilterSpec<V> {
    fn default() -> Self {
        Self {
            equals: None,
            not_equals: None,
            in_values: None,
            not_in: None,
            specified: None,
            greater_than: None,
            greater_or_equal: None,
            less_than: None,
            less_or_equal: None,
            contains: None,
            does_not_contain: None,
        }
    }
}

impl<V> FilterSpec<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn equals(mut self, value: V) -> Self {
        self.equals = Some(value);
        self
    }

    pub fn not_equals(mut self, value: V) -> Self {
        self.not_equals = Some(value);
        self
    }

    pub fn in_values(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.in_values = Some(values.into_iter().collect());
        self
    }

    pub fn not_in(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.not_in = Some(values.into_iter().collect());
        self
    }

    pub fn specified(mut self, specified: bool) -> Self {
        self.specified = Some(specified);
        self
    }

    pub fn greater_than(mut self, value: V) -> Self {
        self.greater_than = Some(value);
        self
    }

    pub fn greater_or_equal(mut self, value: V) -> Self {
        self.greater_or_equal = Some(value);
        self
    }

    pub fn less_than(mut self, value: V) -> Self {
        self.less_than = Some(value);
        self
    }

    pub fn less_or_equal(mut self, value: V) -> Self {
        self.less_or_equal = Some(value);
        self
    }

    pub fn contains(mut self, needle: impl Into<String>) -> Self {
        self.contains = Some(needle.into());
        self
    }

    pub fn does_not_contain(mut self, needle: impl Into<String>) -> Self {
        self.does_not_contain = Some(needle.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.equals.is_none()
            && self.not_equals.is_none()
            && self.in_values.is_none()
            && self.not_in.is_none()
            && self.specified.is_none()
            && self.greater_than.is_none()
            && self.greater_or_equal.is_none()
            && self.less_than.is_none()
            && self.less_or_equal.is_none()
            && self.contains.is_none()
            && self.does_not_contain.is_none()
    }

    /// Convert every value with `f`, keeping the structure
    pub fn map_values<U>(self, f: impl Fn(V) -> U) -> FilterSpec<U> {
        let map_all = |values: Vec<V>| -> Vec<U> { values.into_iter().map(&f).collect() };
        FilterSpec {
            equals: self.equals.map(&f),
            not_equals: self.not_equals.map(&f),
            in_values: self.in_values.map(map_all),
            not_in: self.not_in.map(map_all),
            specified: self.specified,
            greater_than: self.greater_than.map(&f),
            greater_or_equal: self.greater_or_equal.map(&f),
            less_than: self.less_than.map(&f),
            less_or_equal: self.less_or_equal.map(&f),
            contains: self.contains,
            does_not_contain: self.does_not_contain,
        }
    }
}

impl FilterSpec<FilterValue> {
    /// Check that every value matches the attribute's kind and that range
    /// and substring operators are only used where the kind allows them.
    fn check(&self, attribute: &'static AttributeDef) -> Result<(), CriteriaError> {
        let kind = attribute.kind;
        let unsupported = |operator: &'static str| CriteriaError::UnsupportedOperator {
            attribute: attribute.name,
            operator,
            kind,
        };

        if !kind.is_ordered() {
            let ranges = [
                ("greaterThan", &self.greater_than),
                ("greaterOrEqual", &self.greater_or_equal),
                ("lessThan", &self.less_than),
                ("lessOrEqual", &self.less_or_equal),
            ];
            if let Some((operator, _)) = ranges.iter().find(|(_, v)| v.is_some()) {
                return Err(unsupported(*operator));
            }
        }

        if !kind.is_text() {
            if self.contains.is_some() {
                return Err(unsupported("contains"));
            }
            if self.does_not_contain.is_some() {
                return Err(unsupported("doesNotContain"));
            }
        }

        let singles = [
            &self.equals,
            &self.not_equals,
            &self.greater_than,
            &self.greater_or_equal,
            &self.less_than,
            &self.less_or_equal,
        ];
        let lists = [&self.in_values, &self.not_in];
        let values = singles
            .into_iter()
            .flatten()
            .chain(lists.into_iter().flatten().flatten());

        for value in values {
            if value.kind() != kind {
                return Err(CriteriaError::KindMismatch {
                    attribute: attribute.name,
                    expected: kind,
                    found: value.kind(),
                });
            }
        }

        Ok(())
    }
}

/// All filters of one request against one entity, keyed by attribute.
///
/// Filters are only accepted for attributes the entity's schema declares
/// and only with values of the declared kind, so a constructed set always
/// describes a well-typed predicate.
#[derive(Debug, Clone)]
pub struct CriteriaSet {
    schema: &'static EntitySchema,
    filters: BTreeMap<&'static str, (&'static AttributeDef, FilterSpec)>,
}

impl CriteriaSet {
    pub fn new(schema: &'static EntitySchema) -> Self {
        Self {
            schema,
            filters: BTreeMap::new(),
        }
    }

    /// Add a filter for `attribute`, converting its values into
    /// [`FilterValue`]s
    pub fn with<V: Into<FilterValue>>(
        mut self,
        attribute: &str,
        spec: FilterSpec<V>,
    ) -> Result<Self, CriteriaError> {
        self.insert(attribute, spec.map_values(Into::into))?;
        Ok(self)
    }

    pub fn insert(&mut self, attribute: &str, spec: FilterSpec) -> Result<(), CriteriaError> {
        let def = self
            .schema
            .attribute(attribute)
            .ok_or_else(|| CriteriaError::UnknownAttribute {
                entity: self.schema.entity,
                attribute: attribute.to_string(),
            })?;

        if self.filters.contains_key(def.name) {
            return Err(CriteriaError::DuplicateAttribute(def.name));
        }

        spec.check(def)?;

        if !spec.is_empty() {
            self.filters.insert(def.name, (def, spec));
        }
        Ok(())
    }

    pub fn schema(&self) -> &'static EntitySchema {
        self.schema
    }

    pub fn get(&self, attribute: &str) -> Option<&FilterSpec> {
        self.filters.get(attribute).map(|(_, spec)| spec)
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Filters in attribute-name order
    pub fn iter(&self) -> impl Iterator<Item = (&'static AttributeDef, &FilterSpec)> + '_ {
        self.filters.values().map(|(def, spec)| (*def, spec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::AttributeDef;

    static MESSAGE: EntitySchema = EntitySchema {
        entity: "directMessage",
        table: "direct_message",
        attributes: &[
            AttributeDef::column("id", "id", ValueKind::Long),
            AttributeDef::column("message", "message", ValueKind::Text),
            AttributeDef::column("read", "read", ValueKind::Bool),
            AttributeDef::joined("senderId", "sender_id", "profile", "sender"),
        ],
    };

    #[test]
    fn test_empty_spec_adds_nothing() {
        let criteria = CriteriaSet::new(&MESSAGE)
            .with("id", FilterSpec::<i64>::new())
            .unwrap();
        assert!(criteria.is_empty());
    }

    #[test]
    fn test_unknown_attribute_rejected() {
        let err = CriteriaSet::new(&MESSAGE)
            .with("nope", FilterSpec::new().equals(1_i64))
            .unwrap_err();
        assert!(matches!(err, CriteriaError::UnknownAttribute { .. }));
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let err = CriteriaSet::new(&MESSAGE)
            .with("id", FilterSpec::new().equals("five"))
            .unwrap_err();
        assert_eq!(
            err,
            CriteriaError::KindMismatch {
                attribute: "id",
                expected: ValueKind::Long,
                found: ValueKind::Text,
            }
        );
    }

    #[test]
    fn test_kind_mismatch_inside_list_rejected() {
        let err = CriteriaSet::new(&MESSAGE)
            .with(
                "id",
                FilterSpec::new().in_values([FilterValue::Long(1), FilterValue::Bool(true)]),
            )
            .unwrap_err();
        assert!(matches!(err, CriteriaError::KindMismatch { .. }));
    }

    #[test]
    fn test_range_on_text_rejected() {
        let err = CriteriaSet::new(&MESSAGE)
            .with("message", FilterSpec::new().greater_than("a"))
            .unwrap_err();
        assert!(matches!(
            err,
            CriteriaError::UnsupportedOperator { operator: "greaterThan", .. }
        ));
    }

    #[test]
    fn test_contains_on_bool_rejected() {
        let err = CriteriaSet::new(&MESSAGE)
            .with("read", FilterSpec::<bool>::new().contains("x"))
            .unwrap_err();
        assert!(matches!(
            err,
            CriteriaError::UnsupportedOperator { operator: "contains", .. }
        ));
    }

    #[test]
    fn test_duplicate_attribute_rejected() {
        let mut criteria = CriteriaSet::new(&MESSAGE);
        criteria
            .insert("id", FilterSpec::new().equals(FilterValue::Long(1)))
            .unwrap();
        let err = criteria
            .insert("id", FilterSpec::new().equals(FilterValue::Long(2)))
            .unwrap_err();
        assert_eq!(err, CriteriaError::DuplicateAttribute("id"));
    }

    #[test]
    fn test_iteration_is_ordered_by_name() {
        let criteria = CriteriaSet::new(&MESSAGE)
            .with("senderId", FilterSpec::new().equals(3_i64))
            .unwrap()
            .with("id", FilterSpec::new().greater_than(1_i64))
            .unwrap();
        let names: Vec<_> = criteria.iter().map(|(def, _)| def.name).collect();
        assert_eq!(names, vec!["id", "senderId"]);
    }

    #[test]
    fn test_compare_same_kind_only() {
        assert_eq!(
            FilterValue::Long(1).compare(&FilterValue::Long(2)),
            Some(Ordering::Less)
        );
        assert_eq!(FilterValue::Long(1).compare(&FilterValue::Double(1.0)), None);
        assert_eq!(
            FilterValue::Double(f64::NAN).compare(&FilterValue::Double(1.0)),
            None
        );
    }
}
