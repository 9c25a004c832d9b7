//! Parsing of `attr.op=value` query parameters into a typed [`CriteriaSet`],
//! plus the `page`/`size`/`sort` pagination parameters.
//!
//! ```text
//! /api/direct-messages?senderId.equals=3&createdDate.greaterThan=2024-01-01T00:00:00Z
//! /api/profiles?displayName.contains=ann&locationId.specified=true&sort=createdDate,desc
//! ```

use crate::core::criteria::{CriteriaError, CriteriaSet, FilterSpec, FilterValue};
use crate::core::schema::{AttributeDef, EntitySchema, ValueKind};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Query keys that carry pagination rather than criteria
const RESERVED_KEYS: &[&str] = &["page", "size", "sort"];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    #[error(transparent)]
    Criteria(#[from] CriteriaError),

    #[error("Unknown filter operator '{operator}' on '{attribute}'")]
    UnknownOperator { attribute: String, operator: String },

    #[error("Filter '{0}' given more than once")]
    Repeated(String),

    #[error("Invalid {kind} value '{value}' for '{parameter}'")]
    InvalidValue {
        parameter: String,
        value: String,
        kind: ValueKind,
    },

    #[error("Invalid value '{value}' for '{parameter}'")]
    InvalidPage {
        parameter: &'static str,
        value: String,
    },

    #[error("Cannot sort by unknown attribute '{0}'")]
    UnknownSort(String),
}

/// Operators accepted after the attribute name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equals,
    NotEquals,
    In,
    NotIn,
    Specified,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    Contains,
    DoesNotContain,
}

impl Operator {
    pub fn parse(name: &str) -> Option<Self> {
        let op = match name {
            "equals" => Operator::Equals,
            "notEquals" => Operator::NotEquals,
            "in" => Operator::In,
            "notIn" => Operator::NotIn,
            "specified" => Operator::Specified,
            "greaterThan" => Operator::GreaterThan,
            "greaterOrEqual" | "greaterOrEqualThan" | "greaterThanOrEqual" => {
                Operator::GreaterOrEqual
            }
            "lessThan" => Operator::LessThan,
            "lessOrEqual" | "lessOrEqualThan" | "lessThanOrEqual" => Operator::LessOrEqual,
            "contains" => Operator::Contains,
            "doesNotContain" => Operator::DoesNotContain,
            _ => return None,
        };
        Some(op)
    }
}

/// Build the criteria for `schema` from raw query pairs.
///
/// Keys naming attributes the schema does not know are ignored, like
/// `page`, `size` and `sort`.
pub fn parse_criteria(
    schema: &'static EntitySchema,
    pairs: &[(String, String)],
) -> Result<CriteriaSet, ParamError> {
    let mut specs: BTreeMap<&'static str, FilterSpec> = BTreeMap::new();
    let mut seen: HashSet<(&'static str, Operator)> = HashSet::new();

    for (key, raw) in pairs {
        if RESERVED_KEYS.contains(&key.as_str()) {
            continue;
        }

        let Some((name, op_name)) = key.rsplit_once('.') else {
            tracing::debug!("Ignoring query parameter without operator: {}", key);
            continue;
        };

        let Some(attribute) = schema.attribute(name) else {
            tracing::debug!("Ignoring filter on unknown {} attribute: {}", schema.entity, key);
            continue;
        };

        let operator = Operator::parse(op_name).ok_or_else(|| ParamError::UnknownOperator {
            attribute: name.to_string(),
            operator: op_name.to_string(),
        })?;

        if !seen.insert((attribute.name, operator)) {
            return Err(ParamError::Repeated(key.clone()));
        }

        let spec = specs.entry(attribute.name).or_default();
        apply(spec, attribute, operator, key, raw)?;
    }

    let mut criteria = CriteriaSet::new(schema);
    for (name, spec) in specs {
        criteria.insert(name, spec)?;
    }
    Ok(criteria)
}

fn apply(
    spec: &mut FilterSpec,
    attribute: &AttributeDef,
    operator: Operator,
    key: &str,
    raw: &str,
) -> Result<(), ParamError> {
    let kind = attribute.kind;
    let one = || parse_value(kind, key, raw);
    let many = || parse_list(kind, key, raw);

    match operator {
        Operator::Equals => spec.equals = Some(one()?),
        Operator::NotEquals => spec.not_equals = Some(one()?),
        Operator::In => spec.in_values = Some(many()?),
        Operator::NotIn => spec.not_in = Some(many()?),
        Operator::Specified => {
            spec.specified = Some(parse_bool(raw).ok_or_else(|| invalid(key, raw, ValueKind::Bool))?)
        }
        Operator::GreaterThan => spec.greater_than = Some(one()?),
        Operator::GreaterOrEqual => spec.greater_or_equal = Some(one()?),
        Operator::LessThan => spec.less_than = Some(one()?),
        Operator::LessOrEqual => spec.less_or_equal = Some(one()?),
        Operator::Contains => spec.contains = Some(raw.to_string()),
        Operator::DoesNotContain => spec.does_not_contain = Some(raw.to_string()),
    }

    Ok(())
}

fn invalid(key: &str, raw: &str, kind: ValueKind) -> ParamError {
    ParamError::InvalidValue {
        parameter: key.to_string(),
        value: raw.to_string(),
        kind,
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Parse one raw value as `kind`
pub fn parse_value(kind: ValueKind, key: &str, raw: &str) -> Result<FilterValue, ParamError> {
    let trimmed = raw.trim();
    let value = match kind {
        ValueKind::Long => trimmed.parse::<i64>().ok().map(FilterValue::Long),
        ValueKind::Double => trimmed
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(FilterValue::Double),
        ValueKind::Bool => parse_bool(trimmed).map(FilterValue::Bool),
        ValueKind::Text => Some(FilterValue::Text(raw.to_string())),
        ValueKind::Timestamp => parse_timestamp(trimmed).map(FilterValue::Timestamp),
    };
    value.ok_or_else(|| invalid(key, raw, kind))
}

fn parse_list(kind: ValueKind, key: &str, raw: &str) -> Result<Vec<FilterValue>, ParamError> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    raw.split(',').map(|part| parse_value(kind, key, part)).collect()
}

/// RFC 3339 timestamps. A `+` offset decoded from a query string arrives
/// as a space, so that form is accepted too.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(&raw.replace(' ', "+")))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub const fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SortOrder {
    pub attribute: &'static AttributeDef,
    pub direction: Direction,
}

/// Zero-based page request
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
    pub sort: Vec<SortOrder>,
}

impl PageRequest {
    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.size)
    }
}

/// Read `page`, `size` and repeated `sort=attr[,asc|desc]` parameters.
///
/// `size` defaults to `default_size` and is capped at `max_size`.
pub fn parse_page(
    schema: &'static EntitySchema,
    pairs: &[(String, String)],
    default_size: u32,
    max_size: u32,
) -> Result<PageRequest, ParamError> {
    let mut page = 0;
    let mut size = default_size;
    let mut sort = Vec::new();

    for (key, raw) in pairs {
        match key.as_str() {
            "page" => {
                page = raw.trim().parse().map_err(|_| ParamError::InvalidPage {
                    parameter: "page",
                    value: raw.clone(),
                })?;
            }
            "size" => {
                size = raw
                    .trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|s| *s > 0)
                    .ok_or_else(|| ParamError::InvalidPage {
                        parameter: "size",
                        value: raw.clone(),
                    })?;
            }
            "sort" => sort.push(parse_sort(schema, raw)?),
            _ => {}
        }
    }

    Ok(PageRequest {
        page,
        size: size.min(max_size),
        sort,
    })
}

fn parse_sort(schema: &'static EntitySchema, raw: &str) -> Result<SortOrder, ParamError> {
    let (name, direction) = match raw.split_once(',') {
        Some((name, dir)) => {
            let direction = match dir.trim().to_ascii_lowercase().as_str() {
                "asc" => Direction::Asc,
                "desc" => Direction::Desc,
                _ => {
                    return Err(ParamError::InvalidPage {
                        parameter: "sort",
                        value: raw.to_string(),
                    })
                }
            };
            (name.trim(), direction)
        }
        None => (raw.trim(), Direction::Asc),
    };

    let attribute = schema
        .attribute(name)
        .ok_or_else(|| ParamError::UnknownSort(name.to_string()))?;

    Ok(SortOrder {
        attribute,
        direction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    static INVITATION: EntitySchema = EntitySchema {
        entity: "invitation",
        table: "invitation",
        attributes: &[
            AttributeDef::column("id", "id", ValueKind::Long),
            AttributeDef::column("accepted", "accepted", ValueKind::Bool),
            AttributeDef::column("createdDate", "created_date", ValueKind::Timestamp),
            AttributeDef::column("note", "note", ValueKind::Text),
            AttributeDef::joined("sentId", "sent_id", "profile", "sent"),
        ],
    };

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parses_typed_filters() {
        let criteria = parse_criteria(
            &INVITATION,
            &pairs(&[
                ("id.greaterThan", "5"),
                ("id.lessOrEqualThan", "10"),
                ("accepted.equals", "true"),
                ("sentId.in", "1,2"),
                ("createdDate.specified", "false"),
            ]),
        )
        .unwrap();

        let id = criteria.get("id").unwrap();
        assert_eq!(id.greater_than, Some(FilterValue::Long(5)));
        assert_eq!(id.less_or_equal, Some(FilterValue::Long(10)));
        assert_eq!(criteria.get("accepted").unwrap().equals, Some(FilterValue::Bool(true)));
        assert_eq!(
            criteria.get("sentId").unwrap().in_values,
            Some(vec![FilterValue::Long(1), FilterValue::Long(2)])
        );
        assert_eq!(criteria.get("createdDate").unwrap().specified, Some(false));
    }

    #[test]
    fn test_non_numeric_long_is_invalid() {
        let err = parse_criteria(&INVITATION, &pairs(&[("id.equals", "abc")])).unwrap_err();
        assert!(matches!(err, ParamError::InvalidValue { kind: ValueKind::Long, .. }));
    }

    #[test]
    fn test_non_finite_double_is_invalid() {
        for raw in ["NaN", "inf", "-infinity", "1e999"] {
            let err = parse_value(ValueKind::Double, "latitude.equals", raw).unwrap_err();
            assert!(matches!(err, ParamError::InvalidValue { kind: ValueKind::Double, .. }), "{raw}");
        }
        assert_eq!(
            parse_value(ValueKind::Double, "latitude.equals", " -12.5 ").unwrap(),
            FilterValue::Double(-12.5)
        );
    }

    #[test]
    fn test_unknown_operator_is_invalid() {
        let err = parse_criteria(&INVITATION, &pairs(&[("id.like", "1")])).unwrap_err();
        assert!(matches!(err, ParamError::UnknownOperator { .. }));
    }

    #[test]
    fn test_unknown_attribute_and_pagination_ignored() {
        let criteria = parse_criteria(
            &INVITATION,
            &pairs(&[("color.equals", "red"), ("page", "2"), ("sort", "id,desc"), ("cacheBuster", "1")]),
        )
        .unwrap();
        assert!(criteria.is_empty());
    }

    #[test]
    fn test_repeated_operator_rejected() {
        let err = parse_criteria(
            &INVITATION,
            &pairs(&[("id.greaterOrEqual", "1"), ("id.greaterOrEqualThan", "2")]),
        )
        .unwrap_err();
        assert!(matches!(err, ParamError::Repeated(_)));
    }

    #[test]
    fn test_range_on_text_rejected() {
        let err = parse_criteria(&INVITATION, &pairs(&[("note.greaterThan", "a")])).unwrap_err();
        assert!(matches!(err, ParamError::Criteria(CriteriaError::UnsupportedOperator { .. })));
    }

    #[test]
    fn test_timestamp_with_decoded_plus() {
        let value = parse_value(ValueKind::Timestamp, "createdDate.equals", "2024-05-01T10:00:00 02:00").unwrap();
        let expected = DateTime::parse_from_rfc3339("2024-05-01T08:00:00Z").unwrap().with_timezone(&Utc);
        assert_eq!(value, FilterValue::Timestamp(expected));
    }

    #[test]
    fn test_empty_in_list() {
        let criteria = parse_criteria(&INVITATION, &pairs(&[("id.in", "")])).unwrap();
        assert_eq!(criteria.get("id").unwrap().in_values, Some(vec![]));
    }

    #[test]
    fn test_page_defaults_and_cap() {
        let page = parse_page(&INVITATION, &[], 20, 100).unwrap();
        assert_eq!(page, PageRequest { page: 0, size: 20, sort: vec![] });

        let page = parse_page(&INVITATION, &pairs(&[("page", "3"), ("size", "500")]), 20, 100).unwrap();
        assert_eq!(page.size, 100);
        assert_eq!(page.offset(), 300);
    }

    #[test]
    fn test_sort_parsing() {
        let page = parse_page(
            &INVITATION,
            &pairs(&[("sort", "createdDate,desc"), ("sort", "id")]),
            20,
            100,
        )
        .unwrap();
        assert_eq!(page.sort.len(), 2);
        assert_eq!(page.sort[0].attribute.column, "created_date");
        assert_eq!(page.sort[0].direction, Direction::Desc);
        assert_eq!(page.sort[1].direction, Direction::Asc);

        let err = parse_page(&INVITATION, &pairs(&[("sort", "nope,asc")]), 20, 100).unwrap_err();
        assert_eq!(err, ParamError::UnknownSort("nope".to_string()));
    }

    #[test]
    fn test_zero_size_rejected() {
        let err = parse_page(&INVITATION, &pairs(&[("size", "0")]), 20, 100).unwrap_err();
        assert!(matches!(err, ParamError::InvalidPage { parameter: "size", .. }));
    }
}
