use std::fmt;

/// Storage type of a filterable attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Long,
    Double,
    Text,
    Bool,
    Timestamp,
}

impl ValueKind {
    /// Whether range comparisons (`greaterThan`, `lessOrEqual`, ...) apply
    #[inline]
    pub fn is_ordered(self) -> bool {
        matches!(self, ValueKind::Long | ValueKind::Double | ValueKind::Timestamp)
    }

    /// Whether substring comparisons (`contains`, `doesNotContain`) apply
    #[inline]
    pub fn is_text(self) -> bool {
        matches!(self, ValueKind::Text)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Long => "long",
            ValueKind::Double => "double",
            ValueKind::Text => "string",
            ValueKind::Bool => "boolean",
            ValueKind::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

/// Many-to-one relation followed through a LEFT JOIN
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    /// Table of the related entity
    pub table: &'static str,
    /// Alias the related table is joined as
    pub alias: &'static str,
    /// Column of the related table that is compared (its id)
    pub target_column: &'static str,
}

/// One filterable attribute of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDef {
    /// Name used in query strings and criteria (`senderId`)
    pub name: &'static str,
    /// Column on the entity's own table (`sender_id`)
    pub column: &'static str,
    pub kind: ValueKind,
    pub relation: Option<Relation>,
}

impl AttributeDef {
    pub const fn column(name: &'static str, column: &'static str, kind: ValueKind) -> Self {
        Self {
            name,
            column,
            kind,
            relation: None,
        }
    }

    pub const fn joined(
        name: &'static str,
        column: &'static str,
        table: &'static str,
        alias: &'static str,
    ) -> Self {
        Self {
            name,
            column,
            kind: ValueKind::Long,
            relation: Some(Relation {
                table,
                alias,
                target_column: "id",
            }),
        }
    }
}

/// Static description of an entity's table and filterable attributes
#[derive(Debug)]
pub struct EntitySchema {
    /// Entity name used in error codes (`directMessage`)
    pub entity: &'static str,
    pub table: &'static str,
    pub attributes: &'static [AttributeDef],
}

impl EntitySchema {
    pub fn attribute(&self, name: &str) -> Option<&'static AttributeDef> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static SCHEMA: EntitySchema = EntitySchema {
        entity: "thing",
        table: "thing",
        attributes: &[
            AttributeDef::column("id", "id", ValueKind::Long),
            AttributeDef::joined("ownerId", "owner_id", "profile", "owner"),
        ],
    };

    #[test]
    fn test_attribute_lookup() {
        assert_eq!(SCHEMA.attribute("id").map(|a| a.column), Some("id"));
        let owner = SCHEMA.attribute("ownerId").unwrap();
        assert_eq!(owner.relation.unwrap().alias, "owner");
        assert!(SCHEMA.attribute("missing").is_none());
    }

    #[test]
    fn test_kind_capabilities() {
        assert!(ValueKind::Timestamp.is_ordered());
        assert!(!ValueKind::Text.is_ordered());
        assert!(!ValueKind::Bool.is_ordered());
        assert!(ValueKind::Text.is_text());
    }
}
