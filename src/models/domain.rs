use crate::core::{
    AttributeDef, Connection, EntitySchema, FilterValue, GeoPoint, Located, Row, ValueKind,
};
use crate::models::entity::{ColumnValue, Entity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};
use sqlx::postgres::PgRow;
use sqlx::Row as _;
use validator::Validate;

pub static PROFILE_SCHEMA: EntitySchema = EntitySchema {
    entity: "profile",
    table: "profile",
    attributes: &[
        AttributeDef::column("id", "id", ValueKind::Long),
        AttributeDef::column("displayName", "display_name", ValueKind::Text),
        AttributeDef::column("firstName", "first_name", ValueKind::Text),
        AttributeDef::column("lastName", "last_name", ValueKind::Text),
        AttributeDef::column("about", "about", ValueKind::Text),
        AttributeDef::column("createdDate", "created_date", ValueKind::Timestamp),
        AttributeDef::column("userId", "user_id", ValueKind::Long),
        AttributeDef::joined("genderId", "gender_id", "gender", "gender"),
        AttributeDef::joined("locationId", "location_id", "location", "location"),
    ],
};

pub static LOCATION_SCHEMA: EntitySchema = EntitySchema {
    entity: "location",
    table: "location",
    attributes: &[
        AttributeDef::column("id", "id", ValueKind::Long),
        AttributeDef::column("latitude", "latitude", ValueKind::Double),
        AttributeDef::column("longitude", "longitude", ValueKind::Double),
        AttributeDef::column("address", "address", ValueKind::Text),
        AttributeDef::column("postalCode", "postal_code", ValueKind::Text),
        AttributeDef::column("city", "city", ValueKind::Text),
        AttributeDef::column("country", "country", ValueKind::Text),
    ],
};

pub static DIRECT_MESSAGE_SCHEMA: EntitySchema = EntitySchema {
    entity: "directMessage",
    table: "direct_message",
    attributes: &[
        AttributeDef::column("id", "id", ValueKind::Long),
        AttributeDef::column("createdDate", "created_date", ValueKind::Timestamp),
        AttributeDef::column("message", "message", ValueKind::Text),
        AttributeDef::column("url", "url", ValueKind::Text),
        AttributeDef::column("pictureContentType", "picture_content_type", ValueKind::Text),
        AttributeDef::joined("senderId", "sender_id", "profile", "sender"),
        AttributeDef::joined("recipientId", "recipient_id", "profile", "recipient"),
    ],
};

pub static INVITATION_SCHEMA: EntitySchema = EntitySchema {
    entity: "invitation",
    table: "invitation",
    attributes: &[
        AttributeDef::column("id", "id", ValueKind::Long),
        AttributeDef::column("createdDate", "created_date", ValueKind::Timestamp),
        AttributeDef::column("accepted", "accepted", ValueKind::Bool),
        AttributeDef::joined("sentId", "sent_id", "profile", "sent"),
        AttributeDef::joined("receivedId", "received_id", "profile", "received"),
    ],
};

pub static RELATIONSHIP_SCHEMA: EntitySchema = EntitySchema {
    entity: "relationship",
    table: "relationship",
    attributes: &[
        AttributeDef::column("id", "id", ValueKind::Long),
        AttributeDef::column("relationshipType", "relationship_type", ValueKind::Text),
        AttributeDef::joined("profileId", "profile_id", "profile", "owner"),
    ],
};

pub static GENDER_SCHEMA: EntitySchema = EntitySchema {
    entity: "gender",
    table: "gender",
    attributes: &[
        AttributeDef::column("id", "id", ValueKind::Long),
        AttributeDef::column("type", "type", ValueKind::Text),
    ],
};

fn text(value: &Option<String>) -> Option<FilterValue> {
    value.as_deref().map(FilterValue::from)
}

/// A member's public profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Profile {
    #[serde(default)]
    pub id: Option<i64>,
    #[validate(length(min = 1, max = 100))]
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "firstName", default)]
    pub first_name: Option<String>,
    #[serde(rename = "lastName", default)]
    pub last_name: Option<String>,
    #[validate(length(max = 4000))]
    #[serde(default)]
    pub about: Option<String>,
    #[serde(rename = "createdDate", default)]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(rename = "userId", default)]
    pub user_id: Option<i64>,
    #[serde(rename = "genderId", default)]
    pub gender_id: Option<i64>,
    #[serde(rename = "locationId", default)]
    pub location_id: Option<i64>,
    /// Coordinates of the linked location, filled on read
    #[serde(default, skip_deserializing)]
    pub location: Option<GeoPoint>,
}

impl Profile {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            id: None,
            display_name: display_name.into(),
            first_name: None,
            last_name: None,
            about: None,
            created_date: None,
            user_id: None,
            gender_id: None,
            location_id: None,
            location: None,
        }
    }
}

impl Located for Profile {
    fn location(&self) -> Option<GeoPoint> {
        self.location
    }
}

impl Row for Profile {
    fn attribute(&self, name: &str) -> Option<FilterValue> {
        match name {
            "id" => self.id.map(FilterValue::Long),
            "displayName" => Some(FilterValue::from(self.display_name.as_str())),
            "firstName" => text(&self.first_name),
            "lastName" => text(&self.last_name),
            "about" => text(&self.about),
            "createdDate" => self.created_date.map(FilterValue::Timestamp),
            "userId" => self.user_id.map(FilterValue::Long),
            "genderId" => self.gender_id.map(FilterValue::Long),
            "locationId" => self.location_id.map(FilterValue::Long),
            _ => None,
        }
    }
}

impl Entity for Profile {
    fn schema() -> &'static EntitySchema {
        &PROFILE_SCHEMA
    }

    fn select_columns() -> String {
        "profile.*, loc.latitude AS loc_latitude, loc.longitude AS loc_longitude".to_string()
    }

    fn base_joins() -> &'static str {
        " LEFT JOIN location AS loc ON loc.id = profile.location_id"
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: Option<i64>) {
        self.id = id;
    }

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let latitude: Option<f64> = row.try_get("loc_latitude")?;
        let longitude: Option<f64> = row.try_get("loc_longitude")?;

        Ok(Self {
            id: row.try_get("id")?,
            display_name: row.try_get("display_name")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            about: row.try_get("about")?,
            created_date: row.try_get("created_date")?,
            user_id: row.try_get("user_id")?,
            gender_id: row.try_get("gender_id")?,
            location_id: row.try_get("location_id")?,
            location: latitude
                .zip(longitude)
                .map(|(lat, lon)| GeoPoint::new(lat, lon)),
        })
    }

    fn columns(&self) -> Vec<ColumnValue> {
        vec![
            ColumnValue::text("display_name", Some(self.display_name.as_str())),
            ColumnValue::text("first_name", self.first_name.as_deref()),
            ColumnValue::text("last_name", self.last_name.as_deref()),
            ColumnValue::text("about", self.about.as_deref()),
            ColumnValue::timestamp("created_date", self.created_date),
            ColumnValue::long("user_id", self.user_id),
            ColumnValue::long("gender_id", self.gender_id),
            ColumnValue::long("location_id", self.location_id),
        ]
    }

    fn insert_only_columns() -> &'static [&'static str] {
        &["created_date"]
    }

    fn prepare_insert(&mut self, now: DateTime<Utc>) {
        self.created_date.get_or_insert(now);
    }
}

/// A geographic location a profile can point at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Location {
    #[serde(default)]
    pub id: Option<i64>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(rename = "postalCode", default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl Row for Location {
    fn attribute(&self, name: &str) -> Option<FilterValue> {
        match name {
            "id" => self.id.map(FilterValue::Long),
            "latitude" => Some(FilterValue::Double(self.latitude)),
            "longitude" => Some(FilterValue::Double(self.longitude)),
            "address" => text(&self.address),
            "postalCode" => text(&self.postal_code),
            "city" => text(&self.city),
            "country" => text(&self.country),
            _ => None,
        }
    }
}

impl Entity for Location {
    fn schema() -> &'static EntitySchema {
        &LOCATION_SCHEMA
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: Option<i64>) {
        self.id = id;
    }

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
            address: row.try_get("address")?,
            postal_code: row.try_get("postal_code")?,
            city: row.try_get("city")?,
            country: row.try_get("country")?,
        })
    }

    fn columns(&self) -> Vec<ColumnValue> {
        vec![
            ColumnValue::double("latitude", Some(self.latitude)),
            ColumnValue::double("longitude", Some(self.longitude)),
            ColumnValue::text("address", self.address.as_deref()),
            ColumnValue::text("postal_code", self.postal_code.as_deref()),
            ColumnValue::text("city", self.city.as_deref()),
            ColumnValue::text("country", self.country.as_deref()),
        ]
    }
}

/// A private message from one profile to another
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct DirectMessage {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(rename = "createdDate", default)]
    pub created_date: Option<DateTime<Utc>>,
    #[validate(length(max = 10000))]
    #[serde(default)]
    pub message: Option<String>,
    #[validate(url)]
    #[serde(default)]
    pub url: Option<String>,
    /// Attached image, base64 in JSON
    #[serde_as(as = "Option<Base64>")]
    pub picture: Option<Vec<u8>>,
    #[serde(rename = "pictureContentType", default)]
    pub picture_content_type: Option<String>,
    #[serde(rename = "senderId", default)]
    pub sender_id: Option<i64>,
    #[serde(rename = "recipientId", default)]
    pub recipient_id: Option<i64>,
}

impl Row for DirectMessage {
    fn attribute(&self, name: &str) -> Option<FilterValue> {
        match name {
            "id" => self.id.map(FilterValue::Long),
            "createdDate" => self.created_date.map(FilterValue::Timestamp),
            "message" => text(&self.message),
            "url" => text(&self.url),
            "pictureContentType" => text(&self.picture_content_type),
            "senderId" => self.sender_id.map(FilterValue::Long),
            "recipientId" => self.recipient_id.map(FilterValue::Long),
            _ => None,
        }
    }
}

impl Entity for DirectMessage {
    fn schema() -> &'static EntitySchema {
        &DIRECT_MESSAGE_SCHEMA
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: Option<i64>) {
        self.id = id;
    }

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            created_date: row.try_get("created_date")?,
            message: row.try_get("message")?,
            url: row.try_get("url")?,
            picture: row.try_get("picture")?,
            picture_content_type: row.try_get("picture_content_type")?,
            sender_id: row.try_get("sender_id")?,
            recipient_id: row.try_get("recipient_id")?,
        })
    }

    fn columns(&self) -> Vec<ColumnValue> {
        vec![
            ColumnValue::timestamp("created_date", self.created_date),
            ColumnValue::text("message", self.message.as_deref()),
            ColumnValue::text("url", self.url.as_deref()),
            ColumnValue::bytes("picture", self.picture.as_deref()),
            ColumnValue::text("picture_content_type", self.picture_content_type.as_deref()),
            ColumnValue::long("sender_id", self.sender_id),
            ColumnValue::long("recipient_id", self.recipient_id),
        ]
    }

    fn insert_only_columns() -> &'static [&'static str] {
        &["created_date"]
    }

    fn prepare_insert(&mut self, now: DateTime<Utc>) {
        self.created_date = Some(now);
    }
}

/// A connection request between two profiles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Invitation {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(rename = "createdDate", default)]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub accepted: Option<bool>,
    #[serde(rename = "sentId", default)]
    pub sent_id: Option<i64>,
    #[serde(rename = "receivedId", default)]
    pub received_id: Option<i64>,
}

impl Connection for Invitation {
    fn sender(&self) -> Option<i64> {
        self.sent_id
    }

    fn receiver(&self) -> Option<i64> {
        self.received_id
    }

    fn is_accepted(&self) -> bool {
        self.accepted.unwrap_or(false)
    }
}

impl Row for Invitation {
    fn attribute(&self, name: &str) -> Option<FilterValue> {
        match name {
            "id" => self.id.map(FilterValue::Long),
            "createdDate" => self.created_date.map(FilterValue::Timestamp),
            "accepted" => self.accepted.map(FilterValue::Bool),
            "sentId" => self.sent_id.map(FilterValue::Long),
            "receivedId" => self.received_id.map(FilterValue::Long),
            _ => None,
        }
    }
}

impl Entity for Invitation {
    fn schema() -> &'static EntitySchema {
        &INVITATION_SCHEMA
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: Option<i64>) {
        self.id = id;
    }

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            created_date: row.try_get("created_date")?,
            accepted: row.try_get("accepted")?,
            sent_id: row.try_get("sent_id")?,
            received_id: row.try_get("received_id")?,
        })
    }

    fn columns(&self) -> Vec<ColumnValue> {
        vec![
            ColumnValue::timestamp("created_date", self.created_date),
            ColumnValue::boolean("accepted", self.accepted),
            ColumnValue::long("sent_id", self.sent_id),
            ColumnValue::long("received_id", self.received_id),
        ]
    }

    fn insert_only_columns() -> &'static [&'static str] {
        &["created_date"]
    }

    fn prepare_insert(&mut self, now: DateTime<Utc>) {
        self.created_date = Some(now);
    }
}

/// Relationship status a profile advertises
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Relationship {
    #[serde(default)]
    pub id: Option<i64>,
    #[validate(length(max = 255))]
    #[serde(rename = "relationshipType", default)]
    pub relationship_type: Option<String>,
    #[serde(rename = "profileId", default)]
    pub profile_id: Option<i64>,
}

impl Row for Relationship {
    fn attribute(&self, name: &str) -> Option<FilterValue> {
        match name {
            "id" => self.id.map(FilterValue::Long),
            "relationshipType" => text(&self.relationship_type),
            "profileId" => self.profile_id.map(FilterValue::Long),
            _ => None,
        }
    }
}

impl Entity for Relationship {
    fn schema() -> &'static EntitySchema {
        &RELATIONSHIP_SCHEMA
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: Option<i64>) {
        self.id = id;
    }

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            relationship_type: row.try_get("relationship_type")?,
            profile_id: row.try_get("profile_id")?,
        })
    }

    fn columns(&self) -> Vec<ColumnValue> {
        vec![
            ColumnValue::text("relationship_type", self.relationship_type.as_deref()),
            ColumnValue::long("profile_id", self.profile_id),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Gender {
    #[serde(default)]
    pub id: Option<i64>,
    #[validate(length(min = 1, max = 255))]
    #[serde(rename = "type")]
    pub kind: String,
}

impl Row for Gender {
    fn attribute(&self, name: &str) -> Option<FilterValue> {
        match name {
            "id" => self.id.map(FilterValue::Long),
            "type" => Some(FilterValue::from(self.kind.as_str())),
            _ => None,
        }
    }
}

impl Entity for Gender {
    fn schema() -> &'static EntitySchema {
        &GENDER_SCHEMA
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: Option<i64>) {
        self.id = id;
    }

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            kind: row.try_get("type")?,
        })
    }

    fn columns(&self) -> Vec<ColumnValue> {
        vec![ColumnValue::text("type", Some(self.kind.as_str()))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn every_attribute_has_a_column<E: Entity>() {
        let schema = E::schema();
        for attribute in schema.attributes {
            assert!(!attribute.column.is_empty(), "{}.{}", schema.entity, attribute.name);
        }
    }

    #[test]
    fn test_schemas_well_formed() {
        every_attribute_has_a_column::<Profile>();
        every_attribute_has_a_column::<Location>();
        every_attribute_has_a_column::<DirectMessage>();
        every_attribute_has_a_column::<Invitation>();
        every_attribute_has_a_column::<Relationship>();
        every_attribute_has_a_column::<Gender>();
    }

    #[test]
    fn test_join_aliases_do_not_shadow_base_join() {
        // Profile reads always join location as `loc`
        for attribute in PROFILE_SCHEMA.attributes {
            if let Some(relation) = attribute.relation {
                assert_ne!(relation.alias, "loc");
                assert_ne!(relation.alias, PROFILE_SCHEMA.table);
            }
        }
    }

    #[test]
    fn test_direct_message_deserializes_camel_case() {
        let json = r#"{"message":"hi","senderId":1,"recipientId":2}"#;
        let dm: DirectMessage = serde_json::from_str(json).unwrap();
        assert_eq!(dm.sender_id, Some(1));
        assert_eq!(dm.recipient_id, Some(2));
        assert!(dm.id.is_none());
        assert_eq!(dm.attribute("senderId"), Some(FilterValue::Long(1)));
    }

    #[test]
    fn test_direct_message_picture_is_base64() {
        let json = r#"{"message":"look","picture":"iVBORw==","pictureContentType":"image/png"}"#;
        let dm: DirectMessage = serde_json::from_str(json).unwrap();
        assert_eq!(dm.picture.as_deref(), Some(&[0x89, b'P', b'N', b'G'][..]));
        assert!(dm.columns().contains(&ColumnValue::bytes("picture", dm.picture.as_deref())));

        let out = serde_json::to_value(&dm).unwrap();
        assert_eq!(out["picture"], "iVBORw==");
    }

    #[test]
    fn test_direct_message_picture_is_not_filterable() {
        assert!(DIRECT_MESSAGE_SCHEMA.attribute("picture").is_none());
    }

    #[test]
    fn test_created_date_is_insert_only() {
        let dm: DirectMessage = serde_json::from_str(r#"{"message":"edit"}"#).unwrap();
        assert!(dm.columns().iter().any(|c| c.column == "created_date"));
        assert!(dm.update_columns().iter().all(|c| c.column != "created_date"));
        assert!(Profile::new("ann")
            .update_columns()
            .iter()
            .all(|c| c.column != "created_date"));
        assert_eq!(Invitation::insert_only_columns(), &["created_date"]);
    }

    #[test]
    fn test_profile_location_is_read_only() {
        let json = r#"{"displayName":"ann","location":{"latitude":1.0,"longitude":2.0}}"#;
        let profile: Profile = serde_json::from_str(json).unwrap();
        assert!(profile.location.is_none());
    }

    #[test]
    fn test_location_range_validation() {
        let mut location = Location {
            id: None,
            latitude: 91.0,
            longitude: 0.0,
            address: None,
            postal_code: None,
            city: None,
            country: None,
        };
        assert!(location.validate().is_err());
        location.latitude = 45.0;
        assert!(location.validate().is_ok());
    }

    #[test]
    fn test_prepare_insert_stamps_created_date() {
        let now = Utc::now();
        let mut invitation = Invitation {
            id: None,
            created_date: None,
            accepted: Some(false),
            sent_id: Some(1),
            received_id: Some(2),
        };
        invitation.prepare_insert(now);
        assert_eq!(invitation.created_date, Some(now));
    }

    #[test]
    fn test_invitation_connection() {
        let invitation = Invitation {
            id: Some(1),
            created_date: None,
            accepted: None,
            sent_id: Some(1),
            received_id: Some(2),
        };
        assert!(!invitation.is_accepted());
        assert_eq!(invitation.sender(), Some(1));
    }
}
