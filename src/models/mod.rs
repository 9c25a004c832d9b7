// Model exports
pub mod domain;
pub mod entity;
pub mod requests;
pub mod responses;

pub use domain::{DirectMessage, Gender, Invitation, Location, Profile, Relationship};
pub use entity::{ColumnValue, Entity, SqlValue};
pub use requests::LocationQuery;
pub use responses::{ErrorResponse, HealthResponse};
