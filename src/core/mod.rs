// Core algorithm exports
pub mod connections;
pub mod criteria;
pub mod distance;
pub mod params;
pub mod predicate;
pub mod proximity;
pub mod schema;

pub use connections::{are_connected, connected_profiles, Connection};
pub use criteria::{CriteriaError, CriteriaSet, FilterSpec, FilterValue};
pub use distance::{distance, distance_km, DistanceUnit, GeoPoint};
pub use params::{parse_criteria, parse_page, Direction, PageRequest, ParamError, SortOrder};
pub use predicate::{build, push_value, Clause, Comparison, Predicate, Row};
pub use proximity::{find_near, DistanceResult, Located};
pub use schema::{AttributeDef, EntitySchema, Relation, ValueKind};
