//! socialnet - profile, messaging and proximity service for a small social network
//!
//! The core offers two pieces used by the HTTP layer: a criteria query
//! builder that turns typed per-attribute filters into one predicate over an
//! entity (rendered to SQL or evaluated in memory), and a proximity search
//! that ranks profiles by great-circle distance from a point.

pub mod config;
pub mod core;
pub mod errors;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{build, find_near, CriteriaSet, DistanceResult, FilterSpec, FilterValue, GeoPoint, Predicate};
pub use errors::ApiError;
pub use models::{DirectMessage, Entity, Gender, Invitation, Location, Profile, Relationship};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let criteria = CriteriaSet::new(Profile::schema());
        assert!(build(&criteria).is_tautology());
    }
}
