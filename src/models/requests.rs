use serde::{Deserialize, Serialize};
use validator::Validate;

/// Query for `GET /api/profiles/by-location`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LocationQuery {
    pub lat: f64,
    pub long: f64,
    /// Radius in kilometers
    #[validate(range(min = 0.0))]
    pub d: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_radius_rejected() {
        let query = LocationQuery {
            lat: 0.0,
            long: 0.0,
            d: -1.0,
        };
        assert!(query.validate().is_err());
    }

    #[test]
    fn test_out_of_range_center_accepted() {
        let query = LocationQuery {
            lat: 120.0,
            long: -200.0,
            d: 10.0,
        };
        assert!(query.validate().is_ok());
    }

    #[test]
    fn test_zero_radius_allowed() {
        let query = LocationQuery {
            lat: 51.5,
            long: -0.12,
            d: 0.0,
        };
        assert!(query.validate().is_ok());
    }
}
