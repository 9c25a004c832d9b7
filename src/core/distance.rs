use serde::{Deserialize, Serialize};

/// Statute miles per degree of arc (60 nautical miles * 1.1515)
const MILES_PER_DEGREE: f64 = 60.0 * 1.1515;

const KM_PER_MILE: f64 = 1.609344;

const NAUTICAL_MILES_PER_MILE: f64 = 0.8684;

/// A latitude/longitude pair in degrees (WGS84)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl From<GeoPoint> for geo::Point<f64> {
    fn from(p: GeoPoint) -> Self {
        geo::Point::new(p.longitude, p.latitude)
    }
}

impl From<geo::Point<f64>> for GeoPoint {
    fn from(p: geo::Point<f64>) -> Self {
        GeoPoint::new(p.y(), p.x())
    }
}

/// Unit a distance is reported in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceUnit {
    #[default]
    Kilometers,
    Miles,
    NauticalMiles,
}

/// Great-circle distance between two points using the spherical law of
/// cosines.
///
/// Coordinate-identical points short-circuit to exactly zero. The cosine is
/// clamped to [-1, 1] so rounding never pushes `acos` out of its domain.
/// Angles are not range-checked.
#[inline]
pub fn distance(a: GeoPoint, b: GeoPoint, unit: DistanceUnit) -> f64 {
    if a.latitude == b.latitude && a.longitude == b.longitude {
        return 0.0;
    }

    let theta = (a.longitude - b.longitude).to_radians();
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();

    let cos_angle = lat_a.sin() * lat_b.sin() + lat_a.cos() * lat_b.cos() * theta.cos();
    let angle_deg = cos_angle.clamp(-1.0, 1.0).acos().to_degrees();

    let miles = angle_deg * MILES_PER_DEGREE;
    match unit {
        DistanceUnit::Kilometers => miles * KM_PER_MILE,
        DistanceUnit::Miles => miles,
        DistanceUnit::NauticalMiles => miles * NAUTICAL_MILES_PER_MILE,
    }
}

/// Distance in kilometers
#[inline]
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    distance(a, b, DistanceUnit::Kilometers)
}
