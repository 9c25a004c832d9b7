use crate::core::distance::{distance_km, GeoPoint};
use serde::{Deserialize, Serialize};

/// Anything that may carry a location
pub trait Located {
    fn location(&self) -> Option<GeoPoint>;
}

/// A candidate within the search radius and its distance from the center
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceResult<P> {
    pub profile: P,
    /// Kilometers
    pub distance: f64,
}

/// Find every candidate within `radius_km` of `center`, nearest first.
///
/// Full linear scan. Candidates without a location are skipped; the radius
/// is inclusive; candidates at equal distance keep their input order.
pub fn find_near<P: Located>(
    center: GeoPoint,
    radius_km: f64,
    candidates: impl IntoIterator<Item = P>,
) -> Vec<DistanceResult<P>> {
    let mut results: Vec<DistanceResult<P>> = candidates
        .into_iter()
        .filter_map(|profile| {
            let location = profile.location()?;
            let distance = distance_km(center, location);
            (distance <= radius_km).then_some(DistanceResult { profile, distance })
        })
        .collect();

    // sort_by is stable, which preserves scan order on ties
    results.sort_by(|a, b| a.distance.total_cmp(&b.distance));

    results
}
