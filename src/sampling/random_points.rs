//! Random points within layer bounds, with a minimum spacing.

use glam::DVec2;
use rand::Rng;
use tracing::{debug, warn};

use super::{PointGrid, SamplingError, DEFAULT_ATTEMPTS_PER_POINT};
use crate::geometry::Geometry;
use crate::pipeline::Feedback;
use crate::vector::{Feature, Field, FieldKind, FieldValue, VectorLayer};

/// Generates random points inside the bounding box of `bounds`.
///
/// Uses the default budget of [`DEFAULT_ATTEMPTS_PER_POINT`] attempts per
/// requested point. See [`random_points_with_budget`].
pub fn random_points_in_bounds<R: Rng>(
    bounds: &VectorLayer,
    min_distance: f64,
    count: u32,
    rng: &mut R,
    feedback: &dyn Feedback,
) -> Result<VectorLayer, SamplingError> {
    let budget = u64::from(count) * u64::from(DEFAULT_ATTEMPTS_PER_POINT);
    random_points_with_budget(bounds, min_distance, count, budget, rng, feedback)
}

/// Generates up to `count` random points inside the bounding box of
/// `bounds`, no two closer than `min_distance`.
///
/// Candidates are drawn uniformly and rejected when they fall within
/// `min_distance` of an accepted point. When `max_attempts` candidates
/// have been drawn without reaching `count`, a warning is pushed and the
/// points found so far are returned. A cancelled feedback also stops the
/// loop early.
///
/// # Arguments
/// * `bounds` - Layer whose extent bounds the points
/// * `min_distance` - Minimum spacing; 0 disables the check
/// * `count` - Requested number of points
/// * `max_attempts` - Candidate budget
/// * `rng` - Random source
/// * `feedback` - Progress and cancellation
///
/// # Returns
/// A point layer with an `id` field numbering the points from 0
pub fn random_points_with_budget<R: Rng>(
    bounds: &VectorLayer,
    min_distance: f64,
    count: u32,
    max_attempts: u64,
    rng: &mut R,
    feedback: &dyn Feedback,
) -> Result<VectorLayer, SamplingError> {
    if !(min_distance.is_finite() && min_distance >= 0.0) {
        return Err(SamplingError::InvalidDistance(min_distance));
    }
    let extent = bounds
        .extent()
        .filter(|e| !e.is_empty())
        .ok_or_else(|| SamplingError::EmptyBounds(bounds.name().to_string()))?;

    let target = count as usize;
    // A zero distance disables the spacing check.
    let mut grid = PointGrid::new(min_distance);
    let mut accepted: Vec<DVec2> = Vec::with_capacity(target);
    let mut attempts = 0u64;

    while accepted.len() < target && attempts < max_attempts {
        if feedback.is_canceled() {
            break;
        }
        attempts += 1;

        let p = DVec2::new(
            rng.random_range(extent.min_x..extent.max_x),
            rng.random_range(extent.min_y..extent.max_y),
        );
        if let Some(grid) = grid.as_mut() {
            if grid.has_neighbor_within(p) {
                continue;
            }
            grid.insert(p);
        }
        accepted.push(p);
        feedback.set_progress(accepted.len() as f64 / target as f64 * 100.0);
    }

    if accepted.len() < target && !feedback.is_canceled() {
        warn!(
            "Placed {} of {} points after {} attempts (min distance {})",
            accepted.len(),
            target,
            attempts,
            min_distance
        );
        feedback.push_warning(&format!(
            "Could not generate requested number of random points. \
             Maximum number of attempts exceeded: {} of {} points placed.",
            accepted.len(),
            target
        ));
    }

    let mut layer = VectorLayer::new(
        "random_points",
        bounds.spatial_ref().clone(),
        vec![Field::new("id", FieldKind::Integer)],
    );
    for (i, p) in accepted.into_iter().enumerate() {
        layer.push(Feature::new(i as u64, Geometry::Point(p), vec![FieldValue::Integer(i as i64)]));
    }

    debug!("Generated {} random points in {} attempts", layer.len(), attempts);
    Ok(layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Extent, Polygon, SpatialRef};
    use crate::pipeline::LogFeedback;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn bounds(width: f64, height: f64) -> VectorLayer {
        let mut layer = VectorLayer::new("extent", SpatialRef::Epsg(32633), Vec::new());
        let extent = Extent::new(1000.0, 2000.0, 1000.0 + width, 2000.0 + height);
        layer.push(Feature::new(0, Geometry::Polygon(Polygon::from_extent(&extent)), Vec::new()));
        layer
    }

    fn points_of(layer: &VectorLayer) -> Vec<DVec2> {
        layer.features().iter().map(|f| f.geometry.as_point().unwrap()).collect()
    }

    fn min_pairwise_distance(points: &[DVec2]) -> f64 {
        let mut min = f64::INFINITY;
        for i in 0..points.len() {
            for j in (i + 1)..points.len() {
                min = min.min(points[i].distance(points[j]));
            }
        }
        min
    }

    #[test]
    fn test_generates_requested_count_within_bounds() {
        let extent_layer = bounds(100.0, 100.0);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let layer =
            random_points_in_bounds(&extent_layer, 5.0, 20, &mut rng, &LogFeedback::default()).unwrap();

        assert_eq!(layer.len(), 20);
        assert_eq!(layer.spatial_ref(), &SpatialRef::Epsg(32633));
        let extent = extent_layer.extent().unwrap();
        for (i, f) in layer.features().iter().enumerate() {
            assert_eq!(f.id, i as u64);
            assert_eq!(layer.value(f, "id"), Some(&FieldValue::Integer(i as i64)));
            assert!(extent.contains(f.geometry.as_point().unwrap()));
        }
        assert!(min_pairwise_distance(&points_of(&layer)) >= 5.0);
    }

    #[test]
    fn test_same_seed_same_points() {
        let extent_layer = bounds(50.0, 80.0);
        let feedback = LogFeedback::default();
        let a = random_points_in_bounds(&extent_layer, 2.0, 30, &mut ChaCha8Rng::seed_from_u64(9), &feedback)
            .unwrap();
        let b = random_points_in_bounds(&extent_layer, 2.0, 30, &mut ChaCha8Rng::seed_from_u64(9), &feedback)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_infeasible_request_returns_fewer_points() {
        // At most a handful of points 8 apart fit in a 10x10 box.
        let extent_layer = bounds(10.0, 10.0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let layer =
            random_points_in_bounds(&extent_layer, 8.0, 50, &mut rng, &LogFeedback::default()).unwrap();

        assert!(layer.len() < 50);
        assert!(!layer.is_empty());
        assert!(min_pairwise_distance(&points_of(&layer)) >= 8.0);
    }

    #[test]
    fn test_zero_distance_disables_spacing() {
        let extent_layer = bounds(1.0, 1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let layer =
            random_points_in_bounds(&extent_layer, 0.0, 500, &mut rng, &LogFeedback::default()).unwrap();
        assert_eq!(layer.len(), 500);
    }

    #[test]
    fn test_cancelled_feedback_stops_early() {
        let feedback = LogFeedback::default();
        feedback.token().cancel();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let layer = random_points_in_bounds(&bounds(100.0, 100.0), 1.0, 10, &mut rng, &feedback).unwrap();
        assert!(layer.is_empty());
    }

    #[test]
    fn test_tiny_distance_at_utm_scale() {
        let mut extent_layer = VectorLayer::new("extent", SpatialRef::Epsg(32633), Vec::new());
        let extent = Extent::new(500_000.0, 4_198_800.0, 501_800.0, 4_200_000.0);
        extent_layer.push(Feature::new(0, Geometry::Polygon(Polygon::from_extent(&extent)), Vec::new()));

        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let layer =
            random_points_in_bounds(&extent_layer, 1e-13, 5, &mut rng, &LogFeedback::default()).unwrap();
        assert_eq!(layer.len(), 5);
        for p in points_of(&layer) {
            assert!(extent.contains(p));
        }
    }

    #[test]
    fn test_invalid_inputs() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let feedback = LogFeedback::default();
        let err = random_points_in_bounds(&bounds(10.0, 10.0), -1.0, 5, &mut rng, &feedback).unwrap_err();
        assert!(matches!(err, SamplingError::InvalidDistance(_)));

        let empty = VectorLayer::new("empty", SpatialRef::Unknown, Vec::new());
        let err = random_points_in_bounds(&empty, 1.0, 5, &mut rng, &feedback).unwrap_err();
        assert!(matches!(err, SamplingError::EmptyBounds(_)));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_points_respect_min_distance(
            count in 1u32..60,
            min_distance in 0.1f64..20.0,
            width in 5.0f64..300.0,
            height in 5.0f64..300.0,
            seed in any::<u64>(),
        ) {
            let extent_layer = bounds(width, height);
            let extent = extent_layer.extent().unwrap();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let layer = random_points_in_bounds(
                &extent_layer, min_distance, count, &mut rng, &LogFeedback::default(),
            ).unwrap();

            prop_assert!(layer.len() <= count as usize);
            prop_assert!(!layer.is_empty());
            let points = points_of(&layer);
            for p in &points {
                prop_assert!(extent.contains(*p));
            }
            prop_assert!(min_pairwise_distance(&points) >= min_distance);
        }
    }
}
