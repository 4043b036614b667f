//! Proximity matching for new comments.

use crate::models::Point;

/// Maximum distance (image-space units) within which a new comment merges
/// into an existing point instead of creating one.
pub const PROXIMITY_THRESHOLD: f64 = 20.0;

/// Finds the point a comment at (x, y) should attach to.
///
/// Scans `points` in insertion order and returns the index of the first
/// point strictly within `threshold` of (x, y), or `None` if no point
/// qualifies. First-match-in-insertion-order is the tie-break when several
/// points are in range; it keeps merge targets reproducible across clients.
///
/// Linear scan; revisions hold a small bounded number of annotations, so no
/// spatial index is warranted. Callers depending only on this signature can
/// swap one in later.
pub fn nearest_within_threshold(points: &[Point], x: f64, y: f64, threshold: f64) -> Option<usize> {
    points.iter().position(|p| p.distance_to(x, y) < threshold)
}
