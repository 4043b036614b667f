//! The ordered set of annotation points for one revision.

use serde::{Deserialize, Serialize};

use super::proximity::{nearest_within_threshold, PROXIMITY_THRESHOLD};
use crate::models::{Comment, Point};

/// Insertion-ordered collection of points for one revision.
///
/// Points are append-only and keep their creation coordinates forever; only
/// comment threads grow. No two points are ever created within the proximity
/// threshold of each other: a comment landing that close merges into the
/// existing point instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointStore {
    points: Vec<Point>,
    /// Mutation counter, bumped on every accepted comment. Snapshots taken
    /// at a higher seq supersede lower ones; not persisted, resets per run.
    #[serde(skip)]
    seq: u64,
}

impl PointStore {
    pub fn new() -> Self {
        Self {
            points: Vec::new(),
            seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Sequence number of the last mutation; 0 for an untouched store.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Attaches a comment at (x, y), merging into an existing point when one
    /// lies within the proximity threshold and creating a new point
    /// otherwise. Returns the point the comment landed on.
    pub fn add_or_merge_comment(&mut self, x: f64, y: f64, comment: Comment) -> &Point {
        let idx = match nearest_within_threshold(&self.points, x, y, PROXIMITY_THRESHOLD) {
            Some(idx) => {
                self.points[idx].comments.push(comment);
                idx
            }
            None => {
                self.points.push(Point::new(x, y, comment));
                self.points.len() - 1
            }
        };
        self.seq += 1;
        &self.points[idx]
    }

    /// All points in insertion order with their full comment threads.
    ///
    /// A point's displayed number is its 1-based position in this sequence,
    /// recomputed on every snapshot.
    pub fn snapshot(&self) -> Vec<Point> {
        self.points.clone()
    }
}
