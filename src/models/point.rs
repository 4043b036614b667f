use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One comment in a point's thread.
///
/// Authors are free-text display names; no uniqueness is enforced. Thread
/// order is append order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

/// A coordinate-anchored annotation carrying one or more comments.
///
/// Coordinates are image-space pixels, fixed at creation. The `id` is a
/// stable handle assigned at creation; clients display points by their
/// 1-based position in the revision's snapshot, which is recomputed on every
/// serialization rather than stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Point {
    pub id: Uuid,
    pub x: f64,
    pub y: f64,
    pub comments: Vec<Comment>,
}

impl Point {
    /// Creates a point with its first comment.
    pub fn new(x: f64, y: f64, first_comment: Comment) -> Self {
        Self {
            id: Uuid::new_v4(),
            x,
            y,
            comments: vec![first_comment],
        }
    }

    /// Euclidean distance from this point to (x, y).
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        ((self.x - x).powi(2) + (self.y - y).powi(2)).sqrt()
    }
}
