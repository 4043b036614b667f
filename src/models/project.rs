use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::annotations::PointStore;

/// One versioned image within a project.
///
/// A revision's identity is its index within the project; revisions are
/// append-only and never renumbered. The `image_ref` is an opaque filename
/// resolved by the image store; the server never reads image bytes through
/// the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Revision {
    pub image_ref: String,
    pub points: PointStore,
}

impl Revision {
    pub fn new(image_ref: impl Into<String>) -> Self {
        Self {
            image_ref: image_ref.into(),
            points: PointStore::new(),
        }
    }
}

/// A named container for an ordered sequence of image revisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub revisions: Vec<Revision>,
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Creates a project with one initial revision and no annotations.
    pub fn new(name: impl Into<String>, initial_image_ref: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            revisions: vec![Revision::new(initial_image_ref)],
            created_at: Utc::now(),
        }
    }
}
