//! Annotation core: the per-revision point store and proximity matching.

pub mod proximity;
pub mod store;

pub use proximity::{nearest_within_threshold, PROXIMITY_THRESHOLD};
pub use store::PointStore;
