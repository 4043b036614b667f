//! Data model: projects, revisions, points and comments.

pub mod point;
pub mod project;

pub use point::{Comment, Point};
pub use project::{Project, Revision};
