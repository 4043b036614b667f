//! Markup: a collaborative image review server.
//!
//! Teams annotate image revisions with point-anchored comment threads and
//! see each other's comments live over WebSocket. Projects hold an ordered
//! sequence of image revisions; each revision carries its own annotation
//! points. A comment placed near an existing point merges into its thread
//! instead of creating a new point.

pub mod annotations;
pub mod config;
pub mod error;
pub mod models;
pub mod registry;
pub mod server;
