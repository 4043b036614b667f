//! Server-side modules: HTTP routes, WebSocket sync, broadcast hub, storage.

pub mod hub;
pub mod images;
pub mod routes;
pub mod storage;
pub mod ws;

pub use hub::{PointsUpdate, SyncHub};
pub use images::ImageStore;
pub use routes::{app, AppState};
pub use storage::ProjectStore;
pub use ws::{ClientMessage, ServerMessage};
