//! Seafile content-library storage backend.
//!
//! Presents the libraries of one Seafile account as top-level directories and
//! maps stat / list / mkdir / put onto the Seafile REST API:
//! - `session`: lazy, single-flight token acquisition (ping, auth-token, auth ping)
//! - `index`: name → library snapshot, rebuilt wholesale on a lookup miss
//! - `client`: the request primitive shared by every remote call

mod backend;
mod client;
mod config;
mod index;
mod session;
mod types;

pub use backend::SeafileBackend;
pub use config::SeafileConfig;
pub use types::{DirectoryDetail, DirectoryEntry, Library};
