//! Local filesystem storage backend.
//!
//! A thin pass-through to host file operations, confined to a configured root.

mod backend;
mod config;

pub use backend::LocalBackend;
pub use config::LocalConfig;
