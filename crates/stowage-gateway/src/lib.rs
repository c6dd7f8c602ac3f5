//! Virtual namespace over heterogeneous storage backends.
//!
//! - `config`: the `[path.<segment>]` TOML surface
//! - `registry`: builds one backend per segment from its type tag
//! - `router`: dispatches every operation by its top-level segment

pub mod config;
pub mod registry;
pub mod router;

pub use config::GatewayConfig;
pub use registry::{BackendKind, BackendRegistry};
pub use router::NamespaceRouter;
