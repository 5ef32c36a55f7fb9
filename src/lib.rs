//! Kubernetes flavor plugin.
//!
//! Turns a generic instance draft into a cluster node: merges bootstrap lines and
//! tags from the group's flavor properties and issues a per-node TLS bundle signed
//! by the cluster certificate authority.

pub mod certs;
pub mod config;
pub mod error;
pub mod flavor;
pub mod instance;
pub mod script;

pub use error::FlavorError;
