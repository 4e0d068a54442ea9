//! Titan core library: entry types, registry persistence, errors.
//!
//! - [`types`]: [`Entry`] and elapsed-time formatting
//! - [`registry`]: in-memory [`Registry`] plus TOML load / save
//! - [`paths`]: `~/.titan/` layout
//! - [`lock`]: cross-process launch lock
//! - [`error`]: [`RegistryError`]

pub mod error;
pub mod lock;
pub mod paths;
pub mod registry;
pub mod types;

pub use error::RegistryError;
pub use lock::LaunchLock;
pub use registry::Registry;
pub use types::{format_duration, Entry};
