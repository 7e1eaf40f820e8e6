//! Configuration types
//!
//! Processor settings and, with the `serde` feature, TOML loading.

#[cfg(feature = "serde")]
pub mod loader;
pub mod types;

#[cfg(feature = "serde")]
pub use loader::{from_toml, to_toml, ConfigError};
pub use types::*;
