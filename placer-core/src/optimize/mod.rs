//! Travel optimization
//!
//! Path ordering shared by the cycle phases and feeder preparation.

pub mod path;

pub use path::{centroid, path_length, solve, PathOptimizer, DEFAULT_MAX_PASSES};
