//! # salesdw-engine
//!
//! The hybrid-join engine itself: the dimension surrogate-key caches and
//! the joiner's admission/partition-scan/commit loop, wired together by an
//! orchestrator that owns the producer and joiner threads.

pub mod dimension_cache;
pub mod joiner;
pub mod orchestrator;

pub use dimension_cache::DimensionCaches;
pub use joiner::{HybridJoiner, JoinerReport};
pub use orchestrator::{run, RunReport};
