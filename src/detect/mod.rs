//! Watermark detection heuristics

pub mod keywords;
pub mod region;

// Re-export commonly used items
pub use keywords::KeywordMatcher;
pub use region::{RegionHeuristic, RegionVerdict};
