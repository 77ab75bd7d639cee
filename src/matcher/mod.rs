mod pool;
mod region;

pub use pool::MatcherPool;
pub use region::{BoundPattern, MatchPolicy, RegionMatcher};
