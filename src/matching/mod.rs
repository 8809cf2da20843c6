//! Name matching — normalization, roster resolution, override table.

pub mod matcher;
pub mod normalize;
pub mod overrides;

pub use matcher::{MatchPolicy, MatchResult, Matcher};
pub use normalize::normalize;
pub use overrides::{OverridePolicy, OverrideTable};
