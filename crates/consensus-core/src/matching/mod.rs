// Identity matching: fuzzy string similarity, threshold-gated pairing, and
// merging of matched record pairs.

pub mod matcher;
pub mod merge;
pub mod similarity;

pub use matcher::{MatchThresholds, PlayerMatcher, TEAM_THRESHOLD_CAP};
pub use merge::{create_merged_data, merge_sources, MergeStrategy};
pub use similarity::{normalize, record_similarity, similarity};
