// Projection combination: reduce per-source estimates for each resolved
// player to one value.

pub mod align;
pub mod combiner;
pub mod evaluate;
pub mod method;
pub mod stats;

pub use align::{align_exact, align_fuzzy, AlignedPlayer};
pub use combiner::{
    combine, CombineError, CombineSettings, ProjectionCombiner, DEFAULT_CONFIDENCE_LEVEL,
};
pub use evaluate::{evaluate_combination, EvaluationMetrics};
pub use method::CombinationMethod;
