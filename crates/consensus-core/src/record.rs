// Record types shared by the matching and combination engines.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Input records
// ---------------------------------------------------------------------------

/// One player row as produced by an upstream source adapter.
///
/// Identity fields default to the empty string when a source omits them.
/// Any additional columns land in `extra` and pass through the engines
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub team: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projection: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl PlayerRecord {
    pub fn new(name: &str, position: &str, team: &str, projection: f64) -> Self {
        Self {
            name: name.to_string(),
            position: position.to_string(),
            team: team.to_string(),
            projection: Some(projection),
            extra: BTreeMap::new(),
        }
    }

    /// Attach a pass-through field.
    pub fn with_extra(mut self, key: &str, value: serde_json::Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }
}

// ---------------------------------------------------------------------------
// Matching output
// ---------------------------------------------------------------------------

/// Per-field similarity scores for one candidate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldScores {
    pub name: f64,
    pub position: f64,
    pub team: f64,
}

/// A pair of records from two sources judged to be the same player.
///
/// Only constructed when every field score and the overall score clear
/// the matcher's thresholds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub source1_index: usize,
    pub source2_index: usize,
    pub record1: PlayerRecord,
    pub record2: PlayerRecord,
    pub overall_similarity: f64,
    pub field_scores: FieldScores,
}

/// A unified record built from one `MatchResult`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRecord {
    pub name: String,
    pub position: String,
    pub team: String,
    /// The preferred record's own projection. Absent under the `combine`
    /// strategy, where both projections are namespaced instead.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_source1: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_source2: Option<f64>,
    pub match_similarity: f64,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Combination output
// ---------------------------------------------------------------------------

/// Mean ± t-margin interval attached by the confidence-band method.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceBand {
    pub lower: f64,
    pub upper: f64,
    /// Sample standard deviation of the aggregated values.
    pub dispersion: f64,
    pub margin: f64,
}

/// The reduced value for one player group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedProjection {
    /// Index of the input group this value was reduced from.
    pub group: usize,
    pub value: f64,
    pub source_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band: Option<ConfidenceBand>,
}

/// A fully resolved player: identity plus the combined projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedRecord {
    pub name: String,
    pub position: String,
    pub team: String,
    pub projection: f64,
    pub source_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower_bound: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper_bound: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispersion: Option<f64>,
    /// Lowest similarity among the fuzzy matches that pulled this player
    /// together; `None` for exact-key alignment or unmatched players.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_similarity: Option<f64>,
    /// One slot per configured source, aligned by source position.
    pub source_values: Vec<Option<f64>>,
}
