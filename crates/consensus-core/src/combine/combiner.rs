// Reduction of aligned projection groups, and the source-level pipeline
// that aligns raw records before reducing them.

use crate::combine::align::{align_exact, align_fuzzy, AlignedPlayer};
use crate::combine::method::CombinationMethod;
use crate::combine::stats;
use crate::config::{ConfigError, ConsensusConfig};
use crate::matching::PlayerMatcher;
use crate::record::{CombinedProjection, CombinedRecord, ConfidenceBand, PlayerRecord};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CombineError {
    #[error("expected {expected} weights (one per source), got {actual}")]
    WeightCount { expected: usize, actual: usize },

    #[error("invalid weights: {0}")]
    InvalidWeights(String),

    #[error("confidence level must be strictly between 0 and 1, got {0}")]
    InvalidConfidenceLevel(f64),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CombineSettings {
    pub method: CombinationMethod,
    /// One weight per source, in source order. Only read by
    /// `WeightedAverage`; `None` there means uniform weights.
    pub weights: Option<Vec<f64>>,
    pub confidence_level: f64,
}

impl Default for CombineSettings {
    fn default() -> Self {
        Self {
            method: CombinationMethod::Average,
            weights: None,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
        }
    }
}

impl CombineSettings {
    pub fn new(method: CombinationMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn with_weights(mut self, weights: Vec<f64>) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn with_confidence_level(mut self, level: f64) -> Self {
        self.confidence_level = level;
        self
    }
}

// ---------------------------------------------------------------------------
// Group reduction
// ---------------------------------------------------------------------------

/// Reduce each player group to one value.
///
/// Each group holds one slot per source (`None` when that source has no
/// value for the player); the widest group sets the number of sources.
/// Groups with nothing to aggregate are dropped, so every output carries
/// the index of the group it came from. Output order follows input order.
pub fn combine(
    groups: &[Vec<Option<f64>>],
    method: CombinationMethod,
    weights: Option<&[f64]>,
    confidence_level: f64,
) -> Result<Vec<CombinedProjection>, CombineError> {
    let source_count = groups.iter().map(Vec::len).max().unwrap_or(0);
    combine_with_sources(groups, source_count, method, weights, confidence_level)
}

fn combine_with_sources(
    groups: &[Vec<Option<f64>>],
    source_count: usize,
    method: CombinationMethod,
    weights: Option<&[f64]>,
    confidence_level: f64,
) -> Result<Vec<CombinedProjection>, CombineError> {
    if !(confidence_level > 0.0 && confidence_level < 1.0) {
        return Err(CombineError::InvalidConfidenceLevel(confidence_level));
    }

    let normalized = match (method, weights) {
        (CombinationMethod::WeightedAverage, Some(w)) => Some(normalize_weights(w, source_count)?),
        (_, Some(_)) => {
            debug!("weights ignored by combination method {}", method);
            None
        }
        (_, None) => None,
    };

    let mut combined = Vec::with_capacity(groups.len());
    for (index, group) in groups.iter().enumerate() {
        let available = available_values(index, group);
        if available.is_empty() {
            debug!("group {} has no values to combine, skipping", index);
            continue;
        }
        combined.push(reduce(
            index,
            &available,
            method,
            normalized.as_deref(),
            confidence_level,
        ));
    }
    Ok(combined)
}

/// Validate weights against the number of sources and scale them to sum to 1.
fn normalize_weights(weights: &[f64], source_count: usize) -> Result<Vec<f64>, CombineError> {
    if weights.len() != source_count {
        return Err(CombineError::WeightCount {
            expected: source_count,
            actual: weights.len(),
        });
    }
    if let Some((i, w)) = weights
        .iter()
        .enumerate()
        .find(|(_, w)| !w.is_finite() || **w < 0.0)
    {
        return Err(CombineError::InvalidWeights(format!(
            "weight {i} must be finite and >= 0, got {w}"
        )));
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Err(CombineError::InvalidWeights("weights sum to zero".into()));
    }
    Ok(weights.iter().map(|w| w / total).collect())
}

/// `(source index, value)` pairs for the sources that have a usable value.
fn available_values(group_index: usize, group: &[Option<f64>]) -> Vec<(usize, f64)> {
    group
        .iter()
        .enumerate()
        .filter_map(|(source, slot)| match slot {
            Some(v) if v.is_finite() => Some((source, *v)),
            Some(v) => {
                warn!(
                    "group {}: ignoring non-finite value {} from source {}",
                    group_index, v, source
                );
                None
            }
            None => None,
        })
        .collect()
}

fn reduce(
    group: usize,
    available: &[(usize, f64)],
    method: CombinationMethod,
    weights: Option<&[f64]>,
    confidence_level: f64,
) -> CombinedProjection {
    let values: Vec<f64> = available.iter().map(|(_, v)| *v).collect();
    let mut band = None;

    let value = match method {
        CombinationMethod::Average => stats::mean(&values),
        CombinationMethod::WeightedAverage => weighted_mean(available, weights),
        CombinationMethod::Median => stats::median(&values),
        CombinationMethod::DropHighLow => drop_high_low(&values),
        CombinationMethod::ConfidenceBands => {
            let mean = stats::mean(&values);
            band = confidence_band(&values, mean, confidence_level);
            mean
        }
    };

    CombinedProjection {
        group,
        value,
        source_count: values.len(),
        band,
    }
}

/// Weighted mean over the available sources, renormalizing their weights.
/// Falls back to the plain mean when no weights are set or when every
/// available source carries zero weight.
fn weighted_mean(available: &[(usize, f64)], weights: Option<&[f64]>) -> f64 {
    let values: Vec<f64> = available.iter().map(|(_, v)| *v).collect();
    let Some(weights) = weights else {
        return stats::mean(&values);
    };

    let weight_sum: f64 = available
        .iter()
        .map(|(source, _)| weights.get(*source).copied().unwrap_or(0.0))
        .sum();
    if weight_sum <= 0.0 {
        debug!("available sources carry zero weight, using plain average");
        return stats::mean(&values);
    }

    available
        .iter()
        .map(|(source, v)| v * weights.get(*source).copied().unwrap_or(0.0))
        .sum::<f64>()
        / weight_sum
}

fn drop_high_low(values: &[f64]) -> f64 {
    if values.len() < 3 {
        return stats::mean(values);
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    stats::mean(&sorted[1..sorted.len() - 1])
}

fn confidence_band(values: &[f64], mean: f64, confidence_level: f64) -> Option<ConfidenceBand> {
    let std_dev = stats::sample_std_dev(values)?;
    let n = values.len() as f64;
    let margin = stats::t_critical(confidence_level, n - 1.0) * std_dev / n.sqrt();
    Some(ConfidenceBand {
        lower: mean - margin,
        upper: mean + margin,
        dispersion: std_dev,
        margin,
    })
}

// ---------------------------------------------------------------------------
// Source-level pipeline
// ---------------------------------------------------------------------------

/// Aligns player records from several sources and combines their
/// projections.
///
/// Built flat with [`ProjectionCombiner::new`] (sources aligned on exact
/// player name) or composed with [`ProjectionCombiner::with_matcher`]
/// (sources aligned by fuzzy identity matching).
#[derive(Debug, Clone)]
pub struct ProjectionCombiner {
    settings: CombineSettings,
    matcher: Option<PlayerMatcher>,
}

impl ProjectionCombiner {
    pub fn new(settings: CombineSettings) -> Result<Self, CombineError> {
        validate_settings(&settings)?;
        Ok(Self {
            settings,
            matcher: None,
        })
    }

    pub fn with_matcher(
        settings: CombineSettings,
        matcher: PlayerMatcher,
    ) -> Result<Self, CombineError> {
        validate_settings(&settings)?;
        Ok(Self {
            settings,
            matcher: Some(matcher),
        })
    }

    pub fn from_config(config: &ConsensusConfig) -> Result<Self, CombineError> {
        if config.fuzzy_matching {
            let matcher = PlayerMatcher::new(config.matching)?;
            Self::with_matcher(config.combine.clone(), matcher)
        } else {
            Self::new(config.combine.clone())
        }
    }

    pub fn settings(&self) -> &CombineSettings {
        &self.settings
    }

    pub fn matcher(&self) -> Option<&PlayerMatcher> {
        self.matcher.as_ref()
    }

    /// Reduce pre-aligned groups with this combiner's settings.
    pub fn combine_groups(
        &self,
        groups: &[Vec<Option<f64>>],
    ) -> Result<Vec<CombinedProjection>, CombineError> {
        combine(
            groups,
            self.settings.method,
            self.settings.weights.as_deref(),
            self.settings.confidence_level,
        )
    }

    /// Align the sources into per-player groups and combine each group.
    ///
    /// Players appear in the order they are first seen across the sources.
    /// Players with no projection from any source are left out.
    pub fn combine_sources(
        &self,
        sources: &[Vec<PlayerRecord>],
    ) -> Result<Vec<CombinedRecord>, CombineError> {
        let aligned = match &self.matcher {
            Some(matcher) => align_fuzzy(sources, matcher),
            None => align_exact(sources),
        };

        let groups: Vec<Vec<Option<f64>>> = aligned.iter().map(|p| p.values.clone()).collect();
        let combined = combine_with_sources(
            &groups,
            sources.len(),
            self.settings.method,
            self.settings.weights.as_deref(),
            self.settings.confidence_level,
        )?;

        let records: Vec<CombinedRecord> = combined
            .into_iter()
            .map(|projection| to_record(&aligned[projection.group], projection))
            .collect();

        info!(
            "Combined {} players from {} sources using {}",
            records.len(),
            sources.len(),
            self.settings.method
        );
        Ok(records)
    }
}

fn validate_settings(settings: &CombineSettings) -> Result<(), CombineError> {
    let level = settings.confidence_level;
    if !(level > 0.0 && level < 1.0) {
        return Err(CombineError::InvalidConfidenceLevel(level));
    }
    if let Some(weights) = &settings.weights {
        normalize_weights(weights, weights.len())?;
    }
    Ok(())
}

fn to_record(player: &AlignedPlayer, projection: CombinedProjection) -> CombinedRecord {
    CombinedRecord {
        name: player.identity.name.clone(),
        position: player.identity.position.clone(),
        team: player.identity.team.clone(),
        projection: projection.value,
        source_count: projection.source_count,
        lower_bound: projection.band.map(|b| b.lower),
        upper_bound: projection.band.map(|b| b.upper),
        dispersion: projection.band.map(|b| b.dispersion),
        match_similarity: player.match_similarity,
        source_values: player.values.clone(),
    }
}
