// Building unified records from matched pairs.

use crate::config::{ConfigError, ConsensusConfig};
use crate::matching::matcher::PlayerMatcher;
use crate::record::{MatchResult, MergedRecord, PlayerRecord};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Keys `MergedRecord` serializes itself; pass-through fields never shadow
/// them.
const MERGED_FIELDS: [&str; 7] = [
    "name",
    "position",
    "team",
    "projection",
    "projection_source1",
    "projection_source2",
    "match_similarity",
];

/// Which record supplies identity fields when a matched pair is merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergeStrategy {
    /// Identity and pass-through fields from source1; source2's projection
    /// is kept as `projection_source2`.
    PreferSource1,
    /// Mirror image of `PreferSource1`.
    PreferSource2,
    /// Keep both records' fields. Both projections are namespaced by source;
    /// source1 wins any other conflict.
    Combine,
}

impl MergeStrategy {
    pub const ALL: [MergeStrategy; 3] = [
        MergeStrategy::PreferSource1,
        MergeStrategy::PreferSource2,
        MergeStrategy::Combine,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MergeStrategy::PreferSource1 => "prefer_source1",
            MergeStrategy::PreferSource2 => "prefer_source2",
            MergeStrategy::Combine => "combine",
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        MergeStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == wanted)
            .ok_or_else(|| ConfigError::UnknownMergeStrategy(s.to_string()))
    }
}

/// Merge every match into one record. Unmatched records are the caller's
/// concern and never appear here.
pub fn create_merged_data(matches: &[MatchResult], strategy: MergeStrategy) -> Vec<MergedRecord> {
    matches.iter().map(|m| merge_one(m, strategy)).collect()
}

/// Best-match `source1` against `source2` with the configured thresholds
/// (no source2 reuse) and merge each pair with the configured strategy.
pub fn merge_sources(
    config: &ConsensusConfig,
    source1: &[PlayerRecord],
    source2: &[PlayerRecord],
) -> Result<Vec<MergedRecord>, ConfigError> {
    let matcher = PlayerMatcher::new(config.matching)?;
    let matches = matcher.get_best_matches(source1, source2, false);
    debug!(
        "merging {} matched pairs with strategy {}",
        matches.len(),
        config.merge_strategy
    );
    Ok(create_merged_data(&matches, config.merge_strategy))
}

fn merge_one(m: &MatchResult, strategy: MergeStrategy) -> MergedRecord {
    match strategy {
        MergeStrategy::PreferSource1 => MergedRecord {
            projection_source2: m.record2.projection,
            ..preferred(&m.record1, m.overall_similarity)
        },
        MergeStrategy::PreferSource2 => MergedRecord {
            projection_source1: m.record1.projection,
            ..preferred(&m.record2, m.overall_similarity)
        },
        MergeStrategy::Combine => {
            let (r1, r2) = (&m.record1, &m.record2);
            let mut extra = r1.extra.clone();
            for (key, value) in &r2.extra {
                extra.entry(key.clone()).or_insert_with(|| value.clone());
            }
            MergedRecord {
                name: first_non_empty(&r1.name, &r2.name),
                position: first_non_empty(&r1.position, &r2.position),
                team: first_non_empty(&r1.team, &r2.team),
                projection: None,
                projection_source1: r1.projection,
                projection_source2: r2.projection,
                match_similarity: m.overall_similarity,
                extra: pass_through(extra),
            }
        }
    }
}

fn preferred(record: &PlayerRecord, similarity: f64) -> MergedRecord {
    MergedRecord {
        name: record.name.clone(),
        position: record.position.clone(),
        team: record.team.clone(),
        projection: record.projection,
        projection_source1: None,
        projection_source2: None,
        match_similarity: similarity,
        extra: pass_through(record.extra.clone()),
    }
}

fn pass_through(
    mut extra: BTreeMap<String, serde_json::Value>,
) -> BTreeMap<String, serde_json::Value> {
    extra.retain(|key, _| !MERGED_FIELDS.contains(&key.as_str()));
    extra
}

fn first_non_empty(a: &str, b: &str) -> String {
    let chosen = if a.trim().is_empty() { b } else { a };
    chosen.to_string()
}
