// Threshold-gated player matching across two sources.

use crate::config::ConfigError;
use crate::matching::similarity::record_similarity;
use crate::record::{FieldScores, MatchResult, PlayerRecord};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::debug;

/// The team threshold actually enforced never exceeds this value, so that
/// abbreviations ("BUF") still clear it against full names ("Buffalo").
pub const TEAM_THRESHOLD_CAP: f64 = 0.4;

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Minimum similarity each field, and the weighted total, must reach.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct MatchThresholds {
    #[serde(rename = "name_threshold")]
    pub name: f64,
    #[serde(rename = "position_threshold")]
    pub position: f64,
    #[serde(rename = "team_threshold")]
    pub team: f64,
    #[serde(rename = "overall_threshold")]
    pub overall: f64,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            name: 0.7,
            position: 0.8,
            team: 0.5,
            overall: 0.65,
        }
    }
}

impl MatchThresholds {
    /// Team threshold after applying [`TEAM_THRESHOLD_CAP`].
    pub fn effective_team(&self) -> f64 {
        self.team.min(TEAM_THRESHOLD_CAP)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("matching.name_threshold", self.name),
            ("matching.position_threshold", self.position),
            ("matching.team_threshold", self.team),
            ("matching.overall_threshold", self.overall),
        ];
        for (field, value) in fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ValidationError {
                    field: field.into(),
                    message: format!("must be between 0.0 and 1.0 inclusive, got {value}"),
                });
            }
        }
        Ok(())
    }

    /// True when every field score and the overall score clear their thresholds.
    pub fn accepts(&self, overall: f64, scores: &FieldScores) -> bool {
        scores.name >= self.name
            && scores.position >= self.position
            && scores.team >= self.effective_team()
            && overall >= self.overall
    }
}

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

/// Pairs up records that refer to the same player across two sources.
///
/// Holds only its thresholds; every call is independent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerMatcher {
    thresholds: MatchThresholds,
}

impl PlayerMatcher {
    pub fn new(thresholds: MatchThresholds) -> Result<Self, ConfigError> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> &MatchThresholds {
        &self.thresholds
    }

    /// Every cross-source pair that clears all thresholds, in scan order
    /// (source1 index, then source2 index).
    ///
    /// A record may appear in several results; nothing is deduplicated here.
    pub fn match_players(
        &self,
        source1: &[PlayerRecord],
        source2: &[PlayerRecord],
    ) -> Vec<MatchResult> {
        let mut matches = Vec::new();
        for (i, r1) in source1.iter().enumerate() {
            for (j, r2) in source2.iter().enumerate() {
                let (overall, scores) = record_similarity(r1, r2);
                if !self.thresholds.accepts(overall, &scores) {
                    continue;
                }
                matches.push(MatchResult {
                    source1_index: i,
                    source2_index: j,
                    record1: r1.clone(),
                    record2: r2.clone(),
                    overall_similarity: overall,
                    field_scores: scores,
                });
            }
        }
        debug!(
            "match_players: {} qualifying pairs from {}x{} records",
            matches.len(),
            source1.len(),
            source2.len()
        );
        matches
    }

    /// At most one match per source1 record, chosen greedily in source1
    /// order.
    ///
    /// Each source1 record takes its highest-similarity qualifying
    /// counterpart; the first maximum in source2 order wins ties. Unless
    /// `allow_duplicates` is set, a source2 record consumed by an earlier
    /// source1 record is no longer a candidate. The result is
    /// order-dependent and not a globally optimal assignment.
    pub fn get_best_matches(
        &self,
        source1: &[PlayerRecord],
        source2: &[PlayerRecord],
        allow_duplicates: bool,
    ) -> Vec<MatchResult> {
        let all = self.match_players(source1, source2);
        let mut used: HashSet<usize> = HashSet::new();
        let mut best_matches = Vec::new();

        // `all` is grouped by source1 index already, in ascending order.
        let mut start = 0;
        while start < all.len() {
            let source1_index = all[start].source1_index;
            let end = all[start..]
                .iter()
                .position(|m| m.source1_index != source1_index)
                .map_or(all.len(), |offset| start + offset);

            let mut best: Option<&MatchResult> = None;
            for candidate in &all[start..end] {
                if !allow_duplicates && used.contains(&candidate.source2_index) {
                    continue;
                }
                if best.map_or(true, |b| candidate.overall_similarity > b.overall_similarity) {
                    best = Some(candidate);
                }
            }

            if let Some(chosen) = best {
                if !allow_duplicates {
                    used.insert(chosen.source2_index);
                }
                best_matches.push(chosen.clone());
            } else {
                debug!(
                    "source1 record {} has no unclaimed candidate left",
                    source1_index
                );
            }

            start = end;
        }

        best_matches
    }
}
