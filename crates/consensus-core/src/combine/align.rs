// Aligning per-source player records into per-player projection groups.

use crate::matching::PlayerMatcher;
use crate::record::PlayerRecord;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// One resolved player with a projection slot per source.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedPlayer {
    /// The first record seen for this player; supplies identity fields.
    pub identity: PlayerRecord,
    pub values: Vec<Option<f64>>,
    /// Lowest fuzzy-match similarity that joined a record to this player.
    pub match_similarity: Option<f64>,
}

impl AlignedPlayer {
    fn new(record: &PlayerRecord, source: usize, source_count: usize) -> Self {
        let mut values = vec![None; source_count];
        values[source] = record.projection;
        Self {
            identity: record.clone(),
            values,
            match_similarity: None,
        }
    }
}

/// Outer join on the exact `name` string.
///
/// Players are ordered by first appearance: every player of source 0, then
/// players new in source 1, and so on. A name repeated inside one source
/// keeps its first value.
pub fn align_exact(sources: &[Vec<PlayerRecord>]) -> Vec<AlignedPlayer> {
    let source_count = sources.len();
    let mut players: Vec<AlignedPlayer> = Vec::new();
    let mut by_name: HashMap<&str, usize> = HashMap::new();

    for (source, records) in sources.iter().enumerate() {
        let mut seen: HashSet<&str> = HashSet::new();
        for record in records {
            let name = record.name.as_str();
            if !seen.insert(name) {
                warn!(
                    "source {}: duplicate player '{}', keeping first value",
                    source, name
                );
                continue;
            }
            match by_name.get(name) {
                Some(&index) => players[index].values[source] = record.projection,
                None => {
                    by_name.insert(name, players.len());
                    players.push(AlignedPlayer::new(record, source, source_count));
                }
            }
        }
    }

    debug!(
        "exact alignment: {} players across {} sources",
        players.len(),
        source_count
    );
    players
}

/// Outer join using fuzzy identity matching.
///
/// The running player list is best-matched (without reuse) against each
/// subsequent source. Matched records fill that source's slot; records left
/// unmatched become new players.
pub fn align_fuzzy(sources: &[Vec<PlayerRecord>], matcher: &PlayerMatcher) -> Vec<AlignedPlayer> {
    let source_count = sources.len();
    let Some(first) = sources.first() else {
        return Vec::new();
    };

    let mut players: Vec<AlignedPlayer> = first
        .iter()
        .map(|record| AlignedPlayer::new(record, 0, source_count))
        .collect();

    for (source, records) in sources.iter().enumerate().skip(1) {
        let identities: Vec<PlayerRecord> = players.iter().map(|p| p.identity.clone()).collect();
        let matches = matcher.get_best_matches(&identities, records, false);

        let mut claimed = vec![false; records.len()];
        for m in &matches {
            let player = &mut players[m.source1_index];
            player.values[source] = m.record2.projection;
            player.match_similarity = Some(match player.match_similarity {
                Some(previous) => previous.min(m.overall_similarity),
                None => m.overall_similarity,
            });
            claimed[m.source2_index] = true;
        }

        let mut added = 0;
        for (record, _) in records.iter().zip(&claimed).filter(|(_, taken)| !**taken) {
            players.push(AlignedPlayer::new(record, source, source_count));
            added += 1;
        }

        debug!(
            "fuzzy alignment: source {} matched {} of {} records, {} new players",
            source,
            matches.len(),
            records.len(),
            added
        );
    }

    players
}
