// String and record similarity.
//
// String similarity is 2 * matched / (len_a + len_b), where `matched` is
// the number of characters in the best in-order alignment of the two
// strings (their longest common subsequence).

use crate::record::{FieldScores, PlayerRecord};

/// Weight of the name score in the overall record similarity.
pub const NAME_WEIGHT: f64 = 0.6;
/// Weight of the position score in the overall record similarity.
pub const POSITION_WEIGHT: f64 = 0.2;
/// Weight of the team score in the overall record similarity.
pub const TEAM_WEIGHT: f64 = 0.2;

/// Lowercase, trim, and collapse interior whitespace runs to one space.
pub fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Similarity of two strings in [0, 1] after normalization.
///
/// Two empty strings are identical (1.0); an empty string against a
/// non-empty one scores 0.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = normalize(a).chars().collect();
    let b: Vec<char> = normalize(b).chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    2.0 * matching_characters(&a, &b) as f64 / total as f64
}

/// Per-field scores and the weighted overall score for two records.
pub fn record_similarity(r1: &PlayerRecord, r2: &PlayerRecord) -> (f64, FieldScores) {
    let scores = FieldScores {
        name: similarity(&r1.name, &r2.name),
        position: similarity(&r1.position, &r2.position),
        team: similarity(&r1.team, &r2.team),
    };
    (overall_score(&scores), scores)
}

/// Weighted combination of field scores. Non-decreasing in each field.
pub fn overall_score(scores: &FieldScores) -> f64 {
    NAME_WEIGHT * scores.name + POSITION_WEIGHT * scores.position + TEAM_WEIGHT * scores.team
}

// ---------------------------------------------------------------------------
// Matching characters
// ---------------------------------------------------------------------------

/// Length of the longest common subsequence of `a` and `b`.
///
/// Two-row dynamic program over `b`; the result does not depend on argument
/// order.
fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
