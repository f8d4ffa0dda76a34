// Accuracy of combined projections against actual results.

use crate::record::CombinedRecord;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationMetrics {
    pub mean_absolute_error: f64,
    pub root_mean_square_error: f64,
    /// Percent error over players with a non-zero actual; `None` if there
    /// are none.
    pub mean_absolute_percentage_error: Option<f64>,
    /// Pearson correlation; 0.0 with fewer than two pairs or no variance.
    pub correlation: f64,
    pub sample_size: usize,
}

/// Compare combined projections to `(player name, actual)` pairs.
///
/// Players are joined on the exact name; a name repeated in `combined`
/// keeps its first projection. Returns `None` when no player appears in
/// both inputs.
pub fn evaluate_combination(
    actuals: &[(String, f64)],
    combined: &[CombinedRecord],
) -> Option<EvaluationMetrics> {
    let mut projected: HashMap<&str, f64> = HashMap::new();
    for record in combined {
        let name = record.name.as_str();
        if projected.contains_key(name) {
            warn!(
                "evaluation: duplicate combined player '{}', keeping first projection",
                name
            );
            continue;
        }
        projected.insert(name, record.projection);
    }

    let pairs: Vec<(f64, f64)> = actuals
        .iter()
        .filter_map(|(name, actual)| projected.get(name.as_str()).map(|p| (*actual, *p)))
        .collect();

    if pairs.is_empty() {
        debug!("evaluation: no players in common");
        return None;
    }

    let n = pairs.len() as f64;
    let mae = pairs.iter().map(|(a, p)| (a - p).abs()).sum::<f64>() / n;
    let rmse = (pairs.iter().map(|(a, p)| (a - p).powi(2)).sum::<f64>() / n).sqrt();

    let pct: Vec<f64> = pairs
        .iter()
        .filter(|(a, _)| *a != 0.0)
        .map(|(a, p)| ((a - p) / a).abs())
        .collect();
    let mape = if pct.is_empty() {
        None
    } else {
        Some(pct.iter().sum::<f64>() / pct.len() as f64 * 100.0)
    };

    Some(EvaluationMetrics {
        mean_absolute_error: mae,
        root_mean_square_error: rmse,
        mean_absolute_percentage_error: mape,
        correlation: pearson(&pairs),
        sample_size: pairs.len(),
    })
}

fn pearson(pairs: &[(f64, f64)]) -> f64 {
    if pairs.len() < 2 {
        return 0.0;
    }
    let n = pairs.len() as f64;
    let mean_a = pairs.iter().map(|(a, _)| a).sum::<f64>() / n;
    let mean_p = pairs.iter().map(|(_, p)| p).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_p = 0.0;
    for (a, p) in pairs {
        cov += (a - mean_a) * (p - mean_p);
        var_a += (a - mean_a).powi(2);
        var_p += (p - mean_p).powi(2);
    }
    let denom = (var_a * var_p).sqrt();
    if denom < 1e-12 {
        return 0.0;
    }
    cov / denom
}
