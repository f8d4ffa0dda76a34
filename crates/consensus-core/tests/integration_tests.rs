// Integration tests for the consensus engine.
//
// These exercise the public API end-to-end: fixture records from three
// sources are matched, merged, aligned, and combined, and the results are
// checked against hand-computed values.

use std::collections::HashSet;
use std::path::PathBuf;

use consensus_core::combine::{
    combine, evaluate_combination, CombinationMethod, CombineError, CombineSettings,
    ProjectionCombiner,
};
use consensus_core::config::{load_config_from, ConsensusConfig};
use consensus_core::matching::{
    create_merged_data, merge_sources, MatchThresholds, MergeStrategy, PlayerMatcher,
};
use consensus_core::record::PlayerRecord;

// ===========================================================================
// Test helpers
// ===========================================================================

fn crate_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("consensus_core=debug")),
        )
        .with_test_writer()
        .try_init();
}

fn load_fixture(name: &str) -> Vec<PlayerRecord> {
    let path = crate_root().join("tests/fixtures").join(name);
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
    serde_json::from_str(&text).unwrap_or_else(|e| panic!("bad fixture {}: {e}", path.display()))
}

fn three_sources() -> Vec<Vec<PlayerRecord>> {
    vec![
        load_fixture("nflcom.json"),
        load_fixture("espn.json"),
        load_fixture("fantasypros.json"),
    ]
}

/// Thresholds lenient enough for the "Name (TEAM)" spelling.
fn lenient_matcher() -> PlayerMatcher {
    PlayerMatcher::new(MatchThresholds {
        name: 0.5,
        position: 0.8,
        team: 0.3,
        overall: 0.45,
    })
    .unwrap()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// ===========================================================================
// Matching
// ===========================================================================

#[test]
fn abbreviated_name_and_city_resolve_to_one_match() {
    init_tracing();
    let source1 = vec![PlayerRecord::new("Josh Allen", "QB", "BUF", 25.4)];
    let source2 = vec![PlayerRecord::new("J. Allen", "QB", "Buffalo", 24.1)];
    let matcher = PlayerMatcher::new(MatchThresholds {
        name: 0.6,
        team: 0.4,
        overall: 0.5,
        ..MatchThresholds::default()
    })
    .unwrap();

    let matches = matcher.match_players(&source1, &source2);
    assert_eq!(matches.len(), 1);
    let m = &matches[0];
    assert!(m.overall_similarity >= 0.5 && m.overall_similarity <= 1.0);

    let values = vec![vec![m.record1.projection, m.record2.projection]];
    let combined = combine(&values, CombinationMethod::Average, None, 0.95).unwrap();
    assert!(close(combined[0].value, 24.75));
    assert_eq!(combined[0].source_count, 2);
}

#[test]
fn best_matches_across_fixture_sources_are_one_to_one() {
    let sources = three_sources();
    let best = lenient_matcher().get_best_matches(&sources[0], &sources[1], false);

    assert!(best.len() >= 3);
    let mut used = HashSet::new();
    for m in &best {
        assert!(used.insert(m.source2_index));
        assert_eq!(m.record1.position, m.record2.position);
    }
    // Josh Allen pairs with the abbreviated ESPN entry.
    let allen = best.iter().find(|m| m.source1_index == 0).unwrap();
    assert_eq!(allen.record2.name, "J. Allen");
}

#[test]
fn merged_records_carry_namespaced_projections_and_extras() {
    let sources = three_sources();
    let best = lenient_matcher().get_best_matches(&sources[0], &sources[1], false);

    let merged = create_merged_data(&best, MergeStrategy::PreferSource2);
    assert_eq!(merged.len(), best.len());
    let allen = &merged[0];
    assert_eq!(allen.name, "J. Allen");
    assert_eq!(allen.projection, Some(24.1));
    assert_eq!(allen.projection_source1, Some(25.4));
    assert_eq!(allen.extra["source"], serde_json::json!("ESPN"));

    let combined = create_merged_data(&best, MergeStrategy::Combine);
    assert!(combined
        .iter()
        .all(|r| r.projection.is_none() && r.projection_source1.is_some() && r.projection_source2.is_some()));
}

// ===========================================================================
// Source-level pipeline
// ===========================================================================

#[test]
fn fuzzy_pipeline_combines_three_sources() {
    init_tracing();
    let combiner =
        ProjectionCombiner::with_matcher(CombineSettings::new(CombinationMethod::Average), lenient_matcher())
            .unwrap();

    let records = combiner.combine_sources(&three_sources()).unwrap();

    let allen = records.iter().find(|r| r.name == "Josh Allen").unwrap();
    assert_eq!(allen.source_count, 3);
    assert!(close(allen.projection, (25.4 + 24.1 + 25.8) / 3.0));
    assert_eq!(allen.source_values, vec![Some(25.4), Some(24.1), Some(25.8)]);
    assert!(allen.match_similarity.is_some());

    let mahomes = records.iter().find(|r| r.name == "Patrick Mahomes").unwrap();
    assert_eq!(mahomes.source_count, 1);
    assert!(close(mahomes.projection, 23.5));

    // First-seen ordering: every NFL.com player leads, in file order.
    let leading: Vec<&str> = records.iter().take(6).map(|r| r.name.as_str()).collect();
    assert_eq!(
        leading,
        [
            "Josh Allen",
            "Jonathan Taylor",
            "Davante Adams",
            "Travis Kelce",
            "Lamar Jackson",
            "Christian McCaffrey"
        ]
    );
    assert!(records.len() < 6 + 7 + 6);
}

#[test]
fn exact_pipeline_keeps_spelling_variants_apart() {
    let combiner = ProjectionCombiner::new(CombineSettings::new(CombinationMethod::Median)).unwrap();
    let records = combiner.combine_sources(&three_sources()).unwrap();

    assert_eq!(records.len(), 6 + 7 + 6);
    assert!(records.iter().all(|r| r.source_count == 1));
    assert!(records.iter().all(|r| r.match_similarity.is_none()));
}

#[test]
fn confidence_bands_through_the_pipeline() {
    let combiner = ProjectionCombiner::with_matcher(
        CombineSettings::new(CombinationMethod::ConfidenceBands).with_confidence_level(0.90),
        lenient_matcher(),
    )
    .unwrap();
    let records = combiner.combine_sources(&three_sources()).unwrap();

    let allen = records.iter().find(|r| r.name == "Josh Allen").unwrap();
    let (lower, upper) = (allen.lower_bound.unwrap(), allen.upper_bound.unwrap());
    assert!(lower < allen.projection && allen.projection < upper);
    assert!(close(upper - allen.projection, allen.projection - lower));
    assert!(allen.dispersion.unwrap() > 0.0);

    let mahomes = records.iter().find(|r| r.name == "Patrick Mahomes").unwrap();
    assert!(mahomes.lower_bound.is_none());
    assert!(mahomes.upper_bound.is_none());
    assert_eq!(mahomes.source_count, 1);
}

#[test]
fn weighted_pipeline_with_shared_keys() {
    let sources = vec![
        vec![PlayerRecord::new("Josh Allen", "QB", "BUF", 20.0)],
        vec![PlayerRecord::new("Josh Allen", "QB", "BUF", 22.0)],
        vec![
            PlayerRecord::new("Josh Allen", "QB", "BUF", 24.0),
            PlayerRecord::new("Tyreek Hill", "WR", "MIA", 16.9),
        ],
    ];
    let combiner = ProjectionCombiner::new(
        CombineSettings::new(CombinationMethod::WeightedAverage).with_weights(vec![0.5, 0.3, 0.2]),
    )
    .unwrap();

    let records = combiner.combine_sources(&sources).unwrap();
    assert_eq!(records.len(), 2);
    assert!(close(records[0].projection, 21.4));
    // Only the third source knows Tyreek Hill; its weight renormalizes to 1.
    assert!(close(records[1].projection, 16.9));
    assert_eq!(records[1].source_values, vec![None, None, Some(16.9)]);
}

#[test]
fn weight_count_must_match_source_count() {
    let combiner = ProjectionCombiner::new(
        CombineSettings::new(CombinationMethod::WeightedAverage).with_weights(vec![0.5, 0.5]),
    )
    .unwrap();
    let err = combiner.combine_sources(&three_sources()).unwrap_err();
    match err {
        CombineError::WeightCount { expected, actual } => {
            assert_eq!(expected, 3);
            assert_eq!(actual, 2);
        }
        other => panic!("expected WeightCount, got {other:?}"),
    }
}

#[test]
fn shipped_config_drives_the_pipeline() {
    init_tracing();
    let config = load_config_from(&crate_root().join("defaults/consensus.toml")).unwrap();
    assert_eq!(config.merge_strategy, MergeStrategy::PreferSource1);

    let combiner = ProjectionCombiner::from_config(&config).unwrap();
    assert!(combiner.matcher().is_some());

    let sources = vec![load_fixture("nflcom.json"), load_fixture("espn.json")];
    let records = combiner.combine_sources(&sources).unwrap();

    let joined = records.iter().filter(|r| r.source_count == 2).count();
    assert!(joined >= 1);
    assert_eq!(records.len(), 6 + 7 - joined);
}

#[test]
fn shipped_config_merges_two_sources() {
    let config = load_config_from(&crate_root().join("defaults/consensus.toml")).unwrap();
    let merged = merge_sources(&config, &load_fixture("nflcom.json"), &load_fixture("espn.json")).unwrap();

    let allen = merged.iter().find(|r| r.name == "Josh Allen").unwrap();
    assert_eq!(allen.projection, Some(25.4));
    assert_eq!(allen.projection_source2, Some(24.1));
    assert_eq!(allen.extra["source"], serde_json::json!("NFL.com"));
    assert!(merged.iter().all(|r| r.match_similarity >= config.matching.overall));
}

#[test]
fn default_config_matches_shipped_file() {
    let shipped = load_config_from(&crate_root().join("defaults/consensus.toml")).unwrap();
    assert_eq!(shipped, ConsensusConfig::default());
}

// ===========================================================================
// Export and evaluation
// ===========================================================================

#[test]
fn combined_records_serialize_for_export() {
    let combiner = ProjectionCombiner::with_matcher(
        CombineSettings::new(CombinationMethod::ConfidenceBands),
        lenient_matcher(),
    )
    .unwrap();
    let records = combiner.combine_sources(&three_sources()).unwrap();

    let json = serde_json::to_value(&records).unwrap();
    let first = &json[0];
    assert_eq!(first["name"], serde_json::json!("Josh Allen"));
    assert_eq!(first["source_count"], serde_json::json!(3));
    assert!(first.get("lower_bound").is_some());
    assert_eq!(first["source_values"].as_array().unwrap().len(), 3);
}

#[test]
fn evaluation_against_actuals() {
    let combiner =
        ProjectionCombiner::with_matcher(CombineSettings::default(), lenient_matcher()).unwrap();
    let records = combiner.combine_sources(&three_sources()).unwrap();

    let actuals = vec![
        ("Josh Allen".to_string(), 27.0),
        ("Patrick Mahomes".to_string(), 21.0),
        ("Justin Jefferson".to_string(), 19.0),
    ];
    let metrics = evaluate_combination(&actuals, &records).unwrap();
    assert_eq!(metrics.sample_size, 2);

    let allen_err = (27.0 - (25.4 + 24.1 + 25.8) / 3.0_f64).abs();
    let mahomes_err = (21.0_f64 - 23.5).abs();
    assert!(close(metrics.mean_absolute_error, (allen_err + mahomes_err) / 2.0));
    assert!(metrics.mean_absolute_percentage_error.is_some());
}
