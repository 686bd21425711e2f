//! End-to-end Metcalf scoring over a hand-checkable dataset

mod common;

use strainlink::{
    EntityKind, EntityRef, MetcalfConfig, MetcalfScorer, MetcalfWeights, ScoringError,
    ScoringMethod, TableError, METCALF_METHOD,
};
use test_case::test_case;

fn gcf(id: &str) -> EntityRef {
    EntityRef::new(EntityKind::Gcf, id)
}

fn spectrum(id: &str) -> EntityRef {
    EntityRef::new(EntityKind::Spectrum, id)
}

fn family(id: &str) -> EntityRef {
    EntityRef::new(EntityKind::MolecularFamily, id)
}

fn ready_scorer(config: MetcalfConfig) -> MetcalfScorer {
    common::init_tracing();
    let dataset = common::five_strain_dataset();
    let mut scorer = MetcalfScorer::new(config);
    scorer.setup(&dataset).expect("setup succeeds");
    scorer
}

#[test]
fn standardized_links_respect_the_cutoff() {
    let scorer = ready_scorer(MetcalfConfig {
        cutoff: 1.9,
        ..MetcalfConfig::default()
    });

    let links = scorer.get_links(&[spectrum("sp2")]).unwrap();
    assert!(links.has_link(&spectrum("sp2"), &gcf("g2")));
    assert!(
        !links.has_link(&spectrum("sp2"), &gcf("g1")),
        "sp2 x g1 standardizes to -2.0 and must fall below the cutoff"
    );

    let data = links.get_link_data(&spectrum("sp2"), &gcf("g2")).unwrap();
    let score = data.get(METCALF_METHOD).unwrap();
    assert!((score.value() - 2.0).abs() < 1e-9);
    assert_eq!(score.parameters().get("cutoff").unwrap(), "1.9");
    assert_eq!(score.parameters().get("standardized").unwrap(), "true");
}

#[test]
fn gcf_queries_cover_both_metabolomic_pairings() {
    let scorer = ready_scorer(MetcalfConfig {
        cutoff: -1000.0,
        ..MetcalfConfig::default()
    });

    let links = scorer.get_links(&[gcf("g2")]).unwrap();
    // Every spectrum plus the one tabulated family.
    assert!(links.has_link(&gcf("g2"), &spectrum("sp1")));
    assert!(links.has_link(&gcf("g2"), &spectrum("sp2")));
    assert!(links.has_link(&gcf("g2"), &spectrum("sp3")));
    assert!(links.has_link(&gcf("g2"), &family("mf1")));
    assert!(
        !links.has_link(&gcf("g2"), &family("mf_single")),
        "singleton families are never scored"
    );
}

#[test]
fn raw_mode_skips_the_null_model() {
    let scorer = ready_scorer(MetcalfConfig {
        cutoff: 11.0,
        standardized: false,
        ..MetcalfConfig::default()
    });

    let links = scorer.get_links(&[spectrum("sp1")]).unwrap();
    let data = links.get_link_data(&spectrum("sp1"), &gcf("g1")).unwrap();
    assert_eq!(data.get(METCALF_METHOD).unwrap().value(), 11.0);
    assert!(
        !links.has_link(&spectrum("sp1"), &gcf("g2")),
        "sp1 x g2 scores -9 raw"
    );

    assert!(
        scorer.standardized_scores(EntityKind::Spectrum).is_err(),
        "no standardized table exists in raw mode"
    );
}

#[test_case(MetcalfWeights::default(), 11.0; "default weights")]
#[test_case(MetcalfWeights::new(1.0, 0.0, 0.0, 0.0), 2.0; "both count only")]
#[test_case(MetcalfWeights::new(0.0, 0.0, 0.0, 1.0), 1.0; "neither count only")]
#[test_case(MetcalfWeights::new(1.0, 1.0, 1.0, 1.0), 5.0; "unit weights count strains")]
fn raw_score_follows_the_weight_tuple(weights: MetcalfWeights, expected: f64) {
    let scorer = ready_scorer(MetcalfConfig {
        weights,
        cutoff: 0.0,
        standardized: false,
    });

    let raw = scorer.raw_scores(EntityKind::Spectrum).unwrap();
    // Row 0 is sp1, column 0 is g1.
    assert_eq!(raw[[0, 0]], expected);
}

#[test]
fn query_validation_errors_are_immediate() {
    let scorer = ready_scorer(MetcalfConfig::default());

    let err = scorer.get_links(&[]).unwrap_err();
    assert!(matches!(
        err,
        ScoringError::Table(TableError::EmptyBatch)
    ));

    let err = scorer
        .get_links(&[spectrum("sp1"), gcf("g1")])
        .unwrap_err();
    assert!(matches!(
        err,
        ScoringError::Table(TableError::MixedBatch { .. })
    ));

    let err = scorer.get_links(&[spectrum("missing")]).unwrap_err();
    assert!(matches!(
        err,
        ScoringError::Table(TableError::UnknownEntity { .. })
    ));

    // A singleton family is absent from the tables: not found, not zero.
    let err = scorer.get_links(&[family("mf_single")]).unwrap_err();
    assert!(matches!(
        err,
        ScoringError::Table(TableError::UnknownEntity { .. })
    ));
}

#[test]
fn querying_before_setup_is_an_error() {
    let scorer = MetcalfScorer::new(MetcalfConfig::default());
    let err = scorer.get_links(&[spectrum("sp1")]).unwrap_err();
    assert!(matches!(err, ScoringError::NotReady { .. }));
}

#[test]
fn common_strains_flow_through_the_occurrence_tables() {
    let scorer = ready_scorer(MetcalfConfig::default());
    let tables = scorer.occurrence_tables().unwrap();

    let shared = tables
        .common_strains(&[spectrum("sp1")], &[gcf("g1")], false)
        .unwrap();
    let ids: Vec<_> = shared[0].strains.iter().map(|s| s.to_string()).collect();
    assert_eq!(ids, vec!["s2", "s3"]);
}

#[test]
fn format_data_renders_the_value() {
    let scorer = ready_scorer(MetcalfConfig {
        cutoff: 1.9,
        ..MetcalfConfig::default()
    });
    let links = scorer.get_links(&[spectrum("sp2")]).unwrap();
    let data = links.get_link_data(&spectrum("sp2"), &gcf("g2")).unwrap();
    let rendered = scorer.format_data(data.get(METCALF_METHOD).unwrap());
    assert_eq!(rendered, "2.00");
}
