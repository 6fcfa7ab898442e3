//! Runs every JSON fixture under `tests/fixtures/` through the JavaScript table.

mod common;

use arbor::engine::Normalizer;
use arbor::grammars::JAVASCRIPT;
use common::{fixtures_dir, load_fixtures, Fixture};
use pretty_assertions::assert_eq;

fn run_forward(normalizer: &Normalizer<'_>, fixture: &Fixture) -> arbor::Outcome {
    match &fixture.source {
        Some(source) => normalizer.to_canonical_with_source(fixture.native.clone(), source),
        None => normalizer.to_canonical(fixture.native.clone()),
    }
}

#[test]
fn test_fixtures_are_discovered() {
    let fixtures = load_fixtures(&fixtures_dir());
    assert!(fixtures.len() >= 3, "found only {} fixtures", fixtures.len());
}

#[test]
fn test_fixtures_normalize() {
    let normalizer = Normalizer::new(&JAVASCRIPT);
    for fixture in load_fixtures(&fixtures_dir()) {
        let outcome = run_forward(&normalizer, &fixture);
        assert!(
            outcome.is_ok(),
            "{}: unexpected errors {:?}",
            fixture.name,
            outcome.errors
        );
        assert_eq!(outcome.tree, fixture.canonical, "{}", fixture.name);

        let unmatched: Vec<&str> = outcome
            .warnings
            .iter()
            .map(|w| w.node_type.as_str())
            .collect();
        assert_eq!(unmatched, fixture.unmatched, "{}", fixture.name);
    }
}

#[test]
fn test_fixtures_round_trip() {
    let normalizer = Normalizer::new(&JAVASCRIPT);
    for fixture in load_fixtures(&fixtures_dir()) {
        let expected = fixture
            .native_after_round_trip
            .clone()
            .unwrap_or_else(|| fixture.native.clone());
        let outcome = normalizer.to_native(fixture.canonical.clone());
        assert!(outcome.is_ok(), "{}: {:?}", fixture.name, outcome.errors);
        assert_eq!(outcome.tree, expected, "{}", fixture.name);
    }
}
