//! Null-model cache persistence and recovery

mod common;

use std::fs;

use strainlink::scoring::cache::NullModelCache;
use strainlink::{DatasetSignature, MetcalfWeights, NullModel};

fn signature() -> DatasetSignature {
    DatasetSignature {
        n_strains: 6,
        n_gcfs: 4,
        n_spectra: 9,
        n_families: 3,
    }
}

fn cached_files(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
    fs::read_dir(dir)
        .expect("cache directory readable")
        .map(|entry| entry.expect("dir entry").path())
        .collect()
}

#[test]
fn second_cache_instance_reads_the_blob() {
    common::init_tracing();
    let dir = tempfile::tempdir().expect("tempdir");

    let mut first = NullModelCache::with_dir(dir.path());
    let built = first
        .get_or_build(signature(), MetcalfWeights::default())
        .expect("builds and persists");

    let files = cached_files(dir.path());
    assert_eq!(files.len(), 1, "one blob per (signature, weights) key");

    // A fresh cache instance simulates a new analysis session.
    let mut second = NullModelCache::with_dir(dir.path());
    let loaded = second
        .get_or_build(signature(), MetcalfWeights::default())
        .expect("loads from disk");
    assert_eq!(*built, *loaded, "persisted tables round-trip exactly");
}

#[test]
fn corrupt_blob_is_recomputed_not_fatal() {
    common::init_tracing();
    let dir = tempfile::tempdir().expect("tempdir");

    let mut cache = NullModelCache::with_dir(dir.path());
    cache
        .get_or_build(signature(), MetcalfWeights::default())
        .expect("initial build");

    // Truncate the blob to simulate a partially-written cache.
    let blob = &cached_files(dir.path())[0];
    fs::write(blob, b"not a cache file").expect("overwrite blob");

    let mut fresh = NullModelCache::with_dir(dir.path());
    let recovered = fresh
        .get_or_build(signature(), MetcalfWeights::default())
        .expect("corruption degrades to a cache miss");

    let reference = NullModel::build(6, MetcalfWeights::default()).expect("direct build");
    assert_eq!(*recovered, reference);
}

#[test]
fn distinct_weight_tuples_get_distinct_blobs() {
    common::init_tracing();
    let dir = tempfile::tempdir().expect("tempdir");

    let mut cache = NullModelCache::with_dir(dir.path());
    cache
        .get_or_build(signature(), MetcalfWeights::default())
        .expect("default weights");
    cache
        .get_or_build(signature(), MetcalfWeights::new(1.0, 0.0, 0.0, 0.0))
        .expect("alternate weights");

    assert_eq!(cached_files(dir.path()).len(), 2);
}

#[test]
fn changed_signature_never_reuses_stale_tables() {
    common::init_tracing();
    let dir = tempfile::tempdir().expect("tempdir");

    let mut cache = NullModelCache::with_dir(dir.path());
    let small = cache
        .get_or_build(signature(), MetcalfWeights::default())
        .expect("first dataset");

    let mut grown = signature();
    grown.n_strains += 1;
    let larger = cache
        .get_or_build(grown, MetcalfWeights::default())
        .expect("grown dataset");

    assert_ne!(small.n_strains(), larger.n_strains());
    assert_eq!(cached_files(dir.path()).len(), 2);
}
