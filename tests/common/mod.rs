//! Shared fixtures for integration tests
//!
//! Each integration binary compiles this module separately and uses a
//! different subset of it.
#![allow(dead_code)]

use std::sync::Arc;

use strainlink::{Dataset, Gcf, MolecularFamily, Spectrum, Strain, StrainRegistry};

/// Install a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn strain(id: &str) -> Strain {
    Strain::new(id)
}

fn gcf(id: &str, strains: &[&str]) -> Arc<Gcf> {
    let mut gcf = Gcf::new(id);
    for s in strains {
        gcf.add_strain(strain(s));
    }
    Arc::new(gcf)
}

fn spectrum(id: &str, strains: &[&str]) -> Arc<Spectrum> {
    let mut spectrum = Spectrum::new(id);
    for s in strains {
        spectrum.add_strain(strain(s));
    }
    Arc::new(spectrum)
}

/// Five-strain panel with hand-checkable score tables.
///
/// Raw Metcalf scores with default weights:
///   sp1 × g1 = 11,  sp1 × g2 = -9
///   sp2 × g1 = -20, sp2 × g2 = 23
/// Standardized: sp2 × g2 = 2.0, sp2 × g1 = -2.0, sp1 × g1 ≈ 0.333.
/// `mf_single` is a singleton family and never enters the family table.
pub fn five_strain_dataset() -> Dataset {
    let mut registry = StrainRegistry::new();
    for id in ["s1", "s2", "s3", "s4", "s5"] {
        registry.register(strain(id));
    }

    let sp1 = spectrum("sp1", &["s2", "s3", "s4"]);
    let sp2 = spectrum("sp2", &["s4", "s5"]);
    let sp3 = spectrum("sp3", &["s1"]);

    let mf1 = Arc::new(MolecularFamily::from_members(
        "mf1",
        vec![Arc::clone(&sp1), Arc::clone(&sp2)],
    ));
    let mf_single = Arc::new(MolecularFamily::from_members(
        "mf_single",
        vec![Arc::clone(&sp3)],
    ));

    Dataset::new(
        registry,
        vec![gcf("g1", &["s1", "s2", "s3"]), gcf("g2", &["s4", "s5"])],
        vec![sp1, sp2, sp3],
        vec![mf1, mf_single],
    )
}
