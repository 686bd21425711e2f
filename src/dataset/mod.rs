//! Dataset snapshot handed to the scoring engine
//!
//! A dataset bundles the strain registry with the three entity lists for one
//! analysis session. Scorers treat it as immutable; its size signature keys
//! the null-model cache and is reported by statistical-table errors.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::entity::{Gcf, MolecularFamily, ScoredEntity, Spectrum};
use crate::strain::StrainRegistry;

/// Entity counts identifying a dataset snapshot.
///
/// Any change to one of these counts invalidates every cached table derived
/// from the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetSignature {
    /// Number of canonical strains.
    pub n_strains: usize,
    /// Number of gene cluster families.
    pub n_gcfs: usize,
    /// Number of spectra.
    pub n_spectra: usize,
    /// Number of molecular families, singletons included.
    pub n_families: usize,
}

impl fmt::Display for DatasetSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "strains={} gcfs={} spectra={} families={}",
            self.n_strains, self.n_gcfs, self.n_spectra, self.n_families
        )
    }
}

/// Immutable snapshot of one dataset: the registry plus the entity lists.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    registry: StrainRegistry,
    gcfs: Vec<Arc<Gcf>>,
    spectra: Vec<Arc<Spectrum>>,
    families: Vec<Arc<MolecularFamily>>,
    gcf_index: HashMap<Arc<str>, usize>,
    spectrum_index: HashMap<Arc<str>, usize>,
    family_index: HashMap<Arc<str>, usize>,
}

impl Dataset {
    /// Assemble a dataset from loader output.
    pub fn new(
        registry: StrainRegistry,
        gcfs: Vec<Arc<Gcf>>,
        spectra: Vec<Arc<Spectrum>>,
        families: Vec<Arc<MolecularFamily>>,
    ) -> Self {
        let gcf_index = gcfs
            .iter()
            .enumerate()
            .map(|(i, g)| (g.entity_id(), i))
            .collect();
        let spectrum_index = spectra
            .iter()
            .enumerate()
            .map(|(i, s)| (s.entity_id(), i))
            .collect();
        let family_index = families
            .iter()
            .enumerate()
            .map(|(i, m)| (m.entity_id(), i))
            .collect();
        Self {
            registry,
            gcfs,
            spectra,
            families,
            gcf_index,
            spectrum_index,
            family_index,
        }
    }

    /// Strain registry for this dataset.
    pub fn registry(&self) -> &StrainRegistry {
        &self.registry
    }

    /// Gene cluster families in load order.
    pub fn gcfs(&self) -> &[Arc<Gcf>] {
        &self.gcfs
    }

    /// Spectra in load order.
    pub fn spectra(&self) -> &[Arc<Spectrum>] {
        &self.spectra
    }

    /// Molecular families in load order, singletons included.
    pub fn families(&self) -> &[Arc<MolecularFamily>] {
        &self.families
    }

    /// Look up a GCF by id.
    pub fn gcf(&self, id: &str) -> Option<&Arc<Gcf>> {
        self.gcf_index.get(id).map(|&i| &self.gcfs[i])
    }

    /// Look up a spectrum by id.
    pub fn spectrum(&self, id: &str) -> Option<&Arc<Spectrum>> {
        self.spectrum_index.get(id).map(|&i| &self.spectra[i])
    }

    /// Look up a molecular family by id.
    pub fn family(&self, id: &str) -> Option<&Arc<MolecularFamily>> {
        self.family_index.get(id).map(|&i| &self.families[i])
    }

    /// Size signature of this snapshot.
    pub fn signature(&self) -> DatasetSignature {
        DatasetSignature {
            n_strains: self.registry.len(),
            n_gcfs: self.gcfs.len(),
            n_spectra: self.spectra.len(),
            n_families: self.families.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strain::Strain;

    #[test]
    fn signature_counts_all_entity_lists() {
        let mut registry = StrainRegistry::new();
        registry.register(Strain::new("s1"));
        registry.register(Strain::new("s2"));

        let dataset = Dataset::new(
            registry,
            vec![Arc::new(Gcf::new("g1"))],
            vec![Arc::new(Spectrum::new("sp1")), Arc::new(Spectrum::new("sp2"))],
            vec![],
        );

        let sig = dataset.signature();
        assert_eq!(sig.n_strains, 2);
        assert_eq!(sig.n_gcfs, 1);
        assert_eq!(sig.n_spectra, 2);
        assert_eq!(sig.n_families, 0);
    }

    #[test]
    fn lookup_by_id() {
        let dataset = Dataset::new(
            StrainRegistry::new(),
            vec![Arc::new(Gcf::new("g1"))],
            vec![],
            vec![],
        );
        assert!(dataset.gcf("g1").is_some());
        assert!(dataset.gcf("g2").is_none());
    }
}
