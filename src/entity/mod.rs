//! Scored entity types
//!
//! Three entity kinds participate in link scoring: gene cluster families on
//! the genomic side, spectra and molecular families on the metabolomic side.
//! Each exposes a stable identifier and the set of strains it was observed
//! in; everything else about them (sequences, peaks, annotations) belongs to
//! the loaders and never enters this crate.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::strain::Strain;

/// The three entity kinds that can appear in a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    /// Gene cluster family.
    Gcf,
    /// Single mass-spectral feature.
    Spectrum,
    /// Cluster of related spectral features.
    MolecularFamily,
}

/// Which half of the bipartite relation a kind belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Gene cluster families.
    Genomic,
    /// Spectra and molecular families.
    Metabolomic,
}

impl EntityKind {
    /// Bipartite side of this kind.
    pub fn side(self) -> Side {
        match self {
            EntityKind::Gcf => Side::Genomic,
            EntityKind::Spectrum | EntityKind::MolecularFamily => Side::Metabolomic,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Gcf => "gcf",
            EntityKind::Spectrum => "spectrum",
            EntityKind::MolecularFamily => "molecular-family",
        };
        write!(f, "{name}")
    }
}

/// Cheap hashable handle to an entity: its kind plus its stable id.
///
/// The link graph and every query API speak in `EntityRef`s so callers never
/// need to move whole entities around.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityRef {
    kind: EntityKind,
    id: Arc<str>,
}

impl EntityRef {
    /// Build a handle from kind and id.
    pub fn new(kind: EntityKind, id: impl Into<Arc<str>>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    /// Entity kind.
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Stable identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Bipartite side of the referenced entity.
    pub fn side(&self) -> Side {
        self.kind.side()
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Common surface of the three scored entity types.
pub trait ScoredEntity {
    /// Stable identifier.
    fn entity_id(&self) -> Arc<str>;

    /// Kind of this entity.
    fn kind(&self) -> EntityKind;

    /// Strains the entity was observed in.
    fn strains(&self) -> &BTreeSet<Strain>;

    /// Handle usable in link-graph queries.
    fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.kind(), self.entity_id())
    }

    /// Whether the entity was observed in the given strain.
    fn has_strain(&self, strain: &Strain) -> bool {
        self.strains().contains(strain)
    }
}

/// Gene cluster family: a group of biosynthetic gene clusters observed
/// across a set of strains.
#[derive(Debug, Clone)]
pub struct Gcf {
    id: Arc<str>,
    strains: BTreeSet<Strain>,
}

impl Gcf {
    /// Create an empty family.
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self {
            id: id.into(),
            strains: BTreeSet::new(),
        }
    }

    /// Record an observation of this family in a strain.
    pub fn add_strain(&mut self, strain: Strain) {
        self.strains.insert(strain);
    }
}

impl ScoredEntity for Gcf {
    fn entity_id(&self) -> Arc<str> {
        Arc::clone(&self.id)
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Gcf
    }

    fn strains(&self) -> &BTreeSet<Strain> {
        &self.strains
    }
}

/// Single mass-spectral feature with its strain observations.
#[derive(Debug, Clone)]
pub struct Spectrum {
    id: Arc<str>,
    strains: BTreeSet<Strain>,
}

impl Spectrum {
    /// Create a spectrum with no observations.
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self {
            id: id.into(),
            strains: BTreeSet::new(),
        }
    }

    /// Record an observation of this spectrum in a strain.
    pub fn add_strain(&mut self, strain: Strain) {
        self.strains.insert(strain);
    }
}

impl ScoredEntity for Spectrum {
    fn entity_id(&self) -> Arc<str> {
        Arc::clone(&self.id)
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Spectrum
    }

    fn strains(&self) -> &BTreeSet<Strain> {
        &self.strains
    }
}

/// Cluster of related spectra.
///
/// The family's strain set is maintained as the union of its members'. A
/// family with exactly one member is a *singleton*: it does not represent a
/// genuine cluster and is excluded from the occurrence tables.
#[derive(Debug, Clone)]
pub struct MolecularFamily {
    id: Arc<str>,
    members: Vec<Arc<Spectrum>>,
    strains: BTreeSet<Strain>,
}

impl MolecularFamily {
    /// Create an empty family.
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self {
            id: id.into(),
            members: Vec::new(),
            strains: BTreeSet::new(),
        }
    }

    /// Create a family from its member spectra.
    pub fn from_members(id: impl Into<Arc<str>>, members: Vec<Arc<Spectrum>>) -> Self {
        let mut family = Self::new(id);
        for member in members {
            family.add_member(member);
        }
        family
    }

    /// Add a member spectrum, folding its strains into the family's set.
    pub fn add_member(&mut self, spectrum: Arc<Spectrum>) {
        self.strains.extend(spectrum.strains().iter().cloned());
        self.members.push(spectrum);
    }

    /// Member spectra.
    pub fn members(&self) -> &[Arc<Spectrum>] {
        &self.members
    }

    /// Whether the family contains exactly one spectrum.
    pub fn is_singleton(&self) -> bool {
        self.members.len() == 1
    }
}

impl ScoredEntity for MolecularFamily {
    fn entity_id(&self) -> Arc<str> {
        Arc::clone(&self.id)
    }

    fn kind(&self) -> EntityKind {
        EntityKind::MolecularFamily
    }

    fn strains(&self) -> &BTreeSet<Strain> {
        &self.strains
    }
}
