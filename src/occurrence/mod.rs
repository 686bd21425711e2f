//! Strain occurrence tables
//!
//! One binary presence table per entity kind: rows are entity ids, columns
//! are the registry's strains in registration order, and a set bit means the
//! entity was observed in that strain. Rows are stored as compact bit masks;
//! the promoted 0/1 integer matrix is derived on demand for the
//! co-occurrence products.
//!
//! The three tables for one dataset share the same strain columns, which is
//! what makes their co-occurrence counts comparable.

mod cooccurrence;

pub use cooccurrence::CoOccurrence;

use std::collections::HashMap;
use std::sync::Arc;

use bitvec::prelude::*;
use ndarray::Array2;
use thiserror::Error;
use tracing::debug;

use crate::dataset::Dataset;
use crate::entity::{EntityKind, EntityRef, ScoredEntity};

/// Structural errors raised while building or combining tables.
#[derive(Error, Debug)]
pub enum TableError {
    /// Two tables were combined whose strain columns differ.
    #[error("strain columns differ between {left} table ({left_n} strains) and {right} table ({right_n} strains)")]
    StrainColumnMismatch {
        /// Kind of the left-hand table.
        left: EntityKind,
        /// Kind of the right-hand table.
        right: EntityKind,
        /// Column count of the left-hand table.
        left_n: usize,
        /// Column count of the right-hand table.
        right_n: usize,
    },

    /// A pairing was requested with a table of the wrong kind.
    #[error("expected a {expected} table, got {actual}")]
    WrongTableKind {
        /// Description of the required table.
        expected: &'static str,
        /// Kind actually supplied.
        actual: EntityKind,
    },

    /// An entity is absent from its occurrence table.
    #[error("unknown {kind} entity `{id}`")]
    UnknownEntity {
        /// Kind of the missing entity.
        kind: EntityKind,
        /// Identifier of the missing entity.
        id: String,
    },

    /// An empty batch was passed to a query.
    #[error("empty entity batch")]
    EmptyBatch,

    /// A batch mixed entity kinds.
    #[error("mixed entity kinds in batch: {first} and {second}")]
    MixedBatch {
        /// Kind of the first entity.
        first: EntityKind,
        /// First differing kind encountered.
        second: EntityKind,
    },

    /// Both common-strain batches came from the same bipartite side.
    #[error("batches must come from opposite sides, got {a} and {b}")]
    SameSideBatches {
        /// Kind of the first batch.
        a: EntityKind,
        /// Kind of the second batch.
        b: EntityKind,
    },
}

/// Binary presence table for one entity kind.
#[derive(Debug, Clone, PartialEq)]
pub struct OccurrenceTable {
    kind: EntityKind,
    row_ids: Vec<Arc<str>>,
    row_index: HashMap<Arc<str>, usize>,
    strain_ids: Vec<Arc<str>>,
    masks: Vec<BitVec>,
}

impl OccurrenceTable {
    fn build<'a, E, I>(kind: EntityKind, entities: I, dataset: &Dataset) -> Self
    where
        E: ScoredEntity + 'a,
        I: Iterator<Item = &'a E>,
    {
        let registry = dataset.registry();
        let strain_ids = registry.ids();
        let n_strains = strain_ids.len();

        let mut row_ids = Vec::new();
        let mut masks = Vec::new();
        for entity in entities {
            let mut mask = bitvec![0; n_strains];
            for strain in entity.strains() {
                // Entities may report a strain under an alias spelling.
                if let Some(column) = registry.position(strain.id()) {
                    mask.set(column, true);
                }
            }
            row_ids.push(entity.entity_id());
            masks.push(mask);
        }

        let row_index = row_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (Arc::clone(id), i))
            .collect();

        debug!(
            kind = %kind,
            rows = row_ids.len(),
            strains = n_strains,
            "built occurrence table"
        );

        Self {
            kind,
            row_ids,
            row_index,
            strain_ids,
            masks,
        }
    }

    /// Entity kind tabulated here.
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Number of entity rows.
    pub fn n_rows(&self) -> usize {
        self.row_ids.len()
    }

    /// Number of strain columns.
    pub fn n_strains(&self) -> usize {
        self.strain_ids.len()
    }

    /// Strain ids in column order.
    pub fn strain_ids(&self) -> &[Arc<str>] {
        &self.strain_ids
    }

    /// Entity ids in row order.
    pub fn row_ids(&self) -> &[Arc<str>] {
        &self.row_ids
    }

    /// Row position of an entity id.
    pub fn row_of(&self, id: &str) -> Option<usize> {
        self.row_index.get(id).copied()
    }

    /// Presence mask of one row.
    pub fn mask(&self, row: usize) -> &BitVec {
        &self.masks[row]
    }

    /// Number of strains an entity row is present in.
    pub fn row_strain_count(&self, row: usize) -> usize {
        self.masks[row].count_ones()
    }

    /// Per-row strain counts in row order.
    pub fn strain_counts(&self) -> Vec<usize> {
        self.masks.iter().map(|m| m.count_ones()).collect()
    }

    /// Promote the masks to a 0/1 integer matrix of shape
    /// `(n_rows, n_strains)`.
    pub fn presence_matrix(&self) -> Array2<u32> {
        Array2::from_shape_fn((self.n_rows(), self.n_strains()), |(i, j)| {
            u32::from(self.masks[i][j])
        })
    }

    /// Whether `other` was built over the same strain columns.
    pub fn same_strain_columns(&self, other: &OccurrenceTable) -> bool {
        self.strain_ids == other.strain_ids
    }
}

/// The three occurrence tables of one dataset, sharing strain columns.
#[derive(Debug, Clone, PartialEq)]
pub struct OccurrenceTables {
    gcfs: OccurrenceTable,
    spectra: OccurrenceTable,
    families: OccurrenceTable,
}

/// One result of the common-strain query: the strains shared by a pair.
#[derive(Debug, Clone, PartialEq)]
pub struct CommonStrains {
    /// Entity from the first batch.
    pub a: EntityRef,
    /// Entity from the second batch.
    pub b: EntityRef,
    /// Canonical ids of the strains both entities are present in.
    pub strains: Vec<Arc<str>>,
}

impl OccurrenceTables {
    /// Build all three presence tables from a dataset.
    ///
    /// Singleton molecular families are skipped: a family of one spectrum is
    /// not a genuine cluster. Building twice from an unchanged dataset
    /// yields identical tables.
    pub fn build(dataset: &Dataset) -> Self {
        Self {
            gcfs: OccurrenceTable::build(
                EntityKind::Gcf,
                dataset.gcfs().iter().map(Arc::as_ref),
                dataset,
            ),
            spectra: OccurrenceTable::build(
                EntityKind::Spectrum,
                dataset.spectra().iter().map(Arc::as_ref),
                dataset,
            ),
            families: OccurrenceTable::build(
                EntityKind::MolecularFamily,
                dataset
                    .families()
                    .iter()
                    .filter(|f| !f.is_singleton())
                    .map(Arc::as_ref),
                dataset,
            ),
        }
    }

    /// Table for a given entity kind.
    pub fn table(&self, kind: EntityKind) -> &OccurrenceTable {
        match kind {
            EntityKind::Gcf => &self.gcfs,
            EntityKind::Spectrum => &self.spectra,
            EntityKind::MolecularFamily => &self.families,
        }
    }

    /// GCF presence table.
    pub fn gcfs(&self) -> &OccurrenceTable {
        &self.gcfs
    }

    /// Spectrum presence table.
    pub fn spectra(&self) -> &OccurrenceTable {
        &self.spectra
    }

    /// Molecular-family presence table (singletons excluded).
    pub fn families(&self) -> &OccurrenceTable {
        &self.families
    }

    /// Strains shared by every pair drawn from two opposite-side batches.
    ///
    /// With `filter_no_shared` set, pairs whose intersection is empty are
    /// dropped from the result. Entities missing from their table (unknown
    /// ids, singleton families) are reported as [`TableError::UnknownEntity`]
    /// rather than as an empty intersection.
    pub fn common_strains(
        &self,
        batch_a: &[EntityRef],
        batch_b: &[EntityRef],
        filter_no_shared: bool,
    ) -> Result<Vec<CommonStrains>, TableError> {
        let kind_a = uniform_kind(batch_a)?;
        let kind_b = uniform_kind(batch_b)?;
        if kind_a.side() == kind_b.side() {
            return Err(TableError::SameSideBatches {
                a: kind_a,
                b: kind_b,
            });
        }

        let table_a = self.table(kind_a);
        let table_b = self.table(kind_b);
        let strain_ids = table_a.strain_ids();

        let mut results = Vec::new();
        for a in batch_a {
            let row_a = lookup_row(table_a, a)?;
            for b in batch_b {
                let row_b = lookup_row(table_b, b)?;
                let mut shared = table_a.mask(row_a).clone();
                shared &= table_b.mask(row_b).as_bitslice();
                if filter_no_shared && shared.not_any() {
                    continue;
                }
                let strains = shared
                    .iter_ones()
                    .map(|column| Arc::clone(&strain_ids[column]))
                    .collect();
                results.push(CommonStrains {
                    a: a.clone(),
                    b: b.clone(),
                    strains,
                });
            }
        }
        Ok(results)
    }
}

/// Check a batch is non-empty and of one kind, returning that kind.
pub(crate) fn uniform_kind(batch: &[EntityRef]) -> Result<EntityKind, TableError> {
    let first = batch.first().ok_or(TableError::EmptyBatch)?.kind();
    for entity in &batch[1..] {
        if entity.kind() != first {
            return Err(TableError::MixedBatch {
                first,
                second: entity.kind(),
            });
        }
    }
    Ok(first)
}

fn lookup_row(table: &OccurrenceTable, entity: &EntityRef) -> Result<usize, TableError> {
    table
        .row_of(entity.id())
        .ok_or_else(|| TableError::UnknownEntity {
            kind: entity.kind(),
            id: entity.id().to_string(),
        })
}
