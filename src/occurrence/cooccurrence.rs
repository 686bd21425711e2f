//! Co-occurrence counting between a metabolomic table and the GCF table
//!
//! For every (metabolomic entity, GCF) pair the four presence/absence
//! combinations are counted over the shared strain columns:
//!
//! ```text
//! both[i,j]     = Σ_s M[i,s]·G[j,s]
//! met_only[i,j] = Σ_s M[i,s]·(1−G[j,s])
//! gcf_only[i,j] = Σ_s (1−M[i,s])·G[j,s]
//! neither[i,j]  = Σ_s (1−M[i,s])·(1−G[j,s])
//! ```
//!
//! realized as matrix products of the promoted masks and their complements.
//! The four cells of any pair sum to the strain count.

use std::sync::Arc;

use ndarray::Array2;
use tracing::debug;

use crate::entity::{EntityKind, Side};
use crate::occurrence::{OccurrenceTable, TableError};

/// The four count tables for one metabolomic-kind × GCF pairing.
#[derive(Debug, Clone)]
pub struct CoOccurrence {
    met_kind: EntityKind,
    met_ids: Vec<Arc<str>>,
    gcf_ids: Vec<Arc<str>>,
    met_counts: Vec<usize>,
    gcf_counts: Vec<usize>,
    n_strains: usize,
    both: Array2<u32>,
    met_only: Array2<u32>,
    gcf_only: Array2<u32>,
    neither: Array2<u32>,
}

impl CoOccurrence {
    /// Count all four combinations for a metabolomic table against the GCF
    /// table.
    ///
    /// The left table must hold spectra or molecular families, the right one
    /// GCFs, and both must share the same strain columns.
    pub fn compute(
        met: &OccurrenceTable,
        gcf: &OccurrenceTable,
    ) -> Result<Self, TableError> {
        if met.kind().side() != Side::Metabolomic {
            return Err(TableError::WrongTableKind {
                expected: "spectrum or molecular-family",
                actual: met.kind(),
            });
        }
        if gcf.kind() != EntityKind::Gcf {
            return Err(TableError::WrongTableKind {
                expected: "gcf",
                actual: gcf.kind(),
            });
        }
        if !met.same_strain_columns(gcf) {
            return Err(TableError::StrainColumnMismatch {
                left: met.kind(),
                right: gcf.kind(),
                left_n: met.n_strains(),
                right_n: gcf.n_strains(),
            });
        }

        let m = met.presence_matrix();
        let g = gcf.presence_matrix();
        let m_absent = m.mapv(|v| 1 - v);
        let g_absent = g.mapv(|v| 1 - v);

        let both = m.dot(&g.t());
        let met_only = m.dot(&g_absent.t());
        let gcf_only = m_absent.dot(&g.t());
        let neither = m_absent.dot(&g_absent.t());

        debug!(
            met_kind = %met.kind(),
            met_rows = met.n_rows(),
            gcf_rows = gcf.n_rows(),
            strains = met.n_strains(),
            "computed co-occurrence tables"
        );

        Ok(Self {
            met_kind: met.kind(),
            met_ids: met.row_ids().to_vec(),
            gcf_ids: gcf.row_ids().to_vec(),
            met_counts: met.strain_counts(),
            gcf_counts: gcf.strain_counts(),
            n_strains: met.n_strains(),
            both,
            met_only,
            gcf_only,
            neither,
        })
    }

    /// Metabolomic kind on the row axis.
    pub fn met_kind(&self) -> EntityKind {
        self.met_kind
    }

    /// Metabolomic entity ids in row order.
    pub fn met_ids(&self) -> &[Arc<str>] {
        &self.met_ids
    }

    /// GCF ids in column order.
    pub fn gcf_ids(&self) -> &[Arc<str>] {
        &self.gcf_ids
    }

    /// Strain count of each metabolomic row.
    pub fn met_counts(&self) -> &[usize] {
        &self.met_counts
    }

    /// Strain count of each GCF column.
    pub fn gcf_counts(&self) -> &[usize] {
        &self.gcf_counts
    }

    /// Total number of strains shared by the two tables.
    pub fn n_strains(&self) -> usize {
        self.n_strains
    }

    /// Strains present in both entities, per pair.
    pub fn both(&self) -> &Array2<u32> {
        &self.both
    }

    /// Strains present in the metabolomic entity only.
    pub fn met_only(&self) -> &Array2<u32> {
        &self.met_only
    }

    /// Strains present in the GCF only.
    pub fn gcf_only(&self) -> &Array2<u32> {
        &self.gcf_only
    }

    /// Strains present in neither entity.
    pub fn neither(&self) -> &Array2<u32> {
        &self.neither
    }

    /// Table shape as `(n_met, n_gcf)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.met_ids.len(), self.gcf_ids.len())
    }
}
