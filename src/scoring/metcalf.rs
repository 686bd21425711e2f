//! Metcalf correlation scoring
//!
//! The raw Metcalf score of a (metabolomic entity, GCF) pair is a weighted
//! sum of its four co-occurrence counts. Standardization against the
//! hypergeometric null model (see [`null_model`](crate::scoring::null_model))
//! turns raw scores into z-scores comparable across pairs with different
//! strain counts. The cutoff is applied after standardization, so it is
//! always expressed in the units the caller configured.

use std::collections::HashMap;
use std::sync::Arc;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dataset::{Dataset, DatasetSignature};
use crate::entity::{EntityKind, EntityRef, Side};
use crate::link::LinkGraph;
use crate::occurrence::{uniform_kind, CoOccurrence, OccurrenceTables, TableError};
use crate::scoring::cache::NullModelCache;
use crate::scoring::null_model::NullModel;
use crate::scoring::{Score, ScoringError, ScoringMethod};

/// Method name recorded on every link this scorer produces.
pub const METCALF_METHOD: &str = "metcalf";

/// Weight applied to each of the four co-occurrence counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetcalfWeights {
    /// Weight of strains containing both entities.
    pub both: f64,
    /// Weight of strains containing only the metabolomic entity.
    pub met_only: f64,
    /// Weight of strains containing only the GCF.
    pub gcf_only: f64,
    /// Weight of strains containing neither entity.
    pub neither: f64,
}

impl Default for MetcalfWeights {
    fn default() -> Self {
        Self::new(10.0, -10.0, 0.0, 1.0)
    }
}

impl MetcalfWeights {
    /// Create a weight tuple in `(both, met_only, gcf_only, neither)` order.
    pub fn new(both: f64, met_only: f64, gcf_only: f64, neither: f64) -> Self {
        Self {
            both,
            met_only,
            gcf_only,
            neither,
        }
    }

    /// Raw score of a pair with overlap `o` and strain counts `(n, m)` over
    /// `n_strains` strains.
    pub fn overlap_score(&self, o: usize, n: usize, m: usize, n_strains: usize) -> f64 {
        self.both * o as f64
            + self.met_only * (n - o) as f64
            + self.gcf_only * (m - o) as f64
            + self.neither * (n_strains - (n + m - o)) as f64
    }

    /// Bit-exact key for memoization maps and cache fingerprints.
    pub fn key_bits(&self) -> [u64; 4] {
        [
            self.both.to_bits(),
            self.met_only.to_bits(),
            self.gcf_only.to_bits(),
            self.neither.to_bits(),
        ]
    }
}

/// Scorer configuration: weights, cutoff, and score units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetcalfConfig {
    /// Co-occurrence weights.
    pub weights: MetcalfWeights,
    /// Minimum score a pair must reach to become a link.
    pub cutoff: f64,
    /// Emit z-scores against the hypergeometric null; raw scores otherwise.
    pub standardized: bool,
}

impl Default for MetcalfConfig {
    fn default() -> Self {
        Self {
            weights: MetcalfWeights::default(),
            cutoff: 2.5,
            standardized: true,
        }
    }
}

/// Score and lookup tables for one metabolomic-kind × GCF pairing.
#[derive(Debug)]
struct Pairing {
    cooc: CoOccurrence,
    raw: Array2<f64>,
    met_rows: HashMap<Arc<str>, usize>,
    gcf_cols: HashMap<Arc<str>, usize>,
}

impl Pairing {
    fn build(cooc: CoOccurrence, weights: &MetcalfWeights) -> Self {
        let raw = raw_table(weights, &cooc);
        let met_rows = cooc
            .met_ids()
            .iter()
            .enumerate()
            .map(|(i, id)| (Arc::clone(id), i))
            .collect();
        let gcf_cols = cooc
            .gcf_ids()
            .iter()
            .enumerate()
            .map(|(j, id)| (Arc::clone(id), j))
            .collect();
        Self {
            cooc,
            raw,
            met_rows,
            gcf_cols,
        }
    }

    fn score(&self, i: usize, j: usize, model: Option<&NullModel>) -> f64 {
        let raw = self.raw[[i, j]];
        match model {
            Some(model) => {
                model.standardize(raw, self.cooc.met_counts()[i], self.cooc.gcf_counts()[j])
            }
            None => raw,
        }
    }
}

/// Weighted sum of the four co-occurrence tables.
fn raw_table(weights: &MetcalfWeights, cooc: &CoOccurrence) -> Array2<f64> {
    let both = cooc.both().mapv(f64::from);
    let met_only = cooc.met_only().mapv(f64::from);
    let gcf_only = cooc.gcf_only().mapv(f64::from);
    let neither = cooc.neither().mapv(f64::from);
    both * weights.both
        + met_only * weights.met_only
        + gcf_only * weights.gcf_only
        + neither * weights.neither
}

#[derive(Debug)]
struct ScorerTables {
    signature: DatasetSignature,
    occurrence: OccurrenceTables,
    spectra: Pairing,
    families: Pairing,
    null_model: Option<Arc<NullModel>>,
}

/// The Metcalf scoring method.
///
/// `setup()` builds the occurrence, co-occurrence and score tables for a
/// dataset snapshot (and the null model when standardization is on); only
/// then are link queries legal. The tables are immutable once built.
#[derive(Debug)]
pub struct MetcalfScorer {
    config: MetcalfConfig,
    cache: NullModelCache,
    tables: Option<ScorerTables>,
}

impl MetcalfScorer {
    /// Scorer with an in-memory null-model cache.
    pub fn new(config: MetcalfConfig) -> Self {
        Self {
            config,
            cache: NullModelCache::in_memory(),
            tables: None,
        }
    }

    /// Scorer persisting null-model tables under `dir`.
    pub fn with_cache_dir(config: MetcalfConfig, dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            config,
            cache: NullModelCache::with_dir(dir),
            tables: None,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &MetcalfConfig {
        &self.config
    }

    /// Occurrence tables of the current dataset, once set up.
    pub fn occurrence_tables(&self) -> Option<&OccurrenceTables> {
        self.tables.as_ref().map(|t| &t.occurrence)
    }

    /// Raw score table for a metabolomic kind, once set up.
    pub fn raw_scores(&self, kind: EntityKind) -> Result<&Array2<f64>, ScoringError> {
        let tables = self.ready()?;
        Ok(&self.pairing(tables, kind)?.raw)
    }

    /// Standardized score table for a metabolomic kind.
    ///
    /// Errors when the scorer is configured for raw scores and therefore
    /// built no null model.
    pub fn standardized_scores(&self, kind: EntityKind) -> Result<Array2<f64>, ScoringError> {
        let tables = self.ready()?;
        let model = tables
            .null_model
            .as_deref()
            .ok_or(ScoringError::StandardizationDisabled {
                method: METCALF_METHOD,
            })?;
        let pairing = self.pairing(tables, kind)?;
        let (rows, cols) = pairing.cooc.shape();
        Ok(Array2::from_shape_fn((rows, cols), |(i, j)| {
            pairing.score(i, j, Some(model))
        }))
    }

    fn ready(&self) -> Result<&ScorerTables, ScoringError> {
        self.tables.as_ref().ok_or(ScoringError::NotReady {
            method: METCALF_METHOD,
        })
    }

    fn pairing<'a>(
        &self,
        tables: &'a ScorerTables,
        kind: EntityKind,
    ) -> Result<&'a Pairing, ScoringError> {
        match kind {
            EntityKind::Spectrum => Ok(&tables.spectra),
            EntityKind::MolecularFamily => Ok(&tables.families),
            EntityKind::Gcf => Err(TableError::WrongTableKind {
                expected: "spectrum or molecular-family",
                actual: kind,
            }
            .into()),
        }
    }

    fn link_score(&self, value: f64) -> Score {
        let weights = self.config.weights;
        Score::new(METCALF_METHOD, value)
            .with_parameter("cutoff", format!("{}", self.config.cutoff))
            .with_parameter("standardized", format!("{}", self.config.standardized))
            .with_parameter(
                "weights",
                format!(
                    "({}, {}, {}, {})",
                    weights.both, weights.met_only, weights.gcf_only, weights.neither
                ),
            )
    }

    /// Links for a batch of metabolomic query objects of one kind.
    fn links_from_met(
        &self,
        tables: &ScorerTables,
        kind: EntityKind,
        objects: &[EntityRef],
        graph: &mut LinkGraph,
    ) -> Result<(), ScoringError> {
        let pairing = self.pairing(tables, kind)?;
        let model = tables.null_model.as_deref();
        for object in objects {
            let i = *pairing
                .met_rows
                .get(object.id())
                .ok_or_else(|| TableError::UnknownEntity {
                    kind,
                    id: object.id().to_string(),
                })?;
            for (j, gcf_id) in pairing.cooc.gcf_ids().iter().enumerate() {
                let value = pairing.score(i, j, model);
                if value >= self.config.cutoff {
                    let target = EntityRef::new(EntityKind::Gcf, Arc::clone(gcf_id));
                    graph.add_link(object.clone(), target, self.link_score(value))?;
                }
            }
        }
        Ok(())
    }

    /// Links for a batch of GCF query objects, against both metabolomic
    /// pairings.
    fn links_from_gcfs(
        &self,
        tables: &ScorerTables,
        objects: &[EntityRef],
        graph: &mut LinkGraph,
    ) -> Result<(), ScoringError> {
        let model = tables.null_model.as_deref();
        for object in objects {
            let mut found = false;
            for pairing in [&tables.spectra, &tables.families] {
                let Some(&j) = pairing.gcf_cols.get(object.id()) else {
                    continue;
                };
                found = true;
                for (i, met_id) in pairing.cooc.met_ids().iter().enumerate() {
                    let value = pairing.score(i, j, model);
                    if value >= self.config.cutoff {
                        let target =
                            EntityRef::new(pairing.cooc.met_kind(), Arc::clone(met_id));
                        graph.add_link(object.clone(), target, self.link_score(value))?;
                    }
                }
            }
            if !found {
                return Err(TableError::UnknownEntity {
                    kind: EntityKind::Gcf,
                    id: object.id().to_string(),
                }
                .into());
            }
        }
        Ok(())
    }
}

impl ScoringMethod for MetcalfScorer {
    fn name(&self) -> &'static str {
        METCALF_METHOD
    }

    fn setup(&mut self, dataset: &Dataset) -> Result<(), ScoringError> {
        let signature = dataset.signature();
        let occurrence = OccurrenceTables::build(dataset);

        let spectra = Pairing::build(
            CoOccurrence::compute(occurrence.spectra(), occurrence.gcfs())?,
            &self.config.weights,
        );
        let families = Pairing::build(
            CoOccurrence::compute(occurrence.families(), occurrence.gcfs())?,
            &self.config.weights,
        );

        let null_model = if self.config.standardized {
            Some(self.cache.get_or_build(signature, self.config.weights)?)
        } else {
            None
        };

        debug!(
            spectra = spectra.cooc.shape().0,
            families = families.cooc.shape().0,
            gcfs = spectra.cooc.shape().1,
            "built metcalf score tables"
        );
        info!(%signature, standardized = self.config.standardized, "metcalf scorer ready");

        self.tables = Some(ScorerTables {
            signature,
            occurrence,
            spectra,
            families,
            null_model,
        });
        Ok(())
    }

    fn get_links(&self, objects: &[EntityRef]) -> Result<LinkGraph, ScoringError> {
        let tables = self.ready()?;
        let kind = uniform_kind(objects)?;

        let mut graph = LinkGraph::new();
        match kind.side() {
            Side::Metabolomic => self.links_from_met(tables, kind, objects, &mut graph)?,
            Side::Genomic => self.links_from_gcfs(tables, objects, &mut graph)?,
        }
        debug!(
            signature = %tables.signature,
            queried = objects.len(),
            links = graph.link_count(),
            "metcalf link query complete"
        );
        Ok(graph)
    }

    fn format_data(&self, score: &Score) -> String {
        format!("{:.2}", score.value())
    }
}
