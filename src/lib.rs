//! # Genome–metabolome link scoring
//!
//! This library links gene cluster families (GCFs) on the genomic side with
//! spectra and molecular families on the metabolomic side, by testing
//! whether they co-occur across a shared panel of strains more (or less)
//! often than chance.
//!
//! ## Pipeline
//!
//! 1. **Occurrence tables**: one binary strain-presence table per entity
//!    kind, over the registry's shared strain columns
//! 2. **Co-occurrence counts**: per pair, the four presence/absence
//!    combinations as matrix products
//! 3. **Metcalf scoring**: weighted raw score, standardized against an
//!    analytic hypergeometric null model (cached per dataset signature)
//! 4. **Link aggregation**: scored links collected into a bipartite graph,
//!    mergeable with other scoring methods under AND/OR semantics
//!
//! ## Usage Example
//!
//! ```ignore
//! use strainlink::{Dataset, MetcalfConfig, MetcalfScorer, ScoringMethod};
//!
//! let dataset = Dataset::new(registry, gcfs, spectra, families);
//! let mut scorer = MetcalfScorer::new(MetcalfConfig::default());
//! scorer.setup(&dataset)?;
//! let links = scorer.get_links(&queries)?;
//! ```
//!
//! File-format loaders, spectral similarity and chemical ontologies live in
//! collaborating crates; this one starts from loaded entities and ends at a
//! queryable link graph.

#![warn(missing_docs, missing_debug_implementations)]
#![allow(clippy::new_without_default)]

// Core modules - leaves first, aggregation last
pub mod strain;     // Canonical strain identities and the registry
pub mod entity;     // GCF / spectrum / molecular-family types
pub mod dataset;    // Dataset snapshot and size signature
pub mod occurrence; // Presence tables and co-occurrence counts
pub mod scoring;    // Scoring-method contract, Metcalf scorer, null model
pub mod link;       // Bipartite link graph and multi-method aggregation

// Re-exports for convenience
pub use dataset::{Dataset, DatasetSignature};
pub use entity::{EntityKind, EntityRef, Gcf, MolecularFamily, ScoredEntity, Side, Spectrum};
pub use link::{LinkCollection, LinkData, LinkError, LinkGraph, MergeMode};
pub use occurrence::{CoOccurrence, CommonStrains, OccurrenceTable, OccurrenceTables, TableError};
pub use scoring::metcalf::{MetcalfConfig, MetcalfScorer, MetcalfWeights, METCALF_METHOD};
pub use scoring::null_model::NullModel;
pub use scoring::{Score, ScoringError, ScoringMethod};
pub use strain::{Strain, StrainRegistry};
