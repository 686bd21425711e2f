//! Scoring methods and their common contract
//!
//! Every scoring method plugs into link aggregation through
//! [`ScoringMethod`], whether it is the in-crate Metcalf scorer or an
//! external one such as a chemical-class or spectral-match scorer. The link
//! collection's AND/OR merge logic depends only on this trait, never on a
//! method's internals.

pub mod cache;
pub mod metcalf;
pub mod null_model;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::dataset::{Dataset, DatasetSignature};
use crate::entity::EntityRef;
use crate::link::{LinkData, LinkError, LinkGraph};
use crate::occurrence::TableError;
use crate::scoring::null_model::NullModelError;

/// One method's score for one link.
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    method: Arc<str>,
    value: f64,
    parameters: BTreeMap<String, String>,
}

impl Score {
    /// Create a score with no parameters.
    pub fn new(method: impl Into<Arc<str>>, value: f64) -> Self {
        Self {
            method: method.into(),
            value,
            parameters: BTreeMap::new(),
        }
    }

    /// Attach a method parameter (builder style).
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Name of the method that produced this score.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Score value in the method's configured units.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Method parameters recorded alongside the value.
    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={:.4}", self.method, self.value)
    }
}

/// Errors raised by scoring methods.
#[derive(Error, Debug)]
pub enum ScoringError {
    /// A query arrived before `setup()` ran.
    #[error("method `{method}` is not set up; call setup() before querying links")]
    NotReady {
        /// Name of the method queried too early.
        method: &'static str,
    },

    /// Standardized tables were requested from a raw-score configuration.
    #[error("method `{method}` is configured for raw scores; no standardized table exists")]
    StandardizationDisabled {
        /// Name of the method holding no null model.
        method: &'static str,
    },

    /// Structural table error (mixed batch, unknown entity, column mismatch).
    #[error(transparent)]
    Table(#[from] TableError),

    /// Link-graph insertion failed while assembling results.
    #[error(transparent)]
    Link(#[from] LinkError),

    /// The null-model tables could not be constructed.
    #[error("failed to build null model for dataset ({signature})")]
    NullModelConstruction {
        /// Size signature of the dataset that triggered the failure.
        signature: DatasetSignature,
        /// Underlying construction error.
        #[source]
        source: NullModelError,
    },
}

/// Contract every pluggable scoring method implements.
pub trait ScoringMethod {
    /// Unique method name, used as the key in per-link score maps.
    fn name(&self) -> &'static str;

    /// One-time initialization against a dataset snapshot.
    fn setup(&mut self, dataset: &Dataset) -> Result<(), ScoringError>;

    /// Compute links for a uniform-kind batch of query objects.
    fn get_links(&self, objects: &[EntityRef]) -> Result<LinkGraph, ScoringError>;

    /// Render one of this method's scores for human consumption.
    fn format_data(&self, score: &Score) -> String;

    /// Order edges by this method's score, best first; edges lacking this
    /// method's data go last in unspecified order.
    fn sort_links(&self, edges: &mut Vec<(EntityRef, EntityRef, LinkData)>) {
        let name = self.name();
        edges.sort_by(|(_, _, a), (_, _, b)| {
            match (a.get(name), b.get(name)) {
                (Some(x), Some(y)) => y.value().total_cmp(&x.value()),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
        });
    }
}
