//! Hypergeometric null model for the Metcalf score
//!
//! For a pair whose metabolomic entity occupies `n` of the `N` strains and
//! whose GCF occupies `m`, the overlap under random assortment is
//! hypergeometrically distributed. Enumerating every feasible overlap
//! `o ∈ [max(0, n+m−N), min(n, m)]` yields the analytic mean and variance of
//! the raw score, which standardizes raw scores into z-scores.
//!
//! The table covers all `(n, m)` with `0 ≤ n, m ≤ N`, so construction is
//! O(N²) pairs × O(N) overlaps. It is built once per `(dataset signature,
//! weight tuple)` and served from [`cache`](crate::scoring::cache)
//! thereafter.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use statrs::distribution::{Discrete, Hypergeometric};
use thiserror::Error;
use tracing::debug;

use crate::scoring::metcalf::MetcalfWeights;

/// Threshold below which a variance is treated as degenerate.
const VARIANCE_EPSILON: f64 = 1e-9;

/// Failure to parametrize the hypergeometric distribution.
#[derive(Error, Debug)]
#[error("hypergeometric parameters rejected at n={n}, m={m}, N={n_strains}: {message}")]
pub struct NullModelError {
    /// Metabolomic strain count of the failing cell.
    pub n: usize,
    /// GCF strain count of the failing cell.
    pub m: usize,
    /// Total strain count.
    pub n_strains: usize,
    /// Reason reported by the distribution.
    pub message: String,
}

/// Expectation and standard deviation of the raw score for every
/// `(n, m)` strain-count pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NullModel {
    n_strains: usize,
    weights: MetcalfWeights,
    mean: Array2<f64>,
    stddev: Array2<f64>,
}

impl NullModel {
    /// Build the full `(N+1) × (N+1)` expectation/variance tables.
    pub fn build(n_strains: usize, weights: MetcalfWeights) -> Result<Self, NullModelError> {
        let size = n_strains + 1;
        let mut mean = Array2::zeros((size, size));
        let mut stddev = Array2::zeros((size, size));

        for n in 0..size {
            for m in 0..size {
                let (e, sd) = cell(n, m, n_strains, &weights)?;
                mean[[n, m]] = e;
                stddev[[n, m]] = sd;
            }
        }

        debug!(n_strains, "built null-model expectation/variance tables");
        Ok(Self {
            n_strains,
            weights,
            mean,
            stddev,
        })
    }

    /// Total strain count the tables were built for.
    pub fn n_strains(&self) -> usize {
        self.n_strains
    }

    /// Weight tuple the tables were built with.
    pub fn weights(&self) -> MetcalfWeights {
        self.weights
    }

    /// Expected raw score for strain counts `(n, m)`.
    pub fn mean(&self, n: usize, m: usize) -> f64 {
        self.mean[[n, m]]
    }

    /// Standard deviation of the raw score for strain counts `(n, m)`.
    ///
    /// Degenerate cells (variance below `1e-9`, e.g. `n` or `m` equal to 0
    /// or `N`) report 1 so standardization stays finite; the z-score there
    /// equals the centered raw score.
    pub fn stddev(&self, n: usize, m: usize) -> f64 {
        self.stddev[[n, m]]
    }

    /// Standardize a raw score observed at strain counts `(n, m)`.
    pub fn standardize(&self, raw: f64, n: usize, m: usize) -> f64 {
        (raw - self.mean(n, m)) / self.stddev(n, m)
    }
}

/// Probability-weighted mean and stddev of the score over the overlap
/// support of one `(n, m)` cell.
fn cell(
    n: usize,
    m: usize,
    n_strains: usize,
    weights: &MetcalfWeights,
) -> Result<(f64, f64), NullModelError> {
    let dist = Hypergeometric::new(n_strains as u64, m as u64, n as u64).map_err(|err| {
        NullModelError {
            n,
            m,
            n_strains,
            message: err.to_string(),
        }
    })?;

    let lo = (n + m).saturating_sub(n_strains);
    let hi = n.min(m);

    let mut mass = 0.0;
    let mut expectation = 0.0;
    let mut expectation_sq = 0.0;
    for o in lo..=hi {
        let p = dist.pmf(o as u64);
        let score = weights.overlap_score(o, n, m, n_strains);
        mass += p;
        expectation += p * score;
        expectation_sq += p * score * score;
    }
    debug_assert!(
        (mass - 1.0).abs() < 1e-6,
        "pmf mass over the overlap support must sum to 1 (n={n}, m={m}, N={n_strains})"
    );

    let variance = expectation_sq - expectation * expectation;
    // Variance collapses when only one overlap is feasible; the clamp keeps
    // standardization finite at those boundary cells.
    let sd = if variance < VARIANCE_EPSILON {
        1.0
    } else {
        variance.sqrt()
    };
    Ok((expectation, sd))
}
