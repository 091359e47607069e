//! Statistical tests and multiple-testing corrections for enrichment
//!
//! - [`hypergeom`] tests the over-representation of a term in a study set
//! - [`rank`] computes the running-sum statistic of a ranked gene list
//! - [`Correction`] adjusts all p-values of one enrichment run
use std::fmt::Display;
use std::str::FromStr;

use crate::OntologyError;

pub mod hypergeom;
pub mod rank;

pub use hypergeom::{hypergeometric_probability, hypergeometric_test};
pub use rank::kolmogorov_smirnov_rank_test;

/// Multiple-testing correction methods
///
/// # Examples
///
/// ```
/// use goenrich::Correction;
///
/// let correction: Correction = "bonferroni".parse().unwrap();
/// assert_eq!(correction.apply(&[0.1, 0.3]), vec![0.2, 0.6]);
/// assert!("holm".parse::<Correction>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Correction {
    /// `p * n`, controls the family-wise error rate
    Bonferroni,
    /// Benjamini-Hochberg, controls the false discovery rate
    BhFdr,
}

impl Correction {
    /// The name used as key in the corrected p-value maps
    pub fn name(&self) -> &'static str {
        match self {
            Correction::Bonferroni => "bonferroni",
            Correction::BhFdr => "bh_fdr",
        }
    }

    /// Corrects all p-values, the output has the order of the input
    pub fn apply(&self, pvals: &[f64]) -> Vec<f64> {
        match self {
            Correction::Bonferroni => bonferroni_correction(pvals),
            Correction::BhFdr => bh_fdr_correction(pvals),
        }
    }
}

impl FromStr for Correction {
    type Err = OntologyError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bonferroni" => Ok(Correction::Bonferroni),
            "bh_fdr" => Ok(Correction::BhFdr),
            _ => Err(OntologyError::UnknownCorrection(s.to_string())),
        }
    }
}

impl Display for Correction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Bonferroni correction: `min(p * n, 1.0)`
pub fn bonferroni_correction(pvals: &[f64]) -> Vec<f64> {
    let n = f64_from_usize(pvals.len());
    pvals.iter().map(|p| (p * n).min(1.0)).collect()
}

/// Benjamini-Hochberg false discovery rate
///
/// Every p-value is scaled by `n / rank`, then the adjusted values are
/// made non-decreasing by a running maximum, starting at the most
/// significant p-value.
pub fn bh_fdr_correction(pvals: &[f64]) -> Vec<f64> {
    let n = pvals.len();
    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by(|&a, &b| pvals[a].total_cmp(&pvals[b]));

    let mut adjusted = vec![0.0; n];
    let mut prev = 0.0_f64;
    for (rank, idx) in indices.into_iter().enumerate() {
        let adj = (pvals[idx] * f64_from_usize(n) / f64_from_usize(rank + 1))
            .max(prev)
            .min(1.0);
        adjusted[idx] = adj;
        prev = adj;
    }
    adjusted
}

/// Counts are at most a few ten-thousands, well within `f64` precision
#[allow(clippy::cast_precision_loss)]
pub(crate) fn f64_from_usize(n: usize) -> f64 {
    n as f64
}
