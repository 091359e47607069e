//! Running-sum statistic of a ranked gene list
use std::collections::HashSet;
use std::hash::Hash;

use crate::stats::f64_from_usize;

/// Weighted Kolmogorov-Smirnov running sum over a ranked gene list
///
/// Walks `gene_list` in the given order. A gene of `gene_set` increases
/// the running sum by `|corr|^p / Σ|corr|^p` of all set genes in the list,
/// every other gene decreases it by `1 / (N - hits)`.
///
/// Returns the extreme value of the running sum (the positive one if both
/// extremes have the same magnitude) and the running sum after each gene.
///
/// `gene_corr` must have the same length as `gene_list`. Genes of the set
/// that are not in the list are ignored.
///
/// # Examples
///
/// ```
/// use std::collections::HashSet;
/// use goenrich::stats::kolmogorov_smirnov_rank_test;
///
/// let genes = ["a", "b", "c", "d"];
/// let corr = [0.4, 0.3, -0.1, -0.2];
/// let set: HashSet<&str> = ["a", "b"].into_iter().collect();
///
/// let (score, plot) = kolmogorov_smirnov_rank_test(&set, &genes, &corr, 1.0);
/// assert!((score - 1.0).abs() < 1e-12);
/// assert_eq!(plot.len(), 4);
/// ```
pub fn kolmogorov_smirnov_rank_test<T: Eq + Hash>(
    gene_set: &HashSet<T>,
    gene_list: &[T],
    gene_corr: &[f64],
    p: f64,
) -> (f64, Vec<f64>) {
    let weights: Vec<Option<f64>> = gene_list
        .iter()
        .zip(gene_corr)
        .map(|(gene, corr)| gene_set.contains(gene).then(|| corr.abs().powf(p)))
        .collect();

    let hits = weights.iter().filter(|w| w.is_some()).count();
    if hits == 0 {
        return (0.0, vec![0.0; weights.len()]);
    }
    let weight_sum: f64 = weights.iter().flatten().sum();
    let misses = weights.len() - hits;
    let miss_step = if misses > 0 {
        1.0 / f64_from_usize(misses)
    } else {
        0.0
    };

    let mut running = 0.0;
    let mut max_pos = 0.0_f64;
    let mut max_neg = 0.0_f64;
    let plot: Vec<f64> = weights
        .iter()
        .map(|weight| {
            running += match weight {
                Some(w) if weight_sum > 0.0 => w / weight_sum,
                Some(_) => 1.0 / f64_from_usize(hits),
                None => -miss_step,
            };
            max_pos = max_pos.max(running);
            max_neg = max_neg.min(running);
            running
        })
        .collect();

    let statistic = if max_pos >= -max_neg { max_pos } else { max_neg };
    (statistic, plot)
}
