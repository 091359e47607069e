//! Two-tailed hypergeometric test
//!
//! The log-gamma approximation and the factorial cache are taken from
//! <https://github.com/statrs-dev/statrs>, which offers much more than the
//! probability mass function needed here.
#![allow(clippy::excessive_precision)]
#![allow(clippy::unreadable_literal)]

use std::cmp;

use crate::stats::f64_from_usize;

/// Auxiliary variable when evaluating the `ln_gamma` function
const GAMMA_R: f64 = 10.900_511;

/// Polynomial coefficients for approximating the `ln_gamma` function
const GAMMA_DK: &[f64] = &[
    2.48574089138753565546e-5,
    1.05142378581721974210,
    -3.45687097222016235469,
    4.51227709466894823700,
    -2.98285225323576655721,
    1.05639711577126713077,
    -1.95428773191645869583e-1,
    1.70970543404441224307e-2,
    -5.71926117404305781283e-4,
    4.63399473359905636708e-6,
    -2.71994908488607703910e-9,
];

/// Constant value for `ln(2 * sqrt(e / pi))`
const LN_2_SQRT_E_OVER_PI: f64 = 0.6207822376352452223455184457816472122518527279025978;

/// Constant value for `ln(pi)`
const LN_PI: f64 = 1.1447298858494001741434273513530587116472948129153;

/// The maximum factorial representable by a 64-bit float
const MAX_FACTORIAL: usize = 170;

/// Probabilities within this distance of `P(k)` count as equally extreme
const EPSILON: f64 = 1e-10;

// 0!...170!
#[allow(clippy::cast_precision_loss)]
const FCACHE: [f64; MAX_FACTORIAL + 1] = {
    let mut fcache = [1.0; MAX_FACTORIAL + 1];

    let mut i = 1;
    while i < MAX_FACTORIAL + 1 {
        fcache[i] = fcache[i - 1] * i as f64;

        i += 1;
    }
    fcache
};

/// Computes the logarithm of the gamma function
/// with an accuracy of 16 floating point digits.
/// The implementation is derived from
/// "An Analysis of the Lanczos Gamma Approximation",
/// Glendon Ralph Pugh, 2004 p. 116
fn ln_gamma(x: f64) -> f64 {
    if x < 0.5 {
        let s = GAMMA_DK
            .iter()
            .enumerate()
            .skip(1)
            .fold(GAMMA_DK[0], |s, t| s + t.1 / (f64_from_usize(t.0) - x));

        LN_PI
            - (std::f64::consts::PI * x).sin().ln()
            - s.ln()
            - LN_2_SQRT_E_OVER_PI
            - (0.5 - x) * ((0.5 - x + GAMMA_R) / std::f64::consts::E).ln()
    } else {
        let s = GAMMA_DK
            .iter()
            .enumerate()
            .skip(1)
            .fold(GAMMA_DK[0], |s, t| {
                s + t.1 / (x + f64_from_usize(t.0) - 1.0)
            });

        s.ln() + LN_2_SQRT_E_OVER_PI + (x - 0.5) * ((x - 0.5 + GAMMA_R) / std::f64::consts::E).ln()
    }
}

/// Computes `ln(x!)`, exact up to `170!` and approximated above
pub fn ln_factorial(x: usize) -> f64 {
    FCACHE
        .get(x)
        .map_or_else(|| ln_gamma(f64_from_usize(x) + 1.0), |&fac| fac.ln())
}

/// Computes `ln(n choose k)`
///
/// Returns `f64::NEG_INFINITY` if `k > n`
pub fn ln_combination(n: usize, k: usize) -> f64 {
    if k > n {
        f64::NEG_INFINITY
    } else {
        ln_factorial(n) - ln_factorial(k) - ln_factorial(n - k)
    }
}

/// Probability of `k` successes in `n` draws without replacement from a
/// population of size `population` that contains `successes` successes
///
/// Returns `0.0` for impossible configurations.
pub fn hypergeometric_probability(k: usize, n: usize, successes: usize, population: usize) -> f64 {
    if n > population || successes > population || k > n || k > successes {
        return 0.0;
    }
    (ln_combination(successes, k) + ln_combination(population - successes, n - k)
        - ln_combination(population, n))
    .exp()
}

/// Two-tailed hypergeometric test
///
/// Sums the probabilities of all feasible outcomes that are not more
/// likely than observing `k`. If only one outcome is feasible, the
/// p-value is `1.0`.
///
/// # Examples
///
/// ```
/// use goenrich::stats::hypergeometric_test;
///
/// // 4 of 5 study genes carry a term that 10 of 100 genes carry
/// let p = hypergeometric_test(4, 5, 10, 100);
/// assert!(p < 0.001);
///
/// // all genes carry the term
/// assert_eq!(hypergeometric_test(2, 2, 2, 2), 1.0);
/// ```
pub fn hypergeometric_test(k: usize, n: usize, successes: usize, population: usize) -> f64 {
    let upper = cmp::min(n, successes);
    let lower = (n + successes).saturating_sub(population);
    if upper <= lower {
        return 1.0;
    }

    let threshold = hypergeometric_probability(k, n, successes, population) + EPSILON;
    let two_tail: f64 = (lower..=upper)
        .map(|i| hypergeometric_probability(i, n, successes, population))
        .filter(|p| *p < threshold)
        .sum();
    two_tail.min(1.0)
}
