//! Kraft–Burrows–Nousek confidence intervals for Poisson source counts.
//!
//! [`bayes_rate`] returns the minimal-width interval `[smin, smax]` holding
//! posterior mass `conf` under the count posterior of
//! [`crate::math::CountPosterior`], together with the posterior mean.
//!
//! For a unimodal posterior the minimal-width interval is the equal-ordinate
//! one: the density takes the same value at both endpoints. Per Kraft,
//! Burrows & Nousek (1991) this is the variational definition used here, not
//! the equal-tail one; the two diverge for small `N`. When the equal-ordinate
//! solution would need `smin < 0` (the data are consistent with zero source
//! counts at this confidence), the search restarts in the one-sided
//! formulation and returns `[0, F⁻¹(conf)]`.
//!
//! Search structure (all bisection, see `math::root`):
//! - inner solve: given a candidate `smin`, find the matching `smax > mode`
//!   with equal log-density;
//! - outer solve: drive the enclosed mass `F(smax) - F(smin)` to `conf` by
//!   moving `smin` within `[0, mode]`.
//!
//! The enclosed probability mass is accurate to `MASS_TOL`; failure to
//! bracket or converge surfaces as `MergeError::Numerical`.

use serde::{Deserialize, Serialize};

use crate::error::{MergeError, MergeResult};
use crate::math::{bisect, CountPosterior};

/// Tolerance on enclosed probability mass.
pub const MASS_TOL: f64 = 1e-6;

/// Doubling cap while expanding an upper search bracket.
const MAX_EXPAND: usize = 300;

/// A source-count confidence interval with its posterior mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CountsInterval {
    /// Lower bound on source counts (0 when the data allow zero source).
    pub smin: f64,
    /// Upper bound on source counts.
    pub smax: f64,
    /// Posterior mean of the source counts.
    pub smean: f64,
}

/// Compute the KBN confidence interval and posterior mean for `n` measured
/// counts over expected background `b` at confidence level `conf`.
///
/// `conf` must lie strictly inside `(0, 1)`; `b` must be finite and
/// non-negative. The returned `smin` is exactly `0.0` whenever the
/// unconstrained lower bound would be negative, which is also the condition
/// under which the measurement is *not* a detection at this confidence.
pub fn bayes_rate(n: u64, b: f64, conf: f64) -> MergeResult<CountsInterval> {
    if !conf.is_finite() || conf <= 0.0 || conf >= 1.0 {
        return Err(MergeError::invalid(format!(
            "confidence level must lie in (0, 1), got {conf}"
        )));
    }

    let post = CountPosterior::new(n, b)?;
    let smean = post.mean();
    let mode = post.mode();

    // Monotone-decreasing posterior (N <= B): the shortest region of any
    // mass starts at zero.
    if mode <= 0.0 {
        let smax = upper_quantile(&post, conf)?;
        return Ok(CountsInterval { smin: 0.0, smax, smean });
    }

    // Mass of the widest admissible equal-ordinate interval, the one pinned
    // at smin = 0. With B = 0 the density vanishes at zero, so that interval
    // is the whole half-line and carries mass 1.
    let mass_at_zero = if b == 0.0 {
        1.0
    } else {
        post.cdf(match_density_above(&post, post.ln_density(0.0))?)
    };

    if mass_at_zero < conf {
        // Equal-ordinate endpoints would need smin < 0: clamp to one-sided.
        let smax = upper_quantile(&post, conf)?;
        return Ok(CountsInterval { smin: 0.0, smax, smean });
    }

    // Two-sided search. Enclosed mass shrinks monotonically as smin rises
    // toward the mode, so a single bisection on smin suffices. Inner solve
    // failures surface as NaN, which the bisection rejects.
    let enclosed = |smin: f64| -> f64 {
        let ln_f = post.ln_density(smin);
        match match_density_above(&post, ln_f) {
            Ok(smax) => post.cdf(smax) - post.cdf(smin) - conf,
            Err(_) => f64::NAN,
        }
    };
    // With B = 0 the log-density at exactly zero is -inf; start the bracket
    // a hair inside, where the enclosed mass is still ~1.
    let lo = if b == 0.0 { mode * 1e-12 } else { 0.0 };
    let smin = bisect(
        "interval lower bound",
        enclosed,
        lo,
        mode,
        1e-12 * (1.0 + mode),
        MASS_TOL * 1e-3,
    )?;
    let smax = match_density_above(&post, post.ln_density(smin))?;

    Ok(CountsInterval { smin, smax, smean })
}

/// Solve `F(s) = conf` for the one-sided upper bound.
fn upper_quantile(post: &CountPosterior, conf: f64) -> MergeResult<f64> {
    let hi = expand_until(post, |p, s| p.cdf(s) >= conf)?;
    bisect(
        "one-sided upper bound",
        |s| post.cdf(s) - conf,
        0.0,
        hi,
        1e-9 * (1.0 + hi),
        MASS_TOL * 1e-3,
    )
}

/// Find the point above the mode where the log-density equals `ln_target`.
fn match_density_above(post: &CountPosterior, ln_target: f64) -> MergeResult<f64> {
    let mode = post.mode();
    if post.ln_density(mode) <= ln_target {
        // The target is the peak itself (smin == mode); the interval has
        // degenerated to a point.
        return Ok(mode);
    }
    let hi = expand_until(post, |p, s| p.ln_density(s) < ln_target)?;
    bisect(
        "equal-ordinate upper endpoint",
        |s| post.ln_density(s) - ln_target,
        mode,
        hi,
        1e-9 * (1.0 + hi),
        1e-12,
    )
}

/// Double an upper bracket out from the mode until `done` holds.
fn expand_until(
    post: &CountPosterior,
    done: impl Fn(&CountPosterior, f64) -> bool,
) -> MergeResult<f64> {
    let mode = post.mode();
    // A few posterior widths past the mode covers the bulk of the mass for
    // any count scale; doubling handles the far tails.
    let mut hi = mode + 10.0 * (mode + post.b() + 1.0).sqrt() + 10.0;
    for _ in 0..MAX_EXPAND {
        if done(post, hi) {
            return Ok(hi);
        }
        hi *= 2.0;
    }
    Err(MergeError::numerical(format!(
        "failed to bracket the upper search bound for N={}, B={} (reached {hi})",
        post.n(),
        post.b()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reference values computed independently from the closed-form posterior
    /// (regularized incomplete gamma + Brent root-finding at 1e-13).
    const CASES: &[(u64, f64, f64, f64, f64, f64)] = &[
        // (n, b, conf, smin, smax, smean)
        (10, 0.0, 0.8427, 6.1414, 15.2111, 11.0),
        (10, 8.0, 0.9973, 0.0, 14.8174, 3.9733),
        (200, 5.0, 0.6827, 181.1833, 209.4839, 196.0),
        (200, 5.0, 0.9973, 155.5041, 240.4978, 196.0),
        (60, 3.0, 0.997, 36.8251, 83.0532, 58.0),
        (60, 3.0, 0.6827, 49.5737, 65.0947, 58.0),
        (5, 1.0, 0.9, 1.1324, 8.7141, 5.0031),
        (5, 1.0, 0.99, 0.1884, 12.2425, 5.0031),
        (3, 1.2, 0.997, 0.0, 10.4947, 2.9077),
        (3, 1.2, 0.6827, 0.4065, 3.8314, 2.9077),
        (1, 0.3, 0.9, 0.0, 3.6370, 1.7692),
    ];

    #[test]
    fn matches_reference_intervals() {
        for &(n, b, conf, smin, smax, smean) in CASES {
            let r = bayes_rate(n, b, conf).unwrap();
            assert!(
                (r.smin - smin).abs() < 2e-3,
                "N={n} B={b} conf={conf}: smin {} vs {smin}",
                r.smin
            );
            assert!(
                (r.smax - smax).abs() < 2e-3,
                "N={n} B={b} conf={conf}: smax {} vs {smax}",
                r.smax
            );
            assert!(
                (r.smean - smean).abs() < 1e-3,
                "N={n} B={b} conf={conf}: smean {} vs {smean}",
                r.smean
            );
        }
    }

    #[test]
    fn background_free_bound_matches_reference_table() {
        // Classical background-free cross-check from the docs.
        let r = bayes_rate(10, 0.0, 0.8427).unwrap();
        assert!((r.smax - 15.1).abs() < 0.2, "smax was {}", r.smax);
        assert!(r.smin > 0.0, "10 counts with no background is a detection");
    }

    #[test]
    fn zero_counts_lower_bound_is_zero() {
        for b in [0.0, 0.5, 2.0, 10.0] {
            for conf in [0.1, 0.6827, 0.9, 0.997] {
                let r = bayes_rate(0, b, conf).unwrap();
                assert_eq!(r.smin, 0.0, "b={b} conf={conf}");
                assert!(r.smax > 0.0);
            }
        }
    }

    #[test]
    fn zero_counts_zero_background_is_exponential() {
        // p(s) = e^-s, so the one-sided bound is -ln(1 - conf).
        let r = bayes_rate(0, 0.0, 0.95).unwrap();
        assert!((r.smax - 2.9957).abs() < 1e-3, "smax was {}", r.smax);
        assert!((r.smean - 1.0).abs() < 1e-6);
    }

    #[test]
    fn interval_widens_with_confidence() {
        let confs = [0.5, 0.6827, 0.9, 0.99, 0.9973];
        for &(n, b) in &[(10u64, 8.0), (200, 5.0), (5, 1.0), (0, 2.0)] {
            let mut prev: Option<CountsInterval> = None;
            for &conf in &confs {
                let r = bayes_rate(n, b, conf).unwrap();
                if let Some(p) = prev {
                    assert!(
                        r.smin <= p.smin + 1e-6,
                        "N={n} B={b}: smin rose with confidence"
                    );
                    assert!(
                        r.smax >= p.smax - 1e-6,
                        "N={n} B={b}: smax fell with confidence"
                    );
                }
                prev = Some(r);
            }
        }
    }

    #[test]
    fn enclosed_mass_is_accurate() {
        use crate::math::CountPosterior;
        for &(n, b, conf) in &[(10u64, 8.0, 0.9), (60, 3.0, 0.997), (5, 1.0, 0.6827)] {
            let r = bayes_rate(n, b, conf).unwrap();
            let post = CountPosterior::new(n, b).unwrap();
            let mass = post.cdf(r.smax) - post.cdf(r.smin);
            assert!(
                (mass - conf).abs() < 1e-5,
                "N={n} B={b} conf={conf}: enclosed mass {mass}"
            );
        }
    }

    #[test]
    fn equal_ordinate_endpoints() {
        // Where the interval is two-sided, the density matches at both ends.
        let post = crate::math::CountPosterior::new(60, 3.0).unwrap();
        let r = bayes_rate(60, 3.0, 0.9).unwrap();
        assert!(r.smin > 0.0);
        let d = post.ln_density(r.smin) - post.ln_density(r.smax);
        assert!(d.abs() < 1e-6, "log-density mismatch {d}");
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        for conf in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
            let err = bayes_rate(10, 1.0, conf).unwrap_err();
            assert!(matches!(err, MergeError::InvalidArgument(_)), "conf={conf}");
        }
    }

    #[test]
    fn rejects_bad_background() {
        assert!(matches!(
            bayes_rate(10, -2.0, 0.9),
            Err(MergeError::InvalidArgument(_))
        ));
        assert!(matches!(
            bayes_rate(10, f64::INFINITY, 0.9),
            Err(MergeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn large_counts_converge() {
        let r = bayes_rate(1_000_000, 2_000.0, 0.9973).unwrap();
        assert!(r.smin > 0.0 && r.smax > r.smin);
        // ~1e6 counts: interval roughly mean +/- 3 sigma.
        assert!((r.smean - 998_000.0).abs() < 10.0);
        assert!((r.smax - r.smin) < 8.0 * 1_000.0);
    }
}
