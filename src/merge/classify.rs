//! Detection/upper-limit classification of aggregated counts.
//!
//! The decision rule, in priority order:
//!
//! 1. `force_ul` set: report an upper limit regardless of significance.
//! 2. `force_rate` set: report a detection regardless of significance.
//! 3. Otherwise ask [`bayes_rate`] at the detection threshold: the
//!    measurement is a detection iff the lower confidence bound on source
//!    counts is strictly positive.
//!
//! Rates are detector counts scaled to incident counts per second:
//! `rate = S · correction / exposure`.

use log::debug;

use crate::bayes::bayes_rate;
use crate::domain::Measurement;
use crate::error::{MergeError, MergeResult};
use crate::merge::aggregate::CountTotals;

/// Default confidence level for reported upper limits (about 3 sigma).
pub const DEFAULT_UL_CONF: f64 = 0.997;

/// Confidence level of detection error bars (1 sigma).
pub const RATE_CONF: f64 = 0.6827;

/// Classification parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifyOptions {
    /// Confidence level used to decide detection; defaults to `ul_conf`.
    pub det_thresh: Option<f64>,
    /// Confidence level of a reported upper limit.
    pub ul_conf: f64,
    /// Force classification as a detection.
    pub force_rate: bool,
    /// Force classification as an upper limit.
    pub force_ul: bool,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self {
            det_thresh: None,
            ul_conf: DEFAULT_UL_CONF,
            force_rate: false,
            force_ul: false,
        }
    }
}

/// Convert source counts to a corrected count rate.
pub fn counts_to_rate(counts: f64, correction: f64, exposure: f64) -> f64 {
    counts * correction / exposure
}

/// Classify aggregated totals and build the measurement fields.
///
/// Pure and side-effect-free: the caller decides what to do with the result.
pub fn classify(totals: &CountTotals, opts: &ClassifyOptions) -> MergeResult<Measurement> {
    if opts.force_rate && opts.force_ul {
        return Err(MergeError::invalid(
            "force_rate and force_ul are mutually exclusive",
        ));
    }

    let detected = if opts.force_ul {
        false
    } else if opts.force_rate {
        true
    } else {
        let det_thresh = opts.det_thresh.unwrap_or(opts.ul_conf);
        let probe = bayes_rate(totals.counts, totals.background, det_thresh)?;
        debug!(
            "classify: N={} B={} det_thresh={det_thresh} -> smin={}",
            totals.counts, totals.background, probe.smin
        );
        probe.smin > 0.0
    };

    if detected {
        let r = bayes_rate(totals.counts, totals.background, RATE_CONF)?;
        Ok(Measurement::Detection {
            rate: counts_to_rate(r.smean, totals.correction, totals.exposure),
            rate_pos: counts_to_rate(r.smax - r.smean, totals.correction, totals.exposure),
            rate_neg: counts_to_rate(r.smin - r.smean, totals.correction, totals.exposure),
        })
    } else {
        let r = bayes_rate(totals.counts, totals.background, opts.ul_conf)?;
        Ok(Measurement::UpperLimit {
            limit: counts_to_rate(r.smax, totals.correction, totals.exposure),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(counts: u64, background: f64) -> CountTotals {
        CountTotals {
            counts,
            background,
            exposure: 1000.0,
            correction: 1.1,
        }
    }

    #[test]
    fn faint_counts_become_an_upper_limit() {
        // 10 counts over an expected background of 8 is not significant at 3 sigma.
        let opts = ClassifyOptions {
            det_thresh: Some(0.9973),
            ..Default::default()
        };
        let m = classify(&totals(10, 8.0), &opts).unwrap();
        match m {
            Measurement::UpperLimit { limit } => assert!(limit > 0.0),
            other => panic!("expected upper limit, got {other:?}"),
        }
    }

    #[test]
    fn bright_counts_become_a_detection() {
        let opts = ClassifyOptions {
            det_thresh: Some(0.9973),
            ..Default::default()
        };
        let m = classify(&totals(200, 5.0), &opts).unwrap();
        match m {
            Measurement::Detection { rate, rate_pos, rate_neg } => {
                assert!(rate > 0.0);
                assert!(rate_pos > 0.0, "rate_pos = {rate_pos}");
                assert!(rate_neg < 0.0, "rate_neg = {rate_neg}");
                // smean = 196 source counts over 1000 s at correction 1.1.
                assert!((rate - 196.0 * 1.1 / 1000.0).abs() < 1e-3);
            }
            other => panic!("expected detection, got {other:?}"),
        }
    }

    #[test]
    fn force_flags_override_significance() {
        let bright = totals(200, 5.0);
        let forced_ul = classify(
            &bright,
            &ClassifyOptions { force_ul: true, ..Default::default() },
        )
        .unwrap();
        assert!(forced_ul.is_upper_limit());

        let faint = totals(2, 5.0);
        let forced_rate = classify(
            &faint,
            &ClassifyOptions { force_rate: true, ..Default::default() },
        )
        .unwrap();
        assert!(!forced_rate.is_upper_limit());
    }

    #[test]
    fn both_force_flags_is_an_error() {
        let opts = ClassifyOptions {
            force_rate: true,
            force_ul: true,
            ..Default::default()
        };
        assert!(matches!(
            classify(&totals(5, 1.0), &opts),
            Err(MergeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn det_thresh_defaults_to_ul_conf() {
        // N=10, B=8 has mass-at-zero ~0.61: detected at 50%, limit at 99.7%.
        let lax = ClassifyOptions {
            ul_conf: 0.5,
            ..Default::default()
        };
        assert!(!classify(&totals(10, 8.0), &lax).unwrap().is_upper_limit());

        let strict = ClassifyOptions::default();
        assert!(classify(&totals(10, 8.0), &strict).unwrap().is_upper_limit());
    }
}
