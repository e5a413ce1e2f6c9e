//! Synthetic light-curve generation.
//!
//! Produces Poisson-faithful datasets for tests and downstream fixtures: a
//! constant true source rate observed through evenly spaced bins, with known
//! background and a flat correction factor. Generation is seeded and fully
//! deterministic, so statistical tests can assert exact outcomes.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Poisson;

use crate::domain::{Bin, Dataset, Kind};
use crate::error::{MergeError, MergeResult};
use crate::merge::aggregate::CountTotals;
use crate::merge::classify::{classify, ClassifyOptions};

/// Configuration for synthetic light-curve generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthConfig {
    /// Number of bins to generate.
    pub bins: usize,
    /// Time of the first bin center, seconds.
    pub start_time: f64,
    /// Full width of each bin, seconds.
    pub bin_width: f64,
    /// Fraction of each bin actually exposed, in (0, 1].
    pub exposure_fraction: f64,
    /// True incident source rate, counts/s.
    pub source_rate: f64,
    /// Background rate in the source region, detector counts/s.
    pub background_rate: f64,
    /// Counts-to-incident correction factor.
    pub correction: f64,
    /// RNG seed; equal seeds give equal datasets.
    pub seed: u64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            bins: 20,
            start_time: 0.0,
            bin_width: 1000.0,
            exposure_fraction: 0.9,
            source_rate: 0.05,
            background_rate: 0.002,
            correction: 1.1,
            seed: 42,
        }
    }
}

/// Generate a synthetic dataset of the given kind.
///
/// Counts are drawn per bin from a Poisson over the expected detector counts
/// (source attenuated by the correction factor, plus background); each bin's
/// measurement fields are then built by the real classifier, forced to
/// `kind` so the dataset invariant holds by construction.
pub fn generate_light_curve(kind: Kind, config: &SynthConfig) -> MergeResult<Dataset> {
    if config.bins == 0 {
        return Err(MergeError::invalid("bin count must be > 0"));
    }
    if !(config.bin_width.is_finite() && config.bin_width > 0.0) {
        return Err(MergeError::invalid(format!(
            "bin width must be positive, got {}",
            config.bin_width
        )));
    }
    if !(config.exposure_fraction > 0.0 && config.exposure_fraction <= 1.0) {
        return Err(MergeError::invalid(format!(
            "exposure fraction must lie in (0, 1], got {}",
            config.exposure_fraction
        )));
    }
    if !(config.source_rate.is_finite() && config.source_rate >= 0.0)
        || !(config.background_rate.is_finite() && config.background_rate >= 0.0)
    {
        return Err(MergeError::invalid(
            "source and background rates must be finite and >= 0",
        ));
    }
    if !(config.correction.is_finite() && config.correction > 0.0) {
        return Err(MergeError::invalid(format!(
            "correction factor must be positive, got {}",
            config.correction
        )));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let exposure = config.bin_width * config.exposure_fraction;
    let expected_source = config.source_rate * exposure / config.correction;
    let expected_background = config.background_rate * exposure;
    let lambda = expected_source + expected_background;

    let classify_opts = ClassifyOptions {
        force_rate: kind == Kind::Detection,
        force_ul: kind == Kind::UpperLimit,
        ..Default::default()
    };

    let poisson = if lambda > 0.0 {
        Some(Poisson::new(lambda).map_err(|e| {
            MergeError::invalid(format!("bad Poisson mean {lambda}: {e}"))
        })?)
    } else {
        None
    };

    let mut bins = Vec::with_capacity(config.bins);
    for i in 0..config.bins {
        let counts = match poisson {
            Some(p) => {
                let draw: f64 = rng.sample(p);
                draw as u64
            }
            None => 0,
        };

        let totals = CountTotals {
            counts,
            background: expected_background,
            exposure,
            correction: config.correction,
        };
        let measurement = classify(&totals, &classify_opts)?;

        bins.push(Bin {
            time: config.start_time + config.bin_width * (i as f64 + 0.5),
            time_pos: config.bin_width / 2.0,
            time_neg: config.bin_width / 2.0,
            counts,
            background: expected_background,
            correction: config.correction,
            exposure,
            measurement,
        });
    }

    Dataset::from_bins(kind, bins)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_deterministic() {
        let config = SynthConfig::default();
        let a = generate_light_curve(Kind::Detection, &config).unwrap();
        let b = generate_light_curve(Kind::Detection, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn counts_track_the_true_rate() {
        let config = SynthConfig {
            bins: 200,
            source_rate: 0.05,
            background_rate: 0.0,
            ..Default::default()
        };
        let ds = generate_light_curve(Kind::Detection, &config).unwrap();
        let total: u64 = ds.bins().iter().map(|b| b.counts).sum();
        // Expected detector counts: 200 bins * 900 s * 0.05 / 1.1 ~ 8182.
        let expected: f64 = 200.0 * 900.0 * 0.05 / 1.1;
        let sigma = expected.sqrt();
        assert!(
            ((total as f64) - expected).abs() < 5.0 * sigma,
            "total {total} vs expected {expected}"
        );
    }

    #[test]
    fn generated_bins_match_requested_kind() {
        let config = SynthConfig::default();
        for kind in [Kind::Detection, Kind::UpperLimit] {
            let ds = generate_light_curve(kind, &config).unwrap();
            assert_eq!(ds.len(), config.bins);
            assert!(ds.bins().iter().all(|b| b.kind() == kind));
        }
    }

    #[test]
    fn bright_source_merges_to_a_detection() {
        use crate::merge::lightcurve::{merge_bins, MergeOptions};

        let config = SynthConfig {
            bins: 10,
            source_rate: 0.1,
            background_rate: 0.001,
            ..Default::default()
        };
        let mut ds = generate_light_curve(Kind::Detection, &config).unwrap();
        let all: Vec<usize> = (0..ds.len()).collect();
        let opts = MergeOptions {
            det_thresh: Some(0.9973),
            ..Default::default()
        };
        let out = merge_bins(&mut ds, &all, &opts).unwrap();
        assert!(!out.is_upper_limit, "a 0.1 ct/s source over 9 ks is a detection");
    }

    #[test]
    fn empty_source_merges_to_an_upper_limit() {
        use crate::merge::lightcurve::{merge_bins, MergeOptions};

        let config = SynthConfig {
            bins: 10,
            source_rate: 0.0,
            background_rate: 0.0005,
            ..Default::default()
        };
        let mut ds = generate_light_curve(Kind::UpperLimit, &config).unwrap();
        let all: Vec<usize> = (0..ds.len()).collect();
        let opts = MergeOptions {
            det_thresh: Some(0.9973),
            ..Default::default()
        };
        let out = merge_bins(&mut ds, &all, &opts).unwrap();
        assert!(out.is_upper_limit, "no source flux must not be a detection");
        assert!(matches!(out.bin.measurement, crate::domain::Measurement::UpperLimit { .. }));
    }

    #[test]
    fn rejects_bad_config() {
        let bad = SynthConfig { bins: 0, ..Default::default() };
        assert!(generate_light_curve(Kind::Detection, &bad).is_err());
        let bad = SynthConfig { exposure_fraction: 0.0, ..Default::default() };
        assert!(generate_light_curve(Kind::Detection, &bad).is_err());
        let bad = SynthConfig { source_rate: -1.0, ..Default::default() };
        assert!(generate_light_curve(Kind::Detection, &bad).is_err());
    }
}
