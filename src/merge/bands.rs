//! Merging catalogue-level upper-limit tables, band by band.
//!
//! Each energy band is aggregated and classified independently with no force
//! flags and no single-kind invariant: the result is a per-band record, not
//! a dataset mutation. A requested band that none of the selected rows carry
//! is skipped silently: different instruments and epochs cover different
//! bands, and a partial table is normal, not an error.
//!
//! Every reported band carries the upper limit at the requested confidence,
//! whether or not it is also detected; rate fields are optional extras
//! controlled by `detections_as_rates`.

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::bayes::bayes_rate;
use crate::domain::{Band, MultiBandRow};
use crate::error::MergeResult;
use crate::merge::aggregate::{aggregate_band, Selection};
use crate::merge::classify::{counts_to_rate, DEFAULT_UL_CONF, RATE_CONF};

/// Which bands to merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BandSelection {
    /// Every band present in the selected rows.
    All,
    /// An explicit list of bands.
    Bands(Vec<Band>),
}

impl BandSelection {
    fn bands(&self) -> &[Band] {
        match self {
            BandSelection::All => &Band::ALL,
            BandSelection::Bands(bands) => bands,
        }
    }
}

/// Parameters of a multi-band merge.
#[derive(Debug, Clone, PartialEq)]
pub struct BandOptions {
    /// Also report rate fields for detected bands.
    pub detections_as_rates: bool,
    /// Which bands to merge.
    pub bands: BandSelection,
    /// Confidence level of the reported upper limits.
    pub conf: f64,
    /// Detection threshold; defaults to `conf`.
    pub det_thresh: Option<f64>,
}

impl Default for BandOptions {
    fn default() -> Self {
        Self {
            detections_as_rates: false,
            bands: BandSelection::All,
            conf: DEFAULT_UL_CONF,
            det_thresh: None,
        }
    }
}

/// Rate fields reported when `detections_as_rates` is set.
///
/// For a band that is not detected the rates are NaN sentinels and
/// `is_detected` is false.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandRates {
    /// Corrected count rate, counts/s; NaN if not detected.
    pub rate: f64,
    /// Upper 1-sigma error; NaN if not detected.
    pub rate_pos: f64,
    /// Lower 1-sigma error (negative); NaN if not detected.
    pub rate_neg: f64,
    /// Whether the band met the detection threshold.
    pub is_detected: bool,
}

/// The merged record of one band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandLimit {
    /// Upper limit on the corrected count rate at the requested confidence.
    pub upper_limit: f64,
    /// Total measured counts over the contributing rows.
    pub counts: u64,
    /// Total expected background counts.
    pub bg_counts: f64,
    /// Exposure-weighted correction factor.
    pub correction_factor: f64,
    /// Rate fields; present only when `detections_as_rates` was requested.
    pub rates: Option<BandRates>,
}

/// Merge the selected rows of an upper-limit table, independently per band.
///
/// Returns one [`BandLimit`] per requested band that at least one selected
/// row carries.
pub fn merge_upper_limits(
    rows: &[MultiBandRow],
    selection: &[usize],
    opts: &BandOptions,
) -> MergeResult<BTreeMap<Band, BandLimit>> {
    let selection = Selection::resolve(selection, rows.len())?;
    let det_thresh = opts.det_thresh.unwrap_or(opts.conf);

    let mut out = BTreeMap::new();
    for &band in opts.bands.bands() {
        let Some(totals) = aggregate_band(rows, &selection, band)? else {
            debug!("merge_upper_limits: no selected row carries {}, skipped", band.as_str());
            continue;
        };

        let ul = bayes_rate(totals.counts, totals.background, opts.conf)?;
        let upper_limit = counts_to_rate(ul.smax, totals.correction, totals.exposure);

        let rates = if opts.detections_as_rates {
            let probe = bayes_rate(totals.counts, totals.background, det_thresh)?;
            if probe.smin > 0.0 {
                let r = bayes_rate(totals.counts, totals.background, RATE_CONF)?;
                Some(BandRates {
                    rate: counts_to_rate(r.smean, totals.correction, totals.exposure),
                    rate_pos: counts_to_rate(r.smax - r.smean, totals.correction, totals.exposure),
                    rate_neg: counts_to_rate(r.smin - r.smean, totals.correction, totals.exposure),
                    is_detected: true,
                })
            } else {
                Some(BandRates {
                    rate: f64::NAN,
                    rate_pos: f64::NAN,
                    rate_neg: f64::NAN,
                    is_detected: false,
                })
            }
        } else {
            None
        };

        debug!(
            "merge_upper_limits: {} N={} B={} ul={upper_limit}",
            band.as_str(),
            totals.counts,
            totals.background
        );
        out.insert(
            band,
            BandLimit {
                upper_limit,
                counts: totals.counts,
                bg_counts: totals.background,
                correction_factor: totals.correction,
                rates,
            },
        );
    }
    Ok(out)
}
