//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - mutated in-memory during merges
//! - exported to JSON alongside the rest of a downloaded product
//! - reloaded later for re-binning or comparisons
//!
//! The central invariant lives here: a [`Dataset`] is tagged with a [`Kind`]
//! and every [`Bin`] it holds carries a [`Measurement`] of that same kind.
//! The bin storage is private and all mutation goes through checked methods,
//! so code outside this module cannot produce a mixed dataset.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MergeError, MergeResult};

/// Which measurement shape a dataset (or a single bin) carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    /// Bins report a measured rate with asymmetric errors.
    Detection,
    /// Bins report an upper bound on the rate with zero errors.
    UpperLimit,
}

/// The mutually-exclusive measurement fields of a bin.
///
/// A detection carries `(rate, rate_pos, rate_neg)` with `rate_pos > 0` and
/// `rate_neg < 0` (negative by convention); an upper limit carries a single
/// positive bound and implicitly `rate_pos = rate_neg = 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Measurement {
    /// A statistically significant rate measurement.
    Detection {
        /// Count rate after correction, in counts/s.
        rate: f64,
        /// Upper 1-sigma error on the rate (positive).
        rate_pos: f64,
        /// Lower 1-sigma error on the rate (negative).
        rate_neg: f64,
    },
    /// A bound on the rate at the configured confidence level.
    UpperLimit {
        /// The upper bound on the corrected count rate, in counts/s.
        limit: f64,
    },
}

impl Measurement {
    /// The [`Kind`] this measurement is shaped as.
    pub fn kind(&self) -> Kind {
        match self {
            Measurement::Detection { .. } => Kind::Detection,
            Measurement::UpperLimit { .. } => Kind::UpperLimit,
        }
    }

    /// Whether this measurement is an upper limit.
    pub fn is_upper_limit(&self) -> bool {
        matches!(self, Measurement::UpperLimit { .. })
    }
}

/// One time-indexed measurement in a light curve.
///
/// Time fields are mission-elapsed seconds (or any consistent time axis):
/// the bin spans `[time - time_neg, time + time_pos]` with both half-widths
/// non-negative. The count fields are the provenance of the measurement and
/// survive merging, so a merged bin can always be re-derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bin {
    /// Bin center on the time axis.
    pub time: f64,
    /// Half-width from the center to the upper bin edge.
    pub time_pos: f64,
    /// Half-width from the center to the lower bin edge.
    pub time_neg: f64,
    /// Measured counts in the source region.
    pub counts: u64,
    /// Expected background counts in the source region.
    pub background: f64,
    /// Multiplicative factor converting detector counts to incident counts.
    pub correction: f64,
    /// Accumulated exposure, in seconds.
    pub exposure: f64,
    /// The detection-or-limit payload.
    pub measurement: Measurement,
}

impl Bin {
    /// The [`Kind`] of this bin's measurement.
    pub fn kind(&self) -> Kind {
        self.measurement.kind()
    }

    /// Lower edge of the bin on the time axis.
    pub fn time_lo(&self) -> f64 {
        self.time - self.time_neg
    }

    /// Upper edge of the bin on the time axis.
    pub fn time_hi(&self) -> f64 {
        self.time + self.time_pos
    }
}

/// An ordered, time-ascending sequence of bins of a single [`Kind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    kind: Kind,
    bins: Vec<Bin>,
}

impl Dataset {
    /// Create an empty dataset of the given kind.
    pub fn new(kind: Kind) -> Self {
        Self { kind, bins: Vec::new() }
    }

    /// Build a dataset from bins, checking the kind of every bin.
    ///
    /// Bins are sorted by time center; the kind tag is immutable afterwards.
    pub fn from_bins(kind: Kind, mut bins: Vec<Bin>) -> MergeResult<Self> {
        for (i, bin) in bins.iter().enumerate() {
            if bin.kind() != kind {
                return Err(MergeError::invalid(format!(
                    "bin {i} has {:?}-shaped measurement, dataset kind is {kind:?}",
                    bin.kind()
                )));
            }
        }
        bins.sort_by(|a, b| a.time.total_cmp(&b.time));
        Ok(Self { kind, bins })
    }

    /// The immutable kind tag.
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// The bins, in ascending time order.
    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    /// Number of bins.
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// Whether the dataset has no bins.
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Sum of all bin exposures.
    pub fn total_exposure(&self) -> f64 {
        self.bins.iter().map(|b| b.exposure).sum()
    }

    /// Append a bin, checking its measurement shape against the dataset kind.
    ///
    /// The bin is placed at its time-ordered position, not at the end.
    pub fn push(&mut self, bin: Bin) -> MergeResult<()> {
        if bin.kind() != self.kind {
            return Err(MergeError::invalid(format!(
                "cannot push {:?}-shaped bin into {:?} dataset",
                bin.kind(),
                self.kind
            )));
        }
        self.insert_sorted(bin);
        Ok(())
    }

    /// Insert a bin at its time-ordered position.
    ///
    /// Callers must have checked the kind already; this is the commit step of
    /// a merge, where the kind is guaranteed by coercion or by policy.
    pub(crate) fn insert_sorted(&mut self, bin: Bin) {
        let at = self
            .bins
            .partition_point(|existing| existing.time <= bin.time);
        self.bins.insert(at, bin);
    }

    /// Remove the bins at the given sorted, deduplicated positions.
    ///
    /// Fails with a consistency error (and removes nothing) if any index is
    /// out of range.
    pub fn remove_sorted(&mut self, sorted_unique: &[usize]) -> MergeResult<()> {
        if let Some(&bad) = sorted_unique.iter().find(|&&i| i >= self.bins.len()) {
            return Err(MergeError::inconsistent(format!(
                "row {bad} is outside the dataset (len {})",
                self.bins.len()
            )));
        }
        // Walk back-to-front so earlier removals don't shift later indices.
        for &i in sorted_unique.iter().rev() {
            self.bins.remove(i);
        }
        Ok(())
    }
}

/// A named collection of datasets, e.g. `PC` and `PCUL`.
///
/// The calling context owns one of these per downloaded product; this crate
/// only ever mutates it in place on request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightCurve {
    datasets: BTreeMap<String, Dataset>,
}

impl LightCurve {
    /// Create an empty light curve.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a dataset by name.
    pub fn dataset(&self, name: &str) -> Option<&Dataset> {
        self.datasets.get(name)
    }

    /// Look up a dataset by name, mutably.
    pub fn dataset_mut(&mut self, name: &str) -> Option<&mut Dataset> {
        self.datasets.get_mut(name)
    }

    /// Add or replace a dataset under the given name.
    pub fn insert_dataset(&mut self, name: impl Into<String>, dataset: Dataset) {
        self.datasets.insert(name.into(), dataset);
    }

    /// Dataset names, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }
}

/// What to do with the merged bin after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertMode {
    /// Coerce the classification to the dataset's kind and commit the bin.
    AlwaysCoerce,
    /// Commit only if the natural classification matches the dataset's kind.
    InsertIfMatches,
    /// Never commit; the caller receives the bin only via the return value.
    NeverInsert,
}

/// An energy band of a catalogue-level upper-limit table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    /// Full energy range.
    Total,
    /// Soft band.
    Soft,
    /// Medium band.
    Medium,
    /// Hard band.
    Hard,
}

impl Band {
    /// All bands, in canonical order.
    pub const ALL: [Band; 4] = [Band::Total, Band::Soft, Band::Medium, Band::Hard];

    /// Lower-case band label as used in table columns.
    pub fn as_str(self) -> &'static str {
        match self {
            Band::Total => "total",
            Band::Soft => "soft",
            Band::Medium => "medium",
            Band::Hard => "hard",
        }
    }
}

impl FromStr for Band {
    type Err = MergeError;

    fn from_str(s: &str) -> MergeResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "total" => Ok(Band::Total),
            "soft" => Ok(Band::Soft),
            "medium" => Ok(Band::Medium),
            "hard" => Ok(Band::Hard),
            other => Err(MergeError::invalid(format!(
                "unknown band name {other:?} (expected total, soft, medium or hard)"
            ))),
        }
    }
}

/// The per-band count columns of one upper-limit table row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandColumns {
    /// Measured counts in the source region, this band.
    pub counts: u64,
    /// Expected background counts, this band.
    pub background: f64,
    /// Counts-to-incident correction factor, this band.
    pub correction: f64,
    /// Exposure, this band, in seconds.
    pub exposure: f64,
}

/// One selectable record of a catalogue-level upper-limit table.
///
/// Bands are independent and any of them may be absent for a given row
/// (different instruments or epochs cover different bands).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiBandRow {
    /// Full-range columns, if present.
    pub total: Option<BandColumns>,
    /// Soft-band columns, if present.
    pub soft: Option<BandColumns>,
    /// Medium-band columns, if present.
    pub medium: Option<BandColumns>,
    /// Hard-band columns, if present.
    pub hard: Option<BandColumns>,
}

impl MultiBandRow {
    /// The columns of the given band, if this row carries it.
    pub fn band(&self, band: Band) -> Option<&BandColumns> {
        match band {
            Band::Total => self.total.as_ref(),
            Band::Soft => self.soft.as_ref(),
            Band::Medium => self.medium.as_ref(),
            Band::Hard => self.hard.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limit_bin(time: f64) -> Bin {
        Bin {
            time,
            time_pos: 5.0,
            time_neg: 5.0,
            counts: 3,
            background: 1.0,
            correction: 1.1,
            exposure: 10.0,
            measurement: Measurement::UpperLimit { limit: 0.5 },
        }
    }

    #[test]
    fn dataset_rejects_mismatched_bin() {
        let mut ds = Dataset::new(Kind::Detection);
        let err = ds.push(limit_bin(0.0)).unwrap_err();
        assert!(matches!(err, MergeError::InvalidArgument(_)));
        assert!(ds.is_empty());
    }

    #[test]
    fn insert_keeps_time_order() {
        let mut ds = Dataset::new(Kind::UpperLimit);
        for t in [30.0, 10.0, 20.0] {
            ds.push(limit_bin(t)).unwrap();
        }
        let times: Vec<f64> = ds.bins().iter().map(|b| b.time).collect();
        assert_eq!(times, vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn remove_sorted_is_all_or_nothing() {
        let mut ds = Dataset::new(Kind::UpperLimit);
        for t in [10.0, 20.0, 30.0] {
            ds.push(limit_bin(t)).unwrap();
        }
        let err = ds.remove_sorted(&[1, 7]).unwrap_err();
        assert!(matches!(err, MergeError::Consistency(_)));
        assert_eq!(ds.len(), 3, "failed removal must not remove anything");

        ds.remove_sorted(&[0, 2]).unwrap();
        assert_eq!(ds.len(), 1);
        assert!((ds.bins()[0].time - 20.0).abs() < 1e-12);
    }

    #[test]
    fn band_parses_case_insensitively() {
        assert_eq!("Total".parse::<Band>().unwrap(), Band::Total);
        assert!("ultraviolet".parse::<Band>().is_err());
    }
}
