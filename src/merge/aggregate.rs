//! Row selection and raw aggregation.
//!
//! Merging starts from an explicit set of row indices (never an implicit
//! predicate), validated against the table it is applied to. Aggregation then
//! sums the countable quantities exactly:
//!
//! - counts as an integer sum (no floating error)
//! - background and exposure as plain sums
//! - the correction factor weighted by exposure
//! - the merged time interval spanning all selected bins
//!
//! No classification happens here; the output is raw material for the
//! classifier.

use serde::{Deserialize, Serialize};

use crate::domain::{Band, Bin, MultiBandRow};
use crate::error::{MergeError, MergeResult};

/// A validated, deduplicated row selection.
///
/// Indices are stored sorted and unique; duplicates in the input collapse
/// (the selection is a set). The selection remembers the table length it was
/// resolved against so later use against a differently-sized table is caught.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    indices: Vec<usize>,
    table_len: usize,
}

impl Selection {
    /// Validate `indices` against a table of `table_len` rows.
    ///
    /// Fails with `InvalidArgument` on an empty selection and with
    /// `Consistency` on any out-of-range index.
    pub fn resolve(indices: &[usize], table_len: usize) -> MergeResult<Self> {
        if indices.is_empty() {
            return Err(MergeError::invalid(
                "row selection is empty; select at least one row to merge",
            ));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i >= table_len) {
            return Err(MergeError::inconsistent(format!(
                "selected row {bad} is not in the table (table has {table_len} rows)"
            )));
        }
        let mut sorted: Vec<usize> = indices.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        Ok(Self { indices: sorted, table_len })
    }

    /// The sorted, unique indices.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Number of distinct selected rows.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Always false: a resolved selection holds at least one row.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    fn check_table(&self, len: usize, what: &str) -> MergeResult<()> {
        if len != self.table_len {
            return Err(MergeError::inconsistent(format!(
                "selection was resolved against {} rows but {what} has {len}",
                self.table_len
            )));
        }
        Ok(())
    }
}

/// Exact sums of the countable columns over a selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CountTotals {
    /// Total measured counts (exact integer sum).
    pub counts: u64,
    /// Total expected background counts.
    pub background: f64,
    /// Total exposure, seconds.
    pub exposure: f64,
    /// Exposure-weighted mean correction factor.
    pub correction: f64,
}

/// The merged time interval, as a center and two half-widths.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSpan {
    /// Center of the merged interval.
    pub time: f64,
    /// Half-width up to the latest selected bin edge.
    pub time_pos: f64,
    /// Half-width down to the earliest selected bin edge.
    pub time_neg: f64,
}

/// Aggregate the selected bins of a light-curve dataset.
pub fn aggregate_bins(bins: &[Bin], selection: &Selection) -> MergeResult<(CountTotals, TimeSpan)> {
    selection.check_table(bins.len(), "the dataset")?;

    let mut counts: u64 = 0;
    let mut background = 0.0;
    let mut exposure = 0.0;
    let mut weighted_correction = 0.0;
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;

    for &i in selection.indices() {
        let bin = &bins[i];
        counts += bin.counts;
        background += bin.background;
        exposure += bin.exposure;
        weighted_correction += bin.correction * bin.exposure;
        lo = lo.min(bin.time_lo());
        hi = hi.max(bin.time_hi());
    }

    let totals = finish_totals(counts, background, exposure, weighted_correction, "dataset")?;
    let time = 0.5 * (lo + hi);
    let span = TimeSpan {
        time,
        time_pos: hi - time,
        time_neg: time - lo,
    };
    Ok((totals, span))
}

/// Aggregate one band of a multi-band upper-limit table.
///
/// Only the selected rows that carry the band contribute; returns `None`
/// when none of them do (the caller skips the band).
pub fn aggregate_band(
    rows: &[MultiBandRow],
    selection: &Selection,
    band: Band,
) -> MergeResult<Option<CountTotals>> {
    selection.check_table(rows.len(), "the table")?;

    let mut counts: u64 = 0;
    let mut background = 0.0;
    let mut exposure = 0.0;
    let mut weighted_correction = 0.0;
    let mut present = false;

    for &i in selection.indices() {
        let Some(cols) = rows[i].band(band) else {
            continue;
        };
        present = true;
        counts += cols.counts;
        background += cols.background;
        exposure += cols.exposure;
        weighted_correction += cols.correction * cols.exposure;
    }

    if !present {
        return Ok(None);
    }
    finish_totals(
        counts,
        background,
        exposure,
        weighted_correction,
        band.as_str(),
    )
    .map(Some)
}

fn finish_totals(
    counts: u64,
    background: f64,
    exposure: f64,
    weighted_correction: f64,
    what: &str,
) -> MergeResult<CountTotals> {
    if !(exposure.is_finite() && exposure > 0.0) {
        return Err(MergeError::invalid(format!(
            "total exposure over the selected {what} rows must be positive, got {exposure}"
        )));
    }
    Ok(CountTotals {
        counts,
        background,
        exposure,
        correction: weighted_correction / exposure,
    })
}
