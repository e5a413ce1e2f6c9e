//! Merging selected bins of a light-curve dataset.
//!
//! The pipeline is: validate the selection, aggregate the raw columns,
//! classify the aggregate, and only then touch the dataset. All fallible
//! work happens before the first mutation, so a failed merge leaves the
//! dataset untouched; removal and insertion either both happen or neither
//! does.
//!
//! The tri-state insertion policy is what protects the dataset invariant:
//!
//! - `AlwaysCoerce` forces the classification to the dataset's own kind, so
//!   the committed bin always matches;
//! - `InsertIfMatches` commits only a naturally matching bin;
//! - `NeverInsert` hands the merged bin back without committing.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::domain::{Bin, Dataset, InsertMode, Kind, LightCurve};
use crate::error::{MergeError, MergeResult};
use crate::merge::aggregate::{aggregate_bins, CountTotals, Selection};
use crate::merge::classify::{classify, ClassifyOptions, DEFAULT_UL_CONF};

/// Parameters of a light-curve merge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeOptions {
    /// Remove the selected bins from the dataset.
    pub remove: bool,
    /// What to do with the merged bin after classification.
    pub insert: InsertMode,
    /// Force classification as a detection (ignored under `AlwaysCoerce`).
    pub force_rate: bool,
    /// Force classification as an upper limit (ignored under `AlwaysCoerce`).
    pub force_ul: bool,
    /// Confidence level of a reported upper limit.
    pub ul_conf: f64,
    /// Detection threshold; defaults to `ul_conf`.
    pub det_thresh: Option<f64>,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            remove: false,
            insert: InsertMode::NeverInsert,
            force_rate: false,
            force_ul: false,
            ul_conf: DEFAULT_UL_CONF,
            det_thresh: None,
        }
    }
}

/// The result of a merge: the classification, whether the bin was
/// committed, the bin itself, and the totals it was derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeOutcome {
    /// Whether the merged bin is an upper limit.
    pub is_upper_limit: bool,
    /// Whether the merged bin was committed into the dataset.
    pub inserted: bool,
    /// The merged bin (committed or not).
    pub bin: Bin,
    /// The aggregated totals the classification was based on.
    pub totals: CountTotals,
}

/// Merge the selected bins of `dataset` into a single bin.
///
/// See the module docs for the insertion policy and the transactional
/// guarantee. The selected bins must all belong to `dataset`; selections
/// spanning several datasets are a caller error this function cannot see.
pub fn merge_bins(
    dataset: &mut Dataset,
    selection: &[usize],
    opts: &MergeOptions,
) -> MergeResult<MergeOutcome> {
    let selection = Selection::resolve(selection, dataset.len())?;
    let (totals, span) = aggregate_bins(dataset.bins(), &selection)?;

    // Under AlwaysCoerce the dataset's own kind overrides the caller's force
    // flags; that coercion is what makes the commit below invariant-safe.
    let classify_opts = match opts.insert {
        InsertMode::AlwaysCoerce => ClassifyOptions {
            det_thresh: opts.det_thresh,
            ul_conf: opts.ul_conf,
            force_rate: dataset.kind() == Kind::Detection,
            force_ul: dataset.kind() == Kind::UpperLimit,
        },
        InsertMode::InsertIfMatches | InsertMode::NeverInsert => ClassifyOptions {
            det_thresh: opts.det_thresh,
            ul_conf: opts.ul_conf,
            force_rate: opts.force_rate,
            force_ul: opts.force_ul,
        },
    };
    let measurement = classify(&totals, &classify_opts)?;

    let bin = Bin {
        time: span.time,
        time_pos: span.time_pos,
        time_neg: span.time_neg,
        counts: totals.counts,
        background: totals.background,
        correction: totals.correction,
        exposure: totals.exposure,
        measurement,
    };

    // No fallible work below this point.
    if opts.remove {
        dataset.remove_sorted(selection.indices())?;
    }

    let commit = match opts.insert {
        InsertMode::AlwaysCoerce => true,
        InsertMode::InsertIfMatches => bin.kind() == dataset.kind(),
        InsertMode::NeverInsert => false,
    };
    if commit {
        dataset.insert_sorted(bin.clone());
    }
    debug!(
        "merge: {} rows -> {:?}, removed={}, inserted={commit}",
        selection.len(),
        bin.kind(),
        opts.remove
    );

    Ok(MergeOutcome {
        is_upper_limit: bin.measurement.is_upper_limit(),
        inserted: commit,
        bin,
        totals,
    })
}

/// Merge bins of the named dataset of a light curve.
///
/// Convenience for callers that address datasets by label (`PC`, `PCUL`);
/// resolves the name and delegates to [`merge_bins`].
pub fn merge_bins_in(
    curve: &mut LightCurve,
    name: &str,
    selection: &[usize],
    opts: &MergeOptions,
) -> MergeResult<MergeOutcome> {
    let dataset = curve.dataset_mut(name).ok_or_else(|| {
        MergeError::invalid(format!("light curve has no dataset named {name:?}"))
    })?;
    merge_bins(dataset, selection, opts)
}
