//! Formatted terminal output for merge results.
//!
//! We keep formatting code in one place so:
//! - the merge/estimation code stays clean and testable
//! - output changes are localized (important for future snapshot tests)

use std::collections::BTreeMap;

use crate::domain::{Band, Measurement};
use crate::merge::bands::BandLimit;
use crate::merge::lightcurve::MergeOutcome;

/// Format a light-curve merge outcome as a short multi-line summary.
pub fn format_merge_outcome(outcome: &MergeOutcome) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Merged {} counts over {:.1} s (background {:.3}, correction {:.3})\n",
        outcome.totals.counts,
        outcome.totals.exposure,
        outcome.totals.background,
        outcome.totals.correction,
    ));
    out.push_str(&format!(
        "Time: {:.1} (+{:.1} / -{:.1}) s\n",
        outcome.bin.time, outcome.bin.time_pos, outcome.bin.time_neg
    ));
    match outcome.bin.measurement {
        Measurement::Detection { rate, rate_pos, rate_neg } => {
            out.push_str(&format!(
                "Rate: {rate:.4e} (+{rate_pos:.4e} / {rate_neg:.4e}) ct/s\n"
            ));
        }
        Measurement::UpperLimit { limit } => {
            out.push_str(&format!("Upper limit: {limit:.4e} ct/s\n"));
        }
    }
    out.push_str(if outcome.inserted {
        "Committed into the dataset.\n"
    } else {
        "Not committed.\n"
    });

    out
}

/// Format per-band merge results as an aligned table.
pub fn format_band_results(results: &BTreeMap<Band, BandLimit>) -> String {
    let mut out = String::new();

    out.push_str("Band     Counts   Bkg        CF       Upper limit (ct/s)\n");
    for (band, limit) in results {
        out.push_str(&format!(
            "{:<8} {:<8} {:<10.3} {:<8.3} {:.4e}",
            band.as_str(),
            limit.counts,
            limit.bg_counts,
            limit.correction_factor,
            limit.upper_limit,
        ));
        if let Some(rates) = limit.rates {
            if rates.is_detected {
                out.push_str(&format!(
                    "  rate {:.4e} (+{:.4e} / {:.4e})",
                    rates.rate, rates.rate_pos, rates.rate_neg
                ));
            } else {
                out.push_str("  not detected");
            }
        }
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BandColumns, Bin, MultiBandRow};
    use crate::merge::aggregate::CountTotals;
    use crate::merge::bands::{merge_upper_limits, BandOptions};

    #[test]
    fn merge_outcome_summary_names_the_classification() {
        let outcome = MergeOutcome {
            is_upper_limit: true,
            inserted: false,
            bin: Bin {
                time: 500.0,
                time_pos: 450.0,
                time_neg: 450.0,
                counts: 9,
                background: 3.0,
                correction: 1.1,
                exposure: 300.0,
                measurement: Measurement::UpperLimit { limit: 0.021 },
            },
            totals: CountTotals {
                counts: 9,
                background: 3.0,
                exposure: 300.0,
                correction: 1.1,
            },
        };
        let text = format_merge_outcome(&outcome);
        assert!(text.contains("Upper limit"), "text was:\n{text}");
        assert!(text.contains("Not committed"));
    }

    #[test]
    fn band_table_lists_each_band_once() {
        let cols = BandColumns { counts: 6, background: 1.0, correction: 1.0, exposure: 100.0 };
        let rows = vec![MultiBandRow {
            total: Some(cols),
            soft: Some(cols),
            ..Default::default()
        }];
        let results = merge_upper_limits(&rows, &[0], &BandOptions::default()).unwrap();
        let text = format_band_results(&results);
        assert_eq!(text.matches("total").count(), 1, "text was:\n{text}");
        assert_eq!(text.matches("soft").count(), 1);
        assert!(!text.contains("hard"));
    }
}
