//! Ordering of summary samples by quantile.

use crate::sample::Sample;

/// Label carrying the quantile of a summary sample.
pub const QUANTILE_LABEL: &str = "quantile";

/// Numeric quantile of a sample, for ordering only.
///
/// Missing or unparsable labels count as 0.0.
pub fn quantile_of(sample: &Sample, quantile_label: &str) -> f64 {
    sample
        .labels
        .get(quantile_label)
        .and_then(|q| q.parse::<f64>().ok())
        .filter(|q| !q.is_nan())
        .unwrap_or(0.0)
}

/// Sort a batch by ascending quantile, in place.
pub fn sort_summary(samples: &mut [Sample]) {
    sort_summary_by(samples, QUANTILE_LABEL);
}

/// Like [`sort_summary`], with a custom quantile label.
///
/// The sort is stable: samples with equal quantiles (including several with
/// malformed labels) keep their input order.
pub fn sort_summary_by(samples: &mut [Sample], quantile_label: &str) {
    samples.sort_by(|a, b| {
        quantile_of(a, quantile_label).total_cmp(&quantile_of(b, quantile_label))
    });
}
