//! Chart and dimension templates for summary families.

use netdata_plugin_charts::{ChartMetadata, ChartType, DimensionAlgorithm, DimensionMetadata};

use crate::sample::{Metadata, Sample};
use crate::sort::QUANTILE_LABEL;

/// Fixed-point scale of collected values. Dimensions divide by it again.
pub const PRECISION: i64 = 1000;

/// Units used when a family does not declare any.
const DEFAULT_UNITS: &str = "observations";

/// Settings shared by every summary chart of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorOptions {
    pub quantile_label: String,
    pub priority: i64,
    /// Collection interval in seconds.
    pub update_every: u64,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self {
            quantile_label: QUANTILE_LABEL.to_string(),
            priority: 70000,
            update_every: 1,
        }
    }
}

/// Scale a sample value to the integer sent to Netdata.
///
/// Out of range values saturate.
pub fn scale(value: f64) -> i64 {
    (value * PRECISION as f64).round() as i64
}

/// Chart for the samples sharing `sample`'s non-quantile labels.
pub fn summary_chart(
    chart_id: &str,
    sample: &Sample,
    metadata: &Metadata,
    options: &CollectorOptions,
) -> ChartMetadata {
    let mut chart = ChartMetadata::new(chart_id);

    chart.title = non_empty(metadata.help.as_deref())
        .unwrap_or(&sample.name)
        .to_string();
    chart.units = non_empty(metadata.unit.as_deref())
        .unwrap_or(DEFAULT_UNITS)
        .to_string();
    chart.family = sample.name.clone();
    chart.context = format!("prometheus.{}", sample.name);
    chart.chart_type = ChartType::Line;
    chart.priority = options.priority;
    chart.update_every = options.update_every;
    chart.labels = sample
        .labels
        .iter()
        .filter(|(name, value)| *name != options.quantile_label && !value.is_empty())
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();

    chart
}

/// Dimension of a single quantile.
pub fn summary_dimension(dim_id: &str, dim_name: &str) -> DimensionMetadata {
    let mut dim = DimensionMetadata::new(dim_id);
    dim.name = dim_name.to_string();
    dim.algorithm = DimensionAlgorithm::Absolute;
    dim.multiplier = 1;
    dim.divisor = PRECISION;
    dim
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}
