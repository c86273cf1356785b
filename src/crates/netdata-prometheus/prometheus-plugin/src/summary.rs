//! Collection of summary families into charts.
//!
//! Every family is split into one chart per distinct set of non-quantile
//! labels and one dimension per quantile. Charts and dimensions are
//! registered lazily the first time a sample maps to them and remembered in
//! the job's [`Cache`]. After each pass over a family, charts that have gone
//! without data for [`STALE_RETRIES_THRESHOLD`] updates are removed again.

use std::collections::HashMap;

use netdata_plugin_charts::{ChartHandle, ChartRegistry};
use tracing::{debug, warn};

use crate::cache::{Cache, CacheEntry};
use crate::sample::{Metadata, Sample, SummaryFamily};
use crate::sort::sort_summary_by;
use crate::split::SummarySplit;
use crate::summary_chart::{CollectorOptions, scale, summary_chart, summary_dimension};

/// Consecutive empty updates after which a chart is removed.
pub const STALE_RETRIES_THRESHOLD: u32 = 10;

/// Dimension ID to scaled value, for one collection cycle.
pub type MetricValues = HashMap<String, i64>;

/// Collects summary samples of one job into its chart registry.
pub struct SummaryCollector<'a, R: ChartRegistry> {
    cache: &'a mut Cache,
    registry: &'a mut R,
    options: &'a CollectorOptions,
}

impl<'a, R: ChartRegistry> SummaryCollector<'a, R> {
    pub fn new(cache: &'a mut Cache, registry: &'a mut R, options: &'a CollectorOptions) -> Self {
        Self {
            cache,
            registry,
            options,
        }
    }

    /// Collect one batch of samples, all from the same family.
    ///
    /// The batch is sorted by quantile in place. NaN samples produce no value
    /// and create nothing. Stale charts of the family are reaped once the
    /// pass ends, however it ends. An empty batch does nothing at all.
    pub fn collect(&mut self, mx: &mut MetricValues, samples: &mut [Sample], metadata: &Metadata) {
        sort_summary_by(samples, &self.options.quantile_label);

        let Some(first) = samples.first() else {
            return;
        };
        let family = first.name.clone();

        let mut pass = ReapOnDrop {
            collector: self,
            family: &family,
        };
        pass.collector.collect_samples(&family, mx, samples, metadata);
    }

    /// Collect every family of a scrape.
    pub fn collect_families(&mut self, mx: &mut MetricValues, families: &mut [SummaryFamily]) {
        for family in families.iter_mut() {
            self.collect(mx, &mut family.samples, &family.metadata);
        }
    }

    /// Reap cached families that did not appear in a scrape, so their charts
    /// age out like any other.
    pub fn reap_absent_families(&mut self, families: &[SummaryFamily]) {
        let absent: Vec<String> = self
            .cache
            .families()
            .filter(|name| {
                !families
                    .iter()
                    .any(|f| f.samples.first().is_some_and(|s| s.name == *name))
            })
            .map(str::to_string)
            .collect();

        for family in absent {
            self.reap_stale_charts(&family);
        }
    }

    fn collect_samples(
        &mut self,
        family: &str,
        mx: &mut MetricValues,
        samples: &[Sample],
        metadata: &Metadata,
    ) {
        let options = self.options;
        let entry = self
            .cache
            .get_or_insert_with(family, || {
                CacheEntry::new(SummarySplit::new(options.quantile_label.as_str()))
            });

        for sample in samples {
            if sample.value.is_nan() {
                continue;
            }

            let ids = entry.split().split(sample);
            mx.insert(ids.dim_id.clone(), scale(sample.value));

            let handle = match entry.get_chart(&ids.chart_id) {
                Some(handle) => handle,
                None => {
                    let chart = summary_chart(&ids.chart_id, sample, metadata, options);
                    match self.registry.create_chart(chart) {
                        Ok(handle) => {
                            debug!(family, chart = %ids.chart_id, "created summary chart");
                            entry.put_chart(ids.chart_id.as_str(), handle);
                            handle
                        }
                        Err(err) => {
                            warn!(family, chart = %ids.chart_id, "failed to create chart: {err}");
                            continue;
                        }
                    }
                }
            };

            if entry.has_dim(&ids.dim_id) {
                continue;
            }
            entry.put_dim(ids.dim_id.as_str());
            let dim = summary_dimension(&ids.dim_id, &ids.dim_name);
            if let Err(err) = self.registry.add_dimension(handle, dim) {
                warn!(family, dimension = %ids.dim_id, "failed to add dimension: {err}");
            }
            self.registry.mark_needs_redraw(handle);
        }
    }

    /// Remove every chart of `family` whose retry counter reached
    /// [`STALE_RETRIES_THRESHOLD`], together with its dimensions.
    ///
    /// Charts whose handle the registry no longer knows are removed from the
    /// cache as well.
    pub fn reap_stale_charts(&mut self, family: &str) {
        let Some(entry) = self.cache.get_mut(family) else {
            return;
        };

        let registry = &mut *self.registry;
        let stale: Vec<(String, ChartHandle)> = entry
            .charts()
            .filter(|(_, handle)| {
                registry
                    .retries(*handle)
                    .is_none_or(|retries| retries >= STALE_RETRIES_THRESHOLD)
            })
            .map(|(chart_id, handle)| (chart_id.to_string(), handle))
            .collect();

        for (chart_id, handle) in stale {
            for dim_id in registry.dimension_ids(handle) {
                entry.remove_dim(&dim_id);
                if let Err(err) = registry.mark_dimension_for_removal(handle, &dim_id, true) {
                    debug!(family, dimension = %dim_id, "failed to remove dimension: {err}");
                }
            }
            entry.remove_chart_dims(&chart_id);
            entry.remove_chart(&chart_id);

            registry.mark_chart_for_removal(handle);
            registry.mark_needs_redraw(handle);
            debug!(family, chart = %chart_id, "removed stale summary chart");
        }
    }
}

/// Runs the reaper for `family` when dropped.
struct ReapOnDrop<'c, 'a, R: ChartRegistry> {
    collector: &'c mut SummaryCollector<'a, R>,
    family: &'c str,
}

impl<R: ChartRegistry> Drop for ReapOnDrop<'_, '_, R> {
    fn drop(&mut self) {
        self.collector.reap_stale_charts(self.family);
    }
}
