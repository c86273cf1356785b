//! A collection job: one sample source, its cache and its charts.

use std::time::{Duration, SystemTime};

use bytes::BytesMut;
use netdata_plugin_charts::{ChartWriter, Charts};
use tracing::{trace, warn};

use crate::cache::Cache;
use crate::source::SampleSource;
use crate::summary::{MetricValues, SummaryCollector};
use crate::summary_chart::CollectorOptions;

/// Runs collection cycles for a single source.
///
/// The job exclusively owns its cache and chart registry, so cycles of one
/// job never overlap.
pub struct Job<S> {
    source: S,
    cache: Cache,
    charts: Charts,
    values: MetricValues,
    writer: ChartWriter,
    options: CollectorOptions,
}

impl<S: SampleSource> Job<S> {
    pub fn new(
        source: S,
        chart_type_id: impl Into<String>,
        update_every: Duration,
        options: CollectorOptions,
    ) -> Self {
        Self {
            source,
            cache: Cache::new(),
            charts: Charts::new(chart_type_id, update_every),
            values: MetricValues::new(),
            writer: ChartWriter::new(),
            options,
        }
    }

    /// Scrape, collect and render one cycle. Returns the protocol output.
    ///
    /// A failed scrape is logged and handled like a scrape without samples,
    /// so charts keep aging.
    pub fn cycle(&mut self, now: SystemTime) -> BytesMut {
        self.values.clear();

        let mut families = match self.source.scrape() {
            Ok(families) => families,
            Err(e) => {
                warn!("scrape failed: {:#}", anyhow::Error::from(e));
                Vec::new()
            }
        };

        let mut collector = SummaryCollector::new(&mut self.cache, &mut self.charts, &self.options);
        collector.collect_families(&mut self.values, &mut families);
        collector.reap_absent_families(&families);

        let stats = self.charts.update(&self.values, &mut self.writer, now);
        trace!(
            chart_type = self.charts.type_id(),
            families = families.len(),
            values = self.values.len(),
            defined = stats.defined,
            updated = stats.updated,
            stale = stats.stale,
            removed = stats.removed,
            "cycle complete"
        );

        self.writer.take()
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn charts(&self) -> &Charts {
        &self.charts
    }

    /// Values collected by the last cycle.
    pub fn values(&self) -> &MetricValues {
        &self.values
    }
}
