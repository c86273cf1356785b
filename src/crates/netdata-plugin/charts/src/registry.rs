//! Chart registry: owns chart state and renders it each collection cycle.

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use tracing::debug;

use crate::chart::Chart;
use crate::error::{ChartError, Result};
use crate::handle::ChartHandle;
use crate::metadata::{ChartMetadata, DimensionMetadata, is_valid_id};
use crate::writer::ChartWriter;

/// Read access to a chart's retry counter.
///
/// The counter is maintained by the registry: it grows by one for every
/// update in which the chart received no dimension values, and resets as
/// soon as one arrives. Returns `None` for handles the registry no longer
/// knows.
pub trait RetryCounter {
    fn retries(&self, handle: ChartHandle) -> Option<u32>;
}

/// Operations a collector performs on the charts it owns.
pub trait ChartRegistry: RetryCounter {
    /// Register a new chart.
    fn create_chart(&mut self, metadata: ChartMetadata) -> Result<ChartHandle>;

    /// Add a dimension to a registered chart.
    fn add_dimension(&mut self, handle: ChartHandle, dimension: DimensionMetadata) -> Result<()>;

    /// Mark a dimension for removal. With `hide`, it is also hidden from the
    /// dashboard right away instead of fading out.
    fn mark_dimension_for_removal(
        &mut self,
        handle: ChartHandle,
        dimension_id: &str,
        hide: bool,
    ) -> Result<()>;

    /// Mark a chart for removal. No-op for unknown handles.
    fn mark_chart_for_removal(&mut self, handle: ChartHandle);

    /// Request that the chart definition is emitted again. No-op for unknown
    /// handles.
    fn mark_needs_redraw(&mut self, handle: ChartHandle);

    /// IDs of the chart's dimensions, including ones marked for removal.
    fn dimension_ids(&self, handle: ChartHandle) -> Vec<String>;
}

struct Slot {
    generation: u32,
    chart: Option<Chart>,
}

/// Counters from one [`Charts::update`] call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpdateStats {
    /// Charts whose definition was (re-)emitted
    pub defined: usize,
    /// Charts that received at least one value
    pub updated: usize,
    /// Charts that received nothing and had their retry counter bumped
    pub stale: usize,
    /// Charts dropped after being marked for removal
    pub removed: usize,
}

/// In-memory chart registry for a single plugin job.
///
/// Charts live in a slot arena addressed by [`ChartHandle`]s. Every chart is
/// rendered under `<type_id>.<chart id>`.
pub struct Charts {
    type_id: String,
    update_every: Duration,
    slots: Vec<Slot>,
    free: Vec<u32>,
    by_id: HashMap<String, u32>,
}

impl Charts {
    pub fn new(type_id: impl Into<String>, update_every: Duration) -> Self {
        Self {
            type_id: type_id.into(),
            update_every,
            slots: Vec::new(),
            free: Vec::new(),
            by_id: HashMap::new(),
        }
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    /// Number of charts held, including ones waiting to be emitted as obsolete.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn get(&self, handle: ChartHandle) -> Option<&Chart> {
        self.slots
            .get(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.chart.as_ref())
    }

    fn get_mut(&mut self, handle: ChartHandle) -> Option<&mut Chart> {
        self.slots
            .get_mut(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.chart.as_mut())
    }

    /// Look up the handle of a chart by ID.
    pub fn find(&self, id: &str) -> Option<ChartHandle> {
        let index = *self.by_id.get(id)?;
        let slot = &self.slots[index as usize];
        Some(ChartHandle::new(index, slot.generation))
    }

    /// Render one collection cycle into `writer`.
    ///
    /// Charts marked for removal go out as obsolete, if their definition was
    /// ever emitted, and are dropped. Charts
    /// without a current definition get one, including obsolete lines for
    /// dimensions marked for removal, which are dropped afterwards. Then
    /// every chart with at least one value in `values` gets a
    /// `BEGIN`/`SET`/`END` block; the others have their retry counter bumped.
    pub fn update(
        &mut self,
        values: &HashMap<String, i64>,
        writer: &mut ChartWriter,
        collection_time: SystemTime,
    ) -> UpdateStats {
        let mut stats = UpdateStats::default();

        for (index, slot) in self.slots.iter_mut().enumerate() {
            let Some(chart) = slot.chart.as_mut() else {
                continue;
            };

            if chart.remove {
                if chart.announced {
                    writer.write_chart(&self.type_id, chart.metadata(), true);
                }
                debug!(chart = chart.id(), announced = chart.announced, "dropping chart");
                self.by_id.remove(chart.id());
                slot.chart = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
                stats.removed += 1;
                continue;
            }

            if !chart.created {
                writer.write_chart(&self.type_id, chart.metadata(), false);
                for dim in &chart.dimensions {
                    writer.write_dimension_definition(&dim.metadata, dim.remove);
                }
                chart.sweep_removed_dimensions();
                chart.created = true;
                chart.announced = true;
                stats.defined += 1;
            }

            let mut begun = false;
            for dim in &chart.dimensions {
                let Some(&value) = values.get(&dim.metadata.id) else {
                    continue;
                };
                if !begun {
                    writer.begin_chart(&self.type_id, chart.id(), self.update_every);
                    begun = true;
                }
                writer.write_dimension(&dim.metadata.id, value);
            }

            if begun {
                writer.end_chart(collection_time);
                chart.retries = 0;
                stats.updated += 1;
            } else {
                chart.retries = chart.retries.saturating_add(1);
                stats.stale += 1;
            }
        }

        stats
    }
}

impl RetryCounter for Charts {
    fn retries(&self, handle: ChartHandle) -> Option<u32> {
        self.get(handle).map(Chart::retries)
    }
}

impl ChartRegistry for Charts {
    fn create_chart(&mut self, metadata: ChartMetadata) -> Result<ChartHandle> {
        if !is_valid_id(&metadata.id) {
            return Err(ChartError::InvalidId { id: metadata.id });
        }

        if let Some(&index) = self.by_id.get(&metadata.id) {
            let slot = &mut self.slots[index as usize];
            if slot.chart.as_ref().is_some_and(|chart| !chart.remove) {
                return Err(ChartError::DuplicateChart { id: metadata.id });
            }

            // Replace a chart that is only waiting to be emitted as obsolete.
            slot.generation = slot.generation.wrapping_add(1);
            slot.chart = Some(Chart::new(metadata));
            return Ok(ChartHandle::new(index, slot.generation));
        }

        let id = metadata.id.clone();
        let chart = Some(Chart::new(metadata));
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index as usize].chart = chart;
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    chart,
                });
                (self.slots.len() - 1) as u32
            }
        };
        self.by_id.insert(id, index);

        Ok(ChartHandle::new(index, self.slots[index as usize].generation))
    }

    fn add_dimension(&mut self, handle: ChartHandle, dimension: DimensionMetadata) -> Result<()> {
        self.get_mut(handle)
            .ok_or(ChartError::UnknownHandle(handle))?
            .add_dimension(dimension)
    }

    fn mark_dimension_for_removal(
        &mut self,
        handle: ChartHandle,
        dimension_id: &str,
        hide: bool,
    ) -> Result<()> {
        self.get_mut(handle)
            .ok_or(ChartError::UnknownHandle(handle))?
            .mark_dimension_for_removal(dimension_id, hide)
    }

    fn mark_chart_for_removal(&mut self, handle: ChartHandle) {
        if let Some(chart) = self.get_mut(handle) {
            chart.remove = true;
        }
    }

    fn mark_needs_redraw(&mut self, handle: ChartHandle) {
        if let Some(chart) = self.get_mut(handle) {
            chart.created = false;
        }
    }

    fn dimension_ids(&self, handle: ChartHandle) -> Vec<String> {
        self.get(handle)
            .map(|chart| chart.dimensions().map(|dim| dim.id.clone()).collect())
            .unwrap_or_default()
    }
}
