//! Registry-owned chart state.

use crate::error::{ChartError, Result};
use crate::metadata::{ChartMetadata, DimensionMetadata, is_valid_id};

/// A dimension of a registered chart.
#[derive(Debug, Clone)]
pub(crate) struct Dimension {
    pub(crate) metadata: DimensionMetadata,
    /// Marked for removal; emitted once more as obsolete, then dropped.
    pub(crate) remove: bool,
}

/// A chart as tracked by [`Charts`](crate::Charts).
///
/// Besides its definition a chart carries the lifecycle flags the registry
/// needs to decide what to emit on the next update:
///
/// - `created`: the definition has been emitted and is current. Clearing it
///   (a redraw request) re-emits `CHART` and every `DIMENSION`.
/// - `announced`: the definition has been emitted at least once, so Netdata
///   knows the chart and has to be told when it goes away.
/// - `remove`: the chart goes out as obsolete and is dropped on the next
///   update.
/// - `retries`: consecutive updates in which none of the chart's dimensions
///   received a value.
#[derive(Debug)]
pub struct Chart {
    metadata: ChartMetadata,
    pub(crate) dimensions: Vec<Dimension>,
    pub(crate) retries: u32,
    pub(crate) created: bool,
    pub(crate) announced: bool,
    pub(crate) remove: bool,
}

impl Chart {
    pub(crate) fn new(metadata: ChartMetadata) -> Self {
        Self {
            metadata,
            dimensions: Vec::new(),
            retries: 0,
            created: false,
            announced: false,
            remove: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    pub fn metadata(&self) -> &ChartMetadata {
        &self.metadata
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn is_marked_for_removal(&self) -> bool {
        self.remove
    }

    /// Dimensions in definition order, including ones marked for removal.
    pub fn dimensions(&self) -> impl Iterator<Item = &DimensionMetadata> {
        self.dimensions.iter().map(|dim| &dim.metadata)
    }

    /// Whether the chart has a live dimension with this ID.
    pub fn has_dimension(&self, id: &str) -> bool {
        self.dimensions
            .iter()
            .any(|dim| !dim.remove && dim.metadata.id == id)
    }

    /// `Some(true)` if the dimension exists and is marked for removal.
    pub fn is_dimension_marked_for_removal(&self, id: &str) -> Option<bool> {
        self.dimensions
            .iter()
            .find(|dim| dim.metadata.id == id)
            .map(|dim| dim.remove)
    }

    pub(crate) fn add_dimension(&mut self, metadata: DimensionMetadata) -> Result<()> {
        if !is_valid_id(&metadata.id) {
            return Err(ChartError::InvalidId { id: metadata.id });
        }

        match self
            .dimensions
            .iter_mut()
            .find(|dim| dim.metadata.id == metadata.id)
        {
            Some(dim) if !dim.remove => Err(ChartError::DuplicateDimension {
                chart: self.metadata.id.clone(),
                dimension: metadata.id,
            }),
            Some(dim) => {
                // Re-adding a dimension that is on its way out revives it.
                dim.metadata = metadata;
                dim.remove = false;
                Ok(())
            }
            None => {
                self.dimensions.push(Dimension {
                    metadata,
                    remove: false,
                });
                Ok(())
            }
        }
    }

    pub(crate) fn mark_dimension_for_removal(&mut self, id: &str, hide: bool) -> Result<()> {
        let Some(dim) = self.dimensions.iter_mut().find(|dim| dim.metadata.id == id) else {
            return Err(ChartError::UnknownDimension {
                chart: self.metadata.id.clone(),
                dimension: id.to_string(),
            });
        };

        dim.remove = true;
        if hide {
            dim.metadata.hidden = true;
        }
        Ok(())
    }

    /// Drop dimensions whose obsolete definition has been emitted.
    pub(crate) fn sweep_removed_dimensions(&mut self) {
        self.dimensions.retain(|dim| !dim.remove);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart_with(dims: &[&str]) -> Chart {
        let mut chart = Chart::new(ChartMetadata::new("latency"));
        for id in dims {
            chart.add_dimension(DimensionMetadata::new(*id)).unwrap();
        }
        chart
    }

    #[test]
    fn test_add_dimension_rejects_duplicates() {
        let mut chart = chart_with(&["p50"]);
        let err = chart.add_dimension(DimensionMetadata::new("p50")).unwrap_err();
        assert_eq!(
            err,
            ChartError::DuplicateDimension {
                chart: "latency".to_string(),
                dimension: "p50".to_string(),
            }
        );
        assert_eq!(chart.dimensions().count(), 1);
    }

    #[test]
    fn test_add_dimension_rejects_invalid_id() {
        let mut chart = chart_with(&[]);
        assert!(matches!(
            chart.add_dimension(DimensionMetadata::new("p 50")),
            Err(ChartError::InvalidId { .. })
        ));
    }

    #[test]
    fn test_mark_dimension_for_removal() {
        let mut chart = chart_with(&["p50", "p99"]);
        chart.mark_dimension_for_removal("p99", true).unwrap();

        assert!(chart.has_dimension("p50"));
        assert!(!chart.has_dimension("p99"));
        assert_eq!(chart.is_dimension_marked_for_removal("p99"), Some(true));
        assert!(
            chart
                .dimensions()
                .find(|dim| dim.id == "p99")
                .unwrap()
                .hidden
        );

        chart.sweep_removed_dimensions();
        assert_eq!(chart.is_dimension_marked_for_removal("p99"), None);
        assert_eq!(chart.dimensions().count(), 1);
    }

    #[test]
    fn test_mark_unknown_dimension_fails() {
        let mut chart = chart_with(&["p50"]);
        assert!(matches!(
            chart.mark_dimension_for_removal("p99", false),
            Err(ChartError::UnknownDimension { .. })
        ));
    }

    #[test]
    fn test_readding_removed_dimension_revives_it() {
        let mut chart = chart_with(&["p50"]);
        chart.mark_dimension_for_removal("p50", false).unwrap();
        chart.add_dimension(DimensionMetadata::new("p50")).unwrap();

        assert!(chart.has_dimension("p50"));
        assert_eq!(chart.dimensions().count(), 1);
    }
}
