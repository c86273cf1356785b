//! Chart registry for Netdata external plugins.
//!
//! Collectors that discover their charts at runtime register them here and
//! get back a [`ChartHandle`]. The registry keeps the lifecycle state Netdata
//! cares about (definition emitted or not, dimensions and charts on their way
//! out, retry counters for charts that stopped receiving data) and renders
//! all of it through a [`ChartWriter`] once per collection cycle.
//!
//! Collectors are written against the [`ChartRegistry`] trait; [`Charts`] is
//! the in-memory implementation.

mod chart;
mod error;
mod handle;
mod metadata;
mod registry;
mod writer;

pub use chart::Chart;
pub use error::{ChartError, Result};
pub use handle::ChartHandle;
pub use metadata::{ChartMetadata, ChartType, DimensionAlgorithm, DimensionMetadata};
pub use registry::{ChartRegistry, Charts, RetryCounter, UpdateStats};
pub use writer::ChartWriter;
