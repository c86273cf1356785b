use thiserror::Error;

use crate::handle::ChartHandle;

/// Result type for chart registry operations
pub type Result<T> = std::result::Result<T, ChartError>;

/// Errors returned by a chart registry when a definition is rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChartError {
    /// Chart or dimension ID that the plugin protocol cannot carry
    #[error("invalid id '{id}'")]
    InvalidId { id: String },

    /// A live chart with the same ID is already registered
    #[error("duplicate chart '{id}'")]
    DuplicateChart { id: String },

    /// The chart already has a live dimension with the same ID
    #[error("chart '{chart}': duplicate dimension '{dimension}'")]
    DuplicateDimension { chart: String, dimension: String },

    /// The chart has no dimension with this ID
    #[error("chart '{chart}': unknown dimension '{dimension}'")]
    UnknownDimension { chart: String, dimension: String },

    /// The handle refers to a chart the registry has already dropped
    #[error("unknown chart handle {0}")]
    UnknownHandle(ChartHandle),
}
