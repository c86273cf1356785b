//! What Netdata is told about a chart and its dimensions.

/// How a chart is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartType {
    #[default]
    Line,
    Area,
    Stacked,
}

impl ChartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Area => "area",
            Self::Stacked => "stacked",
        }
    }
}

/// How Netdata turns collected values into stored points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DimensionAlgorithm {
    /// Gauges: the collected value is the point.
    #[default]
    Absolute,
    /// Counters: the point is the rate between two collections.
    Incremental,
}

impl DimensionAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Absolute => "absolute",
            Self::Incremental => "incremental",
        }
    }
}

/// A dimension as announced by `DIMENSION`.
///
/// Values are sent as integers; Netdata stores `value * multiplier / divisor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionMetadata {
    /// Key used by `SET`.
    pub id: String,
    pub name: String,
    pub algorithm: DimensionAlgorithm,
    pub multiplier: i64,
    pub divisor: i64,
    pub hidden: bool,
}

impl DimensionMetadata {
    /// A visible, unscaled gauge named after its id.
    pub fn new(id: impl Into<String>) -> Self {
        let id: String = id.into();
        let name = id.clone();
        Self {
            id,
            name,
            algorithm: DimensionAlgorithm::Absolute,
            multiplier: 1,
            divisor: 1,
            hidden: false,
        }
    }
}

/// A chart as announced by `CHART` and its `CLABEL` lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartMetadata {
    /// Unique within the registry's type; the full id is `<type>.<id>`.
    pub id: String,
    pub name: String,
    pub title: String,
    pub units: String,
    pub family: String,
    /// Charts sharing a context are aggregated together by Netdata.
    pub context: String,
    pub chart_type: ChartType,
    /// Sort order on the dashboard, ascending.
    pub priority: i64,
    /// Seconds between updates.
    pub update_every: u64,
    pub labels: Vec<(String, String)>,
}

impl ChartMetadata {
    pub fn new(id: impl Into<String>) -> Self {
        let id: String = id.into();
        Self {
            name: String::new(),
            title: id.clone(),
            units: "value".to_string(),
            family: String::new(),
            context: id.clone(),
            chart_type: ChartType::Line,
            priority: 1000,
            update_every: 1,
            labels: Vec::new(),
            id,
        }
    }
}

/// Ids are written bare, so they cannot contain anything that ends or
/// opens a token.
pub(crate) fn is_valid_id(id: &str) -> bool {
    let breaks_token = |c: char| c.is_whitespace() || c.is_control() || matches!(c, '\'' | '"');
    !id.is_empty() && !id.contains(breaks_token)
}
