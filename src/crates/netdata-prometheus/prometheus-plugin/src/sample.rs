//! Parsed samples as handed over by the exposition client.

use std::collections::BTreeMap;

/// Label set of a sample, ordered by label name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Labels(BTreeMap<String, String>);

impl Labels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Insert a label, returning the previous value for that name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(name.into(), value.into())
    }

    /// Labels in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Labels {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A single observation of a metric family.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub labels: Labels,
    /// May be NaN, meaning "no observation".
    pub value: f64,
}

impl Sample {
    pub fn new(name: impl Into<String>, labels: Labels, value: f64) -> Self {
        Self {
            name: name.into(),
            labels,
            value,
        }
    }
}

/// Descriptive information about a family, used when a chart is first built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub help: Option<String>,
    pub unit: Option<String>,
}

/// All samples of one summary family from a single scrape.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryFamily {
    pub name: String,
    pub metadata: Metadata,
    pub samples: Vec<Sample>,
}
