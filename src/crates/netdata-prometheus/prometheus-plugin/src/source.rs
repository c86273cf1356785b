//! Where a job gets its scrapes from.
//!
//! Scraping and exposition parsing happen outside this crate. A source only
//! has to hand over the summary families of one scrape, already parsed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::sample::{Labels, Metadata, Sample, SummaryFamily};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read samples from {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse samples from {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Produces the summary families of one scrape.
pub trait SampleSource {
    fn scrape(&mut self) -> Result<Vec<SummaryFamily>, SourceError>;
}

/// Reads every scrape from a YAML document on disk.
///
/// The file is read again on every scrape, so whatever writes it controls
/// what the next cycle sees:
///
/// ```yaml
/// families:
///   - name: rpc_duration_seconds
///     help: RPC latency
///     unit: seconds
///     samples:
///       - labels: { method: GET, quantile: 0.5 }
///         value: 0.012
///       - labels: { method: GET, quantile: 0.99 }
///         value: .nan
/// ```
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SampleSource for FileSource {
    fn scrape(&mut self) -> Result<Vec<SummaryFamily>, SourceError> {
        let contents = std::fs::read_to_string(&self.path).map_err(|source| SourceError::Io {
            path: self.path.clone(),
            source,
        })?;

        parse_families(&contents).map_err(|source| SourceError::Parse {
            path: self.path.clone(),
            source,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Document {
    #[serde(default)]
    families: Vec<FamilyDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FamilyDocument {
    name: String,
    #[serde(default)]
    help: Option<String>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    samples: Vec<SampleDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SampleDocument {
    #[serde(default)]
    labels: BTreeMap<String, LabelValue>,
    value: f64,
}

/// Label values may be written as plain YAML scalars (`quantile: 0.5`).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LabelValue {
    String(String),
    Number(serde_yaml::Number),
    Bool(bool),
}

impl LabelValue {
    fn into_string(self) -> String {
        match self {
            LabelValue::String(s) => s,
            LabelValue::Number(n) => n.to_string(),
            LabelValue::Bool(b) => b.to_string(),
        }
    }
}

/// Parse a scrape document into summary families.
///
/// Every sample takes the name of the family it is listed under.
pub fn parse_families(contents: &str) -> Result<Vec<SummaryFamily>, serde_yaml::Error> {
    let document: Document = serde_yaml::from_str(contents)?;

    let families = document
        .families
        .into_iter()
        .map(|family| {
            let samples = family
                .samples
                .into_iter()
                .map(|sample| {
                    let labels: Labels = sample
                        .labels
                        .into_iter()
                        .map(|(name, value)| (name, value.into_string()))
                        .collect();
                    Sample::new(family.name.as_str(), labels, sample.value)
                })
                .collect();

            SummaryFamily {
                name: family.name,
                metadata: Metadata {
                    help: family.help,
                    unit: family.unit,
                },
                samples,
            }
        })
        .collect();

    Ok(families)
}
