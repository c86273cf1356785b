//! Chart and dimension identities of summary samples.
//!
//! A summary family becomes one chart per distinct set of non-quantile
//! labels, with one dimension per quantile. Identity components are
//! percent-escaped so that the separators (`,`, `=`, `#`) only ever appear
//! as separators, which keeps the mapping from label sets to IDs injective.
//! Labels with empty values are skipped, since Prometheus treats them as
//! absent.

use std::fmt::{self, Write};

use crate::sample::Sample;
use crate::sort::QUANTILE_LABEL;

/// IDs and display name derived from one sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryIds {
    pub chart_id: String,
    pub dim_id: String,
    pub dim_name: String,
}

/// Derives chart and dimension identities for the samples of a family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarySplit {
    quantile_label: String,
}

impl Default for SummarySplit {
    fn default() -> Self {
        Self::new(QUANTILE_LABEL)
    }
}

impl SummarySplit {
    pub fn new(quantile_label: impl Into<String>) -> Self {
        Self {
            quantile_label: quantile_label.into(),
        }
    }

    /// ID of the chart the sample belongs to.
    pub fn chart_id(&self, sample: &Sample) -> String {
        let mut id = String::with_capacity(sample.name.len() + 16 * sample.labels.len());
        let _ = write!(id, "{}", Escaped(&sample.name));
        for (name, value) in sample.labels.iter() {
            if name == self.quantile_label || value.is_empty() {
                continue;
            }
            let _ = write!(id, ",{}={}", Escaped(name), Escaped(value));
        }
        id
    }

    /// ID of the sample's dimension, unique across all charts of the family.
    pub fn dim_id(&self, sample: &Sample) -> String {
        let chart_id = self.chart_id(sample);
        self.dim_id_in(&chart_id, sample)
    }

    /// Human readable dimension name, e.g. `p99` for quantile `0.99`.
    ///
    /// Quantiles outside [0, 1] or that fail to parse keep their raw label
    /// value.
    pub fn dim_name(&self, sample: &Sample) -> String {
        let raw = match sample.labels.get(&self.quantile_label) {
            None | Some("") => return self.quantile_label.clone(),
            Some(raw) => raw,
        };

        match raw.parse::<f64>() {
            Ok(q) if (0.0..=1.0).contains(&q) => percentile_name(q),
            _ => raw.to_string(),
        }
    }

    /// All three identities at once.
    pub fn split(&self, sample: &Sample) -> SummaryIds {
        let chart_id = self.chart_id(sample);
        let dim_id = self.dim_id_in(&chart_id, sample);
        SummaryIds {
            dim_name: self.dim_name(sample),
            dim_id,
            chart_id,
        }
    }

    /// Prefix shared by the IDs of every dimension on `chart_id`.
    pub fn dim_prefix(chart_id: &str) -> String {
        format!("{chart_id}#")
    }

    fn dim_id_in(&self, chart_id: &str, sample: &Sample) -> String {
        let quantile = sample.labels.get(&self.quantile_label).unwrap_or_default();
        let mut id = Self::dim_prefix(chart_id);
        let _ = write!(id, "{}", Escaped(quantile));
        id
    }
}

fn percentile_name(quantile: f64) -> String {
    // Rounded to drop binary noise such as 99.89999999999999.
    let percentile = (quantile * 100.0 * 1e6).round() / 1e6;
    format!("p{percentile}")
}

struct Escaped<'a>(&'a str);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0.bytes() {
            if b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b':' | b'-') {
                f.write_char(b as char)?;
            } else {
                write!(f, "%{b:02X}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Labels;

    fn sample(labels: &[(&str, &str)]) -> Sample {
        Sample::new(
            "http_request_duration_seconds",
            labels.iter().copied().collect::<Labels>(),
            0.1,
        )
    }

    #[test]
    fn test_chart_id_excludes_quantile() {
        let split = SummarySplit::default();
        let s = sample(&[("quantile", "0.5"), ("method", "GET"), ("code", "200")]);
        assert_eq!(
            split.chart_id(&s),
            "http_request_duration_seconds,code=200,method=GET"
        );
    }

    #[test]
    fn test_samples_differing_only_in_quantile_share_a_chart() {
        let split = SummarySplit::default();
        let a = sample(&[("quantile", "0.5"), ("method", "GET")]);
        let b = sample(&[("quantile", "0.99"), ("method", "GET")]);
        assert_eq!(split.chart_id(&a), split.chart_id(&b));
        assert_ne!(split.dim_id(&a), split.dim_id(&b));
    }

    #[test]
    fn test_dim_id_is_chart_id_plus_quantile() {
        let split = SummarySplit::default();
        let s = sample(&[("quantile", "0.99"), ("method", "GET")]);
        assert_eq!(
            split.dim_id(&s),
            "http_request_duration_seconds,method=GET#0.99"
        );
        assert!(split.dim_id(&s).starts_with(&SummarySplit::dim_prefix(&split.chart_id(&s))));
    }

    #[test]
    fn test_no_labels() {
        let split = SummarySplit::default();
        let s = sample(&[]);
        assert_eq!(split.chart_id(&s), "http_request_duration_seconds");
        assert_eq!(split.dim_id(&s), "http_request_duration_seconds#");
        assert_eq!(split.dim_name(&s), "quantile");
    }

    #[test]
    fn test_separators_in_values_do_not_collide() {
        let split = SummarySplit::default();
        let a = sample(&[("a", "1,b=2")]);
        let b = sample(&[("a", "1"), ("b", "2")]);
        assert_ne!(split.chart_id(&a), split.chart_id(&b));
        assert_eq!(split.chart_id(&a), "http_request_duration_seconds,a=1%2Cb%3D2");
    }

    #[test]
    fn test_escapes_whitespace_quotes_and_non_ascii() {
        let split = SummarySplit::default();
        let s = sample(&[("path", "/a b'é")]);
        assert_eq!(
            split.chart_id(&s),
            "http_request_duration_seconds,path=%2Fa%20b%27%C3%A9"
        );
    }

    #[test]
    fn test_empty_label_values_are_ignored() {
        let split = SummarySplit::default();
        let a = sample(&[("method", "GET"), ("handler", "")]);
        let b = sample(&[("method", "GET")]);
        assert_eq!(split.chart_id(&a), split.chart_id(&b));
    }

    #[test]
    fn test_dim_names() {
        let split = SummarySplit::default();
        let name = |q: &str| split.dim_name(&sample(&[("quantile", q)]));
        assert_eq!(name("0.5"), "p50");
        assert_eq!(name("0.99"), "p99");
        assert_eq!(name("0.999"), "p99.9");
        assert_eq!(name("0"), "p0");
        assert_eq!(name("1"), "p100");
        assert_eq!(name("1.5"), "1.5");
        assert_eq!(name("bogus"), "bogus");
    }

    #[test]
    fn test_custom_quantile_label() {
        let split = SummarySplit::new("q");
        let s = sample(&[("q", "0.9"), ("quantile", "x")]);
        assert_eq!(
            split.chart_id(&s),
            "http_request_duration_seconds,quantile=x"
        );
        assert_eq!(split.dim_name(&s), "p90");
    }

    #[test]
    fn test_split_matches_individual_calls() {
        let split = SummarySplit::default();
        let s = sample(&[("quantile", "0.9"), ("method", "POST")]);
        let ids = split.split(&s);
        assert_eq!(ids.chart_id, split.chart_id(&s));
        assert_eq!(ids.dim_id, split.dim_id(&s));
        assert_eq!(ids.dim_name, split.dim_name(&s));
    }
}
