//! End-to-end tests for collection jobs
//!
//! Tests cover:
//! - Protocol output of the first and following cycles
//! - Charts going obsolete after they stop receiving samples
//! - Scrape failures
//! - Families disappearing from the scrape

use prometheus_plugin::{
    CollectorOptions, FileSource, Job, STALE_RETRIES_THRESHOLD, SampleSource, SourceError,
    SummaryFamily,
};
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tempfile::TempDir;

const T0: u64 = 1_700_000_000;

const GET_AND_POST: &str = r#"
families:
  - name: http_request_duration_seconds
    help: HTTP request latency
    unit: seconds
    samples:
      - labels: { method: GET, quantile: 0.99 }
        value: 0.9
      - labels: { method: GET, quantile: 0.5 }
        value: 0.12
      - labels: { method: POST, quantile: 0.5 }
        value: 0.3
"#;

const GET_ONLY: &str = r#"
families:
  - name: http_request_duration_seconds
    help: HTTP request latency
    unit: seconds
    samples:
      - labels: { method: GET, quantile: 0.99 }
        value: 0.8
      - labels: { method: GET, quantile: 0.5 }
        value: 0.1
"#;

const GET_CHART: &str = "http_request_duration_seconds,method=GET";
const POST_CHART: &str = "http_request_duration_seconds,method=POST";

/// A job reading from a samples file in a temporary directory.
struct Fixture {
    _dir: TempDir,
    path: PathBuf,
    job: Job<FileSource>,
    offset: u64,
}

impl Fixture {
    fn new(contents: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("samples.yaml");
        fs::write(&path, contents).unwrap();

        let job = Job::new(
            FileSource::new(&path),
            "prometheus_local",
            Duration::from_secs(1),
            CollectorOptions::default(),
        );

        Self {
            _dir: dir,
            path,
            job,
            offset: 0,
        }
    }

    fn write(&self, contents: &str) {
        fs::write(&self.path, contents).unwrap();
    }

    /// Helper to run one cycle and return the protocol output
    fn cycle(&mut self) -> String {
        let now = UNIX_EPOCH + Duration::from_secs(T0 + self.offset);
        self.offset += 1;
        String::from_utf8(self.job.cycle(now).to_vec()).unwrap()
    }
}

#[test]
fn test_first_cycle_defines_and_updates_charts() {
    let mut fx = Fixture::new(GET_ONLY);
    let out = fx.cycle();

    let expected = format!(
        "CHART prometheus_local.{GET_CHART} '' 'HTTP request latency' 'seconds' \
         'http_request_duration_seconds' 'prometheus.http_request_duration_seconds' \
         line 70000 1 ''\n\
         CLABEL 'method' 'GET' 1\n\
         CLABEL_COMMIT\n\
         DIMENSION {GET_CHART}#0.5 'p50' absolute 1 1000 ''\n\
         DIMENSION {GET_CHART}#0.99 'p99' absolute 1 1000 ''\n\
         BEGIN prometheus_local.{GET_CHART} 1000000\n\
         SET {GET_CHART}#0.5 = 100\n\
         SET {GET_CHART}#0.99 = 800\n\
         END {T0}\n"
    );
    assert_eq!(out, expected);
}

#[test]
fn test_following_cycles_only_send_values() {
    let mut fx = Fixture::new(GET_ONLY);
    fx.cycle();

    let out = fx.cycle();
    assert!(!out.contains("CHART"));
    assert!(!out.contains("DIMENSION"));
    assert!(out.starts_with(&format!("BEGIN prometheus_local.{GET_CHART} ")));
    assert_eq!(fx.job.values().len(), 2);
}

#[test]
fn test_new_label_set_defines_new_chart() {
    let mut fx = Fixture::new(GET_ONLY);
    fx.cycle();

    fx.write(GET_AND_POST);
    let out = fx.cycle();
    assert!(out.contains(&format!("CHART prometheus_local.{POST_CHART} ")));
    assert!(!out.contains(&format!("CHART prometheus_local.{GET_CHART} ")));
    assert_eq!(fx.job.charts().len(), 2);
}

#[test]
fn test_chart_without_samples_goes_obsolete_after_threshold() {
    let mut fx = Fixture::new(GET_AND_POST);
    fx.cycle();

    fx.write(GET_ONLY);
    // The POST chart gains one retry per cycle and is reaped once the
    // counter, as seen at the start of a cycle, reaches the threshold.
    for _ in 0..STALE_RETRIES_THRESHOLD {
        let out = fx.cycle();
        assert!(!out.contains("obsolete"), "{out}");
    }

    let out = fx.cycle();
    assert!(out.contains(&format!("CHART prometheus_local.{POST_CHART} ")));
    assert!(out.contains("'obsolete'\n"));
    assert_eq!(fx.job.charts().len(), 1);

    let entry = fx.job.cache().get("http_request_duration_seconds").unwrap();
    assert!(!entry.has_chart(POST_CHART));
    assert!(entry.has_chart(GET_CHART));
    assert_eq!(entry.dim_count(), 2);

    // Gone for good.
    assert!(!fx.cycle().contains("obsolete"));
}

#[test]
fn test_family_missing_from_scrape_is_reaped() {
    let mut fx = Fixture::new(GET_ONLY);
    fx.cycle();

    fx.write("families: []\n");
    for _ in 0..STALE_RETRIES_THRESHOLD {
        assert!(fx.cycle().is_empty());
    }

    let out = fx.cycle();
    assert!(out.contains(&format!("CHART prometheus_local.{GET_CHART} ")));
    assert!(out.contains("'obsolete'\n"));
    assert!(fx.job.charts().is_empty());
    assert_eq!(
        fx.job
            .cache()
            .get("http_request_duration_seconds")
            .map(|entry| entry.chart_count()),
        Some(0)
    );
}

#[test]
fn test_broken_samples_file_is_an_empty_scrape() {
    let mut fx = Fixture::new(GET_ONLY);
    fx.cycle();

    fx.write("families: [");
    assert!(fx.cycle().is_empty());
    assert!(fx.job.values().is_empty());
    assert_eq!(fx.job.charts().len(), 1);

    fx.write(GET_ONLY);
    let out = fx.cycle();
    assert!(out.contains(&format!("SET {GET_CHART}#0.5 = 100")));
}

#[test]
fn test_returning_samples_revive_an_obsolete_chart() {
    let mut fx = Fixture::new(GET_AND_POST);
    fx.cycle();

    fx.write(GET_ONLY);
    for _ in 0..=STALE_RETRIES_THRESHOLD {
        fx.cycle();
    }
    assert_eq!(fx.job.charts().len(), 1);

    fx.write(GET_AND_POST);
    let out = fx.cycle();
    assert!(out.contains(&format!("CHART prometheus_local.{POST_CHART} ")));
    assert!(out.contains(&format!("DIMENSION {POST_CHART}#0.5 'p50' absolute 1 1000 ''")));
    assert!(out.contains(&format!("SET {POST_CHART}#0.5 = 300")));
}

#[test]
fn test_line_breaks_in_metadata_stay_inside_their_command() {
    let mut fx = Fixture::new(
        r#"
families:
  - name: lat
    help: "Latency\nSET evil = 999"
    samples:
      - labels: { path: "a\nEND 1", quantile: 0.5 }
        value: 0.2
"#,
    );
    let out = fx.cycle();

    const COMMANDS: [&str; 7] = [
        "CHART ",
        "CLABEL ",
        "CLABEL_COMMIT",
        "DIMENSION ",
        "BEGIN ",
        "SET ",
        "END ",
    ];
    for line in out.lines() {
        assert!(
            COMMANDS.iter().any(|command| line.starts_with(command)),
            "unexpected line {line:?} in\n{out}"
        );
    }
    assert!(out.contains(" 'Latency SET evil = 999' "));
    assert!(out.contains("CLABEL 'path' 'a END 1' 1\n"));
    assert!(out.contains("SET lat,path=a%0AEND%201#0.5 = 200\n"));
    assert!(!out.lines().any(|line| line.starts_with("SET evil")));
}

/// Source that fails every scrape.
struct FailingSource;

impl SampleSource for FailingSource {
    fn scrape(&mut self) -> Result<Vec<SummaryFamily>, SourceError> {
        Err(SourceError::Io {
            path: PathBuf::from("/nonexistent"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
    }
}

#[test]
fn test_failing_source_produces_no_output() {
    let mut job = Job::new(
        FailingSource,
        "prometheus_local",
        Duration::from_secs(1),
        CollectorOptions::default(),
    );
    assert!(job.cycle(SystemTime::now()).is_empty());
    assert!(job.cache().is_empty());
}
