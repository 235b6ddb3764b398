//! Measurement aggregation and statistics.
//!
//! This module merges the per-run `gas_analysis_*.json` documents into
//! per-key groups and reduces each group to mean and population
//! standard deviation.

use crate::error::AnalysisError;
use crate::models::{GasDelta, Metric, MetricSummary, SummaryRow, SummaryTable};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A parsed measurement run: nested-message count keys mapped to records.
pub type ObservationDocument = Map<String, Value>;

/// All values observed for one nested-message count.
///
/// Both vectors always have one entry per document that contained the key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedSample {
    pub relay: Vec<f64>,
    pub claim: Vec<f64>,
}

impl GroupedSample {
    fn push(&mut self, delta: GasDelta) {
        self.relay.push(delta.relay);
        self.claim.push(delta.claim);
    }

    /// Number of runs in this group.
    pub fn len(&self) -> usize {
        self.relay.len()
    }

    /// Values collected for one metric.
    pub fn values(&self, metric: Metric) -> &[f64] {
        match metric {
            Metric::Relay => &self.relay,
            Metric::Claim => &self.claim,
        }
    }
}

/// Accumulates measurement documents grouped by nested-message count.
#[derive(Debug, Default)]
pub struct Aggregator {
    groups: BTreeMap<u64, GroupedSample>,
    documents: usize,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents ingested so far.
    pub fn documents(&self) -> usize {
        self.documents
    }

    /// Grouped values for a key, if any document contained it.
    #[cfg(test)]
    pub fn group(&self, key: u64) -> Option<&GroupedSample> {
        self.groups.get(&key)
    }

    /// Merge one document into the groups.
    ///
    /// The document is validated in full before anything is merged, so a
    /// failed ingest leaves the aggregator untouched. `source` is only used
    /// for error messages. Returns the number of keys merged.
    pub fn ingest(
        &mut self,
        source: &Path,
        document: &ObservationDocument,
    ) -> Result<usize, AnalysisError> {
        let mut parsed: BTreeMap<u64, GasDelta> = BTreeMap::new();

        for (key, value) in document {
            let nested_messages = parse_key(source, key)?;
            let delta = parse_record(source, key, value)?;

            // "1" and "01" name the same key
            if parsed.insert(nested_messages, delta).is_some() {
                return Err(AnalysisError::MalformedDocument {
                    path: source.to_path_buf(),
                    reason: format!(
                        "key '{}' repeats nested message count {}",
                        key, nested_messages
                    ),
                });
            }
        }

        let merged = parsed.len();
        for (nested_messages, delta) in parsed {
            self.groups.entry(nested_messages).or_default().push(delta);
        }
        self.documents += 1;

        Ok(merged)
    }

    /// Read, parse, and ingest a single measurement file.
    pub fn ingest_file(&mut self, path: &Path) -> Result<usize, AnalysisError> {
        let document = load_document(path)?;
        let merged = self.ingest(path, &document)?;
        debug!("Ingested {} keys from {}", merged, path.display());
        Ok(merged)
    }

    /// Reduce every group to mean and population standard deviation.
    ///
    /// Rows come back in ascending key order.
    pub fn summarize(&self) -> Result<SummaryTable, AnalysisError> {
        if self.groups.is_empty() {
            return Err(AnalysisError::EmptyInput);
        }

        let rows = self
            .groups
            .iter()
            .map(|(&nested_messages, group)| SummaryRow {
                nested_messages,
                samples: group.len(),
                relay: summarize_values(group.values(Metric::Relay)),
                claim: summarize_values(group.values(Metric::Claim)),
            })
            .collect();

        Ok(SummaryTable { rows })
    }
}

/// Aggregate a set of measurement files into a summary table.
///
/// Fails on the first malformed file; nothing is summarized in that case.
pub fn aggregate_files(paths: &[PathBuf]) -> Result<SummaryTable, AnalysisError> {
    let mut aggregator = Aggregator::new();

    for path in paths {
        aggregator.ingest_file(path)?;
    }
    debug!("Merged {} documents", aggregator.documents());

    aggregator.summarize()
}

/// Read a measurement file into a JSON object.
pub fn load_document(path: &Path) -> Result<ObservationDocument, AnalysisError> {
    let content = fs::read_to_string(path).map_err(|source| AnalysisError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let value: Value = serde_json::from_str(&content).map_err(|source| AnalysisError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    match value {
        Value::Object(document) => Ok(document),
        other => Err(AnalysisError::MalformedDocument {
            path: path.to_path_buf(),
            reason: format!("expected a JSON object at top level, found {}", json_kind(&other)),
        }),
    }
}

fn parse_key(source: &Path, key: &str) -> Result<u64, AnalysisError> {
    key.trim()
        .parse::<u64>()
        .map_err(|_| AnalysisError::MalformedKey {
            path: source.to_path_buf(),
            key: key.to_string(),
        })
}

/// Validate a record into a [`GasDelta`].
pub fn parse_record(source: &Path, key: &str, value: &Value) -> Result<GasDelta, AnalysisError> {
    let malformed = |reason: String| AnalysisError::MalformedRecord {
        path: source.to_path_buf(),
        key: key.to_string(),
        reason,
    };

    let record = value
        .as_object()
        .ok_or_else(|| malformed(format!("expected an object, found {}", json_kind(value))))?;

    let field = |metric: Metric| -> Result<f64, AnalysisError> {
        match record.get(metric.field()) {
            None => Err(malformed(format!("missing field '{}'", metric.field()))),
            Some(v) => v.as_f64().ok_or_else(|| {
                malformed(format!(
                    "field '{}' is {}, expected a number",
                    metric.field(),
                    json_kind(v)
                ))
            }),
        }
    };

    Ok(GasDelta {
        relay: field(Metric::Relay)?,
        claim: field(Metric::Claim)?,
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Mean and population standard deviation of a group of values.
///
/// Values are sorted before summing so the result does not depend on
/// the order documents were ingested in.
pub fn summarize_values(values: &[f64]) -> MetricSummary {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    MetricSummary {
        mean: mean(&sorted),
        std_dev: population_std_dev(&sorted),
    }
}

/// Arithmetic mean. Zero for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by n, not n - 1).
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}
