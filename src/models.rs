//! Data models for the gas analysis.
//!
//! This module contains the measurement records read from the
//! `gas_analysis_*.json` files and the summary structures handed to
//! the chart and report renderers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Gas deltas measured for one nested-message count in one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GasDelta {
    /// Relay gas delta (units).
    pub relay: f64,
    /// Claim gas delta (units).
    pub claim: f64,
}

/// One of the two metrics captured per observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Relay,
    Claim,
}

impl Metric {
    /// JSON field name of the metric.
    pub fn field(&self) -> &'static str {
        match self {
            Metric::Relay => "relay",
            Metric::Claim => "claim",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Relay => write!(f, "Relay"),
            Metric::Claim => write!(f, "Claim"),
        }
    }
}

/// Mean and population standard deviation of one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub mean: f64,
    pub std_dev: f64,
}

impl MetricSummary {
    /// Formats as `mean±std` with no decimals, as used for chart annotations.
    pub fn label(&self) -> String {
        format!("{:.0}±{:.0}", self.mean, self.std_dev)
    }

    pub fn lower(&self) -> f64 {
        self.mean - self.std_dev
    }

    pub fn upper(&self) -> f64 {
        self.mean + self.std_dev
    }
}

/// Summary of all runs for a single nested-message count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    /// Number of nested messages (the grouping key).
    pub nested_messages: u64,
    /// Number of runs that measured this key.
    pub samples: usize,
    /// Relay gas delta statistics.
    pub relay: MetricSummary,
    /// Claim gas delta statistics.
    pub claim: MetricSummary,
}

impl SummaryRow {
    /// Statistics for the given metric.
    pub fn metric(&self, metric: Metric) -> &MetricSummary {
        match metric {
            Metric::Relay => &self.relay,
            Metric::Claim => &self.claim,
        }
    }
}

/// Summary rows in strictly ascending key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryTable {
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Nested-message counts present in the table.
    pub fn keys(&self) -> Vec<u64> {
        self.rows.iter().map(|r| r.nested_messages).collect()
    }

    /// Total number of observations across all keys.
    pub fn observations(&self) -> usize {
        self.rows.iter().map(|r| r.samples).sum()
    }

    /// Statistics for one metric, paired with their key.
    pub fn series(&self, metric: Metric) -> Vec<(u64, MetricSummary)> {
        self.rows
            .iter()
            .map(|r| (r.nested_messages, *r.metric(metric)))
            .collect()
    }
}

/// Metadata about a summary report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Date and time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Directory the measurement files were read from.
    pub results_dir: PathBuf,
    /// Measurement files that were aggregated.
    pub input_files: Vec<PathBuf>,
    /// Number of distinct nested-message counts.
    pub keys: usize,
    /// Number of (key, run) observations.
    pub observations: usize,
}

/// The complete summary report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryReport {
    pub metadata: ReportMetadata,
    pub rows: Vec<SummaryRow>,
}

impl SummaryReport {
    /// Build a report for a summarized table.
    pub fn new(results_dir: PathBuf, input_files: Vec<PathBuf>, table: SummaryTable) -> Self {
        let metadata = ReportMetadata {
            generated_at: Utc::now(),
            results_dir,
            input_files,
            keys: table.len(),
            observations: table.observations(),
        };

        Self {
            metadata,
            rows: table.rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: u64, samples: usize, relay: (f64, f64), claim: (f64, f64)) -> SummaryRow {
        SummaryRow {
            nested_messages: key,
            samples,
            relay: MetricSummary {
                mean: relay.0,
                std_dev: relay.1,
            },
            claim: MetricSummary {
                mean: claim.0,
                std_dev: claim.1,
            },
        }
    }

    #[test]
    fn test_metric_names() {
        assert_eq!(Metric::Relay.field(), "relay");
        assert_eq!(Metric::Claim.field(), "claim");
        assert_eq!(Metric::Claim.to_string(), "Claim");
    }

    #[test]
    fn test_summary_label() {
        let summary = MetricSummary {
            mean: 11.4,
            std_dev: 0.6,
        };
        assert_eq!(summary.label(), "11±1");
        assert_eq!(summary.lower(), 11.4 - 0.6);
    }

    #[test]
    fn test_table_series() {
        let table = SummaryTable {
            rows: vec![row(1, 2, (3.0, 1.0), (30.0, 2.0)), row(4, 1, (5.0, 0.0), (50.0, 0.0))],
        };

        assert_eq!(table.keys(), vec![1, 4]);
        assert_eq!(table.observations(), 3);

        let claims = table.series(Metric::Claim);
        assert_eq!(claims[1].0, 4);
        assert_eq!(claims[1].1.mean, 50.0);
    }

    #[test]
    fn test_report_metadata() {
        let table = SummaryTable {
            rows: vec![row(2, 3, (11.0, 1.0), (102.0, 2.0))],
        };
        let report = SummaryReport::new(
            PathBuf::from("results"),
            vec![PathBuf::from("results/gas_analysis_1.json")],
            table,
        );

        assert_eq!(report.metadata.keys, 1);
        assert_eq!(report.metadata.observations, 3);
        assert_eq!(report.rows.len(), 1);
    }
}
