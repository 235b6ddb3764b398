//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Gasdelta - average gas delta charts from gas analysis runs
///
/// Aggregates every gas_analysis_*.json file in the results directory,
/// computes mean and standard deviation of the relay and claim gas deltas
/// per nested-message count, and renders PNG and SVG charts next to them.
///
/// Examples:
///   gasdelta
///   gasdelta --results-dir script/go/results
///   gasdelta --results-dir results --summary summary.md
///   gasdelta --results-dir results --summary summary.json --format json
///   gasdelta --dry-run
///   gasdelta --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Directory containing the gas_analysis_*.json files
    ///
    /// Defaults to the config file setting, or the current directory.
    #[arg(short, long, value_name = "DIR", env = "GASDELTA_RESULTS_DIR")]
    pub results_dir: Option<PathBuf>,

    /// Directory to write the charts to
    ///
    /// Defaults to the results directory.
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// File name pattern of measurement files
    ///
    /// `*` matches any run of characters, `?` a single character.
    #[arg(short, long, value_name = "GLOB")]
    pub pattern: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .gasdelta.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Lower edge of the shaded target band
    #[arg(long, value_name = "GAS", allow_hyphen_values = true)]
    pub target_min: Option<f64>,

    /// Upper edge of the shaded target band
    #[arg(long, value_name = "GAS", allow_hyphen_values = true)]
    pub target_max: Option<f64>,

    /// Skip the PNG chart
    #[arg(long)]
    pub no_png: bool,

    /// Skip the SVG chart
    #[arg(long)]
    pub no_svg: bool,

    /// Also write the summary table to this file
    #[arg(short, long, value_name = "FILE")]
    pub summary: Option<PathBuf>,

    /// Summary file format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Dry run: list the measurement files that would be aggregated
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .gasdelta.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the summary file.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.no_png && self.no_svg {
            return Err("Cannot use both --no-png and --no-svg".to_string());
        }

        if let (Some(min), Some(max)) = (self.target_min, self.target_max) {
            if min > max {
                return Err(format!(
                    "Target range is inverted: --target-min {} > --target-max {}",
                    min, max
                ));
            }
        }

        if let Some(ref pattern) = self.pattern {
            if pattern.trim().is_empty() {
                return Err("Pattern must not be empty".to_string());
            }
        }

        // A missing results directory just has no files; a file in its place is an error
        if let Some(ref dir) = self.results_dir {
            if dir.exists() && !dir.is_dir() {
                return Err(format!(
                    "Results path is not a directory: {}",
                    dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            results_dir: None,
            output_dir: None,
            pattern: None,
            config: None,
            verbose: false,
            quiet: false,
            target_min: None,
            target_max: None,
            no_png: false,
            no_svg: false,
            summary: None,
            format: None,
            dry_run: false,
            init_config: false,
        }
    }

    #[test]
    fn test_no_arguments_is_valid() {
        let args = Args::try_parse_from(["gasdelta"]).unwrap();
        assert!(args.pattern.is_none());
        assert!(!args.dry_run);
        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "gasdelta",
            "--pattern",
            "run_*.json",
            "--target-min",
            "-5",
            "--target-max",
            "25",
            "--format",
            "json",
            "--no-svg",
        ])
        .unwrap();

        assert_eq!(args.pattern.as_deref(), Some("run_*.json"));
        assert_eq!(args.target_min, Some(-5.0));
        assert_eq!(args.target_max, Some(25.0));
        assert_eq!(args.format, Some(OutputFormat::Json));
        assert!(args.no_svg);
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.no_png = true;
        args.no_svg = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_inverted_target_range() {
        let mut args = make_args();
        args.target_min = Some(15.0);
        args.target_max = Some(0.0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_results_dir() {
        let mut args = make_args();
        args.results_dir = Some(PathBuf::from("/definitely/not/here/gasdelta"));
        assert!(args.validate().is_ok());

        let file = tempfile::NamedTempFile::new().unwrap();
        args.results_dir = Some(file.path().to_path_buf());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
