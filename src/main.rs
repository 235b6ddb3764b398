//! Gasdelta - average gas delta charts from gas analysis runs
//!
//! Aggregates the `gas_analysis_*.json` files written by the gas tank relay
//! analysis, one per run, and renders the mean ± standard deviation of the
//! relay and claim gas deltas per nested-message count.
//!
//! Exit codes:
//!   0 - Success, or no measurement files to aggregate
//!   1 - Malformed input, configuration, or I/O error

mod analysis;
mod cli;
mod config;
mod error;
mod models;
mod report;
mod scanner;

use anyhow::{Context, Result};
use cli::Args;
use config::{Config, CONFIG_FILE_NAME};
use error::AnalysisError;
use models::SummaryReport;
use scanner::{FileScanner, ScanConfig};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        if let Err(e) = handle_init_config() {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
        return;
    }

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(&args, &config);

    info!("Gasdelta v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Configuration: {:?}", config);

    match run(&args, &config) {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .gasdelta.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        anyhow::bail!(
            "{} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize the results directory, pattern, and chart style.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// `RUST_LOG` takes precedence over the flags when set.
fn init_logging(args: &Args, config: &Config) {
    let level = if !args.quiet && config.general.verbose {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let builder = FmtSubscriber::builder()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    let result = match EnvFilter::try_from_default_env() {
        Ok(filter) => tracing::subscriber::set_global_default(builder.with_env_filter(filter).finish()),
        Err(_) => tracing::subscriber::set_global_default(builder.with_max_level(level).finish()),
    };

    if let Err(e) = result {
        eprintln!("⚠️  Failed to set tracing subscriber: {}", e);
    }
}

/// Load configuration from file or use defaults, then apply CLI overrides.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = match args.config {
        // An explicit config path must load
        Some(ref config_path) => Config::load(config_path)?,
        None => match Config::load_default() {
            Ok(Some(config)) => config,
            Ok(None) => Config::default(),
            Err(e) => {
                eprintln!("⚠️  Ignoring {}: {:#}", CONFIG_FILE_NAME, e);
                Config::default()
            }
        },
    };

    config.merge_with_args(args);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Run the tool. Returns the process exit code.
fn run(args: &Args, config: &Config) -> Result<i32> {
    let results_dir = config.general.results_dir.clone();

    if args.dry_run {
        return handle_dry_run(&results_dir, &ScanConfig::from(&config.discovery));
    }

    println!(
        "🔍 Scanning {} for {}",
        results_dir.display(),
        config.discovery.pattern
    );

    let outcome = match run_analysis(config) {
        Ok(outcome) => outcome,
        Err(e) if is_no_input(&e) => {
            report_no_input(&e);
            return Ok(0);
        }
        Err(e) => return Err(e),
    };

    if !args.quiet {
        println!("\n{}", report::generate_console_table(&outcome.report.rows));
    }

    println!("\n📊 Average Gas Analysis Charts Generated!");
    println!("Files saved:");
    for path in &outcome.charts {
        println!("  - {}", display_name(path));
    }
    if let Some(ref summary) = outcome.summary {
        println!("  - {}", display_name(summary));
    }

    Ok(0)
}

/// Everything a successful run produced.
#[derive(Debug)]
struct AnalysisOutcome {
    report: SummaryReport,
    charts: Vec<PathBuf>,
    summary: Option<PathBuf>,
}

/// Discover, aggregate, and render.
///
/// Nothing is written unless every input file aggregates cleanly.
fn run_analysis(config: &Config) -> Result<AnalysisOutcome> {
    let results_dir = &config.general.results_dir;
    let scanner = FileScanner::new(results_dir.clone(), ScanConfig::from(&config.discovery));

    let files = scanner.discover()?;
    info!("Found {} measurement files in {}", files.len(), results_dir.display());

    let table = analysis::aggregate_files(&files)?;
    info!(
        "Aggregated {} observations over {} nested message counts",
        table.observations(),
        table.len()
    );
    debug!("Nested message counts: {:?}", table.keys());

    let output_dir = config.general.effective_output_dir();
    let charts = report::render_charts(&table, output_dir, &config.chart)?;

    let report = SummaryReport::new(results_dir.clone(), files, table);

    let summary = match config.report.summary_output {
        Some(ref path) => {
            report::write_report(&report, config.report.format, path)?;
            info!("Summary written: {}", path.display());
            Some(path.clone())
        }
        None => None,
    };

    Ok(AnalysisOutcome {
        report,
        charts,
        summary,
    })
}

/// Handle --dry-run: list the files that would be aggregated, then exit.
fn handle_dry_run(results_dir: &Path, scan_config: &ScanConfig) -> Result<i32> {
    let file_scanner = FileScanner::new(results_dir.to_path_buf(), scan_config.clone());
    println!(
        "\n🔍 Dry run: scanning {} (no aggregation)...\n",
        file_scanner.root().display()
    );

    let files = file_scanner.scan()?;

    if files.is_empty() {
        println!("   No files matching {} found.", scan_config.pattern);
    } else {
        println!("   Found {} files that would be aggregated:\n", files.len());
        for file in &files {
            println!("     📄 {} ({} bytes)", file.path.display(), file.size);
        }
    }

    println!("\n✅ Dry run complete. No charts were written.");
    Ok(0)
}

/// Whether an error means there was nothing to aggregate.
fn is_no_input(err: &anyhow::Error) -> bool {
    err.downcast_ref::<AnalysisError>()
        .map(AnalysisError::is_no_input)
        .unwrap_or(false)
}

fn report_no_input(err: &anyhow::Error) {
    if let Some(AnalysisError::NoInputFiles { dir, pattern }) = err.downcast_ref::<AnalysisError>() {
        debug!("Looked for {} in {}", pattern, dir.display());
    }
    println!("{}", no_input_message(err));
}

/// Console line for a run that had nothing to aggregate.
fn no_input_message(err: &anyhow::Error) -> &'static str {
    match err.downcast_ref::<AnalysisError>() {
        Some(AnalysisError::NoInputFiles { .. }) => "No gas_analysis JSON files found.",
        _ => "No measurements found in the gas_analysis JSON files.",
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_for(dir: &Path) -> Config {
        let mut config = Config::default();
        config.general.results_dir = dir.to_path_buf();
        config.chart.width = 600;
        config.chart.height = 500;
        config
    }

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_end_to_end() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        write(dir, "gas_analysis_1.json", r#"{"0": {"relay": 5, "claim": 40}, "2": {"relay": 10, "claim": 100}}"#);
        write(dir, "gas_analysis_2.json", r#"{"2": {"relay": 12, "claim": 104}}"#);
        write(dir, "gas_analysis.json", r#"{"2": {"relay": 1000, "claim": 1000}}"#);

        let mut config = config_for(dir);
        config.report.summary_output = Some(dir.join("summary.md"));

        let outcome = run_analysis(&config).unwrap();

        assert_eq!(outcome.report.metadata.input_files.len(), 2);
        assert_eq!(outcome.report.rows.len(), 2);

        let row = &outcome.report.rows[1];
        assert_eq!(row.nested_messages, 2);
        assert_eq!(row.relay.mean, 11.0);
        assert_eq!(row.relay.std_dev, 1.0);
        assert_eq!(row.claim.mean, 102.0);
        assert_eq!(row.claim.std_dev, 2.0);

        assert!(dir.join("gas_analysis_average_chart.png").exists());
        assert!(dir.join("gas_analysis_average_chart.svg").exists());

        let summary = std::fs::read_to_string(dir.join("summary.md")).unwrap();
        assert!(summary.contains("| 2 | 2 | 11.00 | 1.00 | 102.00 | 2.00 |"));
    }

    #[test]
    fn test_separate_output_dir() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        write(dir, "gas_analysis_1.json", r#"{"3": {"relay": 7, "claim": 70}}"#);

        let mut config = config_for(dir);
        config.general.output_dir = Some(dir.join("charts"));
        config.chart.png = false;

        let outcome = run_analysis(&config).unwrap();
        assert_eq!(
            outcome.charts,
            vec![dir.join("charts").join("gas_analysis_average_chart.svg")]
        );
        assert!(!dir.join("gas_analysis_average_chart.svg").exists());
    }

    #[test]
    fn test_no_input_files() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_for(temp_dir.path());

        let err = run_analysis(&config).unwrap_err();
        assert!(is_no_input(&err));
        assert_eq!(no_input_message(&err), "No gas_analysis JSON files found.");
        assert!(!temp_dir.path().join("gas_analysis_average_chart.png").exists());
    }

    #[test]
    fn test_missing_results_dir_is_no_input() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_for(&temp_dir.path().join("results"));

        let err = run_analysis(&config).unwrap_err();
        assert!(is_no_input(&err));
        assert_eq!(no_input_message(&err), "No gas_analysis JSON files found.");
        assert!(!temp_dir.path().join("results").exists());
    }

    #[test]
    fn test_empty_documents_treated_as_no_input() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "gas_analysis_1.json", "{}");

        let err = run_analysis(&config_for(temp_dir.path())).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AnalysisError>(),
            Some(AnalysisError::EmptyInput)
        ));
        assert!(is_no_input(&err));
        assert_eq!(
            no_input_message(&err),
            "No measurements found in the gas_analysis JSON files."
        );
    }

    #[test]
    fn test_malformed_key_produces_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        write(dir, "gas_analysis_1.json", r#"{"2": {"relay": 10, "claim": 100}}"#);
        write(dir, "gas_analysis_2.json", r#"{"abc": {"relay": 12, "claim": 104}}"#);

        let mut config = config_for(dir);
        config.report.summary_output = Some(dir.join("summary.md"));

        let err = run_analysis(&config).unwrap_err();
        assert!(!is_no_input(&err));
        assert!(matches!(
            err.downcast_ref::<AnalysisError>(),
            Some(AnalysisError::MalformedKey { .. })
        ));
        assert!(!dir.join("gas_analysis_average_chart.png").exists());
        assert!(!dir.join("gas_analysis_average_chart.svg").exists());
        assert!(!dir.join("summary.md").exists());
    }

    #[test]
    fn test_other_errors_are_not_no_input() {
        let err = anyhow::anyhow!("disk full");
        assert!(!is_no_input(&err));
    }
}
