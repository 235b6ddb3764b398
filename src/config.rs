//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.gasdelta.toml` files.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::OutputFormat;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".gasdelta.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Input discovery settings.
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Chart settings.
    #[serde(default)]
    pub chart: ChartConfig,

    /// Summary report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory holding the measurement files.
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,

    /// Directory charts are written to (defaults to the results directory).
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            results_dir: default_results_dir(),
            output_dir: None,
            verbose: false,
        }
    }
}

impl GeneralConfig {
    /// Directory charts and reports are written to.
    pub fn effective_output_dir(&self) -> &Path {
        self.output_dir.as_deref().unwrap_or(&self.results_dir)
    }
}

fn default_results_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Input discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// File name pattern of measurement runs.
    #[serde(default = "default_pattern")]
    pub pattern: String,

    /// Also search subdirectories.
    #[serde(default)]
    pub recursive: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            pattern: default_pattern(),
            recursive: false,
        }
    }
}

fn default_pattern() -> String {
    crate::scanner::DEFAULT_PATTERN.to_string()
}

/// Chart rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Output file name without extension.
    #[serde(default = "default_file_stem")]
    pub file_stem: String,

    /// Image width in pixels.
    #[serde(default = "default_width")]
    pub width: u32,

    /// Image height in pixels.
    #[serde(default = "default_height")]
    pub height: u32,

    /// Lower edge of the shaded target band.
    #[serde(default = "default_target_min")]
    pub target_min: f64,

    /// Upper edge of the shaded target band.
    #[serde(default = "default_target_max")]
    pub target_max: f64,

    /// Relay panel colour (`#RRGGBB`).
    #[serde(default = "default_relay_color")]
    pub relay_color: String,

    /// Claim panel colour (`#RRGGBB`).
    #[serde(default = "default_claim_color")]
    pub claim_color: String,

    /// Padding added around the relay y-range.
    #[serde(default = "default_relay_margin")]
    pub relay_margin: f64,

    /// Padding added around the claim y-range.
    #[serde(default = "default_claim_margin")]
    pub claim_margin: f64,

    /// Render the PNG chart.
    #[serde(default = "default_true")]
    pub png: bool,

    /// Render the SVG chart.
    #[serde(default = "default_true")]
    pub svg: bool,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            file_stem: default_file_stem(),
            width: default_width(),
            height: default_height(),
            target_min: default_target_min(),
            target_max: default_target_max(),
            relay_color: default_relay_color(),
            claim_color: default_claim_color(),
            relay_margin: default_relay_margin(),
            claim_margin: default_claim_margin(),
            png: true,
            svg: true,
        }
    }
}

fn default_file_stem() -> String {
    "gas_analysis_average_chart".to_string()
}

fn default_width() -> u32 {
    1200
}

fn default_height() -> u32 {
    1000
}

fn default_target_min() -> f64 {
    0.0
}

fn default_target_max() -> f64 {
    15.0
}

fn default_relay_color() -> String {
    "#2E86AB".to_string()
}

fn default_claim_color() -> String {
    "#A23B72".to_string()
}

fn default_relay_margin() -> f64 {
    10.0
}

fn default_claim_margin() -> f64 {
    50.0
}

fn default_true() -> bool {
    true
}

/// Summary report settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Format of the summary file.
    #[serde(default)]
    pub format: OutputFormat,

    /// Where to write the summary table (not written when unset).
    #[serde(default)]
    pub summary_output: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref dir) = args.results_dir {
            self.general.results_dir = dir.clone();
        }
        if let Some(ref dir) = args.output_dir {
            self.general.output_dir = Some(dir.clone());
        }
        if args.verbose {
            self.general.verbose = true;
        }

        if let Some(ref pattern) = args.pattern {
            self.discovery.pattern = pattern.clone();
        }

        if let Some(min) = args.target_min {
            self.chart.target_min = min;
        }
        if let Some(max) = args.target_max {
            self.chart.target_max = max;
        }
        if args.no_png {
            self.chart.png = false;
        }
        if args.no_svg {
            self.chart.svg = false;
        }

        if let Some(format) = args.format {
            self.report.format = format;
        }
        if let Some(ref summary) = args.summary {
            self.report.summary_output = Some(summary.clone());
        }
    }

    /// Check settings that serde defaults cannot guarantee.
    pub fn validate(&self) -> Result<()> {
        if self.discovery.pattern.trim().is_empty() {
            bail!("discovery.pattern must not be empty");
        }

        let chart = &self.chart;
        if chart.width == 0 || chart.height == 0 {
            bail!("chart width and height must be non-zero");
        }
        if chart.target_min > chart.target_max {
            bail!(
                "chart target range is inverted ({} > {})",
                chart.target_min,
                chart.target_max
            );
        }
        if chart.relay_margin <= 0.0 || chart.claim_margin <= 0.0 {
            bail!("chart margins must be positive");
        }
        if !chart.png && !chart.svg {
            bail!("at least one of chart.png and chart.svg must be enabled");
        }
        if chart.file_stem.is_empty() {
            bail!("chart.file_stem must not be empty");
        }

        parse_hex_color(&chart.relay_color)
            .with_context(|| format!("Invalid chart.relay_color '{}'", chart.relay_color))?;
        parse_hex_color(&chart.claim_color)
            .with_context(|| format!("Invalid chart.claim_color '{}'", chart.claim_color))?;

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

/// Parse a `#RRGGBB` colour into its components.
pub fn parse_hex_color(value: &str) -> Result<(u8, u8, u8)> {
    let hex = value.strip_prefix('#').unwrap_or(value);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        bail!("expected #RRGGBB");
    }

    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
    Ok((channel(0)?, channel(2)?, channel(4)?))
}
