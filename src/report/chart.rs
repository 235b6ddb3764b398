//! Chart rendering.
//!
//! Draws the two stacked panels (relay and claim gas delta vs nested
//! messages) to a PNG and an SVG file using plotters.

use crate::config::{parse_hex_color, ChartConfig};
use crate::models::{Metric, MetricSummary, SummaryTable};
use anyhow::{Context, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{register_font, FontStyle};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};

const FONT: &str = "sans-serif";

/// DejaVu Sans, bundled so text renders without system fonts.
static FONT_DATA: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

static FONT_REGISTERED: OnceLock<bool> = OnceLock::new();

/// Register the bundled font under [`FONT`]. Safe to call repeatedly.
fn register_fonts() -> Result<()> {
    let registered = *FONT_REGISTERED
        .get_or_init(|| register_font(FONT, FontStyle::Normal, FONT_DATA).is_ok());

    if !registered {
        anyhow::bail!("Bundled chart font could not be loaded");
    }
    Ok(())
}

/// Marker drawn at each mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Circle,
    Square,
}

/// Resolved drawing parameters for one panel.
#[derive(Debug, Clone)]
struct Panel {
    metric: Metric,
    color: RGBColor,
    margin: f64,
    marker: Marker,
}

impl Panel {
    fn title(&self) -> String {
        format!("Average {} Gas Delta vs Nested Messages", self.metric)
    }

    fn series_label(&self) -> String {
        format!("{} Delta (Mean ± StdDev)", self.metric)
    }
}

/// Chart settings with colours parsed and panels laid out.
#[derive(Debug, Clone)]
pub struct ChartStyle {
    panels: [Panel; 2],
    target: (f64, f64),
    size: (u32, u32),
}

impl ChartStyle {
    pub fn from_config(config: &ChartConfig) -> Result<Self> {
        let color = |hex: &str| -> Result<RGBColor> {
            let (r, g, b) =
                parse_hex_color(hex).with_context(|| format!("Invalid chart colour '{}'", hex))?;
            Ok(RGBColor(r, g, b))
        };

        Ok(Self {
            panels: [
                Panel {
                    metric: Metric::Relay,
                    color: color(&config.relay_color)?,
                    margin: config.relay_margin,
                    marker: Marker::Circle,
                },
                Panel {
                    metric: Metric::Claim,
                    color: color(&config.claim_color)?,
                    margin: config.claim_margin,
                    marker: Marker::Square,
                },
            ],
            target: (config.target_min, config.target_max),
            size: (config.width, config.height),
        })
    }

    fn target_label(&self) -> String {
        format!("Target Range ({}-{})", self.target.0, self.target.1)
    }
}

/// Paths the enabled chart formats will be written to.
pub fn chart_paths(output_dir: &Path, config: &ChartConfig) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if config.png {
        paths.push(output_dir.join(format!("{}.png", config.file_stem)));
    }
    if config.svg {
        paths.push(output_dir.join(format!("{}.svg", config.file_stem)));
    }
    paths
}

/// Render the enabled chart formats into `output_dir`.
///
/// Returns the written paths.
pub fn render_charts(
    table: &SummaryTable,
    output_dir: &Path,
    config: &ChartConfig,
) -> Result<Vec<PathBuf>> {
    let style = ChartStyle::from_config(config)?;

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let paths = chart_paths(output_dir, config);
    for path in &paths {
        let failed = || format!("Failed to render {}", path.display());
        match path.extension().and_then(|e| e.to_str()) {
            Some("png") => {
                let root = BitMapBackend::new(path, style.size).into_drawing_area();
                draw_chart(&root, table, &style).with_context(failed)?;
                root.present().with_context(failed)?;
            }
            _ => {
                let root = SVGBackend::new(path, style.size).into_drawing_area();
                draw_chart(&root, table, &style).with_context(failed)?;
                root.present().with_context(failed)?;
            }
        }
        info!("Chart written: {}", path.display());
    }

    Ok(paths)
}

/// Draw both panels onto a drawing area.
pub fn draw_chart<DB>(
    root: &DrawingArea<DB, Shift>,
    table: &SummaryTable,
    style: &ChartStyle,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    register_fonts()?;
    root.fill(&WHITE)?;

    let areas = root.split_evenly((2, 1));
    for (area, panel) in areas.iter().zip(style.panels.iter()) {
        draw_panel(area, table, panel, style)?;
    }

    Ok(())
}

fn draw_panel<DB>(
    area: &DrawingArea<DB, Shift>,
    table: &SummaryTable,
    panel: &Panel,
    style: &ChartStyle,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let series = table.series(panel.metric);
    let (x_lo, x_hi) = x_range(&series);
    let (y_lo, y_hi) = y_range(&series, panel.margin);
    debug!(
        "{} panel: x {:.1}..{:.1}, y {:.1}..{:.1}",
        panel.metric, x_lo, x_hi, y_lo, y_hi
    );

    let mut chart = ChartBuilder::on(area)
        .caption(panel.title(), (FONT, 22).into_font())
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;

    chart
        .configure_mesh()
        .x_labels(series.len().clamp(2, 20))
        .x_desc("Number of Nested Messages")
        .y_desc("Gas Delta (units)")
        .x_label_formatter(&|x| format!("{:.0}", x))
        .y_label_formatter(&|y| format!("{:.0}", y))
        .light_line_style(BLACK.mix(0.04))
        .bold_line_style(BLACK.mix(0.12))
        .draw()?;

    // target band, clipped to the visible y-range; the legend entry stays even when it is off-screen
    let band = (style.target.0.max(y_lo), style.target.1.min(y_hi));
    let visible = (band.0 < band.1)
        .then(|| Rectangle::new([(x_lo, band.0), (x_hi, band.1)], GREEN.mix(0.3).filled()));
    chart
        .draw_series(visible)?
        .label(style.target_label())
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], GREEN.mix(0.3).filled()));

    let color = panel.color;
    let points: Vec<(f64, f64)> = series.iter().map(|(k, s)| (*k as f64, s.mean)).collect();

    chart
        .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?
        .label(panel.series_label())
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));

    chart.draw_series(series.iter().map(|(k, s)| {
        ErrorBar::new_vertical(*k as f64, s.lower(), s.mean, s.upper(), color.stroke_width(2), 10)
    }))?;

    match panel.marker {
        Marker::Circle => {
            chart.draw_series(points.iter().map(|&p| Circle::new(p, 6, color.filled())))?;
        }
        Marker::Square => {
            chart.draw_series(points.iter().map(|&p| {
                EmptyElement::at(p) + Rectangle::new([(-6, -6), (6, 6)], color.filled())
            }))?;
        }
    }

    let annotation = TextStyle::from((FONT, 13).into_font())
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Bottom));
    chart.draw_series(series.iter().map(|(k, s)| {
        EmptyElement::at((*k as f64, s.mean))
            + Text::new(s.label(), (0, -10), annotation.clone())
    }))?;

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK.mix(0.4))
        .label_font((FONT, 13).into_font())
        .draw()?;

    Ok(())
}

/// Horizontal extent: the key range padded so edge points are not clipped.
pub fn x_range(series: &[(u64, MetricSummary)]) -> (f64, f64) {
    let min = series.iter().map(|(k, _)| *k).min().unwrap_or(0) as f64;
    let max = series.iter().map(|(k, _)| *k).max().unwrap_or(0) as f64;
    let pad = ((max - min) * 0.05).max(0.5);
    (min - pad, max + pad)
}

/// Vertical extent: `min(mean) - max(std) - margin` to `max(mean) + max(std) + margin`.
pub fn y_range(series: &[(u64, MetricSummary)], margin: f64) -> (f64, f64) {
    if series.is_empty() {
        return (-margin, margin);
    }

    let min_mean = series.iter().map(|(_, s)| s.mean).fold(f64::INFINITY, f64::min);
    let max_mean = series
        .iter()
        .map(|(_, s)| s.mean)
        .fold(f64::NEG_INFINITY, f64::max);
    let max_std = series.iter().map(|(_, s)| s.std_dev).fold(0.0, f64::max);

    (min_mean - max_std - margin, max_mean + max_std + margin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SummaryRow;
    use tempfile::TempDir;

    fn summary(mean: f64, std_dev: f64) -> MetricSummary {
        MetricSummary { mean, std_dev }
    }

    fn sample_table() -> SummaryTable {
        SummaryTable {
            rows: vec![
                SummaryRow {
                    nested_messages: 0,
                    samples: 3,
                    relay: summary(8.0, 1.5),
                    claim: summary(120.0, 6.0),
                },
                SummaryRow {
                    nested_messages: 5,
                    samples: 3,
                    relay: summary(11.0, 2.0),
                    claim: summary(95.0, 4.0),
                },
                SummaryRow {
                    nested_messages: 10,
                    samples: 2,
                    relay: summary(-3.0, 0.0),
                    claim: summary(140.0, 10.0),
                },
            ],
        }
    }

    #[test]
    fn test_y_range_uses_margin_and_widest_spread() {
        let table = sample_table();

        let (lo, hi) = y_range(&table.series(Metric::Relay), 10.0);
        assert_eq!(lo, -3.0 - 2.0 - 10.0);
        assert_eq!(hi, 11.0 + 2.0 + 10.0);

        let (lo, hi) = y_range(&table.series(Metric::Claim), 50.0);
        assert_eq!(lo, 95.0 - 10.0 - 50.0);
        assert_eq!(hi, 140.0 + 10.0 + 50.0);
    }

    #[test]
    fn test_x_range_single_key() {
        let series = vec![(4, summary(1.0, 0.0))];
        assert_eq!(x_range(&series), (3.5, 4.5));
    }

    #[test]
    fn test_style_labels() {
        let style = ChartStyle::from_config(&ChartConfig::default()).unwrap();
        assert_eq!(style.target_label(), "Target Range (0-15)");
        assert_eq!(
            style.panels[0].title(),
            "Average Relay Gas Delta vs Nested Messages"
        );
        assert_eq!(style.panels[1].series_label(), "Claim Delta (Mean ± StdDev)");
        assert_eq!(style.panels[0].color, RGBColor(0x2E, 0x86, 0xAB));
    }

    #[test]
    fn test_chart_paths_follow_enabled_formats() {
        let mut config = ChartConfig::default();
        let dir = Path::new("out");
        assert_eq!(
            chart_paths(dir, &config),
            vec![
                dir.join("gas_analysis_average_chart.png"),
                dir.join("gas_analysis_average_chart.svg"),
            ]
        );

        config.png = false;
        assert_eq!(chart_paths(dir, &config).len(), 1);
    }

    #[test]
    fn test_render_charts_writes_both_files() {
        let temp_dir = TempDir::new().unwrap();
        let config = ChartConfig {
            width: 600,
            height: 500,
            ..ChartConfig::default()
        };

        let written = render_charts(&sample_table(), temp_dir.path(), &config).unwrap();
        assert_eq!(written.len(), 2);

        for path in &written {
            let meta = std::fs::metadata(path).unwrap();
            assert!(meta.len() > 0, "{} is empty", path.display());
        }

        let png = std::fs::read(&written[0]).unwrap();
        assert_eq!(&png[1..4], b"PNG");

        let svg = std::fs::read_to_string(&written[1]).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Average Claim Gas Delta vs Nested Messages"));
    }

    #[test]
    fn test_png_caption_is_drawn() {
        let (width, height) = (600u32, 500u32);
        let style = ChartStyle::from_config(&ChartConfig {
            width,
            height,
            ..ChartConfig::default()
        })
        .unwrap();

        let mut buffer = vec![0u8; (width * height * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            draw_chart(&root, &sample_table(), &style).unwrap();
            root.present().unwrap();
        }

        // caption sits in the top margin of the relay panel, above the plot area
        let caption_rows = &buffer[(15 * width * 3) as usize..(40 * width * 3) as usize];
        let dark_pixels = caption_rows
            .chunks(3)
            .filter(|px| px.iter().all(|&c| c < 100))
            .count();
        assert!(dark_pixels > 50, "only {} dark pixels in caption area", dark_pixels);
    }

    #[test]
    fn test_target_legend_kept_when_band_off_screen() {
        let temp_dir = TempDir::new().unwrap();
        let config = ChartConfig {
            width: 600,
            height: 500,
            png: false,
            ..ChartConfig::default()
        };
        let table = SummaryTable {
            rows: vec![SummaryRow {
                nested_messages: 1,
                samples: 2,
                relay: summary(500.0, 5.0),
                claim: summary(900.0, 20.0),
            }],
        };

        let written = render_charts(&table, temp_dir.path(), &config).unwrap();
        let svg = std::fs::read_to_string(&written[0]).unwrap();
        assert_eq!(svg.matches("Target Range (0-15)").count(), 2);
    }
}
