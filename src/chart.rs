use crate::config::{FamilyTable, SeriesConfig};
use crate::decompose::{Decomposer, Factor};
use crate::extract::{Extractor, MetricKind};
use crate::record::{Direction, Record};
use crate::series::{assemble, assemble_decomposition, tradeoff, Series};
use anyhow::{Context, Result};
use plotters::prelude::*;
use std::path::{Path, PathBuf};

// Font sizes
// NOTE: These are intentionally large because SVGs are often viewed scaled down in browsers/docs.
const TITLE_FONT_SIZE: u32 = 36;
const AXIS_LABEL_FONT_SIZE: u32 = 24;
const TICK_LABEL_FONT_SIZE: u32 = 18;
const LEGEND_FONT_SIZE: u32 = 18;

const DEFAULT_MARGIN_BOTTOM: u32 = 55;
const DEFAULT_X_LABEL_AREA_SIZE: u32 = 60;
const CHART_SIZE: (u32, u32) = (1000, 600);

/// Fallback palette for labels without a fixed colour
const COLORS: &[RGBColor] = &[
    RGBColor(214, 39, 40),   // Red
    RGBColor(44, 160, 44),   // Green
    RGBColor(31, 119, 180),  // Blue
    RGBColor(148, 103, 189), // Purple
    RGBColor(255, 127, 14),  // Orange
    RGBColor(140, 86, 75),   // Brown
];

fn get_series_color(label: &str, index: usize) -> RGBColor {
    match label {
        "Proto + OpenZL" => COLORS[0],
        "Proto + zstd" => COLORS[1],
        "Arrow + zstd" => COLORS[2],
        "Arrow (No Dict) + zstd" => COLORS[3],
        _ => COLORS[index % COLORS.len()],
    }
}

/// Compact batch size label for log-scale ticks
fn format_batch_size(batch_size: f64) -> String {
    if batch_size <= 0.0 {
        return String::new();
    }
    // Only label powers of 10 on log axes (keeps SVGs readable).
    let log10 = batch_size.log10();
    if (log10 - log10.round()).abs() > 1e-6 {
        return String::new();
    }
    if batch_size >= 1_000_000.0 {
        format!("{:.0}M", batch_size / 1_000_000.0)
    } else if batch_size >= 1_000.0 {
        format!("{:.0}K", batch_size / 1_000.0)
    } else {
        format!("{:.0}", batch_size)
    }
}

/// Titles and decorations for one chart
#[derive(Debug, Clone)]
pub struct ChartSpec {
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    /// Shade ±std around each line when points carry one
    pub show_std: bool,
    /// Grey horizontal marker, e.g. 1.0 on improvement charts
    pub reference_line: Option<f64>,
}

impl ChartSpec {
    pub fn new(title: impl Into<String>, y_desc: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            x_desc: "Batch Size".to_string(),
            y_desc: y_desc.into(),
            show_std: true,
            reference_line: None,
        }
    }
}

/// Draw series against batch size (log x axis) into an SVG file.
///
/// Returns `false` without touching the file system when there is nothing
/// to draw.
pub fn render_series_chart(spec: &ChartSpec, series: &[Series], path: &Path) -> Result<bool> {
    let all_points = || series.iter().flat_map(|s| s.points.iter());
    if all_points().next().is_none() {
        return Ok(false);
    }

    let min_batch = all_points().map(|p| p.batch_size).min().unwrap_or(1).max(1) as f64;
    let max_batch = all_points().map(|p| p.batch_size).max().unwrap_or(1).max(1) as f64;
    let upper = |value: f64, std: Option<f64>| {
        if spec.show_std {
            value + std.unwrap_or(0.0)
        } else {
            value
        }
    };
    let max_value = all_points()
        .map(|p| upper(p.value, p.std))
        .chain(spec.reference_line)
        .fold(0.0_f64, f64::max);
    let y_max = if max_value > 0.0 { max_value * 1.1 } else { 1.0 };

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(&spec.title, ("sans-serif", TITLE_FONT_SIZE))
        .margin(20)
        .margin_bottom(DEFAULT_MARGIN_BOTTOM)
        .x_label_area_size(DEFAULT_X_LABEL_AREA_SIZE)
        .y_label_area_size(90)
        .build_cartesian_2d(
            (min_batch * 0.8..max_batch * 1.25).log_scale(),
            0.0..y_max,
        )?;

    chart
        .configure_mesh()
        .x_label_formatter(&|x| format_batch_size(*x))
        .x_desc(spec.x_desc.as_str())
        .y_desc(spec.y_desc.as_str())
        .label_style(("sans-serif", TICK_LABEL_FONT_SIZE))
        .axis_desc_style(("sans-serif", AXIS_LABEL_FONT_SIZE))
        .draw()?;

    if let Some(y) = spec.reference_line {
        chart.draw_series(LineSeries::new(
            vec![(min_batch * 0.8, y), (max_batch * 1.25, y)],
            RGBColor(128, 128, 128).stroke_width(2),
        ))?;
    }

    for (idx, s) in series.iter().enumerate() {
        if s.is_empty() {
            continue;
        }
        let color = get_series_color(&s.label, idx);
        let data: Vec<(f64, f64)> = s
            .points
            .iter()
            .map(|p| (p.batch_size as f64, p.value))
            .collect();

        if spec.show_std && s.points.iter().any(|p| p.std.is_some()) {
            let mut band: Vec<(f64, f64)> = s
                .points
                .iter()
                .map(|p| (p.batch_size as f64, p.value + p.std.unwrap_or(0.0)))
                .collect();
            band.extend(
                s.points
                    .iter()
                    .rev()
                    .map(|p| (p.batch_size as f64, (p.value - p.std.unwrap_or(0.0)).max(0.0))),
            );
            chart.draw_series(std::iter::once(Polygon::new(band, color.mix(0.15).filled())))?;
        }

        chart
            .draw_series(LineSeries::new(data.clone(), color.stroke_width(3)))?
            .label(s.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(3)));

        chart.draw_series(PointSeries::of_element(
            data,
            6,
            color.filled(),
            &|coord, size, style| EmptyElement::at(coord) + Circle::new((0, 0), size, style),
        ))?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font(("sans-serif", LEGEND_FONT_SIZE))
        .draw()?;

    root.present()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}

/// Draw speed-vs-ratio curves (linear axes), one line per label
pub fn render_tradeoff_chart(
    title: &str,
    x_desc: &str,
    lines: &[(String, Vec<(f64, f64)>)],
    path: &Path,
) -> Result<bool> {
    let all_points = || lines.iter().flat_map(|(_, points)| points.iter());
    if all_points().next().is_none() {
        return Ok(false);
    }

    let x_max = all_points().map(|p| p.0).fold(0.0_f64, f64::max);
    let y_max = all_points().map(|p| p.1).fold(0.0_f64, f64::max);
    let x_max = if x_max > 0.0 { x_max * 1.1 } else { 1.0 };
    let y_max = if y_max > 0.0 { y_max * 1.1 } else { 1.0 };

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", TITLE_FONT_SIZE))
        .margin(20)
        .margin_bottom(DEFAULT_MARGIN_BOTTOM)
        .x_label_area_size(DEFAULT_X_LABEL_AREA_SIZE)
        .y_label_area_size(90)
        .build_cartesian_2d(0.0..x_max, 0.0..y_max)?;

    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc("Compression Ratio (vs reference)")
        .label_style(("sans-serif", TICK_LABEL_FONT_SIZE))
        .axis_desc_style(("sans-serif", AXIS_LABEL_FONT_SIZE))
        .draw()?;

    for (idx, (label, points)) in lines.iter().enumerate() {
        if points.is_empty() {
            continue;
        }
        let color = get_series_color(label, idx);
        chart
            .draw_series(LineSeries::new(points.clone(), color.stroke_width(3)))?
            .label(label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(3)));
        chart.draw_series(PointSeries::of_element(
            points.clone(),
            6,
            color.filled(),
            &|coord, size, style| EmptyElement::at(coord) + Circle::new((0, 0), size, style),
        ))?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font(("sans-serif", LEGEND_FONT_SIZE))
        .draw()?;

    root.present()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}

/// What a planned chart draws
#[derive(Debug, Clone)]
pub enum ChartContent {
    /// Values against batch size
    Series(ChartSpec, Vec<Series>),
    /// Labelled (speed, ratio) curves
    Tradeoff {
        title: String,
        x_desc: String,
        lines: Vec<(String, Vec<(f64, f64)>)>,
    },
}

/// A chart to be written as `file_name` in the output directory
#[derive(Debug, Clone)]
pub struct ChartPlan {
    pub file_name: String,
    pub content: ChartContent,
}

impl ChartPlan {
    pub fn has_data(&self) -> bool {
        match &self.content {
            ChartContent::Series(_, series) => series.iter().any(|s| !s.is_empty()),
            ChartContent::Tradeoff { lines, .. } => lines.iter().any(|(_, points)| !points.is_empty()),
        }
    }

    /// Render into `output_dir`; `None` when there was nothing to draw
    pub fn render(&self, output_dir: &Path) -> Result<Option<PathBuf>> {
        let path = output_dir.join(&self.file_name);
        let drawn = match &self.content {
            ChartContent::Series(spec, series) => render_series_chart(spec, series, &path)?,
            ChartContent::Tradeoff {
                title,
                x_desc,
                lines,
            } => render_tradeoff_chart(title, x_desc, lines, &path)?,
        };
        Ok(drawn.then_some(path))
    }
}

fn metric_charts() -> Vec<MetricKind> {
    let mut kinds = vec![MetricKind::Ratio];
    for &direction in Direction::all() {
        kinds.push(MetricKind::E2eSpeed(direction));
        kinds.push(MetricKind::Time(direction));
    }
    kinds
}

/// Work out every chart for one dataset without drawing anything
pub fn plan_dataset_charts(
    records: &[Record],
    families: &FamilyTable,
    dataset: &str,
    configs: &[SeriesConfig],
) -> Vec<ChartPlan> {
    let extractor = Extractor::new(records, families);
    let decomposer = Decomposer::new(records, families);
    let mut plans = Vec::new();

    for kind in metric_charts() {
        let spec = ChartSpec::new(format!("{} - {}", dataset, kind.axis_label()), kind.axis_label());
        plans.push(ChartPlan {
            file_name: format!("{}_{}.svg", dataset, kind.slug()),
            content: ChartContent::Series(spec, assemble(&extractor, dataset, configs, kind)),
        });
    }

    for &factor in Factor::all() {
        let mut spec = ChartSpec::new(format!("{} - {}", dataset, factor.slug()), factor.axis_label());
        spec.reference_line = Some(1.0);
        plans.push(ChartPlan {
            file_name: format!("{}_{}.svg", dataset, factor.slug()),
            content: ChartContent::Series(
                spec,
                assemble_decomposition(&decomposer, dataset, configs, factor),
            ),
        });
    }

    let ratios = assemble(&extractor, dataset, configs, MetricKind::Ratio);
    if let Some((leader, rest)) = ratios.split_first() {
        let improvements: Vec<Series> = rest
            .iter()
            .map(|other| leader.ratio_over(other, format!("{} over {}", leader.label, other.label)))
            .filter(|s| !s.is_empty())
            .collect();
        let mut spec = ChartSpec::new(
            format!("{} - {} Improvement", dataset, leader.label),
            "Improvement Ratio",
        );
        spec.reference_line = Some(1.0);
        plans.push(ChartPlan {
            file_name: format!("{}_improvement_ratio.svg", dataset),
            content: ChartContent::Series(spec, improvements),
        });
    }

    for &direction in Direction::all() {
        let speeds = assemble(&extractor, dataset, configs, MetricKind::E2eSpeed(direction));
        let lines = speeds
            .iter()
            .filter_map(|speed| {
                let ratio = ratios.iter().find(|r| r.label == speed.label)?;
                Some((speed.label.clone(), tradeoff(speed, ratio)))
            })
            .collect();
        plans.push(ChartPlan {
            file_name: format!("{}_{}_tradeoff.svg", dataset, direction.name()),
            content: ChartContent::Tradeoff {
                title: format!("{} - {} Speed vs Ratio", dataset, direction.name()),
                x_desc: MetricKind::E2eSpeed(direction).axis_label(),
                lines,
            },
        });
    }

    plans
}

/// Generate all charts for one dataset; returns the files written
pub fn generate_dataset_charts(
    records: &[Record],
    families: &FamilyTable,
    dataset: &str,
    configs: &[SeriesConfig],
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir).context("Failed to create output directory")?;

    let mut written = Vec::new();
    for plan in plan_dataset_charts(records, families, dataset, configs) {
        if let Some(path) = plan.render(output_dir)? {
            written.push(path);
        }
    }
    Ok(written)
}
