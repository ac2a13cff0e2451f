//! SVG figures: line charts per section and unit, box charts for the
//! `*_BOX` metrics, a combined bitrate view per experiment, and the
//! cross-experiment loss bars.

use std::error::Error;
use std::fs;
use std::ops::Range;
use std::path::{Component, Path, PathBuf};

use plotters::prelude::*;

use super::palette::Palette;
use crate::aggregate::{ExperimentReport, MetricData, MetricKey, MetricSection, Unit};
use crate::error::{Result, StatsError};
use crate::registry::{LossRegistry, LossSource};
use crate::stats::BoxSummary;

const SIZE: (u32, u32) = (1200, 700);
const BOX_HALF_WIDTH: f64 = 0.3;
const COMBINED_FIGURE: &str = "all_bitrate.svg";
/// Congestion window bytes to kbps on the combined view.
const CWND_TO_KBPS: f64 = 8.0 / 1000.0;

type DrawResult = std::result::Result<(), Box<dyn Error>>;

fn slug(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

/// Value range padded so that flat or empty data still gets an axis.
fn padded(min: f64, max: f64) -> Range<f64> {
    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }
    if (max - min).abs() < f64::EPSILON {
        return (min - 1.0)..(max + 1.0);
    }
    let pad = (max - min) * 0.05;
    (min - pad)..(max + pad)
}

fn bounds<'a>(values: impl Iterator<Item = &'a f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

fn draw_lines(out: &Path, title: &str, unit: Unit, lines: &[(&MetricData, RGBColor)]) -> DrawResult {
    let xs: Vec<f64> = lines.iter().flat_map(|(d, _)| d.points().iter().map(|p| p.timestamp)).collect();
    let ys: Vec<f64> = lines.iter().flat_map(|(d, _)| d.points().iter().map(|p| p.value)).collect();
    let (x0, x1) = bounds(xs.iter());
    let (y0, y1) = bounds(ys.iter());

    let root = SVGBackend::new(out, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(padded(x0, x1), padded(y0.min(0.0), y1))?;

    chart
        .configure_mesh()
        .x_desc("time (s)")
        .y_desc(unit.label())
        .draw()?;

    for &(data, color) in lines {
        let points = data.points().iter().map(|p| (p.timestamp, p.value));
        chart
            .draw_series(LineSeries::new(points, &color))?
            .label(data.series.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn draw_boxes(out: &Path, title: &str, unit: Unit, boxes: &[BoxSummary], color: RGBColor) -> DrawResult {
    let xs: Vec<f64> = boxes
        .iter()
        .enumerate()
        .map(|(i, b)| b.label.parse().unwrap_or(i as f64))
        .collect();
    let (x0, x1) = bounds(xs.iter());
    let (y0, _) = bounds(boxes.iter().map(|b| &b.lower_extreme));
    let (_, y1) = bounds(boxes.iter().map(|b| &b.upper_extreme));

    let root = SVGBackend::new(out, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d((x0 - 1.0)..(x1 + 1.0), padded(y0, y1))?;

    chart
        .configure_mesh()
        .x_desc("time (s)")
        .y_desc(unit.label())
        .draw()?;

    for (b, &x) in boxes.iter().zip(&xs) {
        let (left, right) = (x - BOX_HALF_WIDTH, x + BOX_HALF_WIDTH);
        chart.draw_series(std::iter::once(Rectangle::new(
            [(left, b.lower_quartile), (right, b.upper_quartile)],
            color.stroke_width(1),
        )))?;
        chart.draw_series([
            PathElement::new(vec![(left, b.median), (right, b.median)], color.stroke_width(2)),
            PathElement::new(vec![(x, b.upper_quartile), (x, b.upper_extreme)], color.stroke_width(1)),
            PathElement::new(vec![(x, b.lower_quartile), (x, b.lower_extreme)], color.stroke_width(1)),
        ])?;
    }

    root.present()?;
    Ok(())
}

fn render_section(
    report: &ExperimentReport,
    section: &MetricSection,
    palette: &mut Palette,
    dir: &Path,
    written: &mut Vec<PathBuf>,
) -> Result<()> {
    let format = slug(section.format.name());

    let mut units: Vec<Unit> = Vec::new();
    for data in section.iter().filter(|d| !d.key().is_box() && !d.points().is_empty()) {
        if !units.contains(&data.key().unit()) {
            units.push(data.key().unit());
        }
    }

    for unit in units {
        let lines: Vec<(&MetricData, RGBColor)> = section
            .iter()
            .filter(|d| !d.key().is_box() && d.key().unit() == unit && !d.points().is_empty())
            .map(|d| (d, palette.color_for(&report.path, d.key())))
            .collect();
        let out = dir.join(format!("{}_{}.svg", format, slug(unit.label())));
        let title = format!("{} {} ({})", report.label, section.format.name(), unit.label());
        draw_lines(&out, &title, unit, &lines).map_err(|e| StatsError::chart(&out, e))?;
        written.push(out);
    }

    for data in section.iter().filter(|d| d.key().is_box() && !d.boxes.is_empty()) {
        let out = dir.join(format!("{}_{}.svg", format, slug(data.key().name())));
        let color = palette.color_for(&report.path, data.key());
        draw_boxes(&out, &data.series.label, data.key().unit(), &data.boxes, color)
            .map_err(|e| StatsError::chart(&out, e))?;
        written.push(out);
    }
    Ok(())
}

struct CombinedLine {
    name: String,
    key: MetricKey,
    points: Vec<(f64, f64)>,
}

/// Every kbps series of `report` plus the congestion window rescaled to
/// kbps, and separately the windowed loss series.
fn combined_lines(report: &ExperimentReport) -> (Vec<CombinedLine>, Vec<CombinedLine>) {
    let mut rates = Vec::new();
    let mut losses = Vec::new();

    for section in report.sections.values() {
        for data in section.iter().filter(|d| !d.points().is_empty()) {
            let key = data.key();
            let scale = match key {
                MetricKey::Cwnd => Some(CWND_TO_KBPS),
                MetricKey::BitrateBox | MetricKey::BitrateInterquartile => None,
                k if k.unit() == Unit::Kbps => Some(1.0),
                _ => None,
            };
            let line = |scale: f64| CombinedLine {
                name: format!("{} {}", section.format.name(), key.name()),
                key,
                points: data.points().iter().map(|p| (p.timestamp, p.value * scale)).collect(),
            };
            match scale {
                Some(scale) => rates.push(line(scale)),
                None if key == MetricKey::Loss => losses.push(line(1.0)),
                None => {}
            }
        }
    }
    (rates, losses)
}

fn draw_combined(
    out: &Path,
    title: &str,
    rates: &[(CombinedLine, RGBColor)],
    losses: &[(CombinedLine, RGBColor)],
) -> DrawResult {
    let all = || rates.iter().chain(losses).flat_map(|(l, _)| l.points.iter());
    let (x0, x1) = bounds(all().map(|(x, _)| x));
    let (y0, y1) = bounds(rates.iter().flat_map(|(l, _)| l.points.iter().map(|(_, y)| y)));
    let (_, l1) = bounds(losses.iter().flat_map(|(l, _)| l.points.iter().map(|(_, y)| y)));

    let root = SVGBackend::new(out, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .right_y_label_area_size(60)
        .build_cartesian_2d(padded(x0, x1), padded(y0.min(0.0), y1))?
        .set_secondary_coord(padded(x0, x1), padded(0.0, l1.max(0.0)));

    chart
        .configure_mesh()
        .x_desc("time (s)")
        .y_desc(Unit::Kbps.label())
        .draw()?;
    chart
        .configure_secondary_axes()
        .y_desc(Unit::Packets.label())
        .draw()?;

    for (line, color) in rates {
        let color = *color;
        chart
            .draw_series(LineSeries::new(line.points.iter().copied(), &color))?
            .label(line.name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }
    for (line, color) in losses {
        let color = *color;
        chart
            .draw_secondary_series(LineSeries::new(line.points.iter().copied(), color.stroke_width(2)))?
            .label(line.name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn render_combined(report: &ExperimentReport, palette: &mut Palette, dir: &Path) -> Result<Option<PathBuf>> {
    let (rates, losses) = combined_lines(report);
    if rates.is_empty() {
        return Ok(None);
    }
    let mut with_colors = |lines: Vec<CombinedLine>| -> Vec<(CombinedLine, RGBColor)> {
        lines
            .into_iter()
            .map(|l| {
                let color = palette.color_for(&report.path, l.key);
                (l, color)
            })
            .collect()
    };
    let rates = with_colors(rates);
    let losses = with_colors(losses);

    let out = dir.join(COMBINED_FIGURE);
    let title = format!("{} all bitrates", report.label);
    draw_combined(&out, &title, &rates, &losses).map_err(|e| StatsError::chart(&out, e))?;
    Ok(Some(out))
}

/// Output directory for one experiment: its path below `results_root`,
/// one slugged directory per component. Falls back to the directory name
/// for the root itself or a path outside it.
fn figure_dir(out_dir: &Path, experiment: &Path, results_root: &Path) -> PathBuf {
    let relative = experiment.strip_prefix(results_root).unwrap_or(experiment);
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(slug(&part.to_string_lossy())),
            _ => None,
        })
        .collect();

    if parts.is_empty() {
        let name = experiment
            .file_name()
            .map(|n| slug(&n.to_string_lossy()))
            .unwrap_or_else(|| "results".to_string());
        return out_dir.join(name);
    }
    parts.iter().fold(out_dir.to_path_buf(), |dir, part| dir.join(part))
}

/// Writes every figure of `report` under `out_dir`, in a directory that
/// mirrors the experiment's path below `results_root`.
pub fn render_report(
    report: &ExperimentReport,
    palette: &mut Palette,
    out_dir: &Path,
    results_root: &Path,
) -> Result<Vec<PathBuf>> {
    let dir = figure_dir(out_dir, &report.path, results_root);
    fs::create_dir_all(&dir)?;

    let mut written = Vec::new();
    for section in report.sections.values() {
        render_section(report, section, palette, &dir, &mut written)?;
    }
    written.extend(render_combined(report, palette, &dir)?);
    log::debug!("{}: {} figures in {}", report.label, written.len(), dir.display());
    Ok(written)
}

fn draw_loss(out: &Path, names: &[String], bars: &[(f64, f64)]) -> DrawResult {
    let top = bars.iter().map(|&(r, p)| r.max(p)).fold(0.0, f64::max).max(1.0) * 1.1;

    let root = SVGBackend::new(out, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("Loss per experiment", ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..names.len() as f64, 0.0..top)?;

    let label_of = |x: &f64| names.get(x.floor() as usize).cloned().unwrap_or_default();
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(names.len().max(1))
        .x_label_formatter(&label_of)
        .y_desc("loss (%)")
        .draw()?;

    let (relay_color, protocol_color) = (BLUE, RED);
    for (i, &(relay, protocol)) in bars.iter().enumerate() {
        let x = i as f64;
        chart.draw_series([
            Rectangle::new([(x + 0.1, 0.0), (x + 0.5, relay)], relay_color.filled()),
            Rectangle::new([(x + 0.5, 0.0), (x + 0.9, protocol)], protocol_color.filled()),
        ])?;
    }

    root.present()?;
    Ok(())
}

/// Loss-percentage bars, relay and protocol side by side. Entries
/// without data draw as zero height.
pub fn render_loss(registry: &LossRegistry, labels: &dyn Fn(&Path) -> String, out: &Path) -> Result<()> {
    let snapshot = registry.snapshot();
    if snapshot.is_empty() {
        return Ok(());
    }
    let names: Vec<String> = snapshot.iter().map(|(path, _)| labels(path)).collect();
    let bars: Vec<(f64, f64)> = snapshot
        .iter()
        .map(|(_, b)| {
            let pct = |s: LossSource| b.get(s).and_then(|l| l.percentage()).unwrap_or(0.0);
            (pct(LossSource::Relay), pct(LossSource::Protocol))
        })
        .collect();

    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent)?;
    }
    draw_loss(out, &names, &bars).map_err(|e| StatsError::chart(out, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_are_file_safe() {
        assert_eq!(slug("received bitrate"), "received_bitrate");
        assert_eq!(slug("RTT box"), "rtt_box");
    }

    #[test]
    fn runs_sharing_a_label_get_their_own_directory() {
        let root = Path::new("/results");
        let out = Path::new("/figs");
        let run1 = figure_dir(out, &root.join("mvfst_bbr_stream_run1"), root);
        let run2 = figure_dir(out, &root.join("mvfst_bbr_stream_run2"), root);
        assert_ne!(run1, run2);
        assert_eq!(run1, out.join("mvfst_bbr_stream_run1"));
        assert_eq!(
            figure_dir(out, &root.join("mvfst_bbr_stream_run1/average"), root),
            out.join("mvfst_bbr_stream_run1/average")
        );
        assert_eq!(figure_dir(out, root, root), out.join("results"));
    }

    #[test]
    fn combined_view_scales_cwnd_and_splits_losses() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("quicgo_cubic_stream");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("quic-relay-1.csv"),
            "10|1|1|1000|0|5|0|0|0|0|0|0|20|10|0|0|0\n\
             10|1|1|1000|1000|0|0|0|0|0|0|0|0|0|0|0|0\n",
        )
        .unwrap();
        fs::write(
            dir.join("client.sqlog"),
            "{\"name\":\"recovery:metrics_updated\",\"time\":0,\"data\":{\"congestion_window\":10000}}\n",
        )
        .unwrap();
        let report = crate::aggregate::load_experiment(&dir, &Default::default()).unwrap();

        let (rates, losses) = combined_lines(&report);
        let cwnd = rates.iter().find(|l| l.key == MetricKey::Cwnd).unwrap();
        assert_eq!(cwnd.name, "protocol Cwnd");
        assert_eq!(cwnd.points.len(), 1);
        assert!((cwnd.points[0].1 - 80.0).abs() < 1e-9);
        assert!(rates.iter().any(|l| l.name == "relay Total"));
        assert!(rates.iter().all(|l| l.key.unit() == Unit::Kbps || l.key == MetricKey::Cwnd));
        assert!(!losses.is_empty());
        assert!(losses.iter().all(|l| l.key == MetricKey::Loss));
    }

    #[test]
    fn flat_ranges_get_padding() {
        assert_eq!(padded(5.0, 5.0), 4.0..6.0);
        assert_eq!(padded(f64::INFINITY, f64::NEG_INFINITY), 0.0..1.0);
        let r = padded(0.0, 100.0);
        assert!(r.start < 0.0 && r.end > 100.0);
    }
}
