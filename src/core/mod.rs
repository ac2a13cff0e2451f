pub mod session;
pub mod settings;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::aggregate::{load_experiment, ExperimentReport};
use crate::error::{Result, StatsError};
use crate::registry::LossRegistry;
use crate::ui::{chart, table};
use crate::utils::helpers::discover_experiments;

pub use session::Session;
pub use settings::{AnalysisSettings, ParsePolicy, SETTINGS_FILE};

// ============================================================================
// RUN CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub results_dir: PathBuf,
    /// Experiment directories relative to `results_dir`; empty means discover.
    pub experiments: Vec<PathBuf>,
    pub settings_path: PathBuf,
    pub summary_csv: Option<PathBuf>,
    pub figures: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub loaded: usize,
    pub failed: Vec<PathBuf>,
    pub figures: Vec<PathBuf>,
}

// ============================================================================
// PARALLEL LOADING
// ============================================================================

/// Aggregates every directory on the blocking pool, at most
/// `settings.workers` at a time. Each finished load notifies `registry`
/// from its worker. Results come back sorted by path.
pub async fn load_all(
    dirs: Vec<PathBuf>,
    settings: Arc<AnalysisSettings>,
    registry: Arc<LossRegistry>,
    progress: ProgressBar,
) -> Result<Vec<(PathBuf, Result<ExperimentReport>)>> {
    let permits = Arc::new(Semaphore::new(settings.workers));
    let mut tasks = JoinSet::new();

    for dir in dirs {
        let permits = Arc::clone(&permits);
        let settings = Arc::clone(&settings);
        let registry = Arc::clone(&registry);
        let progress = progress.clone();
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await;
            progress.set_message(dir.display().to_string());
            let target = dir.clone();
            let result = tokio::task::spawn_blocking(move || -> Result<ExperimentReport> {
                let report = load_experiment(&target, &settings)?;
                registry.record_report(&report);
                Ok(report)
            })
            .await
            .map_err(|e| StatsError::Join(e.to_string()))
            .and_then(|r| r);
            progress.inc(1);
            (dir, result)
        });
    }

    let mut results = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        results.push(joined.map_err(|e| StatsError::Join(e.to_string()))?);
    }
    results.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(results)
}

// ============================================================================
// SUMMARY EXPORT
// ============================================================================

#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    experiment: &'a str,
    path: String,
    mode: &'static str,
    implementation: &'static str,
    cc: &'static str,
    transport: &'static str,
    trace: &'static str,
    metric: &'static str,
    unit: &'static str,
    points: usize,
    mean: Option<f64>,
    std_dev: Option<f64>,
    var_coeff: Option<f64>,
    last: Option<f64>,
    lost: Option<u64>,
    sent: Option<u64>,
    loss_pct: Option<f64>,
}

/// One row per non-empty metric of every report.
pub fn save_summary_csv<'a>(reports: impl IntoIterator<Item = &'a ExperimentReport>, path: &Path) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| StatsError::csv(path, e))?;
    let mut rows = 0;

    for report in reports {
        let path_str = report.path.display().to_string();
        for section in report.sections.values() {
            for data in section.iter().filter(|d| !d.is_empty()) {
                let summary = data.summary;
                writer
                    .serialize(SummaryRow {
                        experiment: &report.label,
                        path: path_str.clone(),
                        mode: report.mode.name(),
                        implementation: report.info.impl_str(),
                        cc: report.info.cc_str(),
                        transport: report.info.mode_str(),
                        trace: section.format.name(),
                        metric: data.key().name(),
                        unit: data.key().unit().label(),
                        points: data.points().len(),
                        mean: summary.map(|m| m.mean),
                        std_dev: summary.map(|m| m.std_dev()),
                        var_coeff: summary.and_then(|m| m.var_coeff),
                        last: data.last().map(|p| p.value),
                        lost: section.loss.map(|l| l.loss),
                        sent: section.loss.map(|l| l.sent),
                        loss_pct: section.loss.and_then(|l| l.percentage()),
                    })
                    .map_err(|e| StatsError::csv(path, e))?;
                rows += 1;
            }
        }
    }

    writer.flush()?;
    Ok(rows)
}

// ============================================================================
// MAIN ANALYSIS FLOW
// ============================================================================

fn experiment_dirs(options: &RunOptions) -> Result<Vec<PathBuf>> {
    if options.experiments.is_empty() {
        return discover_experiments(&options.results_dir).map_err(|e| StatsError::open(&options.results_dir, e));
    }
    Ok(options.experiments.iter().map(|e| options.results_dir.join(e)).collect())
}

pub async fn run_analysis(options: RunOptions) -> Result<RunSummary> {
    use colored::*;

    let separator = "=".repeat(60);
    println!("\n{}", separator);
    println!("{:^60}", "Tunnel Experiment Statistics".bold().cyan());
    println!("{}\n", separator);

    let settings = AnalysisSettings::load(&options.settings_path)?;
    println!("{}", "Settings".bold().yellow());
    println!("━━━━━━━━");
    println!("  Results:      {}", options.results_dir.display());
    println!("  Window:       {} (time scale {})", settings.window_duration, settings.time_scale);
    println!("  Bucket width: {} s", settings.bucket_width);
    println!("  Parse policy: {:?}", settings.parse_policy);
    println!("  Workers:      {}", settings.workers);
    println!();

    let dirs = experiment_dirs(&options)?;
    if dirs.is_empty() {
        println!("{}", "No experiment directories found.".bold().yellow());
        return Ok(RunSummary::default());
    }

    println!("{}", format!("Loading {} experiments", dirs.len()).bold().yellow());
    println!("━━━━━━━━━━━━━━━━━━━━━━");
    let pb = ProgressBar::new(dirs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );

    let settings = Arc::new(settings);
    let registry = Arc::new(LossRegistry::new());
    let results = load_all(dirs, Arc::clone(&settings), Arc::clone(&registry), pb.clone()).await?;
    pb.finish_with_message("loading completed");

    let mut session = Session::with_registry((*settings).clone(), registry);
    let mut summary = RunSummary::default();
    for (dir, result) in results {
        match result {
            Ok(report) => {
                session.insert(report);
                summary.loaded += 1;
            }
            Err(e) => {
                log::error!("{}: {}", dir.display(), e);
                eprintln!("{} {}", "❌ Failed:".bold().red(), e);
                summary.failed.push(dir);
            }
        }
    }

    for report in session.reports() {
        println!(
            "\n{} {}",
            report.label.bold().green(),
            format!(
                "[{} | {} | {} | {}]",
                report.info.impl_str(),
                report.info.cc_str(),
                report.info.mode_str(),
                report.mode.name()
            )
            .dimmed()
        );
        println!("{}", table::report_table(report));
    }

    let label = |p: &Path| session.label_of(p);
    if !session.registry().is_empty() {
        println!("\n{}", "Loss".bold().yellow());
        println!("━━━━");
        println!("{}", table::loss_table(session.registry(), &label));
    }

    if let Some(path) = &options.summary_csv {
        let rows = save_summary_csv(session.reports(), path)?;
        println!("\n✅ Summary written to {} ({} rows)", path.display(), rows);
    }

    if let Some(dir) = &options.figures {
        let registry = Arc::clone(session.registry());
        let labels: Vec<(PathBuf, String)> = session.reports().map(|r| (r.path.clone(), r.label.clone())).collect();
        let (reports, palette) = session.render_parts();
        for report in reports {
            summary.figures.extend(chart::render_report(report, palette, dir, &options.results_dir)?);
        }

        let loss_out = dir.join("loss.svg");
        let label_of = |p: &Path| {
            labels
                .iter()
                .find(|(path, _)| path == p)
                .map(|(_, l)| l.clone())
                .unwrap_or_else(|| p.display().to_string())
        };
        if !registry.is_empty() {
            chart::render_loss(&registry, &label_of, &loss_out)?;
            summary.figures.push(loss_out);
        }
        println!("\n✅ {} figures written to {}", summary.figures.len(), dir.display());
    }

    if !summary.failed.is_empty() {
        println!(
            "\n{}",
            format!("{} of {} experiments failed to load", summary.failed.len(), summary.failed.len() + summary.loaded)
                .bold()
                .red()
        );
    }
    Ok(summary)
}
