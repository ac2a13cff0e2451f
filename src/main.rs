use std::path::PathBuf;

use clap::Parser;
use tunnel_stats::core::SETTINGS_FILE;
use tunnel_stats::{run_analysis, RunOptions};

/// Statistics over tunnel experiment result sets
///
/// Loads every experiment directory under RESULTS_DIR (or only the ones
/// given with --experiment), prints per-metric summaries and loss rates,
/// and optionally writes a CSV summary and SVG figures.
#[derive(Parser)]
#[command(name = "tunnel-stats")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Root of the result set
    results_dir: PathBuf,

    /// Experiment directory relative to RESULTS_DIR (repeatable)
    #[arg(short = 'e', long = "experiment", value_name = "DIR")]
    experiments: Vec<PathBuf>,

    /// Analysis settings file
    #[arg(long, default_value = SETTINGS_FILE)]
    settings: PathBuf,

    /// Write one CSV row per metric to this file
    #[arg(long, value_name = "FILE")]
    summary_csv: Option<PathBuf>,

    /// Write SVG figures into this directory
    #[arg(long, value_name = "DIR")]
    figures: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new().parse_filters(&cli.log_level).init();
    log::info!("tunnel-stats {}", tunnel_stats::VERSION);

    let options = RunOptions {
        results_dir: cli.results_dir,
        experiments: cli.experiments,
        settings_path: cli.settings,
        summary_csv: cli.summary_csv,
        figures: cli.figures,
    };

    if let Err(e) = run_analysis(options).await {
        eprintln!("Fatal error: {}", e);
        std::process::exit(1);
    }
}
