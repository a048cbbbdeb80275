//! ecgbeats: beat counting for `time,voltage` CSV recordings.
//!
//! Commands:
//! - analyze: detect beats in one file or every CSV in a directory
//! - synth: write a synthetic ECG recording

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use slog::{info, warn, Logger};

use ecgcore::batch::{self, Batch, RecordingReport};
use ecgcore::log::create_logger;
use ecgcore::mock::SyntheticEcg;
use ecgcore::storage::{self, TrackingSheet};
use ecgcore::{Analysis, Error, Interval, Parameters};

#[derive(Parser)]
#[command(name = "ecgbeats")]
#[command(about = "Count heart beats in voltage recordings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a recording file or a directory of recordings
    Analyze {
        /// CSV file or directory holding CSV files
        path: PathBuf,

        /// Window for the heart rate, in seconds
        #[arg(long, num_args = 2, value_names = ["START", "END"], allow_hyphen_values = true)]
        window: Option<Vec<String>>,

        /// JSON file overriding analysis parameters
        #[arg(long)]
        params: Option<PathBuf>,

        /// Analyze files concurrently
        #[arg(long)]
        parallel: bool,

        /// Beat tracking workbook (.xlsx) to annotate
        #[arg(long)]
        tracking: Option<PathBuf>,

        /// Directory for detection plots
        #[arg(long)]
        plot_dir: Option<PathBuf>,
    },

    /// Write a synthetic ECG recording as CSV
    Synth {
        #[arg(short, long)]
        out: PathBuf,

        #[arg(long, default_value = "60")]
        bpm: f64,

        #[arg(long, default_value = "10")]
        beats: usize,

        #[arg(long, default_value = "0")]
        seed: u64,

        /// Half-width of the uniform noise added to each sample
        #[arg(long, default_value = "0")]
        noise: f64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let log = create_logger("ecgbeats");

    match run(cli, &log) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, log: &Logger) -> Result<(), Error> {
    match cli.command {
        Commands::Analyze {
            path,
            window,
            params,
            parallel,
            tracking,
            plot_dir,
        } => {
            let params = match params {
                Some(file) => Parameters::from_json_file(file)?,
                None => Parameters::default(),
            };
            let window = window.and_then(|w| match w.as_slice() {
                [start, end] => {
                    let parsed = Interval::parse_window(start, end);
                    if parsed.is_none() {
                        warn!(log, "window is not numeric, using the full recording";
                            "start" => start, "end" => end);
                    }
                    parsed
                }
                _ => None,
            });
            analyze(&path, window, params, parallel, tracking.as_deref(), plot_dir, log)
        }
        Commands::Synth {
            out,
            bpm,
            beats,
            seed,
            noise,
        } => {
            let ecg = SyntheticEcg {
                bpm,
                beats,
                noise,
                ..SyntheticEcg::default()
            };
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_path(&out)?;
            for sample in ecg.generate(seed).samples() {
                writer.write_record([sample.time.to_string(), sample.voltage.to_string()])?;
            }
            writer.flush()?;
            info!(log, "synthetic recording written";
                "file" => out.display().to_string(), "beats" => beats, "bpm" => bpm);
            Ok(())
        }
    }
}

fn analyze(
    path: &Path,
    window: Option<(f64, f64)>,
    params: Parameters,
    parallel: bool,
    tracking: Option<&Path>,
    plot_dir: Option<PathBuf>,
    log: &Logger,
) -> Result<(), Error> {
    let files = if path.is_dir() {
        batch::csv_files(path)?
    } else {
        vec![path.to_path_buf()]
    };

    let analysis = with_plots(Analysis::new(params, log.clone()), plot_dir, log);
    let batch = Batch::new(analysis, log.clone())?;
    let reports = if parallel {
        batch.run_parallel(&files, window)
    } else {
        batch.run_serial(&files, window)
    };

    let mut sheet = tracking.map(TrackingSheet::open).transpose()?;
    let mut failed = 0;
    for report in reports {
        match report {
            Ok(report) => record(&report, sheet.as_mut(), log)?,
            Err(_) => failed += 1,
        }
    }
    if let Some(sheet) = sheet {
        sheet.save()?;
    }

    info!(log, "batch finished"; "files" => files.len(), "failed" => failed);
    Ok(())
}

fn record(report: &RecordingReport, sheet: Option<&mut TrackingSheet>, log: &Logger) -> Result<(), Error> {
    let json = storage::write_json(&report.path, &report.metrics)?;
    println!("{}", json.display());

    if let Some(sheet) = sheet {
        match report.key {
            Some(key) => {
                let band = sheet.annotate(key, report.metrics.num_beats, log);
                info!(log, "tracking sheet updated"; "key" => key, "band" => format!("{band:?}"));
            }
            None => warn!(log, "file name has no data key, not tracked";
                "file" => report.path.display().to_string()),
        }
    }
    Ok(())
}

#[cfg(feature = "plot")]
fn with_plots(analysis: Analysis, plot_dir: Option<PathBuf>, _log: &Logger) -> Analysis {
    match plot_dir {
        Some(dir) => analysis.with_plotter(ecgcore::analysis::plotters::png_plotter(dir)),
        None => analysis,
    }
}

#[cfg(not(feature = "plot"))]
fn with_plots(analysis: Analysis, plot_dir: Option<PathBuf>, log: &Logger) -> Analysis {
    if plot_dir.is_some() {
        warn!(log, "built without the plot feature, skipping plots");
    }
    analysis
}
