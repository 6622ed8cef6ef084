//! stemmix CLI entry point

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::Mutex;
use stemmix::config::{Cli, Settings};
use stemmix::discovery;
use stemmix::pipeline::{self, Collaborators, PipelineEvent};
use tracing::warn;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(&cli);

    // Validate inputs
    if let Err(e) = validate_inputs(&cli) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    // Build settings from CLI (detects the toolchain once)
    let settings = Settings::from_cli(&cli);

    let inputs = match discovery::collect_inputs(settings.folder.as_deref(), &settings.files) {
        Ok(inputs) => inputs,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = std::fs::create_dir_all(&settings.destination) {
        eprintln!(
            "Error: cannot create output folder {}: {}",
            settings.destination.display(),
            e
        );
        return ExitCode::FAILURE;
    }

    let show_progress = settings.show_progress;
    let collaborators = Collaborators::from_settings(&settings);
    let handle = match pipeline::spawn(inputs, settings, collaborators) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Fatal error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // First Ctrl-C finishes the current track, a second one aborts
    let stop = handle.stop_flag();
    if let Err(e) = ctrlc::set_handler(move || {
        if stop.swap(true, Ordering::SeqCst) {
            std::process::exit(130);
        }
        eprintln!("Stopping after the current track (Ctrl-C again to abort)");
    }) {
        warn!("Could not install Ctrl-C handler: {}", e);
    }

    let progress_bar = show_progress.then(|| {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb
    });

    // The worker owns the pipeline; this thread only renders its events
    for event in handle.events().iter() {
        render_event(progress_bar.as_ref(), event);
    }

    match handle.join() {
        Ok(summary) => {
            println!();
            println!("Successful: {}, Failed: {}", summary.succeeded, summary.failed);
            if summary.stopped {
                println!("Stopped before all tracks were processed");
            }

            if summary.failed > 0 {
                println!("See {} for details", cli.log_file.display());
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Fatal error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn render_event(pb: Option<&ProgressBar>, event: PipelineEvent) {
    match (pb, event) {
        (Some(pb), PipelineEvent::Progress { current, total, label }) => {
            pb.set_length(total as u64);
            pb.set_position(current.saturating_sub(1) as u64);
            pb.set_message(label);
        }
        (Some(pb), PipelineEvent::Log { text }) => {
            pb.set_message(text);
        }
        (Some(pb), PipelineEvent::TrackFailed { track, stage, reason }) => {
            pb.println(format!("✗ {} failed during {}: {}", track, stage, reason));
        }
        (Some(pb), PipelineEvent::VariantFailed { track, variant, reason }) => {
            pb.println(format!("! {} skipped {}: {}", track, variant, reason));
        }
        (Some(pb), PipelineEvent::BatchComplete { .. }) => {
            pb.set_position(pb.length().unwrap_or(0));
            pb.finish_with_message("Done");
        }
        (None, PipelineEvent::TrackFailed { track, stage, reason }) => {
            eprintln!("{} failed during {}: {}", track, stage, reason);
        }
        (None, _) => {}
    }
}

fn init_logging(cli: &Cli) {
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = if cli.quiet { "error" } else { filter };

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)));

    // The run log always records info and above
    let file_level = std::cmp::max(cli.log_level(), tracing::Level::INFO);
    let file_layer = match open_log_file(&cli.log_file) {
        Ok(file) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file))
                .with_filter(LevelFilter::from_level(file_level)),
        ),
        Err(e) => {
            eprintln!(
                "Warning: cannot open log file {}: {}",
                cli.log_file.display(),
                e
            );
            None
        }
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();
}

/// Open the run log for appending and write a timestamped run header
fn open_log_file(path: &Path) -> std::io::Result<File> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(
        file,
        "\n=== stemmix run started {} ===",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    )?;
    Ok(file)
}

fn validate_inputs(cli: &Cli) -> Result<(), String> {
    if !cli.has_inputs() {
        return Err(
            "No input given.\n\n  Tip: Pass --folder DIR, one or more --file PATH, or --url URL.\n  Examples:\n    stemmix --folder ~/Music/set -o ./out\n    stemmix --url https://youtu.be/VIDEO_ID -o ./out"
                .to_string(),
        );
    }

    if let Some(folder) = &cli.folder {
        if !folder.is_dir() {
            return Err(format!(
                "Input folder does not exist: {}\n\n  Tip: Check the path is correct and accessible.",
                folder.display()
            ));
        }
    }

    // Check output parent directory exists (we'll create the output dir itself)
    if let Some(parent) = cli.output_folder.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(format!(
                "Output parent directory does not exist: {}\n\n  Tip: The output directory will be created automatically,\n  but its parent directory must exist.\n  Example: mkdir -p {}",
                parent.display(),
                parent.display()
            ));
        }
    }

    Ok(())
}
