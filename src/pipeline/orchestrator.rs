//! Pipeline orchestration
//!
//! A single background worker runs the batch sequentially: remote
//! acquisition first, then per track separation, mixing, optional pitch
//! shift, writing and cleanup. The worker reports only through an unbounded
//! channel of immutable events and never touches caller state.

use crate::acquisition::{self, MediaFetcher, YtDlpFetcher};
use crate::audio::ShiftChain;
use crate::config::Settings;
use crate::error::{Result, StemmixError};
use crate::export::{self, Encoder, FfmpegEncoder};
use crate::mix::{self, StemSet};
use crate::pitch;
use crate::separation::{
    self, PrecomputedSeparator, SpleeterSeparator, StemSeparator, UnavailableSeparator,
};
use crate::types::{track_name, AudioBuffer, StemRole, Variant};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

// =============================================================================
// Events and outcomes
// =============================================================================

/// Per-track lifecycle stage
///
/// `Acquired -> Separated -> Mixed -> [PitchShifted] -> Written -> CleanedUp`.
/// A failure names the stage the track could not reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackStage {
    Acquired,
    Separated,
    Mixed,
    PitchShifted,
    Written,
    CleanedUp,
}

impl TrackStage {
    pub fn as_str(self) -> &'static str {
        match self {
            TrackStage::Acquired => "acquisition",
            TrackStage::Separated => "separation",
            TrackStage::Mixed => "mixing",
            TrackStage::PitchShifted => "pitch shift",
            TrackStage::Written => "writing",
            TrackStage::CleanedUp => "cleanup",
        }
    }
}

impl fmt::Display for TrackStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status message sent from the worker to the front-end, in order
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Progress {
        current: usize,
        total: usize,
        label: String,
    },
    Log {
        text: String,
    },
    TrackFailed {
        track: String,
        stage: TrackStage,
        reason: String,
    },
    VariantFailed {
        track: String,
        variant: Variant,
        reason: String,
    },
    BatchComplete {
        succeeded: usize,
        failed: usize,
    },
}

/// Terminal state of one track
#[derive(Debug, Clone, PartialEq)]
pub enum TrackOutcome {
    /// At least one variant was written
    Succeeded {
        written: Vec<PathBuf>,
        skipped_variants: Vec<Variant>,
    },
    Failed {
        stage: TrackStage,
        reason: String,
    },
}

impl TrackOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TrackOutcome::Succeeded { .. })
    }
}

/// Outcome of one batch item, labelled by track name or URL
#[derive(Debug, Clone)]
pub struct TrackReport {
    pub track: String,
    pub outcome: TrackOutcome,
}

/// Pipeline result summary
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub reports: Vec<TrackReport>,
    pub succeeded: usize,
    pub failed: usize,
    /// A stop request ended the batch before every track was attempted
    pub stopped: bool,
}

impl BatchSummary {
    fn record(&mut self, report: TrackReport) {
        if report.outcome.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.reports.push(report);
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

fn emit(events: &Sender<PipelineEvent>, event: PipelineEvent) {
    // The receiver may already be gone when the front-end exits early
    if events.send(event).is_err() {
        debug!("Event receiver dropped");
    }
}

fn emit_log(events: &Sender<PipelineEvent>, text: impl Into<String>) {
    emit(events, PipelineEvent::Log { text: text.into() });
}

fn fail(
    events: &Sender<PipelineEvent>,
    track: &str,
    stage: TrackStage,
    reason: String,
) -> TrackOutcome {
    error!("Failed {} at {}: {}", track, stage, reason);
    emit(
        events,
        PipelineEvent::TrackFailed {
            track: track.to_string(),
            stage,
            reason: reason.clone(),
        },
    );
    TrackOutcome::Failed { stage, reason }
}

// =============================================================================
// Collaborators
// =============================================================================

/// Backends the worker drives, chosen once from the detected capabilities
pub struct Collaborators {
    pub separator: Arc<dyn StemSeparator>,
    pub encoder: Arc<dyn Encoder>,
    pub shifter: ShiftChain,
    pub fetcher: Option<Arc<dyn MediaFetcher>>,
}

impl Collaborators {
    pub fn from_settings(settings: &Settings) -> Self {
        let caps = settings.capabilities;
        let ffmpeg = &settings.toolchain.ffmpeg;

        let separator: Arc<dyn StemSeparator> = if let Some(root) = &settings.stems_from {
            info!("Using precomputed stems from {}", root.display());
            Arc::new(PrecomputedSeparator::new(root.clone()))
        } else if caps.separation {
            Arc::new(SpleeterSeparator::new(settings.toolchain.spleeter.clone(), true))
        } else {
            debug!("{} not found", settings.toolchain.spleeter.display());
            Arc::new(UnavailableSeparator)
        };

        if !separator.is_available() {
            warn!(
                "Separator '{}' is not available; tracks will fail at separation. Install spleeter or pass --stems-from DIR",
                separator.name()
            );
        }

        if !caps.external_toolchain {
            warn!(
                "{} not found; MP3 output will fail and pitch shifting uses the in-process resampler",
                ffmpeg.display()
            );
        }

        let fetcher: Option<Arc<dyn MediaFetcher>> = if caps.acquisition {
            Some(Arc::new(YtDlpFetcher::new(
                settings.toolchain.yt_dlp.clone(),
                ffmpeg.clone(),
            )))
        } else {
            None
        };

        Self {
            separator,
            encoder: Arc::new(FfmpegEncoder::new(ffmpeg.clone())),
            shifter: ShiftChain::for_toolchain(ffmpeg, caps.external_toolchain),
            fetcher,
        }
    }
}

// =============================================================================
// Batch
// =============================================================================

/// Pitch ratio for the whole batch; invalid notes disable the shift with a warning
fn resolve_ratio(settings: &Settings, events: &Sender<PipelineEvent>) -> f64 {
    let Some(shift) = &settings.pitch else {
        return 1.0;
    };

    let ratio = pitch::ratio(&shift.from, &shift.to);
    let unrecognized: Vec<&str> = [shift.from.as_str(), shift.to.as_str()]
        .into_iter()
        .filter(|note| !pitch::validate_note(note))
        .collect();

    if shift.from != shift.to && !unrecognized.is_empty() {
        emit_log(
            events,
            format!(
                "Warning: unrecognized note {}; expected one of {}. Using no shift.",
                unrecognized.join(", "),
                pitch::note_names().join(" ")
            ),
        );
    } else {
        info!(
            "Pitch shift {} -> {}: ratio {:.4} ({:+.1} semitones)",
            shift.from,
            shift.to,
            ratio,
            pitch::semitones(ratio)
        );
    }
    ratio
}

/// Download every URL, returning local files plus a failed report per dropped URL
fn acquire_inputs(
    settings: &Settings,
    collaborators: &Collaborators,
    events: &Sender<PipelineEvent>,
) -> (Vec<PathBuf>, Vec<TrackReport>) {
    let mut failed = Vec::new();
    let (valid, invalid) = acquisition::validate_urls(settings.urls.as_slice());

    for url in invalid {
        let outcome = fail(
            events,
            &url,
            TrackStage::Acquired,
            "not a supported video URL".to_string(),
        );
        failed.push(TrackReport { track: url, outcome });
    }

    if valid.is_empty() {
        return (Vec::new(), failed);
    }

    let Some(fetcher) = &collaborators.fetcher else {
        for url in valid {
            let outcome = fail(
                events,
                &url,
                TrackStage::Acquired,
                "downloader unavailable (needs yt-dlp and ffmpeg)".to_string(),
            );
            failed.push(TrackReport { track: url, outcome });
        }
        return (Vec::new(), failed);
    };

    emit_log(events, format!("Downloading {} URL(s)", valid.len()));
    let (files, errors) =
        acquisition::acquire_all(fetcher.as_ref(), &valid, &settings.download_dir);

    for err in errors {
        let url = match &err {
            StemmixError::AcquisitionFailure { url, .. } => url.clone(),
            _ => "URL".to_string(),
        };
        let outcome = fail(events, &url, TrackStage::Acquired, err.to_string());
        failed.push(TrackReport { track: url, outcome });
    }

    (files, failed)
}

/// Run a whole batch: acquisition, then every track in order
///
/// The stop flag is checked between tracks; a track in flight always
/// finishes. `BatchComplete` is the last event sent.
pub fn run_batch(
    inputs: &[PathBuf],
    settings: &Settings,
    collaborators: &Collaborators,
    events: &Sender<PipelineEvent>,
    stop: &AtomicBool,
) -> BatchSummary {
    let mut summary = BatchSummary::default();
    let mut inputs = inputs.to_vec();

    if !settings.urls.is_empty() && !stop.load(Ordering::SeqCst) {
        let (downloaded, failed) = acquire_inputs(settings, collaborators, events);
        inputs.extend(downloaded);
        for report in failed {
            summary.record(report);
        }
    }

    let ratio = resolve_ratio(settings, events);
    let total = inputs.len();
    info!("Processing {} tracks", total);

    for (index, input) in inputs.iter().enumerate() {
        if stop.load(Ordering::SeqCst) {
            let remaining = total - index;
            warn!("Stop requested, {} tracks not attempted", remaining);
            emit_log(events, format!("Stopped; {} tracks not attempted", remaining));
            summary.stopped = true;
            break;
        }

        let track = track_name(input);
        emit(
            events,
            PipelineEvent::Progress {
                current: index + 1,
                total,
                label: track.clone(),
            },
        );

        let outcome = process_track(input, settings, collaborators, ratio, events);
        summary.record(TrackReport { track, outcome });
    }

    info!(
        "Batch complete: {} succeeded, {} failed",
        summary.succeeded, summary.failed
    );
    emit(
        events,
        PipelineEvent::BatchComplete {
            succeeded: summary.succeeded,
            failed: summary.failed,
        },
    );
    summary
}

// =============================================================================
// Track
// =============================================================================

/// Take one local track through separation, mixing, shifting, writing and cleanup
pub fn process_track(
    input: &Path,
    settings: &Settings,
    collaborators: &Collaborators,
    ratio: f64,
    events: &Sender<PipelineEvent>,
) -> TrackOutcome {
    let track = track_name(input);
    emit_log(events, format!("Processing {}", track));

    // Separated
    let paths = match collaborators.separator.separate(input, &settings.work_dir) {
        Ok(paths) => paths,
        Err(e) => {
            finish_cleanup(input, settings, events);
            return fail(events, &track, TrackStage::Separated, e.to_string());
        }
    };
    debug!("Separated {} with {}", track, collaborators.separator.name());

    // Mixed: stems are decoded once and shared by every variant
    let stems = StemSet::load(&paths);
    debug!(
        "Loaded {}/{} stems for {}",
        stems.loaded_count(),
        StemRole::ALL.len(),
        track
    );
    let mixed = mix::mix(&stems, settings.flags);
    drop(stems);

    let skipped_variants: Vec<Variant> = mixed.failed().map(|(v, _)| v).collect();
    for (variant, err) in mixed.failed() {
        emit(
            events,
            PipelineEvent::VariantFailed {
                track: track.clone(),
                variant,
                reason: err.to_string(),
            },
        );
    }
    for missing in mixed.missing_stems() {
        warn!("{}: {}", track, missing);
        emit_log(events, format!("Warning: {}: {}", track, missing));
    }

    if mixed.produced_count() == 0 {
        let reason = mixed
            .missing_stems()
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        finish_cleanup(input, settings, events);
        return fail(events, &track, TrackStage::Mixed, reason);
    }

    // PitchShifted (per variant, same ratio) then Written
    let mut written = Vec::new();
    for (variant, buffer) in mixed.produced() {
        let shifted;
        let buffer: &AudioBuffer = if ratio != 1.0 {
            let outcome = collaborators.shifter.apply(buffer, ratio);
            for warning in &outcome.warnings {
                emit_log(events, format!("Warning: {} {}: {}", track, variant, warning));
            }
            shifted = outcome.buffer;
            &shifted
        } else {
            buffer
        };

        match export::write_variant(
            collaborators.encoder.as_ref(),
            buffer,
            variant,
            &track,
            &settings.destination,
        ) {
            Ok(path) => {
                emit_log(events, format!("Wrote {}", path.display()));
                written.push(path);
            }
            Err(e) => {
                finish_cleanup(input, settings, events);
                return fail(events, &track, TrackStage::Written, e.to_string());
            }
        }
    }

    // CleanedUp
    finish_cleanup(input, settings, events);

    TrackOutcome::Succeeded {
        written,
        skipped_variants,
    }
}

/// Remove `<work_dir>/<track>/`; a missing folder is not an error
pub fn cleanup_track(work_dir: &Path, input: &Path) -> Result<()> {
    let dir = separation::track_work_dir(work_dir, input);
    if !dir.exists() {
        return Ok(());
    }
    std::fs::remove_dir_all(&dir).map_err(|e| StemmixError::CleanupWarning {
        path: dir.clone(),
        reason: e.to_string(),
    })?;
    debug!("Removed {}", dir.display());
    Ok(())
}

fn finish_cleanup(input: &Path, settings: &Settings, events: &Sender<PipelineEvent>) {
    if !settings.cleanup {
        return;
    }
    // Precomputed stems are user data and may live under the work folder
    if settings.stems_from.is_some() {
        debug!("Precomputed stems in use, leaving {} alone", settings.work_dir.display());
        return;
    }
    if let Err(e) = cleanup_track(&settings.work_dir, input) {
        if e.is_warning() {
            warn!("{}", e);
        } else {
            error!("{}", e);
        }
        emit_log(events, format!("Warning: {}", e));
    }
}

// =============================================================================
// Worker thread
// =============================================================================

/// Running batch: event stream, stop control and the worker's result
pub struct BatchHandle {
    events: Receiver<PipelineEvent>,
    stop: Arc<AtomicBool>,
    handle: JoinHandle<BatchSummary>,
}

impl BatchHandle {
    /// Events in the order the worker sent them; iteration ends when the worker exits
    pub fn events(&self) -> &Receiver<PipelineEvent> {
        &self.events
    }

    /// Ask the worker to stop after the current track
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Wait for the worker and return its summary
    pub fn join(self) -> Result<BatchSummary> {
        self.handle.join().map_err(|panic_info| {
            let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic".to_string()
            };
            error!("Pipeline worker panicked: {}", panic_msg);
            StemmixError::WorkerPanic(panic_msg)
        })
    }
}

/// Start the batch on a background worker thread
pub fn spawn(
    inputs: Vec<PathBuf>,
    settings: Settings,
    collaborators: Collaborators,
) -> Result<BatchHandle> {
    let (tx, rx) = unbounded::<PipelineEvent>();
    let stop = Arc::new(AtomicBool::new(false));
    let worker_stop = Arc::clone(&stop);

    let handle = thread::Builder::new()
        .name("stemmix-worker".to_string())
        .spawn(move || run_batch(&inputs, &settings, &collaborators, &tx, &worker_stop))?;

    Ok(BatchHandle {
        events: rx,
        stop,
        handle,
    })
}
