//! Integration tests for the stemmix pipeline
//!
//! Stems are synthesised with hound and fed through the precomputed
//! separator; outputs are written as WAV by a test encoder so the whole
//! batch runs without external tools.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use stemmix::audio::ShiftChain;
use stemmix::config::Settings;
use stemmix::export::Encoder;
use stemmix::pipeline::{self, Collaborators, PipelineEvent, TrackOutcome};
use stemmix::separation::{PrecomputedSeparator, StemSeparator};
use stemmix::types::{StemPaths, StemRole, VariantFlags};
use stemmix::{AudioBuffer, PitchShift, Result, StemmixError};
use tempfile::TempDir;

const SAMPLE_RATE: u32 = 8000;

/// Writes 16-bit WAV so output durations can be read back with hound
struct WavEncoder;

impl Encoder for WavEncoder {
    fn encode(&self, buffer: &AudioBuffer, path: &Path) -> Result<()> {
        let spec = hound::WavSpec {
            channels: buffer.channels,
            sample_rate: buffer.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let to_output_error = |e: hound::Error| StemmixError::OutputError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        let mut writer = hound::WavWriter::create(path, spec).map_err(to_output_error)?;
        for sample in &buffer.samples {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer.write_sample(value).map_err(to_output_error)?;
        }
        writer.finalize().map_err(to_output_error)
    }

    fn extension(&self) -> &'static str {
        "wav"
    }

    fn name(&self) -> &'static str {
        "wav"
    }
}

/// Generate a sine wave WAV file for testing
///
/// Creates a mono 16-bit WAV file at the specified path.
fn generate_sine_wav(path: &Path, frequency_hz: f32, duration_secs: f32) {
    use std::f32::consts::PI;

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec).expect("Failed to create WAV file");

    let num_samples = (duration_secs * SAMPLE_RATE as f32).round() as usize;
    let amplitude = 0.2f32; // four stems summed must not clip

    for i in 0..num_samples {
        let t = i as f32 / SAMPLE_RATE as f32;
        let sample = (2.0 * PI * frequency_hz * t).sin() * amplitude;
        writer
            .write_sample((sample * 32767.0) as i16)
            .expect("Failed to write sample");
    }

    writer.finalize().expect("Failed to finalize WAV");
}

/// Write `<root>/<track>/<role>.wav` with the given durations
fn write_stems(root: &Path, track: &str, durations: &[(StemRole, f32)]) {
    let dir = root.join(track);
    fs::create_dir_all(&dir).unwrap();
    for (i, (role, seconds)) in durations.iter().enumerate() {
        generate_sine_wav(&dir.join(role.file_name()), 110.0 * (i + 1) as f32, *seconds);
    }
}

/// The reference stem set: bass 3.0s, drums 3.2s, vocals 2.8s, other 3.0s
fn write_reference_stems(root: &Path, track: &str) {
    write_stems(
        root,
        track,
        &[
            (StemRole::Bass, 3.0),
            (StemRole::Drums, 3.2),
            (StemRole::Vocals, 2.8),
            (StemRole::Other, 3.0),
        ],
    );
}

fn wav_duration(path: &Path) -> f64 {
    let reader = hound::WavReader::open(path).expect("Failed to open output");
    reader.duration() as f64 / reader.spec().sample_rate as f64
}

fn create_test_settings(output: &Path, work: &Path) -> Settings {
    Settings {
        destination: output.to_path_buf(),
        work_dir: work.to_path_buf(),
        show_progress: false,
        ..Settings::default()
    }
}

fn test_collaborators(stems_root: &Path) -> Collaborators {
    Collaborators {
        separator: Arc::new(PrecomputedSeparator::new(stems_root)),
        encoder: Arc::new(WavEncoder),
        shifter: ShiftChain::for_toolchain(Path::new("ffmpeg"), false),
        fetcher: None,
    }
}

fn run(inputs: &[&str], settings: &Settings, collaborators: &Collaborators) -> pipeline::BatchSummary {
    let inputs: Vec<PathBuf> = inputs.iter().map(PathBuf::from).collect();
    let (tx, _rx) = crossbeam_channel::unbounded();
    pipeline::run_batch(&inputs, settings, collaborators, &tx, &AtomicBool::new(false))
}

/// Relative paths of every file under `dir`, sorted
fn list_outputs(dir: &Path) -> Vec<String> {
    let mut files: Vec<String> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(dir)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    files.sort();
    files
}

fn assert_duration(path: &Path, expected: f64) {
    let actual = wav_duration(path);
    assert!(
        (actual - expected).abs() < 0.01,
        "{} lasts {:.3}s, expected {:.3}s",
        path.display(),
        actual,
        expected
    );
}

#[test]
fn test_default_run_writes_only_nobass() {
    let stems = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    write_reference_stems(stems.path(), "song");

    let summary = run(
        &["song.mp3"],
        &create_test_settings(out.path(), work.path()),
        &test_collaborators(stems.path()),
    );

    assert_eq!(summary.succeeded, 1);
    assert_eq!(list_outputs(out.path()), vec!["NOBASS/song.wav"]);
    assert_duration(&out.path().join("NOBASS/song.wav"), 3.2);
}

#[test]
fn test_bassonly_writes_raw_bass() {
    let stems = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    write_reference_stems(stems.path(), "song");

    let mut settings = create_test_settings(out.path(), work.path());
    settings.flags.bassonly = true;
    run(&["song.mp3"], &settings, &test_collaborators(stems.path()));

    assert_eq!(
        list_outputs(out.path()),
        vec!["BASSONLY/song.wav", "NOBASS/song.wav"]
    );
    assert_duration(&out.path().join("NOBASS/song.wav"), 3.2);
    // Not padded to the longest stem of the track
    assert_duration(&out.path().join("BASSONLY/song.wav"), 3.0);
}

#[test]
fn test_all_flags_write_five_variants() {
    let stems = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    write_reference_stems(stems.path(), "song");

    let mut settings = create_test_settings(out.path(), work.path());
    settings.flags = VariantFlags::all();
    let summary = run(&["song.mp3"], &settings, &test_collaborators(stems.path()));

    assert_eq!(summary.succeeded, 1);
    assert_eq!(
        list_outputs(out.path()),
        vec![
            "BASSONLY/song.wav",
            "NOBASS/song.wav",
            "NODRUMS/song.wav",
            "NOOTHER/song.wav",
            "NOVOCALS/song.wav",
        ]
    );

    // Each variant pads only to its own longest stem
    assert_duration(&out.path().join("NOBASS/song.wav"), 3.2);
    assert_duration(&out.path().join("BASSONLY/song.wav"), 3.0);
    assert_duration(&out.path().join("NOVOCALS/song.wav"), 3.2);
    assert_duration(&out.path().join("NODRUMS/song.wav"), 3.0);
    assert_duration(&out.path().join("NOOTHER/song.wav"), 3.2);
}

#[test]
fn test_pitch_shift_c_to_g_shortens_every_variant() {
    let stems = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    write_reference_stems(stems.path(), "song");

    let mut settings = create_test_settings(out.path(), work.path());
    settings.flags.bassonly = true;
    settings.pitch = Some(PitchShift::new("C", "G"));
    run(&["song.mp3"], &settings, &test_collaborators(stems.path()));

    let ratio = 392.00 / 261.63;
    for (variant, original) in [("NOBASS", 3.2), ("BASSONLY", 3.0)] {
        let path = out.path().join(variant).join("song.wav");
        let actual = wav_duration(&path);
        let expected = original / ratio;
        assert!(
            (actual - expected).abs() < 0.05,
            "{} lasts {:.3}s, expected about {:.3}s",
            variant,
            actual,
            expected
        );
    }
}

#[test]
fn test_same_note_shift_matches_no_shift() {
    let stems = TempDir::new().unwrap();
    let plain_out = TempDir::new().unwrap();
    let shifted_out = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    write_reference_stems(stems.path(), "song");
    let collaborators = test_collaborators(stems.path());

    run(
        &["song.mp3"],
        &create_test_settings(plain_out.path(), work.path()),
        &collaborators,
    );

    let mut settings = create_test_settings(shifted_out.path(), work.path());
    settings.pitch = Some(PitchShift::new("C", "C"));
    run(&["song.mp3"], &settings, &collaborators);

    let plain = fs::read(plain_out.path().join("NOBASS/song.wav")).unwrap();
    let shifted = fs::read(shifted_out.path().join("NOBASS/song.wav")).unwrap();
    assert_eq!(plain, shifted);
}

#[test]
fn test_repeated_runs_are_byte_identical() {
    let stems = TempDir::new().unwrap();
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    write_reference_stems(stems.path(), "song");
    let collaborators = test_collaborators(stems.path());

    for out in [&first, &second] {
        let mut settings = create_test_settings(out.path(), work.path());
        settings.flags = VariantFlags::all();
        run(&["song.mp3"], &settings, &collaborators);
    }

    for file in list_outputs(first.path()) {
        assert_eq!(
            fs::read(first.path().join(&file)).unwrap(),
            fs::read(second.path().join(&file)).unwrap(),
            "{} differs between runs",
            file
        );
    }
}

#[test]
fn test_missing_bass_still_writes_nobass() {
    let stems = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    write_stems(
        stems.path(),
        "song",
        &[
            (StemRole::Drums, 2.0),
            (StemRole::Vocals, 2.0),
            (StemRole::Other, 2.0),
        ],
    );

    let mut settings = create_test_settings(out.path(), work.path());
    settings.flags = VariantFlags::all();
    let summary = run(&["song.mp3"], &settings, &test_collaborators(stems.path()));

    assert_eq!(summary.succeeded, 1);
    assert_eq!(list_outputs(out.path()), vec!["NOBASS/song.wav"]);
    match &summary.reports[0].outcome {
        TrackOutcome::Succeeded {
            skipped_variants, ..
        } => assert_eq!(skipped_variants.len(), 4),
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn test_failed_track_does_not_stop_batch() {
    let stems = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    write_reference_stems(stems.path(), "first");
    write_reference_stems(stems.path(), "third");

    let summary = run(
        &["first.mp3", "second.mp3", "third.mp3"],
        &create_test_settings(out.path(), work.path()),
        &test_collaborators(stems.path()),
    );

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(
        list_outputs(out.path()),
        vec!["NOBASS/first.wav", "NOBASS/third.wav"]
    );
}

#[test]
fn test_rerun_overwrites_outputs() {
    let stems = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    write_reference_stems(stems.path(), "song");
    let settings = create_test_settings(out.path(), work.path());
    let collaborators = test_collaborators(stems.path());

    run(&["song.mp3"], &settings, &collaborators);
    write_stems(
        stems.path(),
        "song",
        &[
            (StemRole::Drums, 1.0),
            (StemRole::Vocals, 1.0),
            (StemRole::Other, 1.0),
        ],
    );
    run(&["song.mp3"], &settings, &collaborators);

    assert_duration(&out.path().join("NOBASS/song.wav"), 1.0);
}

/// Raises the stop flag while the first track is in flight
struct StoppingSeparator {
    inner: PrecomputedSeparator,
    stop: Arc<AtomicBool>,
}

impl StemSeparator for StoppingSeparator {
    fn separate(&self, input_path: &Path, work_dir: &Path) -> Result<StemPaths> {
        self.stop.store(true, Ordering::SeqCst);
        self.inner.separate(input_path, work_dir)
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "stopping"
    }
}

#[test]
fn test_stop_lets_current_track_finish() {
    let stems = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    write_reference_stems(stems.path(), "one");
    write_reference_stems(stems.path(), "two");

    let stop = Arc::new(AtomicBool::new(false));
    let collaborators = Collaborators {
        separator: Arc::new(StoppingSeparator {
            inner: PrecomputedSeparator::new(stems.path()),
            stop: Arc::clone(&stop),
        }),
        ..test_collaborators(stems.path())
    };

    let (tx, rx) = crossbeam_channel::unbounded();
    let summary = pipeline::run_batch(
        &[PathBuf::from("one.mp3"), PathBuf::from("two.mp3")],
        &create_test_settings(out.path(), work.path()),
        &collaborators,
        &tx,
        &stop,
    );

    assert!(summary.stopped);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(list_outputs(out.path()), vec!["NOBASS/one.wav"]);
    assert!(matches!(
        rx.try_iter().last(),
        Some(PipelineEvent::BatchComplete {
            succeeded: 1,
            failed: 0
        })
    ));
}

#[test]
fn test_spawned_batch_reports_failures_through_events() {
    let stems = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    write_reference_stems(stems.path(), "good");

    let handle = pipeline::spawn(
        vec![PathBuf::from("good.mp3"), PathBuf::from("bad.mp3")],
        create_test_settings(out.path(), work.path()),
        test_collaborators(stems.path()),
    )
    .unwrap();

    let events: Vec<PipelineEvent> = handle.events().iter().collect();
    let summary = handle.join().unwrap();

    assert_eq!(summary.failed, 1);
    assert!(events.iter().any(|e| matches!(
        e,
        PipelineEvent::TrackFailed { track, .. } if track == "bad"
    )));
    assert!(matches!(
        events.last(),
        Some(PipelineEvent::BatchComplete {
            succeeded: 1,
            failed: 1
        })
    ));
}
