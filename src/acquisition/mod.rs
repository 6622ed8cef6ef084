//! Remote media acquisition
//!
//! Turns video URLs into local MP3 files that the pipeline treats like any
//! other input. A URL that fails is logged and dropped; it never stops the
//! remaining URLs.

use crate::error::{Result, StemmixError};
use crate::export::{OUTPUT_BITRATE_KBPS, OUTPUT_SAMPLE_RATE};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Characters replaced by `_` in downloaded file names
const INVALID_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Maximum file name length (characters) for downloaded files
const MAX_FILENAME_LEN: usize = 200;

fn url_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"^(?:https?://)?(?:www\.)?youtube\.com/watch\?v=[\w-]+",
            r"^(?:https?://)?(?:www\.)?youtu\.be/[\w-]+",
            r"^(?:https?://)?(?:www\.)?youtube\.com/embed/[\w-]+",
            r"^(?:https?://)?(?:www\.)?youtube\.com/v/[\w-]+",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

/// Check if the URL is a supported video URL
pub fn is_valid_url(url: &str) -> bool {
    let url = url.trim();
    !url.is_empty() && url_patterns().iter().any(|re| re.is_match(url))
}

/// Extract the video id from a supported URL
pub fn extract_video_id(url: &str) -> Option<String> {
    let url = url.trim();
    if !is_valid_url(url) {
        return None;
    }

    let without_scheme = url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("www.");

    let id = if let Some(rest) = without_scheme.strip_prefix("youtu.be/") {
        rest.split(['?', '&', '/']).next()
    } else if let Some(rest) = without_scheme.strip_prefix("youtube.com/watch?") {
        rest.split('&').find_map(|param| param.strip_prefix("v="))
    } else if let Some(rest) = without_scheme
        .strip_prefix("youtube.com/embed/")
        .or_else(|| without_scheme.strip_prefix("youtube.com/v/"))
    {
        rest.split(['?', '&', '/']).next()
    } else {
        None
    };

    id.filter(|s| !s.is_empty()).map(str::to_string)
}

/// Partition URLs into (valid, invalid), trimming whitespace
pub fn validate_urls<S: AsRef<str>>(urls: &[S]) -> (Vec<String>, Vec<String>) {
    urls.iter()
        .map(|u| u.as_ref().trim().to_string())
        .partition(|u| is_valid_url(u))
}

/// Make a title safe to use as a file name
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if INVALID_FILENAME_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let trimmed = replaced.trim_matches(|c| c == ' ' || c == '.');
    trimmed.chars().take(MAX_FILENAME_LEN).collect()
}

/// Remote media fetch backend
pub trait MediaFetcher: Send + Sync {
    /// Download one URL as an audio file into `output_dir`
    fn fetch(&self, url: &str, output_dir: &Path) -> Result<PathBuf>;

    /// Get the name of this fetcher (for logging)
    fn name(&self) -> &'static str;
}

/// Downloads audio with `yt-dlp`, transcoding to MP3 through ffmpeg
pub struct YtDlpFetcher {
    program: PathBuf,
    ffmpeg: PathBuf,
}

impl YtDlpFetcher {
    pub fn new(program: impl Into<PathBuf>, ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ffmpeg: ffmpeg.into(),
        }
    }
}

impl MediaFetcher for YtDlpFetcher {
    fn fetch(&self, url: &str, output_dir: &Path) -> Result<PathBuf> {
        let failure = |reason: String| StemmixError::AcquisitionFailure {
            url: url.to_string(),
            reason,
        };

        if !is_valid_url(url) {
            return Err(failure("not a supported video URL".to_string()));
        }

        std::fs::create_dir_all(output_dir)
            .map_err(|e| failure(format!("cannot create {}: {}", output_dir.display(), e)))?;

        let mut cmd = Command::new(&self.program);
        cmd.args(["--no-playlist", "--extract-audio", "--audio-format", "mp3"])
            .arg("--audio-quality")
            .arg(format!("{}K", OUTPUT_BITRATE_KBPS))
            .arg("--postprocessor-args")
            .arg(format!("ffmpeg:-ar {}", OUTPUT_SAMPLE_RATE))
            .args(["--print", "after_move:filepath"])
            .arg("-o")
            .arg(output_dir.join("%(title)s.%(ext)s"));
        if self.ffmpeg.components().count() > 1 {
            cmd.arg("--ffmpeg-location").arg(&self.ffmpeg);
        }
        cmd.arg(url);

        info!("Downloading {}", url);
        if let Some(id) = extract_video_id(url) {
            debug!("Video id: {}", id);
        }
        let output = cmd
            .output()
            .map_err(|e| failure(format!("failed to start {}: {}", self.program.display(), e)))?;

        if !output.status.success() {
            return Err(failure(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let downloaded = stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .last()
            .map(PathBuf::from)
            .filter(|p| p.is_file())
            .ok_or_else(|| failure("downloader did not report an output file".to_string()))?;

        let stem = downloaded
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let sanitized = sanitize_filename(&stem);
        if sanitized.is_empty() || sanitized == stem {
            return Ok(downloaded);
        }

        let renamed = output_dir.join(format!("{}.mp3", sanitized));
        std::fs::rename(&downloaded, &renamed)
            .map_err(|e| failure(format!("cannot rename download: {}", e)))?;
        debug!("Renamed {} -> {}", downloaded.display(), renamed.display());
        Ok(renamed)
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}

/// Fetch every URL, dropping failures with a logged reason
///
/// Returns the downloaded files and the errors for the dropped URLs.
pub fn acquire_all(
    fetcher: &dyn MediaFetcher,
    urls: &[String],
    output_dir: &Path,
) -> (Vec<PathBuf>, Vec<StemmixError>) {
    let mut files = Vec::new();
    let mut failures = Vec::new();

    for (i, url) in urls.iter().enumerate() {
        info!("Processing URL {}/{}: {}", i + 1, urls.len(), url);
        match fetcher.fetch(url.trim(), output_dir) {
            Ok(path) => files.push(path),
            Err(e) => {
                warn!("Failed to download {}: {}", url, e);
                failures.push(e);
            }
        }
    }

    (files, failures)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_urls() {
        assert!(is_valid_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_valid_url("youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_valid_url("https://youtu.be/dQw4w9WgXcQ"));
        assert!(is_valid_url("https://www.youtube.com/embed/dQw4w9WgXcQ"));
        assert!(is_valid_url("http://youtube.com/v/dQw4w9WgXcQ"));
        assert!(is_valid_url("  https://youtu.be/abc  "));
    }

    #[test]
    fn test_invalid_urls() {
        assert!(!is_valid_url(""));
        assert!(!is_valid_url("https://vimeo.com/12345"));
        assert!(!is_valid_url("https://www.youtube.com/"));
        assert!(!is_valid_url("not a url"));
    }

    #[test]
    fn test_extract_video_id() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=10").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ?si=xyz").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/embed/abc-123").as_deref(),
            Some("abc-123")
        );
        assert_eq!(extract_video_id("https://example.com/watch?v=x"), None);
    }

    #[test]
    fn test_validate_urls_partitions() {
        let (valid, invalid) = validate_urls(&[
            " https://youtu.be/a1 ",
            "ftp://nope",
            "",
        ]);
        assert_eq!(valid, vec!["https://youtu.be/a1".to_string()]);
        assert_eq!(invalid.len(), 2);
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("AC/DC: Back in Black?"), "AC_DC_ Back in Black_");
        assert_eq!(sanitize_filename("  ..title..  "), "title");
        assert_eq!(sanitize_filename(&"x".repeat(300)).len(), 200);
    }

    struct FlakyFetcher;

    impl MediaFetcher for FlakyFetcher {
        fn fetch(&self, url: &str, output_dir: &Path) -> Result<PathBuf> {
            if url.contains("bad") {
                Err(StemmixError::AcquisitionFailure {
                    url: url.to_string(),
                    reason: "unavailable".to_string(),
                })
            } else {
                Ok(output_dir.join("ok.mp3"))
            }
        }

        fn name(&self) -> &'static str {
            "flaky"
        }
    }

    #[test]
    fn test_acquire_all_continues_past_failures() {
        let urls = vec![
            "https://youtu.be/bad1".to_string(),
            "https://youtu.be/good".to_string(),
            "https://youtu.be/bad2".to_string(),
        ];
        let (files, failures) = acquire_all(&FlakyFetcher, &urls, Path::new("/tmp"));
        assert_eq!(files.len(), 1);
        assert_eq!(failures.len(), 2);
    }

    #[test]
    fn test_yt_dlp_rejects_invalid_url() {
        let fetcher = YtDlpFetcher::new("yt-dlp", "ffmpeg");
        let err = fetcher.fetch("https://vimeo.com/1", Path::new("/tmp")).unwrap_err();
        assert!(matches!(err, StemmixError::AcquisitionFailure { .. }));
    }
}
