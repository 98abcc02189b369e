//! `MediaProvider` implementation backed by the `yt-dlp` binary.
//!
//! Search uses flat-playlist extraction (`ytsearchN:` pseudo-URLs) and
//! parses the NDJSON output; downloads hand transcoding to yt-dlp's
//! ffmpeg postprocessors. Retries for flaky fragments live inside yt-dlp
//! itself via `--extractor-retries`/`--fragment-retries`.

use crate::config::{
    DOWNLOAD_PACING_MS, SEARCH_PACING_MS, SEARCH_TIMEOUT_SECS, USER_AGENTS,
};
use crate::provider::{MediaKind, MediaProvider, ProviderError, SearchResult};
use async_trait::async_trait;
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::process::Command;
use tracing::{debug, warn};

/// Patterns indicating fatal, unrecoverable yt-dlp errors
const FATAL_ERROR_PATTERNS: &[&str] = &[
    "Video unavailable",
    "Private video",
    "This video is not available",
    "Sign in to confirm your age",
    "age-restricted",
    "members-only",
    "This video is private",
    "removed by the uploader",
    "no longer available",
    "blocked it in your country",
    "geo-restricted",
    "who has blocked it on copyright grounds",
    "copyright claim",
    "terminated account",
    "This video has been removed",
    "ERROR: Unsupported URL",
    "is not a valid URL",
    "Unable to extract video data",
    "Premieres in",
    "This live event will begin",
    "Join this channel to get access",
    "HTTP Error 403",
    "HTTP Error 404",
    "Sign in to view this video",
];

/// Check if error output indicates a fatal, unrecoverable error
fn is_fatal_ytdlp_error(error_msg: &str) -> bool {
    FATAL_ERROR_PATTERNS
        .iter()
        .any(|pattern| error_msg.contains(pattern))
}

/// One line of `yt-dlp -j --flat-playlist` output. Field coverage varies
/// between extractors, so everything except reading it is optional.
#[derive(Debug, Deserialize)]
struct FlatEntry {
    id: Option<String>,
    title: Option<String>,
    duration: Option<f64>,
    uploader: Option<String>,
    channel: Option<String>,
    url: Option<String>,
    webpage_url: Option<String>,
}

impl FlatEntry {
    fn into_result(self) -> Option<SearchResult> {
        let id = self.id.filter(|id| !id.is_empty())?;
        let url = self
            .webpage_url
            .or(self.url)
            .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={id}"));
        Some(SearchResult {
            title: self.title.unwrap_or_else(|| "Unknown Title".to_string()),
            duration_secs: self.duration.map_or(0, |d| d.max(0.0) as u64),
            uploader: self
                .uploader
                .or(self.channel)
                .unwrap_or_else(|| "Unknown".to_string()),
            url,
            id,
        })
    }
}

/// Production provider spawning the `yt-dlp` binary.
pub struct YtDlpProvider {
    binary: String,
}

impl Default for YtDlpProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl YtDlpProvider {
    #[must_use]
    pub fn new() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
        }
    }

    /// Override the binary name, e.g. an absolute path.
    #[must_use]
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn pick_user_agent() -> &'static str {
        USER_AGENTS
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(USER_AGENTS[0])
    }

    /// Sleep a random duration inside `range_ms` before touching the
    /// upstream platform.
    async fn pacing_delay(range_ms: (u64, u64)) {
        let millis = rand::rng().random_range(range_ms.0..=range_ms.1);
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }

    /// Run yt-dlp with `args`, returning stdout on success and classified
    /// stderr on failure.
    async fn run(&self, args: &[String]) -> Result<String, ProviderError> {
        debug!(binary = %self.binary, ?args, "Executing yt-dlp");
        let output = Command::new(&self.binary)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let message = if stderr.trim().is_empty() {
            String::from_utf8_lossy(&output.stdout).into_owned()
        } else {
            stderr
        };

        if is_fatal_ytdlp_error(&message) {
            warn!(error = %message.trim(), "Fatal yt-dlp error");
            return Err(ProviderError::Unavailable(summarize(&message)));
        }
        warn!(error = %message.trim(), "yt-dlp exited with failure");
        Err(ProviderError::Failed(summarize(&message)))
    }

    fn download_args(&self, item: &SearchResult, kind: MediaKind, dest_dir: &Path) -> Vec<String> {
        let output_template = dest_dir.join("%(title).80s.%(ext)s");
        let mut args: Vec<String> = vec![
            "--no-warnings".into(),
            "--no-playlist".into(),
            "--extractor-retries".into(),
            "3".into(),
            "--fragment-retries".into(),
            "3".into(),
            "--skip-unavailable-fragments".into(),
            "--user-agent".into(),
            Self::pick_user_agent().into(),
            "-o".into(),
            output_template.to_string_lossy().into_owned(),
        ];
        match kind {
            MediaKind::Audio => {
                // Best audio extracted to mp3 at 192k via ffmpeg
                args.extend(["-x", "--audio-format", "mp3", "--audio-quality", "192K"]
                    .map(String::from));
            }
            MediaKind::Video => {
                // Cap at 720p; the selector yields a single pre-muxed
                // format, so an explicit recode forces the mp4 container
                // even when the source is webm-only
                args.extend(["-f", "best[height<=720]/best", "--recode-video", "mp4"]
                    .map(String::from));
            }
        }
        args.push(item.url.clone());
        args
    }
}

/// First non-empty line of a yt-dlp error dump, trimmed for user messages.
fn summarize(message: &str) -> String {
    message
        .lines()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("unknown error")
        .trim()
        .to_string()
}

/// The file yt-dlp just produced: newest regular file in the directory.
/// The output template names files after the media title, so the exact
/// name and extension are only known after the postprocessor ran.
fn newest_file(dir: &Path) -> std::io::Result<Option<PathBuf>> {
    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if newest.as_ref().is_none_or(|(t, _)| modified > *t) {
            newest = Some((modified, entry.path()));
        }
    }
    Ok(newest.map(|(_, path)| path))
}

#[async_trait]
impl MediaProvider for YtDlpProvider {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, ProviderError> {
        Self::pacing_delay(SEARCH_PACING_MS).await;

        let args: Vec<String> = vec![
            "-j".into(),
            "--flat-playlist".into(),
            "--no-warnings".into(),
            "--extractor-retries".into(),
            "3".into(),
            "--user-agent".into(),
            Self::pick_user_agent().into(),
            format!("ytsearch{max_results}:{query}"),
        ];

        let output = tokio::time::timeout(
            Duration::from_secs(SEARCH_TIMEOUT_SECS),
            self.run(&args),
        )
        .await
        .map_err(|_| ProviderError::Timeout(SEARCH_TIMEOUT_SECS))??;

        let results: Vec<SearchResult> = output
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<FlatEntry>(line) {
                Ok(entry) => entry.into_result(),
                Err(e) => {
                    debug!(error = %e, "Skipping unparseable search entry");
                    None
                }
            })
            .take(max_results)
            .collect();

        debug!(count = results.len(), query, "Search finished");
        Ok(results)
    }

    async fn download(
        &self,
        item: &SearchResult,
        kind: MediaKind,
        dest_dir: &Path,
    ) -> Result<PathBuf, ProviderError> {
        tokio::fs::create_dir_all(dest_dir).await?;
        Self::pacing_delay(DOWNLOAD_PACING_MS).await;

        let args = self.download_args(item, kind, dest_dir);
        self.run(&args).await?;

        newest_file(dest_dir)?.ok_or_else(|| {
            ProviderError::Failed("download finished but produced no file".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_entry_maps_missing_fields_to_defaults() {
        let entry: FlatEntry =
            serde_json::from_str(r#"{"id":"abc123","duration":null}"#).expect("valid json");
        let result = entry.into_result().expect("entry with id maps");
        assert_eq!(result.id, "abc123");
        assert_eq!(result.title, "Unknown Title");
        assert_eq!(result.uploader, "Unknown");
        assert_eq!(result.duration_secs, 0);
        assert_eq!(result.url, "https://www.youtube.com/watch?v=abc123");
    }

    #[test]
    fn flat_entry_without_id_is_skipped() {
        let entry: FlatEntry =
            serde_json::from_str(r#"{"title":"orphan"}"#).expect("valid json");
        assert!(entry.into_result().is_none());
    }

    #[test]
    fn flat_entry_prefers_webpage_url_and_channel() {
        let entry: FlatEntry = serde_json::from_str(
            r#"{"id":"x","title":"T","duration":93.4,"channel":"Ch","url":"u","webpage_url":"w"}"#,
        )
        .expect("valid json");
        let result = entry.into_result().expect("maps");
        assert_eq!(result.url, "w");
        assert_eq!(result.uploader, "Ch");
        assert_eq!(result.duration_secs, 93);
    }

    #[test]
    fn fatal_errors_are_classified() {
        assert!(is_fatal_ytdlp_error("ERROR: Video unavailable"));
        assert!(is_fatal_ytdlp_error("HTTP Error 403: Forbidden"));
        assert!(!is_fatal_ytdlp_error("Connection reset by peer"));
    }

    #[test]
    fn summarize_picks_first_meaningful_line() {
        assert_eq!(summarize("\n  ERROR: bad thing\nmore"), "ERROR: bad thing");
        assert_eq!(summarize(""), "unknown error");
    }

    #[test]
    fn download_args_select_format_per_kind() {
        let provider = YtDlpProvider::new();
        let item = SearchResult {
            id: "x".into(),
            title: "T".into(),
            duration_secs: 1,
            uploader: "U".into(),
            url: "https://example.com/w".into(),
        };
        let audio = provider.download_args(&item, MediaKind::Audio, Path::new("/tmp/u"));
        assert!(audio.iter().any(|a| a == "--audio-format"));
        assert_eq!(audio.last().map(String::as_str), Some("https://example.com/w"));

        let video = provider.download_args(&item, MediaKind::Video, Path::new("/tmp/u"));
        assert!(video.iter().any(|a| a == "best[height<=720]/best"));
    }

    #[test]
    fn video_downloads_force_mp4_container() {
        // The format selector picks a single pre-muxed stream, which may
        // be webm-only; the recode flag must be present so delivery is
        // always mp4.
        let provider = YtDlpProvider::new();
        let item = SearchResult {
            id: "x".into(),
            title: "T".into(),
            duration_secs: 1,
            uploader: "U".into(),
            url: "https://example.com/w".into(),
        };
        let video = provider.download_args(&item, MediaKind::Video, Path::new("/tmp/u"));
        let pos = video
            .iter()
            .position(|a| a == "--recode-video")
            .expect("video args carry the container conversion flag");
        assert_eq!(video.get(pos + 1).map(String::as_str), Some("mp4"));

        let audio = provider.download_args(&item, MediaKind::Audio, Path::new("/tmp/u"));
        assert!(!audio.iter().any(|a| a == "--recode-video"));
    }
}
