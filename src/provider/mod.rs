//! Media provider boundary.
//!
//! Everything the bot knows about searching and materializing media goes
//! through the [`MediaProvider`] trait. The production implementation wraps
//! the `yt-dlp` binary; tests substitute their own.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod ytdlp;

pub use ytdlp::YtDlpProvider;

/// One candidate media item returned by a search, in provider rank order.
/// Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Provider-side identifier of the item
    pub id: String,
    /// Item title as reported by the provider
    pub title: String,
    /// Duration in seconds, 0 when unknown
    pub duration_secs: u64,
    /// Channel or uploader name
    pub uploader: String,
    /// Canonical URL used for the download step
    pub url: String,
}

/// Which flavor of media the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    /// Audio track, delivered as mp3
    Audio,
    /// Video, delivered as mp4
    Video,
}

impl MediaKind {
    /// Stable wire name, used in callback payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }

    /// Parse the wire name back. Inverse of [`Self::as_str`].
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "audio" => Some(Self::Audio),
            "video" => Some(Self::Video),
            _ => None,
        }
    }

    /// Emoji used when rendering result buttons and progress messages.
    #[must_use]
    pub const fn emoji(self) -> &'static str {
        match self {
            Self::Audio => "🎵",
            Self::Video => "🎬",
        }
    }

    /// Plural noun for user-facing result summaries.
    #[must_use]
    pub const fn noun(self) -> &'static str {
        match self {
            Self::Audio => "songs",
            Self::Video => "videos",
        }
    }
}

/// Provider failures, split so handlers can word messages per class.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The search did not finish inside the configured deadline
    #[error("search timed out after {0}s")]
    Timeout(u64),
    /// The yt-dlp process could not be spawned or awaited
    #[error("failed to run yt-dlp: {0}")]
    Spawn(#[from] std::io::Error),
    /// The item exists but cannot be fetched (private, removed, geo-blocked)
    #[error("media unavailable: {0}")]
    Unavailable(String),
    /// Any other extraction or transcode failure
    #[error("provider failure: {0}")]
    Failed(String),
}

/// Search and download operations delegated to an external extractor.
#[async_trait]
pub trait MediaProvider: Send + Sync {
    /// Search for media matching `query`, returning at most `max_results`
    /// items in provider rank order. An empty vector is a valid outcome.
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, ProviderError>;

    /// Materialize `item` as a local file of the requested kind under
    /// `dest_dir`, creating the directory if needed. Returns the path of
    /// the downloaded file.
    async fn download(
        &self,
        item: &SearchResult,
        kind: MediaKind,
        dest_dir: &Path,
    ) -> Result<PathBuf, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_kind_wire_roundtrip() {
        for kind in [MediaKind::Audio, MediaKind::Video] {
            assert_eq!(MediaKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(MediaKind::parse("podcast"), None);
    }
}
