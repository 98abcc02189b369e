//! Delivery of a downloaded file through Telegram, with guaranteed
//! filesystem cleanup.
//!
//! The [`DownloadArtifact`] guard owns the downloaded file and its
//! per-user directory; dropping it removes the file and prunes the
//! directory if now empty. Every exit path of the download/delivery
//! sequence runs that cleanup exactly once.

use crate::config::MAX_UPLOAD_BYTES;
use crate::provider::{MediaKind, SearchResult};
use crate::utils::retry_telegram_operation;
use std::path::{Path, PathBuf};
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile, ParseMode};
use thiserror::Error;
use tracing::{debug, warn};

/// Delivery failures, reported to the user and then cleaned up.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The file exceeds the transport's upload ceiling
    #[error("file of {size} bytes exceeds the {MAX_UPLOAD_BYTES} byte limit")]
    Oversized { size: u64 },
    /// The file vanished or could not be inspected
    #[error("cannot read downloaded file: {0}")]
    Io(#[from] std::io::Error),
    /// Telegram refused the upload after retries
    #[error("transport send failed: {0}")]
    Transport(anyhow::Error),
}

/// Scoped ownership of one downloaded file inside a per-user directory.
#[derive(Debug)]
pub struct DownloadArtifact {
    path: PathBuf,
    user_dir: PathBuf,
}

impl DownloadArtifact {
    #[must_use]
    pub fn new(path: PathBuf, user_dir: PathBuf) -> Self {
        Self { path, user_dir }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the file on disk.
    ///
    /// # Errors
    ///
    /// Fails when the file is missing or unreadable.
    pub fn size(&self) -> std::io::Result<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }

    /// Reject files above the transport ceiling without touching disk
    /// beyond a metadata read.
    ///
    /// # Errors
    ///
    /// `Oversized` when the ceiling is exceeded, `Io` when the file cannot
    /// be inspected.
    pub fn check_size(&self) -> Result<u64, DeliveryError> {
        let size = self.size()?;
        if size > MAX_UPLOAD_BYTES {
            return Err(DeliveryError::Oversized { size });
        }
        Ok(size)
    }
}

impl Drop for DownloadArtifact {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), "Failed to remove downloaded file: {e}");
            }
        }
        // Prune the per-user directory when the delivery left it empty
        match std::fs::read_dir(&self.user_dir) {
            Ok(mut entries) => {
                if entries.next().is_none() {
                    if let Err(e) = std::fs::remove_dir(&self.user_dir) {
                        warn!(dir = %self.user_dir.display(), "Failed to prune user dir: {e}");
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(dir = %self.user_dir.display(), "Failed to read user dir: {e}"),
        }
        debug!(path = %self.path.display(), "Download artifact cleaned up");
    }
}

/// Send the artifact through Telegram as audio or video with an item
/// caption. The size ceiling is enforced first; an oversized file is never
/// offered to the transport.
///
/// # Errors
///
/// `Oversized` before any send attempt, `Transport` when Telegram rejects
/// the upload after retries.
pub async fn deliver(
    bot: &Bot,
    chat_id: ChatId,
    item: &SearchResult,
    kind: MediaKind,
    artifact: &DownloadArtifact,
) -> Result<(), DeliveryError> {
    artifact.check_size()?;

    let caption = super::views::caption_text(item, kind);
    let input = InputFile::file(artifact.path().to_path_buf());

    retry_telegram_operation(|| {
        let input = input.clone();
        let caption = caption.clone();
        async move {
            match kind {
                MediaKind::Audio => {
                    bot.send_audio(chat_id, input)
                        .title(item.title.clone())
                        .performer(item.uploader.clone())
                        .caption(caption)
                        .parse_mode(ParseMode::Html)
                        .await
                        .map_err(|e| anyhow::anyhow!("Telegram audio send error: {e}"))?;
                }
                MediaKind::Video => {
                    bot.send_video(chat_id, input)
                        .caption(caption)
                        .parse_mode(ParseMode::Html)
                        .await
                        .map_err(|e| anyhow::anyhow!("Telegram video send error: {e}"))?;
                }
            }
            Ok(())
        }
    })
    .await
    .map_err(DeliveryError::Transport)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn drop_removes_file_and_empty_dir() -> std::io::Result<()> {
        let root = tempfile::tempdir()?;
        let user_dir = root.path().join("42");
        fs::create_dir_all(&user_dir)?;
        let file = user_dir.join("track.mp3");
        fs::write(&file, b"data")?;

        drop(DownloadArtifact::new(file.clone(), user_dir.clone()));

        assert!(!file.exists());
        assert!(!user_dir.exists());
        Ok(())
    }

    #[test]
    fn drop_keeps_dir_with_other_files() -> std::io::Result<()> {
        let root = tempfile::tempdir()?;
        let user_dir = root.path().join("42");
        fs::create_dir_all(&user_dir)?;
        let file = user_dir.join("track.mp3");
        let other = user_dir.join("other.mp4");
        fs::write(&file, b"data")?;
        fs::write(&other, b"data")?;

        drop(DownloadArtifact::new(file.clone(), user_dir.clone()));

        assert!(!file.exists());
        assert!(other.exists());
        assert!(user_dir.exists());
        Ok(())
    }

    #[test]
    fn check_size_flags_oversized_files() -> std::io::Result<()> {
        let root = tempfile::tempdir()?;
        let user_dir = root.path().join("42");
        fs::create_dir_all(&user_dir)?;
        let path = user_dir.join("big.mp4");
        // Sparse file just over the ceiling; no 50 MiB actually written
        let file = fs::File::create(&path)?;
        file.set_len(MAX_UPLOAD_BYTES + 1)?;

        let artifact = DownloadArtifact::new(path, user_dir);
        match artifact.check_size() {
            Err(DeliveryError::Oversized { size }) => {
                assert_eq!(size, MAX_UPLOAD_BYTES + 1);
            }
            other => panic!("expected Oversized, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn check_size_accepts_small_files() -> std::io::Result<()> {
        let root = tempfile::tempdir()?;
        let user_dir = root.path().join("42");
        fs::create_dir_all(&user_dir)?;
        let path = user_dir.join("small.mp3");
        fs::write(&path, b"tiny")?;

        let artifact = DownloadArtifact::new(path, user_dir);
        assert_eq!(artifact.check_size().expect("under the limit"), 4);
        Ok(())
    }
}
