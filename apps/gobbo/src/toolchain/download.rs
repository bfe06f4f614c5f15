//! Resumable HTTP downloads into the store's scratch space.
//!
//! ## Features
//!
//! - Content-addressed temp files: `tmp/download-<sha256(url)>`
//! - Resume from an existing partial file with a `Range` request
//! - `If-Range` revalidation so a changed remote file restarts from zero
//! - Automatic retry with exponential backoff for transport failures
//! - Progress reporting via text output or a callback
//!
//! ## Resume Rules
//!
//! The length of an existing temp file is the resume offset, minus the last
//! 4 KiB which are discarded in case the previous transfer died mid-write.
//! A non-ranged request must answer `200 OK` and a ranged one
//! `206 Partial Content`. The only exception is a ranged request that carried
//! `If-Range`: a `200 OK` then means the resource changed and the body
//! replaces the partial file.
//!
//! Two concurrent downloads of the same URL write the same temp file and are
//! not coordinated.

use std::io::{SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use futures_util::StreamExt;
use rand::Rng;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_RANGE, ETAG, IF_RANGE, LAST_MODIFIED, RANGE};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::errors::GobboError;

/// Progress event emitted during downloads.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Download has started.
    Started {
        /// The URL being downloaded.
        url: String,
        /// Total file size in bytes, 0 if unknown.
        total: u64,
        /// Bytes already present from an earlier attempt.
        resumed_from: u64,
    },
    /// Download progress update.
    Progress {
        /// Bytes on disk so far, including resumed bytes.
        downloaded: u64,
        /// Current download speed in bytes per second.
        speed: u64,
    },
    /// Download completed successfully.
    Completed,
    /// Download failed with an error.
    Failed {
        /// Error description.
        error: String,
    },
}

/// Callback type for receiving progress updates during downloads.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Bytes discarded from the tail of a partial file before resuming.
pub const RESUME_DISCARD_BYTES: u64 = 4096;

/// Maximum number of download attempts.
const MAX_RETRIES: u32 = 3;

/// Base delay between retries in milliseconds.
const BASE_RETRY_DELAY_MS: u64 = 1000;

/// Connect timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Maximum time between two body reads in seconds.
const READ_TIMEOUT_SECS: u64 = 120;

/// Minimum interval between progress updates in milliseconds.
const PROGRESS_INTERVAL_MS: u128 = 250;

/// Outcome of a single failed attempt.
enum AttemptError {
    /// Transport failure; the next attempt resumes from the partial file.
    Retryable(anyhow::Error),
    /// Status or filesystem failure; retrying would not help.
    Fatal(anyhow::Error),
}

/// Downloads URLs to content-addressed files in a scratch directory.
#[derive(Clone)]
pub struct Downloader {
    tmp_dir: PathBuf,
    callback: Option<ProgressCallback>,
}

impl Downloader {
    /// Creates a downloader writing into `tmp_dir` with text progress on stderr.
    #[must_use]
    pub fn new(tmp_dir: impl Into<PathBuf>) -> Self {
        Self {
            tmp_dir: tmp_dir.into(),
            callback: None,
        }
    }

    /// Reports progress to `callback` instead of printing it.
    #[must_use]
    pub fn with_callback(mut self, callback: ProgressCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Returns the temp file a URL downloads into.
    #[must_use = "returns the path without side effects"]
    pub fn temp_path(&self, url: &str) -> PathBuf {
        self.tmp_dir.join(format!("download-{}", url_digest(url)))
    }

    /// Returns the file holding the remote validator for a URL's partial download.
    #[must_use = "returns the path without side effects"]
    pub fn validator_path(&self, url: &str) -> PathBuf {
        self.tmp_dir
            .join(format!("download-{}.validator", url_digest(url)))
    }

    /// Removes the temp file and validator of a finished download.
    ///
    /// Failures are logged, not returned.
    pub fn discard(&self, url: &str) {
        for path in [self.temp_path(url), self.validator_path(url)] {
            if let Err(e) = std::fs::remove_file(&path)
                && e.kind() != std::io::ErrorKind::NotFound
            {
                warn!("Couldn't remove '{}': {e}", path.display());
            }
        }
    }

    /// Downloads `url`, resuming any partial file left by an earlier call.
    ///
    /// Returns the path of the complete temp file. On failure the partial
    /// file is kept so a later call can resume.
    ///
    /// # Errors
    ///
    /// Returns [`GobboError::Transfer`] for unexpected status codes or when
    /// every attempt failed in transport, and an I/O error if the temp file
    /// cannot be written.
    pub async fn download(&self, url: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.tmp_dir)
            .await
            .with_context(|| format!("Failed to create directory: {}", self.tmp_dir.display()))?;

        let dest = self.temp_path(url);
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = calculate_retry_delay(attempt);
                warn!(
                    "Retrying download (attempt {}/{})...",
                    attempt + 1,
                    MAX_RETRIES
                );
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            match self.attempt(url, &dest).await {
                Ok(()) => {
                    self.emit(ProgressEvent::Completed);
                    return Ok(dest);
                }
                Err(AttemptError::Fatal(e)) => {
                    self.emit(ProgressEvent::Failed {
                        error: e.to_string(),
                    });
                    return Err(e);
                }
                Err(AttemptError::Retryable(e)) => {
                    debug!("Download attempt {} failed: {e:#}", attempt + 1);
                    last_error = Some(e);
                }
            }
        }

        let error = last_error.unwrap_or_else(|| {
            GobboError::transfer(url, format!("failed after {MAX_RETRIES} attempts")).into()
        });
        self.emit(ProgressEvent::Failed {
            error: error.to_string(),
        });
        Err(error)
    }

    async fn attempt(&self, url: &str, dest: &Path) -> Result<(), AttemptError> {
        let fatal = |e: anyhow::Error| AttemptError::Fatal(e);

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(dest)
            .await
            .with_context(|| format!("Failed to open {}", dest.display()))
            .map_err(fatal)?;

        let existing = file
            .metadata()
            .await
            .with_context(|| format!("Failed to stat {}", dest.display()))
            .map_err(fatal)?
            .len();
        let mut offset = resume_offset(existing);
        truncate_to(&mut file, dest, offset).await.map_err(fatal)?;

        let validator_path = self.validator_path(url);
        let validator = if offset > 0 {
            tokio::fs::read_to_string(&validator_path)
                .await
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        } else {
            None
        };

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .read_timeout(Duration::from_secs(READ_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")
            .map_err(fatal)?;

        let mut request = client.get(url);
        if offset > 0 {
            debug!("Resuming {url} from byte {offset}");
            request = request.header(RANGE, format!("bytes={offset}-"));
            if let Some(v) = &validator {
                request = request.header(IF_RANGE, v.as_str());
            }
        }

        let response = request.send().await.map_err(|e| {
            AttemptError::Retryable(GobboError::transfer(url, e.to_string()).into())
        })?;

        let status = response.status();
        match status {
            StatusCode::OK if offset == 0 => {}
            StatusCode::PARTIAL_CONTENT if offset > 0 => {
                check_content_range(&response, url, offset).map_err(fatal)?;
            }
            StatusCode::OK if validator.is_some() => {
                info!("Remote file changed since the partial download; restarting");
                offset = 0;
                truncate_to(&mut file, dest, 0).await.map_err(fatal)?;
            }
            _ => {
                return Err(fatal(GobboError::transfer(url, status.to_string()).into()));
            }
        }

        if let Some(v) = response_validator(&response) {
            tokio::fs::write(&validator_path, v)
                .await
                .with_context(|| format!("Failed to write {}", validator_path.display()))
                .map_err(fatal)?;
        } else if offset == 0 {
            let _ = tokio::fs::remove_file(&validator_path).await;
        }

        let total = response.content_length().map_or(0, |len| offset + len);
        self.emit(ProgressEvent::Started {
            url: url.to_string(),
            total,
            resumed_from: offset,
        });

        let mut stream = response.bytes_stream();
        let mut downloaded = offset;
        let start_time = Instant::now();
        let mut last_update = Instant::now();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                AttemptError::Retryable(
                    GobboError::transfer(url, format!("failed to read body: {e}")).into(),
                )
            })?;
            file.write_all(&chunk)
                .await
                .with_context(|| format!("Failed to write to {}", dest.display()))
                .map_err(fatal)?;
            downloaded += chunk.len() as u64;

            let now = Instant::now();
            if now.duration_since(last_update).as_millis() >= PROGRESS_INTERVAL_MS {
                self.report(downloaded, total, offset, start_time);
                last_update = now;
            }
        }

        file.flush()
            .await
            .with_context(|| format!("Failed to flush {}", dest.display()))
            .map_err(fatal)?;

        self.report(downloaded, total, offset, start_time);
        if self.callback.is_none() {
            eprintln!();
        }
        Ok(())
    }

    fn report(&self, downloaded: u64, total: u64, offset: u64, start_time: Instant) {
        let elapsed_secs = start_time.elapsed().as_secs_f64();
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let speed = if elapsed_secs > 0.0 {
            ((downloaded - offset) as f64 / elapsed_secs) as u64
        } else {
            0
        };

        match &self.callback {
            Some(callback) => callback(ProgressEvent::Progress { downloaded, speed }),
            None => print_progress(downloaded, total, speed),
        }
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(callback) = &self.callback {
            callback(event);
        }
    }
}

/// Hex-encoded SHA256 of a URL, the content address of its download.
#[must_use]
pub fn url_digest(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

/// Offset to resume from given the current partial file length.
#[must_use]
pub fn resume_offset(existing_len: u64) -> u64 {
    if existing_len >= RESUME_DISCARD_BYTES {
        existing_len - RESUME_DISCARD_BYTES
    } else {
        0
    }
}

async fn truncate_to(file: &mut tokio::fs::File, path: &Path, len: u64) -> Result<()> {
    file.set_len(len)
        .await
        .with_context(|| format!("Failed to truncate {}", path.display()))?;
    file.seek(SeekFrom::Start(len))
        .await
        .with_context(|| format!("Failed to seek in {}", path.display()))?;
    Ok(())
}

/// Rejects a partial response that does not start where the file ends.
fn check_content_range(response: &reqwest::Response, url: &str, offset: u64) -> Result<()> {
    let Some(range) = response
        .headers()
        .get(CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
    else {
        return Ok(());
    };

    if range.starts_with(&format!("bytes {offset}-")) {
        Ok(())
    } else {
        Err(GobboError::transfer(url, format!("unexpected Content-Range '{range}'")).into())
    }
}

/// The validator `If-Range` will use on a later resume.
fn response_validator(response: &reqwest::Response) -> Option<String> {
    let headers = response.headers();
    headers
        .get(ETAG)
        .filter(|v| !v.as_bytes().starts_with(b"W/"))
        .or_else(|| headers.get(LAST_MODIFIED))
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Prints a simple text-based progress line to stderr.
#[allow(clippy::cast_precision_loss)]
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
fn print_progress(downloaded: u64, total: u64, speed: u64) {
    let percent = if total > 0 {
        (downloaded as f64 / total as f64 * 100.0) as u8
    } else {
        0
    };
    let speed_str = format_speed(speed as f64);
    let downloaded_str = format_bytes(downloaded);
    let total_str = format_bytes(total);

    let mut stderr = std::io::stderr();
    let _ = write!(
        stderr,
        "\r{downloaded_str}/{total_str} ({percent}%) {speed_str}     "
    );
    let _ = stderr.flush();
}

/// Formats bytes into a human-readable string (KB, MB, GB).
fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    #[allow(clippy::cast_precision_loss)]
    let bytes_f = bytes as f64;

    if bytes_f >= GB {
        format!("{:.2} GB", bytes_f / GB)
    } else if bytes_f >= MB {
        format!("{:.2} MB", bytes_f / MB)
    } else if bytes_f >= KB {
        format!("{:.2} KB", bytes_f / KB)
    } else {
        format!("{bytes} B")
    }
}

/// Formats speed (bytes/sec) into a human-readable string.
fn format_speed(speed: f64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;

    if speed >= MB {
        format!("{:.2} MB/s", speed / MB)
    } else if speed >= KB {
        format!("{:.2} KB/s", speed / KB)
    } else {
        format!("{speed:.0} B/s")
    }
}

/// Calculates the retry delay with exponential backoff and jitter.
///
/// The delay doubles with each attempt (1s, 2s, 4s) with +/- 25% jitter.
fn calculate_retry_delay(attempt: u32) -> u64 {
    let base_delay = BASE_RETRY_DELAY_MS * 2u64.pow(attempt);
    let jitter_range = base_delay / 4;
    let jitter = rand::rng().random_range(0..=jitter_range * 2);
    base_delay - jitter_range + jitter
}
