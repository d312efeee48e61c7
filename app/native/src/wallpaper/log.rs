//! Unified log access for wallpaper image-cache lookups.
//!
//! The wallpaper agent logs every image it resolves as
//! `BEGIN - Image cache lookup - url: file:///..., ...`. This module queries
//! those entries through the `log` tool, both as a bounded history
//! (`log show --last`) and as a live feed (`log stream`).

use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::thread::JoinHandle;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::constants::wallpaper_log::{
    CATEGORY, LOG_BINARY, LOOKUP_MARKER, SUBSYSTEM, URL_PATTERN,
};
use crate::platform::thread::spawn_joinable_thread;

/// Errors raised while talking to the `log` tool.
#[derive(Debug, Error)]
pub enum LogError {
    /// The `log` process could not be started.
    #[error("failed to launch {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: io::Error,
    },
    /// The `log` process exited unsuccessfully.
    #[error("log query exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },
    /// Reading the process output failed.
    #[error("failed to read log output: {0}")]
    Io(#[from] io::Error),
}

/// Returns the compiled URL extraction pattern.
fn url_regex() -> Option<&'static Regex> {
    static REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(URL_PATTERN).ok()).as_ref()
}

/// Extracts the wallpaper `file://` URL from a lookup message.
///
/// Captures everything between `url: ` and the next comma.
#[must_use]
pub fn extract_wallpaper_url(message: &str) -> Option<String> {
    url_regex()?
        .captures(message)
        .and_then(|captures| captures.get(1))
        .map(|url| url.as_str().trim().to_string())
        .filter(|url| !url.is_empty())
}

/// Returns whether a message is an image-cache lookup for a local file.
#[must_use]
pub fn is_lookup_message(message: &str) -> bool {
    message.contains(LOOKUP_MARKER) && message.contains("url: file")
}

/// Returns the URL of the most recent lookup among `messages` (oldest first).
#[must_use]
pub fn last_wallpaper_url<'a, I>(messages: I) -> Option<String>
where I: IntoIterator<Item = &'a str> {
    messages
        .into_iter()
        .filter(|message| is_lookup_message(message))
        .filter_map(extract_wallpaper_url)
        .last()
}

/// The filter pushed into the log query.
#[must_use]
pub fn predicate() -> String {
    format!(
        "subsystem == \"{SUBSYSTEM}\" AND category == \"{CATEGORY}\" AND composedMessage CONTAINS \"{LOOKUP_MARKER}\""
    )
}

/// One entry of `log ... --style ndjson` output.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NdjsonEntry {
    #[serde(default)]
    subsystem: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    event_message: Option<String>,
}

/// Parses one output line into a candidate message.
///
/// JSON lines are checked against the subsystem and category; any other line
/// (banners, syslog-style output) is passed through as raw text.
#[must_use]
pub fn parse_log_line(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.starts_with('{') {
        let entry: NdjsonEntry = serde_json::from_str(trimmed).ok()?;
        let subsystem_matches = entry.subsystem.as_deref().is_none_or(|s| s == SUBSYSTEM);
        let category_matches = entry.category.as_deref().is_none_or(|c| c == CATEGORY);
        if !(subsystem_matches && category_matches) {
            return None;
        }
        return entry.event_message;
    }

    Some(trimmed.to_string())
}

// ============================================================================
// History queries
// ============================================================================

/// Source of recent wallpaper log messages.
pub trait LogHistory: Send + Sync {
    /// Returns lookup messages logged within `window`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error when the log store cannot be queried.
    fn recent_messages(&self, window: Duration) -> Result<Vec<String>, LogError>;
}

/// `log show` backed history.
#[derive(Debug, Clone)]
pub struct LogShow {
    binary: PathBuf,
}

impl Default for LogShow {
    fn default() -> Self { Self { binary: PathBuf::from(LOG_BINARY) } }
}

impl LogShow {
    /// Uses a specific `log` binary.
    #[must_use]
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self { Self { binary: binary.into() } }
}

/// Formats a recency window for `log show --last`, rounding up to one second.
fn last_argument(window: Duration) -> String {
    let secs = window.as_secs() + u64::from(window.subsec_nanos() > 0);
    format!("{}s", secs.max(1))
}

impl LogHistory for LogShow {
    fn recent_messages(&self, window: Duration) -> Result<Vec<String>, LogError> {
        let output = Command::new(&self.binary)
            .args(["show", "--last", &last_argument(window), "--style", "ndjson"])
            .args(["--predicate", &predicate()])
            .stdin(Stdio::null())
            .output()
            .map_err(|source| LogError::Spawn {
                binary: self.binary.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(LogError::Exit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().filter_map(parse_log_line).collect())
    }
}

// ============================================================================
// Live stream
// ============================================================================

/// Feeds each qualifying message of `reader` to `on_message`.
///
/// Returns the number of messages delivered once the reader is exhausted.
///
/// # Errors
///
/// Returns an error if reading from the underlying stream fails.
pub fn pump_lines<R, F>(reader: R, mut on_message: F) -> io::Result<usize>
where
    R: BufRead,
    F: FnMut(String),
{
    let mut delivered = 0;
    for line in reader.lines() {
        let line = line?;
        if let Some(message) = parse_log_line(&line).filter(|m| is_lookup_message(m)) {
            on_message(message);
            delivered += 1;
        }
    }
    Ok(delivered)
}

/// A running `log stream` subscription.
///
/// The child process is killed and the reader thread joined on [`LogStream::stop`]
/// or drop.
pub struct LogStream {
    child: Child,
    reader: Option<JoinHandle<()>>,
}

impl LogStream {
    /// Starts streaming wallpaper lookups, invoking `on_message` on a background thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the `log` process cannot be started.
    pub fn spawn<F>(binary: &Path, on_message: F) -> Result<Self, LogError>
    where F: FnMut(String) + Send + 'static {
        let mut child = Command::new(binary)
            .args(["stream", "--style", "ndjson", "--predicate", &predicate()])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| LogError::Spawn {
                binary: binary.display().to_string(),
                source,
            })?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            return Err(LogError::Io(io::Error::other("log stream has no stdout")));
        };

        let reader = spawn_joinable_thread("log-stream", move || {
            match pump_lines(BufReader::new(stdout), on_message) {
                Ok(count) => tracing::debug!(count, "wallpaper: log stream ended"),
                Err(err) => tracing::warn!(error = %err, "wallpaper: log stream read failed"),
            }
        });

        tracing::debug!(pid = child.id(), "wallpaper: log stream started");
        Ok(Self { child, reader })
    }

    /// Stops the stream and waits for the reader thread to finish.
    pub fn stop(mut self) { self.shutdown(); }

    fn shutdown(&mut self) {
        if let Err(err) = self.child.kill() {
            tracing::debug!(error = %err, "wallpaper: log stream already exited");
        }
        let _ = self.child.wait();

        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

impl Drop for LogStream {
    fn drop(&mut self) {
        if self.reader.is_some() {
            self.shutdown();
        }
    }
}
