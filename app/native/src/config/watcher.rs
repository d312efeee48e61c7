//! Configuration file watcher for hot-reloading the effect.
//!
//! The parent directory of the loaded file is watched so editors that save
//! through a temporary file and a rename are picked up too.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use super::types::{ClearbarConfig, load_config_from_path};
use crate::platform::thread::spawn_named_thread;

/// Debounce duration for config file changes.
/// Some editors trigger multiple events per save (write to temp, rename, etc.).
const CONFIG_DEBOUNCE_MS: u64 = 200;

/// Tracks events for one file name and drops bursts.
struct Debouncer {
    file_name: OsString,
    window: Duration,
    last: Option<Instant>,
}

impl Debouncer {
    fn new(file_name: OsString) -> Self {
        Self {
            file_name,
            window: Duration::from_millis(CONFIG_DEBOUNCE_MS),
            last: None,
        }
    }

    /// Returns whether an event touching `paths` at `now` should trigger a reload.
    fn accept(&mut self, paths: &[PathBuf], now: Instant) -> bool {
        let affects_config =
            paths.iter().any(|p| p.file_name().is_some_and(|name| name == self.file_name));
        if !affects_config {
            return false;
        }
        if self.last.is_some_and(|t| now.duration_since(t) < self.window) {
            return false;
        }
        self.last = Some(now);
        true
    }
}

/// Starts watching `config_path`, calling `on_change` with each successfully
/// re-parsed configuration.
///
/// Invalid edits are logged and ignored; the previous configuration stays in effect.
pub fn watch_config_file<F>(config_path: &Path, on_change: F)
where F: Fn(ClearbarConfig) + Send + 'static {
    let config_path = config_path.to_path_buf();
    let Some(file_name) = config_path.file_name().map(std::ffi::OsStr::to_os_string) else {
        return;
    };

    spawn_named_thread("config-watcher", move || {
        let (tx, rx) = std::sync::mpsc::channel();

        let mut watcher: RecommendedWatcher = match notify::recommended_watcher(tx) {
            Ok(w) => w,
            Err(err) => {
                tracing::warn!(error = %err, "config: failed to create watcher");
                return;
            }
        };

        let watch_path = config_path.parent().unwrap_or(&config_path);
        if let Err(err) = watcher.watch(watch_path, RecursiveMode::NonRecursive) {
            tracing::warn!(error = %err, path = %watch_path.display(), "config: failed to watch");
            return;
        }

        let mut debouncer = Debouncer::new(file_name);

        loop {
            match rx.recv() {
                Ok(Ok(event)) => {
                    if !debouncer.accept(&event.paths, Instant::now()) {
                        continue;
                    }

                    match load_config_from_path(&config_path) {
                        Ok((config, _)) => {
                            tracing::info!(path = %config_path.display(), "config: reloaded");
                            on_change(config);
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, "config: reload failed, keeping current settings");
                        }
                    }
                }
                Ok(Err(err)) => {
                    tracing::warn!(error = %err, "config: watch error");
                }
                Err(_) => break,
            }
        }
    });
}
