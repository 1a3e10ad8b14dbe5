//! OS file-change subscription.
//!
//! Files are watched through their parent directory (non-recursive), which
//! keeps seeing a file across editors that save by rename. Directories are
//! reference-counted so several watched files share one OS watch.

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

use crate::error::WatchError;

/// Directory-level OS watcher forwarding changed paths to a sink.
pub(crate) struct OsWatcher {
    watcher: RecommendedWatcher,
    directories: HashMap<PathBuf, usize>,
}

impl OsWatcher {
    /// Create a watcher that calls `sink` with every changed path.
    pub(crate) fn new<F>(sink: F) -> Result<Self, WatchError>
    where
        F: Fn(PathBuf) + Send + 'static,
    {
        let watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    if !is_relevant(&event.kind) {
                        return;
                    }
                    trace!(kind = ?event.kind, paths = ?event.paths, "File system event");
                    for path in event.paths {
                        sink(path);
                    }
                }
                Err(e) => warn!(error = %e, "File watcher error"),
            },
            notify::Config::default(),
        )
        .map_err(|e| WatchError {
            path: PathBuf::new(),
            message: e.to_string(),
        })?;

        Ok(Self {
            watcher,
            directories: HashMap::new(),
        })
    }

    /// Start receiving events for `file`.
    pub(crate) fn add(&mut self, file: &Path) -> Result<(), WatchError> {
        let directory = parent_of(file);
        if let Some(count) = self.directories.get_mut(&directory) {
            *count += 1;
            return Ok(());
        }
        self.watcher
            .watch(&directory, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError {
                path: file.to_path_buf(),
                message: e.to_string(),
            })?;
        self.directories.insert(directory, 1);
        Ok(())
    }

    /// Stop receiving events for `file`; the directory watch goes with its last file.
    pub(crate) fn remove(&mut self, file: &Path) {
        let directory = parent_of(file);
        let Some(count) = self.directories.get_mut(&directory) else {
            return;
        };
        *count -= 1;
        if *count == 0 {
            self.directories.remove(&directory);
            if let Err(e) = self.watcher.unwatch(&directory) {
                trace!(directory = %directory.display(), error = %e, "Unwatch failed");
            }
        }
    }
}

fn parent_of(file: &Path) -> PathBuf {
    file.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Access events never change content.
fn is_relevant(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) | EventKind::Any
    )
}
