//! Incremental monitoring: re-parse watched files when their content changes.
//!
//! ## Architecture
//!
//! ```text
//!  notify callback ──┐
//!  poll tick ────────┤                       ┌──────────────┐
//!  notify_changed() ─┼──► command queue ───► │ coordinator  │ ──► rayon pool (parse)
//!  watch/unwatch() ──┘        ▲              │   thread     │          │
//!                             └──────────────┴──────────────┴◄─ ParseDone
//! ```
//!
//! A single coordinator thread owns every per-file entry and is the only
//! place generations are published, so the coalescing rules are plain
//! sequential code:
//!
//! - A change arms a debounce deadline; changes inside the window do not re-arm it.
//! - At the deadline the file's fingerprint is compared with the last parsed
//!   content. Unchanged content is ignored.
//! - A file has at most one parse in flight. A change detected while one is in
//!   flight sets a single follow-up flag, consumed when the parse finishes.
//! - Every parse carries a ticket; a result whose ticket is no longer current
//!   (the file was unwatched or deleted meanwhile) is discarded unpublished.
//!
//! ## State machine
//!
//! ```text
//! Unwatched ──watch──► Loaded ──content change──► Stale ──parse ok──► Loaded
//!     ▲                                             │
//!     └──────────── unwatch / deleted ──────────────┘ (from any state)
//! ```

mod watcher;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

use crate::Workspace;
use crate::config::MonitorConfig;
use crate::error::{Error, LoadError, LoadErrorKind, Result, WatchError};
use crate::loader::{Parsed, normalize_path};
use crate::types::{FileId, Fingerprint};
use crate::unit::TranslationUnit;
use watcher::OsWatcher;

/// Wake-up used when nothing is scheduled.
const IDLE_WAKEUP: Duration = Duration::from_secs(3600);

/// Monitoring state of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileState {
    /// Not watched (never watched, unwatched, or deleted)
    Unwatched,
    /// The current generation matches the file's content
    Loaded,
    /// The content changed and a re-parse is pending, running, or failed
    Stale,
}

/// What happened to a watched file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// A re-parse published a new generation
    Reloaded {
        /// The new generation number
        generation: u64,
    },
    /// A re-parse failed; the previous generation stays current
    ReloadFailed {
        /// Why the load failed
        message: String,
    },
    /// The file was unwatched or deleted and its unit released
    Released,
    /// The OS watch could not be set up; the file is still polled
    WatchFailed {
        /// Why the watch failed
        message: String,
    },
}

/// A monitor notification for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitorUpdate {
    /// Canonical path of the file
    pub path: PathBuf,
    /// What happened
    #[serde(flatten)]
    pub event: MonitorEvent,
}

enum Command {
    Watch {
        key: PathBuf,
        file: FileId,
        fingerprint: Fingerprint,
        reply: Sender<std::result::Result<(), WatchError>>,
    },
    Unwatch {
        key: PathBuf,
        reply: Sender<bool>,
    },
    Changed(PathBuf),
    Removed(PathBuf),
    ParseDone {
        key: PathBuf,
        ticket: u64,
        outcome: std::result::Result<Parsed, LoadError>,
    },
    Shutdown,
}

type StateMap = Arc<RwLock<HashMap<PathBuf, FileState>>>;
type Subscribers = Arc<Mutex<Vec<Sender<MonitorUpdate>>>>;

/// Handle to a running monitor.
///
/// Dropping the handle shuts the coordinator down; parses still in flight
/// are discarded.
pub struct Monitor {
    workspace: Arc<Workspace>,
    commands: Sender<Command>,
    states: StateMap,
    subscribers: Subscribers,
    coordinator: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("watched", &self.watched().len())
            .field("running", &self.coordinator.is_some())
            .finish_non_exhaustive()
    }
}

impl Monitor {
    /// Start the coordinator thread and parse worker pool.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for invalid settings, `Error::WorkerPool` if the
    /// parse pool cannot be built and `Error::Io` if the thread cannot spawn.
    /// Returns `Error::Watch` if OS events are requested but unavailable and
    /// polling is disabled, since no file could ever be seen changing.
    pub fn start(workspace: Arc<Workspace>, config: MonitorConfig) -> Result<Self> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("janus-parse-{i}"))
            .build()?;

        let (commands, queue) = crossbeam_channel::unbounded();
        let states: StateMap = Arc::default();
        let subscribers: Subscribers = Arc::default();

        let os_watcher = if config.os_events {
            let sink = commands.clone();
            match OsWatcher::new(move |path| {
                let _ = sink.send(Command::Changed(path));
            }) {
                Ok(w) => Some(w),
                Err(e) if config.poll_interval().is_none() => return Err(e.into()),
                Err(e) => {
                    warn!(error = %e.message, "OS file events unavailable, polling only");
                    None
                }
            }
        } else {
            None
        };

        let coordinator = Coordinator {
            workspace: Arc::clone(&workspace),
            queue,
            sender: commands.clone(),
            pool,
            states: Arc::clone(&states),
            subscribers: Arc::clone(&subscribers),
            entries: HashMap::new(),
            os_watcher,
            debounce: config.debounce(),
            poll_interval: config.poll_interval(),
            next_poll: config.poll_interval().map(|i| Instant::now() + i),
            next_ticket: 0,
        };
        let handle = std::thread::Builder::new()
            .name("janus-monitor".to_string())
            .spawn(move || coordinator.run())?;

        debug!(
            workers = config.workers,
            debounce_ms = config.debounce_ms,
            poll_interval_ms = config.poll_interval_ms,
            os_events = config.os_events,
            "Monitor started"
        );
        Ok(Self {
            workspace,
            commands,
            states,
            subscribers,
            coordinator: Some(handle),
        })
    }

    /// Load `path` (if needed) and start monitoring it.
    ///
    /// The initial load runs on the calling thread; later re-parses run on the
    /// worker pool. Watching an already watched file returns its unit.
    ///
    /// # Errors
    ///
    /// Returns `Error::Load` if the initial load fails (nothing is watched),
    /// `Error::Watch` if the OS watch fails while polling is disabled (a unit
    /// loaded by this call is released again) and `Error::MonitorStopped` if
    /// the coordinator is gone.
    pub fn watch(&self, path: &Path) -> Result<Arc<TranslationUnit>> {
        let key = normalize_path(path);
        if self.state(&key) != FileState::Unwatched {
            if let Ok(unit) = self.workspace.unit(&key) {
                return Ok(unit);
            }
        }

        let preloaded = self.workspace.unit(&key).is_ok();
        let unit = self.workspace.load(&key)?;
        let fingerprint = unit.snapshot()?.fingerprint;
        if let Err(e) = self.register(key.clone(), unit.id(), fingerprint) {
            if !preloaded {
                if let Err(release) = self.workspace.release(&key) {
                    trace!(path = %key.display(), error = %release, "Unit already released");
                }
            }
            return Err(e);
        }
        Ok(unit)
    }

    fn register(&self, key: PathBuf, file: FileId, fingerprint: Fingerprint) -> Result<()> {
        let (reply, done) = crossbeam_channel::bounded(1);
        self.send(Command::Watch {
            key,
            file,
            fingerprint,
            reply,
        })?;
        done.recv().map_err(|_| Error::MonitorStopped)??;
        Ok(())
    }

    /// Stop monitoring `path` and release its unit.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownFile` if the path is not watched.
    pub fn unwatch(&self, path: &Path) -> Result<()> {
        let key = normalize_path(path);
        let (reply, done) = crossbeam_channel::bounded(1);
        self.send(Command::Unwatch {
            key: key.clone(),
            reply,
        })?;
        if done.recv().map_err(|_| Error::MonitorStopped)? {
            Ok(())
        } else {
            Err(Error::UnknownFile { path: key })
        }
    }

    /// Report that `path` may have changed (same path as OS events take).
    ///
    /// # Errors
    ///
    /// Returns `Error::MonitorStopped` if the coordinator is gone.
    pub fn notify_changed(&self, path: &Path) -> Result<()> {
        self.send(Command::Changed(path.to_path_buf()))
    }

    /// Report that `path` was deleted.
    ///
    /// # Errors
    ///
    /// Returns `Error::MonitorStopped` if the coordinator is gone.
    pub fn notify_removed(&self, path: &Path) -> Result<()> {
        self.send(Command::Removed(path.to_path_buf()))
    }

    /// Current state of `path`.
    #[must_use]
    pub fn state(&self, path: &Path) -> FileState {
        let key = normalize_path(path);
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .copied()
            .unwrap_or(FileState::Unwatched)
    }

    /// Watched paths, sorted.
    #[must_use]
    pub fn watched(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self
            .states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        paths.sort();
        paths
    }

    /// Receive every update published from now on.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<MonitorUpdate> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// The workspace this monitor publishes into.
    #[must_use]
    pub fn workspace(&self) -> &Arc<Workspace> {
        &self.workspace
    }

    /// Stop the coordinator and wait for it to exit.
    ///
    /// # Errors
    ///
    /// Returns `Error::MonitorStopped` if the coordinator thread panicked.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        let Some(handle) = self.coordinator.take() else {
            return Ok(());
        };
        let _ = self.commands.send(Command::Shutdown);
        handle.join().map_err(|_| Error::MonitorStopped)
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands.send(command).map_err(|_| Error::MonitorStopped)
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!(error = %e, "Monitor coordinator exited abnormally");
        }
    }
}

// ============================================================================
// Coordinator
// ============================================================================

#[derive(Debug)]
struct Entry {
    file: FileId,
    /// Content of the current generation (or of the last failed attempt)
    fingerprint: Fingerprint,
    /// Content the parse in flight is expected to read
    pending: Option<Fingerprint>,
    in_flight: Option<u64>,
    follow_up: bool,
    deadline: Option<Instant>,
}

struct Coordinator {
    workspace: Arc<Workspace>,
    queue: Receiver<Command>,
    sender: Sender<Command>,
    pool: rayon::ThreadPool,
    states: StateMap,
    subscribers: Subscribers,
    entries: HashMap<PathBuf, Entry>,
    os_watcher: Option<OsWatcher>,
    debounce: Duration,
    poll_interval: Option<Duration>,
    next_poll: Option<Instant>,
    next_ticket: u64,
}

impl Coordinator {
    fn run(mut self) {
        loop {
            let timeout = self
                .next_wakeup()
                .map_or(IDLE_WAKEUP, |at| at.saturating_duration_since(Instant::now()));
            match self.queue.recv_timeout(timeout) {
                Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Ok(command) => self.handle(command),
                Err(RecvTimeoutError::Timeout) => {}
            }
            self.fire_due_deadlines();
            self.poll_if_due();
        }

        let in_flight = self.entries.values().filter(|e| e.in_flight.is_some()).count();
        debug!(watched = self.entries.len(), in_flight, "Monitor stopped");
        self.states
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn next_wakeup(&self) -> Option<Instant> {
        self.entries
            .values()
            .filter_map(|e| e.deadline)
            .chain(self.next_poll)
            .min()
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Watch {
                key,
                file,
                fingerprint,
                reply,
            } => {
                let _ = reply.send(self.watch(key, file, fingerprint));
            }
            Command::Unwatch { key, reply } => {
                let removed = self.entries.contains_key(&key);
                if removed {
                    self.remove(&key, "unwatched");
                }
                let _ = reply.send(removed);
            }
            Command::Changed(path) => self.changed(&normalize_path(&path)),
            Command::Removed(path) => {
                let key = normalize_path(&path);
                if self.entries.contains_key(&key) {
                    self.remove(&key, "deleted");
                }
            }
            Command::ParseDone {
                key,
                ticket,
                outcome,
            } => self.parse_done(&key, ticket, outcome),
            Command::Shutdown => {}
        }
    }

    /// Without polling, a file the OS watch cannot cover is refused.
    fn watch(
        &mut self,
        key: PathBuf,
        file: FileId,
        fingerprint: Fingerprint,
    ) -> std::result::Result<(), WatchError> {
        if self.entries.contains_key(&key) {
            return Ok(());
        }
        if let Some(os) = self.os_watcher.as_mut() {
            if let Err(e) = os.add(&key) {
                if self.poll_interval.is_none() {
                    warn!(path = %key.display(), error = %e.message, "Watch setup failed");
                    return Err(e);
                }
                warn!(path = %key.display(), error = %e.message, "Watch setup failed, polling only");
                self.publish(&key, MonitorEvent::WatchFailed { message: e.message });
            }
        }
        self.entries.insert(
            key.clone(),
            Entry {
                file,
                fingerprint,
                pending: None,
                in_flight: None,
                follow_up: false,
                deadline: None,
            },
        );
        self.set_state(&key, FileState::Loaded);
        debug!(path = %key.display(), "Watching file");
        Ok(())
    }

    /// Arm the debounce window; changes inside an armed window are absorbed.
    fn changed(&mut self, key: &Path) {
        let Some(entry) = self.entries.get_mut(key) else {
            trace!(path = %key.display(), "Change for unwatched path ignored");
            return;
        };
        if entry.deadline.is_none() {
            entry.deadline = Some(Instant::now() + self.debounce);
        }
    }

    fn fire_due_deadlines(&mut self) {
        let now = Instant::now();
        let due: Vec<PathBuf> = self
            .entries
            .iter()
            .filter(|(_, e)| e.deadline.is_some_and(|d| d <= now))
            .map(|(k, _)| k.clone())
            .collect();
        for key in due {
            self.check(&key);
        }
    }

    /// Compare the file with its last parsed content and schedule a parse if it differs.
    fn check(&mut self, key: &Path) {
        let current = Fingerprint::of_file(key);
        let Some(entry) = self.entries.get_mut(key) else {
            return;
        };
        entry.deadline = None;

        let fingerprint = match current {
            Ok(fp) => fp,
            Err(e) => {
                debug!(path = %key.display(), error = %e, "Watched file is gone");
                self.remove(key, "deleted");
                return;
            }
        };
        if fingerprint.same_content(&entry.fingerprint) && entry.in_flight.is_none() {
            // touched but unchanged: remember the new mtime so polling stays quiet
            entry.fingerprint = fingerprint;
            trace!(path = %key.display(), "Content unchanged");
            return;
        }
        if entry.in_flight.is_some() {
            if entry.pending.is_some_and(|p| fingerprint.same_content(&p)) {
                // the parse in flight already reads this content
                entry.pending = Some(fingerprint);
                return;
            }
            if !entry.follow_up {
                debug!(path = %key.display(), "Parse in flight, follow-up scheduled");
            }
            entry.follow_up = true;
            return;
        }
        self.spawn_parse(key, Some(fingerprint));
    }

    /// Start a parse; `fingerprint` is the content it is expected to read.
    fn spawn_parse(&mut self, key: &Path, fingerprint: Option<Fingerprint>) {
        let Some(entry) = self.entries.get_mut(key) else {
            return;
        };
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        entry.in_flight = Some(ticket);
        entry.pending = fingerprint;
        let file = entry.file;
        self.set_state(key, FileState::Stale);

        let workspace = Arc::clone(&self.workspace);
        let sender = self.sender.clone();
        let key = key.to_path_buf();
        debug!(path = %key.display(), ticket, "Re-parse scheduled");
        self.pool.spawn(move || {
            let outcome = workspace.parse(&key, file);
            let _ = sender.send(Command::ParseDone {
                key,
                ticket,
                outcome,
            });
        });
    }

    fn parse_done(
        &mut self,
        key: &Path,
        ticket: u64,
        outcome: std::result::Result<Parsed, LoadError>,
    ) {
        let Some(entry) = self.entries.get_mut(key) else {
            debug!(path = %key.display(), ticket, "Discarding parse of unwatched file");
            return;
        };
        if entry.in_flight != Some(ticket) {
            debug!(path = %key.display(), ticket, "Discarding superseded parse");
            return;
        }
        entry.in_flight = None;
        let pending = entry.pending.take();

        match outcome {
            Ok(parsed) => {
                entry.fingerprint = parsed.fingerprint;
                let gaps = parsed.tree.classification_gaps();
                let file = entry.file;
                let follow_up = std::mem::take(&mut entry.follow_up);

                if !self.workspace.is_registered(key) {
                    // released behind the monitor's back
                    self.remove(key, "released");
                    return;
                }
                let (_, generation) = self.workspace.install(key, file, parsed);
                info!(path = %key.display(), generation, gaps, "Published new generation");
                self.publish(key, MonitorEvent::Reloaded { generation });
                if follow_up {
                    self.spawn_parse(key, Fingerprint::of_file(key).ok());
                } else {
                    self.set_state(key, FileState::Loaded);
                }
            }
            Err(e) if e.kind == LoadErrorKind::IoFailure && !key.exists() => {
                debug!(path = %key.display(), "Watched file deleted during parse");
                self.remove(key, "deleted");
            }
            Err(e) => {
                if let Some(fp) = pending {
                    entry.fingerprint = fp;
                }
                let follow_up = std::mem::take(&mut entry.follow_up);
                warn!(path = %key.display(), error = %e, "Re-parse failed, keeping previous generation");
                self.publish(
                    key,
                    MonitorEvent::ReloadFailed {
                        message: e.to_string(),
                    },
                );
                if follow_up {
                    self.spawn_parse(key, Fingerprint::of_file(key).ok());
                }
            }
        }
    }

    fn poll_if_due(&mut self) {
        let (Some(interval), Some(next)) = (self.poll_interval, self.next_poll) else {
            return;
        };
        let now = Instant::now();
        if now < next {
            return;
        }
        self.next_poll = Some(now + interval);

        let mut gone = Vec::new();
        for (key, entry) in &mut self.entries {
            if entry.deadline.is_some() {
                continue;
            }
            let known = entry.pending.unwrap_or(entry.fingerprint);
            match std::fs::metadata(key) {
                Ok(metadata) => {
                    if known.stat_differs(&metadata) {
                        trace!(path = %key.display(), "Poll detected change");
                        entry.deadline = Some(now);
                    }
                }
                Err(_) => gone.push(key.clone()),
            }
        }
        for key in gone {
            self.remove(&key, "deleted");
        }
        self.fire_due_deadlines();
    }

    /// Forget a file: release its unit, drop its OS watch, notify subscribers.
    fn remove(&mut self, key: &Path, reason: &str) {
        let Some(entry) = self.entries.remove(key) else {
            return;
        };
        if let Some(os) = self.os_watcher.as_mut() {
            os.remove(key);
        }
        if let Err(e) = self.workspace.release(key) {
            trace!(path = %key.display(), error = %e, "Unit already released");
        }
        self.states
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        info!(
            path = %key.display(),
            reason,
            discarded_parse = entry.in_flight.is_some(),
            "Stopped watching file"
        );
        self.publish(key, MonitorEvent::Released);
    }

    fn set_state(&self, key: &Path, state: FileState) {
        self.states
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_path_buf(), state);
    }

    fn publish(&self, key: &Path, event: MonitorEvent) {
        let update = MonitorUpdate {
            path: key.to_path_buf(),
            event,
        };
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|tx| tx.send(update.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updates_serialize_flat() {
        let update = MonitorUpdate {
            path: PathBuf::from("/src/a.cpp"),
            event: MonitorEvent::Reloaded { generation: 3 },
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["path"], "/src/a.cpp");
        assert_eq!(json["event"], "reloaded");
        assert_eq!(json["generation"], 3);
    }

    fn quiet_monitor() -> (tempfile::TempDir, Monitor) {
        let dir = tempfile::TempDir::new().unwrap();
        let workspace = Arc::new(Workspace::new(crate::config::JanusConfig::default()).unwrap());
        let config = MonitorConfig {
            debounce_ms: 0,
            poll_interval_ms: 0,
            workers: 1,
            os_events: false,
        };
        (dir, Monitor::start(workspace, config).unwrap())
    }

    #[test]
    fn watch_then_unwatch_releases_the_unit() {
        let (dir, monitor) = quiet_monitor();
        let path = dir.path().join("w.cpp");
        std::fs::write(&path, "int x;").unwrap();

        let unit = monitor.watch(&path).unwrap();
        assert_eq!(monitor.state(&path), FileState::Loaded);
        assert_eq!(monitor.watched(), vec![normalize_path(&path)]);
        // watching twice hands back the same unit
        assert!(Arc::ptr_eq(&unit, &monitor.watch(&path).unwrap()));

        let updates = monitor.subscribe();
        monitor.unwatch(&path).unwrap();
        assert_eq!(monitor.state(&path), FileState::Unwatched);
        assert!(unit.is_released());
        assert_eq!(
            updates.recv_timeout(Duration::from_secs(5)).unwrap().event,
            MonitorEvent::Released
        );
    }

    #[test]
    fn unwatching_an_unknown_file_fails() {
        let (dir, monitor) = quiet_monitor();
        let path = dir.path().join("never.cpp");
        assert!(matches!(
            monitor.unwatch(&path),
            Err(Error::UnknownFile { .. })
        ));
    }

    #[test]
    fn touch_without_edit_keeps_the_generation() {
        let (dir, monitor) = quiet_monitor();
        let path = dir.path().join("t.cpp");
        std::fs::write(&path, "int x;").unwrap();
        let unit = monitor.watch(&path).unwrap();
        let updates = monitor.subscribe();

        std::fs::write(&path, "int x;").unwrap();
        monitor.notify_changed(&path).unwrap();
        assert!(updates.recv_timeout(Duration::from_millis(300)).is_err());
        assert_eq!(unit.generation(), 1);
        assert_eq!(monitor.state(&path), FileState::Loaded);
    }

    #[test]
    fn edit_publishes_next_generation() {
        let (dir, monitor) = quiet_monitor();
        let path = dir.path().join("e.cpp");
        std::fs::write(&path, "int x;").unwrap();
        let unit = monitor.watch(&path).unwrap();
        let updates = monitor.subscribe();

        std::fs::write(&path, "int x;\nint y;").unwrap();
        monitor.notify_changed(&path).unwrap();
        let update = updates.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(update.event, MonitorEvent::Reloaded { generation: 2 });
        assert_eq!(unit.generation(), 2);
        assert_eq!(unit.snapshot().unwrap().variables().len(), 2);
    }

    #[test]
    fn stopped_monitor_rejects_commands() {
        let (dir, mut monitor) = quiet_monitor();
        monitor.stop().unwrap();
        assert!(matches!(
            monitor.notify_changed(&dir.path().join("x.cpp")),
            Err(Error::MonitorStopped)
        ));
    }

    fn os_events_monitor(poll_interval_ms: u64) -> (tempfile::TempDir, Monitor) {
        let dir = tempfile::TempDir::new().unwrap();
        let workspace = Arc::new(Workspace::new(crate::config::JanusConfig::default()).unwrap());
        let config = MonitorConfig {
            debounce_ms: 0,
            poll_interval_ms,
            workers: 1,
            os_events: true,
        };
        (dir, Monitor::start(workspace, config).unwrap())
    }

    /// Register a path whose directory does not exist, so the OS watch fails.
    fn register_unwatchable(dir: &tempfile::TempDir, monitor: &Monitor) -> (PathBuf, Result<()>) {
        let real = dir.path().join("real.cpp");
        std::fs::write(&real, "int x;").unwrap();
        let unit = monitor.workspace().load(&real).unwrap();
        let fingerprint = unit.snapshot().unwrap().fingerprint;
        let key = normalize_path(&dir.path().join("missing").join("gone.cpp"));
        let outcome = monitor.register(key.clone(), unit.id(), fingerprint);
        (key, outcome)
    }

    #[test]
    fn watch_failure_without_polling_is_an_error() {
        let (dir, monitor) = os_events_monitor(0);
        let (key, outcome) = register_unwatchable(&dir, &monitor);

        match outcome {
            Err(Error::Watch(e)) => assert_eq!(e.path, key),
            other => panic!("expected a watch error, got {other:?}"),
        }
        assert_eq!(monitor.state(&key), FileState::Unwatched);
        assert!(monitor.watched().is_empty());
    }

    #[test]
    fn watch_failure_with_polling_falls_back() {
        let (dir, monitor) = os_events_monitor(1_000);
        let updates = monitor.subscribe();
        let (key, outcome) = register_unwatchable(&dir, &monitor);

        outcome.unwrap();
        assert_eq!(monitor.state(&key), FileState::Loaded);
        let update = updates.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(update.path, key);
        assert!(matches!(update.event, MonitorEvent::WatchFailed { .. }));
    }

    #[test]
    fn file_state_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(FileState::Unwatched).unwrap(),
            "unwatched"
        );
    }
}
