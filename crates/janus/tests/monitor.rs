//! Integration tests for the incremental monitor.
//!
//! A gated backend holds parses open on demand so coalescing and
//! deletion-during-parse can be observed deterministically.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use janus::{
    Error, FileState, JanusConfig, Monitor, MonitorConfig, MonitorEvent, MonitorUpdate,
    ParseBackend, ParseOutput, ParseRequest, TreeSitterBackend, Workspace,
};
use tempfile::TempDir;

const WAIT: Duration = Duration::from_secs(5);

/// Delegates to tree-sitter, counting calls and blocking while armed.
struct GatedBackend {
    calls: AtomicUsize,
    armed: AtomicBool,
    gate: Receiver<()>,
}

impl GatedBackend {
    fn new() -> (Arc<Self>, Sender<()>) {
        let (open, gate) = crossbeam_channel::unbounded();
        let backend = Arc::new(Self {
            calls: AtomicUsize::new(0),
            armed: AtomicBool::new(false),
            gate,
        });
        (backend, open)
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn wait_for_calls(&self, expected: usize) {
        let deadline = Instant::now() + WAIT;
        while self.calls() < expected {
            assert!(Instant::now() < deadline, "backend never reached {expected} calls");
            thread::sleep(Duration::from_millis(5));
        }
    }
}

impl ParseBackend for GatedBackend {
    fn name(&self) -> &str {
        "gated"
    }

    fn parse(&self, request: &ParseRequest<'_>) -> ParseOutput {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.armed.load(Ordering::SeqCst) {
            let _ = self.gate.recv_timeout(WAIT);
        }
        TreeSitterBackend.parse(request)
    }
}

fn quiet_config() -> MonitorConfig {
    MonitorConfig {
        debounce_ms: 20,
        poll_interval_ms: 0,
        workers: 2,
        os_events: false,
    }
}

fn start(backend: Arc<dyn ParseBackend>, config: MonitorConfig) -> Monitor {
    let workspace = Workspace::with_backend(JanusConfig::default(), backend)
        .expect("default config is valid");
    Monitor::start(Arc::new(workspace), config).expect("monitor should start")
}

fn next_update(updates: &Receiver<MonitorUpdate>) -> MonitorEvent {
    updates
        .recv_timeout(WAIT)
        .expect("expected a monitor update")
        .event
}

fn assert_quiet(updates: &Receiver<MonitorUpdate>) {
    if let Ok(update) = updates.recv_timeout(Duration::from_millis(300)) {
        panic!("unexpected update: {update:?}");
    }
}

fn write(path: &Path, content: &str) {
    fs::write(path, content).expect("should write file");
}

// === Coalescing ===

#[test]
fn edits_during_a_parse_collapse_into_one_follow_up() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("burst.cpp");
    write(&path, "int v1;\n");

    let (backend, open) = GatedBackend::new();
    let monitor = start(backend.clone(), quiet_config());
    let unit = monitor.watch(&path).unwrap();
    assert_eq!(backend.calls(), 1);
    let updates = monitor.subscribe();

    backend.armed.store(true, Ordering::SeqCst);
    write(&path, "int v2;\n");
    monitor.notify_changed(&path).unwrap();
    backend.wait_for_calls(2);
    assert_eq!(monitor.state(&path), FileState::Stale);

    for i in 3..=6 {
        write(&path, &format!("int v{i};\n"));
        monitor.notify_changed(&path).unwrap();
    }
    // let the debounce window close while the first parse is still held
    thread::sleep(Duration::from_millis(150));
    assert_eq!(backend.calls(), 2, "no second parse while one is in flight");

    backend.armed.store(false, Ordering::SeqCst);
    open.send(()).unwrap();

    assert_eq!(next_update(&updates), MonitorEvent::Reloaded { generation: 2 });
    assert_eq!(next_update(&updates), MonitorEvent::Reloaded { generation: 3 });
    assert_quiet(&updates);

    assert_eq!(backend.calls(), 3);
    assert_eq!(monitor.state(&path), FileState::Loaded);
    let snapshot = unit.snapshot().unwrap();
    assert_eq!(snapshot.generation, 3);
    assert_eq!(snapshot.variables()[0].spelling(), "v6");
}

#[test]
fn polling_does_not_repeat_a_follow_up_already_running() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("polled.cpp");
    write(&path, "int v1;\n");

    let (backend, open) = GatedBackend::new();
    let config = MonitorConfig {
        poll_interval_ms: 20,
        ..quiet_config()
    };
    let monitor = start(backend.clone(), config);
    let unit = monitor.watch(&path).unwrap();
    let updates = monitor.subscribe();

    backend.armed.store(true, Ordering::SeqCst);
    write(&path, "int v2;\n");
    monitor.notify_changed(&path).unwrap();
    backend.wait_for_calls(2);

    for i in 3..=6 {
        write(&path, &format!("int v{i};\n"));
        monitor.notify_changed(&path).unwrap();
    }
    thread::sleep(Duration::from_millis(150));
    assert_eq!(backend.calls(), 2);

    // release the first parse; the follow-up starts and is held in turn
    open.send(()).unwrap();
    backend.wait_for_calls(3);
    assert_eq!(next_update(&updates), MonitorEvent::Reloaded { generation: 2 });

    // several poll ticks pass over unchanged content while the follow-up runs
    thread::sleep(Duration::from_millis(200));
    assert_eq!(backend.calls(), 3, "polling must not schedule another follow-up");

    backend.armed.store(false, Ordering::SeqCst);
    open.send(()).unwrap();
    assert_eq!(next_update(&updates), MonitorEvent::Reloaded { generation: 3 });
    assert_quiet(&updates);

    assert_eq!(backend.calls(), 3);
    assert_eq!(unit.generation(), 3);
    assert_eq!(monitor.state(&path), FileState::Loaded);
}

#[test]
fn notifications_inside_the_window_cause_one_parse() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("window.cpp");
    write(&path, "int a;\n");

    let (backend, _open) = GatedBackend::new();
    let config = MonitorConfig {
        debounce_ms: 100,
        ..quiet_config()
    };
    let monitor = start(backend.clone(), config);
    monitor.watch(&path).unwrap();
    let updates = monitor.subscribe();

    write(&path, "int a;\nint b;\n");
    for _ in 0..10 {
        monitor.notify_changed(&path).unwrap();
    }

    assert_eq!(next_update(&updates), MonitorEvent::Reloaded { generation: 2 });
    assert_quiet(&updates);
    assert_eq!(backend.calls(), 2);
}

// === Deletion ===

#[test]
fn deletion_during_parse_discards_the_result() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("doomed.cpp");
    write(&path, "int x;\n");

    let (backend, open) = GatedBackend::new();
    let monitor = start(backend.clone(), quiet_config());
    let unit = monitor.watch(&path).unwrap();
    let updates = monitor.subscribe();

    backend.armed.store(true, Ordering::SeqCst);
    write(&path, "int x;\nint y;\n");
    monitor.notify_changed(&path).unwrap();
    backend.wait_for_calls(2);

    fs::remove_file(&path).unwrap();
    monitor.notify_removed(&path).unwrap();
    assert_eq!(next_update(&updates), MonitorEvent::Released);

    backend.armed.store(false, Ordering::SeqCst);
    open.send(()).unwrap();
    assert_quiet(&updates);

    assert_eq!(monitor.state(&path), FileState::Unwatched);
    assert!(monitor.watched().is_empty());
    assert!(matches!(unit.snapshot(), Err(Error::UnitReleased { .. })));
    assert!(monitor.workspace().unit(&path).is_err());
}

#[test]
fn polling_notices_a_deleted_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vanish.cpp");
    write(&path, "int x;\n");

    let config = MonitorConfig {
        poll_interval_ms: 20,
        ..quiet_config()
    };
    let monitor = start(Arc::new(TreeSitterBackend), config);
    let unit = monitor.watch(&path).unwrap();
    let updates = monitor.subscribe();

    fs::remove_file(&path).unwrap();
    assert_eq!(next_update(&updates), MonitorEvent::Released);
    assert!(unit.is_released());
}

// === Failures ===

#[test]
fn failed_reparse_keeps_the_last_good_generation() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("flaky.cpp");
    write(&path, "int good;\n");

    let monitor = start(Arc::new(TreeSitterBackend), quiet_config());
    let unit = monitor.watch(&path).unwrap();
    let updates = monitor.subscribe();

    write(&path, "}}} ))) ]]]");
    monitor.notify_changed(&path).unwrap();
    assert!(matches!(
        next_update(&updates),
        MonitorEvent::ReloadFailed { .. }
    ));
    assert_eq!(monitor.state(&path), FileState::Stale);
    let snapshot = unit.snapshot().unwrap();
    assert_eq!(snapshot.generation, 1);
    assert_eq!(snapshot.variables()[0].spelling(), "good");

    write(&path, "int better;\n");
    monitor.notify_changed(&path).unwrap();
    assert_eq!(next_update(&updates), MonitorEvent::Reloaded { generation: 2 });
    assert_eq!(monitor.state(&path), FileState::Loaded);
}

#[test]
fn one_failing_file_does_not_stall_another() {
    let dir = TempDir::new().unwrap();
    let broken = dir.path().join("broken.cpp");
    let healthy = dir.path().join("healthy.cpp");
    write(&broken, "int a;\n");
    write(&healthy, "int b;\n");

    let monitor = start(Arc::new(TreeSitterBackend), quiet_config());
    monitor.watch(&broken).unwrap();
    let unit = monitor.watch(&healthy).unwrap();
    let updates = monitor.subscribe();

    write(&broken, "}}} ))) ]]]");
    write(&healthy, "int b;\nint c;\n");
    monitor.notify_changed(&broken).unwrap();
    monitor.notify_changed(&healthy).unwrap();

    let mut events: Vec<_> = (0..2).map(|_| updates.recv_timeout(WAIT).unwrap()).collect();
    events.sort_by(|a, b| a.path.cmp(&b.path));
    assert!(matches!(events[0].event, MonitorEvent::ReloadFailed { .. }));
    assert_eq!(events[1].event, MonitorEvent::Reloaded { generation: 2 });
    assert_eq!(unit.snapshot().unwrap().variables().len(), 2);
}

// === Change sources ===

#[test]
fn external_edit_is_picked_up_without_notification() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("external.cpp");
    write(&path, "int x;\n");

    let config = MonitorConfig {
        poll_interval_ms: 50,
        os_events: true,
        ..quiet_config()
    };
    let monitor = start(Arc::new(TreeSitterBackend), config);
    let unit = monitor.watch(&path).unwrap();
    let updates = monitor.subscribe();

    write(&path, "int x;\nint longer_name;\n");
    assert_eq!(next_update(&updates), MonitorEvent::Reloaded { generation: 2 });
    assert_eq!(unit.snapshot().unwrap().variables().len(), 2);
}

#[test]
fn shutdown_stops_the_monitor() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stop.cpp");
    write(&path, "int x;\n");

    let monitor = start(Arc::new(TreeSitterBackend), quiet_config());
    let unit = monitor.watch(&path).unwrap();
    monitor.shutdown().unwrap();

    // the unit outlives the monitor at its last generation
    assert_eq!(unit.snapshot().unwrap().generation, 1);
}
