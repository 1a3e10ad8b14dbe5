//! `janus watch` command implementation.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize;
use crossbeam_channel::select;
use janus::{Monitor, MonitorEvent};

use super::Options;

/// Run the watch command until stdin reaches end of file.
pub fn run(options: &Options, files: &[PathBuf]) -> Result<(), janus::Error> {
    let config = options.resolve()?;
    let monitor_config = config.monitor.clone();
    let workspace = Arc::new(janus::Workspace::new(config)?);
    let monitor = Monitor::start(workspace, monitor_config)?;
    let updates = monitor.subscribe();

    for file in files {
        match monitor.watch(file) {
            Ok(unit) => println!(
                "{} {} (generation {})",
                "Watching".cyan().bold(),
                unit.path().display(),
                unit.generation()
            ),
            Err(e) => eprintln!("{}: {e}", "error".red().bold()),
        }
    }
    if monitor.watched().is_empty() {
        return Err(janus::Error::Config("no file could be watched".to_string()));
    }
    println!("{}", "Press Ctrl-D to stop".dimmed());

    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
    std::thread::spawn(move || {
        let mut sink = Vec::new();
        let _ = std::io::stdin().read_to_end(&mut sink);
        let _ = stop_tx.send(());
    });

    loop {
        select! {
            recv(updates) -> update => {
                let Ok(update) = update else { break };
                let path = update.path.display();
                match update.event {
                    MonitorEvent::Reloaded { generation } => {
                        println!("{} {path} -> generation {generation}", "Reloaded".green().bold());
                    }
                    MonitorEvent::ReloadFailed { message } => {
                        println!("{} {path}: {message}", "Failed".red().bold());
                    }
                    MonitorEvent::Released => {
                        println!("{} {path}", "Released".yellow().bold());
                    }
                    MonitorEvent::WatchFailed { message } => {
                        println!("{} {path}: {message} (polling)", "Watch failed".yellow());
                    }
                }
                if monitor.watched().is_empty() {
                    println!("{}", "No files left to watch".dimmed());
                    break;
                }
            }
            recv(stop_rx) -> _ => break,
        }
    }

    monitor.shutdown()
}
