//! Polling file monitor
//!
//! Walks the documentation sources on a fixed interval and reports source
//! files that appeared or changed since the previous walk.

use galley_config::GalleyConfig;
use galley_output_parser::{FileChange, OutputSender};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, SystemTime};
use walkdir::{DirEntry, WalkDir};

/// Tracks modification times of the source files below a directory
#[derive(Debug)]
pub struct FileMonitor {
    root: PathBuf,
    config: GalleyConfig,
    modification_times: HashMap<PathBuf, SystemTime>,
}

impl FileMonitor {
    pub fn new(root: PathBuf, config: &GalleyConfig) -> Self {
        Self {
            root,
            config: config.clone(),
            modification_times: HashMap::new(),
        }
    }

    /// Walk the tree and return what changed since the last scan
    ///
    /// The first scan reports every source file as new.
    pub fn scan(&mut self) -> FileChange {
        let mut change = FileChange::default();
        let mut seen = HashMap::with_capacity(self.modification_times.len());

        let walker = WalkDir::new(&self.root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !self.is_pruned(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.config.is_source_file(entry.path()) {
                continue;
            }

            let modified = entry
                .metadata()
                .map_err(io::Error::from)
                .and_then(|m| m.modified());
            let modified = match modified {
                Ok(modified) => modified,
                Err(e) => {
                    log::debug!("No modification time for {}: {}", entry.path().display(), e);
                    continue;
                }
            };

            let path = entry.into_path();
            match self.modification_times.get(&path) {
                None => change.new.push(path.clone()),
                Some(previous) if *previous < modified => change.modified.push(path.clone()),
                Some(_) => {}
            }
            seen.insert(path, modified);
        }

        // Forget deleted files so they count as new if they come back
        self.modification_times = seen;
        change
    }

    fn is_pruned(&self, entry: &DirEntry) -> bool {
        if !entry.file_type().is_dir() {
            return false;
        }
        let Some(name) = entry.file_name().to_str() else {
            return true;
        };
        name.starts_with('_')
            || name.ends_with(".egg-info")
            || self.config.ignored_dirs.iter().any(|ignored| ignored == name)
    }
}

/// Spawn the file monitor thread
///
/// The initial scan only records the current state. After that the tree is
/// scanned every `interval` and a [`FileChange`] is sent whenever something
/// changed. The thread stops when `stop_rx` receives a message or its sender
/// is dropped, or when the output queue is gone.
pub fn spawn_file_monitor(
    mut monitor: FileMonitor,
    interval: Duration,
    stop_rx: Receiver<()>,
    output: OutputSender,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let initial = monitor.scan();
        log::info!(
            "File monitor watching {} source files in {}",
            initial.new.len(),
            monitor.root.display()
        );

        loop {
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    log::info!("File monitor received shutdown signal");
                    break;
                }
            }

            let change = monitor.scan();
            if change.is_empty() {
                continue;
            }
            log::debug!(
                "File monitor found {} new and {} modified files",
                change.new.len(),
                change.modified.len()
            );
            if !output.send(change) {
                break;
            }
        }

        log::info!("File monitor stopped");
    })
}
