use anyhow::{Context, Result};
use galley_config::GalleyConfig;
use galley_output_parser::{output_queue, OutputReceiver};
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

mod console;
mod input;
mod logger;
mod monitor;
mod worker;

use console::Console;
use monitor::FileMonitor;
use worker::WorkerCommand;

fn main() -> Result<()> {
    let log_file = logger::init()?;
    log::info!("Starting galley, logging to {}", log_file.display());

    // The only argument is the project directory
    let project_dir = match std::env::args_os().nth(1) {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let project_dir = project_dir
        .canonicalize()
        .with_context(|| format!("Project directory {} not found", project_dir.display()))?;
    let config = GalleyConfig::load(&project_dir);

    let (output_tx, output_rx) = output_queue();
    let (command_tx, command_rx) = mpsc::channel();
    let (stop_tx, stop_rx) = mpsc::channel();

    let worker = worker::spawn_build_worker(
        project_dir.clone(),
        config.clone(),
        command_rx,
        output_tx.clone(),
    );
    let monitor = monitor::spawn_file_monitor(
        FileMonitor::new(config.source_path(&project_dir), &config),
        config.poll_interval(),
        stop_rx,
        output_tx,
    );
    command_tx
        .send(WorkerCommand::BuildAll)
        .context("Build worker stopped before the first build")?;
    // Blocks on stdin for the rest of the session, never joined
    input::spawn_input_reader(command_tx.clone());

    let mut console = Console::new(
        std::io::stdout(),
        project_dir,
        command_tx.clone(),
        config.rebuild_on_change,
    );
    let result = run_console(&mut console, &output_rx, config.drain_interval(), || {
        worker.is_finished()
    });

    shutdown(&command_tx, &stop_tx, worker, monitor);

    log::info!("Exiting galley");
    result
}

/// Stop the build worker and the file monitor and wait for both
///
/// Safe to call whether or not the worker already quit on its own.
fn shutdown(
    command_tx: &Sender<WorkerCommand>,
    stop_tx: &Sender<()>,
    worker: JoinHandle<()>,
    monitor: JoinHandle<()>,
) {
    if command_tx.send(WorkerCommand::Quit).is_err() {
        log::debug!("Build worker already stopped");
    }
    if stop_tx.send(()).is_err() {
        log::debug!("File monitor already stopped");
    }
    for (name, handle) in [("build worker", worker), ("file monitor", monitor)] {
        if handle.join().is_err() {
            log::error!("The {} thread panicked", name);
        }
    }
}

/// Drain the output queue every `interval` until the worker has finished
fn run_console<W: std::io::Write>(
    console: &mut Console<W>,
    output_rx: &OutputReceiver,
    interval: Duration,
    worker_finished: impl Fn() -> bool,
) -> Result<()> {
    loop {
        // Check before draining so nothing the worker sent last is lost
        let finished = worker_finished();

        let Ok(events) = output_rx.drain() else {
            break;
        };
        for event in events {
            console.handle(event).context("Failed to write to console")?;
        }

        if finished {
            break;
        }
        thread::sleep(interval);
    }

    Ok(())
}
