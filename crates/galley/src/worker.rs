//! Background build worker
//!
//! The worker owns the documentation build. It blocks on the command queue,
//! runs the build tool as a subprocess for every build command and feeds the
//! subprocess output through the status and warning handlers, which push
//! classified events onto the output queue.
//!
//! Each output stream is pumped on its own scoped thread, so every handler is
//! owned by exactly one thread for its whole life.

use galley_config::GalleyConfig;
use galley_output_parser::{
    AnsiOutputHandler, BuildType, Emit, OutputEvent, OutputSender, StatusHandler, WarningHandler,
};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::Receiver;
use std::thread;

/// Commands accepted by the build worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerCommand {
    /// Re-read the configuration and start from a fresh build environment
    ReloadConfig,
    /// Rebuild every source file
    BuildAll,
    /// Rebuild the given source files
    BuildSpecific { filenames: Vec<PathBuf> },
    /// Stop the worker
    Quit,
}

/// Spawn the build worker thread
///
/// - `project_dir`: root of the documentation project
/// - `config`: initial configuration, replaced on `ReloadConfig`
/// - `command_rx`: receives commands; the worker stops on `Quit` or when every sender is gone
/// - `output`: where lifecycle and build output events go
pub fn spawn_build_worker(
    project_dir: PathBuf,
    config: GalleyConfig,
    command_rx: Receiver<WorkerCommand>,
    output: OutputSender,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut worker = BuildWorker::new(project_dir, config, output);
        worker.run(command_rx);
    })
}

struct BuildWorker {
    project_dir: PathBuf,
    config: GalleyConfig,
    output: OutputSender,
    /// Discard the saved build environment on the next build
    fresh_env: bool,
}

impl BuildWorker {
    fn new(project_dir: PathBuf, config: GalleyConfig, output: OutputSender) -> Self {
        Self {
            project_dir,
            config,
            output,
            fresh_env: false,
        }
    }

    fn run(&mut self, command_rx: Receiver<WorkerCommand>) {
        log::info!("Build worker started for {}", self.project_dir.display());
        self.announce_initialization();

        while let Ok(command) = command_rx.recv() {
            log::debug!("Build worker received {:?}", command);
            match command {
                WorkerCommand::Quit => {
                    log::info!("Build worker received shutdown signal");
                    break;
                }
                WorkerCommand::ReloadConfig => {
                    self.config = GalleyConfig::load(&self.project_dir);
                    self.fresh_env = true;
                    self.announce_initialization();
                }
                WorkerCommand::BuildAll => {
                    self.output.send(OutputEvent::BuildStart {
                        build_type: BuildType::All,
                    });
                    let success = self.build(None);
                    self.output.send(OutputEvent::BuildEnd {
                        filenames: None,
                        success,
                    });
                }
                WorkerCommand::BuildSpecific { filenames } => {
                    self.output.send(OutputEvent::BuildStart {
                        build_type: BuildType::Specific,
                    });
                    let success = self.build(Some(&filenames));
                    self.output.send(OutputEvent::BuildEnd {
                        filenames: Some(filenames),
                        success,
                    });
                }
            }
        }

        log::info!("Build worker stopped");
    }

    fn announce_initialization(&self) {
        self.output.send(OutputEvent::InitializationStart);
        self.output.send(OutputEvent::InitializationEnd {
            source_suffixes: self.config.source_suffixes.clone(),
        });
    }

    /// Run one build and return whether it succeeded
    fn build(&mut self, filenames: Option<&[PathBuf]>) -> bool {
        let Some(mut command) = build_command(
            &self.config,
            &self.project_dir,
            filenames,
            self.fresh_env,
        ) else {
            log::error!("No build command configured");
            return false;
        };
        self.fresh_env = false;

        log::info!("Running {:?}", command);
        let mut child = match command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                log::error!("Failed to start {}: {}", self.config.sphinx_command, e);
                return false;
            }
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        thread::scope(|scope| {
            if let Some(stdout) = stdout {
                let handler = StatusHandler::new(self.output.clone());
                scope.spawn(move || pump(stdout, handler, "stdout"));
            }
            if let Some(stderr) = stderr {
                let handler = WarningHandler::new(self.output.clone());
                scope.spawn(move || pump(stderr, handler, "stderr"));
            }
        });

        match child.wait() {
            Ok(status) => {
                log::info!("Build finished with {}", status);
                status.success()
            }
            Err(e) => {
                log::error!("Failed to wait for build process: {}", e);
                false
            }
        }
    }
}

/// Assemble the build tool invocation
///
/// `sphinx_command` may carry leading arguments, e.g. `python -m sphinx`.
/// Returns None if it is blank.
fn build_command(
    config: &GalleyConfig,
    project_dir: &Path,
    filenames: Option<&[PathBuf]>,
    fresh_env: bool,
) -> Option<Command> {
    let mut words = config.sphinx_command.split_whitespace();
    let mut command = Command::new(words.next()?);
    command.args(words);

    // Keep colors on; the output handlers strip them
    command.arg("--color");
    command.arg("-b").arg(&config.builder);
    if fresh_env {
        command.arg("-E");
    }
    if filenames.is_none() {
        command.arg("-a");
    }
    command
        .arg(config.source_path(project_dir))
        .arg(config.output_path(project_dir));
    if let Some(filenames) = filenames {
        command.args(filenames);
    }
    command.current_dir(project_dir);

    Some(command)
}

/// Copy a subprocess pipe into an output handler until end of stream
fn pump<R: Read, E: Emit>(mut reader: R, mut handler: AnsiOutputHandler<E>, stream: &str) {
    if let Err(e) = io::copy(&mut reader, &mut handler) {
        log::warn!("Reading build {} failed: {}", stream, e);
    }
    handler.finish();
}

#[cfg(test)]
mod tests {
    use super::*;
    use galley_output_parser::{output_queue, StatusMessage};
    use pretty_assertions::assert_eq;
    use std::ffi::OsStr;
    use std::sync::mpsc;

    fn args(command: &Command) -> Vec<&OsStr> {
        command.get_args().collect()
    }

    #[test]
    fn test_build_all_command() {
        let config = GalleyConfig::default();
        let project = Path::new("/project");
        let command = build_command(&config, project, None, false).unwrap();

        assert_eq!(command.get_program(), "sphinx-build");
        let expected_source = project.join("docs");
        let expected_output = project.join("docs").join("_build").join("html");
        assert_eq!(
            args(&command),
            vec![
                OsStr::new("--color"),
                OsStr::new("-b"),
                OsStr::new("html"),
                OsStr::new("-a"),
                expected_source.as_os_str(),
                expected_output.as_os_str(),
            ]
        );
    }

    #[test]
    fn test_build_specific_command_with_fresh_env() {
        let config = GalleyConfig {
            sphinx_command: "python -m sphinx".to_string(),
            ..GalleyConfig::default()
        };
        let files = vec![PathBuf::from("/project/docs/index.rst")];
        let command = build_command(&config, Path::new("/project"), Some(&files), true).unwrap();

        assert_eq!(command.get_program(), "python");
        let args = args(&command);
        assert_eq!(&args[..2], &[OsStr::new("-m"), OsStr::new("sphinx")]);
        assert!(args.contains(&OsStr::new("-E")));
        assert!(!args.contains(&OsStr::new("-a")));
        assert_eq!(args.last(), Some(&OsStr::new("/project/docs/index.rst")));
    }

    #[test]
    fn test_blank_command() {
        let config = GalleyConfig {
            sphinx_command: "  ".to_string(),
            ..GalleyConfig::default()
        };
        assert!(build_command(&config, Path::new("/project"), None, false).is_none());
    }

    #[test]
    fn test_pump_flushes_trailing_line() {
        let (tx, rx) = output_queue();
        let reader: &[u8] = b"first\n\x1b[1msecond\x1b[0m";
        pump(reader, StatusHandler::new(tx), "stdout");

        assert_eq!(
            rx.drain().unwrap(),
            vec![
                OutputEvent::Status(StatusMessage::new("first")),
                OutputEvent::Status(StatusMessage::new("second")),
            ]
        );
    }

    #[test]
    fn test_worker_lifecycle_with_missing_executable() {
        let dir = tempfile::tempdir().unwrap();
        let config = GalleyConfig {
            sphinx_command: "galley-test-no-such-sphinx-build".to_string(),
            ..GalleyConfig::default()
        };
        let (tx, rx) = output_queue();
        let (command_tx, command_rx) = mpsc::channel();

        let handle = spawn_build_worker(dir.path().to_path_buf(), config, command_rx, tx);
        command_tx.send(WorkerCommand::BuildAll).unwrap();
        command_tx.send(WorkerCommand::Quit).unwrap();
        handle.join().unwrap();

        assert_eq!(
            rx.drain().unwrap(),
            vec![
                OutputEvent::InitializationStart,
                OutputEvent::InitializationEnd {
                    source_suffixes: vec![".rst".to_string(), ".txt".to_string()],
                },
                OutputEvent::BuildStart {
                    build_type: BuildType::All,
                },
                OutputEvent::BuildEnd {
                    filenames: None,
                    success: false,
                },
            ]
        );
    }
}
