//! Console consumer of the output queue
//!
//! Renders every [`OutputEvent`] as a line of text and turns file changes
//! into rebuild commands for the build worker.

use crate::worker::WorkerCommand;
use galley_output_parser::{BuildType, OutputEvent, ProgressUpdate, WarningEvent};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

pub struct Console<W: Write> {
    out: W,
    base_path: PathBuf,
    command_tx: Sender<WorkerCommand>,
    rebuild_on_change: bool,
    /// Warnings seen since the current build started
    warning_count: usize,
}

impl<W: Write> Console<W> {
    pub fn new(
        out: W,
        base_path: PathBuf,
        command_tx: Sender<WorkerCommand>,
        rebuild_on_change: bool,
    ) -> Self {
        Self {
            out,
            base_path,
            command_tx,
            rebuild_on_change,
            warning_count: 0,
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn handle(&mut self, event: OutputEvent) -> io::Result<()> {
        match event {
            OutputEvent::Status(status) => writeln!(self.out, "{}", status.message),
            OutputEvent::Progress(progress) => self.render_progress(&progress),
            OutputEvent::Warning(warning) => {
                self.warning_count += 1;
                self.render_warning(&warning)
            }
            OutputEvent::FileChange(change) => {
                for path in change.paths() {
                    writeln!(self.out, "changed: {}", display_path(&self.base_path, path))?;
                }
                if self.rebuild_on_change && !change.is_empty() {
                    let filenames = change.paths().cloned().collect();
                    if self
                        .command_tx
                        .send(WorkerCommand::BuildSpecific { filenames })
                        .is_err()
                    {
                        log::warn!("Build worker is gone, not rebuilding changed files");
                    }
                }
                Ok(())
            }
            OutputEvent::InitializationStart => writeln!(self.out, "Initializing builder..."),
            OutputEvent::InitializationEnd { source_suffixes } => writeln!(
                self.out,
                "Builder ready, watching {}",
                source_suffixes.join(", ")
            ),
            OutputEvent::BuildStart { build_type } => {
                self.warning_count = 0;
                match build_type {
                    BuildType::All => writeln!(self.out, "Building all files..."),
                    BuildType::Specific => writeln!(self.out, "Building changed files..."),
                }
            }
            OutputEvent::BuildEnd { filenames, success } => {
                let outcome = if success { "succeeded" } else { "failed" };
                let scope = match filenames {
                    Some(filenames) => format!("{} file(s)", filenames.len()),
                    None => "all files".to_string(),
                };
                writeln!(
                    self.out,
                    "Build of {} {}, {} warning(s)",
                    scope, outcome, self.warning_count
                )
            }
        }
    }

    fn render_progress(&mut self, progress: &ProgressUpdate) -> io::Result<()> {
        match &progress.context {
            Some(context) => writeln!(
                self.out,
                "[{:>3}%] {}: {}",
                progress.percent,
                progress.stage,
                display_path(&self.base_path, Path::new(context))
            ),
            None => writeln!(self.out, "[{:>3}%] {}", progress.percent, progress.stage),
        }
    }

    fn render_warning(&mut self, warning: &WarningEvent) -> io::Result<()> {
        let location = match (&warning.filename, warning.line_number) {
            (Some(filename), Some(line)) => {
                format!("{}:{}: ", display_path(&self.base_path, Path::new(filename)), line)
            }
            (Some(filename), None) => {
                format!("{}: ", display_path(&self.base_path, Path::new(filename)))
            }
            (None, _) => String::new(),
        };
        writeln!(self.out, "warning: {}{}", location, warning.message)
    }
}

/// Show `path` relative to `base_path` when it lies inside it
///
/// The prefix only matches on whole path components, so `/a/bc` is not
/// considered to be inside `/a/b`.
pub fn display_path(base_path: &Path, path: &Path) -> String {
    path.strip_prefix(base_path)
        .unwrap_or(path)
        .display()
        .to_string()
}
