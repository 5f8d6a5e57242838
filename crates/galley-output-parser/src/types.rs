//! Type definitions for classified build output

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything that can travel over the output queue
///
/// The first three variants are produced by the output handlers in this crate.
/// The remaining ones come from the build worker and the file monitor, which
/// share the same queue and therefore the same ordering contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputEvent {
    /// A line of build output
    Status(StatusMessage),

    /// Completion of a simple task, or a step of a percent-reporting task
    Progress(ProgressUpdate),

    /// A diagnostic reported on the warning stream
    Warning(WarningEvent),

    /// Source files appeared or changed on disk
    FileChange(FileChange),

    /// The builder is being (re)configured
    InitializationStart,

    /// The builder is ready
    InitializationEnd {
        /// Source file suffixes the builder will pick up
        source_suffixes: Vec<String>,
    },

    /// A build was started
    BuildStart {
        /// Whether everything or a subset of files is built
        build_type: BuildType,
    },

    /// A build finished
    BuildEnd {
        /// The files that were rebuilt, `None` for a full build
        filenames: Option<Vec<PathBuf>>,
        /// Whether the build process exited successfully
        success: bool,
    },
}

/// A verbatim, escape-stripped line of build output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub message: String,
}

/// Progress of a named build stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Stage name as announced by the build tool, e.g. `writing output`
    pub stage: String,

    /// Completion percentage, 0-100
    pub percent: u8,

    /// What the stage is working on, usually a file path
    pub context: Option<String>,
}

/// A warning emitted by the build tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningEvent {
    /// Source file the warning refers to, `None` for global warnings
    pub filename: Option<String>,

    /// Line within `filename`, if the build tool reported one
    pub line_number: Option<u32>,

    /// The warning text
    pub message: String,
}

/// Files reported by one poll of the file monitor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub new: Vec<PathBuf>,
    pub modified: Vec<PathBuf>,
}

/// Scope of a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildType {
    /// Rebuild every source file
    All,
    /// Rebuild a given set of source files
    Specific,
}

impl StatusMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl ProgressUpdate {
    /// Create the 100% update that closes a simple task
    pub fn completed(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            percent: 100,
            context: None,
        }
    }
}

impl WarningEvent {
    /// Create a warning that is not tied to a source file
    pub fn global(message: impl Into<String>) -> Self {
        Self {
            filename: None,
            line_number: None,
            message: message.into(),
        }
    }
}

impl FileChange {
    /// Returns true if the poll found nothing
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.modified.is_empty()
    }

    /// All reported files, new ones first
    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.new.iter().chain(self.modified.iter())
    }
}

impl From<StatusMessage> for OutputEvent {
    fn from(value: StatusMessage) -> Self {
        OutputEvent::Status(value)
    }
}

impl From<ProgressUpdate> for OutputEvent {
    fn from(value: ProgressUpdate) -> Self {
        OutputEvent::Progress(value)
    }
}

impl From<WarningEvent> for OutputEvent {
    fn from(value: WarningEvent) -> Self {
        OutputEvent::Warning(value)
    }
}

impl From<FileChange> for OutputEvent {
    fn from(value: FileChange) -> Self {
        OutputEvent::FileChange(value)
    }
}
