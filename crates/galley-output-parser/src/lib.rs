//! Documentation build output parser
//!
//! Turns the raw console output of a documentation build (Sphinx style,
//! possibly colored with ANSI escapes) into typed events: status lines,
//! progress updates and warnings. Events are pushed onto an output queue that
//! other producers, like a file monitor, can share.
//!
//! # Example
//!
//! ```
//! use galley_output_parser::{output_queue, OutputEvent, StatusHandler, WarningHandler};
//!
//! let (tx, rx) = output_queue();
//! let mut status = StatusHandler::new(tx.clone());
//! let mut warnings = WarningHandler::new(tx);
//!
//! status.write("writing output... [ 50%] \x1b[32mindex\x1b[0m\n");
//! warnings.write("/docs/index.rst:3: WARNING: duplicate label\n");
//!
//! for event in rx.drain()? {
//!     match event {
//!         OutputEvent::Progress(progress) => assert_eq!(progress.percent, 50),
//!         OutputEvent::Warning(warning) => assert_eq!(warning.line_number, Some(3)),
//!         _ => {}
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod ansi;
mod queue;
mod status;
mod types;
mod warning;

pub use ansi::{AnsiOutputHandler, Emit, Passthrough};
pub use queue::{OutputReceiver, OutputSender, QueueClosed, output_queue};
pub use status::{
    PendingTask, StatusClassifier, StatusHandler, parse_percent_progress, parse_simple_task,
};
pub use types::*;
pub use warning::{WarningClassifier, WarningHandler, WarningParseError, parse_warning};
