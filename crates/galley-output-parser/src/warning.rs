//! Warning stream classification
//!
//! The build tool reports warnings in two shapes:
//!
//! - `WARNING: <message>` for warnings not tied to a source file
//! - `<filename>:<line or empty>:<category>:<message>` for everything else

use crate::ansi::{AnsiOutputHandler, Emit};
use crate::queue::OutputSender;
use crate::types::WarningEvent;
use std::num::ParseIntError;
use thiserror::Error;

/// Output handler for the build tool's warning stream
pub type WarningHandler = AnsiOutputHandler<WarningClassifier>;

const GLOBAL_PREFIX: &str = "WARNING: ";

/// Reasons a line does not have the shape of a file-scoped warning
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WarningParseError {
    #[error("expected at least 4 ':'-separated fields, found {0}")]
    MissingFields(usize),

    #[error("invalid line number {value:?}: {source}")]
    InvalidLineNumber {
        value: String,
        #[source]
        source: ParseIntError,
    },
}

/// Turns warning lines into [`WarningEvent`]s
///
/// Lines that match neither warning shape are still reported, as a global
/// warning carrying the whole line.
#[derive(Debug, Clone, Copy, Default)]
pub struct WarningClassifier;

impl Emit for WarningClassifier {
    fn emit(&mut self, message: String, queue: &OutputSender) {
        let line = message.trim();
        if line.is_empty() {
            return;
        }

        let warning = parse_warning(line).unwrap_or_else(|e| {
            log::debug!("Unstructured warning line ({}): {}", e, line);
            WarningEvent::global(line)
        });
        queue.send(warning);
    }
}

/// Parse a single, trimmed warning line
pub fn parse_warning(line: &str) -> Result<WarningEvent, WarningParseError> {
    if let Some(message) = line.strip_prefix(GLOBAL_PREFIX) {
        return Ok(WarningEvent::global(message));
    }

    let fields: Vec<&str> = line.split(':').collect();
    if fields.len() < 4 {
        return Err(WarningParseError::MissingFields(fields.len()));
    }

    let line_number = match fields[1].trim() {
        "" => None,
        value => Some(value.parse::<u32>().map_err(|source| {
            WarningParseError::InvalidLineNumber {
                value: value.to_string(),
                source,
            }
        })?),
    };

    Ok(WarningEvent {
        filename: Some(fields[0].to_string()),
        line_number,
        message: fields[3..].join(":").trim().to_string(),
    })
}
