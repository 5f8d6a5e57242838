//! Status stream classification
//!
//! Recognizes the two progress grammars of the build tool's status output:
//!
//! - simple tasks: `dumping object inventory...` announces a task, and the
//!   next line of output (whatever it says) completes it;
//! - percent tasks: `writing output... [ 42%] index` reports a step.

use crate::ansi::{AnsiOutputHandler, Emit};
use crate::queue::OutputSender;
use crate::types::{ProgressUpdate, StatusMessage};
use regex::Regex;
use std::sync::OnceLock;

/// Output handler for the build tool's status stream
pub type StatusHandler = AnsiOutputHandler<StatusClassifier>;

/// Whether a simple task is waiting for its completion line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PendingTask {
    #[default]
    Idle,
    AwaitingCompletion {
        task_name: String,
    },
}

/// Turns status lines into [`StatusMessage`]s and [`ProgressUpdate`]s
#[derive(Debug, Default)]
pub struct StatusClassifier {
    pending: PendingTask,
}

impl StatusClassifier {
    pub fn pending(&self) -> &PendingTask {
        &self.pending
    }

    fn classify(&mut self, line: &str, queue: &OutputSender) {
        // Any output completes an announced simple task
        if let PendingTask::AwaitingCompletion { task_name } = std::mem::take(&mut self.pending) {
            log::trace!("Simple task completed: {}", task_name);
            queue.send(ProgressUpdate::completed(task_name));
            return;
        }

        if let Some(progress) = parse_percent_progress(line) {
            queue.send(progress);
        } else if let Some(task_name) = parse_simple_task(line) {
            log::trace!("Simple task started: {}", task_name);
            self.pending = PendingTask::AwaitingCompletion {
                task_name: task_name.to_string(),
            };
        }
    }
}

impl Emit for StatusClassifier {
    fn emit(&mut self, message: String, queue: &OutputSender) {
        let line = message.trim();
        if line.is_empty() {
            return;
        }

        queue.send(StatusMessage::new(line));
        self.classify(line, queue);
    }
}

/// Match `<name>...` and return the task name
pub fn parse_simple_task(line: &str) -> Option<&str> {
    static SIMPLE_PROGRESS_REGEX: OnceLock<Regex> = OnceLock::new();

    let re = SIMPLE_PROGRESS_REGEX.get_or_init(|| Regex::new(r"^(.+)\.\.\.$").unwrap());

    re.captures(line)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}

/// Match `<name>... [<3-wide percent>%] <context>`
///
/// Percentages above 100 are not progress lines.
pub fn parse_percent_progress(line: &str) -> Option<ProgressUpdate> {
    static PERCENT_PROGRESS_REGEX: OnceLock<Regex> = OnceLock::new();

    let re = PERCENT_PROGRESS_REGEX
        .get_or_init(|| Regex::new(r"^([\w\s]+)\.\.\. \[([\s\d]{3})%\] (.+)").unwrap());

    let captures = re.captures(line)?;
    let stage = captures.get(1)?.as_str();
    let percent: u8 = captures.get(2)?.as_str().trim().parse().ok()?;
    let context = captures.get(3)?.as_str();

    (percent <= 100).then(|| ProgressUpdate {
        stage: stage.to_string(),
        percent,
        context: Some(context.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{OutputReceiver, output_queue};
    use crate::types::OutputEvent;
    use pretty_assertions::assert_eq;

    fn handler() -> (StatusHandler, OutputReceiver) {
        let (tx, rx) = output_queue();
        (StatusHandler::new(tx), rx)
    }

    fn status(message: &str) -> OutputEvent {
        OutputEvent::Status(StatusMessage::new(message))
    }

    fn progress(stage: &str, percent: u8, context: Option<&str>) -> OutputEvent {
        OutputEvent::Progress(ProgressUpdate {
            stage: stage.to_string(),
            percent,
            context: context.map(str::to_string),
        })
    }

    #[test]
    fn test_simple_message() {
        let (mut handler, rx) = handler();
        handler.write("hello world");
        handler.flush();
        assert_eq!(rx.drain().unwrap(), vec![status("hello world")]);
    }

    #[test]
    fn test_strip_whitespace_and_blank_lines() {
        let (mut handler, rx) = handler();
        handler.write("  prefix\nsuffix  \n   \n\n  both   ");
        handler.flush();
        assert_eq!(
            rx.drain().unwrap(),
            vec![status("prefix"), status("suffix"), status("both")]
        );
    }

    #[test]
    fn test_simple_progress() {
        let (mut handler, rx) = handler();

        handler.write("dumping object inventory...");
        handler.flush();
        assert_eq!(rx.drain().unwrap(), vec![status("dumping object inventory...")]);
        assert_eq!(
            handler.emitter().pending(),
            &PendingTask::AwaitingCompletion {
                task_name: "dumping object inventory".to_string()
            }
        );

        handler.write("done");
        handler.flush();
        assert_eq!(
            rx.drain().unwrap(),
            vec![
                status("done"),
                progress("dumping object inventory", 100, None),
            ]
        );
        assert_eq!(handler.emitter().pending(), &PendingTask::Idle);

        handler.write("More stuff done.");
        handler.flush();
        assert_eq!(rx.drain().unwrap(), vec![status("More stuff done.")]);
    }

    #[test]
    fn test_completion_line_is_not_classified() {
        let (mut handler, rx) = handler();
        handler.write("loading pickled environment...\nwriting output... [ 50%] index\n");
        assert_eq!(
            rx.drain().unwrap(),
            vec![
                status("loading pickled environment..."),
                status("writing output... [ 50%] index"),
                progress("loading pickled environment", 100, None),
            ]
        );
        assert_eq!(handler.emitter().pending(), &PendingTask::Idle);
    }

    #[test]
    fn test_percent_progress() {
        let (mut handler, rx) = handler();

        handler.write("copying downloadable files... [  2%] /path/to/file.sh");
        handler.flush();
        assert_eq!(
            rx.drain().unwrap(),
            vec![
                status("copying downloadable files... [  2%] /path/to/file.sh"),
                progress("copying downloadable files", 2, Some("/path/to/file.sh")),
            ]
        );

        handler.write("copying downloadable files... [ 80%] /path/to/file2.sh");
        handler.flush();
        assert_eq!(
            rx.drain().unwrap(),
            vec![
                status("copying downloadable files... [ 80%] /path/to/file2.sh"),
                progress("copying downloadable files", 80, Some("/path/to/file2.sh")),
            ]
        );

        handler.write("copying downloadable files... [100%] /path/to/file3.sh");
        handler.flush();
        assert_eq!(
            rx.drain().unwrap(),
            vec![
                status("copying downloadable files... [100%] /path/to/file3.sh"),
                progress("copying downloadable files", 100, Some("/path/to/file3.sh")),
            ]
        );
        assert_eq!(handler.emitter().pending(), &PendingTask::Idle);
    }

    #[test]
    fn test_percent_line_ending_in_dots_is_not_a_simple_task() {
        let (mut handler, rx) = handler();
        handler.write("reading sources... [ 10%] waiting...\n");
        assert_eq!(
            rx.drain().unwrap(),
            vec![
                status("reading sources... [ 10%] waiting..."),
                progress("reading sources", 10, Some("waiting...")),
            ]
        );
        assert_eq!(handler.emitter().pending(), &PendingTask::Idle);
    }

    #[test]
    fn test_colored_progress_line() {
        let (mut handler, rx) = handler();
        handler.write("\x1b[01mwriting output... \x1b[39;49;00m[ 33%] \x1b[32mindex\x1b[39;49;00m\n");
        assert_eq!(
            rx.drain().unwrap(),
            vec![
                status("writing output... [ 33%] index"),
                progress("writing output", 33, Some("index")),
            ]
        );
    }

    #[test]
    fn test_parse_percent_progress_rejects_out_of_range() {
        assert_eq!(parse_percent_progress("stage... [999%] file"), None);
        assert_eq!(parse_percent_progress("stage... [ 5%] file"), None);
    }

    #[test]
    fn test_parse_simple_task() {
        assert_eq!(parse_simple_task("building [html]..."), Some("building [html]"));
        assert_eq!(parse_simple_task("building [html]... done"), None);
        assert_eq!(parse_simple_task("..."), None);
    }
}
