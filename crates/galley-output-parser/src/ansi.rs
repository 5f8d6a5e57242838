//! Line buffering with ANSI escape stripping
//!
//! [`AnsiOutputHandler`] accepts build output in arbitrary chunks, drops
//! terminal escape sequences and hands every complete line to an [`Emit`]
//! implementation. What happens to a line is up to the emitter: the default
//! [`Passthrough`] forwards it as a [`StatusMessage`], the classifiers in
//! [`crate::status`] and [`crate::warning`] turn it into richer events.

use crate::queue::OutputSender;
use crate::types::StatusMessage;
use ansi_parser::{AnsiParser, Output};
use std::io;

const ESC: char = '\x1b';

/// Receives complete, escape-free lines from an [`AnsiOutputHandler`]
pub trait Emit {
    /// Handle one line. The line is not trimmed.
    fn emit(&mut self, message: String, queue: &OutputSender);
}

/// Forwards every line unmodified as a [`StatusMessage`]
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Emit for Passthrough {
    fn emit(&mut self, message: String, queue: &OutputSender) {
        queue.send(StatusMessage { message });
    }
}

/// A writable sink for build output that strips ANSI escapes and emits lines
///
/// Text is split on `\r` and `\n`; every terminator emits the line seen so
/// far, even when it is empty. Text after the last terminator stays pending
/// until more output arrives or [`flush`](Self::flush) is called.
///
/// An escape sequence must arrive within a single `write`. A sequence that is
/// cut off at the end of a chunk is skipped up to the end of that chunk, and
/// its remainder shows up as text in the next one.
///
/// A handler is not thread-safe; one thread owns it for its whole life.
#[derive(Debug)]
pub struct AnsiOutputHandler<E = Passthrough> {
    queue: OutputSender,
    emitter: E,
    /// Text segments of the current, unterminated line
    buffer: Vec<String>,
    /// Trailing bytes of an incomplete UTF-8 sequence from `io::Write`
    partial_utf8: Vec<u8>,
}

impl<E: Emit + Default> AnsiOutputHandler<E> {
    pub fn new(queue: OutputSender) -> Self {
        Self::with_emitter(queue, E::default())
    }
}

impl<E: Emit> AnsiOutputHandler<E> {
    pub fn with_emitter(queue: OutputSender, emitter: E) -> Self {
        Self {
            queue,
            emitter,
            buffer: Vec::new(),
            partial_utf8: Vec::new(),
        }
    }

    /// Borrow the emitter, e.g. to inspect classifier state
    pub fn emitter(&self) -> &E {
        &self.emitter
    }

    /// Feed a chunk of output
    pub fn write(&mut self, chunk: &str) {
        for block in chunk.ansi_parse() {
            match block {
                // Recognized escape sequences carry no text
                Output::Escape(_) => {}
                Output::TextBlock(text) => match text.strip_prefix(ESC) {
                    // An escape that ansi-parser did not recognize
                    Some(rest) => {
                        let rest = skip_escape(rest);
                        self.scan_text(rest);
                    }
                    None => self.scan_text(text),
                },
            }
        }
    }

    /// Emit the pending partial line, if there is one
    pub fn flush(&mut self) {
        if !self.buffer.is_empty() {
            self.emit_line();
        }
    }

    /// Flush everything at end of stream, including undecodable trailing bytes
    pub fn finish(&mut self) {
        if !self.partial_utf8.is_empty() {
            let tail = String::from_utf8_lossy(&self.partial_utf8).into_owned();
            self.partial_utf8.clear();
            self.write(&tail);
        }
        self.flush();
    }

    fn scan_text(&mut self, mut text: &str) {
        while let Some(pos) = text.find(|c: char| c == '\r' || c == '\n') {
            self.push(&text[..pos]);
            self.emit_line();
            text = &text[pos + 1..];
        }
        self.push(text);
    }

    fn push(&mut self, text: &str) {
        if !text.is_empty() {
            self.buffer.push(text.to_string());
        }
    }

    fn emit_line(&mut self) {
        let message = self.buffer.concat();
        self.buffer.clear();
        // Nobody is listening any more
        if self.queue.is_closed() {
            return;
        }
        self.emitter.emit(message, &self.queue);
    }
}

impl<E: Emit> io::Write for AnsiOutputHandler<E> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.partial_utf8.extend_from_slice(bytes);
        let text = take_utf8(&mut self.partial_utf8);
        AnsiOutputHandler::<E>::write(self, &text);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        AnsiOutputHandler::<E>::flush(self);
        Ok(())
    }
}

/// Skip the body of an escape sequence whose introducer was already consumed
///
/// Grammar: one mode byte, then parameter bytes, then a command byte in
/// `0x40..=0x7E`. Returns the text following the command byte, or an empty
/// string if the sequence is not terminated.
fn skip_escape(sequence: &str) -> &str {
    let mut chars = sequence.char_indices();

    // Mode selector, e.g. '['
    if chars.next().is_none() {
        return "";
    }

    for (pos, ch) in chars {
        if ('\x40'..='\x7e').contains(&ch) {
            return &sequence[pos + ch.len_utf8()..];
        }
    }

    ""
}

/// Decode as much of `bytes` as possible, leaving an incomplete trailing
/// UTF-8 sequence in place. Invalid bytes become U+FFFD.
fn take_utf8(bytes: &mut Vec<u8>) -> String {
    let mut text = String::new();
    loop {
        match std::str::from_utf8(bytes) {
            Ok(valid) => {
                text.push_str(valid);
                bytes.clear();
                return text;
            }
            Err(e) => {
                let valid_up_to = e.valid_up_to();
                text.push_str(&String::from_utf8_lossy(&bytes[..valid_up_to]));
                match e.error_len() {
                    Some(len) => {
                        text.push(char::REPLACEMENT_CHARACTER);
                        bytes.drain(..valid_up_to + len);
                    }
                    None => {
                        bytes.drain(..valid_up_to);
                        return text;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{OutputReceiver, output_queue};
    use crate::types::OutputEvent;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn handler() -> (AnsiOutputHandler, OutputReceiver) {
        let (tx, rx) = output_queue();
        (AnsiOutputHandler::new(tx), rx)
    }

    fn messages(rx: &OutputReceiver) -> Vec<String> {
        rx.drain()
            .unwrap()
            .into_iter()
            .map(|event| match event {
                OutputEvent::Status(status) => status.message,
                other => panic!("Expected status message, got {other:?}"),
            })
            .collect()
    }

    #[test]
    fn test_simple_string() {
        let (mut handler, rx) = handler();
        handler.write("hello world");
        assert!(messages(&rx).is_empty());

        handler.flush();
        assert_eq!(messages(&rx), vec!["hello world"]);
    }

    #[test]
    fn test_single_param_ansi_string() {
        let (mut handler, rx) = handler();
        handler.write("hello\x1b[1m world");
        handler.flush();
        assert_eq!(messages(&rx), vec!["hello world"]);
    }

    #[test]
    fn test_multi_param_ansi_string() {
        let (mut handler, rx) = handler();
        handler.write("hello\x1b[32;40m world");
        handler.flush();
        assert_eq!(messages(&rx), vec!["hello world"]);
    }

    #[test]
    fn test_escape_outside_ansi_parser_grammar() {
        // Six SGR parameters, more than ansi-parser accepts
        let (mut handler, rx) = handler();
        handler.write("hello\x1b[1;2;3;4;5;6m world\x1b[0m");
        handler.flush();
        assert_eq!(messages(&rx), vec!["hello world"]);
    }

    #[test]
    fn test_newline_flush() {
        let (mut handler, rx) = handler();
        handler.write("hello world\ngoodbye world\n");
        assert_eq!(messages(&rx), vec!["hello world", "goodbye world"]);
    }

    #[test]
    fn test_carriage_return_flush() {
        let (mut handler, rx) = handler();
        handler.write("hello world\rgoodbye world\r");
        assert_eq!(messages(&rx), vec!["hello world", "goodbye world"]);
    }

    #[test]
    fn test_line_split_across_writes() {
        let (mut handler, rx) = handler();
        handler.write("hello ");
        handler.write("\x1b[31mwor");
        handler.write("ld\x1b[39;49;00m\nnext");
        assert_eq!(messages(&rx), vec!["hello world"]);

        handler.flush();
        assert_eq!(messages(&rx), vec!["next"]);
    }

    #[test]
    fn test_flush_is_idempotent() {
        let (mut handler, rx) = handler();
        handler.write("pending");
        handler.flush();
        handler.flush();
        assert_eq!(messages(&rx), vec!["pending"]);
    }

    #[test]
    fn test_empty_write_and_escape_only_write() {
        let (mut handler, rx) = handler();
        handler.write("");
        handler.write("\x1b[1m");
        handler.flush();
        assert!(messages(&rx).is_empty());
    }

    #[test]
    fn test_blank_lines_pass_through() {
        let (mut handler, rx) = handler();
        handler.write("a\n\nb\n");
        assert_eq!(messages(&rx), vec!["a", "", "b"]);
    }

    #[test]
    fn test_unterminated_escape_is_dropped() {
        let (mut handler, rx) = handler();
        handler.write("text\x1b[12");
        handler.flush();
        assert_eq!(messages(&rx), vec!["text"]);
    }

    #[derive(Default)]
    struct CountingEmitter {
        lines: usize,
    }

    impl Emit for CountingEmitter {
        fn emit(&mut self, message: String, queue: &OutputSender) {
            self.lines += 1;
            queue.send(StatusMessage { message });
        }
    }

    #[test]
    fn test_stops_emitting_once_consumer_is_gone() {
        let (tx, rx) = output_queue();
        let mut handler: AnsiOutputHandler<CountingEmitter> = AnsiOutputHandler::new(tx);
        handler.write("first
");
        assert_eq!(messages(&rx), vec!["first"]);
        drop(rx);

        handler.write("second
third
fourth");
        handler.flush();

        // Only the line that discovered the closed queue reached the emitter
        assert_eq!(handler.emitter().lines, 2);
    }

    #[test]
    fn test_skip_escape() {
        assert_eq!(skip_escape("[1mrest"), "rest");
        assert_eq!(skip_escape("[32;40m"), "");
        assert_eq!(skip_escape("[12"), "");
        assert_eq!(skip_escape(""), "");
    }

    #[test]
    fn test_io_write_split_utf8() -> anyhow::Result<()> {
        let (mut handler, rx) = handler();
        let bytes = "caf\u{e9} ok\n".as_bytes();

        // Split inside the two-byte encoding of 'é'
        handler.write_all(&bytes[..4])?;
        handler.write_all(&bytes[4..])?;
        assert_eq!(messages(&rx), vec!["caf\u{e9} ok"]);
        Ok(())
    }

    #[test]
    fn test_io_write_invalid_utf8() -> anyhow::Result<()> {
        let (mut handler, rx) = handler();
        handler.write_all(b"bad \xff byte\n")?;
        assert_eq!(messages(&rx), vec!["bad \u{fffd} byte"]);
        Ok(())
    }

    #[test]
    fn test_finish_flushes_incomplete_utf8() -> anyhow::Result<()> {
        let (mut handler, rx) = handler();
        handler.write_all(b"tail \xc3")?;
        handler.finish();
        assert_eq!(messages(&rx), vec!["tail \u{fffd}"]);
        Ok(())
    }
}
