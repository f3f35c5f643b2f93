//! ASCII adapters for programs that speak text.
//!
//! Many Intcode programs print prompts and maps one character per output and
//! read commands one character per input. [`AsciiPrinter`] and [`AsciiConsole`]
//! bridge those programs to ordinary readers and writers.

use crate::virtual_machine::io::{InputSource, OutputSink};
use crate::virtual_machine::word::Word;
use crate::warn;
use std::io::{BufRead, Write};

/// Writes values in `0..=128` as characters and anything else as a decimal
/// number on its own line.
pub struct AsciiPrinter<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> AsciiPrinter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> OutputSink for AsciiPrinter<W> {
    fn process(&mut self, value: Word) {
        let byte = value.as_i64().and_then(|v| u8::try_from(v).ok());
        let written = match byte {
            Some(byte) if byte <= 128 => write!(self.out, "{}", char::from(byte)),
            _ => writeln!(self.out, "{value}"),
        };
        if let Err(e) = written.and_then(|_| self.out.flush()) {
            warn!("ascii output dropped: {e}");
        }
    }
}

/// Reads one line per poll and feeds its bytes, plus a trailing newline, as input.
pub struct AsciiConsole<R: BufRead + Send> {
    reader: R,
    prompt: bool,
}

impl<R: BufRead + Send> AsciiConsole<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            prompt: false,
        }
    }

    /// Prints `> ` on stderr before each read.
    pub fn with_prompt(mut self) -> Self {
        self.prompt = true;
        self
    }
}

impl<R: BufRead + Send> InputSource for AsciiConsole<R> {
    fn send(&mut self) -> Vec<Word> {
        if self.prompt {
            eprint!("> ");
        }
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => Vec::new(),
            Ok(_) => {
                let command = line.trim_end_matches(['\r', '\n']);
                command
                    .bytes()
                    .chain(std::iter::once(b'\n'))
                    .map(|byte| Word::from(i64::from(byte)))
                    .collect()
            }
            Err(e) => {
                warn!("ascii input unavailable: {e}");
                Vec::new()
            }
        }
    }
}
