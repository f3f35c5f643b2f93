//! Program records and program text loading.
//!
//! A [`Program`] is the complete, movable state of one Intcode instance. It is
//! moved into a [`VM`](super::vm::VM) to run and moved back out when the VM
//! suspends, so two programs never share memory.

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::io::{InputSource, OutputRoute, OutputSink};
use crate::virtual_machine::memory::Memory;
use crate::virtual_machine::word::{Word, words};
use std::collections::VecDeque;
use std::fmt;
use std::fs;
use std::path::Path;

/// State of one Intcode instance: memory, registers, pending input and the
/// capabilities it emits to and polls from.
pub struct Program {
    pub(crate) memory: Memory,
    pub(crate) ip: usize,
    pub(crate) relative_base: Word,
    pub(crate) inputs: VecDeque<Word>,
    pub(crate) output: OutputRoute,
    pub(crate) input_source: Option<Box<dyn InputSource>>,
}

impl Program {
    /// Creates a program with `code` loaded at address 0.
    pub fn new(code: &[i64]) -> Self {
        Self::from_code(words(code))
    }

    /// Creates a program from parsed cells, loaded at address 0.
    ///
    /// Output is chained to the next scheduled program until
    /// [`with_output`](Self::with_output) attaches a sink.
    pub fn from_code(code: Vec<Word>) -> Self {
        Self {
            memory: Memory::from_code(code),
            ip: 0,
            relative_base: Word::ZERO,
            inputs: VecDeque::new(),
            output: OutputRoute::ChainToNextProgram,
            input_source: None,
        }
    }

    /// Queues initial input values.
    pub fn with_inputs<I, W>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = W>,
        W: Into<Word>,
    {
        self.inputs.extend(inputs.into_iter().map(Into::into));
        self
    }

    /// Routes all output to `sink`.
    pub fn with_output<S: OutputSink + 'static>(mut self, sink: S) -> Self {
        self.output = OutputRoute::External(Box::new(sink));
        self
    }

    /// Polls `source` whenever an input instruction finds the queue empty.
    pub fn with_input_source<S: InputSource + 'static>(mut self, source: S) -> Self {
        self.input_source = Some(Box::new(source));
        self
    }

    /// Appends a value to the input queue.
    pub fn push_input<W: Into<Word>>(&mut self, value: W) {
        self.inputs.push_back(value.into());
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn instruction_pointer(&self) -> usize {
        self.ip
    }

    pub fn relative_base(&self) -> Word {
        self.relative_base.clone()
    }

    /// Pending input values, front first.
    pub fn inputs(&self) -> impl Iterator<Item = Word> + '_ {
        self.inputs.iter().cloned()
    }

    pub fn output_route(&self) -> &OutputRoute {
        &self.output
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("ip", &self.ip)
            .field("relative_base", &self.relative_base)
            .field("inputs", &self.inputs)
            .field("output", &self.output)
            .field("input_source", &self.input_source.is_some())
            .field("stored_cells", &self.memory.stored_cells())
            .finish()
    }
}

/// Dumps memory, registers and pending input in a human-readable form.
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<String> = self
            .memory
            .dump()
            .into_iter()
            .map(|(_, value)| value.to_string())
            .collect();
        let inputs: Vec<String> = self.inputs.iter().map(Word::to_string).collect();
        writeln!(f, "MEMORY: {}", cells.join(", "))?;
        writeln!(f, "INSTRUCTION POINTER: {}", self.ip)?;
        writeln!(f, "RELATIVE BASE: {}", self.relative_base)?;
        write!(f, "INPUTS: [{}]", inputs.join(", "))
    }
}

/// Parses program text: signed decimal integers separated by commas and/or
/// whitespace. Empty tokens (such as a trailing comma or newline) are skipped.
pub fn parse_program(source: &str) -> Result<Vec<Word>, VMError> {
    source
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .enumerate()
        .map(|(index, token)| {
            token
                .parse::<Word>()
                .map_err(|_| VMError::InvalidProgramText {
                    index,
                    token: token.to_string(),
                })
        })
        .collect()
}

/// Reads and parses a program text file.
pub fn load_program_file<P: AsRef<Path>>(path: P) -> Result<Vec<Word>, VMError> {
    let path_ref = path.as_ref();
    let source = fs::read_to_string(path_ref).map_err(|e| VMError::Io {
        path: path_ref.display().to_string(),
        reason: e.to_string(),
    })?;
    parse_program(&source)
}
