//! Capabilities through which a program talks to the outside world.
//!
//! - [`OutputSink`] receives every value an output instruction emits
//! - [`InputSource`] refills the input queue when an input instruction finds it empty
//! - [`OutputRoute`] decides, once per program, where output goes

use crate::virtual_machine::word::Word;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// Receiver of emitted values, called once per executed output instruction.
pub trait OutputSink: Send {
    fn process(&mut self, value: Word);
}

/// Supplier of input values, polled only when the input queue is empty.
///
/// Returned values are appended to the queue and consumed in order. Returning
/// an empty vector leaves the program suspended on input.
pub trait InputSource: Send {
    fn send(&mut self) -> Vec<Word>;
}

/// Destination of a program's output.
pub enum OutputRoute {
    /// Every value is handed to an external sink.
    External(Box<dyn OutputSink>),
    /// Every value is appended to the input queue of the program scheduled next.
    ChainToNextProgram,
}

impl fmt::Debug for OutputRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputRoute::External(_) => write!(f, "External"),
            OutputRoute::ChainToNextProgram => write!(f, "ChainToNextProgram"),
        }
    }
}

/// Cloneable sink that records every value it receives.
///
/// Clones share the same buffer, so one clone can be attached to a program
/// while another is kept to inspect the output.
#[derive(Clone, Debug, Default)]
pub struct OutputBuffer {
    values: Arc<Mutex<Vec<Word>>>,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Word>> {
        // Recover the buffer if a previous holder panicked.
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a copy of everything received so far.
    pub fn values(&self) -> Vec<Word> {
        self.lock().clone()
    }

    /// Returns the most recent value, if any.
    pub fn last(&self) -> Option<Word> {
        self.lock().last().cloned()
    }

    /// Removes and returns everything received so far.
    pub fn take(&self) -> Vec<Word> {
        std::mem::take(&mut *self.lock())
    }
}

impl OutputSink for OutputBuffer {
    fn process(&mut self, value: Word) {
        self.lock().push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_buffer_clones_share_values() {
        let buffer = OutputBuffer::new();
        let mut sink = buffer.clone();
        sink.process(Word::from(1));
        sink.process(Word::from(-2));
        assert_eq!(buffer.values(), [1, -2]);
        assert_eq!(buffer.last(), Some(Word::from(-2)));
    }

    #[test]
    fn output_buffer_take_drains() {
        let mut buffer = OutputBuffer::new();
        buffer.process(Word::from(9));
        assert_eq!(buffer.take(), [9]);
        assert!(buffer.values().is_empty());
        assert_eq!(buffer.last(), None);
    }

    #[test]
    fn output_route_debug() {
        let route = OutputRoute::External(Box::new(OutputBuffer::new()));
        assert_eq!(format!("{route:?}"), "External");
        assert_eq!(
            format!("{:?}", OutputRoute::ChainToNextProgram),
            "ChainToNextProgram"
        );
    }
}
