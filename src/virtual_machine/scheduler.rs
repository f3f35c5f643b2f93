//! Single-threaded cooperative scheduler.
//!
//! Programs take turns on one execution unit in strict round robin. A program
//! keeps its turn until it halts or suspends on input; a suspended program is
//! frozen and moved to the back of the run queue, a halted one is dropped.
//! Output of a program routed with [`OutputRoute::ChainToNextProgram`] is
//! appended to the input queue of the program at the front of the run queue,
//! which is the one that runs next.
//!
//! [`OutputRoute::ChainToNextProgram`]: crate::virtual_machine::io::OutputRoute::ChainToNextProgram

use crate::debug;
use crate::error;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::program::Program;
use crate::virtual_machine::vm::{Exit, VM};
use crate::virtual_machine::word::Word;
use std::collections::VecDeque;

/// A program waiting in the run queue, tagged with the id it was added under.
#[derive(Debug)]
struct Slot {
    id: usize,
    program: Program,
}

/// A program that ran to completion.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Halted {
    pub id: usize,
    /// Memory cell 0 at halt.
    pub result: Word,
}

/// Outcome of [`Scheduler::run`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ScheduleReport {
    /// Halted programs in the order they halted.
    pub halted: Vec<Halted>,
    /// Most recent value emitted by any program.
    pub last_output: Option<Word>,
    /// Programs left suspended because none of them could make progress.
    /// Empty when every program halted.
    pub deadlocked: Vec<usize>,
    /// Number of turns handed out.
    pub turns: usize,
}

impl ScheduleReport {
    pub fn is_complete(&self) -> bool {
        self.deadlocked.is_empty()
    }
}

/// Round-robin scheduler over a collection of programs.
#[derive(Debug, Default)]
pub struct Scheduler {
    queue: VecDeque<Slot>,
    next_id: usize,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a feedback pipeline: one copy of `code` per phase setting, each
    /// receiving its phase as first input and chained to the next. The first
    /// copy additionally receives the initial signal `0`.
    pub fn pipeline(code: &[Word], phases: &[Word]) -> Self {
        let mut scheduler = Self::new();
        for (index, phase) in phases.iter().enumerate() {
            let mut program = Program::from_code(code.to_vec()).with_inputs([phase.clone()]);
            if index == 0 {
                program.push_input(0);
            }
            scheduler.add(program);
        }
        scheduler
    }

    /// Appends `program` to the run queue and returns its id.
    pub fn add(&mut self, program: Program) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.queue.push_back(Slot { id, program });
        id
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Ids of the queued programs in the order they will run.
    pub fn ids(&self) -> Vec<usize> {
        self.queue.iter().map(|slot| slot.id).collect()
    }

    /// Returns the queued program with the given id.
    pub fn program(&self, id: usize) -> Option<&Program> {
        self.queue
            .iter()
            .find(|slot| slot.id == id)
            .map(|slot| &slot.program)
    }

    /// Runs the queued programs, starting with the one at position `start`,
    /// until every program has halted.
    ///
    /// If a full pass over the queue passes without any program executing an
    /// instruction, the remaining programs can never be resumed: they stay in
    /// the scheduler and are listed in [`ScheduleReport::deadlocked`].
    ///
    /// A VM error aborts the whole run.
    pub fn run(&mut self, start: usize) -> Result<ScheduleReport, VMError> {
        let mut report = ScheduleReport::default();
        if self.queue.is_empty() {
            return Ok(report);
        }

        self.queue.rotate_left(start % self.queue.len());
        let mut stalled = 0;

        while let Some(Slot { id, program }) = self.queue.pop_front() {
            report.turns += 1;
            let mut vm = VM::new(program);

            let exit = match vm.run() {
                Ok(exit) => exit,
                Err(e) => {
                    error!("program {id} failed: {e}");
                    return Err(e);
                }
            };

            if let Some(value) = vm.last_output() {
                report.last_output = Some(value);
            }
            let progressed = vm.profile().total() > 0;
            let forwarded = vm.take_forwarded();

            match exit {
                Exit::Halted => {
                    let result = vm.result();
                    debug!("program {id} halted with result {result}");
                    report.halted.push(Halted { id, result });
                    stalled = 0;
                }
                Exit::Suspended | Exit::OutOfFuel => {
                    debug!("program {id} suspended on input");
                    self.queue.push_back(Slot {
                        id,
                        program: vm.freeze(),
                    });
                    stalled = if progressed { 0 } else { stalled + 1 };
                }
            }

            if let Some(next) = self.queue.front_mut() {
                for value in forwarded {
                    next.program.push_input(value);
                }
            }

            if stalled > 0 && stalled >= self.queue.len() {
                report.deadlocked = self.ids();
                debug!("deadlock: programs {:?} wait for input", report.deadlocked);
                break;
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::virtual_machine::io::{InputSource, OutputBuffer, OutputSink};
    use crate::virtual_machine::word::words;
    use std::sync::{Arc, Mutex};

    /// Wire connecting one program's output to another program's input source.
    #[derive(Clone, Default)]
    struct Wire(Arc<Mutex<Vec<Word>>>);

    impl OutputSink for Wire {
        fn process(&mut self, value: Word) {
            self.0.lock().unwrap().push(value);
        }
    }

    impl InputSource for Wire {
        fn send(&mut self) -> Vec<Word> {
            std::mem::take(&mut *self.0.lock().unwrap())
        }
    }

    const AMPLIFIER: [i64; 17] = [3, 15, 3, 16, 1002, 16, 10, 16, 1, 16, 15, 15, 4, 15, 99, 0, 0];

    const FEEDBACK_AMPLIFIER: [i64; 29] = [
        3, 26, 1001, 26, -4, 26, 3, 27, 1002, 27, 2, 27, 1, 27, 26, 27, 4, 27, 1001, 28, -1, 28,
        1005, 28, 6, 99, 0, 0, 5,
    ];

    #[test]
    fn empty_scheduler_completes() {
        let report = Scheduler::new().run(0).unwrap();
        assert!(report.is_complete());
        assert_eq!(report.turns, 0);
    }

    #[test]
    fn chained_pipeline() {
        let mut scheduler = Scheduler::pipeline(&words(&AMPLIFIER), &words(&[4, 3, 2, 1, 0]));
        let report = scheduler.run(0).unwrap();
        assert_eq!(report.last_output, Some(Word::from(43210)));
        assert_eq!(report.halted.len(), 5);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn feedback_pipeline() {
        let mut scheduler =
            Scheduler::pipeline(&words(&FEEDBACK_AMPLIFIER), &words(&[9, 8, 7, 6, 5]));
        let report = scheduler.run(0).unwrap();
        assert_eq!(report.last_output, Some(Word::from(139629729)));
        assert!(report.is_complete());
        assert_eq!(
            report.halted.iter().map(|h| h.id).collect::<Vec<_>>(),
            [0, 1, 2, 3, 4]
        );
    }

    #[test]
    fn feedback_pipeline_with_loop_counter() {
        let code = [
            3, 52, 1001, 52, -5, 52, 3, 53, 1, 52, 56, 54, 1007, 54, 5, 55, 1005, 55, 26, 1001, 54,
            -5, 54, 1105, 1, 12, 1, 53, 54, 53, 1008, 54, 0, 55, 1001, 55, 1, 55, 2, 53, 55, 53, 4,
            53, 1001, 56, -1, 56, 1005, 56, 6, 99, 0, 0, 0, 0, 10,
        ];
        let report = Scheduler::pipeline(&words(&code), &words(&[9, 7, 8, 5, 6]))
            .run(0)
            .unwrap();
        assert_eq!(report.last_output, Some(Word::from(18216)));
    }

    #[test]
    fn one_pass_delivers_to_starved_program() {
        let wire = Wire::default();
        let received = OutputBuffer::new();
        let mut scheduler = Scheduler::new();
        let a = scheduler.add(
            Program::new(&[3, 0, 4, 0, 99])
                .with_input_source(wire.clone())
                .with_output(received.clone()),
        );
        let b = scheduler.add(Program::new(&[104, 42, 99]).with_output(wire));
        let c = scheduler.add(Program::new(&[99]));

        let report = scheduler.run(0).unwrap();
        assert_eq!(report.turns, 4);
        assert_eq!(
            report.halted,
            [
                Halted {
                    id: b,
                    result: Word::from(104)
                },
                Halted {
                    id: c,
                    result: Word::from(99)
                },
                Halted {
                    id: a,
                    result: Word::from(42)
                },
            ]
        );
        assert_eq!(received.values(), [42]);
    }

    #[test]
    fn start_index_rotates_queue() {
        let mut scheduler = Scheduler::new();
        for _ in 0..3 {
            scheduler.add(Program::new(&[99]));
        }
        let report = scheduler.run(4).unwrap();
        assert_eq!(
            report.halted.iter().map(|h| h.id).collect::<Vec<_>>(),
            [1, 2, 0]
        );
    }

    #[test]
    fn lone_program_feeds_itself() {
        // Outputs 5, reads it back and halts with it in cell 0.
        let mut scheduler = Scheduler::new();
        scheduler.add(Program::new(&[104, 5, 3, 0, 99]));
        let report = scheduler.run(0).unwrap();
        assert_eq!(
            report.halted,
            [Halted {
                id: 0,
                result: Word::from(5)
            }]
        );
        assert_eq!(report.turns, 2);
    }

    #[test]
    fn pipeline_carries_large_values() {
        // Each stage squares its input: 2^16 -> 2^32 -> 2^64 -> 2^128.
        let square = words(&[3, 9, 2, 9, 9, 9, 4, 9, 99, 0]);
        let mut scheduler = Scheduler::new();
        for _ in 0..3 {
            scheduler.add(Program::from_code(square.clone()));
        }
        scheduler.add(Program::new(&[104, 65536, 99]));
        let report = scheduler.run(3).unwrap();
        let expected: Word = "340282366920938463463374607431768211456".parse().unwrap();
        assert_eq!(report.last_output, Some(expected));
        assert!(report.is_complete());
    }

    #[test]
    fn deadlock_is_reported() {
        let mut scheduler = Scheduler::new();
        scheduler.add(Program::new(&[3, 0, 99]));
        scheduler.add(Program::new(&[3, 0, 99]));
        let report = scheduler.run(0).unwrap();
        assert!(!report.is_complete());
        assert_eq!(report.deadlocked, [0, 1]);
        assert_eq!(scheduler.len(), 2);
        assert_eq!(scheduler.program(0).unwrap().instruction_pointer(), 0);
    }

    #[test]
    fn deadlocked_programs_resume_with_input() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.add(Program::new(&[3, 0, 99]));
        assert!(!scheduler.run(0).unwrap().is_complete());

        let mut program = Program::new(&[3, 0, 99]);
        program.push_input(8);
        scheduler.add(program);
        let report = scheduler.run(0).unwrap();
        // The new program halts, the first one stays starved.
        assert_eq!(
            report.halted,
            [Halted {
                id: 1,
                result: Word::from(8)
            }]
        );
        assert_eq!(report.deadlocked, [id]);
    }

    #[test]
    fn error_aborts_run() {
        let mut scheduler = Scheduler::new();
        scheduler.add(Program::new(&[99]));
        scheduler.add(Program::new(&[42]));
        assert_eq!(
            scheduler.run(0),
            Err(VMError::InvalidInstruction {
                ip: 0,
                value: Word::from(42)
            })
        );
    }
}
