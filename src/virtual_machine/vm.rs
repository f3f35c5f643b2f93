//! Intcode execution unit.
//!
//! A [`VM`] owns exactly one [`Program`] while it runs. Each step decodes the
//! cell under the instruction pointer, resolves the operands according to their
//! addressing modes and executes the instruction. Input starvation is reported
//! as [`ExecState::SuspendedOnInput`] with the instruction pointer left on the
//! input instruction, so the next step retries it verbatim.
//!
//! Arithmetic never wraps: operands and results are [`Word`]s, which grow past
//! the `i64` range as needed.

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::io::OutputRoute;
use crate::virtual_machine::isa::Opcode;
use crate::virtual_machine::memory::Memory;
use crate::virtual_machine::operand::{Decoded, Mode};
use crate::virtual_machine::program::Program;
use crate::virtual_machine::word::Word;
use std::fmt;

mod fuel;

pub use fuel::{Fuel, OpcodeProfile};

/// Lifecycle of an execution unit.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ExecState {
    /// The next step executes an instruction.
    Runnable,
    /// An input instruction found no value; the pointer still addresses it.
    SuspendedOnInput,
    /// The halt instruction executed. Terminal.
    Halted,
}

/// Why a call to [`VM::run`] or [`VM::run_for`] returned.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Exit {
    Halted,
    Suspended,
    OutOfFuel,
}

/// Effect of one instruction on the instruction pointer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Flow {
    Advance,
    Jump(usize),
    Suspend,
    Halt,
}

macro_rules! exec_vm {
    (
        vm = $vm:ident,
        decoded = $decoded:ident,
        { $( $variant:ident => $handler:ident ( $( $field:ident : $kind:ident @ $slot:literal ),* $(,)? ) ),* $(,)? }
    ) => {{
        match $decoded.opcode {
            $(
                Opcode::$variant => {
                    $( let $field = exec_vm!(@operand $vm, $decoded, $kind, $slot)?; )*
                    $vm.$handler($( $field ),*)
                }
            ),*
        }
    }};

    // Parameter that is read: resolves to a value
    (@operand $vm:ident, $decoded:ident, Read, $slot:literal) => {
        $vm.read_operand($decoded, $slot)
    };

    // Parameter that is written: resolves to an address
    (@operand $vm:ident, $decoded:ident, Write, $slot:literal) => {
        $vm.write_address($decoded, $slot)
    };
}

/// Intcode execution unit.
pub struct VM {
    program: Program,
    state: ExecState,
    /// Values emitted while output is chained to the next program, waiting to
    /// be delivered by the scheduler.
    forwarded: Vec<Word>,
    last_output: Option<Word>,
    profile: OpcodeProfile,
}

impl VM {
    /// Loads `program` into a fresh execution unit ("thaw").
    pub fn new(program: Program) -> Self {
        Self {
            program,
            state: ExecState::Runnable,
            forwarded: Vec::new(),
            last_output: None,
            profile: OpcodeProfile::new(),
        }
    }

    /// Unloads the program so it can be stored and resumed later ("freeze").
    pub fn freeze(self) -> Program {
        self.program
    }

    pub fn state(&self) -> ExecState {
        self.state
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn memory(&self) -> &Memory {
        &self.program.memory
    }

    pub fn instruction_pointer(&self) -> usize {
        self.program.ip
    }

    pub fn relative_base(&self) -> Word {
        self.program.relative_base.clone()
    }

    /// Memory cell 0, the conventional result of a halted program.
    pub fn result(&self) -> Word {
        self.program.memory.read(0)
    }

    /// Most recent value emitted by an output instruction.
    pub fn last_output(&self) -> Option<Word> {
        self.last_output.clone()
    }

    pub fn profile(&self) -> &OpcodeProfile {
        &self.profile
    }

    /// Appends a value to the input queue of the loaded program.
    pub fn push_input<W: Into<Word>>(&mut self, value: W) {
        self.program.push_input(value);
    }

    /// Drains the values emitted under [`OutputRoute::ChainToNextProgram`].
    pub fn take_forwarded(&mut self) -> Vec<Word> {
        std::mem::take(&mut self.forwarded)
    }

    /// Executes until the program halts or suspends on input.
    pub fn run(&mut self) -> Result<Exit, VMError> {
        self.run_for(Fuel::Unlimited)
    }

    /// Executes until the program halts, suspends on input, or `fuel` runs out.
    pub fn run_for(&mut self, mut fuel: Fuel) -> Result<Exit, VMError> {
        loop {
            if !fuel.burn() {
                return Ok(Exit::OutOfFuel);
            }
            match self.step()? {
                ExecState::Runnable => {}
                ExecState::SuspendedOnInput => return Ok(Exit::Suspended),
                ExecState::Halted => return Ok(Exit::Halted),
            }
        }
    }

    /// Executes a single instruction and returns the resulting state.
    ///
    /// Stepping a halted unit is a no-op.
    pub fn step(&mut self) -> Result<ExecState, VMError> {
        if self.state == ExecState::Halted {
            return Ok(ExecState::Halted);
        }

        let ip = self.program.ip;
        let decoded = Decoded::decode(ip, &self.program.memory.read(ip))?;
        let flow = self.exec(&decoded)?;
        if flow != Flow::Suspend {
            self.profile.record(decoded.opcode);
        }

        self.state = match flow {
            Flow::Advance => {
                self.program.ip = ip + decoded.opcode.size();
                ExecState::Runnable
            }
            Flow::Jump(target) => {
                self.program.ip = target;
                ExecState::Runnable
            }
            Flow::Suspend => ExecState::SuspendedOnInput,
            Flow::Halt => ExecState::Halted,
        };
        Ok(self.state)
    }

    /// Executes a single decoded instruction.
    fn exec(&mut self, decoded: &Decoded) -> Result<Flow, VMError> {
        exec_vm! {
            vm = self,
            decoded = decoded,
            {
                // Arithmetic
                Add => op_add(a: Read @ 0, b: Read @ 1, c: Write @ 2),
                Mul => op_mul(a: Read @ 0, b: Read @ 1, c: Write @ 2),
                // I/O
                Input => op_input(a: Write @ 0),
                Output => op_output(a: Read @ 0),
                // Control flow
                JumpIfTrue => op_jump_if_true(a: Read @ 0, b: Read @ 1),
                JumpIfFalse => op_jump_if_false(a: Read @ 0, b: Read @ 1),
                // Comparison
                LessThan => op_less_than(a: Read @ 0, b: Read @ 1, c: Write @ 2),
                Equals => op_equals(a: Read @ 0, b: Read @ 1, c: Write @ 2),
                // Registers
                AdjustBase => op_adjust_base(a: Read @ 0),
                Halt => op_halt(),
            }
        }
    }

    // ==================== Operand resolution ====================

    /// Raw parameter `slot` of the instruction at the instruction pointer.
    fn raw_param(&self, slot: usize) -> Word {
        self.program.memory.read(self.program.ip + 1 + slot)
    }

    fn read_operand(&self, decoded: &Decoded, slot: usize) -> Result<Word, VMError> {
        let raw = self.raw_param(slot);
        match decoded.mode(slot) {
            Mode::Position => Ok(self.program.memory.read(self.address(raw)?)),
            Mode::Immediate => Ok(raw),
            Mode::Relative => Ok(self.program.memory.read(self.relative(&raw)?)),
        }
    }

    fn write_address(&self, decoded: &Decoded, slot: usize) -> Result<usize, VMError> {
        let raw = self.raw_param(slot);
        match decoded.mode(slot) {
            Mode::Position => self.address(raw),
            Mode::Relative => self.relative(&raw),
            Mode::Immediate => Err(VMError::InvalidInstruction {
                ip: self.program.ip,
                value: self.program.memory.read(self.program.ip),
            }),
        }
    }

    fn relative(&self, offset: &Word) -> Result<usize, VMError> {
        self.address(offset + &self.program.relative_base)
    }

    fn address(&self, value: Word) -> Result<usize, VMError> {
        let ip = self.program.ip;
        match value.to_usize() {
            Some(addr) => Ok(addr),
            None if value.is_negative() => Err(VMError::NegativeAddress { ip, address: value }),
            None => Err(VMError::AddressOutOfRange { ip, address: value }),
        }
    }

    fn jump_target(&self, value: Word) -> Result<usize, VMError> {
        value.to_usize().ok_or_else(|| VMError::InvalidJumpTarget {
            ip: self.program.ip,
            target: value,
        })
    }

    // ==================== Instructions ====================

    fn op_add(&mut self, a: Word, b: Word, c: usize) -> Result<Flow, VMError> {
        self.program.memory.write(c, &a + &b);
        Ok(Flow::Advance)
    }

    fn op_mul(&mut self, a: Word, b: Word, c: usize) -> Result<Flow, VMError> {
        self.program.memory.write(c, &a * &b);
        Ok(Flow::Advance)
    }

    /// Queued values are always drained before the source is consulted.
    fn op_input(&mut self, target: usize) -> Result<Flow, VMError> {
        if self.program.inputs.is_empty() {
            if let Some(source) = self.program.input_source.as_mut() {
                let values = source.send();
                self.program.inputs.extend(values);
            }
        }

        match self.program.inputs.pop_front() {
            Some(value) => {
                self.program.memory.write(target, value);
                Ok(Flow::Advance)
            }
            None => Ok(Flow::Suspend),
        }
    }

    fn op_output(&mut self, a: Word) -> Result<Flow, VMError> {
        self.last_output = Some(a.clone());
        match &mut self.program.output {
            OutputRoute::External(sink) => sink.process(a),
            OutputRoute::ChainToNextProgram => self.forwarded.push(a),
        }
        Ok(Flow::Advance)
    }

    fn op_jump_if_true(&mut self, a: Word, b: Word) -> Result<Flow, VMError> {
        if !a.is_zero() {
            Ok(Flow::Jump(self.jump_target(b)?))
        } else {
            Ok(Flow::Advance)
        }
    }

    fn op_jump_if_false(&mut self, a: Word, b: Word) -> Result<Flow, VMError> {
        if a.is_zero() {
            Ok(Flow::Jump(self.jump_target(b)?))
        } else {
            Ok(Flow::Advance)
        }
    }

    fn op_less_than(&mut self, a: Word, b: Word, c: usize) -> Result<Flow, VMError> {
        self.program.memory.write(c, Word::from(a < b));
        Ok(Flow::Advance)
    }

    fn op_equals(&mut self, a: Word, b: Word, c: usize) -> Result<Flow, VMError> {
        self.program.memory.write(c, Word::from(a == b));
        Ok(Flow::Advance)
    }

    fn op_adjust_base(&mut self, a: Word) -> Result<Flow, VMError> {
        self.program.relative_base = &self.program.relative_base + &a;
        Ok(Flow::Advance)
    }

    fn op_halt(&mut self) -> Result<Flow, VMError> {
        Ok(Flow::Halt)
    }
}

impl fmt::Display for VM {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "STATE: {:?}", self.state)?;
        write!(f, "{}", self.program)
    }
}
