//! Intcode virtual machine.
//!
//! Intcode is a stored-program machine over signed integers of unbounded
//! range: code and data share one unbounded memory, and every instruction is
//! a cell whose two low decimal digits select the opcode while the higher
//! digits select the addressing mode of each parameter.
//!
//! # Architecture
//!
//! - **Memory**: sparse, unbounded, every unwritten cell reads as zero
//! - **Registers**: instruction pointer and relative base
//! - **Addressing modes**: position, immediate and relative
//! - **I/O**: a FIFO input queue refilled on demand from an [`io::InputSource`],
//!   and output routed once per program to an [`io::OutputSink`] or to the
//!   next scheduled program
//! - **Suspension**: an input instruction with nothing to read leaves the
//!   program suspended on that instruction instead of failing
//!
//! # Modules
//!
//! - [`ascii`]: Text adapters for character-based programs
//! - [`errors`]: Loading and execution error types
//! - [`io`]: Output sinks, input sources and output routing
//! - [`isa`]: Instruction set definition and opcode mappings
//! - [`memory`]: Sparse program memory
//! - [`operand`]: Addressing modes and instruction decoding
//! - [`program`]: Movable program state and program text parsing
//! - [`scheduler`]: Cooperative round-robin scheduler
//! - [`vm`]: Execution unit
//! - [`word`]: Arbitrary-precision cell values

pub mod ascii;
pub mod errors;
pub mod io;
pub mod isa;
pub mod memory;
pub mod operand;
pub mod program;
pub mod scheduler;
pub mod vm;
pub mod word;
