use crate::virtual_machine::word::Word;

/// Errors that can occur while loading or executing an Intcode program.
///
/// Input starvation is deliberately absent: a program waiting for input is a
/// normal [`Exit::Suspended`](super::vm::Exit::Suspended) outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VMError {
    /// Unknown opcode or malformed addressing mode digit.
    #[error("invalid instruction at position {ip}: {value}")]
    InvalidInstruction { ip: usize, value: Word },
    /// An operand resolved to an address below zero.
    #[error("negative address {address} resolved by instruction at position {ip}")]
    NegativeAddress { ip: usize, address: Word },
    /// An operand resolved to an address too large to back with storage.
    #[error("address {address} resolved by instruction at position {ip} is out of range")]
    AddressOutOfRange { ip: usize, address: Word },
    /// A jump instruction targeted a negative or unreachable position.
    #[error("instruction at position {ip} jumps to invalid position {target}")]
    InvalidJumpTarget { ip: usize, target: Word },
    /// A token of the program text is not a signed decimal integer.
    #[error("invalid program text: token {index} is {token:?}")]
    InvalidProgramText { index: usize, token: String },
    /// Program file could not be read.
    #[error("io error on {path}: {reason}")]
    Io { path: String, reason: String },
}
