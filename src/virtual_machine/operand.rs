//! Addressing modes and instruction decoding.

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Opcode;
use crate::virtual_machine::word::Word;

/// Largest number of parameters any instruction takes.
pub const MAX_PARAMS: usize = 3;

/// How a raw parameter value becomes an operand.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Mode {
    /// The parameter is an absolute address.
    #[default]
    Position = 0,
    /// The parameter is the operand itself. Never valid for a write target.
    Immediate = 1,
    /// The parameter is an offset from the relative base.
    Relative = 2,
}

impl Mode {
    /// Maps one decimal mode digit to its mode.
    pub const fn from_digit(digit: i64) -> Option<Mode> {
        match digit {
            0 => Some(Mode::Position),
            1 => Some(Mode::Immediate),
            2 => Some(Mode::Relative),
            _ => None,
        }
    }
}

/// An instruction cell split into its opcode and per-parameter modes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Decoded {
    pub opcode: Opcode,
    /// Mode of each parameter; slots past the opcode's arity are `Position`.
    pub modes: [Mode; MAX_PARAMS],
}

impl Decoded {
    /// Decodes the cell found at instruction pointer `ip`.
    ///
    /// Fails with [`VMError::InvalidInstruction`] on a negative or oversized
    /// cell, an unknown opcode, a mode digit outside `0..=2`, immediate mode on
    /// a write target, or non-zero mode digits beyond the opcode's arity.
    pub fn decode(ip: usize, cell: &Word) -> Result<Self, VMError> {
        let invalid = || VMError::InvalidInstruction {
            ip,
            value: cell.clone(),
        };
        let value = cell.as_i64().filter(|v| *v >= 0).ok_or_else(invalid)?;

        let opcode = Opcode::from_code(value % 100).ok_or_else(invalid)?;
        let arity = opcode.arity();
        let mut modes = [Mode::Position; MAX_PARAMS];
        let mut digits = value / 100;

        for (index, slot) in modes.iter_mut().enumerate().take(arity) {
            let mode = Mode::from_digit(digits % 10).ok_or_else(invalid)?;
            if mode == Mode::Immediate && opcode.writes() && index + 1 == arity {
                return Err(invalid());
            }
            *slot = mode;
            digits /= 10;
        }

        if digits != 0 {
            return Err(invalid());
        }
        Ok(Self { opcode, modes })
    }

    /// Mode of parameter `index` (0-based).
    pub fn mode(&self, index: usize) -> Mode {
        self.modes[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(ip: usize, value: i64) -> Result<Decoded, VMError> {
        Decoded::decode(ip, &Word::from(value))
    }

    #[test]
    fn mode_from_digit() {
        assert_eq!(Mode::from_digit(0), Some(Mode::Position));
        assert_eq!(Mode::from_digit(1), Some(Mode::Immediate));
        assert_eq!(Mode::from_digit(2), Some(Mode::Relative));
        assert_eq!(Mode::from_digit(3), None);
        assert_eq!(Mode::from_digit(9), None);
    }

    #[test]
    fn decode_plain_opcode_defaults_to_position() {
        let d = decode(0, 1).unwrap();
        assert_eq!(d.opcode, Opcode::Add);
        assert_eq!(d.modes, [Mode::Position; 3]);
    }

    #[test]
    fn decode_reads_digits_least_significant_first() {
        let d = decode(0, 1002).unwrap();
        assert_eq!(d.opcode, Opcode::Mul);
        assert_eq!(d.modes, [Mode::Position, Mode::Immediate, Mode::Position]);

        let d = decode(0, 21101).unwrap();
        assert_eq!(d.opcode, Opcode::Add);
        assert_eq!(d.modes, [Mode::Immediate, Mode::Immediate, Mode::Relative]);
    }

    #[test]
    fn decode_relative_input_target() {
        let d = decode(4, 203).unwrap();
        assert_eq!(d.opcode, Opcode::Input);
        assert_eq!(d.mode(0), Mode::Relative);
    }

    #[test]
    fn decode_immediate_read_only_params() {
        let d = decode(0, 1105).unwrap();
        assert_eq!(d.opcode, Opcode::JumpIfTrue);
        assert_eq!(d.modes, [Mode::Immediate, Mode::Immediate, Mode::Position]);
        assert_eq!(decode(0, 109).unwrap().mode(0), Mode::Immediate);
        assert_eq!(decode(0, 104).unwrap().mode(0), Mode::Immediate);
    }

    #[test]
    fn decode_rejects_unknown_opcode() {
        assert_eq!(
            decode(7, 42),
            Err(VMError::InvalidInstruction {
                ip: 7,
                value: Word::from(42)
            })
        );
        assert!(decode(0, 0).is_err());
        assert!(decode(0, 100).is_err());
    }

    #[test]
    fn decode_rejects_bad_mode_digit() {
        assert_eq!(
            decode(3, 301),
            Err(VMError::InvalidInstruction {
                ip: 3,
                value: Word::from(301)
            })
        );
        assert!(decode(0, 1901).is_err());
    }

    #[test]
    fn decode_rejects_immediate_write_target() {
        assert!(decode(0, 10001).is_err());
        assert!(decode(0, 103).is_err());
        assert!(decode(0, 11107).is_err());
    }

    #[test]
    fn decode_rejects_digits_beyond_arity() {
        assert!(decode(0, 199).is_err());
        assert!(decode(0, 1104).is_err());
        assert!(decode(0, 100001).is_err());
    }

    #[test]
    fn decode_rejects_negative_cell() {
        assert!(decode(0, -1).is_err());
        assert!(decode(0, -99).is_err());
    }

    #[test]
    fn decode_rejects_cell_beyond_machine_range() {
        let cell: Word = "100000000000000000001".parse().unwrap();
        assert_eq!(
            Decoded::decode(5, &cell),
            Err(VMError::InvalidInstruction { ip: 5, value: cell })
        );
    }
}
