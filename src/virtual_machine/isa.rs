//! Instruction Set Architecture (ISA) definitions.
//!
//! The [`for_each_instruction!`](crate::for_each_instruction) macro holds the
//! canonical instruction table and hands it to a callback macro, so the opcode
//! enum and its metadata are generated from one list.
//!
//! # Encoding
//!
//! An instruction is one memory cell followed by its parameters:
//! - `cell % 100` is the opcode
//! - digit *i* of `cell / 100` (least significant first) is the addressing
//!   mode of parameter *i*, see [`Mode`](super::operand::Mode)
//!
//! Parameters marked `Write` name the cell that receives the result and can
//! never use immediate mode.

/// Invokes a callback macro with the complete instruction definition list.
#[macro_export]
macro_rules! for_each_instruction {
    ($callback:ident) => {
        $callback! {
            // =========================
            // Arithmetic
            // =========================
            /// ADD a, b, c ; c = a + b
            Add = 1, "ADD" => [a: Read, b: Read, c: Write],
            /// MUL a, b, c ; c = a * b
            Mul = 2, "MUL" => [a: Read, b: Read, c: Write],
            // =========================
            // I/O
            // =========================
            /// IN a ; a = next input, suspends when none is available
            Input = 3, "IN" => [a: Write],
            /// OUT a ; emit a
            Output = 4, "OUT" => [a: Read],
            // =========================
            // Control flow
            // =========================
            /// JNZ a, b ; if a != 0 then IP = b
            JumpIfTrue = 5, "JNZ" => [a: Read, b: Read],
            /// JZ a, b ; if a == 0 then IP = b
            JumpIfFalse = 6, "JZ" => [a: Read, b: Read],
            // =========================
            // Comparison
            // =========================
            /// LT a, b, c ; c = (a < b)
            LessThan = 7, "LT" => [a: Read, b: Read, c: Write],
            /// EQ a, b, c ; c = (a == b)
            Equals = 8, "EQ" => [a: Read, b: Read, c: Write],
            // =========================
            // Registers
            // =========================
            /// ARB a ; relative_base += a
            AdjustBase = 9, "ARB" => [a: Read],
            /// HALT ; stop execution
            Halt = 99, "HALT" => [],
        }
    };
}

#[macro_export]
macro_rules! define_instructions {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $opcode:literal, $mnemonic:literal => [
                $( $field:ident : $kind:ident ),* $(,)?
            ]
        ),* $(,)?
    ) => {
        /// Operation selected by the two low decimal digits of an instruction cell.
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        pub enum Opcode {
            $(
                $(#[$doc])*
                $name = $opcode,
            )*
        }

        impl Opcode {
            /// Every opcode, in table order.
            pub const ALL: &'static [Opcode] = &[ $( Opcode::$name ),* ];

            /// Maps an opcode number (`cell % 100`) to its instruction.
            pub const fn from_code(code: i64) -> Option<Self> {
                match code {
                    $( $opcode => Some(Opcode::$name), )*
                    _ => None,
                }
            }

            /// Returns the numeric opcode.
            pub const fn code(&self) -> u8 {
                *self as u8
            }

            /// Returns the mnemonic used in traces and dumps.
            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( Opcode::$name => $mnemonic, )*
                }
            }

            /// Number of parameters following the opcode cell.
            pub const fn arity(&self) -> usize {
                match self {
                    $( Opcode::$name => 0 $( + $crate::define_instructions!(@one $field) )*, )*
                }
            }

            /// Returns `true` if the last parameter is a write target.
            pub const fn writes(&self) -> bool {
                match self {
                    $( Opcode::$name => false $( || $crate::define_instructions!(@is_write $kind) )*, )*
                }
            }

            /// Cells occupied by the instruction, opcode included.
            pub const fn size(&self) -> usize {
                1 + self.arity()
            }
        }
    };

    (@one $field:ident) => { 1 };
    (@is_write Read) => { false };
    (@is_write Write) => { true };
}

for_each_instruction!(define_instructions);
