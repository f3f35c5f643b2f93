//! Packets exchanged between network nodes.
//!
//! A node emits a packet as three consecutive output values: destination, `x`
//! and `y`. The receiving node reads the `x`, `y` payload as two inputs.

use crate::virtual_machine::word::Word;
use std::fmt;

/// Destination reserved for the out-of-band rescue slot.
pub const BROADCAST_ADDRESS: i64 = 255;

/// Input value handed to a node that polls an empty mailbox.
pub const NO_PACKET: i64 = -1;

/// Number of output values that make up one packet.
pub const PACKET_LEN: usize = 3;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Packet {
    pub destination: Word,
    pub x: Word,
    pub y: Word,
}

impl Packet {
    pub fn new(destination: impl Into<Word>, x: impl Into<Word>, y: impl Into<Word>) -> Self {
        Self {
            destination: destination.into(),
            x: x.into(),
            y: y.into(),
        }
    }

    /// Builds a packet from the values a node emitted, in emission order.
    pub fn from_values(values: [Word; PACKET_LEN]) -> Self {
        let [destination, x, y] = values;
        Self { destination, x, y }
    }

    /// The two input values a receiving node reads.
    pub fn payload(&self) -> [Word; 2] {
        [self.x.clone(), self.y.clone()]
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <- ({}, {})", self.destination, self.x, self.y)
    }
}
