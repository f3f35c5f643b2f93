use crate::virtual_machine::isa::Opcode;

/// Opcode numbers are two decimal digits, so a flat table covers them all.
const OPCODE_SLOTS: usize = 100;

/// Instruction budget for one call to [`VM::run_for`](super::VM::run_for).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Fuel {
    /// Run until halt or suspension.
    Unlimited,
    /// Run at most this many instructions.
    Limited(u64),
}

impl Fuel {
    /// Consumes one unit. Returns `false` once the budget is spent.
    #[inline(always)]
    pub(super) fn burn(&mut self) -> bool {
        match self {
            Fuel::Unlimited => true,
            Fuel::Limited(0) => false,
            Fuel::Limited(remaining) => {
                *remaining -= 1;
                true
            }
        }
    }
}

/// Count of executed instructions per opcode.
///
/// Backed by a flat array indexed by opcode number for branch-free
/// accumulation on the hot path.
#[derive(Clone, Debug)]
pub struct OpcodeProfile {
    counts: [u64; OPCODE_SLOTS],
}

impl Default for OpcodeProfile {
    fn default() -> Self {
        Self {
            counts: [0; OPCODE_SLOTS],
        }
    }
}

impl OpcodeProfile {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn record(&mut self, opcode: Opcode) {
        let slot = &mut self.counts[opcode.code() as usize];
        *slot = slot.saturating_add(1);
    }

    /// Returns how many times `opcode` executed.
    pub fn count(&self, opcode: Opcode) -> u64 {
        self.counts[opcode.code() as usize]
    }

    /// Returns the total number of executed instructions.
    pub fn total(&self) -> u64 {
        self.counts
            .iter()
            .fold(0u64, |acc, &v| acc.saturating_add(v))
    }

    /// Iterates over opcodes that executed at least once, in table order.
    pub fn iter(&self) -> impl Iterator<Item = (Opcode, u64)> + '_ {
        Opcode::ALL
            .iter()
            .map(|op| (*op, self.count(*op)))
            .filter(|(_, count)| *count > 0)
    }
}
