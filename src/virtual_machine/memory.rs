//! Sparse, unbounded program memory.

use crate::virtual_machine::word::Word;
use std::collections::HashMap;

/// Addresses below this bound live in a contiguous buffer; anything above is
/// kept in a hash map so a single far write does not allocate the gap.
const DENSE_LIMIT: usize = 1 << 16;

/// Integer-addressed memory where every unwritten cell reads as zero.
///
/// The cells holding the loaded program (and anything below `DENSE_LIMIT`)
/// are stored densely. Writes never fail and may extend memory arbitrarily far.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    dense: Vec<Word>,
    sparse: HashMap<usize, Word>,
}

impl Memory {
    /// Creates memory holding `code` at addresses `0..code.len()`.
    pub fn from_code(code: Vec<Word>) -> Self {
        Self {
            dense: code,
            sparse: HashMap::new(),
        }
    }

    /// Returns the value at `addr`, or zero if it was never written.
    #[inline]
    pub fn read(&self, addr: usize) -> Word {
        match self.dense.get(addr) {
            Some(value) => value.clone(),
            None => self.sparse.get(&addr).cloned().unwrap_or_default(),
        }
    }

    /// Stores `value` at `addr`.
    #[inline]
    pub fn write(&mut self, addr: usize, value: Word) {
        if addr < self.dense.len() {
            self.dense[addr] = value;
        } else if addr < DENSE_LIMIT {
            self.dense.resize(addr + 1, Word::ZERO);
            self.dense[addr] = value;
        } else {
            self.sparse.insert(addr, value);
        }
    }

    /// Returns the cells at `0..len`, zero-filled where unwritten.
    pub fn to_vec(&self, len: usize) -> Vec<Word> {
        (0..len).map(|addr| self.read(addr)).collect()
    }

    /// Returns every stored cell as `(address, value)` in address order.
    pub fn dump(&self) -> Vec<(usize, Word)> {
        let mut far: Vec<(usize, Word)> = self
            .sparse
            .iter()
            .map(|(addr, value)| (*addr, value.clone()))
            .collect();
        far.sort_unstable_by_key(|(addr, _)| *addr);
        self.dense.iter().cloned().enumerate().chain(far).collect()
    }

    /// Number of cells currently backed by storage.
    pub fn stored_cells(&self) -> usize {
        self.dense.len() + self.sparse.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::virtual_machine::word::words;

    #[test]
    fn unwritten_cells_read_zero() {
        let mem = Memory::from_code(words(&[1, 2, 3]));
        assert_eq!(mem.read(2), 3);
        assert_eq!(mem.read(3), 0);
        assert_eq!(mem.read(1_000_000), 0);
    }

    #[test]
    fn write_extends_dense_region() {
        let mut mem = Memory::from_code(words(&[7]));
        mem.write(10, Word::from(-4));
        assert_eq!(mem.read(10), -4);
        assert_eq!(mem.to_vec(11), [7, 0, 0, 0, 0, 0, 0, 0, 0, 0, -4]);
        assert_eq!(mem.stored_cells(), 11);
    }

    #[test]
    fn far_writes_stay_sparse() {
        let mut mem = Memory::default();
        let far = DENSE_LIMIT * 16;
        mem.write(far, Word::from(99));
        assert_eq!(mem.read(far), 99);
        assert_eq!(mem.stored_cells(), 1);
        mem.write(far, Word::from(5));
        assert_eq!(mem.read(far), 5);
        assert_eq!(mem.stored_cells(), 1);
    }

    #[test]
    fn cells_hold_values_beyond_machine_range() {
        let huge: Word = "-170141183460469231731687303715884105728".parse().unwrap();
        let mut mem = Memory::default();
        mem.write(3, huge.clone());
        mem.write(DENSE_LIMIT * 4, huge.clone());
        assert_eq!(mem.read(3), huge);
        assert_eq!(mem.read(DENSE_LIMIT * 4), huge);
        assert_eq!(mem.read(2), 0);
    }

    #[test]
    fn dump_is_address_ordered() {
        let mut mem = Memory::from_code(words(&[1, 2]));
        mem.write(DENSE_LIMIT * 3, Word::from(30));
        mem.write(DENSE_LIMIT * 2, Word::from(20));
        let cells: Vec<(usize, i64)> = mem
            .dump()
            .into_iter()
            .map(|(addr, value)| (addr, value.as_i64().unwrap()))
            .collect();
        assert_eq!(
            cells,
            [(0, 1), (1, 2), (DENSE_LIMIT * 2, 20), (DENSE_LIMIT * 3, 30)]
        );
    }
}
