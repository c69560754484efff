//! Precondition vectors and their pool.
//!
//! A precondition vector holds, per `(sequence, choice)`, the end offset of
//! the earliest accepted match in the current scan (0 = not yet matched).
//! The matcher consults entry `i - 1` before emitting choice `i`, which is
//! what enforces in-order, non-overlapping sub-matches across wildcard gaps.
//!
//! Vectors are scan-lifetime objects recycled through a pool owned by the
//! automaton. They come back zeroed: `release` clears before returning the
//! vector to the free list, so `acquire` never hands out stale offsets.

use parking_lot::Mutex;

/// Earliest-match end offsets, indexed by sequence then choice.
pub(crate) struct Precons {
    slots: Vec<Vec<i64>>,
}

impl Precons {
    fn with_shape(shape: &[u32]) -> Self {
        Precons {
            slots: shape.iter().map(|&n| vec![0; n as usize]).collect(),
        }
    }

    #[inline]
    pub(crate) fn get(&self, seq: u32, sub: u32) -> i64 {
        self.slots[seq as usize][sub as usize]
    }

    #[inline]
    pub(crate) fn set(&mut self, seq: u32, sub: u32, end: i64) {
        self.slots[seq as usize][sub as usize] = end;
    }

    fn clear(&mut self) {
        for row in &mut self.slots {
            for slot in row {
                *slot = 0;
            }
        }
    }
}

/// Concurrency-safe free list of precondition vectors, all shaped to one
/// automaton's sequence list.
pub(crate) struct PreconPool {
    shape: Vec<u32>,
    free: Mutex<Vec<Precons>>,
}

impl PreconPool {
    pub(crate) fn new(shape: Vec<u32>) -> Self {
        PreconPool {
            shape,
            free: Mutex::new(Vec::new()),
        }
    }

    /// Pop a zeroed vector, allocating when the free list is empty.
    pub(crate) fn acquire(&self) -> Precons {
        self.free
            .lock()
            .pop()
            .unwrap_or_else(|| Precons::with_shape(&self.shape))
    }

    /// Zero a vector and return it to the free list.
    pub(crate) fn release(&self, mut precons: Precons) {
        precons.clear();
        self.free.lock().push(precons);
    }
}
