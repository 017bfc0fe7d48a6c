//! Fixed-capacity circular sample buffer.
//!
//! The buffer is full from creation: every slot starts at `T::default()`,
//! which the scorer reads as "no sample". Writes go to the cursor and
//! overwrite the oldest slot.

use serde::Serialize;

/// Number of recent observations kept per backend.
pub const SAMPLE_CAPACITY: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingBuffer<T> {
    slots: Vec<T>,
    cursor: usize,
}

impl<T: Copy + Default + PartialEq> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be non-zero");
        Self {
            slots: vec![T::default(); capacity],
            cursor: 0,
        }
    }

    /// Overwrite the oldest slot and advance the cursor.
    pub fn push(&mut self, value: T) {
        self.slots[self.cursor] = value;
        self.cursor = (self.cursor + 1) % self.slots.len();
    }

    /// Always equal to the capacity.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slots from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let (newer, older) = self.slots.split_at(self.cursor);
        older.iter().chain(newer.iter())
    }

    /// Slots holding a real sample, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = T> + '_ {
        let empty = T::default();
        self.iter().copied().filter(move |v| *v != empty)
    }

    pub fn count_nonzero(&self) -> usize {
        self.samples().count()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().copied().collect()
    }
}

impl<T: Copy + Default + PartialEq> Default for RingBuffer<T> {
    fn default() -> Self {
        Self::new(SAMPLE_CAPACITY)
    }
}

impl<T: Copy + Default + PartialEq + Serialize> Serialize for RingBuffer<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}
