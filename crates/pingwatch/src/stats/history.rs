use std::collections::VecDeque;

/// Fixed-capacity FIFO buffer
///
/// Pushing onto a full buffer evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct BoundedHistory<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedHistory<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { entries: VecDeque::with_capacity(capacity), capacity }
    }

    /// Append `value`, returning the evicted entry if the buffer was full
    pub fn push(&mut self, value: T) -> Option<T> {
        let evicted = if self.entries.len() == self.capacity { self.entries.pop_front() } else { None };
        self.entries.push_back(value);
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.entries.iter()
    }

    /// The newest `n` entries, oldest first
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &T> {
        self.entries.iter().skip(self.entries.len().saturating_sub(n))
    }

    pub fn oldest(&self) -> Option<&T> {
        self.entries.front()
    }

    pub fn newest(&self) -> Option<&T> {
        self.entries.back()
    }
}

impl<T: Clone> BoundedHistory<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }
}
