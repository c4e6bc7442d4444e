//! Bounded FIFO of past corrected frames.

use crate::imgproc::Plane;
use std::collections::VecDeque;

/// Fixed-capacity history, oldest entry at the front.
///
/// Insertion appends at the tail; once the buffer is full the head is
/// evicted and its allocation is reused for the new entry.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    frames: VecDeque<Plane>,
    capacity: usize,
}

impl HistoryBuffer {
    /// Creates an empty history. A zero capacity is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a copy of `frame`, evicting the oldest entry when full.
    pub fn push(&mut self, frame: &Plane) {
        let recycled = if self.frames.len() >= self.capacity {
            self.frames.pop_front()
        } else {
            None
        };

        let entry = match recycled {
            Some(mut old) if old.dimensions() == frame.dimensions() => {
                old.data_mut().copy_from_slice(frame.data());
                old
            }
            _ => frame.clone(),
        };
        self.frames.push_back(entry);
    }

    /// Iterates from oldest to newest.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Plane> {
        self.frames.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_exceeds_capacity() {
        let mut history = HistoryBuffer::new(3);
        for i in 0..10 {
            history.push(&Plane::filled(2, 2, i as f32));
            assert!(history.len() <= 3);
        }
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_evicts_oldest_first() {
        let mut history = HistoryBuffer::new(2);
        history.push(&Plane::filled(1, 1, 1.0));
        history.push(&Plane::filled(1, 1, 2.0));
        history.push(&Plane::filled(1, 1, 3.0));

        let values: Vec<f32> = history.iter().map(|p| p.get(0, 0)).collect();
        assert_eq!(values, vec![2.0, 3.0]);
    }

    #[test]
    fn test_zero_capacity_raised() {
        let mut history = HistoryBuffer::new(0);
        assert_eq!(history.capacity(), 1);
        history.push(&Plane::zeros(1, 1));
        history.push(&Plane::zeros(1, 1));
        assert_eq!(history.len(), 1);
    }
}
