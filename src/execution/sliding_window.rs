use std::collections::VecDeque;

use crate::error::{SignalError, SignalResult};

/// Fixed-capacity FIFO history of samples
///
/// Once full, every push evicts the oldest sample.
#[derive(Debug, Clone)]
pub struct SlidingWindow<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> SlidingWindow<T> {
    /// Create a new window
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of samples to keep, at least 1
    pub fn new(capacity: usize) -> SignalResult<Self> {
        if capacity == 0 {
            return Err(SignalError::config("window capacity must be at least 1"));
        }

        Ok(Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Add a sample, removing the oldest if the window is full
    ///
    /// Returns the evicted sample, which `undo_push` needs to restore.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    /// Take back the latest push, putting its evicted sample back in front
    pub fn undo_push(&mut self, evicted: Option<T>) -> Option<T> {
        let newest = self.items.pop_back();
        if let Some(item) = evicted {
            self.items.push_front(item);
        }
        newest
    }

    pub fn peek_first(&self) -> Option<&T> {
        self.items.front()
    }

    pub fn peek_last(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    /// Iterate oldest-first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T: Clone> SlidingWindow<T> {
    /// Point-in-time copy of the contents, oldest-first
    pub fn snapshot(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }

    /// The `n` most recent samples, oldest-first
    pub fn recent(&self, n: usize) -> Vec<T> {
        let skip = self.items.len().saturating_sub(n);
        self.items.iter().skip(skip).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_window() {
        let window: SlidingWindow<f64> = SlidingWindow::new(5).unwrap();
        assert_eq!(window.capacity(), 5);
        assert!(window.is_empty());
        assert!(window.peek_first().is_none());
        assert!(window.peek_last().is_none());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result: SignalResult<SlidingWindow<i8>> = SlidingWindow::new(0);
        assert!(result.unwrap_err().is_configuration());
    }

    #[test]
    fn test_push_and_peek() {
        let mut window = SlidingWindow::new(3).unwrap();
        window.push(100.0);
        window.push(101.0);

        assert_eq!(window.len(), 2);
        assert_eq!(window.peek_first(), Some(&100.0));
        assert_eq!(window.peek_last(), Some(&101.0));
    }

    #[test]
    fn test_capacity_limit() {
        let mut window = SlidingWindow::new(5).unwrap();

        for i in 0..10 {
            window.push(100 + i);
            assert!(window.len() <= 5);
        }

        // Should only keep the last 5
        assert_eq!(window.snapshot(), vec![105, 106, 107, 108, 109]);
        assert!(window.is_full());
    }

    #[test]
    fn test_capacity_one() {
        let mut window = SlidingWindow::new(1).unwrap();
        window.push("a");
        window.push("b");
        assert_eq!(window.snapshot(), vec!["b"]);
        assert_eq!(window.peek_first(), window.peek_last());
    }

    #[test]
    fn test_snapshot_does_not_alias() {
        let mut window = SlidingWindow::new(3).unwrap();
        window.push(1);
        window.push(2);

        let snapshot = window.snapshot();
        window.push(3);
        window.push(4);

        assert_eq!(snapshot, vec![1, 2]);
        assert_eq!(window.snapshot(), vec![2, 3, 4]);
    }

    #[test]
    fn test_recent() {
        let mut window = SlidingWindow::new(10).unwrap();
        for i in 0..10 {
            window.push(i);
        }

        assert_eq!(window.recent(3), vec![7, 8, 9]);
        assert_eq!(window.recent(50).len(), 10);
        assert!(window.recent(0).is_empty());
    }

    #[test]
    fn test_fifo_bound_for_many_capacities() {
        for capacity in 1..=12 {
            let mut window = SlidingWindow::new(capacity).unwrap();
            let total = capacity * 3 + 1;
            for i in 0..total {
                window.push(i);
                assert!(window.len() <= capacity);
            }
            let expected: Vec<usize> = (total - capacity..total).collect();
            assert_eq!(window.snapshot(), expected);
        }
    }

    #[test]
    fn test_undo_push_restores_evicted() {
        let mut window = SlidingWindow::new(3).unwrap();
        assert_eq!(window.push(1), None);
        window.push(2);
        window.push(3);

        let evicted = window.push(4);
        assert_eq!(evicted, Some(1));
        assert_eq!(window.undo_push(evicted), Some(4));
        assert_eq!(window.snapshot(), vec![1, 2, 3]);

        // Nothing was evicted while filling up
        let mut short = SlidingWindow::new(3).unwrap();
        short.push(1);
        let evicted = short.push(2);
        assert_eq!(short.undo_push(evicted), Some(2));
        assert_eq!(short.snapshot(), vec![1]);
    }

    #[test]
    fn test_clear() {
        let mut window = SlidingWindow::new(2).unwrap();
        window.push(1);
        window.clear();
        assert!(window.is_empty());
        assert_eq!(window.capacity(), 2);
    }
}
