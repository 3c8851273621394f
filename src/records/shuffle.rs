use rand::Rng;

/// Bounded random-shuffle buffer.
///
/// Producers push until the buffer holds `capacity` items. `pop` returns a
/// uniformly random item, but only while more than `min_after_dequeue` items
/// remain buffered, so that every dequeue draws from a well-mixed pool. Once
/// closed, the buffer drains completely.
pub struct ShuffleQueue<T, R> {
    items: Vec<T>,
    capacity: usize,
    min_after_dequeue: usize,
    closed: bool,
    rng: R,
}

impl<T, R: Rng> ShuffleQueue<T, R> {
    /// # Panics
    /// Panics unless `min_after_dequeue < capacity`.
    pub fn new(capacity: usize, min_after_dequeue: usize, rng: R) -> Self {
        assert!(
            min_after_dequeue < capacity,
            "min_after_dequeue ({}) must be below capacity ({})",
            min_after_dequeue,
            capacity
        );
        ShuffleQueue {
            items: Vec::with_capacity(capacity),
            capacity,
            min_after_dequeue,
            closed: false,
            rng,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// # Panics
    /// Panics when the queue is full or closed.
    pub fn push(&mut self, item: T) {
        assert!(!self.closed, "push on a closed ShuffleQueue");
        assert!(!self.is_full(), "push on a full ShuffleQueue");
        self.items.push(item);
    }

    /// Stops accepting items; subsequent pops drain the buffer.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn pop(&mut self) -> Option<T> {
        let available = if self.closed {
            !self.items.is_empty()
        } else {
            self.items.len() > self.min_after_dequeue
        };
        if !available {
            return None;
        }
        let i = self.rng.gen_range(0..self.items.len());
        Some(self.items.swap_remove(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn holds_back_min_after_dequeue_until_closed() {
        let mut q = ShuffleQueue::new(4, 2, StdRng::seed_from_u64(0));
        for i in 0..4 {
            q.push(i);
        }
        assert!(q.is_full());
        assert!(q.pop().is_some());
        assert!(q.pop().is_some());
        assert_eq!(q.pop(), None);
        q.close();
        assert!(q.pop().is_some());
        assert!(q.pop().is_some());
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn drains_every_item_exactly_once() {
        let mut q = ShuffleQueue::new(8, 3, StdRng::seed_from_u64(11));
        let mut out = Vec::new();
        for i in 0..50 {
            if q.is_full() {
                while let Some(x) = q.pop() {
                    out.push(x);
                }
            }
            q.push(i);
        }
        q.close();
        while let Some(x) = q.pop() {
            out.push(x);
        }
        let mut sorted = out.clone();
        sorted.sort();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
        assert_ne!(out, sorted, "order should be shuffled");
    }

    #[test]
    #[should_panic]
    fn rejects_min_not_below_capacity() {
        let _ = ShuffleQueue::<u8, _>::new(2, 2, StdRng::seed_from_u64(0));
    }
}
