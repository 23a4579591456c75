//! Fixed-capacity FIFO ring buffer.

/// Keeps the most recent `capacity` items, evicting the oldest on overflow.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    items: Vec<T>,
    /// Index of the oldest item once the buffer has wrapped
    head: usize,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Vec::with_capacity(capacity),
            head: 0,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append an item, returning the evicted one when full.
    pub fn push(&mut self, item: T) -> Option<T> {
        if self.items.len() < self.capacity {
            self.items.push(item);
            return None;
        }
        let evicted = std::mem::replace(&mut self.items[self.head], item);
        self.head = (self.head + 1) % self.capacity;
        Some(evicted)
    }

    /// Most recently pushed item.
    pub fn last(&self) -> Option<&T> {
        if self.items.is_empty() {
            return None;
        }
        let index = (self.head + self.items.len() - 1) % self.items.len();
        self.items.get(index)
    }

    /// Items from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let (newer, older) = self.items.split_at(self.head);
        older.iter().chain(newer.iter())
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.head = 0;
    }
}

impl<T: Clone> RingBuffer<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}
