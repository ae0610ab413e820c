//! Fixed-capacity rolling history.
//!
//! Pushing into a full buffer overwrites the oldest entry. Storage is
//! allocated once, on the first fill; afterwards pushes never allocate.

use parking_lot::Mutex;

#[derive(Debug)]
struct RingInner<T> {
    slots: Vec<T>,
    /// Index of the oldest entry once the buffer is full.
    head: usize,
}

/// Thread-safe bounded buffer that keeps the most recent `capacity` items.
#[derive(Debug)]
pub struct RingBuffer<T> {
    capacity: usize,
    inner: Mutex<RingInner<T>>,
}

impl<T: Clone> RingBuffer<T> {
    /// Create a buffer. A capacity of zero is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            inner: Mutex::new(RingInner {
                slots: Vec::with_capacity(capacity),
                head: 0,
            }),
        }
    }

    /// Append an item, evicting the oldest when full.
    pub fn push(&self, item: T) {
        let mut inner = self.inner.lock();
        Self::push_locked(&mut inner, self.capacity, item);
    }

    /// Append several items under one lock.
    pub fn extend<I: IntoIterator<Item = T>>(&self, items: I) {
        let mut inner = self.inner.lock();
        for item in items {
            Self::push_locked(&mut inner, self.capacity, item);
        }
    }

    fn push_locked(inner: &mut RingInner<T>, capacity: usize, item: T) {
        if inner.slots.len() < capacity {
            inner.slots.push(item);
            return;
        }
        let head = inner.head;
        if let Some(slot) = inner.slots.get_mut(head) {
            *slot = item;
        }
        inner.head = (head + 1) % capacity;
    }

    /// Copy of the contents, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        let inner = self.inner.lock();
        let head = inner.head;
        inner
            .slots
            .iter()
            .skip(head)
            .chain(inner.slots.iter().take(head))
            .cloned()
            .collect()
    }

    /// Most recently pushed item.
    #[must_use]
    pub fn latest(&self) -> Option<T> {
        let inner = self.inner.lock();
        if inner.slots.len() < self.capacity || inner.head == 0 {
            inner.slots.last().cloned()
        } else {
            inner.slots.get(inner.head - 1).cloned()
        }
    }

    /// Number of stored items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().slots.len()
    }

    /// Whether nothing has been pushed since creation or the last clear.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().slots.is_empty()
    }

    /// Maximum number of stored items.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every item, keeping the allocation.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.slots.clear();
        inner.head = 0;
    }
}
