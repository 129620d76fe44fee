//! Paired ring-buffer queues. Mirrors the original `SimpleQueue` (capacity N,
//! backing storage N+1, head/size bookkeeping) but returns `Option` on an
//! empty dequeue rather than the C original's unchecked read of stale
//! storage -- see the Open Questions resolution in `DESIGN.md`.

/// A single-producer single-consumer ring buffer of fixed capacity.
///
/// Used for both the host->HW (capacity 16, six record types) and HW->host
/// (capacity 128, four record types) queue banks. One `PairedQueue` holds
/// exactly one record type; the bank itself is just an array of these kept
/// by the framing engine.
pub struct PairedQueue<T> {
    storage: Vec<Option<T>>,
    head: usize,
    size: usize,
    capacity: usize,
}

impl<T> PairedQueue<T> {
    pub fn new(capacity: usize) -> Self {
        let mut storage = Vec::with_capacity(capacity);
        storage.resize_with(capacity, || None);
        PairedQueue {
            storage,
            head: 0,
            size: 0,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn is_full(&self) -> bool {
        self.size == self.capacity
    }

    pub fn free_slots(&self) -> usize {
        self.capacity - self.size
    }

    /// Returns `false` without mutating the queue if it is already full.
    pub fn enqueue(&mut self, value: T) -> bool {
        if self.is_full() {
            return false;
        }
        let tail = (self.head + self.size) % self.capacity;
        self.storage[tail] = Some(value);
        self.size += 1;
        true
    }

    /// Returns `None` if the queue is empty, rather than reading garbage.
    pub fn dequeue(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let slot = self.storage[self.head].take();
        self.head = (self.head + 1) % self.capacity;
        self.size -= 1;
        slot
    }
}
