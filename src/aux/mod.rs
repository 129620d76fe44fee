//! Auxiliary OS threads and the bounded queues they hand work off through.
//! Keyboard reads, virtio device I/O, and the GDB server all block on real
//! OS calls, so they run on their own threads rather than inside the
//! coordinator's cooperative loop (§5).

pub mod gdb;
pub mod keyboard;
pub mod virtio_io;

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// A small SPSC-oriented bounded queue with its own mutex and a pair of
/// condition variables, one per end. Independent of the codec's
/// `PairedQueue` -- this one crosses real threads.
pub struct BoundedQueue<T> {
    inner: Mutex<VecDeque<T>>,
    not_full: Condvar,
    not_empty: Condvar,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Self {
        BoundedQueue {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            capacity,
        }
    }

    /// Blocks until there is room, then pushes.
    pub fn push_blocking(&self, value: T) {
        let mut guard = self.inner.lock().unwrap();
        while guard.len() >= self.capacity {
            guard = self.not_full.wait(guard).unwrap();
        }
        guard.push_back(value);
        self.not_empty.notify_one();
    }

    /// Blocks until an item is present, then pops it.
    pub fn pop_blocking(&self) -> T {
        let mut guard = self.inner.lock().unwrap();
        while guard.is_empty() {
            guard = self.not_empty.wait(guard).unwrap();
        }
        let value = guard.pop_front().unwrap();
        self.not_full.notify_one();
        value
    }

    /// Non-blocking pop, for the coordinator's cooperative turns.
    pub fn pop_nb(&self) -> Option<T> {
        let mut guard = self.inner.lock().unwrap();
        let value = guard.pop_front();
        if value.is_some() {
            self.not_full.notify_one();
        }
        value
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn push_then_pop_nb() {
        let q: BoundedQueue<u8> = BoundedQueue::new(4);
        assert_eq!(q.pop_nb(), None);
        q.push_blocking(7);
        assert_eq!(q.pop_nb(), Some(7));
    }

    #[test]
    fn blocks_until_item_available() {
        let q = Arc::new(BoundedQueue::new(2));
        let q2 = q.clone();
        let handle = thread::spawn(move || q2.pop_blocking());
        q.push_blocking(42u32);
        assert_eq!(handle.join().unwrap(), 42);
    }
}
