//! Keyboard reader thread: blocks on standard input and feeds a bounded
//! byte queue the terminal subsystem drains from on the coordinator's
//! thread. A condition variable (inside `BoundedQueue`) signals drainage
//! so the reader can refill without busy-waiting.

use std::io::{BufRead, BufReader};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::aux::BoundedQueue;
use crate::constants::KEYBOARD_BUFFER_CAPACITY;

pub struct KeyboardReader {
    queue: Arc<BoundedQueue<u8>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl KeyboardReader {
    /// Spawns the reader thread against an arbitrary `Read` source so tests
    /// can supply something other than real stdin.
    pub fn spawn<R: std::io::Read + Send + 'static>(source: R) -> Self {
        let queue = Arc::new(BoundedQueue::new(KEYBOARD_BUFFER_CAPACITY));
        let stop = Arc::new(AtomicBool::new(false));
        let worker_queue = queue.clone();
        let worker_stop = stop.clone();
        let handle = thread::spawn(move || {
            let mut reader = BufReader::new(source);
            let mut line = String::new();
            loop {
                if worker_stop.load(Ordering::Relaxed) {
                    return;
                }
                line.clear();
                match reader.read_line(&mut line) {
                    Ok(0) => return,
                    Ok(_) => {
                        for byte in line.bytes() {
                            if worker_stop.load(Ordering::Relaxed) {
                                return;
                            }
                            worker_queue.push_blocking(byte);
                        }
                    }
                    Err(e) => {
                        log::warn!("keyboard reader stopped: {}", e);
                        return;
                    }
                }
            }
        });
        KeyboardReader {
            queue,
            stop,
            handle: Some(handle),
        }
    }

    pub fn queue(&self) -> Arc<BoundedQueue<u8>> {
        self.queue.clone()
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

impl Drop for KeyboardReader {
    fn drop(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
