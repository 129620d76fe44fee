//! Virtio I/O pump thread: services the emulated device library's own
//! file descriptors (network tap, block device, console) independent of
//! the coordinator's register-level MMIO turns. Always started when any
//! device is configured, per the resolved open question in `DESIGN.md`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// The device library's I/O step. Real block/network devices implement
/// this against their own descriptor sets; the loopback stub's is a no-op.
pub trait IoPump: Send {
    /// Services pending I/O once; returns `true` if it did anything so the
    /// pump can back off when idle instead of spinning.
    fn pump_once(&mut self) -> bool;
}

const IDLE_BACKOFF: Duration = Duration::from_millis(1);

pub struct VirtioIoThread {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl VirtioIoThread {
    pub fn spawn(mut pump: Box<dyn IoPump>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = stop.clone();
        let handle = thread::spawn(move || {
            while !worker_stop.load(Ordering::Relaxed) {
                if !pump.pump_once() {
                    thread::sleep(IDLE_BACKOFF);
                }
            }
        });
        VirtioIoThread {
            stop,
            handle: Some(handle),
        }
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

impl Drop for VirtioIoThread {
    fn drop(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingPump(Arc<AtomicUsize>);
    impl IoPump for CountingPump {
        fn pump_once(&mut self) -> bool {
            self.0.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    #[test]
    fn pump_runs_until_stopped() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut thread = VirtioIoThread::spawn(Box::new(CountingPump(count.clone())));
        while count.load(Ordering::SeqCst) < 3 {
            std::thread::yield_now();
        }
        thread.stop();
        assert!(count.load(Ordering::SeqCst) >= 3);
    }
}
