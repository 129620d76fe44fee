//! In-process mock hardware used by both unit and integration tests. Not
//! `#[cfg(test)]`-gated because `tests/` integration binaries are separate
//! crates and can't see test-only items from the library; this module is
//! small and its only job is test support, so it stays always-compiled.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::aux::virtio_io::IoPump;
use crate::subsystem::virtio_bridge::{EmulatedDevice, IrqTrampoline};

/// A byte-addressable register file of configurable width, standing in
/// for the real TinyEmu-backed virtio device model.
pub struct LoopbackDevice {
    registers: Vec<u32>,
}

impl LoopbackDevice {
    pub fn new(register_count: usize) -> Self {
        LoopbackDevice {
            registers: vec![0; register_count],
        }
    }

    fn index(&self, offset: u32) -> usize {
        (offset as usize / 4) % self.registers.len()
    }
}

impl EmulatedDevice for LoopbackDevice {
    fn mmio_read(&mut self, offset: u32) -> u32 {
        let idx = self.index(offset);
        self.registers[idx]
    }

    fn mmio_write(&mut self, offset: u32, data: u32) {
        let idx = self.index(offset);
        self.registers[idx] = data;
    }
}

/// A real (non-`IdlePump`) `IoPump`: services a queue of simulated device
/// completions, the way a real block/network pump drains its own
/// descriptor ring, and raises one IRQ per completion serviced. Stands in
/// for the TinyEmu bridge's own multi-fd wait (`src/interrupts.rs` in the
/// teacher drives its own completion queue the same way, off a dedicated
/// thread that raises an interrupt per unit of work).
pub struct LoopbackIoPump {
    completions: Arc<Mutex<VecDeque<u32>>>,
    irq: IrqTrampoline,
}

impl LoopbackIoPump {
    pub fn new(completions: Arc<Mutex<VecDeque<u32>>>, irq: IrqTrampoline) -> Self {
        LoopbackIoPump { completions, irq }
    }
}

impl IoPump for LoopbackIoPump {
    fn pump_once(&mut self) -> bool {
        let serviced = self.completions.lock().unwrap().pop_front().is_some();
        if serviced {
            self.irq.raise();
        }
        serviced
    }
}
