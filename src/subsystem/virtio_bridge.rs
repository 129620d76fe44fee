//! Virtio MMIO bridge: the guest's emulated device library issues MMIO
//! reads/writes over the register channels; this subsystem turns those
//! into calls on an `EmulatedDevice` and ships responses back in request
//! order, with a separate IRQ-to-HW channel so notifications never get
//! mixed into the response stream.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::channel::{chan_get_nb, chan_put, ChannelDir};
use crate::constants::{CHAN_H2H_VIRTIO_IRQ, CHAN_H2H_VIRTIO_RESP, CHAN_H2S_VIRTIO_REQ};
use crate::error::{BridgeError, Result};
use crate::link::Link;
use crate::subsystem::Subsystem;
use crate::transport::ByteTransport;

/// The guest-visible register file the virtio device library reads/writes.
/// The real TinyEmu bridge implements this against its own device model;
/// this crate only needs the trait boundary plus a loopback stub (see
/// `testkit::LoopbackDevice`) for independent testing.
pub trait EmulatedDevice: Send {
    fn mmio_read(&mut self, offset: u32) -> u32;
    fn mmio_write(&mut self, offset: u32, data: u32);
}

/// Captures only the IRQ queue handle, so the device library gets a
/// one-way edge into the bridge instead of a pointer to the whole thing.
#[derive(Clone)]
pub struct IrqTrampoline {
    pending: Arc<AtomicUsize>,
}

impl IrqTrampoline {
    pub fn new() -> Self {
        IrqTrampoline {
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn raise(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of IRQs raised but not yet drained by a `VirtioBridge` turn.
    /// Mainly for tests and pump implementations that want to observe the
    /// trampoline from outside the bridge.
    pub fn pending_count(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

pub struct VirtioBridge {
    device: Box<dyn EmulatedDevice>,
    irq: IrqTrampoline,
}

impl VirtioBridge {
    pub fn new(device: Box<dyn EmulatedDevice>, irq: IrqTrampoline) -> Self {
        VirtioBridge { device, irq }
    }

    fn handle_request<T: ByteTransport>(&mut self, link: &mut Link<T>, addr_word: u32) -> Result<()> {
        let is_write = addr_word & 1 != 0;
        let offset = addr_word & !0x3;
        if is_write {
            let data_word = busy_wait_for_word(link, CHAN_H2S_VIRTIO_REQ)?;
            self.device.mmio_write(offset, data_word);
            chan_put(link, ChannelDir::HostToHw, CHAN_H2H_VIRTIO_RESP, 0)?;
        } else {
            let value = self.device.mmio_read(offset);
            chan_put(link, ChannelDir::HostToHw, CHAN_H2H_VIRTIO_RESP, value)?;
        }
        Ok(())
    }
}

fn busy_wait_for_word<T: ByteTransport>(link: &mut Link<T>, chan: u32) -> Result<u32> {
    use crate::constants::CHAN_POLL_SPIN_LIMIT;
    for _ in 0..CHAN_POLL_SPIN_LIMIT {
        if let Some(word) = chan_get_nb(link, ChannelDir::HwToHost, chan)? {
            return Ok(word);
        }
    }
    Err(BridgeError::PollTimeout(format!(
        "virtio request's second word never arrived on channel {}",
        chan
    )))
}

impl<T: ByteTransport> Subsystem<T> for VirtioBridge {
    fn turn(&mut self, link: &mut Link<T>) -> Result<bool> {
        if let Some(addr_word) = chan_get_nb(link, ChannelDir::HwToHost, CHAN_H2S_VIRTIO_REQ)? {
            self.handle_request(link, addr_word)?;
            return Ok(true);
        }
        if self.irq.pending.load(Ordering::SeqCst) > 0 {
            self.irq.pending.fetch_sub(1, Ordering::SeqCst);
            chan_put(link, ChannelDir::HostToHw, CHAN_H2H_VIRTIO_IRQ, 1)?;
            return Ok(true);
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{LRdData32, LWrResp, WireRecord};
    use crate::transport::LoopbackTransport;

    struct ToyDevice {
        regs: [u32; 4],
        writes: Vec<(u32, u32)>,
    }

    impl EmulatedDevice for ToyDevice {
        fn mmio_read(&mut self, offset: u32) -> u32 {
            self.regs[(offset >> 2) as usize & 3]
        }
        fn mmio_write(&mut self, offset: u32, data: u32) {
            self.writes.push((offset, data));
        }
    }

    fn frame(mut payload: Vec<u8>, tag: u8) -> Vec<u8> {
        let mut out = vec![0u8, 0, 0, 0, 0, 0, 0, tag];
        out.append(&mut payload);
        out[0] = out.len() as u8;
        out
    }

    fn rd_data_frame(value: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        LRdData32 { data: value, resp: 0 }.encode(&mut bytes);
        frame(bytes, 4)
    }

    fn wr_resp_frame() -> Vec<u8> {
        let mut bytes = Vec::new();
        LWrResp { resp: 0 }.encode(&mut bytes);
        frame(bytes, 3)
    }

    #[test]
    fn read_request_answers_with_register_value() {
        let mut transport = LoopbackTransport::new();
        // chan_get_nb(req): avail peek, then data peek.
        transport.inject(&rd_data_frame(1));
        transport.inject(&rd_data_frame(0x40000008));
        // chan_put(resp): avail peek, then data poke.
        transport.inject(&rd_data_frame(1));
        transport.inject(&wr_resp_frame());
        let mut link = Link::new(transport);

        let device = ToyDevice {
            regs: [0, 0, 0xAA55, 0],
            writes: Vec::new(),
        };
        let mut bridge = VirtioBridge::new(Box::new(device), IrqTrampoline::new());
        assert!(<VirtioBridge as Subsystem<LoopbackTransport>>::turn(&mut bridge, &mut link).unwrap());
    }
}
