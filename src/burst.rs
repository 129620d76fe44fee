//! AXI4 burst adapter: implements burst_read/burst_write on top of the
//! framing engine's address/data/response queues.

use crate::codec::{RdAddr64, WrAddr64, WrData512};
use crate::constants::{BEAT_BYTES, BURST_PAGE_BYTES, RESP_OKAY};
use crate::error::{BridgeError, Result};
use crate::framing::{TAG_RD_ADDR, TAG_WR_ADDR, TAG_WR_DATA};
use crate::link::Link;
use crate::transport::ByteTransport;

fn check_alignment(address: u64, size: usize) -> Result<()> {
    if address % BEAT_BYTES as u64 != 0 {
        return Err(BridgeError::InvalidArgument(format!(
            "burst address {:#x} is not 64-byte aligned",
            address
        )));
    }
    if size == 0 {
        return Err(BridgeError::InvalidArgument("burst size must be nonzero".into()));
    }
    let last = address + size as u64 - 1;
    if address / BURST_PAGE_BYTES != last / BURST_PAGE_BYTES {
        return Err(BridgeError::InvalidArgument(format!(
            "burst [{:#x}, {:#x}] crosses a 4096-byte page boundary",
            address, last
        )));
    }
    Ok(())
}

fn beats_for(size: usize) -> usize {
    (size + BEAT_BYTES - 1) / BEAT_BYTES
}

/// Reads `size` bytes starting at `address` into `buffer`. `buffer` must be
/// at least `size` bytes long.
pub fn burst_read<T: ByteTransport>(link: &mut Link<T>, buffer: &mut [u8], size: usize, address: u64) -> Result<()> {
    check_alignment(address, size)?;
    let beats = beats_for(size);

    link.drain_until_sent(TAG_RD_ADDR, |e| {
        e.push_rd_addr(RdAddr64 {
            id: 0,
            addr: address,
            len: (beats - 1) as u8,
            size: 6,
            burst: 1,
            lock: 0,
            cache: 0,
            prot: 0,
            qos: 0,
            region: 0,
        })
    })?;

    for beat in 0..beats {
        let data = link.drain_for_rd_data()?;
        if data.resp != RESP_OKAY {
            return Err(BridgeError::TransportFault(format!(
                "burst read at {:#x} beat {} got resp {}",
                address, beat, data.resp
            )));
        }
        let want_last = beat == beats - 1;
        if (data.last != 0) != want_last {
            return Err(BridgeError::TransportFault(format!(
                "burst read at {:#x} beat {} last-bit mismatch",
                address, beat
            )));
        }
        let offset = beat * BEAT_BYTES;
        let copy_len = (size - offset).min(BEAT_BYTES);
        buffer[offset..offset + copy_len].copy_from_slice(&data.data[..copy_len]);
    }
    Ok(())
}

/// Writes `size` bytes from `buffer` to `address`.
pub fn burst_write<T: ByteTransport>(link: &mut Link<T>, buffer: &[u8], size: usize, address: u64) -> Result<()> {
    check_alignment(address, size)?;
    let beats = beats_for(size);

    link.drain_until_sent(TAG_WR_ADDR, |e| {
        e.push_wr_addr(WrAddr64 {
            id: 0,
            addr: address,
            len: (beats - 1) as u8,
            size: 6,
            burst: 1,
            lock: 0,
            cache: 0,
            prot: 0,
            qos: 0,
            region: 0,
        })
    })?;

    for beat in 0..beats {
        let offset = beat * BEAT_BYTES;
        let copy_len = (size - offset).min(BEAT_BYTES);
        let mut data = [0u8; BEAT_BYTES];
        data[..copy_len].copy_from_slice(&buffer[offset..offset + copy_len]);
        let last = beat == beats - 1;
        link.drain_until_sent(TAG_WR_DATA, |e| {
            e.push_wr_data(WrData512 {
                data,
                strb: u64::MAX,
                last: last as u8,
            })
        })?;
    }

    let resp = link.drain_for_wr_resp()?;
    if resp.resp != RESP_OKAY {
        return Err(BridgeError::TransportFault(format!(
            "burst write at {:#x} got resp {}",
            address, resp.resp
        )));
    }
    Ok(())
}
