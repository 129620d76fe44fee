//! Channel multiplexer: many FIFO channels exposed over the register
//! adapter, eight bytes of address space each (`data` word, `avail` word).

use crate::constants::{chan_avail_addr, chan_data_addr, CHAN_POLL_SPIN_LIMIT};
use crate::error::{BridgeError, Result};
use crate::link::Link;
use crate::register::{peek, poke};
use crate::transport::ByteTransport;

/// Which bank a channel id is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelDir {
    HostToHw,
    HwToHost,
}

fn base_for(dir: ChannelDir) -> u32 {
    match dir {
        ChannelDir::HostToHw => crate::constants::CHAN_BASE_HOST_TO_HW,
        ChannelDir::HwToHost => crate::constants::CHAN_BASE_HW_TO_HOST,
    }
}

/// Busy-polls `avail` until it reads 1, then pokes `word` into `data`.
pub fn chan_put<T: ByteTransport>(link: &mut Link<T>, dir: ChannelDir, chan: u32, word: u32) -> Result<()> {
    let base = base_for(dir);
    let avail_addr = chan_avail_addr(base, chan);
    for _ in 0..CHAN_POLL_SPIN_LIMIT {
        if peek(link, avail_addr)? != 0 {
            return poke(link, chan_data_addr(base, chan), word);
        }
    }
    Err(BridgeError::PollTimeout(format!(
        "channel {} on {:?} never became available for a write",
        chan, dir
    )))
}

/// Non-blocking: `None` if `avail` reads 0, else `Some(data)`.
pub fn chan_get_nb<T: ByteTransport>(link: &mut Link<T>, dir: ChannelDir, chan: u32) -> Result<Option<u32>> {
    let base = base_for(dir);
    if peek(link, chan_avail_addr(base, chan))? == 0 {
        return Ok(None);
    }
    Ok(Some(peek(link, chan_data_addr(base, chan))?))
}
