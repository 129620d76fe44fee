//! AXI4-Lite register adapter: single-beat `peek`/`poke` through the
//! framing engine's lite queues.

use crate::codec::{LRdAddr32, LWrAddr32, LWrData32};
use crate::constants::RESP_OKAY;
use crate::error::{BridgeError, Result};
use crate::framing::{TAG_LRD_ADDR, TAG_LWR_ADDR, TAG_LWR_DATA};
use crate::link::Link;
use crate::transport::ByteTransport;

pub fn peek<T: ByteTransport>(link: &mut Link<T>, address: u32) -> Result<u32> {
    link.drain_until_sent(TAG_LRD_ADDR, |e| e.push_lrd_addr(LRdAddr32 { addr: address, prot: 0 }))?;
    let resp = link.drain_for_lrd_data()?;
    if resp.resp != RESP_OKAY {
        return Err(BridgeError::TransportFault(format!(
            "register read at {:#x} got resp {}",
            address, resp.resp
        )));
    }
    Ok(resp.data)
}

pub fn poke<T: ByteTransport>(link: &mut Link<T>, address: u32, word: u32) -> Result<()> {
    link.drain_until_sent(TAG_LWR_ADDR, |e| e.push_lwr_addr(LWrAddr32 { addr: address, prot: 0 }))?;
    link.drain_until_sent(TAG_LWR_DATA, |e| e.push_lwr_data(LWrData32 { data: word, strb: 0x0F }))?;
    let resp = link.drain_for_lwr_resp()?;
    if resp.resp != RESP_OKAY {
        return Err(BridgeError::TransportFault(format!(
            "register write at {:#x} got resp {}",
            address, resp.resp
        )));
    }
    Ok(())
}
