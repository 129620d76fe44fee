//! Debug-module bridge: ferries DMI requests from the GDB server thread to
//! the debug-module channel and DMI responses back, one outstanding
//! request at a time (sufficient since GDB's own wire protocol is serial).

use std::sync::Arc;

use crate::aux::BoundedQueue;
use crate::channel::{chan_get_nb, chan_put, ChannelDir};
use crate::constants::{CHAN_H2H_DEBUG_REQ, CHAN_H2S_DEBUG_RESP};
use crate::error::Result;
use crate::link::Link;
use crate::subsystem::Subsystem;
use crate::transport::ByteTransport;

const OP_READ: u8 = 0;
const OP_WRITE: u8 = 1;

#[derive(Debug, Clone, Copy)]
pub struct DmiRequest {
    pub is_write: bool,
    pub addr: u32,
    pub data: u32,
}

pub struct DebugBridge {
    requests: Arc<BoundedQueue<DmiRequest>>,
    responses: Arc<BoundedQueue<u32>>,
}

impl DebugBridge {
    pub fn new(requests: Arc<BoundedQueue<DmiRequest>>, responses: Arc<BoundedQueue<u32>>) -> Self {
        DebugBridge { requests, responses }
    }
}

impl<T: ByteTransport> Subsystem<T> for DebugBridge {
    fn turn(&mut self, link: &mut Link<T>) -> Result<bool> {
        let mut did_work = false;

        if let Some(req) = self.requests.pop_nb() {
            let op = if req.is_write { OP_WRITE } else { OP_READ };
            let header = ((op as u32) << 24) | (req.addr & 0x00FF_FFFF);
            chan_put(link, ChannelDir::HostToHw, CHAN_H2H_DEBUG_REQ, header)?;
            if req.is_write {
                chan_put(link, ChannelDir::HostToHw, CHAN_H2H_DEBUG_REQ, req.data)?;
            }
            did_work = true;
        }

        if let Some(word) = chan_get_nb(link, ChannelDir::HwToHost, CHAN_H2S_DEBUG_RESP)? {
            self.responses.push_blocking(word);
            did_work = true;
        }

        Ok(did_work)
    }
}
