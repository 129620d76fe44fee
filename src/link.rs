//! Glues the framing engine to a byte transport: one `pump` drives at most
//! one outgoing packet and one incoming packet through the wire. Burst and
//! register adapters call this in a loop ("drive the framing engine" in
//! the spec's words) until the condition they are waiting for is met.

use crate::codec::{LRdData32, LWrResp, RdData512, WrResp16};
use crate::constants::CHAN_POLL_SPIN_LIMIT;
use crate::error::{BridgeError, Result};
use crate::framing::FramingEngine;
use crate::transport::{ByteTransport, RecvOutcome};

/// Every packet carries a one-byte length prefix; frames are never larger
/// than a single Wr-Data-512 payload plus header.
const MAX_PACKET_BYTES: usize = 255;

pub struct Link<T: ByteTransport> {
    pub engine: FramingEngine,
    transport: T,
}

impl<T: ByteTransport> Link<T> {
    pub fn new(transport: T) -> Self {
        Link {
            engine: FramingEngine::new(),
            transport,
        }
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Sends one outgoing packet if there is one, then makes one
    /// non-blocking attempt to receive and decode an incoming packet.
    /// Returns `true` if either direction did work.
    pub fn pump(&mut self) -> Result<bool> {
        let mut did_work = false;

        if let Some(packet) = self.engine.build_outgoing_packet() {
            self.transport.send(&packet)?;
            did_work = true;
        }

        match self.transport.recv_poll(1)? {
            RecvOutcome::Unavailable => {}
            RecvOutcome::Ready(first) => {
                let declared_len = first[0] as usize;
                if declared_len == 0 || declared_len > MAX_PACKET_BYTES {
                    return Err(BridgeError::ProtocolFault(format!(
                        "implausible declared length {}",
                        declared_len
                    )));
                }
                let mut frame = first;
                if declared_len > 1 {
                    let rest = self.transport.recv_blocking(declared_len - 1)?;
                    frame.extend_from_slice(&rest);
                }
                self.engine.consume_incoming_packet(&frame)?;
                did_work = true;
            }
        }

        Ok(did_work)
    }

    /// Busy-waits, pumping the link, until `want` returns `Some`, or until
    /// the bounded spin budget is exhausted.
    pub fn drain_until<R>(&mut self, mut want: impl FnMut(&mut FramingEngine) -> Option<R>) -> Result<R> {
        for _ in 0..CHAN_POLL_SPIN_LIMIT {
            if let Some(v) = want(&mut self.engine) {
                return Ok(v);
            }
            self.pump()?;
        }
        Err(BridgeError::PollTimeout(
            "framing engine drain exceeded spin budget".into(),
        ))
    }

    pub fn drain_for_wr_resp(&mut self) -> Result<WrResp16> {
        self.drain_until(|e| e.take_wr_resp())
    }

    pub fn drain_for_rd_data(&mut self) -> Result<RdData512> {
        self.drain_until(|e| e.take_rd_data())
    }

    pub fn drain_for_lwr_resp(&mut self) -> Result<LWrResp> {
        self.drain_until(|e| e.take_lwr_resp())
    }

    pub fn drain_for_lrd_data(&mut self) -> Result<LRdData32> {
        self.drain_until(|e| e.take_lrd_data())
    }

    /// Enqueues a host->HW record via `push`, then busy-waits until the
    /// framing engine has actually dequeued and sent it (send-credit
    /// available and it was the highest-priority non-empty queue).
    pub fn drain_until_sent(
        &mut self,
        tag: u8,
        push: impl FnOnce(&mut FramingEngine) -> Result<()>,
    ) -> Result<()> {
        push(&mut self.engine)?;
        let pending_before = self.engine.outgoing_len(tag);
        for _ in 0..CHAN_POLL_SPIN_LIMIT {
            if self.engine.outgoing_len(tag) < pending_before {
                return Ok(());
            }
            self.pump()?;
        }
        Err(BridgeError::PollTimeout(
            "framing engine send exceeded spin budget".into(),
        ))
    }
}
