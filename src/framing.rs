//! Credit/framing engine: turns the eight paired queues (six host->HW, four
//! HW->host) into wire packets and back. This is the host side only -- the
//! mirror state living in hardware is outside this crate's scope, but its
//! behavior is assumed symmetric for the round-trip laws tested below.

use crate::codec::{
    LRdAddr32, LRdData32, LWrAddr32, LWrData32, LWrResp, RdAddr64, RdData512, WireRecord,
    WrAddr64, WrData512, WrResp16,
};
use crate::error::{BridgeError, Result};
use crate::queue::PairedQueue;

const HOST_TO_HW_CAPACITY: usize = 16;
const HW_TO_HOST_CAPACITY: usize = 128;

/// Number of return-credit bytes riding in a host->HW packet header: one per
/// HW->host queue type.
const K_HOST_TO_HW: usize = 4;
/// Number of return-credit bytes riding in a HW->host packet header: one per
/// host->HW queue type.
const K_HW_TO_HOST: usize = 6;

/// Tag bytes for the six host->HW record types, also their fixed priority
/// order (address phases and AXI4 traffic ahead of AXI4-Lite, per §4.3).
pub const TAG_WR_ADDR: u8 = 1;
pub const TAG_WR_DATA: u8 = 2;
pub const TAG_RD_ADDR: u8 = 3;
pub const TAG_LWR_ADDR: u8 = 4;
pub const TAG_LWR_DATA: u8 = 5;
pub const TAG_LRD_ADDR: u8 = 6;

/// Tag bytes for the four HW->host record types.
const TAG_WR_RESP: u8 = 1;
const TAG_RD_DATA: u8 = 2;
const TAG_LWR_RESP: u8 = 3;
const TAG_LRD_DATA: u8 = 4;

struct HostToHwBank {
    wr_addr: PairedQueue<WrAddr64>,
    wr_data: PairedQueue<WrData512>,
    rd_addr: PairedQueue<RdAddr64>,
    lwr_addr: PairedQueue<LWrAddr32>,
    lwr_data: PairedQueue<LWrData32>,
    lrd_addr: PairedQueue<LRdAddr32>,
}

impl HostToHwBank {
    fn new() -> Self {
        HostToHwBank {
            wr_addr: PairedQueue::new(HOST_TO_HW_CAPACITY),
            wr_data: PairedQueue::new(HOST_TO_HW_CAPACITY),
            rd_addr: PairedQueue::new(HOST_TO_HW_CAPACITY),
            lwr_addr: PairedQueue::new(HOST_TO_HW_CAPACITY),
            lwr_data: PairedQueue::new(HOST_TO_HW_CAPACITY),
            lrd_addr: PairedQueue::new(HOST_TO_HW_CAPACITY),
        }
    }
}

struct HwToHostBank {
    wr_resp: PairedQueue<WrResp16>,
    rd_data: PairedQueue<RdData512>,
    lwr_resp: PairedQueue<LWrResp>,
    lrd_data: PairedQueue<LRdData32>,
}

impl HwToHostBank {
    fn new() -> Self {
        HwToHostBank {
            wr_resp: PairedQueue::new(HW_TO_HOST_CAPACITY),
            rd_data: PairedQueue::new(HW_TO_HOST_CAPACITY),
            lwr_resp: PairedQueue::new(HW_TO_HOST_CAPACITY),
            lrd_data: PairedQueue::new(HW_TO_HOST_CAPACITY),
        }
    }
}

/// The host-side half of the credit/framing protocol.
pub struct FramingEngine {
    outgoing: HostToHwBank,
    incoming: HwToHostBank,
    /// credits[i] = how many more records of host->HW type i we may send.
    send_credits: [u8; 6],
    /// owed[i] = HW->host type i records we have consumed since the last
    /// packet we emitted; flushed into the next header then zeroed.
    owed_credits: [u8; 4],
}

impl FramingEngine {
    pub fn new() -> Self {
        FramingEngine {
            outgoing: HostToHwBank::new(),
            incoming: HwToHostBank::new(),
            send_credits: [HOST_TO_HW_CAPACITY as u8; 6],
            owed_credits: [0; 4],
        }
    }

    // -- host->HW producer side (called by burst/register adapters) --

    pub fn push_wr_addr(&mut self, rec: WrAddr64) -> Result<()> {
        push(&mut self.outgoing.wr_addr, rec)
    }
    pub fn push_wr_data(&mut self, rec: WrData512) -> Result<()> {
        push(&mut self.outgoing.wr_data, rec)
    }
    pub fn push_rd_addr(&mut self, rec: RdAddr64) -> Result<()> {
        push(&mut self.outgoing.rd_addr, rec)
    }
    pub fn push_lwr_addr(&mut self, rec: LWrAddr32) -> Result<()> {
        push(&mut self.outgoing.lwr_addr, rec)
    }
    pub fn push_lwr_data(&mut self, rec: LWrData32) -> Result<()> {
        push(&mut self.outgoing.lwr_data, rec)
    }
    pub fn push_lrd_addr(&mut self, rec: LRdAddr32) -> Result<()> {
        push(&mut self.outgoing.lrd_addr, rec)
    }

    // -- HW->host consumer side (called by burst/register adapters) --
    // Each take_* also books the credit we now owe HW for freeing a slot.

    pub fn take_wr_resp(&mut self) -> Option<WrResp16> {
        let v = self.incoming.wr_resp.dequeue();
        if v.is_some() {
            self.owed_credits[0] = self.owed_credits[0].saturating_add(1);
        }
        v
    }
    pub fn take_rd_data(&mut self) -> Option<RdData512> {
        let v = self.incoming.rd_data.dequeue();
        if v.is_some() {
            self.owed_credits[1] = self.owed_credits[1].saturating_add(1);
        }
        v
    }
    pub fn take_lwr_resp(&mut self) -> Option<LWrResp> {
        let v = self.incoming.lwr_resp.dequeue();
        if v.is_some() {
            self.owed_credits[2] = self.owed_credits[2].saturating_add(1);
        }
        v
    }
    pub fn take_lrd_data(&mut self) -> Option<LRdData32> {
        let v = self.incoming.lrd_data.dequeue();
        if v.is_some() {
            self.owed_credits[3] = self.owed_credits[3].saturating_add(1);
        }
        v
    }

    pub fn send_credit(&self, tag: u8) -> u8 {
        self.send_credits[(tag - 1) as usize]
    }

    /// Current occupancy of an outgoing (host->HW) queue, by tag.
    pub fn outgoing_len(&self, tag: u8) -> usize {
        match tag {
            TAG_WR_ADDR => self.outgoing.wr_addr.len(),
            TAG_WR_DATA => self.outgoing.wr_data.len(),
            TAG_RD_ADDR => self.outgoing.rd_addr.len(),
            TAG_LWR_ADDR => self.outgoing.lwr_addr.len(),
            TAG_LWR_DATA => self.outgoing.lwr_data.len(),
            TAG_LRD_ADDR => self.outgoing.lrd_addr.len(),
            _ => 0,
        }
    }

    /// Builds the next outgoing packet, if there is anything to say.
    /// Returns the packet bytes on success, `None` if nothing to send.
    pub fn build_outgoing_packet(&mut self) -> Option<Vec<u8>> {
        let header: [u8; K_HOST_TO_HW] = self.owed_credits;
        self.owed_credits = [0; K_HOST_TO_HW];

        let mut payload = Vec::new();
        let tag = if !self.outgoing.wr_addr.is_empty() && self.send_credits[0] > 0 {
            let rec = self.outgoing.wr_addr.dequeue().unwrap();
            rec.encode(&mut payload);
            self.send_credits[0] -= 1;
            Some(TAG_WR_ADDR)
        } else if !self.outgoing.wr_data.is_empty() && self.send_credits[1] > 0 {
            let rec = self.outgoing.wr_data.dequeue().unwrap();
            rec.encode(&mut payload);
            self.send_credits[1] -= 1;
            Some(TAG_WR_DATA)
        } else if !self.outgoing.rd_addr.is_empty() && self.send_credits[2] > 0 {
            let rec = self.outgoing.rd_addr.dequeue().unwrap();
            rec.encode(&mut payload);
            self.send_credits[2] -= 1;
            Some(TAG_RD_ADDR)
        } else if !self.outgoing.lwr_addr.is_empty() && self.send_credits[3] > 0 {
            let rec = self.outgoing.lwr_addr.dequeue().unwrap();
            rec.encode(&mut payload);
            self.send_credits[3] -= 1;
            Some(TAG_LWR_ADDR)
        } else if !self.outgoing.lwr_data.is_empty() && self.send_credits[4] > 0 {
            let rec = self.outgoing.lwr_data.dequeue().unwrap();
            rec.encode(&mut payload);
            self.send_credits[4] -= 1;
            Some(TAG_LWR_DATA)
        } else if !self.outgoing.lrd_addr.is_empty() && self.send_credits[5] > 0 {
            let rec = self.outgoing.lrd_addr.dequeue().unwrap();
            rec.encode(&mut payload);
            self.send_credits[5] -= 1;
            Some(TAG_LRD_ADDR)
        } else {
            None
        };

        let tag = match tag {
            Some(t) => t,
            None => {
                if header.iter().all(|&b| b == 0) {
                    return None;
                }
                0
            }
        };

        let mut packet = Vec::with_capacity(1 + K_HOST_TO_HW + 1 + payload.len());
        let len = 1 + K_HOST_TO_HW + 1 + payload.len();
        packet.push(len as u8);
        packet.extend_from_slice(&header);
        packet.push(tag);
        packet.extend_from_slice(&payload);
        Some(packet)
    }

    /// Decodes one HW->host packet, restoring send credits and enqueuing any
    /// payload into its receive queue.
    pub fn consume_incoming_packet(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Err(BridgeError::ProtocolFault("empty packet".into()));
        }
        let declared_len = bytes[0] as usize;
        if declared_len != bytes.len() {
            return Err(BridgeError::ProtocolFault(format!(
                "declared length {} does not match received {}",
                declared_len,
                bytes.len()
            )));
        }
        if bytes.len() < 1 + K_HW_TO_HOST + 1 {
            return Err(BridgeError::ProtocolFault("packet too short for header".into()));
        }
        let credits = &bytes[1..1 + K_HW_TO_HOST];
        for (i, c) in credits.iter().enumerate() {
            self.send_credits[i] = self.send_credits[i].saturating_add(*c);
        }
        let tag = bytes[1 + K_HW_TO_HOST];
        let payload = &bytes[1 + K_HW_TO_HOST + 1..];
        match tag {
            0 => Ok(()),
            TAG_WR_RESP => accept(&mut self.incoming.wr_resp, WrResp16::decode_checked(payload)?),
            TAG_RD_DATA => accept(&mut self.incoming.rd_data, RdData512::decode_checked(payload)?),
            TAG_LWR_RESP => accept(&mut self.incoming.lwr_resp, LWrResp::decode_checked(payload)?),
            TAG_LRD_DATA => accept(&mut self.incoming.lrd_data, LRdData32::decode_checked(payload)?),
            other => Err(BridgeError::ProtocolFault(format!("unknown channel tag {}", other))),
        }
    }
}

fn push<T>(queue: &mut PairedQueue<T>, rec: T) -> Result<()> {
    if queue.enqueue(rec) {
        Ok(())
    } else {
        Err(BridgeError::QueueOverflow(
            "host->HW queue full; credit bookkeeping is broken".into(),
        ))
    }
}

fn accept<T>(queue: &mut PairedQueue<T>, rec: T) -> Result<()> {
    if queue.enqueue(rec) {
        Ok(())
    } else {
        Err(BridgeError::QueueOverflow(
            "HW->host queue full despite credit accounting".into(),
        ))
    }
}

/// Helper trait so `consume_incoming_packet` can validate slice length
/// before calling the infallible `WireRecord::decode`.
trait DecodeChecked: WireRecord {
    fn decode_checked(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::WIRE_SIZE {
            return Err(BridgeError::ProtocolFault(format!(
                "expected {} payload bytes, got {}",
                Self::WIRE_SIZE,
                bytes.len()
            )));
        }
        Ok(Self::decode(bytes))
    }
}

impl DecodeChecked for WrResp16 {}
impl DecodeChecked for RdData512 {}
impl DecodeChecked for LWrResp {}
impl DecodeChecked for LRdData32 {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credits_only_when_no_payload_pending() {
        let mut eng = FramingEngine::new();
        assert!(eng.build_outgoing_packet().is_none());
    }

    #[test]
    fn emits_credits_only_after_consuming_receive_traffic() {
        let mut eng = FramingEngine::new();
        eng.consume_incoming_packet(&[11, 0, 0, 0, 0, 0, 0, TAG_WR_RESP, 1, 0, 0])
            .unwrap();
        assert!(eng.take_wr_resp().is_some());
        let packet = eng.build_outgoing_packet().unwrap();
        assert_eq!(packet[0] as usize, packet.len());
        assert_eq!(packet[1 + K_HOST_TO_HW], 0);
        assert_eq!(packet[1], 1);
    }

    #[test]
    fn send_credit_exhaustion_then_refill() {
        let mut eng = FramingEngine::new();
        for _ in 0..HOST_TO_HW_CAPACITY {
            eng.push_wr_addr(sample_wr_addr()).unwrap();
        }
        let mut sent = 0;
        while let Some(packet) = eng.build_outgoing_packet() {
            assert_eq!(packet[1 + K_HOST_TO_HW], TAG_WR_ADDR);
            sent += 1;
        }
        assert_eq!(sent, HOST_TO_HW_CAPACITY);
        assert!(eng.build_outgoing_packet().is_none());

        let mut refill = vec![16u8, 0, 0, 0, 0, 0];
        let mut packet = vec![(1 + K_HW_TO_HOST + 1) as u8];
        packet.append(&mut refill);
        packet.push(0);
        eng.consume_incoming_packet(&packet).unwrap();
        assert_eq!(eng.send_credit(TAG_WR_ADDR), HOST_TO_HW_CAPACITY as u8);
    }

    #[test]
    fn mismatched_length_is_protocol_fault() {
        let mut eng = FramingEngine::new();
        let err = eng.consume_incoming_packet(&[9, 0, 0, 0, 0, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, BridgeError::ProtocolFault(_)));
    }

    #[test]
    fn unknown_tag_is_protocol_fault() {
        let mut eng = FramingEngine::new();
        let err = eng
            .consume_incoming_packet(&[8, 0, 0, 0, 0, 0, 0, 200])
            .unwrap_err();
        assert!(matches!(err, BridgeError::ProtocolFault(_)));
    }

    fn sample_wr_addr() -> WrAddr64 {
        WrAddr64 {
            id: 0,
            addr: 0x1000,
            len: 0,
            size: 6,
            burst: 1,
            lock: 0,
            cache: 0,
            prot: 0,
            qos: 0,
            region: 0,
        }
    }
}
