//! The bytevec wire codec: byte-exact pack/unpack of the nine bus-transaction
//! record types (§3 of the runtime spec). Every sub-byte field (`size`,
//! `burst`, `lock`, ...) still occupies one whole byte on the wire -- the
//! layout is byte-aligned per field, not bit-packed across fields -- which
//! is why e.g. Wr-Addr-64 is 18 bytes rather than 14 (109 significant bits
//! rounded up field-by-field). Encoding is always little-endian, mirroring
//! the teacher's use of `byteorder::LittleEndian` for on-wire register and
//! descriptor words regardless of host endianness.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

/// A typed bus transaction that can be packed to and unpacked from its
/// fixed-size wire layout. Both directions are total and infallible on
/// well-formed input.
pub trait WireRecord: Sized {
    /// Exact number of bytes this record occupies on the wire.
    const WIRE_SIZE: usize;

    fn encode(&self, out: &mut Vec<u8>);
    fn decode(bytes: &[u8]) -> Self;
}

macro_rules! wire_size_check {
    ($bytes:expr, $n:expr) => {
        debug_assert_eq!($bytes.len(), $n, "codec: wrong slice length for decode");
    };
}

/// host -> HW write-address phase of an AXI4 burst write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrAddr64 {
    pub id: u16,
    pub addr: u64,
    pub len: u8,
    pub size: u8,
    pub burst: u8,
    pub lock: u8,
    pub cache: u8,
    pub prot: u8,
    pub qos: u8,
    pub region: u8,
}

impl WireRecord for WrAddr64 {
    const WIRE_SIZE: usize = 18;

    fn encode(&self, out: &mut Vec<u8>) {
        out.write_u16::<LittleEndian>(self.id).unwrap();
        out.write_u64::<LittleEndian>(self.addr).unwrap();
        out.push(self.len);
        out.push(self.size);
        out.push(self.burst);
        out.push(self.lock);
        out.push(self.cache);
        out.push(self.prot);
        out.push(self.qos);
        out.push(self.region);
    }

    fn decode(bytes: &[u8]) -> Self {
        wire_size_check!(bytes, Self::WIRE_SIZE);
        let mut cur = bytes;
        WrAddr64 {
            id: cur.read_u16::<LittleEndian>().unwrap(),
            addr: cur.read_u64::<LittleEndian>().unwrap(),
            len: cur[0],
            size: cur[1],
            burst: cur[2],
            lock: cur[3],
            cache: cur[4],
            prot: cur[5],
            qos: cur[6],
            region: cur[7],
        }
    }
}

/// host -> HW write-data beat of an AXI4 burst write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrData512 {
    pub data: [u8; 64],
    pub strb: u64,
    pub last: u8,
}

impl WireRecord for WrData512 {
    const WIRE_SIZE: usize = 73;

    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.data);
        out.write_u64::<LittleEndian>(self.strb).unwrap();
        out.push(self.last);
    }

    fn decode(bytes: &[u8]) -> Self {
        wire_size_check!(bytes, Self::WIRE_SIZE);
        let mut data = [0u8; 64];
        data.copy_from_slice(&bytes[0..64]);
        let mut cur = &bytes[64..];
        WrData512 {
            data,
            strb: cur.read_u64::<LittleEndian>().unwrap(),
            last: bytes[72],
        }
    }
}

/// host -> HW read-address phase of an AXI4 burst read. Same layout as
/// `WrAddr64`, distinct type so the two can't be queued on the wrong FIFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RdAddr64 {
    pub id: u16,
    pub addr: u64,
    pub len: u8,
    pub size: u8,
    pub burst: u8,
    pub lock: u8,
    pub cache: u8,
    pub prot: u8,
    pub qos: u8,
    pub region: u8,
}

impl WireRecord for RdAddr64 {
    const WIRE_SIZE: usize = 18;

    fn encode(&self, out: &mut Vec<u8>) {
        out.write_u16::<LittleEndian>(self.id).unwrap();
        out.write_u64::<LittleEndian>(self.addr).unwrap();
        out.push(self.len);
        out.push(self.size);
        out.push(self.burst);
        out.push(self.lock);
        out.push(self.cache);
        out.push(self.prot);
        out.push(self.qos);
        out.push(self.region);
    }

    fn decode(bytes: &[u8]) -> Self {
        wire_size_check!(bytes, Self::WIRE_SIZE);
        let mut cur = bytes;
        RdAddr64 {
            id: cur.read_u16::<LittleEndian>().unwrap(),
            addr: cur.read_u64::<LittleEndian>().unwrap(),
            len: cur[0],
            size: cur[1],
            burst: cur[2],
            lock: cur[3],
            cache: cur[4],
            prot: cur[5],
            qos: cur[6],
            region: cur[7],
        }
    }
}

/// HW -> host write response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrResp16 {
    pub id: u16,
    pub resp: u8,
}

impl WireRecord for WrResp16 {
    const WIRE_SIZE: usize = 3;

    fn encode(&self, out: &mut Vec<u8>) {
        out.write_u16::<LittleEndian>(self.id).unwrap();
        out.push(self.resp);
    }

    fn decode(bytes: &[u8]) -> Self {
        wire_size_check!(bytes, Self::WIRE_SIZE);
        let mut cur = bytes;
        WrResp16 {
            id: cur.read_u16::<LittleEndian>().unwrap(),
            resp: bytes[2],
        }
    }
}

/// HW -> host read-data beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RdData512 {
    pub id: u16,
    pub data: [u8; 64],
    pub resp: u8,
    pub last: u8,
}

impl WireRecord for RdData512 {
    const WIRE_SIZE: usize = 68;

    fn encode(&self, out: &mut Vec<u8>) {
        out.write_u16::<LittleEndian>(self.id).unwrap();
        out.extend_from_slice(&self.data);
        out.push(self.resp);
        out.push(self.last);
    }

    fn decode(bytes: &[u8]) -> Self {
        wire_size_check!(bytes, Self::WIRE_SIZE);
        let mut cur = bytes;
        let id = cur.read_u16::<LittleEndian>().unwrap();
        let mut data = [0u8; 64];
        data.copy_from_slice(&bytes[2..66]);
        RdData512 {
            id,
            data,
            resp: bytes[66],
            last: bytes[67],
        }
    }
}

/// host -> HW AXI4-Lite write-address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LWrAddr32 {
    pub addr: u32,
    pub prot: u8,
}

impl WireRecord for LWrAddr32 {
    const WIRE_SIZE: usize = 5;

    fn encode(&self, out: &mut Vec<u8>) {
        out.write_u32::<LittleEndian>(self.addr).unwrap();
        out.push(self.prot);
    }

    fn decode(bytes: &[u8]) -> Self {
        wire_size_check!(bytes, Self::WIRE_SIZE);
        let mut cur = bytes;
        LWrAddr32 {
            addr: cur.read_u32::<LittleEndian>().unwrap(),
            prot: bytes[4],
        }
    }
}

/// host -> HW AXI4-Lite write-data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LWrData32 {
    pub data: u32,
    pub strb: u8,
}

impl WireRecord for LWrData32 {
    const WIRE_SIZE: usize = 5;

    fn encode(&self, out: &mut Vec<u8>) {
        out.write_u32::<LittleEndian>(self.data).unwrap();
        out.push(self.strb);
    }

    fn decode(bytes: &[u8]) -> Self {
        wire_size_check!(bytes, Self::WIRE_SIZE);
        let mut cur = bytes;
        LWrData32 {
            data: cur.read_u32::<LittleEndian>().unwrap(),
            strb: bytes[4],
        }
    }
}

/// host -> HW AXI4-Lite read-address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LRdAddr32 {
    pub addr: u32,
    pub prot: u8,
}

impl WireRecord for LRdAddr32 {
    const WIRE_SIZE: usize = 5;

    fn encode(&self, out: &mut Vec<u8>) {
        out.write_u32::<LittleEndian>(self.addr).unwrap();
        out.push(self.prot);
    }

    fn decode(bytes: &[u8]) -> Self {
        wire_size_check!(bytes, Self::WIRE_SIZE);
        let mut cur = bytes;
        LRdAddr32 {
            addr: cur.read_u32::<LittleEndian>().unwrap(),
            prot: bytes[4],
        }
    }
}

/// HW -> host AXI4-Lite write response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LWrResp {
    pub resp: u8,
}

impl WireRecord for LWrResp {
    const WIRE_SIZE: usize = 1;

    fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.resp);
    }

    fn decode(bytes: &[u8]) -> Self {
        wire_size_check!(bytes, Self::WIRE_SIZE);
        LWrResp { resp: bytes[0] }
    }
}

/// HW -> host AXI4-Lite read-data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LRdData32 {
    pub data: u32,
    pub resp: u8,
}

impl WireRecord for LRdData32 {
    const WIRE_SIZE: usize = 5;

    fn encode(&self, out: &mut Vec<u8>) {
        out.write_u32::<LittleEndian>(self.data).unwrap();
        out.push(self.resp);
    }

    fn decode(bytes: &[u8]) -> Self {
        wire_size_check!(bytes, Self::WIRE_SIZE);
        let mut cur = bytes;
        LRdData32 {
            data: cur.read_u32::<LittleEndian>().unwrap(),
            resp: bytes[4],
        }
    }
}
