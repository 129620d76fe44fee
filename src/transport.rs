//! Opaque byte pipe to/from the hardware. Two implementations: a TCP
//! simulator front-end and an in-process loopback used by tests. Mirrors
//! the teacher's split between a real transport (`pci.rs`, mmap'd BAR
//! access) and nothing-fancier-than-a-trait boundary above it.

use std::io::{Read, Write};
use std::net::TcpStream;

use crate::error::{BridgeError, Result};

/// Either a frame of exactly `n` bytes, or "not yet available" for a
/// non-blocking poll.
pub enum RecvOutcome {
    Ready(Vec<u8>),
    Unavailable,
}

pub trait ByteTransport {
    /// Writes the whole buffer or reports a fatal error; partial writes are
    /// not a valid outcome.
    fn send(&mut self, bytes: &[u8]) -> Result<()>;

    /// Polling receive: returns `Unavailable` rather than blocking when `n`
    /// bytes are not yet present.
    fn recv_poll(&mut self, n: usize) -> Result<RecvOutcome>;

    /// Blocking receive of exactly `n` bytes.
    fn recv_blocking(&mut self, n: usize) -> Result<Vec<u8>>;
}

/// Connects to a listening instruction-set simulator over TCP, as described
/// in §4.4/§6: `127.0.0.1:30000` by default. The first byte of every frame
/// is a length prefix; the simulator is trusted to always have at least
/// that first byte ready when anything is pending.
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port))
            .map_err(|e| BridgeError::Fatal(format!("connect to simulator failed: {}", e)))?;
        stream
            .set_nonblocking(true)
            .map_err(|e| BridgeError::Fatal(e.to_string()))?;
        Ok(TcpTransport { stream })
    }
}

impl ByteTransport for TcpTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream
            .set_nonblocking(false)
            .map_err(|e| BridgeError::Fatal(e.to_string()))?;
        self.stream
            .write_all(bytes)
            .map_err(|e| BridgeError::TransportFault(format!("short write: {}", e)))?;
        self.stream
            .set_nonblocking(true)
            .map_err(|e| BridgeError::Fatal(e.to_string()))?;
        Ok(())
    }

    fn recv_poll(&mut self, n: usize) -> Result<RecvOutcome> {
        let mut first = [0u8; 1];
        match self.stream.read(&mut first) {
            Ok(0) => Err(BridgeError::Fatal("simulator closed connection".into())),
            Ok(_) => {
                let mut rest = vec![0u8; n - 1];
                self.stream
                    .set_nonblocking(false)
                    .map_err(|e| BridgeError::Fatal(e.to_string()))?;
                self.stream
                    .read_exact(&mut rest)
                    .map_err(|e| BridgeError::TransportFault(format!("short read: {}", e)))?;
                self.stream
                    .set_nonblocking(true)
                    .map_err(|e| BridgeError::Fatal(e.to_string()))?;
                let mut frame = Vec::with_capacity(n);
                frame.extend_from_slice(&first);
                frame.extend_from_slice(&rest);
                Ok(RecvOutcome::Ready(frame))
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(RecvOutcome::Unavailable),
            Err(e) => Err(BridgeError::TransportFault(e.to_string())),
        }
    }

    fn recv_blocking(&mut self, n: usize) -> Result<Vec<u8>> {
        self.stream
            .set_nonblocking(false)
            .map_err(|e| BridgeError::Fatal(e.to_string()))?;
        let mut buf = vec![0u8; n];
        self.stream
            .read_exact(&mut buf)
            .map_err(|e| BridgeError::TransportFault(format!("short read: {}", e)))?;
        self.stream
            .set_nonblocking(true)
            .map_err(|e| BridgeError::Fatal(e.to_string()))?;
        Ok(buf)
    }
}

/// In-process byte pipe with no hardware on the other end: frames written
/// via `send` are immediately available for `recv_*`. Used by the
/// `testkit` mock-hardware harness and by unit tests that only need to
/// exercise framing, not a real socket.
#[derive(Default)]
pub struct LoopbackTransport {
    inbox: std::collections::VecDeque<u8>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        LoopbackTransport {
            inbox: std::collections::VecDeque::new(),
        }
    }

    /// Test/harness hook: inject bytes as if they had arrived from hardware.
    pub fn inject(&mut self, bytes: &[u8]) {
        self.inbox.extend(bytes.iter().copied());
    }
}

impl ByteTransport for LoopbackTransport {
    fn send(&mut self, _bytes: &[u8]) -> Result<()> {
        Ok(())
    }

    fn recv_poll(&mut self, n: usize) -> Result<RecvOutcome> {
        if self.inbox.len() < n {
            return Ok(RecvOutcome::Unavailable);
        }
        let frame = self.inbox.drain(0..n).collect();
        Ok(RecvOutcome::Ready(frame))
    }

    fn recv_blocking(&mut self, n: usize) -> Result<Vec<u8>> {
        match self.recv_poll(n)? {
            RecvOutcome::Ready(frame) => Ok(frame),
            RecvOutcome::Unavailable => Err(BridgeError::TransportFault(
                "loopback transport has no data queued for a blocking read".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_unavailable_until_enough_bytes() {
        let mut t = LoopbackTransport::new();
        assert!(matches!(t.recv_poll(4).unwrap(), RecvOutcome::Unavailable));
        t.inject(&[1, 2, 3, 4]);
        match t.recv_poll(4).unwrap() {
            RecvOutcome::Ready(bytes) => assert_eq!(bytes, vec![1, 2, 3, 4]),
            RecvOutcome::Unavailable => panic!("expected data"),
        }
    }
}
