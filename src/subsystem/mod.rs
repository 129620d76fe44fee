//! Subsystem services: each owns a small state machine over one or two
//! channels and is driven once per coordinator turn.

pub mod debug_bridge;
pub mod pc_trace;
pub mod runcontrol;
pub mod terminal;
pub mod virtio_bridge;

use crate::error::Result;
use crate::link::Link;
use crate::transport::ByteTransport;

/// A unit of work the coordinator services every turn. `turn` does at most
/// a bounded amount of work and reports whether it did any, so the
/// coordinator's idle-backoff counter can tell a quiet turn from a busy one.
pub trait Subsystem<T: ByteTransport> {
    fn turn(&mut self, link: &mut Link<T>) -> Result<bool>;
}
