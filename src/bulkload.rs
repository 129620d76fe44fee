//! Bulk-load driver: chunks a `MemImage` into 4KB-respecting, 64-byte
//! aligned bursts and drives them through the burst adapter.

use crate::burst::burst_write;
use crate::constants::BURST_PAGE_BYTES;
use crate::error::{BridgeError, Result};
use crate::link::Link;
use crate::memhex32::MemImage;
use crate::transport::ByteTransport;

/// Loads `image` into HW memory starting at its own `addr_base`, one
/// `burst_write` per 4KB-aligned chunk. `addr_base` must already be
/// 64-byte aligned; the core does not fix up misaligned images.
pub fn bulk_load<T: ByteTransport>(link: &mut Link<T>, image: &MemImage) -> Result<()> {
    if image.bytes.is_empty() {
        return Ok(());
    }
    if image.addr_base % 64 != 0 {
        return Err(BridgeError::InvalidArgument(format!(
            "memhex32 image base {:#x} is not 64-byte aligned",
            image.addr_base
        )));
    }

    let mut addr = image.addr_base;
    let end = image.addr_lim;
    while addr < end {
        let page_end = (addr / BURST_PAGE_BYTES + 1) * BURST_PAGE_BYTES;
        let chunk_end = page_end.min(end);
        let chunk_len = (chunk_end - addr) as usize;

        // pad the tail to a whole 64-byte beat if needed.
        let padded_len = (chunk_len + 63) / 64 * 64;
        let mut chunk = vec![0u8; padded_len];
        for (i, slot) in chunk.iter_mut().enumerate().take(chunk_len) {
            *slot = image.byte_at(addr + i as u64);
        }

        burst_write(link, &chunk, padded_len, addr)?;
        addr = chunk_end;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{LWrResp, WireRecord};
    use crate::memhex32::parse;
    use crate::transport::LoopbackTransport;

    fn frame(mut payload: Vec<u8>, tag: u8) -> Vec<u8> {
        let mut out = vec![0u8, 0, 0, 0, 0, 0, 0, tag];
        out.append(&mut payload);
        out[0] = out.len() as u8;
        out
    }

    fn wr_resp_frame() -> Vec<u8> {
        let mut bytes = Vec::new();
        LWrResp { resp: 0 }.encode(&mut bytes);
        frame(bytes, 1)
    }

    #[test]
    fn single_chunk_image_issues_one_burst() {
        let image = parse("@0\nDEADBEEF\n").unwrap();
        let mut transport = LoopbackTransport::new();
        transport.inject(&wr_resp_frame());
        let mut link = Link::new(transport);
        bulk_load(&mut link, &image).unwrap();
    }

    #[test]
    fn rejects_misaligned_base() {
        let image = MemImage {
            addr_base: 4,
            addr_lim: 68,
            bytes: vec![0u8; 64],
        };
        let mut link = Link::new(LoopbackTransport::new());
        let err = bulk_load(&mut link, &image).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArgument(_)));
    }
}
