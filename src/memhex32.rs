//! Memhex-32 text format parser (§6): `@<word-index>` address-set lines,
//! hex-digit data lines (one little-endian 32-bit word each, address
//! auto-advancing by 4), anything else a comment.

use crate::error::{BridgeError, Result};

/// An address-indexed byte image, plus the touched-range bounds the bulk
/// loader needs to plan 4KB-respecting bursts.
#[derive(Debug)]
pub struct MemImage {
    pub addr_base: u64,
    pub addr_lim: u64,
    pub bytes: Vec<u8>,
}

impl MemImage {
    /// Byte at absolute address `addr`, or 0 if it falls outside the
    /// touched range (the bulk loader pads tails with zero).
    pub fn byte_at(&self, addr: u64) -> u8 {
        if addr < self.addr_base || addr >= self.addr_lim {
            return 0;
        }
        self.bytes[(addr - self.addr_base) as usize]
    }
}

fn is_hex_digit(c: char) -> bool {
    c.is_ascii_hexdigit()
}

/// Parses a memhex32 file's textual contents into a `MemImage`.
pub fn parse(text: &str) -> Result<MemImage> {
    let mut words: Vec<(u64, u32)> = Vec::new();
    let mut word_addr: u64 = 0;
    let mut last_word_addr: Option<u64> = None;

    for (lineno, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        let mut chars = line.chars();
        let first = chars.next().unwrap();

        if first == '@' {
            let rest = &line[1..];
            word_addr = u64::from_str_radix(rest.trim(), 16)
                .map_err(|_| BridgeError::InvalidArgument(format!("line {}: bad address {}", lineno + 1, line)))?;
            continue;
        }

        if is_hex_digit(first) {
            let value = u32::from_str_radix(line, 16)
                .map_err(|_| BridgeError::InvalidArgument(format!("line {}: bad data word {}", lineno + 1, line)))?;
            if let Some(prev) = last_word_addr {
                if word_addr < prev {
                    log::warn!("memhex32 line {}: address went backwards ({:#x} < {:#x})", lineno + 1, word_addr, prev);
                }
            }
            words.push((word_addr, value));
            last_word_addr = Some(word_addr);
            word_addr += 1;
            continue;
        }

        // anything else is a comment; skip.
    }

    if words.is_empty() {
        return Ok(MemImage {
            addr_base: 0,
            addr_lim: 0,
            bytes: Vec::new(),
        });
    }

    let addr_base = words.iter().map(|(a, _)| *a * 4).min().unwrap();
    let addr_lim = words.iter().map(|(a, _)| *a * 4 + 4).max().unwrap();
    let mut bytes = vec![0u8; (addr_lim - addr_base) as usize];
    for (word_index, value) in words {
        let byte_addr = word_index * 4 - addr_base;
        bytes[byte_addr as usize..byte_addr as usize + 4].copy_from_slice(&value.to_le_bytes());
    }

    Ok(MemImage {
        addr_base,
        addr_lim,
        bytes,
    })
}
