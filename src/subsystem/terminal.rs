//! Terminal subsystem: forwards keyboard input to the UART-in channel one
//! byte per turn, and assembles UART-out traffic into lines flushed to a
//! sink on newline, control character, buffer-full, or idle timeout.

use std::io::Write;
use std::sync::Arc;

use crate::aux::BoundedQueue;
use crate::channel::{chan_get_nb, chan_put, ChannelDir};
use crate::constants::{CHAN_H2H_UART_IN, CHAN_H2S_UART_OUT, SCREEN_BUFFER_CAPACITY, SCREEN_IDLE_FLUSH_PASSES};
use crate::error::Result;
use crate::link::Link;
use crate::subsystem::Subsystem;
use crate::transport::ByteTransport;

pub struct Terminal {
    keyboard_queue: Arc<BoundedQueue<u8>>,
    sink: Box<dyn Write + Send>,
    line: Vec<u8>,
    idle_passes: u32,
}

impl Terminal {
    pub fn new(keyboard_queue: Arc<BoundedQueue<u8>>, sink: Box<dyn Write + Send>) -> Self {
        Terminal {
            keyboard_queue,
            sink,
            line: Vec::with_capacity(SCREEN_BUFFER_CAPACITY),
            idle_passes: 0,
        }
    }

    fn flush_line(&mut self) -> Result<()> {
        if !self.line.is_empty() {
            self.sink.write_all(&self.line)?;
            self.sink.flush()?;
            self.line.clear();
        }
        self.idle_passes = 0;
        Ok(())
    }

    fn push_output_word<T: ByteTransport>(&mut self, link: &mut Link<T>, word: u32) -> Result<bool> {
        let mut did_work = false;
        for lane in 0..4 {
            let byte = ((word >> (lane * 8)) & 0xFF) as u8;
            let valid = byte & 0x80 != 0;
            if !valid {
                continue;
            }
            let ch = byte & 0x7F;
            self.line.push(ch);
            did_work = true;
            let is_newline = ch == b'\n';
            let is_control = ch < 0x20 && ch != b'\n';
            let is_full = self.line.len() >= SCREEN_BUFFER_CAPACITY;
            if is_newline || is_control || is_full {
                self.flush_line()?;
            }
        }
        let _ = link;
        Ok(did_work)
    }
}

impl<T: ByteTransport> Subsystem<T> for Terminal {
    fn turn(&mut self, link: &mut Link<T>) -> Result<bool> {
        if let Some(byte) = self.keyboard_queue.pop_nb() {
            chan_put(link, ChannelDir::HostToHw, CHAN_H2H_UART_IN, byte as u32)?;
            return Ok(true);
        }

        match chan_get_nb(link, ChannelDir::HwToHost, CHAN_H2S_UART_OUT)? {
            Some(word) => self.push_output_word(link, word),
            None => {
                if self.line.is_empty() {
                    return Ok(false);
                }
                self.idle_passes += 1;
                if self.idle_passes >= SCREEN_IDLE_FLUSH_PASSES {
                    self.flush_line()?;
                    return Ok(true);
                }
                Ok(false)
            }
        }
    }
}
