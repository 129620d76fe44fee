//! GDB server thread: listens for a single TCP connection and translates a
//! minimal line protocol (`R <addr>` / `W <addr> <data>`) into DMI
//! requests. A full `gdbserver` remote-protocol packet parser is out of
//! scope (§1); this is the bridge's half of that contract only.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::aux::BoundedQueue;
use crate::subsystem::debug_bridge::DmiRequest;

pub struct GdbServer {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl GdbServer {
    /// Binds to `port` (0 lets the OS pick an ephemeral port) and returns
    /// the server handle plus the port actually bound.
    pub fn spawn(
        port: u16,
        requests: Arc<BoundedQueue<DmiRequest>>,
        responses: Arc<BoundedQueue<u32>>,
    ) -> std::io::Result<(Self, u16)> {
        let listener = TcpListener::bind(("127.0.0.1", port))?;
        let bound_port = listener.local_addr()?.port();
        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = stop.clone();
        let handle = thread::spawn(move || {
            if let Ok((stream, _addr)) = listener.accept() {
                if let Err(e) = serve(stream, &requests, &responses, &worker_stop) {
                    log::warn!("gdb server connection ended: {}", e);
                }
            }
        });
        Ok((
            GdbServer {
                stop,
                handle: Some(handle),
            },
            bound_port,
        ))
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

impl Drop for GdbServer {
    fn drop(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn serve(
    stream: TcpStream,
    requests: &Arc<BoundedQueue<DmiRequest>>,
    responses: &Arc<BoundedQueue<u32>>,
    stop: &AtomicBool,
) -> std::io::Result<()> {
    let mut writer = stream.try_clone()?;
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    while !stop.load(Ordering::Relaxed) {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(());
        }
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            ["R", addr] => {
                if let Ok(addr) = u32::from_str_radix(addr.trim_start_matches("0x"), 16) {
                    requests.push_blocking(DmiRequest {
                        is_write: false,
                        addr,
                        data: 0,
                    });
                    let value = responses.pop_blocking();
                    writeln!(writer, "{:08x}", value)?;
                }
            }
            ["W", addr, data] => {
                if let (Ok(addr), Ok(data)) = (
                    u32::from_str_radix(addr.trim_start_matches("0x"), 16),
                    u32::from_str_radix(data.trim_start_matches("0x"), 16),
                ) {
                    requests.push_blocking(DmiRequest {
                        is_write: true,
                        addr,
                        data,
                    });
                    writeln!(writer, "ok")?;
                }
            }
            _ => {
                writeln!(writer, "error")?;
            }
        }
    }
    Ok(())
}
