//! Host-side runtime bridging a user-mode program to a memory-mapped
//! hardware accelerator: bytevec wire codec, credit-based flow control,
//! AXI4 burst and AXI4-Lite register transport, a channel multiplexer,
//! and the subsystem services and coordinator loop built on top of it.
//!
//! Mirrors the shape of the teacher's own driver/device split: all mutable
//! state lives behind one owned `Bridge` value built at initialization and
//! threaded explicitly through every entry point, rather than in statics.

pub mod aux;
pub mod bulkload;
pub mod burst;
pub mod channel;
pub mod cli;
pub mod codec;
pub mod constants;
pub mod coordinator;
pub mod error;
pub mod framing;
pub mod link;
pub mod memhex32;
pub mod queue;
pub mod register;
pub mod subsystem;
pub mod testkit;
pub mod transport;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use aux::gdb::GdbServer;
use aux::keyboard::KeyboardReader;
use aux::virtio_io::{IoPump, VirtioIoThread};
use aux::BoundedQueue;
use cli::BridgeConfig;
use coordinator::Coordinator;
use error::Result;
use link::Link;
use subsystem::debug_bridge::DebugBridge;
use subsystem::pc_trace::PcTrace;
use subsystem::runcontrol::{RunControl, RunControlConfig};
use subsystem::terminal::Terminal;
use subsystem::virtio_bridge::{EmulatedDevice, IrqTrampoline, VirtioBridge};
use transport::ByteTransport;

/// A no-op I/O pump for configurations where no virtio device needs its
/// own external file descriptors serviced, but the thread is still started
/// per the resolved open question that it's never conditionally compiled.
struct IdlePump;
impl IoPump for IdlePump {
    fn pump_once(&mut self) -> bool {
        false
    }
}

/// Bundles the per-process state every entry point needs: the wire
/// coordinator plus the auxiliary threads it hands work off to. Dropping
/// this value joins every auxiliary thread.
pub struct Bridge<T: ByteTransport> {
    coordinator: Coordinator<T>,
    terminating: Arc<AtomicBool>,
    _keyboard: KeyboardReader,
    _virtio_io: VirtioIoThread,
    _gdb: Option<GdbServer>,
}

impl<T: ByteTransport> Bridge<T> {
    pub fn new(transport: T, config: &BridgeConfig, device: Box<dyn EmulatedDevice>) -> Result<Self> {
        let link = Link::new(transport);

        let run_control = RunControl::new(RunControlConfig {
            verbosity: 1,
            log_delay: 0,
            watch_tohost_addr: 0,
            pc_trace_enabled: false,
            ddr4_loaded: config.memhex32_path.is_some() || config.elf_path.is_some(),
        });

        let keyboard = KeyboardReader::spawn(std::io::stdin());
        let terminal = Terminal::new(keyboard.queue(), Box::new(std::io::stdout()));

        let pc_trace = PcTrace::new(Box::new(std::io::stdout()));

        let irq = IrqTrampoline::new();
        let virtio = VirtioBridge::new(device, irq);
        let virtio_io = VirtioIoThread::spawn(Box::new(IdlePump));

        let debug_requests = Arc::new(BoundedQueue::new(8));
        let debug_responses = Arc::new(BoundedQueue::new(8));
        let debug = DebugBridge::new(debug_requests.clone(), debug_responses.clone());
        let gdb = match config.gdbport {
            Some(port) => {
                let (server, _bound) = GdbServer::spawn(port, debug_requests, debug_responses)?;
                Some(server)
            }
            None => None,
        };

        let terminating = Arc::new(AtomicBool::new(false));
        let coordinator = Coordinator::new(link, run_control, terminal, pc_trace, virtio, debug, terminating.clone());

        Ok(Bridge {
            coordinator,
            terminating,
            _keyboard: keyboard,
            _virtio_io: virtio_io,
            _gdb: gdb,
        })
    }

    /// True once run-control has detected termination (a passing/failing
    /// `tohost` value, or a nonzero `soc_status`); the grace window may
    /// still be running.
    pub fn is_terminating(&self) -> bool {
        self.terminating.load(Ordering::Relaxed)
    }

    /// Runs the coordinator loop to completion (termination + grace window
    /// elapsed, or a fatal error). Returns the run-control outcome so the
    /// caller can choose an exit code.
    pub fn run(&mut self) -> Result<Option<subsystem::runcontrol::TerminationOutcome>> {
        self.coordinator.run_to_completion()?;
        Ok(self.coordinator.run_control().termination)
    }
}
