//! Main coordinator loop: fixed-priority round-robin over the subsystems,
//! with virtio preemption via `continue`, idle backoff, and graceful
//! shutdown on a termination grace window (§4.9).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::constants::TERMINATION_GRACE;
use crate::error::Result;
use crate::link::Link;
use crate::subsystem::debug_bridge::DebugBridge;
use crate::subsystem::pc_trace::PcTrace;
use crate::subsystem::runcontrol::RunControl;
use crate::subsystem::terminal::Terminal;
use crate::subsystem::virtio_bridge::VirtioBridge;
use crate::subsystem::Subsystem;
use crate::transport::ByteTransport;

pub struct Coordinator<T: ByteTransport> {
    link: Link<T>,
    run_control: RunControl,
    terminal: Terminal,
    pc_trace: PcTrace,
    virtio: VirtioBridge,
    debug: DebugBridge,
    /// The single source of truth for "the bridge is shutting down",
    /// shared with `Bridge` so callers outside the loop can observe it
    /// without reaching into subsystem internals.
    terminating: Arc<AtomicBool>,
    terminating_since: Option<Instant>,
    idle_iterations: u64,
}

impl<T: ByteTransport> Coordinator<T> {
    pub fn new(
        link: Link<T>,
        run_control: RunControl,
        terminal: Terminal,
        pc_trace: PcTrace,
        virtio: VirtioBridge,
        debug: DebugBridge,
        terminating: Arc<AtomicBool>,
    ) -> Self {
        Coordinator {
            link,
            run_control,
            terminal,
            pc_trace,
            virtio,
            debug,
            terminating,
            terminating_since: None,
            idle_iterations: 0,
        }
    }

    pub fn idle_iterations(&self) -> u64 {
        self.idle_iterations
    }

    /// Runs one turn. Returns `true` to keep looping, `false` once the
    /// grace window has elapsed and the bridge should exit.
    pub fn turn(&mut self) -> Result<bool> {
        if let Some(since) = self.terminating_since {
            if since.elapsed() >= TERMINATION_GRACE {
                self.run_control.emit_shutdown(&mut self.link)?;
                return Ok(false);
            }
        }

        if Subsystem::turn(&mut self.virtio, &mut self.link)? {
            return Ok(true);
        }

        let mut did_work = false;
        did_work |= Subsystem::turn(&mut self.terminal, &mut self.link)?;
        did_work |= Subsystem::turn(&mut self.pc_trace, &mut self.link)?;
        did_work |= Subsystem::turn(&mut self.run_control, &mut self.link)?;
        did_work |= Subsystem::turn(&mut self.debug, &mut self.link)?;

        if self.run_control.termination.is_some() && self.terminating_since.is_none() {
            self.terminating_since = Some(Instant::now());
            self.terminating.store(true, Ordering::Relaxed);
        }

        if !did_work {
            self.idle_iterations += 1;
        }

        Ok(true)
    }

    /// Runs turns until the coordinator reports it is done.
    pub fn run_to_completion(&mut self) -> Result<()> {
        while self.turn()? {}
        Ok(())
    }

    pub fn run_control(&self) -> &RunControl {
        &self.run_control
    }
}
