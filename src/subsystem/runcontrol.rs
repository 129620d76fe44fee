//! Run-control subsystem: emits a fixed configuration sequence at startup,
//! then watches the status channel for the legacy `tohost` termination
//! convention.

use crate::channel::{chan_get_nb, chan_put, ChannelDir};
use crate::constants::{CHAN_H2H_CONTROL, CHAN_H2S_STATUS};
use crate::error::Result;
use crate::link::Link;
use crate::subsystem::Subsystem;
use crate::transport::ByteTransport;

/// Control word issued on shutdown, distinct from any field combination a
/// live status word can take (soc_status occupies the high byte of status
/// words, not control words, so this is unambiguous on the wire it rides).
const SHUTDOWN_CONTROL_WORD: u32 = 0xFFFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationOutcome {
    Passed,
    FailedTest(u16),
    SocFault(u8),
}

pub struct RunControlConfig {
    pub verbosity: u8,
    pub log_delay: u32,
    pub watch_tohost_addr: u32,
    pub pc_trace_enabled: bool,
    pub ddr4_loaded: bool,
}

pub struct RunControl {
    config: RunControlConfig,
    startup_sent: bool,
    pub termination: Option<TerminationOutcome>,
}

impl RunControl {
    pub fn new(config: RunControlConfig) -> Self {
        RunControl {
            config,
            startup_sent: false,
            termination: None,
        }
    }

    fn send_startup_sequence<T: ByteTransport>(&self, link: &mut Link<T>) -> Result<()> {
        let verbosity_word = ((self.config.log_delay) << 8) | self.config.verbosity as u32;
        chan_put(link, ChannelDir::HostToHw, CHAN_H2H_CONTROL, verbosity_word)?;
        chan_put(link, ChannelDir::HostToHw, CHAN_H2H_CONTROL, self.config.watch_tohost_addr)?;
        chan_put(
            link,
            ChannelDir::HostToHw,
            CHAN_H2H_CONTROL,
            self.config.pc_trace_enabled as u32,
        )?;
        chan_put(link, ChannelDir::HostToHw, CHAN_H2H_CONTROL, self.config.ddr4_loaded as u32)?;
        Ok(())
    }

    pub fn emit_shutdown<T: ByteTransport>(&self, link: &mut Link<T>) -> Result<()> {
        chan_put(link, ChannelDir::HostToHw, CHAN_H2H_CONTROL, SHUTDOWN_CONTROL_WORD)
    }

    fn decode_status(word: u32) -> (u16, u8, u8) {
        let tohost_value = (word & 0xFFFF) as u16;
        let flags = ((word >> 16) & 0xFF) as u8;
        let soc_status = ((word >> 24) & 0xFF) as u8;
        (tohost_value, flags, soc_status)
    }
}

impl<T: ByteTransport> Subsystem<T> for RunControl {
    fn turn(&mut self, link: &mut Link<T>) -> Result<bool> {
        if !self.startup_sent {
            self.send_startup_sequence(link)?;
            self.startup_sent = true;
            return Ok(true);
        }
        if self.termination.is_some() {
            return Ok(false);
        }
        match chan_get_nb(link, ChannelDir::HwToHost, CHAN_H2S_STATUS)? {
            None => Ok(false),
            Some(word) => {
                let (tohost_value, _flags, soc_status) = Self::decode_status(word);
                if soc_status != 0 {
                    self.termination = Some(TerminationOutcome::SocFault(soc_status));
                } else if tohost_value != 0 {
                    self.termination = Some(if tohost_value == 1 {
                        TerminationOutcome::Passed
                    } else {
                        TerminationOutcome::FailedTest(tohost_value >> 1)
                    });
                }
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{LRdData32, LWrResp, WireRecord};
    use crate::transport::LoopbackTransport;

    fn config() -> RunControlConfig {
        RunControlConfig {
            verbosity: 2,
            log_delay: 0,
            watch_tohost_addr: 0x8000_1000,
            pc_trace_enabled: false,
            ddr4_loaded: true,
        }
    }

    fn frame(mut payload: Vec<u8>, tag: u8) -> Vec<u8> {
        let mut out = vec![0u8, 0, 0, 0, 0, 0, 0, tag];
        out.append(&mut payload);
        out[0] = out.len() as u8;
        out
    }

    fn wr_resp_frame() -> Vec<u8> {
        let mut bytes = Vec::new();
        LWrResp { resp: 0 }.encode(&mut bytes);
        frame(bytes, 3)
    }

    fn rd_data_frame(value: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        LRdData32 { data: value, resp: 0 }.encode(&mut bytes);
        frame(bytes, 4)
    }

    #[test]
    fn first_turn_sends_startup_sequence() {
        let mut transport = LoopbackTransport::new();
        for _ in 0..4 {
            transport.inject(&rd_data_frame(1));
            transport.inject(&wr_resp_frame());
        }
        let mut link = Link::new(transport);
        let mut rc = RunControl::new(config());
        let did_work = <RunControl as Subsystem<LoopbackTransport>>::turn(&mut rc, &mut link).unwrap();
        assert!(did_work);
        assert!(rc.startup_sent);
    }

    #[test]
    fn passing_tohost_value_sets_termination() {
        let (tohost_value, flags, soc_status) = (1u32, 0u32, 0u32);
        let status_word = (soc_status << 24) | (flags << 16) | tohost_value;
        let (v, _, s) = RunControl::decode_status(status_word);
        assert_eq!(v, 1);
        assert_eq!(s, 0);
    }

    /// tohost encodes every completion with bit 0 set; only the exact value
    /// 1 is a pass. A value of 3 is test 1 failing, 5 is test 2 failing --
    /// `value & 1 == 1` would misreport both of these as a pass.
    #[test]
    fn odd_tohost_value_above_one_is_a_failing_test_not_a_pass() {
        let mut transport = LoopbackTransport::new();
        transport.inject(&rd_data_frame(3));
        let mut link = Link::new(transport);
        let mut rc = RunControl::new(config());
        rc.startup_sent = true;
        <RunControl as Subsystem<LoopbackTransport>>::turn(&mut rc, &mut link).unwrap();
        assert!(matches!(rc.termination, Some(TerminationOutcome::FailedTest(1))));

        let mut transport = LoopbackTransport::new();
        transport.inject(&rd_data_frame(5));
        let mut link = Link::new(transport);
        let mut rc = RunControl::new(config());
        rc.startup_sent = true;
        <RunControl as Subsystem<LoopbackTransport>>::turn(&mut rc, &mut link).unwrap();
        assert!(matches!(rc.termination, Some(TerminationOutcome::FailedTest(2))));
    }

    #[test]
    fn tohost_value_of_exactly_one_is_a_pass() {
        let mut transport = LoopbackTransport::new();
        transport.inject(&rd_data_frame(1));
        let mut link = Link::new(transport);
        let mut rc = RunControl::new(config());
        rc.startup_sent = true;
        <RunControl as Subsystem<LoopbackTransport>>::turn(&mut rc, &mut link).unwrap();
        assert!(matches!(rc.termination, Some(TerminationOutcome::Passed)));
    }
}
