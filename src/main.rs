use std::process::ExitCode;

use hostbridge::cli::{parse_args, ParseOutcome, USAGE};
use hostbridge::constants::{SIM_HOST, SIM_PORT};
use hostbridge::subsystem::runcontrol::TerminationOutcome;
use hostbridge::testkit::LoopbackDevice;
use hostbridge::transport::TcpTransport;
use hostbridge::Bridge;

fn main() -> ExitCode {
    simple_logger::SimpleLogger::new().init().unwrap();

    let config = match parse_args(std::env::args().skip(1)) {
        Ok(ParseOutcome::Help) => {
            print!("{}", USAGE);
            return ExitCode::from(0);
        }
        Ok(ParseOutcome::Run(config)) => config,
        Err(e) => {
            log::error!("{}", e);
            eprint!("{}", USAGE);
            return ExitCode::from(1);
        }
    };

    log::info!("connecting to simulator at {}:{}", SIM_HOST, SIM_PORT);
    let transport = match TcpTransport::connect(SIM_HOST, SIM_PORT) {
        Ok(t) => t,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::from(1);
        }
    };

    // The external virtio device-emulation library is out of this crate's
    // scope (§1); wire up the in-process loopback stub so the bridge has
    // something to forward MMIO traffic to until that library is linked in.
    let device = Box::new(LoopbackDevice::new(64));

    let mut bridge = match Bridge::new(transport, &config, device) {
        Ok(b) => b,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::from(1);
        }
    };

    match bridge.run() {
        Ok(Some(TerminationOutcome::Passed)) => {
            println!("TEST PASSED");
            ExitCode::from(0)
        }
        Ok(Some(TerminationOutcome::FailedTest(n))) => {
            println!("TEST FAILED (test {})", n);
            ExitCode::from(1)
        }
        Ok(Some(TerminationOutcome::SocFault(code))) => {
            println!("TEST FAILED (soc_status={})", code);
            ExitCode::from(1)
        }
        Ok(None) => {
            log::warn!("coordinator exited without a run-control termination outcome");
            ExitCode::from(1)
        }
        Err(e) => {
            log::error!("{}", e);
            println!("TEST FAILED");
            ExitCode::from(1)
        }
    }
}
