//! Command-line front door: hand-rolled flag parsing (no external arg
//! parsing crate), following the teacher's pattern of parsing `std::env`
//! directly in `main.rs`.

use crate::error::{BridgeError, Result};

pub const USAGE: &str = "\
usage: hostbridge [OPTIONS]

options:
  --elf <path>         ELF image to load (parsing is external to this crate)
  --memhex32 <path>     memhex32 image to load via the bulk-load driver
  --gdbport <n>         TCP port for the GDB remote-protocol server
  --blockdev <path>      block device image for the virtio bridge
  --tundev <name>        TUN device name for the virtio bridge
  -h, --help             print this message and exit
";

#[derive(Debug, Default, Clone)]
pub struct BridgeConfig {
    pub elf_path: Option<String>,
    pub memhex32_path: Option<String>,
    pub gdbport: Option<u16>,
    pub blockdev_path: Option<String>,
    pub tundev_name: Option<String>,
}

/// Either a config to run with, or a request to print usage and exit 0.
#[derive(Debug)]
pub enum ParseOutcome {
    Run(BridgeConfig),
    Help,
}

pub fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParseOutcome> {
    let mut config = BridgeConfig::default();
    let mut iter = args.into_iter().peekable();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(ParseOutcome::Help),
            "--elf" => config.elf_path = Some(take_value(&mut iter, "--elf")?),
            "--memhex32" => config.memhex32_path = Some(take_value(&mut iter, "--memhex32")?),
            "--gdbport" => {
                let raw = take_value(&mut iter, "--gdbport")?;
                config.gdbport = Some(
                    raw.parse::<u16>()
                        .map_err(|_| BridgeError::InvalidArgument(format!("--gdbport: not a valid port: {}", raw)))?,
                );
            }
            "--blockdev" => config.blockdev_path = Some(take_value(&mut iter, "--blockdev")?),
            "--tundev" => config.tundev_name = Some(take_value(&mut iter, "--tundev")?),
            other => {
                return Err(BridgeError::InvalidArgument(format!("unrecognized option: {}", other)));
            }
        }
    }

    Ok(ParseOutcome::Run(config))
}

fn take_value(iter: &mut std::iter::Peekable<impl Iterator<Item = String>>, flag: &str) -> Result<String> {
    match iter.peek() {
        Some(next) if next.starts_with('-') => Err(BridgeError::InvalidArgument(format!(
            "{} requires a value, got option-like token: {}",
            flag, next
        ))),
        Some(_) => Ok(iter.next().unwrap()),
        None => Err(BridgeError::InvalidArgument(format!("{} requires a value", flag))),
    }
}
