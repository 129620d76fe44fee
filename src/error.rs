use std::error::Error;
use std::fmt;

/// Every fallible operation in the bridge returns one of these. The low
/// layers never panic on a protocol violation; they report it here and let
/// the caller (usually a subsystem worker, ultimately the coordinator)
/// decide whether to log-and-continue or escalate to `terminating`.
#[derive(Debug)]
pub enum BridgeError {
    /// Violation of alignment/boundary pre-conditions, unknown channel id,
    /// malformed CLI.
    InvalidArgument(String),
    /// Short read/write, mismatched frame length, non-OK bus response,
    /// `last` bit misplacement.
    TransportFault(String),
    /// A paired queue was full at enqueue time. Credits are supposed to
    /// make this unreachable; seeing it means a bookkeeping bug upstream.
    QueueOverflow(String),
    /// A bounded busy-wait (channel avail, framing engine drain) exceeded
    /// its spin budget.
    PollTimeout(String),
    /// Received packet carried an unknown channel tag.
    ProtocolFault(String),
    /// Non-recoverable OS-level error from the transport.
    Fatal(String),
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::InvalidArgument(m) => write!(f, "invalid argument: {}", m),
            BridgeError::TransportFault(m) => write!(f, "transport fault: {}", m),
            BridgeError::QueueOverflow(m) => write!(f, "queue overflow (design bug): {}", m),
            BridgeError::PollTimeout(m) => write!(f, "poll timeout: {}", m),
            BridgeError::ProtocolFault(m) => write!(f, "protocol fault: {}", m),
            BridgeError::Fatal(m) => write!(f, "fatal: {}", m),
        }
    }
}

impl Error for BridgeError {}

impl From<std::io::Error> for BridgeError {
    fn from(e: std::io::Error) -> Self {
        BridgeError::Fatal(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
