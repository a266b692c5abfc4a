use std::fmt;

use ledgerprims_session::{ErrorKind, SessionError};
use ledgerprims_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DEVICE_NOT_FOUND: i32 = 4;
pub const DEVICE_BUSY: i32 = 5;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Exit code for an error kind.
pub fn code_for(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::DeviceNotFound => DEVICE_NOT_FOUND,
        ErrorKind::DeviceBusy | ErrorKind::AlreadyOpen => DEVICE_BUSY,
        ErrorKind::ReadTimeout | ErrorKind::ExchangeTimeout => TIMEOUT,
        ErrorKind::TransportClosed
        | ErrorKind::WriteFailed
        | ErrorKind::ReadFailed
        | ErrorKind::Platform => TRANSPORT_ERROR,
        ErrorKind::MalformedFrame
        | ErrorKind::ProtocolMismatch
        | ErrorKind::OutOfOrderFrame
        | ErrorKind::MessageTooLarge
        | ErrorKind::InvalidApdu => DATA_INVALID,
        ErrorKind::InvalidPacketSize | ErrorKind::AlreadyFinished | ErrorKind::NotReady => INTERNAL,
    }
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    CliError::new(
        code_for(err.kind()),
        format!("{context}: {err} [{}]", err.kind()),
    )
}

#[cfg_attr(not(feature = "hid"), allow(dead_code))]
pub fn transport_error(context: &str, err: TransportError) -> CliError {
    session_error(context, SessionError::from(err))
}
