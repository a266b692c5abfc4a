use std::fmt;
use std::time::Duration;

use ledgerprims_frame::FrameError;
use ledgerprims_transport::TransportError;

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Framing or reassembly error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The device kept the exchange open past the whole-exchange timeout.
    #[error("exchange timed out after {0:?}")]
    ExchangeTimeout(Duration),

    /// `open` was called on a session that is already open.
    #[error("session already open")]
    AlreadyOpen,

    /// An APDU could not be built or split.
    #[error("invalid apdu: {0}")]
    InvalidApdu(String),
}

impl SessionError {
    /// The single error kind this failure represents.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Frame(err) => match err {
                FrameError::MalformedFrame { .. } => ErrorKind::MalformedFrame,
                FrameError::ProtocolMismatch { .. } => ErrorKind::ProtocolMismatch,
                FrameError::OutOfOrderFrame { .. } => ErrorKind::OutOfOrderFrame,
                FrameError::AlreadyFinished => ErrorKind::AlreadyFinished,
                FrameError::NotReady { .. } => ErrorKind::NotReady,
                FrameError::MessageTooLarge { .. } => ErrorKind::MessageTooLarge,
                FrameError::InvalidPacketSize { .. } => ErrorKind::InvalidPacketSize,
            },
            Self::Transport(err) => match err {
                TransportError::DeviceNotFound(_) => ErrorKind::DeviceNotFound,
                TransportError::DeviceBusy(_) => ErrorKind::DeviceBusy,
                TransportError::TransportClosed => ErrorKind::TransportClosed,
                TransportError::ReadTimeout(_) => ErrorKind::ReadTimeout,
                TransportError::WriteFailed(_) => ErrorKind::WriteFailed,
                TransportError::ReadFailed(_) => ErrorKind::ReadFailed,
                TransportError::InvalidFrameLength { .. } => ErrorKind::MalformedFrame,
                TransportError::Platform(_) => ErrorKind::Platform,
            },
            Self::ExchangeTimeout(_) => ErrorKind::ExchangeTimeout,
            Self::AlreadyOpen => ErrorKind::AlreadyOpen,
            Self::InvalidApdu(_) => ErrorKind::InvalidApdu,
        }
    }
}

/// Flat classification of every session failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedFrame,
    ProtocolMismatch,
    OutOfOrderFrame,
    AlreadyFinished,
    NotReady,
    MessageTooLarge,
    InvalidPacketSize,
    DeviceNotFound,
    DeviceBusy,
    TransportClosed,
    ReadTimeout,
    ExchangeTimeout,
    WriteFailed,
    ReadFailed,
    Platform,
    AlreadyOpen,
    InvalidApdu,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MalformedFrame => "malformed_frame",
            Self::ProtocolMismatch => "protocol_mismatch",
            Self::OutOfOrderFrame => "out_of_order_frame",
            Self::AlreadyFinished => "already_finished",
            Self::NotReady => "not_ready",
            Self::MessageTooLarge => "message_too_large",
            Self::InvalidPacketSize => "invalid_packet_size",
            Self::DeviceNotFound => "device_not_found",
            Self::DeviceBusy => "device_busy",
            Self::TransportClosed => "transport_closed",
            Self::ReadTimeout => "read_timeout",
            Self::ExchangeTimeout => "exchange_timeout",
            Self::WriteFailed => "write_failed",
            Self::ReadFailed => "read_failed",
            Self::Platform => "platform",
            Self::AlreadyOpen => "already_open",
            Self::InvalidApdu => "invalid_apdu",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
