use std::time::Duration;

/// Errors that can occur in device transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The device handle no longer refers to an attached device.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// Another handle or process holds the device.
    #[error("device busy: {0}")]
    DeviceBusy(String),

    /// The transport was closed, or closed while an operation was pending.
    #[error("transport closed")]
    TransportClosed,

    /// No frame arrived within the per-frame timeout.
    #[error("read timed out after {0:?}")]
    ReadTimeout(Duration),

    /// Writing a frame to the device failed.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// Reading a frame from the device failed.
    #[error("read failed: {0}")]
    ReadFailed(String),

    /// A frame handed to `write_frame` did not match the packet size.
    #[error("invalid frame length ({actual} bytes, expected {expected})")]
    InvalidFrameLength { expected: usize, actual: usize },

    /// The platform device layer failed outside of a read or write.
    #[error("platform error: {0}")]
    Platform(String),
}

pub type Result<T> = std::result::Result<T, TransportError>;
