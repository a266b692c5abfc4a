/// Errors that can occur while framing or reassembling a message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// A frame did not have the transport's fixed packet size.
    #[error("malformed frame ({actual} bytes, expected {expected})")]
    MalformedFrame { expected: usize, actual: usize },

    /// A frame arrived on a channel or with a tag this reader does not expect.
    #[error(
        "protocol mismatch (channel {channel:#06x} tag {tag:#04x}, \
         expected channel {expected_channel:#06x} tag {expected_tag:#04x})"
    )]
    ProtocolMismatch {
        channel: u16,
        tag: u8,
        expected_channel: u16,
        expected_tag: u8,
    },

    /// A frame's sequence index was not the next one expected.
    #[error("out-of-order frame (sequence {got}, expected {expected})")]
    OutOfOrderFrame { expected: u16, got: u16 },

    /// A frame was pushed after the message was complete.
    #[error("message already finished")]
    AlreadyFinished,

    /// Data was requested before the message was complete.
    #[error("message not ready ({received} of {expected:?} bytes received)")]
    NotReady {
        received: usize,
        expected: Option<usize>,
    },

    /// The message does not fit the 2-byte length field.
    #[error("message too large ({size} bytes, max {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// The packet size cannot hold a first-frame header.
    #[error("invalid packet size {size} (min {min})")]
    InvalidPacketSize { size: usize, min: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
