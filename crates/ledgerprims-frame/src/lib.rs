//! Fixed-size packet framing for Ledger-class signing devices.
//!
//! Every APDU exchanged with the device is split into packets of exactly
//! `packet_size` bytes. Each packet carries:
//! - A 2-byte big-endian channel ID
//! - A 1-byte tag (APDU or control)
//! - A 2-byte big-endian sequence index
//! - On the first packet only, the 2-byte big-endian total message length
//!
//! The last packet is zero-padded. This crate does no I/O.

pub mod channel;
pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use channel::{DEFAULT_CHANNEL, TAG_APDU, TAG_PING};
pub use codec::{
    encode_continuation_frame, encode_first_frame, parse_frame_header, FrameConfig, FrameHeader,
    CONTINUATION_HEADER_SIZE, DEFAULT_PACKET_SIZE, FIRST_HEADER_SIZE, MAX_MESSAGE_LEN,
};
pub use error::{FrameError, Result};
pub use reader::{MessageReader, ReaderState};
pub use writer::{to_frames, FrameIter, FrameSequence, MessageWriter};
