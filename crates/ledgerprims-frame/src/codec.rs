use bytes::{BufMut, Bytes, BytesMut};

use crate::channel::{DEFAULT_CHANNEL, TAG_APDU};
use crate::error::{FrameError, Result};

/// First frame header: channel (2) + tag (1) + sequence (2) + length (2) = 7 bytes.
pub const FIRST_HEADER_SIZE: usize = 7;

/// Continuation frame header: channel (2) + tag (1) + sequence (2) = 5 bytes.
pub const CONTINUATION_HEADER_SIZE: usize = 5;

/// HID report size used by Ledger devices.
pub const DEFAULT_PACKET_SIZE: usize = 64;

/// Largest message the 2-byte length field can describe.
pub const MAX_MESSAGE_LEN: usize = u16::MAX as usize;

/// Framing parameters shared by the writer and reader of one link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameConfig {
    /// Total size of every frame in bytes. Default: 64.
    pub packet_size: usize,
    /// Channel stamped on outbound frames and required on inbound ones.
    pub channel_id: u16,
    /// Tag stamped on outbound frames and required on inbound ones.
    pub tag: u8,
}

impl FrameConfig {
    /// Create a config for the given packet size with the default channel and APDU tag.
    pub fn with_packet_size(packet_size: usize) -> Self {
        Self {
            packet_size,
            ..Self::default()
        }
    }

    /// Check that a first-frame header fits in one packet.
    pub fn validate(&self) -> Result<()> {
        if self.packet_size < FIRST_HEADER_SIZE {
            return Err(FrameError::InvalidPacketSize {
                size: self.packet_size,
                min: FIRST_HEADER_SIZE,
            });
        }
        Ok(())
    }

    /// Payload bytes carried by the first frame.
    pub fn first_capacity(&self) -> usize {
        self.packet_size.saturating_sub(FIRST_HEADER_SIZE)
    }

    /// Payload bytes carried by each continuation frame.
    pub fn continuation_capacity(&self) -> usize {
        self.packet_size.saturating_sub(CONTINUATION_HEADER_SIZE)
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            packet_size: DEFAULT_PACKET_SIZE,
            channel_id: DEFAULT_CHANNEL,
            tag: TAG_APDU,
        }
    }
}

/// Header fields parsed from one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub channel_id: u16,
    pub tag: u8,
    pub sequence: u16,
    /// Present only on the first frame (`sequence == 0`).
    pub total_length: Option<u16>,
}

impl FrameHeader {
    /// Size of this header on the wire.
    pub fn wire_len(&self) -> usize {
        if self.total_length.is_some() {
            FIRST_HEADER_SIZE
        } else {
            CONTINUATION_HEADER_SIZE
        }
    }
}

/// Build the first frame of a message.
///
/// Wire format:
/// ```text
/// ┌────────────┬─────────┬────────────┬──────────────┬──────────────────────┐
/// │ Channel    │ Tag     │ Sequence   │ Total length │ Payload + zero pad   │
/// │ (2B BE)    │ (1B)    │ 0x0000     │ (2B BE)      │ (packet_size - 7 B)  │
/// └────────────┴─────────┴────────────┴──────────────┴──────────────────────┘
/// ```
pub fn encode_first_frame(config: &FrameConfig, total_length: u16, chunk: &[u8]) -> Result<Bytes> {
    config.validate()?;
    let capacity = config.first_capacity();
    if chunk.len() > capacity {
        return Err(FrameError::MalformedFrame {
            expected: config.packet_size,
            actual: FIRST_HEADER_SIZE + chunk.len(),
        });
    }

    let mut dst = BytesMut::with_capacity(config.packet_size);
    dst.put_u16(config.channel_id);
    dst.put_u8(config.tag);
    dst.put_u16(0);
    dst.put_u16(total_length);
    dst.put_slice(chunk);
    dst.resize(config.packet_size, 0);
    Ok(dst.freeze())
}

/// Build a continuation frame (`sequence >= 1`).
///
/// Wire format:
/// ```text
/// ┌────────────┬─────────┬────────────┬──────────────────────┐
/// │ Channel    │ Tag     │ Sequence   │ Payload + zero pad   │
/// │ (2B BE)    │ (1B)    │ (2B BE)    │ (packet_size - 5 B)  │
/// └────────────┴─────────┴────────────┴──────────────────────┘
/// ```
pub fn encode_continuation_frame(
    config: &FrameConfig,
    sequence: u16,
    chunk: &[u8],
) -> Result<Bytes> {
    config.validate()?;
    let capacity = config.continuation_capacity();
    if chunk.len() > capacity {
        return Err(FrameError::MalformedFrame {
            expected: config.packet_size,
            actual: CONTINUATION_HEADER_SIZE + chunk.len(),
        });
    }

    let mut dst = BytesMut::with_capacity(config.packet_size);
    dst.put_u16(config.channel_id);
    dst.put_u8(config.tag);
    dst.put_u16(sequence);
    dst.put_slice(chunk);
    dst.resize(config.packet_size, 0);
    Ok(dst.freeze())
}

/// Parse the header of one frame.
///
/// The buffer must be exactly `packet_size` bytes. The length field is only
/// read when the sequence index is 0.
pub fn parse_frame_header(buf: &[u8], packet_size: usize) -> Result<FrameHeader> {
    if buf.len() != packet_size || packet_size < FIRST_HEADER_SIZE {
        return Err(FrameError::MalformedFrame {
            expected: packet_size,
            actual: buf.len(),
        });
    }

    let channel_id = u16::from_be_bytes([buf[0], buf[1]]);
    let tag = buf[2];
    let sequence = u16::from_be_bytes([buf[3], buf[4]]);
    let total_length = (sequence == 0).then(|| u16::from_be_bytes([buf[5], buf[6]]));

    Ok(FrameHeader {
        channel_id,
        tag,
        sequence,
        total_length,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_layout() {
        let config = FrameConfig::default();
        let frame = encode_first_frame(&config, 5, &[0x00, 0x47, 0x00, 0x00, 0x00]).unwrap();

        assert_eq!(frame.len(), 64);
        assert_eq!(
            &frame[..12],
            &[0x01, 0x01, 0x05, 0x00, 0x00, 0x00, 0x05, 0x00, 0x47, 0x00, 0x00, 0x00]
        );
        assert!(frame[12..].iter().all(|b| *b == 0));
    }

    #[test]
    fn continuation_frame_layout() {
        let config = FrameConfig::default();
        let frame = encode_continuation_frame(&config, 0x0102, &[0xAA, 0xBB]).unwrap();

        assert_eq!(frame.len(), 64);
        assert_eq!(&frame[..7], &[0x01, 0x01, 0x05, 0x01, 0x02, 0xAA, 0xBB]);
        assert!(frame[7..].iter().all(|b| *b == 0));
    }

    #[test]
    fn parse_recovers_first_frame_fields() {
        let config = FrameConfig {
            packet_size: 64,
            channel_id: 0xBEEF,
            tag: 0x02,
        };
        let frame = encode_first_frame(&config, 300, &[1; 57]).unwrap();
        let header = parse_frame_header(&frame, 64).unwrap();

        assert_eq!(header.channel_id, 0xBEEF);
        assert_eq!(header.tag, 0x02);
        assert_eq!(header.sequence, 0);
        assert_eq!(header.total_length, Some(300));
        assert_eq!(header.wire_len(), FIRST_HEADER_SIZE);
    }

    #[test]
    fn parse_continuation_has_no_length() {
        let config = FrameConfig::default();
        let frame = encode_continuation_frame(&config, 3, b"abc").unwrap();
        let header = parse_frame_header(&frame, 64).unwrap();

        assert_eq!(header.sequence, 3);
        assert_eq!(header.total_length, None);
        assert_eq!(header.wire_len(), CONTINUATION_HEADER_SIZE);
    }

    #[test]
    fn parse_rejects_wrong_length() {
        let short = [0u8; 63];
        let err = parse_frame_header(&short, 64).unwrap_err();
        assert_eq!(
            err,
            FrameError::MalformedFrame {
                expected: 64,
                actual: 63
            }
        );

        let long = [0u8; 65];
        assert!(matches!(
            parse_frame_header(&long, 64),
            Err(FrameError::MalformedFrame { .. })
        ));
    }

    #[test]
    fn oversized_chunk_rejected() {
        let config = FrameConfig::default();
        assert!(matches!(
            encode_first_frame(&config, 100, &[0; 58]),
            Err(FrameError::MalformedFrame { .. })
        ));
        assert!(matches!(
            encode_continuation_frame(&config, 1, &[0; 60]),
            Err(FrameError::MalformedFrame { .. })
        ));
    }

    #[test]
    fn packet_size_below_header_rejected() {
        let config = FrameConfig::with_packet_size(6);
        assert_eq!(
            config.validate(),
            Err(FrameError::InvalidPacketSize { size: 6, min: 7 })
        );
        assert!(encode_first_frame(&config, 0, &[]).is_err());
    }

    #[test]
    fn header_sizes_differ_by_length_field() {
        assert_eq!(FIRST_HEADER_SIZE - CONTINUATION_HEADER_SIZE, 2);
        let config = FrameConfig::default();
        assert_eq!(config.first_capacity(), 57);
        assert_eq!(config.continuation_capacity(), 59);
    }
}
