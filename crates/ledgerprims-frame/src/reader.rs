use bytes::{Bytes, BytesMut};
use tracing::trace;

use crate::codec::{parse_frame_header, FrameConfig, CONTINUATION_HEADER_SIZE, FIRST_HEADER_SIZE};
use crate::error::{FrameError, Result};

/// Reassembly progress of a [`MessageReader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// No frame accepted yet.
    AwaitingFirst,
    /// First frame accepted, more payload expected.
    Accumulating { expected_sequence: u16 },
    /// `total_length` bytes received.
    Finished,
}

/// Reassembles one inbound message from fixed-size frames.
///
/// The device never announces "more frames coming" except through the
/// length field of the first frame, so any deviation from the expected
/// channel, tag or sequence is rejected instead of guessed around.
#[derive(Debug)]
pub struct MessageReader {
    config: FrameConfig,
    state: ReaderState,
    total_length: Option<usize>,
    buf: BytesMut,
}

impl MessageReader {
    /// Create a reader expecting frames on `config.channel_id` with `config.tag`.
    pub fn new(config: FrameConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: ReaderState::AwaitingFirst,
            total_length: None,
            buf: BytesMut::new(),
        })
    }

    /// Feed one raw frame.
    pub fn push_frame(&mut self, frame: &[u8]) -> Result<ReaderState> {
        if self.state == ReaderState::Finished {
            return Err(FrameError::AlreadyFinished);
        }

        let header = parse_frame_header(frame, self.config.packet_size)?;
        if header.channel_id != self.config.channel_id || header.tag != self.config.tag {
            return Err(FrameError::ProtocolMismatch {
                channel: header.channel_id,
                tag: header.tag,
                expected_channel: self.config.channel_id,
                expected_tag: self.config.tag,
            });
        }

        match self.state {
            ReaderState::AwaitingFirst => {
                if header.sequence != 0 {
                    return Err(FrameError::OutOfOrderFrame {
                        expected: 0,
                        got: header.sequence,
                    });
                }
                let total = header.total_length.unwrap_or_default() as usize;
                self.total_length = Some(total);
                self.buf.reserve(total);
                self.append(&frame[FIRST_HEADER_SIZE..], total);
                trace!(total, received = self.buf.len(), "first frame accepted");
            }
            ReaderState::Accumulating { expected_sequence } => {
                if header.sequence != expected_sequence {
                    return Err(FrameError::OutOfOrderFrame {
                        expected: expected_sequence,
                        got: header.sequence,
                    });
                }
                let total = self.total_length.unwrap_or_default();
                self.append(&frame[CONTINUATION_HEADER_SIZE..], total);
                trace!(
                    sequence = header.sequence,
                    received = self.buf.len(),
                    total,
                    "continuation frame accepted"
                );
            }
            ReaderState::Finished => return Err(FrameError::AlreadyFinished),
        }

        self.state = if Some(self.buf.len()) == self.total_length {
            ReaderState::Finished
        } else {
            ReaderState::Accumulating {
                expected_sequence: header.sequence.wrapping_add(1),
            }
        };
        Ok(self.state)
    }

    fn append(&mut self, payload: &[u8], total: usize) {
        let take = payload.len().min(total - self.buf.len());
        self.buf.extend_from_slice(&payload[..take]);
    }

    /// Current reassembly state.
    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// True once the whole message has been received.
    pub fn is_finished(&self) -> bool {
        self.state == ReaderState::Finished
    }

    /// Declared message length, known after the first frame.
    pub fn expected_length(&self) -> Option<usize> {
        self.total_length
    }

    /// Borrow the reassembled message.
    pub fn data(&self) -> Result<&[u8]> {
        self.check_ready()?;
        Ok(&self.buf)
    }

    /// Consume the reader and return the reassembled message.
    pub fn into_data(self) -> Result<Bytes> {
        self.check_ready()?;
        Ok(self.buf.freeze())
    }

    /// Current reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    fn check_ready(&self) -> Result<()> {
        if self.state != ReaderState::Finished {
            return Err(FrameError::NotReady {
                received: self.buf.len(),
                expected: self.total_length,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{encode_continuation_frame, encode_first_frame};
    use crate::writer::to_frames;

    fn reader() -> MessageReader {
        MessageReader::new(FrameConfig::default()).unwrap()
    }

    #[test]
    fn single_frame_message() {
        let frames = to_frames(b"\x90\x00", 0x0101, 0x05, 64).unwrap().to_vec().unwrap();
        let mut reader = reader();

        assert_eq!(reader.push_frame(&frames[0]).unwrap(), ReaderState::Finished);
        assert_eq!(reader.data().unwrap(), b"\x90\x00");
        assert_eq!(reader.expected_length(), Some(2));
    }

    #[test]
    fn multi_frame_message_finishes_on_last_frame() {
        let message: Vec<u8> = (0..200u16).map(|i| (i * 7) as u8).collect();
        let frames = to_frames(&message, 0x0101, 0x05, 64).unwrap().to_vec().unwrap();
        assert_eq!(frames.len(), 4);

        let mut reader = reader();
        for (index, frame) in frames.iter().enumerate() {
            let state = reader.push_frame(frame).unwrap();
            if index < 3 {
                assert_eq!(
                    state,
                    ReaderState::Accumulating {
                        expected_sequence: index as u16 + 1
                    }
                );
                assert!(!reader.is_finished());
            } else {
                assert_eq!(state, ReaderState::Finished);
            }
        }

        assert_eq!(reader.into_data().unwrap().as_ref(), message.as_slice());
    }

    #[test]
    fn empty_message_finishes_immediately() {
        let frames = to_frames(&[], 0x0101, 0x05, 64).unwrap().to_vec().unwrap();
        let mut reader = reader();
        assert_eq!(reader.push_frame(&frames[0]).unwrap(), ReaderState::Finished);
        assert!(reader.data().unwrap().is_empty());
    }

    #[test]
    fn roundtrip_across_packet_sizes() {
        for len in [0usize, 1, 56, 57, 58, 200, 4096] {
            let message: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            for packet_size in [7usize, 8, 64, 65] {
                let config = FrameConfig::with_packet_size(packet_size);
                let frames = to_frames(&message, config.channel_id, config.tag, packet_size)
                    .unwrap()
                    .to_vec()
                    .unwrap();
                let mut reader = MessageReader::new(config).unwrap();
                for frame in &frames {
                    reader.push_frame(frame).unwrap();
                }
                assert_eq!(
                    reader.data().unwrap(),
                    message.as_slice(),
                    "len {len} packet {packet_size}"
                );
            }
        }
    }

    #[test]
    fn largest_message_roundtrips() {
        let message: Vec<u8> = (0..u16::MAX as usize).map(|i| (i % 253) as u8).collect();
        let frames = to_frames(&message, 0x0101, 0x05, 64).unwrap();
        let mut reader = reader();
        for frame in &frames {
            reader.push_frame(&frame.unwrap()).unwrap();
        }
        assert_eq!(reader.into_data().unwrap().as_ref(), message.as_slice());
    }

    #[test]
    fn wrong_channel_is_protocol_mismatch() {
        let frames = to_frames(b"hello", 0x0202, 0x05, 64).unwrap().to_vec().unwrap();
        let err = reader().push_frame(&frames[0]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::ProtocolMismatch {
                channel: 0x0202,
                expected_channel: 0x0101,
                ..
            }
        ));
    }

    #[test]
    fn wrong_tag_is_protocol_mismatch() {
        let frames = to_frames(b"hello", 0x0101, 0x02, 64).unwrap().to_vec().unwrap();
        let err = reader().push_frame(&frames[0]).unwrap_err();
        assert!(matches!(err, FrameError::ProtocolMismatch { tag: 0x02, .. }));
    }

    #[test]
    fn wrong_channel_mid_message_is_protocol_mismatch() {
        let config = FrameConfig::default();
        let other = FrameConfig {
            channel_id: 0x0303,
            ..config
        };
        let mut reader = reader();
        reader
            .push_frame(&encode_first_frame(&config, 100, &[0; 57]).unwrap())
            .unwrap();
        let err = reader
            .push_frame(&encode_continuation_frame(&other, 1, &[0; 43]).unwrap())
            .unwrap_err();
        assert!(matches!(err, FrameError::ProtocolMismatch { .. }));
    }

    #[test]
    fn skipped_sequence_is_out_of_order() {
        let message = vec![0x42; 200];
        let frames = to_frames(&message, 0x0101, 0x05, 64).unwrap().to_vec().unwrap();
        let mut reader = reader();

        reader.push_frame(&frames[0]).unwrap();
        let err = reader.push_frame(&frames[2]).unwrap_err();
        assert_eq!(err, FrameError::OutOfOrderFrame { expected: 1, got: 2 });
    }

    #[test]
    fn continuation_first_is_out_of_order() {
        let message = vec![0x42; 200];
        let frames = to_frames(&message, 0x0101, 0x05, 64).unwrap().to_vec().unwrap();
        let err = reader().push_frame(&frames[1]).unwrap_err();
        assert_eq!(err, FrameError::OutOfOrderFrame { expected: 0, got: 1 });
    }

    #[test]
    fn short_frame_is_malformed() {
        let err = reader().push_frame(&[0x01, 0x01, 0x05, 0x00]).unwrap_err();
        assert!(matches!(err, FrameError::MalformedFrame { expected: 64, actual: 4 }));
    }

    #[test]
    fn push_after_finish_rejected() {
        let frames = to_frames(b"ok", 0x0101, 0x05, 64).unwrap().to_vec().unwrap();
        let mut reader = reader();
        reader.push_frame(&frames[0]).unwrap();
        assert_eq!(reader.push_frame(&frames[0]).unwrap_err(), FrameError::AlreadyFinished);
    }

    #[test]
    fn data_before_finish_not_ready() {
        let reader = reader();
        assert!(matches!(reader.data(), Err(FrameError::NotReady { expected: None, .. })));

        let frames = to_frames(&[7; 100], 0x0101, 0x05, 64).unwrap().to_vec().unwrap();
        let mut reader = MessageReader::new(FrameConfig::default()).unwrap();
        reader.push_frame(&frames[0]).unwrap();
        assert_eq!(
            reader.into_data().unwrap_err(),
            FrameError::NotReady {
                received: 57,
                expected: Some(100)
            }
        );
    }

    #[test]
    fn padding_is_discarded() {
        let config = FrameConfig::default();
        let mut frame = encode_first_frame(&config, 3, b"abc").unwrap().to_vec();
        // Garbage after the declared length must not leak into the message.
        frame[20] = 0xFF;
        let mut reader = reader();
        reader.push_frame(&frame).unwrap();
        assert_eq!(reader.data().unwrap(), b"abc");
    }
}
