use bytes::Bytes;

use crate::codec::{encode_continuation_frame, encode_first_frame, FrameConfig, MAX_MESSAGE_LEN};
use crate::error::{FrameError, Result};

/// Splits outbound messages into fixed-size frames.
#[derive(Debug, Clone, Copy)]
pub struct MessageWriter {
    config: FrameConfig,
}

impl MessageWriter {
    /// Create a writer, rejecting packet sizes that cannot hold a header.
    pub fn new(config: FrameConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Frame a message.
    ///
    /// The returned sequence borrows `message` and encodes frames lazily, so it
    /// can be iterated again from frame 0 after a failed transmission.
    pub fn frames<'a>(&self, message: &'a [u8]) -> Result<FrameSequence<'a>> {
        if message.len() > MAX_MESSAGE_LEN {
            return Err(FrameError::MessageTooLarge {
                size: message.len(),
                max: MAX_MESSAGE_LEN,
            });
        }
        Ok(FrameSequence {
            config: self.config,
            message,
        })
    }

    /// Current writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

/// Frame `message` for the given channel, tag and packet size.
pub fn to_frames(
    message: &[u8],
    channel_id: u16,
    tag: u8,
    packet_size: usize,
) -> Result<FrameSequence<'_>> {
    MessageWriter::new(FrameConfig {
        packet_size,
        channel_id,
        tag,
    })?
    .frames(message)
}

/// The ordered frames of one message.
#[derive(Debug, Clone, Copy)]
pub struct FrameSequence<'a> {
    config: FrameConfig,
    message: &'a [u8],
}

impl<'a> FrameSequence<'a> {
    /// Number of frames needed for this message (always at least 1).
    pub fn len(&self) -> usize {
        let first = self.config.first_capacity();
        if self.message.len() <= first {
            return 1;
        }
        let rest = self.message.len() - first;
        1 + rest.div_ceil(self.config.continuation_capacity())
    }

    /// A framed message always has a first frame.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterate from frame 0.
    pub fn iter(&self) -> FrameIter<'a> {
        FrameIter {
            config: self.config,
            message: self.message,
            offset: 0,
            sequence: 0,
            total: self.len(),
        }
    }

    /// Encode every frame eagerly.
    pub fn to_vec(&self) -> Result<Vec<Bytes>> {
        self.iter().collect()
    }
}

impl<'a> IntoIterator for &FrameSequence<'a> {
    type Item = Result<Bytes>;
    type IntoIter = FrameIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the frames of a [`FrameSequence`].
#[derive(Debug, Clone)]
pub struct FrameIter<'a> {
    config: FrameConfig,
    message: &'a [u8],
    offset: usize,
    sequence: usize,
    total: usize,
}

impl Iterator for FrameIter<'_> {
    type Item = Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.sequence >= self.total {
            return None;
        }

        let remaining = &self.message[self.offset..];
        let frame = if self.sequence == 0 {
            let take = remaining.len().min(self.config.first_capacity());
            self.offset += take;
            // MAX_MESSAGE_LEN was enforced when the sequence was built.
            encode_first_frame(&self.config, self.message.len() as u16, &remaining[..take])
        } else {
            let take = remaining.len().min(self.config.continuation_capacity());
            self.offset += take;
            encode_continuation_frame(&self.config, self.sequence as u16, &remaining[..take])
        };

        self.sequence += 1;
        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.total - self.sequence;
        (left, Some(left))
    }
}

impl ExactSizeIterator for FrameIter<'_> {}
