//! APDU command and answer shapes at the application boundary.
//!
//! Commands are `CLA INS P1 P2 Lc DATA`; answers are the response data
//! followed by a 2-byte status word. The status word is exposed, not
//! interpreted.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, SessionError};

/// Status word reported for a successful command.
pub const SW_OK: u16 = 0x9000;

/// Largest command body a one-byte `Lc` can describe.
const MAX_COMMAND_DATA: usize = u8::MAX as usize;

/// A short-form APDU command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduCommand {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: Vec<u8>,
}

impl ApduCommand {
    /// Command with an empty body.
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: Vec::new(),
        }
    }

    /// Set the command body.
    pub fn with_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = data.into();
        self
    }

    /// Serialize as `CLA INS P1 P2 Lc DATA`.
    pub fn to_bytes(&self) -> Result<Bytes> {
        if self.data.len() > MAX_COMMAND_DATA {
            return Err(SessionError::InvalidApdu(format!(
                "command data too long ({} bytes, max {MAX_COMMAND_DATA})",
                self.data.len()
            )));
        }
        let mut buf = BytesMut::with_capacity(5 + self.data.len());
        buf.put_u8(self.cla);
        buf.put_u8(self.ins);
        buf.put_u8(self.p1);
        buf.put_u8(self.p2);
        buf.put_u8(self.data.len() as u8);
        buf.put_slice(&self.data);
        Ok(buf.freeze())
    }
}

/// A device response split into data and status word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduAnswer {
    data: Bytes,
    status_word: u16,
}

impl ApduAnswer {
    /// Split a raw response; it must carry at least the status word.
    pub fn from_bytes(mut raw: Bytes) -> Result<Self> {
        if raw.len() < 2 {
            return Err(SessionError::InvalidApdu(format!(
                "response too short for a status word ({} bytes)",
                raw.len()
            )));
        }
        let sw = raw.split_off(raw.len() - 2);
        Ok(Self {
            data: raw,
            status_word: u16::from_be_bytes([sw[0], sw[1]]),
        })
    }

    /// Response data without the status word.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Trailing big-endian status word.
    pub fn status_word(&self) -> u16 {
        self.status_word
    }

    /// True when the status word is `0x9000`.
    pub fn is_success(&self) -> bool {
        self.status_word == SW_OK
    }
}
