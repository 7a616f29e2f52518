/*!
The `byte_cursor` module provides an in-memory, seekable cursor over a byte slice.

An XMI file is loaded into memory in full before sequencing begins -- the container walker's
catalog mode needs to jump to an arbitrary absolute offset and come back, which a forward-only
reader cannot do cheaply. This type exposes a peek/read/tag vocabulary backed by a `&[u8]` and a
plain `usize` position rather than a generic `Read` stream.
!*/

use crate::vlq::{decode_slice, VlqError, CONTINUE};
use log::trace;
use snafu::{ensure, ResultExt, Snafu};

#[derive(Debug, Snafu)]
pub(crate) enum CursorError {
    #[snafu(display("unexpected end of data around byte {}", position))]
    End { position: usize },

    #[snafu(display(
        "expected tag '{}' but found '{}' near position {}",
        expected,
        found,
        position
    ))]
    Tag {
        expected: String,
        found: String,
        position: usize,
    },

    #[snafu(display("too many bytes while reading vlq around {}", position))]
    VlqTooBig { position: usize },

    #[snafu(display("problem decoding vlq around {}: {}", position, source))]
    VlqDecode { position: usize, source: VlqError },

    #[snafu(display("seek target {} is past the end of the data ({} bytes)", target, len))]
    SeekOutOfBounds { target: usize, len: usize },
}

pub(crate) type CursorResult<T> = std::result::Result<T, CursorError>;

/// A cursor over an owned byte buffer. `position` always points at the next byte to be read.
pub(crate) struct ByteCursor<'a> {
    data: &'a [u8],
    position: usize,
    /// An optional exclusive upper bound narrower than `data.len()`, used to confine a recursive
    /// descent into a chunk's own payload without copying it.
    limit: Option<usize>,
}

impl<'a> ByteCursor<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            position: 0,
            limit: None,
        }
    }

    /// A cursor over a sub-range of the same backing buffer, starting at `start` and ending
    /// (exclusive) at `end`.
    pub(crate) fn slice(data: &'a [u8], start: usize, end: usize) -> Self {
        Self {
            data,
            position: start,
            limit: Some(end),
        }
    }

    pub(crate) fn position(&self) -> usize {
        self.position
    }

    fn end(&self) -> usize {
        self.limit.unwrap_or(self.data.len()).min(self.data.len())
    }

    pub(crate) fn is_end(&self) -> bool {
        self.position >= self.end()
    }

    pub(crate) fn remaining(&self) -> usize {
        self.end().saturating_sub(self.position)
    }

    pub(crate) fn seek(&mut self, position: usize) -> CursorResult<()> {
        ensure!(
            position <= self.data.len(),
            SeekOutOfBounds {
                target: position,
                len: self.data.len()
            }
        );
        self.position = position;
        Ok(())
    }

    /// Narrows this cursor's end bound to `end`, used once a chunk's size is known.
    pub(crate) fn set_limit(&mut self, end: usize) {
        self.limit = Some(end);
    }

    pub(crate) fn read(&mut self) -> CursorResult<u8> {
        ensure!(
            self.position < self.end(),
            End {
                position: self.position
            }
        );
        let byte = self.data[self.position];
        trace!("read {:#x} at position {}", byte, self.position);
        self.position += 1;
        Ok(byte)
    }

    pub(crate) fn peek(&self) -> Option<u8> {
        if self.position < self.end() {
            Some(self.data[self.position])
        } else {
            None
        }
    }

    /// Peeks `n` bytes starting at the current position without advancing. Returns `None` if
    /// fewer than `n` bytes remain within bounds.
    pub(crate) fn peek_n(&self, n: usize) -> Option<&'a [u8]> {
        let end = self.position.checked_add(n)?;
        if end <= self.end() {
            Some(&self.data[self.position..end])
        } else {
            None
        }
    }

    pub(crate) fn read_n(&mut self, n: usize) -> CursorResult<&'a [u8]> {
        let end = self.position.checked_add(n).context(End {
            position: self.position,
        })?;
        ensure!(
            end <= self.end(),
            End {
                position: self.position
            }
        );
        let slice = &self.data[self.position..end];
        self.position = end;
        Ok(slice)
    }

    pub(crate) fn read_u16_be(&mut self) -> CursorResult<u16> {
        let bytes = self.read_n(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub(crate) fn read_u32_be(&mut self) -> CursorResult<u32> {
        let bytes = self.read_n(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub(crate) fn read_u16_le(&mut self) -> CursorResult<u16> {
        let bytes = self.read_n(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub(crate) fn read_u32_le(&mut self) -> CursorResult<u32> {
        let bytes = self.read_n(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads a 4-byte ASCII tag and compares it to `expected`.
    pub(crate) fn expect_tag(&mut self, expected: &str) -> CursorResult<()> {
        let position = self.position;
        let tag_bytes = self.read_n(4)?;
        let found = String::from_utf8_lossy(tag_bytes).into_owned();
        ensure!(
            expected == found,
            Tag {
                expected,
                found,
                position
            }
        );
        Ok(())
    }

    /// True if the next 4 bytes equal `tag`, without advancing.
    pub(crate) fn is_tag(&self, tag: &str) -> bool {
        match self.peek_n(4) {
            Some(bytes) => bytes == tag.as_bytes(),
            None => false,
        }
    }

    /// Reads a standard MIDI-file variable-length quantity: 7 bits per byte, high bit means
    /// "more bytes follow". Shared by meta-event lengths and XMI's embedded note durations.
    pub(crate) fn read_vlq_u32(&mut self) -> CursorResult<u32> {
        let start = self.position;
        let mut bytes = Vec::new();
        let mut current = CONTINUE;
        let mut count = 0u8;
        while current & CONTINUE == CONTINUE {
            ensure!(count <= 4, VlqTooBig { position: start });
            current = self.read()?;
            bytes.push(current);
            count += 1;
        }
        let decoded = decode_slice(&bytes).context(VlqDecode { position: start })?;
        trace!("decoded vlq {} from {} bytes", decoded, bytes.len());
        Ok(decoded)
    }

    /// Reads an XMI additive delta-time: bytes with the high bit clear are summed; the run stops
    /// at the first byte that is either not 127 or has its high bit set. A byte with the high bit
    /// set is *not* consumed -- it is the following status byte (or running status continuation).
    pub(crate) fn read_additive_delta(&mut self) -> CursorResult<u32> {
        let mut sum: u32 = 0;
        loop {
            let byte = match self.peek() {
                Some(b) => b,
                None => break,
            };
            if byte & CONTINUE == CONTINUE {
                // high bit set: this is the next status byte, leave it unread.
                break;
            }
            self.position += 1;
            sum = sum.saturating_add(byte as u32);
            if byte != 0x7F {
                break;
            }
        }
        Ok(sum)
    }
}
