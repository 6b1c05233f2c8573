//! Byte stream reassembly for the gateway socket.
//!
//! The EW11 forwards raw bus bytes with no framing of its own, so TCP reads
//! can split or merge records arbitrarily. [`FrameBuffer`] accumulates reads
//! in a `BytesMut` and splits complete records off the front, using the
//! leading header byte to decide how long each record is: 8 bytes for
//! standard frames, 32 for the metering report, 10 for parking records.
//!
//! A buffer that starts with an unknown header byte cannot be sized, so the
//! whole buffered chunk is surfaced as one record (the caller logs it) and
//! dropped. That keeps a single stray byte from wedging the stream.
//!
//! # Example
//!
//! ```
//! use commax_bridge::protocol::FrameBuffer;
//!
//! let mut buffer = FrameBuffer::new();
//!
//! // A complete outlet state frame in one read
//! let records = buffer.push(&[0xF9, 0x11, 0x05, 0x10, 0x00, 0x00, 0x32, 0x51]);
//! assert_eq!(records.len(), 1);
//! assert!(buffer.is_empty());
//! ```

use bytes::{Bytes, BytesMut};

use super::wire_format::expected_len;

/// Buffer for accumulating socket reads and extracting complete records.
///
/// All data is stored in a single `BytesMut`; complete records are split
/// off the front as zero-copy `Bytes`.
#[derive(Debug)]
pub struct FrameBuffer {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
}

impl FrameBuffer {
    /// Create a new frame buffer.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(256),
        }
    }

    /// Push data into the buffer and extract all complete records.
    ///
    /// This is the main API for processing incoming data from the socket.
    /// If data is fragmented, the partial record stays buffered for the
    /// next push. Records starting with an unknown header come back whole
    /// so the caller can log them.
    pub fn push(&mut self, data: &[u8]) -> Vec<Bytes> {
        self.buffer.extend_from_slice(data);

        let mut records = Vec::new();
        while let Some(record) = self.try_extract_one() {
            records.push(record);
        }
        records
    }

    /// Try to extract a single record from the front of the buffer.
    ///
    /// Returns `None` when the buffer is empty or holds only the prefix of
    /// a known record.
    fn try_extract_one(&mut self) -> Option<Bytes> {
        let header = *self.buffer.first()?;
        match expected_len(header) {
            Some(len) if self.buffer.len() >= len => Some(self.buffer.split_to(len).freeze()),
            // Known header, rest of the record not read yet
            Some(_) => None,
            // Unknown header: surface everything buffered as one record
            None => {
                let len = self.buffer.len();
                Some(self.buffer.split_to(len).freeze())
            }
        }
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer. Called when the gateway connection is replaced so
    /// a stale partial record never prefixes the new stream.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
