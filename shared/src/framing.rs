//! Length-prefixed framing for the relay byte stream.
//!
//! Every message on the wire is a 4-byte little-endian signed length header
//! followed by that many bytes of UTF-8 payload. [`encode_frame`] builds one
//! frame; [`FrameDecoder`] reassembles frames from arbitrary receive chunks,
//! so a single read may yield several messages and a single message may span
//! several reads.

use thiserror::Error;

/// Size of the length header in bytes
pub const HEADER_LEN: usize = 4;

/// Framing faults. Any of these ends the session that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame length header is negative: {0}")]
    NegativeLength(i32),
    #[error("frame of {len} bytes exceeds limit of {limit} bytes")]
    TooLarge { len: usize, limit: usize },
}

/// Wraps `text` in a length-prefixed frame
///
/// The header counts UTF-8 bytes, not characters. Payloads that do not fit
/// in an `i32` header cannot be represented on the wire.
pub fn encode_frame(text: &str) -> Result<Vec<u8>, FrameError> {
    let payload = text.as_bytes();
    let len = i32::try_from(payload.len()).map_err(|_| FrameError::TooLarge {
        len: payload.len(),
        limit: i32::MAX as usize,
    })?;

    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Streaming frame accumulator
///
/// Buffers whatever the socket hands over and hands back complete payloads.
/// Once a header has been consumed its length stays pending until the whole
/// payload has arrived.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    pending: Option<usize>,
    max_len: Option<usize>,
}

impl FrameDecoder {
    /// Creates a decoder with no payload size limit
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a decoder that rejects headers announcing more than `max_len` bytes
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            max_len: Some(max_len),
            ..Self::default()
        }
    }

    /// Appends a received chunk to the internal buffer
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Extracts the next complete payload, if one is buffered
    ///
    /// Invalid UTF-8 is replaced rather than rejected so a single bad byte
    /// does not tear down the connection.
    pub fn next_frame(&mut self) -> Result<Option<String>, FrameError> {
        let len = match self.pending {
            Some(len) => len,
            None => {
                if self.buffer.len() < HEADER_LEN {
                    return Ok(None);
                }

                let header = [self.buffer[0], self.buffer[1], self.buffer[2], self.buffer[3]];
                let raw = i32::from_le_bytes(header);
                let len = usize::try_from(raw).map_err(|_| FrameError::NegativeLength(raw))?;

                if let Some(limit) = self.max_len {
                    if len > limit {
                        return Err(FrameError::TooLarge { len, limit });
                    }
                }

                self.buffer.drain(..HEADER_LEN);
                self.pending = Some(len);
                len
            }
        };

        if self.buffer.len() < len {
            return Ok(None);
        }

        let payload: Vec<u8> = self.buffer.drain(..len).collect();
        self.pending = None;
        Ok(Some(String::from_utf8_lossy(&payload).into_owned()))
    }

    /// Buffers `chunk` and returns every payload it completed, in order
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<String>, FrameError> {
        self.extend(chunk);

        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Number of bytes held that do not yet form a complete payload
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// True when no partial header or payload is outstanding
    pub fn is_idle(&self) -> bool {
        self.pending.is_none() && self.buffer.is_empty()
    }
}
