//! Stream framer for the 17-byte-header wire protocol.
//!
//! A TCP read may deliver less than one message (half packet) or more than
//! one message (sticky packet), with chunk boundaries landing anywhere,
//! including mid-header or mid-body. The framer re-assembles the stream into
//! complete, correctly-bounded frames, each surfaced exactly once.
//!
//! The framer is a two-phase fixed-size reader: header mode collects exactly
//! [`HEADER_LENGTH`] bytes, reads the body length at its fixed offset, then
//! body mode collects exactly that many further bytes before emitting the
//! concatenated frame and resetting. One framer instance serves one
//! connection; instances are never shared.

use bytes::{Bytes, BytesMut};

use crate::protocol::error::{Result, RpcError};
use crate::protocol::message::{BODY_LENGTH_OFFSET, HEADER_LENGTH, MAX_BODY_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameMode {
    Header,
    Body,
}

/// Accumulating frame state machine.
///
/// # Example
///
/// ```
/// use keelrpc_common::transport::framer::MessageFramer;
/// use keelrpc_common::transport::codec;
/// use keelrpc_common::protocol::{ProtocolMessage, Serializer};
///
/// let message = ProtocolMessage::heartbeat(Serializer::Json, 1);
/// let encoded = codec::encode(&message).unwrap();
///
/// let mut framer = MessageFramer::new();
/// // Feed the buffer one byte at a time; exactly one frame comes out.
/// let mut frames = Vec::new();
/// for byte in &encoded {
///     frames.extend(framer.push(std::slice::from_ref(byte)).unwrap());
/// }
/// assert_eq!(frames.len(), 1);
/// assert_eq!(&frames[0][..], &encoded[..]);
/// ```
#[derive(Debug)]
pub struct MessageFramer {
    mode: FrameMode,
    /// Bytes still required to finish the current phase
    needed: usize,
    /// Unconsumed input
    pending: BytesMut,
    /// The frame being assembled: header, then header+body
    accumulated: BytesMut,
}

impl MessageFramer {
    pub fn new() -> Self {
        Self {
            mode: FrameMode::Header,
            needed: HEADER_LENGTH,
            pending: BytesMut::new(),
            accumulated: BytesMut::new(),
        }
    }

    /// Feeds one received chunk, returning every frame it completes, in order.
    ///
    /// An oversized body length poisons the stream and is reported as an
    /// error; the connection should be dropped rather than resynchronized.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Bytes>> {
        self.pending.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while self.pending.len() >= self.needed {
            let taken = self.pending.split_to(self.needed);
            self.accumulated.unsplit(taken);

            match self.mode {
                FrameMode::Header => {
                    let body_length = read_body_length(&self.accumulated)?;
                    if body_length > 0 {
                        self.mode = FrameMode::Body;
                        self.needed = body_length;
                    } else {
                        frames.push(self.take_frame());
                    }
                }
                FrameMode::Body => {
                    frames.push(self.take_frame());
                }
            }
        }
        Ok(frames)
    }

    fn take_frame(&mut self) -> Bytes {
        let frame = std::mem::take(&mut self.accumulated).freeze();
        self.mode = FrameMode::Header;
        self.needed = HEADER_LENGTH;
        frame
    }
}

impl Default for MessageFramer {
    fn default() -> Self {
        Self::new()
    }
}

fn read_body_length(header: &[u8]) -> Result<usize> {
    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&header[BODY_LENGTH_OFFSET..BODY_LENGTH_OFFSET + 4]);
    let body_length = u32::from_be_bytes(len_bytes) as usize;
    if body_length > MAX_BODY_SIZE {
        return Err(RpcError::InvalidMessage(format!(
            "body length {} exceeds limit",
            body_length
        )));
    }
    Ok(body_length)
}
