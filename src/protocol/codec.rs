//! Pure transforms between domain values and the gateway's binary framing.
//!
//! Push frame: `[1B command][2B token len][token][2B payload len][payload]
//! [4B identifier][4B expiry]`, all integers big-endian.
//!
//! Feedback stream: repeating `[4B timestamp][2B token len][token]` records
//! until the server closes the connection.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;
use tokio_util::codec::Decoder;

pub const PUSH_COMMAND: u8 = 1;
pub const MAX_PAYLOAD_BYTES: usize = 256;

const FEEDBACK_HEADER_BYTES: usize = 6;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("payload is {0} bytes, the gateway limit is {MAX_PAYLOAD_BYTES}")]
    PayloadTooLarge(usize),
    #[error("device token is empty")]
    EmptyToken,
    #[error("device token is {0} bytes, the length field holds at most {max}", max = u16::MAX)]
    TokenTooLarge(usize),
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("feedback record has a zero-length token")]
    EmptyToken,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Encodes one push notification frame.
///
/// Validation happens before any byte is written, so a failed encode never
/// produces a partial frame.
///
/// # Errors
/// Returns `EncodeError` if the token is empty or oversized, or the payload
/// exceeds the gateway's payload limit.
pub fn encode_push_frame(token: &[u8], payload: &[u8], identifier: u32, expiry: u32) -> Result<Bytes, EncodeError> {
    if token.is_empty() {
        return Err(EncodeError::EmptyToken);
    }
    if token.len() > usize::from(u16::MAX) {
        return Err(EncodeError::TokenTooLarge(token.len()));
    }
    if payload.len() > MAX_PAYLOAD_BYTES {
        return Err(EncodeError::PayloadTooLarge(payload.len()));
    }

    let mut frame = BytesMut::with_capacity(1 + 2 + token.len() + 2 + payload.len() + 4 + 4);
    frame.put_u8(PUSH_COMMAND);
    frame.put_u16(token.len() as u16);
    frame.put_slice(token);
    frame.put_u16(payload.len() as u16);
    frame.put_slice(payload);
    frame.put_u32(identifier);
    frame.put_u32(expiry);
    Ok(frame.freeze())
}

/// One record from the feedback stream: a token the gateway considers
/// permanently unreachable, and when it last failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackTuple {
    /// Epoch seconds.
    pub timestamp: u32,
    pub token: Vec<u8>,
}

/// Incremental decoder for the feedback tuple stream.
///
/// Incomplete trailing bytes stay in the buffer and yield `None` until more
/// data arrives, so repeated partial feeds never produce a spurious tuple.
#[derive(Debug, Default)]
pub struct FeedbackCodec;

impl Decoder for FeedbackCodec {
    type Item = FeedbackTuple;
    type Error = DecodeError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < FEEDBACK_HEADER_BYTES {
            return Ok(None);
        }

        let token_len = usize::from(u16::from_be_bytes([src[4], src[5]]));
        if token_len == 0 {
            return Err(DecodeError::EmptyToken);
        }
        if src.len() < FEEDBACK_HEADER_BYTES + token_len {
            return Ok(None);
        }

        let timestamp = src.get_u32();
        src.advance(2);
        let token = src.split_to(token_len).to_vec();
        Ok(Some(FeedbackTuple { timestamp, token }))
    }
}
