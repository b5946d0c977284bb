pub mod codec;

pub use codec::{
    DecodeError, EncodeError, FeedbackCodec, FeedbackTuple, MAX_PAYLOAD_BYTES, PUSH_COMMAND, encode_push_frame,
};
