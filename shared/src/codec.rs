//! Framing for [`Packet`]s over a byte stream.
//!
//! Each frame is a 4-byte big-endian payload length followed by the bincode
//! encoding of one packet: a little-endian `u32` kind tag, then the kind's
//! fields in declaration order. Both the server and client wrap their sockets
//! in `Framed<_, PacketCodec>`.

use crate::packet::Packet;
use bytes::{Bytes, BytesMut};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

/// Largest payload accepted in either direction. A full 256x256 snapshot fits
/// comfortably.
pub const MAX_FRAME_LENGTH: usize = 8 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed packet: {0}")]
    Malformed(#[from] bincode::Error),
}

#[derive(Debug)]
pub struct PacketCodec {
    frames: LengthDelimitedCodec,
}

impl PacketCodec {
    pub fn new() -> Self {
        Self {
            frames: LengthDelimitedCodec::builder()
                .length_field_length(4)
                .big_endian()
                .max_frame_length(MAX_FRAME_LENGTH)
                .new_codec(),
        }
    }
}

impl Default for PacketCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for PacketCodec {
    type Item = Packet;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Packet>, CodecError> {
        match self.frames.decode(src)? {
            Some(frame) => Ok(Some(bincode::deserialize(&frame)?)),
            None => Ok(None),
        }
    }
}

impl Encoder<Packet> for PacketCodec {
    type Error = CodecError;

    fn encode(&mut self, packet: Packet, dst: &mut BytesMut) -> Result<(), CodecError> {
        let payload = bincode::serialize(&packet)?;
        self.frames.encode(Bytes::from(payload), dst)?;
        Ok(())
    }
}
