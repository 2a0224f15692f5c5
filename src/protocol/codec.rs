use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::core::{CrtpPacket, Error, CRTP_MAX_DATA_SIZE};

/// Packet framing for byte-stream transports
///
/// Each frame is one length byte (header plus payload), the header byte,
/// then the payload. Radio links frame packets in hardware and do not need
/// this; wired links decode the stream with it.
#[derive(Clone, Default)]
pub struct CrtpCodec;

impl CrtpCodec {
    /// Creates a new packet codec
    pub fn new() -> Self {
        CrtpCodec
    }
}

impl Decoder for CrtpCodec {
    type Item = CrtpPacket;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            // Need the length byte first
            return Ok(None);
        }

        let length = src[0] as usize;
        if length == 0 || length > CRTP_MAX_DATA_SIZE + 1 {
            return Err(Error::protocol(format!("invalid frame length {}", length)));
        }

        if src.len() < 1 + length {
            // Need more data to read the full frame
            return Ok(None);
        }

        src.advance(1);
        let frame = src.split_to(length);
        let packet = CrtpPacket::from_header(frame[0], &frame[1..])?;
        Ok(Some(packet))
    }
}

impl Encoder<CrtpPacket> for CrtpCodec {
    type Error = Error;

    fn encode(&mut self, item: CrtpPacket, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.put_u8(item.size() as u8 + 1);
        dst.put_u8(item.header());
        dst.extend_from_slice(item.data());
        Ok(())
    }
}
