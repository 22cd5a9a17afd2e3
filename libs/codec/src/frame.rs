//! Length-prefixed bincode frames over tokio byte streams

use crate::error::{CodecError, CodecResult};
use bytes::{BufMut, Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

/// Size of the big-endian length prefix
pub const FRAME_HEADER_LEN: usize = 4;

/// Upfront payload buffer; larger frames grow it as bytes arrive
const INITIAL_PAYLOAD_CAPACITY: usize = 64 * 1024;

/// Serialize `value` into a complete frame (prefix + payload)
pub fn encode_frame<T: Serialize>(value: &T) -> CodecResult<Bytes> {
    let payload = bincode::serialize(value).map_err(|e| CodecError::Encode(e.to_string()))?;
    let len = u32::try_from(payload.len()).map_err(|_| CodecError::FrameTooLarge {
        len: payload.len(),
        limit: u32::MAX as usize,
    })?;

    let mut buf = BytesMut::with_capacity(FRAME_HEADER_LEN + payload.len());
    buf.put_u32(len);
    buf.put_slice(&payload);
    Ok(buf.freeze())
}

/// Decode a frame payload (without its prefix)
pub fn decode_payload<T: DeserializeOwned>(payload: &[u8]) -> CodecResult<T> {
    bincode::deserialize(payload).map_err(|e| CodecError::Decode {
        len: payload.len(),
        reason: e.to_string(),
    })
}

/// Write one frame and flush it
pub async fn write_frame<W, T>(writer: &mut W, value: &T) -> CodecResult<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let frame = encode_frame(value)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    trace!(bytes = frame.len(), "frame written");
    Ok(())
}

/// Read one frame
///
/// Returns `Ok(None)` when the stream ends cleanly on a frame boundary. A
/// declared length above `max_len` fails before any payload buffer is allocated,
/// and the buffer grows with the bytes actually received rather than with the
/// declared length.
pub async fn read_frame<R, T>(reader: &mut R, max_len: usize) -> CodecResult<Option<T>>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut header = [0u8; FRAME_HEADER_LEN];
    let mut filled = 0;
    while filled < FRAME_HEADER_LEN {
        let n = reader.read(&mut header[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(CodecError::UnexpectedEof {
                expected: FRAME_HEADER_LEN,
            });
        }
        filled += n;
    }

    let len = u32::from_be_bytes(header) as usize;
    if len > max_len {
        return Err(CodecError::FrameTooLarge {
            len,
            limit: max_len,
        });
    }

    let mut payload = Vec::with_capacity(len.min(INITIAL_PAYLOAD_CAPACITY));
    let received = (&mut *reader)
        .take(len as u64)
        .read_to_end(&mut payload)
        .await?;
    if received < len {
        return Err(CodecError::UnexpectedEof { expected: len });
    }

    trace!(bytes = len, "frame read");
    decode_payload(&payload).map(Some)
}
