//! Length-prefixed frame codec and typed field encoding.
//!
//! Every message on the wire is a frame:
//!
//! ```text
//! +-------------------+---------------------+----------------------+
//! | length (VarInt)   | type code (VarInt)  | fields               |
//! +-------------------+---------------------+----------------------+
//! ```
//!
//! The length covers the type code and the fields but not itself. Fixed-width
//! numbers are big-endian; strings and byte arrays carry a VarInt length.

use crate::nbt::BaseNbt;
use bytes::{Buf, BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use uuid::Uuid;

/// Largest frame length expressible in a three byte VarInt.
pub const MAX_FRAME_LEN: usize = 2_097_151;

/// Default character limit for strings read off the wire.
pub const MAX_STRING_CHARS: usize = 32_767;

const MAX_VARINT_LEN: usize = 5;

/// Errors that can occur while reading or writing frames.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the stream on a frame boundary.
    #[error("connection closed")]
    ConnectionClosed,

    /// The stream or frame body ended in the middle of a value.
    #[error("unexpected end of data")]
    UnexpectedEof,

    #[error("VarInt is longer than 5 bytes")]
    VarIntTooLong,

    #[error("frame length {size} exceeds maximum {max}")]
    FrameTooLarge { size: usize, max: usize },

    #[error("zero-length frame")]
    EmptyFrame,

    #[error("negative length prefix {0}")]
    NegativeLength(i32),

    #[error("string of {len} characters exceeds maximum {max}")]
    StringTooLong { len: usize, max: usize },

    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    #[error("expected packet 0x{expected:02X}, got 0x{found:02X}")]
    UnexpectedPacket { expected: i32, found: i32 },

    #[error("unknown intent {0}")]
    InvalidIntent(i32),

    #[error("{0} unread bytes left in frame")]
    TrailingBytes(usize),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One frame: a type code and its undecoded field bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub id: i32,
    pub body: Vec<u8>,
}

impl Frame {
    pub fn new(id: i32, body: Vec<u8>) -> Self {
        Self { id, body }
    }

    /// Returns a cursor over the frame's fields.
    pub fn reader(&self) -> FieldReader<'_> {
        FieldReader::new(&self.body)
    }

    /// Encodes the frame with its length prefix.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let length = varint_len(self.id) + self.body.len();
        if length > MAX_FRAME_LEN {
            return Err(CodecError::FrameTooLarge {
                size: length,
                max: MAX_FRAME_LEN,
            });
        }

        let mut out = Vec::with_capacity(varint_len(length as i32) + length);
        write_varint(&mut out, length as i32);
        write_varint(&mut out, self.id);
        out.extend_from_slice(&self.body);
        Ok(out)
    }
}

/// Appends `value` as a VarInt.
pub fn write_varint<B: BufMut>(buf: &mut B, value: i32) {
    let mut value = value as u32;
    loop {
        if value & !0x7F == 0 {
            buf.put_u8(value as u8);
            return;
        }
        buf.put_u8((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }
}

/// Number of bytes `value` occupies as a VarInt.
pub fn varint_len(value: i32) -> usize {
    let value = value as u32;
    match value {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        0x20_0000..=0x0FFF_FFFF => 4,
        _ => 5,
    }
}

/// Reads a VarInt directly from a stream.
///
/// End of stream before the first byte is reported as
/// [`CodecError::ConnectionClosed`] so callers can tell a clean disconnect
/// from a truncated frame.
pub async fn read_varint<R: AsyncRead + Unpin>(reader: &mut R) -> Result<i32, CodecError> {
    let mut result: u32 = 0;
    for i in 0..MAX_VARINT_LEN {
        let byte = match reader.read_u8().await {
            Ok(byte) => byte,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(if i == 0 {
                    CodecError::ConnectionClosed
                } else {
                    CodecError::UnexpectedEof
                });
            }
            Err(e) => return Err(CodecError::Io(e)),
        };

        result |= ((byte & 0x7F) as u32) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(result as i32);
        }
    }
    Err(CodecError::VarIntTooLong)
}

/// Reads a single frame from the stream.
///
/// Blocks until the full frame is available. Never reads past the end of the
/// frame, so the stream stays positioned on the next frame boundary.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Frame, CodecError> {
    let length = read_varint(reader).await?;
    if length < 0 {
        return Err(CodecError::NegativeLength(length));
    }
    if length == 0 {
        return Err(CodecError::EmptyFrame);
    }
    let length = length as usize;
    if length > MAX_FRAME_LEN {
        return Err(CodecError::FrameTooLarge {
            size: length,
            max: MAX_FRAME_LEN,
        });
    }

    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            CodecError::UnexpectedEof
        } else {
            CodecError::Io(e)
        }
    })?;

    let mut fields = FieldReader::new(&payload);
    let id = fields.varint()?;
    let consumed = fields.consumed();
    payload.drain(..consumed);

    Ok(Frame { id, body: payload })
}

/// Writes one frame as a single buffer and flushes the stream.
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    frame: &Frame,
) -> Result<(), CodecError> {
    let bytes = frame.encode()?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Append-only builder for a frame body.
#[derive(Debug, Default, Clone)]
pub struct FieldWriter {
    buf: BytesMut,
}

impl FieldWriter {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
        }
    }

    pub fn varint(&mut self, value: i32) -> &mut Self {
        write_varint(&mut self.buf, value);
        self
    }

    pub fn bool(&mut self, value: bool) -> &mut Self {
        self.buf.put_u8(value as u8);
        self
    }

    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.buf.put_u8(value);
        self
    }

    pub fn i8(&mut self, value: i8) -> &mut Self {
        self.buf.put_i8(value);
        self
    }

    pub fn u16(&mut self, value: u16) -> &mut Self {
        self.buf.put_u16(value);
        self
    }

    pub fn i16(&mut self, value: i16) -> &mut Self {
        self.buf.put_i16(value);
        self
    }

    pub fn i32(&mut self, value: i32) -> &mut Self {
        self.buf.put_i32(value);
        self
    }

    pub fn i64(&mut self, value: i64) -> &mut Self {
        self.buf.put_i64(value);
        self
    }

    pub fn f32(&mut self, value: f32) -> &mut Self {
        self.buf.put_f32(value);
        self
    }

    pub fn f64(&mut self, value: f64) -> &mut Self {
        self.buf.put_f64(value);
        self
    }

    pub fn string(&mut self, value: &str) -> &mut Self {
        self.byte_array(value.as_bytes())
    }

    /// UUIDs go out as one big-endian 128-bit integer.
    pub fn uuid(&mut self, value: Uuid) -> &mut Self {
        self.buf.put_u128(value.as_u128());
        self
    }

    /// VarInt length followed by the bytes.
    pub fn byte_array(&mut self, value: &[u8]) -> &mut Self {
        write_varint(&mut self.buf, value.len() as i32);
        self.buf.put_slice(value);
        self
    }

    /// Bytes with no length prefix.
    pub fn raw(&mut self, value: &[u8]) -> &mut Self {
        self.buf.put_slice(value);
        self
    }

    /// Block position packed as x:26, z:26, y:12 bits.
    pub fn position(&mut self, x: i32, y: i32, z: i32) -> &mut Self {
        let packed = ((x as i64 & 0x3FF_FFFF) << 38)
            | ((z as i64 & 0x3FF_FFFF) << 12)
            | (y as i64 & 0xFFF);
        self.i64(packed)
    }

    /// VarInt count of longs followed by the longs.
    pub fn bit_set(&mut self, words: &[i64]) -> &mut Self {
        self.varint(words.len() as i32);
        for word in words {
            self.buf.put_i64(*word);
        }
        self
    }

    pub fn nbt(&mut self, root: &BaseNbt) -> &mut Self {
        let mut encoded = Vec::new();
        root.write(&mut encoded);
        self.buf.put_slice(&encoded);
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf.to_vec()
    }

    pub fn into_frame(self, id: i32) -> Frame {
        Frame::new(id, self.into_bytes())
    }
}

/// Cursor over the fields of a frame body.
///
/// Every read checks the remaining length first; `Buf` getters would panic
/// on a short body.
#[derive(Debug, Clone)]
pub struct FieldReader<'a> {
    buf: &'a [u8],
    len: usize,
}

impl<'a> FieldReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            buf: data,
            len: data.len(),
        }
    }

    fn need(&self, n: usize) -> Result<(), CodecError> {
        if self.buf.remaining() < n {
            return Err(CodecError::UnexpectedEof);
        }
        Ok(())
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        self.need(n)?;
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    pub fn varint(&mut self) -> Result<i32, CodecError> {
        let mut result: u32 = 0;
        for i in 0..MAX_VARINT_LEN {
            let byte = self.u8()?;
            result |= ((byte & 0x7F) as u32) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(result as i32);
            }
        }
        Err(CodecError::VarIntTooLong)
    }

    pub fn bool(&mut self) -> Result<bool, CodecError> {
        Ok(self.u8()? != 0)
    }

    pub fn u8(&mut self) -> Result<u8, CodecError> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn i8(&mut self) -> Result<i8, CodecError> {
        self.need(1)?;
        Ok(self.buf.get_i8())
    }

    pub fn u16(&mut self) -> Result<u16, CodecError> {
        self.need(2)?;
        Ok(self.buf.get_u16())
    }

    pub fn i16(&mut self) -> Result<i16, CodecError> {
        self.need(2)?;
        Ok(self.buf.get_i16())
    }

    pub fn i32(&mut self) -> Result<i32, CodecError> {
        self.need(4)?;
        Ok(self.buf.get_i32())
    }

    pub fn i64(&mut self) -> Result<i64, CodecError> {
        self.need(8)?;
        Ok(self.buf.get_i64())
    }

    pub fn f32(&mut self) -> Result<f32, CodecError> {
        self.need(4)?;
        Ok(self.buf.get_f32())
    }

    pub fn f64(&mut self) -> Result<f64, CodecError> {
        self.need(8)?;
        Ok(self.buf.get_f64())
    }

    /// Reads a string of at most `max_chars` characters.
    pub fn string(&mut self, max_chars: usize) -> Result<String, CodecError> {
        let len = self.varint()?;
        if len < 0 {
            return Err(CodecError::NegativeLength(len));
        }
        let len = len as usize;
        // A character takes at most three bytes in the encoded form.
        if len > max_chars * 3 {
            return Err(CodecError::StringTooLong {
                len,
                max: max_chars,
            });
        }

        let bytes = self.take(len)?;
        let value = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)?;
        let chars = value.chars().count();
        if chars > max_chars {
            return Err(CodecError::StringTooLong {
                len: chars,
                max: max_chars,
            });
        }
        Ok(value.to_owned())
    }

    pub fn uuid(&mut self) -> Result<Uuid, CodecError> {
        self.need(16)?;
        Ok(Uuid::from_u128(self.buf.get_u128()))
    }

    pub fn byte_array(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = self.varint()?;
        if len < 0 {
            return Err(CodecError::NegativeLength(len));
        }
        Ok(self.take(len as usize)?.to_vec())
    }

    /// Everything left in the frame.
    pub fn rest(&mut self) -> &'a [u8] {
        let rest = self.buf;
        self.buf = &[];
        rest
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn consumed(&self) -> usize {
        self.len - self.buf.len()
    }

    /// Fails if any bytes were left unread.
    pub fn finish(&self) -> Result<(), CodecError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }
}
