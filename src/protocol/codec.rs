//! Little-endian packet reader and writer
//!
//! The writer supports reserving a `u32` and filling it in later, which the
//! listing response needs for its counts.

use crate::error::{MatchmakingError, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Growable outgoing packet body
#[derive(Debug, Default)]
pub struct PacketWriter {
    buf: BytesMut,
}

impl PacketWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub fn put_u32(&mut self, value: u32) {
        self.buf.put_u32_le(value);
    }

    /// Mask byte followed by the non-zero bytes of `guid`, lowest first
    pub fn put_packed_guid(&mut self, guid: u64) {
        let mut mask = 0u8;
        let mut packed = [0u8; 8];
        let mut len = 0;

        for (i, byte) in guid.to_le_bytes().into_iter().enumerate() {
            if byte != 0 {
                mask |= 1 << i;
                packed[len] = byte;
                len += 1;
            }
        }

        self.buf.put_u8(mask);
        self.buf.put_slice(&packed[..len]);
    }

    /// NUL-terminated string
    pub fn put_cstring(&mut self, value: &str) {
        self.buf.put_slice(value.as_bytes());
        self.buf.put_u8(0);
    }

    /// Write a zero `u32` and return its offset for [`Self::patch_u32`]
    pub fn placeholder_u32(&mut self) -> usize {
        let offset = self.buf.len();
        self.buf.put_u32_le(0);
        offset
    }

    /// Overwrite a previously written `u32`
    pub fn patch_u32(&mut self, offset: usize, value: u32) -> Result<()> {
        let len = self.buf.len();
        let slot = self.buf.get_mut(offset..offset + 4).ok_or_else(|| {
            MatchmakingError::InternalError {
                message: format!(
                    "Patch offset {} out of bounds for {} byte packet",
                    offset, len
                ),
            }
        })?;
        slot.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Cursor over an incoming packet body
#[derive(Debug, Clone)]
pub struct PacketReader {
    buf: Bytes,
}

impl PacketReader {
    pub fn new(buf: impl Into<Bytes>) -> Self {
        Self { buf: buf.into() }
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn need(&self, bytes: usize, what: &str) -> Result<()> {
        if self.buf.remaining() < bytes {
            return Err(MatchmakingError::MalformedRequest {
                reason: format!(
                    "truncated {}: need {} bytes, have {}",
                    what,
                    bytes,
                    self.buf.remaining()
                ),
            }
            .into());
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.need(1, "u8")?;
        Ok(self.buf.get_u8())
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.need(4, "u32")?;
        Ok(self.buf.get_u32_le())
    }

    pub fn read_packed_guid(&mut self) -> Result<u64> {
        let mask = self.read_u8()?;
        let mut bytes = [0u8; 8];
        for (i, byte) in bytes.iter_mut().enumerate() {
            if mask & (1 << i) != 0 {
                *byte = self.read_u8()?;
            }
        }
        Ok(u64::from_le_bytes(bytes))
    }

    /// Read up to the next NUL; a missing terminator is an error
    pub fn read_cstring(&mut self) -> Result<String> {
        let Some(end) = self.buf.iter().position(|&b| b == 0) else {
            return Err(MatchmakingError::MalformedRequest {
                reason: "unterminated string".to_string(),
            }
            .into());
        };

        let raw = self.buf.split_to(end);
        self.buf.advance(1);
        String::from_utf8(raw.to_vec()).map_err(|e| {
            MatchmakingError::MalformedRequest {
                reason: format!("string is not valid UTF-8: {}", e),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integers_are_little_endian() {
        let mut writer = PacketWriter::new();
        writer.put_u32(0x0100_0005);
        writer.put_u8(7);
        assert_eq!(&writer.freeze()[..], &[0x05, 0x00, 0x00, 0x01, 0x07]);
    }

    #[test]
    fn test_packed_guid_skips_zero_bytes() {
        let mut writer = PacketWriter::new();
        writer.put_packed_guid(0x0000_0500_0000_0012);
        let bytes = writer.freeze();
        assert_eq!(&bytes[..], &[0b0010_0001, 0x12, 0x05]);

        let mut reader = PacketReader::new(bytes);
        assert_eq!(reader.read_packed_guid().unwrap(), 0x0000_0500_0000_0012);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_zero_guid_is_a_single_mask_byte() {
        let mut writer = PacketWriter::new();
        writer.put_packed_guid(0);
        assert_eq!(&writer.freeze()[..], &[0]);
    }

    #[test]
    fn test_placeholder_backpatch() {
        let mut writer = PacketWriter::new();
        writer.put_u32(1);
        let offset = writer.placeholder_u32();
        writer.put_u8(9);
        writer.patch_u32(offset, 42).unwrap();

        let mut reader = PacketReader::new(writer.freeze());
        assert_eq!(reader.read_u32().unwrap(), 1);
        assert_eq!(reader.read_u32().unwrap(), 42);
        assert_eq!(reader.read_u8().unwrap(), 9);
    }

    #[test]
    fn test_patch_out_of_bounds_fails() {
        let mut writer = PacketWriter::new();
        writer.put_u8(0);
        assert!(writer.patch_u32(0, 1).is_err());
    }

    #[test]
    fn test_cstring() {
        let mut writer = PacketWriter::new();
        writer.put_cstring("need tank");
        writer.put_u8(1);

        let mut reader = PacketReader::new(writer.freeze());
        assert_eq!(reader.read_cstring().unwrap(), "need tank");
        assert_eq!(reader.read_u8().unwrap(), 1);
    }

    #[test]
    fn test_truncated_input_is_malformed() {
        let mut reader = PacketReader::new(vec![1u8, 2, 3]);
        let err = reader.read_u32().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MatchmakingError>(),
            Some(MatchmakingError::MalformedRequest { .. })
        ));

        let mut reader = PacketReader::new(b"no terminator".to_vec());
        assert!(reader.read_cstring().is_err());
    }
}
