//! Little-endian cursor helpers shared by every record layout.

use turnkit_core::{TurnError, TurnResult};

/// Bounds-checked reader over a byte slice.
///
/// Every read fails with [`TurnError::TooShort`] instead of reading past the end.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    what: &'static str,
}

impl<'a> ByteReader<'a> {
    /// Start reading `data`; `what` names the record in error messages.
    pub fn new(data: &'a [u8], what: &'static str) -> Self {
        Self { data, pos: 0, what }
    }

    /// Current position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Borrow the next `len` bytes.
    pub fn take(&mut self, len: usize) -> TurnResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(TurnError::too_short(
                self.what,
                self.pos + len,
                self.data.len(),
            ));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Read a fixed-size byte array.
    pub fn array<const N: usize>(&mut self) -> TurnResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Read one byte.
    pub fn u8(&mut self) -> TurnResult<u8> {
        Ok(self.take(1)?[0])
    }

    /// Read a little-endian `i16`.
    pub fn i16(&mut self) -> TurnResult<i16> {
        Ok(i16::from_le_bytes(self.array()?))
    }

    /// Read a little-endian `u16`.
    pub fn u16(&mut self) -> TurnResult<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    /// Read a little-endian `i32`.
    pub fn i32(&mut self) -> TurnResult<i32> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    /// Read a little-endian `u32`.
    pub fn u32(&mut self) -> TurnResult<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    /// Read `N` consecutive `i16` values.
    pub fn i16_array<const N: usize>(&mut self) -> TurnResult<[i16; N]> {
        let mut out = [0i16; N];
        for slot in &mut out {
            *slot = self.i16()?;
        }
        Ok(out)
    }

    /// Read `N` consecutive `i32` values.
    pub fn i32_array<const N: usize>(&mut self) -> TurnResult<[i32; N]> {
        let mut out = [0i32; N];
        for slot in &mut out {
            *slot = self.i32()?;
        }
        Ok(out)
    }
}

/// Append-only little-endian writer.
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    /// Create a writer with capacity for `size` bytes.
    pub fn with_capacity(size: usize) -> Self {
        Self {
            buf: Vec::with_capacity(size),
        }
    }

    /// Append raw bytes.
    pub fn bytes(&mut self, data: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(data);
        self
    }

    /// Append one byte.
    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    /// Append a little-endian `i16`.
    pub fn i16(&mut self, value: i16) -> &mut Self {
        self.bytes(&value.to_le_bytes())
    }

    /// Append a little-endian `u16`.
    pub fn u16(&mut self, value: u16) -> &mut Self {
        self.bytes(&value.to_le_bytes())
    }

    /// Append a little-endian `i32`.
    pub fn i32(&mut self, value: i32) -> &mut Self {
        self.bytes(&value.to_le_bytes())
    }

    /// Append a little-endian `u32`.
    pub fn u32(&mut self, value: u32) -> &mut Self {
        self.bytes(&value.to_le_bytes())
    }

    /// Append several `i16` values.
    pub fn i16_slice(&mut self, values: &[i16]) -> &mut Self {
        for &value in values {
            self.i16(value);
        }
        self
    }

    /// Append several `i32` values.
    pub fn i32_slice(&mut self, values: &[i32]) -> &mut Self {
        for &value in values {
            self.i32(value);
        }
        self
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing was written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Finish and return the buffer.
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Read an `i16` at a fixed offset of a raw record.
pub(crate) fn peek_i16(raw: &[u8], offset: usize) -> i16 {
    i16::from_le_bytes([raw[offset], raw[offset + 1]])
}

/// Overwrite an `i16` at a fixed offset of a raw record.
pub(crate) fn poke_i16(raw: &mut [u8], offset: usize, value: i16) {
    raw[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian() {
        let data = [0x34, 0x12, 0xFF, 0xFF, 0x78, 0x56, 0x34, 0x12];
        let mut reader = ByteReader::new(&data, "test");
        assert_eq!(reader.u16().unwrap(), 0x1234);
        assert_eq!(reader.i16().unwrap(), -1);
        assert_eq!(reader.u32().unwrap(), 0x1234_5678);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn never_reads_past_end() {
        let data = [1, 2, 3];
        let mut reader = ByteReader::new(&data, "record");
        assert_eq!(reader.i16().unwrap(), 0x0201);
        let err = reader.i32().unwrap_err();
        assert!(matches!(
            err,
            TurnError::TooShort {
                what: "record",
                needed: 6,
                available: 3
            }
        ));
        // A failed read does not advance.
        assert_eq!(reader.position(), 2);
    }

    #[test]
    fn writer_appends() {
        let mut writer = ByteWriter::with_capacity(8);
        writer.i16(-2).u32(7).u8(9);
        assert_eq!(writer.into_inner(), vec![0xFE, 0xFF, 7, 0, 0, 0, 9]);
    }

    #[test]
    fn peek_and_poke() {
        let mut raw = [0u8; 4];
        poke_i16(&mut raw, 2, 300);
        assert_eq!(peek_i16(&raw, 2), 300);
    }
}
