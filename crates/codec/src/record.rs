//! Fixed-size record framing.
//!
//! Counted blocks are `i16 count` followed by `count` records of identical size.
//! Working files append a 10-byte signature after the last record.

use std::io::Read;

use turnkit_core::{Charset, TurnError, TurnResult};

use crate::bytes::peek_i16;

/// Length of the signature trailing every DAT/DIS working file.
pub const SIGNATURE_LEN: usize = 10;

/// A record with a fixed binary layout.
pub trait FixedRecord: Sized {
    /// Encoded size in bytes.
    const SIZE: usize;
    /// Name used in error messages.
    const NAME: &'static str;

    /// Decode from at least [`Self::SIZE`] bytes; extra bytes are ignored.
    fn decode(raw: &[u8], charset: &dyn Charset) -> TurnResult<Self>;

    /// Encode into exactly [`Self::SIZE`] bytes.
    fn encode(&self, charset: &dyn Charset) -> TurnResult<Vec<u8>>;
}

/// A record whose layout embeds its object id.
pub trait IdentifiedRecord: FixedRecord {
    /// Byte offset of the `i16` id inside the raw record.
    const ID_OFFSET: usize;

    /// Object id.
    fn id(&self) -> i16;
}

/// Fail with [`TurnError::TooShort`] unless `raw` holds a whole record.
pub fn require_size<T: FixedRecord>(raw: &[u8]) -> TurnResult<()> {
    if raw.len() < T::SIZE {
        Err(TurnError::too_short(T::NAME, T::SIZE, raw.len()))
    } else {
        Ok(())
    }
}

/// Locate the raw record with the given id inside an unordered run of records.
pub fn find_record<T: IdentifiedRecord>(records: &[u8], id: i16) -> Option<&[u8]> {
    records
        .chunks_exact(T::SIZE)
        .find(|raw| peek_i16(raw, T::ID_OFFSET) == id)
}

/// Read the embedded id of a raw record.
pub fn raw_id<T: IdentifiedRecord>(raw: &[u8]) -> i16 {
    peek_i16(raw, T::ID_OFFSET)
}

/// Decode every record of a run of concatenated records.
pub fn decode_all<T: FixedRecord>(records: &[u8], charset: &dyn Charset) -> TurnResult<Vec<T>> {
    if records.len() % T::SIZE != 0 {
        return Err(TurnError::format(format!(
            "{} block of {} bytes is not a multiple of {}",
            T::NAME,
            records.len(),
            T::SIZE
        )));
    }
    records
        .chunks_exact(T::SIZE)
        .map(|raw| T::decode(raw, charset))
        .collect()
}

/// A counted block of raw records as read from a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawBlock {
    /// Record size in bytes.
    pub record_size: usize,
    /// Concatenated raw records.
    pub data: Vec<u8>,
}

impl RawBlock {
    /// Empty block of the given record size.
    pub fn empty(record_size: usize) -> Self {
        Self {
            record_size,
            data: Vec::new(),
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        if self.record_size == 0 {
            0
        } else {
            self.data.len() / self.record_size
        }
    }

    /// Whether the block has no records.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate over raw records.
    pub fn records(&self) -> std::slice::ChunksExact<'_, u8> {
        self.data.chunks_exact(self.record_size.max(1))
    }

    /// Append one raw record.
    pub fn push(&mut self, raw: &[u8]) {
        debug_assert_eq!(raw.len(), self.record_size);
        self.data.extend_from_slice(raw);
    }

    /// Serialize as `u16 count` followed by the records.
    pub fn to_counted_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 + self.data.len());
        out.extend_from_slice(&(self.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.data);
        out
    }
}

/// Read exactly `len` bytes, reporting how many were actually available.
pub fn read_exactly<R: Read>(reader: &mut R, len: usize, what: &'static str) -> TurnResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(len);
    reader.by_ref().take(len as u64).read_to_end(&mut buf)?;
    if buf.len() < len {
        return Err(TurnError::too_short(what, len, buf.len()));
    }
    Ok(buf)
}

/// Read an `i16` record count and validate it against `max`.
pub fn read_count<R: Read>(reader: &mut R, max: usize, what: &'static str) -> TurnResult<usize> {
    let raw = read_exactly(reader, 2, what)?;
    let count = i16::from_le_bytes([raw[0], raw[1]]);
    if count < 0 || count as usize > max {
        return Err(TurnError::format(format!(
            "implausible {what} count {count} (maximum {max})"
        )));
    }
    Ok(count as usize)
}

/// Read a counted block of `record_size`-byte records.
pub fn read_counted_block<R: Read>(
    reader: &mut R,
    record_size: usize,
    max: usize,
    what: &'static str,
) -> TurnResult<RawBlock> {
    let count = read_count(reader, max, what)?;
    let data = read_exactly(reader, count * record_size, what)?;
    Ok(RawBlock { record_size, data })
}

/// Parse a working file: counted block plus optional trailing signature.
///
/// Returns the block and the signature if one follows the records.
pub fn parse_working_file(
    data: &[u8],
    record_size: usize,
    max: usize,
    what: &'static str,
) -> TurnResult<(RawBlock, Option<[u8; SIGNATURE_LEN]>)> {
    let mut cursor = data;
    let block = read_counted_block(&mut cursor, record_size, max, what)?;
    let signature = if cursor.len() >= SIGNATURE_LEN {
        let mut sig = [0u8; SIGNATURE_LEN];
        sig.copy_from_slice(&cursor[..SIGNATURE_LEN]);
        Some(sig)
    } else {
        None
    };
    Ok((block, signature))
}

/// Build a working file: counted block followed by a signature.
pub fn build_working_file(block: &RawBlock, signature: &[u8; SIGNATURE_LEN]) -> Vec<u8> {
    let mut out = block.to_counted_bytes();
    out.extend_from_slice(signature);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counted_block_roundtrip() {
        let mut block = RawBlock::empty(3);
        block.push(&[1, 2, 3]);
        block.push(&[4, 5, 6]);
        let bytes = block.to_counted_bytes();
        assert_eq!(&bytes[..2], &[2, 0]);
        let reread = read_counted_block(&mut &bytes[..], 3, 10, "test").unwrap();
        assert_eq!(reread, block);
    }

    #[test]
    fn negative_count_is_fatal() {
        let bytes = [0xFF, 0xFF];
        let err = read_counted_block(&mut &bytes[..], 3, 10, "ship").unwrap_err();
        assert!(matches!(err, TurnError::Format(_)));
    }

    #[test]
    fn implausible_count_is_fatal() {
        let bytes = 11i16.to_le_bytes();
        assert!(read_count(&mut &bytes[..], 10, "planet").is_err());
    }

    #[test]
    fn truncated_block_reports_available_bytes() {
        let bytes = [2, 0, 1, 2, 3, 4];
        let err = read_counted_block(&mut &bytes[..], 3, 10, "base").unwrap_err();
        assert!(matches!(
            err,
            TurnError::TooShort {
                needed: 6,
                available: 4,
                ..
            }
        ));
    }

    #[test]
    fn working_file_signature_is_optional() {
        let mut block = RawBlock::empty(2);
        block.push(&[9, 9]);
        let with_sig = build_working_file(&block, b"0123456789");
        let (parsed, sig) = parse_working_file(&with_sig, 2, 10, "x").unwrap();
        assert_eq!(parsed, block);
        assert_eq!(&sig.unwrap(), b"0123456789");

        let without = block.to_counted_bytes();
        let (_, sig) = parse_working_file(&without, 2, 10, "x").unwrap();
        assert!(sig.is_none());
    }
}
