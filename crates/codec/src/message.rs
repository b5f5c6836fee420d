//! Message sections: `i16 count`, an index of `{i32 address, i16 length}`
//! entries with 1-based absolute addresses, then the encoded bodies.

use std::io::{Cursor, Read, Seek, SeekFrom};

use turnkit_core::{TurnError, TurnResult};

use crate::bytes::{ByteReader, ByteWriter};
use crate::record::{read_count, read_exactly};

/// Upper bound on messages in one section.
pub const MAX_MESSAGES: usize = 1000;

const INDEX_ENTRY_SIZE: usize = 6;

/// Read all encoded message bodies of a section starting at `offset`.
///
/// Addresses are absolute within `reader`, so bodies may live anywhere.
pub fn read_message_bodies<R: Read + Seek>(reader: &mut R, offset: u64) -> TurnResult<Vec<Vec<u8>>> {
    reader.seek(SeekFrom::Start(offset))?;
    let count = read_count(reader, MAX_MESSAGES, "message")?;
    let index = read_exactly(reader, count * INDEX_ENTRY_SIZE, "message index")?;

    let mut entries = Vec::with_capacity(count);
    let mut r = ByteReader::new(&index, "message index");
    for _ in 0..count {
        let address = r.i32()?;
        let length = r.i16()?;
        if address <= 0 || length < 0 {
            return Err(TurnError::format(format!(
                "invalid message index entry: address {address}, length {length}"
            )));
        }
        entries.push((address as u64 - 1, length as usize));
    }

    let mut bodies = Vec::with_capacity(count);
    for (position, length) in entries {
        reader.seek(SeekFrom::Start(position))?;
        bodies.push(read_exactly(reader, length, "message body")?);
    }
    Ok(bodies)
}

/// Length word of a message body. Bodies that do not fit an `i16` are
/// rejected rather than written with a wrapped length.
pub(crate) fn body_length(body: &[u8]) -> TurnResult<i16> {
    i16::try_from(body.len()).map_err(|_| {
        TurnError::format(format!(
            "message body of {} bytes exceeds {} bytes",
            body.len(),
            i16::MAX
        ))
    })
}

/// Build a standalone message file (inbox) from encoded bodies.
pub fn encode_message_file(bodies: &[Vec<u8>]) -> TurnResult<Vec<u8>> {
    let header_len = 2 + bodies.len() * INDEX_ENTRY_SIZE;
    let total: usize = header_len + bodies.iter().map(Vec::len).sum::<usize>();
    let mut w = ByteWriter::with_capacity(total);
    w.i16(bodies.len() as i16);
    let mut address = header_len + 1;
    for body in bodies {
        w.i32(address as i32).i16(body_length(body)?);
        address += body.len();
    }
    for body in bodies {
        w.bytes(body);
    }
    Ok(w.into_inner())
}

/// Parse a standalone message file. An empty file holds no messages.
pub fn decode_message_file(data: &[u8]) -> TurnResult<Vec<Vec<u8>>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    read_message_bodies(&mut Cursor::new(data), 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_file_roundtrip() {
        let bodies = vec![b"first".to_vec(), Vec::new(), b"third body".to_vec()];
        let file = encode_message_file(&bodies).unwrap();
        assert_eq!(&file[..2], &3i16.to_le_bytes());
        // First body starts right after the index (1-based).
        assert_eq!(&file[2..6], &21i32.to_le_bytes());
        assert_eq!(decode_message_file(&file).unwrap(), bodies);
    }

    #[test]
    fn empty_file_has_no_messages() {
        assert!(decode_message_file(&[]).unwrap().is_empty());
    }

    #[test]
    fn body_outside_file_is_rejected() {
        let mut file = encode_message_file(&[b"hello".to_vec()]).unwrap();
        file.truncate(file.len() - 2);
        assert!(matches!(
            decode_message_file(&file),
            Err(TurnError::TooShort { .. })
        ));
    }

    #[test]
    fn zero_address_is_rejected() {
        let mut file = encode_message_file(&[b"x".to_vec()]).unwrap();
        file[2..6].copy_from_slice(&0i32.to_le_bytes());
        assert!(matches!(decode_message_file(&file), Err(TurnError::Format(_))));
    }

    #[test]
    fn oversize_body_is_rejected() {
        let body = vec![b'a'; i16::MAX as usize + 1];
        assert!(matches!(
            encode_message_file(&[body]),
            Err(TurnError::Format(_))
        ));
    }
}
