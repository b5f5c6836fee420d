//! Per-player turn header and its working-directory form (the GEN file).
//!
//! Layout (144 bytes):
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0      | 18   | timestamp `MM-DD-YYYYHH:MM:SS` |
//! | 18     | 88   | 11 score rows |
//! | 106    | 2    | owner player |
//! | 108    | 10   | signature block A |
//! | 118    | 10   | signature block B |
//! | 128    | 12   | ship/planet/base checksums |
//! | 140    | 2    | turn number |
//! | 142    | 2    | timestamp checksum |
//!
//! The GEN file may append a 12-byte tail carrying a new-password request.

use std::io::Read;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use turnkit_core::{checksum, ObjectKind, TurnError, TurnResult, MAX_PLAYERS};

use crate::bytes::{ByteReader, ByteWriter};
use crate::record::{read_exactly, SIGNATURE_LEN};

/// Size of the header record.
pub const HEADER_SIZE: usize = 144;

/// Size of a GEN file including the optional tail.
pub const GEN_FILE_SIZE: usize = HEADER_SIZE + 12;

const TIMESTAMP_LEN: usize = 18;
const TIMESTAMP_FORMAT: &str = "%m-%d-%Y%H:%M:%S";

/// Score snapshot of one player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRow {
    /// Planets owned.
    pub planets: i16,
    /// Warships owned.
    pub capital_ships: i16,
    /// Freighters owned.
    pub freighters: i16,
    /// Starbases owned.
    pub bases: i16,
}

/// Per-player turn metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnHeader {
    /// Raw timestamp characters.
    pub timestamp: [u8; TIMESTAMP_LEN],
    /// Score rows for players 1..=11.
    pub scores: [ScoreRow; MAX_PLAYERS as usize],
    /// Player this file belongs to. Checked by callers, not here.
    pub owner: i16,
    /// Stamped onto DAT working files.
    pub signature_a: [u8; SIGNATURE_LEN],
    /// Stamped onto DIS working files.
    pub signature_b: [u8; SIGNATURE_LEN],
    /// Ship, planet, and base checksums.
    pub checksums: [u32; 3],
    /// Turn number.
    pub turn: i16,
    /// Sum of the timestamp bytes.
    pub timestamp_checksum: i16,
}

impl Default for TurnHeader {
    fn default() -> Self {
        Self {
            timestamp: [b' '; TIMESTAMP_LEN],
            scores: [ScoreRow::default(); MAX_PLAYERS as usize],
            owner: 0,
            signature_a: [0; SIGNATURE_LEN],
            signature_b: [0; SIGNATURE_LEN],
            checksums: [0; 3],
            turn: 0,
            timestamp_checksum: 0,
        }
    }
}

fn checksum_slot(kind: ObjectKind) -> usize {
    match kind {
        ObjectKind::Ship => 0,
        ObjectKind::Planet => 1,
        ObjectKind::Base => 2,
    }
}

impl TurnHeader {
    /// Decode from a buffer holding at least [`HEADER_SIZE`] bytes.
    pub fn decode(raw: &[u8]) -> TurnResult<Self> {
        if raw.len() < HEADER_SIZE {
            return Err(TurnError::too_short("turn header", HEADER_SIZE, raw.len()));
        }
        let mut r = ByteReader::new(raw, "turn header");
        let timestamp = r.array()?;
        let mut scores = [ScoreRow::default(); MAX_PLAYERS as usize];
        for row in &mut scores {
            *row = ScoreRow {
                planets: r.i16()?,
                capital_ships: r.i16()?,
                freighters: r.i16()?,
                bases: r.i16()?,
            };
        }
        Ok(Self {
            timestamp,
            scores,
            owner: r.i16()?,
            signature_a: r.array()?,
            signature_b: r.array()?,
            checksums: [r.u32()?, r.u32()?, r.u32()?],
            turn: r.i16()?,
            timestamp_checksum: r.i16()?,
        })
    }

    /// Read exactly one header from a stream.
    pub fn load_from_stream<R: Read>(reader: &mut R) -> TurnResult<Self> {
        let raw = read_exactly(reader, HEADER_SIZE, "turn header")?;
        Self::decode(&raw)
    }

    /// Decode a header from an optional per-player file.
    ///
    /// A zero-length payload means the file was intentionally left empty.
    pub fn load_optional(raw: &[u8]) -> TurnResult<Option<Self>> {
        if raw.is_empty() {
            Ok(None)
        } else {
            Self::decode(raw).map(Some)
        }
    }

    /// Encode the 144-byte header.
    pub fn encode(&self) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(HEADER_SIZE);
        w.bytes(&self.timestamp);
        for row in &self.scores {
            w.i16_slice(&[row.planets, row.capital_ships, row.freighters, row.bases]);
        }
        w.i16(self.owner)
            .bytes(&self.signature_a)
            .bytes(&self.signature_b);
        for sum in self.checksums {
            w.u32(sum);
        }
        w.i16(self.turn).i16(self.timestamp_checksum);
        w.into_inner()
    }

    /// Checksum recorded for a section.
    pub fn checksum(&self, kind: ObjectKind) -> u32 {
        self.checksums[checksum_slot(kind)]
    }

    /// Replace the checksum recorded for a section.
    pub fn set_checksum(&mut self, kind: ObjectKind, value: u32) {
        self.checksums[checksum_slot(kind)] = value;
    }

    /// Timestamp as text.
    pub fn timestamp_text(&self) -> String {
        String::from_utf8_lossy(&self.timestamp).into_owned()
    }

    /// Timestamp as a date, if it is well-formed.
    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.timestamp_text(), TIMESTAMP_FORMAT).ok()
    }

    /// Store a timestamp and refresh its checksum.
    pub fn set_timestamp(&mut self, when: NaiveDateTime) {
        let text = when.format(TIMESTAMP_FORMAT).to_string();
        let bytes = text.as_bytes();
        let len = bytes.len().min(TIMESTAMP_LEN);
        self.timestamp = [b' '; TIMESTAMP_LEN];
        self.timestamp[..len].copy_from_slice(&bytes[..len]);
        self.timestamp_checksum = self.computed_timestamp_checksum();
    }

    /// Additive checksum of the timestamp characters, as stored in the header.
    pub fn computed_timestamp_checksum(&self) -> i16 {
        checksum(&self.timestamp) as i16
    }
}

/// Pending password change carried in the GEN file tail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PasswordChange {
    /// Nonzero when a new password is pending.
    pub flag: i16,
    /// New password bytes.
    pub password: [u8; 10],
}

/// The GEN working file: header plus an optional tail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenFile {
    /// Turn header.
    pub header: TurnHeader,
    /// Tail, absent in short GEN files.
    pub password_change: Option<PasswordChange>,
}

impl GenFile {
    /// Wrap a header with an empty password-change tail.
    pub fn new(header: TurnHeader) -> Self {
        Self {
            header,
            password_change: Some(PasswordChange::default()),
        }
    }

    /// Decode a GEN file. The tail is read only when present in full.
    pub fn decode(raw: &[u8]) -> TurnResult<Self> {
        let header = TurnHeader::decode(raw)?;
        let password_change = if raw.len() >= GEN_FILE_SIZE {
            let mut r = ByteReader::new(&raw[HEADER_SIZE..GEN_FILE_SIZE], "gen file tail");
            Some(PasswordChange {
                flag: r.i16()?,
                password: r.array()?,
            })
        } else {
            None
        };
        Ok(Self {
            header,
            password_change,
        })
    }

    /// Encode the header, followed by the tail when present.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = self.header.encode();
        if let Some(change) = &self.password_change {
            out.extend_from_slice(&change.flag.to_le_bytes());
            out.extend_from_slice(&change.password);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> TurnHeader {
        let mut header = TurnHeader {
            owner: 7,
            turn: 42,
            signature_a: *b"AAAAAAAAAA",
            signature_b: *b"BBBBBBBBBB",
            checksums: [1, 2, 3],
            ..TurnHeader::default()
        };
        header.scores[6].planets = 30;
        header.set_timestamp(
            NaiveDate::from_ymd_opt(2024, 3, 9)
                .unwrap()
                .and_hms_opt(14, 5, 0)
                .unwrap(),
        );
        header
    }

    #[test]
    fn header_roundtrip() {
        let header = sample();
        let raw = header.encode();
        assert_eq!(raw.len(), HEADER_SIZE);
        assert_eq!(TurnHeader::decode(&raw).unwrap(), header);
        assert_eq!(&raw[106..108], &7i16.to_le_bytes());
        assert_eq!(&raw[140..142], &42i16.to_le_bytes());
    }

    #[test]
    fn timestamp_text_and_checksum() {
        let header = sample();
        assert_eq!(header.timestamp_text(), "03-09-202414:05:00");
        assert_eq!(
            header.timestamp_checksum,
            header.computed_timestamp_checksum()
        );
        assert!(header.parsed_timestamp().is_some());
    }

    #[test]
    fn stream_shorter_than_header_fails() {
        let raw = sample().encode();
        let err = TurnHeader::load_from_stream(&mut &raw[..100]).unwrap_err();
        assert!(matches!(
            err,
            TurnError::TooShort {
                needed: 144,
                available: 100,
                ..
            }
        ));
    }

    #[test]
    fn empty_optional_file_is_not_an_error() {
        assert!(TurnHeader::load_optional(&[]).unwrap().is_none());
        assert!(TurnHeader::load_optional(&[0u8; 10]).is_err());
    }

    #[test]
    fn gen_file_tail_is_optional() {
        let gen = GenFile {
            header: sample(),
            password_change: Some(PasswordChange {
                flag: 13,
                password: *b"secret    ",
            }),
        };
        let raw = gen.encode();
        assert_eq!(raw.len(), GEN_FILE_SIZE);
        assert_eq!(GenFile::decode(&raw).unwrap(), gen);

        // Partial tail is ignored, never read past.
        let partial = GenFile::decode(&raw[..HEADER_SIZE + 5]).unwrap();
        assert!(partial.password_change.is_none());
    }

    #[test]
    fn section_checksums_by_kind() {
        let mut header = sample();
        header.set_checksum(ObjectKind::Base, 99);
        assert_eq!(header.checksum(ObjectKind::Ship), 1);
        assert_eq!(header.checksum(ObjectKind::Base), 99);
    }
}
