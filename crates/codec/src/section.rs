//! Result-file section directory.
//!
//! The directory is a fixed block at file position 0: eight 1-based `i32`
//! addresses, optionally followed by a `VER3.5nn` signature and the addresses
//! of the two extended blocks. A zero address means the section is absent.

use std::fmt;
use std::io::{Read, Seek, SeekFrom};

use serde::{Deserialize, Serialize};
use turnkit_core::{TurnError, TurnResult};

use crate::header::HEADER_SIZE;
use crate::position::SHIP_POSITION_TABLE_SIZE;

/// Size of the mandatory part of the directory.
pub const DIRECTORY_SIZE: usize = 32;

/// Size of the directory including the extended part.
pub const EXTENDED_DIRECTORY_SIZE: usize = 48;

const SIGNATURE_PREFIX: &[u8; 6] = b"VER3.5";

/// Logical sections of a result file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SectionTag {
    /// Ship records.
    Ships,
    /// Visual contacts.
    Targets,
    /// Planet records.
    Planets,
    /// Starbase records.
    Bases,
    /// Inbox messages.
    Messages,
    /// Fixed table of ship positions.
    ShipPositions,
    /// Turn header.
    Header,
    /// Combat recordings.
    Battles,
    /// Extended block with minefields, storms, explosions, ufos, and extra targets.
    BlockK,
    /// Extended block with additional ufos.
    BlockS,
}

impl SectionTag {
    /// Sections addressed by the mandatory directory, in directory order.
    pub const DIRECTORY_ORDER: [SectionTag; 8] = [
        SectionTag::Ships,
        SectionTag::Targets,
        SectionTag::Planets,
        SectionTag::Bases,
        SectionTag::Messages,
        SectionTag::ShipPositions,
        SectionTag::Header,
        SectionTag::Battles,
    ];

    /// Fixed byte size, for sections that have one.
    pub const fn fixed_size(self) -> Option<u64> {
        match self {
            SectionTag::Header => Some(HEADER_SIZE as u64),
            SectionTag::ShipPositions => Some(SHIP_POSITION_TABLE_SIZE as u64),
            _ => None,
        }
    }

    /// Name used in logs and listings.
    pub const fn as_str(self) -> &'static str {
        match self {
            SectionTag::Ships => "ships",
            SectionTag::Targets => "targets",
            SectionTag::Planets => "planets",
            SectionTag::Bases => "bases",
            SectionTag::Messages => "messages",
            SectionTag::ShipPositions => "ship positions",
            SectionTag::Header => "header",
            SectionTag::Battles => "battles",
            SectionTag::BlockK => "block-K",
            SectionTag::BlockS => "block-S",
        }
    }
}

impl fmt::Display for SectionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File dialect of a result file or an outbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dialect {
    /// Legacy fixed-record dialect.
    FormatA,
    /// Extended dialect (signature, extended blocks, flagged outbox).
    FormatB,
}

/// One directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SectionDescriptor {
    /// Which section.
    pub tag: SectionTag,
    /// 0-based byte offset.
    pub offset: u64,
    /// Byte size for fixed-size sections.
    pub fixed_size: Option<u64>,
}

/// Parsed section directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionTable {
    sections: Vec<SectionDescriptor>,
    version: Option<u8>,
}

impl SectionTable {
    /// 0-based offset of a section, or `None` when the file lacks it.
    pub fn offset_of(&self, tag: SectionTag) -> Option<u64> {
        self.descriptor(tag).map(|d| d.offset)
    }

    /// Directory entry of a section, if present.
    pub fn descriptor(&self, tag: SectionTag) -> Option<&SectionDescriptor> {
        self.sections.iter().find(|d| d.tag == tag)
    }

    /// All present sections, ordered by tag.
    pub fn sections(&self) -> &[SectionDescriptor] {
        &self.sections
    }

    /// Minor version from the `VER3.5nn` signature, if present.
    pub fn version(&self) -> Option<u8> {
        self.version
    }

    /// Format-B when the file carries a version signature.
    pub fn dialect(&self) -> Dialect {
        if self.version.is_some() {
            Dialect::FormatB
        } else {
            Dialect::FormatA
        }
    }
}

/// Reads the section directory of a result file.
pub struct SectionIndex;

impl SectionIndex {
    /// Read the directory from the start of `reader`.
    ///
    /// Only the mandatory 32 bytes must be present; the extended part is
    /// optional and absent sections are simply missing from the table.
    pub fn open<R: Read + Seek>(reader: &mut R) -> TurnResult<SectionTable> {
        reader.seek(SeekFrom::Start(0))?;
        let mut raw = Vec::with_capacity(EXTENDED_DIRECTORY_SIZE);
        reader
            .by_ref()
            .take(EXTENDED_DIRECTORY_SIZE as u64)
            .read_to_end(&mut raw)?;
        Self::parse(&raw)
    }

    /// Parse a directory block already in memory.
    pub fn parse(raw: &[u8]) -> TurnResult<SectionTable> {
        if raw.len() < DIRECTORY_SIZE {
            return Err(TurnError::format(format!(
                "result directory truncated: {} of {} bytes",
                raw.len(),
                DIRECTORY_SIZE
            )));
        }

        let address_at = |pos: usize| {
            i32::from_le_bytes([raw[pos], raw[pos + 1], raw[pos + 2], raw[pos + 3]])
        };
        let mut table = SectionTable::default();
        let add = |table: &mut SectionTable, tag: SectionTag, address: i32| {
            if address > 0 {
                table.sections.push(SectionDescriptor {
                    tag,
                    offset: (address - 1) as u64,
                    fixed_size: tag.fixed_size(),
                });
            }
        };

        for (index, tag) in SectionTag::DIRECTORY_ORDER.iter().enumerate() {
            add(&mut table, *tag, address_at(index * 4));
        }

        if raw.len() >= 40 && &raw[32..38] == SIGNATURE_PREFIX {
            let minor = parse_minor(&raw[38..40]);
            table.version = Some(minor);
            if raw.len() >= 44 {
                add(&mut table, SectionTag::BlockK, address_at(40));
            }
            if minor >= 1 && raw.len() >= 48 {
                add(&mut table, SectionTag::BlockS, address_at(44));
            }
        }

        table.sections.sort_by_key(|d| d.tag);
        Ok(table)
    }
}

fn parse_minor(digits: &[u8]) -> u8 {
    digits
        .iter()
        .filter(|d| d.is_ascii_digit())
        .fold(0u8, |acc, d| acc.saturating_mul(10).saturating_add(d - b'0'))
}

/// Build a directory block. Used by writers of synthetic result files.
pub fn encode_directory(addresses: &[(SectionTag, u64)], version: Option<u8>) -> Vec<u8> {
    let address = |tag: SectionTag| {
        addresses
            .iter()
            .find(|(t, _)| *t == tag)
            .map_or(0i32, |(_, offset)| (*offset + 1) as i32)
    };
    let mut out = Vec::with_capacity(EXTENDED_DIRECTORY_SIZE);
    for tag in SectionTag::DIRECTORY_ORDER {
        out.extend_from_slice(&address(tag).to_le_bytes());
    }
    if let Some(minor) = version {
        out.extend_from_slice(SIGNATURE_PREFIX);
        out.extend_from_slice(format!("{:02}", minor.min(99)).as_bytes());
        out.extend_from_slice(&address(SectionTag::BlockK).to_le_bytes());
        out.extend_from_slice(&address(SectionTag::BlockS).to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn legacy_directory() {
        let raw = encode_directory(
            &[
                (SectionTag::Ships, 32),
                (SectionTag::Header, 500),
                (SectionTag::Battles, 900),
            ],
            None,
        );
        let table = SectionIndex::open(&mut Cursor::new(raw)).unwrap();
        assert_eq!(table.offset_of(SectionTag::Ships), Some(32));
        assert_eq!(table.offset_of(SectionTag::Header), Some(500));
        assert_eq!(table.offset_of(SectionTag::Planets), None);
        assert_eq!(table.offset_of(SectionTag::BlockK), None);
        assert_eq!(table.dialect(), Dialect::FormatA);
        assert_eq!(
            table.descriptor(SectionTag::Header).unwrap().fixed_size,
            Some(144)
        );
    }

    #[test]
    fn extended_directory() {
        let raw = encode_directory(
            &[
                (SectionTag::Ships, 48),
                (SectionTag::BlockK, 1000),
                (SectionTag::BlockS, 20000),
            ],
            Some(1),
        );
        let table = SectionIndex::parse(&raw).unwrap();
        assert_eq!(table.version(), Some(1));
        assert_eq!(table.dialect(), Dialect::FormatB);
        assert_eq!(table.offset_of(SectionTag::BlockK), Some(1000));
        assert_eq!(table.offset_of(SectionTag::BlockS), Some(20000));
    }

    #[test]
    fn version_500_has_no_block_s() {
        let raw = encode_directory(
            &[(SectionTag::BlockK, 1000), (SectionTag::BlockS, 20000)],
            Some(0),
        );
        let table = SectionIndex::parse(&raw).unwrap();
        assert!(table.offset_of(SectionTag::BlockK).is_some());
        assert!(table.offset_of(SectionTag::BlockS).is_none());
    }

    #[test]
    fn truncated_directory_is_format_error() {
        let err = SectionIndex::parse(&[0u8; 20]).unwrap_err();
        assert!(matches!(err, TurnError::Format(_)));
    }
}
