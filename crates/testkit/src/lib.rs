#![warn(missing_docs)]
//! Synthetic result files and sample records for tests.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::debug;
use turnkit_codec::{
    encode_directory, encode_message, toggle_target_encryption, BaseRecord, BattleRecord,
    FixedRecord, KoreContents, PlanetRecord, SectionTag, ShipPosition, ShipRecord, TargetRecord,
    TurnHeader, Ufo, DIRECTORY_SIZE, EXTENDED_DIRECTORY_SIZE, KORE_TARGET_MARKER,
    SHIP_POSITION_COUNT,
};
use turnkit_core::{checksum, Charset, Latin1, ObjectKind, PlayerId};

/// Signature stamped onto DAT files by unpacks of builder output.
pub const SIGNATURE_A: [u8; 10] = *b"SIGNATURE1";

/// Signature stamped onto DIS files by unpacks of builder output.
pub const SIGNATURE_B: [u8; 10] = *b"SIGNATURE2";

/// Ship owned by `owner` with a handful of non-zero fields.
pub fn sample_ship(id: i16, owner: i16) -> ShipRecord {
    ShipRecord {
        id,
        owner,
        friendly_code: "abc".into(),
        warp: 5,
        x: 1000 + id,
        y: 2000 - id,
        engine_type: 3,
        hull_type: 15,
        beam_type: 2,
        num_beams: 4,
        crew: 120,
        name: format!("Ship {id}"),
        neutronium: 80,
        supplies: 10,
        ..ShipRecord::default()
    }
}

/// Planet owned by `owner`.
pub fn sample_planet(id: i16, owner: i16) -> PlanetRecord {
    PlanetRecord {
        owner,
        id,
        friendly_code: "xyz".into(),
        mines: 20,
        factories: 50,
        defense_posts: 15,
        colonists: 3000,
        supplies: 120,
        money: 400,
        colonist_tax: 7,
        temperature_code: 50,
        ..PlanetRecord::default()
    }
}

/// Starbase owned by `owner`.
pub fn sample_base(id: i16, owner: i16) -> BaseRecord {
    BaseRecord {
        id,
        owner,
        defense_posts: 100,
        tech_levels: [1, 1, 1, 1],
        fighters: 20,
        ..BaseRecord::default()
    }
}

/// Foreign ship as seen by a scanner.
pub fn sample_target(id: i16, owner: i16) -> TargetRecord {
    TargetRecord {
        id,
        owner,
        warp: 7,
        x: 1500,
        y: 1500 + id,
        hull_type: 4,
        heading: 90,
        name: format!("Contact {id}"),
    }
}

/// Builds a byte-exact result file for one player.
///
/// Sections are laid out after the directory in a fixed order. Header
/// checksums are computed from the records unless overridden.
#[derive(Debug, Clone)]
pub struct ResultFileBuilder {
    player: PlayerId,
    owner: i16,
    turn: i16,
    version: Option<u8>,
    ships: Vec<ShipRecord>,
    planets: Vec<PlanetRecord>,
    bases: Vec<BaseRecord>,
    targets: Vec<TargetRecord>,
    kore_targets: Vec<TargetRecord>,
    kore: Option<KoreContents>,
    skore: Option<Vec<Ufo>>,
    messages: Vec<String>,
    positions: Option<Vec<ShipPosition>>,
    battles: Vec<BattleRecord>,
    bad_checksums: Vec<ObjectKind>,
    truncate_to: Option<usize>,
}

impl ResultFileBuilder {
    /// Legacy-dialect result file for `player` at `turn`.
    pub fn new(player: PlayerId, turn: i16) -> Self {
        Self {
            player,
            owner: i16::from(player.get()),
            turn,
            version: None,
            ships: Vec::new(),
            planets: Vec::new(),
            bases: Vec::new(),
            targets: Vec::new(),
            kore_targets: Vec::new(),
            kore: None,
            skore: None,
            messages: Vec::new(),
            positions: None,
            battles: Vec::new(),
            bad_checksums: Vec::new(),
            truncate_to: None,
        }
    }

    /// Switch to the extended dialect with signature `VER3.5{minor:02}`.
    /// Adds an empty Block-K unless one is set.
    pub fn extended(mut self, minor: u8) -> Self {
        self.version = Some(minor);
        self.kore.get_or_insert_with(KoreContents::default);
        self
    }

    /// Store a different owner in the header.
    pub fn owner(mut self, owner: i16) -> Self {
        self.owner = owner;
        self
    }

    /// Add a ship record.
    pub fn ship(mut self, ship: ShipRecord) -> Self {
        self.ships.push(ship);
        self
    }

    /// Add a planet record.
    pub fn planet(mut self, planet: PlanetRecord) -> Self {
        self.planets.push(planet);
        self
    }

    /// Add a starbase record.
    pub fn base(mut self, base: BaseRecord) -> Self {
        self.bases.push(base);
        self
    }

    /// Add a target to the target section.
    pub fn target(mut self, target: TargetRecord) -> Self {
        self.targets.push(target);
        self
    }

    /// Add a target to the encrypted Block-K extension. Implies the
    /// extended dialect.
    pub fn kore_target(mut self, target: TargetRecord) -> Self {
        if self.version.is_none() {
            self = self.extended(1);
        }
        self.kore_targets.push(target);
        self
    }

    /// Replace the Block-K prologue contents.
    pub fn kore(mut self, kore: KoreContents) -> Self {
        self.kore = Some(kore);
        self
    }

    /// Add a Block-S with the given ufos.
    pub fn skore(mut self, ufos: Vec<Ufo>) -> Self {
        self.skore = Some(ufos);
        self
    }

    /// Add an inbox message.
    pub fn message(mut self, text: impl Into<String>) -> Self {
        self.messages.push(text.into());
        self
    }

    /// Add a ship position table; missing slots are zero.
    pub fn ship_positions(mut self, positions: Vec<ShipPosition>) -> Self {
        self.positions = Some(positions);
        self
    }

    /// Add a combat recording.
    pub fn battle(mut self, battle: BattleRecord) -> Self {
        self.battles.push(battle);
        self
    }

    /// Store a wrong header checksum for `kind`.
    pub fn corrupt_checksum(mut self, kind: ObjectKind) -> Self {
        self.bad_checksums.push(kind);
        self
    }

    /// Cut the finished file to `len` bytes.
    pub fn truncate(mut self, len: usize) -> Self {
        self.truncate_to = Some(len);
        self
    }

    /// The header the file will carry.
    pub fn header(&self) -> Result<TurnHeader> {
        let charset = Latin1;
        let mut header = TurnHeader {
            owner: self.owner,
            turn: self.turn,
            signature_a: SIGNATURE_A,
            signature_b: SIGNATURE_B,
            ..TurnHeader::default()
        };
        let when = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|date| date.and_hms_opt(12, 0, 0))
            .context("fixed timestamp")?;
        header.set_timestamp(when);
        header.set_checksum(ObjectKind::Ship, checksum(&records(&self.ships, &charset)?));
        header.set_checksum(
            ObjectKind::Planet,
            checksum(&records(&self.planets, &charset)?),
        );
        header.set_checksum(ObjectKind::Base, checksum(&records(&self.bases, &charset)?));
        for kind in &self.bad_checksums {
            let sum = header.checksum(*kind);
            header.set_checksum(*kind, sum.wrapping_add(1));
        }
        Ok(header)
    }

    /// Encode the file.
    pub fn build(&self) -> Result<Vec<u8>> {
        let charset = Latin1;
        let directory_len = if self.version.is_some() {
            EXTENDED_DIRECTORY_SIZE
        } else {
            DIRECTORY_SIZE
        };

        let mut sections: Vec<(SectionTag, Vec<u8>)> = vec![
            (SectionTag::Header, self.header()?.encode()),
            (SectionTag::Ships, counted(&self.ships, &charset)?),
            (SectionTag::Targets, counted(&self.targets, &charset)?),
            (SectionTag::Planets, counted(&self.planets, &charset)?),
            (SectionTag::Bases, counted(&self.bases, &charset)?),
        ];
        if let Some(positions) = &self.positions {
            let mut table = positions.clone();
            table.resize(SHIP_POSITION_COUNT, ShipPosition::default());
            sections.push((SectionTag::ShipPositions, records(&table, &charset)?));
        }
        sections.push((SectionTag::Battles, counted(&self.battles, &charset)?));
        if self.version.is_some() {
            if let Some(kore) = &self.kore {
                let mut raw = kore.encode(&charset)?;
                if !self.kore_targets.is_empty() {
                    raw.extend_from_slice(KORE_TARGET_MARKER);
                    raw.extend_from_slice(&(self.kore_targets.len() as i32).to_le_bytes());
                    for target in &self.kore_targets {
                        let mut record = target.encode(&charset)?;
                        toggle_target_encryption(&mut record);
                        raw.extend(record);
                    }
                }
                sections.push((SectionTag::BlockK, raw));
            }
            if let Some(ufos) = &self.skore {
                let mut raw = vec![0u8; 4];
                raw.extend(counted(ufos, &charset)?);
                sections.push((SectionTag::BlockS, raw));
            }
        }

        let mut addresses = Vec::new();
        let mut body = Vec::new();
        for (tag, raw) in sections {
            addresses.push((tag, (directory_len + body.len()) as u64));
            body.extend(raw);
        }

        // Message addresses are absolute, so the section goes last.
        let offset = directory_len + body.len();
        addresses.push((SectionTag::Messages, offset as u64));
        body.extend(self.message_section(offset, &charset)?);

        let mut out = encode_directory(&addresses, self.version);
        debug_assert_eq!(out.len(), directory_len);
        out.extend(body);
        if let Some(len) = self.truncate_to {
            out.truncate(len);
        }
        debug!(player = %self.player, len = out.len(), "built result file");
        Ok(out)
    }

    fn message_section(&self, offset: usize, charset: &dyn Charset) -> Result<Vec<u8>> {
        let bodies = self
            .messages
            .iter()
            .map(|text| encode_message(text, charset))
            .collect::<Result<Vec<_>, _>>()?;
        let index_len = 2 + bodies.len() * 6;
        let mut out = Vec::new();
        out.extend_from_slice(&(bodies.len() as i16).to_le_bytes());
        let mut address = offset + index_len + 1;
        for body in &bodies {
            out.extend_from_slice(&(address as i32).to_le_bytes());
            out.extend_from_slice(&(body.len() as i16).to_le_bytes());
            address += body.len();
        }
        for body in bodies {
            out.extend(body);
        }
        Ok(out)
    }

    /// Write the file as `player{p}.rst` inside `dir`.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(format!("player{}.rst", self.player));
        fs::write(&path, self.build()?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }
}

fn records<T: FixedRecord>(items: &[T], charset: &dyn Charset) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(items.len() * T::SIZE);
    for item in items {
        out.extend(item.encode(charset)?);
    }
    Ok(out)
}

fn counted<T: FixedRecord>(items: &[T], charset: &dyn Charset) -> Result<Vec<u8>> {
    let mut out = (items.len() as i16).to_le_bytes().to_vec();
    out.extend(records(items, charset)?);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use turnkit_codec::{read_message_bodies, Dialect, SectionIndex};

    #[test]
    fn directory_points_at_header() {
        let player = PlayerId::new(3).unwrap();
        let raw = ResultFileBuilder::new(player, 12)
            .ship(sample_ship(1, 3))
            .build()
            .unwrap();
        let table = SectionIndex::parse(&raw).unwrap();
        assert_eq!(table.dialect(), Dialect::FormatA);
        let offset = table.offset_of(SectionTag::Header).unwrap() as usize;
        let header = TurnHeader::decode(&raw[offset..]).unwrap();
        assert_eq!(header.owner, 3);
        assert_eq!(header.turn, 12);
    }

    #[test]
    fn messages_are_addressed_absolutely() {
        let player = PlayerId::new(1).unwrap();
        let raw = ResultFileBuilder::new(player, 1)
            .extended(1)
            .message("hello")
            .message("second")
            .build()
            .unwrap();
        let table = SectionIndex::parse(&raw).unwrap();
        let offset = table.offset_of(SectionTag::Messages).unwrap();
        let bodies = read_message_bodies(&mut Cursor::new(&raw), offset).unwrap();
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[0].len(), 5);
    }
}
