//! Result file to working directory.
//!
//! Unpacking runs in two stages: [`ResultContents::read`] pulls every
//! section into memory and validates it, then [`Unpacker`] writes the working
//! files. A failure in the second stage leaves the directory partially
//! written; callers must not assume atomicity.

use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};
use turnkit_codec::{
    build_working_file, decode_all, decode_message, encode_message_file, raw_id, read_count,
    read_counted_block, read_exactly, read_message_bodies, toggle_target_encryption, BaseRecord,
    BattleRecord, Dialect, FixedRecord, GenFile, KoreContents, Outbox, PlanetRecord, RawBlock,
    SectionIndex, SectionTable, SectionTag, ShipRecord, TargetRecord, TurnHeader, Ufo,
    KORE_PROLOGUE_SIZE, KORE_TARGET_MARKER, MAX_BASES, MAX_BATTLES, MAX_TARGETS,
    SHIP_POSITION_TABLE_SIZE, SKORE_MAX_UFOS, SKORE_PROLOGUE_SIZE,
};
use turnkit_core::{
    checksum, Charset, Checksum, ObjectKind, PlayerId, TurnError, TurnResult, MAX_PLANETS,
    MAX_SHIPS,
};

use crate::backup::write_backup;
use crate::control::ChangeTracker;
use crate::files::{remove_if_exists, sibling, WorkingFile};
use crate::options::{ChecksumMode, UnpackOptions};
use crate::turn::{object_entries, skore_ufos, TurnData};

/// Record size, count limit, and section tag of an object kind.
pub(crate) fn layout(kind: ObjectKind) -> (usize, usize, SectionTag) {
    match kind {
        ObjectKind::Ship => (ShipRecord::SIZE, MAX_SHIPS, SectionTag::Ships),
        ObjectKind::Planet => (PlanetRecord::SIZE, MAX_PLANETS, SectionTag::Planets),
        ObjectKind::Base => (BaseRecord::SIZE, MAX_BASES, SectionTag::Bases),
    }
}

/// Id embedded in a raw record of `kind`.
pub(crate) fn record_id(kind: ObjectKind, raw: &[u8]) -> i16 {
    match kind {
        ObjectKind::Ship => raw_id::<ShipRecord>(raw),
        ObjectKind::Planet => raw_id::<PlanetRecord>(raw),
        ObjectKind::Base => raw_id::<BaseRecord>(raw),
    }
}

/// Checksum the GEN file records for a DAT/DIS pair: both whole files,
/// counts and signatures included.
pub(crate) fn working_checksum(dat_file: &[u8], dis_file: &[u8]) -> u32 {
    let mut sum = Checksum::new();
    sum.add_bytes(dat_file).add_bytes(dis_file);
    sum.value()
}

/// Read the directory and header of a result file and check its owner.
pub fn read_result_header<R: Read + Seek>(
    reader: &mut R,
    player: PlayerId,
) -> TurnResult<(SectionTable, TurnHeader)> {
    let table = SectionIndex::open(reader)?;
    let offset = table
        .offset_of(SectionTag::Header)
        .ok_or_else(|| TurnError::format("result file has no header section"))?;
    reader.seek(SeekFrom::Start(offset))?;
    let header = TurnHeader::load_from_stream(reader)?;
    if header.owner != i16::from(player.get()) {
        return Err(TurnError::WrongPlayer {
            expected: player,
            found: header.owner,
        });
    }
    Ok((table, header))
}

/// Every section of a result file, validated and held as raw bytes.
#[derive(Debug, Clone)]
pub struct ResultContents {
    /// Section directory.
    pub table: SectionTable,
    /// Turn header.
    pub header: TurnHeader,
    /// Ship records.
    pub ships: RawBlock,
    /// Planet records.
    pub planets: RawBlock,
    /// Starbase records.
    pub bases: RawBlock,
    /// Plain target records: the target section, then the Block-K extension.
    pub targets: Vec<Vec<u8>>,
    /// Block-K prologue.
    pub kore: Option<Vec<u8>>,
    /// Block-S prologue, count, and ufos.
    pub skore: Option<Vec<u8>>,
    /// Encoded message bodies.
    pub messages: Vec<Vec<u8>>,
    /// Ship position table, when the file has one.
    pub ship_positions: Option<Vec<u8>>,
    /// Combat recordings.
    pub battles: RawBlock,
    /// Sections whose checksum mismatch was tolerated.
    pub checksum_warnings: Vec<ObjectKind>,
}

impl ResultContents {
    /// Read and validate a whole result file.
    pub fn read<R: Read + Seek>(
        reader: &mut R,
        player: PlayerId,
        mode: ChecksumMode,
    ) -> TurnResult<Self> {
        let (table, header) = read_result_header(reader, player)?;
        debug!(%player, turn = header.turn, dialect = ?table.dialect(), "reading result");

        let mut checksum_warnings = Vec::new();
        let mut object_block = |reader: &mut R, kind: ObjectKind| -> TurnResult<RawBlock> {
            let (size, max, tag) = layout(kind);
            let offset = table
                .offset_of(tag)
                .ok_or_else(|| TurnError::format(format!("result file has no {tag} section")))?;
            reader.seek(SeekFrom::Start(offset))?;
            let block = read_counted_block(reader, size, max, tag.as_str())?;
            if mode.check(kind.as_str(), header.checksum(kind), checksum(&block.data))? {
                checksum_warnings.push(kind);
            }
            Ok(block)
        };
        let ships = object_block(reader, ObjectKind::Ship)?;
        let planets = object_block(reader, ObjectKind::Planet)?;
        let bases = object_block(reader, ObjectKind::Base)?;

        let mut targets = Vec::new();
        if let Some(offset) = table.offset_of(SectionTag::Targets) {
            reader.seek(SeekFrom::Start(offset))?;
            let block = read_counted_block(reader, TargetRecord::SIZE, MAX_TARGETS, "target")?;
            targets.extend(block.records().map(<[u8]>::to_vec));
        }

        let kore = match table.offset_of(SectionTag::BlockK) {
            Some(offset) => {
                reader.seek(SeekFrom::Start(offset))?;
                let prologue = read_exactly(reader, KORE_PROLOGUE_SIZE, "block-K")?;
                // The extension starts right after the fixed prologue.
                reader.seek(SeekFrom::Start(offset + KORE_PROLOGUE_SIZE as u64))?;
                targets.extend(read_kore_targets(reader)?);
                Some(prologue)
            }
            None => None,
        };

        let skore = match table.offset_of(SectionTag::BlockS) {
            Some(offset) => {
                reader.seek(SeekFrom::Start(offset))?;
                let mut raw = read_exactly(reader, SKORE_PROLOGUE_SIZE, "block-S")?;
                let count = read_count(reader, SKORE_MAX_UFOS, "block-S ufo")?;
                raw.extend_from_slice(&(count as i16).to_le_bytes());
                raw.extend(read_exactly(reader, count * Ufo::SIZE, "block-S ufos")?);
                Some(raw)
            }
            None => None,
        };

        let messages = match table.offset_of(SectionTag::Messages) {
            Some(offset) => read_message_bodies(reader, offset)?,
            None => Vec::new(),
        };

        let ship_positions = match table.offset_of(SectionTag::ShipPositions) {
            Some(offset) => {
                reader.seek(SeekFrom::Start(offset))?;
                Some(read_exactly(reader, SHIP_POSITION_TABLE_SIZE, "ship positions")?)
            }
            None => None,
        };

        let battles = match table.offset_of(SectionTag::Battles) {
            Some(offset) => {
                reader.seek(SeekFrom::Start(offset))?;
                read_counted_block(reader, BattleRecord::SIZE, MAX_BATTLES, "battle")?
            }
            None => RawBlock::empty(BattleRecord::SIZE),
        };

        Ok(Self {
            table,
            header,
            ships,
            planets,
            bases,
            targets,
            kore,
            skore,
            messages,
            ship_positions,
            battles,
            checksum_warnings,
        })
    }

    /// Dialect of the result file.
    pub fn dialect(&self) -> Dialect {
        self.table.dialect()
    }

    fn block(&self, kind: ObjectKind) -> &RawBlock {
        match kind {
            ObjectKind::Ship => &self.ships,
            ObjectKind::Planet => &self.planets,
            ObjectKind::Base => &self.bases,
        }
    }

    /// Decode into an in-memory turn without touching the disk.
    ///
    /// Ship records get the same fix-ups as the DAT copy of an unpack.
    pub fn into_turn(
        self,
        player: PlayerId,
        options: &UnpackOptions,
        charset: &dyn Charset,
    ) -> TurnResult<TurnData> {
        let mut turn = TurnData::new(player, self.header.clone(), self.dialect());

        let mut ships = self.ships.data.clone();
        options.fixups().apply_derived(&mut ships);
        turn.ships = object_entries(&ships, charset)?;
        turn.planets = object_entries(&self.planets.data, charset)?;
        turn.bases = object_entries(&self.bases.data, charset)?;
        turn.targets = decode_all(&self.targets.concat(), charset)?;
        turn.inbox = self
            .messages
            .iter()
            .map(|body| decode_message(body, charset))
            .collect();
        if let Some(raw) = &self.kore {
            turn.kore = Some(KoreContents::decode(raw, charset)?);
        }
        if let Some(raw) = &self.skore {
            turn.extra_ufos = skore_ufos(raw, charset)?;
        }
        if let Some(raw) = &self.ship_positions {
            turn.ship_positions = decode_all(raw, charset)?;
        }
        turn.battles = decode_all(&self.battles.data, charset)?;
        Ok(turn)
    }
}

/// Read the optional target extension of Block-K and decrypt it.
fn read_kore_targets<R: Read>(reader: &mut R) -> TurnResult<Vec<Vec<u8>>> {
    let mut marker = Vec::with_capacity(KORE_TARGET_MARKER.len());
    reader
        .by_ref()
        .take(KORE_TARGET_MARKER.len() as u64)
        .read_to_end(&mut marker)?;
    if marker != KORE_TARGET_MARKER {
        return Ok(Vec::new());
    }
    let raw = read_exactly(reader, 4, "block-K target count")?;
    let count = i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
    if count < 0 || count as usize > MAX_TARGETS {
        return Err(TurnError::format(format!(
            "implausible block-K target count {count}"
        )));
    }
    let data = read_exactly(reader, count as usize * TargetRecord::SIZE, "block-K targets")?;
    Ok(data
        .chunks_exact(TargetRecord::SIZE)
        .map(|chunk| {
            let mut record = chunk.to_vec();
            toggle_target_encryption(&mut record);
            record
        })
        .collect())
}

/// What an unpack wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnpackReport {
    /// Player unpacked.
    pub player: PlayerId,
    /// Turn number.
    pub turn: i16,
    /// Dialect of the result file.
    pub dialect: Dialect,
    /// Ship records written.
    pub ships: usize,
    /// Planet records written.
    pub planets: usize,
    /// Starbase records written.
    pub bases: usize,
    /// Targets in the primary target file.
    pub targets: usize,
    /// Targets moved to the overflow file.
    pub overflow_targets: usize,
    /// Inbox messages.
    pub messages: usize,
    /// Combat recordings.
    pub battles: usize,
    /// Derived ship records touched by a fix-up pass.
    pub ships_fixed: usize,
    /// Sections whose checksum mismatch was tolerated.
    pub checksum_warnings: Vec<ObjectKind>,
    /// Backup copy of the result file, if one was made.
    pub backup: Option<PathBuf>,
}

/// Writes a result file into a working directory.
pub struct Unpacker<'a> {
    dir: PathBuf,
    options: UnpackOptions,
    charset: &'a dyn Charset,
}

impl<'a> Unpacker<'a> {
    /// Unpacker writing into `dir`.
    pub fn new(dir: impl Into<PathBuf>, options: UnpackOptions, charset: &'a dyn Charset) -> Self {
        Self {
            dir: dir.into(),
            options,
            charset,
        }
    }

    /// Working directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Unpack the result file of `player`.
    pub fn unpack<R: Read + Seek>(
        &self,
        reader: &mut R,
        player: PlayerId,
    ) -> TurnResult<UnpackReport> {
        fs::create_dir_all(&self.dir)?;
        let contents = ResultContents::read(reader, player, self.options.checksum_mode)?;
        let backup = match &self.options.backup_template {
            Some(template) => Some(write_backup(
                reader,
                &self.dir,
                template,
                player,
                contents.header.turn,
            )?),
            None => None,
        };
        let mut report = self.write(&contents, player)?;
        report.backup = backup;
        info!(
            %player,
            turn = report.turn,
            ships = report.ships,
            planets = report.planets,
            targets = report.targets + report.overflow_targets,
            "result unpacked"
        );
        Ok(report)
    }

    /// Write all working files from already validated contents.
    pub fn write(&self, contents: &ResultContents, player: PlayerId) -> TurnResult<UnpackReport> {
        let dir = self.dir.as_path();
        let header = &contents.header;
        let fixups = self.options.fixups();
        let mut tracker = ChangeTracker::load(dir, player)?;
        let mut gen = GenFile::new(header.clone());
        let mut report = UnpackReport {
            player,
            turn: header.turn,
            dialect: contents.dialect(),
            ships: contents.ships.len(),
            planets: contents.planets.len(),
            bases: contents.bases.len(),
            targets: 0,
            overflow_targets: 0,
            messages: contents.messages.len(),
            battles: contents.battles.len(),
            ships_fixed: 0,
            checksum_warnings: contents.checksum_warnings.clone(),
            backup: None,
        };

        for kind in ObjectKind::ALL {
            let mut dat = contents.block(kind).clone();
            let mut dis = dat.clone();
            if kind == ObjectKind::Ship {
                report.ships_fixed = fixups.apply_derived(&mut dat.data);
                fixups.apply_canonical(&mut dis.data);
            }
            let dat_file = build_working_file(&dat, &header.signature_a);
            let dis_file = build_working_file(&dis, &header.signature_b);
            gen.header
                .set_checksum(kind, working_checksum(&dat_file, &dis_file));
            for raw in dat.records() {
                tracker.set(kind, record_id(kind, raw), checksum(raw));
            }
            fs::write(WorkingFile::Dat(kind).path(dir, player), dat_file)?;
            fs::write(WorkingFile::Dis(kind).path(dir, player), dis_file)?;
        }

        let (primary, overflow) = self.write_targets(contents, player)?;
        report.targets = primary;
        report.overflow_targets = overflow;

        write_or_remove(
            &WorkingFile::Kore.path(dir, player),
            contents.kore.as_deref(),
        )?;
        write_or_remove(
            &WorkingFile::Skore.path(dir, player),
            contents.skore.as_deref(),
        )?;

        fs::write(
            WorkingFile::Inbox.path(dir, player),
            encode_message_file(&contents.messages)?,
        )?;
        let positions = contents
            .ship_positions
            .clone()
            .unwrap_or_else(|| vec![0; SHIP_POSITION_TABLE_SIZE]);
        fs::write(WorkingFile::ShipPositions.path(dir, player), positions)?;
        fs::write(
            WorkingFile::Battles.path(dir, player),
            contents.battles.to_counted_bytes(),
        )?;

        fs::write(WorkingFile::Gen.path(dir, player), gen.encode())?;
        tracker.save(dir)?;

        // Blank files, so nothing from the previous turn is resubmitted.
        let dialect = contents.dialect();
        let blank = Outbox::new().encode(dialect, self.charset)?;
        fs::write(WorkingFile::Outbox(dialect).path(dir, player), blank)?;
        remove_if_exists(&WorkingFile::Outbox(sibling(dialect)).path(dir, player))?;
        fs::write(WorkingFile::Commands.path(dir, player), b"")?;

        Ok(report)
    }

    /// Split targets at the configured cap. Returns (primary, overflow) counts.
    fn write_targets(&self, contents: &ResultContents, player: PlayerId) -> TurnResult<(usize, usize)> {
        let dir = self.dir.as_path();
        let split = contents.targets.len().min(self.options.target_cap);
        let (primary, overflow) = contents.targets.split_at(split);

        let mut block = RawBlock::empty(TargetRecord::SIZE);
        for raw in primary {
            block.push(raw);
        }
        fs::write(
            WorkingFile::Targets.path(dir, player),
            block.to_counted_bytes(),
        )?;

        let overflow_path = WorkingFile::TargetOverflow.path(dir, player);
        if overflow.is_empty() {
            remove_if_exists(&overflow_path)?;
        } else {
            let mut block = RawBlock::empty(TargetRecord::SIZE);
            for raw in overflow {
                let mut record = raw.clone();
                toggle_target_encryption(&mut record);
                block.push(&record);
            }
            debug!(%player, count = overflow.len(), "targets over cap moved to overflow file");
            fs::write(&overflow_path, block.to_counted_bytes())?;
        }
        Ok((primary.len(), overflow.len()))
    }
}

fn write_or_remove(path: &Path, data: Option<&[u8]>) -> TurnResult<()> {
    match data {
        Some(data) => fs::write(path, data)?,
        None => {
            remove_if_exists(path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts_per_kind() {
        assert_eq!(layout(ObjectKind::Ship), (107, 999, SectionTag::Ships));
        assert_eq!(layout(ObjectKind::Planet).0, 85);
        assert_eq!(layout(ObjectKind::Base).1, 500);
    }

    #[test]
    fn planet_id_follows_owner() {
        let mut raw = vec![0u8; PlanetRecord::SIZE];
        raw[0..2].copy_from_slice(&4i16.to_le_bytes());
        raw[2..4].copy_from_slice(&321i16.to_le_bytes());
        assert_eq!(record_id(ObjectKind::Planet, &raw), 321);
        assert_eq!(record_id(ObjectKind::Ship, &raw), 4);
    }

    #[test]
    fn working_checksum_covers_both_files() {
        assert_eq!(working_checksum(&[1, 2], &[3]), 6);
        assert_eq!(working_checksum(&[], &[]), 0);
    }

    #[test]
    fn kore_extension_without_marker_is_empty() {
        let mut reader: &[u8] = b"0000";
        assert!(read_kore_targets(&mut reader).unwrap().is_empty());
        let mut empty: &[u8] = &[];
        assert!(read_kore_targets(&mut empty).unwrap().is_empty());
    }
}
