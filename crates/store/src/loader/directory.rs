//! Loader over an unpacked working directory.

use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use turnkit_codec::{
    build_working_file, decode_all, decode_message, decode_message_file, decode_util_stream,
    parse_working_file, toggle_target_encryption, BattleRecord, Dialect, FixedRecord, GenFile,
    IdentifiedRecord, KoreContents, Outbox, RawBlock, TargetRecord, TurnHeader, MAX_BATTLES,
    MAX_TARGETS,
};
use turnkit_core::{checksum, Charset, ObjectKind, PlayerId, TurnError, TurnResult};

use super::{OutboxRestoreGuard, TurnLoader};
use crate::backup::backup_path;
use crate::commands::CommandList;
use crate::control::ChangeTracker;
use crate::files::{read_optional, remove_if_exists, sibling, WorkingFile};
use crate::options::UnpackOptions;
use crate::turn::{
    object_entries, skore_ufos, ObjectEntry, ObjectRef, PlayerStatus, SaveReport, TurnData,
};
use crate::unpack::{layout, working_checksum, ResultContents};

/// Loads and saves turns from the per-section working files.
pub struct DirectoryTurnLoader {
    dir: PathBuf,
    options: UnpackOptions,
    charset: Box<dyn Charset>,
    /// Outbox dialect last seen per player.
    dialects: HashMap<PlayerId, Dialect>,
}

impl DirectoryTurnLoader {
    /// Loader over `dir`. Nothing is read until the first call.
    pub fn new(dir: impl Into<PathBuf>, options: UnpackOptions, charset: Box<dyn Charset>) -> Self {
        Self {
            dir: dir.into(),
            options,
            charset,
            dialects: HashMap::new(),
        }
    }

    /// Working directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Options in effect.
    pub fn options(&self) -> &UnpackOptions {
        &self.options
    }

    pub(crate) fn charset(&self) -> &dyn Charset {
        self.charset.as_ref()
    }

    /// Dialect remembered for `player`, if a load has happened.
    pub fn remembered_dialect(&self, player: PlayerId) -> Option<Dialect> {
        self.dialects.get(&player).copied()
    }

    fn path(&self, file: WorkingFile, player: PlayerId) -> PathBuf {
        file.path(&self.dir, player)
    }

    /// Dialect of the outbox on disk. Format-B wins if both exist; with no
    /// outbox at all the presence of Block-K data decides.
    fn detect_dialect(&self, player: PlayerId) -> Dialect {
        if self.path(WorkingFile::Outbox(Dialect::FormatB), player).exists() {
            Dialect::FormatB
        } else if self.path(WorkingFile::Outbox(Dialect::FormatA), player).exists() {
            Dialect::FormatA
        } else if self.path(WorkingFile::Kore, player).exists() {
            Dialect::FormatB
        } else {
            Dialect::FormatA
        }
    }

    fn read_gen(&self, player: PlayerId) -> TurnResult<GenFile> {
        let raw = fs::read(self.path(WorkingFile::Gen, player))?;
        if raw.is_empty() {
            return Err(TurnError::InvalidState(format!(
                "player {player} has no turn data"
            )));
        }
        let gen = GenFile::decode(&raw)?;
        if gen.header.owner != i16::from(player.get()) {
            return Err(TurnError::WrongPlayer {
                expected: player,
                found: gen.header.owner,
            });
        }
        Ok(gen)
    }

    /// Read a DAT/DIS pair and check it against the GEN checksum.
    fn read_section(
        &self,
        kind: ObjectKind,
        header: &TurnHeader,
        player: PlayerId,
    ) -> TurnResult<RawBlock> {
        let (size, max, _) = layout(kind);
        let dat = fs::read(self.path(WorkingFile::Dat(kind), player))?;
        let dis = fs::read(self.path(WorkingFile::Dis(kind), player))?;
        self.options.checksum_mode.check(
            kind.as_str(),
            header.checksum(kind),
            working_checksum(&dat, &dis),
        )?;
        let (block, signature) = parse_working_file(&dat, size, max, kind.as_str())?;
        if signature.as_ref() != Some(&header.signature_a) {
            warn!(%player, %kind, "DAT signature does not match the turn header");
        }
        Ok(block)
    }

    fn read_targets(&self, player: PlayerId) -> TurnResult<Vec<TargetRecord>> {
        let charset = self.charset();
        let mut targets = Vec::new();
        if let Some(raw) = read_optional(&self.path(WorkingFile::Targets, player))? {
            let (block, _) = parse_working_file(&raw, TargetRecord::SIZE, MAX_TARGETS, "target")?;
            targets.extend(decode_all::<TargetRecord>(&block.data, charset)?);
        }
        if let Some(raw) = read_optional(&self.path(WorkingFile::TargetOverflow, player))? {
            let (mut block, _) =
                parse_working_file(&raw, TargetRecord::SIZE, MAX_TARGETS, "overflow target")?;
            for record in block.data.chunks_exact_mut(TargetRecord::SIZE) {
                toggle_target_encryption(record);
            }
            targets.extend(decode_all::<TargetRecord>(&block.data, charset)?);
        }
        Ok(targets)
    }

    /// Encode the entries the player owns into a DAT file and refresh the
    /// GEN checksum and change baseline.
    fn write_section<T: IdentifiedRecord>(
        &self,
        kind: ObjectKind,
        entries: &[ObjectEntry<T>],
        player: PlayerId,
        header: &mut TurnHeader,
        tracker: &mut ChangeTracker,
        changed: &mut Vec<ObjectRef>,
    ) -> TurnResult<usize> {
        let mut block = RawBlock::empty(T::SIZE);
        for entry in entries.iter().filter(|e| e.source.contains(player)) {
            let raw = entry.record.encode(self.charset())?;
            let id = entry.record.id();
            let sum = checksum(&raw);
            if tracker.get(kind, id) != Some(sum) {
                changed.push(ObjectRef { kind, id });
                tracker.set(kind, id, sum);
            }
            block.push(&raw);
        }
        let dat_file = build_working_file(&block, &header.signature_a);
        let dis_file = fs::read(self.path(WorkingFile::Dis(kind), player))?;
        header.set_checksum(kind, working_checksum(&dat_file, &dis_file));
        fs::write(self.path(WorkingFile::Dat(kind), player), dat_file)?;
        Ok(block.len())
    }
}

fn check_ownership<T: IdentifiedRecord>(
    kind: ObjectKind,
    entries: &[ObjectEntry<T>],
    player: PlayerId,
) -> TurnResult<()> {
    match entries
        .iter()
        .find(|e| e.modified && !e.source.contains(player))
    {
        Some(entry) => Err(TurnError::OwnershipViolation {
            kind,
            id: entry.record.id(),
            player,
        }),
        None => Ok(()),
    }
}

impl TurnLoader for DirectoryTurnLoader {
    fn get_player_status(&self, player: PlayerId) -> TurnResult<PlayerStatus> {
        let Some(raw) = read_optional(&self.path(WorkingFile::Gen, player))? else {
            return Ok(PlayerStatus::UNAVAILABLE);
        };
        let Some(header) = TurnHeader::load_optional(&raw)? else {
            debug!(%player, "zero-length GEN file");
            return Ok(PlayerStatus::UNAVAILABLE);
        };
        let owned = header.owner == i16::from(player.get());
        let consistent = ObjectKind::ALL.iter().all(|&kind| {
            let dat = read_optional(&self.path(WorkingFile::Dat(kind), player));
            let dis = read_optional(&self.path(WorkingFile::Dis(kind), player));
            match (dat, dis) {
                (Ok(Some(dat)), Ok(Some(dis))) => self
                    .options
                    .checksum_mode
                    .check(kind.as_str(), header.checksum(kind), working_checksum(&dat, &dis))
                    .is_ok(),
                _ => false,
            }
        });
        Ok(PlayerStatus {
            available: true,
            playable: owned && consistent,
            primary: true,
            turn: Some(header.turn),
            dialect: Some(self.detect_dialect(player)),
        })
    }

    fn load_current_turn(&mut self, player: PlayerId) -> TurnResult<TurnData> {
        let gen = self.read_gen(player)?;
        let dialect = self.detect_dialect(player);
        let charset = self.charset();

        let mut turn = TurnData::new(player, gen.header.clone(), dialect);
        turn.password_change = gen.password_change;

        let ships = self.read_section(ObjectKind::Ship, &gen.header, player)?;
        turn.ships = object_entries(&ships.data, charset)?;
        let planets = self.read_section(ObjectKind::Planet, &gen.header, player)?;
        turn.planets = object_entries(&planets.data, charset)?;
        let bases = self.read_section(ObjectKind::Base, &gen.header, player)?;
        turn.bases = object_entries(&bases.data, charset)?;

        turn.targets = self.read_targets(player)?;

        if let Some(raw) = read_optional(&self.path(WorkingFile::Inbox, player))? {
            turn.inbox = decode_message_file(&raw)?
                .iter()
                .map(|body| decode_message(body, charset))
                .collect();
        }

        turn.commands = CommandList::load(&self.path(WorkingFile::Commands, player), charset)?;

        if let Some(raw) = read_optional(&self.path(WorkingFile::Outbox(dialect), player))? {
            turn.outbox = Outbox::decode(&raw, dialect, player, charset)?;
        }
        // The previous save appended the commands; they live in `commands`.
        if let Some(command_message) = turn.commands.to_message(player) {
            if turn.outbox.messages().last() == Some(&command_message) {
                turn.outbox.truncate(turn.outbox.len() - 1);
            }
        }

        if let Some(raw) = read_optional(&self.path(WorkingFile::Kore, player))? {
            turn.kore = Some(KoreContents::decode(&raw, charset)?);
        }
        if let Some(raw) = read_optional(&self.path(WorkingFile::Skore, player))? {
            turn.extra_ufos = skore_ufos(&raw, charset)?;
        }
        if let Some(raw) = read_optional(&self.path(WorkingFile::ShipPositions, player))? {
            turn.ship_positions = decode_all(&raw, charset)?;
        }
        if let Some(raw) = read_optional(&self.path(WorkingFile::Battles, player))? {
            let (block, _) = parse_working_file(&raw, BattleRecord::SIZE, MAX_BATTLES, "battle")?;
            turn.battles = decode_all(&block.data, charset)?;
        }
        if let Some(raw) = read_optional(&self.path(WorkingFile::Util, player))? {
            turn.events = decode_util_stream(&raw, charset)?;
        }

        self.dialects.insert(player, dialect);
        info!(
            %player,
            turn = turn.turn_number(),
            ships = turn.ships.len(),
            dialect = ?dialect,
            "turn loaded"
        );
        Ok(turn)
    }

    fn save_current_turn(&mut self, turn: &mut TurnData) -> TurnResult<SaveReport> {
        let player = turn.player;
        check_ownership(ObjectKind::Ship, &turn.ships, player)?;
        check_ownership(ObjectKind::Planet, &turn.planets, player)?;
        check_ownership(ObjectKind::Base, &turn.bases, player)?;

        let dialect = self.remembered_dialect(player).unwrap_or(turn.dialect);

        // Serialize the outbox first so a failure leaves the files untouched.
        let (outbox_bytes, outbox_messages) = {
            let mut outbox = OutboxRestoreGuard::new(&mut turn.outbox);
            if let Some(command_message) = turn.commands.to_message(player) {
                outbox.push(command_message);
            }
            (outbox.encode(dialect, self.charset())?, outbox.len())
        };

        let mut tracker = ChangeTracker::load(&self.dir, player)?;
        let mut header = turn.header.clone();
        let mut changed = Vec::new();
        let ships_written = self.write_section(
            ObjectKind::Ship,
            &turn.ships,
            player,
            &mut header,
            &mut tracker,
            &mut changed,
        )?;
        let planets_written = self.write_section(
            ObjectKind::Planet,
            &turn.planets,
            player,
            &mut header,
            &mut tracker,
            &mut changed,
        )?;
        let bases_written = self.write_section(
            ObjectKind::Base,
            &turn.bases,
            player,
            &mut header,
            &mut tracker,
            &mut changed,
        )?;

        let gen = GenFile {
            header: header.clone(),
            password_change: turn.password_change,
        };
        fs::write(self.path(WorkingFile::Gen, player), gen.encode())?;
        tracker.save(&self.dir)?;

        fs::write(self.path(WorkingFile::Outbox(dialect), player), outbox_bytes)?;
        remove_if_exists(&self.path(WorkingFile::Outbox(sibling(dialect)), player))?;
        turn.commands
            .save(&self.path(WorkingFile::Commands, player), self.charset())?;

        turn.header = header;
        turn.dialect = dialect;
        self.dialects.insert(player, dialect);

        info!(
            %player,
            changed = changed.len(),
            ships = ships_written,
            dialect = ?dialect,
            "turn saved"
        );
        Ok(SaveReport {
            changed,
            ships_written,
            planets_written,
            bases_written,
            outbox_messages,
            dialect: Some(dialect),
        })
    }

    fn load_history_turn(&self, player: PlayerId, turn: i16) -> TurnResult<TurnData> {
        let template = self.options.backup_template.as_deref().ok_or_else(|| {
            TurnError::InvalidState("no backup template configured".to_owned())
        })?;
        let path = backup_path(&self.dir, template, player, turn);
        let mut file = File::open(&path)?;
        let contents = ResultContents::read(&mut file, player, self.options.checksum_mode)?;
        if contents.header.turn != turn {
            warn!(
                %player,
                requested = turn,
                found = contents.header.turn,
                "backup holds a different turn"
            );
        }
        contents.into_turn(player, &self.options, self.charset())
    }
}
