//! In-memory turn exchanged with the domain layer.

use serde::Serialize;
use turnkit_codec::{
    decode_all, read_count, read_exactly, BaseRecord, BattleRecord, Dialect, FixedRecord,
    KoreContents, Outbox, PasswordChange, PlanetRecord, ShipPosition, ShipRecord, TargetRecord,
    TurnHeader, Ufo, UtilEvent, SKORE_MAX_UFOS, SKORE_PROLOGUE_SIZE,
};
use turnkit_core::{Charset, ObjectKind, PlayerId, PlayerSet, TurnResult};

use crate::commands::CommandList;

/// A record together with the bookkeeping the save path needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry<T> {
    /// The decoded record.
    pub record: T,
    /// Players whose data this object came from. Only objects whose source
    /// contains the saving player are written back.
    pub source: PlayerSet,
    /// Set by the domain layer when it edits the record.
    pub modified: bool,
}

impl<T> ObjectEntry<T> {
    /// Unmodified entry.
    pub fn new(record: T, source: PlayerSet) -> Self {
        Self {
            record,
            source,
            modified: false,
        }
    }
}

/// Everything one player's turn consists of.
#[derive(Debug, Clone)]
pub struct TurnData {
    /// Player the turn belongs to.
    pub player: PlayerId,
    /// Turn header.
    pub header: TurnHeader,
    /// Pending password change from the GEN tail.
    pub password_change: Option<PasswordChange>,
    /// Dialect the data was loaded in.
    pub dialect: Dialect,
    /// Ships from the DAT file.
    pub ships: Vec<ObjectEntry<ShipRecord>>,
    /// Planets.
    pub planets: Vec<ObjectEntry<PlanetRecord>>,
    /// Starbases.
    pub bases: Vec<ObjectEntry<BaseRecord>>,
    /// Visual contacts, overflow included.
    pub targets: Vec<TargetRecord>,
    /// Decoded inbox messages.
    pub inbox: Vec<String>,
    /// Outgoing messages, without the command message.
    pub outbox: Outbox,
    /// Host commands.
    pub commands: CommandList,
    /// Block-K contents, when the turn has them.
    pub kore: Option<KoreContents>,
    /// Ufos beyond the first hundred.
    pub extra_ufos: Vec<Ufo>,
    /// Ship position table; empty when the file is missing.
    pub ship_positions: Vec<ShipPosition>,
    /// Combat recordings.
    pub battles: Vec<BattleRecord>,
    /// Auxiliary events.
    pub events: Vec<UtilEvent>,
}

impl TurnData {
    /// Empty turn for `player`.
    pub fn new(player: PlayerId, header: TurnHeader, dialect: Dialect) -> Self {
        Self {
            player,
            header,
            password_change: None,
            dialect,
            ships: Vec::new(),
            planets: Vec::new(),
            bases: Vec::new(),
            targets: Vec::new(),
            inbox: Vec::new(),
            outbox: Outbox::new(),
            commands: CommandList::new(),
            kore: None,
            extra_ufos: Vec::new(),
            ship_positions: Vec::new(),
            battles: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Turn number from the header.
    pub fn turn_number(&self) -> i16 {
        self.header.turn
    }

    /// Ship with `id`.
    pub fn ship(&self, id: i16) -> Option<&ObjectEntry<ShipRecord>> {
        self.ships.iter().find(|e| e.record.id == id)
    }

    /// Ship with `id`, for editing.
    pub fn ship_mut(&mut self, id: i16) -> Option<&mut ObjectEntry<ShipRecord>> {
        self.ships.iter_mut().find(|e| e.record.id == id)
    }

    /// Planet with `id`, for editing.
    pub fn planet_mut(&mut self, id: i16) -> Option<&mut ObjectEntry<PlanetRecord>> {
        self.planets.iter_mut().find(|e| e.record.id == id)
    }

    /// Starbase with `id`, for editing.
    pub fn base_mut(&mut self, id: i16) -> Option<&mut ObjectEntry<BaseRecord>> {
        self.bases.iter_mut().find(|e| e.record.id == id)
    }
}

/// Identifies one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ObjectRef {
    /// Object kind.
    pub kind: ObjectKind,
    /// Object id.
    pub id: i16,
}

/// Outcome of a save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    /// Objects whose encoded bytes differ from the control-file baseline.
    pub changed: Vec<ObjectRef>,
    /// Ship records written to the DAT file.
    pub ships_written: usize,
    /// Planet records written to the DAT file.
    pub planets_written: usize,
    /// Starbase records written to the DAT file.
    pub bases_written: usize,
    /// Entries in the written outbox, commands included.
    pub outbox_messages: usize,
    /// Outbox dialect used, if an outbox was written.
    pub dialect: Option<Dialect>,
}

/// What a loader can say about a player without loading the whole turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlayerStatus {
    /// Turn data exists for the player.
    pub available: bool,
    /// The data belongs to the player and passes its checksums.
    pub playable: bool,
    /// The data is already unpacked into the working directory.
    pub primary: bool,
    /// Turn number, when readable.
    pub turn: Option<i16>,
    /// Dialect of the data, when readable.
    pub dialect: Option<Dialect>,
}

impl PlayerStatus {
    /// Status of a player without any turn data.
    pub const UNAVAILABLE: Self = Self {
        available: false,
        playable: false,
        primary: false,
        turn: None,
        dialect: None,
    };
}

/// Records that carry their owner.
pub(crate) trait Owned {
    fn owner(&self) -> i16;
}

impl Owned for ShipRecord {
    fn owner(&self) -> i16 {
        self.owner
    }
}

impl Owned for PlanetRecord {
    fn owner(&self) -> i16 {
        self.owner
    }
}

impl Owned for BaseRecord {
    fn owner(&self) -> i16 {
        self.owner
    }
}

/// Decode a run of records, sourcing each one from its recorded owner.
pub(crate) fn object_entries<T: FixedRecord + Owned>(
    records: &[u8],
    charset: &dyn Charset,
) -> TurnResult<Vec<ObjectEntry<T>>> {
    Ok(decode_all::<T>(records, charset)?
        .into_iter()
        .map(|record| {
            let source = u8::try_from(record.owner())
                .ok()
                .and_then(PlayerId::new)
                .map_or(PlayerSet::EMPTY, PlayerSet::single);
            ObjectEntry::new(record, source)
        })
        .collect())
}

/// Decode the ufos of a Block-S copy (prologue, count, records).
pub(crate) fn skore_ufos(raw: &[u8], charset: &dyn Charset) -> TurnResult<Vec<Ufo>> {
    let mut cursor = raw.get(SKORE_PROLOGUE_SIZE..).unwrap_or_default();
    if cursor.is_empty() {
        return Ok(Vec::new());
    }
    let count = read_count(&mut cursor, SKORE_MAX_UFOS, "block-S ufo")?;
    let data = read_exactly(&mut cursor, count * Ufo::SIZE, "block-S ufos")?;
    decode_all(&data, charset)
}
