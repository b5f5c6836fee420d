//! Starbase records (156 bytes).

use serde::{Deserialize, Serialize};
use turnkit_core::{Charset, TurnResult};

use crate::bytes::{ByteReader, ByteWriter};
use crate::record::{require_size, FixedRecord, IdentifiedRecord};

/// Ship construction order queued at a starbase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOrder {
    /// Index into the player's hull list (0 = nothing).
    pub hull_index: i16,
    /// Engine for the ordered ship.
    pub engine_type: i16,
    /// Beam weapon type.
    pub beam_type: i16,
    /// Number of beams.
    pub num_beams: i16,
    /// Torpedo launcher type.
    pub launcher_type: i16,
    /// Number of launchers.
    pub num_launchers: i16,
    /// Unused by hosts, kept for byte fidelity.
    pub reserved: i16,
}

/// One starbase. The id equals the planet id it orbits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseRecord {
    /// Starbase id, equal to the planet id.
    pub id: i16,
    /// Owning player.
    pub owner: i16,
    /// Starbase defense posts.
    pub defense_posts: i16,
    /// Damage percentage.
    pub damage: i16,
    /// Engine, hull, beam, torpedo tech.
    pub tech_levels: [i16; 4],
    /// Engines in storage, by engine type.
    pub engine_storage: [i16; 9],
    /// Hulls in storage, by hull slot.
    pub hull_storage: [i16; 20],
    /// Beams in storage, by beam type.
    pub beam_storage: [i16; 10],
    /// Launchers in storage, by torpedo type.
    pub launcher_storage: [i16; 10],
    /// Torpedoes in storage, by torpedo type.
    pub torpedo_storage: [i16; 10],
    /// Fighters on board.
    pub fighters: i16,
    /// Ship the shipyard works on.
    pub shipyard_id: i16,
    /// Shipyard order: 1 fix, 2 recycle.
    pub shipyard_action: i16,
    /// Starbase mission.
    pub mission: i16,
    /// Queued ship construction.
    pub build_order: BuildOrder,
}

impl FixedRecord for BaseRecord {
    const SIZE: usize = 156;
    const NAME: &'static str = "base record";

    fn decode(raw: &[u8], _charset: &dyn Charset) -> TurnResult<Self> {
        require_size::<Self>(raw)?;
        let mut r = ByteReader::new(raw, Self::NAME);
        Ok(Self {
            id: r.i16()?,
            owner: r.i16()?,
            defense_posts: r.i16()?,
            damage: r.i16()?,
            tech_levels: r.i16_array()?,
            engine_storage: r.i16_array()?,
            hull_storage: r.i16_array()?,
            beam_storage: r.i16_array()?,
            launcher_storage: r.i16_array()?,
            torpedo_storage: r.i16_array()?,
            fighters: r.i16()?,
            shipyard_id: r.i16()?,
            shipyard_action: r.i16()?,
            mission: r.i16()?,
            build_order: BuildOrder {
                hull_index: r.i16()?,
                engine_type: r.i16()?,
                beam_type: r.i16()?,
                num_beams: r.i16()?,
                launcher_type: r.i16()?,
                num_launchers: r.i16()?,
                reserved: r.i16()?,
            },
        })
    }

    fn encode(&self, _charset: &dyn Charset) -> TurnResult<Vec<u8>> {
        let order = &self.build_order;
        let mut w = ByteWriter::with_capacity(Self::SIZE);
        w.i16_slice(&[self.id, self.owner, self.defense_posts, self.damage])
            .i16_slice(&self.tech_levels)
            .i16_slice(&self.engine_storage)
            .i16_slice(&self.hull_storage)
            .i16_slice(&self.beam_storage)
            .i16_slice(&self.launcher_storage)
            .i16_slice(&self.torpedo_storage)
            .i16_slice(&[
                self.fighters,
                self.shipyard_id,
                self.shipyard_action,
                self.mission,
                order.hull_index,
                order.engine_type,
                order.beam_type,
                order.num_beams,
                order.launcher_type,
                order.num_launchers,
                order.reserved,
            ]);
        Ok(w.into_inner())
    }
}

impl IdentifiedRecord for BaseRecord {
    const ID_OFFSET: usize = 0;

    fn id(&self) -> i16 {
        self.id
    }
}
