//! Ship records (107 bytes).

use serde::{Deserialize, Serialize};
use turnkit_core::{Charset, TurnResult};

use crate::bytes::{ByteReader, ByteWriter};
use crate::record::{require_size, FixedRecord, IdentifiedRecord};
use crate::text::{decode_fixed, encode_fixed};

pub(crate) const WARP_OFFSET: usize = 7;
pub(crate) const LAUNCHER_TYPE_OFFSET: usize = 27;
pub(crate) const LAUNCHER_COUNT_OFFSET: usize = 31;
pub(crate) const DAMAGE_OFFSET: usize = 39;

/// Cargo transfer order (unload to planet, or ship-to-ship transfer).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Neutronium.
    pub neutronium: i16,
    /// Tritanium.
    pub tritanium: i16,
    /// Duranium.
    pub duranium: i16,
    /// Molybdenum.
    pub molybdenum: i16,
    /// Colonist clans.
    pub colonists: i16,
    /// Supplies.
    pub supplies: i16,
    /// Receiving object id.
    pub target_id: i16,
}

impl Transfer {
    fn read(reader: &mut ByteReader<'_>) -> TurnResult<Self> {
        Ok(Self {
            neutronium: reader.i16()?,
            tritanium: reader.i16()?,
            duranium: reader.i16()?,
            molybdenum: reader.i16()?,
            colonists: reader.i16()?,
            supplies: reader.i16()?,
            target_id: reader.i16()?,
        })
    }

    fn write(&self, writer: &mut ByteWriter) {
        writer.i16_slice(&[
            self.neutronium,
            self.tritanium,
            self.duranium,
            self.molybdenum,
            self.colonists,
            self.supplies,
            self.target_id,
        ]);
    }
}

/// One starship as stored in result files and `ship` working files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipRecord {
    /// Ship id.
    pub id: i16,
    /// Owning player.
    pub owner: i16,
    /// Three-character friendly code.
    pub friendly_code: String,
    /// Warp factor, 0..=9 for valid ships.
    pub warp: i16,
    /// Waypoint offset in x.
    pub waypoint_dx: i16,
    /// Waypoint offset in y.
    pub waypoint_dy: i16,
    /// X coordinate.
    pub x: i16,
    /// Y coordinate.
    pub y: i16,
    /// Engine type.
    pub engine_type: i16,
    /// Hull type.
    pub hull_type: i16,
    /// Beam weapon type.
    pub beam_type: i16,
    /// Number of beams.
    pub num_beams: i16,
    /// Number of fighter bays.
    pub num_bays: i16,
    /// Torpedo launcher type.
    pub launcher_type: i16,
    /// Torpedoes or fighters.
    pub ammo: i16,
    /// Number of launchers.
    pub num_launchers: i16,
    /// Mission code.
    pub mission: i16,
    /// Race attacked on sight, 0 for none.
    pub primary_enemy: i16,
    /// Towed ship id.
    pub tow_target: i16,
    /// Damage percentage.
    pub damage: i16,
    /// Crew.
    pub crew: i16,
    /// Colonist clans on board.
    pub colonists: i16,
    /// Ship name.
    pub name: String,
    /// Neutronium on board.
    pub neutronium: i16,
    /// Tritanium on board.
    pub tritanium: i16,
    /// Duranium on board.
    pub duranium: i16,
    /// Molybdenum on board.
    pub molybdenum: i16,
    /// Supplies on board.
    pub supplies: i16,
    /// Cargo unloaded to a planet.
    pub unload: Transfer,
    /// Cargo transferred to another ship.
    pub transfer: Transfer,
    /// Ship intercepted by the intercept mission.
    pub intercept_target: i16,
    /// Megacredits on board.
    pub money: i16,
}

impl FixedRecord for ShipRecord {
    const SIZE: usize = 107;
    const NAME: &'static str = "ship record";

    fn decode(raw: &[u8], charset: &dyn Charset) -> TurnResult<Self> {
        require_size::<Self>(raw)?;
        let mut r = ByteReader::new(raw, Self::NAME);
        Ok(Self {
            id: r.i16()?,
            owner: r.i16()?,
            friendly_code: decode_fixed(r.take(3)?, charset),
            warp: r.i16()?,
            waypoint_dx: r.i16()?,
            waypoint_dy: r.i16()?,
            x: r.i16()?,
            y: r.i16()?,
            engine_type: r.i16()?,
            hull_type: r.i16()?,
            beam_type: r.i16()?,
            num_beams: r.i16()?,
            num_bays: r.i16()?,
            launcher_type: r.i16()?,
            ammo: r.i16()?,
            num_launchers: r.i16()?,
            mission: r.i16()?,
            primary_enemy: r.i16()?,
            tow_target: r.i16()?,
            damage: r.i16()?,
            crew: r.i16()?,
            colonists: r.i16()?,
            name: decode_fixed(r.take(20)?, charset),
            neutronium: r.i16()?,
            tritanium: r.i16()?,
            duranium: r.i16()?,
            molybdenum: r.i16()?,
            supplies: r.i16()?,
            unload: Transfer::read(&mut r)?,
            transfer: Transfer::read(&mut r)?,
            intercept_target: r.i16()?,
            money: r.i16()?,
        })
    }

    fn encode(&self, charset: &dyn Charset) -> TurnResult<Vec<u8>> {
        let mut w = ByteWriter::with_capacity(Self::SIZE);
        w.i16(self.id)
            .i16(self.owner)
            .bytes(&encode_fixed::<3>(&self.friendly_code, charset)?)
            .i16_slice(&[
                self.warp,
                self.waypoint_dx,
                self.waypoint_dy,
                self.x,
                self.y,
                self.engine_type,
                self.hull_type,
                self.beam_type,
                self.num_beams,
                self.num_bays,
                self.launcher_type,
                self.ammo,
                self.num_launchers,
                self.mission,
                self.primary_enemy,
                self.tow_target,
                self.damage,
                self.crew,
                self.colonists,
            ])
            .bytes(&encode_fixed::<20>(&self.name, charset)?)
            .i16_slice(&[
                self.neutronium,
                self.tritanium,
                self.duranium,
                self.molybdenum,
                self.supplies,
            ]);
        self.unload.write(&mut w);
        self.transfer.write(&mut w);
        w.i16(self.intercept_target).i16(self.money);
        Ok(w.into_inner())
    }
}

impl IdentifiedRecord for ShipRecord {
    const ID_OFFSET: usize = 0;

    fn id(&self) -> i16 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytes::peek_i16;
    use turnkit_core::{checksum, Latin1};

    fn sample() -> ShipRecord {
        ShipRecord {
            id: 42,
            owner: 3,
            friendly_code: "abc".into(),
            warp: 9,
            x: 1200,
            y: 1450,
            hull_type: 15,
            launcher_type: 6,
            num_launchers: 4,
            damage: 12,
            crew: 300,
            name: "Ajax".into(),
            neutronium: 150,
            unload: Transfer {
                supplies: 10,
                target_id: 77,
                ..Transfer::default()
            },
            money: 500,
            ..ShipRecord::default()
        }
    }

    #[test]
    fn encodes_to_fixed_size() {
        let raw = sample().encode(&Latin1).unwrap();
        assert_eq!(raw.len(), ShipRecord::SIZE);
    }

    #[test]
    fn fixup_offsets_match_layout() {
        let raw = sample().encode(&Latin1).unwrap();
        assert_eq!(peek_i16(&raw, WARP_OFFSET), 9);
        assert_eq!(peek_i16(&raw, LAUNCHER_TYPE_OFFSET), 6);
        assert_eq!(peek_i16(&raw, LAUNCHER_COUNT_OFFSET), 4);
        assert_eq!(peek_i16(&raw, DAMAGE_OFFSET), 12);
    }

    #[test]
    fn roundtrip_preserves_fields() {
        let ship = sample();
        let raw = ship.encode(&Latin1).unwrap();
        assert_eq!(ShipRecord::decode(&raw, &Latin1).unwrap(), ship);
        assert_eq!(checksum(&raw), checksum(&ship.encode(&Latin1).unwrap()));
    }

    #[test]
    fn short_buffer_is_rejected() {
        let raw = sample().encode(&Latin1).unwrap();
        assert!(ShipRecord::decode(&raw[..100], &Latin1).is_err());
    }
}
