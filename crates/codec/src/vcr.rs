//! Battle recordings (100 bytes each). Only the setup is stored; the host
//! expects clients to replay the fight from the seed.

use serde::{Deserialize, Serialize};
use turnkit_core::{Charset, TurnResult};

use crate::bytes::{ByteReader, ByteWriter};
use crate::record::{require_size, FixedRecord};
use crate::text::{decode_fixed, encode_fixed};

/// Upper bound on battles per result.
pub const MAX_BATTLES: usize = 500;

/// One participant of a recorded battle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    /// Ship or planet name.
    pub name: String,
    /// Damage percentage.
    pub damage: i16,
    /// Crew.
    pub crew: i16,
    /// Ship or planet id.
    pub id: i16,
    /// Owning player.
    pub owner: u8,
    /// Race, when it differs from the owner.
    pub race: u8,
    /// Picture number.
    pub picture: u8,
    /// Hull type, 0 for planets.
    pub hull_type: u8,
    /// Beam weapon type.
    pub beam_type: i16,
    /// Number of beams.
    pub num_beams: u8,
    /// Experience level.
    pub experience: u8,
    /// Number of fighter bays.
    pub num_bays: i16,
    /// Torpedo launcher type.
    pub launcher_type: i16,
    /// Torpedoes or fighters.
    pub ammo: i16,
    /// Number of launchers.
    pub num_launchers: i16,
}

impl Combatant {
    const SIZE: usize = 42;

    fn read(r: &mut ByteReader<'_>, charset: &dyn Charset) -> TurnResult<Self> {
        Ok(Self {
            name: decode_fixed(r.take(20)?, charset),
            damage: r.i16()?,
            crew: r.i16()?,
            id: r.i16()?,
            owner: r.u8()?,
            race: r.u8()?,
            picture: r.u8()?,
            hull_type: r.u8()?,
            beam_type: r.i16()?,
            num_beams: r.u8()?,
            experience: r.u8()?,
            num_bays: r.i16()?,
            launcher_type: r.i16()?,
            ammo: r.i16()?,
            num_launchers: r.i16()?,
        })
    }

    fn write(&self, w: &mut ByteWriter, charset: &dyn Charset) -> TurnResult<()> {
        w.bytes(&encode_fixed::<20>(&self.name, charset)?)
            .i16_slice(&[self.damage, self.crew, self.id])
            .u8(self.owner)
            .u8(self.race)
            .u8(self.picture)
            .u8(self.hull_type)
            .i16(self.beam_type)
            .u8(self.num_beams)
            .u8(self.experience)
            .i16_slice(&[
                self.num_bays,
                self.launcher_type,
                self.ammo,
                self.num_launchers,
            ]);
        Ok(())
    }
}

/// One recorded battle between two combatants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleRecord {
    /// Random seed of the fight.
    pub seed: i16,
    /// Host signature word.
    pub signature: i16,
    /// Temperature of the planet, if one fights.
    pub temperature: i16,
    /// 0 = ship/ship, 1 = ship/planet.
    pub battle_type: i16,
    /// Left combatant mass.
    pub left_mass: i16,
    /// Right combatant mass.
    pub right_mass: i16,
    /// Left combatant.
    pub left: Combatant,
    /// Right combatant.
    pub right: Combatant,
    /// Left shield strength.
    pub left_shield: i16,
    /// Right shield strength.
    pub right_shield: i16,
}

impl FixedRecord for BattleRecord {
    const SIZE: usize = 12 + 2 * Combatant::SIZE + 4;
    const NAME: &'static str = "battle record";

    fn decode(raw: &[u8], charset: &dyn Charset) -> TurnResult<Self> {
        require_size::<Self>(raw)?;
        let mut r = ByteReader::new(raw, Self::NAME);
        Ok(Self {
            seed: r.i16()?,
            signature: r.i16()?,
            temperature: r.i16()?,
            battle_type: r.i16()?,
            left_mass: r.i16()?,
            right_mass: r.i16()?,
            left: Combatant::read(&mut r, charset)?,
            right: Combatant::read(&mut r, charset)?,
            left_shield: r.i16()?,
            right_shield: r.i16()?,
        })
    }

    fn encode(&self, charset: &dyn Charset) -> TurnResult<Vec<u8>> {
        let mut w = ByteWriter::with_capacity(Self::SIZE);
        w.i16_slice(&[
            self.seed,
            self.signature,
            self.temperature,
            self.battle_type,
            self.left_mass,
            self.right_mass,
        ]);
        self.left.write(&mut w, charset)?;
        self.right.write(&mut w, charset)?;
        w.i16(self.left_shield).i16(self.right_shield);
        Ok(w.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turnkit_core::Latin1;

    #[test]
    fn record_is_100_bytes() {
        assert_eq!(BattleRecord::SIZE, 100);
        let raw = BattleRecord::default().encode(&Latin1).unwrap();
        assert_eq!(raw.len(), 100);
    }

    #[test]
    fn roundtrip() {
        let battle = BattleRecord {
            seed: 17,
            battle_type: 1,
            left: Combatant {
                name: "Falcon".into(),
                id: 12,
                owner: 3,
                num_beams: 6,
                ..Combatant::default()
            },
            right: Combatant {
                name: "Orion".into(),
                id: 400,
                owner: 7,
                num_bays: 3,
                ..Combatant::default()
            },
            right_shield: 100,
            ..BattleRecord::default()
        };
        let raw = battle.encode(&Latin1).unwrap();
        assert_eq!(BattleRecord::decode(&raw, &Latin1).unwrap(), battle);
    }
}
