//! Planet records (85 bytes). The owner precedes the id.

use serde::{Deserialize, Serialize};
use turnkit_core::{Charset, TurnResult};

use crate::bytes::{ByteReader, ByteWriter};
use crate::record::{require_size, FixedRecord, IdentifiedRecord};
use crate::text::{decode_fixed, encode_fixed};

/// Minerals in N/T/D/M order.
pub type Minerals<T> = [T; 4];

/// One planet as stored in result files and `pdata` working files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanetRecord {
    /// Owning player, 0 for unowned.
    pub owner: i16,
    /// Planet id.
    pub id: i16,
    /// Three-character friendly code.
    pub friendly_code: String,
    /// Mineral mines.
    pub mines: i16,
    /// Factories.
    pub factories: i16,
    /// Planetary defense posts.
    pub defense_posts: i16,
    /// Mined minerals on the surface.
    pub mined: Minerals<i32>,
    /// Colonist clans.
    pub colonists: i32,
    /// Supplies.
    pub supplies: i32,
    /// Megacredits.
    pub money: i32,
    /// Minerals still in the ground.
    pub ground: Minerals<i32>,
    /// Mining density per mineral, in percent.
    pub density: Minerals<i16>,
    /// Colonist tax rate.
    pub colonist_tax: i16,
    /// Native tax rate.
    pub native_tax: i16,
    /// Colonist happiness.
    pub colonist_happiness: i16,
    /// Native happiness.
    pub native_happiness: i16,
    /// Native government code.
    pub native_government: i16,
    /// Native clans.
    pub natives: i32,
    /// Native race code.
    pub native_race: i16,
    /// Temperature code.
    pub temperature_code: i16,
    /// 1 when a starbase is ordered.
    pub build_base: i16,
}

impl FixedRecord for PlanetRecord {
    const SIZE: usize = 85;
    const NAME: &'static str = "planet record";

    fn decode(raw: &[u8], charset: &dyn Charset) -> TurnResult<Self> {
        require_size::<Self>(raw)?;
        let mut r = ByteReader::new(raw, Self::NAME);
        Ok(Self {
            owner: r.i16()?,
            id: r.i16()?,
            friendly_code: decode_fixed(r.take(3)?, charset),
            mines: r.i16()?,
            factories: r.i16()?,
            defense_posts: r.i16()?,
            mined: r.i32_array()?,
            colonists: r.i32()?,
            supplies: r.i32()?,
            money: r.i32()?,
            ground: r.i32_array()?,
            density: r.i16_array()?,
            colonist_tax: r.i16()?,
            native_tax: r.i16()?,
            colonist_happiness: r.i16()?,
            native_happiness: r.i16()?,
            native_government: r.i16()?,
            natives: r.i32()?,
            native_race: r.i16()?,
            temperature_code: r.i16()?,
            build_base: r.i16()?,
        })
    }

    fn encode(&self, charset: &dyn Charset) -> TurnResult<Vec<u8>> {
        let mut w = ByteWriter::with_capacity(Self::SIZE);
        w.i16(self.owner)
            .i16(self.id)
            .bytes(&encode_fixed::<3>(&self.friendly_code, charset)?)
            .i16_slice(&[self.mines, self.factories, self.defense_posts])
            .i32_slice(&self.mined)
            .i32(self.colonists)
            .i32(self.supplies)
            .i32(self.money)
            .i32_slice(&self.ground)
            .i16_slice(&self.density)
            .i16_slice(&[
                self.colonist_tax,
                self.native_tax,
                self.colonist_happiness,
                self.native_happiness,
                self.native_government,
            ])
            .i32(self.natives)
            .i16_slice(&[self.native_race, self.temperature_code, self.build_base]);
        Ok(w.into_inner())
    }
}

impl IdentifiedRecord for PlanetRecord {
    const ID_OFFSET: usize = 2;

    fn id(&self) -> i16 {
        self.id
    }
}
