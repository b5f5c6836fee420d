//! Objects carried by the extended result blocks (Block-K and Block-S):
//! minefields, ion storms, explosions, and ufos.
//!
//! Block-K layout (prologue):
//!
//! | Offset | Content |
//! |--------|---------|
//! | 0      | 500 minefields x 12 |
//! | 6000   | 50 ion storms x 12 |
//! | 6600   | 50 explosions x 4 |
//! | 6800   | marker `1120` |
//! | 6804   | 100 ufos x 78 |
//! | 14604  | optional marker `1211`, `i32` count, encrypted targets |
//!
//! Block-S: 4 reserved bytes, `i16` count, `count` ufos numbered from 101.

use serde::{Deserialize, Serialize};
use turnkit_core::{Charset, TurnError, TurnResult};

use crate::bytes::{ByteReader, ByteWriter};
use crate::record::{require_size, FixedRecord};
use crate::text::{decode_fixed, encode_fixed};

/// Minefield slots in a Block-K prologue.
pub const KORE_MINEFIELDS: usize = 500;
/// Ion storm slots in a Block-K prologue.
pub const KORE_STORMS: usize = 50;
/// Explosion slots in a Block-K prologue.
pub const KORE_EXPLOSIONS: usize = 50;
/// Ufo slots in a Block-K prologue.
pub const KORE_UFOS: usize = 100;

const MINEFIELDS_AT: usize = 0;
const STORMS_AT: usize = MINEFIELDS_AT + KORE_MINEFIELDS * Minefield::SIZE;
const EXPLOSIONS_AT: usize = STORMS_AT + KORE_STORMS * IonStorm::SIZE;
const UFO_MARKER_AT: usize = EXPLOSIONS_AT + KORE_EXPLOSIONS * Explosion::SIZE;
const UFOS_AT: usize = UFO_MARKER_AT + 4;

/// Size of the fixed Block-K prologue.
pub const KORE_PROLOGUE_SIZE: usize = UFOS_AT + KORE_UFOS * Ufo::SIZE;

/// Marker preceding the ufo table.
pub const KORE_UFO_MARKER: &[u8; 4] = b"1120";

/// Marker preceding the extension target list.
pub const KORE_TARGET_MARKER: &[u8; 4] = b"1211";

/// Size of the reserved Block-S prologue before its count word.
pub const SKORE_PROLOGUE_SIZE: usize = 4;

/// First ufo id stored in Block-S.
pub const SKORE_FIRST_UFO: i16 = 101;

/// Upper bound on Block-S ufos.
pub const SKORE_MAX_UFOS: usize = 900;

/// Minefield slot; id is slot index + 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Minefield {
    /// X coordinate.
    pub x: i16,
    /// Y coordinate.
    pub y: i16,
    /// Laying player.
    pub owner: i16,
    /// Mine units; 0 marks an unused slot.
    pub units: i32,
    /// 1 = web mines.
    pub kind: i16,
}

impl Minefield {
    /// True for a used slot.
    pub fn is_present(&self) -> bool {
        self.units > 0
    }
}

impl FixedRecord for Minefield {
    const SIZE: usize = 12;
    const NAME: &'static str = "minefield";

    fn decode(raw: &[u8], _charset: &dyn Charset) -> TurnResult<Self> {
        require_size::<Self>(raw)?;
        let mut r = ByteReader::new(raw, Self::NAME);
        Ok(Self {
            x: r.i16()?,
            y: r.i16()?,
            owner: r.i16()?,
            units: r.i32()?,
            kind: r.i16()?,
        })
    }

    fn encode(&self, _charset: &dyn Charset) -> TurnResult<Vec<u8>> {
        let mut w = ByteWriter::with_capacity(Self::SIZE);
        w.i16_slice(&[self.x, self.y, self.owner])
            .i32(self.units)
            .i16(self.kind);
        Ok(w.into_inner())
    }
}

/// Ion storm slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IonStorm {
    /// X coordinate.
    pub x: i16,
    /// Y coordinate.
    pub y: i16,
    /// Radius in light years.
    pub radius: i16,
    /// Voltage; 0 marks an unused slot.
    pub voltage: i16,
    /// Movement speed.
    pub warp: i16,
    /// Movement heading in degrees.
    pub heading: i16,
}

impl IonStorm {
    /// True for a used slot.
    pub fn is_present(&self) -> bool {
        self.voltage > 0 && self.radius > 0
    }
}

impl FixedRecord for IonStorm {
    const SIZE: usize = 12;
    const NAME: &'static str = "ion storm";

    fn decode(raw: &[u8], _charset: &dyn Charset) -> TurnResult<Self> {
        require_size::<Self>(raw)?;
        let mut r = ByteReader::new(raw, Self::NAME);
        Ok(Self {
            x: r.i16()?,
            y: r.i16()?,
            radius: r.i16()?,
            voltage: r.i16()?,
            warp: r.i16()?,
            heading: r.i16()?,
        })
    }

    fn encode(&self, _charset: &dyn Charset) -> TurnResult<Vec<u8>> {
        let mut w = ByteWriter::with_capacity(Self::SIZE);
        w.i16_slice(&[
            self.x,
            self.y,
            self.radius,
            self.voltage,
            self.warp,
            self.heading,
        ]);
        Ok(w.into_inner())
    }
}

/// Explosion seen this turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explosion {
    /// X coordinate.
    pub x: i16,
    /// Y coordinate.
    pub y: i16,
}

impl Explosion {
    /// True for a used slot.
    pub fn is_present(&self) -> bool {
        self.x != 0 || self.y != 0
    }
}

impl FixedRecord for Explosion {
    const SIZE: usize = 4;
    const NAME: &'static str = "explosion";

    fn decode(raw: &[u8], _charset: &dyn Charset) -> TurnResult<Self> {
        require_size::<Self>(raw)?;
        let mut r = ByteReader::new(raw, Self::NAME);
        Ok(Self {
            x: r.i16()?,
            y: r.i16()?,
        })
    }

    fn encode(&self, _charset: &dyn Charset) -> TurnResult<Vec<u8>> {
        let mut w = ByteWriter::with_capacity(Self::SIZE);
        w.i16(self.x).i16(self.y);
        Ok(w.into_inner())
    }
}

/// Unidentified object reported by host add-ons.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ufo {
    /// Display color; 0 marks an unused slot.
    pub color: i16,
    /// Display name.
    pub name: String,
    /// First info line.
    pub info1: String,
    /// Second info line.
    pub info2: String,
    /// X coordinate.
    pub x: i16,
    /// Y coordinate.
    pub y: i16,
    /// Speed.
    pub warp: i16,
    /// Heading in degrees.
    pub heading: i16,
    /// Distance at which planets see it.
    pub planet_range: i16,
    /// Distance at which ships see it.
    pub ship_range: i16,
    /// Radius.
    pub radius: i16,
    /// Add-on specific type.
    pub type_code: i16,
}

impl Ufo {
    /// True for a used slot.
    pub fn is_present(&self) -> bool {
        self.color != 0
    }
}

impl FixedRecord for Ufo {
    const SIZE: usize = 78;
    const NAME: &'static str = "ufo";

    fn decode(raw: &[u8], charset: &dyn Charset) -> TurnResult<Self> {
        require_size::<Self>(raw)?;
        let mut r = ByteReader::new(raw, Self::NAME);
        Ok(Self {
            color: r.i16()?,
            name: decode_fixed(r.take(20)?, charset),
            info1: decode_fixed(r.take(20)?, charset),
            info2: decode_fixed(r.take(20)?, charset),
            x: r.i16()?,
            y: r.i16()?,
            warp: r.i16()?,
            heading: r.i16()?,
            planet_range: r.i16()?,
            ship_range: r.i16()?,
            radius: r.i16()?,
            type_code: r.i16()?,
        })
    }

    fn encode(&self, charset: &dyn Charset) -> TurnResult<Vec<u8>> {
        let mut w = ByteWriter::with_capacity(Self::SIZE);
        w.i16(self.color)
            .bytes(&encode_fixed::<20>(&self.name, charset)?)
            .bytes(&encode_fixed::<20>(&self.info1, charset)?)
            .bytes(&encode_fixed::<20>(&self.info2, charset)?)
            .i16_slice(&[
                self.x,
                self.y,
                self.warp,
                self.heading,
                self.planet_range,
                self.ship_range,
                self.radius,
                self.type_code,
            ]);
        Ok(w.into_inner())
    }
}

/// Decoded Block-K prologue. Vectors keep empty slots so that index + 1 is the id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KoreContents {
    /// All minefield slots.
    pub minefields: Vec<Minefield>,
    /// All ion storm slots.
    pub storms: Vec<IonStorm>,
    /// All explosion slots.
    pub explosions: Vec<Explosion>,
    /// Ufo slots 1..=100; empty when the ufo marker is missing.
    pub ufos: Vec<Ufo>,
}

fn decode_table<T: FixedRecord>(
    raw: &[u8],
    at: usize,
    count: usize,
    charset: &dyn Charset,
) -> TurnResult<Vec<T>> {
    raw[at..at + count * T::SIZE]
        .chunks_exact(T::SIZE)
        .map(|chunk| T::decode(chunk, charset))
        .collect()
}

impl KoreContents {
    /// Decode a Block-K prologue (also the content of `kore` working files).
    pub fn decode(raw: &[u8], charset: &dyn Charset) -> TurnResult<Self> {
        if raw.len() < KORE_PROLOGUE_SIZE {
            return Err(TurnError::too_short(
                "block-K prologue",
                KORE_PROLOGUE_SIZE,
                raw.len(),
            ));
        }
        let ufos = if &raw[UFO_MARKER_AT..UFOS_AT] == KORE_UFO_MARKER {
            decode_table(raw, UFOS_AT, KORE_UFOS, charset)?
        } else {
            tracing::debug!("block-K ufo marker missing; ufo table ignored");
            Vec::new()
        };
        Ok(Self {
            minefields: decode_table(raw, MINEFIELDS_AT, KORE_MINEFIELDS, charset)?,
            storms: decode_table(raw, STORMS_AT, KORE_STORMS, charset)?,
            explosions: decode_table(raw, EXPLOSIONS_AT, KORE_EXPLOSIONS, charset)?,
            ufos,
        })
    }

    /// Encode into a Block-K prologue; short tables are padded with empty slots.
    pub fn encode(&self, charset: &dyn Charset) -> TurnResult<Vec<u8>> {
        let mut out = Vec::with_capacity(KORE_PROLOGUE_SIZE);
        encode_table(&mut out, &self.minefields, KORE_MINEFIELDS, charset)?;
        encode_table(&mut out, &self.storms, KORE_STORMS, charset)?;
        encode_table(&mut out, &self.explosions, KORE_EXPLOSIONS, charset)?;
        out.extend_from_slice(KORE_UFO_MARKER);
        encode_table(&mut out, &self.ufos, KORE_UFOS, charset)?;
        Ok(out)
    }
}

fn encode_table<T: FixedRecord + Default>(
    out: &mut Vec<u8>,
    items: &[T],
    slots: usize,
    charset: &dyn Charset,
) -> TurnResult<()> {
    if items.len() > slots {
        return Err(TurnError::format(format!(
            "{} {}s do not fit into {} slots",
            items.len(),
            T::NAME,
            slots
        )));
    }
    for item in items {
        out.extend(item.encode(charset)?);
    }
    let blank = T::default().encode(charset)?;
    for _ in items.len()..slots {
        out.extend_from_slice(&blank);
    }
    Ok(())
}
