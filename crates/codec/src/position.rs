//! Ship position table: one 8-byte entry per ship id, no count word.

use serde::{Deserialize, Serialize};
use turnkit_core::{Charset, TurnResult};

use crate::bytes::{ByteReader, ByteWriter};
use crate::record::{require_size, FixedRecord};

/// Number of entries in the table.
pub const SHIP_POSITION_COUNT: usize = 500;

/// Size of the whole table in bytes.
pub const SHIP_POSITION_TABLE_SIZE: usize = SHIP_POSITION_COUNT * ShipPosition::SIZE;

/// Position and mass of a ship seen anywhere in the galaxy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipPosition {
    /// X coordinate.
    pub x: i16,
    /// Y coordinate.
    pub y: i16,
    /// Owning player; 0 marks an unused slot.
    pub owner: i16,
    /// Ship mass.
    pub mass: i16,
}

impl ShipPosition {
    /// Entries with owner 0 are unused slots.
    pub fn is_present(&self) -> bool {
        self.owner != 0
    }
}

impl FixedRecord for ShipPosition {
    const SIZE: usize = 8;
    const NAME: &'static str = "ship position";

    fn decode(raw: &[u8], _charset: &dyn Charset) -> TurnResult<Self> {
        require_size::<Self>(raw)?;
        let mut r = ByteReader::new(raw, Self::NAME);
        Ok(Self {
            x: r.i16()?,
            y: r.i16()?,
            owner: r.i16()?,
            mass: r.i16()?,
        })
    }

    fn encode(&self, _charset: &dyn Charset) -> TurnResult<Vec<u8>> {
        let mut w = ByteWriter::with_capacity(Self::SIZE);
        w.i16_slice(&[self.x, self.y, self.owner, self.mass]);
        Ok(w.into_inner())
    }
}
