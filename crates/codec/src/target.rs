//! Visual contacts ("targets", 34 bytes).
//!
//! Targets kept outside the primary section are stored with an obfuscated name.

use serde::{Deserialize, Serialize};
use turnkit_core::{Charset, TurnResult};

use crate::bytes::{ByteReader, ByteWriter};
use crate::record::{require_size, FixedRecord, IdentifiedRecord};
use crate::text::{decode_fixed, encode_fixed};

const NAME_OFFSET: usize = 14;
const NAME_LEN: usize = 20;

/// A foreign ship seen this turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRecord {
    /// Ship id.
    pub id: i16,
    /// Owning player.
    pub owner: i16,
    /// Warp factor.
    pub warp: i16,
    /// X coordinate.
    pub x: i16,
    /// Y coordinate.
    pub y: i16,
    /// Hull type.
    pub hull_type: i16,
    /// Heading in degrees, -1 when unknown.
    pub heading: i16,
    /// Ship name.
    pub name: String,
}

impl FixedRecord for TargetRecord {
    const SIZE: usize = 34;
    const NAME: &'static str = "target record";

    fn decode(raw: &[u8], charset: &dyn Charset) -> TurnResult<Self> {
        require_size::<Self>(raw)?;
        let mut r = ByteReader::new(raw, Self::NAME);
        Ok(Self {
            id: r.i16()?,
            owner: r.i16()?,
            warp: r.i16()?,
            x: r.i16()?,
            y: r.i16()?,
            hull_type: r.i16()?,
            heading: r.i16()?,
            name: decode_fixed(r.take(NAME_LEN)?, charset),
        })
    }

    fn encode(&self, charset: &dyn Charset) -> TurnResult<Vec<u8>> {
        let mut w = ByteWriter::with_capacity(Self::SIZE);
        w.i16_slice(&[
            self.id,
            self.owner,
            self.warp,
            self.x,
            self.y,
            self.hull_type,
            self.heading,
        ])
        .bytes(&encode_fixed::<NAME_LEN>(&self.name, charset)?);
        Ok(w.into_inner())
    }
}

impl IdentifiedRecord for TargetRecord {
    const ID_OFFSET: usize = 0;

    fn id(&self) -> i16 {
        self.id
    }
}

/// Toggle the name obfuscation of a raw target record in place.
///
/// The transform is its own inverse: name byte `i` is XORed with `154 - i`.
pub fn toggle_target_encryption(raw: &mut [u8]) {
    for (i, byte) in raw[NAME_OFFSET..NAME_OFFSET + NAME_LEN]
        .iter_mut()
        .enumerate()
    {
        *byte ^= 154 - i as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turnkit_core::Latin1;

    #[test]
    fn encryption_is_an_involution() {
        let target = TargetRecord {
            id: 12,
            owner: 5,
            warp: 7,
            x: 2000,
            y: 2100,
            hull_type: 44,
            heading: 90,
            name: "Scout".into(),
        };
        let plain = target.encode(&Latin1).unwrap();
        let mut raw = plain.clone();
        toggle_target_encryption(&mut raw);
        assert_ne!(raw, plain);
        assert_eq!(&raw[..NAME_OFFSET], &plain[..NAME_OFFSET]);
        toggle_target_encryption(&mut raw);
        assert_eq!(raw, plain);
        assert_eq!(TargetRecord::decode(&raw, &Latin1).unwrap(), target);
    }
}
