//! Corrections for known host-side inconsistencies in ship records.
//!
//! Both passes patch raw bytes in place so that every other byte of the
//! record stays exactly as the host wrote it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bytes::{peek_i16, poke_i16};
use crate::record::FixedRecord;
use crate::ship::{
    ShipRecord, DAMAGE_OFFSET, LAUNCHER_COUNT_OFFSET, LAUNCHER_TYPE_OFFSET, WARP_OFFSET,
};

const MAX_WARP: i16 = 10;

/// Which fix-up passes to run. The two passes are independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipFixups {
    /// Zero launchers with a non-zero launcher type: clear the type.
    /// Applies to the derived (DAT) copy only.
    pub launchers: bool,
    /// Warp outside 0..=10 on a ship with more than 100% damage: clamp.
    /// Applies to both copies.
    pub warp: bool,
}

impl Default for ShipFixups {
    fn default() -> Self {
        Self {
            launchers: true,
            warp: true,
        }
    }
}

impl ShipFixups {
    /// No fix-up pass.
    pub const NONE: Self = Self {
        launchers: false,
        warp: false,
    };

    /// Fix the derived copy of a run of raw ship records. Returns the number
    /// of records touched.
    pub fn apply_derived(&self, records: &mut [u8]) -> usize {
        let mut touched = 0;
        for raw in records.chunks_exact_mut(ShipRecord::SIZE) {
            let mut changed = false;
            if self.launchers {
                changed |= fix_launchers(raw);
            }
            if self.warp {
                changed |= fix_warp(raw);
            }
            touched += usize::from(changed);
        }
        touched
    }

    /// Fix the canonical (DIS) copy. Only the warp pass reaches it.
    pub fn apply_canonical(&self, records: &mut [u8]) -> usize {
        if !self.warp {
            return 0;
        }
        records
            .chunks_exact_mut(ShipRecord::SIZE)
            .map(|raw| usize::from(fix_warp(raw)))
            .sum()
    }
}

fn fix_launchers(raw: &mut [u8]) -> bool {
    let count = peek_i16(raw, LAUNCHER_COUNT_OFFSET);
    let kind = peek_i16(raw, LAUNCHER_TYPE_OFFSET);
    if count == 0 && kind != 0 {
        debug!(ship = peek_i16(raw, 0), kind, "clearing launcher type");
        poke_i16(raw, LAUNCHER_TYPE_OFFSET, 0);
        true
    } else {
        false
    }
}

fn fix_warp(raw: &mut [u8]) -> bool {
    let damage = peek_i16(raw, DAMAGE_OFFSET);
    let warp = peek_i16(raw, WARP_OFFSET);
    if damage > 100 && !(0..=MAX_WARP).contains(&warp) {
        debug!(ship = peek_i16(raw, 0), warp, damage, "clamping warp");
        poke_i16(raw, WARP_OFFSET, warp.clamp(0, MAX_WARP));
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turnkit_core::Latin1;

    fn ship_bytes(launcher_type: i16, launchers: i16, warp: i16, damage: i16) -> Vec<u8> {
        ShipRecord {
            id: 5,
            owner: 3,
            launcher_type,
            num_launchers: launchers,
            warp,
            damage,
            name: "Test".into(),
            ..ShipRecord::default()
        }
        .encode(&Latin1)
        .unwrap()
    }

    #[test]
    fn launcher_fix_touches_derived_copy_only() {
        let original = ship_bytes(4, 0, 5, 0);
        let mut derived = original.clone();
        let mut canonical = original.clone();
        let fixups = ShipFixups::default();

        assert_eq!(fixups.apply_derived(&mut derived), 1);
        assert_eq!(fixups.apply_canonical(&mut canonical), 0);

        let fixed = ShipRecord::decode(&derived, &Latin1).unwrap();
        assert_eq!(fixed.launcher_type, 0);
        assert_eq!(canonical, original);
        // Nothing but the launcher type changed.
        let differing: Vec<usize> = (0..original.len())
            .filter(|&i| original[i] != derived[i])
            .collect();
        assert_eq!(differing, vec![LAUNCHER_TYPE_OFFSET]);
    }

    #[test]
    fn warp_fix_touches_both_copies() {
        let mut derived = ship_bytes(0, 0, 14, 150);
        let mut canonical = derived.clone();
        let fixups = ShipFixups::default();
        fixups.apply_derived(&mut derived);
        fixups.apply_canonical(&mut canonical);
        assert_eq!(ShipRecord::decode(&derived, &Latin1).unwrap().warp, 10);
        assert_eq!(ShipRecord::decode(&canonical, &Latin1).unwrap().warp, 10);
    }

    #[test]
    fn warp_fix_needs_heavy_damage() {
        let mut raw = ship_bytes(0, 0, 14, 100);
        assert_eq!(ShipFixups::default().apply_derived(&mut raw), 0);
        let mut negative = ship_bytes(0, 0, -3, 120);
        ShipFixups::default().apply_canonical(&mut negative);
        assert_eq!(ShipRecord::decode(&negative, &Latin1).unwrap().warp, 0);
    }

    #[test]
    fn passes_toggle_independently() {
        let mut raw = ship_bytes(4, 0, 14, 150);
        let only_warp = ShipFixups {
            launchers: false,
            warp: true,
        };
        only_warp.apply_derived(&mut raw);
        let ship = ShipRecord::decode(&raw, &Latin1).unwrap();
        assert_eq!(ship.launcher_type, 4);
        assert_eq!(ship.warp, 10);

        let mut untouched = ship_bytes(4, 0, 14, 150);
        assert_eq!(ShipFixups::NONE.apply_derived(&mut untouched), 0);
    }
}
