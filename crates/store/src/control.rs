//! Per-object checksum baseline (the control file).
//!
//! The file is a dense array of `u32` slots: ships, then planets, then bases,
//! each indexed by `id - 1`. Zero marks an empty slot. Files written by older
//! clients may be shorter; missing slots read as empty.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};
use turnkit_core::{ObjectKind, PlayerId, TurnResult};

use crate::files::{read_optional, WorkingFile};

/// Persisted map from `(kind, id)` to the last known record checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeTracker {
    player: PlayerId,
    slots: Vec<u32>,
}

fn base_offset(kind: ObjectKind) -> usize {
    ObjectKind::ALL
        .iter()
        .take_while(|k| **k != kind)
        .map(|k| k.capacity())
        .sum()
}

fn total_slots() -> usize {
    ObjectKind::ALL.iter().map(|k| k.capacity()).sum()
}

impl ChangeTracker {
    /// Empty tracker for `player`.
    pub fn new(player: PlayerId) -> Self {
        Self {
            player,
            slots: vec![0; total_slots()],
        }
    }

    /// Load the control file of `player`; a missing file is an empty baseline.
    pub fn load(dir: &Path, player: PlayerId) -> TurnResult<Self> {
        let mut tracker = Self::new(player);
        let path = WorkingFile::Control.path(dir, player);
        let Some(data) = read_optional(&path)? else {
            debug!(%player, "no control file, starting with an empty baseline");
            return Ok(tracker);
        };
        if data.len() % 4 != 0 {
            warn!(%player, len = data.len(), "control file has a partial trailing slot");
        }
        for (slot, chunk) in tracker.slots.iter_mut().zip(data.chunks_exact(4)) {
            *slot = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Ok(tracker)
    }

    /// Player the tracker belongs to.
    pub fn player(&self) -> PlayerId {
        self.player
    }

    fn index(kind: ObjectKind, id: i16) -> Option<usize> {
        let id = usize::try_from(id).ok()?;
        if (1..=kind.capacity()).contains(&id) {
            Some(base_offset(kind) + id - 1)
        } else {
            None
        }
    }

    /// Last known checksum, or `None` if the object was never recorded.
    pub fn get(&self, kind: ObjectKind, id: i16) -> Option<u32> {
        Self::index(kind, id)
            .map(|i| self.slots[i])
            .filter(|&sum| sum != 0)
    }

    /// Record a checksum. Ids outside the slot range are ignored.
    pub fn set(&mut self, kind: ObjectKind, id: i16, checksum: u32) {
        match Self::index(kind, id) {
            Some(i) => self.slots[i] = checksum,
            None => debug!(%kind, id, "ignoring checksum for out-of-range id"),
        }
    }

    /// Write the control file.
    pub fn save(&self, dir: &Path) -> TurnResult<()> {
        let mut out = Vec::with_capacity(self.slots.len() * 4);
        for slot in &self.slots {
            out.extend_from_slice(&slot.to_le_bytes());
        }
        fs::write(WorkingFile::Control.path(dir, self.player), out)?;
        Ok(())
    }
}
