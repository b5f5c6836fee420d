use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{PlayerId, MAX_PLAYERS};

/// Set of players plus the host, stored as a bitmask.
///
/// Bit 0 is the host, bits 1..=11 are the regular players.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerSet(u16);

impl PlayerSet {
    /// Empty set.
    pub const EMPTY: Self = Self(0);

    /// Set containing only the host.
    pub const HOST: Self = Self(1);

    /// Build a set from a raw bitmask, dropping bits above player 11.
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits & ((1 << (MAX_PLAYERS + 1)) - 1))
    }

    /// Raw bitmask.
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Set containing a single player.
    pub const fn single(player: PlayerId) -> Self {
        Self(1 << player.get())
    }

    /// Add a player.
    pub fn insert(&mut self, player: PlayerId) {
        self.0 |= 1 << player.get();
    }

    /// Remove a player.
    pub fn remove(&mut self, player: PlayerId) {
        self.0 &= !(1 << player.get());
    }

    /// Add the host.
    pub fn insert_host(&mut self) {
        self.0 |= 1;
    }

    /// Whether `player` is in the set.
    pub const fn contains(self, player: PlayerId) -> bool {
        self.0 & (1 << player.get()) != 0
    }

    /// Whether the host is in the set.
    pub const fn contains_host(self) -> bool {
        self.0 & 1 != 0
    }

    /// Whether nothing is in the set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Union of two sets.
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Regular players in ascending order.
    pub fn players(self) -> impl Iterator<Item = PlayerId> {
        PlayerId::all().filter(move |p| self.contains(*p))
    }
}

impl FromIterator<PlayerId> for PlayerSet {
    fn from_iter<T: IntoIterator<Item = PlayerId>>(iter: T) -> Self {
        let mut set = PlayerSet::EMPTY;
        for player in iter {
            set.insert(player);
        }
        set
    }
}

impl fmt::Display for PlayerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for player in self.players() {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{player}")?;
            first = false;
        }
        if self.contains_host() {
            if !first {
                f.write_str(",")?;
            }
            f.write_str("host")?;
        }
        Ok(())
    }
}
