#![warn(missing_docs)]
//! Core primitives shared across the workspace: player ids, object kinds,
//! the additive checksum, the game character set, and the error taxonomy.

mod charset;
mod checksum;
mod error;
mod player_set;

pub use charset::{Ascii, Charset, Latin1};
pub use checksum::{checksum, checksum_from, Checksum};
pub use error::{TurnError, TurnResult};
pub use player_set::PlayerSet;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest regular player number.
pub const MAX_PLAYERS: u8 = 11;

/// Highest ship id a result file may reference.
pub const MAX_SHIPS: usize = 999;

/// Highest planet id (planets and bases share the id space).
pub const MAX_PLANETS: usize = 500;

/// Player number (1..=11).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(u8);

impl PlayerId {
    /// Create a player id, rejecting values outside 1..=11.
    pub const fn new(value: u8) -> Option<Self> {
        if value >= 1 && value <= MAX_PLAYERS {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Numeric player number.
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Iterate over all regular players.
    pub fn all() -> impl Iterator<Item = PlayerId> {
        (1..=MAX_PLAYERS).map(PlayerId)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i16> for PlayerId {
    type Error = TurnError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .and_then(PlayerId::new)
            .ok_or_else(|| TurnError::format(format!("invalid player number {value}")))
    }
}

/// Object categories tracked by the control file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Starships.
    Ship,
    /// Planets.
    Planet,
    /// Starbases.
    Base,
}

impl ObjectKind {
    /// All kinds in control-file order.
    pub const ALL: [ObjectKind; 3] = [ObjectKind::Ship, ObjectKind::Planet, ObjectKind::Base];

    /// Number of id slots reserved for this kind.
    pub const fn capacity(self) -> usize {
        match self {
            Self::Ship => MAX_SHIPS,
            Self::Planet | Self::Base => MAX_PLANETS,
        }
    }

    /// Canonical string key used in logs and reports.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ship => "ship",
            Self::Planet => "planet",
            Self::Base => "base",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_id_range() {
        assert!(PlayerId::new(0).is_none());
        assert_eq!(PlayerId::new(1).map(PlayerId::get), Some(1));
        assert_eq!(PlayerId::new(11).map(PlayerId::get), Some(11));
        assert!(PlayerId::new(12).is_none());
        assert_eq!(PlayerId::all().count(), 11);
    }

    #[test]
    fn player_id_from_record_field() {
        assert_eq!(PlayerId::try_from(7i16).unwrap().get(), 7);
        assert!(PlayerId::try_from(-1i16).is_err());
        assert!(PlayerId::try_from(300i16).is_err());
    }

    #[test]
    fn object_kind_capacity() {
        assert_eq!(ObjectKind::Ship.capacity(), 999);
        assert_eq!(ObjectKind::Base.capacity(), 500);
        assert_eq!(ObjectKind::Planet.to_string(), "planet");
    }
}
