use thiserror::Error;

use crate::{ObjectKind, PlayerId};

/// Convenience alias for results carrying a [`TurnError`].
pub type TurnResult<T> = Result<T, TurnError>;

/// Errors raised while decoding, unpacking, or saving turn data.
#[derive(Debug, Error)]
pub enum TurnError {
    /// Structurally invalid header or section. Always fatal.
    #[error("invalid file format: {0}")]
    Format(String),

    /// Fewer bytes available than a record's minimum size.
    #[error("{what} too short: need {needed} bytes, have {available}")]
    TooShort {
        /// What was being read.
        what: &'static str,
        /// Minimum number of bytes required.
        needed: usize,
        /// Number of bytes available.
        available: usize,
    },

    /// A section checksum does not match the recorded value.
    #[error("checksum mismatch in {section}: expected {expected:#010x}, found {found:#010x}")]
    ChecksumMismatch {
        /// Section name.
        section: &'static str,
        /// Value recorded in the header.
        expected: u32,
        /// Value computed from the data.
        found: u32,
    },

    /// Caller asked to save an object the player does not own.
    #[error("player {player} does not own {kind} #{id}")]
    OwnershipViolation {
        /// Object category.
        kind: ObjectKind,
        /// Object id.
        id: i16,
        /// Requesting player.
        player: PlayerId,
    },

    /// File belongs to a different player.
    #[error("file belongs to player {found}, expected player {expected}")]
    WrongPlayer {
        /// Player the caller asked for.
        expected: PlayerId,
        /// Owner recorded in the file.
        found: i16,
    },

    /// Text cannot be represented in the game character set.
    #[error("character {0:?} is not representable in the game character set")]
    Charset(char),

    /// Operation not allowed in the current session state.
    #[error("invalid turn state: {0}")]
    InvalidState(String),

    /// Wrapped I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl TurnError {
    /// Build a [`TurnError::Format`] from any message.
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }

    /// Build a [`TurnError::TooShort`].
    pub fn too_short(what: &'static str, needed: usize, available: usize) -> Self {
        Self::TooShort {
            what,
            needed,
            available,
        }
    }

    /// Whether lenient mode may log this error and continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ChecksumMismatch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_checksum_mismatch_is_recoverable() {
        let mismatch = TurnError::ChecksumMismatch {
            section: "ships",
            expected: 1,
            found: 2,
        };
        assert!(mismatch.is_recoverable());
        assert!(!TurnError::format("bad").is_recoverable());
        assert!(!TurnError::too_short("ship", 107, 3).is_recoverable());
    }

    #[test]
    fn messages_name_the_section() {
        let mismatch = TurnError::ChecksumMismatch {
            section: "planets",
            expected: 0x10,
            found: 0x20,
        };
        assert!(mismatch.to_string().contains("planets"));
        let short = TurnError::too_short("base", 156, 10);
        assert_eq!(short.to_string(), "base too short: need 156 bytes, have 10");
    }
}
