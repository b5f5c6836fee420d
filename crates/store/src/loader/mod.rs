//! Turn loading strategies and the per-player session around them.

mod directory;
mod result;

pub use directory::DirectoryTurnLoader;
pub use result::ResultTurnLoader;

use std::ops::{Deref, DerefMut};
use std::path::Path;

use serde::Serialize;
use tracing::{debug, trace};
use turnkit_codec::Outbox;
use turnkit_core::{Charset, PlayerId, TurnError, TurnResult};

use crate::files::WorkingFile;
use crate::options::UnpackOptions;
use crate::turn::{PlayerStatus, SaveReport, TurnData};

/// Common contract of the directory and result-file strategies.
pub trait TurnLoader {
    /// Cheap availability check that does not load the turn.
    fn get_player_status(&self, player: PlayerId) -> TurnResult<PlayerStatus>;

    /// Load the current turn of `player`.
    fn load_current_turn(&mut self, player: PlayerId) -> TurnResult<TurnData>;

    /// Write the turn back. Entries appended to the outbox during the save
    /// are removed again before this returns, on success and on error.
    fn save_current_turn(&mut self, turn: &mut TurnData) -> TurnResult<SaveReport>;

    /// Load an earlier turn from its result backup.
    fn load_history_turn(&self, player: PlayerId, turn: i16) -> TurnResult<TurnData>;
}

/// Pick a strategy by what the directory holds: unpacked working files win
/// over a result file. `None` when there is nothing to load.
pub fn select_loader(
    dir: &Path,
    player: PlayerId,
    options: UnpackOptions,
    charset: Box<dyn Charset>,
) -> Option<Box<dyn TurnLoader>> {
    if WorkingFile::Gen.path(dir, player).exists() {
        debug!(%player, "using working directory");
        Some(Box::new(DirectoryTurnLoader::new(dir, options, charset)))
    } else if WorkingFile::Result.path(dir, player).exists() {
        debug!(%player, "using result file");
        Some(Box::new(ResultTurnLoader::new(dir, options, charset)))
    } else {
        None
    }
}

/// Restores an outbox to its length at creation when dropped.
pub struct OutboxRestoreGuard<'a> {
    outbox: &'a mut Outbox,
    mark: usize,
}

impl<'a> OutboxRestoreGuard<'a> {
    /// Remember the current length of `outbox`.
    pub fn new(outbox: &'a mut Outbox) -> Self {
        let mark = outbox.len();
        Self { outbox, mark }
    }

    /// Length the outbox returns to.
    pub fn mark(&self) -> usize {
        self.mark
    }
}

impl Deref for OutboxRestoreGuard<'_> {
    type Target = Outbox;

    fn deref(&self) -> &Outbox {
        self.outbox
    }
}

impl DerefMut for OutboxRestoreGuard<'_> {
    fn deref_mut(&mut self) -> &mut Outbox {
        self.outbox
    }
}

impl Drop for OutboxRestoreGuard<'_> {
    fn drop(&mut self) {
        if self.outbox.len() > self.mark {
            trace!(
                removed = self.outbox.len() - self.mark,
                "removing temporary outbox entries"
            );
            self.outbox.truncate(self.mark);
        }
    }
}

/// Per-player session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    /// Nothing loaded yet.
    Unloaded,
    /// Loaded and unchanged.
    Loaded,
    /// Edited since the last load or save.
    Dirty,
    /// Written; the next edit starts from the freshly written checksums.
    Saved,
}

/// Drives one player's turn through load, edit, and save.
pub struct TurnSession {
    loader: Box<dyn TurnLoader>,
    player: PlayerId,
    state: SessionState,
    turn: Option<TurnData>,
}

impl TurnSession {
    /// Session for `player`, starting unloaded.
    pub fn new(loader: Box<dyn TurnLoader>, player: PlayerId) -> Self {
        Self {
            loader,
            player,
            state: SessionState::Unloaded,
            turn: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Player this session works for.
    pub fn player(&self) -> PlayerId {
        self.player
    }

    /// Status as reported by the loader.
    pub fn status(&self) -> TurnResult<PlayerStatus> {
        self.loader.get_player_status(self.player)
    }

    /// Load the current turn. Refused while there are unsaved edits.
    pub fn load(&mut self) -> TurnResult<&TurnData> {
        if self.state == SessionState::Dirty {
            return Err(TurnError::InvalidState(format!(
                "player {} has unsaved changes",
                self.player
            )));
        }
        let turn = self.loader.load_current_turn(self.player)?;
        self.state = SessionState::Loaded;
        Ok(self.turn.insert(turn))
    }

    /// The loaded turn, if any.
    pub fn turn(&self) -> Option<&TurnData> {
        self.turn.as_ref()
    }

    /// Mutable access to the turn; marks the session dirty.
    pub fn edit(&mut self) -> TurnResult<&mut TurnData> {
        let turn = self.turn.as_mut().ok_or_else(|| {
            TurnError::InvalidState(format!("no turn loaded for player {}", self.player))
        })?;
        self.state = SessionState::Dirty;
        Ok(turn)
    }

    /// Save the turn. The state only advances when the save succeeds.
    pub fn save(&mut self) -> TurnResult<SaveReport> {
        let turn = self.turn.as_mut().ok_or_else(|| {
            TurnError::InvalidState(format!("no turn loaded for player {}", self.player))
        })?;
        let report = self.loader.save_current_turn(turn)?;
        self.state = SessionState::Saved;
        Ok(report)
    }

    /// Return from `Saved` to `Loaded`, keeping the saved turn in memory.
    pub fn resume(&mut self) {
        if self.state == SessionState::Saved {
            self.state = SessionState::Loaded;
        }
    }

    /// Load an earlier turn from the backups. Does not change the state.
    pub fn load_history(&self, turn: i16) -> TurnResult<TurnData> {
        self.loader.load_history_turn(self.player, turn)
    }
}

/// Result of a load or save, handed to a completion callback.
///
/// The work itself runs synchronously; only the delivery is deferred to the
/// caller's choice of moment.
#[must_use]
pub struct Deferred<T> {
    result: TurnResult<T>,
}

impl<T> Deferred<T> {
    /// Run `work` now and hold its result.
    pub fn run(work: impl FnOnce() -> TurnResult<T>) -> Self {
        Self { result: work() }
    }

    /// Hand the result to `on_complete`.
    pub fn deliver(self, on_complete: impl FnOnce(TurnResult<T>)) {
        on_complete(self.result);
    }

    /// The held result.
    pub fn into_result(self) -> TurnResult<T> {
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turnkit_codec::OutboxMessage;
    use turnkit_core::PlayerSet;

    fn message(text: &str) -> OutboxMessage {
        OutboxMessage {
            sender: PlayerId::new(1).unwrap(),
            receivers: PlayerSet::HOST,
            text: text.into(),
        }
    }

    #[test]
    fn guard_truncates_on_drop() {
        let mut outbox = Outbox::new();
        outbox.push(message("keep"));
        {
            let mut guard = OutboxRestoreGuard::new(&mut outbox);
            guard.push(message("temporary"));
            guard.push(message("temporary too"));
            assert_eq!(guard.len(), 3);
            assert_eq!(guard.mark(), 1);
        }
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox.messages()[0].text, "keep");
    }

    #[test]
    fn guard_restores_on_early_return() {
        fn failing(outbox: &mut Outbox) -> TurnResult<()> {
            let mut guard = OutboxRestoreGuard::new(outbox);
            guard.push(message("temporary"));
            Err(TurnError::format("boom"))
        }
        let mut outbox = Outbox::new();
        assert!(failing(&mut outbox).is_err());
        assert!(outbox.is_empty());
    }

    #[test]
    fn deferred_delivers_result() {
        let mut seen = None;
        Deferred::run(|| Ok(41 + 1)).deliver(|result| seen = result.ok());
        assert_eq!(seen, Some(42));

        let failed: Deferred<()> = Deferred::run(|| Err(TurnError::format("bad")));
        assert!(failed.into_result().is_err());
    }

    #[test]
    fn select_loader_by_present_files() {
        let dir = tempfile::tempdir().unwrap();
        let player = PlayerId::new(2).unwrap();
        let charset = || Box::new(turnkit_core::Latin1) as Box<dyn Charset>;
        assert!(select_loader(dir.path(), player, UnpackOptions::default(), charset()).is_none());

        std::fs::write(dir.path().join("player2.rst"), b"").unwrap();
        let loader =
            select_loader(dir.path(), player, UnpackOptions::default(), charset()).unwrap();
        // A zero-length result file is not an error, just not available.
        assert!(!loader.get_player_status(player).unwrap().available);
    }
}
