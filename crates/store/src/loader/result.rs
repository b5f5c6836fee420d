//! Loader that starts from a result file.

use std::fs::File;
use std::io;
use std::path::PathBuf;

use tracing::debug;
use turnkit_codec::GenFile;
use turnkit_core::{Charset, PlayerId, TurnResult};

use super::{DirectoryTurnLoader, TurnLoader};
use crate::files::{read_optional, WorkingFile};
use crate::options::UnpackOptions;
use crate::turn::{PlayerStatus, SaveReport, TurnData};
use crate::unpack::{read_result_header, UnpackReport, Unpacker};

/// Unpacks `player{p}.rst` into the directory, then works like
/// [`DirectoryTurnLoader`].
pub struct ResultTurnLoader {
    directory: DirectoryTurnLoader,
}

impl ResultTurnLoader {
    /// Loader that unpacks `player{p}.rst` found in `dir`.
    pub fn new(dir: impl Into<PathBuf>, options: UnpackOptions, charset: Box<dyn Charset>) -> Self {
        Self {
            directory: DirectoryTurnLoader::new(dir, options, charset),
        }
    }

    /// Unpack the result file of `player` into the working directory.
    pub fn unpack(&self, player: PlayerId) -> TurnResult<UnpackReport> {
        let dir = self.directory.dir();
        let mut file = File::open(WorkingFile::Result.path(dir, player))?;
        Unpacker::new(
            dir,
            self.directory.options().clone(),
            self.directory.charset(),
        )
        .unpack(&mut file, player)
    }

    /// True when the working directory holds no turn for `player`, or an
    /// older one than the result file.
    fn needs_unpack(&self, player: PlayerId) -> TurnResult<bool> {
        let dir = self.directory.dir();
        let gen = match read_optional(&WorkingFile::Gen.path(dir, player))? {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Ok(true),
        };
        let working_turn = match GenFile::decode(&gen) {
            Ok(gen) => gen.header.turn,
            Err(err) => {
                debug!(%player, error = %err, "unreadable GEN file, unpacking again");
                return Ok(true);
            }
        };
        let mut file = File::open(WorkingFile::Result.path(dir, player))?;
        let (_, header) = read_result_header(&mut file, player)?;
        Ok(working_turn < header.turn)
    }
}

impl TurnLoader for ResultTurnLoader {
    fn get_player_status(&self, player: PlayerId) -> TurnResult<PlayerStatus> {
        let dir = self.directory.dir();
        let path = WorkingFile::Result.path(dir, player);
        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(PlayerStatus::UNAVAILABLE)
            }
            Err(err) => return Err(err.into()),
        };
        if file.metadata()?.len() == 0 {
            debug!(%player, "zero-length result file");
            return Ok(PlayerStatus::UNAVAILABLE);
        }
        let (playable, turn, dialect) = match read_result_header(&mut file, player) {
            Ok((table, header)) => (true, Some(header.turn), Some(table.dialect())),
            Err(err) => {
                debug!(%player, error = %err, "result file not playable");
                (false, None, None)
            }
        };
        Ok(PlayerStatus {
            available: true,
            playable,
            primary: WorkingFile::Gen.path(dir, player).exists(),
            turn,
            dialect,
        })
    }

    fn load_current_turn(&mut self, player: PlayerId) -> TurnResult<TurnData> {
        if self.needs_unpack(player)? {
            self.unpack(player)?;
        } else {
            debug!(%player, "working directory is current, skipping unpack");
        }
        self.directory.load_current_turn(player)
    }

    fn save_current_turn(&mut self, turn: &mut TurnData) -> TurnResult<SaveReport> {
        if !WorkingFile::Gen.path(self.directory.dir(), turn.player).exists() {
            self.unpack(turn.player)?;
        }
        self.directory.save_current_turn(turn)
    }

    fn load_history_turn(&self, player: PlayerId, turn: i16) -> TurnResult<TurnData> {
        self.directory.load_history_turn(player, turn)
    }
}
