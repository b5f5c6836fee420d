//! Names of the per-player files in a working directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use turnkit_codec::Dialect;
use turnkit_core::{ObjectKind, PlayerId, TurnResult};

/// Every file the store reads or writes for one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkingFile {
    /// Derived, editable copy of a section.
    Dat(ObjectKind),
    /// Host-canonical copy of a section.
    Dis(ObjectKind),
    /// Visual contacts, at most the target cap.
    Targets,
    /// Visual contacts beyond the cap, stored encrypted.
    TargetOverflow,
    /// Turn header plus password tail.
    Gen,
    /// Change-tracking baseline.
    Control,
    /// Inbox messages.
    Inbox,
    /// Ship position table.
    ShipPositions,
    /// Combat recordings.
    Battles,
    /// Block-K contents.
    Kore,
    /// Block-S contents.
    Skore,
    /// Outgoing messages in the given dialect.
    Outbox(Dialect),
    /// Host command file.
    Commands,
    /// Auxiliary event stream.
    Util,
    /// The result file itself.
    Result,
}

impl WorkingFile {
    /// File name for `player`.
    pub fn name(self, player: PlayerId) -> String {
        let p = player.get();
        match self {
            WorkingFile::Dat(kind) => format!("{}{p}.dat", stem(kind)),
            WorkingFile::Dis(kind) => format!("{}{p}.dis", stem(kind)),
            WorkingFile::Targets => format!("target{p}.dat"),
            WorkingFile::TargetOverflow => format!("target{p}.ext"),
            WorkingFile::Gen => format!("gen{p}.dat"),
            WorkingFile::Control => format!("contrl{p}.dat"),
            WorkingFile::Inbox => format!("mdata{p}.dat"),
            WorkingFile::ShipPositions => format!("shipxy{p}.dat"),
            WorkingFile::Battles => format!("vcr{p}.dat"),
            WorkingFile::Kore => format!("kore{p}.dat"),
            WorkingFile::Skore => format!("skore{p}.dat"),
            WorkingFile::Outbox(Dialect::FormatA) => format!("mess{p}.dat"),
            WorkingFile::Outbox(Dialect::FormatB) => format!("mess35{p}.dat"),
            WorkingFile::Commands => format!("cmd{p}.txt"),
            WorkingFile::Util => format!("util{p}.dat"),
            WorkingFile::Result => format!("player{p}.rst"),
        }
    }

    /// Full path inside `dir`.
    pub fn path(self, dir: &Path, player: PlayerId) -> PathBuf {
        dir.join(self.name(player))
    }
}

fn stem(kind: ObjectKind) -> &'static str {
    match kind {
        ObjectKind::Ship => "ship",
        ObjectKind::Planet => "pdata",
        ObjectKind::Base => "bdata",
    }
}

/// The outbox dialect other than `dialect`.
pub(crate) fn sibling(dialect: Dialect) -> Dialect {
    match dialect {
        Dialect::FormatA => Dialect::FormatB,
        Dialect::FormatB => Dialect::FormatA,
    }
}

/// Read a file that may legitimately be missing.
pub(crate) fn read_optional(path: &Path) -> TurnResult<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(data) => Ok(Some(data)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Delete a file if it exists.
pub(crate) fn remove_if_exists(path: &Path) -> TurnResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed stale file");
            Ok(true)
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}
