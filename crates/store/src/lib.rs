#![warn(missing_docs)]

//! Working-directory persistence: unpacking result files, loading and saving
//! a player's turn, and the change tracking between the two.

mod backup;
mod commands;
mod control;
mod files;
mod loader;
mod options;
mod turn;
mod unpack;

pub use backup::{backup_path, write_backup};
pub use commands::CommandList;
pub use control::ChangeTracker;
pub use files::WorkingFile;
pub use loader::{
    select_loader, Deferred, DirectoryTurnLoader, OutboxRestoreGuard, ResultTurnLoader,
    SessionState, TurnLoader, TurnSession,
};
pub use options::{ChecksumMode, UnpackOptions};
pub use turn::{ObjectEntry, ObjectRef, PlayerStatus, SaveReport, TurnData};
pub use unpack::{read_result_header, ResultContents, UnpackReport, Unpacker};
