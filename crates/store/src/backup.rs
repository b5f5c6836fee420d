//! Result-file backups.
//!
//! A template such as `backup/player{player}.{turn}` names the copy; both
//! placeholders are optional. Relative templates resolve against the
//! working directory.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::info;
use turnkit_core::{PlayerId, TurnResult};

/// Expand a backup template for one player and turn.
pub fn backup_path(dir: &Path, template: &str, player: PlayerId, turn: i16) -> PathBuf {
    let name = template
        .replace("{player}", &player.get().to_string())
        .replace("{turn}", &turn.to_string());
    dir.join(name)
}

/// Copy the whole of `reader` to the expanded template.
///
/// The reader is rewound before and after copying.
pub fn write_backup<R: Read + Seek>(
    reader: &mut R,
    dir: &Path,
    template: &str,
    player: PlayerId,
    turn: i16,
) -> TurnResult<PathBuf> {
    let path = backup_path(dir, template, player, turn);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    reader.seek(SeekFrom::Start(0))?;
    let mut file = File::create(&path)?;
    let copied = io::copy(reader, &mut file)?;
    reader.seek(SeekFrom::Start(0))?;
    info!(path = %path.display(), bytes = copied, "result backed up");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn template_expansion() {
        let player = PlayerId::new(4).unwrap();
        let path = backup_path(Path::new("/game"), "history/player{player}.{turn}", player, 12);
        assert_eq!(path, PathBuf::from("/game/history/player4.12"));
    }

    #[test]
    fn backup_copies_everything_and_rewinds() {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = Cursor::new(vec![1u8, 2, 3, 4, 5]);
        reader.set_position(3);
        let path = write_backup(
            &mut reader,
            dir.path(),
            "bak/{player}-{turn}.rst",
            PlayerId::new(1).unwrap(),
            3,
        )
        .unwrap();
        assert_eq!(fs::read(path).unwrap(), vec![1, 2, 3, 4, 5]);
        assert_eq!(reader.position(), 0);
    }
}
