use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::warn;
use turnkit_core::{Ascii, Charset, Latin1};
use turnkit_store::UnpackOptions;

pub const DEFAULT_CONFIG_PATH: &str = "turnkit.toml";

/// Character set of the game's text fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CharsetChoice {
    #[default]
    Latin1,
    Ascii,
}

impl CharsetChoice {
    pub fn charset(self) -> Box<dyn Charset> {
        match self {
            CharsetChoice::Latin1 => Box::new(Latin1),
            CharsetChoice::Ascii => Box::new(Ascii),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub charset: CharsetChoice,
    /// Checksum mode, target cap, fix-ups, and backups.
    pub unpack: UnpackOptions,
}

impl AppConfig {
    /// Load configuration from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<AppConfig>(&contents) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    AppConfig::default()
                }
            },
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound
                    || path != Path::new(DEFAULT_CONFIG_PATH)
                {
                    warn!("Failed to read {}: {err}. Using defaults", path.display());
                }
                AppConfig::default()
            }
        }
    }

    /// Save configuration to an explicit path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let toml = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turnkit_store::ChecksumMode;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AppConfig::load_from_path(&dir.path().join("absent.toml"));
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/turnkit.toml");
        let mut cfg = AppConfig {
            charset: CharsetChoice::Ascii,
            ..AppConfig::default()
        };
        cfg.unpack.checksum_mode = ChecksumMode::Lenient;
        cfg.unpack.backup_template = Some("backup/player{player}.{turn}".into());
        cfg.save_to_path(&path).unwrap();
        assert_eq!(AppConfig::load_from_path(&path), cfg);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("turnkit.toml");
        fs::write(&path, "[unpack]\ntarget_cap = 20\n").unwrap();
        let cfg = AppConfig::load_from_path(&path);
        assert_eq!(cfg.unpack.target_cap, 20);
        assert_eq!(cfg.charset, CharsetChoice::Latin1);
        assert!(cfg.unpack.fix_warp);
    }

    #[test]
    fn garbage_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("turnkit.toml");
        fs::write(&path, "charset = 7").unwrap();
        assert_eq!(AppConfig::load_from_path(&path), AppConfig::default());
    }
}
