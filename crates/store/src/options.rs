//! Tunables for unpacking and loading.

use serde::{Deserialize, Serialize};
use tracing::warn;
use turnkit_codec::ShipFixups;
use turnkit_core::{TurnError, TurnResult};

/// What to do when a recorded checksum disagrees with the data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumMode {
    /// Abort with [`turnkit_core::TurnError::ChecksumMismatch`].
    #[default]
    Strict,
    /// Log a warning and continue with the data as-is.
    Lenient,
}

impl ChecksumMode {
    /// Compare a recorded checksum with the computed one.
    ///
    /// Returns `Ok(true)` when a mismatch was tolerated.
    pub fn check(self, section: &'static str, expected: u32, found: u32) -> TurnResult<bool> {
        if expected == found {
            return Ok(false);
        }
        match self {
            ChecksumMode::Strict => Err(TurnError::ChecksumMismatch {
                section,
                expected,
                found,
            }),
            ChecksumMode::Lenient => {
                warn!(section, expected, found, "checksum mismatch, continuing with data as-is");
                Ok(true)
            }
        }
    }
}

/// Options shared by the unpacker and the loaders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnpackOptions {
    /// How section checksum mismatches are treated.
    pub checksum_mode: ChecksumMode,
    /// Targets kept in the primary target file; the rest overflow.
    pub target_cap: usize,
    /// Clear the launcher type of ships that carry no launchers.
    pub fix_launchers: bool,
    /// Clamp out-of-range warp of damaged ships.
    pub fix_warp: bool,
    /// Where to copy result files before unpacking, relative to the working
    /// directory. `{player}` and `{turn}` are substituted.
    pub backup_template: Option<String>,
}

impl Default for UnpackOptions {
    fn default() -> Self {
        Self {
            checksum_mode: ChecksumMode::Strict,
            target_cap: 50,
            fix_launchers: true,
            fix_warp: true,
            backup_template: None,
        }
    }
}

impl UnpackOptions {
    /// Options that accept checksum mismatches.
    pub fn lenient() -> Self {
        Self {
            checksum_mode: ChecksumMode::Lenient,
            ..Self::default()
        }
    }

    /// Fix-up passes selected by these options.
    pub fn fixups(&self) -> ShipFixups {
        ShipFixups {
            launchers: self.fix_launchers,
            warp: self.fix_warp,
        }
    }
}
