//! Persist quota usage to disk (JSON under XDG state dir) so a restart does not
//! forget units already spent today.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::{QuotaState, QuotaTracker};

impl QuotaTracker {
    /// Default path for the quota file: `~/.local/state/ytq/quota.json`.
    pub fn default_path() -> Result<PathBuf> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("ytq")?;
        Ok(xdg_dirs.get_state_home().join("quota.json"))
    }

    /// Save the current window to the given path (creates parent dir if needed).
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let snapshot = self.current_window();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir: {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&snapshot).context("serialize quota state")?;
        std::fs::write(path, json).with_context(|| format!("write quota state: {}", path.display()))?;
        Ok(())
    }

    /// Restore usage saved by `save_to_path`. Returns false if the file is missing
    /// or belongs to another day. Limits are never read from the file, so config
    /// always wins.
    pub fn load_from_path(&self, path: &Path) -> Result<bool> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                return Err(e).with_context(|| format!("read quota state: {}", path.display()))
            }
        };
        let saved: QuotaState = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse quota state: {}", path.display()))?;

        let mut state = self.current();
        if saved.window_start != state.window_start {
            return Ok(false);
        }
        state.used_units = state.used_units.max(saved.used_units);
        Ok(true)
    }
}
