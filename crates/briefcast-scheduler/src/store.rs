//! File-based schedule persistence — entries saved as JSON on mutation,
//! loaded at startup. Human-readable and cheap: no writes on ticks.

use std::path::{Path, PathBuf};

use crate::registry::ScheduleEntry;

pub struct ScheduleStore {
    path: PathBuf,
}

impl ScheduleStore {
    /// Create a store rooted at the given directory.
    pub fn new(dir: &Path) -> Self {
        std::fs::create_dir_all(dir).ok();
        Self {
            path: dir.to_path_buf(),
        }
    }

    /// Default store path (~/.briefcast).
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".briefcast")
    }

    fn file(&self) -> PathBuf {
        self.path.join("schedules.json")
    }

    /// Save all entries to disk.
    pub fn save(&self, entries: &[&ScheduleEntry]) -> Result<(), String> {
        let json =
            serde_json::to_string_pretty(entries).map_err(|e| format!("Serialize error: {e}"))?;
        std::fs::write(self.file(), &json).map_err(|e| format!("Write error: {e}"))?;
        tracing::debug!("Saved {} schedule entries to {}", entries.len(), self.file().display());
        Ok(())
    }

    /// Load entries from disk. Missing or unreadable files yield an
    /// empty set rather than an error.
    pub fn load(&self) -> Vec<ScheduleEntry> {
        let file = self.file();
        if !file.exists() {
            return Vec::new();
        }
        match std::fs::read_to_string(&file) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse schedules.json: {e}");
                Vec::new()
            }),
            Err(e) => {
                tracing::warn!("Failed to read schedules.json: {e}");
                Vec::new()
            }
        }
    }
}
