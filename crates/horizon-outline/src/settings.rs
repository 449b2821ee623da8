//! Outline settings, persisted as TOML.
//!
//! Missing keys fall back to their defaults, so a partial file is valid:
//!
//! ```toml
//! undo_limit = 50
//!
//! [render]
//! grapheme_advance = 8.0
//! ```

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{OutlineError, Result};
use crate::undo::DEFAULT_UNDO_LIMIT;

/// Cell rendering settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Width of a single grapheme when wrapping cell text.
    pub grapheme_advance: f32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            grapheme_advance: 7.0,
        }
    }
}

/// Settings shared by every table of a workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlineSettings {
    /// Sort containers before leaves.
    pub group_containers_on_sort: bool,
    /// Edits kept per window.
    pub undo_limit: usize,
    /// Upper bound for automatically sized columns.
    pub maximum_auto_column_width: f32,
    /// Match filter text against names only.
    pub filter_names_only: bool,
    /// Deadline for background tasks, in milliseconds.
    pub background_timeout_ms: u64,
    pub render: RenderSettings,
}

impl Default for OutlineSettings {
    fn default() -> Self {
        Self {
            group_containers_on_sort: true,
            undo_limit: DEFAULT_UNDO_LIMIT,
            maximum_auto_column_width: 800.0,
            filter_names_only: false,
            background_timeout_ms: 10_000,
            render: RenderSettings::default(),
        }
    }
}

impl OutlineSettings {
    /// Parses settings from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Serializes settings as pretty TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Loads settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| OutlineError::file(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Loads settings, falling back to defaults if the file does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Saves settings to a TOML file.
    ///
    /// The file is written to a temporary sibling first and renamed over the
    /// target, so a failed save leaves the previous file intact.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = self.to_toml_string()?;
        let temp = temp_path_for(path);
        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&temp)?;
            file.write_all(text.as_bytes())?;
            file.sync_all()?;
            fs::rename(&temp, path)
        };
        write().map_err(|e| {
            fs::remove_file(&temp).ok();
            OutlineError::file(path, e)
        })
    }

    /// Background deadline as a [`Duration`].
    pub fn background_timeout(&self) -> Duration {
        Duration::from_millis(self.background_timeout_ms)
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new("."));
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "settings".to_string());
    parent.join(format!(".{}.tmp.{}", file_name, std::process::id()))
}

static_assertions::assert_impl_all!(OutlineSettings: Send, Sync);
