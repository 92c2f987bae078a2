//! Theme cache backed by a JSON file in the cache directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use controller_app::views::{ThemeCacheError, THEME_CACHE_KEY};
use controller_app::{Theme, ThemeCache};

/// Stores the last applied theme as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileThemeCache {
    path: PathBuf,
}

impl FileThemeCache {
    /// Cache inside `dir`. The directory is created on first store.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{THEME_CACHE_KEY}.json")),
        }
    }

    /// File the theme is written to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ThemeCache for FileThemeCache {
    fn load(&self) -> Result<Option<Theme>, ThemeCacheError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(ThemeCacheError::Io(error.to_string())),
        }
    }

    fn store(&mut self, theme: &Theme) -> Result<(), ThemeCacheError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ThemeCacheError::Io(e.to_string()))?;
        }
        let raw = serde_json::to_string_pretty(theme)?;
        std::fs::write(&self.path, raw).map_err(|e| ThemeCacheError::Io(e.to_string()))
    }
}
