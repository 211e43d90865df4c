//! Driver configuration
//!
//! Stored as TOML in the user config directory. Every field has a default,
//! so a partial file (or none at all) is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AnimError;
use crate::keymap::KeyMap;

/// Directory name used next to the executable when no directory is configured
pub const ANIMATIONS_DIR_NAME: &str = "ckb-animations";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Where animation scripts live; defaults to `ckb-animations` next to
    /// the running executable
    pub animations_dir: Option<PathBuf>,
    /// Host tick rate for `run`
    pub fps: u32,
    /// How long a script may take to answer `--ckb-info`
    pub info_timeout_ms: u64,
    /// Key positions of the animated device
    pub keymap: KeyMap,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            animations_dir: None,
            fps: 30,
            info_timeout_ms: 1000,
            keymap: KeyMap::default_layout(),
        }
    }
}

impl DriverConfig {
    /// Get default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ckb-anim")
            .join("config.toml")
    }

    /// Load config from a file, or return default if not found
    pub fn load(path: &Path) -> Result<Self, AnimError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| AnimError::Config(format!("{}: {e}", path.display())))
    }

    /// Save config to a file
    pub fn save(&self, path: &Path) -> Result<(), AnimError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AnimError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolved animations directory.
    pub fn animations_dir(&self) -> PathBuf {
        self.animations_dir
            .clone()
            .unwrap_or_else(default_animations_dir)
    }

    pub fn info_timeout(&self) -> Duration {
        Duration::from_millis(self.info_timeout_ms)
    }

    /// Interval between host ticks.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.fps.max(1)
    }
}

fn default_animations_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(ANIMATIONS_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DriverConfig::default();
        assert_eq!(config.fps, 30);
        assert_eq!(config.info_timeout(), Duration::from_secs(1));
        assert!(config.keymap.contains("esc"));
        assert!(config.animations_dir().ends_with(ANIMATIONS_DIR_NAME));
    }

    #[test]
    fn test_partial_file() {
        let config: DriverConfig = toml::from_str(
            r#"
animations_dir = "/usr/lib/ckb-animations"
fps = 60

[keymap]
esc = [0, 0]
"#,
        )
        .unwrap();
        assert_eq!(
            config.animations_dir(),
            PathBuf::from("/usr/lib/ckb-animations")
        );
        assert_eq!(config.fps, 60);
        assert_eq!(config.info_timeout_ms, 1000);
        assert_eq!(config.keymap.len(), 1);
    }

    #[test]
    fn test_frame_interval() {
        let mut config = DriverConfig::default();
        config.fps = 50;
        assert_eq!(config.frame_interval(), Duration::from_millis(20));
        config.fps = 0;
        assert_eq!(config.frame_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = DriverConfig::default();
        config.fps = 24;
        config.save(&path).unwrap();
        assert_eq!(DriverConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = DriverConfig::load(&dir.path().join("none.toml")).unwrap();
        assert_eq!(config, DriverConfig::default());
    }

    #[test]
    fn test_bad_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "fps = \"fast\"").unwrap();
        assert!(matches!(DriverConfig::load(&path), Err(AnimError::Config(_))));
    }
}
