//! Filesystem layout and config file handling.

use crate::process::{CancelToken, RunLimits};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable pointing at an explicit config file.
pub const CONFIG_ENV: &str = "APPINSTALLER_CONFIG";

/// System-wide config location.
pub const SYSTEM_CONFIG: &str = "/etc/appinstaller/config.json";

/// Directory name produced by `--appimage-extract`.
pub const WORK_DIR_NAME: &str = "squashfs-root";

/// Where the installer reads and writes. Every component takes this explicitly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    /// Scratch area; the working directory lives inside it.
    pub extract_dir: PathBuf,
    /// Installed bundle copies.
    pub install_dir: PathBuf,
    /// Desktop shell application entries.
    pub applications_dir: PathBuf,
    /// Shared icon directory.
    pub icon_dir: PathBuf,
    /// Autostart entries for `install --autostart`.
    pub autostart_dir: PathBuf,
    /// squashfs extraction tool.
    pub squashfs_tool: String,
    /// Limit for each external process. `None` waits forever.
    pub subprocess_timeout_secs: Option<u64>,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            extract_dir: PathBuf::from("/tmp/appInstaller"),
            install_dir: PathBuf::from("/usr/share/appImages"),
            applications_dir: PathBuf::from("/usr/share/applications"),
            icon_dir: PathBuf::from("/usr/share/pixmaps"),
            autostart_dir: PathBuf::from("/etc/xdg/autostart"),
            squashfs_tool: "unsquashfs".to_string(),
            subprocess_timeout_secs: Some(600),
        }
    }
}

impl Layout {
    /// Layout rooted at `base`, for tests and sandboxed runs.
    pub fn rooted_at(base: &Path) -> Self {
        Self {
            extract_dir: base.join("extract"),
            install_dir: base.join("appImages"),
            applications_dir: base.join("applications"),
            icon_dir: base.join("pixmaps"),
            autostart_dir: base.join("autostart"),
            ..Self::default()
        }
    }

    /// Load from a JSON file, or return defaults if it is missing or invalid.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!("Ignoring invalid config {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Resolve the config file to use and load it.
    pub fn discover(explicit: Option<&Path>) -> Self {
        match config_candidates(explicit).into_iter().find(|p| p.exists()) {
            Some(path) => {
                debug!("Using config {}", path.display());
                Self::load(&path)
            }
            None => Self::default(),
        }
    }

    /// Save to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }

    /// Directory a single extraction attempt is materialized into.
    pub fn work_dir(&self) -> PathBuf {
        self.extract_dir.join(WORK_DIR_NAME)
    }

    /// Where a bundle named `file_name` is installed.
    pub fn installed_path(&self, file_name: &std::ffi::OsStr) -> PathBuf {
        self.install_dir.join(file_name)
    }

    /// Every directory an install writes into.
    pub fn target_directories(&self) -> [&Path; 3] {
        [&self.applications_dir, &self.icon_dir, &self.install_dir]
    }

    pub fn subprocess_timeout(&self) -> Option<Duration> {
        self.subprocess_timeout_secs.map(Duration::from_secs)
    }

    pub fn run_limits(&self, cancel: CancelToken) -> RunLimits {
        RunLimits {
            timeout: self.subprocess_timeout(),
            cancel,
        }
    }
}

fn config_candidates(explicit: Option<&Path>) -> Vec<PathBuf> {
    if let Some(path) = explicit {
        return vec![path.to_path_buf()];
    }

    let mut candidates = Vec::new();
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.is_empty() {
            candidates.push(PathBuf::from(path));
        }
    }
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("appinstaller").join("config.json"));
    }
    candidates.push(PathBuf::from(SYSTEM_CONFIG));
    candidates
}
