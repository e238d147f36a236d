//! Extraction through the bundle's own `--appimage-extract` flag.

use super::ExtractStrategy;
use crate::error::{Error, Result};
use crate::paths::WORK_DIR_NAME;
use crate::process::{self, RunLimits};
use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};

pub struct NativeStrategy {
    limits: RunLimits,
}

impl NativeStrategy {
    pub fn new(limits: RunLimits) -> Self {
        Self { limits }
    }
}

impl ExtractStrategy for NativeStrategy {
    fn name(&self) -> &'static str {
        "appimage-extract"
    }

    fn extract(&self, bundle: &Path, work_dir: &Path) -> Result<()> {
        let bundle = fs::canonicalize(bundle).map_err(Error::io("failed to resolve", bundle))?;
        let cwd = work_dir
            .parent()
            .ok_or_else(|| Error::validation(work_dir.display().to_string(), "no parent directory"))?;

        // The runtime always unpacks into ./squashfs-root.
        let mut cmd = Command::new(&bundle);
        cmd.arg("--appimage-extract")
            .current_dir(cwd)
            .env("APPIMAGE_EXTRACT_AND_RUN", "1")
            .env("NO_CLEANUP", "1")
            .stdout(Stdio::null());
        process::run_checked(cmd, &self.limits)?;

        let produced = cwd.join(WORK_DIR_NAME);
        if produced != work_dir {
            let _ = fs::remove_dir_all(work_dir);
            fs::rename(&produced, work_dir).map_err(Error::io("failed to move", &produced))?;
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::fsutil::set_mode;

    #[test]
    fn test_runs_bundle_in_parent_of_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("fake.AppImage");
        fs::write(
            &bundle,
            "#!/bin/sh\n[ \"$1\" = --appimage-extract ] || exit 9\n[ \"$APPIMAGE_EXTRACT_AND_RUN\" = 1 ] || exit 8\nmkdir -p squashfs-root && touch squashfs-root/AppRun\n",
        )
        .unwrap();
        set_mode(&bundle, 0o755).unwrap();

        let work = dir.path().join(WORK_DIR_NAME);
        fs::create_dir(&work).unwrap();
        NativeStrategy::new(RunLimits::default())
            .extract(&bundle, &work)
            .unwrap();
        assert!(work.join("AppRun").exists());
    }

    #[test]
    fn test_non_zero_exit_fails() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("broken.AppImage");
        fs::write(&bundle, "#!/bin/sh\nexit 1\n").unwrap();
        set_mode(&bundle, 0o755).unwrap();

        let work = dir.path().join(WORK_DIR_NAME);
        assert!(
            NativeStrategy::new(RunLimits::default())
                .extract(&bundle, &work)
                .is_err()
        );
    }
}
