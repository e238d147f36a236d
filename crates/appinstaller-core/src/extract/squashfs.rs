//! Extraction through a host squashfs tool.

use super::ExtractStrategy;
use crate::error::{Error, Result};
use crate::process::{self, RunLimits};
use memchr::memmem;
use std::fs;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::Command;

/// How far into the bundle to look for the squashfs superblock.
pub const SQUASHFS_SCAN_LEN: u64 = 100_000;

const SQUASHFS_MAGIC: &[u8] = b"hsqs";

/// Carves the embedded squashfs image out of the bundle and runs `unsquashfs` on it.
pub struct SquashfsStrategy {
    tool: String,
    scratch_dir: PathBuf,
    limits: RunLimits,
}

impl SquashfsStrategy {
    pub fn new(tool: String, scratch_dir: PathBuf, limits: RunLimits) -> Self {
        Self {
            tool,
            scratch_dir,
            limits,
        }
    }
}

impl ExtractStrategy for SquashfsStrategy {
    fn name(&self) -> &'static str {
        "unsquashfs"
    }

    fn extract(&self, bundle: &Path, work_dir: &Path) -> Result<()> {
        let tool = which::which(&self.tool).map_err(|e| {
            Error::validation("squashfs tool", format!("{} not found: {}", self.tool, e))
        })?;

        let offset = find_squashfs_offset(bundle)?;
        let file_name = bundle
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "bundle".to_string());
        let carve = Carve::create(
            bundle,
            offset,
            self.scratch_dir.join(format!("{file_name}.squashfs")),
        )?;

        let mut cmd = Command::new(tool);
        cmd.arg("-f").arg("-d").arg(work_dir).arg(carve.path());
        process::run_checked(cmd, &self.limits)
    }
}

/// Byte offset of the squashfs superblock within the bundle header region.
pub fn find_squashfs_offset(bundle: &Path) -> Result<u64> {
    let file = fs::File::open(bundle).map_err(Error::io("failed to open", bundle))?;
    let mut head = Vec::new();
    file.take(SQUASHFS_SCAN_LEN)
        .read_to_end(&mut head)
        .map_err(Error::io("failed to read", bundle))?;

    memmem::find(&head, SQUASHFS_MAGIC)
        .map(|offset| offset as u64)
        .ok_or_else(|| Error::validation(bundle.display().to_string(), "no squashfs offset found"))
}

/// Temporary copy of `bundle[offset..]`, deleted on drop.
struct Carve {
    path: PathBuf,
}

impl Carve {
    fn create(bundle: &Path, offset: u64, path: PathBuf) -> Result<Self> {
        let mut src = fs::File::open(bundle).map_err(Error::io("failed to open", bundle))?;
        src.seek(SeekFrom::Start(offset))
            .map_err(Error::io("failed to seek", bundle))?;

        let carve = Self { path };
        let mut dst =
            fs::File::create(&carve.path).map_err(Error::io("failed to create", &carve.path))?;
        io::copy(&mut src, &mut dst)
            .map_err(Error::io("failed to extract squashfs part to", &carve.path))?;
        Ok(carve)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Carve {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_is_first_signature() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("b");
        let mut bytes = vec![0u8; 1234];
        bytes.extend_from_slice(b"hsqs-rest-hsqs");
        fs::write(&bundle, &bytes).unwrap();

        assert_eq!(find_squashfs_offset(&bundle).unwrap(), 1234);
    }

    #[test]
    fn test_signature_past_scan_window_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("b");
        let mut bytes = vec![0u8; SQUASHFS_SCAN_LEN as usize];
        bytes.extend_from_slice(b"hsqs");
        fs::write(&bundle, &bytes).unwrap();

        assert!(find_squashfs_offset(&bundle).is_err());
    }

    #[test]
    fn test_carve_copies_tail_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("b");
        fs::write(&bundle, b"headerhsqsimage").unwrap();
        let carve_path = dir.path().join("b.squashfs");

        {
            let carve = Carve::create(&bundle, 6, carve_path.clone()).unwrap();
            assert_eq!(fs::read(carve.path()).unwrap(), b"hsqsimage");
        }
        assert!(!carve_path.exists());
    }

    #[test]
    fn test_missing_tool_fails_strategy() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("b");
        fs::write(&bundle, b"\x7fELFhsqs").unwrap();

        let strategy = SquashfsStrategy::new(
            "appinstaller-no-such-unsquashfs".into(),
            dir.path().to_path_buf(),
            RunLimits::default(),
        );
        let err = strategy.extract(&bundle, &dir.path().join("work")).unwrap_err();
        assert!(err.to_string().contains("appinstaller-no-such-unsquashfs"));
    }
}
