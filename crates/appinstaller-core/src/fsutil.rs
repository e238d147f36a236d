//! File copy and permission helpers.

use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Copy a regular file, keeping its mode and owner.
///
/// A directory destination receives the file under its own base name.
/// Returns the path written.
pub fn copy_file(src: &Path, dst: &Path) -> Result<PathBuf> {
    let meta = fs::metadata(src).map_err(Error::io("failed to stat", src))?;
    if !meta.is_file() {
        return Err(Error::validation(
            src.display().to_string(),
            "not a regular file",
        ));
    }

    let dst = if dst.is_dir() {
        match src.file_name() {
            Some(name) => dst.join(name),
            None => return Err(Error::validation(src.display().to_string(), "no file name")),
        }
    } else {
        dst.to_path_buf()
    };

    // fs::copy carries the permission bits over.
    fs::copy(src, &dst).map_err(Error::io("failed to copy to", &dst))?;
    copy_owner(&meta, &dst)?;
    Ok(dst)
}

#[cfg(unix)]
fn copy_owner(meta: &fs::Metadata, dst: &Path) -> Result<()> {
    use std::os::unix::fs::MetadataExt;
    std::os::unix::fs::chown(dst, Some(meta.uid()), Some(meta.gid()))
        .map_err(Error::io("failed to set owner of", dst))
}

#[cfg(not(unix))]
fn copy_owner(_meta: &fs::Metadata, _dst: &Path) -> Result<()> {
    Ok(())
}

/// Set unix permission bits.
#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(Error::io("failed to set permissions on", path))
}

#[cfg(not(unix))]
pub fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

/// Remove a directory tree; a missing directory is not an error.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
            Err(Error::io("failed to remove", path)(e))
        }
        _ => Ok(()),
    }
}
