//! Recursive file search over extracted bundle trees.
//!
//! Walks are sorted by file name so results are stable between runs.
//! Unreadable entries are skipped.

use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// First file whose base name contains any of `patterns`. Stops at the first hit.
pub fn find_first(root: &Path, patterns: &[&str]) -> Option<PathBuf> {
    walk_files(root)
        .find(|entry| {
            let name = entry.file_name().to_string_lossy();
            patterns.iter().any(|p| name.contains(p))
        })
        .map(DirEntry::into_path)
}

/// Every file whose extension matches one of `extensions`, case-insensitively.
///
/// Extensions may be given as `png` or `.png`.
pub fn find_all(root: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    let wanted: Vec<String> = extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_lowercase())
        .collect();

    walk_files(root)
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| wanted.iter().any(|w| w.eq_ignore_ascii_case(ext)))
        })
        .map(DirEntry::into_path)
        .collect()
}

/// Regular files below `root`, plus symlinks that resolve to one.
fn walk_files(root: &Path) -> impl Iterator<Item = DirEntry> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| {
            let ft = entry.file_type();
            ft.is_file() || (ft.is_symlink() && entry.path().is_file())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_find_all_matches_extensions_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.PNG", "b.svg", "c.txt"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let found = find_all(dir.path(), &["png", ".svg"]);
        assert_eq!(
            found,
            vec![dir.path().join("a.PNG"), dir.path().join("b.svg")]
        );
    }

    #[test]
    fn test_find_all_empty_when_nothing_matches() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("readme"), b"x").unwrap();
        assert!(find_all(dir.path(), &["png"]).is_empty());
        assert!(find_all(&dir.path().join("missing"), &["png"]).is_empty());
    }

    #[test]
    fn test_find_first_descends_into_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("usr/share/applications");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("AppRun"), b"x").unwrap();
        fs::write(nested.join("app.desktop"), b"[Desktop Entry]").unwrap();

        assert_eq!(
            find_first(dir.path(), &[".desktop"]),
            Some(nested.join("app.desktop"))
        );
        assert_eq!(find_first(dir.path(), &[".appdata"]), None);
    }

    #[test]
    fn test_find_first_ignores_directories_with_matching_names() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a.desktop")).unwrap();
        assert_eq!(find_first(dir.path(), &[".desktop"]), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_find_first_survives_unreadable_siblings() {
        use std::os::unix::fs::{PermissionsExt, symlink};

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("hidden.txt"), b"x").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        symlink(dir.path().join("gone"), dir.path().join("dangling.desktop")).unwrap();
        fs::write(dir.path().join("x.desktop"), b"x").unwrap();

        let found = find_first(dir.path(), &[".desktop"]);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(found, Some(dir.path().join("x.desktop")));
    }
}
