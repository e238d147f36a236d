//! Icon lookup inside an extracted bundle and install into the shared icon directory.

use crate::desktop_entry::{DESKTOP_ENTRY, Descriptor};
use crate::error::{NotFound, Result};
use crate::fsutil;
use crate::locate;
use log::{debug, trace};
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

/// Image types an icon may have, in lookup order.
pub const ICON_EXTENSIONS: [&str; 4] = ["png", "svg", "xpm", "ico"];

const ICONS_SUBDIR: &str = "usr/share/icons";
const PIXMAPS_SUBDIR: &str = "usr/share/pixmaps";
const DIR_ICON: &str = ".DirIcon";

/// Finds a bundle's icon and copies it into `icon_dir`.
pub struct IconResolver<'a> {
    icon_dir: &'a Path,
}

impl<'a> IconResolver<'a> {
    pub fn new(icon_dir: &'a Path) -> Self {
        Self { icon_dir }
    }

    /// Resolve, copy and point the descriptor's `Icon` at the copy.
    pub fn install(&self, descriptor: &mut Descriptor, extract_root: &Path) -> Result<PathBuf> {
        let (candidate, paths) = match descriptor.icon() {
            Some(icon) => {
                let candidate = PathBuf::from(icon);
                let paths = candidate_paths(&candidate, extract_root);
                (candidate, paths)
            }
            // A discovered icon already exists, so it is the only path to try.
            None => {
                let found = discover(extract_root).ok_or_else(|| {
                    NotFound::Icon("no icon found in desktop file or directory".to_string())
                })?;
                (found.clone(), vec![found])
            }
        };
        debug!("Icon candidate: {}", candidate.display());

        let app = descriptor
            .name()
            .map(|name| name.to_lowercase().replace(' ', "-"))
            .unwrap_or_else(|| "appimage".to_string());

        let mut last_error = None;
        for path in paths {
            if !path.is_file() {
                trace!("No icon at {}", path.display());
                continue;
            }

            let target = self.icon_dir.join(installed_name(&candidate, &path, &app));
            match fsutil::copy_file(&path, &target) {
                Ok(installed) => {
                    descriptor.set(DESKTOP_ENTRY, "Icon", installed.to_string_lossy());
                    return Ok(installed);
                }
                Err(e) => {
                    debug!("Icon copy from {} failed: {}", path.display(), e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            NotFound::Icon(format!("failed to find or copy icon {}", candidate.display())).into()
        }))
    }
}

/// File name of the copy in the shared icon directory.
///
/// Named after the candidate, not the resolved file, so two bundles that both fall
/// back to `.DirIcon` do not overwrite each other. A bare candidate takes the
/// resolved file's extension; a discovered `.DirIcon` is named after the application.
fn installed_name(candidate: &Path, resolved: &Path, app: &str) -> OsString {
    let mut name = match candidate.file_name() {
        Some(base) if base != DIR_ICON => base.to_os_string(),
        _ => OsString::from(app),
    };
    if let Some(ext) = resolved.extension() {
        if Path::new(&name).extension() != Some(ext) {
            name.push(".");
            name.push(ext);
        }
    }
    name
}

/// First image in directory-priority order, else anywhere in the tree.
fn discover(root: &Path) -> Option<PathBuf> {
    let priority = [
        root.join(ICONS_SUBDIR),
        root.join(PIXMAPS_SUBDIR),
        root.join(DIR_ICON),
        root.to_path_buf(),
    ];

    for location in &priority {
        if location.is_dir() {
            if let Some(first) = locate::find_all(location, &ICON_EXTENSIONS).into_iter().next() {
                return Some(first);
            }
        } else if location.is_file() {
            return Some(location.clone());
        }
    }

    locate::find_all(root, &ICON_EXTENSIONS).into_iter().next()
}

/// Every path to try for a declared `candidate`, most specific first.
///
/// Relative candidates are only ever looked up inside the bundle; the host
/// filesystem is consulted last, and only for absolute ones.
fn candidate_paths(candidate: &Path, root: &Path) -> Vec<PathBuf> {
    let name = candidate.file_name().map(PathBuf::from).unwrap_or_default();
    let mut bases = vec![root.join(strip_root(candidate))];
    bases.extend([
        root.join(&name),
        root.join(ICONS_SUBDIR).join(&name),
        root.join(PIXMAPS_SUBDIR).join(&name),
        root.join(DIR_ICON),
    ]);
    bases.dedup();

    if candidate.is_absolute() {
        bases.push(candidate.to_path_buf());
        return bases;
    }

    let mut paths = Vec::new();
    for base in &bases {
        paths.push(base.clone());
        for ext in ICON_EXTENSIONS {
            paths.push(with_appended_extension(base, ext));
        }
    }

    // Themed icons usually sit deeper, e.g. usr/share/icons/hicolor/256x256/apps/<name>.png.
    let stem = candidate.to_string_lossy();
    paths.extend(
        locate::find_all(root, &ICON_EXTENSIONS)
            .into_iter()
            .filter(|p| p.file_stem().is_some_and(|s| s.to_string_lossy() == stem)),
    );
    paths
}

fn strip_root(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
        .collect()
}

fn with_appended_extension(path: &Path, ext: &str) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".");
    os.push(ext);
    PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct Fixture {
        _dir: tempfile::TempDir,
        root: PathBuf,
        icon_dir: PathBuf,
    }

    fn fixture(files: &[&str]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("squashfs-root");
        let icon_dir = dir.path().join("pixmaps");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(&icon_dir).unwrap();
        for file in files {
            let path = root.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, file.as_bytes()).unwrap();
        }
        Fixture {
            _dir: dir,
            root,
            icon_dir,
        }
    }

    fn entry(icon: Option<&str>) -> Descriptor {
        let mut d = Descriptor::new();
        d.set(DESKTOP_ENTRY, "Name", "App");
        if let Some(icon) = icon {
            d.set(DESKTOP_ENTRY, "Icon", icon);
        }
        d
    }

    #[test]
    fn test_bare_name_gets_extension_appended() {
        let fx = fixture(&["usr/share/icons/app.png"]);
        let mut d = entry(Some("app"));

        let installed = IconResolver::new(&fx.icon_dir).install(&mut d, &fx.root).unwrap();
        assert_eq!(installed, fx.icon_dir.join("app.png"));
        assert_eq!(d.icon(), Some(installed.to_str().unwrap()));
        assert_eq!(fs::read(&installed).unwrap(), b"usr/share/icons/app.png");
    }

    #[test]
    fn test_root_location_wins_over_pixmaps() {
        let fx = fixture(&["app.svg", "usr/share/pixmaps/app.png"]);
        let mut d = entry(Some("app"));

        let installed = IconResolver::new(&fx.icon_dir).install(&mut d, &fx.root).unwrap();
        assert_eq!(installed, fx.icon_dir.join("app.svg"));
    }

    #[test]
    fn test_themed_icon_found_by_stem() {
        let fx = fixture(&["usr/share/icons/hicolor/256x256/apps/app.png"]);
        let mut d = entry(Some("app"));

        let installed = IconResolver::new(&fx.icon_dir).install(&mut d, &fx.root).unwrap();
        assert_eq!(installed, fx.icon_dir.join("app.png"));
    }

    #[test]
    fn test_absolute_icon_is_looked_up_inside_bundle() {
        let fx = fixture(&["opt/app/logo.png"]);
        let mut d = entry(Some("/opt/app/logo.png"));

        let installed = IconResolver::new(&fx.icon_dir).install(&mut d, &fx.root).unwrap();
        assert_eq!(installed, fx.icon_dir.join("logo.png"));
        assert_eq!(fs::read(&installed).unwrap(), b"opt/app/logo.png");
    }

    #[test]
    fn test_absolute_icon_falls_back_to_pixmaps_by_name() {
        let fx = fixture(&["usr/share/pixmaps/logo.xpm"]);
        let mut d = entry(Some("/somewhere/else/logo.xpm"));

        let installed = IconResolver::new(&fx.icon_dir).install(&mut d, &fx.root).unwrap();
        assert_eq!(installed, fx.icon_dir.join("logo.xpm"));
    }

    #[test]
    fn test_missing_icon_key_uses_priority_dirs() {
        let fx = fixture(&["zzz.png", "usr/share/pixmaps/b.png", "usr/share/icons/a.svg"]);
        let mut d = entry(None);

        let installed = IconResolver::new(&fx.icon_dir).install(&mut d, &fx.root).unwrap();
        assert_eq!(installed, fx.icon_dir.join("a.svg"));
    }

    #[test]
    fn test_dir_icon_used_when_no_images() {
        let fx = fixture(&[".DirIcon", "AppRun"]);
        let mut d = entry(None);

        let installed = IconResolver::new(&fx.icon_dir).install(&mut d, &fx.root).unwrap();
        assert_eq!(installed, fx.icon_dir.join("app"));
        assert_eq!(fs::read(&installed).unwrap(), b".DirIcon");
    }

    #[test]
    fn test_dir_icon_fallbacks_do_not_share_a_file() {
        let alpha = fixture(&[".DirIcon"]);
        let beta = fixture(&[".DirIcon"]);
        let icon_dir = alpha.icon_dir.clone();

        let mut a = entry(Some("alpha"));
        let mut b = entry(Some("beta"));
        let first = IconResolver::new(&icon_dir).install(&mut a, &alpha.root).unwrap();
        let second = IconResolver::new(&icon_dir).install(&mut b, &beta.root).unwrap();

        assert_eq!(first, icon_dir.join("alpha"));
        assert_eq!(second, icon_dir.join("beta"));
        assert!(first.is_file());
        assert!(!icon_dir.join(".DirIcon").exists());
    }

    #[test]
    fn test_discovered_themed_icon_beats_dir_icon() {
        let fx = fixture(&[".DirIcon", "usr/share/icons/hicolor/48x48/apps/app.png"]);
        let mut d = entry(None);

        let installed = IconResolver::new(&fx.icon_dir).install(&mut d, &fx.root).unwrap();
        assert_eq!(installed, fx.icon_dir.join("app.png"));
        assert_eq!(
            fs::read(&installed).unwrap(),
            b"usr/share/icons/hicolor/48x48/apps/app.png"
        );
    }

    #[test]
    fn test_relative_icon_path_is_joined_to_root() {
        let fx = fixture(&["share/app.png"]);
        let mut d = entry(Some("share/app.png"));

        let installed = IconResolver::new(&fx.icon_dir).install(&mut d, &fx.root).unwrap();
        assert_eq!(installed, fx.icon_dir.join("app.png"));
        assert_eq!(fs::read(&installed).unwrap(), b"share/app.png");
    }

    #[test]
    fn test_relative_candidates_stay_inside_bundle() {
        let fx = fixture(&["usr/share/icons/hicolor/256x256/apps/local.png"]);

        for icon in ["local", "share/local.png"] {
            let paths = candidate_paths(Path::new(icon), &fx.root);
            assert!(paths.iter().all(|p| p.starts_with(&fx.root)), "{icon}: {paths:?}");
        }
        let paths = candidate_paths(Path::new("local"), &fx.root);
        assert_eq!(
            paths.last(),
            Some(&fx.root.join("usr/share/icons/hicolor/256x256/apps/local.png"))
        );
    }

    #[test]
    fn test_installed_name_keeps_reverse_dns_names() {
        let root = Path::new("/r");
        assert_eq!(
            installed_name(Path::new("org.app.Foo"), &root.join("org.app.Foo.svg"), "foo"),
            OsString::from("org.app.Foo.svg")
        );
        assert_eq!(
            installed_name(Path::new("logo.png"), &root.join("logo.png"), "foo"),
            OsString::from("logo.png")
        );
        assert_eq!(
            installed_name(&root.join(".DirIcon"), &root.join(".DirIcon"), "foo"),
            OsString::from("foo")
        );
    }

    #[test]
    fn test_absolute_candidate_tries_host_path_last() {
        let fx = fixture(&[]);
        let paths = candidate_paths(Path::new("/opt/app/logo.png"), &fx.root);
        assert_eq!(paths.first(), Some(&fx.root.join("opt/app/logo.png")));
        assert_eq!(paths.last(), Some(&PathBuf::from("/opt/app/logo.png")));
    }

    #[test]
    fn test_nothing_found_is_not_found_and_descriptor_untouched() {
        let fx = fixture(&["AppRun"]);

        let mut d = entry(None);
        let err = IconResolver::new(&fx.icon_dir).install(&mut d, &fx.root).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(d.icon(), None);

        let mut d = entry(Some("appinstaller-missing-icon"));
        let err = IconResolver::new(&fx.icon_dir).install(&mut d, &fx.root).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(d.icon(), Some("appinstaller-missing-icon"));
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_failure_moves_on_to_next_candidate() {
        let fx = fixture(&["app.png", "usr/share/icons/app.svg"]);
        // Copying onto a link into a missing directory fails.
        std::os::unix::fs::symlink(
            fx.root.join("missing-dir/app.png"),
            fx.icon_dir.join("app.png"),
        )
        .unwrap();
        let mut d = entry(Some("app"));

        let installed = IconResolver::new(&fx.icon_dir).install(&mut d, &fx.root).unwrap();
        assert_eq!(installed, fx.icon_dir.join("app.svg"));
    }
}
