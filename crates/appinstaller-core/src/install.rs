//! Install a bundle: copy, extract, rewrite its desktop entry, register it.

use crate::desktop_entry::{DESKTOP_ENTRY, Descriptor};
use crate::error::{Error, NotFound, Result};
use crate::extract::{self, Pipeline};
use crate::fsutil;
use crate::icons::IconResolver;
use crate::locate;
use crate::paths::Layout;
use crate::process::CancelToken;
use log::{info, warn};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Install behaviour switches.
#[derive(Clone, Debug, Default)]
pub struct InstallOptions {
    /// Also write an autostart entry.
    pub autostart: bool,
}

/// Outcome of a successful install.
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub name: Option<String>,
    pub executable: PathBuf,
    pub descriptor: PathBuf,
    /// `None` when no icon could be installed.
    pub icon: Option<PathBuf>,
    pub autostart: Option<PathBuf>,
    pub strategy: &'static str,
}

pub struct Installer<'a> {
    layout: &'a Layout,
    pipeline: Pipeline,
    options: InstallOptions,
}

impl<'a> Installer<'a> {
    /// Installer using the standard extraction strategies.
    pub fn new(layout: &'a Layout, cancel: CancelToken) -> Self {
        let pipeline = Pipeline::standard(layout, layout.run_limits(cancel));
        Self::with_pipeline(layout, pipeline)
    }

    pub fn with_pipeline(layout: &'a Layout, pipeline: Pipeline) -> Self {
        Self {
            layout,
            pipeline,
            options: InstallOptions::default(),
        }
    }

    pub fn options(mut self, options: InstallOptions) -> Self {
        self.options = options;
        self
    }

    /// Install `bundle`. The scratch area is wiped before and after, on success or failure.
    pub fn install(&self, bundle: &Path) -> Result<InstallReport> {
        let bundle = fs::canonicalize(bundle).map_err(Error::io("install", bundle))?;

        let scratch = ScratchDir::clean(&self.layout.extract_dir)?;
        let report = self.run(&bundle);
        scratch.finish()?;
        report
    }

    fn run(&self, bundle: &Path) -> Result<InstallReport> {
        extract::check_signature(bundle)?;
        self.prepare_directories()?;

        let executable = self.layout.installed_path(&installed_file_name(bundle)?);
        if executable.as_path() != bundle {
            fsutil::copy_file(bundle, &executable)?;
            info!("Copied {} to {}", bundle.display(), executable.display());
        }
        fsutil::set_mode(&executable, 0o755)?;

        let work_dir = self.layout.work_dir();
        let strategy = self.pipeline.extract(&executable, &work_dir)?;

        let source = locate::find_first(&work_dir, &[".desktop"])
            .ok_or_else(|| NotFound::Descriptor(work_dir.clone()))?;
        let mut descriptor = Descriptor::from_file(&source)?;

        rewrite_exec(&mut descriptor, &executable);

        let resolver = IconResolver::new(&self.layout.icon_dir);
        let icon = match resolver.install(&mut descriptor, &work_dir) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Installing without icon: {}", e);
                None
            }
        };

        let entry_name = source
            .file_name()
            .ok_or_else(|| Error::validation(source.display().to_string(), "no file name"))?;
        let target = self.layout.applications_dir.join(entry_name);
        descriptor.to_file(&target)?;
        info!("Registered {}", target.display());

        let autostart = if self.options.autostart {
            Some(descriptor.create_autostart(&self.layout.autostart_dir)?)
        } else {
            None
        };

        Ok(InstallReport {
            name: descriptor.name().map(str::to_string),
            executable,
            descriptor: target,
            icon,
            autostart,
            strategy,
        })
    }

    fn prepare_directories(&self) -> Result<()> {
        for dir in self
            .layout
            .target_directories()
            .into_iter()
            .chain([self.layout.extract_dir.as_path()])
        {
            fs::create_dir_all(dir).map_err(Error::io("failed to create", dir))?;
        }
        fsutil::set_mode(&self.layout.install_dir, 0o755)
    }
}

/// Bundle file name with whitespace runs turned into `-`.
///
/// Exec is split on whitespace, so a spaced name would never resolve back to the file.
fn installed_file_name(bundle: &Path) -> Result<OsString> {
    let name = bundle
        .file_name()
        .ok_or_else(|| Error::validation(bundle.display().to_string(), "no file name"))?;
    Ok(match name.to_str() {
        Some(s) if s.contains(char::is_whitespace) => {
            s.split_whitespace().collect::<Vec<_>>().join("-").into()
        }
        _ => name.to_os_string(),
    })
}

/// Point Exec (and TryExec, if set) at the installed bundle, keeping Exec's arguments.
fn rewrite_exec(descriptor: &mut Descriptor, executable: &Path) {
    let executable = executable.to_string_lossy().into_owned();
    let args: Vec<String> = descriptor
        .exec()
        .map(|exec| exec.split_whitespace().skip(1).map(str::to_string).collect())
        .unwrap_or_default();

    let exec = std::iter::once(executable.clone())
        .chain(args)
        .collect::<Vec<_>>()
        .join(" ");
    descriptor.set(DESKTOP_ENTRY, "Exec", exec);

    if descriptor.get(DESKTOP_ENTRY, "TryExec").is_ok() {
        descriptor.set(DESKTOP_ENTRY, "TryExec", executable);
    }
}

/// Scratch directory emptied on creation and removed again afterwards.
struct ScratchDir<'p> {
    path: &'p Path,
    done: bool,
}

impl<'p> ScratchDir<'p> {
    fn clean(path: &'p Path) -> Result<Self> {
        fsutil::remove_dir_all_if_exists(path)?;
        Ok(Self { path, done: false })
    }

    fn finish(mut self) -> Result<()> {
        self.done = true;
        fsutil::remove_dir_all_if_exists(self.path)
    }
}

impl Drop for ScratchDir<'_> {
    fn drop(&mut self) {
        if !self.done {
            let _ = fs::remove_dir_all(self.path);
        }
    }
}
