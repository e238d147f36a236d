//! Applications this tool has installed.
//!
//! Nothing is cached: every call re-reads the applications directory.

use crate::desktop_entry::Descriptor;
use crate::error::{Error, NotFound, Result};
use crate::paths::Layout;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

/// What [`Registry::delete`] removed.
#[derive(Debug, Clone)]
pub struct Removed {
    pub executable: PathBuf,
    pub descriptor: PathBuf,
}

pub struct Registry<'a> {
    layout: &'a Layout,
}

impl<'a> Registry<'a> {
    pub fn new(layout: &'a Layout) -> Self {
        Self { layout }
    }

    /// Owned, valid entries in directory-listing order.
    pub fn list(&self) -> Result<Vec<Descriptor>> {
        Ok(self.scan()?.collect())
    }

    /// Remove the first owned entry named `name`: its executable, then its desktop file.
    ///
    /// Not atomic. If the second removal fails the executable is already gone.
    pub fn delete(&self, name: &str) -> Result<Removed> {
        let found = self
            .scan()?
            .find(|d| d.name() == Some(name))
            .ok_or_else(|| NotFound::Application(name.to_string()))?;

        let executable = found
            .exec_program()
            .map(PathBuf::from)
            .ok_or_else(|| Error::validation(name, "missing executable path"))?;
        let descriptor = found
            .source_path()
            .map(Path::to_path_buf)
            .ok_or_else(|| Error::validation(name, "entry has no file"))?;

        fs::remove_file(&executable).map_err(Error::io("failed to remove", &executable))?;
        fs::remove_file(&descriptor).map_err(Error::io("failed to remove", &descriptor))?;
        info!("Deleted {} ({})", name, descriptor.display());

        Ok(Removed {
            executable,
            descriptor,
        })
    }

    /// Has Name and Exec, and Exec's program exists on disk or on PATH.
    pub fn validate(&self, descriptor: &Descriptor) -> Result<()> {
        if descriptor.name().is_none() || descriptor.exec().is_none() {
            return Err(Error::validation("desktop entry", "missing basic values"));
        }

        let program = descriptor
            .exec_program()
            .ok_or_else(|| Error::validation("desktop entry", "missing executable path"))?;
        if !Path::new(program).exists() && which::which(program).is_err() {
            return Err(Error::validation(
                "desktop entry",
                format!("executable not found: {program}"),
            ));
        }
        Ok(())
    }

    /// Exec's program lives inside the install directory.
    ///
    /// Compared by path components, so a sibling such as `appImages-legacy` is not owned.
    pub fn is_owned(&self, descriptor: &Descriptor) -> bool {
        descriptor
            .exec_program()
            .is_some_and(|program| Path::new(program).starts_with(&self.layout.install_dir))
    }

    fn scan(&self) -> Result<impl Iterator<Item = Descriptor> + '_> {
        let dir = &self.layout.applications_dir;
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(Error::io("failed to read", dir))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        paths.sort();

        Ok(paths.into_iter().filter_map(move |path| {
            let descriptor = match Descriptor::from_file(&path) {
                Ok(d) => d,
                Err(e) => {
                    debug!("Skipping {}: {}", path.display(), e);
                    return None;
                }
            };
            if let Err(e) = self.validate(&descriptor) {
                debug!("Skipping {}: {}", path.display(), e);
                return None;
            }
            self.is_owned(&descriptor).then_some(descriptor)
        }))
    }
}
