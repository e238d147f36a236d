//! Checks run before touching system directories.

use appinstaller_core::process::{self, RunLimits};
use appinstaller_core::{Error, Layout, Result};
use log::debug;
use std::fs;
use std::path::PathBuf;
use std::process::Command;

/// Shared library an AppImage runtime needs on the host.
pub struct LibraryRequirement {
    pub lib: &'static str,
    pub package: &'static str,
    pub description: &'static str,
}

pub const REQUIRED_LIBRARIES: &[LibraryRequirement] = &[
    LibraryRequirement {
        lib: "libfuse.so.2",
        package: "libfuse2",
        description: "FUSE library",
    },
    LibraryRequirement {
        lib: "libz.so.1",
        package: "zlib1g",
        description: "zlib compression library",
    },
];

const PROBE_FILE: &str = ".write_test";

/// Every target directory exists (or can be created) and accepts new files.
pub fn check_privileges(layout: &Layout) -> Result<()> {
    for dir in layout.target_directories() {
        let denied = || {
            Error::validation(
                "privileges",
                format!(
                    "cannot write to {}. This application requires superuser privileges. \
                     Please run with sudo: sudo appinstaller [options]",
                    dir.display()
                ),
            )
        };

        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|_| denied())?;
            continue;
        }

        let probe = dir.join(PROBE_FILE);
        fs::File::create(&probe).map_err(|_| denied())?;
        let _ = fs::remove_file(&probe);
    }
    Ok(())
}

/// The host's linker cache lists every required library.
pub fn check_libraries(limits: &RunLimits) -> Result<()> {
    let ldconfig = which::which("ldconfig").unwrap_or_else(|_| PathBuf::from("/sbin/ldconfig"));
    let mut cmd = Command::new(ldconfig);
    cmd.arg("-p");

    let (status, catalog) = process::run_with_input(cmd, String::new(), limits)?;
    if !status.success() {
        return Err(Error::validation(
            "shared libraries",
            format!("failed to check libraries: ldconfig exited with {status}"),
        ));
    }

    match missing_library(&catalog) {
        Some(dep) => Err(Error::validation(
            "shared libraries",
            format!(
                "{} ({}) is missing. Please install it using:\nsudo apt-get install {}",
                dep.description, dep.lib, dep.package
            ),
        )),
        None => {
            debug!("All required libraries present");
            Ok(())
        }
    }
}

fn missing_library(catalog: &str) -> Option<&'static LibraryRequirement> {
    REQUIRED_LIBRARIES
        .iter()
        .find(|dep| !catalog.contains(dep.lib))
}
