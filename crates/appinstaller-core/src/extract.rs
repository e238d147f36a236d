//! Bundle extraction.
//!
//! A [`Pipeline`] holds an ordered list of [`ExtractStrategy`] values and tries
//! them left to right until one succeeds. The working directory is emptied
//! before every attempt, so no strategy ever sees another one's leftovers.

mod manual;
mod native;
mod squashfs;

pub use manual::{DESKTOP_CAPTURE_WINDOW, MANUAL_SCAN_WINDOW, ManualStrategy};
pub use native::NativeStrategy;
pub use squashfs::{SQUASHFS_SCAN_LEN, SquashfsStrategy};

use crate::error::{Error, Result, StrategyFailure};
use crate::fsutil;
use crate::paths::Layout;
use crate::process::RunLimits;
use log::{info, warn};
use std::fs;
use std::io::Read;
use std::path::Path;

/// First four bytes of every bundle.
pub const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// One way of unpacking a bundle into a working directory.
pub trait ExtractStrategy {
    /// Short label used in logs and error summaries.
    fn name(&self) -> &'static str;

    /// Populate `work_dir` (which exists and is empty) from `bundle`.
    fn extract(&self, bundle: &Path, work_dir: &Path) -> Result<()>;
}

/// Ordered fallback over extraction strategies.
pub struct Pipeline {
    strategies: Vec<Box<dyn ExtractStrategy>>,
}

impl Pipeline {
    pub fn new(strategies: Vec<Box<dyn ExtractStrategy>>) -> Self {
        Self { strategies }
    }

    /// squashfs tool, then native self-extraction, then manual recovery.
    pub fn standard(layout: &Layout, limits: RunLimits) -> Self {
        Self::new(vec![
            Box::new(SquashfsStrategy::new(
                layout.squashfs_tool.clone(),
                layout.extract_dir.clone(),
                limits.clone(),
            )),
            Box::new(NativeStrategy::new(limits)),
            Box::new(ManualStrategy),
        ])
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Extract `bundle` into `work_dir`. Returns the name of the strategy that worked.
    pub fn extract(&self, bundle: &Path, work_dir: &Path) -> Result<&'static str> {
        check_signature(bundle)?;

        let mut attempts = Vec::new();
        for strategy in &self.strategies {
            info!("Trying extraction with {}...", strategy.name());
            reset_dir(work_dir)?;

            match strategy.extract(bundle, work_dir) {
                Ok(()) => {
                    info!("Extracted {} with {}", bundle.display(), strategy.name());
                    return Ok(strategy.name());
                }
                Err(e) => {
                    warn!("Extraction method {} failed: {}", strategy.name(), e);
                    attempts.push(StrategyFailure {
                        strategy: strategy.name(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Err(Error::Extraction {
            bundle: bundle.to_path_buf(),
            attempts,
        })
    }
}

/// Reject anything that does not start with the ELF magic.
pub fn check_signature(bundle: &Path) -> Result<()> {
    let mut file = fs::File::open(bundle).map_err(Error::io("failed to open", bundle))?;
    let mut magic = [0u8; 4];
    file.read_exact(&mut magic)
        .map_err(|_| Error::validation(bundle.display().to_string(), "file too short"))?;

    if magic != ELF_MAGIC {
        return Err(Error::validation(
            bundle.display().to_string(),
            "not a valid AppImage file (missing ELF header)",
        ));
    }
    Ok(())
}

fn reset_dir(dir: &Path) -> Result<()> {
    fsutil::remove_dir_all_if_exists(dir)?;
    fs::create_dir_all(dir).map_err(Error::io("failed to create", dir))
}
