//! appinstaller-core: AppImage installation for Linux desktops.
//!
//! Provides:
//! - Desktop entry parsing, editing and serialization
//! - Bundle extraction with ordered fallback (unsquashfs, self-extraction, manual recovery)
//! - Icon lookup inside extracted bundles
//! - A registry of installed applications with list and delete
//!
//! All locations come from a [`Layout`]; there is no global state.

pub mod desktop_entry;
pub mod error;
pub mod extract;
pub mod fsutil;
pub mod icons;
pub mod install;
pub mod locate;
pub mod paths;
pub mod process;
pub mod registry;

pub use desktop_entry::{DESKTOP_ENTRY, Descriptor, Source};
pub use error::{Error, NotFound, Result, SubprocessError};
pub use extract::{ExtractStrategy, Pipeline};
pub use icons::IconResolver;
pub use install::{InstallOptions, InstallReport, Installer};
pub use paths::Layout;
pub use process::{CancelToken, RunLimits};
pub use registry::{Registry, Removed};
