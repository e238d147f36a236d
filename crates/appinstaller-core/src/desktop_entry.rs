//! Desktop entry parsing, editing and serialization.
//!
//! Entries are kept as `category -> key -> value` in insertion order, so a
//! parsed file writes back out with its groups in the order they were read.

use crate::error::{Error, NotFound, Result};
use indexmap::IndexMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Main group of every application entry.
pub const DESKTOP_ENTRY: &str = "Desktop Entry";

/// Holds keys that appear before any `[Category]` header. Written without a header.
pub const ROOT_CATEGORY: &str = "root";

type Group = IndexMap<String, String>;

/// Where a descriptor came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Source {
    /// Built in memory.
    Generated,
    /// Parsed from a file on disk.
    File(PathBuf),
}

/// In-memory desktop entry.
#[derive(Clone, Debug)]
pub struct Descriptor {
    groups: IndexMap<String, Group>,
    source: Source,
}

impl Default for Descriptor {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Descriptor {
    /// Content equality; order and source are ignored.
    fn eq(&self, other: &Self) -> bool {
        self.groups.len() == other.groups.len()
            && self.groups.iter().all(|(name, group)| {
                other.groups.get(name).is_some_and(|theirs| {
                    theirs.len() == group.len()
                        && group.iter().all(|(k, v)| theirs.get(k) == Some(v))
                })
            })
    }
}

impl Descriptor {
    /// Create an empty descriptor.
    pub fn new() -> Self {
        Self {
            groups: IndexMap::new(),
            source: Source::Generated,
        }
    }

    /// Parse descriptor text.
    ///
    /// Blank lines and `#` comments are skipped, `[Name]` opens (or reopens) a
    /// category, `KEY=VALUE` splits on the first `=`. Anything else is ignored.
    pub fn parse(text: &str) -> Self {
        let mut descriptor = Self::new();
        let mut category = ROOT_CATEGORY.to_string();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(name) = parse_header(line) {
                category = name.to_string();
                descriptor.groups.entry(category.clone()).or_default();
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                if key.is_empty() {
                    continue;
                }
                descriptor.set(&category, key, value.trim());
            }
        }

        descriptor
    }

    /// Read and parse a descriptor file, remembering its path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(Error::io("failed to read desktop file", path))?;
        let text = String::from_utf8(bytes)
            .map_err(|_| Error::validation(path.display().to_string(), "not valid UTF-8"))?;

        let mut descriptor = Self::parse(&text);
        descriptor.source = Source::File(path.to_path_buf());
        Ok(descriptor)
    }

    /// Look up `key` in `category`.
    pub fn get(&self, category: &str, key: &str) -> Result<&str> {
        let group = self
            .groups
            .get(category)
            .ok_or_else(|| NotFound::Category(category.to_string()))?;

        group.get(key).map(String::as_str).ok_or_else(|| {
            NotFound::Key {
                category: category.to_string(),
                key: key.to_string(),
            }
            .into()
        })
    }

    /// Insert or overwrite `key` in `category`, creating the category if needed.
    pub fn set(&mut self, category: &str, key: &str, value: impl Into<String>) {
        self.groups
            .entry(category.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
    }

    /// True iff every key resolves through [`Descriptor::get`].
    pub fn has_all(&self, category: &str, keys: &[&str]) -> bool {
        keys.iter().all(|key| self.get(category, key).is_ok())
    }

    /// `[Desktop Entry]` lookup returning `None` for missing or empty values.
    pub fn entry_value(&self, key: &str) -> Option<&str> {
        self.get(DESKTOP_ENTRY, key)
            .ok()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    pub fn name(&self) -> Option<&str> {
        self.entry_value("Name")
    }

    pub fn exec(&self) -> Option<&str> {
        self.entry_value("Exec")
    }

    /// First whitespace-delimited token of `Exec`.
    pub fn exec_program(&self) -> Option<&str> {
        self.exec().and_then(|exec| exec.split_whitespace().next())
    }

    pub fn icon(&self) -> Option<&str> {
        self.entry_value("Icon")
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Path this descriptor was parsed from, if any.
    pub fn source_path(&self) -> Option<&Path> {
        match &self.source {
            Source::File(path) => Some(path.as_path()),
            Source::Generated => None,
        }
    }

    /// Render as desktop entry text.
    pub fn serialize(&self) -> String {
        self.to_string()
    }

    /// Write the serialized text to `path`, replacing any existing file.
    pub fn to_file(&self, path: &Path) -> Result<()> {
        fs::write(path, self.serialize()).map_err(Error::io("failed to write desktop file", path))
    }

    /// Write a copy into `autostart_dir` named after the application.
    pub fn create_autostart(&self, autostart_dir: &Path) -> Result<PathBuf> {
        let name = self
            .get(DESKTOP_ENTRY, "Name")
            .map_err(|_| Error::validation("desktop entry", "missing Name for autostart"))?;

        fs::create_dir_all(autostart_dir)
            .map_err(Error::io("failed to create autostart directory", autostart_dir))?;

        let file_name = format!("{}.desktop", name.to_lowercase().replace(' ', "-"));
        let path = autostart_dir.join(file_name);
        self.to_file(&path)?;
        Ok(path)
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Root keys must come before any header to parse back into the root category.
        // An empty root group only survives a re-parse through its header.
        if let Some(root) = self.groups.get(ROOT_CATEGORY) {
            if root.is_empty() {
                writeln!(f, "[{ROOT_CATEGORY}]")?;
            }
            for (key, value) in root {
                writeln!(f, "{key}={value}")?;
            }
        }

        for (name, group) in self.groups.iter().filter(|(n, _)| *n != ROOT_CATEGORY) {
            writeln!(f, "[{name}]")?;
            for (key, value) in group {
                writeln!(f, "{key}={value}")?;
            }
        }
        Ok(())
    }
}

fn parse_header(line: &str) -> Option<&str> {
    let name = line.strip_prefix('[')?.strip_suffix(']')?;
    (!name.is_empty()).then_some(name)
}
