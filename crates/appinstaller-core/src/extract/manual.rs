//! Best-effort recovery when no real extractor works.
//!
//! Finds the raw `[Desktop Entry]` text inside the bundle, writes it out as a
//! desktop file and drops a copy of the bundle next to it. The rest of the
//! bundle's file tree is not recovered.
//!
//! Known limitation: the capture is a fixed window, so an entry longer than
//! [`DESKTOP_CAPTURE_WINDOW`] is truncated.

use super::ExtractStrategy;
use crate::error::{Error, Result};
use crate::fsutil;
use log::debug;
use memchr::memmem;
use std::fs;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Read size used while scanning for the entry marker.
pub const MANUAL_SCAN_WINDOW: usize = 4096;

/// Bytes captured from the marker onward.
pub const DESKTOP_CAPTURE_WINDOW: u64 = 4096;

const MARKER: &[u8] = b"[Desktop Entry]";

pub struct ManualStrategy;

impl ExtractStrategy for ManualStrategy {
    fn name(&self) -> &'static str {
        "manual"
    }

    fn extract(&self, bundle: &Path, work_dir: &Path) -> Result<()> {
        let mut file = fs::File::open(bundle).map_err(Error::io("failed to open", bundle))?;
        let offset = find_marker(&mut file)
            .map_err(Error::io("failed to read", bundle))?
            .ok_or_else(|| {
                Error::validation(bundle.display().to_string(), "no desktop entry in AppImage")
            })?;
        debug!("Found desktop entry marker at offset {}", offset);

        let text = capture_entry(&mut file, offset).map_err(Error::io("failed to read", bundle))?;

        let stem = bundle
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "bundle".to_string());
        let desktop_path = work_dir.join(format!("{stem}.desktop"));
        fs::write(&desktop_path, text).map_err(Error::io("failed to write", &desktop_path))?;

        fsutil::copy_file(bundle, work_dir)?;
        Ok(())
    }
}

/// Offset of the first marker, scanning window by window.
///
/// The tail of each window is carried into the next, so a marker split across
/// a window boundary is still found.
fn find_marker(reader: &mut impl Read) -> io::Result<Option<u64>> {
    let finder = memmem::Finder::new(MARKER);
    let mut window = vec![0u8; MANUAL_SCAN_WINDOW];
    let mut carry: Vec<u8> = Vec::new();
    let mut consumed: u64 = 0;

    loop {
        let n = reader.read(&mut window)?;
        if n == 0 {
            return Ok(None);
        }

        let base = consumed - carry.len() as u64;
        let mut haystack = std::mem::take(&mut carry);
        haystack.extend_from_slice(&window[..n]);

        if let Some(idx) = finder.find(&haystack) {
            return Ok(Some(base + idx as u64));
        }

        consumed += n as u64;
        let keep = (MARKER.len() - 1).min(haystack.len());
        carry = haystack.split_off(haystack.len() - keep);
    }
}

/// Text from `offset`, up to the capture window or the first NUL byte.
fn capture_entry<R: Read + Seek>(reader: &mut R, offset: u64) -> io::Result<String> {
    reader.seek(SeekFrom::Start(offset))?;
    let mut buf = Vec::new();
    reader.take(DESKTOP_CAPTURE_WINDOW).read_to_end(&mut buf)?;

    if let Some(end) = memchr::memchr(0, &buf) {
        buf.truncate(end);
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
