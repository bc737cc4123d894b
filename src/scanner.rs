//! Picture discovery.
//!
//! A directory is scanned once at startup.  Only regular files whose
//! extension (case-insensitive) is one of [`ALLOWED_EXTENSIONS`] are kept;
//! subdirectories are skipped even if their name looks like a picture.

use log::{debug, info};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Recognised picture extensions, lowercase and without the leading dot.
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

/// An absolute path to a picture file.
pub type Picture = PathBuf;

/// Return `true` if `path` ends with one of the [`ALLOWED_EXTENSIONS`].
///
/// Only the name is inspected; the filesystem is not touched.
pub fn is_valid_picture(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            ALLOWED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Scan `dir` for pictures.
///
/// A relative `dir` is resolved against the current working directory so
/// the returned paths are always absolute.  Order follows the directory
/// listing, which is platform-dependent.
pub fn scan(dir: &Path) -> io::Result<Vec<Picture>> {
    let dir = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir()?.join(dir)
    };

    let mut pictures = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let path = entry?.path();
        if !is_valid_picture(&path) {
            continue;
        }
        // `metadata` follows symlinks, so a link to a picture counts.
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => pictures.push(path),
            Ok(_) => debug!("skipping non-file {}", path.display()),
            Err(e) => debug!("skipping {}: {}", path.display(), e),
        }
    }

    info!("found {} picture(s) in {}", pictures.len(), dir.display());
    Ok(pictures)
}
