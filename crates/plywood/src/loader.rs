//! Fragment file loading, canonical naming, and directory enumeration.
//!
//! Canonical template names are root-relative, slash-separated paths with
//! the extension preserved (`a/b.html` for `<root>/a/b.html`), regardless of
//! the host path-separator convention. The directory walk visits entries in
//! sorted order so repeated walks of an unchanged tree enumerate files
//! identically.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ComposeError, Result};
use crate::options::Options;

/// Reads a fragment file's content as text.
///
/// Fails with [`ComposeError::EmptyTemplate`] when the file exists but is
/// zero bytes, and [`ComposeError::Io`] when it cannot be read. No retries:
/// an i/o failure aborts the compile pass that triggered the load.
pub fn load_file_source(path: &Path) -> Result<String> {
    let src = fs::read_to_string(path).map_err(|e| ComposeError::io(path, e))?;
    if src.is_empty() {
        return Err(ComposeError::EmptyTemplate {
            path: path.to_path_buf(),
        });
    }
    Ok(src)
}

/// Derives the canonical template name for a file under `base`.
///
/// The name is the path relative to `base`, joined with forward slashes.
/// Falls back to the slash-normalized full path when `path` is not under
/// `base` (which only happens for hand-constructed inputs).
pub fn template_name(base: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    parts.join("/")
}

/// Returns the file's extension with a leading dot, or an empty string.
pub fn file_extension(path: &Path) -> String {
    match path.extension() {
        Some(ext) => format!(".{}", ext.to_string_lossy()),
        None => String::new(),
    }
}

/// Recursively enumerates all top-level template files under the root.
///
/// Only regular files whose extension is in the recognized set are
/// returned. Entries are visited in sorted order at each directory level,
/// so the result is deterministic for an unchanged tree.
pub fn walk_dir(options: &Options) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk_into(&options.directory, options, &mut files)?;
    Ok(files)
}

fn walk_into(dir: &Path, options: &Options, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| ComposeError::io(dir, e))?;

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ComposeError::io(dir, e))?;
        paths.push(entry.path());
    }
    paths.sort();

    for path in paths {
        if path.is_dir() {
            walk_into(&path, options, out)?;
        } else if options.matches_extension(&file_extension(&path)) {
            out.push(path);
        }
    }
    Ok(())
}
