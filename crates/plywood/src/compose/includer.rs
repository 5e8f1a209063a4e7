//! Recursive fragment inclusion for one directory walk.
//!
//! [`ComposePass`] is the per-walk context that replaces the shared mutable
//! state of the classic implementation: it owns the fragment cache (cleared
//! per top-level file) and the symbolic reference list (retained for the
//! whole walk, so a name defined in one file and colliding in a file
//! compiled later is still detected).

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::loader::{file_extension, load_file_source, template_name};
use crate::tag;

use super::cache::FragmentCache;

/// Per-walk composition context: cache plus symbolic reference list.
#[derive(Debug)]
pub struct ComposePass {
    root: PathBuf,
    /// Fragments accumulated for the current top-level file.
    pub(super) cache: FragmentCache,
    /// Symbolic (extensionless) template references seen so far, across all
    /// compile passes of this walk. Repeats are harmless.
    pub(super) symbolic: Vec<String>,
}

impl ComposePass {
    /// Creates a context rooted at the configured template directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            cache: FragmentCache::new(),
            symbolic: Vec::new(),
        }
    }

    /// Recursively loads the fragment at `path` and everything it includes.
    ///
    /// When this returns, every file-backed fragment transitively reachable
    /// from `path` is present in the cache exactly once. Cyclic `template`
    /// references terminate because an already-cached name short-circuits
    /// before recursing. I/o and empty-file failures propagate and abort
    /// the compile pass.
    pub fn add(&mut self, path: &Path) -> Result<()> {
        let name = template_name(&self.root, path);
        // Idempotent: breaks cycles and avoids duplicate work.
        if self.cache.contains(&name) {
            return Ok(());
        }

        let source = load_file_source(path)?;
        self.cache.add(name, source.clone());

        for tag in tag::template_tags(&source) {
            let target = tag.name;
            if file_extension(Path::new(target)).is_empty() {
                // Purely symbolic name: resolved later against defines.
                self.symbolic.push(target.to_string());
            } else {
                // Path-like target: pull the file in before returning.
                self.add(&self.root.join(target))?;
            }
        }

        Ok(())
    }

    /// Clears the fragment cache between top-level files. The symbolic
    /// reference list deliberately survives.
    pub fn finish_file(&mut self) {
        self.cache.clear();
    }
}
