//! The template composition engine.
//!
//! Composition turns a directory of template fragment files into a mapping
//! from canonical names to self-contained [`CompiledUnit`]s. Each top-level
//! file gets its own compile pass:
//!
//! 1. The includer fills the fragment cache, pulling in every file-backed
//!    `template` target transitively (cycle-safe, deduplicated).
//! 2. The resolver rewrites colliding `define` blocks so the first
//!    definition in cache order stays authoritative.
//! 3. The compositor parses every cached fragment into one namespace rooted
//!    at the top-level file's canonical name.
//!
//! The cache is cleared between files; the symbolic reference list is
//! retained for the whole walk. A failure at any file aborts the entire
//! walk - partial results are discarded, never returned.

mod cache;
mod includer;
mod resolver;

pub use cache::{Fragment, FragmentCache};
pub use includer::ComposePass;
pub use resolver::resolve_redefinitions;

use std::collections::HashMap;

use crate::error::Result;
use crate::loader;
use crate::options::Options;
use crate::unit::CompiledUnit;

/// The output mapping of one directory walk: canonical top-level name to
/// compiled unit. Rebuilt in full on every walk; no incremental update.
pub type TemplateMap = HashMap<String, CompiledUnit>;

/// Compiles every matching top-level file under the configured root.
///
/// Enumerates the root recursively (sorted, so an unchanged tree always
/// compiles identically), filters by the configured extensions, and runs
/// one compile pass per match. The result has exactly one entry per
/// matching file, keyed by its canonical root-relative name.
///
/// # Errors
///
/// The first i/o, empty-file, or compile failure aborts the whole walk and
/// is returned; nothing partial is kept.
pub fn compile(options: &Options) -> Result<TemplateMap> {
    let files = loader::walk_dir(options)?;

    let mut templates = TemplateMap::new();
    let mut pass = ComposePass::new(&options.directory);

    for path in files {
        pass.add(&path)?;
        resolve_redefinitions(&mut pass);

        let unit = CompiledUnit::build(&pass.cache, &options.funcs)?;
        templates.insert(unit.name().to_string(), unit);

        pass.finish_file();
    }

    Ok(templates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ComposeError;
    use std::fs;
    use std::path::Path;

    fn write_file(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_one_unit_per_matching_file() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "index.html", "index");
        write_file(dir.path(), "about.html", "about");
        write_file(dir.path(), "readme.md", "not a template");

        let map = compile(&Options::new(dir.path())).unwrap();
        assert_eq!(map.len(), 2);
        assert!(map.contains_key("index.html"));
        assert!(map.contains_key("about.html"));
    }

    #[test]
    fn test_units_keyed_by_canonical_name() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a/b.html", "nested");

        let map = compile(&Options::new(dir.path())).unwrap();
        assert!(map.contains_key("a/b.html"));
        assert_eq!(map["a/b.html"].name(), "a/b.html");
    }

    #[test]
    fn test_walk_failure_discards_partial_results() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "good.html", "fine");
        // Sorts after good.html, so one unit was already built when the
        // walk hits it.
        write_file(dir.path(), "z-empty.html", "");

        let err = compile(&Options::new(dir.path())).unwrap_err();
        assert!(matches!(err, ComposeError::EmptyTemplate { .. }));
    }

    #[test]
    fn test_compile_error_aborts_whole_walk() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.html", "fine");
        write_file(dir.path(), "b.html", "{{ end }}");

        let err = compile(&Options::new(dir.path())).unwrap_err();
        assert!(matches!(err, ComposeError::Compile { ref name, .. } if name == "b.html"));
    }
}
