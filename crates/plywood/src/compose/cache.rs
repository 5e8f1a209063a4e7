//! Ordered, deduplicated fragment storage for one compile pass.

/// One named unit of template source text, file-backed or inline-defined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Canonical slash-separated name (root-relative path for file-backed
    /// fragments, symbolic string for inline defines).
    pub name: String,
    /// Raw template source, possibly rewritten during resolution.
    pub source: String,
}

/// Insertion-ordered fragment collection, unique by name.
///
/// The cache is scoped to exactly one top-level file's compile pass and is
/// cleared between passes. Insertion order is semantically significant: it
/// determines which `define` occurrence of a colliding name is treated as
/// authoritative, and it is preserved in the compiled namespace.
#[derive(Debug, Default)]
pub struct FragmentCache {
    fragments: Vec<Fragment>,
}

impl FragmentCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when a fragment with the given name is already cached.
    pub fn contains(&self, name: &str) -> bool {
        self.fragments.iter().any(|f| f.name == name)
    }

    /// Appends a fragment, preserving order. First writer wins: an add for
    /// an already-present name is a no-op and returns false.
    pub fn add(&mut self, name: impl Into<String>, source: impl Into<String>) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.fragments.push(Fragment {
            name,
            source: source.into(),
        });
        true
    }

    /// Iterates fragments in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Fragment> {
        self.fragments.iter()
    }

    /// Iterates fragments mutably in insertion order (used by resolution).
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Fragment> {
        self.fragments.iter_mut()
    }

    /// The first fragment, i.e. the compile pass's entry fragment.
    pub fn first(&self) -> Option<&Fragment> {
        self.fragments.first()
    }

    /// Number of cached fragments.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// True when no fragments are cached.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Empties the cache between compile passes.
    pub fn clear(&mut self) {
        self.fragments.clear();
    }
}
