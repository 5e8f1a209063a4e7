//! Published template snapshots with whole-walk recompile locking.
//!
//! [`TemplateStore`] owns the compile configuration and the currently
//! published [`TemplateMap`]. Recompiles are serialized by a coarse lock
//! whose scope is one full directory walk, never per-file, so concurrent
//! reload triggers cannot interleave compile passes. The published mapping
//! is an immutable snapshot behind an `Arc`: readers clone the `Arc` and
//! keep rendering from it even while a recompile replaces the store's
//! current snapshot wholesale.

use std::sync::{Arc, Mutex, RwLock};

use serde::Serialize;

use crate::compose::{compile, TemplateMap};
use crate::error::{ComposeError, Result};
use crate::options::Options;

/// Shared holder for the latest successfully compiled template map.
///
/// A failed reload leaves the previous snapshot in effect - a walk either
/// fully succeeds and replaces the mapping, or fully fails and changes
/// nothing.
///
/// # Example
///
/// ```rust,ignore
/// let store = TemplateStore::load(Options::new("./templates"))?;
/// let html = store.render("index.html", "index.html", &data)?;
/// store.reload()?; // e.g. on a dev-mode request
/// ```
pub struct TemplateStore {
    options: Options,
    reload_lock: Mutex<()>,
    current: RwLock<Arc<TemplateMap>>,
}

impl TemplateStore {
    /// Creates a store with an empty published snapshot. Call
    /// [`reload`](Self::reload) to perform the first compile.
    pub fn new(options: Options) -> Self {
        Self {
            options,
            reload_lock: Mutex::new(()),
            current: RwLock::new(Arc::new(TemplateMap::new())),
        }
    }

    /// Creates a store and eagerly compiles the configured directory.
    pub fn load(options: Options) -> Result<Self> {
        let store = Self::new(options);
        store.reload()?;
        Ok(store)
    }

    /// Recompiles the whole directory and publishes the new snapshot.
    ///
    /// Serialized end-to-end: a second caller blocks until the walk in
    /// progress finishes. On failure the previous snapshot stays published
    /// and the error is returned.
    pub fn reload(&self) -> Result<()> {
        let _guard = self.reload_lock.lock().unwrap_or_else(|e| e.into_inner());

        let templates = compile(&self.options)?;

        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = Arc::new(templates);
        Ok(())
    }

    /// Returns the currently published snapshot.
    ///
    /// The snapshot is immutable; it remains valid (and unchanged) even if
    /// the store reloads afterwards.
    pub fn snapshot(&self) -> Arc<TemplateMap> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Returns true when a unit with the given canonical name is published.
    pub fn has_unit(&self, name: &str) -> bool {
        self.snapshot().contains_key(name)
    }

    /// Renders `template_name` from the unit keyed by `unit_name` in the
    /// current snapshot.
    pub fn render<T: Serialize>(
        &self,
        unit_name: &str,
        template_name: &str,
        data: &T,
    ) -> Result<String> {
        let snapshot = self.snapshot();
        let unit = snapshot
            .get(unit_name)
            .ok_or_else(|| ComposeError::UndefinedTemplate {
                name: unit_name.to_string(),
            })?;
        unit.render(template_name, data)
    }

    /// The configuration this store compiles with.
    pub fn options(&self) -> &Options {
        &self.options
    }
}
