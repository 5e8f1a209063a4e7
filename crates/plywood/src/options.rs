//! Configuration for the directory compiler.
//!
//! [`Options`] mirrors the classic renderer configuration surface: a template
//! root directory, the set of file extensions treated as compile entry
//! points, and custom functions injected into every compiled unit.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

/// A custom function callable from template actions.
///
/// Functions receive their evaluated arguments and return a value to render,
/// or a message describing why they failed. Failures surface as
/// [`ComposeError::Render`](crate::ComposeError::Render).
pub type TemplateFn = Arc<dyn Fn(&[Value]) -> std::result::Result<Value, String> + Send + Sync>;

/// Named custom functions bound uniformly into every compiled unit.
pub type Funcs = HashMap<String, TemplateFn>;

/// Configuration for [`compile`](crate::compile) and
/// [`TemplateStore`](crate::TemplateStore).
///
/// # Defaults
///
/// - `directory`: `"templates"`
/// - `extensions`: `[".html"]`
/// - `funcs`: empty
///
/// # Example
///
/// ```rust
/// use plywood::Options;
/// use serde_json::Value;
/// use std::sync::Arc;
///
/// let opt = Options::new("./templates")
///     .extension(".tmpl")
///     .func("shout", Arc::new(|args: &[Value]| {
///         let s = args.first().and_then(Value::as_str).unwrap_or_default();
///         Ok(Value::String(s.to_uppercase()))
///     }));
/// assert_eq!(opt.extensions, vec![".tmpl".to_string()]);
/// ```
#[derive(Clone)]
pub struct Options {
    /// Root directory to load templates from.
    pub directory: PathBuf,
    /// File extensions (with leading dot) recognized as top-level templates.
    pub extensions: Vec<String>,
    /// Custom functions applied to every compiled unit.
    pub funcs: Funcs,
}

impl Options {
    /// Creates options rooted at the given directory, with default extensions.
    pub fn new(directory: impl AsRef<Path>) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Replaces the recognized extensions with the single given one.
    pub fn extension(mut self, ext: impl Into<String>) -> Self {
        self.extensions = vec![ext.into()];
        self
    }

    /// Adds an extension to the recognized set.
    pub fn add_extension(mut self, ext: impl Into<String>) -> Self {
        self.extensions.push(ext.into());
        self
    }

    /// Binds a custom function under the given name.
    pub fn func(mut self, name: impl Into<String>, f: TemplateFn) -> Self {
        self.funcs.insert(name.into(), f);
        self
    }

    /// Returns true when the given extension (with leading dot) is recognized.
    pub(crate) fn matches_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e == ext)
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("templates"),
            extensions: vec![".html".to_string()],
            funcs: Funcs::new(),
        }
    }
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("directory", &self.directory)
            .field("extensions", &self.extensions)
            .field("funcs", &self.funcs.keys().collect::<Vec<_>>())
            .finish()
    }
}
