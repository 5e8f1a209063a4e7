//! # Plywood - Composed Template Sets
//!
//! `plywood` compiles a directory of template fragment files into
//! self-contained, named, executable template units. It resolves
//! cross-file `{{ template "..." }}` inclusion, neutralizes duplicate
//! `{{ define "..." }}` blocks with first-wins shadowing, and guarantees the
//! same directory tree always compiles to the same units.
//!
//! ## Core Concepts
//!
//! - **Fragment**: one named unit of template source, file-backed or
//!   declared inline with a `define` block
//! - **Compile pass**: one top-level file plus everything it transitively
//!   includes, composed into a single namespace
//! - [`CompiledUnit`]: that namespace, rooted at the top-level file's
//!   canonical name and executable by any internal name
//! - [`TemplateStore`]: the published mapping of all units, swapped
//!   wholesale on recompile
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use plywood::{compile, Options};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Page { title: String }
//!
//! let templates = compile(&Options::new("./templates"))?;
//! let unit = &templates["index.html"];
//! let html = unit.render("index.html", &Page { title: "Home".into() })?;
//! # Ok::<(), plywood::ComposeError>(())
//! ```
//!
//! ## Template Syntax
//!
//! Fragments reference each other with `template` tags. A target with a
//! file extension is a root-relative path and is pulled into the compile
//! pass; an extensionless target is a symbolic name expected to be
//! declared by some `define` block in scope:
//!
//! ```text
//! {{ template "partials/nav.html" }}   <- file-backed include
//! {{ template "title" }}               <- symbolic include
//! {{ define "title" }}Home{{ end }}    <- declares the symbolic block
//! ```
//!
//! When several fragments under composition define the same symbolic name
//! (layout slots with defaults, typically), the first definition in cache
//! order - entry fragment first, then its dependencies in tag-scan order -
//! stays live; later ones are renamed to inert placeholders rather than
//! raising an error.
//!
//! ## Data and Functions
//!
//! Execution resolves `{{ .a.b.0 }}` dot-paths against any
//! [`serde::Serialize`] data and can call custom functions bound through
//! [`Options::func`]:
//!
//! ```rust
//! use plywood::Options;
//! use serde_json::Value;
//! use std::sync::Arc;
//!
//! let opt = Options::new("./templates").func("upper", Arc::new(|args: &[Value]| {
//!     let s = args.first().and_then(Value::as_str).unwrap_or_default();
//!     Ok(Value::String(s.to_uppercase()))
//! }));
//! ```
//!
//! ## Failure Model
//!
//! A directory walk either fully succeeds or fully fails: the first
//! unreadable file, empty fragment, or syntax error aborts the walk and
//! nothing partial is kept. [`TemplateStore::reload`] builds on this -
//! a failed recompile leaves the previously published snapshot in effect.

mod compose;
mod error;
mod loader;
mod options;
mod store;
mod tag;
mod unit;

pub use compose::{
    compile, resolve_redefinitions, ComposePass, Fragment, FragmentCache, TemplateMap,
};
pub use error::{ComposeError, Result};
pub use loader::{load_file_source, template_name, walk_dir};
pub use options::{Funcs, Options, TemplateFn};
pub use store::TemplateStore;
pub use tag::{define_tags, template_tags, Tag};
pub use unit::CompiledUnit;
