//! Compiled template units: parsing and execution.
//!
//! A [`CompiledUnit`] is the namespace of every fragment composed for one
//! top-level file, rooted at that file's canonical name. Each fragment's
//! (possibly rewritten) source is parsed once at compile time; execution
//! renders a named sub-template against caller data into any
//! [`io::Write`] sink.
//!
//! # Action syntax
//!
//! Actions live inside `{{ }}` delimiters:
//!
//! - `{{ define "name" }} ... {{ end }}` - registers a nested template;
//!   contributes no output where it is declared
//! - `{{ template "name" }}` - renders the named template from the unit's
//!   namespace (optional trailing token ignored)
//! - `{{ . }}`, `{{ .user.name }}`, `{{ .items.0 }}` - dot-path lookup in
//!   the data value; a missing path renders as empty
//! - `{{ "literal" }}` - quoted literal
//! - `{{ fname .arg "lit" }}` - custom function call; unknown names are
//!   rejected when the unit is built
//!
//! Anything else inside delimiters is a compile error, as are unclosed
//! delimiters, stray `{{ end }}` tags, and unclosed `define` blocks.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::compose::FragmentCache;
use crate::error::{ComposeError, Result};
use crate::options::Funcs;

/// Runtime cap on nested `template` inclusion; a self-including define
/// would otherwise recurse forever.
const MAX_INCLUDE_DEPTH: usize = 64;

/// One parsed element of a template body.
#[derive(Debug, Clone)]
enum Node {
    /// Literal text emitted verbatim.
    Text(String),
    /// An expression whose value is formatted into the output.
    Action(Expr),
    /// Inclusion of another template from the unit's namespace.
    Include(String),
}

/// An evaluable expression inside an action.
#[derive(Debug, Clone)]
enum Expr {
    /// `.` - the whole data value.
    Root,
    /// `.a.b.0` - path into the data value.
    Path(Vec<String>),
    /// `"text"` - quoted literal.
    Literal(String),
    /// `fname arg...` - bound custom function.
    Call { name: String, args: Vec<Expr> },
}

/// A self-contained, named, executable template unit.
///
/// Built by the compositor from one compile pass's fragment cache. The
/// namespace holds every fragment under its own canonical name plus every
/// `define` block under its (possibly shadowed) name, all sharing the
/// configured function bindings.
pub struct CompiledUnit {
    root: String,
    templates: HashMap<String, Arc<Vec<Node>>>,
    funcs: Funcs,
}

impl CompiledUnit {
    /// Composes a unit from the fully resolved cache for one top-level file.
    ///
    /// The unit is rooted at the first fragment's name; every fragment is
    /// registered under its own name and every define block under its
    /// define name. A later registration of an already-present name
    /// replaces the earlier one - the resolver guarantees this never
    /// matters for symbolic names.
    pub(crate) fn build(cache: &FragmentCache, funcs: &Funcs) -> Result<Self> {
        let root = cache
            .first()
            .map(|f| f.name.clone())
            .unwrap_or_default();

        let mut templates = HashMap::new();
        for fragment in cache.iter() {
            let parsed = parse(&fragment.source, funcs)
                .map_err(|msg| ComposeError::compile(&fragment.name, msg))?;
            templates.insert(fragment.name.clone(), Arc::new(parsed.body));
            for (name, nodes) in parsed.defines {
                templates.insert(name, Arc::new(nodes));
            }
        }

        Ok(Self {
            root,
            templates,
            funcs: funcs.clone(),
        })
    }

    /// The canonical name of the top-level file this unit was rooted at.
    pub fn name(&self) -> &str {
        &self.root
    }

    /// Returns true when the given internal name is registered.
    pub fn has_template(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Iterates all registered internal names (unordered).
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(|s| s.as_str())
    }

    /// Executes the named sub-template against `data`, writing rendered
    /// output to the sink.
    ///
    /// Fails with [`ComposeError::UndefinedTemplate`] when the name is not
    /// registered in this unit.
    pub fn execute(&self, name: &str, data: &Value, out: &mut dyn io::Write) -> Result<()> {
        let nodes = self
            .templates
            .get(name)
            .ok_or_else(|| ComposeError::UndefinedTemplate {
                name: name.to_string(),
            })?;
        self.render_nodes(nodes, data, out, 0, name)
    }

    /// Executes the unit's root template against `data`.
    pub fn execute_root(&self, data: &Value, out: &mut dyn io::Write) -> Result<()> {
        self.execute(&self.root, data, out)
    }

    /// Renders the named sub-template to a `String`, serializing `data`
    /// through serde first.
    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String> {
        let value = serde_json::to_value(data).map_err(|e| ComposeError::Render {
            name: name.to_string(),
            message: format!("data serialization failed: {}", e),
        })?;
        let mut buf = Vec::new();
        self.execute(name, &value, &mut buf)?;
        // The sink only ever receives fragments of valid UTF-8 sources.
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    fn render_nodes(
        &self,
        nodes: &[Node],
        data: &Value,
        out: &mut dyn io::Write,
        depth: usize,
        current: &str,
    ) -> Result<()> {
        for node in nodes {
            match node {
                Node::Text(text) => write_out(out, text.as_bytes(), current)?,
                Node::Action(expr) => {
                    let value = self.eval(expr, data, current)?;
                    write_out(out, format_value(&value).as_bytes(), current)?;
                }
                Node::Include(name) => {
                    if depth + 1 > MAX_INCLUDE_DEPTH {
                        return Err(ComposeError::RecursionLimit {
                            name: current.to_string(),
                        });
                    }
                    let nodes =
                        self.templates
                            .get(name)
                            .ok_or_else(|| ComposeError::UndefinedTemplate {
                                name: name.to_string(),
                            })?;
                    self.render_nodes(nodes, data, out, depth + 1, name)?;
                }
            }
        }
        Ok(())
    }

    fn eval(&self, expr: &Expr, data: &Value, current: &str) -> Result<Value> {
        match expr {
            Expr::Root => Ok(data.clone()),
            Expr::Path(parts) => Ok(resolve_path(data, parts).cloned().unwrap_or(Value::Null)),
            Expr::Literal(text) => Ok(Value::String(text.clone())),
            Expr::Call { name, args } => {
                let func = self
                    .funcs
                    .get(name)
                    .expect("function validated at build time");
                let mut evaluated = Vec::with_capacity(args.len());
                for arg in args {
                    evaluated.push(self.eval(arg, data, current)?);
                }
                func(&evaluated).map_err(|message| ComposeError::Render {
                    name: current.to_string(),
                    message,
                })
            }
        }
    }
}

impl std::fmt::Debug for CompiledUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("CompiledUnit")
            .field("root", &self.root)
            .field("templates", &names)
            .finish()
    }
}

fn write_out(out: &mut dyn io::Write, bytes: &[u8], current: &str) -> Result<()> {
    out.write_all(bytes)
        .map_err(|e| ComposeError::io(current, e))
}

/// Resolves a dotted path in a JSON value: object keys and array indices.
fn resolve_path<'a>(value: &'a Value, parts: &[String]) -> Option<&'a Value> {
    let mut current = value;
    for part in parts {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(arr) => {
                let index: usize = part.parse().ok()?;
                arr.get(index)?
            }
            _ => return None,
        };
    }
    Some(current)
}

/// Formats a JSON value as template output.
fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        // Arrays and objects fall back to their JSON representation.
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

struct Parsed {
    body: Vec<Node>,
    defines: Vec<(String, Vec<Node>)>,
}

/// Tokenized word inside an action.
enum Token {
    Word(String),
    Quoted(String),
}

fn parse(src: &str, funcs: &Funcs) -> std::result::Result<Parsed, String> {
    // Frame stack: bottom frame is the fragment body (no name), one frame
    // per open define block above it.
    let mut frames: Vec<(Option<String>, Vec<Node>)> = vec![(None, Vec::new())];
    let mut defines: Vec<(String, Vec<Node>)> = Vec::new();
    let mut rest = src;

    while let Some(start) = rest.find("{{") {
        let (text, tail) = rest.split_at(start);
        if !text.is_empty() {
            frames.last_mut().unwrap().1.push(Node::Text(text.to_string()));
        }
        let tail = &tail[2..];
        let close = tail
            .find("}}")
            .ok_or_else(|| "unclosed action delimiter".to_string())?;
        let action = tail[..close].trim();
        rest = &tail[close + 2..];

        if action.is_empty() {
            return Err("empty action".to_string());
        }

        if let Some(args) = keyword(action, "define") {
            let (name, _) = parse_quoted(args)?;
            frames.push((Some(name), Vec::new()));
        } else if action == "end" {
            let (name, nodes) = frames.pop().expect("frame stack never empty");
            match name {
                Some(name) => defines.push((name, nodes)),
                None => return Err("unexpected {{ end }}".to_string()),
            }
        } else if let Some(args) = keyword(action, "template") {
            let (name, _) = parse_quoted(args)?;
            frames.last_mut().unwrap().1.push(Node::Include(name));
        } else {
            let expr = parse_expr(action, funcs)?;
            frames.last_mut().unwrap().1.push(Node::Action(expr));
        }
    }

    if !rest.is_empty() {
        frames.last_mut().unwrap().1.push(Node::Text(rest.to_string()));
    }

    if frames.len() > 1 {
        let open = frames
            .last()
            .and_then(|(name, _)| name.as_deref())
            .unwrap_or_default();
        return Err(format!("unclosed define block \"{}\"", open));
    }

    let (_, body) = frames.pop().expect("body frame present");
    Ok(Parsed { body, defines })
}

/// Matches a leading keyword followed by whitespace or a quote.
fn keyword<'a>(action: &'a str, kw: &str) -> Option<&'a str> {
    let rest = action.strip_prefix(kw)?;
    if rest.starts_with(char::is_whitespace) || rest.starts_with('"') {
        Some(rest)
    } else {
        None
    }
}

/// Parses a leading quoted string, returning it and the remaining text.
fn parse_quoted(s: &str) -> std::result::Result<(String, &str), String> {
    let s = s.trim_start();
    let inner = s
        .strip_prefix('"')
        .ok_or_else(|| format!("expected quoted name, found \"{}\"", s))?;
    let close = inner
        .find('"')
        .ok_or_else(|| "unterminated quoted name".to_string())?;
    Ok((inner[..close].to_string(), &inner[close + 1..]))
}

fn tokenize(s: &str) -> std::result::Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut rest = s.trim();
    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix('"') {
            let close = tail
                .find('"')
                .ok_or_else(|| "unterminated string literal".to_string())?;
            tokens.push(Token::Quoted(tail[..close].to_string()));
            rest = tail[close + 1..].trim_start();
        } else {
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            tokens.push(Token::Word(rest[..end].to_string()));
            rest = rest[end..].trim_start();
        }
    }
    Ok(tokens)
}

fn parse_expr(action: &str, funcs: &Funcs) -> std::result::Result<Expr, String> {
    let tokens = tokenize(action)?;
    let (first, args) = match tokens.split_first() {
        Some(split) => split,
        None => return Err("empty action".to_string()),
    };

    match first {
        Token::Quoted(text) => {
            if !args.is_empty() {
                return Err("string literal takes no arguments".to_string());
            }
            Ok(Expr::Literal(text.clone()))
        }
        Token::Word(word) if word.starts_with('.') => {
            if !args.is_empty() {
                return Err(format!("field path \"{}\" takes no arguments", word));
            }
            parse_path(word)
        }
        Token::Word(word) => {
            if !is_identifier(word) {
                return Err(format!("unrecognized action \"{}\"", action));
            }
            if !funcs.contains_key(word.as_str()) {
                return Err(format!("function \"{}\" not defined", word));
            }
            let mut parsed_args = Vec::with_capacity(args.len());
            for arg in args {
                parsed_args.push(parse_arg(arg)?);
            }
            Ok(Expr::Call {
                name: word.clone(),
                args: parsed_args,
            })
        }
    }
}

fn parse_arg(token: &Token) -> std::result::Result<Expr, String> {
    match token {
        Token::Quoted(text) => Ok(Expr::Literal(text.clone())),
        Token::Word(word) if word.starts_with('.') => parse_path(word),
        Token::Word(word) => Err(format!("unexpected argument \"{}\"", word)),
    }
}

fn parse_path(word: &str) -> std::result::Result<Expr, String> {
    if word == "." {
        return Ok(Expr::Root);
    }
    let parts: Vec<String> = word[1..].split('.').map(str::to_string).collect();
    if parts.iter().any(String::is_empty) {
        return Err(format!("bad field path \"{}\"", word));
    }
    Ok(Expr::Path(parts))
}

fn is_identifier(word: &str) -> bool {
    !word.is_empty() && word.chars().all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn unit_from(fragments: &[(&str, &str)], funcs: Funcs) -> Result<CompiledUnit> {
        let mut cache = FragmentCache::new();
        for (name, src) in fragments {
            cache.add(*name, *src);
        }
        CompiledUnit::build(&cache, &funcs)
    }

    fn unit(fragments: &[(&str, &str)]) -> CompiledUnit {
        unit_from(fragments, Funcs::new()).unwrap()
    }

    #[test]
    fn test_plain_text_roundtrip() {
        let unit = unit(&[("index.html", "just text")]);
        assert_eq!(unit.render("index.html", &json!({})).unwrap(), "just text");
    }

    #[test]
    fn test_rooted_at_first_fragment() {
        let unit = unit(&[("index.html", "a"), ("partials/nav.html", "b")]);
        assert_eq!(unit.name(), "index.html");
        assert!(unit.has_template("partials/nav.html"));
    }

    #[test]
    fn test_dot_path_substitution() {
        let unit = unit(&[("t.html", "Hello, {{ .user.name }}!")]);
        let data = json!({"user": {"name": "Alice"}});
        assert_eq!(unit.render("t.html", &data).unwrap(), "Hello, Alice!");
    }

    #[test]
    fn test_array_index_path() {
        let unit = unit(&[("t.html", "{{ .items.0 }}/{{ .items.2 }}")]);
        let data = json!({"items": ["a", "b", "c"]});
        assert_eq!(unit.render("t.html", &data).unwrap(), "a/c");
    }

    #[test]
    fn test_whole_data_value() {
        let unit = unit(&[("t.html", "got {{ . }}")]);
        assert_eq!(unit.render("t.html", &json!("it")).unwrap(), "got it");
    }

    #[test]
    fn test_missing_path_renders_empty() {
        let unit = unit(&[("t.html", "[{{ .missing.deep }}]")]);
        assert_eq!(unit.render("t.html", &json!({})).unwrap(), "[]");
    }

    #[test]
    fn test_define_produces_no_output_at_declaration() {
        let unit = unit(&[("t.html", r#"a{{ define "x" }}hidden{{ end }}b"#)]);
        assert_eq!(unit.render("t.html", &json!({})).unwrap(), "ab");
        assert_eq!(unit.render("x", &json!({})).unwrap(), "hidden");
    }

    #[test]
    fn test_template_inclusion() {
        let unit = unit(&[(
            "t.html",
            r#"{{ define "greet" }}hi {{ .name }}{{ end }}[{{ template "greet" }}]"#,
        )]);
        let data = json!({"name": "Bob"});
        assert_eq!(unit.render("t.html", &data).unwrap(), "[hi Bob]");
    }

    #[test]
    fn test_template_tag_trailing_token_ignored() {
        let unit = unit(&[(
            "t.html",
            r#"{{ define "row" }}r{{ end }}{{ template "row" .item }}"#,
        )]);
        assert_eq!(unit.render("t.html", &json!({})).unwrap(), "r");
    }

    #[test]
    fn test_nested_defines_both_registered() {
        let unit = unit(&[(
            "t.html",
            r#"{{ define "outer" }}O{{ define "inner" }}I{{ end }}{{ end }}"#,
        )]);
        assert_eq!(unit.render("outer", &json!({})).unwrap(), "O");
        assert_eq!(unit.render("inner", &json!({})).unwrap(), "I");
    }

    #[test]
    fn test_undefined_template_at_execution() {
        let unit = unit(&[("t.html", r#"{{ template "ghost" }}"#)]);
        let err = unit.render("t.html", &json!({})).unwrap_err();
        assert!(matches!(err, ComposeError::UndefinedTemplate { name } if name == "ghost"));
    }

    #[test]
    fn test_executing_unknown_name_fails() {
        let unit = unit(&[("t.html", "x")]);
        let err = unit.render("nope", &json!({})).unwrap_err();
        assert!(matches!(err, ComposeError::UndefinedTemplate { .. }));
    }

    #[test]
    fn test_self_inclusion_hits_recursion_limit() {
        let unit = unit(&[(
            "t.html",
            r#"{{ define "loop" }}{{ template "loop" }}{{ end }}{{ template "loop" }}"#,
        )]);
        let err = unit.render("t.html", &json!({})).unwrap_err();
        assert!(matches!(err, ComposeError::RecursionLimit { .. }));
    }

    #[test]
    fn test_unclosed_delimiter_is_compile_error() {
        let err = unit_from(&[("t.html", "oops {{ .name")], Funcs::new()).unwrap_err();
        assert!(matches!(err, ComposeError::Compile { ref name, .. } if name == "t.html"));
    }

    #[test]
    fn test_stray_end_is_compile_error() {
        let err = unit_from(&[("t.html", "{{ end }}")], Funcs::new()).unwrap_err();
        assert!(err.to_string().contains("unexpected"));
    }

    #[test]
    fn test_unclosed_define_is_compile_error() {
        let err = unit_from(&[("t.html", r#"{{ define "x" }}body"#)], Funcs::new()).unwrap_err();
        assert!(err.to_string().contains("unclosed define"));
    }

    #[test]
    fn test_unknown_function_rejected_at_build() {
        let err = unit_from(&[("t.html", "{{ shout .name }}")], Funcs::new()).unwrap_err();
        assert!(matches!(err, ComposeError::Compile { .. }));
        assert!(err.to_string().contains("shout"));
    }

    #[test]
    fn test_custom_function_with_args() {
        let mut funcs = Funcs::new();
        funcs.insert(
            "join".to_string(),
            Arc::new(|args: &[Value]| {
                let parts: Vec<String> = args.iter().map(format_value).collect();
                Ok(Value::String(parts.join("-")))
            }),
        );
        let unit = unit_from(&[("t.html", r#"{{ join .a "mid" .b }}"#)], funcs).unwrap();
        let data = json!({"a": "x", "b": "y"});
        assert_eq!(unit.render("t.html", &data).unwrap(), "x-mid-y");
    }

    #[test]
    fn test_function_failure_is_render_error() {
        let mut funcs = Funcs::new();
        funcs.insert(
            "fail".to_string(),
            Arc::new(|_: &[Value]| Err("boom".to_string())),
        );
        let unit = unit_from(&[("t.html", "{{ fail }}")], funcs).unwrap();
        let err = unit.render("t.html", &json!({})).unwrap_err();
        assert!(matches!(err, ComposeError::Render { .. }));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_string_literal_action() {
        let unit = unit(&[("t.html", r#"{{ "verbatim" }}"#)]);
        assert_eq!(unit.render("t.html", &json!({})).unwrap(), "verbatim");
    }

    #[test]
    fn test_execute_writes_to_sink() {
        let unit = unit(&[("t.html", "n={{ .n }}")]);
        let mut sink = Vec::new();
        unit.execute("t.html", &json!({"n": 7}), &mut sink).unwrap();
        assert_eq!(String::from_utf8(sink).unwrap(), "n=7");
    }
}
