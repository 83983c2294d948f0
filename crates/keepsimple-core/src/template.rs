//! # Template Module
//!
//! The minijinja environment nodes render through, plus the site helpers:
//!
//! ```text
//! {{ _node(header, indent=1) }}      include a rendered node (or a list)
//! {{ _dump(value) }}                 debug dump inside <pre>
//! <option{{ _selected(flag) }}>      selected="selected" when truthy
//! {{ _url("article", slug="x") }}    path of a named route
//! {{ body | linebreaks }}            paragraphs and <br />
//! {{ path | match("^/([a-z]+)") }}   regex search
//! ```

use crate::error::Result;
use crate::model::Route;
use crate::scope::{RenderedFragment, Scope, ScopeValue};
use minijinja::value::{Kwargs, Object, Value, ValueKind};
use minijinja::{AutoEscape, Environment, Error, ErrorKind, Output, State, escape_formatter};
use html_escape::encode_quoted_attribute;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, LazyLock};

static PARAGRAPH_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"\n{2,}").unwrap()
});

/// Characters quoted inside one path segment built by `_url`.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Template environment shared by every render.
#[derive(Debug)]
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    /// Templates are loaded from `dir` on first use.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let mut env = Environment::new();
        env.set_loader(minijinja::path_loader(dir.as_ref()));
        register_helpers(&mut env);
        Self { env }
    }

    /// No templates until [`add_template`](Self::add_template) is called.
    #[must_use]
    pub fn in_memory() -> Self {
        let mut env = Environment::new();
        register_helpers(&mut env);
        Self { env }
    }

    pub fn add_template(&mut self, name: impl Into<String>, source: impl Into<String>) -> Result<()> {
        self.env.add_template_owned(name.into(), source.into())?;
        Ok(())
    }

    /// Make `routes` available to `_url`.
    pub fn set_routes(&mut self, routes: Vec<Route>) {
        let routes: Arc<BTreeMap<String, Route>> = Arc::new(
            routes
                .into_iter()
                .map(|route| (route.name.clone(), route))
                .collect(),
        );
        self.env.add_function("_url", move |name: String, kwargs: Kwargs| {
            route_url(&routes, &name, &kwargs)
        });
    }

    /// Render the template `name` with `scope` as its context.
    pub fn render(&self, name: &str, scope: &Scope) -> Result<String> {
        let template = self.env.get_template(name)?;
        Ok(template.render(scope_to_value(scope))?)
    }
}

fn register_helpers(env: &mut Environment<'static>) {
    env.set_formatter(markup_formatter);
    env.add_function("_node", node_markup);
    env.add_function("_dump", dump);
    env.add_function("_selected", selected);
    env.add_function("_url", |name: String, kwargs: Kwargs| {
        route_url(&BTreeMap::new(), &name, &kwargs)
    });
    env.add_filter("linebreaks", linebreaks);
    env.add_filter("match", match_regex);
}

/// Auto-escaping for `.html` templates that leaves `/` alone, so paths and
/// URLs print as written. Only `& < > " '` are encoded.
fn markup_formatter(
    out: &mut Output<'_>,
    state: &State<'_, '_>,
    value: &Value,
) -> std::result::Result<(), Error> {
    if !matches!(state.auto_escape(), AutoEscape::Html)
        || value.is_safe()
        || value.is_undefined()
        || value.is_none()
    {
        return escape_formatter(out, state, value);
    }
    fmt::Write::write_str(out, &encode_quoted_attribute(&value.to_string()))
        .map_err(|_| Error::new(ErrorKind::WriteFailure, "cannot write template output"))
}

// =============================================================================
// SCOPE CONVERSION
// =============================================================================

/// A rendered child node as seen by templates.
///
/// Prints its HTML (escaped under auto-escaping, like any other object);
/// `.html` gives the markup as safe, `.name` and `.template` describe it.
#[derive(Debug)]
struct FragmentObject(RenderedFragment);

impl Object for FragmentObject {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        match key.as_str()? {
            "name" => Some(Value::from(self.0.name.clone())),
            "template" => Some(Value::from(self.0.template.clone())),
            "html" => Some(Value::from_safe_string(self.0.html.clone())),
            _ => None,
        }
    }

    fn render(self: &Arc<Self>, f: &mut fmt::Formatter<'_>) -> fmt::Result
    where
        Self: Sized + 'static,
    {
        f.write_str(&self.0.html)
    }
}

fn scope_to_value(scope: &Scope) -> Value {
    let entries: BTreeMap<String, Value> = scope
        .iter()
        .map(|(key, value)| (key.to_string(), to_value(value)))
        .collect();
    Value::from(entries)
}

fn to_value(value: &ScopeValue) -> Value {
    match value {
        ScopeValue::Text(text) => Value::from(text.as_str()),
        ScopeValue::Integer(number) => Value::from(*number),
        ScopeValue::Bool(flag) => Value::from(*flag),
        ScopeValue::List(items) => Value::from(items.iter().map(to_value).collect::<Vec<_>>()),
        ScopeValue::Map(map) => Value::from(
            map.iter()
                .map(|(key, value)| (key.clone(), to_value(value)))
                .collect::<BTreeMap<_, _>>(),
        ),
        ScopeValue::Fragment(fragment) => Value::from_object(FragmentObject(fragment.clone())),
    }
}

// =============================================================================
// GLOBALS
// =============================================================================

fn node_markup(value: Value, kwargs: Kwargs) -> std::result::Result<Value, Error> {
    let indent = kwargs.get::<Option<usize>>("indent")?.unwrap_or(0);
    let indent_first = kwargs.get::<Option<bool>>("indent_first")?.unwrap_or(false);
    kwargs.assert_all_used()?;

    if value.is_undefined() || value.is_none() {
        return Ok(Value::from_safe_string(String::new()));
    }

    let items: Vec<Value> = if value.kind() == ValueKind::Seq {
        value.try_iter()?.collect()
    } else {
        vec![value]
    };

    let html: String = items
        .iter()
        .map(|item| indent_lines(&fragment_markup(item), indent.saturating_mul(4), indent_first))
        .collect();
    Ok(Value::from_safe_string(html))
}

fn fragment_markup(item: &Value) -> String {
    if let Some(fragment) = item.downcast_object_ref::<FragmentObject>() {
        let fragment = &fragment.0;
        format!(
            "<!--\nname: {}\ntemplate: {}\n-->\n{}",
            fragment.name,
            fragment.template.as_deref().unwrap_or(""),
            fragment.html
        )
    } else if item.is_safe() {
        item.to_string()
    } else {
        encode_quoted_attribute(&item.to_string()).into_owned()
    }
}

/// Indent every non-blank line after the first (and the first too when asked).
fn indent_lines(text: &str, width: usize, indent_first: bool) -> String {
    if width == 0 {
        return text.to_string();
    }
    let pad = " ".repeat(width);
    text.split('\n')
        .enumerate()
        .map(|(index, line)| {
            if line.is_empty() || (index == 0 && !indent_first) {
                line.to_string()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn dump(value: Value) -> Value {
    let dump = format!("{value:#?}");
    Value::from_safe_string(format!("<pre>{}</pre>", encode_quoted_attribute(&dump)))
}

fn selected(value: Value) -> Value {
    if value.is_true() {
        Value::from_safe_string(" selected=\"selected\"".to_string())
    } else {
        Value::from_safe_string(String::new())
    }
}

fn route_url(
    routes: &BTreeMap<String, Route>,
    name: &str,
    kwargs: &Kwargs,
) -> std::result::Result<Value, Error> {
    let route = routes.get(name).ok_or_else(|| {
        Error::new(ErrorKind::InvalidOperation, format!("unknown route `{name}`"))
    })?;

    let mut params = BTreeMap::new();
    for key in kwargs.args() {
        let raw = kwargs.get::<Value>(key)?.to_string();
        let is_tail = route
            .pattern
            .split('/')
            .any(|segment| segment.strip_prefix('*') == Some(key));
        params.insert(key.to_string(), encode_param(&raw, is_tail));
    }

    route
        .path(|param| params.get(param).map(String::as_str))
        .map(Value::from_safe_string)
        .ok_or_else(|| {
            Error::new(
                ErrorKind::MissingArgument,
                format!("route `{name}` needs parameters missing from the call"),
            )
        })
}

/// Percent-encode a route parameter; a tail parameter keeps its slashes.
fn encode_param(value: &str, is_tail: bool) -> String {
    if is_tail {
        value
            .split('/')
            .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
            .collect::<Vec<_>>()
            .join("/")
    } else {
        utf8_percent_encode(value, PATH_SEGMENT).to_string()
    }
}

// =============================================================================
// FILTERS
// =============================================================================

fn linebreaks(value: &str) -> Value {
    let normalized = value.replace("\r\n", "\n").replace('\r', "\n");
    let html = PARAGRAPH_BREAK
        .split(normalized.trim_matches('\n'))
        .map(|paragraph| format!("<p>{}</p>", encode_quoted_attribute(paragraph).replace('\n', "<br />")))
        .collect::<Vec<_>>()
        .join("\n\n");
    Value::from_safe_string(html)
}

fn match_regex(value: &str, pattern: &str) -> std::result::Result<Value, Error> {
    let regex = Regex::new(pattern).map_err(|err| {
        Error::new(ErrorKind::InvalidOperation, format!("invalid pattern: {err}"))
    })?;

    let Some(captures) = regex.captures(value) else {
        return Ok(Value::from(()));
    };
    if regex.captures_len() > 1 {
        let groups: Vec<Value> = captures
            .iter()
            .skip(1)
            .map(|group| Value::from(group.map(|m| m.as_str().to_string())))
            .collect();
        Ok(Value::from(groups))
    } else {
        Ok(Value::from(true))
    }
}

// =============================================================================
// TESTS
// =============================================================================
