//! The kwargs tree captured by entries
//!
//! A [`Node`] is a JSON-like tree with two extra leaves: `Placeholder(name)`,
//! written `{name}` and filled from a user parameter at materialization time,
//! and `DataRef(token)`, written `{data(token)}` and pointing at a data entry
//! of the catalog that owns the tree.
//!
//! Literal strings that would read back as one of those tokens (or that
//! already start with `{{`) get one extra leading `{` in the JSON form.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value as Json};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ReaderError, ReaderResult};

/// Keyword arguments, ordered by key
pub type Kwargs = BTreeMap<String, Node>;

/// Key naming the class of a nested description; never rewritten by extraction
pub const CLASS_KEY: &str = "cls";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Json", into = "Json")]
pub enum Node {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Seq(Vec<Node>),
    Map(Kwargs),
    Placeholder(String),
    DataRef(String),
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Non-empty segments of a dotted path
pub(crate) fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').filter(|segment| !segment.is_empty())
}

pub(crate) fn path_not_found(path: &str, segment: &str) -> ReaderError {
    ReaderError::PathNotFound {
        path: path.to_string(),
        segment: segment.to_string(),
    }
}

/// Whether a literal string would be misread as a token in the JSON form
fn needs_escape(s: &str) -> bool {
    s.starts_with("{{") || (s.starts_with('{') && !matches!(Node::from_text(s), Node::Str(_)))
}

/// Template text for a parameter placeholder
pub fn placeholder_text(name: &str) -> String {
    format!("{{{}}}", name)
}

impl Node {
    pub fn placeholder(name: impl Into<String>) -> Self {
        Node::Placeholder(name.into())
    }

    /// Interpret a string of the JSON form, recognizing whole-string
    /// placeholders and data references
    pub fn from_text(text: &str) -> Self {
        if text.starts_with("{{") {
            return Node::Str(text[1..].to_string());
        }
        if let Some(inner) = text.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
            if let Some(token) = inner.strip_prefix("data(").and_then(|t| t.strip_suffix(')')) {
                if !token.is_empty() {
                    return Node::DataRef(token.to_string());
                }
            }
            if is_identifier(inner) {
                return Node::Placeholder(inner.to_string());
            }
        }
        Node::Str(text.to_string())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Node::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Node::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Node]> {
        match self {
            Node::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Kwargs> {
        match self {
            Node::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Child at one path segment: a map key or a sequence index
    pub fn child(&self, segment: &str) -> Option<&Node> {
        match self {
            Node::Map(map) => map.get(segment),
            Node::Seq(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// Navigate a dotted path of map keys and sequence indices
    ///
    /// Empty segments are skipped, so `""` is the node itself.
    pub fn descend(&self, path: &str) -> ReaderResult<&Node> {
        self.descend_segments(path, path_segments(path))
    }

    /// Follow `segments` of `path`, reporting the first one that is missing
    pub(crate) fn descend_segments<'a, 'p>(
        &'a self,
        path: &str,
        segments: impl Iterator<Item = &'p str>,
    ) -> ReaderResult<&'a Node> {
        let mut current = self;
        for segment in segments {
            current = current
                .child(segment)
                .ok_or_else(|| path_not_found(path, segment))?;
        }
        Ok(current)
    }

    /// Replace every occurrence of `value` with the placeholder `{name}`
    ///
    /// Equal nodes are replaced whole. When `value` is a string, strings that
    /// contain it have each occurrence rewritten in place. Returns the number
    /// of occurrences replaced.
    pub fn replace_occurrences(&mut self, value: &Node, name: &str) -> usize {
        if self == value {
            *self = Node::Placeholder(name.to_string());
            return 1;
        }
        match self {
            Node::Str(s) => match value {
                Node::Str(v) if !v.is_empty() && s.contains(v.as_str()) => {
                    let count = s.matches(v.as_str()).count();
                    *s = s.replace(v.as_str(), &placeholder_text(name));
                    count
                }
                _ => 0,
            },
            Node::Seq(items) => items
                .iter_mut()
                .map(|item| item.replace_occurrences(value, name))
                .sum(),
            Node::Map(map) => map
                .iter_mut()
                .filter(|(k, _)| k.as_str() != CLASS_KEY)
                .map(|(_, v)| v.replace_occurrences(value, name))
                .sum(),
            _ => 0,
        }
    }

    /// Fill placeholders from `values`
    ///
    /// A whole-node placeholder takes the parameter's value as-is; templates
    /// embedded in longer strings take its display form.
    pub fn substitute(&self, values: &Kwargs) -> ReaderResult<Node> {
        match self {
            Node::Placeholder(name) => values
                .get(name)
                .cloned()
                .ok_or_else(|| ReaderError::UnresolvedPlaceholder(name.clone())),
            Node::Str(s) if s.contains('{') => {
                let mut out = s.clone();
                for (name, value) in values {
                    let token = placeholder_text(name);
                    if out.contains(&token) {
                        out = out.replace(&token, &value.to_string());
                    }
                }
                Ok(Node::Str(out))
            }
            Node::Seq(items) => Ok(Node::Seq(
                items
                    .iter()
                    .map(|item| item.substitute(values))
                    .collect::<ReaderResult<_>>()?,
            )),
            Node::Map(map) => Ok(Node::Map(substitute_kwargs(map, values)?)),
            other => Ok(other.clone()),
        }
    }

    /// Whether a `{data(token)}` reference appears anywhere in the tree
    pub fn refers_to(&self, token: &str) -> bool {
        match self {
            Node::DataRef(t) => t == token,
            Node::Seq(items) => items.iter().any(|item| item.refers_to(token)),
            Node::Map(map) => map.values().any(|value| value.refers_to(token)),
            _ => false,
        }
    }

    /// Count placeholders named `name` anywhere in the tree
    pub fn count_placeholders(&self, name: &str) -> usize {
        match self {
            Node::Placeholder(n) => usize::from(n == name),
            Node::Str(s) => s.matches(&placeholder_text(name)).count(),
            Node::Seq(items) => items.iter().map(|i| i.count_placeholders(name)).sum(),
            Node::Map(map) => map.values().map(|v| v.count_placeholders(name)).sum(),
            _ => 0,
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Node::Null, Node::Null) => true,
            (Node::Bool(a), Node::Bool(b)) => a == b,
            (Node::Int(a), Node::Int(b)) => a == b,
            // NaN arguments compare equal to themselves
            (Node::Float(a), Node::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Node::Str(a), Node::Str(b)) => a == b,
            (Node::Seq(a), Node::Seq(b)) => a == b,
            (Node::Map(a), Node::Map(b)) => a == b,
            (Node::Placeholder(a), Node::Placeholder(b)) => a == b,
            (Node::DataRef(a), Node::DataRef(b)) => a == b,
            _ => false,
        }
    }
}

pub(crate) fn substitute_kwargs(map: &Kwargs, values: &Kwargs) -> ReaderResult<Kwargs> {
    map.iter()
        .map(|(k, v)| Ok((k.clone(), v.substitute(values)?)))
        .collect()
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Null => f.write_str("null"),
            Node::Bool(v) => write!(f, "{}", v),
            Node::Int(v) => write!(f, "{}", v),
            Node::Float(v) => write!(f, "{}", v),
            Node::Str(s) => f.write_str(s),
            Node::Placeholder(name) => f.write_str(&placeholder_text(name)),
            Node::DataRef(token) => write!(f, "{{data({})}}", token),
            Node::Seq(_) | Node::Map(_) => write!(f, "{}", Json::from(self.clone())),
        }
    }
}

impl From<Json> for Node {
    fn from(value: Json) -> Self {
        match value {
            Json::Null => Node::Null,
            Json::Bool(b) => Node::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Node::Int(i),
                None => Node::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Node::from_text(&s),
            Json::Array(items) => Node::Seq(items.into_iter().map(Node::from).collect()),
            Json::Object(map) => Node::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect()),
        }
    }
}

impl From<Node> for Json {
    fn from(node: Node) -> Self {
        match node {
            Node::Null => Json::Null,
            Node::Bool(b) => Json::Bool(b),
            Node::Int(i) => Json::Number(i.into()),
            Node::Float(f) => Number::from_f64(f).map_or(Json::Null, Json::Number),
            Node::Str(s) if needs_escape(&s) => Json::String(format!("{{{}", s)),
            Node::Str(s) => Json::String(s),
            Node::Placeholder(_) | Node::DataRef(_) => Json::String(node.to_string()),
            Node::Seq(items) => Json::Array(items.into_iter().map(Json::from).collect()),
            Node::Map(map) => Json::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Json::from(v)))
                    .collect::<Map<_, _>>(),
            ),
        }
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::Str(value.to_string())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::Str(value)
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Node::Int(value)
    }
}

impl From<i32> for Node {
    fn from(value: i32) -> Self {
        Node::Int(value.into())
    }
}

impl From<usize> for Node {
    fn from(value: usize) -> Self {
        Node::Int(value as i64)
    }
}

impl From<f64> for Node {
    fn from(value: f64) -> Self {
        Node::Float(value)
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Node::Bool(value)
    }
}

impl From<Kwargs> for Node {
    fn from(value: Kwargs) -> Self {
        Node::Map(value)
    }
}

impl<T: Into<Node>> From<Vec<T>> for Node {
    fn from(value: Vec<T>) -> Self {
        Node::Seq(value.into_iter().map(Into::into).collect())
    }
}

/// Build [`Kwargs`] from `key => value` pairs
#[macro_export]
macro_rules! kwargs {
    () => { $crate::Kwargs::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::Kwargs::new();
        $( map.insert($key.to_string(), ::core::convert::Into::<$crate::Node>::into($value)); )+
        map
    }};
}
