//! Serializable, parameterizable descriptions of readers and data types.
//!
//! An [`Entry`] captures everything needed to rebuild a [`Reader`] or
//! [`DataType`]: its class and its constructor arguments (including the step
//! list) as a [`Node`] tree. Literal values anywhere in that tree can be
//! promoted to named [`Parameter`]s with [`Entry::extract_parameter`]; the
//! parameters' defaults are substituted back when the entry is materialized.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::datatypes::DataType;
use crate::error::{ReaderError, ReaderResult};
use crate::kwargs;
use crate::node::{substitute_kwargs, Kwargs, Node, CLASS_KEY};
use crate::readers::Reader;
use crate::retry::Retry;

const KWARGS_KEY: &str = "kwargs";
const DATA_PREFIX: &str = "datatype/";
const READER_PREFIX: &str = "reader/";

/// Class of the object an entry rebuilds
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EntryKind {
    /// A data type, by name (`csv`, `bytes`, `reader_data`)
    Data(String),
    /// A reader, by name (`frame_csv`, `retry`, ...)
    Reader(String),
}

impl EntryKind {
    /// Class tag, e.g. `datatype/csv`
    pub fn cls(&self) -> String {
        match self {
            EntryKind::Data(name) => format!("{}{}", DATA_PREFIX, name),
            EntryKind::Reader(name) => format!("{}{}", READER_PREFIX, name),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            EntryKind::Data(name) | EntryKind::Reader(name) => name,
        }
    }

    pub fn is_data(&self) -> bool {
        matches!(self, EntryKind::Data(_))
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cls())
    }
}

impl FromStr for EntryKind {
    type Err = ReaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match (s.strip_prefix(DATA_PREFIX), s.strip_prefix(READER_PREFIX)) {
            (Some(name), _) if !name.is_empty() => Ok(EntryKind::Data(name.to_string())),
            (_, Some(name)) if !name.is_empty() => Ok(EntryKind::Reader(name.to_string())),
            _ => Err(ReaderError::UnknownClass(s.to_string())),
        }
    }
}

impl TryFrom<String> for EntryKind {
    type Error = ReaderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EntryKind> for String {
    fn from(kind: EntryKind) -> Self {
        kind.cls()
    }
}

/// Nested description `{"cls": ..., "kwargs": {...}}`
pub(crate) fn describe(kind: &EntryKind, kwargs: Kwargs) -> Node {
    Node::Map(kwargs! {
        CLASS_KEY => kind.cls(),
        KWARGS_KEY => kwargs,
    })
}

/// Split a nested description into its class and kwargs
pub(crate) fn parse_description(node: &Node) -> ReaderResult<(EntryKind, &Kwargs)> {
    let map = node
        .as_map()
        .ok_or_else(|| ReaderError::InvalidEntry(format!("expected a description, got {}", node)))?;
    description_parts(map)
}

pub(crate) fn description_parts(map: &Kwargs) -> ReaderResult<(EntryKind, &Kwargs)> {
    let kind = map
        .get(CLASS_KEY)
        .and_then(Node::as_str)
        .ok_or_else(|| ReaderError::InvalidEntry(format!("description is missing '{}'", CLASS_KEY)))?
        .parse()?;
    let kwargs = map
        .get(KWARGS_KEY)
        .and_then(Node::as_map)
        .ok_or_else(|| ReaderError::InvalidEntry(format!("description is missing '{}'", KWARGS_KEY)))?;
    Ok((kind, kwargs))
}

/// A named value substituted into an entry at materialization time
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Placeholder name, as written in `{name}`
    pub name: String,

    /// Optional description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Literal default, or `env(VAR)` to read `VAR` when resolved
    pub default: Node,
}

impl Parameter {
    pub fn new(name: impl Into<String>, default: impl Into<Node>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            default: default.into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn set_default(&mut self, default: impl Into<Node>) {
        self.default = default.into();
    }

    /// Environment variable named by an `env(VAR)` default
    pub fn env_var(&self) -> Option<&str> {
        self.default
            .as_str()?
            .strip_prefix("env(")?
            .strip_suffix(')')
            .filter(|var| !var.is_empty())
    }

    /// The current value, performing any deferred lookup now
    pub fn resolve(&self) -> ReaderResult<Node> {
        match self.env_var() {
            Some(var) => {
                tracing::debug!(parameter = %self.name, var, "resolving parameter from environment");
                std::env::var(var)
                    .map(Node::Str)
                    .map_err(|_| ReaderError::MissingEnvVar(var.to_string()))
            }
            None => Ok(self.default.clone()),
        }
    }
}

/// Captured construction of a reader or data type
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(rename = "cls")]
    kind: EntryKind,

    kwargs: Kwargs,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    user_parameters: BTreeMap<String, Parameter>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    metadata: Kwargs,
}

impl Entry {
    pub fn new(kind: EntryKind, kwargs: Kwargs) -> Self {
        Self {
            kind,
            kwargs,
            user_parameters: BTreeMap::new(),
            metadata: Kwargs::new(),
        }
    }

    pub fn kind(&self) -> &EntryKind {
        &self.kind
    }

    pub fn kwargs(&self) -> &Kwargs {
        &self.kwargs
    }

    pub fn user_parameters(&self) -> &BTreeMap<String, Parameter> {
        &self.user_parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.user_parameters.get(name)
    }

    pub fn parameter_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.user_parameters.get_mut(name)
    }

    /// Change a parameter's default; `env(VAR)` defers to the environment
    pub fn set_default(&mut self, name: &str, default: impl Into<Node>) -> ReaderResult<()> {
        let parameter = self
            .user_parameters
            .get_mut(name)
            .ok_or_else(|| ReaderError::UnknownParameter(name.to_string()))?;
        parameter.set_default(default);
        Ok(())
    }

    pub fn metadata(&self) -> &Kwargs {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Kwargs {
        &mut self.metadata
    }

    /// Promote every occurrence of `value` to the parameter `name`
    ///
    /// Returns the number of occurrences rewritten. Fails without touching
    /// the entry if `name` is already a parameter. Only values below the
    /// kwargs map itself are candidates.
    pub fn extract_parameter(&mut self, name: &str, value: impl Into<Node>) -> ReaderResult<usize> {
        if self.user_parameters.contains_key(name) {
            return Err(ReaderError::DuplicateParameter(name.to_string()));
        }
        let value = value.into();
        let count = self
            .kwargs
            .iter_mut()
            .filter(|(key, _)| key.as_str() != CLASS_KEY)
            .map(|(_, node)| node.replace_occurrences(&value, name))
            .sum::<usize>();
        tracing::debug!(entry = %self.kind, parameter = name, count, "extracted parameter");
        self.user_parameters
            .insert(name.to_string(), Parameter::new(name, value));
        Ok(count)
    }

    /// Current value of every parameter
    pub fn parameter_values(&self) -> ReaderResult<Kwargs> {
        self.user_parameters
            .iter()
            .map(|(name, parameter)| Ok((name.clone(), parameter.resolve()?)))
            .collect()
    }

    /// Kwargs with every placeholder filled from the parameters
    pub fn resolved_kwargs(&self) -> ReaderResult<Kwargs> {
        substitute_kwargs(&self.kwargs, &self.parameter_values()?)
    }

    /// Rebuild the reader this entry describes
    pub fn to_reader(&self) -> ReaderResult<Reader> {
        self.reader_from_kwargs(&self.resolved_kwargs()?)
    }

    /// Rebuild the data type; a reader entry yields `ReaderData`
    pub fn to_data(&self) -> ReaderResult<DataType> {
        self.data_from_kwargs(&self.resolved_kwargs()?)
    }

    /// Same entry over different kwargs, keeping parameters and metadata
    pub(crate) fn with_kwargs(mut self, kwargs: Kwargs) -> Self {
        self.kwargs = kwargs;
        self
    }

    pub(crate) fn reader_from_kwargs(&self, kwargs: &Kwargs) -> ReaderResult<Reader> {
        match &self.kind {
            EntryKind::Reader(name) => Reader::from_kwargs(name, kwargs),
            EntryKind::Data(name) => Err(ReaderError::InvalidEntry(format!(
                "datatype/{} does not describe a reader",
                name
            ))),
        }
    }

    pub(crate) fn data_from_kwargs(&self, kwargs: &Kwargs) -> ReaderResult<DataType> {
        match &self.kind {
            EntryKind::Data(name) => DataType::from_kwargs(name, kwargs),
            EntryKind::Reader(_) => Ok(DataType::reader_data(self.reader_from_kwargs(kwargs)?)),
        }
    }

    pub fn to_dict(&self) -> ReaderResult<Json> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_dict(value: Json) -> ReaderResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Hex token derived from the dict form
    pub fn tokenize(&self) -> ReaderResult<String> {
        let text = serde_json::to_string(self)?;
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        Ok(format!("{:016x}", hasher.finish()))
    }
}

/// Conversion into a catalog entry
pub trait ToEntry {
    fn to_entry(&self) -> Entry;
}

impl ToEntry for Entry {
    fn to_entry(&self) -> Entry {
        self.clone()
    }
}

impl ToEntry for Reader {
    fn to_entry(&self) -> Entry {
        Entry::new(EntryKind::Reader(self.name().to_string()), self.to_kwargs())
    }
}

impl ToEntry for DataType {
    fn to_entry(&self) -> Entry {
        Entry::new(EntryKind::Data(self.name().to_string()), self.to_kwargs())
    }
}

impl ToEntry for Retry {
    fn to_entry(&self) -> Entry {
        Reader::from(self.clone()).to_entry()
    }
}
