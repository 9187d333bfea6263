//! Catalogs: named collections of entries
//!
//! Reader entries live in `entries`, data entries in `data`, both keyed by
//! token. Inserting a reader hoists every data type description nested in it
//! into `data` and leaves a `{data(token)}` reference in its place, so one
//! data entry can be shared (and parameterized) across readers.
//!
//! Getting a reader back resolves the entry's parameters, inlines the
//! referenced data entries (whose own parameters take precedence over the
//! ones they inherit), and rebuilds the pipeline. Nothing is cached.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::BTreeMap;

use crate::datatypes::DataType;
use crate::entry::{describe, description_parts, Entry, EntryKind, ToEntry};
use crate::error::{ReaderError, ReaderResult};
use crate::node::{substitute_kwargs, Kwargs, Node, CLASS_KEY};
use crate::readers::Reader;
use crate::value::Value;

/// Nesting limit when following data references
const MAX_REF_DEPTH: usize = 32;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Reader entries by token
    #[serde(default)]
    entries: BTreeMap<String, Entry>,

    /// Data entries by token
    #[serde(default)]
    data: BTreeMap<String, Entry>,

    /// User-facing names to tokens
    #[serde(default)]
    aliases: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    metadata: Kwargs,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store under a generated token and return it
    pub fn add_entry(&mut self, item: &impl ToEntry) -> ReaderResult<String> {
        let mut entry = item.to_entry();
        if entry.kind().is_data() {
            return self.store_data(entry);
        }
        let mut kwargs = Node::Map(entry.kwargs().clone());
        self.hoist(&mut kwargs)?;
        if let Node::Map(kwargs) = kwargs {
            entry = entry.with_kwargs(kwargs);
        }
        let token = entry.tokenize()?;
        tracing::debug!(token = %token, cls = %entry.kind(), "adding catalog entry");
        self.entries.insert(token.clone(), entry);
        Ok(token)
    }

    /// Store under `name`
    ///
    /// The entry previously stored under `name` is dropped unless another
    /// name still refers to it.
    pub fn insert(&mut self, name: &str, item: &impl ToEntry) -> ReaderResult<String> {
        let token = self.add_entry(item)?;
        tracing::debug!(name, token = %token, "aliasing catalog entry");
        if let Some(previous) = self.aliases.insert(name.to_string(), token.clone()) {
            if previous != token {
                self.release(&previous);
            }
        }
        Ok(token)
    }

    /// Drop the entry under `token` once nothing refers to it, returning it
    ///
    /// Data entries stay while any stored entry still references them.
    fn release(&mut self, token: &str) -> Option<Entry> {
        if self.aliases.values().any(|t| t == token) {
            return None;
        }
        if let Some(entry) = self.entries.remove(token) {
            tracing::debug!(token, "dropping unreferenced catalog entry");
            return Some(entry);
        }
        let referenced = self
            .entries
            .values()
            .chain(self.data.values())
            .any(|entry| entry.kwargs().values().any(|node| node.refers_to(token)));
        if referenced {
            return None;
        }
        self.data.remove(token)
    }

    fn store_data(&mut self, entry: Entry) -> ReaderResult<String> {
        let token = entry.tokenize()?;
        if !self.data.contains_key(&token) {
            tracing::debug!(token = %token, cls = %entry.kind(), "adding data entry");
            self.data.insert(token.clone(), entry);
        }
        Ok(token)
    }

    /// Replace nested data type descriptions with references, innermost first
    fn hoist(&mut self, node: &mut Node) -> ReaderResult<()> {
        let hoisted = match node {
            Node::Seq(items) => {
                for item in items.iter_mut() {
                    self.hoist(item)?;
                }
                None
            }
            Node::Map(map) => {
                for (key, value) in map.iter_mut() {
                    if key != CLASS_KEY {
                        self.hoist(value)?;
                    }
                }
                match description_parts(map) {
                    Ok((kind @ EntryKind::Data(_), kwargs)) => Some(Entry::new(kind, kwargs.clone())),
                    _ => None,
                }
            }
            _ => None,
        };
        if let Some(entry) = hoisted {
            *node = Node::DataRef(self.store_data(entry)?);
        }
        Ok(())
    }

    /// Token for an alias, or the token itself if it names an entry
    pub fn token(&self, name: &str) -> ReaderResult<&str> {
        if let Some(token) = self.aliases.get(name) {
            return Ok(token);
        }
        self.entries
            .get_key_value(name)
            .or_else(|| self.data.get_key_value(name))
            .map(|(token, _)| token.as_str())
            .ok_or_else(|| ReaderError::EntryNotFound(name.to_string()))
    }

    /// Entry by alias or token, reader entries first
    pub fn get_entry(&self, name: &str) -> ReaderResult<&Entry> {
        let token = self.token(name)?;
        self.entries
            .get(token)
            .or_else(|| self.data.get(token))
            .ok_or_else(|| ReaderError::EntryNotFound(name.to_string()))
    }

    pub fn get_entry_mut(&mut self, name: &str) -> ReaderResult<&mut Entry> {
        let token = self.token(name)?.to_string();
        match self.entries.get_mut(&token) {
            Some(entry) => Ok(entry),
            None => self
                .data
                .get_mut(&token)
                .ok_or_else(|| ReaderError::EntryNotFound(name.to_string())),
        }
    }

    pub fn data_entry_mut(&mut self, token: &str) -> ReaderResult<&mut Entry> {
        self.data
            .get_mut(token)
            .ok_or_else(|| ReaderError::DataRefNotFound(token.to_string()))
    }

    pub fn entries(&self) -> &BTreeMap<String, Entry> {
        &self.entries
    }

    pub fn data(&self) -> &BTreeMap<String, Entry> {
        &self.data
    }

    pub fn metadata(&self) -> &Kwargs {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Kwargs {
        &mut self.metadata
    }

    /// Aliased names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.aliases.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len() + self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.data.is_empty()
    }

    /// Remove a name, or an entry by token
    ///
    /// Removing a name drops only that alias; its entry goes too once no
    /// other name refers to it. Removing a token drops the entry and every
    /// alias pointing at it. Data entries referenced by a removed entry are
    /// kept.
    pub fn remove(&mut self, name: &str) -> ReaderResult<Entry> {
        if let Some(token) = self.aliases.remove(name) {
            let entry = self.get_entry(&token).ok().cloned();
            self.release(&token);
            return entry.ok_or(ReaderError::EntryNotFound(token));
        }
        let token = self.token(name)?.to_string();
        self.aliases.retain(|_, t| *t != token);
        let removed = match self.entries.remove(&token) {
            Some(entry) => Some(entry),
            None => self.data.remove(&token),
        };
        removed.ok_or_else(|| ReaderError::EntryNotFound(name.to_string()))
    }

    /// Rebuild the reader stored under `name`
    pub fn get(&self, name: &str) -> ReaderResult<Reader> {
        let entry = self.get_entry(name)?;
        if entry.kind().is_data() {
            return Err(ReaderError::InvalidEntry(format!(
                "'{}' is a data entry ({})",
                name,
                entry.kind()
            )));
        }
        entry.reader_from_kwargs(&self.resolve(entry, &Kwargs::new())?)
    }

    /// Rebuild the data type stored under `name`; reader entries yield `ReaderData`
    pub fn get_data(&self, name: &str) -> ReaderResult<DataType> {
        let entry = self.get_entry(name)?;
        entry.data_from_kwargs(&self.resolve(entry, &Kwargs::new())?)
    }

    pub fn read(&self, name: &str) -> ReaderResult<Value> {
        self.get(name)?.read()
    }

    pub fn discover(&self, name: &str) -> ReaderResult<Value> {
        self.get(name)?.discover()
    }

    /// An entry's kwargs with parameters substituted and data references inlined
    fn resolve(&self, entry: &Entry, inherited: &Kwargs) -> ReaderResult<Kwargs> {
        let mut values = inherited.clone();
        values.extend(entry.parameter_values()?);
        let kwargs = substitute_kwargs(entry.kwargs(), &values)?;
        kwargs
            .into_iter()
            .map(|(key, node)| Ok((key, self.inline_refs(node, &values, 0)?)))
            .collect()
    }

    fn inline_refs(&self, node: Node, values: &Kwargs, depth: usize) -> ReaderResult<Node> {
        if depth > MAX_REF_DEPTH {
            return Err(ReaderError::InvalidEntry(
                "data references nest too deeply".to_string(),
            ));
        }
        match node {
            Node::DataRef(token) => {
                let entry = self
                    .data
                    .get(&token)
                    .ok_or(ReaderError::DataRefNotFound(token))?;
                let mut scoped = values.clone();
                scoped.extend(entry.parameter_values()?);
                let kwargs = substitute_kwargs(entry.kwargs(), &scoped)?
                    .into_iter()
                    .map(|(key, node)| Ok((key, self.inline_refs(node, &scoped, depth + 1)?)))
                    .collect::<ReaderResult<Kwargs>>()?;
                Ok(describe(entry.kind(), kwargs))
            }
            Node::Seq(items) => Ok(Node::Seq(
                items
                    .into_iter()
                    .map(|item| self.inline_refs(item, values, depth))
                    .collect::<ReaderResult<_>>()?,
            )),
            Node::Map(map) => Ok(Node::Map(
                map.into_iter()
                    .map(|(key, value)| Ok((key, self.inline_refs(value, values, depth)?)))
                    .collect::<ReaderResult<_>>()?,
            )),
            other => Ok(other),
        }
    }

    pub fn to_dict(&self) -> ReaderResult<Json> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_dict(value: Json) -> ReaderResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json_string(&self) -> ReaderResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_str(text: &str) -> ReaderResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
