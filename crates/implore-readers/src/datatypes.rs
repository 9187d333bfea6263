//! Data type descriptors
//!
//! A [`DataType`] says where raw data lives and how to open it; it never
//! opens anything itself until a reader materializes it.

use implore_frame::storage::{self, ByteStream};

use crate::entry::{describe, parse_description, EntryKind};
use crate::error::{ReaderError, ReaderResult};
use crate::kwargs;
use crate::node::{Kwargs, Node};
use crate::readers::Reader;

/// Location of a file-like resource plus the options its storage needs
#[derive(Debug, Clone, PartialEq)]
pub struct FileData {
    pub url: String,
    pub storage_options: Kwargs,
}

impl FileData {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            storage_options: Kwargs::new(),
        }
    }

    /// Open the resource, handing the storage options to its backend
    pub fn open(&self) -> ReaderResult<ByteStream> {
        Ok(storage::open_with_options(&self.url, &self.option_pairs()?)?)
    }

    /// Storage options as the string pairs backends are configured with
    fn option_pairs(&self) -> ReaderResult<Vec<(String, String)>> {
        self.storage_options
            .iter()
            .map(|(key, value)| match value {
                Node::Str(_) | Node::Bool(_) | Node::Int(_) | Node::Float(_) => {
                    Ok((key.clone(), value.to_string()))
                }
                other => Err(ReaderError::invalid_argument(
                    "storage_options",
                    format!("'{}' must be a scalar, got {}", key, other),
                )),
            })
            .collect()
    }

    fn to_kwargs(&self) -> Kwargs {
        kwargs! {
            "url" => self.url.as_str(),
            "storage_options" => self.storage_options.clone(),
        }
    }

    fn from_kwargs(name: &str, kwargs: &Kwargs) -> ReaderResult<Self> {
        let url = kwargs
            .get("url")
            .and_then(Node::as_str)
            .ok_or_else(|| ReaderError::InvalidEntry(format!("{} requires a string 'url'", name)))?;
        let storage_options = match kwargs.get("storage_options") {
            None | Some(Node::Null) => Kwargs::new(),
            Some(Node::Map(map)) => map.clone(),
            Some(other) => {
                return Err(ReaderError::InvalidEntry(format!(
                    "storage_options must be a mapping, got {}",
                    other
                )))
            }
        };
        Ok(Self {
            url: url.to_string(),
            storage_options,
        })
    }
}

/// Immutable description of a raw data resource
#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    /// Comma-separated values
    Csv(FileData),
    /// An opaque file, read as bytes
    Bytes(FileData),
    /// The output of another reader
    ReaderData(Box<Reader>),
}

impl DataType {
    pub fn csv(url: impl Into<String>) -> Self {
        DataType::Csv(FileData::new(url))
    }

    pub fn bytes(url: impl Into<String>) -> Self {
        DataType::Bytes(FileData::new(url))
    }

    /// Lift a reader's output into a data type
    pub fn reader_data(reader: Reader) -> Self {
        DataType::ReaderData(Box::new(reader))
    }

    /// Attach storage options; no effect on `ReaderData`
    pub fn with_storage_options(mut self, options: Kwargs) -> Self {
        if let DataType::Csv(file) | DataType::Bytes(file) = &mut self {
            file.storage_options = options;
        }
        self
    }

    /// Name used in entry class tags
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Csv(_) => "csv",
            DataType::Bytes(_) => "bytes",
            DataType::ReaderData(_) => "reader_data",
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            DataType::Csv(file) | DataType::Bytes(file) => Some(&file.url),
            DataType::ReaderData(_) => None,
        }
    }

    pub fn file(&self) -> Option<&FileData> {
        match self {
            DataType::Csv(file) | DataType::Bytes(file) => Some(file),
            DataType::ReaderData(_) => None,
        }
    }

    /// Constructor arguments, as captured by an entry
    pub fn to_kwargs(&self) -> Kwargs {
        match self {
            DataType::Csv(file) | DataType::Bytes(file) => file.to_kwargs(),
            DataType::ReaderData(reader) => kwargs! { "reader" => reader.to_node() },
        }
    }

    pub fn from_kwargs(name: &str, kwargs: &Kwargs) -> ReaderResult<Self> {
        match name {
            "csv" => Ok(DataType::Csv(FileData::from_kwargs(name, kwargs)?)),
            "bytes" => Ok(DataType::Bytes(FileData::from_kwargs(name, kwargs)?)),
            "reader_data" => {
                let reader = kwargs.get("reader").ok_or_else(|| {
                    ReaderError::InvalidEntry("reader_data requires 'reader'".to_string())
                })?;
                Ok(DataType::reader_data(Reader::from_node(reader)?))
            }
            other => Err(ReaderError::UnknownClass(format!("datatype/{}", other))),
        }
    }

    /// Nested description used inside reader kwargs
    pub fn to_node(&self) -> Node {
        describe(&EntryKind::Data(self.name().to_string()), self.to_kwargs())
    }

    pub fn from_node(node: &Node) -> ReaderResult<Self> {
        if let Node::DataRef(token) = node {
            return Err(ReaderError::DataRefNotFound(token.clone()));
        }
        match parse_description(node)? {
            (EntryKind::Data(name), kwargs) => Self::from_kwargs(&name, kwargs),
            (EntryKind::Reader(name), _) => Err(ReaderError::InvalidEntry(format!(
                "expected a data type, found reader/{}",
                name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality() {
        assert_eq!(DataType::csv("memory://a"), DataType::csv("memory://a"));
        assert_ne!(DataType::csv("memory://a"), DataType::bytes("memory://a"));
    }

    #[test]
    fn test_node_round_trip() {
        let data = DataType::csv("memory://a")
            .with_storage_options(kwargs! { "anon" => true });
        let node = data.to_node();
        assert_eq!(node.descend("cls").unwrap(), &Node::from("datatype/csv"));
        assert_eq!(node.descend("kwargs.url").unwrap(), &Node::from("memory://a"));
        assert_eq!(DataType::from_node(&node).unwrap(), data);
    }

    #[test]
    fn test_storage_options_reach_the_backend() {
        implore_frame::storage::pipe("/datatypes-test/options.csv", "a\n1\n").unwrap();
        let plain = FileData::new("memory://datatypes-test/options.csv");
        assert!(plain.open().is_ok());

        let mut with_options = plain.clone();
        with_options.storage_options = kwargs! { "anon" => false, "nonsense" => "x" };
        let err = with_options.open().err().unwrap();
        assert!(matches!(
            err,
            ReaderError::Frame(implore_frame::FrameError::InvalidStorageOption { .. })
        ));
        assert_eq!(err.class(), crate::ErrorClass::ValueError);

        with_options.storage_options = kwargs! { "nested" => Kwargs::new() };
        assert!(matches!(
            with_options.open(),
            Err(ReaderError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_reader_data_round_trip() {
        let data = DataType::reader_data(Reader::frame_csv(DataType::csv("memory://a")));
        assert_eq!(DataType::from_node(&data.to_node()).unwrap(), data);
        assert_eq!(data.url(), None);
    }

    #[test]
    fn test_missing_url() {
        let err = DataType::from_kwargs("csv", &Kwargs::new()).unwrap_err();
        assert!(matches!(err, ReaderError::InvalidEntry(_)));
        assert!(matches!(
            DataType::from_kwargs("hdf5", &Kwargs::new()),
            Err(ReaderError::UnknownClass(_))
        ));
    }

    #[test]
    fn test_unresolved_data_ref() {
        let err = DataType::from_node(&Node::DataRef("abc".into())).unwrap_err();
        assert!(matches!(err, ReaderError::DataRefNotFound(t) if t == "abc"));
    }
}
