//! Readers: immutable, chainable descriptions of deferred pipelines
//!
//! Every chaining method returns a new [`Reader`] with one [`Step`] appended;
//! nothing is opened or computed until [`Reader::read`] or
//! [`Reader::discover`].
//!
//! # Example
//!
//! ```ignore
//! let reader = Reader::frame_csv(DataType::csv("memory://data"));
//! let pipeline = reader.get_item(vec!["apple", "beet"]).set_index("beet");
//! let frame = pipeline.read()?;
//! ```

use implore_frame::csv_reader::{self, CsvOptions};
use std::io::{Cursor, Read};

use crate::config;
use crate::datatypes::DataType;
use crate::entry::{describe, parse_description, EntryKind};
use crate::error::{ReaderError, ReaderResult};
use crate::kwargs;
use crate::namespace::{Namespace, NamespaceProxy};
use crate::node::{Kwargs, Node};
use crate::retry::Retry;
use crate::step::Step;
use crate::value::Value;

const DATA_KEY: &str = "data";
const STEPS_KEY: &str = "steps";

/// What a reader reads, before any steps
#[derive(Debug, Clone, PartialEq)]
pub enum ReaderKind {
    /// CSV into a data frame
    FrameCsv { data: DataType, options: Kwargs },
    /// Raw bytes of a file
    FileBytes { data: DataType },
    /// Whether two readers produce equal output
    Equals { reader: Box<Reader>, other: Box<Reader> },
    /// Re-reads an upstream reader on allow-listed failures
    Retry(Retry),
    /// A literal value stored in a catalog
    Literal { value: Node },
}

/// A deferred pipeline: a source plus ordered steps
#[derive(Debug, Clone, PartialEq)]
pub struct Reader {
    kind: ReaderKind,
    steps: Vec<Step>,
}

fn csv_options(options: &Kwargs) -> ReaderResult<CsvOptions> {
    let mut csv = CsvOptions::default();
    for (key, value) in options {
        match (key.as_str(), value) {
            ("delimiter", Node::Str(d)) if d.len() == 1 => csv.delimiter = d.as_bytes()[0],
            ("has_headers", Node::Bool(b)) => csv.has_headers = *b,
            (key, value) => {
                return Err(ReaderError::invalid_argument(
                    "frame_csv",
                    format!("unsupported option {}={}", key, value),
                ))
            }
        }
    }
    Ok(csv)
}

impl Reader {
    pub fn new(kind: ReaderKind) -> Self {
        Self {
            kind,
            steps: Vec::new(),
        }
    }

    /// Read CSV data into a frame
    pub fn frame_csv(data: DataType) -> Self {
        Self::new(ReaderKind::FrameCsv {
            data,
            options: Kwargs::new(),
        })
    }

    /// Read CSV data with parser options (`delimiter`, `has_headers`)
    pub fn frame_csv_with(data: DataType, options: Kwargs) -> ReaderResult<Self> {
        csv_options(&options)?;
        Ok(Self::new(ReaderKind::FrameCsv { data, options }))
    }

    pub fn file_bytes(data: DataType) -> Self {
        Self::new(ReaderKind::FileBytes { data })
    }

    pub fn literal(value: impl Into<Node>) -> Self {
        Self::new(ReaderKind::Literal {
            value: value.into(),
        })
    }

    pub fn kind(&self) -> &ReaderKind {
        &self.kind
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Name used in entry class tags
    pub fn name(&self) -> &'static str {
        match &self.kind {
            ReaderKind::FrameCsv { .. } => "frame_csv",
            ReaderKind::FileBytes { .. } => "file_bytes",
            ReaderKind::Equals { .. } => "equals",
            ReaderKind::Retry(_) => "retry",
            ReaderKind::Literal { .. } => "literal",
        }
    }

    /// Namespaces that can be chained off this reader
    pub fn namespaces(&self) -> Vec<Namespace> {
        match &self.kind {
            ReaderKind::FrameCsv { .. } | ReaderKind::Literal { .. } => vec![Namespace::Np],
            ReaderKind::FileBytes { .. } | ReaderKind::Equals { .. } => Vec::new(),
            ReaderKind::Retry(retry) => retry.upstream().namespaces(),
        }
    }

    /// A copy of this reader with `step` appended
    pub fn with_step(&self, step: Step) -> Reader {
        let mut steps = self.steps.clone();
        steps.push(step);
        Reader {
            kind: self.kind.clone(),
            steps,
        }
    }

    /// Subscript: a column name, or a list of names
    pub fn get_item(&self, key: impl Into<Node>) -> Reader {
        self.with_step(Step::get_item(key))
    }

    /// Column selection; same step as `get_item`
    pub fn select(&self, columns: impl Into<Node>) -> Reader {
        self.get_item(columns)
    }

    pub fn set_index(&self, keys: impl Into<Node>) -> Reader {
        self.with_step(Step::new("set_index", Vec::new(), kwargs! { "keys" => keys }))
    }

    pub fn reset_index(&self) -> Reader {
        self.with_step(Step::new("reset_index", Vec::new(), Kwargs::new()))
    }

    pub fn head(&self, n: usize) -> Reader {
        self.with_step(Step::new("head", Vec::new(), kwargs! { "n" => n }))
    }

    pub fn tail(&self, n: usize) -> Reader {
        self.with_step(Step::new("tail", Vec::new(), kwargs! { "n" => n }))
    }

    pub fn drop(&self, columns: impl Into<Node>) -> Reader {
        self.with_step(Step::new("drop", Vec::new(), kwargs! { "columns" => columns }))
    }

    /// Apply a registered function with extra positional arguments
    pub fn apply(&self, function: &str, args: Vec<Node>) -> Reader {
        self.apply_with(function, args, Kwargs::new())
    }

    pub fn apply_with(&self, function: &str, args: Vec<Node>, kwargs: Kwargs) -> Reader {
        self.with_step(Step::apply(function, args, kwargs))
    }

    /// Call an arbitrary engine method by name
    ///
    /// Names containing `.` or reserved for other step kinds are rejected.
    pub fn method(&self, name: &str, args: Vec<Node>, kwargs: Kwargs) -> ReaderResult<Reader> {
        if name.is_empty()
            || name.contains('.')
            || name == crate::step::GETITEM
            || name == crate::step::APPLY
        {
            return Err(ReaderError::invalid_argument(
                "method",
                format!("'{}' is not a method name", name),
            ));
        }
        Ok(self.with_step(Step::new(name, args, kwargs)))
    }

    /// Access a namespace by name
    pub fn namespace(&self, name: &str) -> ReaderResult<NamespaceProxy> {
        let available = self.namespaces();
        match Namespace::from_name(name) {
            Ok(ns) if available.contains(&ns) => Ok(NamespaceProxy::new(self.clone(), ns)),
            _ => Err(ReaderError::UnknownNamespace {
                namespace: name.to_string(),
                available: available.iter().map(|ns| ns.name().to_string()).collect(),
            }),
        }
    }

    /// The numerics namespace
    pub fn np(&self) -> ReaderResult<NamespaceProxy> {
        self.namespace(Namespace::Np.name())
    }

    /// A reader yielding whether this reader and `other` produce equal output
    pub fn equals(&self, other: &Reader) -> Reader {
        Reader::new(ReaderKind::Equals {
            reader: Box::new(self.clone()),
            other: Box::new(other.clone()),
        })
    }

    /// Lift this reader's output into a data type
    pub fn to_data(&self) -> DataType {
        DataType::reader_data(self.clone())
    }

    /// Materialize the source and apply every step
    pub fn read(&self) -> ReaderResult<Value> {
        self.execute(None)
    }

    /// Like `read`, over a preview limited to the configured number of rows
    pub fn discover(&self) -> ReaderResult<Value> {
        self.discover_rows(config::current().discover_rows())
    }

    pub fn discover_rows(&self, rows: usize) -> ReaderResult<Value> {
        self.execute(Some(rows))
    }

    pub(crate) fn execute(&self, limit: Option<usize>) -> ReaderResult<Value> {
        tracing::debug!(
            reader = self.name(),
            steps = self.steps.len(),
            ?limit,
            "executing pipeline"
        );
        let mut value = self.materialize(limit)?;
        for step in &self.steps {
            value = step.run(value)?;
        }
        Ok(value)
    }

    fn materialize(&self, limit: Option<usize>) -> ReaderResult<Value> {
        match &self.kind {
            ReaderKind::FrameCsv { data, options } => {
                let mut csv = csv_options(options)?;
                csv.nrows = limit;
                match data {
                    DataType::Csv(file) | DataType::Bytes(file) => {
                        Ok(Value::Frame(csv_reader::read_csv(file.open()?, &csv)?))
                    }
                    DataType::ReaderData(upstream) => match upstream.execute(limit)? {
                        Value::Bytes(bytes) => {
                            Ok(Value::Frame(csv_reader::read_csv(Cursor::new(bytes), &csv)?))
                        }
                        Value::Frame(df) => Ok(Value::Frame(df)),
                        other => Err(ReaderError::raised(
                            crate::ErrorClass::TypeError,
                            format!("cannot parse CSV from {}", other.type_name()),
                        )),
                    },
                }
            }
            ReaderKind::FileBytes { data } => match data {
                DataType::Csv(file) | DataType::Bytes(file) => {
                    let mut bytes = Vec::new();
                    file.open()?.read_to_end(&mut bytes).map_err(implore_frame::FrameError::from)?;
                    Ok(Value::Bytes(bytes))
                }
                DataType::ReaderData(upstream) => upstream.execute(limit),
            },
            ReaderKind::Equals { reader, other } => {
                let left = reader.execute(limit)?;
                let right = other.execute(limit)?;
                Ok(Value::from(left.equals(&right)))
            }
            ReaderKind::Retry(retry) => retry.run(limit),
            ReaderKind::Literal { value } => Ok(Value::from(value.clone())),
        }
    }

    /// Constructor arguments and steps, as captured by an entry
    pub fn to_kwargs(&self) -> Kwargs {
        let mut kwargs = match &self.kind {
            ReaderKind::FrameCsv { data, options } => {
                let mut kwargs = options.clone();
                kwargs.insert(DATA_KEY.to_string(), data.to_node());
                kwargs
            }
            ReaderKind::FileBytes { data } => kwargs! { DATA_KEY => data.to_node() },
            ReaderKind::Equals { reader, other } => kwargs! {
                "reader" => reader.to_node(),
                "other" => other.to_node(),
            },
            ReaderKind::Retry(retry) => retry.to_kwargs(),
            ReaderKind::Literal { value } => kwargs! { "value" => value.clone() },
        };
        kwargs.insert(
            STEPS_KEY.to_string(),
            Node::Seq(self.steps.iter().map(Step::to_node).collect()),
        );
        kwargs
    }

    pub fn from_kwargs(name: &str, kwargs: &Kwargs) -> ReaderResult<Self> {
        let required = |key: &str| {
            kwargs
                .get(key)
                .ok_or_else(|| ReaderError::InvalidEntry(format!("{} requires '{}'", name, key)))
        };
        let kind = match name {
            "frame_csv" => {
                let data = DataType::from_node(required(DATA_KEY)?)?;
                let options: Kwargs = kwargs
                    .iter()
                    .filter(|(k, _)| k.as_str() != DATA_KEY && k.as_str() != STEPS_KEY)
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                csv_options(&options)?;
                ReaderKind::FrameCsv { data, options }
            }
            "file_bytes" => ReaderKind::FileBytes {
                data: DataType::from_node(required(DATA_KEY)?)?,
            },
            "equals" => ReaderKind::Equals {
                reader: Box::new(Reader::from_node(required("reader")?)?),
                other: Box::new(Reader::from_node(required("other")?)?),
            },
            "retry" => ReaderKind::Retry(Retry::from_kwargs(kwargs)?),
            "literal" => ReaderKind::Literal {
                value: required("value")?.clone(),
            },
            other => return Err(ReaderError::UnknownClass(format!("reader/{}", other))),
        };
        let steps = match kwargs.get(STEPS_KEY) {
            None => Vec::new(),
            Some(Node::Seq(items)) => items
                .iter()
                .map(Step::from_node)
                .collect::<ReaderResult<_>>()?,
            Some(other) => {
                return Err(ReaderError::InvalidEntry(format!(
                    "steps must be a sequence, got {}",
                    other
                )))
            }
        };
        Ok(Reader { kind, steps })
    }

    /// Nested description used inside other kwargs
    pub fn to_node(&self) -> Node {
        describe(&EntryKind::Reader(self.name().to_string()), self.to_kwargs())
    }

    pub fn from_node(node: &Node) -> ReaderResult<Self> {
        match parse_description(node)? {
            (EntryKind::Reader(name), kwargs) => Self::from_kwargs(&name, kwargs),
            (EntryKind::Data(name), _) => Err(ReaderError::InvalidEntry(format!(
                "expected a reader, found datatype/{}",
                name
            ))),
        }
    }
}

impl From<Retry> for Reader {
    fn from(retry: Retry) -> Self {
        Reader::new(ReaderKind::Retry(retry))
    }
}
