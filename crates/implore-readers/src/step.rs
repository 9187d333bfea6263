//! Pipeline steps and their application to materialized values
//!
//! A step is `(operation, positional args, keyword args)`. It serializes as
//! the three-element sequence `[op, args, kwargs]`, which is what makes step
//! arguments addressable as `steps.<index>.<argpos>.<key>` in an entry.

use implore_frame::Scalar;

use crate::error::{ReaderError, ReaderResult};
use crate::functions;
use crate::namespace::Namespace;
use crate::node::{Kwargs, Node};
use crate::value::Value;

/// Operation name of subscript steps
pub const GETITEM: &str = "getitem";
/// Operation name of function application steps
pub const APPLY: &str = "apply";

/// What a step does, decoded from its operation name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation<'a> {
    GetItem,
    /// First positional argument names a registered function
    Apply,
    /// `<namespace>.<method>`
    Namespace { namespace: &'a str, method: &'a str },
    /// An engine method such as `set_index`
    Method(&'a str),
}

/// One deferred operation in a reader's pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub op: String,
    pub args: Vec<Node>,
    pub kwargs: Kwargs,
}

impl Step {
    pub fn new(op: impl Into<String>, args: Vec<Node>, kwargs: Kwargs) -> Self {
        Self {
            op: op.into(),
            args,
            kwargs,
        }
    }

    pub fn get_item(key: impl Into<Node>) -> Self {
        Self::new(GETITEM, vec![key.into()], Kwargs::new())
    }

    pub fn apply(function: &str, mut args: Vec<Node>, kwargs: Kwargs) -> Self {
        args.insert(0, Node::from(function));
        Self::new(APPLY, args, kwargs)
    }

    pub fn operation(&self) -> Operation<'_> {
        match self.op.as_str() {
            GETITEM => Operation::GetItem,
            APPLY => Operation::Apply,
            op => match op.split_once('.') {
                Some((namespace, method)) => Operation::Namespace { namespace, method },
                None => Operation::Method(op),
            },
        }
    }

    /// Serialized form: `[op, args, kwargs]`
    pub fn to_node(&self) -> Node {
        Node::Seq(vec![
            Node::from(self.op.as_str()),
            Node::Seq(self.args.clone()),
            Node::Map(self.kwargs.clone()),
        ])
    }

    pub fn from_node(node: &Node) -> ReaderResult<Self> {
        let invalid = || ReaderError::InvalidEntry(format!("malformed step: {}", node));
        let parts = node.as_seq().ok_or_else(invalid)?;
        match parts {
            [op, args, kwargs] => Ok(Step {
                op: op.as_str().ok_or_else(invalid)?.to_string(),
                args: args.as_seq().ok_or_else(invalid)?.to_vec(),
                kwargs: kwargs.as_map().ok_or_else(invalid)?.clone(),
            }),
            _ => Err(invalid()),
        }
    }

    /// Apply this step to a materialized value
    pub fn run(&self, value: Value) -> ReaderResult<Value> {
        tracing::debug!(op = %self.op, input = value.type_name(), "applying step");
        match self.operation() {
            Operation::GetItem => {
                let key = argument(&self.args, &self.kwargs, 0, "item")
                    .ok_or_else(|| ReaderError::invalid_argument(GETITEM, "expected key"))?;
                get_item(value, key)
            }
            Operation::Apply => {
                let (name, rest) = match self.args.split_first() {
                    Some((Node::Str(name), rest)) => (name, rest),
                    _ => {
                        return Err(ReaderError::invalid_argument(
                            APPLY,
                            "first argument must name a function",
                        ))
                    }
                };
                let function = functions::lookup(name)?;
                function(value, rest, &self.kwargs)
            }
            Operation::Namespace { namespace, method } => {
                Namespace::from_name(namespace)?.call(value, method, &self.args, &self.kwargs)
            }
            Operation::Method(method) => call_method(value, method, &self.args, &self.kwargs),
        }
    }
}

/// Positional argument `pos`, falling back to keyword `name`
pub(crate) fn argument<'a>(
    args: &'a [Node],
    kwargs: &'a Kwargs,
    pos: usize,
    name: &str,
) -> Option<&'a Node> {
    args.get(pos).or_else(|| kwargs.get(name))
}

fn string_list(operation: &str, node: &Node) -> ReaderResult<Vec<String>> {
    match node {
        Node::Str(s) => Ok(vec![s.clone()]),
        Node::Seq(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| ReaderError::invalid_argument(operation, "expected strings"))
            })
            .collect(),
        other => Err(ReaderError::invalid_argument(
            operation,
            format!("expected a name or list of names, got {}", other),
        )),
    }
}

fn count_argument(operation: &str, node: Option<&Node>, default: usize) -> ReaderResult<usize> {
    match node {
        None => Ok(default),
        Some(Node::Int(n)) if *n >= 0 => Ok(*n as usize),
        Some(other) => Err(ReaderError::invalid_argument(
            operation,
            format!("expected a non-negative integer, got {}", other),
        )),
    }
}

fn node_to_scalar(node: &Node) -> Option<Scalar> {
    match node {
        Node::Null => Some(Scalar::Null),
        Node::Bool(b) => Some(Scalar::Bool(*b)),
        Node::Int(i) => Some(Scalar::Int(*i)),
        Node::Float(f) => Some(Scalar::Float(*f)),
        Node::Str(s) => Some(Scalar::Str(s.clone())),
        _ => None,
    }
}

/// Subscript a value: a column, a list of columns, or a labelled element
pub(crate) fn get_item(value: Value, key: &Node) -> ReaderResult<Value> {
    match (value, key) {
        (Value::Frame(df), Node::Str(name)) => Ok(Value::Series(df.column(name)?)),
        (Value::Frame(df), Node::Seq(_)) => {
            let names = string_list(GETITEM, key)?;
            Ok(Value::Frame(df.select(&names)?))
        }
        (Value::Series(series), key) => {
            let scalar = node_to_scalar(key)
                .ok_or_else(|| ReaderError::invalid_argument(GETITEM, "expected a scalar key"))?;
            series
                .get(&scalar)
                .map(Value::Scalar)
                .ok_or_else(|| ReaderError::raised(crate::ErrorClass::KeyError, key.to_string()))
        }
        (Value::Node(node), key) => node
            .child(&key.to_string())
            .cloned()
            .map(Value::from)
            .ok_or_else(|| ReaderError::raised(crate::ErrorClass::KeyError, key.to_string())),
        (other, key) => Err(ReaderError::raised(
            crate::ErrorClass::TypeError,
            format!("{} is not subscriptable by {}", other.type_name(), key),
        )),
    }
}

/// Dispatch an engine method by name
pub(crate) fn call_method(
    value: Value,
    method: &str,
    args: &[Node],
    kwargs: &Kwargs,
) -> ReaderResult<Value> {
    let unknown = |value: &Value| ReaderError::UnknownMethod {
        method: method.to_string(),
        target: value.type_name().to_string(),
    };
    match (method, value) {
        ("set_index", Value::Frame(df)) => {
            let keys = argument(args, kwargs, 0, "keys")
                .ok_or_else(|| ReaderError::invalid_argument(method, "missing 'keys'"))?;
            match string_list(method, keys)?.as_slice() {
                [key] => Ok(Value::Frame(df.set_index(key)?)),
                _ => Err(ReaderError::invalid_argument(
                    method,
                    "exactly one key column is supported",
                )),
            }
        }
        ("reset_index", Value::Frame(df)) => Ok(Value::Frame(df.reset_index()?)),
        ("drop", Value::Frame(df)) => {
            let columns = argument(args, kwargs, 0, "columns")
                .ok_or_else(|| ReaderError::invalid_argument(method, "missing 'columns'"))?;
            Ok(Value::Frame(df.drop(&string_list(method, columns)?)?))
        }
        ("head", value) => {
            let n = count_argument(method, argument(args, kwargs, 0, "n"), 5)?;
            match value {
                Value::Frame(df) => Ok(Value::Frame(df.head(n))),
                Value::Series(s) => Ok(Value::Series(s.head(n))),
                other => Err(unknown(&other)),
            }
        }
        ("tail", value) => {
            let n = count_argument(method, argument(args, kwargs, 0, "n"), 5)?;
            match value {
                Value::Frame(df) => Ok(Value::Frame(df.tail(n))),
                Value::Series(s) => Ok(Value::Series(s.tail(n))),
                other => Err(unknown(&other)),
            }
        }
        (_, value) => Err(unknown(&value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kwargs;
    use implore_frame::{Column, DataFrame};

    fn frame() -> Value {
        Value::Frame(
            DataFrame::new(vec![
                (
                    "apple".to_string(),
                    Column::String(vec!["a".into(), "b".into(), "c".into()]),
                ),
                ("beet".to_string(), Column::Int64(vec![1, 2, 3])),
                ("carrot".to_string(), Column::Float64(vec![0.1, 0.2, 0.3])),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn test_operation_decoding() {
        assert_eq!(Step::get_item("a").operation(), Operation::GetItem);
        assert_eq!(
            Step::apply("len", vec![], Kwargs::new()).operation(),
            Operation::Apply
        );
        assert_eq!(
            Step::new("np.max", vec![], Kwargs::new()).operation(),
            Operation::Namespace {
                namespace: "np",
                method: "max"
            }
        );
        assert_eq!(
            Step::new("set_index", vec![], Kwargs::new()).operation(),
            Operation::Method("set_index")
        );
    }

    #[test]
    fn test_node_round_trip() {
        let step = Step::new("set_index", vec![], kwargs! { "keys" => "beet" });
        let node = step.to_node();
        assert_eq!(node.descend("2.keys").unwrap(), &Node::from("beet"));
        assert_eq!(Step::from_node(&node).unwrap(), step);
        assert!(Step::from_node(&Node::from("set_index")).is_err());
    }

    #[test]
    fn test_select_then_set_index() {
        let selected = Step::get_item(vec!["apple", "beet"]).run(frame()).unwrap();
        let indexed = Step::new("set_index", vec![], kwargs! { "keys" => "beet" })
            .run(selected)
            .unwrap();
        let df = indexed.as_frame().unwrap();
        assert_eq!(df.column_names(), vec!["apple"]);
        assert_eq!(df.index().unwrap().name, "beet");
    }

    #[test]
    fn test_series_lookup_by_position() {
        let series = Step::get_item("beet").run(frame()).unwrap();
        let value = Step::get_item(1).run(series).unwrap();
        assert_eq!(value.as_scalar(), Some(&Scalar::Int(2)));
    }

    #[test]
    fn test_head_default_and_explicit() {
        let out = Step::new("head", vec![Node::from(2)], Kwargs::new())
            .run(frame())
            .unwrap();
        assert_eq!(out.as_frame().unwrap().num_rows(), 2);
    }

    #[test]
    fn test_unknown_method_is_attribute_error() {
        let err = Step::new("explode", vec![], Kwargs::new())
            .run(frame())
            .unwrap_err();
        assert_eq!(err.class(), crate::ErrorClass::AttributeError);
    }

    #[test]
    fn test_apply_unknown_function() {
        let err = Step::apply("step-test-missing", vec![], Kwargs::new())
            .run(frame())
            .unwrap_err();
        assert!(matches!(err, ReaderError::UnknownFunction(_)));
    }
}
