//! Materialized values flowing through a pipeline at read time

use implore_frame::{DataFrame, Scalar, Series};

use crate::node::Node;

/// The output of materializing a data type or applying a step
#[derive(Debug, Clone)]
pub enum Value {
    Frame(DataFrame),
    Series(Series),
    Scalar(Scalar),
    Bytes(Vec<u8>),
    /// Structured data that did not come from the tabular engine
    Node(Node),
}

impl Value {
    /// Short type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Frame(_) => "DataFrame",
            Value::Series(_) => "Series",
            Value::Scalar(_) => "Scalar",
            Value::Bytes(_) => "Bytes",
            Value::Node(_) => "Node",
        }
    }

    pub fn as_frame(&self) -> Option<&DataFrame> {
        match self {
            Value::Frame(df) => Some(df),
            _ => None,
        }
    }

    pub fn as_series(&self) -> Option<&Series> {
        match self {
            Value::Series(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_scalar().and_then(Scalar::as_bool)
    }

    /// Engine equality: frames and series compare by values and index
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Frame(a), Value::Frame(b)) => a.equals(b),
            (Value::Series(a), Value::Series(b)) => a.equals(b),
            (Value::Scalar(a), Value::Scalar(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Node(a), Value::Node(b)) => a == b,
            _ => false,
        }
    }
}

impl From<DataFrame> for Value {
    fn from(value: DataFrame) -> Self {
        Value::Frame(value)
    }
}

impl From<Series> for Value {
    fn from(value: Series) -> Self {
        Value::Series(value)
    }
}

impl From<Scalar> for Value {
    fn from(value: Scalar) -> Self {
        Value::Scalar(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Scalar(Scalar::Bool(value))
    }
}

/// Convert a literal node into a value, turning scalars into engine scalars
impl From<Node> for Value {
    fn from(node: Node) -> Self {
        match node {
            Node::Null => Value::Scalar(Scalar::Null),
            Node::Bool(b) => Value::Scalar(Scalar::Bool(b)),
            Node::Int(i) => Value::Scalar(Scalar::Int(i)),
            Node::Float(f) => Value::Scalar(Scalar::Float(f)),
            Node::Str(s) => Value::Scalar(Scalar::Str(s)),
            other => Value::Node(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_equality() {
        let a = Value::from(Scalar::Int(3));
        assert!(a.equals(&Value::from(Scalar::Int(3))));
        assert!(!a.equals(&Value::from(Scalar::Float(3.0))));
    }

    #[test]
    fn test_node_literals_become_scalars() {
        assert_eq!(Value::from(Node::Int(1)).as_scalar(), Some(&Scalar::Int(1)));
        assert!(matches!(Value::from(Node::Seq(vec![])), Value::Node(_)));
    }
}
