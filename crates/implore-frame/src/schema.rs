//! Column and scalar types for materialized data

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{FrameError, FrameResult};

/// Column data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Float64,
    Int64,
    Bool,
    String,
}

impl ColumnType {
    /// Check if this is a numeric type
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Float64 | ColumnType::Int64)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Float64 => "Float64",
            ColumnType::Int64 => "Int64",
            ColumnType::Bool => "Bool",
            ColumnType::String => "String",
        };
        f.write_str(name)
    }
}

/// A single value pulled out of a column or produced by a reduction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    /// Try to extract as f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(v) => Some(*v as f64),
            Scalar::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to extract as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Bool(v) => write!(f, "{}", v),
            Scalar::Int(v) => write!(f, "{}", v),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::Str(v) => f.write_str(v),
        }
    }
}

/// A column of data
#[derive(Debug, Clone)]
pub enum Column {
    Float64(Vec<f64>),
    Int64(Vec<i64>),
    Bool(Vec<bool>),
    String(Vec<String>),
}

impl Column {
    /// Get the column type
    pub fn dtype(&self) -> ColumnType {
        match self {
            Column::Float64(_) => ColumnType::Float64,
            Column::Int64(_) => ColumnType::Int64,
            Column::Bool(_) => ColumnType::Bool,
            Column::String(_) => ColumnType::String,
        }
    }

    /// Get the number of elements
    pub fn len(&self) -> usize {
        match self {
            Column::Float64(v) => v.len(),
            Column::Int64(v) => v.len(),
            Column::Bool(v) => v.len(),
            Column::String(v) => v.len(),
        }
    }

    /// Check if the column is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at `index`, if in bounds
    pub fn get(&self, index: usize) -> Option<Scalar> {
        match self {
            Column::Float64(v) => v.get(index).map(|&x| Scalar::Float(x)),
            Column::Int64(v) => v.get(index).map(|&x| Scalar::Int(x)),
            Column::Bool(v) => v.get(index).map(|&x| Scalar::Bool(x)),
            Column::String(v) => v.get(index).map(|x| Scalar::Str(x.clone())),
        }
    }

    /// Position of the first element equal to `value`
    pub fn position(&self, value: &Scalar) -> Option<usize> {
        (0..self.len()).find(|&i| self.get(i).as_ref() == Some(value))
    }

    /// Copy of the rows in `start..end`, clamped to the column length
    pub fn slice(&self, start: usize, end: usize) -> Column {
        let end = end.min(self.len());
        let start = start.min(end);
        match self {
            Column::Float64(v) => Column::Float64(v[start..end].to_vec()),
            Column::Int64(v) => Column::Int64(v[start..end].to_vec()),
            Column::Bool(v) => Column::Bool(v[start..end].to_vec()),
            Column::String(v) => Column::String(v[start..end].to_vec()),
        }
    }

    /// Convert to f64 (for numeric types)
    pub fn to_f64(&self) -> FrameResult<Vec<f64>> {
        match self {
            Column::Float64(v) => Ok(v.clone()),
            Column::Int64(v) => Ok(v.iter().map(|&x| x as f64).collect()),
            Column::Bool(v) => Ok(v.iter().map(|&x| if x { 1.0 } else { 0.0 }).collect()),
            Column::String(_) => Err(FrameError::TypeMismatch {
                expected: "numeric".to_string(),
                actual: self.dtype().to_string(),
            }),
        }
    }

    /// Element-wise equality; NaNs in the same position compare equal
    pub fn equals(&self, other: &Column) -> bool {
        match (self, other) {
            (Column::Float64(a), Column::Float64(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .zip(b)
                        .all(|(x, y)| x == y || (x.is_nan() && y.is_nan()))
            }
            (Column::Int64(a), Column::Int64(b)) => a == b,
            (Column::Bool(a), Column::Bool(b)) => a == b,
            (Column::String(a), Column::String(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_slice_clamps() {
        let col = Column::Int64(vec![1, 2, 3]);
        assert_eq!(col.slice(1, 10).len(), 2);
        assert!(col.slice(5, 10).is_empty());
    }

    #[test]
    fn test_column_to_f64() {
        let col = Column::Int64(vec![1, 2, 3]);
        assert_eq!(col.to_f64().unwrap(), vec![1.0, 2.0, 3.0]);
        assert!(Column::String(vec!["a".into()]).to_f64().is_err());
    }

    #[test]
    fn test_equals_treats_nan_as_equal() {
        let a = Column::Float64(vec![1.0, f64::NAN]);
        let b = Column::Float64(vec![1.0, f64::NAN]);
        assert!(a.equals(&b));
        assert!(!a.equals(&Column::Int64(vec![1, 0])));
    }

    #[test]
    fn test_column_type_properties() {
        assert!(ColumnType::Float64.is_numeric());
        assert!(ColumnType::Int64.is_numeric());
        assert!(!ColumnType::String.is_numeric());
    }

    #[test]
    fn test_position() {
        let col = Column::String(vec!["a".into(), "b".into()]);
        assert_eq!(col.position(&Scalar::Str("b".into())), Some(1));
        assert_eq!(col.position(&Scalar::Int(1)), None);
    }
}
