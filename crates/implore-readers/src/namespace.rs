//! Namespace extension point
//!
//! A reader offers a fixed set of namespaces (currently just the numerics
//! namespace `np`). Accessing one returns a [`NamespaceProxy`]; calling a
//! method on the proxy appends a `<namespace>.<method>` step.

use implore_frame::numerics::{self, Axis, Reduction};

use crate::error::{ReaderError, ReaderResult};
use crate::node::{Kwargs, Node};
use crate::readers::Reader;
use crate::step::Step;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Numerics: reductions over frames, series and scalars
    Np,
}

impl Namespace {
    pub fn name(&self) -> &'static str {
        match self {
            Namespace::Np => "np",
        }
    }

    pub fn from_name(name: &str) -> ReaderResult<Self> {
        match name {
            "np" | "numpy" => Ok(Namespace::Np),
            other => Err(ReaderError::UnknownNamespace {
                namespace: other.to_string(),
                available: vec![Namespace::Np.name().to_string()],
            }),
        }
    }

    /// Resolve `method` against the value's namespace and call it
    ///
    /// Reductions take no positional arguments and one keyword, `axis`
    /// (`0`, `1` or null). Anything else is rejected.
    pub fn call(
        &self,
        value: Value,
        method: &str,
        args: &[Node],
        kwargs: &Kwargs,
    ) -> ReaderResult<Value> {
        match self {
            Namespace::Np => {
                let op = format!("np.{}", method);
                let reduction = Reduction::from_name(method)?;
                if !args.is_empty() {
                    return Err(ReaderError::invalid_argument(
                        &op,
                        format!("takes no positional arguments, got {}", args.len()),
                    ));
                }
                let axis = reduction_axis(&op, kwargs)?;
                match (value, axis) {
                    (Value::Frame(df), axis) => Ok(Value::Series(numerics::reduce_frame(
                        &df,
                        reduction,
                        axis.unwrap_or_default(),
                    )?)),
                    (Value::Series(s), None | Some(Axis::Columns)) => {
                        Ok(Value::Scalar(numerics::reduce_series(&s, reduction)?))
                    }
                    (Value::Scalar(s), None) => {
                        Ok(Value::Scalar(numerics::reduce_scalar(&s, reduction)?))
                    }
                    (Value::Series(_) | Value::Scalar(_), Some(_)) => {
                        Err(ReaderError::invalid_argument(&op, "axis out of bounds"))
                    }
                    (other, _) => Err(ReaderError::raised(
                        crate::ErrorClass::TypeError,
                        format!("{} does not accept {}", op, other.type_name()),
                    )),
                }
            }
        }
    }
}

/// The `axis` keyword of a reduction; `None` when absent or null
fn reduction_axis(op: &str, kwargs: &Kwargs) -> ReaderResult<Option<Axis>> {
    if let Some(key) = kwargs.keys().find(|key| key.as_str() != "axis") {
        return Err(ReaderError::invalid_argument(
            op,
            format!("unexpected keyword argument '{}'", key),
        ));
    }
    match kwargs.get("axis") {
        None | Some(Node::Null) => Ok(None),
        Some(Node::Int(axis)) => Ok(Some(Axis::from_number(*axis)?)),
        Some(other) => Err(ReaderError::invalid_argument(
            op,
            format!("axis must be an integer, got {}", other),
        )),
    }
}

/// A reader viewed through one of its namespaces
#[derive(Debug, Clone)]
pub struct NamespaceProxy {
    reader: Reader,
    namespace: Namespace,
}

impl NamespaceProxy {
    pub(crate) fn new(reader: Reader, namespace: Namespace) -> Self {
        Self { reader, namespace }
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Append a step calling `method` in this namespace
    pub fn call(&self, method: &str, args: Vec<Node>, kwargs: Kwargs) -> Reader {
        let op = format!("{}.{}", self.namespace.name(), method);
        self.reader.with_step(Step::new(op, args, kwargs))
    }

    pub fn max(&self) -> Reader {
        self.call("max", Vec::new(), Kwargs::new())
    }

    pub fn min(&self) -> Reader {
        self.call("min", Vec::new(), Kwargs::new())
    }

    pub fn sum(&self) -> Reader {
        self.call("sum", Vec::new(), Kwargs::new())
    }

    pub fn mean(&self) -> Reader {
        self.call("mean", Vec::new(), Kwargs::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kwargs;
    use implore_frame::{Column, DataFrame, Scalar, Series};
    use rstest::rstest;

    #[test]
    fn test_from_name() {
        assert_eq!(Namespace::from_name("np").unwrap(), Namespace::Np);
        let err = Namespace::from_name("pd").unwrap_err();
        assert_eq!(err.class(), crate::ErrorClass::AttributeError);
    }

    #[test]
    fn test_np_max_on_series() {
        let series = Value::Series(Series::new("beet", Column::Int64(vec![1, 3, 2])));
        let out = Namespace::Np
            .call(series, "max", &[], &Kwargs::new())
            .unwrap();
        assert_eq!(out.as_scalar(), Some(&Scalar::Int(3)));
    }

    fn frame() -> Value {
        Value::Frame(
            DataFrame::new(vec![
                ("a".to_string(), Column::Int64(vec![1, 5])),
                ("b".to_string(), Column::Int64(vec![2, 6])),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn test_np_axis() {
        let rows = Namespace::Np
            .call(frame(), "max", &[], &kwargs! { "axis" => 1 })
            .unwrap();
        assert!(rows.as_series().unwrap().values.equals(&Column::Int64(vec![2, 6])));

        let columns = Namespace::Np
            .call(frame(), "max", &[], &kwargs! { "axis" => Node::Null })
            .unwrap();
        let columns = columns.as_series().unwrap();
        assert_eq!(columns.get(&Scalar::Str("a".into())), Some(Scalar::Int(5)));
    }

    #[rstest]
    #[case::positional(vec![Node::from(1)], Kwargs::new())]
    #[case::unknown_keyword(Vec::new(), kwargs! { "axis" => 1, "bogus" => true })]
    #[case::axis_type(Vec::new(), kwargs! { "axis" => "rows" })]
    #[case::axis_range(Vec::new(), kwargs! { "axis" => 2 })]
    fn test_np_rejects_bad_arguments(#[case] args: Vec<Node>, #[case] kwargs: Kwargs) {
        let err = Namespace::Np.call(frame(), "max", &args, &kwargs).unwrap_err();
        assert!(matches!(
            err.class(),
            crate::ErrorClass::TypeError | crate::ErrorClass::ValueError
        ));
    }

    #[test]
    fn test_np_series_has_no_rows_axis() {
        let series = Value::Series(Series::new("beet", Column::Int64(vec![1, 3, 2])));
        let err = Namespace::Np
            .call(series, "max", &[], &kwargs! { "axis" => 1 })
            .unwrap_err();
        assert!(matches!(err, ReaderError::InvalidArgument { .. }));
    }

    #[test]
    fn test_np_rejects_bytes() {
        let err = Namespace::Np
            .call(Value::Bytes(vec![1]), "max", &[], &Kwargs::new())
            .unwrap_err();
        assert_eq!(err.class(), crate::ErrorClass::TypeError);
    }
}
