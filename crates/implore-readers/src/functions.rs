//! Registry of functions that `apply` steps call by name.
//!
//! Steps store only the function name so pipelines stay serializable; the
//! callable is looked up in the process-wide registry when the step runs.
//! Built-in functions are always present; applications register their own
//! with [`register_function`].

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use implore_frame::Scalar;

use crate::error::{ReaderError, ReaderResult};
use crate::node::{Kwargs, Node};
use crate::step;
use crate::value::Value;

/// A function callable from an `apply` step
///
/// Receives the materialized value plus the step's remaining positional and
/// keyword arguments.
pub type PipelineFn = Arc<dyn Fn(Value, &[Node], &Kwargs) -> ReaderResult<Value> + Send + Sync>;

/// Named pipeline functions
pub struct FunctionRegistry {
    functions: HashMap<String, PipelineFn>,
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions registered.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_builtins();
        registry
    }

    /// Create an empty registry (for testing)
    pub fn empty() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    fn register_builtins(&mut self) {
        self.register("identity", |value, _, _| Ok(value));
        self.register("getattr", |value, args, _| {
            let name = args
                .first()
                .and_then(Node::as_str)
                .ok_or_else(|| ReaderError::invalid_argument("getattr", "expected attribute name"))?;
            get_attribute(value, name)
        });
        self.register("getitem", |value, args, _| {
            let key = args
                .first()
                .ok_or_else(|| ReaderError::invalid_argument("getitem", "expected key"))?;
            step::get_item(value, key)
        });
        self.register("len", |value, _, _| {
            let len = match &value {
                Value::Frame(df) => df.num_rows(),
                Value::Series(s) => s.len(),
                Value::Bytes(b) => b.len(),
                Value::Node(Node::Seq(items)) => items.len(),
                Value::Node(Node::Map(map)) => map.len(),
                other => {
                    return Err(ReaderError::raised(
                        crate::ErrorClass::TypeError,
                        format!("{} has no len()", other.type_name()),
                    ))
                }
            };
            Ok(Value::Scalar(Scalar::Int(len as i64)))
        });
    }

    /// Register a function, replacing any previous one with the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(Value, &[Node], &Kwargs) -> ReaderResult<Value> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(function));
    }

    /// Get a function by its name.
    pub fn get(&self, name: &str) -> Option<PipelineFn> {
        self.functions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn get_attribute(value: Value, name: &str) -> ReaderResult<Value> {
    match value {
        Value::Frame(df) => Ok(Value::Series(df.column(name)?)),
        Value::Series(s) if name == "name" => Ok(Value::Scalar(Scalar::Str(s.name))),
        Value::Node(Node::Map(mut map)) => map
            .remove(name)
            .map(Value::from)
            .ok_or_else(|| ReaderError::UnknownMethod {
                method: name.to_string(),
                target: "Node".to_string(),
            }),
        other => Err(ReaderError::UnknownMethod {
            method: name.to_string(),
            target: other.type_name().to_string(),
        }),
    }
}

fn global() -> &'static RwLock<FunctionRegistry> {
    static REGISTRY: OnceLock<RwLock<FunctionRegistry>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(FunctionRegistry::new()))
}

/// Register a function in the process-wide registry
pub fn register_function<F>(name: impl Into<String>, function: F)
where
    F: Fn(Value, &[Node], &Kwargs) -> ReaderResult<Value> + Send + Sync + 'static,
{
    let name = name.into();
    tracing::debug!(function = %name, "registering pipeline function");
    let mut registry = global().write().unwrap_or_else(|e| e.into_inner());
    registry.register(name, function);
}

/// Look up a function in the process-wide registry
pub fn lookup(name: &str) -> ReaderResult<PipelineFn> {
    let registry = global().read().unwrap_or_else(|e| e.into_inner());
    registry
        .get(name)
        .ok_or_else(|| ReaderError::UnknownFunction(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use implore_frame::{Column, DataFrame};

    fn frame() -> Value {
        Value::Frame(
            DataFrame::new(vec![("beet".to_string(), Column::Int64(vec![1, 2, 3]))]).unwrap(),
        )
    }

    #[test]
    fn test_builtins_registered() {
        let registry = FunctionRegistry::new();
        assert!(registry.contains("getattr"));
        assert!(registry.contains("identity"));
        assert!(FunctionRegistry::empty().is_empty());
    }

    #[test]
    fn test_getattr_selects_column() {
        let getattr = FunctionRegistry::new().get("getattr").unwrap();
        let out = getattr(frame(), &[Node::from("beet")], &Kwargs::new()).unwrap();
        assert_eq!(out.as_series().unwrap().len(), 3);

        let err = getattr(frame(), &[Node::from("nope")], &Kwargs::new()).unwrap_err();
        assert_eq!(err.class(), crate::ErrorClass::KeyError);
    }

    #[test]
    fn test_len() {
        let len = FunctionRegistry::new().get("len").unwrap();
        let out = len(frame(), &[], &Kwargs::new()).unwrap();
        assert_eq!(out.as_scalar(), Some(&Scalar::Int(3)));
    }

    #[test]
    fn test_global_registration() {
        register_function("functions-test-double", |value, _, _| match value {
            Value::Scalar(Scalar::Int(i)) => Ok(Value::Scalar(Scalar::Int(i * 2))),
            other => Ok(other),
        });
        let f = lookup("functions-test-double").unwrap();
        let out = f(Value::Scalar(Scalar::Int(4)), &[], &Kwargs::new()).unwrap();
        assert_eq!(out.as_scalar(), Some(&Scalar::Int(8)));
        assert!(matches!(
            lookup("functions-test-missing"),
            Err(ReaderError::UnknownFunction(_))
        ));
    }
}
