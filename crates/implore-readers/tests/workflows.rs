//! End-to-end pipeline workflows: catalogs, parameters, namespaces, retry

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::fixtures::{init_tracing, memory_csv};
use implore_frame::{storage, Scalar};
use implore_readers::{
    descend_to_path, kwargs, register_function, Catalog, DataType, ErrorClass, Node, Reader,
    ReaderError, Retry, ToEntry,
};
use rstest::rstest;

fn fruit_reader(path: &str) -> Reader {
    Reader::frame_csv(DataType::csv(memory_csv(path)))
        .get_item(vec!["apple", "beet"])
        .set_index("beet")
}

#[test]
fn test_pipelines_in_catalogs() {
    init_tracing();
    let reader = fruit_reader("/workflows/catalog.csv");
    let mut cat = Catalog::new();
    cat.insert("mydata", &reader).unwrap();

    let from_catalog = cat.get("mydata").unwrap();
    assert_eq!(from_catalog, reader);
    assert!(cat.read("mydata").unwrap().equals(&reader.read().unwrap()));
    assert_eq!(reader.equals(&reader).read().unwrap().as_bool(), Some(true));

    let full = reader.read().unwrap();
    let preview = cat.discover("mydata").unwrap();
    let full = full.as_frame().unwrap();
    let preview = preview.as_frame().unwrap();
    assert_eq!(full.num_rows(), 300);
    assert_eq!(preview.num_rows(), 10);
    assert_eq!(preview.column_names(), full.column_names());
    assert!(preview.equals(&full.head(10)));

    cat.insert("eq", &reader.equals(&reader)).unwrap();
    assert_eq!(cat.data().len(), 1);
    assert_eq!(cat.get("eq").unwrap(), reader.equals(&reader));
    assert_eq!(cat.read("eq").unwrap().as_bool(), Some(true));

    let cat = Catalog::from_json_str(&cat.to_json_string().unwrap()).unwrap();
    assert_eq!(cat.read("eq").unwrap().as_bool(), Some(true));
}

#[test]
fn test_parameters() {
    let reader = fruit_reader("/workflows/parameters.csv");
    let mut entry = reader.to_entry();
    assert_eq!(entry.extract_parameter("index_key", "beet").unwrap(), 2);

    let text = serde_json::to_string(&entry.to_dict().unwrap()).unwrap();
    assert_eq!(text.matches("{index_key}").count(), 2);
    assert_eq!(
        descend_to_path("steps.1.2.keys", entry.kwargs()).unwrap(),
        &Node::placeholder("index_key")
    );
    assert_eq!(entry.to_reader().unwrap(), reader);
    assert!(matches!(
        entry.extract_parameter("index_key", "apple"),
        Err(ReaderError::DuplicateParameter(_))
    ));

    // Parameterize the shared data entry through the catalog
    let mut cat = Catalog::new();
    cat.insert("mydata", &entry).unwrap();
    let token = cat.data().keys().next().unwrap().clone();
    let data = cat.data_entry_mut(&token).unwrap();
    assert_eq!(data.extract_parameter("protocol", "memory:").unwrap(), 1);
    assert_eq!(
        data.kwargs().get("url"),
        Some(&Node::from("{protocol}///workflows/parameters.csv"))
    );
    assert_eq!(cat.get("mydata").unwrap(), reader);

    data_entry_env_default(&mut cat, &token);
    assert_eq!(cat.get("mydata").unwrap(), reader);
    assert!(cat.read("mydata").unwrap().equals(&reader.read().unwrap()));
}

fn data_entry_env_default(cat: &mut Catalog, token: &str) {
    let data = cat.data_entry_mut(token).unwrap();
    data.set_default("protocol", "env(IMPLORE_WORKFLOW_PROTOCOL)")
        .unwrap();
    let data_type = cat.data()[token].clone();

    std::env::remove_var("IMPLORE_WORKFLOW_PROTOCOL");
    assert!(matches!(
        data_type.to_data(),
        Err(ReaderError::MissingEnvVar(ref v)) if v == "IMPLORE_WORKFLOW_PROTOCOL"
    ));

    std::env::set_var("IMPLORE_WORKFLOW_PROTOCOL", "memory:");
    assert_eq!(
        data_type.to_data().unwrap(),
        DataType::csv("memory:///workflows/parameters.csv")
    );
}

#[test]
fn test_namespace() {
    let reader = Reader::frame_csv(DataType::csv(memory_csv("/workflows/namespace.csv")));
    let max = reader
        .apply("getattr", vec!["beet".into()])
        .np()
        .unwrap()
        .max();
    assert_eq!(max.read().unwrap().as_scalar(), Some(&Scalar::Int(3)));

    let err = reader.namespace("xarray").unwrap_err();
    assert_eq!(err.class(), ErrorClass::AttributeError);

    let bogus = reader
        .np()
        .unwrap()
        .call("max", Vec::new(), kwargs! { "axis" => 1, "bogus" => true });
    assert!(matches!(bogus.read(), Err(ReaderError::InvalidArgument { .. })));
}

#[test]
fn test_integer_sum_overflow() {
    storage::pipe("/workflows/overflow.csv", "a\n9223372036854775807\n1\n").unwrap();
    let total = Reader::frame_csv(DataType::csv("memory:///workflows/overflow.csv"))
        .get_item("a")
        .np()
        .unwrap()
        .sum();
    assert_eq!(
        total.read().unwrap().as_scalar(),
        Some(&Scalar::Float(9223372036854775808.0))
    );
}

#[test]
fn test_nan_arguments_keep_equality() {
    let reader = Reader::literal(1).apply("identity", vec![Node::from(f64::NAN)]);
    assert_eq!(reader, reader.clone());
    assert_eq!(reader.to_entry().to_reader().unwrap(), reader);
}

/// Register `name` as a function that fails twice with RuntimeError, then succeeds
fn fail_twice(name: &str) -> Arc<AtomicUsize> {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    register_function(name, move |value, _, _| {
        if counter.fetch_add(1, Ordering::SeqCst) < 2 {
            Err(ReaderError::runtime("not yet"))
        } else {
            Ok(value)
        }
    });
    calls
}

#[rstest]
#[case::allowed("workflow_retry_allowed", ErrorClass::RuntimeError, true, 3)]
#[case::disallowed("workflow_retry_disallowed", ErrorClass::ValueError, false, 1)]
#[case::wildcard("workflow_retry_wildcard", ErrorClass::Exception, true, 3)]
fn test_retry(
    #[case] function: &str,
    #[case] allowed: ErrorClass,
    #[case] succeeds: bool,
    #[case] expected_calls: usize,
) {
    let calls = fail_twice(function);
    let upstream = Reader::frame_csv(DataType::csv(memory_csv(&format!("/workflows/{}.csv", function))))
        .apply(function, vec![]);
    let retry = Retry::new(upstream.to_data(), [allowed]).unwrap().into_reader();

    let result = retry.read();
    assert_eq!(result.is_ok(), succeeds);
    if let Err(err) = result {
        assert_eq!(err.class(), ErrorClass::RuntimeError);
        assert_eq!(err.to_string(), "RuntimeError: not yet");
    }
    assert_eq!(calls.load(Ordering::SeqCst), expected_calls);
}

#[test]
fn test_retry_in_catalog() {
    let calls = fail_twice("workflow_retry_catalog");
    let upstream = Reader::literal(5).apply("workflow_retry_catalog", vec![]);
    let retry = Retry::new(upstream.to_data(), [ErrorClass::RuntimeError]).unwrap();

    let mut cat = Catalog::new();
    cat.insert("flaky", &retry).unwrap();
    let text = cat.to_json_string().unwrap();
    let cat = Catalog::from_json_str(&text).unwrap();

    assert_eq!(
        cat.read("flaky").unwrap().as_scalar(),
        Some(&Scalar::Int(5))
    );
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}
