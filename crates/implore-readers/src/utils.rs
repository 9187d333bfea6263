//! Helpers for working with captured kwargs

use crate::error::ReaderResult;
use crate::node::{path_not_found, path_segments, Kwargs, Node};

/// Value at a dotted path of map keys and sequence indices
///
/// `descend_to_path("steps.1.2.keys", entry.kwargs())` is the `keys` keyword
/// of the second step. Empty segments are skipped as in [`Node::descend`];
/// a path with no segments names no value.
pub fn descend_to_path<'a>(path: &str, kwargs: &'a Kwargs) -> ReaderResult<&'a Node> {
    let mut segments = path_segments(path);
    let first = segments.next().ok_or_else(|| path_not_found(path, path))?;
    kwargs
        .get(first)
        .ok_or_else(|| path_not_found(path, first))?
        .descend_segments(path, segments)
}
