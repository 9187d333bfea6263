//! Storage access by URL
//!
//! Every backend is an [`ObjectStore`], driven synchronously:
//!
//! - `memory://path` - one process-wide [`InMemory`] store (used heavily in tests)
//! - `file://path` or a bare path - [`LocalFileSystem`]
//! - any other scheme `object_store` is built with, configured from the
//!   storage options through [`object_store::parse_url_opts`]
//!
//! The memory and local backends take no options; passing any is an error.

use std::io::{Cursor, Read};
use std::sync::{Arc, OnceLock};

use futures::executor::block_on;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ObjectStore, ObjectStoreScheme, PutPayload};
use url::Url;

use crate::error::{FrameError, FrameResult};

/// A readable byte stream opened from storage
pub type ByteStream = Box<dyn Read + Send>;

const MEMORY_SCHEME: &str = "memory";

/// The process-wide in-memory store
pub fn memory() -> Arc<InMemory> {
    static MEMORY: OnceLock<Arc<InMemory>> = OnceLock::new();
    MEMORY.get_or_init(|| Arc::new(InMemory::new())).clone()
}

/// Store `data` at `path` of the memory store, replacing any previous content
pub fn pipe(path: &str, data: impl Into<Vec<u8>>) -> FrameResult<()> {
    let location = Path::from(path);
    block_on(memory().put(&location, PutPayload::from(data.into())))
        .map_err(|source| storage_error(&memory_url(path), source))?;
    Ok(())
}

fn memory_url(path: &str) -> String {
    format!("{}:///{}", MEMORY_SCHEME, path.trim_start_matches('/'))
}

/// The store serving `url` and the location of the object inside it
fn resolve(url: &str, options: &[(String, String)]) -> FrameResult<(Arc<dyn ObjectStore>, Path)> {
    let Some((scheme, rest)) = url.split_once("://") else {
        reject_options("file", options)?;
        let location = Path::from_filesystem_path(url)
            .map_err(|_| FrameError::FileNotFound(url.to_string()))?;
        return Ok((local(), location));
    };
    if scheme == MEMORY_SCHEME {
        reject_options(scheme, options)?;
        let store: Arc<dyn ObjectStore> = memory();
        return Ok((store, Path::from(rest)));
    }

    let parsed = Url::parse(url).map_err(|e| FrameError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    match ObjectStoreScheme::parse(&parsed) {
        Ok((ObjectStoreScheme::Local, location)) => {
            reject_options(scheme, options)?;
            Ok((local(), location))
        }
        Ok(_) => {
            let (store, location) = object_store::parse_url_opts(&parsed, options.iter().cloned())
                .map_err(|source| storage_error(url, source))?;
            let store: Arc<dyn ObjectStore> = Arc::from(store);
            Ok((store, location))
        }
        Err(_) => Err(FrameError::UnknownProtocol(scheme.to_string())),
    }
}

fn local() -> Arc<dyn ObjectStore> {
    Arc::new(LocalFileSystem::new())
}

fn reject_options(scheme: &str, options: &[(String, String)]) -> FrameResult<()> {
    match options.first() {
        Some((key, _)) => Err(FrameError::InvalidStorageOption {
            protocol: scheme.to_string(),
            key: key.clone(),
        }),
        None => Ok(()),
    }
}

fn storage_error(url: &str, source: object_store::Error) -> FrameError {
    match source {
        object_store::Error::NotFound { .. } => FrameError::FileNotFound(url.to_string()),
        other => FrameError::Storage(other),
    }
}

/// Open `url` for reading
pub fn open(url: &str) -> FrameResult<ByteStream> {
    open_with_options(url, &[])
}

/// Open `url` for reading, configuring its backend with `options`
pub fn open_with_options(url: &str, options: &[(String, String)]) -> FrameResult<ByteStream> {
    let (store, location) = resolve(url, options)?;
    tracing::debug!(url, location = %location, options = options.len(), "opening storage");
    let result = block_on(store.get(&location)).map_err(|source| storage_error(url, source))?;
    let bytes = block_on(result.bytes()).map_err(|source| storage_error(url, source))?;
    Ok(Box::new(Cursor::new(bytes)))
}
