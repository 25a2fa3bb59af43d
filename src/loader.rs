//! Document acquisition, parsing, and caching.
//!
//! A [`SchemaLoader`] acquires raw documents by URI through pluggable
//! [`Downloader`] transports, parses them, and caches parsed results keyed
//! by absolute locator. Preloaded documents bypass both the cache and every
//! transport and are never evicted.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::error::LoadError;
use crate::reference::Reference;
use crate::tree::{Dereferencing, SchemaTree};

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// A byte-fetching transport for one URI scheme.
pub trait Downloader: Send + Sync {
    /// Fetch the raw bytes behind `uri`.
    ///
    /// # Errors
    ///
    /// Any I/O failure; the loader wraps it, it is not retried here.
    fn fetch(&self, uri: &Reference) -> io::Result<Vec<u8>>;
}

/// Transport for `file` URIs.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileDownloader;

impl Downloader for FileDownloader {
    fn fetch(&self, uri: &Reference) -> io::Result<Vec<u8>> {
        std::fs::read(uri.path())
    }
}

/// Transport for `http`/`https` URIs. Requires the `remote` feature
/// (enabled by default).
#[cfg(feature = "remote")]
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpDownloader;

#[cfg(feature = "remote")]
impl Downloader for HttpDownloader {
    fn fetch(&self, uri: &Reference) -> io::Result<Vec<u8>> {
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(into_io)?;
        let response = client.get(uri.locator_str()).send().map_err(into_io)?;
        // Surface HTTP errors before reading the body.
        let response = response.error_for_status().map_err(into_io)?;
        let bytes = response.bytes().map_err(into_io)?;
        Ok(bytes.to_vec())
    }
}

#[cfg(feature = "remote")]
fn into_io(source: reqwest::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, source)
}

/// Builder for [`SchemaLoader`]. Produces an immutable loader snapshot.
pub struct LoaderBuilder {
    mode: Dereferencing,
    cache_enabled: bool,
    preloaded: HashMap<Reference, Arc<Value>>,
    downloaders: HashMap<String, Arc<dyn Downloader>>,
}

impl Default for LoaderBuilder {
    fn default() -> Self {
        let mut downloaders: HashMap<String, Arc<dyn Downloader>> = HashMap::new();
        downloaders.insert("file".to_string(), Arc::new(FileDownloader));
        #[cfg(feature = "remote")]
        {
            downloaders.insert("http".to_string(), Arc::new(HttpDownloader));
            downloaders.insert("https".to_string(), Arc::new(HttpDownloader));
        }
        LoaderBuilder {
            mode: Dereferencing::default(),
            cache_enabled: true,
            preloaded: HashMap::new(),
            downloaders,
        }
    }
}

impl LoaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dereferencing mode for every tree this loader produces.
    pub fn dereferencing(mut self, mode: Dereferencing) -> Self {
        self.mode = mode;
        self
    }

    /// Disabling the cache makes every `get` re-fetch.
    pub fn enable_cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    /// Register a document under a known locator, bypassing all transports.
    ///
    /// # Errors
    ///
    /// Rejects non-absolute locators, locators ending in `/`, and
    /// duplicate registrations.
    pub fn preload(mut self, uri: &str, document: Value) -> Result<Self, LoadError> {
        let reference = Reference::parse(uri)?;
        if !reference.is_absolute() {
            return Err(LoadError::NotAbsolute { reference });
        }
        if reference.path().ends_with('/') {
            return Err(LoadError::TrailingSlash { reference });
        }
        let key = reference.locator();
        if self.preloaded.contains_key(&key) {
            return Err(LoadError::DuplicatePreload { reference: key });
        }
        self.preloaded.insert(key, Arc::new(document));
        Ok(self)
    }

    /// Register or replace the transport for a scheme.
    pub fn downloader(mut self, scheme: &str, downloader: Arc<dyn Downloader>) -> Self {
        self.downloaders.insert(scheme.to_lowercase(), downloader);
        self
    }

    /// Remove the transport for a scheme.
    pub fn without_downloader(mut self, scheme: &str) -> Self {
        self.downloaders.remove(&scheme.to_lowercase());
        self
    }

    pub fn build(self) -> SchemaLoader {
        SchemaLoader {
            mode: self.mode,
            cache_enabled: self.cache_enabled,
            preloaded: self.preloaded,
            downloaders: self.downloaders,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

type CacheSlot = Arc<OnceCell<Arc<Value>>>;

/// Acquires, parses, and caches schema documents.
///
/// The cache is the only mutable state and behaves as a thread-safe
/// memoizing map with single-flight semantics per locator: concurrent
/// requests for the same uncached URI trigger one fetch. A failed fetch is
/// not cached, so a later call retries.
pub struct SchemaLoader {
    mode: Dereferencing,
    cache_enabled: bool,
    preloaded: HashMap<Reference, Arc<Value>>,
    downloaders: HashMap<String, Arc<dyn Downloader>>,
    cache: Mutex<HashMap<Reference, CacheSlot>>,
}

impl SchemaLoader {
    pub fn builder() -> LoaderBuilder {
        LoaderBuilder::new()
    }

    pub fn mode(&self) -> Dereferencing {
        self.mode
    }

    /// Load the document at `uri` and wrap it in a fresh tree rooted there.
    ///
    /// # Errors
    ///
    /// Rejects non-absolute URIs before any fetch attempt; surfaces
    /// unknown schemes, transport failures, and unparseable content as
    /// typed errors.
    pub fn get(&self, uri: &Reference) -> Result<SchemaTree, LoadError> {
        let key = uri.locator();
        if !key.is_absolute() {
            return Err(LoadError::NotAbsolute { reference: key });
        }

        if let Some(document) = self.preloaded.get(&key) {
            debug!(uri = %key, "serving preloaded document");
            return Ok(SchemaTree::with_shared_root(
                self.mode,
                key,
                Arc::clone(document),
            ));
        }

        let document = if self.cache_enabled {
            let slot = {
                let mut cache = self.cache.lock();
                Arc::clone(cache.entry(key.clone()).or_default())
            };
            Arc::clone(slot.get_or_try_init(|| self.fetch_document(&key).map(Arc::new))?)
        } else {
            Arc::new(self.fetch_document(&key)?)
        };

        Ok(SchemaTree::with_shared_root(self.mode, key, document))
    }

    fn fetch_document(&self, locator: &Reference) -> Result<Value, LoadError> {
        let Some(scheme) = locator.scheme() else {
            return Err(LoadError::NotAbsolute {
                reference: locator.clone(),
            });
        };
        let downloader =
            self.downloaders
                .get(scheme)
                .ok_or_else(|| LoadError::UnknownScheme {
                    scheme: scheme.to_string(),
                })?;
        debug!(uri = %locator, scheme, "fetching document");
        let bytes = downloader
            .fetch(locator)
            .map_err(|source| LoadError::Fetch {
                reference: locator.clone(),
                source,
            })?;
        serde_json::from_slice(&bytes).map_err(|source| LoadError::InvalidJson {
            reference: locator.clone(),
            source,
        })
    }
}
