//! JSON Schema reference resolution and traversal.
//!
//! This library resolves and traverses JSON Schema documents that reference
//! each other (and themselves) via `$ref`/`id` URIs, producing a navigable
//! document model for downstream validators and tools. It covers the
//! substrate all dialects share: URI resolution contexts under nested `id`
//! scoping, `$ref` chain resolution across documents with loop and
//! dangling-reference detection, and a recursive walker that visits every
//! subschema exactly once. Keyword-specific checks and instance validation
//! are out of scope.
//!
//! # Example
//!
//! ```
//! use schema_core::{Dereferencing, ProcessingReport, RefResolver, SchemaLoader, SchemaTree};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let document = json!({
//!     "$ref": "#/definitions/leaf",
//!     "definitions": {
//!         "leaf": { "type": "string" }
//!     }
//! });
//!
//! let tree = SchemaTree::anonymous(Dereferencing::Canonical, document);
//! let resolver = RefResolver::new(Arc::new(SchemaLoader::builder().build()));
//!
//! let mut report = ProcessingReport::new();
//! let resolved = resolver.resolve(&mut report, tree).unwrap();
//!
//! assert_eq!(resolved.pointer().to_string(), "/definitions/leaf");
//! assert_eq!(resolved.current(), Some(&json!({ "type": "string" })));
//! ```
//!
//! # Dereferencing modes
//!
//! | Mode | A reference is local iff |
//! |------|--------------------------|
//! | `Canonical` | its locator equals the document's own fetch identity |
//! | `Inline` | an `id` declared anywhere in the document claims it, or the fetch identity does |
//!
//! Trees, pointers, and references are immutable value types and freely
//! shareable across threads; the loader cache is the only mutable shared
//! state and is single-flight per locator.

pub mod collectors;
mod error;
mod loader;
mod pointer;
mod processor;
mod reference;
mod report;
mod resolver;
mod tree;
mod walker;

pub use error::{
    CoreError, LoadError, PointerError, ReferenceError, ResolveError, WalkError,
};
pub use loader::{Downloader, FileDownloader, LoaderBuilder, SchemaLoader};
pub use pointer::Pointer;
pub use processor::{CacheKey, CachedProcessor, Processor, StructuralKey};
pub use reference::Reference;
pub use report::{LogLevel, ProcessingMessage, ProcessingReport};
pub use resolver::RefResolver;
pub use tree::{Dereferencing, SchemaTree, ID_KEYWORDS};
pub use walker::{
    NoopListener, PointerCollector, SchemaWalker, WalkListener, DEFAULT_MAX_DEPTH,
};

#[cfg(feature = "remote")]
pub use loader::HttpDownloader;
