//! Error types for pointer parsing, reference handling, document loading,
//! reference resolution, and schema walking.

use std::io;

use thiserror::Error;

use crate::pointer::Pointer;
use crate::reference::Reference;
use crate::report::ProcessingMessage;

/// Errors during JSON Pointer parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PointerError {
    #[error("JSON Pointer must be empty or start with '/', got \"{value}\"")]
    MissingSlash { value: String },

    #[error("invalid escape in pointer token \"{token}\": '~' must be followed by '0' or '1'")]
    BadEscape { token: String },
}

/// Errors during URI reference parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("invalid URI reference \"{value}\": {message}")]
    Invalid { value: String, message: String },
}

/// Errors during document loading.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error("cannot load document: \"{reference}\" is not an absolute URI")]
    NotAbsolute { reference: Reference },

    #[error("schema locator \"{reference}\" must not end with '/'")]
    TrailingSlash { reference: Reference },

    #[error("a document is already registered under \"{reference}\"")]
    DuplicatePreload { reference: Reference },

    #[error("no downloader registered for scheme \"{scheme}\"")]
    UnknownScheme { scheme: String },

    #[error("failed to fetch {reference}: {source}")]
    Fetch {
        reference: Reference,
        #[source]
        source: io::Error,
    },

    #[error("content at {reference} is not valid JSON: {source}")]
    InvalidJson {
        reference: Reference,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors during `$ref` chain resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("reference loop detected: [{}]", .visited.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
    ReferenceLoop { visited: Vec<Reference> },

    #[error("dangling reference: \"{reference}\" has no matching node")]
    DanglingRef { reference: Reference },
}

/// Errors during schema traversal.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("resolving against \"{uri}\" would expand \"{from}\" into its ancestor \"{to}\"")]
    ParentExpand {
        from: Pointer,
        to: Pointer,
        uri: Reference,
    },

    #[error("resolving against \"{uri}\" would expand \"{from}\" into its descendant \"{to}\"")]
    SubtreeExpand {
        from: Pointer,
        to: Pointer,
        uri: Reference,
    },

    #[error("maximum walk depth {limit} exceeded at \"{pointer}\"")]
    DepthExceeded { limit: usize, pointer: Pointer },
}

/// Umbrella error crossing module boundaries: what processors and walk/resolve
/// entry points return.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Pointer(#[from] PointerError),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Walk(#[from] WalkError),

    /// A report message at or above the caller's exception threshold.
    #[error("{0}")]
    Message(ProcessingMessage),
}
