//! JSON References: URIs with optional JSON Pointer fragments.
//!
//! A [`Reference`] wraps a parsed, normalized URI reference. Normalization
//! lowercases the scheme and host (RFC 3986 §3.1/§3.2.2) and removes dot
//! segments, so two spellings of the same target compare equal.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use fluent_uri::{Uri, UriRef};

use crate::error::{PointerError, ReferenceError};
use crate::pointer::Pointer;

/// A parsed absolute-or-relative URI with an optional pointer fragment.
#[derive(Debug, Clone)]
pub struct Reference {
    uri: UriRef<String>,
}

impl Reference {
    /// Parse and normalize a URI reference.
    ///
    /// # Errors
    ///
    /// Returns `ReferenceError::Invalid` if the string is not a URI
    /// reference at all. A fragment that is not a JSON Pointer still
    /// parses; it merely makes the reference illegal (see [`is_legal`]).
    ///
    /// [`is_legal`]: Reference::is_legal
    pub fn parse(input: &str) -> Result<Self, ReferenceError> {
        let uri = UriRef::parse(input.to_owned()).map_err(|e| ReferenceError::Invalid {
            value: input.to_string(),
            message: e.to_string(),
        })?;
        Ok(Reference {
            uri: uri.normalize(),
        })
    }

    /// The reference for documents built in memory: `#`.
    pub fn anonymous() -> Self {
        // "#" is a valid URI reference; the parse cannot fail.
        Reference {
            uri: UriRef::parse(String::from("#")).expect("\"#\" parses as a URI reference"),
        }
    }

    fn from_uri(uri: Uri<String>) -> Self {
        Reference {
            uri: UriRef::from(uri),
        }
    }

    /// The normalized string form.
    pub fn as_str(&self) -> &str {
        self.uri.as_str()
    }

    /// The URI scheme, if any.
    pub fn scheme(&self) -> Option<&str> {
        self.uri.scheme().map(|s| s.as_str())
    }

    /// The path component.
    pub fn path(&self) -> &str {
        self.uri.path().as_str()
    }

    /// Everything before the fragment delimiter.
    pub fn locator_str(&self) -> &str {
        match self.as_str().find('#') {
            Some(idx) => &self.as_str()[..idx],
            None => self.as_str(),
        }
    }

    /// The schema-locator form of this reference: the URI without its
    /// fragment, with a present-but-empty fragment forced on.
    pub fn locator(&self) -> Reference {
        let spelled = format!("{}#", self.locator_str());
        match UriRef::parse(spelled) {
            Ok(uri) => Reference { uri },
            // The input already parsed; stripping a fragment cannot break it.
            Err(_) => self.clone(),
        }
    }

    /// Whether `other` could be reached by pointer-only navigation from
    /// this reference's document: same URI-without-fragment component.
    pub fn contains(&self, other: &Reference) -> bool {
        self.locator_str() == other.locator_str()
    }

    /// Whether this reference has no relative parts and its fragment is
    /// absent or empty.
    pub fn is_absolute(&self) -> bool {
        self.uri.scheme().is_some() && self.uri.fragment().map_or(true, |f| f.as_str().is_empty())
    }

    /// Whether the fragment, if any, parses as a JSON Pointer.
    pub fn is_legal(&self) -> bool {
        self.fragment_pointer().is_ok()
    }

    /// The fragment decoded as a JSON Pointer. An absent fragment is the
    /// root pointer.
    ///
    /// # Errors
    ///
    /// Returns the pointer parse error for non-pointer fragments.
    pub fn fragment_pointer(&self) -> Result<Pointer, PointerError> {
        match self.uri.fragment() {
            None => Ok(Pointer::root()),
            Some(fragment) => Pointer::parse(&fragment.decode().into_string_lossy()),
        }
    }

    /// Resolve `other` against this reference (RFC 3986 §5).
    ///
    /// An already-absolute `other` wins outright. A relative base cannot
    /// carry a merge, so against one only fragment grafting is performed;
    /// against the anonymous reference `other` passes through unchanged.
    pub fn resolve(&self, other: &Reference) -> Reference {
        if other.uri.scheme().is_some() {
            return other.clone();
        }
        if self.uri.scheme().is_some() {
            // The base fragment plays no part in resolution; strip it.
            if let Ok(base) = Uri::parse(self.locator_str().to_owned()) {
                if let Ok(resolved) = other.uri.resolve_against(&base) {
                    return Reference::from_uri(resolved.normalize());
                }
            }
            return other.clone();
        }
        if other.locator_str().is_empty() && !self.locator_str().is_empty() {
            let fragment = other.uri.fragment().map_or("", |f| f.as_str());
            let spelled = format!("{}#{}", self.locator_str(), fragment);
            if let Ok(uri) = UriRef::parse(spelled) {
                return Reference { uri };
            }
        }
        other.clone()
    }
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Reference {}

impl Hash for Reference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Reference {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Reference::parse(s)
    }
}
