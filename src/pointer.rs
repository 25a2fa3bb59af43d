//! JSON Pointers (RFC 6901) over tree-shaped documents.
//!
//! A [`Pointer`] is an immutable, ordered sequence of reference tokens.
//! Navigation treats a missing member and an out-of-range index the same
//! way: the node is simply absent, which keeps object and array containers
//! uniform for callers probing for subschemas.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::PointerError;

/// An immutable JSON Pointer.
///
/// Tokens are stored decoded; [`fmt::Display`] re-applies the `~0`/`~1`
/// escapes, so `parse` and `to_string` round-trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pointer {
    tokens: Vec<String>,
}

impl Pointer {
    /// The empty pointer, denoting the document root.
    pub fn root() -> Self {
        Pointer { tokens: Vec::new() }
    }

    /// Parse a pointer string.
    ///
    /// The empty string is the root pointer; anything else must start with
    /// `/`. Escapes are decoded eagerly: a `~` not followed by `0` or `1`
    /// is a hard parse error, never silently repaired.
    ///
    /// # Errors
    ///
    /// Returns `PointerError::MissingSlash` or `PointerError::BadEscape`.
    pub fn parse(input: &str) -> Result<Self, PointerError> {
        if input.is_empty() {
            return Ok(Pointer::root());
        }
        let Some(rest) = input.strip_prefix('/') else {
            return Err(PointerError::MissingSlash {
                value: input.to_string(),
            });
        };
        let tokens = rest
            .split('/')
            .map(decode_token)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Pointer { tokens })
    }

    /// The decoded reference tokens, in order.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// True for the empty pointer.
    pub fn is_root(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Returns a new pointer with one more token appended.
    pub fn append_token(&self, token: impl Into<String>) -> Self {
        let mut tokens = self.tokens.clone();
        tokens.push(token.into());
        Pointer { tokens }
    }

    /// Returns a new pointer with all of `other`'s tokens appended.
    pub fn append(&self, other: &Pointer) -> Self {
        let mut tokens = self.tokens.clone();
        tokens.extend(other.tokens.iter().cloned());
        Pointer { tokens }
    }

    /// The pointer one level up, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        if self.tokens.is_empty() {
            return None;
        }
        Some(Pointer {
            tokens: self.tokens[..self.tokens.len() - 1].to_vec(),
        })
    }

    /// The last token, or `None` at the root.
    pub fn last_token(&self) -> Option<&str> {
        self.tokens.last().map(String::as_str)
    }

    /// Whether this pointer's token sequence is a (non-strict) prefix of
    /// `other`'s.
    pub fn is_prefix_of(&self, other: &Pointer) -> bool {
        other.tokens.len() >= self.tokens.len()
            && self.tokens.iter().zip(&other.tokens).all(|(a, b)| a == b)
    }

    /// Navigate a document, returning the addressed node.
    ///
    /// Returns `None` when any step lands on a missing member, an invalid
    /// or out-of-range array index, or a scalar.
    pub fn navigate<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        let mut current = document;
        for token in &self.tokens {
            current = step(current, token)?;
        }
        Some(current)
    }
}

/// One navigation step into a container node.
pub(crate) fn step<'a>(container: &'a Value, token: &str) -> Option<&'a Value> {
    match container {
        Value::Object(map) => map.get(token),
        Value::Array(arr) => arr.get(array_index(token)?),
        _ => None,
    }
}

/// A token addresses an array element only if it is exactly `"0"` or a
/// non-empty digit string with no leading zero. Anything else is "no such
/// index", not an error.
fn array_index(token: &str) -> Option<usize> {
    if token == "0" {
        return Some(0);
    }
    if token.is_empty() || token.starts_with('0') {
        return None;
    }
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

fn decode_token(raw: &str) -> Result<String, PointerError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '~' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('~'),
            Some('1') => out.push('/'),
            _ => {
                return Err(PointerError::BadEscape {
                    token: raw.to_string(),
                })
            }
        }
    }
    Ok(out)
}

fn encode_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            write!(f, "/{}", encode_token(token))?;
        }
        Ok(())
    }
}

impl FromStr for Pointer {
    type Err = PointerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pointer::parse(s)
    }
}
