//! URI-scoped, navigable views over loaded schema documents.
//!
//! A [`SchemaTree`] pairs a shared, immutable root document with a current
//! pointer and the resolution context at that position. Relocation always
//! produces a new tree value; the context is recomputed from (loading
//! reference, root, pointer) on every move and never stored independently.

use std::sync::Arc;

use serde_json::Value;

use crate::pointer::{step, Pointer};
use crate::reference::Reference;

/// Keywords that open a new resolution scope, in lookup order.
pub const ID_KEYWORDS: &[&str] = &["$id", "id"];

/// Policy for deciding whether a reference is reachable without fetching
/// another document. Fixed at tree construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dereferencing {
    /// A reference is local iff its locator equals the tree's loading
    /// reference - the document's own fetch identity.
    #[default]
    Canonical,
    /// `id` declarations anywhere in the document are trusted as if they
    /// were separately fetchable documents, so a reference can resolve into
    /// a sibling subtree without a fetch.
    Inline,
}

/// Positions declaring an `id` scope, bucketed by whether the resolved
/// scope is absolute. Computed once per document in inline mode.
#[derive(Debug, Default)]
struct InlineScopes {
    absolute: Vec<(Reference, Pointer)>,
    other: Vec<(Reference, Pointer)>,
}

/// An immutable wrapper pairing a root document with a current pointer and
/// the resolution context at that position.
#[derive(Debug, Clone)]
pub struct SchemaTree {
    root: Arc<Value>,
    loading_ref: Reference,
    pointer: Pointer,
    context: Reference,
    mode: Dereferencing,
    scopes: Arc<InlineScopes>,
}

impl SchemaTree {
    /// Build a tree for a document obtained under `loading_ref`, positioned
    /// at the root.
    pub fn new(mode: Dereferencing, loading_ref: Reference, root: Value) -> Self {
        Self::with_shared_root(mode, loading_ref, Arc::new(root))
    }

    /// Build a tree for a document constructed in memory, with the
    /// anonymous loading reference.
    pub fn anonymous(mode: Dereferencing, root: Value) -> Self {
        Self::new(mode, Reference::anonymous(), root)
    }

    pub(crate) fn with_shared_root(
        mode: Dereferencing,
        loading_ref: Reference,
        root: Arc<Value>,
    ) -> Self {
        let scopes = match mode {
            Dereferencing::Canonical => InlineScopes::default(),
            Dereferencing::Inline => {
                let mut scopes = InlineScopes::default();
                collect_scopes(&root, Pointer::root(), &loading_ref, &mut scopes);
                scopes
            }
        };
        let context = compute_context(&root, &Pointer::root(), &loading_ref);
        SchemaTree {
            root,
            loading_ref,
            pointer: Pointer::root(),
            context,
            mode,
            scopes: Arc::new(scopes),
        }
    }

    /// The whole document.
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// The current position.
    pub fn pointer(&self) -> &Pointer {
        &self.pointer
    }

    /// How this document was acquired.
    pub fn loading_ref(&self) -> &Reference {
        &self.loading_ref
    }

    /// The base URI against which relative references at the current
    /// position resolve.
    pub fn context(&self) -> &Reference {
        &self.context
    }

    pub fn mode(&self) -> Dereferencing {
        self.mode
    }

    /// The node at the current pointer, if it exists.
    pub fn current(&self) -> Option<&Value> {
        self.pointer.navigate(&self.root)
    }

    /// A new tree positioned at `pointer`, context recomputed.
    pub fn set_pointer(&self, pointer: Pointer) -> Self {
        let context = compute_context(&self.root, &pointer, &self.loading_ref);
        SchemaTree {
            root: Arc::clone(&self.root),
            loading_ref: self.loading_ref.clone(),
            pointer,
            context,
            mode: self.mode,
            scopes: Arc::clone(&self.scopes),
        }
    }

    /// A new tree positioned at the current pointer plus `relative`.
    pub fn append_pointer(&self, relative: &Pointer) -> Self {
        self.set_pointer(self.pointer.append(relative))
    }

    /// Whether `reference` is reachable in this document without fetching
    /// another one, per the tree's dereferencing mode.
    pub fn contains_ref(&self, reference: &Reference) -> bool {
        match self.mode {
            Dereferencing::Canonical => self.loading_ref.contains(reference),
            Dereferencing::Inline => {
                self.scopes.other.iter().any(|(r, _)| r == reference)
                    || (reference.is_legal()
                        && self
                            .scopes
                            .absolute
                            .iter()
                            .any(|(scope, _)| scope.contains(reference)))
                    || self.loading_ref.contains(reference)
            }
        }
    }

    /// The pointer `reference` addresses inside this document, or `None`
    /// if its target node is missing.
    pub fn matching_pointer(&self, reference: &Reference) -> Option<Pointer> {
        match self.mode {
            Dereferencing::Canonical => self.fragment_target(reference, &Pointer::root()),
            Dereferencing::Inline => {
                if let Some((_, pointer)) =
                    self.scopes.other.iter().find(|(r, _)| r == reference)
                {
                    return Some(pointer.clone());
                }
                if reference.is_legal() {
                    for (scope, base) in &self.scopes.absolute {
                        if scope.contains(reference) {
                            if let Some(pointer) = self.fragment_target(reference, base) {
                                return Some(pointer);
                            }
                        }
                    }
                }
                if self.loading_ref.contains(reference) {
                    return self.fragment_target(reference, &Pointer::root());
                }
                None
            }
        }
    }

    fn fragment_target(&self, reference: &Reference, base: &Pointer) -> Option<Pointer> {
        let fragment = reference.fragment_pointer().ok()?;
        let pointer = base.append(&fragment);
        pointer.navigate(&self.root).map(|_| pointer)
    }
}

/// The scope declaration at a node: its `id`-equivalent member, if present,
/// string-valued, and parseable as a legal reference.
fn scope_declaration(node: &Value) -> Option<Reference> {
    let map = node.as_object()?;
    let raw = ID_KEYWORDS.iter().find_map(|k| map.get(*k))?.as_str()?;
    let reference = Reference::parse(raw).ok()?;
    reference.is_legal().then_some(reference)
}

/// Walk from the root to `pointer`, resolving each scope declaration on
/// the path against the running context, root-to-leaf.
fn compute_context(root: &Value, pointer: &Pointer, loading_ref: &Reference) -> Reference {
    let mut context = loading_ref.clone();
    let mut node = root;
    if let Some(id) = scope_declaration(node) {
        context = context.resolve(&id);
    }
    for token in pointer.tokens() {
        node = match step(node, token) {
            Some(next) => next,
            None => return context,
        };
        if let Some(id) = scope_declaration(node) {
            context = context.resolve(&id);
        }
    }
    context
}

/// Depth-first scan over object members collecting every id-bearing
/// position. Array elements are not descended: a subschema sitting inside
/// an array-valued keyword is not scanned for `id`. Narrow but deliberate;
/// broadening the scan changes resolution results for documents relying on
/// it.
fn collect_scopes(node: &Value, pointer: Pointer, context: &Reference, scopes: &mut InlineScopes) {
    let Some(map) = node.as_object() else {
        return;
    };
    let mut scope = context.clone();
    if let Some(id) = scope_declaration(node) {
        scope = context.resolve(&id);
        if scope.is_absolute() {
            scopes.absolute.push((scope.clone(), pointer.clone()));
        } else {
            scopes.other.push((scope.clone(), pointer.clone()));
        }
    }
    for (key, child) in map {
        collect_scopes(child, pointer.append_token(key), &scope, scopes);
    }
}
