//! `$ref` chain resolution over schema trees.
//!
//! A [`RefResolver`] repeatedly dereferences the `$ref` at the front of a
//! tree until a non-reference node is reached, asking the loader for a new
//! document whenever a reference points outside the current one. Loops and
//! dangling targets are detected and fatal.

use std::sync::Arc;

use indexmap::IndexSet;
use tracing::trace;

use crate::error::{CoreError, ResolveError};
use crate::loader::SchemaLoader;
use crate::reference::Reference;
use crate::report::{LogLevel, ProcessingReport};
use crate::tree::SchemaTree;

/// Dereferences `$ref` chains. Cheap to clone; shares its loader.
#[derive(Clone)]
pub struct RefResolver {
    loader: Arc<SchemaLoader>,
}

impl RefResolver {
    pub fn new(loader: Arc<SchemaLoader>) -> Self {
        RefResolver { loader }
    }

    pub fn loader(&self) -> &Arc<SchemaLoader> {
        &self.loader
    }

    /// Follow `$ref` members from the tree's current position until a
    /// non-reference node is reached, returning the relocated tree. The
    /// input is never mutated; every step produces a new tree.
    ///
    /// Loop detection compares fully-resolved references, so two relative
    /// spellings of the same absolute target collide.
    ///
    /// # Errors
    ///
    /// `ResolveError::ReferenceLoop` carrying the ordered list of
    /// references visited, `ResolveError::DanglingRef` naming the
    /// unresolved reference, or any `LoadError` from fetching.
    pub fn resolve(
        &self,
        report: &mut ProcessingReport,
        tree: SchemaTree,
    ) -> Result<SchemaTree, CoreError> {
        let mut tree = tree;
        let mut seen: IndexSet<Reference> = IndexSet::new();
        loop {
            let Some(target) = reference_at(&tree) else {
                return Ok(tree);
            };
            let resolved = tree.context().resolve(&target);
            trace!(reference = %resolved, pointer = %tree.pointer(), "dereferencing");

            if !seen.insert(resolved.clone()) {
                let error = ResolveError::ReferenceLoop {
                    visited: seen.into_iter().collect(),
                };
                report.record(LogLevel::Fatal, error.to_string());
                return Err(error.into());
            }

            if !tree.contains_ref(&resolved) {
                tree = self.loader.get(&resolved.locator()).map_err(|error| {
                    report.record(LogLevel::Fatal, error.to_string());
                    CoreError::from(error)
                })?;
            }

            let Some(pointer) = tree.matching_pointer(&resolved) else {
                let error = ResolveError::DanglingRef {
                    reference: resolved,
                };
                report.record(LogLevel::Fatal, error.to_string());
                return Err(error.into());
            };
            tree = tree.set_pointer(pointer);
        }
    }
}

/// The parsed `$ref` at the tree's current position. A missing member, a
/// non-string value, or an unparseable URI all mean "no reference present"
/// rather than an error.
fn reference_at(tree: &SchemaTree) -> Option<Reference> {
    let raw = tree.current()?.as_object()?.get("$ref")?.as_str()?;
    Reference::parse(raw).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::Pointer;
    use crate::tree::Dereferencing;
    use serde_json::json;

    fn resolver() -> RefResolver {
        RefResolver::new(Arc::new(SchemaLoader::builder().build()))
    }

    fn anonymous(document: serde_json::Value) -> SchemaTree {
        SchemaTree::anonymous(Dereferencing::Canonical, document)
    }

    #[test]
    fn non_reference_node_passes_through() {
        let tree = anonymous(json!({"type": "object"}));
        let mut report = ProcessingReport::new();
        let resolved = resolver().resolve(&mut report, tree).unwrap();
        assert!(resolved.pointer().is_root());
    }

    #[test]
    fn internal_ref_relocates() {
        let tree = anonymous(json!({
            "$ref": "#/definitions/leaf",
            "definitions": {"leaf": {"type": "string"}}
        }));
        let mut report = ProcessingReport::new();
        let resolved = resolver().resolve(&mut report, tree).unwrap();
        assert_eq!(resolved.pointer(), &Pointer::parse("/definitions/leaf").unwrap());
        assert_eq!(resolved.current(), Some(&json!({"type": "string"})));
    }

    #[test]
    fn ref_chain_is_followed() {
        let tree = anonymous(json!({
            "$ref": "#/a",
            "a": {"$ref": "#/b"},
            "b": {"type": "integer"}
        }));
        let mut report = ProcessingReport::new();
        let resolved = resolver().resolve(&mut report, tree).unwrap();
        assert_eq!(resolved.pointer(), &Pointer::parse("/b").unwrap());
    }

    #[test]
    fn self_reference_loops() {
        let tree = anonymous(json!({"$ref": "#"}));
        let mut report = ProcessingReport::new();
        let result = resolver().resolve(&mut report, tree);
        match result {
            Err(CoreError::Resolve(ResolveError::ReferenceLoop { visited })) => {
                assert_eq!(visited.len(), 1);
                assert_eq!(visited[0].as_str(), "#");
            }
            other => panic!("expected reference loop, got {other:?}"),
        }
        // The failure was mirrored into the report.
        assert!(!report.is_success());
    }

    #[test]
    fn two_step_loop_lists_both_refs() {
        let tree = anonymous(json!({
            "$ref": "#/a",
            "a": {"$ref": "#/b"},
            "b": {"$ref": "#/a"}
        }));
        let mut report = ProcessingReport::new();
        let result = resolver().resolve(&mut report, tree);
        match result {
            Err(CoreError::Resolve(ResolveError::ReferenceLoop { visited })) => {
                assert_eq!(visited.len(), 2);
                assert_eq!(visited[0].as_str(), "#/a");
                assert_eq!(visited[1].as_str(), "#/b");
            }
            other => panic!("expected reference loop, got {other:?}"),
        }
    }

    #[test]
    fn dangling_reference_names_the_ref() {
        let tree = anonymous(json!({"$ref": "#/a"}));
        let mut report = ProcessingReport::new();
        let result = resolver().resolve(&mut report, tree);
        match result {
            Err(CoreError::Resolve(ResolveError::DanglingRef { reference })) => {
                assert_eq!(reference.as_str(), "#/a");
            }
            other => panic!("expected dangling ref, got {other:?}"),
        }
    }

    #[test]
    fn non_uri_ref_value_is_not_a_reference() {
        let tree = anonymous(json!({"$ref": "http://[bad uri"}));
        let mut report = ProcessingReport::new();
        let resolved = resolver().resolve(&mut report, tree).unwrap();
        assert!(resolved.pointer().is_root());
    }

    #[test]
    fn non_string_ref_value_is_not_a_reference() {
        let tree = anonymous(json!({"$ref": 42}));
        let mut report = ProcessingReport::new();
        let resolved = resolver().resolve(&mut report, tree).unwrap();
        assert!(resolved.pointer().is_root());
    }

    #[test]
    fn cross_document_ref_uses_the_loader() {
        let loader = SchemaLoader::builder()
            .preload(
                "http://example.com/other",
                json!({"definitions": {"t": {"type": "boolean"}}}),
            )
            .unwrap()
            .build();
        let resolver = RefResolver::new(Arc::new(loader));

        let tree = anonymous(json!({"$ref": "http://example.com/other#/definitions/t"}));
        let mut report = ProcessingReport::new();
        let resolved = resolver.resolve(&mut report, tree).unwrap();
        assert_eq!(
            resolved.loading_ref().locator_str(),
            "http://example.com/other"
        );
        assert_eq!(resolved.current(), Some(&json!({"type": "boolean"})));
    }

    #[test]
    fn relative_spellings_of_same_target_collide() {
        // Loaded under http://x/a; "a#/loop" and "#/loop" both resolve to
        // http://x/a#/loop, so the second occurrence is a loop of length 1.
        let loader = SchemaLoader::builder()
            .preload(
                "http://x/a",
                json!({"loop": {"$ref": "a#/loop"}}),
            )
            .unwrap()
            .build();
        let resolver = RefResolver::new(Arc::new(loader));
        let tree = resolver
            .loader()
            .get(&Reference::parse("http://x/a").unwrap())
            .unwrap()
            .set_pointer(Pointer::parse("/loop").unwrap());

        let mut report = ProcessingReport::new();
        let result = resolver.resolve(&mut report, tree);
        match result {
            Err(CoreError::Resolve(ResolveError::ReferenceLoop { visited })) => {
                assert_eq!(visited.len(), 1);
                assert_eq!(visited[0].as_str(), "http://x/a#/loop");
            }
            other => panic!("expected reference loop, got {other:?}"),
        }
    }
}
