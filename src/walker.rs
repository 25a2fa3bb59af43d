//! Recursive subschema traversal.
//!
//! A [`SchemaWalker`] visits every subschema of a tree exactly once,
//! resolving references at each node and asking per-keyword
//! [`PointerCollector`]s where to recurse. Collectors run in lexicographic
//! keyword order, so traversal order is reproducible. A resolution that
//! would relocate into an ancestor or descendant of the current position
//! within the same document is refused: the former would discard sibling
//! information, the latter would walk forever.

use std::collections::BTreeMap;

use tracing::trace;

use crate::error::{CoreError, WalkError};
use crate::pointer::Pointer;
use crate::report::{LogLevel, ProcessingReport};
use crate::resolver::RefResolver;
use crate::tree::SchemaTree;

/// Default bound on schema nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Per-keyword rule producing the child pointers, relative to the current
/// node, that lead to subschemas. Pure: no side effects.
pub trait PointerCollector {
    fn collect(&self, tree: &SchemaTree) -> Vec<Pointer>;
}

impl<F> PointerCollector for F
where
    F: Fn(&SchemaTree) -> Vec<Pointer>,
{
    fn collect(&self, tree: &SchemaTree) -> Vec<Pointer> {
        self(tree)
    }
}

/// Walk event hooks. All methods default to no-ops; implement the ones
/// you care about.
#[allow(unused_variables)]
pub trait WalkListener {
    /// A node is about to be processed at `pointer` (pre-resolution).
    fn on_enter(&mut self, pointer: &Pointer) {}

    /// Reference resolution relocated the tree.
    fn on_tree_change(&mut self, from: &SchemaTree, to: &SchemaTree) {}

    /// The (resolved) node is being visited.
    fn on_walk(&mut self, tree: &SchemaTree) {}

    /// About to recurse into a child pointer.
    fn on_push_down(&mut self, pointer: &Pointer) {}

    /// Done with a child.
    fn on_pop_up(&mut self) {}

    /// Done with the node entered by the matching `on_enter`.
    fn on_exit(&mut self) {}
}

/// Listener for callers that only care about errors.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl WalkListener for NoopListener {}

/// Recursive traversal over a schema tree, parameterized by keyword
/// collectors and an optional resolving step.
///
/// A walk is fully synchronous and runs to completion on the caller's
/// thread; no walker state survives across calls.
pub struct SchemaWalker {
    collectors: BTreeMap<String, Box<dyn PointerCollector>>,
    resolver: Option<RefResolver>,
    max_depth: usize,
}

impl SchemaWalker {
    pub fn new(collectors: BTreeMap<String, Box<dyn PointerCollector>>) -> Self {
        SchemaWalker {
            collectors,
            resolver: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Resolve references at each visited node.
    pub fn with_resolver(mut self, resolver: RefResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Bound the recursion depth. Nesting depth is caller-controlled
    /// input; the bound turns pathological documents into a typed error
    /// instead of a stack overflow.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Visit every subschema reachable from the tree's current position.
    ///
    /// # Errors
    ///
    /// Any resolution error, `WalkError::ParentExpand`/`SubtreeExpand`
    /// when a resolution would re-enter an ancestor or descendant, or
    /// `WalkError::DepthExceeded`.
    pub fn walk(
        &self,
        report: &mut ProcessingReport,
        tree: &SchemaTree,
        listener: &mut dyn WalkListener,
    ) -> Result<(), CoreError> {
        self.walk_at(report, tree.clone(), listener, 0)
    }

    fn walk_at(
        &self,
        report: &mut ProcessingReport,
        tree: SchemaTree,
        listener: &mut dyn WalkListener,
        depth: usize,
    ) -> Result<(), CoreError> {
        if depth > self.max_depth {
            let error = WalkError::DepthExceeded {
                limit: self.max_depth,
                pointer: tree.pointer().clone(),
            };
            report.record(LogLevel::Fatal, error.to_string());
            return Err(error.into());
        }

        listener.on_enter(tree.pointer());

        let resolved = match &self.resolver {
            Some(resolver) => resolver.resolve(report, tree.clone())?,
            None => tree.clone(),
        };
        if resolved.pointer() != tree.pointer() || resolved.loading_ref() != tree.loading_ref() {
            self.check_expansion(report, &tree, &resolved)?;
            listener.on_tree_change(&tree, &resolved);
        }

        trace!(pointer = %resolved.pointer(), "visiting");
        listener.on_walk(&resolved);

        for (keyword, collector) in &self.collectors {
            let present = resolved
                .current()
                .and_then(|node| node.as_object())
                .map_or(false, |map| map.contains_key(keyword));
            if !present {
                continue;
            }
            for child in collector.collect(&resolved) {
                listener.on_push_down(&child);
                self.walk_at(report, resolved.append_pointer(&child), listener, depth + 1)?;
                listener.on_pop_up();
            }
        }

        listener.on_exit();
        Ok(())
    }

    /// Refuse a resolution that stays inside the same document but moves
    /// to a strict ancestor or strict descendant of the current position.
    fn check_expansion(
        &self,
        report: &mut ProcessingReport,
        from: &SchemaTree,
        to: &SchemaTree,
    ) -> Result<(), CoreError> {
        if from.loading_ref() != to.loading_ref() || from.pointer() == to.pointer() {
            return Ok(());
        }
        let error = if to.pointer().is_prefix_of(from.pointer()) {
            WalkError::ParentExpand {
                from: from.pointer().clone(),
                to: to.pointer().clone(),
                uri: from.loading_ref().clone(),
            }
        } else if from.pointer().is_prefix_of(to.pointer()) {
            WalkError::SubtreeExpand {
                from: from.pointer().clone(),
                to: to.pointer().clone(),
                uri: from.loading_ref().clone(),
            }
        } else {
            return Ok(());
        };
        report.record(LogLevel::Fatal, error.to_string());
        Err(error.into())
    }
}
