//! Page-object graph initializer.
//!
//! Walks a [`PageGraph`] depth-first from a root node and a search context:
//!
//! 1. A node already visited during this call is skipped. This breaks
//!    cycles and shared references.
//! 2. The node's context (and the root driver, if any) is assigned.
//! 3. Each field of the inheritance chain, base first:
//!    - an empty locator slot is filled by the [`FieldLocatorStrategy`]
//!    - a nested node is visited with the same context, or for widgets with
//!      the context narrowed to the widget's base element
//!
//! Nodes keep the scope of the first pass that reached them. Initializing a
//! node again against the same driver or element is a no-op for the already
//! filled slots; a different scope is rejected.
//!
//! Any wiring failure aborts the walk with
//! [`Error::Initialization`](crate::Error::Initialization).

// ============================================================================
// Imports
// ============================================================================

use std::cell::OnceCell;

use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::identifiers::NodeId;
use crate::locate::{Context, Driver};

use super::graph::{FieldDecl, FieldKind, NodeKind, PageGraph, PageNode};
use super::strategy::{AnnotatedFieldStrategy, FieldDescriptor, FieldLocatorStrategy, FieldTarget};

// ============================================================================
// PageObjectInitializer
// ============================================================================

/// Wires locator slots and contexts into a page graph.
#[derive(Debug, Clone, Default)]
pub struct PageObjectInitializer<S = AnnotatedFieldStrategy> {
    strategy: S,
}

impl PageObjectInitializer {
    /// Creates an initializer using [`AnnotatedFieldStrategy`].
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: FieldLocatorStrategy> PageObjectInitializer<S> {
    /// Creates an initializer using a custom field strategy.
    #[inline]
    #[must_use]
    pub fn with_strategy(strategy: S) -> Self {
        Self { strategy }
    }

    /// Returns the field strategy.
    #[inline]
    #[must_use]
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Initializes everything reachable from `root`.
    ///
    /// Returns the number of nodes visited.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Initialization`] for unknown nodes, cyclic
    /// inheritance, invalid field annotations, or nodes already wired to a
    /// different scope.
    pub fn initialize(
        &self,
        graph: &PageGraph,
        root: NodeId,
        context: impl Into<Context>,
    ) -> Result<usize> {
        let context = context.into();
        let mut walk = Walk {
            graph,
            strategy: &self.strategy,
            driver: context.driver().cloned(),
            visited: FxHashSet::default(),
        };

        walk.visit(root, context)?;
        debug!(root = %root, visited = walk.visited.len(), "Page graph initialized");
        Ok(walk.visited.len())
    }
}

// ============================================================================
// Walk
// ============================================================================

/// State of one initialization pass.
struct Walk<'g, S> {
    graph: &'g PageGraph,
    strategy: &'g S,
    driver: Option<Driver>,
    visited: FxHashSet<NodeId>,
}

impl<'g, S: FieldLocatorStrategy> Walk<'g, S> {
    fn visit(&mut self, id: NodeId, context: Context) -> Result<()> {
        if !self.visited.insert(id) {
            trace!(node = %id, "Already visited");
            return Ok(());
        }

        let graph = self.graph;
        let node = graph.node(id)?;
        trace!(node = %id, name = %node.name, "Visiting");

        if !bind(&node.slots.context, &context, Context::same_scope) {
            return Err(already_wired(node, "search context"));
        }
        if let Some(driver) = &self.driver
            && !bind(&node.slots.driver, driver, Driver::same_as)
        {
            return Err(already_wired(node, "driver"));
        }

        for field in graph.field_chain(id)? {
            match &field.kind {
                FieldKind::Locator(slot) => {
                    if slot.is_set() {
                        continue;
                    }
                    let descriptor = describe(node, field, FieldTarget::Locator);
                    if let Some(locator) = self.strategy.build_locator(&context, &descriptor)? {
                        slot.fill(locator);
                    }
                }
                FieldKind::Page(target) => {
                    if self.visited.contains(target) {
                        continue;
                    }
                    let child = graph.node(*target)?;
                    let child_context = self.child_context(&context, node, field, child)?;
                    self.visit(*target, child_context)?;
                }
            }
        }
        Ok(())
    }

    /// Narrows the context for widgets whose field selects a base element.
    fn child_context(
        &self,
        context: &Context,
        owner: &PageNode,
        field: &FieldDecl,
        child: &PageNode,
    ) -> Result<Context> {
        if child.kind != NodeKind::Widget {
            return Ok(context.clone());
        }

        if child.slots.base_locator.get().is_none() {
            let descriptor = describe(owner, field, FieldTarget::Node(NodeKind::Widget));
            if let Some(locator) = self.strategy.build_locator(context, &descriptor)? {
                let _ = child.slots.base_locator.set(locator);
            }
        }

        Ok(match child.slots.base_locator.get() {
            Some(base) => Context::Element(base.get()),
            None => context.clone(),
        })
    }
}

/// Stores `value` in an empty slot. Returns `false` if the slot already holds
/// a different scope.
fn bind<T: Clone>(slot: &OnceCell<T>, value: &T, same: impl Fn(&T, &T) -> bool) -> bool {
    match slot.get() {
        Some(current) => same(current, value),
        None => slot.set(value.clone()).is_ok(),
    }
}

fn already_wired(node: &PageNode, what: &str) -> Error {
    Error::initialization(format!(
        "{} is already wired to a different {what}",
        node.name
    ))
}

fn describe<'a>(owner: &'a PageNode, field: &'a FieldDecl, target: FieldTarget) -> FieldDescriptor<'a> {
    FieldDescriptor {
        owner: &owner.name,
        name: &field.name,
        find_by: field.find_by.as_ref(),
        target,
    }
}

// ============================================================================
// Tests
// ============================================================================
