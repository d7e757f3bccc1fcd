//! Page-object arena.
//!
//! Page objects are declared up front as nodes of a [`PageGraph`]. Each
//! node lists its fields explicitly: locator slots to fill and references to
//! nested nodes. References may form cycles; the initializer tolerates them.
//!
//! User structs keep the [`PageRef`] and [`LocatorSlot`]s handed out during
//! declaration and read them once the graph has been initialized.

// ============================================================================
// Imports
// ============================================================================

use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::error::{Error, Result};
use crate::identifiers::NodeId;
use crate::locate::{Context, Driver, Locator};

use super::annotation::FindBy;

// ============================================================================
// LocatorSlot
// ============================================================================

/// A locator field, filled at most once by the initializer.
///
/// Clones share the slot.
#[derive(Clone, Default)]
pub struct LocatorSlot(Rc<OnceCell<Locator>>);

impl LocatorSlot {
    /// Creates an empty slot.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a slot that already holds a locator; the initializer leaves
    /// it untouched.
    #[must_use]
    pub fn with(locator: Locator) -> Self {
        let cell = OnceCell::new();
        let _ = cell.set(locator);
        Self(Rc::new(cell))
    }

    /// Returns the wired locator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Initialization`] if the slot was never filled.
    pub fn get(&self) -> Result<&Locator> {
        self.0
            .get()
            .ok_or_else(|| Error::initialization("locator slot has not been initialized"))
    }

    /// Returns the wired locator, if any.
    #[inline]
    #[must_use]
    pub fn try_get(&self) -> Option<&Locator> {
        self.0.get()
    }

    /// Returns `true` if the slot holds a locator.
    #[inline]
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.get().is_some()
    }

    /// Fills the slot unless already filled. Returns `true` if it was filled.
    pub(crate) fn fill(&self, locator: Locator) -> bool {
        self.0.set(locator).is_ok()
    }
}

impl fmt::Debug for LocatorSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LocatorSlot").field(&self.0.get()).finish()
    }
}

// ============================================================================
// PageRef
// ============================================================================

/// Per-node values assigned by the initializer.
#[derive(Default)]
pub(crate) struct NodeSlots {
    /// Scope the node's fields were resolved against.
    pub context: OnceCell<Context>,
    /// Root driver, when initialization started from one.
    pub driver: OnceCell<Driver>,
    /// Locator of the single element a widget stands for.
    pub base_locator: OnceCell<Locator>,
}

/// A page object's handle on its node.
#[derive(Clone)]
pub struct PageRef {
    id: NodeId,
    slots: Rc<NodeSlots>,
}

impl PageRef {
    /// Returns the node ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Returns the scope the node was initialized against.
    #[inline]
    #[must_use]
    pub fn context(&self) -> Option<&Context> {
        self.slots.context.get()
    }

    /// Returns the root driver.
    #[inline]
    #[must_use]
    pub fn driver(&self) -> Option<&Driver> {
        self.slots.driver.get()
    }

    /// Returns the widget's base element locator.
    #[inline]
    #[must_use]
    pub fn base_locator(&self) -> Option<&Locator> {
        self.slots.base_locator.get()
    }

    /// Returns `true` once the initializer has visited the node.
    #[inline]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.slots.context.get().is_some()
    }
}

impl fmt::Debug for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageRef")
            .field("id", &self.id)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

// ============================================================================
// Nodes and Fields
// ============================================================================

/// What a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A screen or page.
    Page,
    /// A reusable fragment standing for one element; its fields are
    /// resolved below that element.
    Widget,
}

/// What a field holds.
#[derive(Debug, Clone)]
pub(crate) enum FieldKind {
    /// A locator to be built by the field strategy.
    Locator(LocatorSlot),
    /// A nested page object.
    Page(NodeId),
}

/// One declared field.
#[derive(Debug, Clone)]
pub(crate) struct FieldDecl {
    pub name: String,
    pub find_by: Option<FindBy>,
    pub kind: FieldKind,
}

pub(crate) struct PageNode {
    pub name: String,
    pub kind: NodeKind,
    pub extends: Option<NodeId>,
    pub fields: Vec<FieldDecl>,
    pub slots: Rc<NodeSlots>,
}

// ============================================================================
// PageGraph
// ============================================================================

/// Arena of page-object nodes.
#[derive(Default)]
pub struct PageGraph {
    nodes: Vec<PageNode>,
}

impl fmt::Debug for PageGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.nodes.iter().map(|n| (&n.name, n.kind, n.fields.len())))
            .finish()
    }
}

impl PageGraph {
    /// Creates an empty graph.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of nodes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if no node was declared.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Declares a page node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Initialization`] if the arena is full.
    pub fn page(&mut self, name: impl Into<String>) -> Result<PageRef> {
        self.add(name.into(), NodeKind::Page)
    }

    /// Declares a widget node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Initialization`] if the arena is full.
    pub fn widget(&mut self, name: impl Into<String>) -> Result<PageRef> {
        self.add(name.into(), NodeKind::Widget)
    }

    /// Declares a locator field built from a selector annotation.
    ///
    /// The annotation is validated during initialization.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Initialization`] for an unknown owner or a duplicate
    /// field name.
    pub fn locator(
        &mut self,
        owner: NodeId,
        name: impl Into<String>,
        find_by: FindBy,
    ) -> Result<LocatorSlot> {
        let slot = LocatorSlot::new();
        self.locator_field(owner, name, Some(find_by), slot.clone())?;
        Ok(slot)
    }

    /// Declares a locator field backed by an existing slot.
    ///
    /// A slot that is already filled is left as is. A field without
    /// annotation is only filled by strategies that do not need one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Initialization`] for an unknown owner or a duplicate
    /// field name.
    pub fn locator_field(
        &mut self,
        owner: NodeId,
        name: impl Into<String>,
        find_by: Option<FindBy>,
        slot: LocatorSlot,
    ) -> Result<()> {
        self.add_field(
            owner,
            FieldDecl {
                name: name.into(),
                find_by,
                kind: FieldKind::Locator(slot),
            },
        )
    }

    /// Declares a field referencing another node.
    ///
    /// For widget targets, `find_by` selects the element the widget stands
    /// for.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Initialization`] for unknown nodes or a duplicate
    /// field name.
    pub fn nest(
        &mut self,
        owner: NodeId,
        name: impl Into<String>,
        target: NodeId,
        find_by: Option<FindBy>,
    ) -> Result<()> {
        self.node(target)?;
        self.add_field(
            owner,
            FieldDecl {
                name: name.into(),
                find_by,
                kind: FieldKind::Page(target),
            },
        )
    }

    /// Makes `node` inherit every field declared on `base`.
    ///
    /// Inherited fields are walked before the node's own fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Initialization`] for unknown nodes.
    pub fn extend(&mut self, node: NodeId, base: NodeId) -> Result<()> {
        self.node(base)?;
        self.node_mut(node)?.extends = Some(base);
        Ok(())
    }

    /// Returns a node's name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Initialization`] for an unknown node.
    pub fn name(&self, id: NodeId) -> Result<&str> {
        Ok(&self.node(id)?.name)
    }

    /// Returns a node's kind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Initialization`] for an unknown node.
    pub fn kind(&self, id: NodeId) -> Result<NodeKind> {
        Ok(self.node(id)?.kind)
    }
}

// ============================================================================
// PageGraph - Internal
// ============================================================================

impl PageGraph {
    fn add(&mut self, name: String, kind: NodeKind) -> Result<PageRef> {
        let id = NodeId::new(self.nodes.len())
            .ok_or_else(|| Error::initialization("page graph is full"))?;
        let slots = Rc::new(NodeSlots::default());
        self.nodes.push(PageNode {
            name,
            kind,
            extends: None,
            fields: Vec::new(),
            slots: Rc::clone(&slots),
        });
        Ok(PageRef { id, slots })
    }

    fn add_field(&mut self, owner: NodeId, field: FieldDecl) -> Result<()> {
        let node = self.node_mut(owner)?;
        if node.fields.iter().any(|f| f.name == field.name) {
            return Err(Error::initialization(format!(
                "{}.{} is declared twice",
                node.name, field.name
            )));
        }
        node.fields.push(field);
        Ok(())
    }

    pub(crate) fn node(&self, id: NodeId) -> Result<&PageNode> {
        self.nodes
            .get(id.index())
            .ok_or_else(|| Error::initialization(format!("unknown page node {id}")))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut PageNode> {
        self.nodes
            .get_mut(id.index())
            .ok_or_else(|| Error::initialization(format!("unknown page node {id}")))
    }

    /// Returns the node's fields including inherited ones, base first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Initialization`] if the inheritance chain loops.
    pub(crate) fn field_chain(&self, id: NodeId) -> Result<Vec<&FieldDecl>> {
        let mut chain = Vec::new();
        let mut seen = FxHashSet::default();
        let mut current = Some(id);

        while let Some(node_id) = current {
            if !seen.insert(node_id) {
                return Err(Error::initialization(format!(
                    "{} has a cyclic inheritance chain",
                    self.node(id)?.name
                )));
            }
            let node = self.node(node_id)?;
            chain.push(node);
            current = node.extends;
        }

        Ok(chain
            .into_iter()
            .rev()
            .flat_map(|node| node.fields.iter())
            .collect())
    }
}

// ============================================================================
// Tests
// ============================================================================
