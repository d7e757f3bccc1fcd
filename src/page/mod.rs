//! Page-object wiring.
//!
//! Page objects are declared as nodes of a [`PageGraph`] and wired by a
//! [`PageObjectInitializer`]:
//!
//! | Type | Description |
//! |------|-------------|
//! | [`PageGraph`] | Arena of page and widget nodes |
//! | [`FindBy`] | Selector annotation for a field |
//! | [`LocatorSlot`] | Locator field filled during initialization |
//! | [`PageRef`] | Handle to a node's context, driver and base locator |
//! | [`FieldLocatorStrategy`] | Builds the locator for one field |
//! | [`PageObjectInitializer`] | Depth-first wiring pass |
//!
//! # Example
//!
//! ```ignore
//! use patient_locator::page::{FindBy, PageGraph, PageObjectInitializer};
//!
//! let mut graph = PageGraph::new();
//! let login = graph.page("Login")?;
//! let user = graph.locator(login.id(), "user", FindBy::id("user"))?;
//!
//! PageObjectInitializer::new().initialize(&graph, login.id(), driver)?;
//! user.get()?.get().send_keys("alice")?;
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Field selector annotations.
pub mod annotation;

/// Node arena and slots.
pub mod graph;

/// Graph initializer.
pub mod initializer;

/// Field locator strategies.
pub mod strategy;

// ============================================================================
// Re-exports
// ============================================================================

pub use annotation::FindBy;
pub use graph::{LocatorSlot, NodeKind, PageGraph, PageRef};
pub use initializer::PageObjectInitializer;
pub use strategy::{AnnotatedFieldStrategy, FieldDescriptor, FieldLocatorStrategy, FieldTarget};
