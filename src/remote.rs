//! Automation driver collaborator boundary.
//!
//! The resolution engine never talks to a browser or device itself. A
//! platform integration implements [`RemoteSession`] for its session object
//! and [`RemoteElement`] for its element references, classifying native
//! failures into [`DriverErrorKind`](crate::DriverErrorKind) once, here.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`RemoteSession`] | Root search context: one automation session |
//! | [`RemoteElement`] | One remote UI element reference |
//! | [`Session`] | Cloneable handle to a [`RemoteSession`] |
//! | [`Handle`] | Cloneable handle to a [`RemoteElement`] |
//!
//! Implementations must return an empty list from `find_children` when
//! nothing matches, and reserve errors for genuine driver failures.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use crate::error::DriverResult;
use crate::locate::By;

// ============================================================================
// RemoteElement
// ============================================================================

/// A single remote UI element as exposed by the automation driver.
///
/// Any call may fail with
/// [`DriverErrorKind::StaleElement`](crate::DriverErrorKind::StaleElement)
/// once the element has been detached from the remote tree.
pub trait RemoteElement {
    /// Returns the driver-assigned reference ID.
    fn id(&self) -> &str;

    /// Returns the elements below this one matching `by`.
    fn find_children(&self, by: &By) -> DriverResult<Vec<Handle>>;

    /// Clicks or taps the element.
    fn click(&self) -> DriverResult<()>;

    /// Types text into the element.
    fn send_keys(&self, text: &str) -> DriverResult<()>;

    /// Clears the element's input value.
    fn clear(&self) -> DriverResult<()>;

    /// Returns the element's visible text.
    fn text(&self) -> DriverResult<String>;

    /// Returns an attribute value, or `None` if absent.
    fn attribute(&self, name: &str) -> DriverResult<Option<String>>;

    /// Returns `true` if the element is displayed.
    fn is_displayed(&self) -> DriverResult<bool>;

    /// Returns `true` if the element accepts input.
    fn is_enabled(&self) -> DriverResult<bool>;
}

// ============================================================================
// RemoteSession
// ============================================================================

/// A remote automation session (browser or app).
pub trait RemoteSession {
    /// Returns the driver-assigned session ID.
    fn id(&self) -> &str;

    /// Returns the top-level elements matching `by`.
    fn find_children(&self, by: &By) -> DriverResult<Vec<Handle>>;

    /// Returns the number of open windows or views.
    fn window_count(&self) -> DriverResult<usize>;

    /// Closes the current window or view.
    fn close_window(&self) -> DriverResult<()>;

    /// Terminates the session.
    fn quit(&self) -> DriverResult<()>;
}

// ============================================================================
// Handle
// ============================================================================

/// Cloneable reference to a [`RemoteElement`].
///
/// Equality is identity: two handles are the same only if they share the
/// underlying remote object.
#[derive(Clone)]
pub struct Handle(Rc<dyn RemoteElement>);

impl Handle {
    /// Wraps a remote element.
    #[inline]
    pub fn new(remote: impl RemoteElement + 'static) -> Self {
        Self(Rc::new(remote))
    }

    /// Wraps an already shared remote element.
    #[inline]
    #[must_use]
    pub fn from_rc(remote: Rc<dyn RemoteElement>) -> Self {
        Self(remote)
    }

    /// Returns `true` if both handles point to the same remote object.
    #[inline]
    #[must_use]
    pub fn same_as(&self, other: &Handle) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

impl Deref for Handle {
    type Target = dyn RemoteElement;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle").field(&self.0.id()).finish()
    }
}

// ============================================================================
// Session
// ============================================================================

/// Cloneable reference to a [`RemoteSession`].
#[derive(Clone)]
pub struct Session(Rc<dyn RemoteSession>);

impl Session {
    /// Wraps a remote session.
    #[inline]
    pub fn new(remote: impl RemoteSession + 'static) -> Self {
        Self(Rc::new(remote))
    }

    /// Wraps an already shared remote session.
    #[inline]
    #[must_use]
    pub fn from_rc(remote: Rc<dyn RemoteSession>) -> Self {
        Self(remote)
    }

    /// Returns `true` if both handles point to the same session.
    #[inline]
    #[must_use]
    pub fn same_as(&self, other: &Session) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

impl Deref for Session {
    type Target = dyn RemoteSession;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Session").field(&self.0.id()).finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
