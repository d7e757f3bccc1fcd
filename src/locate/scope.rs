//! Search scopes and cache control shared by drivers and elements.

// ============================================================================
// Imports
// ============================================================================

use crate::error::{DriverResult, Result};
use crate::remote::{Handle, Session};

use super::By;
use super::config::Config;
use super::driver::Driver;
use super::element::Element;
use super::locator::Locator;

// ============================================================================
// Traits
// ============================================================================

/// Something that can scope a lookup.
pub trait Scoped {
    /// Returns a locator for matches of `by` within this scope.
    fn find(&self, by: By) -> Locator;
}

/// Something that lazily resolves a remote object and runs operations on it.
pub trait Resolvable {
    /// The remote handle type operations receive.
    type Target;

    /// Runs `op` against the live remote object.
    ///
    /// # Errors
    ///
    /// Returns the resolution or driver error of the implementor.
    fn apply<T>(&self, op: impl FnMut(&Self::Target) -> DriverResult<T>) -> Result<T>;

    /// Runs a side-effecting `op` against the live remote object.
    ///
    /// # Errors
    ///
    /// See [`apply`](Self::apply).
    fn accept(&self, op: impl FnMut(&Self::Target) -> DriverResult<()>) -> Result<()> {
        self.apply(op)
    }
}

/// Something that caches a lazily resolved remote object.
pub trait Cacheable {
    /// Returns `true` if a remote object is currently cached.
    fn is_cached(&self) -> bool;

    /// Drops the cached remote object; the next use resolves again.
    fn invalidate(&self);
}

impl Scoped for Driver {
    fn find(&self, by: By) -> Locator {
        Driver::find(self, by)
    }
}

impl Scoped for Element {
    fn find(&self, by: By) -> Locator {
        Element::find(self, by)
    }
}

impl Resolvable for Driver {
    type Target = Session;

    fn apply<T>(&self, op: impl FnMut(&Session) -> DriverResult<T>) -> Result<T> {
        Driver::apply(self, op)
    }
}

impl Resolvable for Element {
    type Target = Handle;

    fn apply<T>(&self, op: impl FnMut(&Handle) -> DriverResult<T>) -> Result<T> {
        Element::apply(self, op)
    }
}

impl Cacheable for Driver {
    fn is_cached(&self) -> bool {
        self.has_session()
    }

    fn invalidate(&self) {
        Driver::invalidate(self);
    }
}

impl Cacheable for Element {
    fn is_cached(&self) -> bool {
        self.cache_state().is_cached()
    }

    fn invalidate(&self) {
        Element::invalidate(self);
    }
}

// ============================================================================
// Context
// ============================================================================

/// The scope page-object fields are resolved against.
#[derive(Debug, Clone)]
pub enum Context {
    /// Top level: the whole session.
    Driver(Driver),
    /// Narrowed to descendants of one element.
    Element(Element),
}

impl Context {
    /// Returns the policy bundle of the scope.
    #[must_use]
    pub fn config(&self) -> &Config {
        match self {
            Self::Driver(driver) => driver.config(),
            Self::Element(element) => element.config(),
        }
    }

    /// Returns the driver if this is the top-level scope.
    #[must_use]
    pub fn driver(&self) -> Option<&Driver> {
        match self {
            Self::Driver(driver) => Some(driver),
            Self::Element(_) => None,
        }
    }

    /// Returns the element if this is a narrowed scope.
    #[must_use]
    pub fn element(&self) -> Option<&Element> {
        match self {
            Self::Driver(_) => None,
            Self::Element(element) => Some(element),
        }
    }

    /// Returns `true` if both contexts are the same driver or element.
    #[must_use]
    pub fn same_scope(&self, other: &Context) -> bool {
        match (self, other) {
            (Self::Driver(a), Self::Driver(b)) => a.same_as(b),
            (Self::Element(a), Self::Element(b)) => a.same_as(b),
            _ => false,
        }
    }

    /// Returns the scope element's live handle.
    ///
    /// Returns `None` for the top-level scope.
    ///
    /// # Errors
    ///
    /// See [`Element::handle`].
    pub fn handle(&self) -> Result<Option<Handle>> {
        self.element().map(Element::handle).transpose()
    }
}

impl Scoped for Context {
    fn find(&self, by: By) -> Locator {
        match self {
            Self::Driver(driver) => driver.find(by),
            Self::Element(element) => element.find(by),
        }
    }
}

impl From<Driver> for Context {
    fn from(driver: Driver) -> Self {
        Self::Driver(driver)
    }
}

impl From<Element> for Context {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use crate::locate::wait::FixedInterval;
    use crate::testing::FakeDom;

    fn driver(dom: &FakeDom) -> Driver {
        let dom = dom.clone();
        let config = Config::builder()
            .wait(FixedInterval(Duration::from_millis(2)))
            .present_timeout(Duration::from_millis(40))
            .build()
            .unwrap();
        Driver::builder()
            .config(config)
            .connect(move || Ok(dom.session()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_context_scopes_lookups() {
        let dom = FakeDom::new();
        let header = By::css("header");
        let link = By::link_text("Home");
        dom.set_matches(&header, &["header"]);
        dom.set_child_matches("header", &link, &["home"]);

        let root = Context::from(driver(&dom));
        let narrowed = Context::from(root.find(header).get());

        assert!(root.driver().is_some());
        assert!(narrowed.driver().is_none());
        assert!(narrowed.find(link).get().handle().unwrap().same_as(&dom.node("home")));
    }

    #[test]
    fn test_cacheable_invalidate() {
        let dom = FakeDom::new();
        let by = By::id("x");
        dom.set_matches(&by, &["x"]);
        let driver = driver(&dom);
        let element = driver.find(by).get();

        element.handle().unwrap();
        assert!(Cacheable::is_cached(&element));
        assert!(Cacheable::is_cached(&driver));

        Cacheable::invalidate(&element);
        Cacheable::invalidate(&driver);
        assert!(!Cacheable::is_cached(&element));
        assert!(!Cacheable::is_cached(&driver));
    }

    fn count_calls<R: Resolvable>(scope: &R) -> Result<u32> {
        let mut calls = 0;
        scope.accept(|_| {
            calls += 1;
            Ok(())
        })?;
        Ok(calls)
    }

    #[test]
    fn test_resolvable_is_generic_over_scope() {
        let dom = FakeDom::new();
        let by = By::id("save");
        dom.set_matches(&by, &["save"]);
        let driver = driver(&dom);
        let element = driver.find(by).get();

        assert_eq!(count_calls(&element).unwrap(), 1);
        assert_eq!(count_calls(&driver).unwrap(), 1);
        assert!(element.cache_state().is_cached());
        assert!(driver.has_session());
    }
}
