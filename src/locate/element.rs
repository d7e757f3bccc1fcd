//! Self-healing element handles.
//!
//! An [`Element`] stands for "the element at index *i* of some locator". It
//! caches the remote [`Handle`] it resolved last and transparently resolves
//! a fresh one when the remote tree replaced the old node.
//!
//! # Cache states
//!
//! ```text
//!   Empty ──resolve──► Cached ──stale action / presence check──► Invalidated
//!                        ▲                                          │
//!                        └────────────────resolve───────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! let save = driver.find(By::id("save")).get();
//!
//! save.click()?;                 // resolves, clicks, retries if stale
//! assert!(save.is_absent()?);    // waits for the dialog to close
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{DriverResult, Error, Result};
use crate::remote::Handle;

use super::By;
use super::config::Config;
use super::locator::{Locator, Lookup};

// ============================================================================
// CacheState
// ============================================================================

/// State of an element's handle cache.
#[derive(Debug, Clone, Default)]
pub enum CacheState {
    /// Never resolved.
    #[default]
    Empty,
    /// Holds a handle believed to be valid.
    Cached(Handle),
    /// Handle discarded; the next use re-resolves.
    Invalidated,
}

impl CacheState {
    /// Returns the cached handle, if any.
    #[inline]
    #[must_use]
    pub fn handle(&self) -> Option<&Handle> {
        match self {
            Self::Cached(handle) => Some(handle),
            Self::Empty | Self::Invalidated => None,
        }
    }

    /// Returns `true` if a handle is cached.
    #[inline]
    #[must_use]
    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Cached(_))
    }
}

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for an element.
struct ElementInner {
    /// Lookup parameters inherited from the creating locator.
    lookup: Lookup,
    /// Position among the locator's filtered matches.
    index: usize,
    /// Resolution timeout.
    timeout: Duration,
    /// `"<locator>[<index>]"`.
    description: String,
    /// Handle cache.
    cache: RefCell<CacheState>,
    /// Session epoch the cached handle was resolved under.
    cached_epoch: Cell<u64>,
}

// ============================================================================
// Element
// ============================================================================

/// A patient, retrying handle to one logical remote element.
///
/// Clones share the same cache. Not safe for concurrent use.
#[derive(Clone)]
pub struct Element {
    /// Shared inner state.
    inner: Rc<ElementInner>,
}

// ============================================================================
// Element - Display
// ============================================================================

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("description", &self.inner.description)
            .field("cache", &*self.inner.cache.borrow())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Element - Constructors
// ============================================================================

impl Element {
    /// Creates an element that resolves on first use.
    pub(crate) fn lazy(lookup: Lookup, index: usize, timeout: Duration) -> Self {
        Self::with_cache(lookup, index, timeout, CacheState::Empty)
    }

    /// Creates an element with an already resolved handle.
    pub(crate) fn seeded(lookup: Lookup, index: usize, timeout: Duration, handle: Handle) -> Self {
        Self::with_cache(lookup, index, timeout, CacheState::Cached(handle))
    }

    fn with_cache(lookup: Lookup, index: usize, timeout: Duration, cache: CacheState) -> Self {
        let description = Self::describe(&lookup.description, index);
        let epoch = lookup.epoch.get();
        Self {
            inner: Rc::new(ElementInner {
                lookup,
                index,
                timeout,
                cached_epoch: Cell::new(epoch),
                description,
                cache: RefCell::new(cache),
            }),
        }
    }

    pub(crate) fn describe(locator: &str, index: usize) -> String {
        format!("{locator}[{index}]")
    }
}

// ============================================================================
// Element - Accessors
// ============================================================================

impl Element {
    /// Returns the human-readable description.
    #[inline]
    #[must_use]
    pub fn description(&self) -> &str {
        &self.inner.description
    }

    /// Returns the index among the locator's matches.
    #[inline]
    #[must_use]
    pub fn index(&self) -> usize {
        self.inner.index
    }

    /// Returns the resolution timeout.
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// Returns the policy bundle.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.lookup.config
    }

    /// Returns a snapshot of the cache state.
    ///
    /// A handle cached under a session the driver has since dropped reports
    /// [`CacheState::Invalidated`].
    #[must_use]
    pub fn cache_state(&self) -> CacheState {
        self.expire_outdated();
        self.inner.cache.borrow().clone()
    }

    /// Returns `true` if both values are the same logical element.
    #[inline]
    #[must_use]
    pub fn same_as(&self, other: &Element) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Discards the cached handle.
    pub fn invalidate(&self) {
        let mut cache = self.inner.cache.borrow_mut();
        if cache.is_cached() {
            debug!(description = %self.inner.description, "Invalidating cached handle");
            *cache = CacheState::Invalidated;
        }
    }

    fn cached(&self) -> Option<Handle> {
        self.expire_outdated();
        self.inner.cache.borrow().handle().cloned()
    }

    fn store(&self, state: CacheState) {
        if state.is_cached() {
            self.inner.cached_epoch.set(self.inner.lookup.epoch.get());
        }
        *self.inner.cache.borrow_mut() = state;
    }

    /// Invalidates a handle cached under an earlier session.
    fn expire_outdated(&self) {
        if self.inner.cached_epoch.get() == self.inner.lookup.epoch.get() {
            return;
        }
        let mut cache = self.inner.cache.borrow_mut();
        if cache.is_cached() {
            debug!(
                description = %self.inner.description,
                "Session changed; invalidating cached handle"
            );
            *cache = CacheState::Invalidated;
        }
    }
}

// ============================================================================
// Element - Resolution
// ============================================================================

impl Element {
    /// Returns the live handle, resolving it patiently if none is cached.
    ///
    /// This is the escape hatch for operating on the driver handle directly.
    /// The handle is not re-validated; prefer [`apply`](Self::apply).
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if nothing matched within the timeout
    /// - untolerated driver errors from the lookup
    pub fn handle(&self) -> Result<Handle> {
        if let Some(handle) = self.cached() {
            return Ok(handle);
        }

        let handle = self
            .inner
            .lookup
            .resolve(self.inner.index, self.inner.timeout)?;
        debug!(description = %self.inner.description, handle = ?handle, "Resolved element");
        self.store(CacheState::Cached(handle.clone()));
        Ok(handle)
    }

    /// Runs a side-effecting operation against the live handle.
    ///
    /// # Errors
    ///
    /// See [`apply`](Self::apply).
    pub fn accept(&self, mut op: impl FnMut(&Handle) -> DriverResult<()>) -> Result<()> {
        self.apply(|handle| op(handle))
    }

    /// Runs an operation against the live handle and returns its value.
    ///
    /// Stale handles (and handles failing with a kind in the configured
    /// ignored action set) are dropped and re-resolved, for at most
    /// `max_action_attempts` attempts in total. Not found is never retried.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if resolution times out
    /// - [`Error::StaleElement`] if every attempt hit a stale handle
    /// - [`Error::Driver`] for any other driver error, including the last
    ///   ignored one when attempts run out
    pub fn apply<T>(&self, mut op: impl FnMut(&Handle) -> DriverResult<T>) -> Result<T> {
        let config = &self.inner.lookup.config;
        let max_attempts = config.max_action_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let handle = self.handle()?;

            let err = match op(&handle) {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !config.retries_action(&err) {
                return Err(Error::Driver(err));
            }

            self.invalidate();

            if attempt >= max_attempts {
                warn!(
                    description = %self.inner.description,
                    attempts = attempt,
                    error = %err,
                    "Action attempts exhausted"
                );
                return Err(if err.kind.is_always_handled() {
                    Error::stale_element(&self.inner.description, attempt, err)
                } else {
                    Error::Driver(err)
                });
            }

            debug!(
                description = %self.inner.description,
                attempt,
                error = %err,
                "Retrying action"
            );
        }
    }
}

// ============================================================================
// Element - Presence
// ============================================================================

impl Element {
    /// Looks the element up afresh and reports whether it is present.
    ///
    /// Always discards the cached handle first. Caches the new handle when
    /// found.
    ///
    /// # Errors
    ///
    /// Returns untolerated driver errors.
    pub fn is_present(&self) -> Result<bool> {
        self.is_present_within(self.inner.timeout)
    }

    /// Like [`is_present`](Self::is_present) with a custom timeout.
    ///
    /// # Errors
    ///
    /// Returns untolerated driver errors.
    pub fn is_present_within(&self, timeout: Duration) -> Result<bool> {
        self.store(CacheState::Invalidated);

        match self.inner.lookup.resolve(self.inner.index, timeout) {
            Ok(handle) => {
                self.store(CacheState::Cached(handle));
                Ok(true)
            }
            Err(Error::NotFound { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Waits for the element to disappear within the absence timeout.
    ///
    /// # Errors
    ///
    /// Returns untolerated driver errors.
    pub fn is_absent(&self) -> Result<bool> {
        self.is_absent_within(self.inner.lookup.config.not_present_timeout())
    }

    /// Waits for the element to disappear within `timeout`.
    ///
    /// On success the cache is left invalidated. On timeout the last handle
    /// seen is cached again, so a following action needs no lookup.
    ///
    /// # Errors
    ///
    /// Returns untolerated driver errors.
    pub fn is_absent_within(&self, timeout: Duration) -> Result<bool> {
        self.store(CacheState::Invalidated);

        match self.inner.lookup.await_absence(self.inner.index, timeout)? {
            None => Ok(true),
            Some(handle) => {
                debug!(description = %self.inner.description, "Still present; re-caching last handle");
                self.store(CacheState::Cached(handle));
                Ok(false)
            }
        }
    }
}

// ============================================================================
// Element - Nested Search
// ============================================================================

impl Element {
    /// Returns a locator for descendants of this element.
    ///
    /// Each lookup resolves this element first (patiently, with retries) and
    /// then queries its children.
    #[must_use]
    pub fn find(&self, by: By) -> Locator {
        let description: Rc<str> = format!("{} > {}", self.inner.description, by).into();
        let parent = self.clone();
        Locator::new(
            description,
            Rc::new(move || parent.apply(|handle| handle.find_children(&by))),
            self.inner.lookup.config.clone(),
            self.inner.lookup.epoch.clone(),
        )
    }
}

// ============================================================================
// Element - Actions
// ============================================================================

impl Element {
    /// Clicks or taps the element.
    pub fn click(&self) -> Result<()> {
        debug!(description = %self.inner.description, "Clicking element");
        self.accept(|h| h.click())
    }

    /// Types text into the element.
    pub fn send_keys(&self, text: &str) -> Result<()> {
        debug!(description = %self.inner.description, text_len = text.len(), "Typing text");
        self.accept(|h| h.send_keys(text))
    }

    /// Clears the element's input value.
    pub fn clear(&self) -> Result<()> {
        self.accept(|h| h.clear())
    }

    /// Returns the element's visible text.
    pub fn text(&self) -> Result<String> {
        self.apply(|h| h.text())
    }

    /// Returns an attribute value, or `None` if absent.
    pub fn attribute(&self, name: &str) -> Result<Option<String>> {
        self.apply(|h| h.attribute(name))
    }

    /// Returns `true` if the element is displayed.
    pub fn is_displayed(&self) -> Result<bool> {
        self.apply(|h| h.is_displayed())
    }

    /// Returns `true` if the element accepts input.
    pub fn is_enabled(&self) -> Result<bool> {
        self.apply(|h| h.is_enabled())
    }
}

// ============================================================================
// Tests
// ============================================================================
