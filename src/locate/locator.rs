//! Patient, memoizing element locators.
//!
//! A [`Locator`] pairs a handle-list supplier (a fresh query against the
//! driver or a parent element) with a filter, a wait policy and a timeout.
//! It hands out [`Element`]s:
//!
//! - [`Locator::get`] / [`Locator::nth`] are lazy: nothing is looked up until
//!   the element is first used
//! - [`Locator::get_all`] is eager: it waits for at least one match and
//!   returns elements pre-seeded with their handles
//!
//! # Example
//!
//! ```ignore
//! use patient_locator::By;
//!
//! let rows = driver.find(By::css("table tr"));
//!
//! // Waits for three matches, not for the whole table to settle.
//! rows.nth(2).click()?;
//!
//! assert!(rows.is_present()?);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{Error, Result};
use crate::remote::Handle;

use super::config::{Config, ElementFilter};
use super::driver::SessionEpoch;
use super::element::Element;
use super::wait::{WaitError, WaitPolicy, poll_until, saturating_millis};

// ============================================================================
// Types
// ============================================================================

/// Queries the remote tree afresh on every call.
pub type HandleSupplier = Rc<dyn Fn() -> Result<Vec<Handle>>>;

/// Everything needed to (re-)resolve handles for one locator.
///
/// Shared between a locator and every element it creates.
#[derive(Clone)]
pub(crate) struct Lookup {
    /// Human-readable description.
    pub description: Rc<str>,
    /// Handle-list supplier.
    pub supplier: HandleSupplier,
    /// Match filter.
    pub filter: ElementFilter,
    /// Poll pacing.
    pub wait: Rc<dyn WaitPolicy>,
    /// Presence timeout.
    pub timeout: Duration,
    /// Policy bundle.
    pub config: Config,
    /// Session epoch of the owning driver.
    pub epoch: SessionEpoch,
}

// ============================================================================
// Lookup
// ============================================================================

impl Lookup {
    /// Runs one lookup attempt, keeping at most `limit` filtered handles.
    ///
    /// Tolerated driver failures count as "no match this attempt".
    fn attempt(&self, limit: usize) -> Result<Vec<Handle>> {
        let handles = match (self.supplier)() {
            Ok(handles) => handles,
            Err(Error::Driver(err)) if self.config.tolerates_lookup(&err) => {
                debug!(description = %self.description, error = %err, "Ignoring lookup failure");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };

        let mut matched = Vec::with_capacity(limit.min(handles.len()));
        for handle in handles {
            if matched.len() >= limit {
                break;
            }
            match self.filter.matches(&handle) {
                Ok(true) => matched.push(handle),
                Ok(false) => {}
                // A handle that went stale between listing and filtering is
                // simply not a match.
                Err(err) if self.config.tolerates_lookup(&err) => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(matched)
    }

    /// Waits until at least `index + 1` handles match and returns the one at
    /// `index`.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] on timeout
    /// - any untolerated supplier or filter error
    pub(crate) fn resolve(&self, index: usize, timeout: Duration) -> Result<Handle> {
        let limit = index.saturating_add(1);
        let outcome = poll_until(
            &*self.wait,
            timeout,
            || self.attempt(limit),
            |handles| handles.len() > index,
        );

        match outcome {
            Ok(mut handles) => Ok(handles.swap_remove(index)),
            Err(WaitError::TimedOut { attempts, .. }) => {
                debug!(
                    description = %self.description,
                    index,
                    attempts,
                    timeout_ms = saturating_millis(timeout),
                    "Lookup timed out"
                );
                Err(Error::not_found(
                    Element::describe(&self.description, index),
                    saturating_millis(timeout),
                ))
            }
            Err(WaitError::Aborted(err)) => Err(err),
        }
    }

    /// Waits until fewer than `index + 1` handles match.
    ///
    /// Returns `Ok(None)` once absent, or `Ok(Some(handle))` carrying the
    /// handle still seen at `index` when the timeout passed.
    pub(crate) fn await_absence(&self, index: usize, timeout: Duration) -> Result<Option<Handle>> {
        let limit = index.saturating_add(1);
        let outcome = poll_until(
            &*self.wait,
            timeout,
            || self.attempt(limit),
            |handles| handles.len() <= index,
        );

        match outcome {
            Ok(_) => Ok(None),
            Err(WaitError::TimedOut { last, .. }) => {
                Ok(last.and_then(|mut handles| (handles.len() > index).then(|| handles.swap_remove(index))))
            }
            Err(WaitError::Aborted(err)) => Err(err),
        }
    }

    /// Waits until at least one handle matches and returns every match.
    ///
    /// Returns an empty list on timeout.
    pub(crate) fn resolve_all(&self, timeout: Duration) -> Result<Vec<Handle>> {
        let outcome = poll_until(
            &*self.wait,
            timeout,
            || self.attempt(usize::MAX),
            |handles| !handles.is_empty(),
        );

        match outcome {
            Ok(handles) => Ok(handles),
            Err(WaitError::TimedOut { .. }) => Ok(Vec::new()),
            Err(WaitError::Aborted(err)) => Err(err),
        }
    }
}

// ============================================================================
// Locator
// ============================================================================

/// Produces [`Element`]s for one selector within one search scope.
///
/// Not safe for concurrent use: the element memo is a plain `RefCell`.
pub struct Locator {
    /// Shared lookup parameters.
    lookup: Lookup,
    /// Elements handed out so far, keyed by index and timeout.
    memo: RefCell<FxHashMap<(usize, Duration), Element>>,
}

// ============================================================================
// Locator - Display
// ============================================================================

impl fmt::Debug for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Locator")
            .field("description", &self.lookup.description)
            .field("filter", &self.lookup.filter)
            .field("timeout", &self.lookup.timeout)
            .field("memoized", &self.memo.borrow().len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Locator - Constructors
// ============================================================================

impl Locator {
    /// Creates a locator over an arbitrary handle-list supplier.
    ///
    /// Filter, wait policy and timeout come from `config`.
    pub fn from_supplier(
        description: impl Into<Rc<str>>,
        config: Config,
        supplier: impl Fn() -> Result<Vec<Handle>> + 'static,
    ) -> Self {
        Self::new(
            description.into(),
            Rc::new(supplier),
            config,
            SessionEpoch::default(),
        )
    }

    pub(crate) fn new(
        description: Rc<str>,
        supplier: HandleSupplier,
        config: Config,
        epoch: SessionEpoch,
    ) -> Self {
        Self::from_lookup(Lookup {
            description,
            supplier,
            filter: config.filter().clone(),
            wait: Rc::clone(config.wait()),
            timeout: config.present_timeout(),
            config,
            epoch,
        })
    }

    fn from_lookup(lookup: Lookup) -> Self {
        Self {
            lookup,
            memo: RefCell::new(FxHashMap::default()),
        }
    }

    /// Returns a copy using a different wait policy and an empty memo.
    #[must_use]
    pub fn with_wait(&self, policy: impl WaitPolicy + 'static) -> Self {
        Self::from_lookup(Lookup {
            wait: Rc::new(policy),
            ..self.lookup.clone()
        })
    }

    /// Returns a copy using a different presence timeout and an empty memo.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self::from_lookup(Lookup {
            timeout,
            ..self.lookup.clone()
        })
    }

    /// Returns a copy using a different filter and an empty memo.
    #[must_use]
    pub fn with_filter(&self, filter: ElementFilter) -> Self {
        Self::from_lookup(Lookup {
            filter,
            ..self.lookup.clone()
        })
    }
}

// ============================================================================
// Locator - Accessors
// ============================================================================

impl Locator {
    /// Returns the human-readable description.
    #[inline]
    #[must_use]
    pub fn description(&self) -> &str {
        &self.lookup.description
    }

    /// Returns the presence timeout.
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.lookup.timeout
    }

    /// Returns the filter.
    #[inline]
    #[must_use]
    pub fn filter(&self) -> &ElementFilter {
        &self.lookup.filter
    }

    /// Returns the policy bundle.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.lookup.config
    }
}

// ============================================================================
// Locator - Elements
// ============================================================================

impl Locator {
    /// Returns the first matching element, lazily.
    #[inline]
    #[must_use]
    pub fn get(&self) -> Element {
        self.nth(0)
    }

    /// Returns the element at `index` (0-based), lazily.
    ///
    /// Repeated calls return the same element.
    #[inline]
    #[must_use]
    pub fn nth(&self, index: usize) -> Element {
        self.nth_within(index, self.lookup.timeout)
    }

    /// Returns the first matching element, resolved with a custom timeout.
    #[inline]
    #[must_use]
    pub fn get_within(&self, timeout: Duration) -> Element {
        self.nth_within(0, timeout)
    }

    /// Returns the element at `index`, resolved with a custom timeout.
    ///
    /// Memoized per index and timeout.
    #[must_use]
    pub fn nth_within(&self, index: usize, timeout: Duration) -> Element {
        self.memo
            .borrow_mut()
            .entry((index, timeout))
            .or_insert_with(|| Element::lazy(self.lookup.clone(), index, timeout))
            .clone()
    }

    /// Waits for at least one match and returns every current match.
    ///
    /// Returns an empty list if nothing matched within the timeout.
    ///
    /// # Errors
    ///
    /// Returns untolerated driver errors.
    pub fn get_all(&self) -> Result<Vec<Element>> {
        self.get_all_within(self.lookup.timeout)
    }

    /// Like [`get_all`](Self::get_all) with a custom timeout.
    ///
    /// # Errors
    ///
    /// Returns untolerated driver errors.
    pub fn get_all_within(&self, timeout: Duration) -> Result<Vec<Element>> {
        let handles = self.lookup.resolve_all(timeout)?;
        debug!(description = %self.lookup.description, count = handles.len(), "Resolved all");

        Ok(handles
            .into_iter()
            .enumerate()
            .map(|(index, handle)| {
                Element::seeded(self.lookup.clone(), index, self.lookup.timeout, handle)
            })
            .collect())
    }
}

// ============================================================================
// Locator - Presence
// ============================================================================

impl Locator {
    /// Returns `true` if a first match appears within the presence timeout.
    ///
    /// # Errors
    ///
    /// Returns untolerated driver errors.
    pub fn is_present(&self) -> Result<bool> {
        self.is_present_within(self.lookup.timeout)
    }

    /// Returns `true` if a first match appears within `timeout`.
    ///
    /// # Errors
    ///
    /// Returns untolerated driver errors.
    pub fn is_present_within(&self, timeout: Duration) -> Result<bool> {
        self.get().is_present_within(timeout)
    }

    /// Returns `true` if no match remains within the absence timeout.
    ///
    /// # Errors
    ///
    /// Returns untolerated driver errors.
    pub fn is_not_present(&self) -> Result<bool> {
        self.is_not_present_within(self.lookup.config.not_present_timeout())
    }

    /// Returns `true` if no match remains within `timeout`.
    ///
    /// # Errors
    ///
    /// Returns untolerated driver errors.
    pub fn is_not_present_within(&self, timeout: Duration) -> Result<bool> {
        Ok(self.lookup.await_absence(0, timeout)?.is_none())
    }
}

// ============================================================================
// Tests
// ============================================================================
